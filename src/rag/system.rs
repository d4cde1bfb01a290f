//! The [`RagSystem`] façade.

use super::{CourseAnalytics, QueryResponse};
use crate::agent::ResponseGenerator;
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{PensumError, Result};
use crate::llm::OpenAIChatClient;
use crate::orchestrator::Orchestrator;
use crate::search::{SearchBackend, VectorSearch};
use crate::session::SessionManager;
use crate::tools::{CourseOutlineTool, CourseSearchTool, ToolRegistry};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Answer given when a query fails for any reason other than an LLM timeout.
pub const DEGRADED_ANSWER: &str =
    "Sorry, I couldn't process that course-content request right now. Please try again.";

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(90);

/// Registry holding the content search and outline tools.
pub fn default_registry(backend: Arc<dyn SearchBackend>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CourseSearchTool::new(backend.clone())))?;
    registry.register(Arc::new(CourseOutlineTool::new(backend)))?;
    Ok(registry)
}

/// Answers course questions with session history and source attribution.
pub struct RagSystem {
    generator: ResponseGenerator,
    registry: ToolRegistry,
    sessions: SessionManager,
    backend: Arc<dyn SearchBackend>,
    prompts: Prompts,
    query_timeout: Duration,
}

impl RagSystem {
    pub fn new(
        generator: ResponseGenerator,
        registry: ToolRegistry,
        sessions: SessionManager,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            generator,
            registry,
            sessions,
            backend,
            prompts: Prompts::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the prompts used for the query template.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the deadline applied by [`query_with_timeout`](Self::query_with_timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Build the full system from configuration, opening its own index.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let orchestrator = Orchestrator::new(settings.clone())?;
        Self::with_index(settings, orchestrator.embedder(), orchestrator.vector_store())
    }

    /// Build the system over an existing embedder and store.
    pub fn with_index(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = Arc::new(OpenAIChatClient::from_settings(&settings.llm)?);
        let backend: Arc<dyn SearchBackend> = Arc::new(VectorSearch::new(
            embedder,
            store,
            settings.rag.max_results,
        ));

        Ok(Self::new(
            ResponseGenerator::new(client, &prompts),
            default_registry(backend.clone())?,
            SessionManager::new(settings.rag.max_history),
            backend,
        )
        .with_prompts(prompts)
        .with_query_timeout(Duration::from_secs(settings.rag.query_timeout_seconds)))
    }

    /// Answer `query`, recording the exchange in `session_id` (or a new session).
    ///
    /// LLM timeouts are returned as errors. Any other failure yields
    /// [`DEGRADED_ANSWER`] with no sources and leaves the history untouched.
    #[instrument(skip(self, query), fields(session = session_id.unwrap_or("new")))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };

        match self.answer(query, &session_id).await {
            Ok((answer, sources)) => {
                self.sessions.add_exchange(&session_id, query, &answer);
                info!("Answered with {} sources", sources.len());
                Ok(QueryResponse {
                    answer,
                    sources,
                    session_id,
                })
            }
            Err(e) if e.is_timeout() => Err(e),
            Err(e) => {
                warn!("Query failed: {}", e);
                Ok(QueryResponse {
                    answer: DEGRADED_ANSWER.to_string(),
                    sources: Vec::new(),
                    session_id,
                })
            }
        }
    }

    async fn answer(&self, query: &str, session_id: &str) -> Result<(String, Vec<String>)> {
        let history = self.sessions.history(session_id);
        let prompt = self.prompts.render_query(query);

        let registry = self.registry.fork();
        let definitions = registry.definitions();

        let generated = self
            .generator
            .generate(
                &prompt,
                history.as_deref(),
                Some(&definitions),
                Some(&registry),
            )
            .await?;

        let sources = registry.collected_sources();
        registry.reset_sources();
        Ok((generated.text, sources))
    }

    /// [`query`](Self::query) under the configured deadline.
    pub async fn query_with_timeout(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResponse> {
        tokio::time::timeout(self.query_timeout, self.query(query, session_id))
            .await
            .map_err(|_| PensumError::Timeout(self.query_timeout.as_secs()))?
    }

    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        self.sessions.delete_session(session_id)
    }

    /// Open a fresh session, dropping `previous` if given.
    ///
    /// Returns the new id and whether the previous session existed.
    pub fn new_session(&self, previous: Option<&str>) -> (String, bool) {
        let cleared = previous.is_some_and(|id| self.sessions.delete_session(id));
        (self.sessions.create_session(), cleared)
    }

    /// Number and titles of indexed courses.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.backend.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{text, tool_use, wants_tools, ScriptedClient};
    use crate::llm::{CompletionRequest, CompletionResponse, LlmClient};
    use crate::search::{ChunkMetadata, CourseOutline, SearchHit, SearchResults};
    use async_trait::async_trait;
    use serde_json::json;

    struct StubBackend;

    #[async_trait]
    impl SearchBackend for StubBackend {
        async fn search(&self, _: &str, _: Option<&str>, _: Option<u32>) -> SearchResults {
            SearchResults::from_hits(vec![SearchHit {
                content: "Servers expose tools.".to_string(),
                metadata: ChunkMetadata {
                    course_title: "MCP".to_string(),
                    lesson_number: Some(1),
                    chunk_index: 0,
                },
                score: 0.8,
            }])
        }

        async fn lesson_link(&self, _: &str, _: u32) -> Result<Option<String>> {
            Ok(Some("https://example.com/mcp/1".to_string()))
        }

        async fn course_outline(&self, _: &str) -> Result<Option<CourseOutline>> {
            Err(PensumError::VectorStore("catalog offline".to_string()))
        }

        async fn course_titles(&self) -> Result<Vec<String>> {
            Ok(vec!["MCP".to_string(), "RAG".to_string()])
        }
    }

    fn system(client: Arc<dyn LlmClient>) -> RagSystem {
        let backend: Arc<dyn SearchBackend> = Arc::new(StubBackend);
        RagSystem::new(
            ResponseGenerator::new(client, &Prompts::default()),
            default_registry(backend.clone()).unwrap(),
            SessionManager::default(),
            backend,
        )
    }

    fn search_call() -> crate::error::Result<CompletionResponse> {
        wants_tools(vec![tool_use(
            "call_1",
            "search_course_content",
            json!({"query": "servers"}),
        )])
    }

    #[tokio::test]
    async fn test_query_collects_sources_and_records_history() {
        let client = ScriptedClient::new(vec![search_call(), text("Servers expose tools.")]);
        let rag = system(client.clone());

        let response = rag.query("What do servers do?", None).await.unwrap();

        assert_eq!(response.answer, "Servers expose tools.");
        assert_eq!(response.session_id, "session_1");
        assert_eq!(
            response.sources,
            vec![
                "<a href=\"https://example.com/mcp/1\" target=\"_blank\" \
                 rel=\"noopener noreferrer\">MCP - Lesson 1</a>"
                    .to_string()
            ]
        );

        let first = &client.requests()[0];
        assert_eq!(
            first.messages[0],
            crate::llm::Message::user_text(
                "Answer this question about course materials: What do servers do?"
            )
        );
        assert_eq!(
            rag.sessions.history("session_1").as_deref(),
            Some("user: What do servers do?\nassistant: Servers expose tools.")
        );
    }

    #[tokio::test]
    async fn test_sources_do_not_leak_between_queries() {
        let client = ScriptedClient::new(vec![
            search_call(),
            text("First"),
            text("General knowledge answer"),
        ]);
        let rag = system(client.clone());

        let first = rag.query("q1", None).await.unwrap();
        assert_eq!(first.sources.len(), 1);

        let second = rag.query("q2", Some(&first.session_id)).await.unwrap();
        assert!(second.sources.is_empty());

        let system_text = &client.requests()[2].system;
        assert!(system_text.ends_with("Previous conversation:\nuser: q1\nassistant: First"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_answered_with_fallback() {
        let client = ScriptedClient::new(vec![wants_tools(vec![tool_use(
            "call_1",
            "get_course_outline",
            json!({"course_name": "MCP"}),
        )])]);
        let rag = system(client);

        let response = rag.query("Outline of MCP?", None).await.unwrap();

        assert_eq!(response.answer, crate::agent::TOOL_FAILURE_FALLBACK);
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn test_llm_fault_degrades_without_history() {
        let client = ScriptedClient::new(vec![Err(PensumError::OpenAI("500".to_string()))]);
        let rag = system(client);
        let session = rag.create_session();

        let response = rag.query("q", Some(&session)).await.unwrap();

        assert_eq!(response.answer, DEGRADED_ANSWER);
        assert!(response.sources.is_empty());
        assert_eq!(rag.sessions.history(&session).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_llm_timeout_propagates() {
        let client = ScriptedClient::new(vec![Err(PensumError::LlmTimeout("deadline".to_string()))]);
        let rag = system(client);

        let err = rag.query("q", None).await.unwrap_err();
        assert!(matches!(err, PensumError::LlmTimeout(_)));
    }

    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _: CompletionRequest) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(PensumError::Llm("too late".to_string()))
        }
    }

    #[tokio::test]
    async fn test_query_deadline_is_a_timeout() {
        let rag = system(Arc::new(SlowClient)).with_query_timeout(Duration::from_millis(20));

        let err = rag.query_with_timeout("q", None).await.unwrap_err();

        assert!(matches!(err, PensumError::Timeout(0)));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_session_management_and_analytics() {
        let rag = system(ScriptedClient::new(Vec::new()));

        let first = rag.create_session();
        let (second, cleared) = rag.new_session(Some(&first));
        assert!(cleared);
        assert_ne!(first, second);

        let (_, cleared) = rag.new_session(Some(&first));
        assert!(!cleared);

        assert!(rag.delete_session(&second));
        assert!(!rag.delete_session(&second));

        let analytics = rag.course_analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 2);
        assert_eq!(analytics.course_titles, vec!["MCP", "RAG"]);
    }

    #[tokio::test]
    async fn test_new_session_never_reuses_client_chosen_id() {
        let rag = system(ScriptedClient::new(vec![text("A1"), text("B1")]));

        let a = rag.query("secret of A", Some("session_1")).await.unwrap();
        let b = rag.query("hello from B", None).await.unwrap();

        assert_eq!(a.session_id, "session_1");
        assert_ne!(b.session_id, "session_1");
        assert_eq!(
            rag.sessions.history("session_1").as_deref(),
            Some("user: secret of A\nassistant: A1")
        );
        assert_eq!(
            rag.sessions.history(&b.session_id).as_deref(),
            Some("user: hello from B\nassistant: B1")
        );
    }
}
