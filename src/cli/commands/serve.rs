//! HTTP API server for the course assistant.
//!
//! Exposes query, session and catalog endpoints over a shared [`RagSystem`].

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PensumError;
use crate::orchestrator::Orchestrator;
use crate::rag::{CourseAnalytics, QueryResponse, RagSystem};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    system: RagSystem,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings.clone())?;

    if let Some(docs) = settings.docs_dir() {
        match orchestrator.add_course_folder(&docs, false).await {
            Ok((courses, chunks)) => {
                info!("Loaded {} courses with {} chunks from {}", courses, chunks, docs.display())
            }
            Err(e) => Output::warning(&format!("Could not load {}: {}", docs.display(), e)),
        }
    }

    let system = RagSystem::with_index(
        &settings,
        orchestrator.embedder(),
        orchestrator.vector_store(),
    )?;
    let app = router(Arc::new(AppState { system }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Pensum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("New session", "POST /api/session/new");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/session/new", post(new_session))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize, Default)]
struct NewSessionRequest {
    #[serde(default)]
    previous_session_id: Option<String>,
}

#[derive(Serialize)]
struct NewSessionResponse {
    session_id: String,
    cleared_previous: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: &PensumError) -> Response {
    let status = if e.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error!("Request failed: {}", e);
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    match state
        .system
        .query_with_timeout(&req.query, req.session_id.as_deref())
        .await
    {
        Ok(response) => Json::<QueryResponse>(response).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn new_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<NewSessionRequest>>,
) -> Json<NewSessionResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let (session_id, cleared_previous) =
        state.system.new_session(req.previous_session_id.as_deref());
    Json(NewSessionResponse {
        session_id,
        cleared_previous,
    })
}

async fn courses(State(state): State<Arc<AppState>>) -> Response {
    match state.system.course_analytics().await {
        Ok(analytics) => Json::<CourseAnalytics>(analytics).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ResponseGenerator;
    use crate::config::Prompts;
    use crate::error::Result;
    use crate::llm::testing::{text, ScriptedClient};
    use crate::rag::default_registry;
    use crate::search::{CourseOutline, SearchBackend, SearchResults};
    use crate::session::SessionManager;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct CatalogBackend;

    #[async_trait]
    impl SearchBackend for CatalogBackend {
        async fn search(&self, _: &str, _: Option<&str>, _: Option<u32>) -> SearchResults {
            SearchResults::default()
        }

        async fn lesson_link(&self, _: &str, _: u32) -> Result<Option<String>> {
            Ok(None)
        }

        async fn course_outline(&self, _: &str) -> Result<Option<CourseOutline>> {
            Ok(None)
        }

        async fn course_titles(&self) -> Result<Vec<String>> {
            Ok(vec!["MCP".to_string(), "RAG".to_string()])
        }
    }

    /// Serve a system answering with `answers` on a loopback port.
    async fn serve(answers: &[&str]) -> String {
        let backend: Arc<dyn SearchBackend> = Arc::new(CatalogBackend);
        let client = ScriptedClient::new(answers.iter().map(|a| text(a)).collect());
        let system = RagSystem::new(
            ResponseGenerator::new(client, &Prompts::default()),
            default_registry(backend.clone()).unwrap(),
            SessionManager::default(),
            backend,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(AppState { system })))
                .await
                .unwrap();
        });
        format!("http://{}", addr)
    }

    fn http() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_query_without_session_opens_one() {
        let base = serve(&["MCP is a protocol."]).await;

        let response = http()
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "What is MCP?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["answer"], "MCP is a protocol.");
        assert_eq!(body["sources"], json!([]));
        assert_eq!(body["session_id"], "session_1");
    }

    #[tokio::test]
    async fn test_query_reuses_given_session() {
        let base = serve(&["first", "second"]).await;
        let client = http();

        for answer in ["first", "second"] {
            let body: Value = client
                .post(format!("{}/api/query", base))
                .json(&json!({"query": "q", "session_id": "abc"}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(body["session_id"], "abc");
            assert_eq!(body["answer"], answer);
        }
    }

    #[tokio::test]
    async fn test_invalid_query_payload_is_rejected() {
        let base = serve(&[]).await;

        let response = http()
            .post(format!("{}/api/query", base))
            .json(&json!({"session_id": "abc"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_courses_and_sessions_endpoints() {
        let base = serve(&["answer"]).await;
        let client = http();

        let courses: Value = client
            .get(format!("{}/api/courses", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            courses,
            json!({"total_courses": 2, "course_titles": ["MCP", "RAG"]})
        );

        let first: Value = client
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "q"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let renewed: Value = client
            .post(format!("{}/api/session/new", base))
            .json(&json!({"previous_session_id": first["session_id"]}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(renewed["cleared_previous"], true);
        assert_ne!(renewed["session_id"], first["session_id"]);

        let health = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);
    }

    #[test]
    fn test_timeouts_map_to_gateway_timeout() {
        assert_eq!(
            error_response(&PensumError::Timeout(90)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_response(&PensumError::LlmTimeout("slow".to_string())).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_response(&PensumError::VectorStore("locked".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
