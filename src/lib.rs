//! Pensum - question answering over course materials
//!
//! Pensum indexes course documents and answers questions about them with an
//! LLM that may call two tools: a semantic content search and a course
//! outline lookup. Each query runs at most two tool rounds before a final,
//! tool-free answer is forced.
//!
//! # Architecture
//!
//! - `config` - Settings and prompts
//! - `chunking` - Course file parsing and sentence-window chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector storage (SQLite or in-memory)
//! - `orchestrator` - Ingestion pipeline
//! - `search` - Search backend over the vector store
//! - `tools` - Tool trait, registry and the course tools
//! - `llm` - Provider-neutral chat model interface
//! - `agent` - The bounded tool-calling loop
//! - `session` - Conversation history
//! - `rag` - Query façade tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::orchestrator::Orchestrator;
//! use pensum::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings.clone())?;
//!     orchestrator
//!         .add_course_folder(std::path::Path::new("docs"), false)
//!         .await?;
//!
//!     let system = RagSystem::with_index(
//!         &settings,
//!         orchestrator.embedder(),
//!         orchestrator.vector_store(),
//!     )?;
//!     let response = system
//!         .query("What does lesson 1 of the MCP course cover?", None)
//!         .await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod search;
pub mod session;
pub mod tools;
pub mod vector_store;

pub use error::{PensumError, Result};
