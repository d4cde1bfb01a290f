//! Configuration module for Pensum.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    RagSettings, Settings, VectorStoreSettings,
};
