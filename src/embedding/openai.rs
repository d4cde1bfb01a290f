//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{PensumError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder for the configured model and dimensions.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self::with_client(
            create_client()?,
            &settings.model,
            settings.dimensions as usize,
        ))
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| PensumError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| PensumError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut data = response.data;
            if data.len() != chunk.len() {
                return Err(PensumError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    data.len()
                )));
            }
            data.sort_by_key(|e| e.index);
            all_embeddings.extend(data.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_dimensions_follow_settings() {
        let settings = EmbeddingSettings {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            ..Default::default()
        };
        let embedder = OpenAIEmbedder::from_settings(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_api() {
        let embedder = OpenAIEmbedder::from_settings(&EmbeddingSettings::default()).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
