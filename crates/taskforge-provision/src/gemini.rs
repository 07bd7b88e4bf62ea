//! Gemini-style embedding backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use taskforge_core::{defaults, EmbeddingBackend, Error, Result};

use crate::config::{env_or, parse_env_or, required_env};

/// Configuration for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Load from `GEMINI_API_KEY` (required), `GEMINI_API_BASE`,
    /// `EMBED_MODEL` and `EMBED_DIMENSION`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: required_env("GEMINI_API_KEY")?,
            base_url: env_or("GEMINI_API_BASE", defaults::GEMINI_API_BASE),
            model: env_or("EMBED_MODEL", defaults::EMBED_MODEL),
            dimension: parse_env_or("EMBED_DIMENSION", defaults::EMBED_DIMENSION)?,
            timeout_secs: parse_env_or("EMBED_TIMEOUT_SECS", defaults::EMBED_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Embedding backend speaking the `embedContent` API.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    /// Fully qualified model resource name, `models/{model}`.
    model_resource: String,
    dimension: usize,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            model = %config.model,
            dimension = config.dimension,
            "Initializing embedding backend"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model_resource: format!("models/{}", config.model),
            model: config.model,
            dimension: config.dimension,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn request_for<'a>(&'a self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model_resource,
            content: Content {
                parts: [Part { text }],
            },
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(format!(
                "{}/v1beta/{}:{}",
                self.base_url, self.model_resource, action
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))
    }

    fn check_dimension(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                values.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    #[instrument(
        skip(self, texts),
        fields(
            subsystem = "inference",
            component = "gemini",
            op = "embed_texts",
            model = %self.model,
            input_count = texts.len()
        )
    )]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();

        let vectors: Vec<Vec<f32>> = if let [text] = texts {
            let response: EmbedContentResponse =
                self.post("embedContent", &self.request_for(text)).await?;
            vec![response.embedding.values]
        } else {
            let body = BatchEmbedRequest {
                requests: texts.iter().map(|t| self.request_for(t)).collect(),
            };
            let response: BatchEmbedResponse = self.post("batchEmbedContents", &body).await?;
            response.embeddings.into_iter().map(|e| e.values).collect()
        };

        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        for values in &vectors {
            self.check_dimension(values)?;
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            result_count = vectors.len(),
            duration_ms = elapsed,
            "Embedding complete"
        );
        if elapsed > 5000 {
            warn!(
                duration_ms = elapsed,
                input_count = texts.len(),
                slow = true,
                "Slow embedding operation"
            );
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
