

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::EmbeddingConfig;
use crate::search::cache::QueryEmbeddingCache;


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Skill-Bridge backend `/vectorize` endpoint.
    #[default]
    Vectorize,
    Ollama,
}


#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Turns free text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;


    fn provider_name(&self) -> &str;


    fn model_name(&self) -> &str;
}


#[async_trait]
impl EmbeddingClient for Arc<dyn EmbeddingClient> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}


#[derive(Serialize)]
struct VectorizeRequest<'a> {
    query_text: &'a str,
    limit: u32,
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}


pub struct HttpEmbeddingClient {
    provider: EmbeddingProvider,
    provider_label: String,
    base_url: String,
    model: String,
    client: Client,
    cache: Option<Arc<QueryEmbeddingCache>>,
}

impl HttpEmbeddingClient {

    pub fn new(
        config: &EmbeddingConfig,
        cache: Option<Arc<QueryEmbeddingCache>>,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(
            "HttpEmbeddingClient initialized: provider={}, url={}, model={}, cache={}",
            config.provider,
            config.base_url,
            config.model,
            cache.is_some()
        );

        Ok(Self {
            provider: config.provider,
            provider_label: config.provider.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            cache,
        })
    }

    async fn request_vectorize(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = VectorizeRequest {
            query_text: text,
            limit: 1,
        };

        let response = self
            .client
            .post(format!("{}/vectorize", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn request_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }


    pub fn cache(&self) -> Option<&QueryEmbeddingCache> {
        self.cache.as_deref()
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let cache_key = self
            .cache
            .as_ref()
            .map(|_| QueryEmbeddingCache::make_key(&self.provider_label, &self.model, text));

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(cached) = cache.get(key) {
                debug!("Cache HIT for: {}", crate::preview(text, 50));
                return Ok(cached);
            }
        }

        let embedding = match self.provider {
            EmbeddingProvider::Vectorize => self.request_vectorize(text).await?,
            EmbeddingProvider::Ollama => self.request_ollama(text).await?,
        };

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "embedding endpoint returned an empty vector".to_string(),
            ));
        }

        debug!("Embedded '{}' dims={}", crate::preview(text, 50), embedding.len());

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.set(key, embedding.clone());
        }

        Ok(embedding)
    }

    fn provider_name(&self) -> &str {
        &self.provider_label
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(server: &MockServer, provider: EmbeddingProvider) -> EmbeddingConfig {
        EmbeddingConfig {
            provider,
            base_url: server.base_url(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_vectorize_request_shape() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vectorize")
                    .json_body(json!({"query_text": "rust compilers", "limit": 1}));
                then.status(200).json_body(json!({"embedding": [0.1, 0.2, 0.3]}));
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&config_for(&server, EmbeddingProvider::Vectorize), None)
                .unwrap();
        let embedding = client.embed("  rust compilers ").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_ollama_request_shape() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body(json!({"model": "nomic-embed-text", "prompt": "pytorch"}));
                then.status(200).json_body(json!({"embedding": [1.0, 0.0]}));
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&config_for(&server, EmbeddingProvider::Ollama), None)
                .unwrap();
        let embedding = client.embed("pytorch").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![1.0, 0.0]);
        assert_eq!(client.provider_name(), "ollama");
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/vectorize");
                then.status(503);
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&config_for(&server, EmbeddingProvider::Vectorize), None)
                .unwrap();
        let err = client.embed("react").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Http(_)));
    }

    #[tokio::test]
    async fn test_empty_vector_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/vectorize");
                then.status(200).json_body(json!({"embedding": []}));
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&config_for(&server, EmbeddingProvider::Vectorize), None)
                .unwrap();
        let err = client.embed("react").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vectorize");
                then.status(200).json_body(json!({"embedding": [1.0]}));
            })
            .await;

        let client =
            HttpEmbeddingClient::new(&config_for(&server, EmbeddingProvider::Vectorize), None)
                .unwrap();
        let err = client.embed("   ").await.unwrap_err();

        assert!(matches!(err, EmbeddingError::EmptyText));
        assert_eq!(mock.calls_async().await, 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vectorize");
                then.status(200).json_body(json!({"embedding": [0.5, 0.5]}));
            })
            .await;

        let cache = Arc::new(QueryEmbeddingCache::new(16, 60));
        let client = HttpEmbeddingClient::new(
            &config_for(&server, EmbeddingProvider::Vectorize),
            Some(cache.clone()),
        )
        .unwrap();

        let first = client.embed("machine learning").await.unwrap();
        let second = client.embed("machine learning").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls_async().await, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("ollama".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Ollama);
        assert_eq!(EmbeddingProvider::Vectorize.to_string(), "vectorize");
    }
}
