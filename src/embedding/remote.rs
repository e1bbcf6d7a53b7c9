//! Remote embedding providers reached over HTTP.
//!
//! Both adapters treat the provider as the failure-prone boundary: calls get a
//! bounded timeout and a small bounded retry budget with exponential backoff.
//! When the budget is exhausted the whole batch fails, so surviving chunks can
//! never drift out of alignment with their vectors.

use super::{EmbeddingClient, EmbeddingError, check_batch};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Embedding client for a local or remote Ollama runtime.
///
/// Ollama's embeddings endpoint takes one prompt per request, so a batch is
/// submitted as sequential calls in chunk order.
pub struct OllamaEmbeddingClient {
    http: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_retries: usize,
}

impl OllamaEmbeddingClient {
    /// Construct a client for the given Ollama base URL and model.
    pub fn new(base_url: String, model: String, dimension: usize, max_retries: usize) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model,
            dimension,
            max_retries: max_retries.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let mut embeddings = Vec::with_capacity(expected);

        for text in &texts {
            let body = json!({ "model": self.model, "prompt": text });
            let response = post_json_with_retries(
                &self.http,
                &self.endpoint,
                None,
                &body,
                self.max_retries,
            )
            .await?;
            let parsed: OllamaEmbeddingResponse = serde_json::from_value(response)
                .map_err(|err| EmbeddingError::CallFailed(err.to_string()))?;
            embeddings.push(parsed.embedding);
        }

        check_batch(&embeddings, expected, self.dimension)?;
        Ok(embeddings)
    }
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding client for OpenAI-compatible `/v1/embeddings` endpoints.
pub struct OpenAiEmbeddingClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    max_retries: usize,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for the given endpoint base URL and model.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
        max_retries: usize,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimension,
            max_retries: max_retries.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let body = json!({ "model": self.model, "input": texts });
        let response = post_json_with_retries(
            &self.http,
            &self.endpoint,
            self.api_key.as_deref(),
            &body,
            self.max_retries,
        )
        .await?;

        let mut parsed: OpenAiEmbeddingResponse = serde_json::from_value(response)
            .map_err(|err| EmbeddingError::CallFailed(err.to_string()))?;
        // Responses are not guaranteed to arrive in input order.
        parsed.data.sort_by_key(|entry| entry.index);
        let embeddings: Vec<Vec<f32>> = parsed
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect();

        check_batch(&embeddings, expected, self.dimension)?;
        Ok(embeddings)
    }
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingEntry>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// POST a JSON body, retrying transport errors and 429/5xx responses with
/// exponential backoff until the attempt budget is spent.
async fn post_json_with_retries(
    http: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    max_retries: usize,
) -> Result<Value, EmbeddingError> {
    let mut attempt = 0_usize;
    loop {
        attempt += 1;
        let mut request = http.post(url).timeout(REQUEST_TIMEOUT).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|err| EmbeddingError::CallFailed(err.to_string()));
                }

                let text = response.text().await.unwrap_or_default();
                if retryable_status(status) && attempt < max_retries {
                    tracing::warn!(url, %status, attempt, "Embedding call failed; retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                return Err(EmbeddingError::CallFailed(format!(
                    "{url} returned {status}: {text}"
                )));
            }
            Err(err) => {
                if attempt < max_retries {
                    tracing::warn!(url, error = %err, attempt, "Embedding call errored; retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                return Err(EmbeddingError::CallFailed(err.to_string()));
            }
        }
    }
}

fn backoff_delay(attempt: usize) -> Duration {
    BASE_BACKOFF * 2_u32.saturating_pow(attempt.saturating_sub(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn ollama_client_embeds_each_text_in_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200)
                    .json_body(json!({ "embedding": [0.1, 0.2, 0.3] }));
            })
            .await;

        let client = OllamaEmbeddingClient::new(
            server.base_url(),
            "nomic-embed-text".to_string(),
            3,
            2,
        );
        let vectors = client
            .generate_embeddings(vec!["alpha".to_string(), "beta".to_string()])
            .await
            .expect("embeddings");

        assert_eq!(mock.hits(), 2);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn ollama_client_fails_batch_after_retry_budget() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(500).body("model crashed");
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(server.base_url(), "nomic-embed-text".to_string(), 3, 3);
        let error = client
            .generate_embeddings(vec!["alpha".to_string()])
            .await
            .unwrap_err();

        assert_eq!(mock.hits(), 3);
        assert!(matches!(error, EmbeddingError::CallFailed(_)));
    }

    #[tokio::test]
    async fn ollama_client_does_not_retry_client_errors() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(404).body("unknown model");
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(server.base_url(), "missing-model".to_string(), 3, 3);
        let error = client
            .generate_embeddings(vec!["alpha".to_string()])
            .await
            .unwrap_err();

        assert_eq!(mock.hits(), 1);
        assert!(matches!(error, EmbeddingError::CallFailed(_)));
    }

    #[tokio::test]
    async fn openai_client_sorts_results_by_index() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [1.0, 1.0] },
                        { "index": 0, "embedding": [0.0, 0.0] }
                    ]
                }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            server.base_url(),
            Some("secret".to_string()),
            "text-embedding-3-small".to_string(),
            2,
            1,
        );
        let vectors = client
            .generate_embeddings(vec!["first".to_string(), "second".to_string()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors[0], vec![0.0, 0.0]);
        assert_eq!(vectors[1], vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn openai_client_rejects_wrong_dimension() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200).json_body(json!({
                    "data": [ { "index": 0, "embedding": [0.5] } ]
                }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            server.base_url(),
            None,
            "text-embedding-3-small".to_string(),
            4,
            1,
        );
        let error = client
            .generate_embeddings(vec!["first".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 1
            }
        ));
    }
}
