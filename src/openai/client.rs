use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatRequest, EmbeddingRequest,
    EmbeddingResponse, ErrorEnvelope,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY not set. Create one at https://platform.openai.com/api-keys")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One chat-completion round-trip. History and prompt assembly belong to the caller.
pub trait ChatModel {
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, OpenAiError>> + Send;
}

/// Text embedding. Output vectors are in input order.
pub trait Embedder {
    fn embed(
        &self,
        inputs: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, OpenAiError>> + Send;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Client for an OpenAI-compatible `/chat/completions` and `/embeddings` API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
    embedding_model: String,
    backoff_ms: u64,
}

impl OpenAiClient {
    pub fn new(
        http: Client,
        api_key: Option<&str>,
        base_url: &str,
        embedding_model: &str,
    ) -> Result<Self, OpenAiError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(OpenAiError::ApiKeyNotSet)?;
        Ok(Self {
            http,
            api_key: ApiKey(api_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.to_string(),
            backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            base_url: base_url.to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            backoff_ms: 1,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, OpenAiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_status(status, &text);
            warn!(%status, error = %err, path, "OpenAI API error");
            return Err(err);
        }

        Ok(response.json().await?)
    }

    /// Runs `op` until it succeeds, fails permanently, or the retry budget is spent.
    async fn retrying<T, F, Fut>(&self, mut op: F) -> Result<T, OpenAiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OpenAiError>>,
    {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(self.backoff_ms, attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(OpenAiError::RateLimited))
    }
}

impl ChatModel for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, OpenAiError> {
        // gpt-5 family models reject an explicit temperature.
        let temperature = if request.model.starts_with("gpt-5") {
            None
        } else {
            Some(request.temperature)
        };
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature,
        };

        let response: ChatCompletionResponse = self
            .retrying(|| self.post_json("/chat/completions", &body))
            .await?;
        debug!(model = %request.model, choices = response.choices.len(), "chat completion done");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(OpenAiError::EmptyResponse)
    }
}

impl Embedder for OpenAiClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, OpenAiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };

        let mut response: EmbeddingResponse = self
            .retrying(|| self.post_json("/embeddings", &body))
            .await?;
        debug!(model = %self.embedding_model, inputs = inputs.len(), "embeddings done");

        if response.data.len() != inputs.len() {
            return Err(OpenAiError::Api {
                code: 0,
                message: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    response.data.len()
                ),
            });
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

fn is_retriable(e: &OpenAiError) -> bool {
    matches!(
        e,
        OpenAiError::RateLimited
            | OpenAiError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(initial_ms: u64, attempt: u32) -> u64 {
    let base = initial_ms * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_status(status: StatusCode, body: &str) -> OpenAiError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return classify_api_error(status.as_u16(), &envelope.error);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return OpenAiError::RateLimited;
    }
    let end = body.floor_char_boundary(200);
    OpenAiError::Api {
        code: status.as_u16(),
        message: format!("HTTP {status}: {}", &body[..end]),
    }
}

fn classify_api_error(code: u16, err: &ApiError) -> OpenAiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match code {
        _ if err.is_quota() => OpenAiError::QuotaExhausted(message),
        429 => OpenAiError::RateLimited,
        code => OpenAiError::Api { code, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(kind: Option<&str>, code: Option<&str>) -> ApiError {
        ApiError {
            message: Some("boom".into()),
            kind: kind.map(Into::into),
            code: code.map(|c| serde_json::Value::String(c.into())),
        }
    }

    #[test]
    fn classify_429_as_rate_limited() {
        let err = api_error(Some("requests"), Some("rate_limit_exceeded"));
        assert!(matches!(
            classify_api_error(429, &err),
            OpenAiError::RateLimited
        ));
    }

    #[test]
    fn classify_insufficient_quota_as_quota_exhausted() {
        let err = api_error(Some("insufficient_quota"), Some("insufficient_quota"));
        assert!(matches!(
            classify_api_error(429, &err),
            OpenAiError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn classify_401_as_generic_api_error() {
        let err = api_error(Some("invalid_request_error"), Some("invalid_api_key"));
        match classify_api_error(401, &err) {
            OpenAiError::Api { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn unstructured_body_is_truncated() {
        let body = "é".repeat(300);
        match classify_status(StatusCode::BAD_GATEWAY, &body) {
            OpenAiError::Api { code, message } => {
                assert_eq!(code, 502);
                assert!(message.len() < 250, "got {} bytes", message.len());
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = OpenAiClient::new(Client::new(), Some("   "), DEFAULT_BASE_URL, "m").unwrap_err();
        assert!(matches!(err, OpenAiError::ApiKeyNotSet));
        let err = OpenAiClient::new(Client::new(), None, DEFAULT_BASE_URL, "m").unwrap_err();
        assert!(matches!(err, OpenAiError::ApiKeyNotSet));
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let client =
            OpenAiClient::new(Client::new(), Some("sk-secret"), DEFAULT_BASE_URL, "m").unwrap();
        let printed = format!("{client:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn backoff_stays_within_equal_jitter_bounds() {
        for attempt in 0..3 {
            let base = 1000 * 2u64.pow(attempt);
            let delay = jittered_backoff(1000, attempt);
            assert!(delay >= base / 2 && delay < base, "attempt {attempt}: {delay}");
        }
    }
}
