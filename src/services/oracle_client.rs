use std::time::{Duration as StdDuration, Instant};

use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, OracleErrorCode};

/// The external text-generation oracle. The planning service takes this as
/// an injected trait object so tests can script replies without HTTP.
#[async_trait::async_trait]
pub trait StudyOracle: Send + Sync {
    /// One text completion: system prompt + user prompt in, raw reply text
    /// out. The reply is expected to contain a JSON array of sessions but is
    /// returned untouched; extraction is the plan generator's job.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String>;
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub http_timeout: StdDuration,
}

impl OracleConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("PREPCAL_ORACLE_API_KEY").ok();
        let api_base_url = std::env::var("PREPCAL_ORACLE_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://api.deepseek.com".to_string());
        let model = std::env::var("PREPCAL_ORACLE_MODEL")
            .ok()
            .unwrap_or_else(|| "deepseek-chat".to_string());

        Self {
            api_key,
            api_base_url,
            model,
            http_timeout: StdDuration::from_secs(30),
        }
    }
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug)]
pub struct ChatOracleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleProbe {
    pub model: String,
    pub latency_ms: u128,
}

impl ChatOracleClient {
    /// Missing API key is an input error surfaced immediately; the retry
    /// loop never starts without a credential.
    pub fn try_new(config: &OracleConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::oracle(OracleErrorCode::MissingApiKey, "oracle API key not configured")
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build oracle HTTP client: {err}")))?;

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{}/v1/chat/completions", base_url);

        Ok(Self {
            client,
            api_key,
            base_url,
            endpoint,
            model: config.model.clone(),
        })
    }

    /// Health probe against the models listing endpoint.
    pub async fn ping(&self) -> AppResult<OracleProbe> {
        let url = format!("{}/v1/models", self.base_url);
        let correlation_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    Ok(OracleProbe {
                        model: self.model.clone(),
                        latency_ms: start.elapsed().as_millis(),
                    })
                } else {
                    warn!(
                        target: "app::oracle",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        "oracle ping returned non-success status"
                    );
                    Err(Self::map_http_error(status, correlation_id.as_str()))
                }
            }
            Err(err) => {
                warn!(
                    target: "app::oracle",
                    correlation_id = %correlation_id,
                    "oracle ping request failed"
                );
                Err(Self::error_from_reqwest(err, correlation_id.as_str()))
            }
        }
    }

    fn build_request_body(&self, system_prompt: &str, user_prompt: &str) -> JsonValue {
        json!({
            "model": self.model,
            "temperature": 0.3,
            "top_p": 0.9,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ]
        })
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        match status {
            StatusCode::UNAUTHORIZED => AppError::oracle_with_details(
                OracleErrorCode::MissingApiKey,
                "oracle API key invalid or unauthorized",
                Some(correlation_id),
                None,
            ),
            StatusCode::FORBIDDEN => AppError::oracle_with_details(
                OracleErrorCode::Forbidden,
                "oracle API access forbidden",
                Some(correlation_id),
                None,
            ),
            StatusCode::TOO_MANY_REQUESTS => AppError::oracle_with_details(
                OracleErrorCode::RateLimited,
                "oracle rate limit exceeded",
                Some(correlation_id),
                None,
            ),
            status if status.is_server_error() => AppError::oracle_with_details(
                OracleErrorCode::Unavailable,
                format!("oracle temporarily unavailable (status {})", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            StatusCode::BAD_REQUEST => AppError::oracle_with_details(
                OracleErrorCode::InvalidRequest,
                "oracle rejected the request format",
                Some(correlation_id),
                None,
            ),
            StatusCode::NOT_FOUND => AppError::oracle_with_details(
                OracleErrorCode::InvalidRequest,
                "oracle endpoint not found",
                Some(correlation_id),
                None,
            ),
            status => AppError::oracle_with_details(
                OracleErrorCode::Unknown,
                format!("oracle returned unexpected status {}", status.as_u16()),
                Some(correlation_id),
                None,
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        if err.is_timeout() {
            AppError::oracle_with_details(
                OracleErrorCode::HttpTimeout,
                "oracle request timed out",
                Some(correlation_id),
                None,
            )
        } else if err.is_connect() {
            AppError::oracle_with_details(
                OracleErrorCode::Unavailable,
                "oracle connection failed",
                Some(correlation_id),
                None,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            AppError::oracle_with_details(
                OracleErrorCode::Unknown,
                format!("oracle request failed: {err}"),
                Some(correlation_id),
                None,
            )
        }
    }
}

#[async_trait::async_trait]
impl StudyOracle for ChatOracleClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = self.build_request_body(system_prompt, user_prompt);

        debug!(
            target: "app::oracle",
            correlation_id = %correlation_id,
            prompt_len = user_prompt.len(),
            "invoking oracle"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let latency_ms = start.elapsed().as_millis();

                if !status.is_success() {
                    warn!(
                        target: "app::oracle",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        latency_ms,
                        "oracle returned non-success status"
                    );
                    return Err(Self::map_http_error(status, correlation_id.as_str()));
                }

                let body: JsonValue = resp.json().await.map_err(|err| {
                    AppError::oracle_with_details(
                        OracleErrorCode::InvalidResponse,
                        "failed to decode oracle response body",
                        Some(correlation_id.as_str()),
                        Some(json!({ "reason": err.to_string() })),
                    )
                })?;

                let content = body
                    .pointer("/choices/0/message/content")
                    .and_then(|value| value.as_str())
                    .ok_or_else(|| {
                        AppError::oracle_with_details(
                            OracleErrorCode::InvalidResponse,
                            "oracle response missing message.content field",
                            Some(correlation_id.as_str()),
                            Some(json!({ "reason": "missing_message_content" })),
                        )
                    })?;

                debug!(
                    target: "app::oracle",
                    correlation_id = %correlation_id,
                    latency_ms,
                    response_len = content.len(),
                    "oracle responded"
                );

                Ok(content.to_string())
            }
            Err(err) => {
                warn!(
                    target: "app::oracle",
                    correlation_id = %correlation_id,
                    "oracle request error"
                );
                Err(Self::error_from_reqwest(err, correlation_id.as_str()))
            }
        }
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the
    /// public API surface.
    pub fn map_http_error(status: StatusCode) -> AppError {
        ChatOracleClient::map_http_error(status, "test-correlation-id")
    }
}
