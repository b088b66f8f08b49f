//! Gateway to the external generative text service.
//!
//! Extraction and generative rendering both go through the [`GenerativeClient`]
//! trait so the pipeline can run against the HTTP client in production and a
//! scripted client in tests and the CLI demo. Every call carries a timeout; the
//! callers own retry policy.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenAiConfig;

/// One synchronous request to the generative service.
#[derive(Debug, Clone)]
pub struct GenerativeRequest {
    pub prompt: String,
    pub system: String,
    pub temperature: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerativeError {
    #[error("generative service timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("unable to reach generative service at {0}")]
    Connection(String),
    #[error("generative service returned status {status}: {body}")]
    Service { status: u16, body: String },
    #[error("malformed generative response: {0}")]
    Malformed(String),
}

impl GenerativeError {
    /// Transient faults worth retrying with bounded backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerativeError::Timeout { .. }
                | GenerativeError::Connection(_)
                | GenerativeError::Service { .. }
        )
    }
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, request: GenerativeRequest) -> Result<String, GenerativeError>;
}

#[async_trait]
impl<G: GenerativeClient + ?Sized> GenerativeClient for std::sync::Arc<G> {
    async fn generate(&self, request: GenerativeRequest) -> Result<String, GenerativeError> {
        self.as_ref().generate(request).await
    }
}

/// Request body for the `/api/generate` endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponseBody {
    response: String,
}

/// HTTP client for an Ollama-style generative endpoint.
pub struct HttpGenerativeClient {
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpGenerativeClient {
    pub fn new(config: &GenAiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GenerativeClient for HttpGenerativeClient {
    async fn generate(&self, request: GenerativeRequest) -> Result<String, GenerativeError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequestBody {
            model: &self.model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GenerativeError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else if err.is_connect() {
                    GenerativeError::Connection(self.base_url.clone())
                } else {
                    GenerativeError::Malformed(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerativeError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponseBody = response
            .json()
            .await
            .map_err(|err| GenerativeError::Malformed(err.to_string()))?;

        Ok(parsed.response)
    }
}

/// Scripted client used by the demo command and tests.
///
/// Queued responses are returned in order; once the queue drains, every call
/// yields the default response.
pub struct ScriptedGenerativeClient {
    queue: Mutex<VecDeque<Result<String, GenerativeError>>>,
    default_response: String,
}

impl ScriptedGenerativeClient {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_response: default_response.into(),
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.queue
            .lock()
            .expect("scripted queue mutex poisoned")
            .push_back(Ok(response.into()));
    }

    pub fn push_failure(&self, error: GenerativeError) {
        self.queue
            .lock()
            .expect("scripted queue mutex poisoned")
            .push_back(Err(error));
    }
}

#[async_trait]
impl GenerativeClient for ScriptedGenerativeClient {
    async fn generate(&self, _request: GenerativeRequest) -> Result<String, GenerativeError> {
        let next = self
            .queue
            .lock()
            .expect("scripted queue mutex poisoned")
            .pop_front();
        match next {
            Some(result) => result,
            None => Ok(self.default_response.clone()),
        }
    }
}
