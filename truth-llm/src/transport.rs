// truth-llm/src/transport.rs
// ============================================================================
// Module: LLM Transport
// Description: The Ollama-shaped chat/health wire contract (§6) and the
//              trait abstracting it.
// Purpose: Swap the blocking `reqwest` client used in production for a test
//          double (one trait, one HTTP implementation).
// Dependencies: reqwest::blocking, serde, serde_json, crate::error
// ============================================================================

//! ## Overview
//! §6 fixes the wire shapes: request `{model, messages, stream, options}`,
//! response `{message:{content?, thinking?}, eval_count?}`, against
//! `${endpoint}/api/chat` (chat) or `${endpoint}/v1/models` (health).
//! [`HttpLlmTransport`] is the production implementation; tests substitute
//! any other [`LlmTransport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::error::HealthStatus;
use crate::error::TransportError;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// One chat message (`system` or `user`, per §4.2 step 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"` or `"user"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a `system` message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_owned(),
            content: content.into(),
        }
    }

    /// Builds a `user` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }
}

/// Generation options carried on a chat request (§6: `options:{temperature,
/// num_predict}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: f64,
    /// Output token budget (§4.2 step 4: "a large output budget").
    pub num_predict: u32,
}

/// A chat-completion request (§6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Base endpoint, e.g. `https://ollama.com`.
    #[serde(skip)]
    pub endpoint: String,
    /// Bearer token, when configured.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Ordered `[system, user]` messages.
    pub messages: Vec<ChatMessage>,
    /// Always `false` (§4.2 step 4: no server-sent streaming).
    pub stream: bool,
    /// Generation options.
    pub options: ChatOptions,
}

/// The `message` object of a chat response (§6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponseMessage {
    /// Primary output field.
    #[serde(default)]
    pub content: Option<String>,
    /// Secondary field some thinking-style models emit JSON into instead.
    #[serde(default)]
    pub thinking: Option<String>,
}

/// A chat-completion response (§6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// The model's message.
    pub message: ChatResponseMessage,
    /// Token count, when the provider reports one.
    #[serde(default)]
    pub eval_count: Option<u64>,
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Abstracts the outbound LLM call so the runner can be tested without a
/// network round trip.
pub trait LlmTransport: Send + Sync {
    /// Issues a chat-completion request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on any network, timeout, auth, or
    /// server-side failure.
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Probes provider health (§4.10: `/api/tags` for local, `/v1/models`
    /// for cloud).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on probe failure; callers typically
    /// convert this into a [`HealthStatus`] rather than propagating it.
    fn health(&self, endpoint: &str, api_key: Option<&str>) -> Result<HealthStatus, TransportError>;
}

// ============================================================================
// SECTION: HTTP Implementation
// ============================================================================

/// Production [`LlmTransport`] backed by a blocking `reqwest` client.
pub struct HttpLlmTransport {
    client: Client,
}

impl HttpLlmTransport {
    /// Builds a transport with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unknown`] if the underlying HTTP client
    /// cannot be constructed (e.g. TLS backend initialization failure).
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("truth-pipeline/0.1")
            .build()
            .map_err(|err| TransportError::Unknown(err.to_string()))?;
        Ok(Self { client })
    }

    fn classify_reqwest_error(err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Dns(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }

    fn classify_status(status: reqwest::StatusCode) -> Option<TransportError> {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Some(TransportError::RateLimited)
        } else if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            Some(TransportError::Auth)
        } else if status.is_server_error() {
            Some(TransportError::ServerError(status.as_u16()))
        } else if status.is_success() {
            None
        } else {
            Some(TransportError::Unknown(format!("unexpected status {status}")))
        }
    }
}

impl LlmTransport for HttpLlmTransport {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/api/chat", request.endpoint.trim_end_matches('/'));
        let mut builder = self.client.post(url).json(request);
        if let Some(ref key) = request.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().map_err(|err| Self::classify_reqwest_error(&err))?;
        let status = response.status();
        if let Some(error) = Self::classify_status(status) {
            return Err(error);
        }
        response.json::<ChatResponse>().map_err(|err| TransportError::Unknown(err.to_string()))
    }

    fn health(&self, endpoint: &str, api_key: Option<&str>) -> Result<HealthStatus, TransportError> {
        let url = format!("{}/v1/models", endpoint.trim_end_matches('/'));
        let mut builder = self.client.get(url);
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key);
        }
        match builder.send() {
            Ok(response) => match Self::classify_status(response.status()) {
                Some(error) => Ok(HealthStatus::from(&error)),
                None => Ok(HealthStatus::Ok),
            },
            Err(err) => Ok(HealthStatus::from(&Self::classify_reqwest_error(&err))),
        }
    }
}
