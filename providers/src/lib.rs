//! Chat model transport with streaming support.
//!
//! # Architecture
//!
//! - [`send_message`] - Unified entry point that dispatches on [`ChatModel`]
//! - [`openai`] - OpenAI Responses API client (SSE streaming)
//! - [`replay`] - Replays a saved response as a fragment stream
//!
//! All transports emit events through a [`tokio::sync::mpsc::Sender<StreamEvent>`]
//! channel, so the caller processes text as it arrives.
//!
//! # Streaming Events
//!
//! | Event | Description |
//! |-------|-------------|
//! | `TextDelta` | Incremental text content from the model |
//! | `Done` | Stream completed successfully |
//! | `Error` | Stream terminated with an error |
//!
//! # Error Handling
//!
//! Transport and API errors are delivered as `StreamEvent::Error` events rather
//! than `Result::Err` returns, so output received before the failure is still
//! consumed. Requests are sent once; there is no retry or backoff.

pub mod openai;
pub mod replay;
pub mod sse_types;

pub(crate) use anyhow::Result;
pub(crate) use tokio::sync::mpsc;

use rext_config::RextConfig;
use rext_types::StreamEvent;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

pub use replay::ReplayScript;
pub use rext_types;

/// Canonical OpenAI API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

const MAX_SSE_BUFFER_BYTES: usize = 4 * 1024 * 1024;

const MAX_SSE_PARSE_ERRORS: usize = 3;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared HTTPS-only client for the public API.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder()
            .https_only(true)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client: {e}. Falling back to defaults.");
                reqwest::Client::new()
            })
    })
}

/// Client for a configured base URL; plain HTTP is only allowed for loopback hosts.
pub fn http_client_for(base_url: &Url) -> Result<reqwest::Client, reqwest::Error> {
    if base_url.scheme() == "https" || !is_loopback(base_url) {
        return Ok(http_client().clone());
    }
    base_client_builder().build()
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
}

fn find_sse_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a <= b { (a, 2) } else { (b, 4) }),
        (Some(a), None) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

fn drain_next_sse_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let (pos, delim_len) = find_sse_event_boundary(buffer)?;
    let event = buffer[..pos].to_vec();
    buffer.drain(..pos + delim_len);
    Some(event)
}

fn extract_sse_data(event: &str) -> Option<String> {
    let mut data: Option<String> = None;

    for line in event.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(rest) = line.strip_prefix("data:") else {
            continue;
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(rest);
            }
            None => data = Some(rest.to_string()),
        }
    }

    data
}

#[derive(Debug)]
pub(crate) enum SseParseAction {
    /// Continue processing, no event to emit
    Continue,
    /// Emit these events and continue
    Emit(Vec<StreamEvent>),
    /// Stream is done (response.completed)
    Done,
    Error(String),
}

pub(crate) trait SseParser {
    fn parse(&mut self, json: &serde_json::Value) -> SseParseAction;
    fn provider_name(&self) -> &'static str;
}

pub(crate) async fn send_event(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Process an SSE stream using a provider-specific parser.
///
/// Handles idle timeouts, the buffer size cap, UTF-8 validation, event boundary
/// detection, the `[DONE]` marker, and a threshold of consecutive bad payloads.
pub(crate) async fn process_sse_stream<P: SseParser>(
    response: reqwest::Response,
    parser: &mut P,
    tx: &mpsc::Sender<StreamEvent>,
    idle_timeout: Duration,
) -> Result<()> {
    use futures_util::StreamExt;

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut parse_errors = 0usize;

    loop {
        let Ok(next) = tokio::time::timeout(idle_timeout, stream.next()).await else {
            let _ = send_event(tx, StreamEvent::Error("Stream idle timeout".to_string())).await;
            return Ok(());
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);

        if buffer.len() > MAX_SSE_BUFFER_BYTES {
            let _ = send_event(
                tx,
                StreamEvent::Error("SSE buffer exceeded maximum size (4 MiB)".to_string()),
            )
            .await;
            return Ok(());
        }

        while let Some(event) = drain_next_sse_event(&mut buffer) {
            if event.is_empty() {
                continue;
            }

            let Ok(event) = std::str::from_utf8(&event) else {
                let _ = send_event(
                    tx,
                    StreamEvent::Error("Received invalid UTF-8 from SSE stream".to_string()),
                )
                .await;
                return Ok(());
            };

            let Some(data) = extract_sse_data(event) else {
                continue;
            };

            if data == "[DONE]" {
                let _ = send_event(tx, StreamEvent::Done).await;
                return Ok(());
            }

            match serde_json::from_str::<serde_json::Value>(&data) {
                Ok(json) => {
                    parse_errors = 0;
                    match parser.parse(&json) {
                        SseParseAction::Continue => {}
                        SseParseAction::Emit(events) => {
                            for event in events {
                                if !send_event(tx, event).await {
                                    // Receiver gone: the pass was cancelled or finished.
                                    return Ok(());
                                }
                            }
                        }
                        SseParseAction::Done => {
                            let _ = send_event(tx, StreamEvent::Done).await;
                            return Ok(());
                        }
                        SseParseAction::Error(msg) => {
                            let _ = send_event(tx, StreamEvent::Error(msg)).await;
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    parse_errors = parse_errors.saturating_add(1);
                    tracing::warn!(
                        %e,
                        payload_bytes = data.len(),
                        provider = parser.provider_name(),
                        "Invalid SSE JSON payload"
                    );
                    if parse_errors >= MAX_SSE_PARSE_ERRORS {
                        let _ = send_event(
                            tx,
                            StreamEvent::Error(format!("Invalid stream payload: {e}")),
                        )
                        .await;
                        return Ok(());
                    }
                }
            }
        }
    }

    // Premature EOF: connection closed without completion signal
    let _ = send_event(
        tx,
        StreamEvent::Error("Connection closed before stream completed".to_string()),
    )
    .await;
    Ok(())
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

pub(crate) enum ApiResponse {
    Success(reqwest::Response),
    StreamTerminated,
}

/// Turn a send result into a streamable response, reporting failures through `tx`.
pub(crate) async fn handle_response(
    outcome: Result<reqwest::Response, reqwest::Error>,
    tx: &mpsc::Sender<StreamEvent>,
) -> ApiResponse {
    let response = match outcome {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(%e, "Request failed");
            let _ = send_event(tx, StreamEvent::Error(format!("Request failed: {e}"))).await;
            return ApiResponse::StreamTerminated;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = read_capped_error_body(response).await;
        let _ = send_event(
            tx,
            StreamEvent::Error(format!("API error {status}: {error_text}")),
        )
        .await;
        return ApiResponse::StreamTerminated;
    }

    ApiResponse::Success(response)
}

// ============================================================================
// Model configuration
// ============================================================================

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ApiConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ApiConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiConfigError {
    #[error("API key must not be empty")]
    EmptyApiKey,
    #[error("model name must not be empty")]
    EmptyModel,
    #[error("invalid API base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Credentials, model selection, and transport tuning for one chat model.
///
/// ```rust
/// use rext_providers::{ApiConfig, ApiKey};
///
/// let config = ApiConfig::new(ApiKey::new("test").unwrap(), "gpt-4o")
///     .unwrap()
///     .with_base_url("http://127.0.0.1:8080/v1")
///     .unwrap();
/// assert_eq!(config.responses_url(), "http://127.0.0.1:8080/v1/responses");
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    api_key: ApiKey,
    model: String,
    base_url: Url,
    idle_timeout: Duration,
}

impl ApiConfig {
    pub fn new(api_key: ApiKey, model: impl Into<String>) -> Result<Self, ApiConfigError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ApiConfigError::EmptyModel);
        }
        Ok(Self {
            api_key,
            model,
            base_url: parse_base_url(OPENAI_API_BASE_URL)?,
            idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ApiConfigError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Endpoint of the Responses API under the configured base URL.
    #[must_use]
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url.as_str().trim_end_matches('/'))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiConfigError> {
    Url::parse(raw).map_err(|source| ApiConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })
}

/// A user message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Where response fragments come from.
#[derive(Debug, Clone)]
pub enum ChatModel {
    OpenAI(ApiConfig),
    Replay(ReplayScript),
}

impl ChatModel {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ChatModel::OpenAI(config) => config.model(),
            ChatModel::Replay(_) => "replay",
        }
    }
}

/// Pick the chat model from user configuration.
///
/// `None` means no model is available (no API key, or an unusable setting);
/// callers treat that as "nothing to do" rather than an error.
#[must_use]
pub fn select_chat_model(config: &RextConfig) -> Option<ApiConfig> {
    let Some(key) = config.openai_api_key() else {
        tracing::info!("No OpenAI API key configured");
        return None;
    };

    let build = || -> Result<ApiConfig, ApiConfigError> {
        let mut api = ApiConfig::new(ApiKey::new(key)?, config.model_name())?;
        if let Some(base_url) = config.base_url() {
            api = api.with_base_url(base_url)?;
        }
        if let Some(secs) = config.idle_timeout_secs() {
            api = api.with_idle_timeout(Duration::from_secs(secs));
        }
        Ok(api)
    };

    match build() {
        Ok(api) => {
            tracing::debug!(model = api.model(), base_url = %api.base_url(), "Selected chat model");
            Some(api)
        }
        Err(e) => {
            tracing::warn!(%e, "Ignoring unusable model configuration");
            None
        }
    }
}

/// Send `messages` and stream the response into `tx`.
pub async fn send_message(
    model: &ChatModel,
    messages: &[ChatMessage],
    tx: mpsc::Sender<StreamEvent>,
) -> Result<()> {
    match model {
        ChatModel::OpenAI(config) => openai::send_message(config, messages, tx).await,
        ChatModel::Replay(script) => replay::send_message(script, tx).await,
    }
}
