use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, error, instrument, trace, warn};

use crate::config::GeminiConfig;
use crate::errors::{ChatError, ChatResult};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Lazy sequence of text deltas for one response.
///
/// Ends normally at end of response. A failure is delivered as a single
/// `Err` item after which the stream yields nothing more.
pub type DeltaStream = BoxStream<'static, ChatResult<String>>;

/// The hosted model, reduced to the one call the chat needs
#[async_trait]
pub trait ChatBackend: Send + Sync + Debug {
    /// Opens a streamed response. Errors here mean the request could not be
    /// established; failures after that arrive through the stream.
    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ChatResult<DeltaStream>;
}

/// Type alias for Arc-wrapped ChatBackend trait objects
pub type ChatBackendRef = Arc<dyn ChatBackend>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Gemini streaming API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    idle_timeout: Option<Duration>,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: &GeminiConfig) -> ChatResult<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            ChatError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.api_base_url().to_string(),
            idle_timeout: config.stream_idle_timeout(),
        })
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    #[instrument(skip(self, request), fields(contents = request.contents.len()))]
    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ChatResult<DeltaStream> {
        let response = self
            .client
            .post(self.stream_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini rejected the request");
            return Err(ChatError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        debug!(status = status.as_u16(), "Response stream opened");
        Ok(sse_delta_stream(response.bytes_stream(), self.idle_timeout))
    }
}

/// Turns a server-sent-event byte stream from `streamGenerateContent` into
/// text deltas.
pub fn sse_delta_stream<S, B, E>(bytes: S, idle_timeout: Option<Duration>) -> DeltaStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());

    stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, events.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("No data from Gemini for {}s", limit.as_secs());
                        let err = ChatError::StreamError(format!(
                            "no data received for {}s",
                            limit.as_secs()
                        ));
                        return Some((Err(err), None));
                    }
                },
                None => events.next().await,
            };

            match next {
                None => return None,
                Some(Err(e)) => {
                    let err = ChatError::StreamError(format!("SSE stream error: {}", e));
                    return Some((Err(err), None));
                }
                Some(Ok(event)) => {
                    trace!(data = %event.data, "SSE event");
                    match parse_chunk(&event.data) {
                        Ok(Some(text)) => return Some((Ok(text), Some(events))),
                        Ok(None) => continue,
                        Err(err) => return Some((Err(err), None)),
                    }
                }
            }
        }
    })
    .boxed()
}

/// Text carried by one SSE payload. `Ok(None)` for payloads without text
/// (usage-only chunks, keep-alives).
fn parse_chunk(data: &str) -> ChatResult<Option<String>> {
    if data.trim().is_empty() {
        return Ok(None);
    }

    let chunk: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| ChatError::StreamError(format!("Failed to parse chunk: {}", e)))?;

    if let Some(api_error) = chunk.error {
        return Err(ChatError::StreamError(format!(
            "API error {}: {}",
            api_error.code.unwrap_or_default(),
            api_error.message
        )));
    }

    if let Some(reason) = chunk
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(ChatError::StreamError(format!(
            "response blocked: {}",
            reason
        )));
    }

    Ok(chunk.text())
}
