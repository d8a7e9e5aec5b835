//! Remote chat session handle.
//!
//! A `ChatSession` is the client-side half of a Gemini conversation: it holds
//! the model name, the system instruction and every completed exchange, and
//! replays them with each new message so the model keeps full context.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::client::{ChatBackendRef, DeltaStream};
use crate::config::GeminiConfig;
use crate::errors::{ChatError, ChatResult};
use crate::types::{Content, GenerateContentRequest, GenerationConfig};

/// Parameters fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
}

impl SessionConfig {
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            model: config.model_name().to_string(),
            system_instruction: config
                .system_prompt
                .clone()
                .filter(|prompt| !prompt.trim().is_empty()),
            temperature: config.temperature,
        }
    }
}

#[derive(Debug)]
pub struct ChatSession {
    backend: ChatBackendRef,
    config: SessionConfig,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(backend: ChatBackendRef, config: SessionConfig) -> Self {
        info!(model = %config.model, "Chat session created");
        Self {
            backend,
            config,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Completed exchanges, oldest first
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    fn build_request(&self, prompt: &Content) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(prompt.clone());

        GenerateContentRequest {
            contents,
            system_instruction: self
                .config
                .system_instruction
                .as_ref()
                .map(|text| Content::instruction(text.clone())),
            generation_config: self.config.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
                ..Default::default()
            }),
        }
    }

    /// Sends one user message and returns the streamed reply.
    ///
    /// The returned stream borrows the session mutably, so a second send
    /// cannot start until it is dropped. The exchange is added to the history
    /// only if the stream runs to completion.
    pub async fn send_stream(&mut self, text: &str) -> ChatResult<ResponseStream<'_>> {
        if text.trim().is_empty() {
            return Err(ChatError::SessionError(
                "Cannot send an empty message".to_string(),
            ));
        }

        let prompt = Content::user(text);
        let request = self.build_request(&prompt);
        debug!(turns = self.history.len(), "Sending message");

        let inner = self
            .backend
            .stream_generate_content(&self.config.model, &request)
            .await?;

        Ok(ResponseStream {
            history: &mut self.history,
            prompt: Some(prompt),
            inner,
            reply: String::new(),
            finished: false,
        })
    }
}

/// Text deltas of one reply.
///
/// Yields `Ok(delta)` in arrival order. A failure is yielded once as `Err`
/// and ends the stream without touching the session history.
pub struct ResponseStream<'a> {
    history: &'a mut Vec<Content>,
    prompt: Option<Content>,
    inner: DeltaStream,
    reply: String,
    finished: bool,
}

impl ResponseStream<'_> {
    fn commit(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        if self.reply.is_empty() {
            warn!("Reply had no text, exchange not added to history");
            return;
        }
        self.history.push(prompt);
        self.history
            .push(Content::model(std::mem::take(&mut self.reply)));
    }
}

impl Stream for ResponseStream<'_> {
    type Item = ChatResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(delta)) => {
                this.reply.push_str(&delta);
                Poll::Ready(Some(Ok(delta)))
            }
            Some(Err(err)) => {
                this.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.finished = true;
                this.commit();
                Poll::Ready(None)
            }
        }
    }
}
