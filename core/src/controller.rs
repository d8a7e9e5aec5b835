//! Turn orchestration between user input, the conversation session and a view.

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::accumulator::StreamAccumulator;
use crate::config::GeminiConfig;
use crate::errors::{ChatError, ErrorKind};
use crate::session::{ConversationSession, SessionState};
use crate::suggestions::parse_suggestions;
use crate::turn::{ConversationTurn, MessageLog};

pub const CONFIG_ERROR_MESSAGE: &str =
    "The assistant is unavailable because it is not configured correctly. Fix the settings and restart.";
pub const SESSION_ERROR_MESSAGE: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again.";
pub const STREAM_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while answering. Please try again.";

/// Presentation surface driven by the controller
pub trait ChatView {
    fn show_user(&mut self, text: &str);

    /// An assistant bubble is about to receive streamed text
    fn begin_assistant(&mut self);

    /// Called after every delta with the full text that may be shown so far
    fn update_assistant(&mut self, display_text: &str);

    /// The reply is complete
    fn finish_assistant(&mut self, display_text: &str, suggestions: &[String]);

    /// The reply failed; whatever was shown of it is not an answer
    fn discard_assistant(&mut self);

    fn show_error(&mut self, message: &str);

    fn set_loading(&mut self, loading: bool);

    fn set_input_enabled(&mut self, enabled: bool);
}

/// What happened to a submitted turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(ErrorKind),
    /// Empty input, or input is disabled
    Ignored,
}

pub struct ChatController<V: ChatView> {
    session: ConversationSession,
    view: V,
    log: MessageLog,
    suggestions: Vec<String>,
    input_enabled: bool,
    max_response_bytes: Option<usize>,
}

impl<V: ChatView> ChatController<V> {
    /// Initializes the session from `config`. A configuration failure leaves
    /// the controller with input disabled and a single error shown; no
    /// request is ever made.
    pub fn start(config: &GeminiConfig, view: V) -> Self {
        let mut session = ConversationSession::new();
        if let Err(err) = session.initialize(config) {
            error!(error = %err, "Startup failed");
        }
        Self::with_session(session, view, config.max_response_bytes())
    }

    /// Uses a session prepared by the caller
    pub fn with_session(
        session: ConversationSession,
        mut view: V,
        max_response_bytes: Option<usize>,
    ) -> Self {
        let input_enabled = session.state() == SessionState::Ready;
        view.set_input_enabled(input_enabled);
        if let Some(reason) = session.disabled_reason() {
            view.show_error(&config_error_message(reason));
        }

        Self {
            session,
            view,
            log: MessageLog::new(),
            suggestions: Vec::new(),
            input_enabled,
            max_response_bytes,
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Chips offered by the last completed reply
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Runs one turn: sends `text`, streams the reply into the view and
    /// offers its suggestions. Every failure ends up as a message in the view.
    pub async fn submit(&mut self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() || !self.input_enabled {
            return TurnOutcome::Ignored;
        }

        info!(chars = text.len(), "Submitting turn");
        self.log.push(ConversationTurn::user(text));
        self.view.show_user(text);
        self.suggestions.clear();
        self.set_busy(true);

        let outcome = match self.stream_reply(text).await {
            Ok((raw, display_text)) => {
                let suggestions = parse_suggestions(&raw);
                debug!(count = suggestions.len(), "Parsed suggestions");
                self.view.finish_assistant(&display_text, &suggestions);
                self.log.push(ConversationTurn::assistant(raw));
                self.suggestions = suggestions;
                TurnOutcome::Completed
            }
            Err(err) => self.report_failure(err),
        };

        self.set_busy(false);
        outcome
    }

    /// Submits the chip at `index` as a new turn
    pub async fn select_suggestion(&mut self, index: usize) -> TurnOutcome {
        match self.suggestions.get(index).cloned() {
            Some(text) => self.submit(&text).await,
            None => {
                warn!(index, available = self.suggestions.len(), "No such suggestion");
                TurnOutcome::Ignored
            }
        }
    }

    /// Streams the reply; returns the raw text and its displayable form
    async fn stream_reply(&mut self, text: &str) -> Result<(String, String), TurnFailure> {
        let mut stream = self.session.send(text).await.map_err(TurnFailure::NotSent)?;

        self.view.begin_assistant();
        let mut accumulator = StreamAccumulator::with_limit(self.max_response_bytes);
        while let Some(delta) = stream.next().await {
            let delta = delta.map_err(TurnFailure::Interrupted)?;
            accumulator
                .append(&delta)
                .map_err(TurnFailure::Interrupted)?;
            self.view.update_assistant(&accumulator.display_text());
        }

        let display_text = accumulator.display_text();
        Ok((accumulator.into_text(), display_text))
    }

    fn report_failure(&mut self, failure: TurnFailure) -> TurnOutcome {
        match failure {
            TurnFailure::NotSent(err) => {
                error!(error = %err, "Turn could not be sent");
                let kind = err.kind();
                if kind == ErrorKind::Configuration {
                    self.view.show_error(&config_error_message(&err.to_string()));
                } else {
                    self.view.show_error(SESSION_ERROR_MESSAGE);
                }
                TurnOutcome::Failed(kind)
            }
            TurnFailure::Interrupted(err) => {
                error!(error = %err, "Reply stream failed");
                self.view.discard_assistant();
                self.view
                    .show_error(&format!("{} ({})", STREAM_ERROR_MESSAGE, err));
                TurnOutcome::Failed(ErrorKind::Stream)
            }
        }
    }

    fn set_busy(&mut self, busy: bool) {
        self.view.set_loading(busy);
        // A disabled session never gets its input back
        let enabled = !busy && self.session.state() == SessionState::Ready;
        self.input_enabled = enabled;
        self.view.set_input_enabled(enabled);
    }
}

fn config_error_message(reason: &str) -> String {
    format!("{} ({})", CONFIG_ERROR_MESSAGE, reason)
}

/// Where a turn broke down
enum TurnFailure {
    /// The request was never established
    NotSent(ChatError),
    /// The reply failed part way; the partial text is discarded
    Interrupted(ChatError),
}
