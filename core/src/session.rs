//! Conversation session lifecycle.
//!
//! ```text
//! Uninitialized --(credential ok, client built)--> Ready
//! Uninitialized --(credential missing / client error)--> Disabled   (terminal)
//! ```
//!
//! There is exactly one session per process run. It is owned by whoever runs
//! turns (the controller) and passed around explicitly.

use std::sync::Arc;

use tracing::{error, info};

use crate::chat::{ChatSession, ResponseStream, SessionConfig};
use crate::client::{ChatBackendRef, GeminiClient};
use crate::config::GeminiConfig;
use crate::errors::{ChatError, ChatResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Disabled,
}

#[derive(Debug)]
enum Inner {
    Uninitialized,
    Ready(ChatSession),
    Disabled(String),
}

#[derive(Debug)]
pub struct ConversationSession {
    inner: Inner,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            inner: Inner::Uninitialized,
        }
    }

    /// Builds the Gemini client from `config` and opens the session.
    ///
    /// On failure the session becomes `Disabled` for good and the
    /// configuration error is returned.
    pub fn initialize(&mut self, config: &GeminiConfig) -> ChatResult<()> {
        match GeminiClient::new(config) {
            Ok(client) => {
                self.initialize_with_backend(Arc::new(client), SessionConfig::from_config(config))
            }
            Err(err) => {
                self.disable(err.to_string());
                Err(err)
            }
        }
    }

    /// Opens the session on an already constructed backend
    pub fn initialize_with_backend(
        &mut self,
        backend: ChatBackendRef,
        config: SessionConfig,
    ) -> ChatResult<()> {
        match &self.inner {
            Inner::Uninitialized => {}
            Inner::Ready(_) => {
                return Err(ChatError::SessionError(
                    "Session is already initialized".to_string(),
                ))
            }
            Inner::Disabled(reason) => return Err(ChatError::ConfigError(reason.clone())),
        }

        self.inner = Inner::Ready(ChatSession::new(backend, config));
        info!("Conversation session ready");
        Ok(())
    }

    fn disable(&mut self, reason: String) {
        error!(%reason, "Conversation session disabled");
        self.inner = Inner::Disabled(reason);
    }

    pub fn state(&self) -> SessionState {
        match self.inner {
            Inner::Uninitialized => SessionState::Uninitialized,
            Inner::Ready(_) => SessionState::Ready,
            Inner::Disabled(_) => SessionState::Disabled,
        }
    }

    /// Why the session was disabled, if it was
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.inner {
            Inner::Disabled(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        match &self.inner {
            Inner::Ready(chat) => Some(chat),
            _ => None,
        }
    }

    /// Sends a user turn. Only a `Ready` session reaches the network.
    pub async fn send(&mut self, text: &str) -> ChatResult<ResponseStream<'_>> {
        match &mut self.inner {
            Inner::Ready(chat) => chat.send_stream(text).await,
            Inner::Uninitialized => Err(ChatError::SessionError(
                "Session has not been initialized".to_string(),
            )),
            Inner::Disabled(reason) => Err(ChatError::ConfigError(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedBackend};
    use futures::StreamExt;

    fn session_config() -> SessionConfig {
        SessionConfig {
            model: "test-model".to_string(),
            system_instruction: None,
            temperature: None,
        }
    }

    #[test]
    fn test_missing_credential_disables_session() {
        let mut session = ConversationSession::new();
        assert_eq!(session.state(), SessionState::Uninitialized);

        let err = session.initialize(&GeminiConfig::default()).unwrap_err();
        assert!(matches!(err, ChatError::ConfigError(_)));
        assert_eq!(session.state(), SessionState::Disabled);
        assert_eq!(
            session.disabled_reason(),
            Some(err.to_string().as_str())
        );
    }

    #[test]
    fn test_credential_makes_session_ready() {
        let mut config = GeminiConfig::default();
        config.api_key = Some("test-key".to_string());

        let mut session = ConversationSession::new();
        session.initialize(&config).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(
            session.chat().map(|chat| chat.config().model.as_str()),
            Some(config.model_name())
        );
    }

    #[test]
    fn test_disabled_is_terminal() {
        let mut session = ConversationSession::new();
        let _ = session.initialize(&GeminiConfig::default());

        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let err = session
            .initialize_with_backend(backend, session_config())
            .unwrap_err();
        assert!(matches!(err, ChatError::ConfigError(_)));
        assert_eq!(session.state(), SessionState::Disabled);
    }

    #[tokio::test]
    async fn test_send_requires_ready_session() {
        let mut session = ConversationSession::new();
        let err = session.send("Hello").await.err().unwrap();
        assert!(matches!(err, ChatError::SessionError(_)));

        let _ = session.initialize(&GeminiConfig::default());
        let err = session.send("Hello").await.err().unwrap();
        assert!(matches!(err, ChatError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_ready_session_streams() {
        let backend = Arc::new(ScriptedBackend::new(vec![Script::deltas(&["a", "b"])]));
        let mut session = ConversationSession::new();
        session
            .initialize_with_backend(backend.clone(), session_config())
            .unwrap();

        let deltas: Vec<String> = session
            .send("Hello")
            .await
            .unwrap()
            .map(|delta| delta.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["a", "b"]);
        assert_eq!(backend.requests().len(), 1);
        assert_eq!(session.chat().map(|chat| chat.history().len()), Some(2));
    }
}
