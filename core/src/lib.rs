// Core of the Gemini chat client:
// - Suggestion block parsing and display stripping
// - Accumulation of streamed reply text
// - Gemini streaming client and the chat session built on it
// - Session lifecycle and the view-agnostic turn controller
// - Configuration loading and shared error types

pub mod accumulator;
pub use accumulator::StreamAccumulator;

pub mod chat;
pub use chat::{ChatSession, ResponseStream, SessionConfig};

pub mod client;
pub use client::{ChatBackend, ChatBackendRef, DeltaStream, GeminiClient};

pub mod config;
pub use config::GeminiConfig;

pub mod controller;
pub use controller::{ChatController, ChatView, TurnOutcome};

pub mod errors;
pub use errors::{ChatError, ChatResult, ErrorKind};

pub mod session;
pub use session::{ConversationSession, SessionState};

pub mod suggestions;
pub use suggestions::parse_suggestions;

pub mod turn;
pub use turn::{ConversationTurn, MessageLog, Role};

pub mod types;

#[cfg(test)]
mod testing;
