//! In-memory backend for exercising sessions and the controller without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::client::{ChatBackend, DeltaStream};
use crate::errors::{ChatError, ChatResult};
use crate::types::GenerateContentRequest;

/// What the backend does for one request
#[derive(Debug, Clone)]
pub enum Script {
    /// The request cannot be established
    Refuse(String),
    /// Deltas, then an optional mid-stream failure
    Stream {
        deltas: Vec<String>,
        failure: Option<String>,
    },
}

impl Script {
    pub fn deltas(deltas: &[&str]) -> Self {
        Script::Stream {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            failure: None,
        }
    }

    pub fn fail_after(deltas: &[&str], failure: &str) -> Self {
        Script::Stream {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            failure: Some(failure.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ChatResult<DeltaStream> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Refuse("no scripted response left".to_string()));

        match script {
            Script::Refuse(reason) => Err(ChatError::SessionError(reason)),
            Script::Stream { deltas, failure } => {
                let items = deltas
                    .into_iter()
                    .map(Ok)
                    .chain(failure.map(|reason| Err(ChatError::StreamError(reason))));
                Ok(stream::iter(items.collect::<Vec<_>>()).boxed())
            }
        }
    }
}
