//! Scripted model client.

use super::{Backend, Message, ModelError, ModelOutput, ModelRequest, ModelResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A model client that replays a fixed script of responses.
///
/// Each call pops the next step. When the script runs out the optional
/// repeating response is returned forever; without one the call fails as
/// unavailable. Every transcript it is shown is recorded.
///
/// Useful for testing or for running the service without a live model.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    repeat: Option<ModelResponse>,
    latency: Option<Duration>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            steps: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// A client that gives the same response to every call.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::default()
        }
    }

    /// Append a failing step.
    pub fn then_fail(self, error: ModelError) -> Self {
        lock(&self.steps).push_back(Err(error));
        self
    }

    /// Delay every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Transcripts received so far, one per call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        lock(&self.seen).clone()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        lock(&self.seen).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelOutput, ModelError> {
        lock(&self.seen).push(request.messages.to_vec());
        let step = lock(&self.steps).pop_front();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = match (step, &self.repeat) {
            (Some(step), _) => step?,
            (None, Some(response)) => response.clone(),
            (None, None) => return Err(ModelError::Unavailable("script exhausted".into())),
        };

        Ok(ModelOutput {
            response,
            usage: Usage {
                input_tokens: request.messages.len() as u32,
                output_tokens: 1,
            },
        })
    }
}
