//! Ordered message history of one run.

use crate::model::{Message, ModelResponse, ToolResult};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Append-only conversation log owned by a single run.
///
/// Every tool result must answer a tool call made earlier in the same
/// transcript, and each call is answered at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
    #[serde(skip)]
    open_calls: HashSet<String>,
}

impl Transcript {
    /// Start a transcript with the caller's input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(input)],
            open_calls: HashSet::new(),
        }
    }

    /// Record a model reply.
    pub fn push_response(&mut self, response: &ModelResponse) -> Result<()> {
        let message = response.to_message();
        let mut ids = HashSet::new();
        for call in message.tool_calls() {
            if self.open_calls.contains(&call.id) || !ids.insert(call.id.clone()) {
                return Err(Error::InvalidState(format!(
                    "tool call id {} is already pending",
                    call.id
                )));
            }
        }
        self.open_calls.extend(ids);
        self.messages.push(message);
        Ok(())
    }

    /// Record the result of a pending tool call.
    pub fn push_result(&mut self, result: ToolResult) -> Result<()> {
        if !self.open_calls.remove(&result.call_id) {
            return Err(Error::InvalidState(format!(
                "tool result {} does not answer a pending call",
                result.call_id
            )));
        }
        self.messages.push(Message::ToolResult(result));
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
