//! Append-only conversation log with call-id correlation.

use std::collections::HashSet;

use crate::error::TurnloopError;
use crate::types::Turn;

/// Ordered history of one session.
///
/// Insertion order is causal order, and the whole log is what the endpoint
/// sees on every query. Every append is checked: a call id is requested at
/// most once, and each output answers exactly one earlier request.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    requested: HashSet<String>,
    answered: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from stored turns, re-checking every append.
    pub fn from_turns(turns: impl IntoIterator<Item = Turn>) -> Result<Self, TurnloopError> {
        let mut conversation = Self::new();
        for turn in turns {
            conversation.append(turn)?;
        }
        Ok(conversation)
    }

    /// Append one turn at the tail.
    pub fn append(&mut self, turn: Turn) -> Result<(), TurnloopError> {
        match &turn {
            Turn::FunctionCallRequest(call) => {
                if call.call_id.is_empty() {
                    return Err(TurnloopError::ConversationInvariant(
                        "function call request has an empty call_id".into(),
                    ));
                }
                if !self.requested.insert(call.call_id.clone()) {
                    return Err(TurnloopError::ConversationInvariant(format!(
                        "call_id '{}' was already requested",
                        call.call_id
                    )));
                }
            }
            Turn::FunctionCallOutput(output) => {
                if !self.requested.contains(&output.call_id) {
                    return Err(TurnloopError::ConversationInvariant(format!(
                        "output for call_id '{}' has no earlier request",
                        output.call_id
                    )));
                }
                if !self.answered.insert(output.call_id.clone()) {
                    return Err(TurnloopError::ConversationInvariant(format!(
                        "call_id '{}' already has an output",
                        output.call_id
                    )));
                }
            }
            Turn::UserMessage { .. } | Turn::AssistantMessage { .. } => {}
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Check a model response before any of it is appended.
    ///
    /// The response may be empty. Otherwise it must contain only assistant
    /// text and call requests, and use call ids that are new to this log and
    /// to each other.
    pub fn check_model_response(&self, response: &[Turn]) -> Result<(), TurnloopError> {
        let mut seen = HashSet::new();
        for turn in response {
            if !turn.is_model_authored() {
                return Err(TurnloopError::MalformedResponse(format!(
                    "endpoint returned a turn the model cannot author: {turn:?}"
                )));
            }
            if let Some(call) = turn.as_call() {
                if call.call_id.is_empty() {
                    return Err(TurnloopError::MalformedResponse(
                        "function call without a call_id".into(),
                    ));
                }
                if self.requested.contains(&call.call_id) || !seen.insert(call.call_id.as_str()) {
                    return Err(TurnloopError::MalformedResponse(format!(
                        "call_id '{}' is not fresh",
                        call.call_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Get all turns.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns appended at or after `start`.
    pub fn since(&self, start: usize) -> &[Turn] {
        &self.turns[start.min(self.turns.len())..]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Requested call ids that have no output yet, in request order.
    pub fn pending_call_ids(&self) -> Vec<&str> {
        self.turns
            .iter()
            .filter_map(Turn::as_call)
            .filter(|call| !self.answered.contains(&call.call_id))
            .map(|call| call.call_id.as_str())
            .collect()
    }

    /// Whether the model owes a response: the tail is a function output.
    pub fn awaiting_model(&self) -> bool {
        self.turns.last().is_some_and(Turn::is_output)
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
