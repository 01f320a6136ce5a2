//! States of the turn loop.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Where the loop is between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(tag = "state", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the next line from the user.
    #[default]
    AwaitingUserInput,
    /// About to send the log to the model. `round` counts queries for the
    /// current user message, starting at 1.
    QueryingModel { round: u32 },
    /// Dispatching the requests among the turns appended at `first_new`.
    ProcessingFunctionCalls { first_new: usize, round: u32 },
    /// Terminal.
    Exiting,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exiting)
    }

    /// The round in progress, if a model round is underway.
    pub fn round(&self) -> Option<u32> {
        match self {
            Self::QueryingModel { round } | Self::ProcessingFunctionCalls { round, .. } => {
                Some(*round)
            }
            Self::AwaitingUserInput | Self::Exiting => None,
        }
    }
}

/// Whether a line of user input asks to end the session.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}
