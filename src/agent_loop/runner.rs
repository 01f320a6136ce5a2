//! The turn loop: user input, model rounds, and function dispatch.

use std::sync::Arc;

use uuid::Uuid;

use crate::agent::Conversation;
use crate::config::LoopSettings;
use crate::error::TurnloopError;
use crate::provider::{EndpointRequest, ModelEndpoint};
use crate::tools::{Dispatcher, ToolRegistry};
use crate::types::{FunctionCall, Turn};
use crate::util::timeout::with_timeout;

use super::console::Console;
use super::state::{is_exit_command, LoopState};

/// Drives one conversation between a user, a model endpoint, and the
/// registered tools.
///
/// The loop re-queries the model exactly when the newest turns contained
/// function calls; every call is answered before the next query, so the
/// endpoint never sees an unanswered request. Replies are shown only once
/// the model produces a response without calls.
pub struct TurnLoop {
    session_id: Uuid,
    endpoint: Arc<dyn ModelEndpoint>,
    dispatcher: Dispatcher,
    settings: LoopSettings,
    conversation: Conversation,
    state: LoopState,
}

impl TurnLoop {
    pub fn new(
        endpoint: Arc<dyn ModelEndpoint>,
        registry: Arc<ToolRegistry>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            endpoint,
            dispatcher: Dispatcher::new(registry),
            settings,
            conversation: Conversation::new(),
            state: LoopState::AwaitingUserInput,
        }
    }

    /// Continue from a stored log.
    ///
    /// A log ending in a function output resumes by querying the model; any
    /// other complete log waits for input. Logs with unanswered requests are
    /// rejected.
    pub fn resume(mut self, conversation: Conversation) -> Result<Self, TurnloopError> {
        if let Some(pending) = conversation.pending_call_ids().first() {
            return Err(TurnloopError::ConversationInvariant(format!(
                "cannot resume with unanswered call_id '{pending}'"
            )));
        }
        self.state = if conversation.awaiting_model() {
            LoopState::QueryingModel { round: 1 }
        } else {
            LoopState::AwaitingUserInput
        };
        self.conversation = conversation;
        Ok(self)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }

    /// Run until the user leaves or a fatal error occurs.
    ///
    /// The log is dumped to the console on every exit path.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<(), TurnloopError> {
        tracing::info!(
            session_id = %self.session_id,
            endpoint = self.endpoint.endpoint_name(),
            model = %self.settings.model,
            "Session started"
        );

        let mut result = Ok(());
        while !self.state.is_terminal() {
            if let Err(err) = self.step(console).await {
                result = Err(err);
            }
        }

        console.dump_log(self.conversation.turns());
        tracing::info!(
            session_id = %self.session_id,
            turns = self.conversation.len(),
            ok = result.is_ok(),
            "Session ended"
        );
        result
    }

    /// Perform one transition. A fatal error moves the loop to `Exiting`.
    pub async fn step(&mut self, console: &mut dyn Console) -> Result<LoopState, TurnloopError> {
        let next = match self.state {
            LoopState::AwaitingUserInput => self.read_user_input(console).await,
            LoopState::QueryingModel { round } => self.query_model(round).await,
            LoopState::ProcessingFunctionCalls { first_new, round } => {
                self.process_function_calls(first_new, round, console)
            }
            LoopState::Exiting => Ok(LoopState::Exiting),
        };

        match next {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(err) => {
                tracing::error!(session_id = %self.session_id, error = %err, "Turn loop failed");
                self.state = LoopState::Exiting;
                Err(err)
            }
        }
    }

    async fn read_user_input(&mut self, console: &mut dyn Console) -> Result<LoopState, TurnloopError> {
        loop {
            let Some(line) = console.read_line().await? else {
                tracing::debug!(session_id = %self.session_id, "End of input");
                return Ok(LoopState::Exiting);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_exit_command(line) {
                return Ok(LoopState::Exiting);
            }
            self.conversation.append(Turn::user(line))?;
            return Ok(LoopState::QueryingModel { round: 1 });
        }
    }

    async fn query_model(&mut self, round: u32) -> Result<LoopState, TurnloopError> {
        let request = EndpointRequest {
            model: self.settings.model.clone(),
            turns: self.conversation.turns().to_vec(),
            tools: self.dispatcher.registry().describe_all(),
            settings: self.settings.generation.clone(),
        };
        tracing::debug!(
            session_id = %self.session_id,
            round,
            turns = request.turns.len(),
            "Querying model"
        );

        let request = &request;
        let endpoint = &self.endpoint;
        let conversation = &self.conversation;
        let response = with_timeout(
            self.settings.query_timeout,
            self.settings.retry.execute(|| async move {
                let turns = endpoint.query(request).await?;
                conversation.check_model_response(&turns)?;
                Ok(turns)
            }),
        )
        .await?;

        let first_new = self.conversation.len();
        for turn in response {
            self.conversation.append(turn)?;
        }
        Ok(LoopState::ProcessingFunctionCalls { first_new, round })
    }

    fn process_function_calls(
        &mut self,
        first_new: usize,
        round: u32,
        console: &mut dyn Console,
    ) -> Result<LoopState, TurnloopError> {
        let calls: Vec<FunctionCall> = self
            .conversation
            .since(first_new)
            .iter()
            .filter_map(Turn::as_call)
            .cloned()
            .collect();

        if calls.is_empty() {
            if self.conversation.len() == first_new {
                tracing::debug!(
                    session_id = %self.session_id,
                    round,
                    "Model returned an empty response"
                );
            }
            for turn in self.conversation.since(first_new) {
                if let Turn::AssistantMessage { text } = turn {
                    console.show_reply(text);
                }
            }
            return Ok(LoopState::AwaitingUserInput);
        }

        for call in &calls {
            tracing::debug!(
                session_id = %self.session_id,
                round,
                call_id = %call.call_id,
                tool = %call.name,
                "Dispatching function call"
            );
            let output = self.dispatcher.dispatch(call);
            self.conversation.append(Turn::FunctionCallOutput(output))?;
        }

        if round >= self.settings.max_rounds_per_turn {
            tracing::warn!(
                session_id = %self.session_id,
                max_rounds = self.settings.max_rounds_per_turn,
                "Round limit reached without a final reply"
            );
            console.show_notice(&format!(
                "Stopped after {} model rounds without a final reply. Send another message to continue.",
                self.settings.max_rounds_per_turn
            ));
            return Ok(LoopState::AwaitingUserInput);
        }

        Ok(LoopState::QueryingModel { round: round + 1 })
    }
}

impl std::fmt::Debug for TurnLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnLoop")
            .field("session_id", &self.session_id)
            .field("endpoint", &self.endpoint.endpoint_name())
            .field("state", &self.state)
            .field("turns", &self.conversation.len())
            .finish()
    }
}
