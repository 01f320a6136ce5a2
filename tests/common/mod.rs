//! Shared test helpers: scripted endpoint, scripted console, log checks.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use turnloop::agent::Conversation;
use turnloop::agent_loop::Console;
use turnloop::config::LoopSettings;
use turnloop::error::TurnloopError;
use turnloop::provider::{EndpointRequest, ModelEndpoint};
use turnloop::tools::builtin::FlightDesk;
use turnloop::tools::ToolRegistry;
use turnloop::types::Turn;
use turnloop::util::retry::RetryPolicy;

type Responder = dyn Fn(&EndpointRequest) -> Result<Vec<Turn>, TurnloopError> + Send + Sync;

/// An endpoint that replays queued responses and records every request.
///
/// Once the queue is empty the fallback responder is used; without one the
/// endpoint fails with a non-retryable error.
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<Result<Vec<Turn>, TurnloopError>>>,
    fallback: Option<Box<Responder>>,
    requests: Mutex<Vec<EndpointRequest>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback<F>(responder: F) -> Self
    where
        F: Fn(&EndpointRequest) -> Result<Vec<Turn>, TurnloopError> + Send + Sync + 'static,
    {
        Self {
            fallback: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queue a successful response.
    pub fn respond(self, turns: Vec<Turn>) -> Self {
        self.script.lock().unwrap().push_back(Ok(turns));
        self
    }

    /// Queue a failed response.
    pub fn fail(self, err: TurnloopError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<EndpointRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedEndpoint {
    fn endpoint_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn query(&self, request: &EndpointRequest) -> Result<Vec<Turn>, TurnloopError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => match &self.fallback {
                Some(responder) => responder(request),
                None => Err(TurnloopError::Configuration("script exhausted".into())),
            },
        }
    }
}

/// A console fed from a fixed list of lines.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub reads: usize,
    pub replies: Vec<String>,
    pub notices: Vec<String>,
    pub dumps: Vec<Vec<Turn>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self) -> Result<Option<String>, TurnloopError> {
        self.reads += 1;
        Ok(self.inputs.pop_front())
    }

    fn show_reply(&mut self, text: &str) {
        self.replies.push(text.to_string());
    }

    fn show_notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }

    fn dump_log(&mut self, turns: &[Turn]) {
        self.dumps.push(turns.to_vec());
    }
}

/// Registry holding the two flight-desk tools.
pub fn flight_registry() -> (Arc<FlightDesk>, Arc<ToolRegistry>) {
    let desk = Arc::new(FlightDesk::default());
    let mut registry = ToolRegistry::new();
    for tool in FlightDesk::tools(&desk) {
        registry.register(tool).unwrap();
    }
    (desk, Arc::new(registry))
}

/// Fast backoff so retry scenarios finish quickly.
pub fn test_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

pub fn test_settings() -> LoopSettings {
    LoopSettings::builder()
        .model("scripted-model")
        .retry(test_retry_policy(3))
        .build()
}

/// Check the correlation rules over a finished log.
///
/// Every output answers exactly one earlier request, no id is requested
/// twice, and no user message was taken while a request was unanswered.
pub fn assert_log_invariants(turns: &[Turn]) {
    let mut requested = HashSet::new();
    let mut answered = HashSet::new();
    for (idx, turn) in turns.iter().enumerate() {
        match turn {
            Turn::FunctionCallRequest(call) => {
                assert!(
                    requested.insert(call.call_id.clone()),
                    "call_id {} requested twice",
                    call.call_id
                );
            }
            Turn::FunctionCallOutput(output) => {
                assert!(
                    requested.contains(&output.call_id),
                    "output {} has no earlier request",
                    output.call_id
                );
                assert!(
                    answered.insert(output.call_id.clone()),
                    "call_id {} answered twice",
                    output.call_id
                );
            }
            Turn::UserMessage { .. } => {
                let prefix = Conversation::from_turns(turns[..idx].to_vec()).unwrap();
                assert!(
                    prefix.pending_call_ids().is_empty(),
                    "user input read at turn {idx} with unanswered calls"
                );
            }
            Turn::AssistantMessage { .. } => {}
        }
    }
    assert_eq!(requested, answered, "some requests were never answered");
}
