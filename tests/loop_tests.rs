//! End-to-end scenarios for the turn loop against scripted collaborators.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{
    assert_log_invariants, flight_registry, test_retry_policy, test_settings, ScriptedConsole,
    ScriptedEndpoint,
};
use turnloop::agent::Conversation;
use turnloop::agent_loop::{LoopState, TurnLoop};
use turnloop::config::LoopSettings;
use turnloop::error::TurnloopError;
use turnloop::provider::{EndpointRequest, ModelEndpoint};
use turnloop::tools::builtin::GET_AVAILABLE_FLIGHTS;
use turnloop::tools::{FunctionTool, ToolParameters, ToolRegistry};
use turnloop::types::Turn;

fn error_kind(turn: &Turn) -> String {
    let Turn::FunctionCallOutput(output) = turn else {
        panic!("expected an output, got {turn:?}");
    };
    assert!(output.is_error);
    let payload: Value = serde_json::from_str(&output.output).unwrap();
    payload["error"]["kind"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn direct_reply_is_shown_without_dispatch() {
    let endpoint = Arc::new(ScriptedEndpoint::new().respond(vec![Turn::assistant("Hi there!")]));
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hello"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(console.replies, vec!["Hi there!"]);
    assert_eq!(endpoint.query_count(), 1);
    assert_eq!(console.reads, 2);
    assert_eq!(
        turn_loop.conversation().turns(),
        &[Turn::user("hello"), Turn::assistant("Hi there!")]
    );
    assert_eq!(turn_loop.state(), LoopState::Exiting);
}

#[tokio::test]
async fn flight_listing_is_fed_back_without_prompting_the_user() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call("c1", "get_available_flights", json!({}))])
            .respond(vec![Turn::assistant("Five routes are available.")]),
    );
    let (desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["which flights do you have?"]);

    turn_loop.run(&mut console).await.unwrap();

    let expected_output = serde_json::to_string(desk.flights()).unwrap();
    assert_eq!(
        turn_loop.conversation().turns(),
        &[
            Turn::user("which flights do you have?"),
            Turn::call("c1", "get_available_flights", json!({})),
            Turn::output("c1", expected_output),
            Turn::assistant("Five routes are available."),
        ]
    );
    // One line of input, then end of input: the second query was not prompted.
    assert_eq!(console.reads, 2);
    let requests = endpoint.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].turns.len(), 3);
    assert_eq!(console.replies, vec!["Five routes are available."]);
}

#[tokio::test]
async fn quit_exits_without_querying() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["  Quit  ", "never read"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 0);
    assert!(turn_loop.conversation().is_empty());
    assert_eq!(console.reads, 1);
    assert_eq!(console.dumps, vec![Vec::<Turn>::new()]);
}

#[tokio::test]
async fn blank_lines_are_skipped() {
    let endpoint = Arc::new(ScriptedEndpoint::new().respond(vec![Turn::assistant("ok")]));
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["", "   ", "hi", "EXIT"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 1);
    assert_eq!(console.reads, 4);
    assert_eq!(turn_loop.conversation().turns()[0], Turn::user("hi"));
}

#[tokio::test]
async fn unknown_function_is_answered_with_an_error_and_the_loop_continues() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call("c7", "teleport", json!({"to": "Mars"}))])
            .respond(vec![Turn::assistant("I cannot do that.")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["beam me up"]);

    turn_loop.run(&mut console).await.unwrap();

    let turns = turn_loop.conversation().turns();
    assert_eq!(turns[2].call_id(), Some("c7"));
    assert_eq!(error_kind(&turns[2]), "unknown_tool");
    assert_eq!(console.replies, vec!["I cannot do that."]);
    assert!(console.notices.is_empty());
}

#[tokio::test]
async fn bad_booking_date_is_reported_as_invalid_arguments() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call(
                "c1",
                "book_flight",
                json!({"from_city": "Miami", "to_city": "Seattle", "date": "soon"}),
            )])
            .respond(vec![Turn::assistant("Which date?")]),
    );
    let (desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint, registry, test_settings());
    let mut console = ScriptedConsole::new(["book Miami to Seattle"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(error_kind(&turn_loop.conversation().turns()[2]), "invalid_arguments");
    assert!(desk.bookings().is_empty());
}

#[tokio::test]
async fn calls_are_dispatched_in_arrival_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    for name in ["first", "second"] {
        let seen = seen.clone();
        registry
            .register(Arc::new(FunctionTool::new(
                name,
                "Record the call",
                ToolParameters::empty(),
                move |_args, ctx| {
                    seen.lock().unwrap().push(ctx.call_id.clone());
                    Ok(json!("recorded"))
                },
            )))
            .unwrap();
    }
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![
                Turn::call("b", "second", json!({})),
                Turn::call("a", "first", json!({})),
            ])
            .respond(vec![Turn::assistant("done")]),
    );
    let mut turn_loop = TurnLoop::new(endpoint, Arc::new(registry), test_settings());
    let mut console = ScriptedConsole::new(["go"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["b", "a"]);
    let output_ids: Vec<&str> = turn_loop
        .conversation()
        .turns()
        .iter()
        .filter(|t| t.is_output())
        .filter_map(Turn::call_id)
        .collect();
    assert_eq!(output_ids, vec!["b", "a"]);
}

#[tokio::test]
async fn every_query_carries_the_full_log_and_tool_list() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call("c1", "get_available_flights", json!({}))])
            .respond(vec![Turn::call(
                "c2",
                "book_flight",
                json!({"from_city": "Boston", "to_city": "San Francisco", "date": "2025-09-01"}),
            )])
            .respond(vec![Turn::assistant("Booked.")])
            .respond(vec![Turn::assistant("You're welcome.")]),
    );
    let (desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["book Boston to SF", "thanks"]);

    turn_loop.run(&mut console).await.unwrap();

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 4);
    for request in &requests {
        let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_available_flights", "book_flight"]);
        assert_eq!(request.model, "scripted-model");
        let sent = Conversation::from_turns(request.turns.clone()).unwrap();
        assert!(sent.pending_call_ids().is_empty());
    }
    for pair in requests.windows(2) {
        assert!(pair[1].turns.starts_with(&pair[0].turns));
    }
    assert_eq!(desk.bookings().len(), 1);
    assert_eq!(console.replies, vec!["Booked.", "You're welcome."]);
    assert_log_invariants(turn_loop.conversation().turns());
}

#[tokio::test]
async fn replaying_the_same_script_yields_the_same_log() {
    async fn play() -> Vec<Turn> {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .respond(vec![
                    Turn::call("c1", "get_available_flights", json!({})),
                    Turn::call(
                        "c2",
                        "book_flight",
                        json!({"from_city": "Miami", "to_city": "Seattle", "date": "2025-02-03"}),
                    ),
                ])
                .respond(vec![Turn::assistant("All set.")]),
        );
        let (_desk, registry) = flight_registry();
        let mut turn_loop = TurnLoop::new(endpoint, registry, test_settings());
        let mut console = ScriptedConsole::new(["fly me to Seattle"]);
        turn_loop.run(&mut console).await.unwrap();
        turn_loop.into_conversation().turns().to_vec()
    }

    let first = play().await;
    let second = play().await;

    assert_eq!(first, second);
    assert_log_invariants(&first);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried_then_succeed() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .fail(TurnloopError::api(503, "overloaded"))
            .fail(TurnloopError::RateLimited {
                retry_after_ms: None,
            })
            .respond(vec![Turn::assistant("Back online.")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hello?"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 3);
    assert_eq!(console.replies, vec!["Back online."]);
    assert_eq!(turn_loop.conversation().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_responses_are_retried() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::output("c1", "spoofed")])
            .respond(vec![
                Turn::call("c2", GET_AVAILABLE_FLIGHTS, json!({})),
                Turn::call("c2", GET_AVAILABLE_FLIGHTS, json!({})),
            ])
            .respond(vec![Turn::assistant("Sorry for the wait.")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hi"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 3);
    assert_eq!(
        turn_loop.conversation().turns(),
        &[Turn::user("hi"), Turn::assistant("Sorry for the wait.")]
    );
}

#[tokio::test]
async fn empty_response_returns_to_input_without_a_reply() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![])
            .respond(vec![Turn::assistant("later")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hi", "again"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 2);
    assert_eq!(console.reads, 3);
    assert_eq!(console.replies, vec!["later"]);
    assert_eq!(
        turn_loop.conversation().turns(),
        &[Turn::user("hi"), Turn::user("again"), Turn::assistant("later")]
    );
    assert_log_invariants(turn_loop.conversation().turns());
}

#[tokio::test]
async fn empty_response_after_a_tool_round_waits_for_the_user() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call("c1", GET_AVAILABLE_FLIGHTS, json!({}))])
            .respond(vec![])
            .respond(vec![Turn::assistant("Here you go.")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["flights?", "well?"]);

    turn_loop.run(&mut console).await.unwrap();

    let turns = turn_loop.conversation().turns();
    assert_eq!(endpoint.query_count(), 3);
    assert_eq!(console.replies, vec!["Here you go."]);
    assert!(console.notices.is_empty());
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[3], Turn::user("well?"));
    assert_log_invariants(turns);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_are_fatal_and_dump_the_log() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .fail(TurnloopError::api(500, "boom"))
            .fail(TurnloopError::api(502, "boom"))
            .fail(TurnloopError::api(503, "boom"))
            .respond(vec![Turn::assistant("too late")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hi", "still there?"]);

    let err = turn_loop.run(&mut console).await.unwrap_err();

    assert!(matches!(err, TurnloopError::Api { status: 503, .. }));
    assert_eq!(endpoint.query_count(), 3);
    assert_eq!(turn_loop.state(), LoopState::Exiting);
    assert_eq!(console.reads, 1);
    assert_eq!(console.dumps, vec![vec![Turn::user("hi")]]);
}

#[tokio::test]
async fn non_retryable_errors_are_fatal_on_first_attempt() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new().fail(TurnloopError::Authentication("invalid key".into())),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings());
    let mut console = ScriptedConsole::new(["hi"]);

    let err = turn_loop.run(&mut console).await.unwrap_err();

    assert!(matches!(err, TurnloopError::Authentication(_)));
    assert_eq!(endpoint.query_count(), 1);
    assert_eq!(console.dumps.len(), 1);
}

#[tokio::test]
async fn round_cap_returns_control_to_the_user() {
    let endpoint = Arc::new(ScriptedEndpoint::with_fallback(|request: &EndpointRequest| {
        Ok(vec![Turn::call(
            format!("c{}", request.turns.len()),
            "get_available_flights",
            json!({}),
        )])
    }));
    let (_desk, registry) = flight_registry();
    let settings = LoopSettings::builder()
        .model("scripted-model")
        .retry(test_retry_policy(1))
        .max_rounds_per_turn(3)
        .build();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, settings);
    let mut console = ScriptedConsole::new(["keep going", "once more"]);

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(endpoint.query_count(), 6);
    assert_eq!(console.notices.len(), 2);
    assert!(console.notices[0].contains("3 model rounds"));
    assert!(console.replies.is_empty());
    assert_eq!(console.reads, 3);
    let turns = turn_loop.conversation().turns();
    assert!(turns.last().unwrap().is_output());
    assert_log_invariants(turns);
}

struct StalledEndpoint;

#[async_trait]
impl ModelEndpoint for StalledEndpoint {
    fn endpoint_name(&self) -> &str {
        "stalled"
    }

    fn model_id(&self) -> &str {
        "stalled-model"
    }

    async fn query(&self, _request: &EndpointRequest) -> Result<Vec<Turn>, TurnloopError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![Turn::assistant("too late")])
    }
}

#[tokio::test(start_paused = true)]
async fn query_timeout_ends_the_session() {
    let (_desk, registry) = flight_registry();
    let settings = LoopSettings::builder()
        .model("stalled-model")
        .query_timeout(Duration::from_secs(5))
        .build();
    let mut turn_loop = TurnLoop::new(Arc::new(StalledEndpoint), registry, settings);
    let mut console = ScriptedConsole::new(["hello", "anyone?"]);

    let err = turn_loop.run(&mut console).await.unwrap_err();

    assert!(matches!(err, TurnloopError::Timeout(5000)));
    assert_eq!(turn_loop.state(), LoopState::Exiting);
    assert_eq!(turn_loop.conversation().turns(), &[Turn::user("hello")]);
    assert_eq!(console.dumps.len(), 1);
}

#[tokio::test]
async fn resumed_log_ending_in_output_queries_first() {
    let stored = Conversation::from_turns([
        Turn::user("flights?"),
        Turn::call("c1", "get_available_flights", json!({})),
        Turn::output("c1", "[]"),
    ])
    .unwrap();
    let endpoint = Arc::new(ScriptedEndpoint::new().respond(vec![Turn::assistant("None today.")]));
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint.clone(), registry, test_settings())
        .resume(stored)
        .unwrap();
    assert_eq!(turn_loop.state(), LoopState::QueryingModel { round: 1 });
    let mut console = ScriptedConsole::new(Vec::<String>::new());

    turn_loop.run(&mut console).await.unwrap();

    assert_eq!(console.replies, vec!["None today."]);
    assert_eq!(endpoint.requests()[0].turns.len(), 3);
}

#[tokio::test]
async fn resume_rejects_unanswered_calls() {
    let stored = Conversation::from_turns([
        Turn::user("flights?"),
        Turn::call("c1", "get_available_flights", json!({})),
    ])
    .unwrap();
    let (_desk, registry) = flight_registry();

    let result = TurnLoop::new(Arc::new(ScriptedEndpoint::new()), registry, test_settings())
        .resume(stored);

    assert!(matches!(result, Err(TurnloopError::ConversationInvariant(_))));
}

#[tokio::test]
async fn step_walks_the_state_machine() {
    let endpoint = Arc::new(
        ScriptedEndpoint::new()
            .respond(vec![Turn::call("c1", "get_available_flights", json!({}))])
            .respond(vec![Turn::assistant("Here they are.")]),
    );
    let (_desk, registry) = flight_registry();
    let mut turn_loop = TurnLoop::new(endpoint, registry, test_settings());
    let mut console = ScriptedConsole::new(["flights"]);

    let mut states = Vec::new();
    while !turn_loop.state().is_terminal() {
        states.push(turn_loop.step(&mut console).await.unwrap());
    }

    assert_eq!(
        states,
        vec![
            LoopState::QueryingModel { round: 1 },
            LoopState::ProcessingFunctionCalls { first_new: 1, round: 1 },
            LoopState::QueryingModel { round: 2 },
            LoopState::ProcessingFunctionCalls { first_new: 3, round: 2 },
            LoopState::AwaitingUserInput,
            LoopState::Exiting,
        ]
    );
}

#[tokio::test]
async fn conversations_share_one_registry() {
    let (desk, registry) = flight_registry();
    let mut handles = Vec::new();
    for (idx, from) in ["Miami", "Boston"].into_iter().enumerate() {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let endpoint = Arc::new(
                ScriptedEndpoint::new()
                    .respond(vec![Turn::call(
                        format!("c{idx}"),
                        "book_flight",
                        json!({"from_city": from, "to_city": "Chicago", "date": "2025-04-05"}),
                    )])
                    .respond(vec![Turn::assistant("Booked.")]),
            );
            let mut turn_loop = TurnLoop::new(endpoint, registry, test_settings());
            let mut console = ScriptedConsole::new(["book it"]);
            turn_loop.run(&mut console).await.unwrap();
            turn_loop.into_conversation()
        }));
    }

    for handle in handles {
        let conversation = handle.await.unwrap();
        assert_eq!(conversation.len(), 4);
        assert_log_invariants(conversation.turns());
    }
    assert_eq!(desk.bookings().len(), 2);
}
