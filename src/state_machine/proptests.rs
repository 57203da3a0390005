//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ControllerContext {
    ControllerContext::new(true)
}

/// Start an exchange and return its generation
fn begin(state: &mut ControllerState, text: &str) -> u64 {
    transition(
        state,
        &test_context(),
        Event::UserMessage {
            text: text.to_string(),
        },
    )
    .expect("idle controller should accept a message");
    state.generation()
}

fn fold(state: &mut ControllerState, generation: u64, events: &[AgentEvent]) {
    for event in events {
        let result = transition(
            state,
            &test_context(),
            Event::Agent {
                generation,
                event: event.clone(),
            },
        );
        assert!(result.is_ok(), "agent events must never be rejected");
    }
}

fn end(state: &mut ControllerState, generation: u64) {
    transition(
        state,
        &test_context(),
        Event::StreamEnded {
            generation,
            failure: None,
        },
    )
    .expect("stream end must never be rejected");
}

/// Split `text` at the given char offsets
fn split_at_chars(text: &str, cuts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut offsets: Vec<usize> = cuts.iter().map(|c| c % (chars.len() + 1)).collect();
    offsets.push(0);
    offsets.push(chars.len());
    offsets.sort_unstable();
    offsets.dedup();
    offsets
        .windows(2)
        .map(|w| chars[w[0]..w[1]].iter().collect())
        .collect()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("lookup".to_string()),
        Just("search".to_string()),
        Just("calc".to_string()),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(|s| json!(s)),
        ("[a-z]{1,4}", any::<i32>())
            .prop_map(|(k, v)| Value::Object(std::iter::once((k, json!(v))).collect())),
    ]
}

fn arb_agent_event() -> impl Strategy<Value = AgentEvent> {
    prop_oneof![
        "[a-zA-Z ]{0,12}".prop_map(AgentEvent::text),
        (arb_tool_name(), arb_json()).prop_map(|(name, args)| AgentEvent::tool_call(name, args)),
        (arb_tool_name(), arb_json()).prop_map(|(name, result)| AgentEvent::tool_result(name, result)),
        "[a-z ]{1,12}".prop_map(AgentEvent::error),
        Just(AgentEvent::Done),
        Just(AgentEvent::Unknown),
    ]
}

fn arb_agent_events() -> impl Strategy<Value = Vec<AgentEvent>> {
    proptest::collection::vec(arb_agent_event(), 0..30)
}

fn text_of(events: &[AgentEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Text { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: content is the in-order concatenation of every text delta
    #[test]
    fn prop_content_is_concatenated_deltas(events in arb_agent_events()) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &events);

        let reply = state.messages().last().unwrap();
        prop_assert_eq!(&reply.content, &text_of(&events));
    }

    // Invariant 2: chunking granularity does not change the result
    #[test]
    fn prop_chunking_does_not_change_content(
        text in "\\PC{0,40}",
        cuts in proptest::collection::vec(any::<usize>(), 0..10)
    ) {
        let mut whole = ControllerState::default();
        let generation = begin(&mut whole, "hi");
        fold(&mut whole, generation, &[AgentEvent::text(text.clone())]);

        let chunks: Vec<AgentEvent> = split_at_chars(&text, &cuts)
            .into_iter()
            .map(AgentEvent::text)
            .collect();
        let mut chunked = ControllerState::default();
        let generation = begin(&mut chunked, "hi");
        fold(&mut chunked, generation, &chunks);

        prop_assert_eq!(&whole.messages()[1].content, &text);
        prop_assert_eq!(&chunked.messages()[1].content, &text);
    }

    // Invariant 3: a result resolves the first pending call of that name
    #[test]
    fn prop_result_resolves_first_pending_call(
        name in arb_tool_name(),
        calls in 1usize..4,
        result in arb_json()
    ) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        let invocations: Vec<AgentEvent> =
            (0..calls).map(|i| AgentEvent::tool_call(name.clone(), json!({ "i": i }))).collect();
        fold(&mut state, generation, &invocations);
        fold(&mut state, generation, &[AgentEvent::tool_result(name.clone(), result.clone())]);

        let reply = state.messages().last().unwrap();
        prop_assert_eq!(reply.tool_calls.len(), calls);
        prop_assert_eq!(reply.tool_calls[0].result.as_ref(), Some(&result));
        for call in &reply.tool_calls[1..] {
            prop_assert!(call.is_pending());
        }
        prop_assert!(!state.active_tools().contains(&name));
    }

    // Invariant 4: an unmatched result creates nothing and changes nothing
    #[test]
    fn prop_unmatched_result_is_dropped(name in arb_tool_name(), result in arb_json()) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &[AgentEvent::text("x")]);
        let before = state.clone();

        fold(&mut state, generation, &[AgentEvent::tool_result(name, result)]);
        prop_assert_eq!(state, before);
    }

    // Invariant 5: finalization always ends streaming and clears active tools
    #[test]
    fn prop_finalize_clears_live_state(events in arb_agent_events()) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &events);
        end(&mut state, generation);

        prop_assert!(!state.is_streaming());
        prop_assert!(state.active_tools().is_empty());
        prop_assert!(state.messages().iter().all(|m| !m.streaming));
    }

    // Invariant 6: at most one message is streaming, and only while the
    // controller is streaming
    #[test]
    fn prop_single_streaming_message(
        first in arb_agent_events(),
        second in arb_agent_events()
    ) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "one");
        fold(&mut state, generation, &first);
        end(&mut state, generation);
        let generation = begin(&mut state, "two");
        fold(&mut state, generation, &second);

        let streaming = state.messages().iter().filter(|m| m.streaming).count();
        prop_assert_eq!(streaming, 1);
        prop_assert!(state.messages().last().unwrap().streaming);
    }

    // Invariant 7: sending while streaming is rejected without any effect
    #[test]
    fn prop_send_while_streaming_is_rejected(
        events in arb_agent_events(),
        text in "[a-z]{1,10}"
    ) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &events);
        let before = state.clone();

        let result = transition(&mut state, &test_context(), Event::UserMessage { text });
        prop_assert_eq!(result, Err(TransitionError::Busy));
        prop_assert_eq!(state, before);
    }

    // Invariant 8: events from before a reset never touch the reset state
    #[test]
    fn prop_reset_isolates_stale_events(
        before_reset in arb_agent_events(),
        after_reset in arb_agent_events()
    ) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &before_reset);

        transition(&mut state, &test_context(), Event::Reset).unwrap();
        let reset = state.clone();

        fold(&mut state, generation, &after_reset);
        end(&mut state, generation);
        prop_assert_eq!(&state, &reset);
        prop_assert!(state.messages().is_empty());
    }

    // Invariant 9: stale events cannot leak into a newer exchange
    #[test]
    fn prop_stale_events_skip_new_exchange(
        stale in arb_agent_events(),
        fresh in arb_agent_events()
    ) {
        let mut state = ControllerState::default();
        let old = begin(&mut state, "one");
        transition(&mut state, &test_context(), Event::UserCancel).unwrap();

        let current = begin(&mut state, "two");
        fold(&mut state, old, &stale);
        fold(&mut state, current, &fresh);

        prop_assert_eq!(&state.messages().last().unwrap().content, &text_of(&fresh));
    }

    // Invariant 10: the last in-band error wins and never ends the exchange
    #[test]
    fn prop_errors_do_not_end_exchange(events in arb_agent_events()) {
        let mut state = ControllerState::default();
        let generation = begin(&mut state, "hi");
        fold(&mut state, generation, &events);

        let last_error = events.iter().rev().find_map(|e| match e {
            AgentEvent::Error { error } => Some(error.as_str()),
            _ => None,
        });
        prop_assert!(state.is_streaming());
        prop_assert_eq!(state.last_error(), last_error);
    }
}
