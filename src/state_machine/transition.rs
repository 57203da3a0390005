//! Pure state transition function
//!
//! Folds exactly one event into the controller state and reports the effects
//! the runtime has to perform. No I/O happens here.

use super::{AgentEvent, ControllerContext, ControllerState, Effect, Event};
use thiserror::Error;

/// Reasons a command is turned away
///
/// Rejected commands leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("An exchange is already streaming, wait for it to finish")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("No agent is configured")]
    NoAgent,
}

/// Pure transition function
///
/// Given the same state and event it always produces the same new state and
/// effects.
pub fn transition(
    state: &mut ControllerState,
    context: &ControllerContext,
    event: Event,
) -> Result<Vec<Effect>, TransitionError> {
    match event {
        // ============================================================
        // Caller commands
        // ============================================================
        Event::UserMessage { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if !context.has_agent {
                return Err(TransitionError::NoAgent);
            }
            if state.is_streaming() {
                return Err(TransitionError::Busy);
            }

            let generation = state.begin_exchange(text);
            Ok(vec![
                Effect::PublishSnapshot,
                Effect::open_stream(generation, text),
            ])
        }

        Event::UserCancel => {
            if !state.is_streaming() {
                return Ok(vec![]);
            }
            // Anything still in flight from the cancelled sequence now
            // carries an outdated generation.
            state.advance_generation();
            state.finalize();
            Ok(vec![Effect::CancelStream, Effect::PublishSnapshot])
        }

        Event::Reset => {
            state.clear();
            // Observers see the cleared transcript before the agent is told
            Ok(vec![
                Effect::CancelStream,
                Effect::PublishSnapshot,
                Effect::ResetAgent,
            ])
        }

        // ============================================================
        // Agent stream
        // ============================================================
        Event::Agent { generation, event } => {
            if !state.is_live(generation) {
                tracing::debug!(
                    generation,
                    current = state.generation(),
                    kind = event.kind(),
                    "Ignoring event from a stale sequence"
                );
                return Ok(vec![]);
            }
            apply_agent_event(state, event);
            Ok(vec![Effect::PublishSnapshot])
        }

        Event::StreamEnded {
            generation,
            failure,
        } => {
            if !state.is_live(generation) {
                return Ok(vec![]);
            }
            if let Some(failure) = failure {
                state.set_error(failure);
            }
            state.finalize();
            Ok(vec![Effect::PublishSnapshot])
        }
    }
}

/// Apply one agent event to the live assistant message
fn apply_agent_event(state: &mut ControllerState, event: AgentEvent) {
    match event {
        AgentEvent::Text { content } => {
            if let Some(message) = state.live_message_mut() {
                message.content.push_str(&content);
            }
        }

        AgentEvent::ToolCall {
            tool_name,
            tool_args,
        } => {
            if let Some(message) = state.live_message_mut() {
                message
                    .tool_calls
                    .push(super::ToolCallRecord::pending(tool_name.clone(), tool_args));
            }
            state.activate_tool(&tool_name);
        }

        AgentEvent::ToolResult {
            tool_name,
            tool_result,
        } => {
            let matched = state
                .live_message_mut()
                .and_then(|message| message.pending_tool_call_mut(&tool_name))
                .map(|call| call.result = Some(tool_result))
                .is_some();

            if matched {
                state.deactivate_tool(&tool_name);
            } else {
                tracing::warn!(tool = %tool_name, "Dropping tool result with no pending call");
            }
        }

        AgentEvent::Error { error } => {
            tracing::warn!(error = %error, "Agent reported an error");
            state.set_error(error);
        }

        AgentEvent::Done => {}

        AgentEvent::Unknown => {
            tracing::debug!("Ignoring unrecognized agent event");
        }
    }
}
