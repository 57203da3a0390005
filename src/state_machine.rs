//! Core conversation controller state machine
//!
//! Commands and agent events are folded one at a time by a pure transition
//! function; the runtime executes the effects it returns.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{AgentEvent, Event};
pub use state::{ControllerContext, ControllerState, Message, MessageId, Role, Snapshot, ToolCallRecord};
pub use transition::{transition, TransitionError};
