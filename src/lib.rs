//! Streaming conversation controller
//!
//! Turns a caller's text into a request to a conversational agent, folds the
//! agent's incremental events into a transcript, and exposes the result as
//! snapshots that stay consistent across cancels and resets.

pub mod agent;
pub mod api;
pub mod config;
pub mod runtime;
pub mod state_machine;

pub use runtime::{spawn_controller, Agent, ControllerHandle, ControllerOptions};
pub use state_machine::{AgentEvent, Message, Role, Snapshot, ToolCallRecord};
