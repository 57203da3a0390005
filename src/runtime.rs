//! Runtime for a streaming conversation controller
//!
//! One task owns the controller state. Callers talk to it through a
//! [`ControllerHandle`]; agent sequences are drained by short-lived pump
//! tasks that feed the same event channel.

mod executor;
pub mod traits;


pub use executor::ControllerRuntime;
pub use traits::*;

use crate::state_machine::{Event, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

/// Errors surfaced by [`ControllerHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Controller has stopped")]
    Closed,
}

/// Channel sizing and agent timeouts for a controller
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Capacity of the command/event channel
    pub event_buffer: usize,
    /// Capacity of the snapshot broadcast; slow subscribers skip ahead
    pub snapshot_buffer: usize,
    /// Longest the agent may take to acknowledge a reset
    pub reset_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            snapshot_buffer: 256,
            reset_timeout: Duration::from_secs(10),
        }
    }
}

/// Start a controller task and return a handle to it
///
/// `agent` is optional; a controller without one ignores every send.
pub fn spawn_controller(
    agent: Option<Arc<dyn Agent>>,
    options: ControllerOptions,
) -> ControllerHandle {
    let (runtime, handle) = ControllerRuntime::new(agent, options);
    tokio::spawn(runtime.run());
    handle
}

/// Handle to a running controller
///
/// Cheap to clone. The controller stops once every handle is dropped and no
/// agent sequence is still being pumped.
#[derive(Clone)]
pub struct ControllerHandle {
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<Snapshot>,
    broadcast_tx: broadcast::Sender<Snapshot>,
}

impl ControllerHandle {
    /// Ask for a reply to `text`. Returns once the request is queued.
    ///
    /// Ignored while an exchange is streaming, for blank text, and when no
    /// agent is configured.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), ControllerError> {
        self.dispatch(Event::UserMessage { text: text.into() }).await
    }

    /// Stop observing the live exchange and finalize it
    pub async fn cancel(&self) -> Result<(), ControllerError> {
        self.dispatch(Event::UserCancel).await
    }

    /// Clear the conversation and the agent's session
    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.dispatch(Event::Reset).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.broadcast_tx.subscribe()
    }

    /// Wait until a published snapshot satisfies `predicate`
    ///
    /// Checks the current snapshot first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&Snapshot) -> bool,
    ) -> Result<Snapshot, ControllerError> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ControllerError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Wait until nothing is streaming
    pub async fn wait_idle(&self) -> Result<Snapshot, ControllerError> {
        self.wait_for(|s| !s.is_streaming).await
    }

    async fn dispatch(&self, event: Event) -> Result<(), ControllerError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| ControllerError::Closed)
    }
}
