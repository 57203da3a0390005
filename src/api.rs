//! HTTP API for the conversation controller
//!
//! Thin presentation adapter: commands go to the controller handle, state
//! comes back as snapshots over JSON and Server-Sent Events.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ControllerHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
}

impl AppState {
    pub fn new(controller: ControllerHandle) -> Self {
        Self { controller }
    }
}
