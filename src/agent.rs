//! Agent implementations
//!
//! The controller consumes agents through [`crate::runtime::Agent`]; this
//! module provides the HTTP one used in production and a logging wrapper.

mod decode;
mod error;
mod http;

pub use decode::{decode_events, parse_line, LineDecoder, MAX_LINE_BYTES};
pub use error::{AgentError, AgentErrorKind};
pub use http::HttpAgent;

use crate::runtime::{Agent, AgentEventStream};
use async_trait::async_trait;
use std::sync::Arc;

/// Logging wrapper for agents
pub struct LoggingAgent {
    inner: Arc<dyn Agent>,
    name: String,
}

impl LoggingAgent {
    pub fn new(inner: Arc<dyn Agent>, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Agent for LoggingAgent {
    async fn chat(&self, text: &str) -> Result<AgentEventStream, AgentError> {
        let start = std::time::Instant::now();
        let result = self.inner.chat(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    agent = %self.name,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = text.chars().count(),
                    "Agent stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    agent = %self.name,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    error = %e.message,
                    "Agent stream failed to open"
                );
            }
        }

        result
    }

    async fn reset(&self) {
        tracing::info!(agent = %self.name, "Resetting agent session");
        self.inner.reset().await;
    }
}
