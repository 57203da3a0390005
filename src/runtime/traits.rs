//! Trait abstractions for runtime I/O
//!
//! The controller only talks to its agent through [`Agent`], so tests can
//! hand it scripted event sequences.

use crate::agent::AgentError;
use crate::state_machine::AgentEvent;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Lazy, finite, one-shot sequence of agent events
///
/// An `Err` item ends the exchange with an iteration failure.
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent, AgentError>>;

/// Conversational agent the controller streams replies from
#[async_trait]
pub trait Agent: Send + Sync {
    /// Start a reply to `text`. Every call yields an independent sequence.
    async fn chat(&self, text: &str) -> Result<AgentEventStream, AgentError>;

    /// Discard any session memory kept for this controller
    async fn reset(&self);
}

#[async_trait]
impl<T: Agent + ?Sized> Agent for Arc<T> {
    async fn chat(&self, text: &str) -> Result<AgentEventStream, AgentError> {
        (**self).chat(text).await
    }

    async fn reset(&self) {
        (**self).reset().await;
    }
}
