//! Agent error types

use std::fmt;
use thiserror::Error;

/// Failure to open or keep reading an agent's event sequence
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AgentError {
    pub kind: AgentErrorKind,
    pub message: String,
}

impl AgentError {
    pub fn new(kind: AgentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Connect, message)
    }

    pub fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("agent responded with HTTP {status}")
        } else {
            format!("agent responded with HTTP {status}: {body}")
        };
        Self::new(AgentErrorKind::Status, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Decode, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Stream, message)
    }

    /// Text shown to the user as the exchange's last error
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// Where in the exchange the agent failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// Could not reach the agent
    Connect,
    /// The agent refused the request
    Status,
    /// The agent sent something that is not an event
    Decode,
    /// The event sequence broke off mid-way
    Stream,
}

impl fmt::Display for AgentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Status => "status",
            Self::Decode => "decode",
            Self::Stream => "stream",
        };
        f.write_str(name)
    }
}
