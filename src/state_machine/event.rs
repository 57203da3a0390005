//! Events that can reach the controller

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step of an agent's response, as it appears on the wire
///
/// Tags the agent does not know about yet decode to [`AgentEvent::Unknown`]
/// and are skipped by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental assistant text
    Text { content: String },

    /// A tool invocation has started
    ToolCall {
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(rename = "toolArgs", default)]
        tool_args: Map<String, Value>,
    },

    /// A previously started tool invocation has completed
    ToolResult {
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(rename = "toolResult", default)]
        tool_result: Value,
    },

    /// In-band error; the sequence may keep going
    Error { error: String },

    /// The sequence is logically finished
    Done,

    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    pub fn text(content: impl Into<String>) -> Self {
        AgentEvent::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        let tool_args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        AgentEvent::ToolCall {
            tool_name: name.into(),
            tool_args,
        }
    }

    pub fn tool_result(name: impl Into<String>, result: Value) -> Self {
        AgentEvent::ToolResult {
            tool_name: name.into(),
            tool_result: result,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AgentEvent::Error {
            error: message.into(),
        }
    }

    /// Wire tag of this event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Text { .. } => "text",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Error { .. } => "error",
            AgentEvent::Done => "done",
            AgentEvent::Unknown => "unknown",
        }
    }
}

/// Inputs to the controller state machine
#[derive(Debug, Clone)]
pub enum Event {
    // Caller commands
    UserMessage {
        text: String,
    },
    UserCancel,
    Reset,

    // Agent stream
    /// One event from the sequence opened for `generation`
    Agent {
        generation: u64,
        event: AgentEvent,
    },
    /// The sequence opened for `generation` stopped producing events
    StreamEnded {
        generation: u64,
        /// Set when the sequence failed rather than ran out
        failure: Option<String>,
    },
}
