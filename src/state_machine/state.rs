//! Controller state types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Transcript
// ============================================================================

/// Identifier of a message, unique for the lifetime of a controller
///
/// Ids are never reused, not even across a reset, so a stale id held by an
/// observer can't point at a newer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A tool invocation recorded on an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: Map<String, Value>,
    /// Absent while the invocation is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolCallRecord {
    pub fn pending(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
            result: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: text.into(),
            tool_calls: Vec::new(),
            streaming: false,
        }
    }

    /// Empty assistant message that is still being streamed into
    pub fn streaming_assistant(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            tool_calls: Vec::new(),
            streaming: true,
        }
    }

    /// First tool call with this name that has no result yet
    pub fn pending_tool_call_mut(&mut self, name: &str) -> Option<&mut ToolCallRecord> {
        self.tool_calls
            .iter_mut()
            .find(|call| call.name == name && call.is_pending())
    }
}

// ============================================================================
// Controller State
// ============================================================================

/// Everything the controller knows about the conversation
///
/// `streaming` and `active_tools` are views over the transcript and the live
/// agent sequence; they only change together with it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    transcript: Vec<Message>,
    streaming: bool,
    /// Names of pending tools, in first-invocation order, without duplicates
    active_tools: Vec<String>,
    last_error: Option<String>,
    /// Advanced by every send, cancel and reset
    generation: u64,
    /// The assistant message currently being streamed into
    live_message: Option<MessageId>,
    next_id: u64,
}

impl ControllerState {
    pub fn messages(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn active_tools(&self) -> &[String] {
        &self.active_tools
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether events tagged with `generation` should still be applied
    pub fn is_live(&self, generation: u64) -> bool {
        self.streaming && generation == self.generation
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    pub(crate) fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Append the user message and a streaming assistant placeholder, and
    /// return the generation the new exchange runs under.
    pub(crate) fn begin_exchange(&mut self, text: &str) -> u64 {
        let user_id = self.allocate_id();
        self.transcript.push(Message::user(user_id, text));

        let assistant_id = self.allocate_id();
        self.transcript.push(Message::streaming_assistant(assistant_id));
        self.live_message = Some(assistant_id);

        self.streaming = true;
        self.last_error = None;
        self.advance_generation()
    }

    pub(crate) fn live_message_mut(&mut self) -> Option<&mut Message> {
        let id = self.live_message?;
        // The live message is almost always the last one
        self.transcript.iter_mut().rev().find(|m| m.id == id)
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub(crate) fn activate_tool(&mut self, name: &str) {
        if !self.active_tools.iter().any(|t| t == name) {
            self.active_tools.push(name.to_string());
        }
    }

    pub(crate) fn deactivate_tool(&mut self, name: &str) {
        self.active_tools.retain(|t| t != name);
    }

    /// Freeze the live assistant message and end streaming
    ///
    /// Pending tool calls keep an absent result; only the live set is cleared.
    pub(crate) fn finalize(&mut self) {
        if let Some(message) = self.live_message_mut() {
            message.streaming = false;
        }
        self.live_message = None;
        self.streaming = false;
        self.active_tools.clear();
    }

    /// Drop the conversation. The id counter keeps running.
    pub(crate) fn clear(&mut self) {
        self.transcript.clear();
        self.live_message = None;
        self.streaming = false;
        self.active_tools.clear();
        self.last_error = None;
        self.advance_generation();
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Read-only view handed to observers after every state change
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub is_streaming: bool,
    pub active_tools: Vec<String>,
    pub error: Option<String>,
}

impl From<&ControllerState> for Snapshot {
    fn from(state: &ControllerState) -> Self {
        Self {
            messages: state.transcript.clone(),
            is_streaming: state.streaming,
            active_tools: state.active_tools.clone(),
            error: state.last_error.clone(),
        }
    }
}

impl Snapshot {
    /// The most recent assistant message, if any
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Fixed facts about a controller instance
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerContext {
    /// Whether an agent was injected; without one every send is ignored
    pub has_agent: bool,
}

impl ControllerContext {
    pub fn new(has_agent: bool) -> Self {
        Self { has_agent }
    }
}
