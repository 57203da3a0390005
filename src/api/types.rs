//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub text: String,
}

/// Response for send action
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub queued: bool,
}

/// Response for cancel and reset actions
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Response for version endpoint
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
