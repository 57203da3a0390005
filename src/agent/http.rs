//! Agent reached over HTTP
//!
//! `POST {base}/chat` answers with newline-delimited JSON events;
//! `POST {base}/reset` drops the session on the agent's side.

use super::{decode_events, AgentError};
use crate::runtime::{Agent, AgentEventStream};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetBody<'a> {
    session_id: &'a str,
}

/// HTTP agent client
pub struct HttpAgent {
    client: Client,
    base_url: String,
    /// Total time allowed for `POST /reset`
    reset_timeout: Duration,
    /// Rotated on every reset
    session_id: Mutex<String>,
}

impl HttpAgent {
    /// Build a client for the agent at `base_url`
    ///
    /// Connecting is bounded by `connect_timeout` and a whole reset request
    /// by `reset_timeout`. A chat reply may stream for as long as the agent
    /// keeps it open.
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        reset_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AgentError::connect(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            reset_timeout,
            session_id: Mutex::new(new_session_id()),
        })
    }

    pub fn session_id(&self) -> String {
        self.session_id
            .lock()
            .map(|id| id.clone())
            .unwrap_or_default()
    }

    fn rotate_session(&self) -> String {
        match self.session_id.lock() {
            Ok(mut id) => std::mem::replace(&mut *id, new_session_id()),
            Err(_) => String::new(),
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl Agent for HttpAgent {
    async fn chat(&self, text: &str) -> Result<AgentEventStream, AgentError> {
        let session_id = self.session_id();
        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&ChatBody {
                message: text,
                session_id: &session_id,
            })
            .send()
            .await
            .map_err(|e| AgentError::connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::status(status.as_u16(), &body));
        }

        Ok(decode_events(response.bytes_stream()).boxed())
    }

    async fn reset(&self) {
        let previous = self.rotate_session();
        let result = self
            .client
            .post(format!("{}/reset", self.base_url))
            .timeout(self.reset_timeout)
            .json(&ResetBody {
                session_id: &previous,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        if let Err(e) = result {
            tracing::warn!(error = %e, "Agent did not acknowledge reset");
        }
    }
}
