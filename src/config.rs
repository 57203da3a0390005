//! Environment-driven configuration

use crate::runtime::ControllerOptions;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    /// Base URL of the agent; without one the controller ignores sends
    pub agent_url: Option<String>,
    pub agent_connect_timeout: Duration,
    pub controller: ControllerOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            agent_url: None,
            agent_connect_timeout: Duration::from_secs(30),
            controller: ControllerOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values keep their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: parse_or(&lookup, "CONVO_BIND", defaults.bind),
            port: parse_or(&lookup, "CONVO_PORT", defaults.port),
            agent_url: lookup("CONVO_AGENT_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            agent_connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "CONVO_AGENT_TIMEOUT_SECS",
                defaults.agent_connect_timeout.as_secs(),
            )),
            controller: ControllerOptions {
                event_buffer: parse_or(
                    &lookup,
                    "CONVO_EVENT_BUFFER",
                    defaults.controller.event_buffer,
                ),
                snapshot_buffer: parse_or(
                    &lookup,
                    "CONVO_SNAPSHOT_BUFFER",
                    defaults.controller.snapshot_buffer,
                ),
                reset_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "CONVO_AGENT_RESET_TIMEOUT_SECS",
                    defaults.controller.reset_timeout.as_secs(),
                )),
            },
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
            default
        }),
    }
}
