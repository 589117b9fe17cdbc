//! Link configuration.
//!
//! Every wait in the core is a cooperative poll; each component gets its own
//! tick so a deployment can tune connect, read, and flow pacing separately.

use crate::error::{LinkError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default tick for all polling loops, in milliseconds.
const DEFAULT_POLL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Time between radio-enabled checks while a connect attempt waits for
    /// the adapter, and between liveness checks during the handshake.
    pub connect_poll_ms: u64,

    /// Time between input polls in the read loop.
    pub read_poll_ms: u64,

    /// Time between ready-to-send checks in packetized writes.
    pub flow_poll_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_poll_ms: DEFAULT_POLL_MS,
            read_poll_ms: DEFAULT_POLL_MS,
            flow_poll_ms: DEFAULT_POLL_MS,
        }
    }
}

impl LinkConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| LinkError::Config(e.to_string()))
    }

    /// Load a config from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LinkError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn connect_poll(&self) -> Duration {
        Duration::from_millis(self.connect_poll_ms)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms)
    }

    pub fn flow_poll(&self) -> Duration {
        Duration::from_millis(self.flow_poll_ms)
    }
}
