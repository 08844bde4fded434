//! Configuration system.
//!
//! `ServerConfig` loads from JSON (every field optional), then the port is
//! resolved from `PORT`, `NODE_PORT`, or the default, in that order.

use std::net::SocketAddr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::physics::{FloorGravity, GRAVITY_FLOOR, GRAVITY_STEP};

pub const DEFAULT_PORT: u16 = 3004;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "SQUARES_CONFIG";

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_ip: String,
    /// Name of the single broadcast room.
    pub room: String,
    /// Client page served on `GET /`.
    pub client_page: String,
    pub gravity_floor: f64,
    pub gravity_step: f64,
    /// Echo gravity-corrected updates back to their origin.
    pub echo_corrections: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_ip: "0.0.0.0".to_string(),
            room: "room1".to_string(),
            client_page: "client/index.html".to_string(),
            gravity_floor: GRAVITY_FLOOR,
            gravity_step: GRAVITY_STEP,
            echo_corrections: false,
        }
    }
}

impl ServerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Builds the config from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = match lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
            Some(path) => {
                debug!(%path, "loading config file");
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read config {path}"))?;
                Self::from_json_str(&text).with_context(|| format!("parse config {path}"))?
            }
            None => Self::default(),
        };
        if let Some(port) = resolve_port(lookup("PORT"), lookup("NODE_PORT"))? {
            debug!(port, "port taken from environment");
            cfg.port = port;
        }
        Ok(cfg)
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_ip, self.port)
            .parse()
            .with_context(|| format!("parse listen address {}:{}", self.bind_ip, self.port))
    }

    pub fn gravity(&self) -> FloorGravity {
        FloorGravity {
            floor: self.gravity_floor,
            step: self.gravity_step,
        }
    }
}

/// First non-empty of `port`, `node_port`. An unparsable winner is an error.
pub fn resolve_port(port: Option<String>, node_port: Option<String>) -> anyhow::Result<Option<u16>> {
    let Some((name, raw)) = [("PORT", port), ("NODE_PORT", node_port)]
        .into_iter()
        .find_map(|(name, v)| v.filter(|s| !s.trim().is_empty()).map(|s| (name, s)))
    else {
        return Ok(None);
    };
    let port = raw
        .trim()
        .parse::<u16>()
        .with_context(|| format!("invalid {name}: {raw:?}"))?;
    Ok(Some(port))
}
