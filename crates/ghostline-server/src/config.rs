//! Server configuration
//!
//! Defaults carry the protocol constants; a TOML file can override any of
//! them. Values are milliseconds unless named otherwise.

use crate::rate_limit::RateLimitConfig;
use crate::registry::RegistryConfig;
use ghostline_core::{GhostError, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServerConfig {
    /// Socket address the HTTP surface binds to
    pub bind_address: String,
    /// Session time-to-live
    pub session_ttl_ms: u64,
    /// Rate-limit window size
    pub rate_window_ms: u64,
    /// Admitted creations per origin per window
    pub rate_ceiling: u32,
    /// Retention for spent rate-limit buckets
    pub bucket_retention_ms: u64,
    /// Interval between scheduled sweeps
    pub sweep_interval_ms: u64,
    /// Buffer size of the trap-alert channel
    pub alert_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8970".to_string(),
            session_ttl_ms: 30 * 60 * 1000,
            rate_window_ms: 60 * 60 * 1000,
            rate_ceiling: 10,
            bucket_retention_ms: 2 * 60 * 60 * 1000,
            sweep_interval_ms: 10 * 60 * 1000,
            alert_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GhostError::internal(format!("failed to read config: {e}")))?;
        toml::from_str(&text)
            .map_err(|e| GhostError::internal(format!("failed to parse config: {e}")))
    }

    /// Registry view of this configuration
    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            ttl_ms: self.session_ttl_ms,
        }
    }

    /// Rate limiter view of this configuration
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            window_ms: self.rate_window_ms,
            ceiling: self.rate_ceiling,
            retention_ms: self.bucket_retention_ms,
        }
    }
}
