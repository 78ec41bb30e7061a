// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the SkillSwap client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the backend API.
    #[arg(long, default_value = "http://127.0.0.1:8000/api", env = "SKILLSWAP_API_URL")]
    pub api_url: String,

    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "SKILLSWAP_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Initial notification-channel reconnect delay in milliseconds.
    #[arg(long, default_value_t = 3000, env = "SKILLSWAP_RECONNECT_INITIAL_MS")]
    pub reconnect_initial_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[arg(long, default_value_t = 60000, env = "SKILLSWAP_RECONNECT_MAX_MS")]
    pub reconnect_max_ms: u64,

    /// Max consecutive failed reconnect attempts before giving up.
    #[arg(long, default_value_t = 10, env = "SKILLSWAP_RECONNECT_MAX_ATTEMPTS")]
    pub reconnect_max_attempts: u32,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial: std::time::Duration::from_millis(self.reconnect_initial_ms),
            max: std::time::Duration::from_millis(self.reconnect_max_ms),
            max_attempts: self.reconnect_max_attempts,
        }
    }
}

/// Backoff policy for notification-channel reconnects.
///
/// The delay doubles after every failed attempt, capped at `max`, and resets
/// once a connection is established.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub initial: std::time::Duration,
    pub max: std::time::Duration,
    pub max_attempts: u32,
}
