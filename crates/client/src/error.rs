// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors surfaced by [`crate::api::ApiClient`].
///
/// A transient session expiry that the refresh-and-retry path recovers from
/// is invisible to callers; these variants are what remains when recovery is
/// not possible or not attempted.
#[derive(Debug)]
pub enum ApiError {
    /// The session was expired and stayed expired after a successful refresh
    /// and one retry. Callers decide whether to re-authenticate.
    Unauthorized,
    /// The refresh call itself failed; every request waiting on it gets this.
    RefreshFailed(String),
    /// Any non-auth error status, passed through unchanged with the body.
    Status(u16, String),
    /// Transport-level failure (connect, timeout, TLS).
    Network(String),
    /// The response body could not be decoded as the expected JSON shape.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("authentication expired"),
            Self::RefreshFailed(e) => write!(f, "session refresh failed: {e}"),
            Self::Status(code, body) => write!(f, "request failed ({code}): {body}"),
            Self::Network(e) => write!(f, "network error: {e}"),
            Self::Decode(e) => write!(f, "malformed response: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
