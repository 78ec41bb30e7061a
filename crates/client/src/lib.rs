// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SkillSwap client SDK: authenticated API access and live notifications.
//!
//! Two collaborating pieces:
//!
//! - [`api::ApiClient`] — cookie-session HTTP client. An expired session is
//!   masked from callers: the first 401 triggers a single-flight refresh of
//!   the session cookie and a one-shot retry; concurrent 401s wait on the
//!   same refresh instead of issuing their own.
//! - [`notify::NotificationChannel`] — per-user push channel over WebSocket.
//!   Maintains a local unread feed, resyncs with an unread snapshot on every
//!   (re)connect, and reconnects with capped exponential backoff on abnormal
//!   closure. A deliberate close (code 1000) never reconnects.

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
