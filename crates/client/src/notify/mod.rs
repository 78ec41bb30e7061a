// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification wire types and the local unread feed.
//!
//! The server is authoritative for notifications; the feed is a derived,
//! locally-mutable copy kept for display. It is append-only within a session:
//! entries are never deleted, only merged and flagged read.

pub mod channel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use channel::NotificationChannel;

/// A single notification as delivered by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isRead")]
    pub is_read: bool,
}

/// Messages pushed by the server over the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// A single new notification for this user.
    NewNotification { notification: Notification },
    /// Full resync listing all currently-unread notifications.
    UnreadNotifications { notifications: Vec<Notification> },
}

/// Messages sent by the client over the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Acknowledge a notification as read.
    MarkRead { notification_id: i64 },
    /// Request an unread snapshot (sent on connect and on demand).
    FetchUnreadNotifications,
}

/// Events emitted to channel consumers.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The channel (re)connected and requested a resync.
    Connected,
    /// A new notification arrived and was added to the feed.
    NewNotification(Notification),
    /// An unread snapshot was merged; carries the recomputed unread count.
    Snapshot { unread: usize },
    /// The connection dropped abnormally; a reconnect is scheduled.
    Disconnected { code: u16 },
    /// Terminal: deliberate close, server-side normal close, or reconnect
    /// attempts exhausted. No further events follow.
    Closed,
}

/// Locally-held notification list, ordered by timestamp descending.
#[derive(Debug, Default)]
pub struct NotificationFeed {
    items: Vec<Notification>,
}

impl NotificationFeed {
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Unread count, recomputed from flags. Derived, never stored, so it can
    /// neither drift nor go negative.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    /// Add a freshly pushed notification. Returns `false` (and leaves the
    /// feed untouched) if its id is already present.
    pub fn insert_new(&mut self, notification: Notification) -> bool {
        if self.items.iter().any(|n| n.id == notification.id) {
            return false;
        }
        self.items.push(notification);
        self.sort();
        true
    }

    /// Merge an unread snapshot into the feed.
    ///
    /// The snapshot is authoritative for membership and content, with one
    /// exception: read-state is monotonic. A notification already marked read
    /// locally stays read even if the snapshot still reports it unread —
    /// `mark_read` acknowledgements race snapshots, and a resync must not
    /// resurrect an unread badge the user has already cleared. Local entries
    /// absent from the snapshot are retained.
    pub fn merge_snapshot(&mut self, snapshot: Vec<Notification>) {
        for mut incoming in snapshot {
            match self.items.iter_mut().find(|n| n.id == incoming.id) {
                Some(existing) => {
                    incoming.is_read = incoming.is_read || existing.is_read;
                    *existing = incoming;
                }
                None => self.items.push(incoming),
            }
        }
        self.sort();
    }

    /// Flip a notification to read. Returns `true` if anything changed.
    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                true
            }
            _ => false,
        }
    }

    fn sort(&mut self) {
        self.items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
