// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight gate for session refresh.
//!
//! The first caller to hit an expired session becomes the leader: it runs the
//! refresh and broadcasts the outcome. Callers arriving while the refresh is
//! in flight subscribe to that broadcast instead of issuing their own call,
//! so any number of concurrent expiries collapse into one refresh request.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::broadcast;

/// Shared outcome of one refresh attempt.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The session was re-established; waiters may retry their requests.
    Refreshed,
    /// The refresh failed; waiters fail with the same error.
    Failed(String),
}

/// Gate state: `None` when idle, `Some(sender)` while a refresh is in flight.
///
/// Waiters subscribe to the sender; the leader clears the slot exactly once
/// when the refresh settles, which drains the waiter set for that cycle. The
/// slot is a std mutex — it is only ever held across a few instructions,
/// never across an await.
pub struct RefreshGate {
    in_flight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
}

/// Clears the slot when the leader settles — or when the leader's future is
/// dropped mid-refresh (a caller-side timeout, a cancelled task). In the
/// dropped case the sender is released without an outcome, so waiters see a
/// closed channel and fail as "abandoned" instead of hanging on a sender
/// that will never send.
struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    outcome: Option<RefreshOutcome>,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        let tx = match self.gate.in_flight.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let (Some(tx), Some(outcome)) = (tx, self.outcome.take()) {
            let _ = tx.send(outcome);
        }
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self { in_flight: Mutex::new(None) }
    }

    /// Run `refresh` single-flight and return its outcome.
    ///
    /// If no refresh is in flight the calling task becomes the leader and
    /// drives `refresh` itself; otherwise `refresh` is dropped unpolled and
    /// the call waits for the in-flight leader's outcome.
    pub async fn run<F>(&self, refresh: F) -> RefreshOutcome
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let waiter = {
            let mut slot = match self.in_flight.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            match &*slot {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    *slot = Some(tx);
                    None
                }
            }
        };

        if let Some(mut rx) = waiter {
            // The leader only ever drops the sender after clearing the slot,
            // so a closed channel means the refresh was abandoned.
            return match rx.recv().await {
                Ok(outcome) => outcome,
                Err(_) => RefreshOutcome::Failed("refresh abandoned".to_owned()),
            };
        }

        // Clear in-flight state (via the guard) before notifying: a caller
        // that misses the broadcast starts a fresh cycle rather than waiting
        // forever. The guard also clears it if this future is dropped here.
        let mut guard = LeaderGuard { gate: self, outcome: None };
        let outcome = match refresh.await {
            Ok(()) => RefreshOutcome::Refreshed,
            Err(e) => RefreshOutcome::Failed(format!("{e:#}")),
        };
        guard.outcome = Some(outcome.clone());
        drop(guard);
        outcome
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
