// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, TimeZone, Utc};

use super::{Notification, NotificationFeed, PushMessage};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn notif(id: i64, secs: i64, is_read: bool) -> Notification {
    Notification {
        id,
        title: format!("title {id}"),
        message: format!("message {id}"),
        sender_name: "amara".to_owned(),
        timestamp: ts(secs),
        is_read,
    }
}

// ── insert_new ────────────────────────────────────────────────────────

#[test]
fn insert_orders_newest_first() {
    let mut feed = NotificationFeed::default();
    assert!(feed.insert_new(notif(1, 100, false)));
    assert!(feed.insert_new(notif(2, 300, false)));
    assert!(feed.insert_new(notif(3, 200, false)));

    let ids: Vec<i64> = feed.items().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
    assert_eq!(feed.unread_count(), 3);
}

#[test]
fn insert_ignores_duplicate_id() {
    let mut feed = NotificationFeed::default();
    assert!(feed.insert_new(notif(7, 100, false)));
    assert!(!feed.insert_new(notif(7, 999, false)));
    assert_eq!(feed.items().len(), 1);
    assert_eq!(feed.items()[0].timestamp, ts(100));
}

// ── merge_snapshot ────────────────────────────────────────────────────

#[test]
fn merge_dedupes_and_sorts_descending() {
    let mut feed = NotificationFeed::default();
    feed.insert_new(notif(1, 100, false));
    feed.insert_new(notif(2, 200, false));

    feed.merge_snapshot(vec![notif(2, 200, false), notif(3, 300, false), notif(4, 50, false)]);

    let ids: Vec<i64> = feed.items().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![3, 2, 1, 4]);
    assert_eq!(feed.unread_count(), 4);
}

#[test]
fn merge_retains_local_entries_missing_from_snapshot() {
    let mut feed = NotificationFeed::default();
    feed.insert_new(notif(1, 100, true));

    feed.merge_snapshot(vec![notif(2, 200, false)]);

    assert_eq!(feed.items().len(), 2);
    assert_eq!(feed.unread_count(), 1);
}

#[test]
fn merge_takes_snapshot_content_for_known_ids() {
    let mut feed = NotificationFeed::default();
    feed.insert_new(notif(1, 100, false));

    let mut updated = notif(1, 100, false);
    updated.message = "edited on the server".to_owned();
    feed.merge_snapshot(vec![updated]);

    assert_eq!(feed.items()[0].message, "edited on the server");
}

#[test]
fn locally_read_survives_unread_snapshot() {
    // The snapshot races the mark_read acknowledgement: it still lists the
    // notification as unread. Read-state is monotonic, so it stays read.
    let mut feed = NotificationFeed::default();
    feed.insert_new(notif(1, 100, false));
    assert!(feed.mark_read(1));

    feed.merge_snapshot(vec![notif(1, 100, false)]);

    assert!(feed.items()[0].is_read);
    assert_eq!(feed.unread_count(), 0);
}

// ── mark_read ─────────────────────────────────────────────────────────

#[test]
fn mark_read_is_idempotent_and_count_never_negative() {
    let mut feed = NotificationFeed::default();
    feed.insert_new(notif(1, 100, false));

    assert!(feed.mark_read(1));
    assert_eq!(feed.unread_count(), 0);
    assert!(!feed.mark_read(1));
    assert_eq!(feed.unread_count(), 0);
    assert!(!feed.mark_read(42)); // unknown id
    assert_eq!(feed.unread_count(), 0);
}

// ── wire format ───────────────────────────────────────────────────────

#[test]
fn push_message_parses_tagged_wire_format() -> anyhow::Result<()> {
    let raw = r#"{
        "type": "new_notification",
        "notification": {
            "id": 9,
            "title": "Session request",
            "message": "Bekah wants to book an hour of woodworking",
            "sender_name": "bekah",
            "timestamp": "2026-08-01T10:00:00Z",
            "isRead": false
        }
    }"#;
    match serde_json::from_str::<PushMessage>(raw)? {
        PushMessage::NewNotification { notification } => {
            assert_eq!(notification.id, 9);
            assert!(!notification.is_read);
        }
        other => panic!("unexpected message: {other:?}"),
    }
    Ok(())
}

#[test]
fn client_message_serializes_with_type_tag() -> anyhow::Result<()> {
    let text = serde_json::to_string(&super::ClientMessage::MarkRead { notification_id: 5 })?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(value["type"], "mark_read");
    assert_eq!(value["notification_id"], 5);

    let text = serde_json::to_string(&super::ClientMessage::FetchUnreadNotifications)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(value["type"], "fetch_unread_notifications");
    Ok(())
}

// ── merge properties ──────────────────────────────────────────────────

proptest::proptest! {
    /// Any snapshot merged over any local feed yields unique ids ordered by
    /// timestamp descending.
    #[test]
    fn merge_yields_unique_sorted_feed(
        local in proptest::collection::vec((0i64..20, 0i64..1000, proptest::bool::ANY), 0..10),
        snapshot in proptest::collection::vec((0i64..20, 0i64..1000, proptest::bool::ANY), 0..10),
    ) {
        let mut feed = NotificationFeed::default();
        for (id, secs, read) in local {
            feed.insert_new(notif(id, secs, read));
        }
        feed.merge_snapshot(snapshot.into_iter().map(|(id, secs, read)| notif(id, secs, read)).collect());

        let items = feed.items();
        let mut ids: Vec<i64> = items.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        ids.dedup();
        proptest::prop_assert_eq!(ids.len(), items.len());
        for pair in items.windows(2) {
            proptest::prop_assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }
}
