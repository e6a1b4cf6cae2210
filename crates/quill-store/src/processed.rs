use chrono::Utc;
use rusqlite::{params, Connection};

use quill_core::ids::EventId;

use crate::error::StoreError;
use crate::row_helpers::fmt_ts;

/// Per-consumer set of event-ids already handled. This is the idempotency
/// barrier against broker redelivery: a consumer records an event-id after
/// its side effects are durable, and skips any event-id already present.
pub struct ProcessedEventRepo;

impl ProcessedEventRepo {
    pub fn contains(
        conn: &Connection,
        consumer: &str,
        event_id: EventId,
    ) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM processed_events WHERE consumer = ?1 AND event_id = ?2",
            params![consumer, event_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record an event-id. Returns false when it was already recorded.
    pub fn record(
        conn: &Connection,
        consumer: &str,
        event_id: EventId,
    ) -> Result<bool, StoreError> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO processed_events (consumer, event_id, processed_at)
             VALUES (?1, ?2, ?3)",
            params![consumer, event_id.to_string(), fmt_ts(Utc::now())],
        )?;
        Ok(changed > 0)
    }

    /// Drop entries older than the cutoff; the set would otherwise grow
    /// without bound.
    pub fn prune_before(
        conn: &Connection,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let removed = conn.execute(
            "DELETE FROM processed_events WHERE processed_at < ?1",
            params![fmt_ts(cutoff)],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn record_then_contains() {
        let db = Database::in_memory().unwrap();
        let event_id = EventId::new();

        let fresh = db
            .with_conn(|conn| {
                assert!(!ProcessedEventRepo::contains(conn, "recurrence", event_id)?);
                ProcessedEventRepo::record(conn, "recurrence", event_id)
            })
            .unwrap();
        assert!(fresh);

        let seen = db
            .with_conn(|conn| ProcessedEventRepo::contains(conn, "recurrence", event_id))
            .unwrap();
        assert!(seen);
    }

    #[test]
    fn record_twice_reports_duplicate() {
        let db = Database::in_memory().unwrap();
        let event_id = EventId::new();
        db.with_conn(|conn| ProcessedEventRepo::record(conn, "recurrence", event_id))
            .unwrap();
        let second = db
            .with_conn(|conn| ProcessedEventRepo::record(conn, "recurrence", event_id))
            .unwrap();
        assert!(!second);
    }

    #[test]
    fn consumers_are_independent() {
        let db = Database::in_memory().unwrap();
        let event_id = EventId::new();
        db.with_conn(|conn| ProcessedEventRepo::record(conn, "recurrence", event_id))
            .unwrap();
        let other = db
            .with_conn(|conn| ProcessedEventRepo::contains(conn, "notification", event_id))
            .unwrap();
        assert!(!other);
    }

    #[test]
    fn prune_removes_old_entries() {
        let db = Database::in_memory().unwrap();
        let event_id = EventId::new();
        db.with_conn(|conn| ProcessedEventRepo::record(conn, "recurrence", event_id))
            .unwrap();

        let removed = db
            .with_conn(|conn| {
                ProcessedEventRepo::prune_before(conn, Utc::now() + chrono::Duration::hours(1))
            })
            .unwrap();
        assert_eq!(removed, 1);
    }
}
