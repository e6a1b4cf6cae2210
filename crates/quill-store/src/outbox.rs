use chrono::Utc;
use rusqlite::{params, Connection};

use quill_core::ids::EventId;

use crate::error::StoreError;
use crate::row_helpers::{self, fmt_ts};

/// A pending or published outbox entry. The envelope is stored as the
/// exact JSON that will go over the wire, so the drainer never re-derives
/// payload content from mutated state.
#[derive(Clone, Debug)]
pub struct OutboxEntry {
    pub seq: i64,
    pub event_id: EventId,
    pub topic: String,
    pub envelope: String,
}

/// Persistent queue colocated with task state. An enqueue inside the same
/// transaction as the state change makes the intent-to-publish durable:
/// if the bus is down, the state change survives and the drainer retries.
pub struct OutboxRepo;

impl OutboxRepo {
    pub fn enqueue(
        conn: &Connection,
        event_id: EventId,
        topic: &str,
        envelope: &str,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO outbox (event_id, topic, envelope, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![event_id.to_string(), topic, envelope, fmt_ts(Utc::now())],
        )?;
        Ok(())
    }

    /// Oldest unpublished entries, up to `limit`.
    pub fn fetch_unpublished(
        conn: &Connection,
        limit: u32,
    ) -> Result<Vec<OutboxEntry>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT seq, event_id, topic, envelope FROM outbox
             WHERE published_at IS NULL ORDER BY seq ASC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let event_id: String = row_helpers::get(row, 1, "outbox", "event_id")?;
            entries.push(OutboxEntry {
                seq: row_helpers::get(row, 0, "outbox", "seq")?,
                event_id: row_helpers::parse_id(&event_id, "outbox", "event_id")?,
                topic: row_helpers::get(row, 2, "outbox", "topic")?,
                envelope: row_helpers::get(row, 3, "outbox", "envelope")?,
            });
        }
        Ok(entries)
    }

    pub fn mark_published(conn: &Connection, seq: i64) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE outbox SET published_at = ?1 WHERE seq = ?2",
            params![fmt_ts(Utc::now()), seq],
        )?;
        Ok(())
    }

    /// Remove published entries older than the cutoff.
    pub fn prune_published_before(
        conn: &Connection,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let removed = conn.execute(
            "DELETE FROM outbox WHERE published_at IS NOT NULL AND published_at < ?1",
            params![fmt_ts(cutoff)],
        )?;
        Ok(removed)
    }
}
