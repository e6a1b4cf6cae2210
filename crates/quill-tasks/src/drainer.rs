//! Outbox drainer: moves durable intent-to-publish records onto the bus.
//!
//! Runs on its own cadence, independent of the request path. Transient
//! bus failures leave entries unpublished for the next pass (at-least-once
//! delivery; consumers dedup on event-id). Permanently rejected envelopes
//! are logged and marked so a poison entry cannot wedge the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use quill_core::CoreError;
use quill_events::EventBus;
use quill_store::outbox::OutboxRepo;
use quill_store::Database;

pub const DEFAULT_TICK: Duration = Duration::from_secs(2);
pub const DEFAULT_BATCH: u32 = 100;

pub struct OutboxDrainer {
    db: Database,
    bus: Arc<dyn EventBus>,
    tick: Duration,
    batch: u32,
}

impl OutboxDrainer {
    pub fn new(db: Database, bus: Arc<dyn EventBus>) -> Self {
        Self {
            db,
            bus,
            tick: DEFAULT_TICK,
            batch: DEFAULT_BATCH,
        }
    }

    pub fn with_cadence(mut self, tick: Duration, batch: u32) -> Self {
        self.tick = tick;
        self.batch = batch;
        self
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        info!(tick_ms = self.tick.as_millis() as u64, "outbox drainer started");
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("outbox drainer stopped");
                        break;
                    }
                    _ = tokio::time::sleep(self.tick) => {
                        if let Err(e) = self.drain_once().await {
                            warn!(error = %e, "outbox drain failed");
                        }
                    }
                }
            }
        })
    }

    /// Publish pending entries in order. Returns how many were published.
    pub async fn drain_once(&self) -> Result<usize, CoreError> {
        let pending = self
            .db
            .with_conn(|conn| OutboxRepo::fetch_unpublished(conn, self.batch))?;

        let mut published = 0;
        for entry in pending {
            let envelope: quill_events::EventEnvelope = match serde_json::from_str(&entry.envelope)
            {
                Ok(envelope) => envelope,
                Err(e) => {
                    // A corrupt entry must not wedge the queue.
                    error!(seq = entry.seq, error = %e, "corrupt outbox envelope, discarding");
                    self.db
                        .with_conn(|conn| OutboxRepo::mark_published(conn, entry.seq))?;
                    continue;
                }
            };

            match self.bus.publish(&entry.topic, &envelope).await {
                Ok(()) => {
                    self.db
                        .with_conn(|conn| OutboxRepo::mark_published(conn, entry.seq))?;
                    published += 1;
                }
                Err(CoreError::UpstreamPermanent(detail)) => {
                    error!(
                        event_id = %entry.event_id,
                        topic = %entry.topic,
                        detail = %detail,
                        "outbox entry permanently rejected, discarding"
                    );
                    self.db
                        .with_conn(|conn| OutboxRepo::mark_published(conn, entry.seq))?;
                }
                Err(e) => {
                    // Bus unavailable; stop here and retry the rest next
                    // tick, preserving enqueue order.
                    warn!(event_id = %entry.event_id, error = %e, "bus unavailable, will retry");
                    break;
                }
            }
        }
        Ok(published)
    }
}
