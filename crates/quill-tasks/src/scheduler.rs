//! Reminder sweep loop.
//!
//! Each sweep reads `now` once, claims every matured reminder row inside
//! one transaction (flipping `reminder_sent` before anything is
//! published), then publishes a `reminder.due` event per claimed row.
//! Because the flip is durable before the publish, a crash between the
//! two loses at most that sweep's reminders instead of duplicating them:
//! emission is at-most-once per (task, reminder-setting).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use quill_core::CoreError;
use quill_events::{EventBus, EventEnvelope, ReminderDuePayload, REMINDERS_TOPIC};
use quill_store::tasks::TaskRepo;
use quill_store::Database;

pub const DEFAULT_TICK: Duration = Duration::from_secs(60);
pub const DEFAULT_BATCH: u32 = 200;

pub struct ReminderScheduler {
    db: Database,
    bus: Arc<dyn EventBus>,
    tick: Duration,
    batch: u32,
}

impl ReminderScheduler {
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

    /// Run sweeps until cancelled.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        info!(tick_secs = self.tick.as_secs(), batch = self.batch, "reminder scheduler started");
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("reminder scheduler stopped");
                        break;
                    }
                    _ = tokio::time::sleep(self.tick) => {
                        if let Err(e) = self.sweep_once().await {
                            warn!(error = %e, kind = e.error_kind(), "reminder sweep failed");
                        }
                    }
                }
            }
        })
    }

    /// One find-due / claim / publish cycle. Returns the number of
    /// reminders published.
    pub async fn sweep_once(&self) -> Result<usize, CoreError> {
        // Read the clock once so rows maturing mid-sweep wait for the
        // next tick instead of racing the batch.
        let now = Utc::now();

        let claimed = self
            .db
            .with_tx(|tx| TaskRepo::claim_due_reminders(tx, now, self.batch))?;

        if claimed.is_empty() {
            return Ok(0);
        }

        let mut published = 0;
        for due in &claimed {
            let Some(remind_at) = due.task.remind_at else {
                continue;
            };
            let payload = ReminderDuePayload {
                task_id: due.task.id,
                owner_id: due.task.owner_id,
                owner_email: due.owner_email.clone(),
                title: due.task.title.clone(),
                remind_at,
                due_at: due.task.due_at,
            };
            let envelope = EventEnvelope::reminder_due(due.task.owner_id, &payload);

            match self.bus.publish(REMINDERS_TOPIC, &envelope).await {
                Ok(()) => {
                    published += 1;
                    info!(task_id = %due.task.id, event_id = %envelope.event_id, "reminder published");
                }
                Err(e) => {
                    // The row is already claimed; this reminder is lost
                    // rather than risk a duplicate on retry.
                    warn!(task_id = %due.task.id, error = %e, "reminder publish failed after claim");
                }
            }
        }

        info!(claimed = claimed.len(), published, "reminder sweep complete");
        Ok(published)
    }
}
