//! Business logic layer for task state.
//!
//! Wraps the repositories with validation, ownership scoping, and event
//! emission. All mutations run inside a store transaction; the completion
//! event is written to the outbox in the same transaction as the flip, so
//! state change and intent-to-publish commit together.

use chrono::{DateTime, Utc};
use tracing::instrument;

use quill_core::ids::{TaskId, UserId};
use quill_core::task::{
    fold, Priority, Recurrence, Task, DESCRIPTION_MAX_LEN, TAG_MAX_LEN, TITLE_MAX_LEN,
};
use quill_core::CoreError;
use quill_events::{EventEnvelope, TaskCompletedPayload, TASK_EVENTS_TOPIC};
use quill_store::outbox::OutboxRepo;
use quill_store::tags::TagRepo;
use quill_store::tasks::{NewTask, TaskPatch, TaskRepo};
use quill_store::{Database, StoreError};

/// Bounded retries on store contention before surfacing `Conflict`.
const CONFLICT_RETRIES: u32 = 3;

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,
    pub parent_task_id: Option<TaskId>,
    pub tags: Vec<String>,
}

/// Partial update. Outer `Option` = field present, inner = new value
/// (`None` clears). Completion is not updatable here; that path is
/// `toggle_complete`, which owns event emission.
#[derive(Clone, Debug, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub remind_at: Option<Option<DateTime<Utc>>>,
    pub recurrence: Option<Recurrence>,
}

/// Sole authority for task state. Workers and the agent both come through
/// here; nothing else writes tasks.
pub struct TaskService {
    db: Database,
    events_enabled: bool,
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            events_enabled: true,
        }
    }

    /// Disable event emission; completion still mutates state.
    pub fn with_events_disabled(db: Database) -> Self {
        Self {
            db,
            events_enabled: false,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    #[instrument(skip(self, params), fields(owner = %owner))]
    pub fn create_task(&self, owner: UserId, params: CreateTask) -> Result<Task, CoreError> {
        let title = validate_title(&params.title)?;
        let description = validate_description(params.description.as_deref())?;
        let tags: Vec<String> = params
            .tags
            .iter()
            .map(|t| validate_tag(t))
            .collect::<Result<_, _>>()?;
        if let Some(remind_at) = params.remind_at {
            validate_remind_at(remind_at, Utc::now())?;
        }

        let new = NewTask {
            owner_id: owner,
            title,
            description,
            priority: params.priority.unwrap_or_default(),
            due_at: params.due_at,
            remind_at: params.remind_at,
            recurrence: params.recurrence.unwrap_or_default(),
            parent_task_id: params.parent_task_id,
        };

        let task = self.with_retries(|| {
            self.db.with_tx(|tx| {
                // A parent reference must point at a task of the same
                // owner; a fresh task cannot appear in its own ancestry.
                if let Some(parent_id) = new.parent_task_id {
                    TaskRepo::get(tx, owner, parent_id)?.ok_or_else(|| {
                        StoreError::NotFound(format!("parent task {parent_id}"))
                    })?;
                }

                let task = TaskRepo::create(tx, &new)?;
                for name in &tags {
                    let tag = TagRepo::upsert(tx, owner, name)?;
                    TagRepo::attach(tx, task.id, tag.id)?;
                }
                TaskRepo::get(tx, owner, task.id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {}", task.id)))
            })
        })?;
        Ok(task)
    }

    /// A task owned by another principal is indistinguishable from a
    /// missing one.
    pub fn get_task(&self, owner: UserId, id: TaskId) -> Result<Task, CoreError> {
        let task = self.db.with_conn(|conn| TaskRepo::get(conn, owner, id))?;
        task.ok_or(CoreError::NotFound)
    }

    pub fn list_tasks(&self, owner: UserId, filter: &TaskFilter) -> Result<Vec<Task>, CoreError> {
        let now = Utc::now();
        Ok(self
            .db
            .with_conn(|conn| TaskRepo::list(conn, owner, filter, now))?)
    }

    pub fn search_tasks(&self, owner: UserId, query: &str) -> Result<Vec<Task>, CoreError> {
        Ok(self.db.with_conn(|conn| TaskRepo::search(conn, owner, query))?)
    }

    /// Apply a partial update, re-validating like `create_task`. Fields
    /// equal to the current value are stripped first, so an update that
    /// changes nothing writes nothing. Touching `remind_at` in any way
    /// resets `reminder_sent`, making the row eligible for a fresh sweep.
    #[instrument(skip(self, update), fields(owner = %owner, task = %id))]
    pub fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        update: UpdateTask,
    ) -> Result<Task, CoreError> {
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let description = match &update.description {
            Some(value) => Some(validate_description(value.as_deref())?),
            None => None,
        };
        if let Some(Some(remind_at)) = update.remind_at {
            validate_remind_at(remind_at, Utc::now())?;
        }

        let task = self.with_retries(|| {
            self.db.with_tx(|tx| {
                let current = TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;

                let mut patch = TaskPatch::default();
                if let Some(ref new_title) = title {
                    if *new_title != current.title {
                        patch.title = Some(new_title.clone());
                    }
                }
                if let Some(ref new_description) = description {
                    if *new_description != current.description {
                        patch.description = Some(new_description.clone());
                    }
                }
                if let Some(priority) = update.priority {
                    if priority != current.priority {
                        patch.priority = Some(priority);
                    }
                }
                if let Some(due_at) = update.due_at {
                    if due_at != current.due_at {
                        patch.due_at = Some(due_at);
                    }
                }
                if let Some(remind_at) = update.remind_at {
                    if remind_at != current.remind_at {
                        patch.remind_at = Some(remind_at);
                        patch.reminder_sent = Some(false);
                    }
                }
                if let Some(recurrence) = update.recurrence {
                    if recurrence != current.recurrence {
                        patch.recurrence = Some(recurrence);
                    }
                }

                if patch.is_empty() {
                    return Ok(current);
                }

                TaskRepo::update(tx, owner, id, &patch)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
            })
        })?;
        Ok(task)
    }

    /// Delete a task. Tag associations cascade; successor tasks are
    /// independent work items and survive.
    #[instrument(skip(self), fields(owner = %owner, task = %id))]
    pub fn delete_task(&self, owner: UserId, id: TaskId) -> Result<(), CoreError> {
        let deleted = self.db.with_conn(|conn| TaskRepo::delete(conn, owner, id))?;
        if !deleted {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Atomically flip `completed`. On the false→true transition the
    /// completion event is recorded in the outbox inside the same
    /// transaction; true→false publishes nothing.
    #[instrument(skip(self), fields(owner = %owner, task = %id))]
    pub fn toggle_complete(&self, owner: UserId, id: TaskId) -> Result<Task, CoreError> {
        let events_enabled = self.events_enabled;
        let task = self.with_retries(|| {
            self.db.with_tx(|tx| {
                let current = TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;

                let completing = !current.completed;
                let patch = TaskPatch {
                    completed: Some(completing),
                    ..Default::default()
                };
                let updated = TaskRepo::update(tx, owner, id, &patch)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;

                if completing && events_enabled {
                    let payload = TaskCompletedPayload {
                        task_id: updated.id,
                        owner_id: owner,
                        title: updated.title.clone(),
                        priority: updated.priority,
                        completed_at: Utc::now(),
                        recurrence: updated.recurrence,
                        due_at: updated.due_at,
                        parent_task_id: updated.parent_task_id,
                    };
                    let envelope = EventEnvelope::task_completed(owner, &payload);
                    let json = serde_json::to_string(&envelope)?;
                    OutboxRepo::enqueue(tx, envelope.event_id, TASK_EVENTS_TOPIC, &json)?;
                }

                Ok(updated)
            })
        })?;
        Ok(task)
    }

    /// Add a tag by name, creating the tag if missing. Idempotent.
    #[instrument(skip(self), fields(owner = %owner, task = %id))]
    pub fn add_tag(&self, owner: UserId, id: TaskId, name: &str) -> Result<Task, CoreError> {
        let name = validate_tag(name)?;
        let task = self.with_retries(|| {
            self.db.with_tx(|tx| {
                let task = TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
                let tag = TagRepo::upsert(tx, owner, &name)?;
                TagRepo::attach(tx, task.id, tag.id)?;
                TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
            })
        })?;
        Ok(task)
    }

    /// Remove a tag association. Removing an absent tag is a no-op.
    #[instrument(skip(self), fields(owner = %owner, task = %id))]
    pub fn remove_tag(&self, owner: UserId, id: TaskId, name: &str) -> Result<Task, CoreError> {
        let task = self.with_retries(|| {
            self.db.with_tx(|tx| {
                TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
                TagRepo::detach(tx, owner, id, name)?;
                TaskRepo::get(tx, owner, id)?
                    .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
            })
        })?;
        Ok(task)
    }

    /// Set a reminder. The instant must be strictly in the future; the
    /// sent flag resets so the scheduler will emit exactly once for this
    /// setting.
    #[instrument(skip(self), fields(owner = %owner, task = %id))]
    pub fn set_reminder(
        &self,
        owner: UserId,
        id: TaskId,
        remind_at: DateTime<Utc>,
    ) -> Result<Task, CoreError> {
        validate_remind_at(remind_at, Utc::now())?;
        let patch = TaskPatch {
            remind_at: Some(Some(remind_at)),
            reminder_sent: Some(false),
            ..Default::default()
        };
        let task = self
            .db
            .with_conn(|conn| TaskRepo::update(conn, owner, id, &patch))?;
        task.ok_or(CoreError::NotFound)
    }

    fn with_retries<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, CoreError> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(e) if e.is_busy() && attempt < CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, "store contention, retrying");
                }
                Err(e) if e.is_busy() => {
                    return Err(CoreError::Conflict("store contention".into()));
                }
                other => return other.map_err(CoreError::from),
            }
        }
    }
}

fn validate_title(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(CoreError::validation(format!(
            "title must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_description(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(CoreError::validation(format!(
                    "description must be at most {DESCRIPTION_MAX_LEN} characters"
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn validate_tag(raw: &str) -> Result<String, CoreError> {
    let folded = fold(raw);
    if folded.is_empty() {
        return Err(CoreError::validation("tag name must not be empty"));
    }
    if folded.chars().count() > TAG_MAX_LEN {
        return Err(CoreError::validation(format!(
            "tag name must be at most {TAG_MAX_LEN} characters"
        )));
    }
    Ok(folded)
}

fn validate_remind_at(remind_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), CoreError> {
    if remind_at <= now {
        return Err(CoreError::validation("reminder must be in the future"));
    }
    Ok(())
}

// Re-export the filter types alongside the service.
pub use quill_store::tasks::{SortDir, SortKey, TaskFilter};

#[cfg(test)]
mod tests {
    use super::*;
    use quill_store::users::UserRepo;

    fn setup() -> (TaskService, UserId) {
        let db = Database::in_memory().unwrap();
        let user = db
            .with_conn(|conn| UserRepo::create(conn, "a@x.y", "hash", "Ann"))
            .unwrap();
        (TaskService::new(db), user.id)
    }

    fn other_user(service: &TaskService) -> UserId {
        service
            .database()
            .with_conn(|conn| UserRepo::create(conn, "b@x.y", "hash", "Bea"))
            .unwrap()
            .id
    }

    fn outbox_len(service: &TaskService) -> usize {
        service
            .database()
            .with_conn(|conn| OutboxRepo::fetch_unpublished(conn, 100))
            .unwrap()
            .len()
    }

    fn minimal(title: &str) -> CreateTask {
        CreateTask {
            title: title.into(),
            ..Default::default()
        }
    }

    // --- Create ---

    #[test]
    fn create_then_get_returns_equal_task() {
        let (service, owner) = setup();
        let created = service
            .create_task(
                owner,
                CreateTask {
                    title: "buy milk".into(),
                    priority: Some(Priority::High),
                    tags: vec!["Errands".into()],
                    ..Default::default()
                },
            )
            .unwrap();

        let fetched = service.get_task(owner, created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.priority, Priority::High);
        assert_eq!(fetched.tags, vec!["errands"]);
    }

    #[test]
    fn create_trims_title() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("  buy milk  ")).unwrap();
        assert_eq!(task.title, "buy milk");
    }

    #[test]
    fn create_rejects_empty_title() {
        let (service, owner) = setup();
        let err = service.create_task(owner, minimal("   ")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn create_rejects_oversized_title() {
        let (service, owner) = setup();
        let err = service
            .create_task(owner, minimal(&"x".repeat(TITLE_MAX_LEN + 1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn create_rejects_oversized_description() {
        let (service, owner) = setup();
        let err = service
            .create_task(
                owner,
                CreateTask {
                    title: "t".into(),
                    description: Some("x".repeat(DESCRIPTION_MAX_LEN + 1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn create_rejects_past_reminder() {
        let (service, owner) = setup();
        let err = service
            .create_task(
                owner,
                CreateTask {
                    title: "t".into(),
                    remind_at: Some(Utc::now() - chrono::Duration::minutes(1)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn create_dedups_tags_case_insensitively() {
        let (service, owner) = setup();
        let task = service
            .create_task(
                owner,
                CreateTask {
                    title: "t".into(),
                    tags: vec!["Work".into(), "work".into(), "WORK".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(task.tags, vec!["work"]);
    }

    #[test]
    fn create_rejects_foreign_parent_reference() {
        let (service, owner) = setup();
        let intruder = other_user(&service);
        let theirs = service.create_task(intruder, minimal("theirs")).unwrap();

        let err = service
            .create_task(
                owner,
                CreateTask {
                    title: "sneaky".into(),
                    parent_task_id: Some(theirs.id),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }

    #[test]
    fn create_accepts_own_parent_reference() {
        let (service, owner) = setup();
        let parent = service.create_task(owner, minimal("parent")).unwrap();
        let child = service
            .create_task(
                owner,
                CreateTask {
                    title: "child".into(),
                    parent_task_id: Some(parent.id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(child.parent_task_id, Some(parent.id));
    }

    // --- Ownership (P1) ---

    #[test]
    fn cross_user_get_is_not_found() {
        let (service, owner) = setup();
        let intruder = other_user(&service);
        let task = service.create_task(owner, minimal("private")).unwrap();

        let err = service.get_task(intruder, task.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }

    #[test]
    fn cross_user_delete_is_not_found_and_changes_nothing() {
        let (service, owner) = setup();
        let intruder = other_user(&service);
        let task = service.create_task(owner, minimal("private")).unwrap();

        let err = service.delete_task(intruder, task.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
        assert!(service.get_task(owner, task.id).is_ok());
    }

    #[test]
    fn cross_user_update_and_toggle_are_not_found() {
        let (service, owner) = setup();
        let intruder = other_user(&service);
        let task = service.create_task(owner, minimal("private")).unwrap();

        assert!(matches!(
            service
                .update_task(intruder, task.id, UpdateTask {
                    title: Some("stolen".into()),
                    ..Default::default()
                })
                .unwrap_err(),
            CoreError::NotFound
        ));
        assert!(matches!(
            service.toggle_complete(intruder, task.id).unwrap_err(),
            CoreError::NotFound
        ));
        assert_eq!(service.get_task(owner, task.id).unwrap().title, "private");
    }

    // --- Update ---

    #[test]
    fn update_with_current_values_is_a_noop() {
        let (service, owner) = setup();
        let task = service
            .create_task(
                owner,
                CreateTask {
                    title: "stable".into(),
                    description: Some("desc".into()),
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = service
            .update_task(
                owner,
                task.id,
                UpdateTask {
                    title: Some("stable".into()),
                    description: Some(Some("desc".into())),
                    priority: Some(Priority::Low),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.updated_at, task.updated_at, "no state change");
        assert_eq!(outbox_len(&service), 0, "no events");
    }

    #[test]
    fn update_overrides_fields() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("old")).unwrap();
        let updated = service
            .update_task(
                owner,
                task.id,
                UpdateTask {
                    title: Some("new".into()),
                    priority: Some(Priority::High),
                    recurrence: Some(Recurrence::Weekly),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.recurrence, Recurrence::Weekly);
    }

    #[test]
    fn clearing_remind_at_clears_reminder_sent() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("remindable")).unwrap();
        let future = Utc::now() + chrono::Duration::hours(1);
        service.set_reminder(owner, task.id, future).unwrap();

        // Simulate the scheduler having marked it sent.
        service
            .database()
            .with_conn(|conn| {
                TaskRepo::update(
                    conn,
                    owner,
                    task.id,
                    &TaskPatch {
                        reminder_sent: Some(true),
                        ..Default::default()
                    },
                )
            })
            .unwrap();

        let cleared = service
            .update_task(
                owner,
                task.id,
                UpdateTask {
                    remind_at: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(cleared.remind_at.is_none());
        assert!(!cleared.reminder_sent);
    }

    #[test]
    fn rescheduling_reminder_resets_sent_flag() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("remindable")).unwrap();
        service
            .set_reminder(owner, task.id, Utc::now() + chrono::Duration::hours(1))
            .unwrap();
        service
            .database()
            .with_conn(|conn| {
                TaskRepo::update(
                    conn,
                    owner,
                    task.id,
                    &TaskPatch {
                        reminder_sent: Some(true),
                        ..Default::default()
                    },
                )
            })
            .unwrap();

        let rescheduled = service
            .update_task(
                owner,
                task.id,
                UpdateTask {
                    remind_at: Some(Some(Utc::now() + chrono::Duration::hours(2))),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!rescheduled.reminder_sent);
    }

    #[test]
    fn update_revalidates_title() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("fine")).unwrap();
        let err = service
            .update_task(
                owner,
                task.id,
                UpdateTask {
                    title: Some("  ".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    // --- Toggle & events ---

    #[test]
    fn toggle_to_complete_enqueues_exactly_one_event() {
        let (service, owner) = setup();
        let due = Utc::now() + chrono::Duration::days(3);
        let task = service
            .create_task(
                owner,
                CreateTask {
                    title: "weekly chore".into(),
                    due_at: Some(due),
                    recurrence: Some(Recurrence::Weekly),
                    ..Default::default()
                },
            )
            .unwrap();

        let toggled = service.toggle_complete(owner, task.id).unwrap();
        assert!(toggled.completed);

        let entries = service
            .database()
            .with_conn(|conn| OutboxRepo::fetch_unpublished(conn, 10))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].topic, TASK_EVENTS_TOPIC);

        let envelope: EventEnvelope = serde_json::from_str(&entries[0].envelope).unwrap();
        let payload: TaskCompletedPayload =
            serde_json::from_value(envelope.payload.clone()).unwrap();
        assert_eq!(payload.task_id, task.id);
        assert_eq!(payload.recurrence, Recurrence::Weekly);
        assert_eq!(payload.due_at, Some(due));
    }

    #[test]
    fn toggle_back_to_incomplete_publishes_nothing() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("flip flop")).unwrap();

        service.toggle_complete(owner, task.id).unwrap();
        assert_eq!(outbox_len(&service), 1);

        let reopened = service.toggle_complete(owner, task.id).unwrap();
        assert!(!reopened.completed);
        assert_eq!(outbox_len(&service), 1, "no event on true→false");
    }

    #[test]
    fn events_disabled_skips_outbox_but_flips_state() {
        let db = Database::in_memory().unwrap();
        let owner = db
            .with_conn(|conn| UserRepo::create(conn, "a@x.y", "hash", "Ann"))
            .unwrap()
            .id;
        let service = TaskService::with_events_disabled(db);

        let task = service.create_task(owner, minimal("quiet")).unwrap();
        let toggled = service.toggle_complete(owner, task.id).unwrap();
        assert!(toggled.completed);
        assert_eq!(outbox_len(&service), 0);
    }

    // --- Tags (P4) ---

    #[test]
    fn add_tag_twice_leaves_set_unchanged() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("tagged")).unwrap();

        let once = service.add_tag(owner, task.id, "Work").unwrap();
        let twice = service.add_tag(owner, task.id, "work").unwrap();
        assert_eq!(once.tags, vec!["work"]);
        assert_eq!(twice.tags, vec!["work"]);
    }

    #[test]
    fn remove_absent_tag_is_noop_without_error() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("untagged")).unwrap();
        let after = service.remove_tag(owner, task.id, "ghost").unwrap();
        assert!(after.tags.is_empty());
    }

    #[test]
    fn add_tag_rejects_empty_name() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("t")).unwrap();
        let err = service.add_tag(owner, task.id, "   ").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    // --- Reminders ---

    #[test]
    fn set_reminder_requires_future_instant() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("soon")).unwrap();
        let err = service
            .set_reminder(owner, task.id, Utc::now() - chrono::Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn set_reminder_resets_sent_flag() {
        let (service, owner) = setup();
        let task = service.create_task(owner, minimal("soon")).unwrap();
        let set = service
            .set_reminder(owner, task.id, Utc::now() + chrono::Duration::minutes(5))
            .unwrap();
        assert!(set.remind_at.is_some());
        assert!(!set.reminder_sent);
    }

    // --- Search (P5) & list ordering (P6) ---

    #[test]
    fn search_returns_exactly_matching_tasks() {
        let (service, owner) = setup();
        service.create_task(owner, minimal("Buy MILK")).unwrap();
        service
            .create_task(
                owner,
                CreateTask {
                    title: "errands".into(),
                    description: Some("milk and eggs".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        service.create_task(owner, minimal("unrelated")).unwrap();

        let hits = service.search_tasks(owner, "MiLk").unwrap();
        assert_eq!(hits.len(), 2);
        for task in &hits {
            let folded_title = task.title.to_lowercase();
            let folded_desc = task
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            assert!(folded_title.contains("milk") || folded_desc.contains("milk"));
        }
    }

    #[test]
    fn list_ordering_stable_without_mutations() {
        let (service, owner) = setup();
        for i in 0..8 {
            service.create_task(owner, minimal(&format!("task {i}"))).unwrap();
        }
        let filter = TaskFilter::default();
        let a: Vec<TaskId> = service
            .list_tasks(owner, &filter)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        let b: Vec<TaskId> = service
            .list_tasks(owner, &filter)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn list_filters_combine() {
        let (service, owner) = setup();
        service
            .create_task(
                owner,
                CreateTask {
                    title: "match".into(),
                    priority: Some(Priority::High),
                    tags: vec!["work".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        service
            .create_task(
                owner,
                CreateTask {
                    title: "wrong tag".into(),
                    priority: Some(Priority::High),
                    ..Default::default()
                },
            )
            .unwrap();
        service
            .create_task(
                owner,
                CreateTask {
                    title: "wrong priority".into(),
                    tags: vec!["work".into()],
                    ..Default::default()
                },
            )
            .unwrap();

        let filter = TaskFilter {
            priority: Some(Priority::High),
            tag: Some("Work".into()),
            ..Default::default()
        };
        let tasks = service.list_tasks(owner, &filter).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "match");
    }
}
