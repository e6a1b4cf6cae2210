//! SQL data access for tasks and their tag associations.
//!
//! All methods take `&Connection` and are stateless. Multi-statement
//! mutations (claiming reminders, task-plus-outbox writes) run inside
//! `Database::with_tx` so the transaction is the serialization point.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use quill_core::ids::{TaskId, UserId};
use quill_core::task::{fold, Priority, Recurrence, Task};

use crate::error::StoreError;
use crate::row_helpers::{self, escape_like, fmt_ts};

/// Fields for a new task row. Validation happens in the service layer.
#[derive(Clone, Debug)]
pub struct NewTask {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
    pub recurrence: Recurrence,
    pub parent_task_id: Option<TaskId>,
}

/// Partial update. Outer `Option` = "field present in the patch",
/// inner `Option` = the new value, where `None` clears the column.
#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub remind_at: Option<Option<DateTime<Utc>>>,
    pub reminder_sent: Option<bool>,
    pub recurrence: Option<Recurrence>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_at.is_none()
            && self.remind_at.is_none()
            && self.reminder_sent.is_none()
            && self.recurrence.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueAt,
    Priority,
    Title,
}

impl std::str::FromStr for SortKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "due_at" | "due_date" => Ok(Self::DueAt),
            "priority" => Ok(Self::Priority),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortDir {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Filter predicates, ANDed together.
#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
    /// Tag name; compared case-folded.
    pub tag: Option<String>,
    pub completed: Option<bool>,
    /// `due_at < now AND NOT completed`.
    pub overdue: bool,
    pub sort: SortKey,
    pub dir: SortDir,
}

/// A claimed reminder row: the task plus its owner's email, captured in
/// the same transaction that flips `reminder_sent`.
#[derive(Clone, Debug)]
pub struct DueReminder {
    pub task: Task,
    pub owner_email: String,
}

const TASK_COLUMNS: &str = "t.id, t.owner_id, t.title, t.description, t.completed, t.priority, \
     t.due_at, t.remind_at, t.reminder_sent, t.recurrence, t.parent_task_id, \
     t.created_at, t.updated_at, \
     (SELECT GROUP_CONCAT(tg.name, char(31)) FROM task_tags tt \
      JOIN tags tg ON tg.id = tt.tag_id WHERE tt.task_id = t.id) AS tag_names";

pub struct TaskRepo;

impl TaskRepo {
    pub fn create(conn: &Connection, new: &NewTask) -> Result<Task, StoreError> {
        let id = TaskId::new();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (id, owner_id, title, description, completed, priority,
             due_at, remind_at, reminder_sent, recurrence, parent_task_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?10)",
            params![
                id.to_string(),
                new.owner_id.to_string(),
                new.title,
                new.description,
                new.priority.to_string(),
                new.due_at.map(fmt_ts),
                new.remind_at.map(fmt_ts),
                new.recurrence.to_string(),
                new.parent_task_id.map(|p| p.to_string()),
                fmt_ts(now),
            ],
        )?;

        Ok(Task {
            id,
            owner_id: new.owner_id,
            title: new.title.clone(),
            description: new.description.clone(),
            completed: false,
            priority: new.priority,
            due_at: new.due_at,
            remind_at: new.remind_at,
            reminder_sent: false,
            recurrence: new.recurrence,
            parent_task_id: new.parent_task_id,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a task scoped to its owner. A task owned by someone else is
    /// indistinguishable from a missing one.
    pub fn get(conn: &Connection, owner: UserId, id: TaskId) -> Result<Option<Task>, StoreError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1 AND t.owner_id = ?2"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_task(row)?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update. Returns the updated task, or `None` when
    /// the row does not exist for this owner.
    pub fn update(
        conn: &Connection,
        owner: UserId,
        id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        if patch.is_empty() {
            return Self::get(conn, owner, id);
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref title) = patch.title {
            sets.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(ref description) = patch.description {
            sets.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(completed) = patch.completed {
            sets.push("completed = ?");
            values.push(Box::new(completed));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Box::new(priority.to_string()));
        }
        if let Some(ref due_at) = patch.due_at {
            sets.push("due_at = ?");
            values.push(Box::new(due_at.map(fmt_ts)));
        }
        if let Some(ref remind_at) = patch.remind_at {
            sets.push("remind_at = ?");
            values.push(Box::new(remind_at.map(fmt_ts)));
        }
        if let Some(reminder_sent) = patch.reminder_sent {
            sets.push("reminder_sent = ?");
            values.push(Box::new(reminder_sent));
        }
        if let Some(recurrence) = patch.recurrence {
            sets.push("recurrence = ?");
            values.push(Box::new(recurrence.to_string()));
        }

        sets.push("updated_at = ?");
        values.push(Box::new(fmt_ts(Utc::now())));
        values.push(Box::new(id.to_string()));
        values.push(Box::new(owner.to_string()));

        let sql = format!(
            "UPDATE tasks SET {} WHERE id = ? AND owner_id = ?",
            sets.join(", ")
        );
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let changed = conn.execute(&sql, param_refs.as_slice())?;

        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, owner, id)
    }

    /// Delete a task. Tag associations cascade; successor tasks do not.
    pub fn delete(conn: &Connection, owner: UserId, id: TaskId) -> Result<bool, StoreError> {
        let changed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// List tasks with filters and a stable sort (ties broken by id).
    pub fn list(
        conn: &Connection,
        owner: UserId,
        filter: &TaskFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError> {
        let mut conditions: Vec<String> = vec!["t.owner_id = ?".into()];
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(owner.to_string())];

        if let Some(priority) = filter.priority {
            conditions.push("t.priority = ?".into());
            values.push(Box::new(priority.to_string()));
        }
        if let Some(completed) = filter.completed {
            conditions.push("t.completed = ?".into());
            values.push(Box::new(completed));
        }
        if filter.overdue {
            conditions.push("t.due_at IS NOT NULL AND t.due_at < ? AND t.completed = 0".into());
            values.push(Box::new(fmt_ts(now)));
        }
        if let Some(ref tag) = filter.tag {
            conditions.push(
                "EXISTS (SELECT 1 FROM task_tags tt JOIN tags tg ON tg.id = tt.tag_id \
                 WHERE tt.task_id = t.id AND tg.name = ?)"
                    .into(),
            );
            values.push(Box::new(fold(tag)));
        }

        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE {} ORDER BY {}, t.id ASC",
            conditions.join(" AND "),
            order_clause(filter.sort, filter.dir),
        );

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(param_refs.as_slice())?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(row_to_task(row)?);
        }
        Ok(tasks)
    }

    /// Case-insensitive substring search over title and description,
    /// newest first.
    pub fn search(
        conn: &Connection,
        owner: UserId,
        query: &str,
    ) -> Result<Vec<Task>, StoreError> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t
             WHERE t.owner_id = ?1
               AND (LOWER(t.title) LIKE ?2 ESCAPE '\\'
                    OR LOWER(COALESCE(t.description, '')) LIKE ?2 ESCAPE '\\')
             ORDER BY t.created_at DESC, t.id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![owner.to_string(), pattern])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(row_to_task(row)?);
        }
        Ok(tasks)
    }

    /// Select and claim every matured reminder, capped at `batch`.
    ///
    /// The flip of `reminder_sent` happens in the same transaction as the
    /// select, and each UPDATE re-checks `reminder_sent = 0`, so two
    /// schedulers sweeping concurrently can never claim the same row.
    /// Rows are publish candidates only after this commits.
    pub fn claim_due_reminders(
        conn: &Connection,
        now: DateTime<Utc>,
        batch: u32,
    ) -> Result<Vec<DueReminder>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS}, u.email FROM tasks t
             JOIN users u ON u.id = t.owner_id
             WHERE t.remind_at IS NOT NULL AND t.remind_at <= ?1
               AND t.reminder_sent = 0 AND t.completed = 0
             ORDER BY t.remind_at ASC, t.id ASC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![fmt_ts(now), batch])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let task = row_to_task(row)?;
            let owner_email: String = row_helpers::get(row, 14, "tasks", "owner_email")?;
            candidates.push(DueReminder { task, owner_email });
        }

        let stamp = fmt_ts(Utc::now());
        let mut claimed = Vec::with_capacity(candidates.len());
        for mut due in candidates {
            let changed = conn.execute(
                "UPDATE tasks SET reminder_sent = 1, updated_at = ?1
                 WHERE id = ?2 AND reminder_sent = 0",
                params![stamp, due.task.id.to_string()],
            )?;
            if changed > 0 {
                due.task.reminder_sent = true;
                claimed.push(due);
            }
        }
        Ok(claimed)
    }
}

fn order_clause(sort: SortKey, dir: SortDir) -> String {
    let d = dir.sql();
    match sort {
        SortKey::CreatedAt => format!("t.created_at {d}"),
        SortKey::UpdatedAt => format!("t.updated_at {d}"),
        // Null due dates sort last ascending and first descending, so
        // "no due date" is never mistaken for "most urgent".
        SortKey::DueAt => format!("(t.due_at IS NULL) {d2}, t.due_at {d}", d2 = match dir {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }),
        SortKey::Priority => format!(
            "CASE t.priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 END {d}"
        ),
        SortKey::Title => format!("LOWER(t.title) {d}"),
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let id: String = row_helpers::get(row, 0, "tasks", "id")?;
    let owner: String = row_helpers::get(row, 1, "tasks", "owner_id")?;
    let priority: String = row_helpers::get(row, 5, "tasks", "priority")?;
    let due_at: Option<String> = row_helpers::get_opt(row, 6, "tasks", "due_at")?;
    let remind_at: Option<String> = row_helpers::get_opt(row, 7, "tasks", "remind_at")?;
    let recurrence: String = row_helpers::get(row, 9, "tasks", "recurrence")?;
    let parent: Option<String> = row_helpers::get_opt(row, 10, "tasks", "parent_task_id")?;
    let created_at: String = row_helpers::get(row, 11, "tasks", "created_at")?;
    let updated_at: String = row_helpers::get(row, 12, "tasks", "updated_at")?;
    let tag_names: Option<String> = row_helpers::get_opt(row, 13, "tasks", "tag_names")?;

    let mut tags: Vec<String> = tag_names
        .map(|joined| joined.split('\u{1f}').map(str::to_string).collect())
        .unwrap_or_default();
    tags.sort();

    Ok(Task {
        id: row_helpers::parse_id(&id, "tasks", "id")?,
        owner_id: row_helpers::parse_id(&owner, "tasks", "owner_id")?,
        title: row_helpers::get(row, 2, "tasks", "title")?,
        description: row_helpers::get_opt(row, 3, "tasks", "description")?,
        completed: row_helpers::get(row, 4, "tasks", "completed")?,
        priority: row_helpers::parse_enum(&priority, "tasks", "priority")?,
        due_at: row_helpers::parse_ts_opt(due_at, "tasks", "due_at")?,
        remind_at: row_helpers::parse_ts_opt(remind_at, "tasks", "remind_at")?,
        reminder_sent: row_helpers::get(row, 8, "tasks", "reminder_sent")?,
        recurrence: row_helpers::parse_enum(&recurrence, "tasks", "recurrence")?,
        parent_task_id: parent
            .map(|p| row_helpers::parse_id(&p, "tasks", "parent_task_id"))
            .transpose()?,
        tags,
        created_at: row_helpers::parse_ts(&created_at, "tasks", "created_at")?,
        updated_at: row_helpers::parse_ts(&updated_at, "tasks", "updated_at")?,
    })
}
