use chrono::Utc;
use rusqlite::{params, Connection};

use quill_core::ids::{TagId, TaskId, UserId};
use quill_core::task::{fold, Tag};

use crate::error::StoreError;
use crate::row_helpers::{self, fmt_ts};
use crate::users::is_unique_violation;

/// SQL data access for tags and task↔tag associations.
///
/// Names are stored case-folded, so the (owner_id, name) UNIQUE constraint
/// is the per-owner case-insensitive uniqueness rule.
pub struct TagRepo;

impl TagRepo {
    /// Look up a tag by folded name, creating it if missing.
    pub fn upsert(conn: &Connection, owner: UserId, name: &str) -> Result<Tag, StoreError> {
        let folded = fold(name);
        if let Some(existing) = Self::get_by_name(conn, owner, &folded)? {
            return Ok(existing);
        }

        let id = TagId::new();
        let now = Utc::now();
        let result = conn.execute(
            "INSERT INTO tags (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), owner.to_string(), folded, fmt_ts(now)],
        );
        match result {
            Ok(_) => Ok(Tag {
                id,
                owner_id: owner,
                name: folded,
                created_at: now,
            }),
            // Lost a race with a concurrent upsert; the row exists now.
            Err(e) if is_unique_violation(&e) => Self::get_by_name(conn, owner, &folded)?
                .ok_or_else(|| StoreError::Conflict(format!("tag {folded}"))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_name(
        conn: &Connection,
        owner: UserId,
        name: &str,
    ) -> Result<Option<Tag>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, created_at FROM tags
             WHERE owner_id = ?1 AND name = ?2",
        )?;
        let mut rows = stmt.query(params![owner.to_string(), fold(name)])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_tag(row)?)),
            None => Ok(None),
        }
    }

    /// Associate a tag with a task. A repeated attach is a no-op.
    pub fn attach(conn: &Connection, task: TaskId, tag: TagId) -> Result<(), StoreError> {
        conn.execute(
            "INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?1, ?2)",
            params![task.to_string(), tag.to_string()],
        )?;
        Ok(())
    }

    /// Remove a tag association by name. Detaching an absent tag is a
    /// no-op and returns false.
    pub fn detach(
        conn: &Connection,
        owner: UserId,
        task: TaskId,
        name: &str,
    ) -> Result<bool, StoreError> {
        let changed = conn.execute(
            "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id IN
             (SELECT id FROM tags WHERE owner_id = ?2 AND name = ?3)",
            params![task.to_string(), owner.to_string(), fold(name)],
        )?;
        Ok(changed > 0)
    }

    /// All of an owner's tags, alphabetical.
    pub fn list(conn: &Connection, owner: UserId) -> Result<Vec<Tag>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, created_at FROM tags
             WHERE owner_id = ?1 ORDER BY name ASC",
        )?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(row_to_tag(row)?);
        }
        Ok(tags)
    }

    /// Delete a tag. Associations cascade; tasks are untouched.
    pub fn delete(conn: &Connection, owner: UserId, name: &str) -> Result<bool, StoreError> {
        let changed = conn.execute(
            "DELETE FROM tags WHERE owner_id = ?1 AND name = ?2",
            params![owner.to_string(), fold(name)],
        )?;
        Ok(changed > 0)
    }
}

fn row_to_tag(row: &rusqlite::Row<'_>) -> Result<Tag, StoreError> {
    let id: String = row_helpers::get(row, 0, "tags", "id")?;
    let owner: String = row_helpers::get(row, 1, "tags", "owner_id")?;
    let created_at: String = row_helpers::get(row, 3, "tags", "created_at")?;

    Ok(Tag {
        id: row_helpers::parse_id(&id, "tags", "id")?,
        owner_id: row_helpers::parse_id(&owner, "tags", "owner_id")?,
        name: row_helpers::get(row, 2, "tags", "name")?,
        created_at: row_helpers::parse_ts(&created_at, "tags", "created_at")?,
    })
}
