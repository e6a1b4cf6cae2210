use chrono::Utc;
use rusqlite::{params, Connection};

use quill_core::conversation::{Conversation, Message, Role};
use quill_core::ids::{ConversationId, MessageId, UserId};

use crate::error::StoreError;
use crate::row_helpers::{self, fmt_ts};

pub struct ConversationRepo;

impl ConversationRepo {
    pub fn create(
        conn: &Connection,
        owner: UserId,
        title: Option<&str>,
    ) -> Result<Conversation, StoreError> {
        let id = ConversationId::new();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO conversations (id, owner_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id.to_string(), owner.to_string(), title, fmt_ts(now)],
        )?;
        Ok(Conversation {
            id,
            owner_id: owner,
            title: title.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(
        conn: &Connection,
        owner: UserId,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, created_at, updated_at FROM conversations
             WHERE id = ?1 AND owner_id = ?2",
        )?;
        let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_conversation(row)?)),
            None => Ok(None),
        }
    }

    /// Most recently active first.
    pub fn list(conn: &Connection, owner: UserId) -> Result<Vec<Conversation>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, created_at, updated_at FROM conversations
             WHERE owner_id = ?1 ORDER BY updated_at DESC, id DESC",
        )?;
        let mut rows = stmt.query(params![owner.to_string()])?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next()? {
            conversations.push(row_to_conversation(row)?);
        }
        Ok(conversations)
    }

    pub fn set_title(
        conn: &Connection,
        owner: UserId,
        id: ConversationId,
        title: &str,
    ) -> Result<(), StoreError> {
        let changed = conn.execute(
            "UPDATE conversations SET title = ?1, updated_at = ?2
             WHERE id = ?3 AND owner_id = ?4",
            params![title, fmt_ts(Utc::now()), id.to_string(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("conversation {id}")));
        }
        Ok(())
    }

    pub fn delete(
        conn: &Connection,
        owner: UserId,
        id: ConversationId,
    ) -> Result<bool, StoreError> {
        let changed = conn.execute(
            "DELETE FROM conversations WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner.to_string()],
        )?;
        Ok(changed > 0)
    }
}

pub struct MessageRepo;

impl MessageRepo {
    /// Append a message and bump the conversation's updated_at.
    pub fn append(
        conn: &Connection,
        conversation: ConversationId,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let id = MessageId::new();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                conversation.to_string(),
                role.to_string(),
                content,
                fmt_ts(now)
            ],
        )?;
        conn.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![fmt_ts(now), conversation.to_string()],
        )?;
        Ok(Message {
            id,
            conversation_id: conversation,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Strictly ordered by created_at, ties broken by id.
    pub fn list(
        conn: &Connection,
        conversation: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let mut rows = stmt.query(params![conversation.to_string()])?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            messages.push(row_to_message(row)?);
        }
        Ok(messages)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, StoreError> {
    let id: String = row_helpers::get(row, 0, "conversations", "id")?;
    let owner: String = row_helpers::get(row, 1, "conversations", "owner_id")?;
    let created_at: String = row_helpers::get(row, 3, "conversations", "created_at")?;
    let updated_at: String = row_helpers::get(row, 4, "conversations", "updated_at")?;

    Ok(Conversation {
        id: row_helpers::parse_id(&id, "conversations", "id")?,
        owner_id: row_helpers::parse_id(&owner, "conversations", "owner_id")?,
        title: row_helpers::get_opt(row, 2, "conversations", "title")?,
        created_at: row_helpers::parse_ts(&created_at, "conversations", "created_at")?,
        updated_at: row_helpers::parse_ts(&updated_at, "conversations", "updated_at")?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, StoreError> {
    let id: String = row_helpers::get(row, 0, "messages", "id")?;
    let conversation: String = row_helpers::get(row, 1, "messages", "conversation_id")?;
    let role: String = row_helpers::get(row, 2, "messages", "role")?;
    let created_at: String = row_helpers::get(row, 4, "messages", "created_at")?;

    Ok(Message {
        id: row_helpers::parse_id(&id, "messages", "id")?,
        conversation_id: row_helpers::parse_id(&conversation, "messages", "conversation_id")?,
        role: row_helpers::parse_enum(&role, "messages", "role")?,
        content: row_helpers::get(row, 3, "messages", "content")?,
        created_at: row_helpers::parse_ts(&created_at, "messages", "created_at")?,
    })
}
