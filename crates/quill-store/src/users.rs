use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;

use quill_core::ids::UserId;
use quill_core::user::{normalize_email, User};

use crate::error::StoreError;
use crate::row_helpers::{self, fmt_ts};

/// A user row together with its password hash. Only the auth layer sees
/// this; everything else gets the bare `User` projection.
#[derive(Clone, Debug)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// SQL data access for users. Stateless; all methods take `&Connection`.
pub struct UserRepo;

const USER_COLUMNS: &str = "id, email, display_name, avatar_url, created_at, updated_at";

impl UserRepo {
    /// Create a user. The email is stored normalized (trimmed, lowercased)
    /// so the UNIQUE constraint enforces case-insensitive uniqueness.
    #[instrument(skip(conn, password_hash))]
    pub fn create(
        conn: &Connection,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<User, StoreError> {
        let id = UserId::new();
        let email = normalize_email(email);
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO users (id, email, password_hash, display_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id.to_string(), email, password_hash, display_name, fmt_ts(now)],
        );

        match result {
            Ok(_) => Ok(User {
                id,
                email,
                display_name: display_name.to_string(),
                avatar_url: None,
                created_at: now,
                updated_at: now,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict(format!("email already registered: {email}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(conn: &Connection, id: UserId) -> Result<Option<User>, StoreError> {
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_email(
        conn: &Connection,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
        ))?;
        let mut rows = stmt.query(params![normalize_email(email)])?;
        match rows.next()? {
            Some(row) => Ok(Some(UserCredentials {
                user: row_to_user(row)?,
                password_hash: row_helpers::get(row, 6, "users", "password_hash")?,
            })),
            None => Ok(None),
        }
    }

    /// Change a user's email, preserving global uniqueness.
    #[instrument(skip(conn))]
    pub fn update_email(conn: &Connection, id: UserId, email: &str) -> Result<(), StoreError> {
        let result = conn.execute(
            "UPDATE users SET email = ?1, updated_at = ?2 WHERE id = ?3",
            params![normalize_email(email), fmt_ts(Utc::now()), id.to_string()],
        );
        match result {
            Ok(0) => Err(StoreError::NotFound(format!("user {id}"))),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict("email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a user. Tasks, tags, and conversations cascade via FKs.
    pub fn delete(conn: &Connection, id: UserId) -> Result<bool, StoreError> {
        let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, StoreError> {
    let id: String = row_helpers::get(row, 0, "users", "id")?;
    let created_at: String = row_helpers::get(row, 4, "users", "created_at")?;
    let updated_at: String = row_helpers::get(row, 5, "users", "updated_at")?;

    Ok(User {
        id: row_helpers::parse_id(&id, "users", "id")?,
        email: row_helpers::get(row, 1, "users", "email")?,
        display_name: row_helpers::get(row, 2, "users", "display_name")?,
        avatar_url: row_helpers::get_opt(row, 3, "users", "avatar_url")?,
        created_at: row_helpers::parse_ts(&created_at, "users", "created_at")?,
        updated_at: row_helpers::parse_ts(&updated_at, "users", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn setup() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn create_and_get() {
        let db = setup();
        let user = db
            .with_conn(|conn| UserRepo::create(conn, "a@x.y", "hash", "Ann"))
            .unwrap();
        let fetched = db.with_conn(|conn| UserRepo::get(conn, user.id)).unwrap().unwrap();
        assert_eq!(fetched.email, "a@x.y");
        assert_eq!(fetched.display_name, "Ann");
    }

    #[test]
    fn email_stored_normalized() {
        let db = setup();
        let user = db
            .with_conn(|conn| UserRepo::create(conn, "  Ann@X.Y ", "hash", "Ann"))
            .unwrap();
        assert_eq!(user.email, "ann@x.y");
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = setup();
        db.with_conn(|conn| UserRepo::create(conn, "a@x.y", "h1", "Ann")).unwrap();
        let err = db
            .with_conn(|conn| UserRepo::create(conn, "A@X.Y", "h2", "Other"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn get_by_email_returns_hash() {
        let db = setup();
        db.with_conn(|conn| UserRepo::create(conn, "a@x.y", "secret-hash", "Ann"))
            .unwrap();
        let creds = db
            .with_conn(|conn| UserRepo::get_by_email(conn, "A@x.y"))
            .unwrap()
            .unwrap();
        assert_eq!(creds.password_hash, "secret-hash");
        assert_eq!(creds.user.email, "a@x.y");
    }

    #[test]
    fn get_by_email_missing_is_none() {
        let db = setup();
        let creds = db.with_conn(|conn| UserRepo::get_by_email(conn, "no@x.y")).unwrap();
        assert!(creds.is_none());
    }

    #[test]
    fn update_email_enforces_uniqueness() {
        let db = setup();
        let a = db.with_conn(|conn| UserRepo::create(conn, "a@x.y", "h", "A")).unwrap();
        db.with_conn(|conn| UserRepo::create(conn, "b@x.y", "h", "B")).unwrap();

        let err = db
            .with_conn(|conn| UserRepo::update_email(conn, a.id, "B@x.y"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        db.with_conn(|conn| UserRepo::update_email(conn, a.id, "a2@x.y")).unwrap();
        let fetched = db.with_conn(|conn| UserRepo::get(conn, a.id)).unwrap().unwrap();
        assert_eq!(fetched.email, "a2@x.y");
    }

    #[test]
    fn delete_user() {
        let db = setup();
        let user = db.with_conn(|conn| UserRepo::create(conn, "a@x.y", "h", "A")).unwrap();
        assert!(db.with_conn(|conn| UserRepo::delete(conn, user.id)).unwrap());
        assert!(db.with_conn(|conn| UserRepo::get(conn, user.id)).unwrap().is_none());
    }
}
