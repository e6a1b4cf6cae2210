use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Identity principal. The password hash never leaves the store layer;
/// this is the projection the rest of the system sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Emails compare case-insensitively; normalize once, at the edge.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
