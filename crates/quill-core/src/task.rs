use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TaskId, UserId};

/// Title length bounds, counted after trimming.
pub const TITLE_MAX_LEN: usize = 500;
/// Description upper bound.
pub const DESCRIPTION_MAX_LEN: usize = 2000;
/// Tag name upper bound.
pub const TAG_MAX_LEN: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Numeric collation for sorting: low < medium < high.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Policy governing whether completing a task spawns a successor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        self != Self::None
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown recurrence: {other}")),
        }
    }
}

/// A unit of work, owned by exactly one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub recurrence: Recurrence,
    pub parent_task_id: Option<TaskId>,
    /// Associated tag names, case-folded, no duplicates.
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }
}

/// Per-user label. Names compare case-folded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: crate::ids::TagId,
    pub owner_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Case-fold a tag name or search term for comparison.
pub fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn priority_collates_numerically() {
        assert!(Priority::Low.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::High.rank());
    }

    #[test]
    fn priority_display_from_str_roundtrip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            let parsed: Priority = p.to_string().parse().unwrap();
            assert_eq!(p, parsed);
        }
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn recurrence_display_from_str_roundtrip() {
        for r in [
            Recurrence::None,
            Recurrence::Daily,
            Recurrence::Weekly,
            Recurrence::Monthly,
        ] {
            let parsed: Recurrence = r.to_string().parse().unwrap();
            assert_eq!(r, parsed);
        }
    }

    #[test]
    fn recurrence_is_recurring() {
        assert!(!Recurrence::None.is_recurring());
        assert!(Recurrence::Daily.is_recurring());
        assert!(Recurrence::Monthly.is_recurring());
    }

    #[test]
    fn serde_snake_case() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&Recurrence::Weekly).unwrap(),
            "\"weekly\""
        );
    }

    #[test]
    fn overdue_requires_past_due_and_not_completed() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut task = Task {
            id: TaskId::new(),
            owner_id: UserId::new(),
            title: "t".into(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_at: Some(now - chrono::Duration::hours(1)),
            remind_at: None,
            reminder_sent: false,
            recurrence: Recurrence::None,
            parent_task_id: None,
            tags: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_overdue(now));

        task.completed = true;
        assert!(!task.is_overdue(now));

        task.completed = false;
        task.due_at = None;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn fold_trims_and_lowercases() {
        assert_eq!(fold("  Work "), "work");
        assert_eq!(fold("URGENT"), "urgent");
    }
}
