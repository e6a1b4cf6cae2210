//! Task resolution for tools that accept "the task title or its id".
//!
//! Exact (case-insensitive) title match wins; otherwise a unique
//! substring match. Ambiguity is always an explicit error carrying
//! candidate titles, never resolved silently.

use quill_core::ids::{TaskId, UserId};
use quill_core::task::Task;
use quill_core::CoreError;
use quill_tasks::{TaskFilter, TaskService};

const MAX_SUGGESTIONS: usize = 5;

/// A failed resolution, with up to five candidate titles to offer back
/// to the user.
#[derive(Clone, Debug)]
pub struct ResolveError {
    pub message: String,
    pub suggestions: Vec<String>,
}

pub enum ResolveOutcome {
    Found(Task),
    NotResolved(ResolveError),
}

pub fn resolve_task(
    service: &TaskService,
    owner: UserId,
    identifier: &str,
) -> Result<ResolveOutcome, CoreError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(ResolveOutcome::NotResolved(ResolveError {
            message: "task identifier must not be empty".into(),
            suggestions: Vec::new(),
        }));
    }

    // Exact id first.
    if let Ok(id) = identifier.parse::<TaskId>() {
        match service.get_task(owner, id) {
            Ok(task) => return Ok(ResolveOutcome::Found(task)),
            Err(CoreError::NotFound) => {}
            Err(e) => return Err(e),
        }
    }

    let all = service.list_tasks(owner, &TaskFilter::default())?;
    let needle = identifier.to_lowercase();

    let exact: Vec<&Task> = all
        .iter()
        .filter(|t| t.title.to_lowercase() == needle)
        .collect();
    if exact.len() == 1 {
        return Ok(ResolveOutcome::Found(exact[0].clone()));
    }

    let partial: Vec<&Task> = all
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&needle))
        .collect();

    match partial.len() {
        1 => Ok(ResolveOutcome::Found(partial[0].clone())),
        0 => Ok(ResolveOutcome::NotResolved(ResolveError {
            message: format!("no task found matching '{identifier}'"),
            suggestions: all
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|t| t.title.clone())
                .collect(),
        })),
        _ => Ok(ResolveOutcome::NotResolved(ResolveError {
            message: format!(
                "multiple tasks match '{identifier}'; please be more specific"
            ),
            suggestions: partial
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|t| t.title.clone())
                .collect(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_store::users::UserRepo;
    use quill_store::Database;
    use quill_tasks::CreateTask;

    fn setup() -> (TaskService, UserId) {
        let db = Database::in_memory().unwrap();
        let owner = db
            .with_conn(|conn| UserRepo::create(conn, "a@x.y", "hash", "Ann"))
            .unwrap()
            .id;
        (TaskService::new(db), owner)
    }

    fn create(service: &TaskService, owner: UserId, title: &str) -> Task {
        service
            .create_task(
                owner,
                CreateTask {
                    title: title.into(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn resolves_by_id() {
        let (service, owner) = setup();
        let task = create(&service, owner, "buy milk");
        match resolve_task(&service, owner, &task.id.to_string()).unwrap() {
            ResolveOutcome::Found(found) => assert_eq!(found.id, task.id),
            ResolveOutcome::NotResolved(_) => panic!("expected resolution"),
        }
    }

    #[test]
    fn exact_title_beats_substring_ambiguity() {
        let (service, owner) = setup();
        create(&service, owner, "report");
        create(&service, owner, "report for Q3");

        match resolve_task(&service, owner, "Report").unwrap() {
            ResolveOutcome::Found(found) => assert_eq!(found.title, "report"),
            ResolveOutcome::NotResolved(_) => panic!("exact match should win"),
        }
    }

    #[test]
    fn unique_substring_resolves() {
        let (service, owner) = setup();
        create(&service, owner, "buy milk");
        create(&service, owner, "walk dog");

        match resolve_task(&service, owner, "milk").unwrap() {
            ResolveOutcome::Found(found) => assert_eq!(found.title, "buy milk"),
            ResolveOutcome::NotResolved(_) => panic!("unique substring should resolve"),
        }
    }

    #[test]
    fn ambiguous_substring_carries_suggestions() {
        let (service, owner) = setup();
        create(&service, owner, "buy milk");
        create(&service, owner, "buy bread");

        match resolve_task(&service, owner, "buy").unwrap() {
            ResolveOutcome::Found(_) => panic!("ambiguity must not resolve silently"),
            ResolveOutcome::NotResolved(err) => {
                assert!(err.message.contains("more specific"));
                assert_eq!(err.suggestions.len(), 2);
            }
        }
    }

    #[test]
    fn no_match_suggests_existing_titles() {
        let (service, owner) = setup();
        create(&service, owner, "buy milk");

        match resolve_task(&service, owner, "taxes").unwrap() {
            ResolveOutcome::Found(_) => panic!("nothing should match"),
            ResolveOutcome::NotResolved(err) => {
                assert!(err.message.contains("no task found"));
                assert_eq!(err.suggestions, vec!["buy milk"]);
            }
        }
    }

    #[test]
    fn foreign_uuid_falls_back_to_title_match() {
        let (service, owner) = setup();
        create(&service, owner, "buy milk");
        let ghost = TaskId::new().to_string();

        match resolve_task(&service, owner, &ghost).unwrap() {
            ResolveOutcome::Found(_) => panic!("unknown id should not resolve"),
            ResolveOutcome::NotResolved(err) => {
                assert!(err.message.contains("no task found"));
            }
        }
    }

    #[test]
    fn empty_identifier_is_not_resolved() {
        let (service, owner) = setup();
        match resolve_task(&service, owner, "  ").unwrap() {
            ResolveOutcome::Found(_) => panic!(),
            ResolveOutcome::NotResolved(err) => {
                assert!(err.message.contains("must not be empty"));
            }
        }
    }
}
