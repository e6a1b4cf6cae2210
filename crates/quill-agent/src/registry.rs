//! Static tool registry: the complete set of operations the model may
//! invoke. Every entry maps one-to-one onto a TaskCore operation and runs
//! with the calling user's principal. Dispatch refuses any name outside
//! this registry, and arguments are validated against the declared schema
//! before anything touches task state.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use quill_core::ids::UserId;
use quill_core::task::{Priority, Recurrence, Task};
use quill_core::CoreError;
use quill_llm::ToolSpec;
use quill_tasks::{CreateTask, SortDir, SortKey, TaskFilter, TaskService, UpdateTask};

use crate::dates::{parse_natural_date, parse_reminder};
use crate::find::{resolve_task, ResolveError, ResolveOutcome};

/// Dispatch failures that terminate the turn. Tool-level problems the
/// model can correct (bad arguments, unresolved task) are not errors;
/// they come back as unsuccessful tool results.
#[derive(Debug)]
pub enum DispatchError {
    /// The model asked for something outside the tool surface.
    UnknownTool(String),
    /// TaskCore or the store failed in a way the model cannot fix.
    Internal(CoreError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::Internal(e) => write!(f, "tool execution failed: {e}"),
        }
    }
}

pub struct ToolRegistry {
    service: Arc<TaskService>,
}

impl ToolRegistry {
    pub fn new(service: Arc<TaskService>) -> Self {
        Self { service }
    }

    pub fn contains(name: &str) -> bool {
        TOOL_NAMES.contains(&name)
    }

    /// Definitions handed to the model. Nothing outside this list exists
    /// as far as the model is concerned.
    pub fn specs() -> Vec<ToolSpec> {
        tool_definitions()
    }

    /// Execute one tool call for the given principal.
    pub fn dispatch(
        &self,
        owner: UserId,
        name: &str,
        args: &Value,
    ) -> Result<Value, DispatchError> {
        if !Self::contains(name) {
            warn!(tool = name, "model requested a tool outside the registry");
            return Err(DispatchError::UnknownTool(name.to_string()));
        }
        info!(tool = name, "dispatching tool call");

        let result = match name {
            "add_task" => self.add_task(owner, args),
            "list_tasks" | "combined_filter" => self.list_tasks(owner, args),
            "complete_task" => self.complete_task(owner, args),
            "update_task" => self.update_task(owner, args),
            "delete_task" => self.delete_task(owner, args),
            "set_priority" => self.set_priority(owner, args),
            "filter_by_priority" => self.filter_by_priority(owner, args),
            "add_tag" => self.add_tag(owner, args),
            "remove_tag" => self.remove_tag(owner, args),
            "filter_by_tag" => self.filter_by_tag(owner, args),
            "set_due_date" => self.set_due_date(owner, args),
            "show_overdue" => self.show_overdue(owner),
            "search_tasks" => self.search_tasks(owner, args),
            "sort_tasks" => self.sort_tasks(owner, args),
            "set_reminder" => self.set_reminder(owner, args),
            "set_recurrence" => self.set_recurrence(owner, args),
            _ => unreachable!("checked by contains()"),
        };

        match result {
            Ok(output) => Ok(output),
            // The model can correct these; feed them back as results.
            Err(CoreError::Validation(msg)) => Ok(failure(&msg)),
            Err(CoreError::NotFound) => Ok(failure("task not found")),
            Err(e) => Err(DispatchError::Internal(e)),
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Tool implementations
    // ─────────────────────────────────────────────────────────────────

    fn add_task(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            title: String,
            description: Option<String>,
            priority: Option<String>,
            due_date: Option<String>,
            tags: Option<Vec<String>>,
        }
        let args: Args = parse_args(args)?;

        let priority = args.priority.as_deref().map(parse_priority).transpose()?;
        let due_at = args
            .due_date
            .as_deref()
            .map(|d| parse_natural_date(d, Utc::now()))
            .transpose()?;

        let task = self.service.create_task(
            owner,
            CreateTask {
                title: args.title,
                description: args.description,
                priority,
                due_at,
                tags: args.tags.unwrap_or_default(),
                ..Default::default()
            },
        )?;
        Ok(json!({
            "success": true,
            "message": format!("Task '{}' created successfully.", task.title),
            "task": task_to_json(&task),
        }))
    }

    fn list_tasks(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            completed: Option<bool>,
            priority: Option<String>,
            tag: Option<String>,
            overdue: Option<bool>,
            sort_by: Option<String>,
            sort_order: Option<String>,
        }
        let args: Args = parse_args(args)?;

        let filter = TaskFilter {
            priority: args.priority.as_deref().map(parse_priority).transpose()?,
            tag: args.tag,
            completed: args.completed,
            overdue: args.overdue.unwrap_or(false),
            sort: args.sort_by.as_deref().map(parse_sort_key).transpose()?.unwrap_or_default(),
            dir: args
                .sort_order
                .as_deref()
                .map(parse_sort_dir)
                .transpose()?
                .unwrap_or_default(),
        };
        let tasks = self.service.list_tasks(owner, &filter)?;
        Ok(task_list_result(&tasks, &format!("Found {} tasks", tasks.len())))
    }

    fn complete_task(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let toggled = self.service.toggle_complete(owner, task.id)?;
        let message = if toggled.completed {
            format!("Task '{}' marked as completed.", toggled.title)
        } else {
            format!("Task '{}' reopened.", toggled.title)
        };
        Ok(json!({
            "success": true,
            "message": message,
            "task": task_to_json(&toggled),
        }))
    }

    fn update_task(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            title: Option<String>,
            description: Option<String>,
            priority: Option<String>,
            due_date: Option<String>,
            recurrence: Option<String>,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };

        let update = UpdateTask {
            title: args.title,
            description: args.description.map(Some),
            priority: args.priority.as_deref().map(parse_priority).transpose()?,
            due_at: args
                .due_date
                .as_deref()
                .map(|d| parse_natural_date(d, Utc::now()))
                .transpose()?
                .map(Some),
            recurrence: args
                .recurrence
                .as_deref()
                .map(parse_recurrence)
                .transpose()?,
            ..Default::default()
        };
        let updated = self.service.update_task(owner, task.id, update)?;
        Ok(json!({
            "success": true,
            "message": format!("Task '{}' updated.", updated.title),
            "task": task_to_json(&updated),
        }))
    }

    fn delete_task(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        self.service.delete_task(owner, task.id)?;
        Ok(json!({
            "success": true,
            "message": format!("Task '{}' deleted.", task.title),
        }))
    }

    fn set_priority(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            priority: String,
        }
        let args: Args = parse_args(args)?;
        let priority = parse_priority(&args.priority)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let updated = self.service.update_task(
            owner,
            task.id,
            UpdateTask {
                priority: Some(priority),
                ..Default::default()
            },
        )?;
        Ok(json!({
            "success": true,
            "message": format!("Set priority of '{}' to {priority}.", updated.title),
            "task": task_to_json(&updated),
        }))
    }

    fn filter_by_priority(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            priority: String,
        }
        let args: Args = parse_args(args)?;
        let priority = parse_priority(&args.priority)?;

        let filter = TaskFilter {
            priority: Some(priority),
            ..Default::default()
        };
        let tasks = self.service.list_tasks(owner, &filter)?;
        Ok(task_list_result(
            &tasks,
            &format!("Found {} {priority} priority tasks.", tasks.len()),
        ))
    }

    fn add_tag(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            tag: String,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let updated = self.service.add_tag(owner, task.id, &args.tag)?;
        Ok(json!({
            "success": true,
            "message": format!("Added tag '{}' to '{}'.", args.tag.trim(), updated.title),
            "task": task_to_json(&updated),
        }))
    }

    fn remove_tag(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            tag: String,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let updated = self.service.remove_tag(owner, task.id, &args.tag)?;
        Ok(json!({
            "success": true,
            "message": format!("Removed tag '{}' from '{}'.", args.tag.trim(), updated.title),
            "task": task_to_json(&updated),
        }))
    }

    fn filter_by_tag(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            tag: String,
        }
        let args: Args = parse_args(args)?;

        let filter = TaskFilter {
            tag: Some(args.tag.clone()),
            ..Default::default()
        };
        let tasks = self.service.list_tasks(owner, &filter)?;
        Ok(task_list_result(
            &tasks,
            &format!("Found {} tasks with tag '{}'.", tasks.len(), args.tag),
        ))
    }

    fn set_due_date(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            due_date: String,
        }
        let args: Args = parse_args(args)?;
        let due_at = parse_natural_date(&args.due_date, Utc::now())?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let updated = self.service.update_task(
            owner,
            task.id,
            UpdateTask {
                due_at: Some(Some(due_at)),
                ..Default::default()
            },
        )?;
        Ok(json!({
            "success": true,
            "message": format!(
                "Set due date of '{}' to {}.",
                updated.title,
                due_at.format("%A, %B %d, %Y")
            ),
            "task": task_to_json(&updated),
        }))
    }

    fn show_overdue(&self, owner: UserId) -> Result<Value, CoreError> {
        let filter = TaskFilter {
            overdue: true,
            ..Default::default()
        };
        let tasks = self.service.list_tasks(owner, &filter)?;
        if tasks.is_empty() {
            return Ok(json!({
                "success": true,
                "message": "No overdue tasks found. Great job staying on track!",
                "count": 0,
                "tasks": [],
            }));
        }
        Ok(task_list_result(
            &tasks,
            &format!("Found {} overdue tasks.", tasks.len()),
        ))
    }

    fn search_tasks(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            query: String,
        }
        let args: Args = parse_args(args)?;

        let tasks = self.service.search_tasks(owner, &args.query)?;
        let message = if tasks.is_empty() {
            format!("No tasks found matching '{}'.", args.query)
        } else {
            format!("Found {} tasks matching '{}'.", tasks.len(), args.query)
        };
        Ok(task_list_result(&tasks, &message))
    }

    fn sort_tasks(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            sort_by: String,
            sort_order: Option<String>,
        }
        let args: Args = parse_args(args)?;

        let filter = TaskFilter {
            sort: parse_sort_key(&args.sort_by)?,
            dir: args
                .sort_order
                .as_deref()
                .map(parse_sort_dir)
                .transpose()?
                .unwrap_or_default(),
            ..Default::default()
        };
        let tasks = self.service.list_tasks(owner, &filter)?;
        Ok(task_list_result(
            &tasks,
            &format!("Sorted {} tasks by {}.", tasks.len(), args.sort_by),
        ))
    }

    fn set_reminder(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            remind_at: String,
        }
        let args: Args = parse_args(args)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let remind_at = parse_reminder(&args.remind_at, Utc::now(), task.due_at)?;
        let updated = self.service.set_reminder(owner, task.id, remind_at)?;
        Ok(json!({
            "success": true,
            "message": format!(
                "Reminder set for '{}' at {}.",
                updated.title,
                remind_at.format("%A, %B %d, %Y at %H:%M")
            ),
            "task": task_to_json(&updated),
        }))
    }

    fn set_recurrence(&self, owner: UserId, args: &Value) -> Result<Value, CoreError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Args {
            task_identifier: String,
            recurrence: String,
        }
        let args: Args = parse_args(args)?;
        let recurrence = parse_recurrence(&args.recurrence)?;

        let task = match self.resolve(owner, &args.task_identifier)? {
            Ok(task) => task,
            Err(result) => return Ok(result),
        };
        let updated = self.service.update_task(
            owner,
            task.id,
            UpdateTask {
                recurrence: Some(recurrence),
                ..Default::default()
            },
        )?;
        let message = if recurrence == Recurrence::None {
            format!("Removed recurrence from '{}'.", updated.title)
        } else {
            format!("Set '{}' to repeat {recurrence}.", updated.title)
        };
        Ok(json!({
            "success": true,
            "message": message,
            "task": task_to_json(&updated),
        }))
    }

    /// Resolve an identifier, converting resolution failures into an
    /// unsuccessful tool result the model can act on.
    fn resolve(
        &self,
        owner: UserId,
        identifier: &str,
    ) -> Result<Result<Task, Value>, CoreError> {
        match resolve_task(&self.service, owner, identifier)? {
            ResolveOutcome::Found(task) => Ok(Ok(task)),
            ResolveOutcome::NotResolved(err) => Ok(Err(resolution_failure(&err))),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, CoreError> {
    serde_json::from_value(args.clone())
        .map_err(|e| CoreError::validation(format!("invalid tool arguments: {e}")))
}

fn parse_priority(raw: &str) -> Result<Priority, CoreError> {
    raw.trim().to_lowercase().parse().map_err(|_| {
        CoreError::validation(format!(
            "invalid priority '{raw}'; must be low, medium, or high"
        ))
    })
}

fn parse_recurrence(raw: &str) -> Result<Recurrence, CoreError> {
    raw.trim().to_lowercase().parse().map_err(|_| {
        CoreError::validation(format!(
            "invalid recurrence '{raw}'; must be none, daily, weekly, or monthly"
        ))
    })
}

fn parse_sort_key(raw: &str) -> Result<SortKey, CoreError> {
    raw.trim().to_lowercase().parse().map_err(|_| {
        CoreError::validation(format!(
            "invalid sort field '{raw}'; must be created_at, updated_at, due_date, priority, or title"
        ))
    })
}

fn parse_sort_dir(raw: &str) -> Result<SortDir, CoreError> {
    raw.trim().to_lowercase().parse().map_err(|_| {
        CoreError::validation(format!("invalid sort order '{raw}'; must be asc or desc"))
    })
}

fn failure(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

fn resolution_failure(err: &ResolveError) -> Value {
    let mut result = json!({ "success": false, "message": err.message });
    if !err.suggestions.is_empty() {
        result["suggestions"] = json!(err.suggestions);
    }
    result
}

fn task_list_result(tasks: &[Task], message: &str) -> Value {
    json!({
        "success": true,
        "message": message,
        "count": tasks.len(),
        "tasks": tasks.iter().map(task_to_json).collect::<Vec<_>>(),
    })
}

/// Projection of a task for tool results.
pub fn task_to_json(task: &Task) -> Value {
    json!({
        "id": task.id.to_string(),
        "title": task.title,
        "description": task.description.clone().unwrap_or_default(),
        "completed": task.completed,
        "priority": task.priority.to_string(),
        "due_at": task.due_at.map(|d| d.to_rfc3339()),
        "remind_at": task.remind_at.map(|d| d.to_rfc3339()),
        "recurrence": task.recurrence.to_string(),
        "tags": task.tags,
        "is_overdue": task.is_overdue(Utc::now()),
        "created_at": task.created_at.to_rfc3339(),
    })
}

const TOOL_NAMES: &[&str] = &[
    "add_task",
    "list_tasks",
    "complete_task",
    "update_task",
    "delete_task",
    "set_priority",
    "filter_by_priority",
    "add_tag",
    "remove_tag",
    "filter_by_tag",
    "set_due_date",
    "show_overdue",
    "search_tasks",
    "combined_filter",
    "sort_tasks",
    "set_reminder",
    "set_recurrence",
];

fn tool_definitions() -> Vec<ToolSpec> {
    let identifier = json!({
        "type": "string",
        "description": "The task title (partial match) or exact id"
    });
    let priority_enum = json!({
        "type": "string",
        "enum": ["low", "medium", "high"],
        "description": "Priority level"
    });
    let sort_by = json!({
        "type": "string",
        "enum": ["created_at", "updated_at", "due_date", "priority", "title"],
        "description": "Sort field"
    });
    let sort_order = json!({
        "type": "string",
        "enum": ["asc", "desc"],
        "description": "Sort order"
    });
    let filter_props = json!({
        "completed": {"type": "boolean", "description": "Filter by completion status"},
        "priority": priority_enum,
        "tag": {"type": "string", "description": "Filter by tag name"},
        "overdue": {"type": "boolean", "description": "Show only overdue tasks"},
        "sort_by": sort_by,
        "sort_order": sort_order,
    });

    let spec = |name: &str, description: &str, parameters: Value| ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    };

    vec![
        spec(
            "add_task",
            "Create a new task. Dates accept natural language like 'tomorrow' or 'next Friday'; pass the user's exact words.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "The title of the task"},
                    "description": {"type": "string", "description": "Optional details"},
                    "priority": priority_enum,
                    "due_date": {"type": "string", "description": "Due date, natural language or ISO format"},
                    "tags": {"type": "array", "items": {"type": "string"}, "description": "Tags to attach"},
                },
                "required": ["title"],
            }),
        ),
        spec(
            "list_tasks",
            "List tasks with optional filters and sorting.",
            json!({"type": "object", "properties": filter_props}),
        ),
        spec(
            "complete_task",
            "Toggle a task's completion using its title or id.",
            json!({
                "type": "object",
                "properties": {"task_identifier": identifier},
                "required": ["task_identifier"],
            }),
        ),
        spec(
            "update_task",
            "Update a task's title, description, priority, due date, or recurrence.",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "title": {"type": "string", "description": "New title"},
                    "description": {"type": "string", "description": "New description"},
                    "priority": priority_enum,
                    "due_date": {"type": "string", "description": "New due date"},
                    "recurrence": {"type": "string", "enum": ["none", "daily", "weekly", "monthly"]},
                },
                "required": ["task_identifier"],
            }),
        ),
        spec(
            "delete_task",
            "Delete a task permanently.",
            json!({
                "type": "object",
                "properties": {"task_identifier": identifier},
                "required": ["task_identifier"],
            }),
        ),
        spec(
            "set_priority",
            "Set the priority of a task.",
            json!({
                "type": "object",
                "properties": {"task_identifier": identifier, "priority": priority_enum},
                "required": ["task_identifier", "priority"],
            }),
        ),
        spec(
            "filter_by_priority",
            "Show all tasks with a specific priority.",
            json!({
                "type": "object",
                "properties": {"priority": priority_enum},
                "required": ["priority"],
            }),
        ),
        spec(
            "add_tag",
            "Add a tag to a task.",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "tag": {"type": "string", "description": "Tag name to add"},
                },
                "required": ["task_identifier", "tag"],
            }),
        ),
        spec(
            "remove_tag",
            "Remove a tag from a task.",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "tag": {"type": "string", "description": "Tag name to remove"},
                },
                "required": ["task_identifier", "tag"],
            }),
        ),
        spec(
            "filter_by_tag",
            "Show all tasks with a specific tag.",
            json!({
                "type": "object",
                "properties": {"tag": {"type": "string", "description": "Tag name"}},
                "required": ["tag"],
            }),
        ),
        spec(
            "set_due_date",
            "Set the due date of a task; natural-language dates work.",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "due_date": {"type": "string", "description": "Due date, e.g. 'tomorrow' or 'next Monday'"},
                },
                "required": ["task_identifier", "due_date"],
            }),
        ),
        spec(
            "show_overdue",
            "Show all overdue tasks (past due date and not completed).",
            json!({"type": "object", "properties": {}}),
        ),
        spec(
            "search_tasks",
            "Search tasks by keyword in title and description.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "Search keyword"}},
                "required": ["query"],
            }),
        ),
        spec(
            "combined_filter",
            "Filter tasks with multiple criteria combined.",
            json!({"type": "object", "properties": filter_props}),
        ),
        spec(
            "sort_tasks",
            "Sort tasks by a specific field.",
            json!({
                "type": "object",
                "properties": {"sort_by": sort_by, "sort_order": sort_order},
                "required": ["sort_by"],
            }),
        ),
        spec(
            "set_reminder",
            "Set a reminder for a task. Supports '1 hour before' (needs a due date) or absolute times like 'tomorrow at 9am'.",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "remind_at": {"type": "string", "description": "Reminder time; pass the user's exact words"},
                },
                "required": ["task_identifier", "remind_at"],
            }),
        ),
        spec(
            "set_recurrence",
            "Make a task repeat daily, weekly, or monthly (or stop repeating).",
            json!({
                "type": "object",
                "properties": {
                    "task_identifier": identifier,
                    "recurrence": {"type": "string", "enum": ["none", "daily", "weekly", "monthly"]},
                },
                "required": ["task_identifier", "recurrence"],
            }),
        ),
    ]
}
