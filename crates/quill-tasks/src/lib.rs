//! TaskCore: the sole authority for task state, plus the background loops
//! that feed the event fabric (reminder scheduler, outbox drainer).

pub mod drainer;
pub mod scheduler;
pub mod service;

pub use drainer::OutboxDrainer;
pub use scheduler::ReminderScheduler;
pub use service::{CreateTask, SortDir, SortKey, TaskFilter, TaskService, UpdateTask};
