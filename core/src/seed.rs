//! Remote seed records.
//!
//! A seed source is any "todo list" endpoint returning `{id, title, completed}`
//! objects. Those records are converted into full [`Task`]s with a medium
//! priority, a placeholder description and a due date a few days out.

use crate::types::{Priority, Task, TaskId, TaskStatus};
use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Description given to every imported task
pub const SEED_DESCRIPTION: &str = "Task imported from external API";

/// Imported tasks are due within this many days
pub const SEED_DUE_WINDOW_DAYS: u64 = 7;

/// A todo as served by the remote endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTodo {
    /// Remote id; replaced by a local id when the task is merged
    pub id: u64,
    /// Title
    pub title: String,
    /// Whether the remote todo is done
    #[serde(default)]
    pub completed: bool,
}

impl RemoteTodo {
    /// Converts into a task due `due_in_days` days after `now`
    ///
    /// The task carries the remote id until the reducer assigns a local one.
    /// Returns `None` for a blank title.
    #[must_use]
    pub fn into_task(self, now: DateTime<Utc>, due_in_days: u64) -> Option<Task> {
        let title = self.title.trim();
        if title.is_empty() {
            return None;
        }

        let (status, completed_at) = if self.completed {
            (TaskStatus::Completed, Some(now))
        } else {
            (TaskStatus::Pending, None)
        };

        Some(Task {
            id: TaskId::new(self.id),
            title: title.to_string(),
            description: SEED_DESCRIPTION.to_string(),
            priority: Priority::Medium,
            status,
            due_date: now.date_naive().checked_add_days(Days::new(due_in_days)),
            created_at: now,
            completed_at,
        })
    }
}

/// Errors that can occur while fetching seed data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("Seed endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The body was not a list of todos
    #[error("Malformed seed payload: {0}")]
    Malformed(String),

    /// No seed source is configured
    #[error("No seed source configured")]
    Unavailable,
}

/// Where remote seed todos come from
///
/// Returns an explicit boxed future so the source can live behind
/// `Arc<dyn SeedSource>` inside the reducer environment.
pub trait SeedSource: Send + Sync {
    /// Fetches the remote todo list
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] on transport failure, a non-success status or an
    /// undecodable payload.
    fn fetch_seed(&self) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteTodo>, SeedError>> + Send + '_>>;
}
