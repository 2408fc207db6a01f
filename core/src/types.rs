//! Domain types for TaskMaster.
//!
//! A task list is an ordered collection of [`Task`] records. Records are
//! created, edited, toggled between pending and completed, and deleted; the
//! filter and sort configuration rides along in [`TaskState`] but is never
//! persisted with the records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a `TaskId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id immediately after this one
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Task priority
///
/// Ordered by severity: `Low < Medium < High`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait
    Low,
    /// Normal
    #[default]
    Medium,
    /// Do first
    High,
}

impl Priority {
    /// Lowercase name, as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}' (expected low, medium or high)")),
        }
    }
}

/// Completion status of a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not done yet
    #[default]
    Pending,
    /// Done
    Completed,
}

impl TaskStatus {
    /// The other status
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// A single task record
///
/// `completed_at` is `Some` exactly when `status` is [`TaskStatus::Completed`];
/// use [`Task::set_status`] rather than assigning `status` directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Short title
    pub title: String,
    /// Free-form details
    #[serde(default)]
    pub description: String,
    /// Priority
    #[serde(default)]
    pub priority: Priority,
    /// Pending or completed
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task was completed (if completed)
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending task from a draft
    #[must_use]
    pub fn from_draft(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: TaskStatus::Pending,
            due_date: draft.due_date,
            created_at,
            completed_at: None,
        }
    }

    /// Whether the task is completed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Moves the task to `status`, keeping `completed_at` consistent
    ///
    /// Setting the status it already has changes nothing.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Completed => Some(now),
            TaskStatus::Pending => None,
        };
    }

    /// Flips between pending and completed
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.set_status(self.status.toggled(), now);
    }

    /// Merges the fields present in `patch`
    pub fn apply_patch(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
    }

    /// Repairs `completed_at` so it agrees with `status`
    ///
    /// A completed record with no completion time is stamped with its creation time.
    pub fn normalize(&mut self) {
        match (self.status, self.completed_at) {
            (TaskStatus::Completed, None) => self.completed_at = Some(self.created_at),
            (TaskStatus::Pending, Some(_)) => self.completed_at = None,
            _ => {},
        }
    }
}

/// User-supplied fields for a new task
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Priority
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Creates a medium-priority draft with only a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update for an existing task
///
/// `None` leaves a field untouched. `due_date: Some(None)` clears the due date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New priority
    pub priority: Option<Priority>,
    /// New due date, or `Some(None)` to clear it
    pub due_date: Option<Option<NaiveDate>>,
    /// New status
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

/// Status filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Everything
    #[default]
    All,
    /// Only pending tasks
    Pending,
    /// Only completed tasks
    Completed,
}

impl StatusFilter {
    /// Whether `status` passes this filter
    #[must_use]
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == TaskStatus::Pending,
            Self::Completed => status == TaskStatus::Completed,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown status '{other}' (expected all, pending or completed)")),
        }
    }
}

/// Priority filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    /// Every priority
    #[default]
    All,
    /// Exactly this priority
    Only(Priority),
}

impl PriorityFilter {
    /// Whether `priority` passes this filter
    #[must_use]
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == priority,
        }
    }
}

impl std::str::FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Sort criterion for the derived view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Due date ascending, undated last
    #[default]
    Date,
    /// High, medium, low
    Priority,
    /// Alphabetical
    Title,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "priority" => Ok(Self::Priority),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort '{other}' (expected date, priority or title)")),
        }
    }
}

/// The view filters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// Status filter
    pub status: StatusFilter,
    /// Priority filter
    pub priority: PriorityFilter,
    /// Case-insensitive substring matched against title and description
    pub search: String,
}

/// One filter field to overwrite
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterChange {
    /// Set the status filter
    Status(StatusFilter),
    /// Set the priority filter
    Priority(PriorityFilter),
    /// Set the search term
    Search(String),
}

/// Progress of the remote seed fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SeedStatus {
    /// Nothing requested, or the last request was cancelled
    #[default]
    Idle,
    /// A fetch is in flight
    Loading {
        /// Request number; results carrying another number are stale
        request: u64,
    },
    /// The last fetch succeeded
    Loaded {
        /// How many records were merged in
        added: usize,
    },
    /// The last fetch failed
    Failed {
        /// What went wrong
        error: String,
    },
}

/// State of the task store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskState {
    /// All tasks, in insertion order
    pub tasks: Vec<Task>,
    /// Active filters
    pub filter: FilterConfig,
    /// Active sort
    pub sort: SortBy,
    /// Remote seed progress
    pub seed: SeedStatus,
    /// Number of seed requests issued so far
    pub seed_requests: u64,
}

impl TaskState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `tasks`
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    /// Returns the number of tasks
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the number of completed tasks
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }

    /// Returns a task by ID
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Returns a mutable task by ID
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Checks if a task exists
    #[must_use]
    pub fn exists(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Largest id currently in the store
    #[must_use]
    pub fn max_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }

    /// Replaces the task list, dropping duplicate ids and repairing completion times
    ///
    /// The first record with a given id wins.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        let mut seen = HashSet::with_capacity(tasks.len());
        self.tasks = tasks
            .into_iter()
            .filter(|t| seen.insert(t.id))
            .map(|mut t| {
                t.normalize();
                t
            })
            .collect();
    }
}

/// Every state change the task store accepts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskAction {
    /// Replace the task list wholesale (used on load)
    SetAll {
        /// The new task list
        tasks: Vec<Task>,
    },

    /// Append a new pending task
    Add {
        /// User-supplied fields
        draft: TaskDraft,
    },

    /// Merge fields into an existing task
    Update {
        /// Task to update
        id: TaskId,
        /// Fields to change
        patch: TaskPatch,
    },

    /// Remove a task
    Delete {
        /// Task to remove
        id: TaskId,
    },

    /// Flip a task between pending and completed
    Toggle {
        /// Task to toggle
        id: TaskId,
    },

    /// Overwrite one filter field
    SetFilter(FilterChange),

    /// Overwrite the sort criterion
    SetSort {
        /// New sort
        sort: SortBy,
    },

    /// Remove every completed task
    ClearCompleted,

    /// Start fetching sample tasks from the remote seed source
    FetchSeed,

    /// Remote seed tasks arrived
    SeedLoaded {
        /// Request this result answers
        request: u64,
        /// Converted records, still carrying their remote ids
        tasks: Vec<Task>,
    },

    /// Remote seed fetch failed
    SeedFailed {
        /// Request this result answers
        request: u64,
        /// Description of the failure
        error: String,
    },

    /// Abandon the in-flight seed fetch
    CancelSeed,
}

impl TaskAction {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetAll { .. } => "set_all",
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Toggle { .. } => "toggle",
            Self::SetFilter(_) => "set_filter",
            Self::SetSort { .. } => "set_sort",
            Self::ClearCompleted => "clear_completed",
            Self::FetchSeed => "fetch_seed",
            Self::SeedLoaded { .. } => "seed_loaded",
            Self::SeedFailed { .. } => "seed_failed",
            Self::CancelSeed => "cancel_seed",
        }
    }

    /// Whether this action can change the task records (as opposed to view settings)
    #[must_use]
    pub const fn touches_tasks(&self) -> bool {
        matches!(
            self,
            Self::SetAll { .. }
                | Self::Add { .. }
                | Self::Update { .. }
                | Self::Delete { .. }
                | Self::Toggle { .. }
                | Self::ClearCompleted
                | Self::SeedLoaded { .. }
        )
    }
}
