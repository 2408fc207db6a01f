//! Derived views over the task list.
//!
//! Everything here is a pure function of borrowed tasks: nothing is cached,
//! nothing is mutated, and calling it twice gives the same answer.

use crate::types::{FilterConfig, SortBy, Task, TaskState};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Applies the status, priority and search filters, in that order
///
/// The result keeps the store's order.
#[must_use]
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &FilterConfig) -> Vec<&'a Task> {
    let needle = filter.search.to_lowercase();
    tasks
        .iter()
        .filter(|t| filter.status.matches(t.status))
        .filter(|t| filter.priority.matches(t.priority))
        .filter(|t| needle.is_empty() || matches_search(t, &needle))
        .collect()
}

/// `needle` must already be lowercase
fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle) || task.description.to_lowercase().contains(needle)
}

/// Sorts in place; equal elements keep their relative order
pub fn sort_tasks(tasks: &mut [&Task], sort: SortBy) {
    match sort {
        SortBy::Title => tasks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortBy::Priority => tasks.sort_by(|a, b| b.priority.cmp(&a.priority)),
        SortBy::Date => tasks.sort_by(|a, b| compare_due_dates(a, b)),
    }
}

/// Case-folded comparison, falling back to the raw strings so the order is total
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Earlier due dates first, undated tasks last
fn compare_due_dates(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filters then sorts
#[must_use]
pub fn project<'a>(tasks: &'a [Task], filter: &FilterConfig, sort: SortBy) -> Vec<&'a Task> {
    let mut visible = filter_tasks(tasks, filter);
    sort_tasks(&mut visible, sort);
    visible
}

/// The tasks currently on display for `state`
#[must_use]
pub fn visible_tasks(state: &TaskState) -> Vec<&Task> {
    project(&state.tasks, &state.filter, state.sort)
}

/// Aggregate counts over the whole (unfiltered) task list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Number of tasks
    pub total: usize,
    /// Number of pending tasks
    pub in_progress: usize,
    /// Number of completed tasks
    pub completed: usize,
    /// Percentage of completed tasks, rounded half up; 0 when there are none
    pub completion_rate: usize,
}

impl TaskStats {
    /// Computes statistics in one pass
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let (total, completed) = tasks.iter().fold((0, 0), |(total, completed), t| {
            (total + 1, completed + usize::from(t.is_completed()))
        });

        let completion_rate = if total == 0 {
            0
        } else {
            (200 * completed + total) / (2 * total)
        };

        Self {
            total,
            in_progress: total - completed,
            completed,
            completion_rate,
        }
    }
}
