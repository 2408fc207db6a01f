//! Sample tasks written on first run.

use chrono::{DateTime, Days, Utc};
use taskmaster_core::environment::IdGenerator;
use taskmaster_core::types::{Priority, Task, TaskDraft, TaskStatus};

/// A small mixed list: different priorities, one finished, one undated
///
/// Ids come from `ids`, the same generator the store mints with.
#[must_use]
pub fn sample_tasks(now: DateTime<Utc>, ids: &dyn IdGenerator) -> Vec<Task> {
    let today = now.date_naive();
    let due = |days| today.checked_add_days(Days::new(days));

    let mut proposal = Task::from_draft(
        ids.next_id(),
        TaskDraft::new("Complete project proposal")
            .with_description("Draft the scope, timeline and budget for the new project")
            .with_priority(Priority::High),
        now,
    );
    proposal.due_date = due(3);

    let mut review = Task::from_draft(
        ids.next_id(),
        TaskDraft::new("Review pull requests")
            .with_description("Go through the open pull requests and leave feedback"),
        now,
    );
    review.due_date = due(1);

    let mut docs = Task::from_draft(
        ids.next_id(),
        TaskDraft::new("Update documentation")
            .with_description("Bring the README in line with the latest changes")
            .with_priority(Priority::Low),
        now,
    );
    docs.set_status(TaskStatus::Completed, now);

    vec![proposal, review, docs]
}
