//! `proptest` strategies for task data and random action sequences.
//!
//! Operations refer to tasks by position rather than id, so a generated
//! sequence stays meaningful whatever ids the reducer hands out. Call
//! [`TaskOp::into_action`] against the current state to resolve them.

use chrono::NaiveDate;
use proptest::prelude::*;
use taskmaster_core::types::{
    FilterChange, Priority, PriorityFilter, SortBy, StatusFilter, TaskAction, TaskDraft,
    TaskId, TaskPatch, TaskState, TaskStatus,
};

/// Any priority
pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

/// Any status
pub fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![Just(TaskStatus::Pending), Just(TaskStatus::Completed)]
}

/// Any sort criterion
pub fn arb_sort() -> impl Strategy<Value = SortBy> {
    prop_oneof![Just(SortBy::Date), Just(SortBy::Priority), Just(SortBy::Title)]
}

/// Dates in 2025
pub fn arb_due_date() -> impl Strategy<Value = NaiveDate> {
    (1u32..=365).prop_filter_map("valid ordinal", |day| NaiveDate::from_yo_opt(2025, day))
}

/// Titles that pass the default validation rules
pub fn arb_title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{1,38}[A-Za-z0-9]"
}

/// A draft that passes the default validation rules
pub fn arb_draft() -> impl Strategy<Value = TaskDraft> {
    (
        arb_title(),
        "[a-z ]{0,30}",
        arb_priority(),
        proptest::option::of(arb_due_date()),
    )
        .prop_map(|(title, description, priority, due_date)| TaskDraft {
            title,
            description,
            priority,
            due_date,
        })
}

/// A patch touching any subset of fields
pub fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of(arb_title()),
        proptest::option::of("[a-z ]{0,30}"),
        proptest::option::of(arb_priority()),
        proptest::option::of(proptest::option::of(arb_due_date())),
        proptest::option::of(arb_status()),
    )
        .prop_map(|(title, description, priority, due_date, status)| TaskPatch {
            title,
            description,
            priority,
            due_date,
            status,
        })
}

/// A user operation on the store
#[derive(Clone, Debug)]
pub enum TaskOp {
    /// Add a task
    Add(TaskDraft),
    /// Toggle the task at this position (modulo the task count)
    Toggle(usize),
    /// Delete the task at this position (modulo the task count)
    Delete(usize),
    /// Patch the task at this position (modulo the task count)
    Update(usize, TaskPatch),
    /// Remove completed tasks
    ClearCompleted,
    /// Change the status filter
    FilterStatus(StatusFilter),
    /// Change the sort
    Sort(SortBy),
}

impl TaskOp {
    /// Resolves positions against `state`
    ///
    /// On an empty store, positional operations target an id that does not
    /// exist, which the reducer must ignore.
    #[must_use]
    pub fn into_action(self, state: &TaskState) -> TaskAction {
        let id_at = |index: usize| {
            if state.tasks.is_empty() {
                TaskId::new(u64::MAX)
            } else {
                state.tasks[index % state.tasks.len()].id
            }
        };

        match self {
            Self::Add(draft) => TaskAction::Add { draft },
            Self::Toggle(index) => TaskAction::Toggle { id: id_at(index) },
            Self::Delete(index) => TaskAction::Delete { id: id_at(index) },
            Self::Update(index, patch) => TaskAction::Update {
                id: id_at(index),
                patch,
            },
            Self::ClearCompleted => TaskAction::ClearCompleted,
            Self::FilterStatus(status) => TaskAction::SetFilter(FilterChange::Status(status)),
            Self::Sort(sort) => TaskAction::SetSort { sort },
        }
    }
}

/// Any single operation, weighted towards adds so sequences build up data
pub fn arb_op() -> impl Strategy<Value = TaskOp> {
    prop_oneof![
        4 => arb_draft().prop_map(TaskOp::Add),
        3 => any::<usize>().prop_map(TaskOp::Toggle),
        1 => any::<usize>().prop_map(TaskOp::Delete),
        2 => (any::<usize>(), arb_patch()).prop_map(|(i, p)| TaskOp::Update(i, p)),
        1 => Just(TaskOp::ClearCompleted),
        1 => prop_oneof![
            Just(StatusFilter::All),
            Just(StatusFilter::Pending),
            Just(StatusFilter::Completed),
        ]
        .prop_map(TaskOp::FilterStatus),
        1 => arb_sort().prop_map(TaskOp::Sort),
    ]
}

/// Sequences of up to `max_len` operations
pub fn arb_ops(max_len: usize) -> impl Strategy<Value = Vec<TaskOp>> {
    proptest::collection::vec(arb_op(), 0..=max_len)
}

/// Priority filter including `All`
pub fn arb_priority_filter() -> impl Strategy<Value = PriorityFilter> {
    prop_oneof![
        Just(PriorityFilter::All),
        arb_priority().prop_map(PriorityFilter::Only),
    ]
}
