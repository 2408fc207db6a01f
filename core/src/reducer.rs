//! Reducer logic for the task store.
//!
//! The reducer is a total function over [`TaskAction`]: unknown ids are silent
//! no-ops and nothing is ever rejected. Validation happens in the caller,
//! before an action is built.

use crate::effect::Effect;
use crate::environment::{Clock, IdGenerator};
use crate::seed::{RemoteTodo, SeedError, SeedSource, SEED_DUE_WINDOW_DAYS};
use crate::types::{FilterChange, SeedStatus, Task, TaskAction, TaskId, TaskState};
use chrono::{DateTime, Utc};
use rand::Rng;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// The Reducer trait - core abstraction for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// State is updated in place; everything else is described by the returned effects.
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}

/// Computes the next state without touching `state`
///
/// Clones the input, reduces the clone and hands both the new state and the
/// effects back.
pub fn next_state<R>(
    reducer: &R,
    state: &R::State,
    action: R::Action,
    env: &R::Environment,
) -> (R::State, SmallVec<[Effect<R::Action>; 4]>)
where
    R: Reducer,
    R::State: Clone,
{
    let mut next = state.clone();
    let effects = reducer.reduce(&mut next, action, env);
    (next, effects)
}

/// Environment dependencies for the task reducer
#[derive(Clone)]
pub struct TaskEnvironment {
    /// Clock for generating timestamps
    pub clock: Arc<dyn Clock>,
    /// Id minting
    pub ids: Arc<dyn IdGenerator>,
    /// Remote seed source, if any
    pub seed: Option<Arc<dyn SeedSource>>,
}

impl TaskEnvironment {
    /// Creates an environment without a seed source
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            clock,
            ids,
            seed: None,
        }
    }

    /// Attaches a remote seed source
    #[must_use]
    pub fn with_seed_source(mut self, seed: Arc<dyn SeedSource>) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl std::fmt::Debug for TaskEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEnvironment")
            .field("seed", &self.seed.is_some())
            .finish_non_exhaustive()
    }
}

/// Reducer for the task store
#[derive(Clone, Debug, Default)]
pub struct TaskReducer;

impl TaskReducer {
    /// Creates a new `TaskReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks an id no record in `state` is using
    fn allocate_id(state: &TaskState, env: &TaskEnvironment) -> TaskId {
        let id = env.ids.next_id();
        if state.exists(id) {
            // Loaded data can predate this generator.
            state.max_id().map_or(id, TaskId::successor)
        } else {
            id
        }
    }

    fn persist(state: &TaskState) -> SmallVec<[Effect<TaskAction>; 4]> {
        smallvec![Effect::Persist(state.tasks.clone())]
    }

    fn apply_filter(state: &mut TaskState, change: FilterChange) {
        match change {
            FilterChange::Status(status) => state.filter.status = status,
            FilterChange::Priority(priority) => state.filter.priority = priority,
            FilterChange::Search(term) => state.filter.search = term,
        }
    }

    /// Starts a seed fetch and describes it as a future effect
    fn fetch_seed(state: &mut TaskState, env: &TaskEnvironment) -> SmallVec<[Effect<TaskAction>; 4]> {
        let Some(source) = env.seed.clone() else {
            state.seed = SeedStatus::Failed {
                error: SeedError::Unavailable.to_string(),
            };
            return SmallVec::new();
        };

        state.seed_requests += 1;
        let request = state.seed_requests;
        state.seed = SeedStatus::Loading { request };

        let clock = Arc::clone(&env.clock);
        smallvec![Effect::Future(Box::pin(async move {
            let action = match source.fetch_seed().await {
                Ok(todos) => TaskAction::SeedLoaded {
                    request,
                    tasks: convert_seed(todos, clock.now()),
                },
                Err(error) => TaskAction::SeedFailed {
                    request,
                    error: error.to_string(),
                },
            };
            Some(action)
        }))]
    }

    /// Appends seed tasks under freshly minted ids, returning how many were added
    ///
    /// The remote id a seed task arrives with is never kept.
    fn merge_seed(state: &mut TaskState, tasks: Vec<Task>, env: &TaskEnvironment) -> usize {
        let added = tasks.len();
        for mut task in tasks {
            task.id = Self::allocate_id(state, env);
            state.tasks.push(task);
        }
        added
    }
}

/// Converts remote todos, giving each a due date 1 to 7 days after `now`
fn convert_seed(todos: Vec<RemoteTodo>, now: DateTime<Utc>) -> Vec<Task> {
    let mut rng = rand::thread_rng();
    todos
        .into_iter()
        .filter_map(|todo| todo.into_task(now, rng.gen_range(1..=SEED_DUE_WINDOW_DAYS)))
        .collect()
}

impl Reducer for TaskReducer {
    type State = TaskState;
    type Action = TaskAction;
    type Environment = TaskEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TaskAction::SetAll { tasks } => {
                state.replace_tasks(tasks);
                Self::persist(state)
            },

            TaskAction::Add { draft } => {
                let id = Self::allocate_id(state, env);
                state
                    .tasks
                    .push(Task::from_draft(id, draft, env.clock.now()));
                Self::persist(state)
            },

            TaskAction::Update { id, patch } => {
                let Some(task) = state.get_mut(id) else {
                    return SmallVec::new();
                };
                task.apply_patch(patch, env.clock.now());
                Self::persist(state)
            },

            TaskAction::Delete { id } => {
                let before = state.tasks.len();
                state.tasks.retain(|t| t.id != id);
                if state.tasks.len() == before {
                    return SmallVec::new();
                }
                Self::persist(state)
            },

            TaskAction::Toggle { id } => {
                let Some(task) = state.get_mut(id) else {
                    return SmallVec::new();
                };
                task.toggle(env.clock.now());
                Self::persist(state)
            },

            TaskAction::SetFilter(change) => {
                Self::apply_filter(state, change);
                SmallVec::new()
            },

            TaskAction::SetSort { sort } => {
                state.sort = sort;
                SmallVec::new()
            },

            TaskAction::ClearCompleted => {
                let before = state.tasks.len();
                state.tasks.retain(|t| !t.is_completed());
                if state.tasks.len() == before {
                    return SmallVec::new();
                }
                Self::persist(state)
            },

            TaskAction::FetchSeed => Self::fetch_seed(state, env),

            TaskAction::SeedLoaded { request, tasks } => {
                if state.seed != (SeedStatus::Loading { request }) {
                    return SmallVec::new();
                }
                let added = Self::merge_seed(state, tasks, env);
                state.seed = SeedStatus::Loaded { added };
                if added == 0 {
                    return SmallVec::new();
                }
                Self::persist(state)
            },

            TaskAction::SeedFailed { request, error } => {
                if state.seed == (SeedStatus::Loading { request }) {
                    state.seed = SeedStatus::Failed { error };
                }
                SmallVec::new()
            },

            TaskAction::CancelSeed => {
                if matches!(state.seed, SeedStatus::Loading { .. }) {
                    state.seed = SeedStatus::Idle;
                }
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, SortBy, StatusFilter, TaskDraft, TaskPatch, TaskStatus};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct CountingIds(AtomicU64);

    impl IdGenerator for CountingIds {
        fn next_id(&self) -> TaskId {
            TaskId::new(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn env() -> TaskEnvironment {
        TaskEnvironment::new(
            Arc::new(FixedClock(now())),
            Arc::new(CountingIds(AtomicU64::new(0))),
        )
    }

    fn reduce(state: &mut TaskState, action: TaskAction, env: &TaskEnvironment) -> usize {
        TaskReducer::new().reduce(state, action, env).len()
    }

    #[test]
    fn add_appends_pending_task_and_persists() {
        let env = env();
        let mut state = TaskState::new();
        let effects = TaskReducer::new().reduce(
            &mut state,
            TaskAction::Add {
                draft: TaskDraft::new("Buy milk").with_priority(Priority::Low),
            },
            &env,
        );

        assert_eq!(state.count(), 1);
        let task = &state.tasks[0];
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, now());
        assert_eq!(task.completed_at, None);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].persisted_tasks().map(<[Task]>::len), Some(1));
    }

    #[test]
    fn add_skips_ids_already_in_the_store() {
        let env = env();
        let existing = Task::from_draft(TaskId::new(1), TaskDraft::new("Loaded"), now());
        let mut state = TaskState::with_tasks(vec![existing]);

        reduce(&mut state, TaskAction::Add { draft: TaskDraft::new("New") }, &env);

        assert_eq!(state.count(), 2);
        assert_ne!(state.tasks[0].id, state.tasks[1].id);
    }

    #[test]
    fn not_found_actions_are_silent_no_ops() {
        let env = env();
        let mut state = TaskState::new();
        reduce(&mut state, TaskAction::Add { draft: TaskDraft::new("Only") }, &env);
        let before = state.clone();
        let missing = TaskId::new(999);

        assert_eq!(reduce(&mut state, TaskAction::Toggle { id: missing }, &env), 0);
        assert_eq!(reduce(&mut state, TaskAction::Delete { id: missing }, &env), 0);
        assert_eq!(
            reduce(
                &mut state,
                TaskAction::Update {
                    id: missing,
                    patch: TaskPatch {
                        title: Some("x".to_string()),
                        ..TaskPatch::default()
                    },
                },
                &env,
            ),
            0
        );
        assert_eq!(state, before);
    }

    #[test]
    fn update_status_keeps_completion_time_consistent() {
        let env = env();
        let mut state = TaskState::new();
        reduce(&mut state, TaskAction::Add { draft: TaskDraft::new("Walk") }, &env);
        let id = state.tasks[0].id;

        reduce(
            &mut state,
            TaskAction::Update {
                id,
                patch: TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..TaskPatch::default()
                },
            },
            &env,
        );
        assert_eq!(state.tasks[0].completed_at, Some(now()));
    }

    #[test]
    fn clear_completed_without_completed_tasks_does_not_persist() {
        let env = env();
        let mut state = TaskState::new();
        reduce(&mut state, TaskAction::Add { draft: TaskDraft::new("Open") }, &env);
        assert_eq!(reduce(&mut state, TaskAction::ClearCompleted, &env), 0);
        assert_eq!(state.count(), 1);
    }

    #[test]
    fn view_settings_do_not_persist() {
        let env = env();
        let mut state = TaskState::new();
        assert_eq!(
            reduce(&mut state, TaskAction::SetSort { sort: SortBy::Priority }, &env),
            0
        );
        assert_eq!(
            reduce(
                &mut state,
                TaskAction::SetFilter(FilterChange::Status(StatusFilter::Completed)),
                &env,
            ),
            0
        );
        assert_eq!(state.sort, SortBy::Priority);
        assert_eq!(state.filter.status, StatusFilter::Completed);
    }

    #[test]
    fn fetch_seed_without_source_fails_immediately() {
        let env = env();
        let mut state = TaskState::new();
        assert_eq!(reduce(&mut state, TaskAction::FetchSeed, &env), 0);
        assert!(matches!(state.seed, SeedStatus::Failed { .. }));
    }

    #[test]
    fn stale_seed_results_are_ignored() {
        let env = env();
        let mut state = TaskState::new();
        state.seed = SeedStatus::Loading { request: 2 };
        let seeded = Task::from_draft(TaskId::new(5), TaskDraft::new("Remote"), now());

        reduce(
            &mut state,
            TaskAction::SeedLoaded {
                request: 1,
                tasks: vec![seeded],
            },
            &env,
        );
        assert_eq!(state.count(), 0);
        assert_eq!(state.seed, SeedStatus::Loading { request: 2 });
    }

    #[test]
    fn seed_merge_mints_local_ids_for_every_record() {
        let env = env();
        let local = Task::from_draft(TaskId::new(1), TaskDraft::new("Local"), now());
        let mut state = TaskState::with_tasks(vec![local]);
        state.seed = SeedStatus::Loading { request: 1 };

        let clash = Task::from_draft(TaskId::new(1), TaskDraft::new("Remote clash"), now());
        let fresh = Task::from_draft(TaskId::new(2), TaskDraft::new("Remote fresh"), now());
        let effects = TaskReducer::new().reduce(
            &mut state,
            TaskAction::SeedLoaded {
                request: 1,
                tasks: vec![clash, fresh],
            },
            &env,
        );

        assert_eq!(state.count(), 3);
        assert_eq!(state.tasks[0].title, "Local");
        assert_eq!(state.get(TaskId::new(1)).map(|t| t.title.as_str()), Some("Local"));
        let ids: std::collections::HashSet<_> = state.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(state.seed, SeedStatus::Loaded { added: 2 });
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn seed_failure_leaves_tasks_untouched() {
        let env = env();
        let mut state = TaskState::new();
        reduce(&mut state, TaskAction::Add { draft: TaskDraft::new("Keep") }, &env);
        state.seed = SeedStatus::Loading { request: 1 };
        let tasks_before = state.tasks.clone();

        reduce(
            &mut state,
            TaskAction::SeedFailed {
                request: 1,
                error: "boom".to_string(),
            },
            &env,
        );
        assert_eq!(state.tasks, tasks_before);
        assert_eq!(
            state.seed,
            SeedStatus::Failed {
                error: "boom".to_string()
            }
        );
    }

    #[test]
    fn cancel_seed_returns_to_idle() {
        let env = env();
        let mut state = TaskState::new();
        state.seed = SeedStatus::Loading { request: 3 };
        reduce(&mut state, TaskAction::CancelSeed, &env);
        assert_eq!(state.seed, SeedStatus::Idle);
    }

    #[test]
    fn next_state_leaves_input_untouched() {
        let env = env();
        let state = TaskState::new();
        let (next, effects) = next_state(
            &TaskReducer::new(),
            &state,
            TaskAction::Add {
                draft: TaskDraft::new("Pure"),
            },
            &env,
        );
        assert_eq!(state.count(), 0);
        assert_eq!(next.count(), 1);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn converted_seed_is_due_within_a_week() {
        let todos = (1..=20)
            .map(|id| RemoteTodo {
                id,
                title: format!("todo {id}"),
                completed: false,
            })
            .collect();
        let tasks = convert_seed(todos, now());
        assert_eq!(tasks.len(), 20);
        let today = now().date_naive();
        for task in tasks {
            let due = task.due_date.unwrap_or(today);
            let days = (due - today).num_days();
            assert!((1..=7).contains(&days), "due in {days} days");
        }
    }
}
