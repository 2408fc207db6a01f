//! # TaskMaster Core
//!
//! Task records, the task reducer, and the derived views built on top of them.
//!
//! This crate has no I/O. Everything that touches the outside world (the clock,
//! id minting, the remote seed source) is reached through the [`environment`]
//! traits, and everything the reducer wants done to the outside world is
//! returned as an [`effect::Effect`] description for a runtime to execute.
//!
//! ## Core Concepts
//!
//! - **Task**: one unit of work (title, description, priority, status, dates)
//! - **State**: the ordered task list plus the current filter and sort
//! - **Action**: a closed enum of every state change the application can ask for
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Derived view**: filtered, sorted projection and statistics, computed on demand
//!
//! ## Example
//!
//! ```
//! use taskmaster_core::environment::{MonotonicIds, SystemClock};
//! use taskmaster_core::reducer::{next_state, TaskEnvironment, TaskReducer};
//! use taskmaster_core::types::{Priority, TaskAction, TaskDraft, TaskState};
//! use taskmaster_core::view::TaskStats;
//! use std::sync::Arc;
//!
//! let env = TaskEnvironment::new(Arc::new(SystemClock), Arc::new(MonotonicIds::new()));
//! let draft = TaskDraft::new("Buy milk").with_priority(Priority::Low);
//!
//! let (state, _effects) = next_state(
//!     &TaskReducer::new(),
//!     &TaskState::new(),
//!     TaskAction::Add { draft },
//!     &env,
//! );
//!
//! assert_eq!(state.count(), 1);
//! assert_eq!(TaskStats::from_tasks(&state.tasks).in_progress, 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer trait and the task reducer
pub mod reducer;

/// Task records, actions and store state
pub mod types;

/// Filtered and sorted projections, statistics
pub mod view;

/// Input validation performed by callers before dispatching
pub mod validation;

/// Remote seed records and the seed source abstraction
pub mod seed;

/// Effect module - side effect descriptions
///
/// Effects describe work to be performed by the runtime. The reducer returns
/// them as values; it never performs them.
pub mod effect {
    use crate::types::Task;
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Write this snapshot of the task list to durable storage
        Persist(Vec<Task>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Persist(tasks) => f
                    .debug_struct("Effect::Persist")
                    .field("tasks", &tasks.len())
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns the snapshot carried by a `Persist` effect
        #[must_use]
        pub fn persisted_tasks(&self) -> Option<&[Task]> {
            match self {
                Effect::Persist(tasks) => Some(tasks),
                _ => None,
            }
        }
    }
}

/// Environment module - dependency injection traits
///
/// Time and id minting are abstracted so reducers stay deterministic under test.
pub mod environment {
    use crate::types::TaskId;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Mints task ids
    ///
    /// Implementations must never hand out the same id twice.
    pub trait IdGenerator: Send + Sync {
        /// Returns a fresh id
        fn next_id(&self) -> TaskId;
    }

    /// Clock-seeded, strictly increasing ids
    ///
    /// Each id is `max(clock millis, previous id + 1)`, so two tasks created in
    /// the same millisecond still get distinct ids.
    pub struct MonotonicIds {
        clock: Arc<dyn Clock>,
        last: AtomicU64,
    }

    impl MonotonicIds {
        /// Creates a generator backed by the system clock
        #[must_use]
        pub fn new() -> Self {
            Self::with_clock(Arc::new(SystemClock))
        }

        /// Creates a generator backed by the given clock
        #[must_use]
        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            Self {
                clock,
                last: AtomicU64::new(0),
            }
        }
    }

    impl Default for MonotonicIds {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for MonotonicIds {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MonotonicIds")
                .field("last", &self.last.load(Ordering::Relaxed))
                .finish_non_exhaustive()
        }
    }

    impl IdGenerator for MonotonicIds {
        fn next_id(&self) -> TaskId {
            let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
            let mut last = self.last.load(Ordering::Acquire);
            loop {
                let candidate = millis.max(last.saturating_add(1));
                match self.last.compare_exchange_weak(
                    last,
                    candidate,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return TaskId::new(candidate),
                    Err(actual) => last = actual,
                }
            }
        }
    }

}
