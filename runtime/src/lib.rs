//! # TaskMaster Runtime
//!
//! The [`Store`](store::Store) that owns the task state, runs the reducer one
//! action at a time and executes the effects it returns.
//!
//! ## Core Components
//!
//! - **Store**: explicitly owned state container; clones share one state
//! - **Persistence**: [`persistence::TaskRepository`] over a [`persistence::KeyValueStore`]
//! - **Seed source**: [`seed::HttpSeedSource`] for the optional remote sample fetch
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskmaster_core::environment::{MonotonicIds, SystemClock};
//! use taskmaster_core::reducer::{TaskEnvironment, TaskReducer};
//! use taskmaster_core::types::{TaskAction, TaskDraft, TaskState};
//! use taskmaster_runtime::persistence::{MemoryStore, TaskRepository};
//! use taskmaster_runtime::Store;
//!
//! # async fn example() -> Result<(), taskmaster_runtime::error::StoreError> {
//! let env = TaskEnvironment::new(Arc::new(SystemClock), Arc::new(MonotonicIds::new()));
//! let repo = TaskRepository::new(Arc::new(MemoryStore::new()), "taskmaster_tasks");
//! let store = Store::new(TaskState::new(), TaskReducer::new(), env).with_repository(repo);
//!
//! store.send(TaskAction::Add { draft: TaskDraft::new("Buy milk") }).await?;
//! let count = store.state(|s| s.count()).await;
//! assert_eq!(count, 1);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Durable storage for the task list
pub mod persistence;

/// HTTP seed source
pub mod seed;

pub use store::{PersistenceStatus, Store, TaskView};

/// Error types for the Store runtime
pub mod error {
    use crate::persistence::PersistenceError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects
        #[error("Timeout waiting for effects")]
        Timeout,

        /// Reading or clearing durable storage failed
        #[error(transparent)]
        Persistence(#[from] PersistenceError),
    }
}

use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send`](store::Store::send) so callers can wait for the
/// async effects an action started (a seed fetch, for instance). Persist
/// effects have already run by the time the handle is returned.
#[derive(Clone, Debug)]
pub struct EffectHandle {
    remaining: watch::Receiver<usize>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let (tx, rx) = watch::channel(0);
        (
            Self { remaining: rx },
            EffectTracking {
                remaining: Arc::new(tx),
            },
        )
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self { remaining: rx }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        // A closed channel means every tracker is gone, so nothing is running.
        let _ = self.remaining.wait_for(|n| *n == 0).await;
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

/// Internal: counts the effects started by one action
#[derive(Clone)]
struct EffectTracking {
    remaining: Arc<watch::Sender<usize>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.remaining.send_modify(|n| *n += 1);
    }

    fn decrement(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Internal: decrements the effect counter on drop, even if the effect panics
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration,
        EffectHandle, EffectTracking, Ordering, RwLock, StoreError,
    };
    use crate::persistence::TaskRepository;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use std::future::Future;
    use std::pin::Pin;
    use taskmaster_core::effect::Effect;
    use taskmaster_core::reducer::{Reducer, TaskEnvironment, TaskReducer};
    use taskmaster_core::types::{Task, TaskAction, TaskState};
    use taskmaster_core::view::{visible_tasks, TaskStats};

    type PendingFuture = Pin<Box<dyn Future<Output = Option<TaskAction>> + Send>>;

    /// Outcome of the most recent save
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum PersistenceStatus {
        /// No repository attached; state lives in memory only
        Disabled,
        /// Nothing has been saved yet
        Unsaved,
        /// The last save succeeded
        Saved {
            /// When it happened
            at: DateTime<Utc>,
            /// How many tasks were written
            tasks: usize,
        },
        /// The last save or load failed; in-memory state is still authoritative
        Failed {
            /// What went wrong
            error: String,
        },
    }

    impl PersistenceStatus {
        /// Whether the last storage operation failed
        #[must_use]
        pub const fn is_failed(&self) -> bool {
            matches!(self, Self::Failed { .. })
        }
    }

    /// What the user sees: the filtered, sorted tasks and whole-list statistics
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct TaskView {
        /// Tasks passing the current filters, in display order
        pub tasks: Vec<Task>,
        /// Statistics over all tasks
        pub stats: TaskStats,
    }

    struct Inner {
        state: TaskState,
        persistence: PersistenceStatus,
    }

    /// The Store - runtime coordinator for the task reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, one writer at a time)
    /// 2. Reducer (business logic)
    /// 3. Environment (clock, ids, seed source)
    /// 4. Effect execution: saves inline, futures on the tokio runtime
    ///
    /// There is no global instance. Whoever builds the store owns it and hands
    /// clones to the code that needs it.
    #[derive(Clone)]
    pub struct Store {
        inner: Arc<RwLock<Inner>>,
        reducer: TaskReducer,
        environment: TaskEnvironment,
        repository: Option<TaskRepository>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl Store {
        /// Create a new in-memory store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: TaskState, reducer: TaskReducer, environment: TaskEnvironment) -> Self {
            Self {
                inner: Arc::new(RwLock::new(Inner {
                    state: initial_state,
                    persistence: PersistenceStatus::Disabled,
                })),
                reducer,
                environment,
                repository: None,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Attach durable storage; every task mutation is saved through it
        ///
        /// Call before cloning the store.
        #[must_use]
        pub fn with_repository(mut self, repository: TaskRepository) -> Self {
            if let Some(inner) = Arc::get_mut(&mut self.inner) {
                inner.get_mut().persistence = PersistenceStatus::Unsaved;
            }
            self.repository = Some(repository);
            self
        }

        /// Rehydrate from the repository through a `SetAll` action
        ///
        /// Returns the number of tasks loaded, or `None` when storage is empty
        /// (or no repository is attached). `SetAll` persists, so loaded data is
        /// written straight back in the current versioned layout.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Persistence`] when the stored value cannot be
        /// read; the store keeps its current state and records the failure.
        pub async fn load_from_repository(&self) -> Result<Option<usize>, StoreError> {
            let Some(repository) = &self.repository else {
                return Ok(None);
            };

            match repository.load() {
                Ok(Some(tasks)) => {
                    let count = tasks.len();
                    tracing::info!(count, key = repository.key(), "Loaded tasks from storage");
                    self.send(TaskAction::SetAll { tasks }).await?;
                    Ok(Some(count))
                },
                Ok(None) => {
                    tracing::info!(key = repository.key(), "No saved tasks found");
                    Ok(None)
                },
                Err(error) => {
                    tracing::warn!(error = %error, "Failed to load saved tasks");
                    self.inner.write().await.persistence = PersistenceStatus::Failed {
                        error: error.to_string(),
                    };
                    Err(error.into())
                },
            }
        }

        /// Delete the saved task list; in-memory state is left as is
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Persistence`] when the backend refuses.
        pub async fn clear_storage(&self) -> Result<(), StoreError> {
            let Some(repository) = &self.repository else {
                return Ok(());
            };
            // Hold the lock so no save races the removal.
            let mut inner = self.inner.write().await;
            repository.clear()?;
            inner.persistence = PersistenceStatus::Unsaved;
            tracing::info!(key = repository.key(), "Cleared saved tasks");
            Ok(())
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are rejected from now on; waits for running effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the timeout expires.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);
                if pending == 0 {
                    tracing::debug!("All effects completed, shutdown successful");
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Runs the reducer
        /// 3. Saves the task list if the reducer asked for it, still under the
        ///    lock, so saves land in action order
        /// 4. Spawns async effects; actions they produce come back through `send`
        ///
        /// A failed save is logged and recorded in [`Store::persistence_status`];
        /// it never undoes the in-memory change.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), fields(action = action.name()), name = "store_send")]
        pub async fn send(&self, action: TaskAction) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!(touches_tasks = action.touches_tasks(), "Processing action");

            let (handle, tracking) = EffectHandle::new();

            let deferred = {
                let mut inner = self.inner.write().await;
                let effects = self
                    .reducer
                    .reduce(&mut inner.state, action, &self.environment);
                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                let mut deferred = Vec::new();
                for effect in effects {
                    self.run_effect(&mut inner, effect, &mut deferred);
                }
                deferred
            };

            for future in deferred {
                self.spawn_effect(future, tracking.clone());
            }

            Ok(handle)
        }

        /// Runs saves in place and collects futures for spawning
        fn run_effect(&self, inner: &mut Inner, effect: Effect<TaskAction>, deferred: &mut Vec<PendingFuture>) {
            match effect {
                Effect::None => {},
                Effect::Persist(tasks) => self.persist(inner, &tasks),
                Effect::Future(future) => deferred.push(future),
            }
        }

        fn persist(&self, inner: &mut Inner, tasks: &[Task]) {
            let Some(repository) = &self.repository else {
                return;
            };

            // Blocking write while the state lock is held; saves land in action order.
            match repository.save(tasks) {
                Ok(()) => {
                    tracing::trace!(count = tasks.len(), "Saved tasks");
                    inner.persistence = PersistenceStatus::Saved {
                        at: self.environment.clock.now(),
                        tasks: tasks.len(),
                    };
                },
                Err(error) => {
                    tracing::warn!(error = %error, "Failed to save tasks; keeping in-memory state");
                    inner.persistence = PersistenceStatus::Failed {
                        error: error.to_string(),
                    };
                },
            }
        }

        fn spawn_effect(&self, future: PendingFuture, tracking: EffectTracking) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
            let store = self.clone();

            tokio::spawn(async move {
                let _guard = DecrementGuard(tracking);
                let _pending_guard = pending_guard;

                if let Some(action) = future.await {
                    tracing::trace!("Effect produced an action, sending to store");
                    if let Err(error) = store.send(action).await {
                        tracing::warn!(error = %error, "Dropped action produced by effect");
                    }
                }
            });
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let pending = store.state(|s| s.count() - s.completed_count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&TaskState) -> T,
        {
            let inner = self.inner.read().await;
            f(&inner.state)
        }

        /// The filtered, sorted tasks and statistics for the current state
        pub async fn view(&self) -> TaskView {
            self.state(|s| TaskView {
                tasks: visible_tasks(s).into_iter().cloned().collect(),
                stats: TaskStats::from_tasks(&s.tasks),
            })
            .await
        }

        /// Outcome of the most recent storage operation
        pub async fn persistence_status(&self) -> PersistenceStatus {
            self.inner.read().await.persistence.clone()
        }
    }

    impl std::fmt::Debug for Store {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("repository", &self.repository)
                .field("pending_effects", &self.pending_effects.load(Ordering::Relaxed))
                .finish_non_exhaustive()
        }
    }

}
