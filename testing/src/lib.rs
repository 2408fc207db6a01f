//! # TaskMaster Testing
//!
//! Testing utilities for the task reducer and store.
//!
//! This crate provides:
//! - Deterministic clock and id generator
//! - Storage and seed-source doubles (failing backends, canned responses)
//! - [`ReducerTest`], a Given-When-Then harness for the task reducer
//! - `proptest` strategies for drafts and random action sequences
//!
//! ## Example
//!
//! ```
//! use taskmaster_core::types::{TaskAction, TaskDraft};
//! use taskmaster_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new()
//!     .when_action(TaskAction::Add { draft: TaskDraft::new("Buy milk") })
//!     .then_state(|state| assert_eq!(state.count(), 1))
//!     .then_effects(|effects| {
//!         assertions::assert_persists(effects);
//!     })
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use taskmaster_core::environment::Clock;


/// Property-based testing strategies
pub mod properties;

/// Mock implementations of environment and storage traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeZone;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use taskmaster_core::environment::IdGenerator;
    use taskmaster_core::reducer::TaskEnvironment;
    use taskmaster_core::seed::{RemoteTodo, SeedError, SeedSource};
    use taskmaster_core::types::TaskId;
    use taskmaster_runtime::persistence::{KeyValueStore, MemoryStore, PersistenceError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`].
    ///
    /// # Example
    ///
    /// ```
    /// use taskmaster_testing::mocks::FixedClock;
    /// use taskmaster_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time.lock().map_or_else(|e| *e.into_inner(), |t| *t)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant [`test_clock`] starts at
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Hands out 1, 2, 3, ...
    #[derive(Debug)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Starts at 1
        #[must_use]
        pub const fn new() -> Self {
            Self::starting_at(1)
        }

        /// Starts at `first`
        #[must_use]
        pub const fn starting_at(first: u64) -> Self {
            Self {
                next: AtomicU64::new(first),
            }
        }
    }

    impl Default for SequentialIds {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> TaskId {
            TaskId::new(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Environment with [`test_clock`] and [`SequentialIds`], no seed source
    #[must_use]
    pub fn test_environment() -> TaskEnvironment {
        TaskEnvironment::new(Arc::new(test_clock()), Arc::new(SequentialIds::new()))
    }

    /// Storage whose writes (and optionally reads) always fail
    ///
    /// Reads fall through to an in-memory map unless configured to fail, so a
    /// test can pre-load data and then watch saves fail.
    #[derive(Debug, Default)]
    pub struct FailingStore {
        fail_reads: bool,
        inner: MemoryStore,
        attempts: AtomicUsize,
    }

    impl FailingStore {
        /// Fails every write
        #[must_use]
        pub fn writes() -> Self {
            Self::default()
        }

        /// Fails every read and write
        #[must_use]
        pub fn reads_and_writes() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        /// Seeds a value that reads will return
        ///
        /// # Errors
        ///
        /// Propagates the in-memory backend's error.
        pub fn preload(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.inner.set(key, value)
        }

        /// How many writes were attempted
        #[must_use]
        pub fn write_attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn unavailable() -> PersistenceError {
            PersistenceError::Unavailable("quota exceeded".to_string())
        }
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            if self.fail_reads {
                return Err(Self::unavailable());
            }
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Self::unavailable())
        }

        fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(Self::unavailable())
        }
    }

    /// Seed source answering with a canned result
    #[derive(Debug)]
    pub struct StubSeedSource {
        response: Result<Vec<RemoteTodo>, SeedError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StubSeedSource {
        /// Succeeds with `todos`
        #[must_use]
        pub const fn ok(todos: Vec<RemoteTodo>) -> Self {
            Self {
                response: Ok(todos),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Fails with `error`
        #[must_use]
        pub const fn failing(error: SeedError) -> Self {
            Self {
                response: Err(error),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Waits `delay` before answering
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// How many fetches were made
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SeedSource for StubSeedSource {
        fn fetch_seed(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteTodo>, SeedError>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                self.response.clone()
            })
        }
    }

    /// `count` remote todos with ids starting at `first_id`; every third is completed
    #[must_use]
    pub fn remote_todos(first_id: u64, count: u64) -> Vec<RemoteTodo> {
        (first_id..first_id + count)
            .map(|id| RemoteTodo {
                id,
                title: format!("remote todo {id}"),
                completed: id % 3 == 0,
            })
            .collect()
    }
}

/// Test helpers and utilities
pub mod helpers {
    use taskmaster_core::types::{Priority, Task, TaskDraft, TaskId, TaskStatus};

    /// Install a tracing subscriber that writes through the test harness
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "taskmaster_runtime=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    /// A pending task created at [`test_time`](crate::mocks::test_time)
    #[must_use]
    pub fn task(id: u64, title: &str, priority: Priority) -> Task {
        Task::from_draft(
            TaskId::new(id),
            TaskDraft::new(title).with_priority(priority),
            crate::mocks::test_time(),
        )
    }

    /// Same as [`task`], already completed
    #[must_use]
    pub fn completed_task(id: u64, title: &str, priority: Priority) -> Task {
        let mut done = task(id, title, priority);
        done.set_status(TaskStatus::Completed, crate::mocks::test_time());
        done
    }
}

// Re-export commonly used items
pub use mocks::{
    test_clock, test_environment, test_time, FailingStore, FixedClock, SequentialIds,
    StubSeedSource,
};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;
    use taskmaster_core::environment::IdGenerator;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);

        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now() - time1, chrono::Duration::seconds(5));
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::starting_at(10);
        assert_eq!(ids.next_id().value(), 10);
        assert_eq!(ids.next_id().value(), 11);
    }

    #[test]
    fn test_failing_store_counts_writes() {
        use taskmaster_runtime::persistence::KeyValueStore;

        let store = FailingStore::writes();
        assert!(store.set("k", "v").is_err());
        assert!(store.set("k", "v").is_err());
        assert_eq!(store.write_attempts(), 2);
        assert!(matches!(store.get("k"), Ok(None)));
    }
}
