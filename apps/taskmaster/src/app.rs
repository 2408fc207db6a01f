//! The TaskMaster composition root.
//!
//! [`TaskMaster`] builds the environment, storage and store once and owns
//! them. Every user operation validates its input, dispatches one action and
//! reads the result back from the store.

use crate::config::Config;
use crate::samples::sample_tasks;
use std::sync::Arc;
use std::time::Duration;
use taskmaster_core::environment::{Clock, IdGenerator, MonotonicIds, SystemClock};
use taskmaster_core::reducer::{TaskEnvironment, TaskReducer};
use taskmaster_core::seed::SeedSource;
use taskmaster_core::types::{
    FilterChange, FilterConfig, SeedStatus, SortBy, Task, TaskAction, TaskDraft, TaskId, TaskPatch,
    TaskState,
};
use taskmaster_core::validation::{ValidationError, ValidationRules};
use taskmaster_core::view::TaskStats;
use taskmaster_runtime::error::StoreError;
use taskmaster_runtime::persistence::{FileStore, KeyValueStore, TaskRepository};
use taskmaster_runtime::seed::HttpSeedSource;
use taskmaster_runtime::{PersistenceStatus, Store, TaskView};
use thiserror::Error;

/// Errors surfaced to the user
#[derive(Error, Debug)]
pub enum AppError {
    /// Input was rejected before anything was dispatched
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The add was dispatched but no task appeared
    #[error("Task was not added")]
    NotAdded,

    /// No task carries this id
    #[error("No task with id {0}")]
    NotFound(TaskId),

    /// The store refused the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote seed fetch failed
    #[error("Seeding failed: {0}")]
    SeedFailed(String),

    /// The remote seed fetch did not finish in time and was cancelled
    #[error("Seeding timed out after {0:?}")]
    SeedTimeout(Duration),
}

/// What happened at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Saved tasks were loaded
    Loaded(usize),
    /// Storage was empty; sample tasks were written
    Samples(usize),
    /// Storage was empty and samples are disabled
    Empty,
    /// Saved data could not be read; starting empty
    LoadFailed(String),
}

/// The application: one store plus the rules applied before dispatching
#[derive(Clone)]
pub struct TaskMaster {
    store: Store,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    rules: ValidationRules,
    samples_on_first_run: bool,
    effect_timeout: Duration,
}

impl std::fmt::Debug for TaskMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMaster")
            .field("store", &self.store)
            .field("rules", &self.rules)
            .field("effect_timeout", &self.effect_timeout)
            .finish_non_exhaustive()
    }
}

impl TaskMaster {
    /// Builds the application over the configured data directory and seed URL
    #[must_use]
    pub fn open(config: &Config) -> Self {
        let backend = Arc::new(FileStore::new(&config.storage.data_dir));
        let seed = Arc::new(HttpSeedSource::new(config.seed.url.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_parts(config, backend, Some(seed), clock)
    }

    /// Builds the application from explicit parts
    #[must_use]
    pub fn with_parts(
        config: &Config,
        backend: Arc<dyn KeyValueStore>,
        seed: Option<Arc<dyn SeedSource>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(MonotonicIds::with_clock(Arc::clone(&clock)));
        let mut env = TaskEnvironment::new(Arc::clone(&clock), Arc::clone(&ids));
        if let Some(seed) = seed {
            env = env.with_seed_source(seed);
        }

        let repository = TaskRepository::new(backend, config.storage.key.clone());
        let store = Store::new(TaskState::new(), TaskReducer::new(), env).with_repository(repository);

        Self {
            store,
            clock,
            ids,
            rules: config.validation.rules(),
            samples_on_first_run: config.seed.samples_on_first_run,
            effect_timeout: config.effect_timeout(),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Loads saved tasks, writing the samples when there are none
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn bootstrap(&self) -> Result<Bootstrap, AppError> {
        match self.store.load_from_repository().await {
            Ok(Some(count)) => Ok(Bootstrap::Loaded(count)),
            Ok(None) if self.samples_on_first_run => {
                let tasks = sample_tasks(self.clock.now(), self.ids.as_ref());
                let count = tasks.len();
                self.store.send(TaskAction::SetAll { tasks }).await?;
                tracing::info!(count, "Wrote sample tasks");
                Ok(Bootstrap::Samples(count))
            },
            Ok(None) => Ok(Bootstrap::Empty),
            Err(StoreError::Persistence(error)) => Ok(Bootstrap::LoadFailed(error.to_string())),
            Err(error) => Err(error.into()),
        }
    }

    /// Validates and adds a task, returning it with its new id
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for bad input.
    pub async fn add(&self, mut draft: TaskDraft) -> Result<Task, AppError> {
        draft.title = draft.title.trim().to_string();
        draft.description = draft.description.trim().to_string();
        self.rules.validate_draft(&draft)?;

        self.store.send(TaskAction::Add { draft }).await?;
        self.store
            .state(|s| s.tasks.last().cloned())
            .await
            .ok_or(AppError::NotAdded)
    }

    /// Validates and applies a partial update
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for bad input and
    /// [`AppError::NotFound`] for an unknown id.
    pub async fn edit(&self, id: TaskId, mut patch: TaskPatch) -> Result<Task, AppError> {
        patch.title = patch.title.map(|t| t.trim().to_string());
        patch.description = patch.description.map(|d| d.trim().to_string());
        self.rules.validate_patch(&patch)?;
        self.require(id).await?;

        self.store.send(TaskAction::Update { id, patch }).await?;
        self.require(id).await
    }

    /// Flips a task between pending and completed
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown id.
    pub async fn toggle(&self, id: TaskId) -> Result<Task, AppError> {
        self.require(id).await?;
        self.store.send(TaskAction::Toggle { id }).await?;
        self.require(id).await
    }

    /// Deletes a task, returning what was removed
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown id.
    pub async fn delete(&self, id: TaskId) -> Result<Task, AppError> {
        let task = self.require(id).await?;
        self.store.send(TaskAction::Delete { id }).await?;
        Ok(task)
    }

    /// Removes every completed task, returning how many went
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn clear_completed(&self) -> Result<usize, AppError> {
        let before = self.store.state(TaskState::count).await;
        self.store.send(TaskAction::ClearCompleted).await?;
        let after = self.store.state(TaskState::count).await;
        Ok(before.saturating_sub(after))
    }

    /// Applies the filters and sort, then returns the view
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store is shutting down.
    pub async fn list(&self, filter: FilterConfig, sort: SortBy) -> Result<TaskView, AppError> {
        for change in [
            FilterChange::Status(filter.status),
            FilterChange::Priority(filter.priority),
            FilterChange::Search(filter.search),
        ] {
            self.store.send(TaskAction::SetFilter(change)).await?;
        }
        self.store.send(TaskAction::SetSort { sort }).await?;
        Ok(self.store.view().await)
    }

    /// Statistics over every task
    pub async fn stats(&self) -> TaskStats {
        self.store.view().await.stats
    }

    /// Fetches remote sample tasks and merges them in, returning how many were added
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SeedFailed`] when the fetch fails and
    /// [`AppError::SeedTimeout`] when it takes longer than the effect timeout.
    pub async fn seed(&self) -> Result<usize, AppError> {
        let mut handle = self.store.send(TaskAction::FetchSeed).await?;

        if handle.wait_with_timeout(self.effect_timeout).await.is_err() {
            tracing::warn!(timeout = ?self.effect_timeout, "Seed fetch timed out; cancelling");
            self.store.send(TaskAction::CancelSeed).await?;
            return Err(AppError::SeedTimeout(self.effect_timeout));
        }

        match self.store.state(|s| s.seed.clone()).await {
            SeedStatus::Loaded { added } => Ok(added),
            SeedStatus::Failed { error } => {
                tracing::warn!(error = %error, "Seed fetch failed");
                Err(AppError::SeedFailed(error))
            },
            SeedStatus::Idle | SeedStatus::Loading { .. } => {
                Err(AppError::SeedFailed("fetch was superseded".to_string()))
            },
        }
    }

    /// Deletes saved data; the tasks of this session stay in memory
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when the backend refuses.
    pub async fn reset(&self) -> Result<(), AppError> {
        self.store.clear_storage().await?;
        Ok(())
    }

    /// Outcome of the last save
    pub async fn persistence_status(&self) -> PersistenceStatus {
        self.store.persistence_status().await
    }

    /// Waits for running effects, then stops accepting actions
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if effects outlive the effect timeout.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.store.shutdown(self.effect_timeout).await?;
        Ok(())
    }

    async fn require(&self, id: TaskId) -> Result<Task, AppError> {
        self.store
            .state(|s| s.get(id).cloned())
            .await
            .ok_or(AppError::NotFound(id))
    }
}
