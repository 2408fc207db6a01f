//! Integration tests for the TaskMaster application layer

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use taskmaster::{AppError, Bootstrap, Config, TaskMaster};
use taskmaster_core::seed::{SeedError, SeedSource};
use taskmaster_core::types::{
    FilterConfig, Priority, PriorityFilter, SortBy, StatusFilter, TaskDraft, TaskId, TaskPatch,
    TaskStatus,
};
use taskmaster_core::validation::ValidationError;
use taskmaster_runtime::persistence::{FileStore, KeyValueStore, MemoryStore, TaskRepository};
use taskmaster_runtime::PersistenceStatus;
use taskmaster_testing::mocks::remote_todos;
use taskmaster_testing::{test_clock, FailingStore, StubSeedSource};

fn config(samples: bool) -> Config {
    let mut config = Config::default();
    config.seed.samples_on_first_run = samples;
    config.effect_timeout_secs = 2;
    config
}

fn app_over(backend: Arc<dyn KeyValueStore>, seed: Option<Arc<dyn SeedSource>>) -> TaskMaster {
    TaskMaster::with_parts(&config(false), backend, seed, Arc::new(test_clock()))
}

fn memory_app() -> TaskMaster {
    app_over(Arc::new(MemoryStore::new()), None)
}

#[tokio::test]
async fn first_run_writes_samples_once() {
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(test_clock());

    let first = TaskMaster::with_parts(&config(true), backend.clone(), None, clock.clone());
    let outcome = first.bootstrap().await.unwrap();
    assert!(matches!(outcome, Bootstrap::Samples(3)));

    let second = TaskMaster::with_parts(&config(true), backend, None, clock);
    assert_eq!(second.bootstrap().await.unwrap(), Bootstrap::Loaded(3));
}

#[tokio::test]
async fn samples_can_be_disabled() {
    let app = memory_app();
    assert_eq!(app.bootstrap().await.unwrap(), Bootstrap::Empty);
    assert_eq!(app.stats().await.total, 0);
}

#[tokio::test]
async fn unreadable_data_starts_empty_without_samples() {
    let backend = Arc::new(MemoryStore::new());
    backend.set("taskmaster_tasks", "not json").unwrap();
    let app = TaskMaster::with_parts(&config(true), backend, None, Arc::new(test_clock()));

    assert!(matches!(
        app.bootstrap().await.unwrap(),
        Bootstrap::LoadFailed(_)
    ));
    assert_eq!(app.stats().await.total, 0);
}

#[tokio::test]
async fn add_trims_and_assigns_id() {
    let app = memory_app();
    let task = app
        .add(TaskDraft::new("  Buy milk  ").with_priority(Priority::Low))
        .await
        .unwrap();

    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.id.value() > 0);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_store() {
    let app = memory_app();

    assert!(matches!(
        app.add(TaskDraft::new("   ")).await,
        Err(AppError::Validation(ValidationError::EmptyTitle))
    ));
    assert!(matches!(
        app.add(TaskDraft::new("ab")).await,
        Err(AppError::Validation(ValidationError::TitleTooShort { min: 3 }))
    ));
    assert_eq!(app.stats().await.total, 0);
    assert_eq!(app.persistence_status().await, PersistenceStatus::Unsaved);
}

#[tokio::test]
async fn edit_applies_patch_and_rejects_unknown_ids() {
    let app = memory_app();
    let task = app.add(TaskDraft::new("Draft report")).await.unwrap();

    let patch = TaskPatch {
        title: Some("Final report".to_string()),
        priority: Some(Priority::High),
        status: Some(TaskStatus::Completed),
        ..TaskPatch::default()
    };
    let edited = app.edit(task.id, patch).await.unwrap();
    assert_eq!(edited.title, "Final report");
    assert_eq!(edited.priority, Priority::High);
    assert!(edited.completed_at.is_some());
    assert_eq!(edited.created_at, task.created_at);

    let missing = TaskId::new(1);
    let patch = TaskPatch {
        title: Some("Nobody".to_string()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        app.edit(missing, patch).await,
        Err(AppError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        app.edit(task.id, TaskPatch::default()).await,
        Err(AppError::Validation(ValidationError::EmptyPatch))
    ));
}

#[tokio::test]
async fn toggle_delete_and_clear_completed() {
    let app = memory_app();
    let keep = app.add(TaskDraft::new("Keep me")).await.unwrap();
    let finish = app.add(TaskDraft::new("Finish me")).await.unwrap();
    let remove = app.add(TaskDraft::new("Remove me")).await.unwrap();

    assert!(app.toggle(finish.id).await.unwrap().is_completed());
    assert_eq!(app.delete(remove.id).await.unwrap().id, remove.id);
    assert!(matches!(
        app.delete(remove.id).await,
        Err(AppError::NotFound(_))
    ));

    assert_eq!(app.clear_completed().await.unwrap(), 1);
    let view = app.list(FilterConfig::default(), SortBy::Date).await.unwrap();
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].id, keep.id);
}

#[tokio::test]
async fn list_applies_filters_and_sort() {
    let app = memory_app();
    app.add(TaskDraft::new("low chore").with_priority(Priority::Low))
        .await
        .unwrap();
    app.add(TaskDraft::new("High stakes").with_priority(Priority::High))
        .await
        .unwrap();
    let done = app
        .add(TaskDraft::new("high and done").with_priority(Priority::High))
        .await
        .unwrap();
    app.toggle(done.id).await.unwrap();

    let view = app
        .list(
            FilterConfig {
                status: StatusFilter::Pending,
                priority: PriorityFilter::All,
                search: String::new(),
            },
            SortBy::Priority,
        )
        .await
        .unwrap();
    let titles: Vec<&str> = view.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["High stakes", "low chore"]);
    assert_eq!(view.stats.total, 3);

    let view = app
        .list(
            FilterConfig {
                search: "HIGH".to_string(),
                ..FilterConfig::default()
            },
            SortBy::Title,
        )
        .await
        .unwrap();
    let titles: Vec<&str> = view.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["high and done", "High stakes"]);
}

#[tokio::test]
async fn save_failure_is_reported_but_change_kept() {
    let app = app_over(Arc::new(FailingStore::writes()), None);
    let task = app.add(TaskDraft::new("Unsaved work")).await.unwrap();

    assert!(app.persistence_status().await.is_failed());
    assert_eq!(app.toggle(task.id).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn seed_reports_added_count() {
    let source: Arc<dyn SeedSource> = Arc::new(StubSeedSource::ok(remote_todos(500, 4)));
    let app = app_over(Arc::new(MemoryStore::new()), Some(source));

    assert_eq!(app.seed().await.unwrap(), 4);
    assert_eq!(app.stats().await.total, 4);
}

#[tokio::test]
async fn seed_after_samples_imports_every_todo_without_reusing_ids() {
    let source: Arc<dyn SeedSource> = Arc::new(StubSeedSource::ok(remote_todos(1, 5)));
    let app = TaskMaster::with_parts(
        &config(true),
        Arc::new(MemoryStore::new()),
        Some(source),
        Arc::new(test_clock()),
    );
    assert_eq!(app.bootstrap().await.unwrap(), Bootstrap::Samples(3));

    let sample_ids: Vec<TaskId> = app
        .store()
        .state(|s| s.tasks.iter().map(|t| t.id).collect())
        .await;
    let deleted = app.delete(sample_ids[0]).await.unwrap();

    assert_eq!(app.seed().await.unwrap(), 5);

    let tasks = app.store().state(|s| s.tasks.clone()).await;
    assert_eq!(tasks.len(), 7);
    assert!(tasks.iter().all(|t| t.id != deleted.id));
    let ids: std::collections::HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 7);
    for id in &sample_ids[1..] {
        assert!(ids.contains(id));
    }
}

#[tokio::test]
async fn seed_failure_is_an_error() {
    let source: Arc<dyn SeedSource> =
        Arc::new(StubSeedSource::failing(SeedError::Request("offline".to_string())));
    let app = app_over(Arc::new(MemoryStore::new()), Some(source));

    assert!(matches!(app.seed().await, Err(AppError::SeedFailed(_))));
}

#[tokio::test]
async fn slow_seed_times_out_and_is_cancelled() {
    let source: Arc<dyn SeedSource> = Arc::new(
        StubSeedSource::ok(remote_todos(1, 2)).with_delay(Duration::from_secs(30)),
    );
    let mut config = config(false);
    config.effect_timeout_secs = 0;
    let app = TaskMaster::with_parts(
        &config,
        Arc::new(MemoryStore::new()),
        Some(source),
        Arc::new(test_clock()),
    );

    assert!(matches!(app.seed().await, Err(AppError::SeedTimeout(_))));
    let seed = app.store().state(|s| s.seed.clone()).await;
    assert_eq!(seed, taskmaster_core::types::SeedStatus::Idle);
}

#[tokio::test]
async fn seed_without_source_fails() {
    let app = memory_app();
    assert!(matches!(app.seed().await, Err(AppError::SeedFailed(_))));
}

#[tokio::test]
async fn reset_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileStore::new(dir.path()));
    let app = app_over(backend.clone(), None);
    app.add(TaskDraft::new("On disk")).await.unwrap();
    assert!(dir.path().join("taskmaster_tasks.json").exists());

    app.reset().await.unwrap();

    assert!(!dir.path().join("taskmaster_tasks.json").exists());
    let repo = TaskRepository::new(backend, "taskmaster_tasks");
    assert_eq!(repo.load().unwrap(), None);
}
