//! Integration tests for the file-backed key-value store

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use std::sync::Arc;
use taskmaster_core::types::{Priority, TaskAction, TaskDraft, TaskState};
use taskmaster_core::reducer::TaskReducer;
use taskmaster_runtime::persistence::{FileStore, KeyValueStore, TaskRepository};
use taskmaster_runtime::Store;
use taskmaster_testing::helpers::{completed_task, task};
use taskmaster_testing::test_environment;

#[test]
fn missing_file_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    assert_eq!(store.get("taskmaster_tasks").unwrap(), None);
}

#[test]
fn creates_directory_and_round_trips_value() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("data").join("tasks");
    let store = FileStore::new(&nested);

    store.set("taskmaster_tasks", "[]").unwrap();

    assert!(nested.join("taskmaster_tasks.json").is_file());
    assert!(!nested.join("taskmaster_tasks.json.tmp").exists());
    assert_eq!(store.get("taskmaster_tasks").unwrap().as_deref(), Some("[]"));
}

#[test]
fn remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.set("slot", "value").unwrap();

    store.remove("slot").unwrap();
    store.remove("slot").unwrap();

    assert_eq!(store.get("slot").unwrap(), None);
}

#[test]
fn repository_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let tasks = vec![
        task(1, "Pending one", Priority::High),
        completed_task(2, "Done one", Priority::Low),
    ];

    TaskRepository::new(Arc::new(FileStore::new(dir.path())), "taskmaster_tasks")
        .save(&tasks)
        .unwrap();
    let reopened = TaskRepository::new(Arc::new(FileStore::new(dir.path())), "taskmaster_tasks");

    assert_eq!(reopened.load().unwrap(), Some(tasks));
}

#[test]
fn saved_file_uses_camel_case_and_null_for_absent_values() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileStore::new(dir.path()));
    TaskRepository::new(backend.clone(), "taskmaster_tasks")
        .save(&[task(1, "Plain", Priority::Medium)])
        .unwrap();

    let raw = backend.get("taskmaster_tasks").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &json["tasks"][0];
    assert_eq!(record["priority"], "medium");
    assert_eq!(record["status"], "pending");
    assert!(record["dueDate"].is_null());
    assert!(record["completedAt"].is_null());
    assert!(record["createdAt"].is_string());
}

#[tokio::test]
async fn store_over_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let open = || {
        Store::new(TaskState::new(), TaskReducer::new(), test_environment()).with_repository(
            TaskRepository::new(Arc::new(FileStore::new(dir.path())), "taskmaster_tasks"),
        )
    };

    let first = open();
    let _ = first
        .send(TaskAction::Add {
            draft: TaskDraft::new("Written to disk"),
        })
        .await
        .unwrap();

    let second = open();
    assert_eq!(second.load_from_repository().await.unwrap(), Some(1));
    let title = second.state(|s| s.tasks[0].title.clone()).await;
    assert_eq!(title, "Written to disk");
}
