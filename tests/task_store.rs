use chrono::{Duration, TimeZone, Utc};

use spotify_downloader::task::{SubTask, Task, TaskError, TaskStatus, TaskStore};

fn downloading_task(id: &str, total: usize) -> Task {
    let mut task = Task::single(id, total, "https://open.spotify.com/album/abc");
    task.advance(TaskStatus::Downloading).unwrap();
    task
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let store = TaskStore::new();
    assert!(store.get("never-issued").await.is_none());
    assert!(store.mutate("never-issued", |task| task.total()).await.is_none());
}

#[tokio::test]
async fn test_duplicate_task_id_is_rejected() {
    let store = TaskStore::new();
    store.create(Task::single("t1", 1, "url")).unwrap();
    let err = store.create(Task::single("t1", 2, "url")).unwrap_err();
    assert_eq!(err, TaskError::AlreadyExists("t1".to_string()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_status_transitions_are_forward_only() {
    let mut task = Task::single("t", 2, "url");
    assert_eq!(task.status(), TaskStatus::Preparing);

    // 不能从 preparing 直接完成
    assert!(task.complete(Utc::now()).is_err());
    task.advance(TaskStatus::Downloading).unwrap();
    assert!(task.advance(TaskStatus::Processing).is_err());
    assert!(task.advance(TaskStatus::Preparing).is_err());

    task.complete(Utc::now()).unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.completed(), 2);

    // 终止状态不可再修改
    assert_eq!(
        task.fail("late", Utc::now()).unwrap_err(),
        TaskError::Terminal(TaskStatus::Completed)
    );
    assert!(task.increment_completed().is_err());
    assert!(task.snapshot().error.is_none());
}

#[test]
fn test_completed_never_exceeds_total() {
    let mut task = downloading_task("t", 2);
    for _ in 0..5 {
        task.increment_completed().unwrap();
        assert!(task.completed() <= task.total());
    }
    assert_eq!(task.completed(), 2);
    assert_eq!(task.progress_percent(), 100);
}

#[test]
fn test_progress_percent_floors() {
    let mut task = downloading_task("t", 3);
    assert_eq!(task.progress_percent(), 0);
    task.increment_completed().unwrap();
    assert_eq!(task.progress_percent(), 33);
    task.increment_completed().unwrap();
    assert_eq!(task.progress_percent(), 66);

    let empty = Task::batch("b", "url");
    assert_eq!(empty.progress_percent(), 0);
}

#[test]
fn test_batch_total_fixed_once() {
    let mut task = Task::batch("b", "a\nb");
    assert!(task.is_batch());
    assert_eq!(task.status(), TaskStatus::Processing);

    task.push_sub_task(SubTask {
        url: "a".to_string(),
        output_dir: "out/a".into(),
        total: 4,
        not_found: 1,
        error: None,
    })
    .unwrap();
    task.fix_total(4).unwrap();
    assert_eq!(task.fix_total(5).unwrap_err(), TaskError::TotalAlreadyFixed);
    assert_eq!(task.total(), 4);
    assert_eq!(task.snapshot().sub_tasks.map(|s| s.len()), Some(1));
}

#[test]
fn test_output_dir_assigned_once() {
    let mut task = Task::single("t", 1, "url");
    task.set_output_dir("music").unwrap();
    task.set_output_dir("music").unwrap();
    assert_eq!(
        task.set_output_dir("other").unwrap_err(),
        TaskError::OutputDirAlreadySet
    );
}

#[test]
fn test_fail_records_message_and_time() {
    let mut task = Task::batch("b", "url");
    let now = Utc::now();
    task.fail("boom", now).unwrap();

    let snapshot = task.snapshot();
    assert_eq!(snapshot.status, TaskStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some("boom"));
    assert_eq!(snapshot.completion_time, Some(now));
}

#[tokio::test]
async fn test_sweep_removes_only_expired_terminal_tasks() {
    let store = TaskStore::new();
    let finished_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let mut done = downloading_task("done", 1);
    done.complete(finished_at).unwrap();
    store.create(done).unwrap();
    store.create(downloading_task("running", 3)).unwrap();

    let before = store.get("done").await.unwrap();

    // T + 30 分钟：仍然存在，内容不变
    let removed = store
        .sweep(finished_at + Duration::minutes(30), Duration::hours(1))
        .await;
    assert_eq!(removed, 0);
    assert_eq!(store.get("done").await, Some(before));

    // T + 2 小时：已清理；进行中的任务不受影响
    let removed = store
        .sweep(finished_at + Duration::hours(2), Duration::hours(1))
        .await;
    assert_eq!(removed, 1);
    assert!(!store.contains("done"));
    assert!(store.get("done").await.is_none());
    assert!(store.contains("running"));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_mutate_is_the_single_update_path() {
    let store = TaskStore::new();
    store.create(downloading_task("t", 10)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.mutate("t", |task| task.increment_completed()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = store.get("t").await.unwrap();
    assert_eq!(snapshot.completed, 10);
    assert_eq!(snapshot.total, 10);
}
