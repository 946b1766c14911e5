use std::time::{Duration, SystemTime};

use solver::{Task, TaskOutcome, TaskStatus};

#[test]
fn tasks_advance_from_created_through_completion() {
    let task = Task::new("sha256:aaa");
    assert_eq!(task.status(), TaskStatus::Created);

    let t0 = SystemTime::now();
    task.start(t0).unwrap();
    assert_eq!(task.status(), TaskStatus::Running);

    task.complete(t0 + Duration::from_secs(1), TaskOutcome::Success);
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.elapsed(), Duration::from_secs(1));
}

#[test]
fn starting_twice_is_an_error() {
    let task = Task::new("sha256:aaa");
    task.start(SystemTime::now()).unwrap();
    assert!(task.start(SystemTime::now()).is_err());
}

#[test]
fn log_chunks_append() {
    let task = Task::new("sha256:aaa");
    assert!(!task.has_logs());
    task.write(b"hello ");
    task.write(b"world");
    assert!(task.has_logs());
    assert_eq!(task.logs(), b"hello world");
}

#[test]
fn progress_rows_update_counters() {
    let task = Task::new("sha256:aaa");
    task.set_progress(3, 10);
    assert_eq!(task.progress(), (3, 10));
}

#[test]
fn outcomes_map_to_statuses() {
    for (outcome, status) in [
        (TaskOutcome::Success, TaskStatus::Completed),
        (TaskOutcome::Cached, TaskStatus::Cached),
        (TaskOutcome::Canceled, TaskStatus::Canceled),
        (TaskOutcome::Error, TaskStatus::Errored),
    ] {
        let task = Task::new("sha256:aaa");
        task.start(SystemTime::now()).unwrap();
        task.complete(SystemTime::now(), outcome);
        assert_eq!(task.status(), status);
    }
}
