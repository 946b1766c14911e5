use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use solver::{BuildStatus, Manager, SolveStatus, TaskStatus, VertexLog, VertexUpdate};

fn vtx(digest: &str, name: &str) -> VertexUpdate {
    VertexUpdate {
        digest: digest.to_string(),
        name: name.to_string(),
        cached: false,
        started: None,
        completed: None,
        error: String::new(),
    }
}

#[test]
fn statuses_fold_into_tasks() {
    let mut manager = Manager::new();
    let job = manager.new_job("build");
    let tx = job.new_channel();

    let t0 = SystemTime::now();
    manager.go(move || {
        let mut started = vtx("sha256:aaa", "docker-image://alpine");
        started.started = Some(t0);
        tx.send(SolveStatus {
            vertexes: vec![started.clone()],
            ..SolveStatus::default()
        })?;

        tx.send(SolveStatus {
            logs: vec![VertexLog {
                vertex: "sha256:aaa".to_string(),
                stream: 1,
                data: b"pulling...\n".to_vec(),
                timestamp: t0,
            }],
            ..SolveStatus::default()
        })?;

        let mut completed = started;
        completed.completed = Some(t0 + Duration::from_millis(10));
        tx.send(SolveStatus {
            vertexes: vec![completed],
            ..SolveStatus::default()
        })?;
        Ok(())
    });

    manager.release();
    manager.wait().unwrap();

    assert_eq!(manager.status(), BuildStatus::Finished);
    assert_eq!(manager.current(), 1);
    assert_eq!(manager.total(), 1);

    let task = manager.task("sha256:aaa").unwrap();
    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(task.description(), "docker-image://alpine");
    assert!(task.has_logs());
    assert_eq!(task.logs(), b"pulling...\n");
    assert!(task.elapsed() >= Duration::from_millis(10));
}

#[test]
fn current_never_exceeds_total() {
    let mut manager = Manager::new();
    let job = manager.new_job("build");
    let tx = job.new_channel();

    let t0 = SystemTime::now();
    manager.go(move || {
        let mut a = vtx("sha256:aaa", "a");
        a.started = Some(t0);
        let b = vtx("sha256:bbb", "b");
        tx.send(SolveStatus {
            vertexes: vec![a.clone(), b],
            ..SolveStatus::default()
        })?;

        a.completed = Some(t0);
        tx.send(SolveStatus {
            vertexes: vec![a],
            ..SolveStatus::default()
        })?;
        Ok(())
    });

    manager.release();
    manager.wait().unwrap();

    assert!(manager.current() <= manager.total());
    assert_eq!(manager.current(), 1);
    assert_eq!(manager.total(), 2);
}

#[test]
fn cached_and_errored_vertices_set_task_state() {
    let mut manager = Manager::new();
    let job = manager.new_job("build");
    let tx = job.new_channel();

    let t0 = SystemTime::now();
    manager.go(move || {
        let mut cached = vtx("sha256:ccc", "cached");
        cached.started = Some(t0);
        cached.cached = true;
        cached.completed = Some(t0);

        let mut failed = vtx("sha256:ddd", "failed");
        failed.started = Some(t0);
        failed.completed = Some(t0);
        failed.error = "exit code 1".to_string();

        let mut canceled = vtx("sha256:eee", "canceled");
        canceled.started = Some(t0);
        canceled.completed = Some(t0);
        canceled.error = "context canceled".to_string();

        tx.send(SolveStatus {
            vertexes: vec![cached, failed, canceled],
            ..SolveStatus::default()
        })?;
        Ok(())
    });

    manager.release();
    manager.wait().unwrap();

    assert_eq!(manager.task("sha256:ccc").unwrap().status(), TaskStatus::Cached);
    assert_eq!(manager.task("sha256:ddd").unwrap().status(), TaskStatus::Errored);
    assert_eq!(manager.task("sha256:eee").unwrap().status(), TaskStatus::Canceled);

    // errored vertices do not count toward current
    assert_eq!(manager.current(), 1);
}

#[test]
fn duplicate_started_updates_are_idempotent() {
    let mut manager = Manager::new();
    let job = manager.new_job("build");
    let tx = job.new_channel();

    let t0 = SystemTime::now();
    manager.go(move || {
        let mut a = vtx("sha256:aaa", "a");
        a.started = Some(t0);
        tx.send(SolveStatus {
            vertexes: vec![a.clone()],
            ..SolveStatus::default()
        })?;
        // the solver may repeat a started vertex; the task must not
        // double-start
        tx.send(SolveStatus {
            vertexes: vec![a],
            ..SolveStatus::default()
        })?;
        Ok(())
    });

    manager.release();
    manager.wait().unwrap();
    assert_eq!(manager.status(), BuildStatus::Finished);
    assert_eq!(manager.task("sha256:aaa").unwrap().status(), TaskStatus::Running);
}

#[test]
fn job_status_is_the_least_advanced_task() {
    let mut manager = Manager::new();
    let job = manager.new_job("build");
    assert_eq!(job.status(), TaskStatus::Created);

    let tx = job.new_channel();
    let inner_job = job.clone();
    let t0 = SystemTime::now();
    manager.go(move || {
        let mut a = vtx("sha256:aaa", "a");
        a.started = Some(t0);
        a.completed = Some(t0);
        let mut b = vtx("sha256:bbb", "b");
        b.started = Some(t0);
        tx.send(SolveStatus {
            vertexes: vec![a, b],
            ..SolveStatus::default()
        })?;
        Ok(())
    });

    manager.release();
    manager.wait().unwrap();

    assert!(inner_job.depends("sha256:aaa"));
    assert_eq!(inner_job.status(), TaskStatus::Running);
}
