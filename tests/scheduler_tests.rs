//! Integration tests for the work-stealing scheduler core.
//!
//! Completions are delivered by hand through the [`common::Driver`], so every
//! scenario here is deterministic.

mod common;

use common::Driver;
use pretty_assertions::assert_eq;
use worksteal::scheduler::{Scheduler, TaskId, WorkerStatus};
use worksteal::Error;

// ============================================================================
// Admission and Stealing
// ============================================================================

#[test]
fn test_three_tasks_on_idle_pool_spread_by_stealing() {
    let mut driver = Driver::new(4);

    let first = driver.add(0, 1000);
    let second = driver.add(0, 1000);
    let third = driver.add(0, 1000);

    // Worker 0 took its own task; workers 1 and 2 each stole one.
    assert_eq!(driver.running_id(0), Some(first));
    assert_eq!(driver.running_id(1), Some(second));
    assert_eq!(driver.running_id(2), Some(third));
    assert_eq!(driver.running_id(3), None);

    let stats = driver.scheduler.stats();
    assert_eq!(stats.tasks_stolen, 2);
    assert_eq!(stats.stolen_per_worker, vec![0, 1, 1, 0]);
    assert_eq!(stats.queue_sizes, vec![0, 0, 0, 0]);
    assert!(driver.running(1).unwrap().is_stolen());
    assert_eq!(driver.running(1).unwrap().origin_worker(), 0);

    driver.run_to_quiescence();

    let stats = driver.scheduler.stats();
    assert_eq!(stats.tasks_completed, 3);
    assert_eq!(stats.busy_workers, 0);
    assert_eq!(stats.queued(), 0);
    assert!(stats.is_conserved());
    assert!(driver.scheduler.is_quiescent());
    for worker in driver.scheduler.workers() {
        assert_eq!(worker.status(), WorkerStatus::Idle);
        assert!(worker.deque().is_empty());
    }
}

#[test]
fn test_owner_runs_unstolen_tasks_in_admission_order() {
    let mut driver = Driver::new(2);

    driver.add(0, 10);
    driver.add(0, 10); // stolen by worker 1
    let rest: Vec<TaskId> = (0..3).map(|_| driver.add(0, 10)).collect();
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![3, 0]);

    driver.complete(1);
    driver.run_to_quiescence();

    let own: Vec<TaskId> = driver
        .dispatched
        .iter()
        .filter(|(worker, task)| *worker == 0 && !task.is_stolen())
        .map(|(_, task)| task.id())
        .collect();
    let mut sorted = own.clone();
    sorted.sort();
    assert_eq!(own, sorted);

    // Worker 1 always steals from the back.
    let stolen: Vec<TaskId> = driver
        .dispatched
        .iter()
        .filter(|(_, task)| task.is_stolen())
        .map(|(_, task)| task.id())
        .collect();
    assert!(stolen.contains(&rest[2]));
    assert!(!stolen.contains(&rest[0]));

    driver.dispatched_ids();
    assert!(driver.scheduler.stats().is_conserved());
}

#[test]
fn test_steals_follow_longest_queue_then_lowest_id() {
    let mut driver = Driver::new(4);
    for worker in 0..4 {
        driver.assign(worker, 1);
    }

    for _ in 0..3 {
        driver.add(0, 1);
    }
    let on_two: Vec<TaskId> = (0..5).map(|_| driver.add(2, 1)).collect();
    driver.add(3, 1);
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![3, 0, 5, 1]);

    driver.complete(1);
    assert_eq!(driver.running_id(1), Some(on_two[4]));
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![3, 0, 4, 1]);

    driver.complete(1);
    assert_eq!(driver.running_id(1), Some(on_two[3]));
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![3, 0, 3, 1]);

    // Tie between workers 0 and 2
    driver.complete(1);
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![2, 0, 3, 1]);
    assert_eq!(driver.running(1).unwrap().origin_worker(), 0);
}

#[test]
fn test_assign_keeps_task_on_idle_target() {
    let mut driver = Driver::new(3);

    let id = driver.assign(2, 50);
    assert_eq!(driver.running_id(2), Some(id));
    assert!(!driver.running(2).unwrap().is_stolen());
    assert_eq!(driver.running_id(0), None);

    // The same admission through add_task is claimed by the lowest idle worker.
    let id = driver.add(1, 50);
    assert_eq!(driver.running_id(0), Some(id));
    assert!(driver.running(0).unwrap().is_stolen());
}

#[test]
fn test_busy_pool_queues_without_dispatch() {
    let mut driver = Driver::new(2);
    driver.assign(0, 1);
    driver.assign(1, 1);

    let before = driver.dispatched.len();
    driver.add(1, 30);
    driver.add(1, 12);
    assert_eq!(driver.dispatched.len(), before);
    assert_eq!(driver.scheduler.stats().queue_sizes, vec![0, 2]);
    assert_eq!(driver.scheduler.stats().busy_workers, 2);

    let snapshot = driver.scheduler.snapshot();
    assert_eq!(snapshot[0].queued_cost, 0);
    assert_eq!(snapshot[1].queued_cost, 42);

    // Worker 0 steals the newest task; its cost leaves worker 1's total.
    driver.complete(0);
    assert_eq!(driver.scheduler.snapshot()[1].queued_cost, 30);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_add_task_to_unknown_worker_changes_nothing() {
    let mut driver = Driver::new(4);
    driver.add(0, 1);

    let err = driver.scheduler.add_task(99, 500).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidWorkerId {
            worker_id: 99,
            pool_size: 4
        }
    ));
    assert!(err.is_caller_error());

    let stats = driver.scheduler.stats();
    assert_eq!(stats.tasks_added, 1);
    assert_eq!(stats.queue_sizes, vec![0, 0, 0, 0]);

    // No id was consumed by the failed call.
    assert_eq!(driver.add(0, 1), TaskId::new(2));
}

#[test]
fn test_assign_to_unknown_worker_is_rejected() {
    let (scheduler, _mailboxes) = Scheduler::new(2).unwrap();
    assert!(matches!(
        scheduler.assign_task(2, 1),
        Err(Error::InvalidWorkerId { worker_id: 2, .. })
    ));
}

#[test]
fn test_empty_pool_is_rejected() {
    assert!(matches!(Scheduler::new(0), Err(Error::EmptyPool)));
}

#[test]
fn test_stale_completion_is_rejected() {
    let mut driver = Driver::new(2);
    let id = driver.add(0, 1);
    driver.complete(0);

    let err = driver.scheduler.complete_task(0, id, true).unwrap_err();
    assert!(matches!(err, Error::UnexpectedCompletion { worker_id: 0, .. }));
    assert_eq!(driver.scheduler.stats().tasks_completed, 1);
}

#[test]
fn test_failed_completion_frees_worker() {
    let mut driver = Driver::new(1);
    let id = driver.add(0, 1);
    driver.add(0, 1);

    assert_eq!(driver.finish(0, false), id);

    let stats = driver.scheduler.stats();
    assert_eq!(stats.tasks_failed, 1);
    assert_eq!(stats.tasks_completed, 1);
    assert_eq!(driver.running_id(0), Some(TaskId::new(2)));
}

// ============================================================================
// Draining
// ============================================================================

#[test]
fn test_drain_queued_counts_toward_quiescence() {
    let mut driver = Driver::new(2);
    for _ in 0..6 {
        driver.add(1, 5);
    }
    assert_eq!(driver.scheduler.stats().queued(), 4);

    let drained = driver.scheduler.drain_queued();
    assert_eq!(drained.len(), 4);
    assert!(!driver.scheduler.is_quiescent());

    driver.run_to_quiescence();
    let stats = driver.scheduler.stats();
    assert_eq!(stats.tasks_completed, 2);
    assert_eq!(stats.tasks_discarded, 4);
    assert!(stats.is_conserved());
    assert!(driver.scheduler.is_quiescent());
}
