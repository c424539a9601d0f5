/*!
 * Worker Pool Tests
 * Liveness, concurrency bounds, elasticity and shutdown behaviour
 */

use app_runtime::{RuntimeConfig, RuntimeError, WorkerPool};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn pool(core: usize, max: usize) -> WorkerPool {
    WorkerPool::new(
        RuntimeConfig::with_core_workers(core)
            .with_max_workers(max)
            .with_signal_handling(false),
    )
    .unwrap()
}

/// Poll `condition` until it holds or `timeout` passes
fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_every_scheduled_task_completes() {
    const TASKS: usize = 10_000;
    let pool = pool(2, 8);
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..TASKS {
        let done = done.clone();
        pool.execute(move || {
            done.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(30)));
    assert_eq!(done.load(Ordering::Relaxed), TASKS);

    let stats = pool.stats();
    assert_eq!(stats.submitted, TASKS as u64);
    assert_eq!(stats.completed, TASKS as u64);
    assert_eq!(stats.queued_tasks, 0);
}

#[test]
fn test_concurrency_bounded_by_max_workers() {
    let pool = pool(2, 8);
    let go = Arc::new(AtomicBool::new(false));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..32 {
        let go = go.clone();
        let running = running.clone();
        let peak = peak.clone();
        pool.execute(move || {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            while !go.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            running.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    // Pool grows to its maximum while work is queued
    assert!(eventually(Duration::from_secs(5), || {
        running.load(Ordering::SeqCst) == 8
    }));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(running.load(Ordering::SeqCst), 8);

    let stats = pool.stats();
    assert_eq!(stats.live_workers, 8);
    assert_eq!(stats.queued_tasks, 24);

    go.store(true, Ordering::SeqCst);
    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(10)));

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 8, "peak concurrency {} exceeded max", peak);
    assert!(peak >= 2, "peak concurrency {} below core", peak);
    assert!(pool.stats().peak_active_tasks <= 8);
}

#[test]
fn test_excess_workers_retire_after_keep_alive() {
    let pool = WorkerPool::new(
        RuntimeConfig::with_core_workers(1)
            .with_max_workers(4)
            .with_keep_alive(Duration::from_millis(50))
            .with_signal_handling(false),
    )
    .unwrap();
    let go = Arc::new(AtomicBool::new(false));

    for _ in 0..8 {
        let go = go.clone();
        pool.execute(move || {
            while !go.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    }

    assert!(eventually(Duration::from_secs(5), || {
        pool.stats().live_workers == 4
    }));

    go.store(true, Ordering::SeqCst);

    // Back to the core size once idle past keep-alive
    assert!(eventually(Duration::from_secs(5), || {
        pool.stats().live_workers == 1
    }));
    assert_eq!(pool.stats().completed, 8);
}

#[test]
fn test_single_worker_runs_in_submission_order() {
    let pool = pool(1, 1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let order = order.clone();
        pool.execute(move || order.lock().push(i)).unwrap();
    }

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
    assert_eq!(*order.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_panicking_task_does_not_kill_pool() {
    let pool = pool(1, 1);
    let after = Arc::new(AtomicBool::new(false));

    pool.execute(|| panic!("task failure stays inside the task")).unwrap();
    let after_clone = after.clone();
    pool.execute(move || after_clone.store(true, Ordering::SeqCst))
        .unwrap();

    assert!(eventually(Duration::from_secs(5), || {
        after.load(Ordering::SeqCst)
    }));
    let stats = pool.stats();
    assert_eq!(stats.panicked, 1);
    assert_eq!(stats.live_workers, 1);
}

#[test]
fn test_submission_after_shutdown_is_rejected() {
    let pool = pool(1, 1);
    pool.shutdown();
    pool.shutdown();

    assert!(pool.is_shutdown());
    assert_eq!(pool.execute(|| {}), Err(RuntimeError::Rejected));
    assert_eq!(pool.stats().rejected, 1);
    assert_eq!(pool.stats().submitted, 0);
}

#[test]
fn test_shutdown_drains_queued_tasks() {
    let pool = pool(1, 1);
    let go = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicUsize::new(0));

    let gate = go.clone();
    pool.execute(move || {
        while !gate.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    })
    .unwrap();
    for _ in 0..10 {
        let done = done.clone();
        pool.execute(move || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown();
    assert!(!pool.is_terminated());
    assert!(!pool.await_termination(Duration::from_millis(20)));

    go.store(true, Ordering::SeqCst);
    assert!(pool.await_termination(Duration::from_secs(5)));
    assert!(pool.is_terminated());
    assert_eq!(done.load(Ordering::SeqCst), 10);
}

#[test]
fn test_await_termination_requires_shutdown() {
    let pool = pool(1, 2);
    assert!(!pool.await_termination(Duration::from_millis(10)));
    assert!(!pool.is_terminated());
}

#[test]
fn test_submit_never_blocks_on_busy_pool() {
    let pool = pool(1, 1);
    let go = Arc::new(AtomicBool::new(false));

    let gate = go.clone();
    pool.execute(move || {
        while !gate.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    })
    .unwrap();

    let start = Instant::now();
    for _ in 0..1_000 {
        pool.execute(|| {}).unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(pool.stats().queued_tasks > 0);

    go.store(true, Ordering::SeqCst);
    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
}

#[test]
fn test_zero_keep_alive_keeps_core_and_retires_extras() {
    let pool = WorkerPool::new(
        RuntimeConfig::with_core_workers(1)
            .with_max_workers(4)
            .with_keep_alive(Duration::ZERO)
            .with_signal_handling(false),
    )
    .unwrap();
    let go = Arc::new(AtomicBool::new(false));

    for _ in 0..8 {
        let go = go.clone();
        pool.execute(move || {
            while !go.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    }
    assert!(eventually(Duration::from_secs(5), || {
        pool.stats().live_workers == 4
    }));
    go.store(true, Ordering::SeqCst);

    assert!(eventually(Duration::from_secs(5), || {
        let stats = pool.stats();
        stats.completed == 8 && stats.live_workers == 1
    }));

    // The core worker stays parked and still serves new work
    thread::sleep(Duration::from_millis(50));
    let stats = pool.stats();
    assert_eq!(stats.live_workers, 1);
    assert_eq!(stats.idle_workers, 1);

    let done = Arc::new(AtomicBool::new(false));
    let done_clone = done.clone();
    pool.execute(move || done_clone.store(true, Ordering::SeqCst))
        .unwrap();
    assert!(eventually(Duration::from_secs(5), || {
        done.load(Ordering::SeqCst)
    }));
}

#[test]
fn test_core_worker_outlives_keep_alive() {
    let pool = WorkerPool::new(
        RuntimeConfig::with_core_workers(2)
            .with_keep_alive(Duration::from_millis(10))
            .with_signal_handling(false),
    )
    .unwrap();

    for _ in 0..2 {
        pool.execute(|| {}).unwrap();
    }
    assert!(eventually(Duration::from_secs(5), || {
        pool.stats().completed == 2
    }));

    thread::sleep(Duration::from_millis(100));
    assert_eq!(pool.stats().live_workers, 2);
}

#[test]
fn test_oversized_keep_alive_is_refused() {
    let result = WorkerPool::new(
        RuntimeConfig::with_core_workers(1)
            .with_keep_alive(Duration::from_secs(u64::MAX))
            .with_signal_handling(false),
    );
    assert!(matches!(result, Err(RuntimeError::InvalidConfig(_))));
}
