/*!
 * Process-Wide Runtime Tests
 * The global instance is shared by every test in this binary
 */

use app_runtime::{RuntimeConfig, RuntimeError};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn init() -> &'static app_runtime::ProcessRuntime {
    app_runtime::try_initialize_with(
        RuntimeConfig::with_core_workers(2).with_signal_handling(false),
    )
    .unwrap()
}

#[test]
#[serial]
fn test_initialize_is_idempotent() {
    let first = init();
    for _ in 0..10 {
        let again = app_runtime::initialize();
        assert!(std::ptr::eq(first, again));
    }
    assert!(std::ptr::eq(first, app_runtime::runtime().unwrap()));
    // The first configuration wins
    assert_eq!(app_runtime::initialize().config().core_workers, 2);
}

#[test]
#[serial]
fn test_concurrent_initialize_yields_one_instance() {
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| init() as *const _ as usize))
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
}

#[test]
#[serial]
fn test_second_initialize_keeps_state() {
    let rt = init();
    let before = rt.stats().submitted;

    let (tx, rx) = mpsc::channel();
    app_runtime::schedule_task(move || tx.send(()).unwrap());
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    app_runtime::initialize();
    assert_eq!(app_runtime::runtime().unwrap().stats().submitted, before + 1);
}

#[test]
#[serial]
fn test_global_schedule_and_release() {
    init();
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        let done = done.clone();
        app_runtime::schedule_task(move || {
            if done.fetch_add(1, Ordering::SeqCst) + 1 == 50 {
                app_runtime::release();
            }
        });
    }

    assert_eq!(
        app_runtime::runtime()
            .unwrap()
            .wait_timeout(Duration::from_secs(10)),
        Ok(())
    );
    assert_eq!(done.load(Ordering::SeqCst), 50);
}

#[test]
#[serial]
fn test_try_schedule_accepts_after_init() {
    init();
    let result: Result<(), RuntimeError> = app_runtime::try_schedule_task(|| {});
    assert_eq!(result, Ok(()));
}
