/*!
 * Elastic Worker Pool
 *
 * Fire-and-forget task executor bounded to `[core_workers, max_workers]`
 * threads and backed by an unbounded FIFO queue.
 *
 * # Growth
 *
 * Workers are spawned on submission. Below `core_workers` every submission
 * spawns one. Above it, a worker is added only while queued work outnumbers
 * idle workers and fewer than `max_workers` are alive. Workers above the core
 * count retire after sitting idle for `keep_alive`.
 *
 * # Shutdown
 *
 * `shutdown()` drops the only sender. Queued tasks still drain, then every
 * worker sees the channel disconnect and exits. Worker threads are detached:
 * they never keep the process alive on their own.
 */

use super::config::RuntimeConfig;
use super::stats::{AtomicPoolStats, PoolStats};
use crate::core::errors::{RuntimeError, RuntimeResult};
use flume::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Unit of work accepted by the pool
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool handle and its workers
struct Shared {
    config: RuntimeConfig,
    queue: Receiver<Task>,
    stats: AtomicPoolStats,
    /// Live worker count; also the lock `terminated` waits on
    live: Mutex<usize>,
    terminated: Condvar,
    next_worker_id: AtomicUsize,
}

impl Shared {
    fn run(&self, task: Task) {
        self.stats.task_started();
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        if let Err(payload) = &outcome {
            error!(
                panic = %panic_message(&**payload),
                "Scheduled task panicked"
            );
        }
        self.stats.task_finished(outcome.is_err());
    }

    /// Park for the next task
    ///
    /// Workers above the core size wait at most `keep_alive`. Core workers
    /// block until work arrives or the pool shuts down.
    fn next_task(&self) -> Result<Task, RecvTimeoutError> {
        let above_core = *self.live.lock() > self.config.core_workers;
        let deadline = if above_core {
            Instant::now().checked_add(self.config.keep_alive)
        } else {
            None
        };

        let _idle = IdleMark::new(&self.stats);
        match deadline {
            Some(deadline) => self.queue.recv_deadline(deadline),
            None => self
                .queue
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        }
    }

    /// Retire an idle worker if the pool is above its core size
    fn try_retire(&self) -> bool {
        let mut live = self.live.lock();
        if *live > self.config.core_workers {
            *live -= 1;
            true
        } else {
            false
        }
    }

    fn worker_exited(&self) {
        let mut live = self.live.lock();
        *live = live.saturating_sub(1);
        if *live == 0 {
            self.terminated.notify_all();
        }
    }
}

/// Counts a worker as idle while it waits on the queue
struct IdleMark<'a>(&'a AtomicPoolStats);

impl<'a> IdleMark<'a> {
    fn new(stats: &'a AtomicPoolStats) -> Self {
        stats.enter_idle();
        Self(stats)
    }
}

impl Drop for IdleMark<'_> {
    fn drop(&mut self) {
        self.0.leave_idle();
    }
}

/// A worker's place in the live count
///
/// Dropped on every exit path. A worker that dies outside a task hands its
/// place to a replacement so queued tasks keep draining.
struct WorkerSlot {
    shared: Arc<Shared>,
    id: usize,
    /// Already given back through `try_retire`
    retired: bool,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        if self.retired {
            return;
        }
        if thread::panicking() {
            error!(worker = self.id, "Worker died outside a task, replacing it");
            match spawn_worker(&self.shared) {
                Ok(()) => return,
                Err(e) => {
                    let err = RuntimeError::WorkerSpawn(e.to_string());
                    error!(error = %err, "Could not replace worker");
                }
            }
        }
        self.shared.worker_exited();
    }
}

fn worker_loop(shared: Arc<Shared>, id: usize) {
    let mut slot = WorkerSlot {
        shared,
        id,
        retired: false,
    };
    slot.retired = run_worker(&slot.shared, id);
}

/// Returns `true` if the worker retired and already left the live count
fn run_worker(shared: &Shared, id: usize) -> bool {
    debug!(worker = id, "Worker started");
    loop {
        match shared.next_task() {
            Ok(task) => shared.run(task),
            Err(RecvTimeoutError::Timeout) => {
                if shared.try_retire() {
                    debug!(worker = id, "Idle worker retired");
                    return true;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!(worker = id, "Worker exiting after shutdown");
                return false;
            }
        }
    }
}

/// Start a detached worker that takes over an already counted live slot
fn spawn_worker(shared: &Arc<Shared>) -> std::io::Result<()> {
    let shared = Arc::clone(shared);
    let id = shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{}", shared.config.thread_name_prefix, id);

    // Dropping the JoinHandle detaches the worker
    thread::Builder::new()
        .name(name)
        .spawn(move || worker_loop(shared, id))
        .map(|_| ())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Bounded, elastic pool of detached worker threads
pub struct WorkerPool {
    shared: Arc<Shared>,
    /// `None` once shut down. Held for reading across submission so a
    /// concurrent shutdown cannot strand a task.
    sender: RwLock<Option<Sender<Task>>>,
}

impl WorkerPool {
    /// Create a pool. No threads are started until work arrives.
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        config.validate()?;
        let (sender, queue) = flume::unbounded();

        info!(
            core_workers = config.core_workers,
            max_workers = config.max_workers,
            keep_alive_ms = config.keep_alive.as_millis() as u64,
            "Worker pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                queue,
                stats: AtomicPoolStats::default(),
                live: Mutex::new(0),
                terminated: Condvar::new(),
                next_worker_id: AtomicUsize::new(0),
            }),
            sender: RwLock::new(Some(sender)),
        })
    }

    /// Queue a task for asynchronous execution
    ///
    /// Never blocks. Fails with [`RuntimeError::Rejected`] once the pool has
    /// been shut down.
    pub fn execute<F>(&self, task: F) -> RuntimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            self.shared.stats.inc_rejected();
            warn!("Task submitted after worker pool shutdown");
            return Err(RuntimeError::Rejected);
        };

        // Receiver lives in `shared`, so the channel cannot be disconnected here
        if tx.send(Box::new(task)).is_err() {
            self.shared.stats.inc_rejected();
            return Err(RuntimeError::Rejected);
        }
        self.shared.stats.inc_submitted();
        self.ensure_worker();
        Ok(())
    }

    fn ensure_worker(&self) {
        let config = &self.shared.config;
        {
            let mut live = self.shared.live.lock();
            let wanted = *live < config.core_workers
                || (*live < config.max_workers
                    && self.shared.queue.len() > self.shared.stats.idle());
            if !wanted {
                return;
            }
            *live += 1;
        }

        if let Err(e) = spawn_worker(&self.shared) {
            self.shared.worker_exited();
            let err = RuntimeError::WorkerSpawn(e.to_string());
            error!(error = %err, queued = self.shared.queue.len(), "Could not grow worker pool");
        }
    }

    /// Stop accepting tasks. Already queued tasks still run. Idempotent.
    pub fn shutdown(&self) {
        if self.sender.write().take().is_some() {
            info!(
                queued = self.shared.queue.len(),
                "Worker pool shutting down"
            );
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Shut down and every worker has exited
    pub fn is_terminated(&self) -> bool {
        self.is_shutdown() && *self.shared.live.lock() == 0
    }

    /// Wait up to `timeout` for all workers to exit after [`shutdown`](Self::shutdown)
    ///
    /// Returns `false` immediately if the pool has not been shut down. A
    /// timeout too large to express as a deadline waits without one.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        if !self.is_shutdown() {
            return false;
        }
        let deadline = Instant::now().checked_add(timeout);
        let mut live = self.shared.live.lock();
        while *live > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .terminated
                        .wait_until(&mut live, deadline)
                        .timed_out()
                    {
                        return *live == 0;
                    }
                }
                None => self.shared.terminated.wait(&mut live),
            }
        }
        true
    }

    pub fn stats(&self) -> PoolStats {
        let live = *self.shared.live.lock();
        self.shared.stats.snapshot(live, self.shared.queue.len())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}
