/*!
 * Process Runtime
 *
 * The process-wide runtime: one worker pool for background tasks and one
 * shutdown gate that keeps the main thread alive until the application
 * decides to end.
 *
 * The global instance is constructed at most once through a `OnceLock`.
 * Standalone instances can be built with [`ProcessRuntime::new`].
 */

use super::config::{RejectionPolicy, RuntimeConfig};
use super::exit::ExitCode;
use super::pool::WorkerPool;
use super::signals;
use super::stats::PoolStats;
use crate::core::errors::{GateResult, RuntimeError, RuntimeResult};
use crate::core::sync::ShutdownGate;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The sole process runtime
static RUNTIME: OnceLock<ProcessRuntime> = OnceLock::new();

/// Worker pool plus shutdown gate
#[derive(Debug)]
pub struct ProcessRuntime {
    pool: WorkerPool,
    gate: Arc<ShutdownGate>,
}

impl ProcessRuntime {
    /// Build a standalone runtime
    ///
    /// Installs the OS signal listener when `config.handle_signals` is set
    /// and no runtime in this process has installed one yet.
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        Ok(Self::with_pool(WorkerPool::new(config)?))
    }

    fn with_pool(pool: WorkerPool) -> Self {
        let gate = Arc::new(ShutdownGate::new());

        if pool.config().handle_signals {
            match signals::spawn_listener(Arc::clone(&gate)) {
                Ok(true) => debug!("OS signal listener installed"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Running without OS signal handling"),
            }
        }

        Self { pool, gate }
    }

    /// Submit a task, applying the configured rejection policy on failure
    pub fn schedule_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = self.pool.execute(task) {
            self.reject(err);
        }
    }

    /// Submit a task, returning the rejection instead of acting on it
    pub fn try_schedule_task<F>(&self, task: F) -> RuntimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.execute(task)
    }

    fn reject(&self, err: RuntimeError) -> ! {
        match self.pool.config().rejection {
            RejectionPolicy::Abort => panic!("{}", err),
            RejectionPolicy::Exit => {
                error!(error = %err, "Aborting process on rejected task");
                ExitCode::UnspecifiedError.shutdown()
            }
        }
    }

    /// Park the calling thread until the gate is released
    ///
    /// An interrupted wait terminates the process with
    /// [`ExitCode::NormalExit`].
    pub fn block(&self) {
        if let Err(err) = self.wait() {
            info!(reason = %err, "Blocked wait ended without release");
            err.exit_code().shutdown();
        }
    }

    /// Park until released or interrupted, reporting which
    pub fn wait(&self) -> GateResult<()> {
        debug!("Main thread blocking on shutdown gate");
        self.gate.acquire()
    }

    /// Park for at most `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> GateResult<()> {
        self.gate.acquire_timeout(timeout)
    }

    /// Release one blocked (or future) [`block`](Self::block) call
    pub fn release(&self) {
        self.gate.release();
    }

    /// Interrupt the blocked caller
    pub fn interrupt(&self) {
        self.gate.interrupt();
    }

    /// Stop accepting tasks; queued tasks still run
    pub fn shutdown_pool(&self) {
        self.pool.shutdown();
    }

    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout)
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.pool.config()
    }

    pub fn gate(&self) -> &ShutdownGate {
        &self.gate
    }
}

/// Initialize the process runtime with the default configuration
///
/// Later calls return the existing instance.
pub fn initialize() -> &'static ProcessRuntime {
    match try_initialize_with(RuntimeConfig::default()) {
        Ok(rt) => rt,
        // The default configuration always has at least one core worker
        Err(err) => panic!("{}", err),
    }
}

/// Initialize the process runtime with `config`
///
/// Only the first successful call's configuration is used; later calls
/// return the existing instance and ignore theirs.
pub fn try_initialize_with(config: RuntimeConfig) -> RuntimeResult<&'static ProcessRuntime> {
    if let Some(existing) = RUNTIME.get() {
        debug!("Process runtime already initialized");
        return Ok(existing);
    }

    // Pools start no threads, so a pool built by a losing racer is simply dropped
    let pool = WorkerPool::new(config)?;
    Ok(RUNTIME.get_or_init(move || {
        let rt = ProcessRuntime::with_pool(pool);
        info!(
            core_workers = rt.config().core_workers,
            max_workers = rt.config().max_workers,
            "Process runtime initialized"
        );
        rt
    }))
}

/// The global runtime, if initialized
pub fn runtime() -> Option<&'static ProcessRuntime> {
    RUNTIME.get()
}

fn require() -> &'static ProcessRuntime {
    match RUNTIME.get() {
        Some(rt) => rt,
        None => panic!("{}", RuntimeError::NotInitialized),
    }
}

/// Submit a task to the global pool
///
/// # Panics
///
/// Before [`initialize`], or after the pool was shut down under
/// [`RejectionPolicy::Abort`].
pub fn schedule_task<F>(task: F)
where
    F: FnOnce() + Send + 'static,
{
    require().schedule_task(task);
}

/// Submit a task to the global pool without panicking
pub fn try_schedule_task<F>(task: F) -> RuntimeResult<()>
where
    F: FnOnce() + Send + 'static,
{
    runtime()
        .ok_or(RuntimeError::NotInitialized)?
        .try_schedule_task(task)
}

/// Block the calling thread on the global gate
pub fn block() {
    require().block();
}

/// Release the global gate once
pub fn release() {
    require().release();
}

/// Interrupt whoever is blocked on the global gate
pub fn interrupt() {
    require().interrupt();
}

/// Shut down the global pool
pub fn shutdown_pool() {
    require().shutdown_pool();
}
