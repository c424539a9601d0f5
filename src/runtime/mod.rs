/*!
 * Process Runtime
 *
 * Fire-and-forget background execution plus a gate that keeps the main
 * thread alive until the application decides to terminate:
 * - `initialize()` builds the process-wide runtime exactly once
 * - `schedule_task()` runs work on the elastic worker pool
 * - `block()` parks the main thread until released or interrupted
 * - `ExitCode::shutdown()` terminates with a fixed status
 */

pub mod config;
pub mod exit;
pub mod pool;
mod process;
mod signals;
pub mod stats;

pub use config::{RejectionPolicy, RuntimeConfig};
pub use exit::ExitCode;
pub use pool::{Task, WorkerPool};
pub use process::{
    block, initialize, interrupt, release, runtime, schedule_task, shutdown_pool,
    try_initialize_with, try_schedule_task, ProcessRuntime,
};
pub use stats::PoolStats;
