/*!
 * Application Runtime Library
 * Process-wide worker pool and shutdown gate for command-line applications
 */

pub mod core;
pub mod monitoring;
pub mod runtime;

// Re-exports
pub use crate::core::errors::{GateError, GateResult, RuntimeError, RuntimeResult};
pub use crate::core::sync::ShutdownGate;
pub use monitoring::init_tracing;
pub use runtime::{
    block, initialize, interrupt, release, runtime, schedule_task, shutdown_pool,
    try_initialize_with, try_schedule_task, ExitCode, PoolStats, ProcessRuntime,
    RejectionPolicy, RuntimeConfig, WorkerPool,
};
