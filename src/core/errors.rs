/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::runtime::exit::ExitCode;
use miette::Diagnostic;
use thiserror::Error;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result type for gate operations
pub type GateResult<T> = Result<T, GateError>;

/// Runtime-level errors
///
/// None of these are transient: each one indicates a programming defect or
/// a host that cannot run the configured pool.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum RuntimeError {
    #[error("Process runtime used before initialize()")]
    #[diagnostic(
        code(runtime::not_initialized),
        help("Call app_runtime::initialize() once at startup before scheduling or blocking.")
    )]
    NotInitialized,

    #[error("Task rejected: worker pool has been shut down")]
    #[diagnostic(
        code(runtime::rejected),
        help("Tasks cannot be submitted after shutdown_pool(). This is a programming error.")
    )]
    Rejected,

    #[error("Invalid runtime configuration: {0}")]
    #[diagnostic(
        code(runtime::invalid_config),
        help("core_workers must be at least 1, max_workers must not be below core_workers, and keep_alive must not exceed one day.")
    )]
    InvalidConfig(String),

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(runtime::worker_spawn),
        help("The host refused to create a thread. Check process thread limits.")
    )]
    WorkerSpawn(String),
}

/// Shutdown gate errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum GateError {
    #[error("Wait on shutdown gate was interrupted")]
    #[diagnostic(code(gate::interrupted))]
    Interrupted,

    #[error("Wait on shutdown gate timed out")]
    #[diagnostic(code(gate::timeout))]
    Timeout,
}

impl GateError {
    /// Exit code the process terminates with when a blocking wait ends this way
    ///
    /// An interrupted wait is treated as a request for normal termination.
    /// It is not distinguished from a deliberate release.
    pub const fn exit_code(self) -> ExitCode {
        match self {
            GateError::Interrupted => ExitCode::NormalExit,
            GateError::Timeout => ExitCode::UnspecifiedError,
        }
    }
}
