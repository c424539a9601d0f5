/*!
 * Runtime Limits and Constants
 *
 * Centralized location for the runtime's sizing rules and names.
 */

use std::time::Duration;

// =============================================================================
// WORKER POOL
// =============================================================================

/// Maximum workers as a multiple of the core worker count
pub const MAX_WORKER_MULTIPLIER: usize = 4;

/// Idle time after which workers above the core count retire (10s)
pub const WORKER_KEEP_ALIVE: Duration = Duration::from_secs(10);

/// Longest accepted keep-alive (one day)
pub const MAX_KEEP_ALIVE: Duration = Duration::from_secs(24 * 60 * 60);

/// Core worker count used when available parallelism cannot be detected
pub const FALLBACK_CORE_WORKERS: usize = 1;

/// Default worker thread name prefix, suffixed with `-<n>`
pub const WORKER_THREAD_PREFIX: &str = "app-runtime-worker";

// =============================================================================
// SIGNALS
// =============================================================================

/// Name of the thread listening for OS termination signals
pub const SIGNAL_THREAD_NAME: &str = "app-runtime-signals";

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_CORE_WORKERS: &str = "APP_RUNTIME_CORE_WORKERS";
pub const ENV_MAX_WORKERS: &str = "APP_RUNTIME_MAX_WORKERS";
pub const ENV_KEEP_ALIVE_SECS: &str = "APP_RUNTIME_KEEP_ALIVE_SECS";
pub const ENV_REJECTION: &str = "APP_RUNTIME_REJECTION";
pub const ENV_TRACE_JSON: &str = "APP_RUNTIME_TRACE_JSON";
