/*!
 * Runtime Configuration
 *
 * Pool bounds, keep-alive and rejection behaviour, with an optional
 * environment overlay.
 */

use crate::core::errors::{RuntimeError, RuntimeResult};
use crate::core::limits::{
    ENV_CORE_WORKERS, ENV_KEEP_ALIVE_SECS, ENV_MAX_WORKERS, ENV_REJECTION,
    FALLBACK_CORE_WORKERS, MAX_KEEP_ALIVE, MAX_WORKER_MULTIPLIER, WORKER_KEEP_ALIVE,
    WORKER_THREAD_PREFIX,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// What happens when a task is submitted to a pool that no longer accepts work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Panic in the submitting thread
    #[default]
    Abort,
    /// Terminate the process with `ExitCode::UnspecifiedError`
    Exit,
}

impl FromStr for RejectionPolicy {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "exit" => Ok(Self::Exit),
            other => Err(RuntimeError::InvalidConfig(format!(
                "unknown rejection policy '{}'",
                other
            ))),
        }
    }
}

/// Worker pool and runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Workers kept alive even when idle
    pub core_workers: usize,
    /// Upper bound on live workers
    pub max_workers: usize,
    /// Idle time after which workers above `core_workers` retire.
    /// Core workers never time out. Zero retires extra workers as soon as
    /// the queue is empty.
    pub keep_alive: Duration,
    /// Behaviour on submission after shutdown
    pub rejection: RejectionPolicy,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
    /// Deliver SIGINT/SIGTERM to the shutdown gate as interrupts
    pub handle_signals: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or_else(|_| {
                warn!(
                    "Failed to detect available parallelism, defaulting to {}",
                    FALLBACK_CORE_WORKERS
                );
                FALLBACK_CORE_WORKERS
            });
        Self::with_core_workers(cores)
    }
}

impl RuntimeConfig {
    /// Configuration with `cores` core workers and 4x that as the maximum
    pub fn with_core_workers(cores: usize) -> Self {
        Self {
            core_workers: cores,
            max_workers: cores.saturating_mul(MAX_WORKER_MULTIPLIER),
            keep_alive: WORKER_KEEP_ALIVE,
            rejection: RejectionPolicy::default(),
            thread_name_prefix: WORKER_THREAD_PREFIX.to_string(),
            handle_signals: true,
        }
    }

    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_rejection(mut self, rejection: RejectionPolicy) -> Self {
        self.rejection = rejection;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Default configuration overlaid with `APP_RUNTIME_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparsable values are logged and ignored.
    ///
    /// Setting only the core count keeps max at 4x core.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cores) = parse_var::<usize>(&lookup, ENV_CORE_WORKERS) {
            self.core_workers = cores;
            self.max_workers = cores.saturating_mul(MAX_WORKER_MULTIPLIER);
        }
        if let Some(max) = parse_var::<usize>(&lookup, ENV_MAX_WORKERS) {
            self.max_workers = max;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_KEEP_ALIVE_SECS) {
            let keep_alive = Duration::from_secs(secs);
            if keep_alive <= MAX_KEEP_ALIVE {
                self.keep_alive = keep_alive;
            } else {
                warn!(
                    key = ENV_KEEP_ALIVE_SECS,
                    secs,
                    max_secs = MAX_KEEP_ALIVE.as_secs(),
                    "Ignoring keep-alive above the maximum"
                );
            }
        }
        if let Some(policy) = parse_var::<RejectionPolicy>(&lookup, ENV_REJECTION) {
            self.rejection = policy;
        }
        self
    }

    /// Check pool bounds and keep-alive
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.core_workers == 0 {
            return Err(RuntimeError::InvalidConfig(
                "core_workers must be at least 1".into(),
            ));
        }
        if self.max_workers < self.core_workers {
            return Err(RuntimeError::InvalidConfig(format!(
                "max_workers ({}) is below core_workers ({})",
                self.max_workers, self.core_workers
            )));
        }
        if self.keep_alive > MAX_KEEP_ALIVE {
            return Err(RuntimeError::InvalidConfig(format!(
                "keep_alive ({:?}) exceeds the maximum of {:?}",
                self.keep_alive, MAX_KEEP_ALIVE
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable runtime setting");
            None
        }
    }
}
