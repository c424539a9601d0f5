/*!
 * Lock-Free Pool Statistics
 * Atomic counters updated on the submission and worker hot paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time view of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub live_workers: usize,
    pub idle_workers: usize,
    pub active_tasks: usize,
    pub peak_active_tasks: usize,
    pub queued_tasks: usize,
    pub submitted: u64,
    pub completed: u64,
    pub panicked: u64,
    pub rejected: u64,
}

/// Atomic pool counters
///
/// Worker liveness (`live`) is not tracked here: it participates in spawn
/// and retire decisions and lives with the pool itself.
#[repr(C, align(64))]
#[derive(Default)]
pub(crate) struct AtomicPoolStats {
    idle: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    rejected: AtomicU64,
}

impl AtomicPoolStats {
    #[inline(always)]
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn enter_idle(&self) {
        self.idle.fetch_add(1, Ordering::AcqRel);
    }

    #[inline(always)]
    pub fn leave_idle(&self) {
        self.idle.fetch_sub(1, Ordering::AcqRel);
    }

    #[inline(always)]
    pub fn idle(&self) -> usize {
        self.idle.load(Ordering::Acquire)
    }

    /// Mark a task as running and track the high-water mark
    #[inline(always)]
    pub fn task_started(&self) {
        let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_active.fetch_max(now, Ordering::AcqRel);
    }

    #[inline(always)]
    pub fn task_finished(&self, panicked: bool) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        if panicked {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub fn snapshot(&self, live_workers: usize, queued_tasks: usize) -> PoolStats {
        PoolStats {
            live_workers,
            idle_workers: self.idle.load(Ordering::Acquire),
            active_tasks: self.active.load(Ordering::Acquire),
            peak_active_tasks: self.peak_active.load(Ordering::Acquire),
            queued_tasks,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Acquire),
            panicked: self.panicked.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
