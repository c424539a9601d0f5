/*!
 * Shutdown Gate
 *
 * Counting semaphore that starts with zero permits. The main control flow
 * parks on it until some other part of the application decides the process
 * should end and releases a permit.
 *
 * Built on parking_lot::Condvar. A pending interrupt is delivered to exactly
 * one acquire and takes priority over available permits.
 */

use crate::core::errors::{GateError, GateResult};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

struct GateState {
    permits: usize,
    interrupt_pending: bool,
    waiters: usize,
}

/// Counting signal used to keep the process alive until released
pub struct ShutdownGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl ShutdownGate {
    /// Create a gate with zero permits
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                permits: 0,
                interrupt_pending: false,
                waiters: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Block until a permit is released or the wait is interrupted
    pub fn acquire(&self) -> GateResult<()> {
        self.acquire_until(None)
    }

    /// Like [`acquire`](Self::acquire), giving up after `timeout`
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn acquire_timeout(&self, timeout: Duration) -> GateResult<()> {
        self.acquire_until(Instant::now().checked_add(timeout))
    }

    /// Take a permit if one is available, without blocking
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            true
        } else {
            false
        }
    }

    fn acquire_until(&self, deadline: Option<Instant>) -> GateResult<()> {
        let mut state = self.state.lock();
        state.waiters += 1;

        let outcome = loop {
            if state.interrupt_pending {
                state.interrupt_pending = false;
                break Err(GateError::Interrupted);
            }
            if state.permits > 0 {
                state.permits -= 1;
                break Ok(());
            }
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut state, deadline).timed_out()
                        && state.permits == 0
                        && !state.interrupt_pending
                    {
                        break Err(GateError::Timeout);
                    }
                }
                None => self.condvar.wait(&mut state),
            }
        };

        state.waiters -= 1;
        outcome
    }

    /// Release one permit, waking one waiter if any
    pub fn release(&self) {
        self.release_many(1);
    }

    /// Release `n` permits
    pub fn release_many(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.permits += n;
        debug!(permits = state.permits, waiters = state.waiters, "shutdown gate released");
        if n == 1 {
            self.condvar.notify_one();
        } else {
            self.condvar.notify_all();
        }
    }

    /// Interrupt the current (or next) waiter
    ///
    /// The interrupt stays pending until exactly one acquire consumes it.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupt_pending = true;
        debug!(waiters = state.waiters, "shutdown gate interrupted");
        self.condvar.notify_all();
    }

    /// Interrupt a thread parked in an acquire, if there is one
    ///
    /// Returns `false`, leaving no interrupt pending, when nobody is waiting.
    /// The check and the interrupt happen under one lock, so a waiter that
    /// is released concurrently either sees the interrupt or is not counted.
    pub fn interrupt_waiting(&self) -> bool {
        let mut state = self.state.lock();
        if state.waiters == 0 {
            return false;
        }
        state.interrupt_pending = true;
        debug!(waiters = state.waiters, "shutdown gate interrupted");
        self.condvar.notify_all();
        true
    }

    /// Permits released but not yet acquired
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    /// Threads currently parked in an acquire
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters
    }
}

impl std::fmt::Debug for ShutdownGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ShutdownGate")
            .field("permits", &state.permits)
            .field("interrupt_pending", &state.interrupt_pending)
            .field("waiters", &state.waiters)
            .finish()
    }
}

impl Default for ShutdownGate {
    fn default() -> Self {
        Self::new()
    }
}
