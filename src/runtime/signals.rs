/*!
 * OS Signal Listener
 *
 * Turns process termination signals into shutdown gate interrupts so a
 * blocked main thread exits with `ExitCode::NormalExit`.
 *
 * Unix: SIGINT and SIGTERM. Elsewhere: Ctrl-C only. SIGQUIT keeps its
 * default disposition.
 *
 * The listener runs a current-thread tokio runtime on its own detached
 * thread; the worker pool stays plain threads.
 *
 * One listener per process: signals are process-wide, and a signal with no
 * blocked caller ends the whole process. Only the first runtime that asks
 * gets one; later requests are logged and skipped.
 */

use super::exit::ExitCode;
use crate::core::limits::SIGNAL_THREAD_NAME;
use crate::core::sync::ShutdownGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Spawn the listener thread for `gate`
///
/// Returns `Ok(false)` without spawning if a listener already exists.
pub(crate) fn spawn_listener(gate: Arc<ShutdownGate>) -> std::io::Result<bool> {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        warn!("Signal listener already installed for this process, skipping");
        return Ok(false);
    }

    let spawned = thread::Builder::new()
        .name(SIGNAL_THREAD_NAME.to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!(error = %e, "Signal listener runtime unavailable");
                    return;
                }
            };

            loop {
                match rt.block_on(wait_for_shutdown_signal()) {
                    Ok(signal) => deliver(&gate, signal),
                    Err(e) => {
                        warn!(error = %e, "Failed to register signal handlers");
                        return;
                    }
                }
            }
        });

    match spawned {
        Ok(_) => Ok(true),
        Err(e) => {
            INSTALLED.store(false, Ordering::Release);
            Err(e)
        }
    }
}

fn deliver(gate: &ShutdownGate, signal: &'static str) {
    if gate.interrupt_waiting() {
        info!(signal, "Termination signal, interrupted shutdown gate");
    } else {
        info!(signal, "Termination signal with no blocked caller");
        ExitCode::NormalExit.shutdown();
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}
