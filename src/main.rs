/*!
 * Application Runtime - Demo Entry Point
 *
 * Exercises the runtime lifecycle end to end. Mode is the first argument:
 * - release (default): schedule APP_RUNTIME_TASKS tasks; the last one to
 *   finish releases the main thread, which drains the pool and prints stats
 * - wait: block until a termination signal interrupts the gate
 * - misuse: shut the pool down, then schedule a task
 */

use app_runtime::{init_tracing, ExitCode, ProcessRuntime, RuntimeConfig};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_TASKS: usize = 8;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    // Initialize structured tracing
    init_tracing();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "release".to_string());
    let rt = match app_runtime::try_initialize_with(RuntimeConfig::from_env()) {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Runtime initialization failed");
            ExitCode::UnspecifiedError.shutdown();
        }
    };

    match mode.as_str() {
        "release" => run_release(rt),
        "wait" => {
            announce("ready");
            info!("Waiting for termination signal");
            app_runtime::block();
        }
        "misuse" => {
            app_runtime::shutdown_pool();
            app_runtime::schedule_task(|| {});
        }
        other => {
            error!(mode = other, "Unknown mode, expected release, wait or misuse");
            ExitCode::UnspecifiedError.shutdown();
        }
    }

    ExitCode::NormalExit.shutdown();
}

fn run_release(rt: &'static ProcessRuntime) {
    let tasks = std::env::var("APP_RUNTIME_TASKS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TASKS);

    if tasks == 0 {
        app_runtime::release();
    }

    let remaining = Arc::new(AtomicUsize::new(tasks));
    for n in 0..tasks {
        let remaining = Arc::clone(&remaining);
        app_runtime::schedule_task(move || {
            std::thread::sleep(Duration::from_millis(5));
            info!(task = n, "Task complete");
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                app_runtime::release();
            }
        });
    }

    app_runtime::block();

    rt.shutdown_pool();
    if !rt.await_termination(DRAIN_TIMEOUT) {
        error!("Worker pool did not drain in time");
        ExitCode::UnspecifiedError.shutdown();
    }

    match serde_json::to_string(&rt.stats()) {
        Ok(json) => announce(&json),
        Err(e) => error!(error = %e, "Could not serialize pool stats"),
    }
}

/// Write a line to stdout and flush before any exit
fn announce(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", line);
    let _ = stdout.flush();
}
