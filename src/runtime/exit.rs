/*!
 * Exit Codes
 * The closed set of statuses the application terminates with
 */

use crate::core::errors::GateError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status reported to the host on process termination
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    /// Normal exit
    NormalExit = 0,
    /// An unexpected error
    UnspecifiedError = 1,
}

impl ExitCode {
    /// Numeric status passed to the host
    #[inline]
    pub const fn status(self) -> i32 {
        self as i32
    }

    /// Terminate the process immediately with this status
    ///
    /// Does not unwind. Destructors of live values do not run.
    pub fn shutdown(self) -> ! {
        info!(exit_code = ?self, status = self.status(), "Process exiting");
        std::process::exit(self.status())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Statuses are 0 and 1, both fit in u8
        std::process::ExitCode::from(code.status() as u8)
    }
}

impl From<GateError> for ExitCode {
    fn from(err: GateError) -> Self {
        err.exit_code()
    }
}
