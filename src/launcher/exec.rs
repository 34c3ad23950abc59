//! Running the Chroma CLI as a child process.

use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Exit code reported when the child was stopped by Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

const SIGINT: i32 = 2;

/// `STATUS_CONTROL_C_EXIT` on Windows.
const STATUS_CONTROL_C_EXIT: i32 = -1_073_741_510;

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitOutcome {
    pub code: Option<i32>,
    /// Terminating signal (Unix only).
    pub signal: Option<i32>,
    /// Ctrl-C was received while the child ran.
    pub interrupted: bool,
}

impl ExitOutcome {
    #[must_use]
    pub fn from_status(status: ExitStatus, interrupted: bool) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            interrupted,
        }
    }

    /// Exit code the launcher should exit with.
    ///
    /// 130 whenever Ctrl-C arrived or the child died of SIGINT, whatever the
    /// child then returned. Otherwise the child's own code, `128 + n` for
    /// any other signal, 1 if neither is known.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.interrupted {
            return INTERRUPTED_EXIT_CODE;
        }
        match (self.code, self.signal) {
            (_, Some(SIGINT)) | (Some(STATUS_CONTROL_C_EXIT), _) => INTERRUPTED_EXIT_CODE,
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Run `path` with `args`, inheriting stdio, and wait for it to exit.
///
/// On Ctrl-C the interrupt is relayed to the child (Unix) and the launcher
/// keeps waiting for it to shut down; the outcome is then marked
/// interrupted.
///
/// # Errors
///
/// Returns [`Error::Exec`] if the binary cannot be started or waited on.
pub async fn exec_binary<S: AsRef<OsStr>>(path: &Path, args: impl IntoIterator<Item = S>) -> Result<ExitOutcome> {
    debug!(path = %path.display(), "Running Chroma CLI");

    let exec_error = |source: std::io::Error| Error::Exec {
        path: path.to_path_buf(),
        source,
    };

    let mut child = Command::new(path)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(exec_error)?;

    let mut interrupted = false;
    let mut listening = true;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status.map_err(exec_error)?,
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => {
                    debug!("Interrupt received; waiting for child to exit");
                    interrupted = true;
                    listening = false;
                    relay_interrupt(&child);
                }
                Err(e) => {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                    listening = false;
                }
            },
        }
    };

    let outcome = ExitOutcome::from_status(status, interrupted);
    debug!(?outcome, "Chroma CLI exited");
    Ok(outcome)
}

/// Forward SIGINT to the child. A child in our process group may already
/// have it; a second one is harmless for an exiting process.
#[cfg(unix)]
fn relay_interrupt(child: &tokio::process::Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGINT) {
        debug!(pid, error = %e, "Could not relay interrupt to child");
    }
}

/// Windows delivers console Ctrl-C to every attached process.
#[cfg(not(unix))]
fn relay_interrupt(_child: &tokio::process::Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let code = |code, signal, interrupted| ExitOutcome { code, signal, interrupted }.exit_code();
        assert_eq!(code(Some(0), None, false), 0);
        assert_eq!(code(Some(7), None, false), 7);
        assert_eq!(code(None, Some(2), false), 130);
        assert_eq!(code(None, Some(15), false), 143);
        assert_eq!(code(None, None, true), 130);
        assert_eq!(code(Some(STATUS_CONTROL_C_EXIT), None, false), 130);
        assert_eq!(code(None, None, false), 1);
    }

    #[test]
    fn test_interrupt_wins_over_child_code() {
        let code = |code, signal| ExitOutcome { code, signal, interrupted: true }.exit_code();
        assert_eq!(code(Some(0), None), 130);
        assert_eq!(code(Some(7), None), 130);
        assert_eq!(code(None, Some(15)), 130);
    }

    #[cfg(unix)]
    #[test]
    fn test_sigint_status_maps_to_130() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status for "terminated by signal 2".
        let outcome = ExitOutcome::from_status(ExitStatus::from_raw(2), false);
        assert_eq!(outcome.signal, Some(2));
        assert_eq!(outcome.exit_code(), 130);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_exit_code_is_forwarded() {
        let outcome = exec_binary(Path::new("/bin/sh"), ["-c", "exit 7"]).await.unwrap();
        assert_eq!(outcome.code, Some(7));
        assert_eq!(outcome.exit_code(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_killed_by_sigint() {
        let outcome = exec_binary(Path::new("/bin/sh"), ["-c", "kill -INT $$"]).await.unwrap();
        assert_eq!(outcome.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_missing_binary_is_exec_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = exec_binary(&dir.path().join("nope"), std::iter::empty::<&str>())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Exec { .. }));
    }
}
