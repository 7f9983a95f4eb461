//! Refreshing package sources tracked as git submodules.
//!
//! Packages are often vendored as submodules of the repository. They are
//! brought up to date before any release is scanned. The command has a
//! timeout so a stalled network does not hang the build.

use crate::error::{RepoError, Result};
use camino::Utf8Path;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for git operations (5 minutes).
const GIT_TIMEOUT: Duration = Duration::from_secs(300);

const SUBMODULE_UPDATE: &[&str] = &["submodule", "update", "--init", "--recursive", "--remote"];

/// Outcome of a submodule refresh that did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmoduleStatus {
    /// `git submodule update` completed successfully.
    Updated,
    /// No `git` executable was found; nothing was done.
    GitUnavailable,
}

/// Run `git submodule update --init --recursive --remote` in `root`.
///
/// A missing `git` executable is not an error.
///
/// # Errors
///
/// Returns [`RepoError::Git`] if the command fails or times out, and
/// [`RepoError::Io`] if it cannot be started for another reason.
pub fn update_submodules(root: &Utf8Path) -> Result<SubmoduleStatus> {
    log::info!("Updating git submodules...");
    let output = match run_git_with_timeout(SUBMODULE_UPDATE, root, "submodule update") {
        Ok(output) => output,
        Err(RepoError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            log::warn!("git command not found. Skipping submodule update.");
            return Ok(SubmoduleStatus::GitUnavailable);
        }
        Err(err) => return Err(err),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepoError::Git {
            operation: "submodule update",
            message: stderr.trim().to_owned(),
        });
    }

    log::info!("Git submodules updated.");
    Ok(SubmoduleStatus::Updated)
}

/// Runs a git command in `working_dir` with a timeout.
///
/// Returns the command output if it completes within the timeout, or an error
/// if the command times out or fails to start.
fn run_git_with_timeout(
    args: &[&str],
    working_dir: &Utf8Path,
    operation: &'static str,
) -> Result<Output> {
    let mut command = Command::new("git");
    command.args(args).current_dir(working_dir.as_std_path());
    run_with_timeout(command, operation, GIT_TIMEOUT)
}

/// Runs `command` to completion or until `timeout` elapses.
///
/// Both output pipes are drained on their own threads while waiting, so a
/// chatty child cannot block on a full pipe.
fn run_with_timeout(
    mut command: Command,
    operation: &'static str,
    timeout: Duration,
) -> Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    match child.wait_timeout(timeout)? {
        Some(status) => {
            let stdout = collect(stdout_reader)?;
            let stderr = collect(stderr_reader)?;
            let stdout_text = String::from_utf8_lossy(&stdout);
            if !stdout_text.trim().is_empty() {
                log::debug!("git {operation}: {}", stdout_text.trim());
            }

            Ok(Output {
                status,
                stdout,
                stderr,
            })
        }
        None => {
            // Readers finish on their own once the pipes close.
            let _ = child.kill();
            let _ = child.wait();
            Err(RepoError::Git {
                operation,
                message: format!("operation timed out after {} seconds", timeout.as_secs()),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader panicked"))?,
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn outside_a_repository_fails_or_skips() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");

        match update_submodules(&root) {
            Ok(status) => assert_eq!(status, SubmoduleStatus::GitUnavailable),
            Err(err) => assert!(
                matches!(err, RepoError::Git { operation: "submodule update", .. }),
                "unexpected error: {err}"
            ),
        }
    }

    #[test]
    fn missing_working_directory_is_an_io_error() {
        let err = run_git_with_timeout(&["status"], Utf8Path::new("/nonexistent/root"), "status")
            .expect_err("cannot enter directory");
        assert!(matches!(err, RepoError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn large_output_does_not_stall_the_child() {
        // Far more than a pipe buffer holds.
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 1048576 /dev/zero; head -c 262144 /dev/zero >&2"]);

        let output = run_with_timeout(command, "drain", Duration::from_secs(30))
            .expect("child finishes before the timeout");

        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 1_048_576);
        assert_eq!(output.stderr.len(), 262_144);
    }

    #[cfg(unix)]
    #[test]
    fn slow_child_is_killed_at_the_timeout() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 30"]);

        let err = run_with_timeout(command, "sleep", Duration::from_millis(200))
            .expect_err("times out");

        assert!(matches!(err, RepoError::Git { operation: "sleep", .. }), "{err}");
    }
}
