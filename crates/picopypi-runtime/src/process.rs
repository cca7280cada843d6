//! External command execution.
//!
//! Commands inherit the terminal so engine progress and entrypoint output
//! reach the user unchanged. Ctrl+C kills the child and surfaces as
//! [`PicopypiError::Interrupted`].

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use picopypi_common::error::{PicopypiError, Result};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static HANDLER: OnceLock<bool> = OnceLock::new();

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Installs the process-wide Ctrl+C handler once.
fn install_interrupt_handler() {
    let _ = HANDLER.get_or_init(|| {
        ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
            .map_err(|e| tracing::warn!(error = %e, "failed to install Ctrl+C handler"))
            .is_ok()
    });
}

/// Renders a command line for logs, single-quoting arguments that need it.
#[must_use]
pub fn display_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| {
            let arg = arg.to_string_lossy();
            let plain = !arg.is_empty()
                && arg.chars().all(|c| {
                    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '=' | '@' | ',' | '+')
                });
            if plain {
                arg.into_owned()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn_error(command: &Command, e: std::io::Error) -> PicopypiError {
    PicopypiError::io(command.get_program().to_string_lossy().into_owned(), e)
}

/// Runs a command attached to the terminal, optionally feeding `stdin`,
/// and returns its exit code.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or is interrupted.
pub fn run_streaming(command: &mut Command, stdin: Option<&[u8]>) -> Result<i32> {
    install_interrupt_handler();
    tracing::info!(command = %display_command(command), "running");

    if stdin.is_some() {
        let _ = command.stdin(Stdio::piped());
    }
    let mut child = command.spawn().map_err(|e| spawn_error(command, e))?;

    // The child may exit without draining stdin; its exit status still wins.
    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            if let Err(e) = pipe.write_all(input) {
                tracing::warn!(error = %e, "child closed stdin before reading all input");
            }
        }
    }

    wait_interruptible(&mut child, command)
}

fn wait_interruptible(child: &mut Child, command: &Command) -> Result<i32> {
    loop {
        if INTERRUPTED.swap(false, Ordering::SeqCst) {
            tracing::warn!(pid = child.id(), "interrupt received, killing child");
            let _ = child.kill();
            let _ = child.wait();
            return Err(PicopypiError::Interrupted);
        }
        match child.try_wait().map_err(|e| spawn_error(command, e))? {
            Some(status) => return Ok(status.code().unwrap_or(-1)),
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
}

/// Runs a command to completion and captures its output.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned.
pub fn run_captured(command: &mut Command) -> Result<CommandOutput> {
    tracing::debug!(command = %display_command(command), "running (captured)");
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(command, e))?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Turns a non-zero exit code into [`PicopypiError::CommandFailed`].
///
/// # Errors
///
/// Returns an error when `code` is not zero.
pub fn check_status(program: &str, code: i32) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        tracing::error!(program, code, "process exited with non-zero code");
        Err(PicopypiError::CommandFailed {
            program: program.to_string(),
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_command_quotes_when_needed() {
        let mut command = Command::new("docker");
        let _ = command.args(["run", "--env", "CI=1", "img", "hello world", "it's"]);
        assert_eq!(
            display_command(&command),
            r"docker run --env CI=1 img 'hello world' 'it'\''s'"
        );
    }

    #[test]
    fn check_status_maps_non_zero() {
        assert!(check_status("docker", 0).is_ok());
        assert!(matches!(
            check_status("docker", 2),
            Err(PicopypiError::CommandFailed { code: 2, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn run_captured_collects_output_and_code() {
        let out = run_captured(Command::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .expect("run");
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn run_streaming_feeds_stdin() {
        let code = run_streaming(
            Command::new("sh").args(["-c", "test \"$(cat)\" = payload"]),
            Some(b"payload"),
        )
        .expect("run");
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn run_streaming_reports_child_status_when_stdin_is_closed() {
        let input = vec![b'x'; 4 * 1024 * 1024];
        let code = run_streaming(
            Command::new("sh").args(["-c", "exec <&-; exit 3"]),
            Some(&input),
        )
        .expect("run");
        assert_eq!(code, 3);
    }

    #[test]
    fn missing_program_is_io_error() {
        assert!(matches!(
            run_captured(&mut Command::new("/nonexistent/picopypi-test-binary")),
            Err(PicopypiError::Io { .. })
        ));
    }
}
