//! Async wrappers around the external probe commands.
//!
//! Probes shell out through tokio so a slow command never stalls another
//! source. Long-running commands are killed when their handle is dropped.

use capy_engine::SourceError;
use log::{debug, warn};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Run `program` to completion and return its stdout.
pub async fn output(program: &str, args: &[&str]) -> Result<String, SourceError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(SourceError::CommandFailed {
            program: program.to_string(),
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Start `program` and forward its stdout line by line, skipping the first
/// `skip` lines (headers).
///
/// The returned [`Child`] owns the process; dropping it kills the command.
/// The channel closes when the command stops printing.
pub fn spawn_lines(
    program: &str,
    args: &[&str],
    skip: usize,
) -> Result<(Child, mpsc::Receiver<String>), SourceError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other(format!("{program}: stdout not captured")))?;

    let (tx, rx) = mpsc::channel(1);
    let program = program.to_string();

    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let mut skipped = 0;

        loop {
            match lines.next_line().await {
                Ok(Some(_)) if skipped < skip => skipped += 1,
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("{}: end of output", program);
                    break;
                }
                Err(e) => {
                    warn!("{}: failed to read output: {}", program, e);
                    break;
                }
            }
        }
    });

    Ok((child, rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_output_returns_stdout() {
        let out = output("sh", &["-c", "echo hello"]).await.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn test_output_reports_exit_status() {
        let err = output("sh", &["-c", "exit 3"]).await.unwrap_err();
        assert!(matches!(err, SourceError::CommandFailed { ref program, .. } if program == "sh"));
    }

    #[tokio::test]
    async fn test_output_missing_program() {
        let err = output("capy-status-no-such-probe", &[]).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_spawn_lines_skips_headers() {
        let (_child, mut lines) =
            spawn_lines("sh", &["-c", "printf 'head1\\nhead2\\n1 2\\n3 4\\n'"], 2).unwrap();

        assert_eq!(lines.recv().await.as_deref(), Some("1 2"));
        assert_eq!(lines.recv().await.as_deref(), Some("3 4"));
        assert_eq!(lines.recv().await, None);
    }
}
