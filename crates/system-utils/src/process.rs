use std::process::{ExitStatus, Output, Stdio};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

/// Tail of the child's stderr kept for error messages.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

pub struct InteractiveOutput {
    pub status: ExitStatus,
    /// Last bytes the child wrote to stderr; the full stream was also echoed.
    pub stderr: Vec<u8>,
}

/// Runs `cmd` with the caller's terminal attached and waits for it to exit.
///
/// stderr is forwarded to ours as it arrives and its tail is kept so failures
/// can be explained. There is no timeout: a child that never exits blocks the
/// caller.
pub async fn run_interactive(
    cmd: &mut Command,
    label: &str,
) -> anyhow::Result<InteractiveOutput> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {label}"))?;
    let stderr_pipe = child.stderr.take();
    let mut echo = tokio::io::stderr();
    let (status, stderr) = tokio::join!(child.wait(), async {
        match stderr_pipe {
            Some(pipe) => tee_tail(pipe, &mut echo, STDERR_TAIL_BYTES).await,
            None => Vec::new(),
        }
    });
    let status = status.with_context(|| format!("{label} failed"))?;
    Ok(InteractiveOutput { status, stderr })
}

/// Runs `cmd` with stdin closed and both output streams collected.
pub async fn run_captured(cmd: &mut Command, label: &str) -> anyhow::Result<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd.output()
        .await
        .with_context(|| format!("failed to spawn {label}"))
}

/// Copies `reader` into `writer` until EOF, returning at most the last `limit` bytes.
async fn tee_tail<R, W>(mut reader: R, writer: &mut W, limit: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut tail = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let read = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(read) => read,
        };
        let _ = writer.write_all(&buf[..read]).await;
        let _ = writer.flush().await;
        tail.extend_from_slice(&buf[..read]);
        if tail.len() > limit {
            tail.drain(..tail.len() - limit);
        }
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captured_collects_stdout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo hello; echo oops 1>&2");
        let output = run_captured(&mut cmd, "sh").await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "oops\n");
    }

    #[tokio::test]
    async fn captured_reports_exit_status() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 3");
        let output = run_captured(&mut cmd, "sh").await.unwrap();
        assert_eq!(output.status.code(), Some(3));
    }

    #[tokio::test]
    async fn interactive_returns_status() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 0");
        let output = run_interactive(&mut cmd, "sh").await.unwrap();
        assert!(output.status.success());
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn interactive_keeps_stderr_of_failed_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo 'Permission denied (publickey).' 1>&2; exit 255");
        let output = run_interactive(&mut cmd, "sh").await.unwrap();
        assert_eq!(output.status.code(), Some(255));
        assert_eq!(
            String::from_utf8_lossy(&output.stderr),
            "Permission denied (publickey).\n"
        );
    }

    #[tokio::test]
    async fn tee_forwards_everything_and_keeps_tail() {
        let input: &[u8] = b"0123456789";
        let mut echoed = Vec::new();
        let tail = tee_tail(input, &mut echoed, 4).await;
        assert_eq!(echoed, b"0123456789");
        assert_eq!(tail, b"6789");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let mut cmd = Command::new("faucet-test-no-such-program");
        let err = run_captured(&mut cmd, "launcher").await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn launcher"));
    }
}
