//! # Command Execution Module / 命令执行模块
//!
//! Spawns external processes and captures their combined output, with
//! optional timeout and cancellation.
//!
//! 派生外部进程并捕获其合并输出，支持可选的超时和取消。

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long reader tasks may keep draining pipes after the process was
/// killed. Grandchildren can hold the pipes open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How a captured process ended.
/// 被捕获进程的结束方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Exited(ExitStatus),
    /// Killed after exceeding its timeout.
    TimedOut,
    /// Killed because the stop token was cancelled.
    Cancelled,
}

impl Completion {
    pub fn success(&self) -> bool {
        matches!(self, Completion::Exited(status) if status.success())
    }
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// The process is killed when `timeout` elapses or `stop_token` is
/// cancelled, whichever comes first.
///
/// # Returns
/// A tuple containing:
/// - The [`Completion`] of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
    stop_token: Option<&CancellationToken>,
    timeout: Option<Duration>,
) -> (std::io::Result<Completion>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, Arc::clone(&output)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, Arc::clone(&output)));
    }

    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match stop_token {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    let completion = tokio::select! {
        status = child.wait() => status.map(Completion::Exited),
        _ = deadline => Ok(Completion::TimedOut),
        _ = cancelled => Ok(Completion::Cancelled),
    };

    let killed = matches!(completion, Ok(Completion::TimedOut | Completion::Cancelled));
    if killed {
        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "failed to kill child process");
        }
    }

    for handle in readers {
        if killed {
            if tokio::time::timeout(DRAIN_GRACE, handle).await.is_err() {
                tracing::debug!("output reader did not finish after kill");
            }
        } else if let Err(e) = handle.await {
            tracing::warn!(error = %e, "failed to join output reader task");
        }
    }

    let captured = output.lock().await.clone();
    (completion, captured)
}

fn spawn_reader<R>(stream: R, output: Arc<tokio::sync::Mutex<String>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    })
}
