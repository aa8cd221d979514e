//! # Command Module Unit Tests / Command 模块单元测试
//!
//! Tests for `spawn_and_capture`: output capture, exit status, timeout and
//! cancellation.
//!
//! 测试 `spawn_and_capture`：输出捕获、退出状态、超时和取消。

#![cfg(unix)]

use env_matrix::infra::command::{Completion, spawn_and_capture};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", script]);
    cmd
}

#[cfg(test)]
mod spawn_and_capture_tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_capture_successful_command() {
        let mut cmd = Command::new("echo");
        cmd.arg("Hello, World!");

        let (completion, output) = spawn_and_capture(cmd, None, None).await;

        assert!(completion.unwrap().success());
        assert!(output.contains("Hello, World!"));
    }

    #[tokio::test]
    async fn test_spawn_and_capture_combines_stdout_and_stderr() {
        let (completion, output) =
            spawn_and_capture(sh("echo 'Test output'; echo 'Test error' >&2"), None, None).await;

        assert!(completion.unwrap().success());
        assert!(output.contains("Test output"));
        assert!(output.contains("Test error"));
    }

    #[tokio::test]
    async fn test_spawn_and_capture_failing_command() {
        let (completion, _) = spawn_and_capture(sh("exit 7"), None, None).await;

        match completion.unwrap() {
            Completion::Exited(status) => assert_eq!(status.code(), Some(7)),
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_and_capture_nonexistent_command() {
        let cmd = Command::new("this_command_definitely_does_not_exist_12345");
        let (completion, output) = spawn_and_capture(cmd, None, None).await;

        assert!(completion.is_err());
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_and_capture_times_out() {
        let start = Instant::now();
        let (completion, output) = spawn_and_capture(
            sh("echo started; sleep 10"),
            None,
            Some(Duration::from_millis(300)),
        )
        .await;

        assert_eq!(completion.unwrap(), Completion::TimedOut);
        assert!(output.contains("started"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_spawn_and_capture_cancelled() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let (completion, _) = spawn_and_capture(sh("sleep 10"), Some(&token), None).await;

        assert_eq!(completion.unwrap(), Completion::Cancelled);
    }
}
