//! Subprocess executor -- run the task as a child process per invocation.
//!
//! A process boundary is the strongest isolation we can offer: runaway
//! memory, CPU spins, and crashes stay inside the child. Each invocation
//! spawns a fresh child, which is exactly the "replace the context"
//! contract for free.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{ExecutionError, Executor};

/// Executor that runs a configured command to completion per invocation.
pub struct SubprocessExecutor {
    command: String,
    args: Vec<String>,
}

impl SubprocessExecutor {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self { command, args }
    }
}

#[async_trait]
impl Executor for SubprocessExecutor {
    async fn invoke(&self) -> Result<(), ExecutionError> {
        debug!(command = %self.command, "spawning task process");

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::Isolation {
                message: format!("failed to spawn '{}': {e}", self.command),
            })?;

        let status = child.wait().await.map_err(|e| ExecutionError::Isolation {
            message: format!("failed to wait for '{}': {e}", self.command),
        })?;

        if status.success() {
            info!(command = %self.command, "task process exited cleanly");
            Ok(())
        } else {
            Err(ExecutionError::Task {
                message: format!("'{}' exited with {status}", self.command),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clean_exit_is_success() {
        let executor = SubprocessExecutor::new("true".to_string(), vec![]);
        executor.invoke().await.unwrap();
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_task_error() {
        let executor = SubprocessExecutor::new("false".to_string(), vec![]);
        match executor.invoke().await.unwrap_err() {
            ExecutionError::Task { message } => {
                assert!(message.contains("exited"), "message was: {message}")
            }
            other => panic!("expected Task error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unspawnable_command_is_isolation_failure() {
        let executor =
            SubprocessExecutor::new("/nonexistent/taskpulse-no-such-bin".to_string(), vec![]);
        match executor.invoke().await.unwrap_err() {
            ExecutionError::Isolation { message } => {
                assert!(message.contains("failed to spawn"), "message was: {message}")
            }
            other => panic!("expected Isolation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_arguments_are_passed_through() {
        let executor = SubprocessExecutor::new(
            "sh".to_string(),
            vec!["-c".to_string(), "exit 0".to_string()],
        );
        executor.invoke().await.unwrap();
    }
}
