//! Task execution behind an isolation boundary.
//!
//! The scheduler loop only ever sees [`Executor::invoke`]: run the task to
//! completion, report success or a typed failure. What "isolation" means is
//! the implementation's business -- a dedicated worker thread with a panic
//! boundary ([`worker::WorkerExecutor`]) or a child process
//! ([`subprocess::SubprocessExecutor`]). Either way a fault inside the task
//! must only poison that single invocation, never the caller.

use async_trait::async_trait;
use thiserror::Error;

pub mod subprocess;
pub mod worker;

pub use subprocess::SubprocessExecutor;
pub use worker::{TaskFn, WorkerExecutor};

/// Why an invocation failed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The task body itself failed (returned an error, panicked, or the
    /// child process exited non-zero). Counted by the loop, never fatal.
    #[error("task failed: {message}")]
    Task { message: String },

    /// The isolation mechanism is unusable: the worker could not be
    /// spawned or the child process could not be forked. The executor
    /// replaces the context before the next invocation.
    #[error("isolation failure: {message}")]
    Isolation { message: String },
}

/// One reusable, fault-isolated execution context.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run one invocation of the task to completion.
    ///
    /// May block for an unbounded duration; timeout policy belongs to the
    /// caller. Implementations must stay usable after a failed invocation,
    /// spawning a fresh isolated context if the previous one died.
    async fn invoke(&self) -> Result<(), ExecutionError>;
}
