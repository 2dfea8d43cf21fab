//! In-process isolated worker.
//!
//! One persistent OS thread runs the task body; invocations are passed to
//! it over a channel and the result comes back on a per-invocation reply
//! channel. Panics inside the task are caught at the thread boundary and
//! reported as ordinary task failures, so a faulty task body poisons only
//! its own invocation. If the thread is ever gone (channel disconnected),
//! the next invocation spawns a fresh one.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::{ExecutionError, Executor};

/// The opaque task body. Errors are reported as strings; panics are caught
/// and reported the same way.
pub type TaskFn = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

struct Request {
    reply_tx: oneshot::Sender<Result<(), String>>,
}

struct WorkerHandle {
    req_tx: mpsc::Sender<Request>,
}

/// Executor backed by a single reusable worker thread.
pub struct WorkerExecutor {
    task: TaskFn,
    slot: Mutex<Option<WorkerHandle>>,
}

impl WorkerExecutor {
    pub fn new(task: TaskFn) -> Self {
        Self {
            task,
            slot: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Executor for WorkerExecutor {
    async fn invoke(&self) -> Result<(), ExecutionError> {
        let mut slot = self.slot.lock().await;

        // Two passes: if the current worker turns out to be dead, replace
        // it once and retry on the fresh one.
        for _attempt in 0..2 {
            if slot.is_none() {
                debug!("spawning worker thread");
                *slot = Some(spawn_worker(self.task.clone())?);
            }
            let Some(worker) = slot.as_ref() else {
                continue;
            };

            let (reply_tx, reply_rx) = oneshot::channel();
            if worker.req_tx.send(Request { reply_tx }).is_err() {
                warn!("worker thread is gone, respawning");
                *slot = None;
                continue;
            }

            return match reply_rx.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(message)) => Err(ExecutionError::Task { message }),
                Err(_) => {
                    // Reply sender dropped without a result: the thread
                    // died mid-invocation. Replace it for next time.
                    *slot = None;
                    Err(ExecutionError::Task {
                        message: "worker terminated mid-invocation".to_string(),
                    })
                }
            };
        }

        Err(ExecutionError::Isolation {
            message: "worker unusable after respawn".to_string(),
        })
    }
}

fn spawn_worker(task: TaskFn) -> Result<WorkerHandle, ExecutionError> {
    let (req_tx, req_rx) = mpsc::channel::<Request>();
    std::thread::Builder::new()
        .name("taskpulse-worker".to_string())
        .spawn(move || worker_main(task, req_rx))
        .map_err(|e| ExecutionError::Isolation {
            message: format!("failed to spawn worker thread: {e}"),
        })?;
    Ok(WorkerHandle { req_tx })
}

/// Worker thread body: serve invocation requests until the executor is
/// dropped and the request channel closes.
fn worker_main(task: TaskFn, req_rx: mpsc::Receiver<Request>) {
    while let Ok(request) = req_rx.recv() {
        let result = match catch_unwind(AssertUnwindSafe(|| task())) {
            Ok(outcome) => outcome,
            Err(payload) => Err(panic_message(payload)),
        };
        // The invoker may have gone away; nothing to do about it here.
        let _ = request.reply_tx.send(result);
    }
    debug!("worker thread exiting");
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}
