//! taskpulse -- sidecar-style periodic task runner with health reporting.
//!
//! This crate runs one user-supplied task on a fixed interval inside a
//! fault-isolated executor, tracks its timing and failure history, and
//! serves that history over HTTP so a container supervisor can decide
//! whether the process is healthy.

pub mod api;
pub mod config;
pub mod executor;
pub mod health;
pub mod scheduler;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use crate::config::Config;
use crate::executor::{Executor, SubprocessExecutor, WorkerExecutor};
use crate::scheduler::StateHandle;

/// Start the taskpulse daemon: scheduler loop plus API server.
///
/// Blocks until ctrl-c, then shuts down cooperatively: HTTP stops taking
/// requests, the loop finishes any in-flight task attempt, and the
/// function returns.
pub async fn serve(bind: &str, config: Config) -> Result<()> {
    let state = StateHandle::new();
    let executor = executor_from_config(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(scheduler::run_scheduler_loop(
        executor,
        state.clone(),
        config.scheduler_config(),
        shutdown_rx,
        None,
    ));

    let app = api::router(api::state::AppState {
        run_state: state,
        max_expected_task_duration: config.scheduler_config().max_expected_task_duration,
    });

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "taskpulse listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP is down; stop the loop and wait out any in-flight attempt.
    let _ = shutdown_tx.send(true);
    loop_handle.await?;
    tracing::info!("shutdown complete");

    Ok(())
}

/// Pick the executor the configuration asks for: a subprocess when a task
/// command is set, otherwise the built-in demo task on a worker thread.
pub fn executor_from_config(config: &Config) -> Arc<dyn Executor> {
    match &config.task.command {
        Some(command) => {
            tracing::info!(command = %command, "using subprocess executor");
            Arc::new(SubprocessExecutor::new(
                command.clone(),
                config.task.args.clone(),
            ))
        }
        None => {
            tracing::info!("no task command configured, using built-in demo task");
            Arc::new(WorkerExecutor::new(Arc::new(demo_task)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("shutdown signal received");
}

/// Placeholder task body used when no command is configured. Whatever
/// should run periodically goes here or, better, behind `[task] command`.
fn demo_task() -> Result<(), String> {
    tracing::info!("task()");
    Ok(())
}
