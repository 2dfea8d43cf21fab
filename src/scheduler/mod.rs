//! The scheduler loop -- run the task, record timings, sleep, repeat.
//!
//! One logical task, one iteration at a time. The loop is the single
//! writer of [`state::RunState`]; failures from the executor are counted
//! and logged, never propagated. Shutdown is cooperative: a watch channel
//! wakes the sleep early, and an in-flight invocation is awaited, never
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::executor::{ExecutionError, Executor};

pub mod state;

pub use state::{RunState, Snapshot, StateHandle};

/// Construction-time tunables for the loop. Not runtime-mutable.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Pause between the end of one attempt and the start of the next.
    pub interval: Duration,
    /// How long an attempt may stay in flight before health reports down.
    pub max_expected_task_duration: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_expected_task_duration: Duration::from_secs(5),
        }
    }
}

/// Side-channel for task failures (email, SMS, pager duty). Nothing is
/// wired by default; health reporting alone carries the failure signal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn task_failed(&self, error: &ExecutionError, consecutive_errors: u32);
}

/// Run the scheduler loop until the shutdown channel flips to `true`.
///
/// Each iteration records `last_start`, invokes the executor outside any
/// lock, folds the outcome into the error counter together with
/// `last_end`, then sleeps the configured interval. The sleep races the
/// shutdown channel so stopping never waits out a full idle interval.
pub async fn run_scheduler_loop(
    executor: Arc<dyn Executor>,
    state: StateHandle,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
    notifier: Option<Arc<dyn Notifier>>,
) {
    info!(
        interval_secs = config.interval.as_secs(),
        max_expected_task_duration_secs = config.max_expected_task_duration.as_secs(),
        "scheduler loop started"
    );
    state.set_running(true);

    while !*shutdown.borrow() {
        let run_id = Uuid::new_v4();
        state.record_start(Utc::now());
        debug!(run_id = %run_id, "task attempt started");

        let outcome = executor.invoke().await;
        state.record_end(Utc::now(), outcome.is_ok());

        match outcome {
            Ok(()) => debug!(run_id = %run_id, "task attempt succeeded"),
            Err(e) => {
                let consecutive_errors = state.snapshot().consecutive_errors;
                error!(run_id = %run_id, consecutive_errors, "task failed: {}", e);
                if let Some(notifier) = &notifier {
                    notifier.task_failed(&e, consecutive_errors).await;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            changed = shutdown.changed() => {
                debug!("sleep interrupted by shutdown signal");
                if changed.is_err() {
                    // Sender dropped: nobody can ask us to keep running.
                    break;
                }
            }
        }
    }

    state.set_running(false);
    info!("scheduler loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Executor with a scripted outcome sequence. Tracks how many
    /// invocations are in flight simultaneously and signals each
    /// completion so tests can sequence against the loop.
    struct ScriptedExecutor {
        outcomes: Mutex<VecDeque<Result<(), String>>>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        completions: mpsc::UnboundedSender<()>,
    }

    impl ScriptedExecutor {
        fn new(
            outcomes: Vec<Result<(), String>>,
            delay: Duration,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let executor = Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                completions: tx,
            });
            (executor, rx)
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn invoke(&self) -> Result<(), ExecutionError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completions.send(()).unwrap();
            outcome.map_err(|message| ExecutionError::Task { message })
        }
    }

    struct RecordingNotifier {
        calls: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn task_failed(&self, error: &ExecutionError, consecutive_errors: u32) {
            self.calls
                .lock()
                .unwrap()
                .push((error.to_string(), consecutive_errors));
        }
    }

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(30),
            max_expected_task_duration: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_counter_follows_trailing_failures() {
        let (executor, mut completions) = ScriptedExecutor::new(
            vec![
                Err("one".to_string()),
                Err("two".to_string()),
                Ok(()),
                Err("three".to_string()),
            ],
            Duration::ZERO,
        );
        let state = StateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_scheduler_loop(
            executor.clone(),
            state.clone(),
            test_config(),
            shutdown_rx,
            None,
        ));

        for _ in 0..4 {
            completions.recv().await.unwrap();
        }
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let snap = state.snapshot();
        assert_eq!(snap.consecutive_errors, 1, "ok reset, then one failure");
        assert!(!snap.running);
        assert!(snap.last_start.is_some());
        assert!(snap.last_end.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_error_counter_to_zero() {
        let (executor, mut completions) = ScriptedExecutor::new(
            vec![Err("a".to_string()), Err("b".to_string()), Ok(())],
            Duration::ZERO,
        );
        let state = StateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_scheduler_loop(
            executor,
            state.clone(),
            test_config(),
            shutdown_rx,
            None,
        ));

        completions.recv().await.unwrap();
        completions.recv().await.unwrap();
        assert_eq!(state.snapshot().consecutive_errors, 2);

        completions.recv().await.unwrap();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(state.snapshot().consecutive_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invocations_never_overlap() {
        // Zero interval and a slow task is the worst case for overlap.
        let (executor, mut completions) =
            ScriptedExecutor::new(vec![], Duration::from_secs(3));
        let state = StateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = SchedulerConfig {
            interval: Duration::ZERO,
            max_expected_task_duration: Duration::from_secs(5),
        };

        let handle = tokio::spawn(run_scheduler_loop(
            executor.clone(),
            state.clone(),
            config,
            shutdown_rx,
            None,
        ));

        for _ in 0..5 {
            completions.recv().await.unwrap();
        }
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(executor.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_the_idle_sleep() {
        let (executor, mut completions) = ScriptedExecutor::new(vec![], Duration::ZERO);
        let state = StateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // An interval long enough that the loop would otherwise sit in the
        // sleep for a week.
        let config = SchedulerConfig {
            interval: Duration::from_secs(7 * 24 * 3600),
            max_expected_task_duration: Duration::from_secs(5),
        };

        let handle = tokio::spawn(run_scheduler_loop(
            executor.clone(),
            state.clone(),
            config,
            shutdown_rx,
            None,
        ));

        completions.recv().await.unwrap();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // The one completed invocation is the only one; shutdown did not
        // wait for the idle interval and issued no new attempt.
        assert!(completions.try_recv().is_err());
        assert!(!state.snapshot().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_fires_on_failures_only() {
        let (executor, mut completions) = ScriptedExecutor::new(
            vec![Ok(()), Err("flaky".to_string()), Err("flaky".to_string())],
            Duration::ZERO,
        );
        let state = StateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let notifier = Arc::new(RecordingNotifier {
            calls: Mutex::new(Vec::new()),
        });

        let handle = tokio::spawn(run_scheduler_loop(
            executor,
            state,
            test_config(),
            shutdown_rx,
            Some(notifier.clone()),
        ));

        for _ in 0..3 {
            completions.recv().await.unwrap();
        }
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let calls = notifier.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, 1);
        assert_eq!(calls[1].1, 2);
        assert!(calls[0].0.contains("flaky"));
    }
}
