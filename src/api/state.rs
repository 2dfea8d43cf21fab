use std::time::Duration;

use crate::scheduler::StateHandle;

#[derive(Clone)]
pub struct AppState {
    pub run_state: StateHandle,
    pub max_expected_task_duration: Duration,
}
