//! Refresh Scheduler
//!
//! Background task driving [`LifecycleManager::tick`](crate::token::LifecycleManager::tick)
//! at a fixed interval.

use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::manager::ManagerInner;

/// Handle to a running scheduler task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Spawn the tick loop. The first tick fires one `period` after spawning.
    ///
    /// The task holds only a weak reference and exits once the manager is gone.
    pub(crate) fn spawn(manager: Weak<ManagerInner>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(manager) = manager.upgrade() else {
                    debug!("Lifecycle manager dropped, stopping scheduler");
                    break;
                };
                manager.tick().await;
            }
        });

        debug!(period_ms = period.as_millis() as u64, "Token scheduler started");
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the task. Safe to call more than once.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
