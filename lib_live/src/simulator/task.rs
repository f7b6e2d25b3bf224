//! # Repeating Task
//!
//! A cancellable periodic job bound to the lifetime of whatever it drives. The job
//! decides when it is done by returning `ControlFlow::Break`, at which point the
//! task cancels its own token and exits. Cancelling from outside is idempotent.
//!
//! Ticks of one task never overlap: the next wait starts only after `on_tick`
//! returns, and a late tick is delayed rather than followed by a burst of catch-up
//! ticks.

use std::ops::ControlFlow;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::MIN_TICK;

#[async_trait]
pub trait Tickable: Send + 'static {
    async fn on_tick(&mut self) -> ControlFlow<()>;

    /// Runs once when the task is cancelled from outside before finishing.
    async fn on_cancel(&mut self) {}
}

pub struct RepeatingTask {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawns `job`, first tick one `period` from now. Periods below `MIN_TICK`
    /// are raised to it.
    pub fn spawn<T: Tickable>(name: impl Into<String>, period: Duration, mut job: T) -> Self {
        let period = period.max(MIN_TICK);
        let name = name.into();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        job.on_cancel().await;
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                if job.on_tick().await.is_break() {
                    task_token.cancel();
                    break;
                }
            }
            debug!(task = %task_name, "Repeating task stopped");
        });

        Self { name, token, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the task after its current tick. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task to exit. A panic inside the job is logged, not propagated.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!(task = %self.name, "Repeating task panicked: {}", e);
            }
        }
    }
}
