use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::rate_limit::RateLimiter;

/// Handle to the periodic sweep; dropping it leaves the task running.
pub struct CleanupHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Signal the task and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::error!("Attempt cleanup task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Every `every`, drop attempt records idle for longer than `max_age`.
/// The first sweep runs one full interval after spawning.
pub fn spawn_cleanup(limiter: RateLimiter, every: Duration, max_age: TimeDelta) -> CleanupHandle {
    let (shutdown, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // interval() fires immediately; skip that tick
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = limiter.cleanup_stale(max_age);
                    if removed > 0 {
                        log::info!("Attempt cleanup removed {removed} stale records");
                    } else {
                        log::debug!("Attempt cleanup found nothing to remove");
                    }
                }
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        log::debug!("Attempt cleanup stopping");
                        break;
                    }
                }
            }
        }
    });

    CleanupHandle { shutdown, task }
}
