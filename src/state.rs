use crate::auth::cleanup::{self, CleanupHandle};
use crate::auth::rate_limit::RateLimiter;
use crate::config::AppConfig;

/// Owns the rate limiter and its cleanup task for the lifetime of the service.
pub struct AppContext {
    pub config: AppConfig,
    pub limiter: RateLimiter,
    cleanup: Option<CleanupHandle>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self::with_limiter(config, RateLimiter::new())
    }

    pub fn with_limiter(config: AppConfig, limiter: RateLimiter) -> Self {
        Self {
            config,
            limiter,
            cleanup: None,
        }
    }

    /// Spawn the periodic sweep. Must be called from inside a tokio runtime;
    /// a second call is ignored.
    pub fn start_cleanup(&mut self) {
        if self.cleanup.is_some() {
            return;
        }
        log::info!(
            "Attempt cleanup every {}s, dropping records idle for more than {}s",
            self.config.cleanup_interval.as_secs(),
            self.config.record_max_age.num_seconds()
        );
        self.cleanup = Some(cleanup::spawn_cleanup(
            self.limiter.clone(),
            self.config.cleanup_interval,
            self.config.record_max_age,
        ));
    }

    pub fn cleanup_running(&self) -> bool {
        self.cleanup.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the cleanup task, if one was started.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.stop().await;
        }
    }
}
