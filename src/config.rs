use std::time::Duration;

use chrono::TimeDelta;

use crate::errors::AppError;
use crate::i18n::Locale;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_RECORD_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Runtime settings of the guard service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cleanup_interval: Duration,
    pub record_max_age: TimeDelta,
    pub default_locale: Locale,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            record_max_age: TimeDelta::seconds(DEFAULT_RECORD_MAX_AGE_SECS as i64),
            default_locale: Locale::Ar,
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment (after loading `.env`, if any).
    pub fn from_env() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AppError::Config(format!("failed to read .env: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("GUARD_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(secs) = positive_secs(&lookup, "GUARD_CLEANUP_INTERVAL_SECS")? {
            config.cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = positive_secs(&lookup, "GUARD_RECORD_MAX_AGE_SECS")? {
            let secs = i64::try_from(secs).map_err(|_| {
                AppError::Config(format!("GUARD_RECORD_MAX_AGE_SECS out of range: {secs}"))
            })?;
            config.record_max_age = TimeDelta::try_seconds(secs).ok_or_else(|| {
                AppError::Config(format!("GUARD_RECORD_MAX_AGE_SECS out of range: {secs}"))
            })?;
        }
        if let Some(locale) = lookup("GUARD_DEFAULT_LOCALE") {
            config.default_locale = locale
                .parse()
                .map_err(|e| AppError::Config(format!("GUARD_DEFAULT_LOCALE: {e}")))?;
        }

        Ok(config)
    }
}

fn positive_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(AppError::Config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Some(secs)),
        Err(e) => Err(AppError::Config(format!("{key} is not a number ({raw}): {e}"))),
    }
}
