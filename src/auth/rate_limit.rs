//! Per-identifier, per-action failure tracking with temporary blocking.
//!
//! Each `(identifier, action)` pair owns at most one [`AttemptRecord`]. Failed
//! attempts are counted inside a window that starts at the first failure; once
//! the count reaches the action's `max_attempts` the pair is blocked for
//! `block_duration`. Window expiry is only evaluated by [`RateLimiter::is_allowed`]
//! and [`RateLimiter::check`].
//!
//! Actions without a configuration are unmetered: they are always allowed and
//! their attempts are never recorded.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::clock::{Clock, SystemClock};

pub const ACTION_LOGIN: &str = "login";
pub const ACTION_REGISTER: &str = "register";
pub const ACTION_FORGOT_PASSWORD: &str = "forgot-password";

/// Limits applied to a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: TimeDelta,
    pub block_duration: TimeDelta,
}

impl RateLimitConfig {
    pub const fn new(max_attempts: u32, window: TimeDelta, block_duration: TimeDelta) -> Self {
        Self { max_attempts, window, block_duration }
    }
}

/// The storefront's fixed table: login, register and forgot-password.
pub fn default_configs() -> HashMap<String, RateLimitConfig> {
    HashMap::from([
        (
            ACTION_LOGIN.to_string(),
            RateLimitConfig::new(5, TimeDelta::minutes(15), TimeDelta::minutes(30)),
        ),
        (
            ACTION_REGISTER.to_string(),
            RateLimitConfig::new(3, TimeDelta::minutes(60), TimeDelta::minutes(60)),
        ),
        (
            ACTION_FORGOT_PASSWORD.to_string(),
            RateLimitConfig::new(3, TimeDelta::minutes(60), TimeDelta::minutes(60)),
        ),
    ])
}

/// Failure history of one identifier for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub count: u32,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            first_attempt: now,
            last_attempt: now,
            blocked_until: None,
        }
    }

    fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

/// Answer to "may this identifier try again", read under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptStatus {
    pub allowed: bool,
    /// `None` when the action is unmetered.
    pub remaining_attempts: Option<u32>,
    pub retry_after: Duration,
}

impl AttemptStatus {
    const UNMETERED: AttemptStatus = AttemptStatus {
        allowed: true,
        remaining_attempts: None,
        retry_after: Duration::ZERO,
    };

    fn of(record: Option<&AttemptRecord>, config: &RateLimitConfig, now: DateTime<Utc>) -> Self {
        let Some(record) = record else {
            return AttemptStatus {
                allowed: true,
                remaining_attempts: Some(config.max_attempts),
                retry_after: Duration::ZERO,
            };
        };
        let allowed = if record.is_blocked_at(now) {
            false
        } else {
            now - record.first_attempt > config.window || record.count < config.max_attempts
        };
        AttemptStatus {
            allowed,
            remaining_attempts: Some(config.max_attempts.saturating_sub(record.count)),
            retry_after: record
                .blocked_until
                .and_then(|until| (until - now).to_std().ok())
                .unwrap_or(Duration::ZERO),
        }
    }
}

/// Snapshot of one action's records, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStats {
    pub config: RateLimitConfig,
    pub total_records: usize,
    pub blocked_records: usize,
}

type RecordKey = (String, String);

#[derive(Clone)]
pub struct RateLimiter {
    configs: Arc<HashMap<String, RateLimitConfig>>,
    records: Arc<Mutex<HashMap<RecordKey, AttemptRecord>>>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Limiter with the default action table and the system clock.
    pub fn new() -> Self {
        Self::with_configs(default_configs(), Arc::new(SystemClock))
    }

    pub fn with_configs(configs: HashMap<String, RateLimitConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            configs: Arc::new(configs),
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RecordKey, AttemptRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(identifier: &str, action: &str) -> RecordKey {
        (identifier.to_string(), action.to_string())
    }

    /// Whether `identifier` may attempt `action` right now.
    ///
    /// A record whose window has elapsed is dropped here, giving the caller a
    /// fresh window.
    pub fn is_allowed(&self, identifier: &str, action: &str) -> bool {
        let Some(config) = self.configs.get(action) else {
            return true;
        };
        let now = self.clock.now();
        let key = Self::key(identifier, action);
        let mut map = self.lock();

        let Some(record) = map.get(&key) else {
            return true;
        };
        if record.is_blocked_at(now) {
            return false;
        }
        if now - record.first_attempt > config.window {
            map.remove(&key);
            return true;
        }
        record.count < config.max_attempts
    }

    /// Report the outcome of an attempt. A success forgives all prior failures.
    ///
    /// Failures accumulate on the existing record even if its window has
    /// elapsed; only `is_allowed` and `check` reset stale windows.
    pub fn record_attempt(&self, identifier: &str, action: &str, success: bool) {
        let Some(config) = self.configs.get(action) else {
            return;
        };
        let key = Self::key(identifier, action);
        let mut map = self.lock();

        if success {
            map.remove(&key);
            return;
        }

        let now = self.clock.now();
        let record = map.entry(key).or_insert_with(|| AttemptRecord::new(now));
        record.count = record.count.saturating_add(1);
        record.last_attempt = now;

        if record.count >= config.max_attempts {
            let until = now
                .checked_add_signed(config.block_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.blocked_until = Some(until);
            log::warn!(
                "Blocking '{identifier}' for '{action}' until {until} after {} failed attempts",
                record.count
            );
        }
    }

    /// `is_allowed` plus remaining attempts and block time, all under one
    /// lock. Drops an expired window exactly like `is_allowed`.
    pub fn check(&self, identifier: &str, action: &str) -> AttemptStatus {
        let Some(config) = self.configs.get(action) else {
            return AttemptStatus::UNMETERED;
        };
        let now = self.clock.now();
        let key = Self::key(identifier, action);
        let mut map = self.lock();

        if map
            .get(&key)
            .is_some_and(|r| !r.is_blocked_at(now) && now - r.first_attempt > config.window)
        {
            map.remove(&key);
        }
        AttemptStatus::of(map.get(&key), config, now)
    }

    /// Same answer as `check` without touching any record, so an expired
    /// window stays in place until the next `is_allowed`/`check`.
    pub fn status(&self, identifier: &str, action: &str) -> AttemptStatus {
        let Some(config) = self.configs.get(action) else {
            return AttemptStatus::UNMETERED;
        };
        let now = self.clock.now();
        let map = self.lock();
        AttemptStatus::of(map.get(&Self::key(identifier, action)), config, now)
    }

    /// Time left on an active block, zero when not blocked.
    pub fn time_until_unblocked(&self, identifier: &str, action: &str) -> Duration {
        let now = self.clock.now();
        let map = self.lock();
        map.get(&Self::key(identifier, action))
            .and_then(|record| record.blocked_until)
            .and_then(|until| (until - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Failures left before a block. `None` means the action is unmetered.
    pub fn remaining_attempts(&self, identifier: &str, action: &str) -> Option<u32> {
        let config = self.configs.get(action)?;
        let map = self.lock();
        let remaining = match map.get(&Self::key(identifier, action)) {
            Some(record) => config.max_attempts.saturating_sub(record.count),
            None => config.max_attempts,
        };
        Some(remaining)
    }

    /// Administrative override: forget everything about the pair.
    pub fn reset_attempts(&self, identifier: &str, action: &str) {
        let removed = self.lock().remove(&Self::key(identifier, action));
        if removed.is_some() {
            log::info!("Reset attempts for '{identifier}' on '{action}'");
        }
    }

    /// Current record, if any.
    pub fn record(&self, identifier: &str, action: &str) -> Option<AttemptRecord> {
        self.lock().get(&Self::key(identifier, action)).cloned()
    }

    /// Per configured action: its limits, how many records exist and how many
    /// of them are blocked right now.
    pub fn stats(&self) -> BTreeMap<String, ActionStats> {
        let now = self.clock.now();
        let map = self.lock();

        let mut stats: BTreeMap<String, ActionStats> = self
            .configs
            .iter()
            .map(|(action, config)| {
                (
                    action.clone(),
                    ActionStats {
                        config: *config,
                        total_records: 0,
                        blocked_records: 0,
                    },
                )
            })
            .collect();

        for ((_, action), record) in map.iter() {
            if let Some(entry) = stats.get_mut(action) {
                entry.total_records += 1;
                if record.is_blocked_at(now) {
                    entry.blocked_records += 1;
                }
            }
        }
        stats
    }

    pub fn record_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop records whose last attempt is older than `max_age`, blocked or not.
    /// Returns how many were removed.
    pub fn cleanup_stale(&self, max_age: TimeDelta) -> usize {
        let now = self.clock.now();
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, record| now - record.last_attempt <= max_age);
        before - map.len()
    }
}
