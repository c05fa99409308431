//! Shared test infrastructure.
//!
//! Rate limiter tests run against a `ManualClock` so windows and blocks can be
//! crossed without sleeping.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use storefront_guard::auth::clock::ManualClock;
use storefront_guard::auth::rate_limit::{self, RateLimiter};

pub const CLIENT_IP: &str = "203.0.113.7";
pub const OTHER_IP: &str = "198.51.100.23";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid start time")
}

/// Limiter with the storefront's action table and a clock under test control.
pub fn setup_limiter() -> (RateLimiter, ManualClock) {
    let clock = ManualClock::new(start_time());
    let limiter = RateLimiter::with_configs(rate_limit::default_configs(), Arc::new(clock.clone()));
    (limiter, clock)
}

pub fn fail_times(limiter: &RateLimiter, identifier: &str, action: &str, times: u32) {
    for _ in 0..times {
        limiter.record_attempt(identifier, action, false);
    }
}
