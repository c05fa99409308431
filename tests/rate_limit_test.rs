//! Rate limiter tests: blocking thresholds, sliding windows, resets, stats and
//! the stale-record sweep.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use storefront_guard::auth::clock::{Clock, ManualClock};
use storefront_guard::auth::rate_limit::{
    ACTION_FORGOT_PASSWORD, ACTION_LOGIN, ACTION_REGISTER, AttemptStatus, RateLimitConfig,
    RateLimiter,
};
use common::*;

const THIRTY_MINUTES_MS: u128 = 30 * 60 * 1000;

#[test]
fn test_fresh_identifier_is_allowed_with_full_budget() {
    let (limiter, _clock) = setup_limiter();

    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(5));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_REGISTER), Some(3));
    assert_eq!(limiter.time_until_unblocked(CLIENT_IP, ACTION_LOGIN), Duration::ZERO);
}

#[test]
fn test_login_blocks_after_five_failures() {
    let (limiter, _clock) = setup_limiter();

    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 4);
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(1));

    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, false);
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(0));

    let wait = limiter.time_until_unblocked(CLIENT_IP, ACTION_LOGIN);
    assert!(wait > Duration::ZERO);
    assert!(wait.as_millis() <= THIRTY_MINUTES_MS);
}

#[test]
fn test_block_counts_down_with_time() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    clock.advance(TimeDelta::minutes(10));
    assert_eq!(
        limiter.time_until_unblocked(CLIENT_IP, ACTION_LOGIN),
        Duration::from_secs(20 * 60)
    );
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
}

#[test]
fn test_block_expires_and_window_starts_over() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    clock.advance(TimeDelta::minutes(30));
    assert_eq!(limiter.time_until_unblocked(CLIENT_IP, ACTION_LOGIN), Duration::ZERO);
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert!(limiter.record(CLIENT_IP, ACTION_LOGIN).is_none());
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(5));
}

#[test]
fn test_register_blocks_after_three_failures_for_an_hour() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_REGISTER, 3);

    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_REGISTER));
    assert_eq!(
        limiter.time_until_unblocked(CLIENT_IP, ACTION_REGISTER),
        Duration::from_secs(60 * 60)
    );

    clock.advance(TimeDelta::minutes(59));
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_REGISTER));
}

#[test]
fn test_forgot_password_is_metered() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_FORGOT_PASSWORD, 3);
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_FORGOT_PASSWORD));
}

#[test]
fn test_success_resets_all_failures() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 4);

    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, true);

    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(5));
    assert!(limiter.record(CLIENT_IP, ACTION_LOGIN).is_none());
}

#[test]
fn test_sliding_window_resets_through_is_allowed() {
    let (limiter, clock) = setup_limiter();
    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, false);

    clock.advance(TimeDelta::minutes(15) + TimeDelta::seconds(1));
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert!(limiter.record(CLIENT_IP, ACTION_LOGIN).is_none());

    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, false);
    let record = limiter.record(CLIENT_IP, ACTION_LOGIN).expect("record after failure");
    assert_eq!(record.count, 1);
    assert_eq!(record.first_attempt, clock.now());
}

#[test]
fn test_window_boundary_is_exclusive() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 2);

    // Exactly at the window edge the record is still current.
    clock.advance(TimeDelta::minutes(15));
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.record(CLIENT_IP, ACTION_LOGIN).map(|r| r.count), Some(2));
}

#[test]
fn test_stale_record_keeps_counting_without_is_allowed() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 4);

    // Past the window, but only record_attempt is called: no reset happens.
    clock.advance(TimeDelta::minutes(16));
    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, false);

    let record = limiter.record(CLIENT_IP, ACTION_LOGIN).expect("record");
    assert_eq!(record.count, 5);
    assert!(record.blocked_until.is_some());
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
}

#[test]
fn test_failures_while_blocked_extend_the_block() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    clock.advance(TimeDelta::minutes(10));
    limiter.record_attempt(CLIENT_IP, ACTION_LOGIN, false);

    assert_eq!(
        limiter.time_until_unblocked(CLIENT_IP, ACTION_LOGIN),
        Duration::from_secs(30 * 60)
    );
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(0));
}

#[test]
fn test_unconfigured_action_is_never_limited() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, "newsletter-signup", 50);

    assert!(limiter.is_allowed(CLIENT_IP, "newsletter-signup"));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, "newsletter-signup"), None);
    assert_eq!(limiter.time_until_unblocked(CLIENT_IP, "newsletter-signup"), Duration::ZERO);
    assert!(limiter.record(CLIENT_IP, "newsletter-signup").is_none());
    assert_eq!(limiter.record_count(), 0);
}

#[test]
fn test_identifiers_and_actions_are_independent() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert!(limiter.is_allowed(OTHER_IP, ACTION_LOGIN));
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_REGISTER));
}

#[test]
fn test_reset_attempts_lifts_block() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    limiter.reset_attempts(CLIENT_IP, ACTION_LOGIN);
    assert!(limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
    assert_eq!(limiter.remaining_attempts(CLIENT_IP, ACTION_LOGIN), Some(5));

    // Resetting an unknown pair is harmless.
    limiter.reset_attempts(OTHER_IP, "unknown-action");
}

#[test]
fn test_stats_count_records_and_blocks() {
    let (limiter, _clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);
    fail_times(&limiter, OTHER_IP, ACTION_LOGIN, 1);
    fail_times(&limiter, OTHER_IP, ACTION_REGISTER, 1);
    fail_times(&limiter, OTHER_IP, "unmetered", 3);

    let stats = limiter.stats();
    assert_eq!(stats.len(), 3);

    let login = &stats[ACTION_LOGIN];
    assert_eq!(login.total_records, 2);
    assert_eq!(login.blocked_records, 1);
    assert_eq!(login.config.max_attempts, 5);
    assert_eq!(login.config.window, TimeDelta::minutes(15));
    assert_eq!(login.config.block_duration, TimeDelta::minutes(30));

    assert_eq!(stats[ACTION_REGISTER].total_records, 1);
    assert_eq!(stats[ACTION_REGISTER].blocked_records, 0);
    assert_eq!(stats[ACTION_FORGOT_PASSWORD].total_records, 0);
}

#[test]
fn test_cleanup_removes_only_records_idle_past_max_age() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    clock.advance(TimeDelta::hours(23));
    fail_times(&limiter, OTHER_IP, ACTION_LOGIN, 1);

    clock.advance(TimeDelta::hours(2));
    let removed = limiter.cleanup_stale(TimeDelta::hours(24));

    assert_eq!(removed, 1);
    assert!(limiter.record(CLIENT_IP, ACTION_LOGIN).is_none());
    assert!(limiter.record(OTHER_IP, ACTION_LOGIN).is_some());
}

#[test]
fn test_cleanup_on_empty_or_pruned_set_is_noop() {
    let (limiter, clock) = setup_limiter();
    assert_eq!(limiter.cleanup_stale(TimeDelta::hours(24)), 0);

    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 1);
    clock.advance(TimeDelta::hours(25));
    assert_eq!(limiter.cleanup_stale(TimeDelta::hours(24)), 1);
    assert_eq!(limiter.cleanup_stale(TimeDelta::hours(24)), 0);
    assert_eq!(limiter.record_count(), 0);
}

#[test]
fn test_clones_share_state() {
    let limiter = RateLimiter::new();
    let handle = limiter.clone();
    fail_times(&handle, CLIENT_IP, ACTION_LOGIN, 5);
    assert!(!limiter.is_allowed(CLIENT_IP, ACTION_LOGIN));
}

#[test]
fn test_concurrent_failures_are_all_counted() {
    let (limiter, _clock) = setup_limiter();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            std::thread::spawn(move || fail_times(&limiter, CLIENT_IP, ACTION_REGISTER, 25))
        })
        .collect();
    for t in threads {
        t.join().expect("worker thread");
    }

    assert_eq!(limiter.record(CLIENT_IP, ACTION_REGISTER).map(|r| r.count), Some(200));
}

#[test]
fn test_status_reads_everything_without_resetting() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 5);

    clock.advance(TimeDelta::minutes(10));
    assert_eq!(
        limiter.status(CLIENT_IP, ACTION_LOGIN),
        AttemptStatus {
            allowed: false,
            remaining_attempts: Some(0),
            retry_after: Duration::from_secs(20 * 60),
        }
    );

    // Block over and window elapsed: allowed, but the record is left alone.
    clock.advance(TimeDelta::minutes(21));
    let status = limiter.status(CLIENT_IP, ACTION_LOGIN);
    assert!(status.allowed);
    assert_eq!(status.retry_after, Duration::ZERO);
    assert_eq!(limiter.record(CLIENT_IP, ACTION_LOGIN).map(|r| r.count), Some(5));
}

#[test]
fn test_check_resets_expired_window_like_is_allowed() {
    let (limiter, clock) = setup_limiter();
    fail_times(&limiter, CLIENT_IP, ACTION_LOGIN, 3);

    assert_eq!(limiter.check(CLIENT_IP, ACTION_LOGIN).remaining_attempts, Some(2));

    clock.advance(TimeDelta::minutes(16));
    assert_eq!(
        limiter.check(CLIENT_IP, ACTION_LOGIN),
        AttemptStatus {
            allowed: true,
            remaining_attempts: Some(5),
            retry_after: Duration::ZERO,
        }
    );
    assert!(limiter.record(CLIENT_IP, ACTION_LOGIN).is_none());

    let unmetered = limiter.check(CLIENT_IP, "newsletter-signup");
    assert!(unmetered.allowed);
    assert_eq!(unmetered.remaining_attempts, None);
}

#[test]
fn test_huge_block_duration_saturates_instead_of_panicking() {
    let limiter = RateLimiter::with_configs(
        HashMap::from([(
            "export".to_string(),
            RateLimitConfig::new(1, TimeDelta::minutes(1), TimeDelta::MAX),
        )]),
        Arc::new(ManualClock::new(start_time())),
    );

    fail_times(&limiter, CLIENT_IP, "export", 2);

    assert!(!limiter.is_allowed(CLIENT_IP, "export"));
    let record = limiter.record(CLIENT_IP, "export").expect("record");
    assert_eq!(record.blocked_until, Some(DateTime::<Utc>::MAX_UTC));
    assert!(limiter.time_until_unblocked(CLIENT_IP, "export") > Duration::ZERO);
}
