use std::time::Duration;

use docgate::application::services::{RateDecision, RateLimiter};

#[test]
fn given_limit_of_two_when_three_rapid_calls_then_third_is_limited() {
    let limiter = RateLimiter::new(2, Duration::from_secs(60));

    assert!(limiter.allow("10.0.0.1").is_allowed());
    assert!(limiter.allow("10.0.0.1").is_allowed());
    let third = limiter.allow("10.0.0.1");

    assert!(!third.is_allowed());
    assert!(third.retry_after_secs() >= 1);
    assert!(third.retry_after_secs() <= 60);
}

#[test]
fn given_limited_client_when_other_client_calls_then_other_is_allowed() {
    let limiter = RateLimiter::new(1, Duration::from_secs(60));
    limiter.allow("a");

    assert!(!limiter.allow("a").is_allowed());
    assert!(limiter.allow("b").is_allowed());
}

#[test]
fn given_window_elapsed_when_calling_again_then_allowed() {
    let limiter = RateLimiter::new(1, Duration::from_millis(30));
    assert!(limiter.allow("c").is_allowed());
    assert!(!limiter.allow("c").is_allowed());

    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(limiter.allow("c"), RateDecision::Allowed);
}

#[test]
fn given_zero_max_requests_when_calling_then_always_allowed() {
    let limiter = RateLimiter::new(0, Duration::from_secs(60));

    assert!(!limiter.is_enabled());
    for _ in 0..100 {
        assert!(limiter.allow("x").is_allowed());
    }
}

#[test]
fn given_zero_window_when_calling_then_always_allowed() {
    let limiter = RateLimiter::new(1, Duration::ZERO);

    assert!(limiter.allow("x").is_allowed());
    assert!(limiter.allow("x").is_allowed());
}

#[test]
fn given_many_idle_clients_when_threshold_exceeded_then_stale_buckets_are_purged() {
    let limiter = RateLimiter::with_purge_threshold(5, Duration::from_millis(20), 2);
    limiter.allow("a");
    limiter.allow("b");
    limiter.allow("c");
    assert_eq!(limiter.tracked_clients(), 3);

    std::thread::sleep(Duration::from_millis(40));
    limiter.allow("d");

    assert_eq!(limiter.tracked_clients(), 1);
}

#[test]
fn given_sweep_left_live_clients_when_calling_again_then_no_sweep_until_table_doubles() {
    let limiter = RateLimiter::with_purge_threshold(5, Duration::from_millis(50), 2);
    for client in ["a", "b", "c"] {
        limiter.allow(client);
    }
    // Sweeps with all three still live, so the next sweep waits for more than 6.
    limiter.allow("d");
    assert_eq!(limiter.tracked_clients(), 4);

    std::thread::sleep(Duration::from_millis(80));
    limiter.allow("e");
    limiter.allow("f");
    limiter.allow("g");
    assert_eq!(limiter.tracked_clients(), 7);

    limiter.allow("h");
    assert_eq!(limiter.tracked_clients(), 4);
}
