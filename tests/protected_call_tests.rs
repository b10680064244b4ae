//! Integration Tests for the protected-call composition
//!
//! Breaker, throttler and retry loop driven together on a paused clock.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calendar_guard::{
    retry_classified, BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState,
    RequestThrottler, ThrottleConfig, ThrottleError,
};

// == Helper Functions ==

fn failure(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message.to_string())
}

fn breaker(threshold: u32) -> CircuitBreaker {
    CircuitBreaker::new(
        CircuitBreakerConfig::new(threshold, Duration::from_secs(30)).with_classifier(),
    )
    .unwrap()
}

// == Breaker Lifecycle ==

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_fails_fast_and_recovers() {
    let breaker = breaker(3);
    let counter = AtomicU32::new(0);
    let calls = &counter;

    for _ in 0..3 {
        let result = breaker
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(failure("HTTP 503: Service Unavailable"))
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Operation(_))));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let rejected = breaker
        .execute(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, io::Error>(())
        })
        .await
        .unwrap_err();
    assert!(rejected.is_open());
    assert_eq!(rejected.stats().map(|s| s.failure_count), Some(3));
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    tokio::time::advance(Duration::from_secs(31)).await;

    let value = breaker
        .execute(|| async { Ok::<_, io::Error>(42) })
        .await
        .unwrap();
    assert_eq!(value, 42);

    let stats = breaker.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.total_requests, 5);
}

#[tokio::test(start_paused = true)]
async fn test_validation_failures_never_open_the_circuit() {
    let breaker = breaker(2);

    for _ in 0..5 {
        let result = breaker
            .execute(|| async { Err::<(), _>(failure("invalid date format")) })
            .await;
        assert!(matches!(result, Err(BreakerError::Operation(_))));
    }

    let stats = breaker.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.total_requests, 5);
}

// == Full Composition ==

#[tokio::test(start_paused = true)]
async fn test_breaker_sees_only_the_retry_loop_outcome() {
    let breaker = breaker(1);
    let throttler = RequestThrottler::new(ThrottleConfig::default()).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let outcome = {
        let attempts = attempts.clone();
        let throttler = &throttler;
        breaker
            .execute(move || async move {
                throttler
                    .throttle(move || async move {
                        retry_classified(None, |_| {
                            let n = attempts.fetch_add(1, Ordering::SeqCst);
                            async move {
                                if n < 2 {
                                    Err(failure("read ECONNRESET"))
                                } else {
                                    Ok("payload")
                                }
                            }
                        })
                        .await
                    })
                    .await
            })
            .await
    };

    assert_eq!(outcome.unwrap(), "payload");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    // Two transient failures were absorbed; a threshold of one never tripped.
    let stats = breaker.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.success_count, 1);
    assert_eq!(throttler.stats().successful_requests, 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_rejection_is_distinguishable() {
    let throttler = Arc::new(
        RequestThrottler::new(ThrottleConfig {
            max_requests_per_second: 1.0,
            max_queue_size: 1,
            ..ThrottleConfig::default()
        })
        .unwrap(),
    );

    let slow = || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, io::Error>(())
    };

    // The first call is dispatched at once; the second waits in the queue.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let throttler = throttler.clone();
        handles.push(tokio::spawn(async move { throttler.throttle(slow).await }));
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    match throttler.throttle(slow).await {
        Err(ThrottleError::Rejected(rejection)) => {
            assert_eq!(rejection.stats().map(|s| s.current_queue_size), Some(1));
        }
        other => panic!("expected a queue rejection, got {:?}", other.map(|_| ())),
    }
    assert_eq!(throttler.stats().dropped_requests, 1);

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
