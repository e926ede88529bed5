//! Concurrency, batching, and cancellation behavior.

use std::sync::Arc;
use std::thread;

use redos_engine::{
    check, check_all, check_with_cancel, CancelToken, CheckResult, Config, Pattern, UnknownReason,
};

#[test]
fn test_check_all_preserves_input_order() {
    let patterns: Vec<Pattern> = vec![
        Pattern::from("^(a+)+$"),
        Pattern::from("abc"),
        Pattern::from("^(cat|dog)$"),
        Pattern::from("(a|aa)+$"),
        Pattern::from("a**"),
    ];
    let results = check_all(&patterns, &Config::default());
    assert_eq!(results.len(), 5);
    assert!(results[0].is_vulnerable());
    assert!(results[1].is_safe());
    assert!(results[2].is_safe());
    assert!(results[3].is_vulnerable());
    assert!(matches!(results[4], CheckResult::SyntaxError { .. }));
}

#[test]
fn test_concurrent_checks_share_nothing() {
    // Same config object from many threads; results must match the
    // single-threaded answers.
    let config = Arc::new(Config::default());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let source = if i % 2 == 0 { "^(a+)+$" } else { "^[a-z]+$" };
                (i, check(&Pattern::from(source), &config))
            })
        })
        .collect();
    for handle in handles {
        let (i, result) = handle.join().expect("worker panicked");
        if i % 2 == 0 {
            assert!(result.is_vulnerable(), "thread {i}: {result:?}");
        } else {
            assert!(result.is_safe(), "thread {i}: {result:?}");
        }
    }
}

#[test]
fn test_pre_cancelled_check_returns_timeout_without_work() {
    let token = CancelToken::new();
    token.cancel();
    let result = check_with_cancel(
        &Pattern::from("^(a+)+$"),
        &Config::default(),
        Some(token),
    );
    assert!(
        matches!(
            result,
            CheckResult::Unknown {
                reason: UnknownReason::Timeout,
                ..
            }
        ),
        "got {result:?}"
    );
}

#[test]
fn test_cancellation_mid_flight_is_observed() {
    // Give the engine an effectively unlimited budget so only the token can
    // stop it, then cancel from another thread.
    let config = Config {
        timeout_ms: 60_000,
        max_search_steps: u64::MAX,
        ..Config::default()
    };
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            token.cancel();
        })
    };

    // A pattern with many loop pairs but no findings keeps the polynomial
    // search busy long enough for the token to land; if the search finishes
    // first anyway, Safe is also acceptable — what is not acceptable is
    // hanging or panicking.
    let source = "a*b*c*d*e*f*g*h*i*j*k*l*m*n*o*p*q*r*s*t*u*v*w*x*y*z*";
    let result = check_with_cancel(&Pattern::from(source), &config, Some(token));
    canceller.join().unwrap();
    assert!(
        matches!(
            result,
            CheckResult::Safe
                | CheckResult::Unknown {
                    reason: UnknownReason::Timeout,
                    ..
                }
        ),
        "got {result:?}"
    );
}

#[test]
fn test_cancelling_one_check_does_not_affect_another() {
    let token = CancelToken::new();
    token.cancel();
    let cancelled = check_with_cancel(
        &Pattern::from("^(a+)+$"),
        &Config::default(),
        Some(token),
    );
    assert!(!cancelled.is_vulnerable());

    // A fresh call with no token is unaffected.
    let fresh = check(&Pattern::from("^(a+)+$"), &Config::default());
    assert!(fresh.is_vulnerable());
}
