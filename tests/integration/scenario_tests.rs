//! End-to-end classification scenarios.

use redos_engine::{check, CheckResult, Config, Flags, Pattern, Severity, UnknownReason};

fn classify(pattern: &str) -> CheckResult {
    check(&Pattern::from(pattern), &Config::default())
}

// =============================================================================
// Safe patterns
// =============================================================================

#[test]
fn test_empty_pattern_is_safe() {
    assert!(classify("").is_safe());
}

#[test]
fn test_plain_literal_is_safe() {
    assert!(classify("abc").is_safe());
}

#[test]
fn test_identifier_class_loop_is_safe() {
    assert!(classify("^[a-zA-Z0-9_]+$").is_safe());
}

#[test]
fn test_disjoint_alternation_is_safe() {
    assert!(classify("^(cat|dog)$").is_safe());
}

#[test]
fn test_anchored_single_repeat_is_safe() {
    assert!(classify("^a+b$").is_safe());
    assert!(classify(r"^\d{1,8}-\d{1,8}$").is_safe());
}

#[test]
fn test_realistic_safe_patterns() {
    // Patterns lifted from the kind of code a linter actually scans.
    assert!(classify(r"^\w+@\w+\.\w{2,4}$").is_safe());
    assert!(classify(r"[0-9a-f]{32}").is_safe());
    assert!(classify(r"^(GET|POST|PUT|DELETE) ").is_safe());
}

// =============================================================================
// Vulnerable patterns
// =============================================================================

#[test]
fn test_nested_plus_is_exponential_with_attack() {
    let result = classify("^(a+)+$");
    let CheckResult::Vulnerable {
        severity,
        attack,
        evidence,
    } = result
    else {
        panic!("expected vulnerable, got {result:?}");
    };
    assert_eq!(severity, Severity::Exponential);

    // The pump repeats 'a'; the suffix forces failure with a non-'a' char.
    assert!(attack.pump.contains('a'));
    assert!(!attack.suffix.is_empty());
    assert!(attack.suffix.chars().all(|c| c != 'a'));
    assert!(attack.count > 0);

    // Timing evidence must show superlinear growth.
    assert!(evidence.steps.1 > evidence.steps.0);
    assert!(evidence.growth_exponent > 1.0);
}

#[test]
fn test_overlapping_alternation_is_exponential() {
    // No anchors needed: verification measures the full-match worst case.
    let result = classify("(a|aa)+");
    let CheckResult::Vulnerable { severity, .. } = result else {
        panic!("expected vulnerable, got {result:?}");
    };
    assert_eq!(severity, Severity::Exponential);
}

#[test]
fn test_nested_star_is_exponential() {
    let result = classify("^(a*)*$");
    assert!(result.is_vulnerable(), "got {result:?}");
}

#[test]
fn test_sequential_stars_are_polynomial() {
    let result = classify("^a*a*$");
    let CheckResult::Vulnerable { severity, .. } = result else {
        panic!("expected vulnerable, got {result:?}");
    };
    assert!(
        matches!(severity, Severity::Polynomial { degree } if degree >= 2),
        "got {severity:?}"
    );
}

#[test]
fn test_classic_email_redos_shape() {
    // The well-known catastrophic shape: repeat of a group that itself
    // repeats overlapping classes.
    let result = classify(r"^([a-zA-Z0-9]+)+@");
    assert!(result.is_vulnerable(), "got {result:?}");
}

// =============================================================================
// Conservative classifications
// =============================================================================

#[test]
fn test_backreference_is_never_silently_safe() {
    let result = classify(r"(a)\1+");
    match result {
        CheckResult::Unknown { reason, .. } => {
            assert_eq!(reason, UnknownReason::UnsupportedConstruct);
        }
        CheckResult::Vulnerable { .. } => {} // conservative flagging is allowed
        other => panic!("backreference pattern must not be {other:?}"),
    }
}

#[test]
fn test_lookahead_without_findings_is_unsupported() {
    let result = classify(r"foo(?=bar)baz");
    assert!(
        matches!(
            result,
            CheckResult::Unknown {
                reason: UnknownReason::UnsupportedConstruct,
                ..
            }
        ),
        "got {result:?}"
    );
}

#[test]
fn test_syntax_errors_are_reported_with_position() {
    let CheckResult::SyntaxError { position, message } = classify("a**") else {
        panic!("expected syntax error");
    };
    assert!(position <= 3);
    assert!(message.contains("multiple repeat"));

    assert!(matches!(classify("(a"), CheckResult::SyntaxError { .. }));
    assert!(matches!(classify("[a-"), CheckResult::SyntaxError { .. }));
}

// =============================================================================
// Budget behavior
// =============================================================================

#[test]
fn test_starved_budget_reports_timeout_not_safe() {
    let config = Config {
        max_search_steps: 5,
        ..Config::default()
    };
    let result = check(&Pattern::from("^(a+)+$"), &config);
    assert!(
        matches!(
            result,
            CheckResult::Unknown {
                reason: UnknownReason::Timeout,
                ..
            }
        ),
        "a truncated search must never be safe, got {result:?}"
    );
}

#[test]
fn test_zero_timeout_reports_timeout() {
    let config = Config {
        timeout_ms: 0,
        ..Config::default()
    };
    let result = check(&Pattern::from("(x|xx)+(y|yy)+z"), &config);
    // Either the deadline fires mid-search, or the search finishes within
    // the first clock-check interval. Both are acceptable; Safe is not.
    assert!(!result.is_safe(), "got {result:?}");
}

// =============================================================================
// Flags
// =============================================================================

#[test]
fn test_case_insensitive_pattern_still_detected() {
    let pattern = Pattern::new(
        "^(A+)+$",
        Flags {
            ignore_case: true,
            ..Flags::default()
        },
    );
    let result = check(&pattern, &Config::default());
    assert!(result.is_vulnerable(), "got {result:?}");
}

#[test]
fn test_inline_flags_accepted() {
    let result = classify("(?i)^(a+)+$");
    assert!(result.is_vulnerable(), "got {result:?}");
}
