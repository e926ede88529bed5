//! Cross-cutting properties: determinism, growth trends, empirical bounds.

use redos_engine::attack::simulate;
use redos_engine::{check, parser, CheckResult, Config, Flags, Pattern};

/// Measure total backtracking steps for `pattern` against `input`.
fn measure_steps(pattern: &str, input: &str) -> u64 {
    let flags = Flags::default();
    let ast = parser::parse(pattern, flags).expect("pattern parses");
    let program = simulate::compile(&ast, flags).expect("pattern compiles");
    simulate::run_search(&program, input, flags, u64::MAX).steps()
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_check_is_deterministic_across_calls() {
    let config = Config::default();
    for source in [
        "",
        "abc",
        "^(a+)+$",
        "(a|aa)+$",
        "^a*a*$",
        "^[a-zA-Z0-9_]+$",
        r"(a)\1+",
        "a**",
    ] {
        let pattern = Pattern::from(source);
        let first = check(&pattern, &config);
        let second = check(&pattern, &config);
        assert_eq!(first, second, "non-deterministic result for {source:?}");
    }
}

#[test]
fn test_attack_structure_is_stable() {
    let config = Config::default();
    let pattern = Pattern::from("^(a+)+$");
    let results: Vec<CheckResult> = (0..3).map(|_| check(&pattern, &config)).collect();
    let attacks: Vec<_> = results
        .iter()
        .map(|r| match r {
            CheckResult::Vulnerable { attack, .. } => attack.clone(),
            other => panic!("expected vulnerable, got {other:?}"),
        })
        .collect();
    assert_eq!(attacks[0], attacks[1]);
    assert_eq!(attacks[1], attacks[2]);
}

// =============================================================================
// Growth trends
// =============================================================================

#[test]
fn test_vulnerable_attack_grows_superlinearly_beyond_reported_count() {
    let config = Config::default();
    let CheckResult::Vulnerable { attack, .. } = check(&Pattern::from("^(a+)+$"), &config) else {
        panic!("expected vulnerable");
    };

    // Step counts at k, k+2, k+4 pumps: each increment must multiply the
    // cost, not add to it (ratio increases with k).
    let k = 8;
    let s0 = measure_steps("^(a+)+$", &attack.build(k));
    let s1 = measure_steps("^(a+)+$", &attack.build(k + 2));
    let s2 = measure_steps("^(a+)+$", &attack.build(k + 4));

    assert!(s1 > s0 && s2 > s1, "steps not increasing: {s0} {s1} {s2}");
    let r1 = s1 as f64 / s0 as f64;
    let r2 = s2 as f64 / s1 as f64;
    assert!(r1 > 1.5, "first ratio not superlinear: {r1}");
    assert!(r2 >= r1 * 0.9, "growth ratio collapsed: {r1} then {r2}");
}

#[test]
fn test_safe_pattern_stays_within_polynomial_bound() {
    // Sample increasing lengths; a safe loop must scale close to linearly.
    let mut last = 0u64;
    for n in [64usize, 128, 256] {
        let input = format!("{}!", "a".repeat(n));
        let steps = measure_steps("^[a-zA-Z0-9_]+$", &input);
        if last > 0 {
            assert!(
                steps < last * 4,
                "safe pattern grew superlinearly: {last} -> {steps} at n={n}"
            );
        }
        last = steps;
    }
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_results_round_trip_through_json() {
    let config = Config::default();
    for source in ["abc", "^(a+)+$", r"(a)\1", "a**"] {
        let result = check(&Pattern::from(source), &config);
        let json = serde_json::to_string(&result).expect("serializes");
        let back: CheckResult = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(result, back, "round trip changed result for {source:?}");
    }
}
