//! Engine facade: one call in, one classified result out.
//!
//! `check` orchestrates parse → build → analyze → synthesize under a single
//! budget and never fails outward: syntax errors, timeouts, unsupported
//! constructs, internal caps, and even panics all land in [`CheckResult`].
//!
//! Calls are self-contained — no shared mutable state — so any number of
//! checks may run concurrently. [`check_all`] fans a batch out across a
//! rayon pool, one pattern per task.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{self, AmbiguityKind, SearchAutomaton};
use crate::attack::{self, AttackString, TimingEvidence};
use crate::budget::{Budget, CancelToken, Interrupt};
use crate::error::RedosError;
use crate::nfa;
use crate::parser;
use crate::pattern::Pattern;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine tuning knobs. All defaults are deliberate over-approximation /
/// budget tradeoffs, tunable per call; the process-wide default is
/// immutable after start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Overall wall-clock deadline for one check, milliseconds.
    pub timeout_ms: u64,
    /// Bounded repeats are unrolled up to this many copies, then abstracted
    /// as unbounded.
    pub unroll_limit: u32,
    /// Polynomial degree at which ambiguity counts as vulnerable
    /// (2 = flag quadratic and worse).
    pub polynomial_degree_threshold: u32,
    /// Largest pump count used while verifying an attack.
    pub max_pump_count: u32,
    /// Step budget for the product-automaton searches.
    pub max_search_steps: u64,
    /// Step cap per verification simulation run.
    pub max_simulation_steps: u64,
    /// Cap on compiled automaton states.
    pub max_states: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            unroll_limit: 16,
            polynomial_degree_threshold: 2,
            max_pump_count: 64,
            max_search_steps: 200_000,
            max_simulation_steps: 250_000,
            max_states: 2_500,
        }
    }
}

static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default);

impl Config {
    /// The shared process default (read-only).
    #[must_use]
    pub fn global_default() -> &'static Config {
        &DEFAULT_CONFIG
    }
}

// ---------------------------------------------------------------------------
// Result taxonomy
// ---------------------------------------------------------------------------

/// How bad a confirmed vulnerability is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Exponential,
    Polynomial { degree: u32 },
}

impl From<AmbiguityKind> for Severity {
    fn from(kind: AmbiguityKind) -> Self {
        match kind {
            AmbiguityKind::Exponential => Severity::Exponential,
            AmbiguityKind::Polynomial { degree } => Severity::Polynomial { degree },
        }
    }
}

/// Why the engine could not give a definite answer.
///
/// `Timeout` MUST NOT be treated as safe by callers: the search was
/// truncated, not completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    Timeout,
    UnsupportedConstruct,
    InternalLimitExceeded,
}

/// The total outcome of one `check` call. Never partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckResult {
    /// No exploitable ambiguity found within budget.
    Safe,
    /// Ambiguity found and an attack string empirically verified.
    Vulnerable {
        severity: Severity,
        attack: AttackString,
        evidence: TimingEvidence,
    },
    /// Analysis inconclusive; see the reason.
    Unknown {
        reason: UnknownReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// The pattern does not parse under the supported dialect.
    SyntaxError { position: usize, message: String },
}

impl CheckResult {
    #[must_use]
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, CheckResult::Vulnerable { .. })
    }

    #[must_use]
    pub fn is_safe(&self) -> bool {
        matches!(self, CheckResult::Safe)
    }

    fn unknown(reason: UnknownReason, detail: impl Into<String>) -> Self {
        CheckResult::Unknown {
            reason,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Check one pattern with the given configuration.
#[must_use]
pub fn check(pattern: &Pattern, config: &Config) -> CheckResult {
    check_with_cancel(pattern, config, None)
}

/// Check one pattern with an optional cancellation token. Cancellation is
/// observed at the same granularity as the internal deadline checks and
/// reported as a timeout.
#[must_use]
pub fn check_with_cancel(
    pattern: &Pattern,
    config: &Config,
    cancel: Option<CancelToken>,
) -> CheckResult {
    // The pipeline must never leak a fault: an unexpected panic becomes an
    // inconclusive result with the message attached for logging.
    let outcome = catch_unwind(AssertUnwindSafe(|| check_inner(pattern, config, cancel)));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unidentified panic".to_string());
            warn!(pattern = %pattern.source, detail, "internal fault contained");
            CheckResult::unknown(UnknownReason::InternalLimitExceeded, detail)
        }
    }
}

/// Check a batch of independent patterns in parallel. Result order matches
/// input order.
#[must_use]
pub fn check_all(patterns: &[Pattern], config: &Config) -> Vec<CheckResult> {
    let results: Vec<CheckResult> = patterns
        .par_iter()
        .map(|pattern| check(pattern, config))
        .collect();
    let vulnerable = results.iter().filter(|r| r.is_vulnerable()).count();
    info!(
        total = results.len(),
        vulnerable, "batch check complete"
    );
    results
}

fn check_inner(pattern: &Pattern, config: &Config, cancel: Option<CancelToken>) -> CheckResult {
    let ast = match parser::parse(&pattern.source, pattern.flags) {
        Ok(ast) => ast,
        Err(e) => {
            return CheckResult::SyntaxError {
                position: e.position,
                message: e.message,
            };
        }
    };

    let mut budget = Budget::new(
        config.max_search_steps,
        Some(Duration::from_millis(config.timeout_ms)),
        cancel,
    );
    // A caller may cancel before the call even starts; bail without work.
    if let Err(interrupt) = budget.check_clock() {
        return interrupted(interrupt);
    }

    let automaton = match nfa::build(&ast, config.unroll_limit, config.max_states as usize) {
        Ok(aut) => aut,
        Err(e) => {
            return CheckResult::unknown(UnknownReason::InternalLimitExceeded, e.to_string());
        }
    };
    debug!(
        pattern = %pattern.source,
        states = automaton.state_count(),
        guards = automaton.has_guards,
        "automaton built"
    );

    let search = match SearchAutomaton::build(&automaton, &mut budget) {
        Ok(search) => search,
        Err(interrupt) => return interrupted(interrupt),
    };

    let witness = match analysis::analyze(&search, config.polynomial_degree_threshold, &mut budget)
    {
        Ok(witness) => witness,
        Err(interrupt) => return interrupted(interrupt),
    };

    let Some(witness) = witness else {
        // A clean search is only a safety proof when every path was
        // analyzable; guards hide paths from the analyzer.
        if automaton.has_guards {
            return CheckResult::unknown(
                UnknownReason::UnsupportedConstruct,
                "pattern uses backreference or lookaround; ambiguity analysis is incomplete",
            );
        }
        return CheckResult::Safe;
    };

    let alphabet = automaton.alphabet();
    match attack::synthesize(
        &search,
        &witness,
        &ast,
        pattern.flags,
        &alphabet,
        config.max_pump_count,
        config.max_simulation_steps,
        &mut budget,
    ) {
        Ok((attack, evidence)) => CheckResult::Vulnerable {
            severity: witness.kind.into(),
            attack,
            evidence,
        },
        Err(RedosError::Interrupted(interrupt)) => interrupted(interrupt),
        Err(e @ RedosError::VerificationFailed(_)) => {
            if automaton.has_guards {
                CheckResult::unknown(UnknownReason::UnsupportedConstruct, e.to_string())
            } else {
                CheckResult::unknown(UnknownReason::InternalLimitExceeded, e.to_string())
            }
        }
        Err(e) => CheckResult::unknown(UnknownReason::InternalLimitExceeded, e.to_string()),
    }
}

fn interrupted(interrupt: Interrupt) -> CheckResult {
    CheckResult::unknown(UnknownReason::Timeout, interrupt.to_string())
}
