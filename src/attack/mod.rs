//! Attack-string synthesis and empirical verification.
//!
//! The synthesizer turns an [`AmbiguityWitness`] into a concrete attack:
//! the shortest prefix that drives the matcher to the divergence entry, the
//! witnessed pump, and a suffix chosen to make the overall match FAIL — a
//! failed match must exhaust every backtracking alternative, which is the
//! worst case.
//!
//! No witness is reported without verification: the candidate string is
//! executed at increasing pump counts and the step growth must be
//! superlinear. Structural findings the real matcher cannot reproduce (an
//! artifact of unrolling or the epsilon over-approximation) are rejected
//! here and surface as an inconclusive result, never as a finding.

pub mod simulate;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::analysis::{AmbiguityWitness, SearchAutomaton};
use crate::budget::Budget;
use crate::error::{RedosError, Result};
use crate::parser::ast::Ast;
use crate::parser::class::CharSet;
use crate::pattern::Flags;

use simulate::{Program, SimResult};

/// Growth exponent above which step counts are considered superlinear.
/// Quadratic blowup measures ~2, exponential measures far higher; linear
/// scanning with search-restarts stays near 1.
const SUPERLINEAR_BAR: f64 = 1.5;

/// A concrete witness input: `prefix + pump * count + suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackString {
    pub prefix: String,
    pub pump: String,
    /// Smallest pump count that demonstrated the growth trend.
    pub count: u32,
    pub suffix: String,
}

impl AttackString {
    /// Materialize the input for an arbitrary pump count.
    #[must_use]
    pub fn build(&self, count: u32) -> String {
        let mut out =
            String::with_capacity(self.prefix.len() + self.pump.len() * count as usize + self.suffix.len());
        out.push_str(&self.prefix);
        for _ in 0..count {
            out.push_str(&self.pump);
        }
        out.push_str(&self.suffix);
        out
    }
}

/// Step measurements backing a vulnerable verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEvidence {
    /// The two pump counts compared.
    pub pump_counts: (u32, u32),
    /// Backtracking steps measured at each count.
    pub steps: (u64, u64),
    /// `ln(steps ratio) / ln(length ratio)`; `> 1` is superlinear.
    pub growth_exponent: f64,
}

/// Synthesize and verify an attack for `witness`.
///
/// Each simulation run is bounded by its own step cap; between runs the
/// shared `budget` supplies the overall deadline and cancellation checks,
/// so the facade's timeout covers verification too.
#[allow(clippy::too_many_arguments)]
pub fn synthesize(
    search: &SearchAutomaton,
    witness: &AmbiguityWitness,
    ast: &Ast,
    flags: Flags,
    alphabet: &CharSet,
    max_pump_count: u32,
    max_simulation_steps: u64,
    budget: &mut Budget,
) -> Result<(AttackString, TimingEvidence)> {
    let prefix = search
        .shortest_word_to(witness.entry.0)
        .ok_or_else(|| RedosError::VerificationFailed("divergence entry unreachable".into()))?;
    if witness.pump.is_empty() {
        return Err(RedosError::VerificationFailed("empty pump".into()));
    }

    let program = simulate::compile(ast, flags)?;
    let ladder = pump_ladder(max_pump_count);

    for suffix in suffix_candidates(search, witness, alphabet) {
        let candidate = AttackString {
            prefix: prefix.clone(),
            pump: witness.pump.clone(),
            count: 0,
            suffix: suffix.clone(),
        };
        trace!(suffix = %suffix.escape_debug(), "trying suffix candidate");
        if let Some((count, evidence)) =
            verify_candidate(&program, &candidate, flags, &ladder, max_simulation_steps, budget)?
        {
            debug!(
                count,
                growth = evidence.growth_exponent,
                "attack verified"
            );
            return Ok((AttackString { count, ..candidate }, evidence));
        }
    }

    Err(RedosError::VerificationFailed(
        "no candidate demonstrated superlinear growth".into(),
    ))
}

/// Pump counts to measure, smallest first.
fn pump_ladder(cap: u32) -> Vec<u32> {
    let cap = cap.max(2);
    let mut ladder = Vec::new();
    let mut k = 2;
    while k < cap {
        ladder.push(k);
        k *= 2;
    }
    ladder.push(cap);
    ladder
}

/// Failure-forcing suffixes, most promising first. A character outside the
/// pattern's alphabet can never be consumed, so appending it forces the
/// matcher to exhaust its alternatives.
fn suffix_candidates(
    search: &SearchAutomaton,
    witness: &AmbiguityWitness,
    alphabet: &CharSet,
) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(ch) = alphabet.negate().representative() {
        candidates.push(ch.to_string());
    }
    if let Some(ch) = search.follow_set(witness.exit.0).negate().representative() {
        let s = ch.to_string();
        if !candidates.contains(&s) {
            candidates.push(s);
        }
    }
    candidates.push(String::new());
    candidates
}

/// Measure the ladder for one candidate; confirm on the first adjacent pair
/// whose growth exponent clears the bar.
fn verify_candidate(
    program: &Program,
    candidate: &AttackString,
    flags: Flags,
    ladder: &[u32],
    max_simulation_steps: u64,
    budget: &mut Budget,
) -> Result<Option<(u32, TimingEvidence)>> {
    let mut previous: Option<(u32, u64, f64)> = None; // (count, steps, input length)

    for &k in ladder {
        // Simulation has its own step cap; the shared budget contributes
        // the wall-clock deadline and cancellation checks between runs.
        // Full-match semantics is the adversary's best case: a partial
        // match cannot cut the attempt short, so the failing tail drives
        // the matcher through every alternative.
        budget.check_clock().map_err(RedosError::Interrupted)?;
        let input = candidate.build(k);
        let result = simulate::run_fullmatch(program, &input, flags, max_simulation_steps);

        let length = input.chars().count() as f64;
        match result {
            SimResult::LimitExceeded { steps } => {
                // The limit itself is blowup evidence: an input this short
                // exhausted the whole simulation allowance.
                let (prev_count, prev_steps) = previous
                    .map(|(c, s, _)| (c, s))
                    .unwrap_or((0, 0));
                // Finite sentinel: infinities do not survive JSON.
                let growth_exponent = previous
                    .map(|(_, s, l)| growth(s, steps, l, length))
                    .unwrap_or(f64::MAX);
                if previous.is_none() || growth_exponent >= SUPERLINEAR_BAR {
                    return Ok(Some((
                        k,
                        TimingEvidence {
                            pump_counts: (prev_count, k),
                            steps: (prev_steps, steps),
                            growth_exponent,
                        },
                    )));
                }
                // Limit hit without demonstrated growth: this candidate
                // cannot be measured any further.
                return Ok(None);
            }
            SimResult::Completed { steps, .. } => {
                if let Some((prev_count, prev_steps, prev_len)) = previous {
                    let exponent = growth(prev_steps, steps, prev_len, length);
                    if exponent >= SUPERLINEAR_BAR {
                        return Ok(Some((
                            k,
                            TimingEvidence {
                                pump_counts: (prev_count, k),
                                steps: (prev_steps, steps),
                                growth_exponent: exponent,
                            },
                        )));
                    }
                }
                previous = Some((k, steps, length));
            }
        }
    }
    Ok(None)
}

fn growth(steps_a: u64, steps_b: u64, len_a: f64, len_b: f64) -> f64 {
    if steps_a == 0 || len_a <= 0.0 || len_b <= len_a {
        return 0.0;
    }
    ((steps_b as f64) / (steps_a as f64)).ln() / (len_b / len_a).ln()
}
