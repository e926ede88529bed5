//! Ambiguity analysis: find structural divergence in the automaton.
//!
//! The search runs on an epsilon-free multigraph projection
//! ([`SearchAutomaton`]) and looks for the two shapes that make a
//! backtracking matcher blow up:
//!
//! - a pivot state with two distinct loops over one word (exponential), and
//! - a pair of loop states bridged by a same-word transfer (polynomial).
//!
//! Every expansion ticks the shared [`Budget`]; an exhausted budget
//! surfaces as an interrupt, never as a clean "no ambiguity" answer.

pub mod product;
pub mod search;
pub mod witness;

pub use search::SearchAutomaton;
pub use witness::{AmbiguityKind, AmbiguityWitness};

use tracing::debug;

use crate::budget::{Budget, Interrupt};

/// Run the full ambiguity search over a projected automaton.
///
/// `degree_threshold` is the polynomial degree at which a divergence counts
/// as a finding (degree 2 = quadratic). Divergences below the threshold are
/// reported as `None`, the same as no divergence at all.
pub fn analyze(
    search: &SearchAutomaton,
    degree_threshold: u32,
    budget: &mut Budget,
) -> Result<Option<AmbiguityWitness>, Interrupt> {
    if search.is_trivial() {
        return Ok(None);
    }

    if let Some(witness) = product::find_exponential(search, budget)? {
        debug!(pump = %witness.pump, "exponential ambiguity found");
        return Ok(Some(witness));
    }

    // Chaining past threshold + 1 cannot change the verdict.
    let degree_cap = degree_threshold.max(2) + 1;
    if let Some(witness) = product::find_polynomial(search, degree_cap, budget)? {
        if witness.effective_degree() >= degree_threshold {
            debug!(pump = %witness.pump, degree = witness.effective_degree(), "polynomial ambiguity found");
            return Ok(Some(witness));
        }
        debug!(
            degree = witness.effective_degree(),
            "polynomial ambiguity below threshold, ignored"
        );
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa;
    use crate::parser;
    use crate::pattern::Flags;

    fn analyze_pattern(pattern: &str, threshold: u32) -> Option<AmbiguityWitness> {
        let ast = parser::parse(pattern, Flags::default()).unwrap();
        let aut = nfa::build(&ast, 16, 2_500).unwrap();
        let mut budget = Budget::unlimited();
        let search = SearchAutomaton::build(&aut, &mut budget).unwrap();
        analyze(&search, threshold, &mut budget).unwrap()
    }

    #[test]
    fn empty_and_literal_patterns_are_unambiguous() {
        assert!(analyze_pattern("", 2).is_none());
        assert!(analyze_pattern("abc", 2).is_none());
    }

    #[test]
    fn exponential_beats_polynomial_in_priority() {
        // `(a+)+` is both polynomially and exponentially ambiguous; the
        // exponential finding must win.
        let witness = analyze_pattern("(a+)+", 2).unwrap();
        assert_eq!(witness.kind, AmbiguityKind::Exponential);
    }

    #[test]
    fn quadratic_respects_threshold() {
        assert!(analyze_pattern("a*a*", 2).is_some());
        // Raising the threshold above the actual degree suppresses it.
        assert!(analyze_pattern("a*a*", 4).is_none());
    }

    #[test]
    fn character_class_loop_is_unambiguous() {
        assert!(analyze_pattern("[a-zA-Z0-9_]+", 2).is_none());
    }

    #[test]
    fn budget_exhaustion_is_an_error_not_a_safe_answer() {
        let ast = parser::parse("(a+)+", Flags::default()).unwrap();
        let aut = nfa::build(&ast, 16, 2_500).unwrap();
        let mut build_budget = Budget::unlimited();
        let search = SearchAutomaton::build(&aut, &mut build_budget).unwrap();
        let mut tiny = Budget::new(2, None, None);
        assert!(analyze(&search, 2, &mut tiny).is_err());
    }
}
