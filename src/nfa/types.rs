//! Priority-ordered NFA types.
//!
//! The automaton is a Thompson construction with one twist: the order of a
//! state's outgoing transitions is meaningful. It encodes the backtracking
//! engine's preference (first alternative first, greedy repeat before exit)
//! and is preserved so that synthesized witnesses reproduce real matcher
//! behavior. Ambiguity detection itself never looks at the order.

use serde::{Deserialize, Serialize};

use crate::parser::ast::LookKind;
use crate::parser::class::CharSet;

/// Index of a state inside its automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Constructs the automaton cannot express; carried as opaque transitions
/// whose satisfiability is unknown to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Backreference(u32),
    Lookaround(LookKind),
}

/// What a transition consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Consumes nothing. Anchors also compile to epsilon; the verification
    /// step re-checks their real semantics.
    Epsilon,
    /// Consumes one character from the set.
    Chars(CharSet),
    /// Consumes nothing; semantics opaque to the analyzer.
    Guard(GuardKind),
}

/// A tagged transition. Priority is positional: a transition earlier in its
/// state's vector outranks a later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub pred: Predicate,
    pub target: StateId,
}

/// A single NFA state. Its id is its index in [`Automaton::states`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub transitions: Vec<Transition>,
}

/// The compiled automaton.
///
/// Invariants: exactly one start and one accept state; the accept state has
/// no outgoing transitions; transition order is deterministic for
/// structurally equal input ASTs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automaton {
    pub states: Vec<State>,
    pub start: StateId,
    pub accept: StateId,
    /// True if any guard transition exists (backreference / lookaround).
    pub has_guards: bool,
}

impl Automaton {
    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn transitions(&self, id: StateId) -> &[Transition] {
        &self.states[id.index()].transitions
    }

    /// Union of every character set consumed anywhere in the automaton.
    #[must_use]
    pub fn alphabet(&self) -> CharSet {
        let mut alphabet = CharSet::empty();
        for state in &self.states {
            for t in &state.transitions {
                if let Predicate::Chars(set) = &t.pred {
                    alphabet = alphabet.union(set);
                }
            }
        }
        alphabet
    }
}
