//! Structural-ambiguity witnesses.

use serde::{Deserialize, Serialize};

use crate::nfa::StateId;

/// How badly backtracking can blow up on the witnessed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// The divergence recurs inside a loop: doubling the pump multiplies
    /// the number of distinct explorations.
    Exponential,
    /// Chained loop-transfer ambiguity: cost grows as `n^degree`.
    Polynomial { degree: u32 },
}

/// Evidence that two distinct paths consume the same input and meet.
///
/// `pair_path` is the joint walk through the self-product: each element is
/// the pair of states the two divergent paths occupy after consuming one
/// more character of `pump`. Reading either component column-wise yields one
/// of the two divergent transition sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityWitness {
    pub kind: AmbiguityKind,
    /// State where pumping starts; the attack prefix drives the matcher here.
    pub entry: StateId,
    /// State the pump leaves the matcher in; the failing suffix is chosen
    /// against this state's continuations.
    pub exit: StateId,
    /// The word whose repetition amplifies the ambiguity.
    pub pump: String,
    /// Joint product-walk evidence for the divergent path pair.
    pub pair_path: Vec<(StateId, StateId)>,
}

impl AmbiguityWitness {
    /// Degree used for threshold comparison; exponential sorts above any
    /// polynomial.
    #[must_use]
    pub fn effective_degree(&self) -> u32 {
        match self.kind {
            AmbiguityKind::Exponential => u32::MAX,
            AmbiguityKind::Polynomial { degree } => degree,
        }
    }
}
