//! Error types for the ReDoS engine.

use thiserror::Error;

use crate::budget::Interrupt;

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

/// A pattern failed to parse under the supported dialect subset.
///
/// Positions are character offsets into the pattern source, 0-indexed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at position {position}: {message}")]
pub struct SyntaxError {
    /// Character offset where the error was detected.
    pub position: usize,
    /// Human-readable description of the problem.
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Internal error type threaded through the analysis pipeline.
///
/// None of these escape the facade: `check` maps every variant into the
/// public result taxonomy.
#[derive(Error, Debug)]
pub enum RedosError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The automaton grew past the configured state cap.
    #[error("automaton exceeded {limit} states while compiling pattern")]
    StateLimit { limit: usize },

    /// The verification program grew past its instruction cap.
    #[error("verification program exceeded {limit} instructions")]
    ProgramLimit { limit: usize },

    /// Search or simulation was interrupted by the budget.
    #[error(transparent)]
    Interrupted(#[from] Interrupt),

    /// A synthesized witness failed empirical verification.
    #[error("witness failed verification: {0}")]
    VerificationFailed(String),
}

pub type Result<T> = std::result::Result<T, RedosError>;
