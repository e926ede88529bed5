//! Static ReDoS detection and attack-string synthesis.
//!
//! Given a regex pattern written for a PCRE-like backtracking engine
//! (Python's `re` dialect), this crate decides whether an adversarial input
//! can force superlinear matching time, and if so synthesizes a concrete
//! attack string together with the measured step growth that proves it.
//!
//! The pipeline behind [`check`]:
//!
//! 1. **Parse** the pattern into a regex AST ([`parser`]).
//! 2. **Build** a priority-ordered Thompson NFA ([`nfa`]).
//! 3. **Analyze** an epsilon-free projection for structural ambiguity —
//!    two distinct ways to consume the same input — via product-automaton
//!    search ([`analysis`]).
//! 4. **Synthesize** a `prefix + pump × k + suffix` attack and verify it
//!    empirically against a real backtracking matcher ([`attack`]).
//!
//! Every stage runs under one step/deadline budget with cooperative
//! cancellation; a truncated search reports [`UnknownReason::Timeout`],
//! never a false `Safe`.
//!
//! ```
//! use redos_engine::{check, Config, CheckResult, Pattern};
//!
//! let result = check(&Pattern::from("^(a+)+$"), &Config::default());
//! assert!(result.is_vulnerable());
//!
//! let result = check(&Pattern::from("^[a-z]+$"), &Config::default());
//! assert!(result.is_safe());
//! ```

pub mod analysis;
pub mod attack;
pub mod budget;
pub mod engine;
pub mod error;
pub mod nfa;
pub mod parser;
pub mod pattern;
pub mod report;

pub use analysis::{AmbiguityKind, AmbiguityWitness};
pub use attack::{AttackString, TimingEvidence};
pub use budget::CancelToken;
pub use engine::{check, check_all, check_with_cancel, CheckResult, Config, Severity, UnknownReason};
pub use error::SyntaxError;
pub use pattern::{Flags, Pattern};
pub use report::{handle, CheckReport, CheckRequest, ReportStatus};
