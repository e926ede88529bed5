//! Automaton construction: AST → priority-ordered NFA.

pub mod builder;
pub mod types;

pub use builder::build;
pub use types::{Automaton, GuardKind, Predicate, State, StateId, Transition};
