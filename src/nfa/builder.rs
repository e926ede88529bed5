//! Thompson-style automaton construction.
//!
//! Each AST node compiles to a fragment with one entry and one exit state,
//! wired together with epsilon transitions. Bounded repeats are unrolled up
//! to the configured limit; past it the bound is abstracted to "unbounded",
//! a sound over-approximation for ambiguity detection (it can only add
//! pumpable words, never hide one).

use crate::error::{RedosError, Result};
use crate::parser::ast::{Ast, RegexNode};

use super::types::{Automaton, GuardKind, Predicate, State, StateId, Transition};

/// Compile an AST into a priority-ordered automaton.
pub fn build(ast: &Ast, unroll_limit: u32, max_states: usize) -> Result<Automaton> {
    let mut builder = Builder {
        states: Vec::new(),
        unroll_limit,
        max_states,
        has_guards: false,
    };
    let (entry, exit) = builder.fragment(&ast.root)?;
    let start = builder.add_state()?;
    let accept = builder.add_state()?;
    builder.connect_epsilon(start, entry);
    builder.connect_epsilon(exit, accept);
    Ok(Automaton {
        states: builder.states,
        start,
        accept,
        has_guards: builder.has_guards,
    })
}

struct Builder {
    states: Vec<State>,
    unroll_limit: u32,
    max_states: usize,
    has_guards: bool,
}

impl Builder {
    fn add_state(&mut self) -> Result<StateId> {
        if self.states.len() >= self.max_states {
            return Err(RedosError::StateLimit {
                limit: self.max_states,
            });
        }
        self.states.push(State::default());
        Ok(StateId((self.states.len() - 1) as u32))
    }

    fn connect(&mut self, from: StateId, pred: Predicate, to: StateId) {
        self.states[from.index()]
            .transitions
            .push(Transition { pred, target: to });
    }

    fn connect_epsilon(&mut self, from: StateId, to: StateId) {
        self.connect(from, Predicate::Epsilon, to);
    }

    /// Compile one node into an `(entry, exit)` fragment.
    fn fragment(&mut self, node: &RegexNode) -> Result<(StateId, StateId)> {
        match node {
            RegexNode::Empty => {
                let s = self.add_state()?;
                let e = self.add_state()?;
                self.connect_epsilon(s, e);
                Ok((s, e))
            }
            RegexNode::Chars(set) => {
                let s = self.add_state()?;
                let e = self.add_state()?;
                self.connect(s, Predicate::Chars(set.clone()), e);
                Ok((s, e))
            }
            RegexNode::Concat(children) => {
                let mut entry = None;
                let mut prev_exit: Option<StateId> = None;
                for child in children {
                    let (s, e) = self.fragment(child)?;
                    if let Some(pe) = prev_exit {
                        self.connect_epsilon(pe, s);
                    } else {
                        entry = Some(s);
                    }
                    prev_exit = Some(e);
                }
                match (entry, prev_exit) {
                    (Some(s), Some(e)) => Ok((s, e)),
                    _ => self.fragment(&RegexNode::Empty),
                }
            }
            RegexNode::Alternation(branches) => {
                let s = self.add_state()?;
                let e = self.add_state()?;
                // Branch order is the backtracking priority: the epsilon to
                // the first alternative is appended first.
                for branch in branches {
                    let (bs, be) = self.fragment(branch)?;
                    self.connect_epsilon(s, bs);
                    self.connect_epsilon(be, e);
                }
                Ok((s, e))
            }
            RegexNode::Group { node, .. } => self.fragment(node),
            RegexNode::Anchor(_) => {
                // Anchors consume nothing; modeled as epsilon here and
                // re-checked with real semantics during verification.
                let s = self.add_state()?;
                let e = self.add_state()?;
                self.connect_epsilon(s, e);
                Ok((s, e))
            }
            RegexNode::Backreference(index) => {
                self.has_guards = true;
                let s = self.add_state()?;
                let e = self.add_state()?;
                self.connect(s, Predicate::Guard(GuardKind::Backreference(*index)), e);
                Ok((s, e))
            }
            RegexNode::Look { kind, .. } => {
                self.has_guards = true;
                let s = self.add_state()?;
                let e = self.add_state()?;
                self.connect(s, Predicate::Guard(GuardKind::Lookaround(*kind)), e);
                Ok((s, e))
            }
            RegexNode::Repeat {
                node,
                min,
                max,
                greedy,
            } => self.repeat_fragment(node, *min, *max, *greedy),
        }
    }

    fn repeat_fragment(
        &mut self,
        node: &RegexNode,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(StateId, StateId)> {
        let clamped_min = min.min(self.unroll_limit);
        // Bounds past the unroll limit are abstracted to unbounded.
        let bounded_max = max.filter(|&m| m <= self.unroll_limit);

        if bounded_max == Some(0) {
            return self.fragment(&RegexNode::Empty);
        }

        let entry = self.add_state()?;
        let mut cursor = entry;

        // Required copies.
        for _ in 0..clamped_min {
            let (s, e) = self.fragment(node)?;
            self.connect_epsilon(cursor, s);
            cursor = e;
        }

        match bounded_max {
            Some(m) => {
                // Optional copies; every skip edge jumps to the shared exit.
                let exit = self.add_state()?;
                for _ in clamped_min..m {
                    let gate = self.add_state()?;
                    self.connect_epsilon(cursor, gate);
                    let (s, e) = self.fragment(node)?;
                    if greedy {
                        self.connect_epsilon(gate, s);
                        self.connect_epsilon(gate, exit);
                    } else {
                        self.connect_epsilon(gate, exit);
                        self.connect_epsilon(gate, s);
                    }
                    cursor = e;
                }
                self.connect_epsilon(cursor, exit);
                Ok((entry, exit))
            }
            None => {
                // Trailing star loop.
                let loop_state = self.add_state()?;
                let exit = self.add_state()?;
                self.connect_epsilon(cursor, loop_state);
                let (s, e) = self.fragment(node)?;
                if greedy {
                    self.connect_epsilon(loop_state, s);
                    self.connect_epsilon(loop_state, exit);
                } else {
                    self.connect_epsilon(loop_state, exit);
                    self.connect_epsilon(loop_state, s);
                }
                self.connect_epsilon(e, loop_state);
                Ok((entry, exit))
            }
        }
    }
}
