//! Regex AST definitions.

use serde::{Deserialize, Serialize};

use super::class::CharSet;

/// Zero-width assertion kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// `^` — start of input, or after a newline in multiline mode.
    LineStart,
    /// `$` — end of input, before a trailing newline, or before any newline
    /// in multiline mode.
    LineEnd,
    /// `\A` — start of input only.
    InputStart,
    /// `\Z` — end of input only.
    InputEnd,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

/// Lookaround kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookKind {
    Ahead,
    AheadNegative,
    Behind,
    BehindNegative,
}

/// A node in the regex syntax tree.
///
/// Alternation children are ordered — that order IS the backtracking
/// priority. Named groups are resolved to indices during parsing, so
/// backreferences always carry a group index here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexNode {
    /// Matches the empty string.
    Empty,
    /// One character drawn from a normalized set (literals, classes, `.`,
    /// shorthand classes all normalize to this).
    Chars(CharSet),
    Concat(Vec<RegexNode>),
    Alternation(Vec<RegexNode>),
    Repeat {
        node: Box<RegexNode>,
        min: u32,
        /// `None` = unbounded.
        max: Option<u32>,
        greedy: bool,
    },
    Group {
        node: Box<RegexNode>,
        /// Capture index (1-based); `None` for non-capturing groups.
        index: Option<u32>,
    },
    Anchor(AnchorKind),
    Backreference(u32),
    Look {
        kind: LookKind,
        node: Box<RegexNode>,
    },
}

impl RegexNode {
    /// True if the subtree contains a construct the automaton can only
    /// model as an opaque guard (backreference or lookaround).
    #[must_use]
    pub fn has_guards(&self) -> bool {
        match self {
            RegexNode::Backreference(_) | RegexNode::Look { .. } => true,
            RegexNode::Empty | RegexNode::Chars(_) | RegexNode::Anchor(_) => false,
            RegexNode::Concat(children) | RegexNode::Alternation(children) => {
                children.iter().any(RegexNode::has_guards)
            }
            RegexNode::Repeat { node, .. } | RegexNode::Group { node, .. } => node.has_guards(),
        }
    }
}

/// A parsed pattern: the tree plus capture-group bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ast {
    pub root: RegexNode,
    /// Number of capturing groups (named groups included).
    pub group_count: u32,
}
