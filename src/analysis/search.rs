//! Epsilon-free multigraph projection of the NFA.
//!
//! Backtracking engines distinguish runs that differ only in which epsilon
//! route they took (in `(a*)*` exiting the inner loop and re-entering via
//! the outer loop is a different exploration from staying inside), so a
//! plain epsilon-closure would erase exactly the ambiguity this engine
//! exists to find. The projection therefore keeps one edge per (epsilon
//! route, character transition) pair — a multigraph whose parallel edges
//! preserve path multiplicity. Routes may revisit a state once (nested
//! loop-backs pass their loop head twice between consumptions); the
//! per-transition cap keeps enumeration finite.
//!
//! Guard transitions (backreference / lookaround) are not traversable here:
//! evidence paths never cross a guard, and the facade downgrades to an
//! unsupported-construct result when guards hide the only candidate paths.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::budget::{Budget, Interrupt};
use crate::nfa::{Automaton, Predicate, StateId};
use crate::parser::class::CharSet;

/// Parallel epsilon paths kept per character transition. Two is what
/// divergence detection needs; one spare guards against cap-order effects.
const MULTIPLICITY_CAP: u8 = 3;

/// Upper bound on outgoing edges enumerated per state.
const EDGE_CAP: usize = 512;

/// How often one state may appear on a single epsilon route. Two visits are
/// required to see an inner-exit/outer-reenter route through a shared loop
/// head; more only re-walks cycles that add no new divergence.
const EPS_REVISIT_LIMIT: u8 = 2;

/// One consuming edge of the projection.
#[derive(Debug, Clone)]
pub struct Edge {
    pub set: CharSet,
    pub target: u32,
}

/// The epsilon-free view the product searches run on.
#[derive(Debug)]
pub struct SearchAutomaton {
    /// Outgoing edges per original state id. Parallel duplicates are
    /// meaningful: each corresponds to a distinct simple epsilon route.
    edges: Vec<Vec<Edge>>,
    pub start: u32,
    /// States reachable from start through consuming edges.
    reachable: FixedBitSet,
    /// BFS character-distance from start.
    dist: Vec<Option<u32>>,
    /// BFS predecessor (state, char) for shortest-word reconstruction.
    parent: Vec<Option<(u32, char)>>,
}

impl SearchAutomaton {
    /// Project `aut` into epsilon-free form. Enumeration work ticks the
    /// budget so pathological epsilon structures cannot stall unbounded.
    pub fn build(aut: &Automaton, budget: &mut Budget) -> Result<Self, Interrupt> {
        let n = aut.state_count();
        let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); n];

        let mut visits = vec![0u8; n];
        for s in 0..n {
            visits.iter_mut().for_each(|v| *v = 0);
            let mut multiplicity = rustc_hash::FxHashMap::default();
            epsilon_dfs(
                aut,
                s as u32,
                &mut visits,
                &mut edges[s],
                &mut multiplicity,
                budget,
            )?;
        }

        let (reachable, dist, parent) = bfs_from(&edges, aut.start.0, budget)?;

        Ok(Self {
            edges,
            start: aut.start.0,
            reachable,
            dist,
            parent,
        })
    }

    #[inline]
    pub fn edges(&self, state: u32) -> &[Edge] {
        &self.edges[state as usize]
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_reachable(&self, state: u32) -> bool {
        self.reachable.contains(state as usize)
    }

    #[inline]
    pub fn distance(&self, state: u32) -> Option<u32> {
        self.dist[state as usize]
    }

    /// True if no consuming edge exists anywhere (empty or purely
    /// zero-width patterns).
    pub fn is_trivial(&self) -> bool {
        self.edges.iter().all(Vec::is_empty)
    }

    /// Shortest word driving the matcher from start to `state`.
    #[must_use]
    pub fn shortest_word_to(&self, state: u32) -> Option<String> {
        self.dist[state as usize]?;
        let mut chars = Vec::new();
        let mut cursor = state;
        while cursor != self.start {
            let (prev, ch) = self.parent[cursor as usize]?;
            chars.push(ch);
            cursor = prev;
        }
        chars.reverse();
        Some(chars.into_iter().collect())
    }

    /// Union of characters consumable from `state`.
    #[must_use]
    pub fn follow_set(&self, state: u32) -> CharSet {
        let mut set = CharSet::empty();
        for edge in &self.edges[state as usize] {
            set = set.union(&edge.set);
        }
        set
    }

    /// States reachable from `from` through consuming edges.
    pub fn reachable_from(&self, from: u32, budget: &mut Budget) -> Result<FixedBitSet, Interrupt> {
        let (set, _, _) = bfs_from(&self.edges, from, budget)?;
        Ok(set)
    }

    /// Reachable states that sit on a consuming cycle, in deterministic
    /// order: BFS distance from start first, then id. These are the pump
    /// pivot candidates.
    pub fn loop_states(&self, budget: &mut Budget) -> Result<Vec<u32>, Interrupt> {
        let n = self.state_count();
        let mut in_cycle = FixedBitSet::with_capacity(n);

        // Iterative Tarjan over the reachable subgraph; nontrivial SCC
        // members and self-loop states are cycle states.
        let mut index = vec![u32::MAX; n];
        let mut low = vec![0u32; n];
        let mut on_stack = FixedBitSet::with_capacity(n);
        let mut stack: Vec<u32> = Vec::new();
        let mut next_index = 0u32;
        let mut call: Vec<(u32, usize)> = Vec::new();

        for root in 0..n as u32 {
            if !self.is_reachable(root) || index[root as usize] != u32::MAX {
                continue;
            }
            call.push((root, 0));
            while let Some(&(v, ei)) = call.last() {
                budget.tick()?;
                if ei == 0 {
                    index[v as usize] = next_index;
                    low[v as usize] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack.insert(v as usize);
                }
                if let Some(edge) = self.edges[v as usize].get(ei) {
                    call.last_mut().unwrap().1 = ei + 1;
                    let w = edge.target;
                    if index[w as usize] == u32::MAX {
                        call.push((w, 0));
                    } else if on_stack.contains(w as usize) {
                        low[v as usize] = low[v as usize].min(index[w as usize]);
                    }
                } else {
                    call.pop();
                    if let Some(&(parent, _)) = call.last() {
                        low[parent as usize] = low[parent as usize].min(low[v as usize]);
                    }
                    if low[v as usize] == index[v as usize] {
                        // Pop one SCC.
                        let mut component = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack.set(w as usize, false);
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        let cyclic = component.len() > 1
                            || self.edges[v as usize].iter().any(|e| e.target == v);
                        if cyclic {
                            for w in component {
                                in_cycle.insert(w as usize);
                            }
                        }
                    }
                }
            }
        }

        let mut states: Vec<u32> = in_cycle.ones().map(|s| s as u32).collect();
        states.sort_by_key(|&s| (self.dist[s as usize].unwrap_or(u32::MAX), s));
        Ok(states)
    }
}

/// Enumerate epsilon routes from the origin state, emitting one edge per
/// (route, character transition) pair up to the multiplicity cap. A route
/// may pass through a state at most [`EPS_REVISIT_LIMIT`] times.
fn epsilon_dfs(
    aut: &Automaton,
    current: u32,
    visits: &mut [u8],
    out: &mut Vec<Edge>,
    multiplicity: &mut rustc_hash::FxHashMap<(u32, usize), u8>,
    budget: &mut Budget,
) -> Result<(), Interrupt> {
    budget.tick()?;
    if out.len() >= EDGE_CAP {
        return Ok(());
    }
    visits[current as usize] += 1;
    for (i, t) in aut.transitions(StateId(current)).iter().enumerate() {
        match &t.pred {
            Predicate::Chars(set) => {
                if set.is_empty() {
                    continue;
                }
                let count = multiplicity.entry((current, i)).or_insert(0);
                if *count < MULTIPLICITY_CAP && out.len() < EDGE_CAP {
                    *count += 1;
                    out.push(Edge {
                        set: set.clone(),
                        target: t.target.0,
                    });
                }
            }
            Predicate::Epsilon => {
                if visits[t.target.index()] < EPS_REVISIT_LIMIT {
                    epsilon_dfs(aut, t.target.0, visits, out, multiplicity, budget)?;
                }
            }
            // Guards are opaque: no evidence path crosses one.
            Predicate::Guard(_) => {}
        }
    }
    visits[current as usize] -= 1;
    Ok(())
}

/// BFS over consuming edges; returns (reachable set, distances, parents).
#[allow(clippy::type_complexity)]
fn bfs_from(
    edges: &[Vec<Edge>],
    start: u32,
    budget: &mut Budget,
) -> Result<(FixedBitSet, Vec<Option<u32>>, Vec<Option<(u32, char)>>), Interrupt> {
    let n = edges.len();
    let mut reachable = FixedBitSet::with_capacity(n);
    let mut dist = vec![None; n];
    let mut parent = vec![None; n];
    let mut queue = VecDeque::new();

    reachable.insert(start as usize);
    dist[start as usize] = Some(0);
    queue.push_back(start);

    while let Some(s) = queue.pop_front() {
        let d = dist[s as usize].unwrap();
        for edge in &edges[s as usize] {
            budget.tick()?;
            let t = edge.target as usize;
            if !reachable.contains(t) {
                reachable.insert(t);
                dist[t] = Some(d + 1);
                parent[t] = edge.set.representative().map(|ch| (s, ch));
                queue.push_back(edge.target);
            }
        }
    }
    Ok((reachable, dist, parent))
}
