//! Product-automaton searches for divergent path pairs.
//!
//! Exponential case: a pivot state with two distinct loops over the same
//! word. Found by breadth-first search over the self-product, seeded with
//! every pair of distinct edges out of the pivot and aimed back at the
//! diagonal. BFS order means the first hit is the shortest pump for that
//! pivot, and pivots are visited in deterministic (distance, id) order.
//!
//! Polynomial case: two distinct loop states `p != q` and a word `w` with
//! `p -w-> p`, `p -w-> q`, `q -w-> q`. Found by breadth-first search in the
//! triple product from `(p, p, q)` to `(p, q, q)`. Each such link
//! contributes one degree of polynomial growth; links are chained greedily
//! to estimate the overall degree.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::budget::{Budget, Interrupt};
use crate::nfa::StateId;

use super::search::SearchAutomaton;
use super::witness::{AmbiguityKind, AmbiguityWitness};

#[inline]
fn pair_key(a: u32, b: u32) -> u64 {
    (u64::from(a) << 32) | u64::from(b)
}

#[inline]
fn unpack_pair(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, key as u32)
}

#[inline]
fn canon(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ---------------------------------------------------------------------------
// Exponential divergence
// ---------------------------------------------------------------------------

/// Search every loop pivot for two distinct same-word loops.
pub fn find_exponential(
    search: &SearchAutomaton,
    budget: &mut Budget,
) -> Result<Option<AmbiguityWitness>, Interrupt> {
    for q in search.loop_states(budget)? {
        if let Some(witness) = divergent_loops_at(search, q, budget)? {
            trace!(pivot = q, pump = %witness.pump, "exponential divergence");
            return Ok(Some(witness));
        }
    }
    Ok(None)
}

/// BFS in the self-product: diverge on the first step out of `pivot`, then
/// walk pairs of same-character edges until the diagonal `(pivot, pivot)`
/// reappears.
fn divergent_loops_at(
    search: &SearchAutomaton,
    pivot: u32,
    budget: &mut Budget,
) -> Result<Option<AmbiguityWitness>, Interrupt> {
    let goal = pair_key(pivot, pivot);
    // Pair-state -> (predecessor pair, character consumed to get here).
    let mut parents: FxHashMap<u64, (Option<u64>, char)> = FxHashMap::default();
    let mut queue: VecDeque<u64> = VecDeque::new();

    let edges = search.edges(pivot);
    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            budget.tick()?;
            let overlap = edges[i].set.intersect(&edges[j].set);
            let Some(ch) = overlap.representative() else {
                continue;
            };
            let (a, b) = canon(edges[i].target, edges[j].target);
            let key = pair_key(a, b);
            if key == goal {
                // Both divergent edges loop straight back: one-char pump.
                return Ok(Some(make_exponential_witness(
                    pivot,
                    vec![(a, b)],
                    vec![ch],
                )));
            }
            if let std::collections::hash_map::Entry::Vacant(slot) = parents.entry(key) {
                slot.insert((None, ch));
                queue.push_back(key);
            }
        }
    }

    while let Some(key) = queue.pop_front() {
        let (a, b) = unpack_pair(key);
        for ea in search.edges(a) {
            for eb in search.edges(b) {
                budget.tick()?;
                let overlap = ea.set.intersect(&eb.set);
                let Some(ch) = overlap.representative() else {
                    continue;
                };
                let (u, v) = canon(ea.target, eb.target);
                let next = pair_key(u, v);
                if next == goal {
                    let (mut pairs, mut word) = rebuild_pair_path(&parents, key);
                    pairs.push((u, v));
                    word.push(ch);
                    return Ok(Some(make_exponential_witness(pivot, pairs, word)));
                }
                if let std::collections::hash_map::Entry::Vacant(slot) = parents.entry(next) {
                    slot.insert((Some(key), ch));
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(None)
}

fn rebuild_pair_path(
    parents: &FxHashMap<u64, (Option<u64>, char)>,
    mut key: u64,
) -> (Vec<(u32, u32)>, Vec<char>) {
    let mut pairs = Vec::new();
    let mut word = Vec::new();
    loop {
        let (a, b) = unpack_pair(key);
        pairs.push((a, b));
        let &(prev, ch) = &parents[&key];
        word.push(ch);
        match prev {
            Some(p) => key = p,
            None => break,
        }
    }
    pairs.reverse();
    word.reverse();
    (pairs, word)
}

fn make_exponential_witness(pivot: u32, pairs: Vec<(u32, u32)>, word: Vec<char>) -> AmbiguityWitness {
    AmbiguityWitness {
        kind: AmbiguityKind::Exponential,
        entry: StateId(pivot),
        exit: StateId(pivot),
        pump: word.into_iter().collect(),
        pair_path: pairs
            .into_iter()
            .map(|(a, b)| (StateId(a), StateId(b)))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Polynomial divergence
// ---------------------------------------------------------------------------

/// One loop-transfer link: `p -w-> p`, `p -w-> q`, `q -w-> q`.
#[derive(Debug)]
struct IdaLink {
    entry: u32,
    exit: u32,
    word: Vec<char>,
    pairs: Vec<(u32, u32)>,
}

/// Search loop-state pairs for a transfer link, then chain links greedily to
/// estimate the polynomial degree. `degree_cap` bounds how far chaining
/// looks (searching past the classification threshold is wasted budget).
pub fn find_polynomial(
    search: &SearchAutomaton,
    degree_cap: u32,
    budget: &mut Budget,
) -> Result<Option<AmbiguityWitness>, Interrupt> {
    let loops = search.loop_states(budget)?;
    for &p in &loops {
        let reach = search.reachable_from(p, budget)?;
        for &q in &loops {
            if q == p || !reach.contains(q as usize) {
                continue;
            }
            let Some(first) = ida_link(search, p, q, budget)? else {
                continue;
            };
            trace!(entry = p, exit = q, "polynomial divergence");

            // Chain extension: each further link q -> r adds one degree.
            let mut degree = 2;
            let mut cursor = first.exit;
            let mut visited = vec![first.entry, first.exit];
            'extend: while degree < degree_cap {
                let cursor_reach = search.reachable_from(cursor, budget)?;
                for &r in &loops {
                    if visited.contains(&r) || !cursor_reach.contains(r as usize) {
                        continue;
                    }
                    if ida_link(search, cursor, r, budget)?.is_some() {
                        visited.push(r);
                        cursor = r;
                        degree += 1;
                        continue 'extend;
                    }
                }
                break;
            }

            return Ok(Some(AmbiguityWitness {
                kind: AmbiguityKind::Polynomial { degree },
                entry: StateId(first.entry),
                exit: StateId(first.exit),
                pump: first.word.iter().collect(),
                pair_path: first
                    .pairs
                    .iter()
                    .map(|&(a, b)| (StateId(a), StateId(b)))
                    .collect(),
            }));
        }
    }
    Ok(None)
}

/// BFS in the triple product from `(p, p, q)` to `(p, q, q)`.
///
/// The three components simultaneously trace: the loop staying at `p`, the
/// transfer from `p` to `q`, and the loop staying at `q` — all over one
/// shared word, which becomes the pump.
fn ida_link(
    search: &SearchAutomaton,
    p: u32,
    q: u32,
    budget: &mut Budget,
) -> Result<Option<IdaLink>, Interrupt> {
    type Triple = (u32, u32, u32);
    let start: Triple = (p, p, q);
    let goal: Triple = (p, q, q);

    let mut parents: FxHashMap<Triple, (Option<Triple>, char)> = FxHashMap::default();
    let mut queue: VecDeque<Triple> = VecDeque::new();
    parents.insert(start, (None, '\u{0}'));
    queue.push_back(start);

    while let Some(triple) = queue.pop_front() {
        let (a, b, c) = triple;
        for ea in search.edges(a) {
            for eb in search.edges(b) {
                let ab = ea.set.intersect(&eb.set);
                if ab.is_empty() {
                    continue;
                }
                for ec in search.edges(c) {
                    budget.tick()?;
                    let abc = ab.intersect(&ec.set);
                    let Some(ch) = abc.representative() else {
                        continue;
                    };
                    let next: Triple = (ea.target, eb.target, ec.target);
                    if parents.contains_key(&next) {
                        continue;
                    }
                    parents.insert(next, (Some(triple), ch));
                    if next == goal {
                        return Ok(Some(rebuild_link(&parents, p, q, goal)));
                    }
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(None)
}

fn rebuild_link(
    parents: &FxHashMap<(u32, u32, u32), (Option<(u32, u32, u32)>, char)>,
    p: u32,
    q: u32,
    goal: (u32, u32, u32),
) -> IdaLink {
    let mut word = Vec::new();
    let mut pairs = Vec::new();
    let mut cursor = goal;
    loop {
        let &(prev, ch) = &parents[&cursor];
        let Some(prev) = prev else {
            break;
        };
        // Evidence pair: stay-at-entry path vs transfer path.
        pairs.push((cursor.1, cursor.2));
        word.push(ch);
        cursor = prev;
    }
    word.reverse();
    pairs.reverse();
    IdaLink {
        entry: p,
        exit: q,
        word,
        pairs,
    }
}
