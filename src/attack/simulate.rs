//! Bounded backtracking simulation.
//!
//! The synthesizer never trusts a witness on structural evidence alone: the
//! candidate attack string is executed against a real backtracking matcher
//! compiled from the original AST, and only superlinear step growth counts.
//! This VM therefore implements faithful backtracking semantics — ordered
//! alternation, greedy/lazy repetition, captures, backreferences,
//! lookaround, anchors — under a hard step limit.
//!
//! Zero-width loop iterations are rejected the way Python's engine rejects
//! them: a repeat body that consumes nothing fails that iteration instead
//! of spinning forever.

use crate::error::{RedosError, Result};
use crate::parser::ast::{AnchorKind, Ast, LookKind, RegexNode};
use crate::parser::class::CharSet;
use crate::pattern::Flags;

/// Cap on compiled program size (large bounded repeats unroll here).
const PROGRAM_LIMIT: usize = 50_000;

/// Recursion depth cap for the backtracking executor.
const MAX_DEPTH: usize = 8_000;

/// One VM instruction.
#[derive(Debug, Clone)]
pub enum Inst {
    /// Consume one character from the set.
    Chars(CharSet),
    /// Overall match complete.
    Match,
    Jmp(usize),
    /// Try `0` first, fall back to `1`.
    Split(usize, usize),
    /// Store the current position into a slot (captures and loop marks).
    Save(usize),
    Assert(AnchorKind),
    Backref(u32),
    /// Run the sub-program `[start, end)` as a lookaround.
    Look {
        kind: LookKind,
        start: usize,
        end: usize,
    },
    /// Fail this branch if no input was consumed since the mark was saved.
    CheckProgress(usize),
    Nop,
}

/// A compiled verification program.
#[derive(Debug)]
pub struct Program {
    insts: Vec<Inst>,
    n_slots: usize,
    anchored_start: bool,
}

/// Outcome of a bounded simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimResult {
    Completed { matched: bool, steps: u64 },
    /// The step limit was hit; `steps` is a lower bound on the true cost.
    LimitExceeded { steps: u64 },
}

impl SimResult {
    #[must_use]
    pub fn steps(&self) -> u64 {
        match *self {
            SimResult::Completed { steps, .. } | SimResult::LimitExceeded { steps } => steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile an AST into a backtracking program.
pub fn compile(ast: &Ast, flags: Flags) -> Result<Program> {
    let mut compiler = Compiler {
        insts: Vec::new(),
        next_mark: (ast.group_count as usize + 1) * 2,
    };
    compiler.emit(&ast.root)?;
    compiler.push(Inst::Match)?;

    let anchored_start = {
        let mut anchored = false;
        for inst in &compiler.insts {
            match inst {
                Inst::Save(_) | Inst::Nop => continue,
                Inst::Assert(AnchorKind::InputStart) => anchored = true,
                Inst::Assert(AnchorKind::LineStart) if !flags.multiline => anchored = true,
                _ => {}
            }
            break;
        }
        anchored
    };

    Ok(Program {
        n_slots: compiler.next_mark,
        insts: compiler.insts,
        anchored_start,
    })
}

struct Compiler {
    insts: Vec<Inst>,
    next_mark: usize,
}

impl Compiler {
    fn push(&mut self, inst: Inst) -> Result<usize> {
        if self.insts.len() >= PROGRAM_LIMIT {
            return Err(RedosError::ProgramLimit {
                limit: PROGRAM_LIMIT,
            });
        }
        self.insts.push(inst);
        Ok(self.insts.len() - 1)
    }

    fn fresh_mark(&mut self) -> usize {
        let slot = self.next_mark;
        self.next_mark += 1;
        slot
    }

    fn emit(&mut self, node: &RegexNode) -> Result<()> {
        match node {
            RegexNode::Empty => Ok(()),
            RegexNode::Chars(set) => {
                self.push(Inst::Chars(set.clone()))?;
                Ok(())
            }
            RegexNode::Concat(children) => {
                for child in children {
                    self.emit(child)?;
                }
                Ok(())
            }
            RegexNode::Alternation(branches) => self.emit_alternation(branches),
            RegexNode::Repeat {
                node,
                min,
                max,
                greedy,
            } => self.emit_repeat(node, *min, *max, *greedy),
            RegexNode::Group { node, index } => {
                if let Some(i) = index {
                    self.push(Inst::Save(*i as usize * 2))?;
                    self.emit(node)?;
                    self.push(Inst::Save(*i as usize * 2 + 1))?;
                } else {
                    self.emit(node)?;
                }
                Ok(())
            }
            RegexNode::Anchor(kind) => {
                self.push(Inst::Assert(*kind))?;
                Ok(())
            }
            RegexNode::Backreference(index) => {
                self.push(Inst::Backref(*index))?;
                Ok(())
            }
            RegexNode::Look { kind, node } => {
                let look_pc = self.push(Inst::Nop)?;
                let start = self.insts.len();
                self.emit(node)?;
                self.push(Inst::Match)?;
                let end = self.insts.len();
                self.insts[look_pc] = Inst::Look {
                    kind: *kind,
                    start,
                    end,
                };
                Ok(())
            }
        }
    }

    fn emit_alternation(&mut self, branches: &[RegexNode]) -> Result<()> {
        if branches.is_empty() {
            return Ok(());
        }
        if branches.len() == 1 {
            return self.emit(&branches[0]);
        }
        let mut end_jumps = Vec::new();
        for branch in &branches[..branches.len() - 1] {
            let split_pc = self.push(Inst::Nop)?;
            let branch_start = self.insts.len();
            self.emit(branch)?;
            end_jumps.push(self.push(Inst::Nop)?);
            let next = self.insts.len();
            self.insts[split_pc] = Inst::Split(branch_start, next);
        }
        self.emit(&branches[branches.len() - 1])?;
        let end = self.insts.len();
        for pc in end_jumps {
            self.insts[pc] = Inst::Jmp(end);
        }
        Ok(())
    }

    fn emit_repeat(
        &mut self,
        node: &RegexNode,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<()> {
        for _ in 0..min {
            self.emit(node)?;
        }
        match max {
            Some(m) => {
                // Optional tail: each skip jumps past the whole chain.
                let mut skip_splits = Vec::new();
                for _ in min..m {
                    let split_pc = self.push(Inst::Nop)?;
                    skip_splits.push(split_pc);
                    self.emit(node)?;
                }
                let end = self.insts.len();
                for pc in skip_splits {
                    let body = pc + 1;
                    self.insts[pc] = if greedy {
                        Inst::Split(body, end)
                    } else {
                        Inst::Split(end, body)
                    };
                }
                Ok(())
            }
            None => {
                // Star loop with a zero-width progress gate.
                let mark = self.fresh_mark();
                let loop_pc = self.push(Inst::Nop)?;
                let body = self.push(Inst::Save(mark))?;
                self.emit(node)?;
                self.push(Inst::CheckProgress(mark))?;
                self.push(Inst::Jmp(loop_pc))?;
                let exit = self.insts.len();
                self.insts[loop_pc] = if greedy {
                    Inst::Split(body, exit)
                } else {
                    Inst::Split(exit, body)
                };
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run the program in `re.search` fashion: try successive start offsets
/// until a match succeeds, accumulating steps across attempts. This mirrors
/// how the analyzed patterns are actually deployed, and failed searches —
/// the worst case — pay for every offset.
pub fn run_search(program: &Program, input: &str, flags: Flags, step_limit: u64) -> SimResult {
    let chars: Vec<char> = input.chars().collect();
    let mut ctx = Ctx {
        steps: 0,
        limit: step_limit,
        exceeded: false,
        flags,
    };

    let last_start = if program.anchored_start { 0 } else { chars.len() };
    for start in 0..=last_start {
        let mut slots: Vec<Option<usize>> = vec![None; program.n_slots];
        slots[0] = Some(start);
        let mut undo: Vec<(usize, Option<usize>)> = Vec::new();
        let matched = exec(
            program, &chars, start, 0, false, &mut slots, &mut undo, 0, &mut ctx,
        );
        if ctx.exceeded {
            return SimResult::LimitExceeded { steps: ctx.steps };
        }
        if matched {
            return SimResult::Completed {
                matched: true,
                steps: ctx.steps,
            };
        }
    }
    SimResult::Completed {
        matched: false,
        steps: ctx.steps,
    }
}

/// Run the program in `re.fullmatch` fashion: one attempt at offset zero
/// that must consume the whole input. This is the adversary's best case —
/// a partial match cannot end the attempt early, so a failing tail forces
/// every backtracking alternative regardless of how the pattern is
/// anchored. Attack verification measures this mode.
pub fn run_fullmatch(program: &Program, input: &str, flags: Flags, step_limit: u64) -> SimResult {
    let chars: Vec<char> = input.chars().collect();
    let mut ctx = Ctx {
        steps: 0,
        limit: step_limit,
        exceeded: false,
        flags,
    };
    let mut slots: Vec<Option<usize>> = vec![None; program.n_slots];
    slots[0] = Some(0);
    let mut undo: Vec<(usize, Option<usize>)> = Vec::new();
    let matched = exec(program, &chars, 0, 0, true, &mut slots, &mut undo, 0, &mut ctx);
    if ctx.exceeded {
        SimResult::LimitExceeded { steps: ctx.steps }
    } else {
        SimResult::Completed {
            matched,
            steps: ctx.steps,
        }
    }
}

struct Ctx {
    steps: u64,
    limit: u64,
    exceeded: bool,
    flags: Flags,
}

impl Ctx {
    #[inline]
    fn tick(&mut self) -> bool {
        self.steps += 1;
        if self.steps >= self.limit {
            self.exceeded = true;
            return false;
        }
        true
    }
}

#[allow(clippy::too_many_arguments)]
fn exec(
    program: &Program,
    chars: &[char],
    mut pos: usize,
    mut pc: usize,
    require_full: bool,
    slots: &mut Vec<Option<usize>>,
    undo: &mut Vec<(usize, Option<usize>)>,
    depth: usize,
    ctx: &mut Ctx,
) -> bool {
    if depth > MAX_DEPTH {
        // Treat runaway depth like a spent budget: abort, do not misreport.
        ctx.exceeded = true;
        return false;
    }

    loop {
        if !ctx.tick() {
            return false;
        }
        match &program.insts[pc] {
            Inst::Match => {
                if require_full && pos != chars.len() {
                    // Partial match rejected: keep backtracking.
                    return false;
                }
                slots[1] = Some(pos);
                return true;
            }
            Inst::Chars(set) => {
                if pos < chars.len() && set.contains(chars[pos]) {
                    pos += 1;
                    pc += 1;
                } else {
                    return false;
                }
            }
            Inst::Jmp(target) => pc = *target,
            Inst::Split(first, second) => {
                let (first, second) = (*first, *second);
                let undo_mark = undo.len();
                if exec(
                    program, chars, pos, first, require_full, slots, undo, depth + 1, ctx,
                ) {
                    return true;
                }
                if ctx.exceeded {
                    return false;
                }
                while undo.len() > undo_mark {
                    let (slot, old) = undo.pop().unwrap();
                    slots[slot] = old;
                }
                pc = second;
            }
            Inst::Save(slot) => {
                let slot = *slot;
                undo.push((slot, slots[slot]));
                slots[slot] = Some(pos);
                pc += 1;
            }
            Inst::CheckProgress(slot) => {
                if slots[*slot] == Some(pos) {
                    return false;
                }
                pc += 1;
            }
            Inst::Assert(kind) => {
                if assert_holds(*kind, chars, pos, ctx.flags) {
                    pc += 1;
                } else {
                    return false;
                }
            }
            Inst::Backref(index) => {
                let (start_slot, end_slot) = (*index as usize * 2, *index as usize * 2 + 1);
                match (slots[start_slot], slots[end_slot]) {
                    (Some(gs), Some(ge)) if ge >= gs => {
                        let len = ge - gs;
                        if pos + len <= chars.len()
                            && region_eq(&chars[gs..ge], &chars[pos..pos + len], ctx.flags)
                        {
                            ctx.steps += len as u64;
                            pos += len;
                            pc += 1;
                        } else {
                            return false;
                        }
                    }
                    _ => return false,
                }
            }
            Inst::Look { kind, start, end } => {
                let (kind, start, end) = (*kind, *start, *end);
                if look_holds(program, chars, pos, kind, start, slots, undo, depth, ctx) {
                    pc = end;
                } else {
                    return false;
                }
            }
            Inst::Nop => pc += 1,
        }
    }
}

/// Evaluate a lookaround sub-program. Positive lookarounds propagate their
/// captures (visible to later backreferences); negative ones leave no trace.
#[allow(clippy::too_many_arguments)]
fn look_holds(
    program: &Program,
    chars: &[char],
    pos: usize,
    kind: LookKind,
    start: usize,
    slots: &mut Vec<Option<usize>>,
    undo: &mut Vec<(usize, Option<usize>)>,
    depth: usize,
    ctx: &mut Ctx,
) -> bool {
    match kind {
        LookKind::Ahead | LookKind::AheadNegative => {
            let mut sub_slots = slots.clone();
            let mut sub_undo = Vec::new();
            // Lookaround sub-matches are always partial.
            let hit = exec(
                program,
                chars,
                pos,
                start,
                false,
                &mut sub_slots,
                &mut sub_undo,
                depth + 1,
                ctx,
            );
            if ctx.exceeded {
                return false;
            }
            if kind == LookKind::Ahead {
                if hit {
                    propagate_captures(slots, &sub_slots, undo);
                }
                hit
            } else {
                !hit
            }
        }
        LookKind::Behind | LookKind::BehindNegative => {
            // Try every split point behind the cursor; the sub-match must
            // end exactly where we stand.
            let mut found = None;
            for back in 0..=pos {
                let try_pos = pos - back;
                let mut sub_slots = slots.clone();
                let mut sub_undo = Vec::new();
                let hit = exec(
                    program,
                    chars,
                    try_pos,
                    start,
                    false,
                    &mut sub_slots,
                    &mut sub_undo,
                    depth + 1,
                    ctx,
                );
                if ctx.exceeded {
                    return false;
                }
                if hit && sub_slots[1] == Some(pos) {
                    found = Some(sub_slots);
                    break;
                }
            }
            if kind == LookKind::Behind {
                match found {
                    Some(sub_slots) => {
                        propagate_captures(slots, &sub_slots, undo);
                        true
                    }
                    None => false,
                }
            } else {
                found.is_none()
            }
        }
    }
}

fn propagate_captures(
    slots: &mut [Option<usize>],
    sub_slots: &[Option<usize>],
    undo: &mut Vec<(usize, Option<usize>)>,
) {
    for i in 2..slots.len() {
        if sub_slots[i] != slots[i] {
            undo.push((i, slots[i]));
            slots[i] = sub_slots[i];
        }
    }
}

fn assert_holds(kind: AnchorKind, chars: &[char], pos: usize, flags: Flags) -> bool {
    match kind {
        AnchorKind::InputStart => pos == 0,
        AnchorKind::InputEnd => pos == chars.len(),
        AnchorKind::LineStart => {
            pos == 0 || (flags.multiline && chars.get(pos.wrapping_sub(1)) == Some(&'\n'))
        }
        AnchorKind::LineEnd => {
            pos == chars.len()
                || (pos == chars.len() - 1 && chars[pos] == '\n')
                || (flags.multiline && chars[pos] == '\n')
        }
        AnchorKind::WordBoundary => word_boundary(chars, pos),
        AnchorKind::NotWordBoundary => !word_boundary(chars, pos),
    }
}

fn word_boundary(chars: &[char], pos: usize) -> bool {
    let before = pos > 0 && is_word_char(chars[pos - 1]);
    let after = pos < chars.len() && is_word_char(chars[pos]);
    before != after
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn region_eq(a: &[char], b: &[char], flags: Flags) -> bool {
    if !flags.ignore_case {
        return a == b;
    }
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| x.to_lowercase().eq(y.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn run(pattern: &str, input: &str) -> bool {
        run_with_flags(pattern, input, Flags::default())
    }

    fn run_with_flags(pattern: &str, input: &str, flags: Flags) -> bool {
        let ast = parser::parse(pattern, flags).unwrap();
        let program = compile(&ast, flags).unwrap();
        match run_search(&program, input, flags, 1_000_000) {
            SimResult::Completed { matched, .. } => matched,
            SimResult::LimitExceeded { .. } => panic!("step limit hit on {pattern} / {input}"),
        }
    }

    fn steps(pattern: &str, input: &str, limit: u64) -> u64 {
        let flags = Flags::default();
        let ast = parser::parse(pattern, flags).unwrap();
        let program = compile(&ast, flags).unwrap();
        run_search(&program, input, flags, limit).steps()
    }

    #[test]
    fn literals_and_classes() {
        assert!(run("abc", "xxabcx"));
        assert!(!run("abc", "ab"));
        assert!(run("[a-c]+d", "bbcd"));
        assert!(!run("[^a-c]d", "ad"));
    }

    #[test]
    fn alternation_is_ordered_and_complete() {
        assert!(run("cat|dog", "hotdog"));
        assert!(!run("cat|dog", "cow"));
    }

    #[test]
    fn repeats_greedy_and_lazy_agree_on_matching() {
        assert!(run("a*b", "b"));
        assert!(run("a*?b", "aaab"));
        assert!(run("a{2,3}b", "aab"));
        assert!(!run("a{2,3}b", "ab"));
        assert!(run("(ab){2}", "abab"));
    }

    #[test]
    fn anchors_respect_flags() {
        assert!(run("^a", "abc"));
        assert!(!run("^b", "abc"));
        assert!(run("c$", "abc"));
        assert!(run("c$", "abc\n"));
        assert!(!run_with_flags("^b", "a\nb", Flags::default()));
        assert!(run_with_flags(
            "^b",
            "a\nb",
            Flags { multiline: true, ..Flags::default() }
        ));
        assert!(run(r"\bword\b", "a word here"));
        assert!(!run(r"\bord\b", "a word here"));
    }

    #[test]
    fn backreferences_match_captured_text() {
        assert!(run(r"(ab)\1", "abab"));
        assert!(!run(r"(ab)\1", "abba"));
        assert!(run(r"(?P<x>a+)-(?P=x)", "aa-aa"));
        assert!(run_with_flags(
            r"(ab)\1",
            "abAB",
            Flags { ignore_case: true, ..Flags::default() }
        ));
    }

    #[test]
    fn lookarounds() {
        assert!(run(r"a(?=b)", "ab"));
        assert!(!run(r"a(?=b)", "ac"));
        assert!(run(r"a(?!b)", "ac"));
        assert!(run(r"(?<=a)b", "ab"));
        assert!(!run(r"(?<=a)b", "cb"));
        assert!(run(r"(?<!a)b", "cb"));
    }

    #[test]
    fn zero_width_repeat_terminates() {
        // Without the progress gate these would spin forever.
        assert!(run("(a?)*b", "aab"));
        assert!(!run("(a*)*c", "aab"));
        assert!(run("()*x", "x"));
    }

    #[test]
    fn fullmatch_requires_consuming_everything() {
        let flags = Flags::default();
        let compile_for = |pattern: &str| {
            let ast = parser::parse(pattern, flags).unwrap();
            compile(&ast, flags).unwrap()
        };
        let full = |pattern: &str, input: &str| {
            match run_fullmatch(&compile_for(pattern), input, flags, 1_000_000) {
                SimResult::Completed { matched, .. } => matched,
                SimResult::LimitExceeded { .. } => panic!("limit hit"),
            }
        };
        assert!(full("abc", "abc"));
        assert!(!full("abc", "abcd"));
        assert!(!full("abc", "xabc"));
        assert!(full("a+", "aaa"));
        assert!(!full("a+", "aab"));
        // Search mode would succeed on the embedded match; full mode not.
        assert!(run("(a|aa)+", "xxaa"));
        assert!(!full("(a|aa)+", "xxaa"));
    }

    #[test]
    fn case_insensitive_literals() {
        assert!(run_with_flags(
            "abc",
            "xABCx",
            Flags { ignore_case: true, ..Flags::default() }
        ));
    }

    #[test]
    fn nested_repeat_cost_explodes_on_failure() {
        // steps(n) for `^(a+)+$` against a^n + "!" must grow superlinearly.
        let small = steps("^(a+)+$", &format!("{}!", "a".repeat(8)), u64::MAX);
        let large = steps("^(a+)+$", &format!("{}!", "a".repeat(16)), u64::MAX);
        assert!(
            large > small * 16,
            "expected explosive growth, got {small} -> {large}"
        );
    }

    #[test]
    fn safe_pattern_cost_stays_linear() {
        let small = steps("^[a-z]+$", &format!("{}!", "a".repeat(64)), u64::MAX);
        let large = steps("^[a-z]+$", &format!("{}!", "a".repeat(128)), u64::MAX);
        assert!(large < small * 4, "expected linear growth, got {small} -> {large}");
    }

    #[test]
    fn step_limit_reports_lower_bound() {
        let flags = Flags::default();
        let ast = parser::parse("^(a+)+$", flags).unwrap();
        let program = compile(&ast, flags).unwrap();
        let input = format!("{}!", "a".repeat(64));
        match run_search(&program, &input, flags, 10_000) {
            SimResult::LimitExceeded { steps } => assert!(steps >= 10_000),
            other => panic!("expected limit hit, got {other:?}"),
        }
    }
}
