//! Normalized character sets.
//!
//! Every literal and character class in the AST is stored as a sorted list
//! of disjoint, inclusive code-point ranges. Normalized ranges make the
//! predicate-overlap tests in the ambiguity search a cheap merge instead of
//! a per-character scan.

use serde::{Deserialize, Serialize};

/// Highest valid scalar value.
const MAX_CP: u32 = 0x0010_FFFF;
/// Surrogate gap, excluded from all sets.
const SURROGATE_LO: u32 = 0xD800;
const SURROGATE_HI: u32 = 0xDFFF;

/// A set of Unicode scalar values as sorted disjoint inclusive ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharSet {
    ranges: Vec<(u32, u32)>,
}

impl CharSet {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set containing a single character.
    #[must_use]
    pub fn single(ch: char) -> Self {
        let cp = ch as u32;
        Self {
            ranges: vec![(cp, cp)],
        }
    }

    /// Set covering an inclusive range. Endpoints may arrive unordered
    /// (the parser reports reversed class ranges before this is called).
    #[must_use]
    pub fn range(lo: char, hi: char) -> Self {
        let mut set = Self::empty();
        set.push_range(lo as u32, hi as u32);
        set.normalize();
        set
    }

    /// All scalar values (minus the surrogate gap).
    #[must_use]
    pub fn any() -> Self {
        Self {
            ranges: vec![(0, SURROGATE_LO - 1), (SURROGATE_HI + 1, MAX_CP)],
        }
    }

    /// `.` semantics: everything, or everything except `\n`.
    #[must_use]
    pub fn dot(dot_all: bool) -> Self {
        if dot_all {
            Self::any()
        } else {
            let mut set = Self::any();
            set = set.subtract(&Self::single('\n'));
            set
        }
    }

    /// `\d`.
    #[must_use]
    pub fn digit() -> Self {
        Self::range('0', '9')
    }

    /// `\w`: `[0-9A-Za-z_]`.
    #[must_use]
    pub fn word() -> Self {
        let mut set = Self::empty();
        set.push_range('0' as u32, '9' as u32);
        set.push_range('A' as u32, 'Z' as u32);
        set.push_range('_' as u32, '_' as u32);
        set.push_range('a' as u32, 'z' as u32);
        set.normalize();
        set
    }

    /// `\s`: `[\t\n\x0b\x0c\r ]`.
    #[must_use]
    pub fn space() -> Self {
        let mut set = Self::empty();
        set.push_range(0x09, 0x0D);
        set.push_range(0x20, 0x20);
        set.normalize();
        set
    }

    /// Append a raw range; call [`normalize`](Self::normalize) afterwards.
    pub fn push_range(&mut self, lo: u32, hi: u32) {
        debug_assert!(lo <= hi);
        self.ranges.push((lo, hi));
    }

    /// Sort, merge overlaps, and carve out the surrogate gap.
    pub fn normalize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        self.ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        // Remove surrogates so representative() always yields a char.
        let surrogates = CharSet {
            ranges: vec![(SURROGATE_LO, SURROGATE_HI)],
        };
        self.ranges = merged;
        *self = self.subtract(&surrogates);
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        let cp = ch as u32;
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if cp < lo {
                    std::cmp::Ordering::Greater
                } else if cp > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Union of two sets.
    #[must_use]
    pub fn union(&self, other: &CharSet) -> CharSet {
        let mut out = CharSet {
            ranges: self.ranges.clone(),
        };
        out.ranges.extend_from_slice(&other.ranges);
        out.normalize();
        out
    }

    /// Intersection of two sets (linear merge).
    #[must_use]
    pub fn intersect(&self, other: &CharSet) -> CharSet {
        let mut out = CharSet::empty();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (alo, ahi) = self.ranges[i];
            let (blo, bhi) = other.ranges[j];
            let lo = alo.max(blo);
            let hi = ahi.min(bhi);
            if lo <= hi {
                out.ranges.push((lo, hi));
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        out
    }

    /// `self \ other`.
    #[must_use]
    pub fn subtract(&self, other: &CharSet) -> CharSet {
        let mut out = CharSet::empty();
        for &(mut lo, hi) in &self.ranges {
            for &(blo, bhi) in &other.ranges {
                if bhi < lo || blo > hi {
                    continue;
                }
                if blo > lo {
                    out.ranges.push((lo, blo - 1));
                }
                lo = bhi.saturating_add(1);
                if lo > hi {
                    break;
                }
            }
            if lo <= hi {
                out.ranges.push((lo, hi));
            }
        }
        out
    }

    /// Complement within the full scalar-value range.
    #[must_use]
    pub fn negate(&self) -> CharSet {
        Self::any().subtract(self)
    }

    /// True if the two sets share at least one character.
    #[must_use]
    pub fn overlaps(&self, other: &CharSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (alo, ahi) = self.ranges[i];
            let (blo, bhi) = other.ranges[j];
            if alo.max(blo) <= ahi.min(bhi) {
                return true;
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// A deterministic member of the set, preferring printable ASCII so the
    /// synthesized attack strings stay readable.
    #[must_use]
    pub fn representative(&self) -> Option<char> {
        // First printable ASCII member, if any.
        for &(lo, hi) in &self.ranges {
            let start = lo.max(0x21);
            if start <= hi && start < 0x7F {
                return char::from_u32(start);
            }
        }
        // Otherwise the lowest member (surrogates were carved out).
        self.ranges.first().and_then(|&(lo, _)| char::from_u32(lo))
    }

    /// Add simple case counterparts for every character in the set.
    ///
    /// ASCII letters fold both ways; non-ASCII folds via the char methods
    /// for single-character ranges only (class ranges like `[а-я]` keep
    /// their ASCII-style fold, an accepted dialect approximation).
    #[must_use]
    pub fn case_fold(&self) -> CharSet {
        let mut out = self.clone();
        for &(lo, hi) in &self.ranges {
            // ASCII fold over the overlap with the letter ranges.
            let (ulo, uhi) = (lo.max('A' as u32), hi.min('Z' as u32));
            if ulo <= uhi {
                out.push_range(ulo + 32, uhi + 32);
            }
            let (llo, lhi) = (lo.max('a' as u32), hi.min('z' as u32));
            if llo <= lhi {
                out.push_range(llo - 32, lhi - 32);
            }
            if lo == hi && lo > 0x7F {
                if let Some(ch) = char::from_u32(lo) {
                    for folded in ch.to_lowercase().chain(ch.to_uppercase()) {
                        out.push_range(folded as u32, folded as u32);
                    }
                }
            }
        }
        out.normalize();
        out
    }

    /// Iterate the raw ranges.
    pub fn iter_ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }
}
