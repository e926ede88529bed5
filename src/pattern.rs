//! Pattern and dialect-flag types.

use serde::{Deserialize, Serialize};

/// Dialect flags, mirroring the subset of Python `re` flags that affect
/// matching semantics the engine models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Flags {
    /// Case-insensitive matching (`re.IGNORECASE`).
    pub ignore_case: bool,
    /// `^`/`$` also match at line boundaries (`re.MULTILINE`).
    pub multiline: bool,
    /// `.` also matches newline (`re.DOTALL`).
    pub dot_all: bool,
    /// Unicode semantics for shorthand classes (`re.UNICODE`). The engine
    /// approximates Unicode shorthands with their ASCII cores; the flag is
    /// carried so callers round-trip it.
    pub unicode: bool,
}

impl Flags {
    /// Parse a flag-name list as used in the JSON service contract,
    /// e.g. `["ignore_case", "multiline"]`. Short Python spellings
    /// (`i`, `m`, `s`, `u`) are accepted too.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut flags = Flags::default();
        for name in names {
            match name.as_ref() {
                "ignore_case" | "ignorecase" | "i" => flags.ignore_case = true,
                "multiline" | "m" => flags.multiline = true,
                "dot_all" | "dotall" | "s" => flags.dot_all = true,
                "unicode" | "u" => flags.unicode = true,
                other => return Err(format!("unknown flag: {other}")),
            }
        }
        Ok(flags)
    }
}

/// A regex pattern submitted for analysis.
///
/// Identity is the literal source string plus flags; the engine holds no
/// state across patterns, so two equal `Pattern`s always analyze alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    /// The pattern source, exactly as written (no delimiters).
    pub source: String,
    /// Dialect flags in effect.
    #[serde(default)]
    pub flags: Flags,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: Flags) -> Self {
        Self {
            source: source.into(),
            flags,
        }
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source, Flags::default())
    }
}
