//! Frequency designators extracted from filesystem names
//!
//! Watched entries are named after a radio frequency: three digits, a
//! separator, three digits (`044.800`). Both `.` and `,` separators appear
//! in the wild and normalize to the dotted form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::CoreError;

fn exact_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^(\d{3})[.,](\d{3})$").expect("valid pattern"))
}

fn embedded_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"(\d{3})[.,](\d{3})").expect("valid pattern"))
}

fn digit_run_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"\d+").expect("valid pattern"))
}

/// A normalized frequency designator (`DDD.DDD`).
///
/// Immutable once extracted from a name. Comparison, hashing, and the
/// serialized form all use the normalized dotted label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    mhz: u16,
    khz: u16,
}

impl Frequency {
    /// Build a frequency from its two three-digit halves.
    ///
    /// Returns `None` if either half does not fit in three digits.
    pub fn new(mhz: u16, khz: u16) -> Option<Self> {
        if mhz > 999 || khz > 999 {
            return None;
        }
        Some(Self { mhz, khz })
    }

    /// Strict extraction: the whole name must be `DDD.DDD` or `DDD,DDD`.
    ///
    /// Used for the folder-watching variant, where a folder either is a
    /// frequency directory or is ignored entirely.
    pub fn parse_exact(name: &str) -> Option<Self> {
        let caps = exact_pattern().captures(name)?;
        Self::from_halves(&caps[1], &caps[2])
    }

    /// Loose extraction: search the name for a frequency.
    ///
    /// Tries `DDD.DDD`/`DDD,DDD` anywhere in the name first, then falls
    /// back to the first run of 3-6 digits: the first three digits become
    /// the integer half, the remainder is zero-padded to three digits
    /// (`0448` becomes `044.800`). Runs shorter than 3 or longer than 6
    /// digits never match.
    pub fn find_in(name: &str) -> Option<Self> {
        if let Some(caps) = embedded_pattern().captures(name) {
            return Self::from_halves(&caps[1], &caps[2]);
        }

        let run = digit_run_pattern()
            .find_iter(name)
            .map(|m| m.as_str())
            .find(|run| (3..=6).contains(&run.len()))?;

        let mut khz = run[3..].to_string();
        while khz.len() < 3 {
            khz.push('0');
        }
        Self::from_halves(&run[..3], &khz)
    }

    /// The normalized `DDD.DDD` label.
    pub fn label(&self) -> String {
        format!("{:03}.{:03}", self.mhz, self.khz)
    }

    fn from_halves(mhz: &str, khz: &str) -> Option<Self> {
        Self::new(mhz.parse().ok()?, khz.parse().ok()?)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}.{:03}", self.mhz, self.khz)
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_exact(s)
            .ok_or_else(|| CoreError::invalid_input(format!("not a frequency label: {s:?}")))
    }
}

impl TryFrom<String> for Frequency {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.label()
    }
}
