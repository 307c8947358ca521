//! Password strength indicator.
//!
//! Five independent checks, each worth 20%. The checks are the same regular
//! expressions the sign-up page has always shown: eight or more characters,
//! `[A-Z]`, `[a-z]`, `[0-9]`, and `[^A-Za-z0-9]`. Non-ASCII letters count as
//! special characters.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

struct Patterns {
    uppercase: Regex,
    lowercase: Regex,
    number: Regex,
    special: Regex,
}

#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    // Literal patterns, cannot fail.
    uppercase: Regex::new("[A-Z]").expect("uppercase pattern"),
    lowercase: Regex::new("[a-z]").expect("lowercase pattern"),
    number: Regex::new("[0-9]").expect("number pattern"),
    special: Regex::new("[^A-Za-z0-9]").expect("special pattern"),
});

/// Minimum length counted by the length check.
pub const MIN_LENGTH: usize = 8;

/// Outcome of each individual check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct PasswordChecks {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub number: bool,
    pub special: bool,
}

impl PasswordChecks {
    /// Run all five checks. Length is counted in characters.
    #[must_use]
    pub fn evaluate(password: &str) -> Self {
        let p = &*PATTERNS;
        Self {
            length: password.chars().count() >= MIN_LENGTH,
            uppercase: p.uppercase.is_match(password),
            lowercase: p.lowercase.is_match(password),
            number: p.number.is_match(password),
            special: p.special.is_match(password),
        }
    }

    /// Number of passing checks, 0 through 5.
    #[must_use]
    pub fn score(&self) -> u8 {
        [
            self.length,
            self.uppercase,
            self.lowercase,
            self.number,
            self.special,
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }
}

/// Label shown next to the strength bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
}

impl StrengthLabel {
    #[must_use]
    pub const fn from_percent(percent: u8) -> Self {
        match percent {
            80.. => Self::Strong,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Weak,
        }
    }

    /// Bar colour class used by the UI.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Strong => "green",
            Self::Good => "yellow",
            Self::Fair => "orange",
            Self::Weak => "red",
        }
    }
}

/// Full indicator state for a non-empty password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strength {
    pub checks: PasswordChecks,
    pub percent: u8,
    pub label: StrengthLabel,
}

/// Strength of `password`, or `None` for an empty password (the indicator
/// is hidden).
#[must_use]
pub fn strength(password: &str) -> Option<Strength> {
    if password.is_empty() {
        return None;
    }
    let checks = PasswordChecks::evaluate(password);
    let percent = checks.score() * 20;
    Some(Strength {
        checks,
        percent,
        label: StrengthLabel::from_percent(percent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(p: &str) -> [bool; 5] {
        let c = PasswordChecks::evaluate(p);
        [c.length, c.uppercase, c.lowercase, c.number, c.special]
    }

    #[test]
    fn checks_follow_each_pattern() {
        assert_eq!(checks("abc"), [false, false, true, false, false]);
        assert_eq!(checks("ABCDEFGH"), [true, true, false, false, false]);
        assert_eq!(checks("12345678"), [true, false, false, true, false]);
        assert_eq!(checks("!!"), [false, false, false, false, true]);
        assert_eq!(checks("Passw0rd!"), [true, true, true, true, true]);
    }

    #[test]
    fn whitespace_and_unicode_count_as_special() {
        assert!(PasswordChecks::evaluate("a b").special);
        assert!(PasswordChecks::evaluate("é").special);
        assert!(!PasswordChecks::evaluate("É").uppercase);
    }

    #[test]
    fn length_counts_characters() {
        assert!(PasswordChecks::evaluate("éééééééé").length);
        assert!(!PasswordChecks::evaluate("ééééééé").length);
    }

    #[test]
    fn labels_by_score() {
        assert_eq!(strength(""), None);
        let s = |p: &str| strength(p).map(|s| (s.percent, s.label));
        assert_eq!(s("a"), Some((20, StrengthLabel::Weak)));
        assert_eq!(s("aB"), Some((40, StrengthLabel::Fair)));
        assert_eq!(s("aB1"), Some((60, StrengthLabel::Good)));
        assert_eq!(s("aB1!"), Some((80, StrengthLabel::Strong)));
        assert_eq!(s("aB1!aB1!"), Some((100, StrengthLabel::Strong)));
    }

    #[test]
    fn label_colours() {
        assert_eq!(StrengthLabel::from_percent(100).color(), "green");
        assert_eq!(StrengthLabel::from_percent(0).color(), "red");
    }
}
