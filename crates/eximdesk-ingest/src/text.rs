//! Shared text utilities and compiled patterns for the two extractors.

use once_cell::sync::Lazy;
use regex::Regex;

/// A 6–8 digit classification code run. First match in a line wins.
pub(crate) static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{6,8}").unwrap());

/// A standalone 4-digit heading token.
pub(crate) static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").unwrap());

/// A percentage anchored at end of fragment, e.g. "5%", "18.0 %".
pub(crate) static TRAILING_RATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%\s*$").unwrap());

/// First percentage occurrence anywhere in a fragment.
pub(crate) static RATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());

/// A fragment that is nothing but a percentage.
pub(crate) static RATE_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?\s*%$").unwrap());

/// Leading enumeration number on a schedule row, e.g. "12." or "3)".
/// Capped at 3 digits so 4-digit heading tokens are never eaten.
pub(crate) static SERIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,3}\s*[.)]\s*").unwrap());

/// Clean a text fragment left over from column extraction: collapse
/// whitespace runs and strip stray separator punctuation at the edges.
pub fn clean_fragment(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| matches!(c, '-' | '–' | ':' | ';' | ',' | '.' | '|'))
        .trim()
        .to_string()
}

/// Parse the first percentage value out of a fragment ("18%", "18.0 %").
pub fn parse_rate(s: &str) -> Option<f64> {
    RATE_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
