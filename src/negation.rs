// src/negation.rs
//! Negation heuristic for negative-rule matches.
//!
//! A match is negated when any cue appears in the text immediately before it,
//! within a fixed window. This is a plain substring test over the lower-cased
//! window; it does not parse grammatical scope ("we do not sell, but we share"
//! negates both verbs).

use serde::{Deserialize, Serialize};

/// How far back (in characters) to look for a negation cue.
pub const NEGATION_WINDOW_CHARS: usize = 50;

/// Cues searched for in the window. Trailing spaces on "no " / "not " keep
/// them from matching inside words like "note" or "nothing".
pub const DEFAULT_NEGATION_CUES: &[&str] = &[
    "do not", "does not", "will not", "cannot", "don't", "doesn't", "won't", "can't", "never",
    "no ", "not ",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegationDetector {
    window_chars: usize,
    cues: Vec<String>,
}

impl Default for NegationDetector {
    fn default() -> Self {
        Self::new(NEGATION_WINDOW_CHARS)
    }
}

impl NegationDetector {
    /// Default cues with a custom window.
    pub fn new(window_chars: usize) -> Self {
        Self::with_cues(
            window_chars,
            DEFAULT_NEGATION_CUES.iter().map(|c| c.to_string()),
        )
    }

    pub fn with_cues<I, S>(window_chars: usize, cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cues = cues
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self { window_chars, cues }
    }

    pub fn window_chars(&self) -> usize {
        self.window_chars
    }

    pub fn cues(&self) -> &[String] {
        &self.cues
    }

    /// True if a cue occurs in the window ending at byte offset `match_index`.
    ///
    /// Offsets past the end are clamped; offsets inside a multi-byte char are
    /// moved back to the char start.
    pub fn is_negated(&self, text: &str, match_index: usize) -> bool {
        let window = self.window_before(text, match_index);
        if window.is_empty() {
            return false;
        }
        let lowered = window.to_lowercase().replace('\u{2019}', "'");
        self.cues.iter().any(|cue| lowered.contains(cue.as_str()))
    }

    fn window_before<'t>(&self, text: &'t str, match_index: usize) -> &'t str {
        if self.window_chars == 0 {
            return "";
        }
        let mut end = match_index.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let head = &text[..end];
        let start = head
            .char_indices()
            .rev()
            .nth(self.window_chars - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &head[start..]
    }
}
