//! Decides whether a message is a writer submission and extracts its body.
//!
//! A submission looks like:
//!
//! ```text
//! ТГ-канал Кино: t.me/kino
//! Text to review...
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::Submission;

/// Any `t.me/` link in the first line marks a submission.
static CHANNEL_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"t\.me/\S+").unwrap());

/// `ТГ-канал <name>` up to a colon or parenthesis.
static CHANNEL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ТГ-канал\s+([^:(\n]+)").unwrap());

/// Split off the first line. Returns `(first_line, rest)`.
pub fn split_first_line(text: &str) -> (&str, Option<&str>) {
    match text.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (text, None),
    }
}

/// Channel name from the first line, e.g. `"Кино"` for `"ТГ-канал Кино: t.me/kino"`.
pub fn extract_channel_name(text: &str) -> Option<String> {
    let (first_line, _) = split_first_line(text);
    CHANNEL_LABEL
        .captures(first_line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Stateless submission validator.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionValidator {
    min_body_length: usize,
}

impl SubmissionValidator {
    pub fn new(min_body_length: usize) -> Self {
        Self { min_body_length }
    }

    /// Whether the first line carries a channel link.
    pub fn has_channel_link(&self, text: &str) -> bool {
        let (first_line, _) = split_first_line(text);
        CHANNEL_LINK.is_match(first_line)
    }

    pub fn validate_and_extract(&self, text: &str) -> Submission {
        if !self.has_channel_link(text) {
            return Submission::rejected();
        }

        let Some(body) = split_first_line(text).1 else {
            return Submission::rejected();
        };

        // Length is counted in characters, not bytes.
        if body.trim().chars().count() < self.min_body_length {
            return Submission::rejected();
        }

        Submission::reviewable(body.to_string(), extract_channel_name(text))
    }
}
