//! Per-channel signature rules.
//!
//! Rule authors fill one spreadsheet column with either a literal tail
//! (`NEWLINE@filmkenner`) or a free-text instruction ("подпись через перенос
//! строки"). There is no mode column, so the mode is inferred from the text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::{ChannelIssue, Finding};
use crate::pipeline::validator::{extract_channel_name, split_first_line};
use crate::rules::{ChannelRule, channel_key};

/// Visible stand-in for a line break in displayed signatures.
pub const LINE_BREAK_MARKER: &str = "↵";

static LINE_BREAK_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bline[\s-]?breaks?\b|\bперенос\w*\s+строк").unwrap()
});

static SPACE_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bspaces?\b|\bпробел").unwrap());

static HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());

/// How a signature rule is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode<'a> {
    /// Body must end with exactly this text.
    ExactSuffix(&'a str),
    /// The `@handle` must start a new line.
    HandleOnNewLine,
    /// The `@handle` must follow on the same line.
    HandleAfterSpace,
}

impl<'a> SignatureMode<'a> {
    pub fn infer(rule: &'a str) -> Self {
        // Handles are part of the signature, not of the instruction.
        let instruction = HANDLE.replace_all(rule, "");
        if LINE_BREAK_HINT.is_match(&instruction) {
            Self::HandleOnNewLine
        } else if SPACE_HINT.is_match(&instruction) {
            Self::HandleAfterSpace
        } else {
            Self::ExactSuffix(rule)
        }
    }
}

/// Render line breaks visibly.
pub fn display_signature(text: &str) -> String {
    text.replace('\n', LINE_BREAK_MARKER)
}

/// Validates channel signatures in the full message text.
#[derive(Debug, Clone)]
pub struct ChannelRuleChecker {
    rules: HashMap<String, ChannelRule>,
}

impl ChannelRuleChecker {
    pub fn new(rules: HashMap<String, ChannelRule>) -> Self {
        Self { rules }
    }

    /// Check `full_text` (header line included).
    ///
    /// The channel comes from `channel_override` or the header line; no
    /// channel or no rule for it means no findings.
    pub fn check(&self, full_text: &str, channel_override: Option<&str>) -> Vec<Finding> {
        let channel = match channel_override {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => match extract_channel_name(full_text) {
                Some(name) => name,
                None => return Vec::new(),
            },
        };

        let Some(rule) = self.rules.get(&channel_key(&channel)) else {
            return Vec::new();
        };
        let Some(body) = split_first_line(full_text).1 else {
            return Vec::new();
        };

        check_signature(&channel, &rule.signature_format, body)
            .into_iter()
            .collect()
    }
}

fn check_signature(channel: &str, rule: &str, body: &str) -> Option<Finding> {
    match SignatureMode::infer(rule) {
        SignatureMode::ExactSuffix(expected) => {
            if body.ends_with(expected) {
                return None;
            }
            Some(Finding::Channel {
                channel: channel.to_string(),
                issue: ChannelIssue::WrongEnding,
                expected: Some(display_signature(expected)),
                message: format!("Неправильная подпись для канала {channel}"),
            })
        }
        mode => {
            let expected = Some(display_signature(rule));
            let Some(handle) = HANDLE.find_iter(body).last() else {
                return Some(Finding::Channel {
                    channel: channel.to_string(),
                    issue: ChannelIssue::MissingSignature,
                    expected,
                    message: format!("Не найдена подпись канала {channel}"),
                });
            };

            // Start of body counts as a fresh line.
            let on_new_line = matches!(
                body[..handle.start()].chars().next_back(),
                None | Some('\n')
            );
            let (issue, message) = match mode {
                SignatureMode::HandleOnNewLine if !on_new_line => (
                    ChannelIssue::HandleNotOnNewLine,
                    format!("Подпись {} должна начинаться с новой строки", handle.as_str()),
                ),
                SignatureMode::HandleAfterSpace if on_new_line => (
                    ChannelIssue::HandleNotAfterSpace,
                    format!(
                        "Подпись {} должна идти через пробел, без переноса строки",
                        handle.as_str()
                    ),
                ),
                _ => return None,
            };
            Some(Finding::Channel {
                channel: channel.to_string(),
                issue,
                expected,
                message,
            })
        }
    }
}
