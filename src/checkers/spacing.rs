//! Spacing heuristics: doubled spaces and spaces around punctuation.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::{Finding, SpacingIssue};
use crate::rules::SpacingToggles;

static MULTIPLE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)( {2,})(\S+)").unwrap());

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)( +)([,.!?;:])").unwrap());

static NO_SPACE_AFTER_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)([,.!?;:])([а-яА-ЯёЁa-zA-Z]\S*)").unwrap());

/// Runs the enabled spacing sub-checks in a fixed order.
#[derive(Debug, Clone, Copy)]
pub struct SpacingChecker {
    toggles: SpacingToggles,
}

impl SpacingChecker {
    pub fn new(toggles: SpacingToggles) -> Self {
        Self { toggles }
    }

    pub fn check(&self, body: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        if self.toggles.multiple_spaces {
            findings.extend(multiple_spaces(body));
        }
        if self.toggles.space_before_punct {
            findings.extend(space_before_punct(body));
        }
        if self.toggles.no_space_after_punct {
            findings.extend(no_space_after_punct(body));
        }
        findings
    }
}

fn multiple_spaces(body: &str) -> Vec<Finding> {
    MULTIPLE_SPACES
        .captures_iter(body)
        .map(|caps| {
            let count = caps[2].chars().count();
            Finding::Spacing {
                issue: SpacingIssue::MultipleSpaces { count },
                context: caps[0].to_string(),
                suggestion: format!("{} {}", &caps[1], &caps[3]),
                message: format!("Лишние пробелы ({count} подряд)"),
            }
        })
        .collect()
}

fn space_before_punct(body: &str) -> Vec<Finding> {
    SPACE_BEFORE_PUNCT
        .captures_iter(body)
        .map(|caps| {
            let mark = first_char(&caps[3]);
            Finding::Spacing {
                issue: SpacingIssue::SpaceBeforePunct { mark },
                context: caps[0].to_string(),
                suggestion: format!("{}{}", &caps[1], &caps[3]),
                message: format!("Пробел перед \"{mark}\""),
            }
        })
        .collect()
}

fn no_space_after_punct(body: &str) -> Vec<Finding> {
    NO_SPACE_AFTER_PUNCT
        .captures_iter(body)
        .map(|caps| {
            let mark = first_char(&caps[2]);
            Finding::Spacing {
                issue: SpacingIssue::NoSpaceAfterPunct { mark },
                context: caps[0].to_string(),
                suggestion: format!("{}{} {}", &caps[1], &caps[2], &caps[3]),
                message: format!("Нет пробела после \"{mark}\""),
            }
        })
        .collect()
}

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or(' ')
}
