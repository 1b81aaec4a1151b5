//! Shared types for the check pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Submission ──────────────────────────────────────────────────────

/// The reviewable part of an inbound message. Built fresh per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub is_reviewable: bool,
    /// Everything after the first line break, untrimmed.
    pub body: Option<String>,
    /// Channel name found in the first line, if any.
    pub channel_hint: Option<String>,
}

impl Submission {
    pub fn reviewable(body: String, channel_hint: Option<String>) -> Self {
        Self {
            is_reviewable: true,
            body: Some(body),
            channel_hint,
        }
    }

    pub fn rejected() -> Self {
        Self {
            is_reviewable: false,
            body: None,
            channel_hint: None,
        }
    }
}

// ── Findings ────────────────────────────────────────────────────────

/// Finding category. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Custom,
    Spelling,
    Spacing,
    Channel,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Custom,
        Category::Spelling,
        Category::Spacing,
        Category::Channel,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Spelling => "spelling",
            Self::Spacing => "spacing",
            Self::Channel => "channel",
        }
    }
}

/// Which spacing heuristic fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpacingIssue {
    MultipleSpaces { count: usize },
    SpaceBeforePunct { mark: char },
    NoSpaceAfterPunct { mark: char },
}

/// What went wrong with a channel signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelIssue {
    /// Body does not end with the literal tail.
    WrongEnding,
    /// Handle must start on its own line.
    HandleNotOnNewLine,
    /// Handle must stay on the same line, after a space.
    HandleNotAfterSpace,
    /// No `@handle` anywhere in the body.
    MissingSignature,
}

/// One reported issue. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Finding {
    Custom {
        matched: String,
        suggestion: String,
        message: String,
    },
    Spelling {
        word: String,
        suggestions: Vec<String>,
        message: String,
    },
    Spacing {
        issue: SpacingIssue,
        context: String,
        suggestion: String,
        message: String,
    },
    Channel {
        channel: String,
        issue: ChannelIssue,
        /// Expected signature, for display.
        expected: Option<String>,
        message: String,
    },
}

impl Finding {
    pub fn category(&self) -> Category {
        match self {
            Self::Custom { .. } => Category::Custom,
            Self::Spelling { .. } => Category::Spelling,
            Self::Spacing { .. } => Category::Spacing,
            Self::Channel { .. } => Category::Channel,
        }
    }

    /// The offending text (the channel name for channel findings).
    pub fn matched_text(&self) -> &str {
        match self {
            Self::Custom { matched, .. } => matched,
            Self::Spelling { word, .. } => word,
            Self::Spacing { context, .. } => context,
            Self::Channel { channel, .. } => channel,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Custom { message, .. }
            | Self::Spelling { message, .. }
            | Self::Spacing { message, .. }
            | Self::Channel { message, .. } => message,
        }
    }
}

/// Findings grouped by category. Missing categories read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    by_category: BTreeMap<Category, Vec<Finding>>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store findings for a category, replacing earlier ones.
    pub fn insert(&mut self, category: Category, findings: Vec<Finding>) {
        self.by_category.insert(category, findings);
    }

    pub fn get(&self, category: Category) -> &[Finding] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Non-empty categories in report order.
    pub fn sections(&self) -> impl Iterator<Item = (Category, &[Finding])> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, f)| !f.is_empty())
    }
}
