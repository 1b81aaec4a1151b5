//! Rule configuration snapshot and the on-disk rule file format.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Placeholder that spreadsheet authors type instead of a real line break.
pub const NEWLINE_PLACEHOLDER: &str = "NEWLINE";

// ── Sections shared by the file format and the snapshot ─────────────

/// Which checkers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub spelling: bool,
    pub custom_rules: bool,
    #[serde(rename = "spaces")]
    pub spacing: bool,
    pub channel_rules: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            spelling: true,
            custom_rules: true,
            spacing: true,
            channel_rules: true,
        }
    }
}

/// Spacing sub-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingToggles {
    pub multiple_spaces: bool,
    #[serde(rename = "space_before_punctuation")]
    pub space_before_punct: bool,
    #[serde(rename = "no_space_after_punctuation")]
    pub no_space_after_punct: bool,
}

impl Default for SpacingToggles {
    fn default() -> Self {
        Self {
            multiple_spaces: true,
            space_before_punct: true,
            no_space_after_punct: true,
        }
    }
}

/// Report rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    #[serde(rename = "show_suggestions_count")]
    pub max_suggestions: usize,
    pub show_emoji: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            show_emoji: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub min_text_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self { min_text_length: 50 }
    }
}

// ── Rule entries ────────────────────────────────────────────────────

/// "Write `correct` instead of `wrong`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    pub wrong: String,
    pub correct: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl CustomRule {
    /// Build a rule, rejecting blank sides.
    pub fn new(wrong: &str, correct: &str, case_sensitive: bool) -> Option<Self> {
        let wrong = wrong.trim();
        let correct = correct.trim();
        if wrong.is_empty() || correct.is_empty() {
            return None;
        }
        Some(Self {
            wrong: wrong.to_string(),
            correct: correct.to_string(),
            case_sensitive,
        })
    }
}

/// Per-channel signature rule.
///
/// `signature_format` is either a literal tail the post must end with or a
/// free-text instruction ("подпись через перенос строки"). The checker infers
/// which one from the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRule {
    pub signature_format: String,
}

impl ChannelRule {
    /// Build a rule from raw cell text, translating the `NEWLINE` placeholder.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            signature_format: text.replace(NEWLINE_PLACEHOLDER, "\n"),
        })
    }
}

/// Lookup key for a channel name.
pub fn channel_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ── On-disk format ──────────────────────────────────────────────────

/// Raw rule file as written by operators.
///
/// Rule lists are kept as untyped JSON so one malformed entry is skipped
/// instead of rejecting the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleFile {
    pub checks: FeatureToggles,
    pub ignore_words: Vec<String>,
    pub custom_rules: Vec<serde_json::Value>,
    pub channel_rules: serde_json::Map<String, serde_json::Value>,
    pub space_checks: SpacingToggles,
    pub response: ResponseConfig,
    pub settings: Settings,
}

impl RuleFile {
    /// Parse rule file contents. `path` is only used for error context.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawCustomRule {
    #[serde(default)]
    wrong: Option<String>,
    #[serde(default)]
    correct: Option<String>,
    #[serde(default)]
    case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
struct RawChannelRule {
    #[serde(default)]
    signature_format: Option<String>,
}

// ── External feed overlay ───────────────────────────────────────────

/// Rules fetched from the external source. Non-empty parts replace the
/// file's rules of the same kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOverlay {
    pub custom_rules: Vec<CustomRule>,
    pub channel_rules: HashMap<String, ChannelRule>,
}

impl RuleOverlay {
    pub fn is_empty(&self) -> bool {
        self.custom_rules.is_empty() && self.channel_rules.is_empty()
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Immutable snapshot of everything the checkers read.
///
/// Never edited in place: reloads build a new snapshot and swap it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    pub toggles: FeatureToggles,
    /// Lowercased words the spelling checker never reports.
    pub ignore_words: HashSet<String>,
    pub custom_rules: Vec<CustomRule>,
    /// Keyed by [`channel_key`].
    pub channel_rules: HashMap<String, ChannelRule>,
    pub spacing: SpacingToggles,
    pub response: ResponseConfig,
    pub min_body_length: usize,
    pub loaded_at: DateTime<Utc>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            toggles: FeatureToggles::default(),
            ignore_words: HashSet::new(),
            custom_rules: Vec::new(),
            channel_rules: HashMap::new(),
            spacing: SpacingToggles::default(),
            response: ResponseConfig::default(),
            min_body_length: Settings::default().min_text_length,
            loaded_at: Utc::now(),
        }
    }
}

impl RuleConfig {
    /// Build a snapshot from a parsed rule file, skipping malformed entries.
    pub fn from_file(file: RuleFile) -> Self {
        let ignore_words = file
            .ignore_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut custom_rules = Vec::with_capacity(file.custom_rules.len());
        for (index, value) in file.custom_rules.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawCustomRule>(value)
                .ok()
                .and_then(|raw| {
                    CustomRule::new(
                        raw.wrong.as_deref().unwrap_or_default(),
                        raw.correct.as_deref().unwrap_or_default(),
                        raw.case_sensitive,
                    )
                });
            match parsed {
                Some(rule) => custom_rules.push(rule),
                None => warn!(index, "Skipping malformed custom rule"),
            }
        }

        let mut channel_rules = HashMap::with_capacity(file.channel_rules.len());
        for (name, value) in file.channel_rules {
            let parsed = serde_json::from_value::<RawChannelRule>(value)
                .ok()
                .and_then(|raw| raw.signature_format)
                .and_then(|text| ChannelRule::from_raw(&text));
            let key = channel_key(&name);
            match parsed {
                Some(rule) if !key.is_empty() => {
                    channel_rules.insert(key, rule);
                }
                _ => warn!(channel = %name, "Skipping malformed channel rule"),
            }
        }

        Self {
            toggles: file.checks,
            ignore_words,
            custom_rules,
            channel_rules,
            spacing: file.space_checks,
            response: file.response,
            min_body_length: file.settings.min_text_length,
            loaded_at: Utc::now(),
        }
    }

    /// Replace rule kinds the overlay provides.
    pub fn with_overlay(mut self, overlay: &RuleOverlay) -> Self {
        if !overlay.custom_rules.is_empty() {
            self.custom_rules = overlay.custom_rules.clone();
        }
        if !overlay.channel_rules.is_empty() {
            self.channel_rules = overlay.channel_rules.clone();
        }
        self
    }

    pub fn custom_rule_count(&self) -> usize {
        self.custom_rules.len()
    }

    pub fn channel_rule_count(&self) -> usize {
        self.channel_rules.len()
    }

    /// Look up the rule for a channel name in any case/padding.
    pub fn channel_rule(&self, name: &str) -> Option<&ChannelRule> {
        self.channel_rules.get(&channel_key(name))
    }
}
