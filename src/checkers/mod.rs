//! Text checkers.
//!
//! Each checker reads only its slice of the rule snapshot and the submitted
//! text. [`build_checkers`] rebuilds the full set from a snapshot in the fixed
//! run order: custom rules, spelling, spacing, channel rules.

pub mod channel;
pub mod custom;
pub mod spacing;
pub mod spelling;

use std::sync::Arc;
use std::time::Duration;

pub use channel::ChannelRuleChecker;
pub use custom::CustomRuleChecker;
pub use spacing::SpacingChecker;
pub use spelling::{Misspelling, SpellingChecker, SpellingOracle, YandexSpeller};

use crate::pipeline::types::{Category, Finding};
use crate::rules::RuleConfig;

/// What a checker gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// Whole message, header line included.
    pub full_text: &'a str,
    /// Reviewable body.
    pub body: &'a str,
    pub channel_hint: Option<&'a str>,
}

/// One checker variant.
#[derive(Debug, Clone)]
pub enum Checker {
    Custom(CustomRuleChecker),
    Spelling(SpellingChecker),
    Spacing(SpacingChecker),
    Channel(ChannelRuleChecker),
}

impl Checker {
    pub fn category(&self) -> Category {
        match self {
            Self::Custom(_) => Category::Custom,
            Self::Spelling(_) => Category::Spelling,
            Self::Spacing(_) => Category::Spacing,
            Self::Channel(_) => Category::Channel,
        }
    }

    pub async fn run(&self, input: &CheckInput<'_>) -> Vec<Finding> {
        match self {
            Self::Custom(c) => c.check(input.body),
            Self::Spelling(c) => c.check(input.body).await,
            Self::Spacing(c) => c.check(input.body),
            Self::Channel(c) => c.check(input.full_text, input.channel_hint),
        }
    }
}

/// Build the enabled checkers, in run order, from a rule snapshot.
pub fn build_checkers(
    config: &RuleConfig,
    oracle: Arc<dyn SpellingOracle>,
    spelling_timeout: Duration,
) -> Vec<Checker> {
    let toggles = config.toggles;
    let mut checkers = Vec::with_capacity(4);
    if toggles.custom_rules {
        checkers.push(Checker::Custom(CustomRuleChecker::new(&config.custom_rules)));
    }
    if toggles.spelling {
        checkers.push(Checker::Spelling(SpellingChecker::new(
            oracle,
            config.ignore_words.clone(),
            spelling_timeout,
        )));
    }
    if toggles.spacing {
        checkers.push(Checker::Spacing(SpacingChecker::new(config.spacing)));
    }
    if toggles.channel_rules {
        checkers.push(Checker::Channel(ChannelRuleChecker::new(
            config.channel_rules.clone(),
        )));
    }
    checkers
}
