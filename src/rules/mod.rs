//! Rule configuration: the snapshot model, its store, and the external feed.

pub mod model;
pub mod sheets;
pub mod store;

pub use model::{
    ChannelRule, CustomRule, FeatureToggles, ResponseConfig, RuleConfig, RuleOverlay,
    SpacingToggles, channel_key,
};
pub use sheets::{ExternalRuleSource, GoogleSheetsSource};
pub use store::{RuleStore, spawn_reload_ticker};
