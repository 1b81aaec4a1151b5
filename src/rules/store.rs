//! Rule store — owns the current [`RuleConfig`] snapshot.
//!
//! Readers take an `Arc` to the snapshot and keep it for the whole check, so a
//! reload that lands mid-check never mixes old and new rules. Reloads build a
//! fresh snapshot and swap the reference.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::rules::model::{RuleConfig, RuleFile, RuleOverlay};
use crate::rules::sheets::{ExternalRuleSource, fetch_overlay};

/// What we last saw on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    NotLoaded,
    Missing,
    Loaded(SystemTime),
    Corrupt(SystemTime),
}

impl FileState {
    fn mtime(self) -> Option<SystemTime> {
        match self {
            Self::Loaded(t) | Self::Corrupt(t) => Some(t),
            Self::NotLoaded | Self::Missing => None,
        }
    }
}

/// Inputs the published snapshot is composed from.
struct LoadState {
    file: FileState,
    base: RuleConfig,
    overlay: RuleOverlay,
}

/// Holds the current rule snapshot and knows how to rebuild it.
pub struct RuleStore {
    path: Option<PathBuf>,
    source: Option<Arc<dyn ExternalRuleSource>>,
    current: RwLock<Arc<RuleConfig>>,
    /// Held only while composing and publishing, never across a fetch.
    state: Mutex<LoadState>,
    /// Serializes external fetches.
    fetching: Mutex<()>,
}

impl RuleStore {
    /// Load rules from `path` (and the external source, if any).
    ///
    /// Never fails: an unreadable file yields the built-in defaults.
    pub async fn open(path: impl Into<PathBuf>, source: Option<Arc<dyn ExternalRuleSource>>) -> Self {
        let store = Self {
            path: Some(path.into()),
            source,
            current: RwLock::new(Arc::new(RuleConfig::default())),
            state: Mutex::new(LoadState {
                file: FileState::NotLoaded,
                base: RuleConfig::default(),
                overlay: RuleOverlay::default(),
            }),
            fetching: Mutex::new(()),
        };
        store.refresh_if_changed().await;
        store.fetch_external().await;
        store
    }

    /// A store with fixed rules and no file behind it.
    pub fn in_memory(config: RuleConfig, source: Option<Arc<dyn ExternalRuleSource>>) -> Self {
        Self {
            path: None,
            source,
            current: RwLock::new(Arc::new(config.clone())),
            state: Mutex::new(LoadState {
                file: FileState::NotLoaded,
                base: config,
                overlay: RuleOverlay::default(),
            }),
            fetching: Mutex::new(()),
        }
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<RuleConfig> {
        Arc::clone(&*self.current.read().await)
    }

    pub fn has_external_source(&self) -> bool {
        self.source.is_some()
    }

    /// Re-read the rule file if its modification time moved.
    ///
    /// The new file is combined with the last fetched external rules; the
    /// external source itself is not contacted. Returns `true` when a new
    /// snapshot was published.
    pub async fn refresh_if_changed(&self) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        let mut state = self.state.lock().await;

        let mtime = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                if state.file != FileState::Missing {
                    warn!(path = %path.display(), error = %e, "Rule file unavailable, using defaults");
                    state.file = FileState::Missing;
                    state.base = RuleConfig::default();
                    self.publish(&state).await;
                    return true;
                }
                return false;
            }
        };

        if state.file.mtime() == Some(mtime) {
            return false;
        }

        match read_rule_file(path).await {
            Ok(base) => {
                info!(
                    path = %path.display(),
                    custom_rules = base.custom_rule_count(),
                    channel_rules = base.channel_rule_count(),
                    "Rule file loaded"
                );
                state.file = FileState::Loaded(mtime);
                state.base = base;
            }
            Err(e) => {
                warn!(error = %e, "Rule file rejected, using defaults");
                state.file = FileState::Corrupt(mtime);
                state.base = RuleConfig::default();
            }
        }

        self.publish(&state).await;
        true
    }

    /// Explicit reload: re-read the rule file if it changed, then re-fetch
    /// the external source.
    ///
    /// A failed fetch keeps the previous rules. Checks that start while the
    /// fetch is in flight use the current snapshot. Returns the snapshot in
    /// effect afterwards.
    pub async fn reload(&self) -> Arc<RuleConfig> {
        self.refresh_if_changed().await;
        if self.source.is_some() {
            info!("Reloading rules from external source");
            self.fetch_external().await;
        }
        self.snapshot().await
    }

    async fn fetch_external(&self) {
        let Some(source) = self.source.as_deref() else {
            return;
        };
        let _fetching = self.fetching.lock().await;
        let Some(overlay) = fetch_overlay(source).await else {
            return;
        };

        let mut state = self.state.lock().await;
        merge_overlay(&mut state.overlay, overlay);
        self.publish(&state).await;
    }

    async fn publish(&self, state: &LoadState) {
        let mut snapshot = state.base.clone().with_overlay(&state.overlay);
        snapshot.loaded_at = Utc::now();
        debug!(
            custom_rules = snapshot.custom_rule_count(),
            channel_rules = snapshot.channel_rule_count(),
            "Publishing rule snapshot"
        );
        *self.current.write().await = Arc::new(snapshot);
    }
}

/// Empty feeds leave the previous values in place.
fn merge_overlay(current: &mut RuleOverlay, fetched: RuleOverlay) {
    if !fetched.custom_rules.is_empty() {
        current.custom_rules = fetched.custom_rules;
    }
    if !fetched.channel_rules.is_empty() {
        current.channel_rules = fetched.channel_rules;
    }
}

async fn read_rule_file(path: &Path) -> Result<RuleConfig, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let file = RuleFile::parse(path, &contents)?;
    Ok(RuleConfig::from_file(file))
}

/// Spawn a background task that reloads rules every `interval`.
///
/// The task only swaps the snapshot reference, so in-flight checks are never
/// blocked or disturbed.
pub fn spawn_reload_ticker(store: Arc<RuleStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip immediate first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let snapshot = store.reload().await;
            info!(
                custom_rules = snapshot.custom_rule_count(),
                channel_rules = snapshot.channel_rule_count(),
                "Scheduled rule reload finished"
            );
        }
    })
}
