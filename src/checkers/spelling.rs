//! Spelling via an external oracle (Yandex Speller by default).
//!
//! The oracle is a black box: any failure or timeout yields zero findings so a
//! slow third party never holds up the other checkers.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SpellerConfig;
use crate::error::SpellerError;
use crate::pipeline::types::Finding;

const MESSAGE: &str = "Орфографическая ошибка";

/// One misspelling reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Misspelling {
    pub word: String,
    #[serde(rename = "s", default)]
    pub suggestions: Vec<String>,
}

/// A remote spell-check service.
#[async_trait]
pub trait SpellingOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, text: &str) -> Result<Vec<Misspelling>, SpellerError>;
}

/// Yandex Speller `checkText` client.
pub struct YandexSpeller {
    config: SpellerConfig,
    client: reqwest::Client,
}

impl YandexSpeller {
    pub fn new(config: SpellerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build speller HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { config, client }
    }
}

#[async_trait]
impl SpellingOracle for YandexSpeller {
    fn name(&self) -> &str {
        "yandex-speller"
    }

    async fn check(&self, text: &str) -> Result<Vec<Misspelling>, SpellerError> {
        let params = [("text", text), ("lang", self.config.lang.as_str()), ("options", "0")];
        let resp = self
            .client
            .post(&self.config.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpellerError::Timeout(self.config.timeout)
                } else {
                    SpellerError::RequestFailed(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(SpellerError::BadStatus {
                status: resp.status().as_u16(),
            });
        }

        resp.json::<Vec<Misspelling>>()
            .await
            .map_err(|e| SpellerError::InvalidResponse(e.to_string()))
    }
}

/// Reports oracle misspellings minus the ignore list.
#[derive(Clone)]
pub struct SpellingChecker {
    oracle: Arc<dyn SpellingOracle>,
    ignore_words: HashSet<String>,
    timeout: Duration,
}

impl SpellingChecker {
    pub fn new(oracle: Arc<dyn SpellingOracle>, ignore_words: HashSet<String>, timeout: Duration) -> Self {
        Self {
            oracle,
            ignore_words,
            timeout,
        }
    }

    /// Never fails; oracle errors are logged and produce no findings.
    pub async fn check(&self, body: &str) -> Vec<Finding> {
        let result = match tokio::time::timeout(self.timeout, self.oracle.check(body)).await {
            Ok(result) => result,
            Err(_) => Err(SpellerError::Timeout(self.timeout)),
        };

        let misspellings = match result {
            Ok(m) => m,
            Err(e) => {
                warn!(oracle = self.oracle.name(), error = %e, "Spelling check failed, skipping");
                return Vec::new();
            }
        };

        let findings: Vec<Finding> = misspellings
            .into_iter()
            .filter(|m| !self.ignore_words.contains(&m.word.to_lowercase()))
            .map(|m| Finding::Spelling {
                word: m.word,
                suggestions: m.suggestions,
                message: MESSAGE.to_string(),
            })
            .collect();
        debug!(count = findings.len(), "Spelling check finished");
        findings
    }
}

impl std::fmt::Debug for SpellingChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpellingChecker")
            .field("oracle", &self.oracle.name())
            .field("ignore_words", &self.ignore_words.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
