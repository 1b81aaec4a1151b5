//! External rule source — two tabular feeds in a Google spreadsheet.
//!
//! - rules feed: `wrong | correct`
//! - channel feed: `channel name | signature text` (`NEWLINE` = line break)
//!
//! The first row of each sheet is a header and is skipped.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SheetsConfig;
use crate::error::RuleSourceError;
use crate::rules::model::{ChannelRule, CustomRule, RuleOverlay, channel_key};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Upper bound for one sheet request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// A remote provider of rule data.
#[async_trait]
pub trait ExternalRuleSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    async fn load_custom_rules(&self) -> Result<Vec<CustomRule>, RuleSourceError>;

    async fn load_channel_rules(&self) -> Result<HashMap<String, ChannelRule>, RuleSourceError>;
}

/// Fetch both feeds, keeping whatever part succeeded.
///
/// Returns `None` only when both feeds failed.
pub async fn fetch_overlay(source: &dyn ExternalRuleSource) -> Option<RuleOverlay> {
    let custom = source.load_custom_rules().await;
    let channels = source.load_channel_rules().await;

    if let Err(ref e) = custom {
        warn!(source = source.name(), error = %e, "Failed to load custom rules");
    }
    if let Err(ref e) = channels {
        warn!(source = source.name(), error = %e, "Failed to load channel rules");
    }
    if custom.is_err() && channels.is_err() {
        return None;
    }

    let overlay = RuleOverlay {
        custom_rules: custom.unwrap_or_default(),
        channel_rules: channels.unwrap_or_default(),
    };
    info!(
        source = source.name(),
        custom_rules = overlay.custom_rules.len(),
        channel_rules = overlay.channel_rules.len(),
        "Loaded rules from external source"
    );
    Some(overlay)
}

/// Google Sheets v4 `values` API client.
pub struct GoogleSheetsSource {
    config: SheetsConfig,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl GoogleSheetsSource {
    pub fn new(config: SheetsConfig) -> Self {
        Self::with_base_url(config, SHEETS_API_BASE)
    }

    /// Point the client at another API host (tests).
    pub fn with_base_url(config: SheetsConfig, base_url: &str) -> Self {
        Self {
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(DEFAULT_FETCH_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    fn values_url(&self, sheet: &str) -> Result<Url, RuleSourceError> {
        let invalid = |reason: String| RuleSourceError::RequestFailed {
            source_name: self.name().to_string(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("cannot-be-a-base URL: {}", self.base_url)))?
            .extend(["v4", "spreadsheets", &self.config.spreadsheet_id, "values", sheet]);
        url.query_pairs_mut()
            .append_pair("key", self.config.api_key.expose_secret());
        Ok(url)
    }

    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, RuleSourceError> {
        let url = self.values_url(sheet)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RuleSourceError::RequestFailed {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(RuleSourceError::BadStatus {
                source_name: self.name().to_string(),
                status: resp.status().as_u16(),
            });
        }

        let range: ValueRange = resp
            .json()
            .await
            .map_err(|e| RuleSourceError::InvalidResponse {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(range.values)
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build sheets HTTP client, using defaults");
            reqwest::Client::new()
        })
}

#[async_trait]
impl ExternalRuleSource for GoogleSheetsSource {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn load_custom_rules(&self) -> Result<Vec<CustomRule>, RuleSourceError> {
        let rows = self.fetch_rows(&self.config.rules_sheet).await?;
        Ok(parse_custom_rows(&rows))
    }

    async fn load_channel_rules(&self) -> Result<HashMap<String, ChannelRule>, RuleSourceError> {
        let rows = self.fetch_rows(&self.config.channels_sheet).await?;
        Ok(parse_channel_rows(&rows))
    }
}

/// Turn `wrong | correct` rows (header included) into rules.
pub fn parse_custom_rows(rows: &[Vec<String>]) -> Vec<CustomRule> {
    rows.iter()
        .skip(1)
        .filter_map(|row| match row.as_slice() {
            [wrong, correct, ..] => CustomRule::new(wrong, correct, false),
            _ => None,
        })
        .collect()
}

/// Turn `channel | signature` rows (header included) into rules.
pub fn parse_channel_rows(rows: &[Vec<String>]) -> HashMap<String, ChannelRule> {
    rows.iter()
        .skip(1)
        .filter_map(|row| match row.as_slice() {
            [name, signature, ..] => {
                let key = channel_key(name);
                if key.is_empty() {
                    return None;
                }
                ChannelRule::from_raw(signature).map(|rule| (key, rule))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;

    use super::*;

    fn config() -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: "abc".into(),
            api_key: SecretString::from("k"),
            rules_sheet: "Rules".into(),
            channels_sheet: "Channels".into(),
        }
    }

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn custom_rows_skip_header_and_blanks() {
        let rules = parse_custom_rows(&rows(&[
            &["Неправильно", "Правильно"],
            &[" Гига чат ", "Гигачат"],
            &["", "пусто"],
            &["одна колонка"],
            &["Chat GPT", "ChatGPT", "лишняя колонка"],
        ]));
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].wrong, "Гига чат");
        assert!(!rules[0].case_sensitive);
        assert_eq!(rules[1].correct, "ChatGPT");
    }

    #[test]
    fn channel_rows_normalize_names_and_newlines() {
        let rules = parse_channel_rows(&rows(&[
            &["Канал", "Подпись"],
            &[" Кино Лаб ", "NEWLINE@filmkenner"],
            &["Пустой", ""],
        ]));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules["кино лаб"].signature_format, "\n@filmkenner");
    }

    #[test]
    fn values_url_encodes_sheet_name() {
        let source = GoogleSheetsSource::with_base_url(
            SheetsConfig {
                spreadsheet_id: "abc".into(),
                api_key: SecretString::from("k"),
                rules_sheet: "Лист1".into(),
                channels_sheet: "Лист2".into(),
            },
            "http://localhost:9000/",
        );
        let url = source.values_url("Лист1").unwrap();
        assert!(url.as_str().starts_with("http://localhost:9000/v4/spreadsheets/abc/values/%D0%9B"));
        assert!(url.as_str().ends_with("?key=k"));
    }

    #[tokio::test]
    async fn slow_sheet_times_out() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/abc/values/Rules");
            then.status(200)
                .delay(Duration::from_secs(10))
                .json_body(serde_json::json!({"values": []}));
        });

        let source = GoogleSheetsSource::with_base_url(config(), &server.base_url())
            .with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = source.load_custom_rules().await.unwrap_err();
        assert!(matches!(err, RuleSourceError::RequestFailed { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
