//! Process configuration, read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Yandex Speller endpoint.
pub const DEFAULT_SPELLER_URL: &str =
    "https://speller.yandex.net/services/spellservice.json/checkText";

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub telegram_token: SecretString,
    /// Path to the JSON rule file.
    pub rule_file: PathBuf,
    /// External spreadsheet rule source, if configured.
    pub sheets: Option<SheetsConfig>,
    /// Spelling oracle settings.
    pub speller: SpellerConfig,
    /// Background reload interval. `None` disables the ticker.
    pub reload_interval: Option<Duration>,
}

/// Google Sheets rule feed settings.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: SecretString,
    /// Worksheet holding the `wrong | correct` feed.
    pub rules_sheet: String,
    /// Worksheet holding the `channel | signature` feed.
    pub channels_sheet: String,
}

impl SheetsConfig {
    /// Browser link to the spreadsheet, shown in the help message.
    pub fn public_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}",
            self.spreadsheet_id
        )
    }
}

/// Spelling oracle settings.
#[derive(Debug, Clone)]
pub struct SpellerConfig {
    pub url: String,
    pub lang: String,
    pub timeout: Duration,
}

impl Default for SpellerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SPELLER_URL.to_string(),
            lang: "ru".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl BotConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let rule_file = lookup("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config/bot_config.json"));

        let sheets = match (
            lookup("GOOGLE_SPREADSHEET_ID").filter(|s| !s.is_empty()),
            lookup("GOOGLE_SHEETS_API_KEY").filter(|s| !s.is_empty()),
        ) {
            (Some(spreadsheet_id), Some(api_key)) => Some(SheetsConfig {
                spreadsheet_id,
                api_key: SecretString::from(api_key),
                rules_sheet: lookup("GOOGLE_RULES_SHEET").unwrap_or_else(|| "Лист1".into()),
                channels_sheet: lookup("GOOGLE_CHANNELS_SHEET")
                    .unwrap_or_else(|| "Лист2".into()),
            }),
            _ => None,
        };

        let defaults = SpellerConfig::default();
        let speller = SpellerConfig {
            url: lookup("SPELLER_URL").unwrap_or(defaults.url),
            lang: lookup("SPELLER_LANG").unwrap_or(defaults.lang),
            timeout: match lookup("SPELLER_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(parse_secs("SPELLER_TIMEOUT_SECS", &raw)?),
                None => defaults.timeout,
            },
        };

        let reload_secs = match lookup("RULES_RELOAD_INTERVAL_SECS") {
            Some(raw) => parse_secs("RULES_RELOAD_INTERVAL_SECS", &raw)?,
            None => 3 * 60 * 60,
        };
        let reload_interval = (reload_secs > 0).then(|| Duration::from_secs(reload_secs));

        Ok(Self {
            telegram_token: SecretString::from(telegram_token),
            rule_file,
            sheets,
            speller,
            reload_interval,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = BotConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn defaults_apply() {
        let config = BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.rule_file, PathBuf::from("config/bot_config.json"));
        assert!(config.sheets.is_none());
        assert_eq!(config.speller.lang, "ru");
        assert_eq!(config.speller.timeout, Duration::from_secs(10));
        assert_eq!(config.reload_interval, Some(Duration::from_secs(10_800)));
    }

    #[test]
    fn sheets_require_both_id_and_key() {
        let only_id = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GOOGLE_SPREADSHEET_ID", "sheet-id"),
        ]))
        .unwrap();
        assert!(only_id.sheets.is_none());

        let both = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GOOGLE_SPREADSHEET_ID", "sheet-id"),
            ("GOOGLE_SHEETS_API_KEY", "key"),
        ]))
        .unwrap();
        let sheets = both.sheets.unwrap();
        assert_eq!(sheets.rules_sheet, "Лист1");
        assert_eq!(sheets.channels_sheet, "Лист2");
        assert_eq!(
            sheets.public_url(),
            "https://docs.google.com/spreadsheets/d/sheet-id"
        );
    }

    #[test]
    fn zero_interval_disables_reload() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("RULES_RELOAD_INTERVAL_SECS", "0"),
        ]))
        .unwrap();
        assert!(config.reload_interval.is_none());
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("SPELLER_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SPELLER_TIMEOUT_SECS"));
    }
}
