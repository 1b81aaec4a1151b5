//! Check orchestrator: one snapshot, one validation, every enabled checker.
//!
//! Flow:
//! 1. Refresh the rule file if it changed, then take one snapshot
//! 2. `SubmissionValidator` decides whether the message is reviewable
//! 3. Checkers run in fixed order: custom rules, spelling, spacing, channel
//! 4. `ReportFormatter` renders the findings (for `check_text`)

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::checkers::{CheckInput, SpellingOracle, build_checkers};
use crate::pipeline::formatter::ReportFormatter;
use crate::pipeline::types::{Category, Findings};
use crate::pipeline::validator::SubmissionValidator;
use crate::rules::{RuleConfig, RuleStore};

/// Runs the checker pipeline against the current rules.
pub struct CheckOrchestrator {
    store: Arc<RuleStore>,
    oracle: Arc<dyn SpellingOracle>,
    spelling_timeout: Duration,
}

impl CheckOrchestrator {
    pub fn new(
        store: Arc<RuleStore>,
        oracle: Arc<dyn SpellingOracle>,
        spelling_timeout: Duration,
    ) -> Self {
        Self {
            store,
            oracle,
            spelling_timeout,
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Run every enabled checker. `None` means the text is not reviewable.
    pub async fn run_all(&self, full_text: &str) -> Option<Findings> {
        let snapshot = self.fresh_snapshot().await;
        self.run_with(&snapshot, full_text, None).await
    }

    /// Run the checks and render the report. `None` means not reviewable.
    pub async fn check_text(&self, full_text: &str) -> Option<String> {
        self.report(full_text, None).await
    }

    /// [`check_text`](Self::check_text) for a text sent by `sender`.
    pub async fn check_text_from(&self, full_text: &str, sender: &str) -> Option<String> {
        self.report(full_text, Some(sender)).await
    }

    async fn report(&self, full_text: &str, sender: Option<&str>) -> Option<String> {
        let snapshot = self.fresh_snapshot().await;
        let findings = self.run_with(&snapshot, full_text, sender).await?;
        Some(ReportFormatter::new(snapshot.response).format(&findings))
    }

    async fn fresh_snapshot(&self) -> Arc<RuleConfig> {
        if self.store.refresh_if_changed().await {
            debug!("Rule file changed, using fresh snapshot");
        }
        self.store.snapshot().await
    }

    async fn run_with(
        &self,
        snapshot: &RuleConfig,
        full_text: &str,
        sender: Option<&str>,
    ) -> Option<Findings> {
        let check_id = Uuid::new_v4();
        let sender = sender.unwrap_or("-");
        let submission =
            SubmissionValidator::new(snapshot.min_body_length).validate_and_extract(full_text);
        let Some(body) = submission.body.as_deref() else {
            debug!(%check_id, sender, "Text is not reviewable, skipping checks");
            return None;
        };

        let input = CheckInput {
            full_text,
            body,
            channel_hint: submission.channel_hint.as_deref(),
        };

        let mut findings = Findings::new();
        for checker in build_checkers(snapshot, Arc::clone(&self.oracle), self.spelling_timeout) {
            let category = checker.category();
            let found = checker.run(&input).await;
            debug!(%check_id, category = category.label(), count = found.len(), "Checker finished");
            findings.insert(category, found);
        }

        info!(
            %check_id,
            sender,
            channel = input.channel_hint.unwrap_or("-"),
            custom = findings.get(Category::Custom).len(),
            spelling = findings.get(Category::Spelling).len(),
            spacing = findings.get(Category::Spacing).len(),
            channel_rules = findings.get(Category::Channel).len(),
            total = findings.total(),
            "Check complete"
        );
        Some(findings)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::checkers::Misspelling;
    use crate::error::{RuleSourceError, SpellerError};
    use crate::pipeline::types::Finding;
    use crate::rules::{ChannelRule, CustomRule, ExternalRuleSource, FeatureToggles, channel_key};

    struct FixedOracle(Vec<Misspelling>);

    #[async_trait]
    impl SpellingOracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn check(&self, text: &str) -> Result<Vec<Misspelling>, SpellerError> {
            Ok(self
                .0
                .iter()
                .filter(|m| text.contains(&m.word))
                .cloned()
                .collect())
        }
    }

    struct StaticSource {
        custom: Vec<CustomRule>,
    }

    #[async_trait]
    impl ExternalRuleSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }
        async fn load_custom_rules(&self) -> Result<Vec<CustomRule>, RuleSourceError> {
            Ok(self.custom.clone())
        }
        async fn load_channel_rules(&self) -> Result<HashMap<String, ChannelRule>, RuleSourceError> {
            Ok(HashMap::new())
        }
    }

    const POST: &str = "ТГ-канал Кино: t.me/kino\nЭто длинный текст про ГИГА ЧАТ и ошыбка  в нем, чтобы хватило длины.";

    fn oracle() -> Arc<dyn SpellingOracle> {
        Arc::new(FixedOracle(vec![Misspelling {
            word: "ошыбка".into(),
            suggestions: vec!["ошибка".into()],
        }]))
    }

    fn config() -> RuleConfig {
        let mut channel_rules = HashMap::new();
        channel_rules.insert(channel_key("Кино"), ChannelRule::from_raw("NEWLINE@kino").unwrap());
        RuleConfig {
            custom_rules: vec![CustomRule::new("Гига чат", "Гигачат", false).unwrap()],
            channel_rules,
            ..RuleConfig::default()
        }
    }

    fn orchestrator(config: RuleConfig) -> CheckOrchestrator {
        CheckOrchestrator::new(
            Arc::new(RuleStore::in_memory(config, None)),
            oracle(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn unreviewable_text_short_circuits() {
        let o = orchestrator(config());
        assert!(o.run_all("Просто текст без ссылки").await.is_none());
        assert!(o.run_all("ТГ-канал Кино: t.me/kino\nкоротко").await.is_none());
        assert!(o.check_text("ТГ-канал Кино: t.me/kino").await.is_none());
    }

    #[tokio::test]
    async fn every_category_reports() {
        let findings = orchestrator(config()).run_all(POST).await.unwrap();
        for category in Category::ALL {
            assert_eq!(findings.get(category).len(), 1, "{category:?}");
        }
        assert!(matches!(
            &findings.get(Category::Custom)[0],
            Finding::Custom { suggestion, .. } if suggestion == "Гигачат"
        ));
    }

    #[tokio::test]
    async fn identical_input_gives_identical_report() {
        let o = orchestrator(config());
        let first = o.check_text(POST).await.unwrap();
        let second = o.check_text(POST).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("❌ Найдено ошибок: 4"));
    }

    #[tokio::test]
    async fn disabled_checkers_contribute_nothing() {
        let o = orchestrator(RuleConfig {
            toggles: FeatureToggles {
                spelling: false,
                custom_rules: false,
                spacing: true,
                channel_rules: false,
            },
            ..config()
        });
        let findings = o.run_all(POST).await.unwrap();
        assert_eq!(findings.total(), 1);
        assert_eq!(findings.get(Category::Spacing).len(), 1);
    }

    #[tokio::test]
    async fn clean_text_reports_no_errors() {
        let o = orchestrator(RuleConfig::default());
        let text = "ТГ-канал Новости: t.me/news\nСовершенно правильный текст, в котором нет ни одной проблемы.";
        assert_eq!(o.check_text(text).await.as_deref(), Some("✅ Ошибок не найдено!"));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn check_log_names_the_sender() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let report = orchestrator(config()).check_text_from(POST, "writer42").await;
        assert!(report.is_some());

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|line| line.contains("Check complete"))
            .unwrap();
        assert!(line.contains("sender=") && line.contains("writer42"), "{line}");
        assert!(line.contains("check_id="), "{line}");
    }

    #[tokio::test]
    async fn reload_is_visible_to_next_check() {
        let source = Arc::new(StaticSource {
            custom: vec![CustomRule::new("ошыбка", "ошибка", false).unwrap()],
        });
        let store = Arc::new(RuleStore::in_memory(RuleConfig::default(), Some(source)));
        let o = CheckOrchestrator::new(Arc::clone(&store), oracle(), Duration::from_secs(1));

        let before = o.run_all(POST).await.unwrap();
        assert!(before.get(Category::Custom).is_empty());

        store.reload().await;
        let after = o.run_all(POST).await.unwrap();
        assert_eq!(after.get(Category::Custom).len(), 1);
    }
}
