//! Bot front end: menu commands and the check flow.
//!
//! Each inbound text is either one of the menu commands (matched exactly) or
//! a candidate publication for the check pipeline. Non-reviewable text gets
//! no reply.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::error;
use crate::pipeline::CheckOrchestrator;
use crate::rules::RuleConfig;

pub const RELOAD_BUTTON: &str = "🔄 Обновить правила";
pub const STATUS_BUTTON: &str = "📊 Статус";
pub const HELP_BUTTON: &str = "ℹ️ Помощь";

/// Appended to every check report.
pub const REPORT_FOOTER: &str =
    "\n\n💡 _Если правила в Google Sheets изменились, нажми '🔄 Обновить правила'_";

/// Reply keyboard rows: reload on top, status and help below.
pub fn menu_keyboard() -> Vec<Vec<String>> {
    vec![
        vec![RELOAD_BUTTON.to_string()],
        vec![STATUS_BUTTON.to_string(), HELP_BUTTON.to_string()],
    ]
}

/// What an inbound text asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Reload,
    Status,
    Help,
    /// Any other slash command; ignored.
    Unknown,
    /// Plain text to check.
    Check,
}

impl BotCommand {
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();
        match trimmed {
            RELOAD_BUTTON => return Self::Reload,
            STATUS_BUTTON => return Self::Status,
            HELP_BUTTON => return Self::Help,
            _ => {}
        }

        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Check;
        };
        // "/start@my_bot payload" → "start"
        let name = command
            .split_whitespace()
            .next()
            .and_then(|word| word.split('@').next())
            .unwrap_or_default()
            .to_lowercase();
        match name.as_str() {
            "start" => Self::Start,
            "reload" => Self::Reload,
            "status" => Self::Status,
            "help" => Self::Help,
            _ => Self::Unknown,
        }
    }
}

/// The bot: one channel, one check pipeline.
pub struct Bot {
    channel: Arc<dyn Channel>,
    orchestrator: Arc<CheckOrchestrator>,
    /// Link to the editable rule spreadsheet, shown in help.
    rules_link: Option<String>,
}

impl Bot {
    pub fn new(channel: Arc<dyn Channel>, orchestrator: Arc<CheckOrchestrator>) -> Self {
        Self {
            channel,
            orchestrator,
            rules_link: None,
        }
    }

    pub fn with_rules_link(mut self, url: impl Into<String>) -> Self {
        self.rules_link = Some(url.into());
        self
    }

    /// Run until Ctrl+C or the channel stream ends.
    pub async fn run(self) -> error::Result<()> {
        let mut stream = self.channel.start().await?;
        tracing::info!(channel = self.channel.name(), "Bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let Some(response) = self.handle_message(&message).await else {
                continue;
            };
            if let Err(e) = self.channel.respond(&message, response).await {
                tracing::error!(id = %message.id, error = %e, "Failed to send reply");
            }
        }

        self.channel.shutdown().await?;
        Ok(())
    }

    /// Decide the reply for one inbound message, if any.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Option<OutgoingResponse> {
        match BotCommand::parse(&message.content) {
            BotCommand::Start => {
                let rules = self.orchestrator.store().snapshot().await;
                Some(OutgoingResponse::text(start_text(&rules)))
            }
            BotCommand::Reload => {
                tracing::info!(sender = message.sender(), "Rule reload requested");
                let rules = self.orchestrator.store().reload().await;
                tracing::info!(
                    custom_rules = rules.custom_rule_count(),
                    channel_rules = rules.channel_rule_count(),
                    "Rules reloaded on request"
                );
                Some(OutgoingResponse::text(reload_text(&rules)))
            }
            BotCommand::Status => {
                let rules = self.orchestrator.store().snapshot().await;
                Some(OutgoingResponse::text(status_text(&rules)))
            }
            BotCommand::Help => Some(OutgoingResponse::text(help_text(self.rules_link.as_deref()))),
            BotCommand::Unknown => None,
            BotCommand::Check => {
                let report = self
                    .orchestrator
                    .check_text_from(&message.content, message.sender())
                    .await?;
                tracing::info!(id = %message.id, sender = message.sender(), "Sending check report");
                Some(OutgoingResponse::text(format!("{report}{REPORT_FOOTER}")).quoting_original())
            }
        }
    }
}

fn rule_counts(rules: &RuleConfig) -> String {
    format!(
        "📌 Кастомных правил: {}\n📢 Правил каналов: {}",
        rules.custom_rule_count(),
        rules.channel_rule_count()
    )
}

fn start_text(rules: &RuleConfig) -> String {
    format!(
        "👋 *Привет! Я бот для проверки текстов.*\n\n\
         📝 *Что я проверяю:*\n\
         • Орфографию\n\
         • Кастомные правила написания\n\
         • Пробелы\n\
         • Правила каналов\n\n\
         📊 *Загружено правил:*\n{}\n\n\
         ⚠️ *ВАЖНО:* после изменения правил в Google Sheets нажми кнопку *'{RELOAD_BUTTON}'*!\n\n\
         💡 Отправь сообщение с ссылкой на канал для проверки.",
        rule_counts(rules)
    )
}

fn reload_text(rules: &RuleConfig) -> String {
    format!(
        "✅ *Правила обновлены!*\n\n{}\n\nТеперь можно проверять тексты с новыми правилами!",
        rule_counts(rules)
    )
}

fn status_text(rules: &RuleConfig) -> String {
    format!(
        "📊 *Статус бота:*\n\n{}\n🕒 Обновлено: {}\n\n✅ Бот работает нормально!",
        rule_counts(rules),
        rules.loaded_at.format("%d.%m.%Y %H:%M:%S UTC")
    )
}

fn help_text(rules_link: Option<&str>) -> String {
    let mut text = String::from(
        "ℹ️ *Как пользоваться ботом:*\n\n\
         1️⃣ Отправь текст с ссылкой на канал в первой строке\n\
         \u{20}  Пример:\n\
         \u{20}  `ТГ-канал Тест: t.me/test`\n\
         \u{20}  `Текст для проверки...`\n\n\
         2️⃣ Бот найдет все ошибки и предложит исправления\n\n\
         3️⃣ Если добавил новые правила в Google Sheets, нажми *'🔄 Обновить правила'*",
    );
    if let Some(url) = rules_link {
        text.push_str(&format!("\n\n📝 *Правила редактируются здесь:*\n[Google Sheets]({url})"));
    }
    text
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::checkers::{Misspelling, SpellingOracle};
    use crate::error::{ChannelError, SpellerError};
    use crate::rules::{CustomRule, RuleStore};

    struct SilentOracle;

    #[async_trait]
    impl SpellingOracle for SilentOracle {
        fn name(&self) -> &str {
            "silent"
        }
        async fn check(&self, _text: &str) -> Result<Vec<Misspelling>, SpellerError> {
            Ok(vec![])
        }
    }

    struct NullChannel;

    #[async_trait]
    impl Channel for NullChannel {
        fn name(&self) -> &str {
            "null"
        }
        async fn start(&self) -> Result<crate::channels::MessageStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }
        async fn respond(
            &self,
            _msg: &IncomingMessage,
            _response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn bot() -> Bot {
        let config = RuleConfig {
            custom_rules: vec![CustomRule::new("Гига чат", "Гигачат", false).unwrap()],
            channel_rules: HashMap::new(),
            ..RuleConfig::default()
        };
        let store = Arc::new(RuleStore::in_memory(config, None));
        let orchestrator = Arc::new(CheckOrchestrator::new(
            store,
            Arc::new(SilentOracle),
            Duration::from_secs(1),
        ));
        Bot::new(Arc::new(NullChannel), orchestrator)
    }

    fn msg(text: &str) -> IncomingMessage {
        IncomingMessage::new("test", "1", text)
    }

    #[test]
    fn parse_buttons_and_commands() {
        assert_eq!(BotCommand::parse(RELOAD_BUTTON), BotCommand::Reload);
        assert_eq!(BotCommand::parse(STATUS_BUTTON), BotCommand::Status);
        assert_eq!(BotCommand::parse(HELP_BUTTON), BotCommand::Help);
        assert_eq!(BotCommand::parse("/start"), BotCommand::Start);
        assert_eq!(BotCommand::parse("/START@spell_bot"), BotCommand::Start);
        assert_eq!(BotCommand::parse("/unknown"), BotCommand::Unknown);
        assert_eq!(BotCommand::parse("Статус"), BotCommand::Check);
    }

    #[test]
    fn keyboard_layout() {
        let rows = menu_keyboard();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![RELOAD_BUTTON]);
        assert_eq!(rows[1], vec![STATUS_BUTTON, HELP_BUTTON]);
    }

    #[tokio::test]
    async fn start_shows_rule_counts() {
        let reply = bot().handle_message(&msg("/start")).await.unwrap();
        assert!(reply.content.contains("Кастомных правил: 1"));
        assert!(reply.content.contains("Правил каналов: 0"));
        assert!(!reply.quote_original);
    }

    #[tokio::test]
    async fn buttons_are_never_checked() {
        let b = bot();
        for button in [RELOAD_BUTTON, STATUS_BUTTON, HELP_BUTTON] {
            let reply = b.handle_message(&msg(button)).await.unwrap();
            assert!(!reply.content.contains("Найдено ошибок"));
            assert!(!reply.content.contains(REPORT_FOOTER));
        }
    }

    #[tokio::test]
    async fn status_reports_loaded_at() {
        let reply = bot().handle_message(&msg(STATUS_BUTTON)).await.unwrap();
        assert!(reply.content.contains("Обновлено:"));
        assert!(reply.content.contains("UTC"));
    }

    #[tokio::test]
    async fn help_includes_link_when_configured() {
        let plain = bot().handle_message(&msg(HELP_BUTTON)).await.unwrap();
        assert!(!plain.content.contains("docs.google.com"));

        let linked = bot()
            .with_rules_link("https://docs.google.com/spreadsheets/d/abc")
            .handle_message(&msg(HELP_BUTTON))
            .await
            .unwrap();
        assert!(linked.content.contains("(https://docs.google.com/spreadsheets/d/abc)"));
    }

    #[tokio::test]
    async fn report_quotes_original_and_has_footer() {
        let text = "ТГ-канал Тест: t.me/test\nЗдесь упоминается Гига чат, и текста достаточно для проверки ботом.";
        let reply = bot().handle_message(&msg(text)).await.unwrap();
        assert!(reply.quote_original);
        assert!(reply.content.contains("«Гига чат» → «Гигачат»"));
        assert!(reply.content.ends_with(REPORT_FOOTER));
    }

    #[tokio::test]
    async fn unreviewable_text_gets_no_reply() {
        let b = bot();
        assert!(b.handle_message(&msg("привет")).await.is_none());
        assert!(b.handle_message(&msg("/settings")).await.is_none());
    }

    #[tokio::test]
    async fn run_stops_when_stream_ends() {
        assert!(bot().run().await.is_ok());
    }
}
