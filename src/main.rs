use std::sync::Arc;

use anyhow::Context;

use spellcheck_bot::bot::{Bot, menu_keyboard};
use spellcheck_bot::channels::{Channel, TelegramChannel};
use spellcheck_bot::checkers::YandexSpeller;
use spellcheck_bot::config::BotConfig;
use spellcheck_bot::pipeline::CheckOrchestrator;
use spellcheck_bot::rules::{ExternalRuleSource, GoogleSheetsSource, RuleStore, spawn_reload_ticker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("invalid configuration")?;

    // ── Rules ───────────────────────────────────────────────────────────
    let source: Option<Arc<dyn ExternalRuleSource>> = config
        .sheets
        .clone()
        .map(|sheets| Arc::new(GoogleSheetsSource::new(sheets)) as Arc<dyn ExternalRuleSource>);
    let store = Arc::new(RuleStore::open(config.rule_file.clone(), source).await);
    let rules = store.snapshot().await;

    let _reload_handle = config
        .reload_interval
        .map(|interval| spawn_reload_ticker(Arc::clone(&store), interval));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rule_file = %config.rule_file.display(),
        min_text_length = rules.min_body_length,
        spelling = rules.toggles.spelling,
        custom_rules = rules.toggles.custom_rules,
        spacing = rules.toggles.spacing,
        channel_rules = rules.toggles.channel_rules,
        external_source = store.has_external_source(),
        reload_interval_secs = config.reload_interval.map_or(0, |d| d.as_secs()),
        "Starting spellcheck bot"
    );

    // ── Pipeline ────────────────────────────────────────────────────────
    let speller_timeout = config.speller.timeout;
    let oracle = Arc::new(YandexSpeller::new(config.speller.clone()));
    let orchestrator = Arc::new(CheckOrchestrator::new(
        Arc::clone(&store),
        oracle,
        speller_timeout,
    ));

    // ── Channel ─────────────────────────────────────────────────────────
    let telegram = TelegramChannel::new(config.telegram_token.clone()).with_keyboard(menu_keyboard());
    if let Err(e) = telegram.health_check().await {
        tracing::warn!(error = %e, "Telegram health check failed, polling anyway");
    }

    let mut bot = Bot::new(Arc::new(telegram), orchestrator);
    if let Some(sheets) = &config.sheets {
        bot = bot.with_rules_link(sheets.public_url());
    }

    tracing::info!("Bot started, press Ctrl+C to stop");
    bot.run().await?;
    Ok(())
}
