//! Renders findings into one Telegram Markdown reply.

use std::fmt::Write;

use crate::pipeline::types::{Category, Finding, Findings};
use crate::rules::ResponseConfig;

/// Entity markers of Telegram's legacy `Markdown` parse mode, the mode replies
/// are sent in.
const MARKUP_CHARS: &[char] = &['_', '*', '`', '['];

/// Backslash-escape Telegram markup characters.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKUP_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Report renderer.
#[derive(Debug, Clone, Copy)]
pub struct ReportFormatter {
    show_emoji: bool,
    max_suggestions: usize,
}

impl ReportFormatter {
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            show_emoji: config.show_emoji,
            max_suggestions: config.max_suggestions,
        }
    }

    /// Render the report. Zero findings still yields an affirmative message.
    pub fn format(&self, findings: &Findings) -> String {
        let total = findings.total();
        if total == 0 {
            return self.no_errors();
        }

        let mut out = self.header(total);
        let sections: Vec<String> = findings
            .sections()
            .map(|(category, items)| self.section(category, items))
            .collect();
        out.push_str(&sections.join("\n"));
        out.trim_end().to_string()
    }

    fn emoji(&self, emoji: &'static str) -> &'static str {
        if self.show_emoji { emoji } else { "" }
    }

    fn no_errors(&self) -> String {
        format!("{}Ошибок не найдено!", self.emoji("✅ "))
    }

    fn header(&self, total: usize) -> String {
        format!("{}Найдено ошибок: {total}\n\n", self.emoji("❌ "))
    }

    fn section(&self, category: Category, items: &[Finding]) -> String {
        let title = match category {
            Category::Custom => format!("{}*Неправильное написание:*", self.emoji("📌 ")),
            Category::Spelling => format!("{}*Орфография:*", self.emoji("📝 ")),
            Category::Spacing => format!("{}*Пробелы:*", self.emoji("⎵ ")),
            Category::Channel => format!("{}*Правила канала:*", self.emoji("📢 ")),
        };

        let mut out = title;
        out.push('\n');
        for (i, finding) in items.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, self.line(finding));
        }
        out
    }

    fn line(&self, finding: &Finding) -> String {
        match finding {
            Finding::Custom {
                matched, suggestion, ..
            } => format!("«{matched}» → «{suggestion}»"),
            Finding::Spelling {
                word, suggestions, ..
            } => {
                let shown: Vec<String> = suggestions
                    .iter()
                    .take(self.max_suggestions)
                    .map(|s| format!("«{s}»"))
                    .collect();
                if shown.is_empty() {
                    format!("«{word}» — нет вариантов")
                } else {
                    format!("«{word}» → {}", shown.join(", "))
                }
            }
            Finding::Spacing {
                context,
                suggestion,
                message,
                ..
            } => format!("{message}: «{context}» → «{suggestion}»"),
            Finding::Channel {
                expected, message, ..
            } => match expected {
                Some(expected) => {
                    format!("{message}\n   Ожидается: {}", escape_markup(expected))
                }
                None => message.clone(),
            },
        }
    }
}
