//! Custom spelling rules: "write X, not Y".

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::pipeline::types::Finding;
use crate::rules::CustomRule;

const MESSAGE: &str = "Неправильное написание";

/// A custom rule with its pattern compiled.
#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    correct: String,
}

/// Reports every occurrence of each configured wrong spelling.
#[derive(Debug, Clone)]
pub struct CustomRuleChecker {
    rules: Vec<CompiledRule>,
}

impl CustomRuleChecker {
    pub fn new(rules: &[CustomRule]) -> Self {
        let rules = rules
            .iter()
            .filter_map(|rule| {
                let built = RegexBuilder::new(&regex::escape(&rule.wrong))
                    .case_insensitive(!rule.case_sensitive)
                    .build();
                match built {
                    Ok(regex) => Some(CompiledRule {
                        regex,
                        correct: rule.correct.clone(),
                    }),
                    Err(e) => {
                        warn!(wrong = %rule.wrong, error = %e, "Skipping uncompilable custom rule");
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    /// Findings in rule order, then left to right.
    pub fn check(&self, body: &str) -> Vec<Finding> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.regex.find_iter(body).map(|m| Finding::Custom {
                    matched: m.as_str().to_string(),
                    suggestion: rule.correct.clone(),
                    message: MESSAGE.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> CustomRuleChecker {
        CustomRuleChecker::new(&[
            CustomRule::new("Гига чат", "Гигачат", false).unwrap(),
            CustomRule::new("Chat GPT", "ChatGPT", false).unwrap(),
        ])
    }

    fn suggestions(findings: &[Finding]) -> Vec<(&str, &str)> {
        findings
            .iter()
            .map(|f| match f {
                Finding::Custom {
                    matched, suggestion, ..
                } => (matched.as_str(), suggestion.as_str()),
                other => panic!("unexpected finding {other:?}"),
            })
            .collect()
    }

    #[test]
    fn finds_wrong_spelling() {
        let findings = checker().check("Работает через Гига чат");
        assert_eq!(suggestions(&findings), vec![("Гига чат", "Гигачат")]);
    }

    #[test]
    fn case_insensitive_by_default() {
        let findings = checker().check("Работает через ГИГА ЧАТ");
        assert_eq!(suggestions(&findings), vec![("ГИГА ЧАТ", "Гигачат")]);
    }

    #[test]
    fn case_sensitive_rule_respects_case() {
        let checker = CustomRuleChecker::new(&[CustomRule::new("Iphone", "iPhone", true).unwrap()]);
        assert!(checker.check("новый IPHONE").is_empty());
        assert_eq!(checker.check("новый Iphone").len(), 1);
    }

    #[test]
    fn every_occurrence_in_rule_order() {
        let findings = checker().check("Chat GPT и гига чат, потом снова chat gpt");
        assert_eq!(
            suggestions(&findings),
            vec![
                ("гига чат", "Гигачат"),
                ("Chat GPT", "ChatGPT"),
                ("chat gpt", "ChatGPT"),
            ]
        );
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let checker = CustomRuleChecker::new(&[CustomRule::new("C++.", "C++", false).unwrap()]);
        assert!(checker.check("язык Cpp!").is_empty());
        assert_eq!(checker.check("язык C++.").len(), 1);
    }

    #[test]
    fn overlapping_rules_both_report() {
        let checker = CustomRuleChecker::new(&[
            CustomRule::new("Гига чат", "Гигачат", false).unwrap(),
            CustomRule::new("чат", "Чат", true).unwrap(),
        ]);
        assert_eq!(checker.check("Гига чат").len(), 2);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let c = checker();
        let text = "Гига чат и Chat GPT";
        assert_eq!(c.check(text), c.check(text));
    }
}
