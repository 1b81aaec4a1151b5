//! Text check pipeline.
//!
//! Every inbound text flows through:
//! 1. `SubmissionValidator::validate_and_extract()` — is it a publication?
//! 2. The enabled checkers, in fixed order, over one rule snapshot
//! 3. `ReportFormatter::format()` — one Markdown reply
//!
//! Non-reviewable text produces no reply at all.

pub mod formatter;
pub mod orchestrator;
pub mod types;
pub mod validator;

pub use formatter::ReportFormatter;
pub use orchestrator::CheckOrchestrator;
pub use types::{Category, Finding, Findings, Submission};
pub use validator::SubmissionValidator;
