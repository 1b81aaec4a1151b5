//! Spellcheck bot — checks channel publications before they go out.

pub mod bot;
pub mod channels;
pub mod checkers;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod rules;
