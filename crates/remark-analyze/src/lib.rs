//! Comment annotation pipeline for lecture survey feedback.
//!
//! Provides the pieces that turn raw comments into a summary report: the
//! inference client, prompt construction and response parsing, the per-comment
//! annotator, the paced batch runner, report aggregation, and export.

pub mod annotator;
pub mod batch;
pub mod export;
pub mod llm;
pub mod prompt;
pub mod report;
pub mod state;
pub mod survey;
