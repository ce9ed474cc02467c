//! Core types, configuration, and error handling for remark.
//!
//! This crate provides the shared foundation used by the other remark crates:
//! - [`RemarkError`] - unified error type using `thiserror`
//! - [`RemarkConfig`] - configuration loaded from `.remark.toml`
//! - The annotation data model: [`Annotation`], [`Sentiment`], [`Category`],
//!   [`RiskLevel`], and [`OutputFormat`]
//! - [`coerce`] - tolerant conversion of untrusted JSON values into annotation fields

pub mod coerce;
mod config;
mod error;
mod types;

pub use config::{AnalysisConfig, LlmConfig, RemarkConfig};
pub use error::RemarkError;
pub use types::{
    Annotation, Category, OutputFormat, RiskLevel, Sentiment, ANALYSIS_ERROR_MARKER,
    HIGH_IMPORTANCE_THRESHOLD, MAX_IMPORTANCE, MAX_KEYWORDS,
};

/// A convenience `Result` type for remark operations.
pub type Result<T> = std::result::Result<T, RemarkError>;
