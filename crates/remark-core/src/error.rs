use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur across remark.
///
/// Library crates use this type directly; the binary reports it through
/// `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use remark_core::RemarkError;
///
/// let err = RemarkError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RemarkError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(remark::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(remark::config),
        help("check .remark.toml or run 'remark doctor'")
    )]
    Config(String),

    /// Malformed input that could not be interpreted.
    #[error("parse error: {0}")]
    #[diagnostic(code(remark::parse))]
    Parse(String),

    /// LLM API or transport error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(remark::llm))]
    Llm(String),

    /// An inference call exceeded its time budget.
    #[error("LLM call timed out after {}s", .0.as_secs_f64())]
    #[diagnostic(code(remark::timeout))]
    Timeout(Duration),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(remark::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(remark::toml))]
    Toml(#[from] toml::de::Error),

    /// Tabular survey input could not be read.
    #[error("table error: {0}")]
    #[diagnostic(code(remark::table))]
    Table(String),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(remark::file_not_found))]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RemarkError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = RemarkError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn timeout_shows_seconds() {
        let err = RemarkError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "LLM call timed out after 1.5s");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = RemarkError::FileNotFound(PathBuf::from("/tmp/survey.csv"));
        assert!(err.to_string().contains("/tmp/survey.csv"));
    }
}
