use std::fmt;
use std::io;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use remark_core::{Annotation, RemarkError};
use serde::{Deserialize, Serialize};

use crate::report::{self, SummaryReport};

/// Column order of the CSV export.
pub const CSV_HEADERS: [&str; 7] = [
    "original_comment",
    "sentiment",
    "category",
    "importance_score",
    "summary",
    "keywords",
    "column_name",
];

/// Write one CSV row per annotation to `writer`, header first.
///
/// Keywords are joined with `", "`.
///
/// # Errors
///
/// Returns [`RemarkError::Io`] if the writer fails.
pub fn write_csv<W: io::Write>(writer: W, annotations: &[Annotation]) -> Result<(), RemarkError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADERS).map_err(csv_error)?;
    for a in annotations {
        let sentiment = a.sentiment.to_string();
        let category = a.category.to_string();
        let score = a.importance_score.to_string();
        let keywords = a.keywords.join(", ");
        out.write_record([
            a.original_comment.as_str(),
            sentiment.as_str(),
            category.as_str(),
            score.as_str(),
            a.summary.as_str(),
            keywords.as_str(),
            a.column_name.as_str(),
        ])
        .map_err(csv_error)?;
    }
    out.flush()?;
    Ok(())
}

/// Render the CSV export as a string.
///
/// # Examples
///
/// ```
/// use remark_analyze::export::to_csv_string;
/// use remark_core::Annotation;
///
/// let csv = to_csv_string(&[Annotation::fallback()]).unwrap();
/// assert!(csv.starts_with("original_comment,sentiment,category"));
/// ```
pub fn to_csv_string(annotations: &[Annotation]) -> Result<String, RemarkError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, annotations)?;
    String::from_utf8(buf).map_err(|e| RemarkError::Table(format!("export is not UTF-8: {e}")))
}

/// Write the CSV export to `path`.
pub fn save_csv(path: &Path, annotations: &[Annotation]) -> Result<(), RemarkError> {
    let file = std::fs::File::create(path)?;
    write_csv(io::BufWriter::new(file), annotations)
}

fn csv_error(e: csv::Error) -> RemarkError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => RemarkError::Io(io),
        other => RemarkError::Table(format!("failed to write CSV: {other:?}")),
    }
}

/// JSON export: every annotation plus the summary computed from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Annotations in processing order.
    pub analysis_results: Vec<Annotation>,
    /// Summary of `analysis_results`; `None` when there are none.
    pub summary_report: Option<SummaryReport>,
    /// When the document was produced.
    pub generated_at: DateTime<Utc>,
}

impl ReportDocument {
    /// Build a document stamped with the current time.
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self::at(annotations, Utc::now())
    }

    /// Build a document with an explicit timestamp.
    pub fn at(annotations: Vec<Annotation>, generated_at: DateTime<Utc>) -> Self {
        let summary_report = report::summarize(&annotations);
        Self {
            analysis_results: annotations,
            summary_report,
            generated_at,
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, RemarkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a previously exported document.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Serialization`] if `json` is not a report document.
    pub fn from_json(json: &str) -> Result<Self, RemarkError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the document to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), RemarkError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Read a document from `path`.
    pub fn load(path: &Path) -> Result<Self, RemarkError> {
        if !path.exists() {
            return Err(RemarkError::FileNotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// `comment_analysis_YYYYmmdd_HHMMSS.csv` for the given time.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use remark_analyze::export::default_csv_name;
///
/// let at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 5, 3).unwrap();
/// assert_eq!(default_csv_name(&at), "comment_analysis_20240701_090503.csv");
/// ```
pub fn default_csv_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("comment_analysis_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// `analysis_report_YYYYmmdd_HHMMSS.json` for the given time.
pub fn default_json_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("analysis_report_{}.json", at.format("%Y%m%d_%H%M%S"))
}
