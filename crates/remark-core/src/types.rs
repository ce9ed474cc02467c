use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::coerce;

/// Summary text carried by an annotation whose analysis failed.
pub const ANALYSIS_ERROR_MARKER: &str = "分析エラー";

/// Upper bound of the importance scale.
pub const MAX_IMPORTANCE: u8 = 10;

/// Importance score at or above which a comment counts as high importance.
pub const HIGH_IMPORTANCE_THRESHOLD: u8 = 7;

/// Maximum number of keywords kept per annotation.
pub const MAX_KEYWORDS: usize = 5;

/// Overall tone of a comment.
///
/// # Examples
///
/// ```
/// use remark_core::Sentiment;
///
/// let s: Sentiment = serde_json::from_str("\"positive\"").unwrap();
/// assert_eq!(s, Sentiment::Positive);
/// assert_eq!("ネガティブ".parse::<Sentiment>().unwrap(), Sentiment::Negative);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Praise or satisfaction.
    Positive,
    /// Complaint or dissatisfaction.
    Negative,
    /// Neither, or not determinable.
    #[default]
    Neutral,
}

impl Sentiment {
    /// All variants in report order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "ポジティブ" => Ok(Sentiment::Positive),
            "negative" | "ネガティブ" => Ok(Sentiment::Negative),
            "neutral" | "中立" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment: {other}")),
        }
    }
}

/// Topic a comment is about.
///
/// Parsing accepts the Japanese survey labels as aliases. Use
/// [`Category::normalize`] when any unknown label should land in
/// [`Category::Others`].
///
/// # Examples
///
/// ```
/// use remark_core::Category;
///
/// assert_eq!("materials".parse::<Category>().unwrap(), Category::Materials);
/// assert_eq!("講義内容".parse::<Category>().unwrap(), Category::Content);
/// assert_eq!(Category::normalize("homework"), Category::Others);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Lecture content.
    Content,
    /// Slides, handouts, and other materials.
    Materials,
    /// Course operation and logistics.
    Management,
    /// Anything else.
    #[default]
    Others,
}

impl Category {
    /// All variants in report order.
    pub const ALL: [Category; 4] = [
        Category::Content,
        Category::Materials,
        Category::Management,
        Category::Others,
    ];

    /// Map any label onto the fixed category set, unknown labels to `Others`.
    pub fn normalize(label: &str) -> Category {
        label.parse().unwrap_or(Category::Others)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Content => write!(f, "content"),
            Category::Materials => write!(f, "materials"),
            Category::Management => write!(f, "management"),
            Category::Others => write!(f, "others"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "content" | "講義内容" => Ok(Category::Content),
            "materials" | "講義資料" => Ok(Category::Materials),
            "management" | "運営" => Ok(Category::Management),
            "others" | "other" | "その他" => Ok(Category::Others),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Coarse urgency of a comment.
///
/// # Examples
///
/// ```
/// use remark_core::RiskLevel;
///
/// assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
/// assert_eq!(RiskLevel::default(), RiskLevel::Low);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Important and urgent.
    High,
    /// Somewhat important.
    Medium,
    /// Routine.
    #[default]
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::Low => write!(f, "low"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Structured annotation of a single survey comment.
///
/// Deserialization is lenient: missing or malformed fields fall back to the
/// neutral / others / 0 / low baseline instead of failing the record, so
/// annotations re-read from exported documents or other tools are always
/// usable.
///
/// # Examples
///
/// ```
/// use remark_core::{Annotation, Category, RiskLevel, Sentiment};
///
/// let a: Annotation = serde_json::from_str(
///     r#"{"sentiment":"negative","category":"homework","importance_score":"8","risk_level":"high"}"#,
/// ).unwrap();
/// assert_eq!(a.sentiment, Sentiment::Negative);
/// assert_eq!(a.category, Category::Others);
/// assert_eq!(a.importance_score, 8);
/// assert_eq!(a.risk_level, RiskLevel::High);
/// assert!(a.keywords.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    /// Overall tone.
    #[serde(deserialize_with = "lenient_sentiment")]
    pub sentiment: Sentiment,
    /// Topic category.
    #[serde(deserialize_with = "lenient_category")]
    pub category: Category,
    /// Importance from 0 to 10.
    #[serde(deserialize_with = "lenient_importance")]
    pub importance_score: u8,
    /// Urgency classification.
    #[serde(deserialize_with = "lenient_risk_level")]
    pub risk_level: RiskLevel,
    /// Short summary, ideally 20 characters or fewer.
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    /// Up to five keywords, in model order.
    #[serde(deserialize_with = "lenient_keywords")]
    pub keywords: Vec<String>,
    /// The comment text as given.
    #[serde(deserialize_with = "lenient_string")]
    pub original_comment: String,
    /// Zero-based position within its batch.
    #[serde(deserialize_with = "lenient_index")]
    pub index: usize,
    /// Source column label, set by the caller.
    #[serde(deserialize_with = "lenient_string")]
    pub column_name: String,
}

impl Annotation {
    /// Annotation for an empty or blank comment: nothing to say.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::Annotation;
    ///
    /// let a = Annotation::empty();
    /// assert_eq!(a.importance_score, 0);
    /// assert!(a.summary.is_empty());
    /// ```
    pub fn empty() -> Self {
        Self::default()
    }

    /// Annotation for a comment whose analysis failed.
    ///
    /// Carries importance 1 and [`ANALYSIS_ERROR_MARKER`] as summary so it is
    /// never mistaken for a genuine neutral opinion.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_core::{Annotation, ANALYSIS_ERROR_MARKER};
    ///
    /// let a = Annotation::fallback();
    /// assert_eq!(a.importance_score, 1);
    /// assert_eq!(a.summary, ANALYSIS_ERROR_MARKER);
    /// assert!(a.is_analysis_error());
    /// ```
    pub fn fallback() -> Self {
        Self {
            importance_score: 1,
            summary: ANALYSIS_ERROR_MARKER.to_string(),
            ..Self::default()
        }
    }

    /// Returns `true` if this annotation is the analysis-failure placeholder.
    pub fn is_analysis_error(&self) -> bool {
        self.summary == ANALYSIS_ERROR_MARKER
            && self.importance_score == 1
            && self.sentiment == Sentiment::Neutral
            && self.category == Category::Others
            && self.risk_level == RiskLevel::Low
            && self.keywords.is_empty()
    }

    /// Returns `true` if the importance score meets the high-importance threshold.
    pub fn is_high_importance(&self) -> bool {
        self.importance_score >= HIGH_IMPORTANCE_THRESHOLD
    }

    /// Returns `true` if the risk level is high.
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High
    }
}

fn lenient_sentiment<'de, D: Deserializer<'de>>(d: D) -> Result<Sentiment, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

fn lenient_category<'de, D: Deserializer<'de>>(d: D) -> Result<Category, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(value.as_str().map(Category::normalize).unwrap_or_default())
}

fn lenient_risk_level<'de, D: Deserializer<'de>>(d: D) -> Result<RiskLevel, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

fn lenient_importance<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(coerce::importance(&value).unwrap_or(0))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(coerce::text(&value).unwrap_or_default())
}

fn lenient_keywords<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(coerce::keywords(&value).unwrap_or_default())
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(value.as_u64().map(|i| i as usize).unwrap_or(0))
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use remark_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn enums_roundtrip_through_json() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Negative).unwrap(),
            "\"negative\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Management).unwrap(),
            "\"management\""
        );
        let parsed: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, RiskLevel::Medium);
    }

    #[test]
    fn enum_display_matches_serde_names() {
        for s in Sentiment::ALL {
            assert_eq!(
                serde_json::to_string(&s).unwrap(),
                format!("\"{s}\"")
            );
        }
        for c in Category::ALL {
            assert_eq!(
                serde_json::to_string(&c).unwrap(),
                format!("\"{c}\"")
            );
        }
    }

    #[test]
    fn category_normalizes_unknown_labels() {
        assert_eq!(Category::normalize("運営"), Category::Management);
        assert_eq!(Category::normalize(" Content "), Category::Content);
        assert_eq!(Category::normalize("lecturer"), Category::Others);
        assert_eq!(Category::normalize(""), Category::Others);
    }

    #[test]
    fn fallback_and_empty_keep_distinct_codes() {
        let empty = Annotation::empty();
        let failed = Annotation::fallback();
        assert_eq!(empty.importance_score, 0);
        assert_eq!(failed.importance_score, 1);
        assert_eq!(empty.category, Category::Others);
        assert_eq!(failed.category, Category::Others);
        assert!(!empty.is_analysis_error());
        assert!(failed.is_analysis_error());
    }

    #[test]
    fn lenient_deserialize_defaults_missing_fields() {
        let a: Annotation = serde_json::from_str("{}").unwrap();
        assert_eq!(a, Annotation::empty());
    }

    #[test]
    fn lenient_deserialize_normalizes_shapes() {
        let a: Annotation = serde_json::from_str(
            r#"{
                "sentiment": 3,
                "category": null,
                "importance_score": 42,
                "risk_level": "urgent",
                "summary": ["not", "text"],
                "keywords": "a, b",
                "index": -1
            }"#,
        )
        .unwrap();
        assert_eq!(a.sentiment, Sentiment::Neutral);
        assert_eq!(a.category, Category::Others);
        assert_eq!(a.importance_score, MAX_IMPORTANCE);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert!(a.summary.is_empty());
        assert!(a.keywords.is_empty());
        assert_eq!(a.index, 0);
    }

    #[test]
    fn annotation_serializes_snake_case() {
        let a = Annotation {
            column_name: "感想".into(),
            ..Annotation::fallback()
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["importance_score"], 1);
        assert_eq!(json["risk_level"], "low");
        assert_eq!(json["column_name"], "感想");
        assert!(json.get("importanceScore").is_none());
    }

    #[test]
    fn high_flags() {
        let a = Annotation {
            importance_score: 7,
            risk_level: RiskLevel::High,
            ..Annotation::default()
        };
        assert!(a.is_high_importance());
        assert!(a.is_high_risk());
        assert!(!Annotation::fallback().is_high_importance());
    }
}
