use std::fmt;

use remark_core::{coerce, Annotation, Category, RemarkError, RiskLevel, Sentiment};
use serde_json::{Map, Value};

const ANNOTATION_PROMPT: &str = "\
以下の講義アンケートのコメントを分析してください。
JSON形式で回答してください。

コメント（JSON文字列としてエスケープ済み）: {comment}

以下の項目について分析してください：

1. sentiment: ポジティブ（positive）、ネガティブ（negative）、中立（neutral）のいずれか
2. category: 講義内容（content）、講義資料（materials）、運営（management）、その他（others）のいずれか
3. importance_score: 1-10の重要度スコア（具体性・緊急性・共通性を考慮）
4. risk_level: high（重要・緊急）、medium（やや重要）、low（通常）のいずれか
5. summary: コメントの要約（20文字以内）
6. keywords: 重要なキーワード（最大5個の配列）

回答例：
{
    \"sentiment\": \"negative\",
    \"category\": \"content\",
    \"importance_score\": 8,
    \"risk_level\": \"high\",
    \"summary\": \"講義内容が難しすぎる\",
    \"keywords\": [\"難しい\", \"理解困難\", \"講義内容\"]
}
";

/// Build the annotation request for one comment.
///
/// The comment is embedded as a JSON string literal, so quotes, backslashes,
/// and newlines in the comment cannot break out of the instruction.
///
/// # Examples
///
/// ```
/// use remark_analyze::prompt::build_annotation_prompt;
///
/// let prompt = build_annotation_prompt("説明が\"早すぎる\"");
/// assert!(prompt.contains(r#""説明が\"早すぎる\"""#));
/// assert!(prompt.contains("importance_score"));
/// ```
pub fn build_annotation_prompt(comment: &str) -> String {
    let quoted = serde_json::to_string(comment).unwrap_or_else(|_| format!("\"{comment}\""));
    ANNOTATION_PROMPT.replacen("{comment}", &quoted, 1)
}

/// Fields extracted from a model response, before defaults are applied.
///
/// Absent or unusable fields stay `None`; only `keywords` is normalized to an
/// empty list at this stage. [`AnnotationFields::into_annotation`] applies the
/// neutral / others / 0 / low baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFields {
    /// Parsed sentiment, if present and recognized.
    pub sentiment: Option<Sentiment>,
    /// Parsed category; unknown labels are normalized to `Others`.
    pub category: Option<Category>,
    /// Parsed importance score, clamped to `0..=10`.
    pub importance_score: Option<u8>,
    /// Parsed risk level, if present and recognized.
    pub risk_level: Option<RiskLevel>,
    /// Summary text, if present.
    pub summary: Option<String>,
    /// Keywords; empty when absent or not list-shaped.
    pub keywords: Vec<String>,
    /// Number of present fields that had to be coerced or dropped.
    pub corrections: usize,
}

impl AnnotationFields {
    /// Apply defaults for missing fields and produce an [`Annotation`].
    ///
    /// `original_comment`, `index`, and `column_name` are left for the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_analyze::prompt::AnnotationFields;
    /// use remark_core::{Category, Sentiment};
    ///
    /// let a = AnnotationFields::default().into_annotation();
    /// assert_eq!(a.sentiment, Sentiment::Neutral);
    /// assert_eq!(a.category, Category::Others);
    /// assert_eq!(a.importance_score, 0);
    /// ```
    pub fn into_annotation(self) -> Annotation {
        Annotation {
            sentiment: self.sentiment.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            importance_score: self.importance_score.unwrap_or(0),
            risk_level: self.risk_level.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            keywords: self.keywords,
            ..Annotation::default()
        }
    }
}

/// Why a model response could not be turned into annotation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The extracted text is not valid JSON.
    InvalidJson(String),
    /// The JSON is valid but not an object.
    NotAnObject(&'static str),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::InvalidJson(e) => write!(f, "response is not valid JSON: {e}"),
            ParseFailure::NotAnObject(kind) => {
                write!(f, "response JSON is {kind}, expected an object")
            }
        }
    }
}

impl From<ParseFailure> for RemarkError {
    fn from(e: ParseFailure) -> Self {
        RemarkError::Parse(e.to_string())
    }
}

/// Parse a raw model response into [`AnnotationFields`].
///
/// A fenced code block (```` ```json ```` or bare ```` ``` ````) anywhere in
/// the text is unwrapped first; otherwise the whole text is parsed.
///
/// # Errors
///
/// Returns [`ParseFailure`] if the text is not JSON or not a JSON object.
///
/// # Examples
///
/// ```
/// use remark_analyze::prompt::{parse_annotation_response, ParseFailure};
/// use remark_core::Sentiment;
///
/// let fields = parse_annotation_response("```json\n{\"sentiment\":\"positive\"}\n```").unwrap();
/// assert_eq!(fields.sentiment, Some(Sentiment::Positive));
/// assert_eq!(fields.importance_score, None);
///
/// let err = parse_annotation_response("[1, 2]").unwrap_err();
/// assert_eq!(err, ParseFailure::NotAnObject("an array"));
/// ```
pub fn parse_annotation_response(response: &str) -> Result<AnnotationFields, ParseFailure> {
    let cleaned = strip_code_fences(response);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(fields_from_object(&map)),
        Value::Array(_) => Err(ParseFailure::NotAnObject("an array")),
        Value::String(_) => Err(ParseFailure::NotAnObject("a string")),
        Value::Number(_) => Err(ParseFailure::NotAnObject("a number")),
        Value::Bool(_) => Err(ParseFailure::NotAnObject("a boolean")),
        Value::Null => Err(ParseFailure::NotAnObject("null")),
    }
}

/// Parse a raw model response, substituting [`Annotation::fallback`] on failure.
///
/// # Examples
///
/// ```
/// use remark_analyze::prompt::parse_or_fallback;
///
/// assert!(parse_or_fallback("not json").is_analysis_error());
/// assert!(!parse_or_fallback("{}").is_analysis_error());
/// ```
pub fn parse_or_fallback(response: &str) -> Annotation {
    match parse_annotation_response(response) {
        Ok(fields) => fields.into_annotation(),
        Err(e) => {
            tracing::warn!("failed to parse LLM response: {e}");
            Annotation::fallback()
        }
    }
}

fn fields_from_object(map: &Map<String, Value>) -> AnnotationFields {
    let mut fields = AnnotationFields::default();

    if let Some(v) = present(map, "sentiment") {
        fields.sentiment = v.as_str().and_then(|s| s.parse().ok());
        if fields.sentiment.is_none() {
            fields.corrections += 1;
        }
    }

    if let Some(v) = present(map, "category") {
        fields.category = Some(match v.as_str().map(str::parse::<Category>) {
            Some(Ok(c)) => c,
            _ => {
                fields.corrections += 1;
                Category::Others
            }
        });
    }

    if let Some(v) = present(map, "importance_score") {
        fields.importance_score = coerce::importance(v);
        if !v.is_u64() || v.as_u64().is_some_and(|n| n > 10) {
            fields.corrections += 1;
        }
    }

    if let Some(v) = present(map, "risk_level") {
        fields.risk_level = v.as_str().and_then(|s| s.parse().ok());
        if fields.risk_level.is_none() {
            fields.corrections += 1;
        }
    }

    if let Some(v) = present(map, "summary") {
        fields.summary = coerce::text(v);
        if fields.summary.is_none() {
            fields.corrections += 1;
        }
    }

    if let Some(v) = present(map, "keywords") {
        match coerce::keywords(v) {
            Some(kws) => {
                let listed = v.as_array().map_or(0, Vec::len);
                if kws.len() != listed {
                    fields.corrections += 1;
                }
                fields.keywords = kws;
            }
            None => fields.corrections += 1,
        }
    }

    if fields.corrections > 0 {
        tracing::debug!(
            corrections = fields.corrections,
            "normalized malformed annotation fields"
        );
    }
    fields
}

/// A key counts as present only when it is non-null.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    for fence in ["```json", "```"] {
        if let Some(pos) = trimmed.find(fence) {
            let rest = &trimmed[pos + fence.len()..];
            let inner = match rest.find("```") {
                Some(end) => &rest[..end],
                None => rest,
            };
            return inner.trim();
        }
    }
    trimmed
}
