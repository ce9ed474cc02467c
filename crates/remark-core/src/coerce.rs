//! Tolerant conversion of untrusted JSON values into annotation fields.
//!
//! Model output is treated as noisy: each helper returns `None` when the value
//! has the wrong shape, leaving the default to the caller.

use serde_json::Value;

use crate::types::{MAX_IMPORTANCE, MAX_KEYWORDS};

/// Read an importance score, clamped to `0..=10`.
///
/// Accepts integers, floats (rounded), and numeric strings.
///
/// # Examples
///
/// ```
/// use remark_core::coerce::importance;
/// use serde_json::json;
///
/// assert_eq!(importance(&json!(8)), Some(8));
/// assert_eq!(importance(&json!("7")), Some(7));
/// assert_eq!(importance(&json!(6.6)), Some(7));
/// assert_eq!(importance(&json!(15)), Some(10));
/// assert_eq!(importance(&json!(-3)), Some(0));
/// assert_eq!(importance(&json!("high")), None);
/// ```
pub fn importance(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, f64::from(MAX_IMPORTANCE)) as u8)
}

/// Read a keyword list.
///
/// Returns `None` if the value is not list-shaped. Non-string and blank
/// entries are dropped and the list is truncated to five.
///
/// # Examples
///
/// ```
/// use remark_core::coerce::keywords;
/// use serde_json::json;
///
/// assert_eq!(keywords(&json!(["a", 1, " b ", ""])), Some(vec!["a".to_string(), "b".to_string()]));
/// assert_eq!(keywords(&json!("a, b")), None);
/// ```
pub fn keywords(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .take(MAX_KEYWORDS)
            .map(String::from)
            .collect(),
    )
}

/// Read a string value; `None` for anything else.
pub fn text(value: &Value) -> Option<String> {
    value.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn importance_rejects_non_numeric() {
        assert_eq!(importance(&json!(null)), None);
        assert_eq!(importance(&json!([8])), None);
        assert_eq!(importance(&json!({"score": 8})), None);
        assert_eq!(importance(&json!(true)), None);
    }

    #[test]
    fn importance_keeps_zero() {
        assert_eq!(importance(&json!(0)), Some(0));
        assert_eq!(importance(&json!(" 10 ")), Some(10));
    }

    #[test]
    fn keywords_truncates_to_five() {
        let kws = keywords(&json!(["1", "2", "3", "4", "5", "6", "7"])).unwrap();
        assert_eq!(kws, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn keywords_empty_list_is_some() {
        assert_eq!(keywords(&json!([])), Some(Vec::new()));
        assert_eq!(keywords(&json!(null)), None);
        assert_eq!(keywords(&json!({"k": "v"})), None);
    }

    #[test]
    fn text_only_accepts_strings() {
        assert_eq!(text(&json!("要約")), Some("要約".into()));
        assert_eq!(text(&json!(12)), None);
    }
}
