use serde::Serialize;

use crate::table::SurveyTable;

/// Recognized comment columns present in `table`, matched by exact label.
///
/// Order follows `recognized`, so results are stable regardless of the
/// spreadsheet's column order.
///
/// # Examples
///
/// ```
/// use remark_survey::columns::select_columns;
/// use remark_survey::table::SurveyTable;
///
/// let table = SurveyTable::from_csv_str("要望,感想\nx,y\n").unwrap();
/// let cols = select_columns(&table, &["感想".into(), "意見".into(), "要望".into()]);
/// assert_eq!(cols, vec!["感想", "要望"]);
/// ```
pub fn select_columns(table: &SurveyTable, recognized: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for label in recognized {
        if table.has_column(label) && !selected.contains(label) {
            selected.push(label.clone());
        }
    }
    selected
}

/// A column whose header looks like free-text feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedColumn {
    /// Column label.
    pub name: String,
    /// Number of non-missing cells.
    pub non_missing: usize,
}

/// Columns whose header contains any of `fragments`, in table order.
///
/// Used for previewing a spreadsheet only; analysis uses [`select_columns`].
///
/// # Examples
///
/// ```
/// use remark_survey::columns::detect_comment_columns;
/// use remark_survey::table::SurveyTable;
///
/// let table = SurveyTable::from_csv_str("学籍番号,ご意見・ご感想\n1,楽しい\n2,\n").unwrap();
/// let found = detect_comment_columns(&table, &["意見".into()]);
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].non_missing, 1);
/// ```
pub fn detect_comment_columns(table: &SurveyTable, fragments: &[String]) -> Vec<DetectedColumn> {
    table
        .headers()
        .iter()
        .filter(|h| fragments.iter().any(|f| !f.is_empty() && h.contains(f.as_str())))
        .map(|h| DetectedColumn {
            name: h.clone(),
            non_missing: table.non_missing_count(h),
        })
        .collect()
}
