use remark_core::Annotation;
use remark_survey::table::SurveyTable;
use serde::Serialize;

use crate::batch::{BatchRunner, BatchStats, ProgressObserver};
use crate::llm::Inference;
use crate::report::{self, SummaryReport};

/// Result of analyzing the comment columns of a survey table.
#[derive(Debug, Clone, Serialize)]
pub struct SurveyAnalysis {
    /// Annotations for every column, column by column. `index` restarts at 0
    /// for each column.
    pub annotations: Vec<Annotation>,
    /// Summary over all columns; `None` if nothing was annotated.
    pub summary: Option<SummaryReport>,
    /// Counters merged across columns.
    pub stats: BatchStats,
    /// Data rows in the table.
    pub rows: usize,
    /// Columns that were analyzed, in order.
    pub columns: Vec<String>,
}

/// Annotate up to `max_per_column` non-missing comments from each of
/// `columns`, in order, and summarize the lot.
///
/// Columns absent from the table are skipped with a warning. A cancelled
/// column ends the run; its partial annotations are kept.
pub async fn analyze_survey<I: Inference>(
    runner: &BatchRunner<I>,
    table: &SurveyTable,
    columns: &[String],
    max_per_column: usize,
    observer: &mut dyn ProgressObserver,
) -> SurveyAnalysis {
    let mut annotations = Vec::new();
    let mut stats = BatchStats::default();
    let mut analyzed_columns = Vec::new();

    for column in columns {
        if !table.has_column(column) {
            tracing::warn!(column = %column, "column not found in survey, skipping");
            continue;
        }

        let mut comments = table.comments(column);
        comments.truncate(max_per_column);
        tracing::info!(column = %column, comments = comments.len(), "analyzing column");
        observer.on_column(column, comments.len());

        let outcome = runner.run(&comments, observer).await;
        stats.merge(&outcome.stats);
        // A column cancelled before its first comment was never analyzed.
        if !(outcome.stats.cancelled && outcome.annotations.is_empty()) {
            analyzed_columns.push(column.clone());
        }
        annotations.extend(outcome.annotations.into_iter().map(|mut a| {
            a.column_name = column.clone();
            a
        }));

        if stats.cancelled {
            break;
        }
    }

    let summary = report::summarize(&annotations);
    SurveyAnalysis {
        annotations,
        summary,
        stats,
        rows: table.row_count(),
        columns: analyzed_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use remark_core::{RemarkError, Sentiment};

    use crate::annotator::CommentAnnotator;
    use crate::batch::{NoProgress, ProgressEvent};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Inference for Counting {
        async fn infer(&self, _prompt: &str) -> Result<String, RemarkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"sentiment":"negative","category":"management","importance_score":6,"risk_level":"medium","summary":"要改善","keywords":[]}"#.into())
        }
    }

    fn runner() -> BatchRunner<Counting> {
        BatchRunner::new(CommentAnnotator::new(Counting::default())).with_delay(std::time::Duration::ZERO)
    }

    fn table() -> SurveyTable {
        SurveyTable::from_csv_str(
            "学籍番号,講義内容について,運営について\n\
             1,説明が速い,\n\
             2,,教室が寒い\n\
             3,例が少ない,マイクが聞こえない\n\
             4,板書が見えない,\n",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn columns_are_processed_in_order_with_restarting_index() {
        let runner = runner();
        let columns = vec!["講義内容について".to_string(), "運営について".to_string()];
        let result = analyze_survey(&runner, &table(), &columns, 20, &mut NoProgress).await;

        assert_eq!(result.rows, 4);
        assert_eq!(result.columns, columns);
        assert_eq!(result.annotations.len(), 5);
        let labels: Vec<(&str, usize)> = result
            .annotations
            .iter()
            .map(|a| (a.column_name.as_str(), a.index))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("講義内容について", 0),
                ("講義内容について", 1),
                ("講義内容について", 2),
                ("運営について", 0),
                ("運営について", 1),
            ]
        );
        assert_eq!(result.annotations[3].original_comment, "教室が寒い");
        assert_eq!(result.stats.total, 5);
        assert_eq!(result.stats.analyzed, 5);

        let summary = result.summary.unwrap();
        assert_eq!(summary.total_comments, 5);
        assert_eq!(summary.sentiment_distribution.get(Sentiment::Negative).count, 5);
    }

    #[tokio::test]
    async fn max_per_column_limits_comments() {
        let runner = runner();
        let columns = vec!["講義内容について".to_string()];
        let result = analyze_survey(&runner, &table(), &columns, 2, &mut NoProgress).await;
        assert_eq!(result.annotations.len(), 2);
        assert_eq!(runner.annotator().inference().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_columns_are_skipped() {
        let runner = runner();
        let columns = vec!["存在しない列".to_string()];
        let result = analyze_survey(&runner, &table(), &columns, 20, &mut NoProgress).await;
        assert!(result.annotations.is_empty());
        assert!(result.summary.is_none());
        assert!(result.columns.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_remaining_columns() {
        let runner = runner();
        let flag = runner.cancel_flag();

        struct CancelAfterFirstColumn {
            flag: crate::batch::CancelFlag,
            columns: Vec<(String, usize)>,
        }
        impl ProgressObserver for CancelAfterFirstColumn {
            fn on_progress(&mut self, event: &ProgressEvent) {
                if event.completed == event.total {
                    self.flag.cancel();
                }
            }
            fn on_column(&mut self, column: &str, total: usize) {
                self.columns.push((column.to_string(), total));
            }
        }

        let mut observer = CancelAfterFirstColumn {
            flag,
            columns: Vec::new(),
        };
        let columns = vec!["講義内容について".to_string(), "運営について".to_string()];
        let result = analyze_survey(&runner, &table(), &columns, 20, &mut observer).await;

        assert_eq!(result.annotations.len(), 3);
        assert!(result.stats.cancelled);
        assert_eq!(result.columns, vec!["講義内容について".to_string()]);
        assert_eq!(observer.columns.len(), 2);
        assert_eq!(observer.columns[0], ("講義内容について".to_string(), 3));
    }
}
