use std::time::Duration;

use remark_core::{Annotation, RemarkError};

use crate::llm::Inference;
use crate::prompt::{self, ParseFailure};

/// Default per-call time budget for an inference request.
pub const DEFAULT_INFER_TIMEOUT: Duration = Duration::from_secs(60);

/// How an annotation was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationStatus {
    /// The model answered with a usable object. `corrections` counts fields
    /// that had to be coerced.
    Analyzed {
        /// Number of present fields that were normalized.
        corrections: usize,
    },
    /// The comment was blank; no inference call was made.
    SkippedEmpty,
    /// The inference call failed or timed out.
    InferenceFailed(String),
    /// The model answered, but not with a JSON object.
    ParseFailed(ParseFailure),
}

/// An annotation together with the path that produced it.
#[derive(Debug, Clone)]
pub struct Annotated {
    /// The annotation; always present.
    pub annotation: Annotation,
    /// Outcome classification for observability.
    pub status: AnnotationStatus,
}

/// Annotates one comment at a time: prompt, infer, parse.
///
/// Never fails: blank comments short-circuit to [`Annotation::empty`] and
/// every inference or parse failure becomes [`Annotation::fallback`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use remark_analyze::annotator::CommentAnnotator;
/// use remark_analyze::llm::Inference;
/// use remark_core::{RemarkError, Sentiment};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl Inference for Fixed {
///     async fn infer(&self, _prompt: &str) -> Result<String, RemarkError> {
///         Ok(r#"{"sentiment":"positive","importance_score":3}"#.into())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let annotator = CommentAnnotator::new(Fixed);
/// let a = annotator.annotate("とても良かった").await;
/// assert_eq!(a.sentiment, Sentiment::Positive);
/// # });
/// ```
pub struct CommentAnnotator<I> {
    inference: I,
    timeout: Duration,
}

impl<I: Inference> CommentAnnotator<I> {
    /// Create an annotator with the default per-call timeout.
    pub fn new(inference: I) -> Self {
        Self {
            inference,
            timeout: DEFAULT_INFER_TIMEOUT,
        }
    }

    /// Set the per-call timeout. A timed-out call yields the fallback annotation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying inference endpoint.
    pub fn inference(&self) -> &I {
        &self.inference
    }

    /// Annotate `comment`. `original_comment`, `index`, and `column_name`
    /// are left at their defaults for the caller to fill.
    pub async fn annotate(&self, comment: &str) -> Annotation {
        self.annotate_detailed(comment).await.annotation
    }

    /// Annotate `comment` and report how the annotation was produced.
    pub async fn annotate_detailed(&self, comment: &str) -> Annotated {
        if comment.trim().is_empty() {
            return Annotated {
                annotation: Annotation::empty(),
                status: AnnotationStatus::SkippedEmpty,
            };
        }

        let prompt = prompt::build_annotation_prompt(comment);
        let response = match self.infer_with_timeout(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("comment analysis failed: {e}");
                return Annotated {
                    annotation: Annotation::fallback(),
                    status: AnnotationStatus::InferenceFailed(e.to_string()),
                };
            }
        };
        tracing::debug!(response = %response, "raw LLM response");

        match prompt::parse_annotation_response(&response) {
            Ok(fields) => {
                let corrections = fields.corrections;
                Annotated {
                    annotation: fields.into_annotation(),
                    status: AnnotationStatus::Analyzed { corrections },
                }
            }
            Err(e) => {
                tracing::warn!(response = %response, "failed to parse LLM response: {e}");
                Annotated {
                    annotation: Annotation::fallback(),
                    status: AnnotationStatus::ParseFailed(e),
                }
            }
        }
    }

    async fn infer_with_timeout(&self, prompt: &str) -> Result<String, RemarkError> {
        match tokio::time::timeout(self.timeout, self.inference.infer(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(RemarkError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use remark_core::{Category, RiskLevel, Sentiment};

    struct Stub {
        calls: Arc<AtomicUsize>,
        reply: Result<&'static str, &'static str>,
        stall: Option<Duration>,
    }

    impl Stub {
        fn ok(reply: &'static str) -> Self {
            Self {
                calls: Arc::default(),
                reply: Ok(reply),
                stall: None,
            }
        }

        fn failing(msg: &'static str) -> Self {
            Self {
                calls: Arc::default(),
                reply: Err(msg),
                stall: None,
            }
        }
    }

    #[async_trait]
    impl Inference for Stub {
        async fn infer(&self, _prompt: &str) -> Result<String, RemarkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.stall {
                tokio::time::sleep(d).await;
            }
            self.reply
                .map(String::from)
                .map_err(|e| RemarkError::Llm(e.into()))
        }
    }

    #[tokio::test]
    async fn blank_comments_skip_inference() {
        let stub = Stub::ok("{}");
        let calls = stub.calls.clone();
        let annotator = CommentAnnotator::new(stub);

        for blank in ["", "   ", "\n\t"] {
            let out = annotator.annotate_detailed(blank).await;
            assert_eq!(out.status, AnnotationStatus::SkippedEmpty);
            assert_eq!(out.annotation, Annotation::empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inference_error_yields_fallback() {
        let annotator = CommentAnnotator::new(Stub::failing("quota exceeded"));
        let out = annotator.annotate_detailed("資料が見づらい").await;
        assert!(matches!(out.status, AnnotationStatus::InferenceFailed(ref m) if m.contains("quota")));
        assert_eq!(out.annotation.importance_score, 1);
        assert_eq!(out.annotation.risk_level, RiskLevel::Low);
        assert_eq!(out.annotation.sentiment, Sentiment::Neutral);
        assert!(out.annotation.is_analysis_error());
    }

    #[tokio::test]
    async fn unparseable_reply_yields_fallback() {
        let annotator = CommentAnnotator::new(Stub::ok("申し訳ありませんが分析できません"));
        let out = annotator.annotate_detailed("よかった").await;
        assert!(matches!(out.status, AnnotationStatus::ParseFailed(_)));
        assert!(out.annotation.is_analysis_error());
    }

    #[tokio::test]
    async fn valid_reply_is_annotated() {
        let annotator = CommentAnnotator::new(Stub::ok(
            "```json\n{\"sentiment\":\"negative\",\"category\":\"materials\",\"importance_score\":7,\"risk_level\":\"medium\",\"summary\":\"字が小さい\",\"keywords\":[\"スライド\"]}\n```",
        ));
        let out = annotator.annotate_detailed("スライドの字が小さい").await;
        assert_eq!(out.status, AnnotationStatus::Analyzed { corrections: 0 });
        assert_eq!(out.annotation.category, Category::Materials);
        assert_eq!(out.annotation.importance_score, 7);
        assert_eq!(out.annotation.keywords, vec!["スライド"]);
        assert!(out.annotation.original_comment.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_inference_times_out() {
        let stub = Stub {
            stall: Some(Duration::from_secs(30)),
            ..Stub::ok(r#"{"sentiment":"positive"}"#)
        };
        let annotator = CommentAnnotator::new(stub).with_timeout(Duration::from_secs(5));
        let out = annotator.annotate_detailed("長いコメント").await;
        assert!(matches!(out.status, AnnotationStatus::InferenceFailed(ref m) if m.contains("timed out")));
        assert!(out.annotation.is_analysis_error());
    }

    #[test]
    fn default_timeout() {
        let annotator = CommentAnnotator::new(Stub::ok("{}"));
        assert_eq!(annotator.timeout(), DEFAULT_INFER_TIMEOUT);
    }
}
