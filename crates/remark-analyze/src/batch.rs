use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use remark_core::{Annotation, Sentiment};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::annotator::{Annotated, AnnotationStatus, CommentAnnotator};
use crate::llm::Inference;

/// Default pause between consecutive inference calls.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// A progress event is emitted every this many completed comments, and for
/// the last one.
pub const PROGRESS_INTERVAL: usize = 5;

/// Snapshot of batch progress.
///
/// # Examples
///
/// ```
/// use remark_analyze::batch::ProgressEvent;
/// use std::time::Duration;
///
/// let event = ProgressEvent::new(5, 20, 3, 1, Duration::from_secs(10));
/// assert_eq!(event.percentage, 25.0);
/// assert_eq!(event.eta, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Comments finished so far.
    pub completed: usize,
    /// Comments in the batch.
    pub total: usize,
    /// `completed / total * 100`.
    pub percentage: f64,
    /// Positive annotations so far.
    pub positive: usize,
    /// Negative annotations so far.
    pub negative: usize,
    /// Time since the batch started.
    pub elapsed: Duration,
    /// Estimated time remaining; `None` until more than one comment is done.
    pub eta: Option<Duration>,
}

impl ProgressEvent {
    /// Build an event, deriving percentage and ETA.
    ///
    /// The ETA is `elapsed / completed * (total - completed)`.
    pub fn new(
        completed: usize,
        total: usize,
        positive: usize,
        negative: usize,
        elapsed: Duration,
    ) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        let eta = (completed > 1).then(|| {
            let remaining = total.saturating_sub(completed);
            elapsed.mul_f64(remaining as f64 / completed as f64)
        });
        Self {
            completed,
            total,
            percentage,
            positive,
            negative,
            elapsed,
            eta,
        }
    }
}

/// Receives [`ProgressEvent`]s from a running batch.
///
/// Implemented for any `FnMut(&ProgressEvent)` closure.
pub trait ProgressObserver {
    /// Called at each progress checkpoint.
    fn on_progress(&mut self, event: &ProgressEvent);

    /// Called when a survey run starts a new column of `total` comments.
    fn on_column(&mut self, _column: &str, _total: usize) {}
}

impl<F: FnMut(&ProgressEvent)> ProgressObserver for F {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores progress.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
}

/// Cooperative cancellation shared between a batch and its controller.
///
/// # Examples
///
/// ```
/// use remark_analyze::batch::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The batch stops before its next comment.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Record an interrupt. Returns `true` if cancellation was already
    /// requested, meaning the caller should stop immediately.
    pub fn interrupt(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }
}

/// Counters describing how a batch went.
///
/// # Examples
///
/// ```
/// use remark_analyze::batch::BatchStats;
///
/// let mut a = BatchStats { total: 3, analyzed: 2, skipped_empty: 1, ..BatchStats::default() };
/// let b = BatchStats { total: 2, parse_failures: 2, ..BatchStats::default() };
/// a.merge(&b);
/// assert_eq!(a.total, 5);
/// assert_eq!(a.failures(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Comments submitted.
    pub total: usize,
    /// Comments the model annotated successfully.
    pub analyzed: usize,
    /// Blank comments that skipped inference.
    pub skipped_empty: usize,
    /// Inference calls that failed or timed out.
    pub inference_failures: usize,
    /// Responses that were not a JSON object.
    pub parse_failures: usize,
    /// Fields normalized across all successful responses.
    pub shape_corrections: usize,
    /// Whether the batch stopped early on request.
    pub cancelled: bool,
}

impl BatchStats {
    /// Comments that received the fallback annotation.
    pub fn failures(&self) -> usize {
        self.inference_failures + self.parse_failures
    }

    /// Comments that received an annotation of any kind.
    pub fn completed(&self) -> usize {
        self.analyzed + self.skipped_empty + self.failures()
    }

    /// Fold another batch's counters into this one.
    pub fn merge(&mut self, other: &BatchStats) {
        self.total += other.total;
        self.analyzed += other.analyzed;
        self.skipped_empty += other.skipped_empty;
        self.inference_failures += other.inference_failures;
        self.parse_failures += other.parse_failures;
        self.shape_corrections += other.shape_corrections;
        self.cancelled |= other.cancelled;
    }

    fn record(&mut self, status: &AnnotationStatus) {
        match status {
            AnnotationStatus::Analyzed { corrections } => {
                self.analyzed += 1;
                self.shape_corrections += corrections;
            }
            AnnotationStatus::SkippedEmpty => self.skipped_empty += 1,
            AnnotationStatus::InferenceFailed(_) => self.inference_failures += 1,
            AnnotationStatus::ParseFailed(_) => self.parse_failures += 1,
        }
    }
}

/// Annotations for a batch, in input order, with run statistics.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One annotation per processed comment; `annotations[i].index == i`.
    pub annotations: Vec<Annotation>,
    /// Run statistics.
    pub stats: BatchStats,
}

/// Runs comments through a [`CommentAnnotator`] one at a time.
///
/// Calls are strictly sequential with a fixed pause between consecutive
/// calls (none before the first). Every processed comment yields exactly one
/// annotation, in input order; only cancellation ends a batch early.
pub struct BatchRunner<I> {
    annotator: CommentAnnotator<I>,
    delay: Duration,
    cancel: CancelFlag,
}

impl<I: Inference> BatchRunner<I> {
    /// Create a runner with the default 0.5 s pacing.
    pub fn new(annotator: CommentAnnotator<I>) -> Self {
        Self {
            annotator,
            delay: DEFAULT_DELAY,
            cancel: CancelFlag::new(),
        }
    }

    /// Set the pause between consecutive calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Share `flag` so the caller can stop the batch between comments.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// The pause between consecutive calls.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// A handle to this runner's cancellation flag.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The wrapped annotator.
    pub fn annotator(&self) -> &CommentAnnotator<I> {
        &self.annotator
    }

    /// Annotate `comments` in order, reporting progress to `observer`.
    ///
    /// Each annotation gets `original_comment` set to its input and `index`
    /// set to its zero-based position. If cancelled, the outcome holds the
    /// comments completed so far and `stats.cancelled` is set.
    pub async fn run<S: AsRef<str>>(
        &self,
        comments: &[S],
        observer: &mut dyn ProgressObserver,
    ) -> BatchOutcome {
        let total = comments.len();
        let start = Instant::now();
        let mut stats = BatchStats {
            total,
            ..BatchStats::default()
        };
        let mut annotations = Vec::with_capacity(total);
        let mut positive = 0;
        let mut negative = 0;

        for (i, comment) in comments.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(completed = i, total, "batch cancelled");
                stats.cancelled = true;
                break;
            }

            let comment = comment.as_ref();
            let Annotated {
                mut annotation,
                status,
            } = self.annotator.annotate_detailed(comment).await;
            stats.record(&status);

            annotation.original_comment = comment.to_string();
            annotation.index = i;
            match annotation.sentiment {
                Sentiment::Positive => positive += 1,
                Sentiment::Negative => negative += 1,
                Sentiment::Neutral => {}
            }
            annotations.push(annotation);

            let completed = i + 1;
            if completed % PROGRESS_INTERVAL == 0 || completed == total {
                observer.on_progress(&ProgressEvent::new(
                    completed,
                    total,
                    positive,
                    negative,
                    start.elapsed(),
                ));
            }
        }

        BatchOutcome { annotations, stats }
    }
}
