use std::fmt;

use remark_core::{Annotation, Category, Sentiment, MAX_IMPORTANCE};
use serde::{Deserialize, Serialize};

/// Maximum number of entries in [`SummaryReport::top_high_risk_comments`].
pub const TOP_HIGH_RISK_LIMIT: usize = 10;

/// Count and share of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Number of annotations in the bucket.
    pub count: usize,
    /// `count / total * 100`, unrounded.
    pub percentage: f64,
}

impl Share {
    fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            percentage: count as f64 / total as f64 * 100.0,
        }
    }
}

/// Per-sentiment shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    /// Comments annotated [`Sentiment::Positive`].
    pub positive: Share,
    /// Comments annotated [`Sentiment::Negative`].
    pub negative: Share,
    /// Comments annotated [`Sentiment::Neutral`], including analysis errors.
    pub neutral: Share,
}

impl SentimentDistribution {
    /// Share for `sentiment`.
    pub fn get(&self, sentiment: Sentiment) -> Share {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }
}

/// Per-category shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    /// Comments about lecture content ([`Category::Content`]).
    pub content: Share,
    /// Comments about slides and handouts ([`Category::Materials`]).
    pub materials: Share,
    /// Comments about scheduling and facilities ([`Category::Management`]).
    pub management: Share,
    /// Everything else ([`Category::Others`]).
    pub others: Share,
}

impl CategoryDistribution {
    /// Share for `category`.
    pub fn get(&self, category: Category) -> Share {
        match category {
            Category::Content => self.content,
            Category::Materials => self.materials,
            Category::Management => self.management,
            Category::Others => self.others,
        }
    }
}

/// Aggregate statistics over a set of annotations.
///
/// Always recomputed from the full annotation list by [`summarize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Number of annotations summarized.
    pub total_comments: usize,
    /// Sentiment counts and shares.
    pub sentiment_distribution: SentimentDistribution,
    /// Category counts and shares.
    pub category_distribution: CategoryDistribution,
    /// Annotations with importance of 7 or more.
    pub high_importance_comments: usize,
    /// Annotations with high risk.
    pub high_risk_comments: usize,
    /// High-risk annotations by descending importance, at most ten; ties keep
    /// input order.
    pub top_high_risk_comments: Vec<Annotation>,
}

impl SummaryReport {
    /// High-risk annotations as a percentage of the total.
    pub fn high_risk_percentage(&self) -> f64 {
        if self.total_comments == 0 {
            return 0.0;
        }
        self.high_risk_comments as f64 / self.total_comments as f64 * 100.0
    }
}

/// Summarize `annotations`. Returns `None` when there is nothing to summarize.
///
/// # Examples
///
/// ```
/// use remark_analyze::report::summarize;
/// use remark_core::{Annotation, Sentiment};
///
/// assert!(summarize(&[]).is_none());
///
/// let annotations = vec![
///     Annotation { sentiment: Sentiment::Positive, ..Annotation::default() },
///     Annotation::default(),
/// ];
/// let report = summarize(&annotations).unwrap();
/// assert_eq!(report.total_comments, 2);
/// assert_eq!(report.sentiment_distribution.positive.percentage, 50.0);
/// ```
pub fn summarize(annotations: &[Annotation]) -> Option<SummaryReport> {
    if annotations.is_empty() {
        return None;
    }
    let total = annotations.len();

    let mut sentiment_counts = [0usize; 3];
    let mut category_counts = [0usize; 4];
    let mut high_importance = 0;
    let mut high_risk: Vec<Annotation> = Vec::new();

    for a in annotations {
        sentiment_counts[sentiment_slot(a.sentiment)] += 1;
        category_counts[category_slot(a.category)] += 1;
        if a.is_high_importance() {
            high_importance += 1;
        }
        if a.is_high_risk() {
            high_risk.push(a.clone());
        }
    }

    let high_risk_comments = high_risk.len();
    // `sort_by` is stable: equal scores keep input order.
    high_risk.sort_by(|a, b| b.importance_score.cmp(&a.importance_score));
    high_risk.truncate(TOP_HIGH_RISK_LIMIT);

    Some(SummaryReport {
        total_comments: total,
        sentiment_distribution: SentimentDistribution {
            positive: Share::of(sentiment_counts[0], total),
            negative: Share::of(sentiment_counts[1], total),
            neutral: Share::of(sentiment_counts[2], total),
        },
        category_distribution: CategoryDistribution {
            content: Share::of(category_counts[0], total),
            materials: Share::of(category_counts[1], total),
            management: Share::of(category_counts[2], total),
            others: Share::of(category_counts[3], total),
        },
        high_importance_comments: high_importance,
        high_risk_comments,
        top_high_risk_comments: high_risk,
    })
}

fn sentiment_slot(s: Sentiment) -> usize {
    match s {
        Sentiment::Positive => 0,
        Sentiment::Negative => 1,
        Sentiment::Neutral => 2,
    }
}

fn category_slot(c: Category) -> usize {
    match c {
        Category::Content => 0,
        Category::Materials => 1,
        Category::Management => 2,
        Category::Others => 3,
    }
}

/// Count annotations per importance score, index `0..=10`.
///
/// # Examples
///
/// ```
/// use remark_analyze::report::importance_histogram;
/// use remark_core::Annotation;
///
/// let hist = importance_histogram(&[Annotation::fallback(), Annotation::empty()]);
/// assert_eq!(hist[0], 1);
/// assert_eq!(hist[1], 1);
/// ```
pub fn importance_histogram(annotations: &[Annotation]) -> [usize; MAX_IMPORTANCE as usize + 1] {
    let mut hist = [0usize; MAX_IMPORTANCE as usize + 1];
    for a in annotations {
        hist[usize::from(a.importance_score.min(MAX_IMPORTANCE))] += 1;
    }
    hist
}

/// Selection criteria for browsing annotations.
///
/// The default keeps every sentiment and category with importance of at
/// least 1, which hides blank comments.
///
/// # Examples
///
/// ```
/// use remark_analyze::report::ResultFilter;
/// use remark_core::{Annotation, Sentiment};
///
/// let annotations = vec![
///     Annotation { sentiment: Sentiment::Negative, importance_score: 9, ..Annotation::default() },
///     Annotation { sentiment: Sentiment::Positive, importance_score: 9, ..Annotation::default() },
/// ];
/// let filter = ResultFilter { sentiment: Some(Sentiment::Negative), ..ResultFilter::default() };
/// assert_eq!(filter.apply(&annotations).len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultFilter {
    /// Keep only this sentiment.
    pub sentiment: Option<Sentiment>,
    /// Keep only this category.
    pub category: Option<Category>,
    /// Minimum importance score.
    pub min_importance: u8,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            sentiment: None,
            category: None,
            min_importance: 1,
        }
    }
}

impl ResultFilter {
    /// Returns `true` if `annotation` passes every criterion.
    pub fn matches(&self, annotation: &Annotation) -> bool {
        self.sentiment.is_none_or(|s| annotation.sentiment == s)
            && self.category.is_none_or(|c| annotation.category == c)
            && annotation.importance_score >= self.min_importance
    }

    /// Matching annotations, in input order.
    pub fn apply<'a>(&self, annotations: &'a [Annotation]) -> Vec<&'a Annotation> {
        annotations.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Follow-up suggested by a report's overall figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// More than 30% of comments are negative.
    NegativeShareHigh { percentage: f64 },
    /// More than 5% of comments are high risk.
    HighRiskShareHigh { percentage: f64 },
    /// Under 20% negative and under 3% high risk.
    Healthy,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::NegativeShareHigh { percentage } => write!(
                f,
                "Negative comments are {percentage:.1}% of the total; review the improvement points."
            ),
            Recommendation::HighRiskShareHigh { percentage } => write!(
                f,
                "High-risk comments are {percentage:.1}% of the total; they need a prompt response."
            ),
            Recommendation::Healthy => write!(
                f,
                "Overall feedback is healthy; keep the current approach."
            ),
        }
    }
}

/// Derive follow-up recommendations from `report`.
///
/// # Examples
///
/// ```
/// use remark_analyze::report::{recommendations, summarize, Recommendation};
/// use remark_core::Annotation;
///
/// let report = summarize(&vec![Annotation::default(); 4]).unwrap();
/// assert_eq!(recommendations(&report), vec![Recommendation::Healthy]);
/// ```
pub fn recommendations(report: &SummaryReport) -> Vec<Recommendation> {
    let negative = report.sentiment_distribution.negative.percentage;
    let high_risk = report.high_risk_percentage();

    let mut out = Vec::new();
    if negative > 30.0 {
        out.push(Recommendation::NegativeShareHigh {
            percentage: negative,
        });
    }
    if high_risk > 5.0 {
        out.push(Recommendation::HighRiskShareHigh {
            percentage: high_risk,
        });
    }
    if negative < 20.0 && high_risk < 3.0 {
        out.push(Recommendation::Healthy);
    }
    out
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Survey Comment Report")?;
        writeln!(f, "=====================")?;
        writeln!(
            f,
            "Comments: {} | High importance: {} | High risk: {}\n",
            self.total_comments, self.high_importance_comments, self.high_risk_comments,
        )?;

        writeln!(f, "Sentiment:")?;
        for s in Sentiment::ALL {
            let share = self.sentiment_distribution.get(s);
            writeln!(f, "  {:<12} {:>4} ({:>5.1}%)", s.to_string(), share.count, share.percentage)?;
        }
        writeln!(f, "\nCategory:")?;
        for c in Category::ALL {
            let share = self.category_distribution.get(c);
            writeln!(f, "  {:<12} {:>4} ({:>5.1}%)", c.to_string(), share.count, share.percentage)?;
        }

        writeln!(f)?;
        if self.top_high_risk_comments.is_empty() {
            writeln!(f, "No high-risk comments.")?;
        } else {
            writeln!(f, "Top high-risk comments:")?;
            for a in &self.top_high_risk_comments {
                writeln!(
                    f,
                    "[{}] {} / {}: {}",
                    a.importance_score, a.category, a.sentiment, a.summary
                )?;
                writeln!(f, "  {}", a.original_comment.replace('\n', " "))?;
                if !a.keywords.is_empty() {
                    writeln!(f, "  Keywords: {}", a.keywords.join(", "))?;
                }
            }
        }

        Ok(())
    }
}

impl SummaryReport {
    /// Render the report as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use remark_analyze::report::summarize;
    /// use remark_core::Annotation;
    ///
    /// let report = summarize(&[Annotation::default()]).unwrap();
    /// let md = report.to_markdown();
    /// assert!(md.contains("# Survey Comment Report"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Survey Comment Report\n\n");
        out.push_str(&format!(
            "**Comments:** {} | **High importance:** {} | **High risk:** {}\n\n",
            self.total_comments, self.high_importance_comments, self.high_risk_comments,
        ));

        out.push_str("## Sentiment\n\n| Sentiment | Count | Share |\n|---|---|---|\n");
        for s in Sentiment::ALL {
            let share = self.sentiment_distribution.get(s);
            out.push_str(&format!(
                "| {s} | {} | {:.1}% |\n",
                share.count, share.percentage
            ));
        }

        out.push_str("\n## Category\n\n| Category | Count | Share |\n|---|---|---|\n");
        for c in Category::ALL {
            let share = self.category_distribution.get(c);
            out.push_str(&format!(
                "| {c} | {} | {:.1}% |\n",
                share.count, share.percentage
            ));
        }

        out.push_str("\n## High-risk comments\n\n");
        if self.top_high_risk_comments.is_empty() {
            out.push_str("No high-risk comments.\n");
        } else {
            for a in &self.top_high_risk_comments {
                out.push_str(&format!(
                    "### \u{1f6a8} {} (importance {})\n\n",
                    a.summary, a.importance_score
                ));
                out.push_str(&format!(
                    "> {}\n\n",
                    a.original_comment.replace('\n', "\n> ")
                ));
                out.push_str(&format!(
                    "- **Category:** {} | **Sentiment:** {}\n",
                    a.category, a.sentiment
                ));
                if !a.keywords.is_empty() {
                    out.push_str(&format!("- **Keywords:** {}\n", a.keywords.join(", ")));
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remark_core::RiskLevel;

    fn annotation(sentiment: Sentiment, category: Category, score: u8, risk: RiskLevel) -> Annotation {
        Annotation {
            sentiment,
            category,
            importance_score: score,
            risk_level: risk,
            ..Annotation::default()
        }
    }

    fn ten_mixed() -> Vec<Annotation> {
        let mut v = Vec::new();
        for _ in 0..3 {
            v.push(annotation(Sentiment::Positive, Category::Content, 3, RiskLevel::Low));
        }
        for _ in 0..4 {
            v.push(annotation(Sentiment::Negative, Category::Materials, 8, RiskLevel::High));
        }
        for _ in 0..3 {
            v.push(annotation(Sentiment::Neutral, Category::Others, 5, RiskLevel::Medium));
        }
        v
    }

    #[test]
    fn sentiment_percentages() {
        let report = summarize(&ten_mixed()).unwrap();
        assert_eq!(report.total_comments, 10);
        assert_eq!(report.sentiment_distribution.positive.count, 3);
        assert_eq!(report.sentiment_distribution.positive.percentage, 30.0);
        assert_eq!(report.sentiment_distribution.negative.percentage, 40.0);
        assert_eq!(report.sentiment_distribution.neutral.percentage, 30.0);
    }

    #[test]
    fn distribution_lookup_matches_fields() {
        let mut v = ten_mixed();
        v.push(Annotation::fallback());
        let report = summarize(&v).unwrap();
        let s = &report.sentiment_distribution;
        assert_eq!(s.get(Sentiment::Negative), s.negative);
        assert_eq!(s.get(Sentiment::Neutral).count, 4);
        let c = &report.category_distribution;
        assert_eq!(c.get(Category::Materials), c.materials);
        assert_eq!(c.get(Category::Management).count, 0);
        assert_eq!(c.get(Category::Others).count, 4);
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let report = summarize(&ten_mixed()[..7]).unwrap();
        let s = &report.sentiment_distribution;
        let sum = s.positive.percentage + s.negative.percentage + s.neutral.percentage;
        assert!((sum - 100.0).abs() < 1e-9);
        let c = &report.category_distribution;
        let sum = c.content.percentage + c.materials.percentage + c.management.percentage + c.others.percentage;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_none() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn counts_high_importance_and_risk() {
        let mut v = ten_mixed();
        v.push(annotation(Sentiment::Neutral, Category::Management, 7, RiskLevel::Low));
        let report = summarize(&v).unwrap();
        assert_eq!(report.high_importance_comments, 5);
        assert_eq!(report.high_risk_comments, 4);
        assert_eq!(report.category_distribution.management.count, 1);
    }

    #[test]
    fn top_high_risk_is_capped_sorted_and_stable() {
        let mut v = Vec::new();
        for i in 0..14usize {
            let score = [5u8, 9, 5, 9, 7][i % 5];
            let mut a = annotation(Sentiment::Negative, Category::Content, score, RiskLevel::High);
            a.index = i;
            v.push(a);
        }
        v.push(annotation(Sentiment::Negative, Category::Content, 10, RiskLevel::Medium));

        let report = summarize(&v).unwrap();
        let top = &report.top_high_risk_comments;
        assert_eq!(report.high_risk_comments, 14);
        assert_eq!(top.len(), TOP_HIGH_RISK_LIMIT);
        assert!(top.windows(2).all(|w| w[0].importance_score >= w[1].importance_score));
        for w in top.windows(2) {
            if w[0].importance_score == w[1].importance_score {
                assert!(w[0].index < w[1].index);
            }
        }
        let nines: Vec<usize> = top.iter().filter(|a| a.importance_score == 9).map(|a| a.index).collect();
        assert_eq!(nines, vec![1, 3, 6, 8, 11, 13]);
        assert!(top.iter().all(|a| a.risk_level == RiskLevel::High));
    }

    #[test]
    fn histogram_counts_each_score() {
        let hist = importance_histogram(&ten_mixed());
        assert_eq!(hist[3], 3);
        assert_eq!(hist[8], 4);
        assert_eq!(hist[5], 3);
        assert_eq!(hist.iter().sum::<usize>(), 10);
    }

    #[test]
    fn filter_combines_criteria() {
        let v = ten_mixed();
        let filter = ResultFilter {
            sentiment: Some(Sentiment::Negative),
            category: Some(Category::Materials),
            min_importance: 8,
        };
        assert_eq!(filter.apply(&v).len(), 4);

        let filter = ResultFilter {
            min_importance: 9,
            ..ResultFilter::default()
        };
        assert!(filter.apply(&v).is_empty());
    }

    #[test]
    fn default_filter_hides_blank_comments() {
        let v = vec![Annotation::empty(), Annotation::fallback()];
        let kept = ResultFilter::default().apply(&v);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_analysis_error());
    }

    #[test]
    fn recommendations_follow_thresholds() {
        let report = summarize(&ten_mixed()).unwrap();
        let recs = recommendations(&report);
        assert_eq!(
            recs,
            vec![
                Recommendation::NegativeShareHigh { percentage: 40.0 },
                Recommendation::HighRiskShareHigh { percentage: 40.0 },
            ]
        );

        let mut calm = vec![annotation(Sentiment::Positive, Category::Content, 2, RiskLevel::Low); 9];
        calm.push(annotation(Sentiment::Negative, Category::Content, 4, RiskLevel::Low));
        let report = summarize(&calm).unwrap();
        assert_eq!(recommendations(&report), vec![Recommendation::Healthy]);

        let mut middling = calm.clone();
        middling.push(annotation(Sentiment::Negative, Category::Content, 4, RiskLevel::Low));
        middling.push(annotation(Sentiment::Negative, Category::Content, 4, RiskLevel::Low));
        let report = summarize(&middling).unwrap();
        assert!(recommendations(&report).is_empty());
    }

    #[test]
    fn display_and_markdown_output() {
        let mut v = ten_mixed();
        v[3].summary = "資料が古い".into();
        v[3].original_comment = "資料が古い\n更新してほしい".into();
        v[3].keywords = vec!["資料".into()];
        let report = summarize(&v).unwrap();

        let text = report.to_string();
        assert!(text.contains("Comments: 10"));
        assert!(text.contains("資料が古い 更新してほしい"));
        assert!(text.contains("Keywords: 資料"));

        let md = report.to_markdown();
        assert!(md.contains("| positive | 3 | 30.0% |"));
        assert!(md.contains("> 資料が古い\n> 更新してほしい"));
    }
}
