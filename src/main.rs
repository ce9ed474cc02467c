use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use remark_analyze::annotator::CommentAnnotator;
use remark_analyze::batch::{BatchRunner, ProgressEvent, ProgressObserver};
use remark_analyze::export::{self, ReportDocument};
use remark_analyze::llm::LlmClient;
use remark_analyze::report::{self, Recommendation, ResultFilter, SummaryReport};
use remark_analyze::state::AnalysisState;
use remark_analyze::survey::{analyze_survey, SurveyAnalysis};
use remark_core::{Annotation, Category, OutputFormat, RemarkConfig, Sentiment};
use remark_survey::columns::{detect_comment_columns, select_columns};
use remark_survey::table::SurveyTable;

const CONFIG_FILE: &str = ".remark.toml";

#[derive(Parser)]
#[command(
    name = "remark",
    version,
    about = "LLM-assisted analysis of lecture survey comments",
    long_about = "Remark annotates free-text lecture survey comments with an LLM and\n\
                   aggregates them into a report.\n\n\
                   Each comment gets a sentiment, a category, an importance score (0-10),\n\
                   a risk level, a short summary, and keywords.\n\n\
                   Examples:\n  \
                     remark columns survey.csv          Preview candidate comment columns\n  \
                     remark analyze survey.csv          Annotate the recognized columns\n  \
                     remark report --sentiment negative Browse the last analysis\n  \
                     remark export                      Write CSV and JSON exports\n  \
                     remark doctor                      Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .remark.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate the comment columns of a survey export
    #[command(long_about = "Annotate the comment columns of a survey export.\n\n\
        Reads CSV, or the first sheet of an Excel/ODS workbook.\n\
        Recognized column labels come from [analysis].columns in .remark.toml;\n\
        pass --column to pick columns explicitly. Comments are sent one at a\n\
        time with a pause between calls. Press Ctrl-C to stop early and keep\n\
        the comments analyzed so far.\n\n\
        Examples:\n  remark analyze survey.csv\n  remark analyze survey.csv --column 'ご自由にご意見をお書きください。' --max-comments 50\n  remark analyze survey.csv --csv out.csv --json out.json")]
    Analyze {
        /// Survey as CSV or workbook (first row is the header)
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Column to analyze; repeat for several (default: recognized columns)
        #[arg(long)]
        column: Vec<String>,
        /// Maximum comments per column
        #[arg(long)]
        max_comments: Option<usize>,
        /// Seconds to wait between LLM calls
        #[arg(long)]
        delay: Option<f64>,
        /// Also write the CSV export to this path
        #[arg(long = "csv", value_name = "PATH")]
        csv_out: Option<PathBuf>,
        /// Also write the JSON report to this path
        #[arg(long = "json", value_name = "PATH")]
        json_out: Option<PathBuf>,
        /// Do not save results to .remark/last-analysis.json
        #[arg(long)]
        no_save: bool,
    },
    /// Show the report for the last analysis or an exported JSON report
    #[command(long_about = "Show the report for the last analysis or an exported JSON report.\n\n\
        Prints the summary, recommendations, and the comments matching the filters.\n\n\
        Examples:\n  remark report\n  remark report --sentiment negative --min-importance 7\n  remark report --input analysis_report_20240701_120000.json --format markdown")]
    Report {
        /// Exported JSON report to read instead of the saved analysis
        #[arg(long)]
        input: Option<PathBuf>,
        /// Only list comments with this sentiment
        #[arg(long)]
        sentiment: Option<Sentiment>,
        /// Only list comments in this category
        #[arg(long)]
        category: Option<Category>,
        /// Only list comments with at least this importance
        #[arg(long, default_value = "1")]
        min_importance: u8,
    },
    /// Preview the comment columns of a survey export
    #[command(long_about = "Preview the comment columns of a survey export.\n\n\
        Lists the recognized columns that `analyze` would use, and every column\n\
        whose header looks like a free-text comment field.")]
    Columns {
        /// Survey as CSV or workbook
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Export the last analysis as CSV and JSON
    #[command(long_about = "Export the last analysis as CSV and JSON.\n\n\
        Without options, writes comment_analysis_<timestamp>.csv and\n\
        analysis_report_<timestamp>.json to the current directory.")]
    Export {
        /// Write the CSV export to this path
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Write the JSON report to this path
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,
    },
    /// Create a default .remark.toml configuration file
    #[command(long_about = "Create a default .remark.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .remark.toml already exists.")]
    Init,
    /// Check your remark setup and environment
    #[command(long_about = "Check your remark setup and environment.\n\n\
        Runs diagnostics for the config file, LLM provider and API key, and\n\
        saved analysis state. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mremark\x1b[0m v{version}: survey comment analysis with LLMs\n");

        println!("Quick start:");
        println!("  \x1b[36mremark init\x1b[0m                   Create a .remark.toml config file");
        println!("  \x1b[36mremark columns survey.csv\x1b[0m     Preview the comment columns");
        println!("  \x1b[36mremark analyze survey.csv\x1b[0m     Annotate comments with the LLM\n");

        println!("All commands:");
        println!("  \x1b[32manalyze\x1b[0m   Annotate survey comments and summarize them");
        println!("  \x1b[32mreport\x1b[0m    Show and filter the last analysis");
        println!("  \x1b[32mcolumns\x1b[0m   Preview recognized and detected comment columns");
        println!("  \x1b[32mexport\x1b[0m    Write CSV and JSON exports");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("remark v{version}: survey comment analysis with LLMs\n");

        println!("Quick start:");
        println!("  remark init                   Create a .remark.toml config file");
        println!("  remark columns survey.csv     Preview the comment columns");
        println!("  remark analyze survey.csv     Annotate comments with the LLM\n");

        println!("All commands:");
        println!("  analyze   Annotate survey comments and summarize them");
        println!("  report    Show and filter the last analysis");
        println!("  columns   Preview recognized and detected comment columns");
        println!("  export    Write CSV and JSON exports");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'remark <command> --help' for details.");
}

/// Renders batch progress on stderr: a bar per column on a terminal, plain
/// lines otherwise.
struct ProgressDisplay {
    interactive: bool,
    column: String,
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressDisplay {
    fn new(interactive: bool) -> Self {
        Self {
            interactive,
            column: String::new(),
            bar: None,
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

impl ProgressObserver for ProgressDisplay {
    fn on_column(&mut self, column: &str, total: usize) {
        self.finish();
        self.column = column.chars().take(24).collect();
        if self.interactive {
            let bar = indicatif::ProgressBar::new(total as u64);
            let style = indicatif::ProgressStyle::with_template(
                "{prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("=> ");
            bar.set_style(style);
            bar.set_prefix(self.column.clone());
            bar.enable_steady_tick(Duration::from_millis(120));
            self.bar = Some(bar);
        } else {
            eprintln!("Analyzing {} ({total} comments)", self.column);
        }
    }

    fn on_progress(&mut self, event: &ProgressEvent) {
        let eta = event
            .eta
            .map(|d| format!(", eta {:.0}s", d.as_secs_f64()))
            .unwrap_or_default();
        let msg = format!("+{} -{}{eta}", event.positive, event.negative);
        match &self.bar {
            Some(bar) => {
                bar.set_position(event.completed as u64);
                bar.set_message(msg);
            }
            None => eprintln!(
                "  {}/{} ({:.1}%) {msg}",
                event.completed, event.total, event.percentage
            ),
        }
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(
    config: &RemarkConfig,
    config_path: &Path,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    if config_path.exists() {
        checks.push(CheckResult::pass(
            "config_file",
            format!("{} found", config_path.display()),
        ));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{} not found", config_path.display()),
            "run 'remark init' to create a default config",
        ));
    }

    // 2. Config values
    match config.validate() {
        Ok(()) => checks.push(CheckResult::pass("config_values", "all settings in range")),
        Err(e) => checks.push(CheckResult::fail(
            "config_values",
            e.to_string(),
            format!("fix the setting in {}", config_path.display()),
        )),
    }

    // 3. LLM provider + API key
    let env_vars = config.llm.api_key_env_vars().join(" or ");
    checks.push(CheckResult::pass(
        "llm_provider",
        format!("{} (model: {})", config.llm.provider, config.llm.model),
    ));
    match config.llm.resolve_api_key() {
        Ok(_) if config.llm.api_key.is_some() => {
            checks.push(CheckResult::pass("llm_api_key", "set in config file"))
        }
        Ok(_) => checks.push(CheckResult::pass("llm_api_key", format!("{env_vars} set"))),
        Err(_) => checks.push(CheckResult::fail(
            "llm_api_key",
            format!("{env_vars} not set"),
            format!("export {env_vars}=... or set api_key in {CONFIG_FILE} under [llm]"),
        )),
    }

    // 4. Pacing
    checks.push(CheckResult::info(
        "pacing",
        format!(
            "{}s between calls, {}s per-call timeout, {} comments per column",
            config.analysis.delay_secs, config.llm.timeout_secs, config.analysis.max_comments_per_column
        ),
    ));

    // 5. Saved analysis
    let cwd = std::env::current_dir().into_diagnostic()?;
    match AnalysisState::load(&cwd) {
        Ok(Some(state)) => checks.push(CheckResult::info(
            "saved_analysis",
            format!(
                "{} comments from {} ({})",
                state.annotations.len(),
                state.source,
                state.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
        )),
        Ok(None) => checks.push(CheckResult::info("saved_analysis", "none")),
        Err(e) => checks.push(CheckResult::fail(
            "saved_analysis",
            e.to_string(),
            "delete .remark/last-analysis.json and run 'remark analyze' again",
        )),
    }

    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("remark v{version}: environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<16} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

fn print_analysis(result: &SurveyAnalysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            let Some(summary) = &result.summary else {
                println!("No comments to analyze.");
                return Ok(());
            };
            print!("{}", summary.to_markdown());
            print_recommendations_markdown(summary);
        }
        OutputFormat::Text => {
            let stats = &result.stats;
            println!(
                "Analyzed {} comments from {} column(s) ({} rows): {} annotated, {} blank, {} failed\n",
                stats.completed(),
                result.columns.len(),
                result.rows,
                stats.analyzed,
                stats.skipped_empty,
                stats.failures(),
            );
            let Some(summary) = &result.summary else {
                println!("No comments to analyze.");
                return Ok(());
            };
            print!("{summary}");
            print_recommendations_text(summary);
        }
    }
    Ok(())
}

fn print_recommendations_text(summary: &SummaryReport) {
    let recs = report::recommendations(summary);
    if !recs.is_empty() {
        println!("\nRecommendations:");
        for r in recs {
            println!("  - {r}");
        }
    }
}

fn print_recommendations_markdown(summary: &SummaryReport) {
    let recs = report::recommendations(summary);
    if !recs.is_empty() {
        println!("## Recommendations\n");
        for r in recs {
            println!("- {r}");
        }
    }
}

fn print_report(
    annotations: &[Annotation],
    filter: &ResultFilter,
    format: OutputFormat,
) -> Result<()> {
    let summary = report::summarize(annotations);
    let matching = filter.apply(annotations);

    match format {
        OutputFormat::Json => {
            let recs: Vec<Recommendation> = summary
                .as_ref()
                .map(report::recommendations)
                .unwrap_or_default();
            let json = serde_json::json!({
                "summary_report": summary,
                "recommendations": recs,
                "importance_histogram": report::importance_histogram(annotations),
                "comments": matching,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            let Some(summary) = &summary else {
                println!("No analysis results.");
                return Ok(());
            };
            print!("{}", summary.to_markdown());
            print_recommendations_markdown(summary);
            println!("\n## Comments ({} matching)\n", matching.len());
            println!("| # | Column | Sentiment | Category | Importance | Summary |");
            println!("|---|---|---|---|---|---|");
            for a in &matching {
                println!(
                    "| {} | {} | {} | {} | {} | {} |",
                    a.index,
                    a.column_name.replace('|', "\\|"),
                    a.sentiment,
                    a.category,
                    a.importance_score,
                    a.summary.replace('|', "\\|"),
                );
            }
        }
        OutputFormat::Text => {
            let Some(summary) = &summary else {
                println!("No analysis results.");
                return Ok(());
            };
            print!("{summary}");
            print_recommendations_text(summary);

            println!("\nImportance distribution:");
            for (score, count) in report::importance_histogram(annotations).iter().enumerate() {
                if *count > 0 {
                    println!("  {score:>2} {}", "#".repeat(*count));
                }
            }

            println!("\nComments ({} matching):", matching.len());
            for a in &matching {
                println!(
                    "  [{}] {}/{} {}: {}",
                    a.importance_score,
                    a.sentiment,
                    a.category,
                    a.risk_level,
                    a.summary
                );
                println!("      {}", a.original_comment.replace('\n', " "));
            }
        }
    }
    Ok(())
}

fn load_saved_state() -> Result<AnalysisState> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    match AnalysisState::load(&cwd)? {
        Some(state) => Ok(state),
        None => miette::bail!(miette::miette!(
            help = "Run 'remark analyze <FILE>' first, or pass --input with an exported report",
            "No saved analysis in {}",
            cwd.display()
        )),
    }
}

const DEFAULT_CONFIG: &str = r#"# remark configuration

[llm]
# "gemini" or "openai" (any OpenAI-compatible endpoint)
# provider = "gemini"
# model = "gemini-2.0-flash"
# API key; defaults to GEMINI_API_KEY / GOOGLE_API_KEY (gemini) or OPENAI_API_KEY (openai)
# api_key = "..."
# base_url = "https://generativelanguage.googleapis.com"
# timeout_secs = 60
# temperature = 0.1

[analysis]
# max_comments_per_column = 20
# Seconds to wait between LLM calls
# delay_secs = 0.5
# Column labels analyzed when --column is not given
# columns = ["（任意）ご自由にご意見をお書きください。"]
# Header fragments used by `remark columns` to spot comment fields
# detect_keywords = ["コメント", "意見", "感想", "要望"]
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(cli.color != ColorChoice::Never && std::io::stderr().is_terminal())
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = if cli.config.is_some() || config_path.exists() {
        RemarkConfig::from_file(&config_path)?
    } else {
        RemarkConfig::default()
    };
    tracing::debug!(format = %cli.format, config = %config_path.display(), "loaded configuration");

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Analyze {
            ref input,
            ref column,
            max_comments,
            delay,
            ref csv_out,
            ref json_out,
            no_save,
        }) => {
            if let Some(n) = max_comments {
                config.analysis.max_comments_per_column = n;
            }
            if let Some(secs) = delay {
                config.analysis.delay_secs = secs;
            }
            config.validate()?;

            let table = SurveyTable::from_path(input)?;
            let columns = if column.is_empty() {
                select_columns(&table, &config.analysis.columns)
            } else {
                if let Some(missing) = column.iter().find(|c| !table.has_column(c)) {
                    miette::bail!(miette::miette!(
                        help = format!("Run 'remark columns {}' to list the available columns", input.display()),
                        "Column '{missing}' not found in {}",
                        input.display()
                    ));
                }
                column.clone()
            };
            if columns.is_empty() {
                miette::bail!(miette::miette!(
                    help = format!(
                        "Run 'remark columns {}' and pass the comment columns with --column",
                        input.display()
                    ),
                    "No recognized comment columns in {}",
                    input.display()
                ));
            }

            let client = LlmClient::from_config(&config.llm)?;
            tracing::debug!(provider = client.provider(), model = client.model(), "LLM client ready");
            let annotator = CommentAnnotator::new(client).with_timeout(config.llm.timeout());
            let runner = BatchRunner::new(annotator).with_delay(config.analysis.delay());

            let flag = runner.cancel_flag();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if flag.interrupt() {
                        eprintln!("\nInterrupted again, exiting without saving");
                        std::process::exit(130);
                    }
                    eprintln!("\nStopping after the current comment... (Ctrl-C again to exit now)");
                }
            });

            let mut progress = ProgressDisplay::new(std::io::stderr().is_terminal());
            let result = analyze_survey(
                &runner,
                &table,
                &columns,
                config.analysis.max_comments_per_column,
                &mut progress,
            )
            .await;
            progress.finish();

            if result.stats.cancelled {
                eprintln!(
                    "Analysis cancelled; keeping {} analyzed comments.",
                    result.annotations.len()
                );
            }

            let finished_at = Utc::now();
            if !no_save {
                let state = AnalysisState {
                    source: input.display().to_string(),
                    timestamp: finished_at,
                    columns: result.columns.clone(),
                    stats: result.stats.clone(),
                    annotations: result.annotations.clone(),
                };
                let cwd = std::env::current_dir().into_diagnostic()?;
                state.save(&cwd)?;
            }
            if let Some(path) = csv_out {
                export::save_csv(path, &result.annotations)?;
                eprintln!("Wrote {}", path.display());
            }
            if let Some(path) = json_out {
                ReportDocument::at(result.annotations.clone(), finished_at).save(path)?;
                eprintln!("Wrote {}", path.display());
            }

            print_analysis(&result, cli.format)?;
        }
        Some(Command::Report {
            ref input,
            sentiment,
            category,
            min_importance,
        }) => {
            let annotations = match input {
                Some(path) => ReportDocument::load(path)?.analysis_results,
                None => load_saved_state()?.annotations,
            };
            let filter = ResultFilter {
                sentiment,
                category,
                min_importance,
            };
            print_report(&annotations, &filter, cli.format)?;
        }
        Some(Command::Columns { ref input }) => {
            let table = SurveyTable::from_path(input)?;
            let recognized = select_columns(&table, &config.analysis.columns);
            let detected = detect_comment_columns(&table, &config.analysis.detect_keywords);

            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "rows": table.row_count(),
                        "recognized": recognized,
                        "detected": detected,
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Columns in {}\n", input.display());
                    println!("**Rows:** {}\n", table.row_count());
                    println!("## Recognized\n");
                    for c in &recognized {
                        println!("- {c}");
                    }
                    println!("\n## Detected\n\n| Column | Non-empty |\n|---|---|");
                    for d in &detected {
                        println!("| {} | {} |", d.name.replace('|', "\\|"), d.non_missing);
                    }
                }
                OutputFormat::Text => {
                    println!("{} rows, {} columns\n", table.row_count(), table.column_count());
                    if recognized.is_empty() {
                        println!("No recognized comment columns.");
                    } else {
                        println!("Recognized (analyzed by default):");
                        for c in &recognized {
                            println!("  {c} ({} comments)", table.non_missing_count(c));
                        }
                    }
                    if !detected.is_empty() {
                        println!("\nDetected comment-like columns:");
                        for d in &detected {
                            println!("  {} ({} comments)", d.name, d.non_missing);
                        }
                    }
                }
            }
        }
        Some(Command::Export { ref csv, ref json }) => {
            let state = load_saved_state()?;
            let now = Local::now();
            let both = csv.is_none() && json.is_none();

            let csv_path = csv
                .clone()
                .or_else(|| both.then(|| PathBuf::from(export::default_csv_name(&now))));
            let json_path = json
                .clone()
                .or_else(|| both.then(|| PathBuf::from(export::default_json_name(&now))));

            if let Some(path) = csv_path {
                export::save_csv(&path, &state.annotations)?;
                println!("Wrote {}", path.display());
            }
            if let Some(path) = json_path {
                state.to_document().save(&path)?;
                println!("Wrote {}", path.display());
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, &config_path, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "remark", &mut std::io::stdout());
        }
    }

    Ok(())
}
