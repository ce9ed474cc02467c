use std::path::Path;
use std::process::{Command, Output};

use chrono::Utc;
use remark_analyze::batch::BatchStats;
use remark_analyze::state::AnalysisState;
use remark_core::{AnalysisConfig, Annotation, Category, RiskLevel, Sentiment};

fn remark(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_remark"))
        .args(args)
        .current_dir(dir)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap()
}

fn write_survey(dir: &Path) -> String {
    let free = &AnalysisConfig::default().columns[5];
    let csv = format!(
        "回答日時,\"{free}\",ご意見・感想\n\
         2024/07/01,板書が見づらかった,特になし\n\
         2024/07/01,,\n\
         2024/07/01,毎回の小テストが役立った,もっと演習がほしい\n"
    );
    std::fs::write(dir.join("survey.csv"), csv).unwrap();
    free.clone()
}

fn saved_state(dir: &Path) {
    let annotation = |sentiment, category, score, risk, text: &str, index| Annotation {
        sentiment,
        category,
        importance_score: score,
        risk_level: risk,
        summary: text.chars().take(6).collect(),
        keywords: vec!["講義".into()],
        original_comment: text.into(),
        index,
        column_name: "ご意見".into(),
    };
    let state = AnalysisState {
        source: "survey.csv".into(),
        timestamp: Utc::now(),
        columns: vec!["ご意見".into()],
        stats: BatchStats {
            total: 3,
            analyzed: 3,
            ..BatchStats::default()
        },
        annotations: vec![
            annotation(Sentiment::Negative, Category::Management, 9, RiskLevel::High, "教室の冷房が効かない", 0),
            annotation(Sentiment::Positive, Category::Content, 3, RiskLevel::Low, "説明が丁寧だった", 1),
            annotation(Sentiment::Negative, Category::Materials, 5, RiskLevel::Medium, "スライドの誤字", 2),
        ],
    };
    state.save(dir).unwrap();
}

#[test]
fn no_command_prints_welcome() {
    let dir = tempfile::tempdir().unwrap();
    let output = remark(dir.path(), &["--color", "never"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Quick start:"));
    assert!(stdout.contains("remark analyze"));
}

#[test]
fn columns_lists_recognized_and_detected() {
    let dir = tempfile::tempdir().unwrap();
    let free = write_survey(dir.path());

    let output = remark(dir.path(), &["--format", "json", "columns", "survey.csv"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["rows"], 3);
    assert_eq!(json["recognized"], serde_json::json!([free]));
    let detected: Vec<&str> = json["detected"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert!(detected.contains(&"ご意見・感想"));
}

#[test]
fn analyze_without_api_key_fails_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    write_survey(dir.path());

    let output = remark(dir.path(), &["analyze", "survey.csv", "--delay", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API key"), "unexpected stderr: {stderr}");
    assert!(!dir.path().join(".remark").exists());
}

#[test]
fn analyze_rejects_unknown_column() {
    let dir = tempfile::tempdir().unwrap();
    write_survey(dir.path());

    let output = remark(dir.path(), &["analyze", "survey.csv", "--column", "存在しない列"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("存在しない列"));
}

#[test]
fn analyze_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = remark(dir.path(), &["analyze", "missing.csv"]);
    assert!(!output.status.success());
}

#[test]
fn report_without_saved_analysis_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = remark(dir.path(), &["report"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("remark analyze"));
}

#[test]
fn report_filters_saved_analysis() {
    let dir = tempfile::tempdir().unwrap();
    saved_state(dir.path());

    let output = remark(
        dir.path(),
        &["--format", "json", "report", "--sentiment", "negative", "--min-importance", "6"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary_report"]["total_comments"], 3);
    assert_eq!(json["summary_report"]["high_risk_comments"], 1);
    let comments = json["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["original_comment"], "教室の冷房が効かない");
    assert_eq!(json["importance_histogram"][9], 1);
}

#[test]
fn report_text_includes_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    saved_state(dir.path());

    let output = remark(dir.path(), &["--color", "never", "report"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Recommendations:"));
    assert!(stdout.contains("教室の冷房が効かない"));
    assert!(stdout.contains("Comments (3 matching)"));
}

#[test]
fn export_writes_requested_files() {
    let dir = tempfile::tempdir().unwrap();
    saved_state(dir.path());

    let output = remark(dir.path(), &["export", "--csv", "out.csv", "--json", "out.json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "original_comment,sentiment,category,importance_score,summary,keywords,column_name"
    );
    assert_eq!(lines.count(), 3);

    let doc = remark_analyze::export::ReportDocument::load(&dir.path().join("out.json")).unwrap();
    assert_eq!(doc.analysis_results.len(), 3);
    assert_eq!(doc.summary_report.unwrap().total_comments, 3);
}

#[test]
fn export_defaults_to_timestamped_names() {
    let dir = tempfile::tempdir().unwrap();
    saved_state(dir.path());

    let output = remark(dir.path(), &["export"]);
    assert!(output.status.success());

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("comment_analysis_") && n.ends_with(".csv")));
    assert!(names.iter().any(|n| n.starts_with("analysis_report_") && n.ends_with(".json")));
}
