use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_remark"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "remark init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".remark.toml");
    assert!(config_path.exists(), ".remark.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[analysis]"));

    // Everything is commented out, so the template parses to the defaults.
    let config: remark_core::RemarkConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.llm.provider, "gemini");
    assert_eq!(config.analysis.max_comments_per_column, 20);
    assert!(config.validate().is_ok());
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".remark.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_remark"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(".remark.toml")).unwrap(),
        "# existing"
    );
}
