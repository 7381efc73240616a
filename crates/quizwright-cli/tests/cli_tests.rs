//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quizwright() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("quizwright").unwrap();
    cmd.env_remove("QUIZWRIGHT_ANTHROPIC_KEY")
        .env_remove("QUIZWRIGHT_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn write_mock_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    let path = dir.join("quizwright.toml");
    std::fs::write(
        &path,
        format!("fetch_timeout_secs = 5\n\n[generator]\ntype = \"mock\"\n{extra}"),
    )
    .unwrap();
    path
}

const FETCHING_BLUEPRINT: &str = r#"
[assessment]
title = "Sound Quiz"
numbering = "reset-per-section"

[[chapters]]
id = "sound"
name = "Sound"

[[chapters.default_rows]]
item_type = "Multiple Choice"
no_of_items = 2
marks_per_item = 1

[[sections]]
title = "Section A"
"#;

#[test]
fn validate_sample_blueprint() {
    quizwright()
        .arg("validate")
        .arg("--blueprint")
        .arg("../../blueprints/grade8-science.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 chapters, 4 outcomes, 2 sections"))
        .stdout(predicate::str::contains("Selected: 8 items, 14 marks"))
        .stdout(predicate::str::contains("Blueprint valid"));
}

#[test]
fn validate_reports_rejected_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("over.toml");
    std::fs::write(
        &path,
        r#"
[assessment]
title = "Over budget"

[[chapters]]
id = "c"
name = "C"

[[chapters.outcomes]]
id = "elo"
title = "Outcome"
max_items = 1
max_marks = 5

[[chapters.outcomes.rows]]
no_of_items = 2
marks_per_item = 1
"#,
    )
    .unwrap();

    quizwright()
        .arg("validate")
        .arg("--blueprint")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[elo] WARNING: row 1 rejected"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    quizwright()
        .arg("validate")
        .arg("--blueprint")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    quizwright()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizwright.toml"))
        .stdout(predicate::str::contains("Created blueprints/example.toml"));

    assert!(dir.path().join("quizwright.toml").exists());
    assert!(dir.path().join("blueprints/example.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    quizwright().current_dir(dir.path()).arg("init").assert().success();

    // Second init should skip
    quizwright()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn outcomes_with_mock_generator() {
    let dir = TempDir::new().unwrap();
    let config = write_mock_config(dir.path(), "fail_chapters = [\"Light\"]\n");

    quizwright()
        .arg("outcomes")
        .arg("--chapters")
        .arg("motion:Motion,light:Light")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("motion-elo-1"))
        .stdout(predicate::str::contains("Motion outcome 2"))
        .stdout(predicate::str::contains("Understand the key concepts of Light"))
        .stdout(predicate::str::contains("1 chapter(s) used fallback outcomes"));
}

#[test]
fn outcomes_without_generator_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("empty.toml");
    std::fs::write(&config, "board = \"CBSE\"\n").unwrap();

    quizwright()
        .arg("outcomes")
        .arg("--chapters")
        .arg("motion:Motion")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no outcome generator configured"));
}

#[test]
fn build_sample_blueprint() {
    let dir = TempDir::new().unwrap();
    let config = write_mock_config(dir.path(), "");
    let out = dir.path().join("out");

    quizwright()
        .arg("build")
        .arg("--blueprint")
        .arg("../../blueprints/grade8-science.toml")
        .arg("--output")
        .arg(&out)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("8 questions, 14 marks"))
        .stdout(predicate::str::contains("Assessment saved to"));

    let files: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
    assert_eq!(files.len(), 1);
    let path = files[0].as_ref().unwrap().path();
    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc["total_marks"], 14);
    assert_eq!(doc["main_numbering"], "continuous");
    assert_eq!(doc["sections"].as_array().unwrap().len(), 2);
    assert_eq!(doc["sections"][0]["questions"].as_array().unwrap().len(), 6);
}

#[test]
fn build_fetches_missing_outcomes() {
    let dir = TempDir::new().unwrap();
    let config = write_mock_config(dir.path(), "");
    let blueprint = dir.path().join("sound.toml");
    std::fs::write(&blueprint, FETCHING_BLUEPRINT).unwrap();

    // Two mock outcomes, each given two 1-mark rows.
    quizwright()
        .arg("build")
        .arg("--blueprint")
        .arg(&blueprint)
        .arg("--output")
        .arg(dir.path().join("out"))
        .arg("--numbering")
        .arg("continuous")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 questions, 4 marks"))
        .stderr(predicate::str::contains("Fetching outcomes for 1 chapter(s)"));
}

#[test]
fn build_with_nothing_selected_fails() {
    let dir = TempDir::new().unwrap();
    let blueprint = dir.path().join("empty.toml");
    std::fs::write(&blueprint, "[assessment]\ntitle = \"Empty\"\n").unwrap();
    let config = write_mock_config(dir.path(), "");

    quizwright()
        .arg("build")
        .arg("--blueprint")
        .arg(&blueprint)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no items to compose"));
}

#[test]
fn build_rejects_unknown_numbering() {
    quizwright()
        .arg("build")
        .arg("--blueprint")
        .arg("../../blueprints/grade8-science.toml")
        .arg("--numbering")
        .arg("roman")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn help_output() {
    quizwright()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Budget-constrained assessment builder"));
}

#[test]
fn version_output() {
    quizwright()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizwright"));
}
