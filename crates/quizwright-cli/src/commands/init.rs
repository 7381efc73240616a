//! The `quizwright init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizwright.toml
    if std::path::Path::new("quizwright.toml").exists() {
        println!("quizwright.toml already exists, skipping.");
    } else {
        std::fs::write("quizwright.toml", SAMPLE_CONFIG)?;
        println!("Created quizwright.toml");
    }

    // Create example blueprint
    std::fs::create_dir_all("blueprints")?;
    let example_path = std::path::Path::new("blueprints/example.toml");
    if example_path.exists() {
        println!("blueprints/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BLUEPRINT)?;
        println!("Created blueprints/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizwright.toml and pick an outcome generator");
    println!("  2. Run: quizwright validate --blueprint blueprints/example.toml");
    println!("  3. Run: quizwright build --blueprint blueprints/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizwright configuration

board = "CBSE"
grade = "8"
subject = "Science"
fetch_timeout_secs = 30
default_max_items = 10
default_max_marks = 20
output_dir = "./quizwright-output"

[generator]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

# [generator]
# type = "http"
# base_url = "https://curriculum.example.com/api"
# api_key = "${QUIZWRIGHT_API_KEY}"
"#;

const EXAMPLE_BLUEPRINT: &str = r#"[assessment]
title = "Grade 8 Science: Unit Test 1"
general_instructions = "Answer all questions. Marks are shown against each question."
total_time_minutes = 45
numbering = "continuous"

[[chapters]]
id = "force-and-pressure"
name = "Force and Pressure"

[[chapters.outcomes]]
id = "force-elo-1"
title = "Define force as a push or a pull"
max_items = 5
max_marks = 8

[[chapters.outcomes.rows]]
blooms_level = "Remember"
item_type = "Multiple Choice"
difficulty = "Easy"
no_of_items = 3
marks_per_item = 1

[[chapters.outcomes.rows]]
blooms_level = "Understand"
item_type = "Short Answer"
difficulty = "Medium"
no_of_items = 1
marks_per_item = 3

[[chapters.outcomes]]
id = "force-elo-2"
title = "Relate pressure to force and area"
max_items = 2
max_marks = 10

[[chapters.outcomes.rows]]
blooms_level = "Apply"
item_type = "Long Answer"
difficulty = "Hard"
no_of_items = 1
marks_per_item = 5

[[sections]]
title = "Section A: Objective"
item_types = ["Multiple Choice", "True/False"]

[[sections]]
title = "Section B: Subjective"
"#;
