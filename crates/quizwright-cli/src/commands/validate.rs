//! The `quizwright validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizwright_core::blueprint::{parse_blueprint, validate_blueprint};
use quizwright_core::budget::{self, tree_totals};
use quizwright_core::tree::OutcomeTree;

pub fn execute(blueprint_path: PathBuf) -> Result<()> {
    let blueprint = parse_blueprint(&blueprint_path)?;

    let outcome_count: usize = blueprint.chapters.iter().map(|c| c.outcomes.len()).sum();
    println!(
        "Blueprint: {} ({} chapters, {} outcomes, {} sections)",
        blueprint.header.title,
        blueprint.chapters.len(),
        outcome_count,
        blueprint.sections.len()
    );

    let warnings = validate_blueprint(&blueprint);
    for w in &warnings {
        let prefix = w
            .outcome_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    let (tree, _) = blueprint.build_tree();
    print_budget(&tree);

    if warnings.is_empty() {
        println!("Blueprint valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}

fn print_budget(tree: &OutcomeTree) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Chapter", "Outcome", "Selected", "Items", "Marks"]);

    for node in tree.chapters() {
        for outcome in &node.outcomes {
            let totals = budget::outcome_totals(outcome);
            table.add_row(vec![
                Cell::new(&node.chapter.name),
                Cell::new(&outcome.id),
                Cell::new(if outcome.selected { "yes" } else { "no" }),
                Cell::new(format!("{}/{}", totals.items, outcome.max_items)),
                Cell::new(format!("{}/{}", totals.marks, outcome.max_marks)),
            ]);
        }
    }

    let totals = tree_totals(tree.chapters());
    println!("\n{table}");
    println!(
        "Selected: {} items, {} marks",
        totals.selected.items, totals.selected.marks
    );
}
