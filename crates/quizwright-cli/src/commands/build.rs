//! The `quizwright build` command.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use quizwright_core::blueprint::parse_blueprint;
use quizwright_core::document::AssessmentDocument;
use quizwright_core::fetch::OutcomeFetchOrchestrator;
use quizwright_core::model::NumberingPolicy;
use quizwright_core::selection::ItemSelectionSet;
use quizwright_providers::config::{configured_generator, load_config_from};

use super::outcomes::ConsoleProgress;

pub async fn execute(
    blueprint_path: PathBuf,
    output: Option<PathBuf>,
    numbering: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let blueprint = parse_blueprint(&blueprint_path)?;
    let numbering = numbering
        .map(|n| n.parse::<NumberingPolicy>().map_err(|e| anyhow::anyhow!("{}", e)))
        .transpose()?;
    let config = load_config_from(config_path.as_deref())?;

    let (mut tree, mut warnings) = blueprint.build_tree();

    let to_fetch = blueprint.chapters_to_fetch();
    if !to_fetch.is_empty() {
        let generator = configured_generator(&config)?;
        let orchestrator = OutcomeFetchOrchestrator::new(generator, config.fetch_config());
        eprintln!("Fetching outcomes for {} chapter(s)", to_fetch.len());
        let summary = orchestrator
            .populate(&mut tree, &to_fetch, &ConsoleProgress)
            .await?;
        for degraded in summary.degraded() {
            eprintln!("  note: {} uses fallback outcomes", degraded.chapter_id);
        }
        warnings.extend(blueprint.configure_fetched(&mut tree));
    }

    for w in &warnings {
        let prefix = w
            .outcome_id
            .as_ref()
            .map(|id| format!("[{id}] "))
            .unwrap_or_default();
        eprintln!("  WARNING: {prefix}{}", w.message);
    }

    let mut items = ItemSelectionSet::new();
    let generated = items.generate(&tree.committed_rows()).len();
    if generated == 0 {
        anyhow::bail!("no items to compose: select at least one outcome with configuration rows");
    }

    let mut composer = blueprint.compose(&items);
    if let Some(policy) = numbering {
        composer.set_numbering_policy(policy);
    }
    let document = composer.to_document(blueprint.header.clone());

    let output = output.unwrap_or(config.output_dir);
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("assessment-{timestamp}.json"));
    document.save_json(&path)?;
    info!(path = %path.display(), items = generated, "assessment built");

    print_outline(&document);
    let totals = items.selected_totals();
    println!(
        "{} questions, {} marks, {} Bloom's level(s), {} item type(s)",
        totals.count,
        document.total_marks,
        totals.distinct_blooms_levels.len(),
        totals.distinct_item_types.len()
    );
    println!("Assessment saved to: {}", path.display());

    Ok(())
}

fn print_outline(document: &AssessmentDocument) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Section", "No.", "Question", "Marks"]);

    for entry in document.outline() {
        table.add_row(vec![
            Cell::new(entry.section_title),
            Cell::new(entry.label),
            Cell::new(entry.text),
            Cell::new(entry.marks),
        ]);
    }

    println!("{}", document.header.title);
    println!("{table}");
}
