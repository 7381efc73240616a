//! The `quizwright outcomes` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizwright_core::fetch::{ChapterFetchReport, FetchProgress, FetchSource, OutcomeFetchOrchestrator};
use quizwright_core::model::Chapter;
use quizwright_core::tree::OutcomeTree;
use quizwright_providers::config::{configured_generator, load_config_from};

/// Console progress reporter.
pub struct ConsoleProgress;

impl FetchProgress for ConsoleProgress {
    fn on_chapter_start(&self, chapter: &Chapter, position: usize, total: usize) {
        eprintln!("  Fetching [{position}/{total}]: {}", chapter.name);
    }

    fn on_chapter_complete(&self, report: &ChapterFetchReport) {
        match &report.source {
            FetchSource::Live => eprintln!(
                "  Done: {} ({} outcomes, {}ms)",
                report.chapter_id, report.outcome_count, report.duration_ms
            ),
            FetchSource::Fallback(reason) => eprintln!(
                "  FALLBACK: {}: {reason} ({} default outcomes)",
                report.chapter_id, report.outcome_count
            ),
        }
    }
}

/// Parse `"id:name,id:name"` into chapters, in the order given.
pub fn parse_chapters(pairs: &str) -> Result<Vec<Chapter>> {
    pairs.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (id, name) = pair
                .split_once(':')
                .with_context(|| format!("expected id:name, got '{pair}'"))?;
            let (id, name) = (id.trim(), name.trim());
            if id.is_empty() || name.is_empty() {
                anyhow::bail!("chapter id and name must be non-empty in '{pair}'");
            }
            Ok(Chapter::new(id, name))
        })
        .collect()
}

pub async fn execute(chapters: String, config_path: Option<PathBuf>) -> Result<()> {
    let chapters = parse_chapters(&chapters)?;
    if chapters.is_empty() {
        anyhow::bail!("no chapters given");
    }

    let config = load_config_from(config_path.as_deref())?;
    let generator = configured_generator(&config)?;
    let orchestrator = OutcomeFetchOrchestrator::new(generator, config.fetch_config());

    let mut tree = OutcomeTree::new();
    let summary = orchestrator
        .populate(&mut tree, &chapters, &ConsoleProgress)
        .await?;

    print_outcomes(&tree);

    let degraded = summary.degraded().count();
    if degraded > 0 {
        println!("{degraded} chapter(s) used fallback outcomes.");
    }
    Ok(())
}

fn print_outcomes(tree: &OutcomeTree) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Chapter", "Outcome ID", "Title", "Limits"]);

    for node in tree.chapters() {
        for outcome in &node.outcomes {
            table.add_row(vec![
                Cell::new(&node.chapter.name),
                Cell::new(&outcome.id),
                Cell::new(&outcome.title),
                Cell::new(format!("{} items / {} marks", outcome.max_items, outcome.max_marks)),
            ]);
        }
    }

    println!("{table}");
}
