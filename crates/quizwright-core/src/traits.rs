//! Trait boundaries for external collaborators.
//!
//! Outcome text comes from an LLM-backed generator and foreign chapters come
//! from a curriculum service. Both are implemented in `quizwright-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Chapter;

// ---------------------------------------------------------------------------
// Outcome generator
// ---------------------------------------------------------------------------

/// Generates candidate learning outcomes for one chapter.
#[async_trait]
pub trait OutcomeGenerator: Send + Sync {
    /// Human-readable generator name (e.g. "anthropic").
    fn name(&self) -> &str;

    async fn generate_outcomes(&self, request: &OutcomeRequest) -> anyhow::Result<OutcomeResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub board: String,
    pub grade: String,
    pub subject: String,
    pub chapter_name: String,
}

/// Wire shape returned by outcome generators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeResponse {
    #[serde(default)]
    pub course_outcomes: Vec<CourseOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOutcome {
    pub co_title: String,
    #[serde(default)]
    pub co_description: String,
}

// ---------------------------------------------------------------------------
// Curriculum browser
// ---------------------------------------------------------------------------

/// Lists subjects and chapters for picking an outcome to import.
#[async_trait]
pub trait CurriculumBrowser: Send + Sync {
    async fn list_subjects(&self, org: &str, class_id: &str) -> anyhow::Result<Vec<Subject>>;

    async fn list_chapters(&self, org: &str, plan_class_id: &str)
        -> anyhow::Result<Vec<ChapterListing>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_id: String,
    pub subject_name: String,
    #[serde(default)]
    pub plan_class_id: Option<String>,
}

/// A chapter entry as returned by the curriculum service. Fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterListing {
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub chapter_name: Option<String>,
}

/// Keep only listings with an id and a non-blank name.
pub fn offerable_chapters(listings: Vec<ChapterListing>) -> Vec<Chapter> {
    listings
        .into_iter()
        .filter_map(|l| {
            let id = l.chapter_id.filter(|id| !id.trim().is_empty())?;
            let name = l.chapter_name.filter(|n| !n.trim().is_empty())?;
            Some(Chapter { id, name })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Pull a JSON payload out of a chatty LLM reply.
///
/// Prefers a ```json fenced block, then a generic fence, then the span from
/// the first `{` to the last `}`. Returns the trimmed input otherwise.
pub fn extract_json_block(response: &str) -> String {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_blocks.push(current_block.clone());
            } else if is_generic_block {
                generic_blocks.push(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    if let Some(block) = json_blocks.into_iter().next() {
        return block;
    }
    if let Some(block) = generic_blocks.into_iter().next() {
        return block;
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => response[start..=end].to_string(),
        _ => response.trim().to_string(),
    }
}
