//! TOML assessment blueprints.
//!
//! A blueprint names the chapters, outcomes, configuration rows, and section
//! layout of an assessment. Rows are replayed through [`OutcomeTree`] so a
//! blueprint can never smuggle in a configuration that breaks a ceiling.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::budget;
use crate::composer::AssessmentComposer;
use crate::document::AssessmentHeader;
use crate::model::{
    BloomsLevel, Chapter, Difficulty, ItemType, LearningOutcome, LessonStep, NumberingPolicy,
    DEFAULT_MAX_ITEMS, DEFAULT_MAX_MARKS,
};
use crate::selection::ItemSelectionSet;
use crate::tree::{OutcomeTree, RowDraft};

/// Intermediate TOML structure for parsing blueprint files.
#[derive(Debug, Deserialize)]
struct TomlBlueprint {
    assessment: TomlAssessmentHeader,
    #[serde(default)]
    chapters: Vec<TomlChapter>,
    #[serde(default)]
    sections: Vec<TomlSection>,
}

#[derive(Debug, Deserialize)]
struct TomlAssessmentHeader {
    title: String,
    #[serde(default)]
    general_instructions: String,
    #[serde(default)]
    total_time_minutes: Option<u32>,
    #[serde(default = "default_numbering")]
    numbering: String,
}

fn default_numbering() -> String {
    "continuous".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlChapter {
    id: String,
    name: String,
    #[serde(default)]
    outcomes: Vec<TomlOutcome>,
    /// Rows given to every fetched outcome of this chapter.
    #[serde(default)]
    default_rows: Vec<TomlRow>,
}

#[derive(Debug, Deserialize)]
struct TomlOutcome {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    selected: bool,
    #[serde(default = "default_max_items")]
    max_items: u32,
    #[serde(default = "default_max_marks")]
    max_marks: u32,
    #[serde(default)]
    rows: Vec<TomlRow>,
    #[serde(default)]
    steps: Vec<TomlStep>,
}

fn default_true() -> bool {
    true
}

fn default_max_items() -> u32 {
    DEFAULT_MAX_ITEMS
}

fn default_max_marks() -> u32 {
    DEFAULT_MAX_MARKS
}

#[derive(Debug, Deserialize)]
struct TomlRow {
    #[serde(default)]
    blooms_level: Option<String>,
    #[serde(default)]
    item_type: Option<String>,
    #[serde(default)]
    item_sub_type: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default = "default_one")]
    no_of_items: u32,
    #[serde(default = "default_one")]
    marks_per_item: u32,
}

fn default_one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct TomlStep {
    name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TomlSection {
    title: String,
    #[serde(default)]
    item_types: Vec<String>,
}

/// A chapter as written in the blueprint. No outcomes means "fetch them".
#[derive(Debug, Clone)]
pub struct ChapterPlan {
    pub chapter: Chapter,
    pub outcomes: Vec<OutcomePlan>,
    /// Applied to fetched outcomes; ignored when outcomes are listed.
    pub default_rows: Vec<RowDraft>,
}

/// An outcome with the rows the author asked for, not yet budget-checked.
#[derive(Debug, Clone)]
pub struct OutcomePlan {
    pub outcome: LearningOutcome,
    pub rows: Vec<RowDraft>,
}

/// A section and the item types routed into it. Empty means "anything".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    pub title: String,
    pub item_types: Vec<ItemType>,
}

impl SectionPlan {
    fn accepts(&self, item_type: Option<ItemType>) -> bool {
        self.item_types.is_empty() || item_type.is_some_and(|t| self.item_types.contains(&t))
    }
}

#[derive(Debug, Clone)]
pub struct Blueprint {
    pub header: AssessmentHeader,
    pub numbering: NumberingPolicy,
    pub chapters: Vec<ChapterPlan>,
    pub sections: Vec<SectionPlan>,
}

/// A warning from blueprint validation or tree building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The outcome id (if applicable).
    pub outcome_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn outcome(outcome_id: &str, message: impl Into<String>) -> Self {
        Self {
            outcome_id: Some(outcome_id.to_string()),
            message: message.into(),
        }
    }

    fn general(message: impl Into<String>) -> Self {
        Self {
            outcome_id: None,
            message: message.into(),
        }
    }
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<T>().map_err(|e| anyhow::anyhow!("{}", e)))
        .transpose()
}

fn parse_row(r: TomlRow) -> Result<RowDraft> {
    Ok(RowDraft {
        blooms_level: parse_opt::<BloomsLevel>(r.blooms_level)?,
        item_type: parse_opt::<ItemType>(r.item_type)?,
        item_sub_type: r.item_sub_type,
        difficulty: parse_opt::<Difficulty>(r.difficulty)?,
        no_of_items: r.no_of_items,
        marks_per_item: r.marks_per_item,
    })
}

/// Parse a single blueprint file.
pub fn parse_blueprint(path: &Path) -> Result<Blueprint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read blueprint: {}", path.display()))?;

    parse_blueprint_str(&content, path)
}

/// Parse a TOML string into a `Blueprint` (useful for testing).
pub fn parse_blueprint_str(content: &str, source_path: &Path) -> Result<Blueprint> {
    let parsed: TomlBlueprint = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let numbering: NumberingPolicy = parsed
        .assessment
        .numbering
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let chapters = parsed
        .chapters
        .into_iter()
        .map(|c| {
            let outcomes = c
                .outcomes
                .into_iter()
                .map(|o| {
                    let rows = o
                        .rows
                        .into_iter()
                        .map(parse_row)
                        .collect::<Result<Vec<_>>>()
                        .with_context(|| format!("invalid row in outcome {}", o.id))?;

                    let mut outcome = LearningOutcome::new(o.id, o.title)
                        .with_description(o.description)
                        .with_limits(o.max_items, o.max_marks);
                    outcome.selected = o.selected;
                    outcome.learning_sequence = o
                        .steps
                        .into_iter()
                        .map(|s| LessonStep::new(s.name, s.content))
                        .collect();
                    Ok(OutcomePlan { outcome, rows })
                })
                .collect::<Result<Vec<_>>>()?;

            let default_rows = c
                .default_rows
                .into_iter()
                .map(parse_row)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("invalid default row in chapter {}", c.id))?;

            Ok(ChapterPlan {
                chapter: Chapter::new(c.id, c.name),
                outcomes,
                default_rows,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sections = parsed
        .sections
        .into_iter()
        .map(|s| {
            let item_types = s
                .item_types
                .iter()
                .map(|t| t.parse::<ItemType>().map_err(|e| anyhow::anyhow!("{}", e)))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("invalid item type in section {}", s.title))?;
            Ok(SectionPlan {
                title: s.title,
                item_types,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Blueprint {
        header: AssessmentHeader {
            title: parsed.assessment.title,
            general_instructions: parsed.assessment.general_instructions,
            total_time_minutes: parsed.assessment.total_time_minutes,
        },
        numbering,
        chapters,
        sections,
    })
}

impl Blueprint {
    /// Chapters listed without outcomes; their outcomes have to be fetched.
    pub fn chapters_to_fetch(&self) -> Vec<Chapter> {
        self.chapters
            .iter()
            .filter(|c| c.outcomes.is_empty())
            .map(|c| c.chapter.clone())
            .collect()
    }

    /// Build the outcome tree by replaying every row through the budget.
    ///
    /// Rejected rows are dropped and reported as warnings. Chapters without
    /// outcomes are left out for the fetch step to fill in.
    pub fn build_tree(&self) -> (OutcomeTree, Vec<ValidationWarning>) {
        let mut tree = OutcomeTree::new();
        let mut warnings = Vec::new();

        for plan in self.chapters.iter().filter(|c| !c.outcomes.is_empty()) {
            let outcomes: Vec<LearningOutcome> =
                plan.outcomes.iter().map(|o| o.outcome.clone()).collect();
            if let Err(e) = tree.add_chapter(plan.chapter.clone(), outcomes) {
                warnings.push(ValidationWarning::general(format!(
                    "chapter {} skipped: {e}",
                    plan.chapter.id
                )));
                continue;
            }
            for outcome in &plan.outcomes {
                for (i, row) in outcome.rows.iter().enumerate() {
                    if let Err(e) = tree.add_row_with(&outcome.outcome.id, row.clone()) {
                        warn!(outcome = %outcome.outcome.id, row = i + 1, "blueprint row dropped: {e}");
                        warnings.push(ValidationWarning::outcome(
                            &outcome.outcome.id,
                            format!("row {} rejected: {e}", i + 1),
                        ));
                    }
                }
            }
        }
        (tree, warnings)
    }

    /// Select fetched outcomes and give them their chapter's default rows.
    ///
    /// Only chapters listed without outcomes and with `default_rows` are
    /// touched. Rows that do not fit an outcome's ceilings are dropped.
    pub fn configure_fetched(&self, tree: &mut OutcomeTree) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let plans = self
            .chapters
            .iter()
            .filter(|c| c.outcomes.is_empty() && !c.default_rows.is_empty());

        for plan in plans {
            let outcome_ids: Vec<String> = match tree.chapter(&plan.chapter.id) {
                Some(node) => node.outcomes.iter().map(|o| o.id.clone()).collect(),
                None => continue,
            };
            for outcome_id in outcome_ids {
                if let Err(e) = tree.set_outcome_selected(&outcome_id, true) {
                    warnings.push(ValidationWarning::outcome(&outcome_id, e.to_string()));
                    continue;
                }
                for (i, row) in plan.default_rows.iter().enumerate() {
                    if let Err(e) = tree.add_row_with(&outcome_id, row.clone()) {
                        warn!(outcome = %outcome_id, row = i + 1, "default row dropped: {e}");
                        warnings.push(ValidationWarning::outcome(
                            &outcome_id,
                            format!("default row {} rejected: {e}", i + 1),
                        ));
                    }
                }
            }
        }
        warnings
    }

    /// Route the selected items into the blueprint's sections.
    ///
    /// Each item goes to the first section accepting its type. Items no
    /// section accepts end up in a trailing "Additional Questions" section.
    pub fn compose(&self, items: &ItemSelectionSet) -> AssessmentComposer {
        let mut composer = AssessmentComposer::new(self.numbering);
        let plans: Vec<SectionPlan> = if self.sections.is_empty() {
            vec![SectionPlan {
                title: "Section A".to_string(),
                item_types: Vec::new(),
            }]
        } else {
            self.sections.clone()
        };
        let ids: Vec<String> = plans.iter().map(|p| composer.add_section(&p.title)).collect();
        let mut overflow: Option<String> = None;

        for item in items.selected_items() {
            let target = match plans.iter().position(|p| p.accepts(item.item_type)) {
                Some(i) => ids[i].clone(),
                None => overflow
                    .get_or_insert_with(|| composer.add_section("Additional Questions"))
                    .clone(),
            };
            if let Err(e) = composer.add_item_to_section(&target, item) {
                warn!(item = %item.id, "item not placed: {e}");
            }
        }
        composer
    }
}

/// Validate a blueprint for common issues.
pub fn validate_blueprint(blueprint: &Blueprint) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Check for duplicate outcome IDs
    let mut seen_ids = std::collections::HashSet::new();
    for outcome in blueprint.chapters.iter().flat_map(|c| c.outcomes.iter()) {
        if !seen_ids.insert(outcome.outcome.id.as_str()) {
            warnings.push(ValidationWarning::outcome(
                &outcome.outcome.id,
                format!("duplicate outcome ID: {}", outcome.outcome.id),
            ));
        }
    }

    for outcome in blueprint.chapters.iter().flat_map(|c| c.outcomes.iter()) {
        let id = outcome.outcome.id.as_str();
        for (i, row) in outcome.rows.iter().enumerate() {
            if row.item_type == Some(ItemType::Others)
                && row.item_sub_type.as_deref().is_none_or(|s| s.trim().is_empty())
            {
                warnings.push(ValidationWarning::outcome(
                    id,
                    format!("row {} has item type Others but no item_sub_type", i + 1),
                ));
            }
            if row.item_sub_type.is_some() && row.item_type != Some(ItemType::Others) {
                warnings.push(ValidationWarning::outcome(
                    id,
                    format!("row {} sets item_sub_type but is not of type Others; it will be ignored", i + 1),
                ));
            }
            if row.no_of_items == 0 {
                warnings.push(ValidationWarning::outcome(
                    id,
                    format!("row {} asks for zero items", i + 1),
                ));
            }
        }
        if outcome.outcome.selected && outcome.rows.is_empty() {
            warnings.push(ValidationWarning::outcome(
                id,
                "selected outcome has no configuration rows",
            ));
        }
    }

    for chapter in &blueprint.chapters {
        if !chapter.outcomes.is_empty() && !chapter.default_rows.is_empty() {
            warnings.push(ValidationWarning::general(format!(
                "chapter {} lists outcomes, so its default_rows are ignored",
                chapter.chapter.id
            )));
        }
    }

    for chapter in blueprint.chapters.iter().filter(|c| c.outcomes.is_empty()) {
        warnings.push(ValidationWarning::general(format!(
            "chapter {} has no outcomes; they will be fetched at build time",
            chapter.chapter.id
        )));
    }

    for section in &blueprint.sections {
        if section.title.trim().is_empty() {
            warnings.push(ValidationWarning::general("section title is empty"));
        }
    }

    // Replaying rows surfaces every budget rejection.
    let (tree, build_warnings) = blueprint.build_tree();
    warnings.extend(build_warnings);
    for outcome in tree.chapters().iter().flat_map(|c| c.outcomes.iter()) {
        if !budget::within_limits(outcome) {
            warnings.push(ValidationWarning::outcome(
                &outcome.id,
                "committed rows exceed the outcome's ceilings",
            ));
        }
    }

    warnings
}
