//! Importing foreign outcomes and consolidating active ones.
//!
//! Import copies an outcome (and its rows) from another chapter or subject
//! into the active tree under a new id. Consolidate folds the learning
//! sequences of two or more active outcomes into a single lesson unit.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AssessmentError, Result};
use crate::model::{ItemConfigurationRow, LearningOutcome, LessonStep};
use crate::tree::OutcomeTree;

/// What the author picked in the foreign-chapter browser.
///
/// All three parts must be present before a merge is attempted.
#[derive(Debug, Clone, Default)]
pub struct MergeSelection {
    pub subject_id: Option<String>,
    pub chapter_id: Option<String>,
    pub outcome: Option<LearningOutcome>,
}

impl MergeSelection {
    pub fn new(
        subject_id: impl Into<String>,
        chapter_id: impl Into<String>,
        outcome: LearningOutcome,
    ) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            chapter_id: Some(chapter_id.into()),
            outcome: Some(outcome),
        }
    }

    fn into_outcome(self) -> Result<LearningOutcome> {
        if self.subject_id.as_deref().is_none_or(str::is_empty) {
            return Err(AssessmentError::InvalidMergeSelection("subject"));
        }
        if self.chapter_id.as_deref().is_none_or(str::is_empty) {
            return Err(AssessmentError::InvalidMergeSelection("chapter"));
        }
        self.outcome
            .ok_or(AssessmentError::InvalidMergeSelection("outcome"))
    }
}

/// Creates merged outcomes. The clock only feeds id synthesis.
pub struct OutcomeMerger {
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl Default for OutcomeMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeMerger {
    pub fn new() -> Self {
        Self {
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Use a fixed timestamp source (milliseconds).
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Copy the selected outcome into `target_chapter_id`, returning its new id.
    ///
    /// The copy is selected, keeps its own ceilings, and gets fresh row ids.
    /// The source outcome is not touched.
    pub fn merge_into(
        &self,
        tree: &mut OutcomeTree,
        target_chapter_id: &str,
        selection: MergeSelection,
    ) -> Result<String> {
        let source_chapter = selection.chapter_id.clone();
        let source = selection.into_outcome()?;
        if tree.chapter(target_chapter_id).is_none() {
            return Err(AssessmentError::ChapterNotFound(
                target_chapter_id.to_string(),
            ));
        }

        let mut stamp = (self.clock)();
        let mut new_id = format!("{target_chapter_id}-merged-{stamp}");
        while tree.contains_outcome(&new_id) {
            stamp += 1;
            new_id = format!("{target_chapter_id}-merged-{stamp}");
        }

        let config_rows = source
            .config_rows
            .iter()
            .enumerate()
            .map(|(i, row)| ItemConfigurationRow {
                id: format!("{new_id}-row-{}", i + 1),
                ..row.clone()
            })
            .collect();

        let imported = LearningOutcome {
            id: new_id.clone(),
            title: source.title.clone(),
            description: source.description.clone(),
            selected: true,
            max_items: source.max_items,
            max_marks: source.max_marks,
            config_rows,
            learning_sequence: source.learning_sequence.clone(),
        };
        tree.insert_outcome(target_chapter_id, imported)?;

        info!(
            source = %source.id,
            from_chapter = source_chapter.as_deref().unwrap_or_default(),
            target = %target_chapter_id,
            merged = %new_id,
            "outcome imported"
        );
        Ok(new_id)
    }

    /// Combine two or more experiences into one keyed `"A + B"`.
    ///
    /// Steps are unioned by name: the first occurrence keeps its place, later
    /// ones only append their content after a blank line. The merged unit
    /// takes the position of the first constituent.
    pub fn consolidate(&self, design: &mut LessonDesign, keys: &[&str]) -> Result<String> {
        let mut distinct = HashSet::new();
        if keys.len() < 2 || !keys.iter().all(|k| distinct.insert(*k)) {
            return Err(AssessmentError::InvalidConsolidation(
                "at least two distinct experiences are required".into(),
            ));
        }
        let mut positions = Vec::with_capacity(keys.len());
        for key in keys {
            let pos = design
                .position(key)
                .ok_or_else(|| AssessmentError::ExperienceNotFound(key.to_string()))?;
            positions.push(pos);
        }

        let parts: Vec<&LearningExperience> =
            positions.iter().map(|&p| &design.experiences[p]).collect();
        let merged_key = parts
            .iter()
            .map(|e| e.key.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        let mut outcome_ids = Vec::new();
        let mut steps: Vec<LessonStep> = Vec::new();
        for part in &parts {
            outcome_ids.extend(part.outcome_ids.iter().cloned());
            for step in &part.steps {
                match steps.iter_mut().find(|s| s.name == step.name) {
                    Some(existing) => {
                        existing.content.push_str("\n\n");
                        existing.content.push_str(&step.content);
                    }
                    None => steps.push(step.clone()),
                }
            }
        }

        let insert_at = positions.iter().copied().min().unwrap_or(0);
        let merged = LearningExperience {
            key: merged_key.clone(),
            outcome_ids,
            steps,
        };
        let mut remaining = Vec::with_capacity(design.experiences.len() + 1 - keys.len());
        for (i, experience) in design.experiences.drain(..).enumerate() {
            if i == insert_at {
                remaining.push(merged.clone());
            }
            if !positions.contains(&i) {
                remaining.push(experience);
            }
        }
        design.experiences = remaining;

        debug!(key = %merged_key, parts = keys.len(), "experiences consolidated");
        Ok(merged_key)
    }
}

/// One unit of the lesson design: a single outcome or a consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningExperience {
    /// The display title, or titles joined with `" + "` once consolidated.
    pub key: String,
    pub outcome_ids: Vec<String>,
    pub steps: Vec<LessonStep>,
}

/// The active set of learning experiences built from selected outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDesign {
    pub experiences: Vec<LearningExperience>,
}

impl LessonDesign {
    /// One experience per selected outcome, in tree order.
    ///
    /// Keys are outcome titles. A title seen before (an imported copy keeps
    /// its source's title) gets a ` (n)` suffix so every key stays unique.
    pub fn from_tree(tree: &OutcomeTree) -> Self {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut experiences = Vec::new();
        for outcome in tree.selected_outcomes() {
            let count = seen.entry(outcome.title.as_str()).or_insert(0);
            *count += 1;
            let key = if *count == 1 {
                outcome.title.clone()
            } else {
                format!("{} ({count})", outcome.title)
            };
            experiences.push(LearningExperience {
                key,
                outcome_ids: vec![outcome.id.clone()],
                steps: outcome.learning_sequence.clone(),
            });
        }
        Self { experiences }
    }

    pub fn experience(&self, key: &str) -> Option<&LearningExperience> {
        self.experiences.iter().find(|e| e.key == key)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.experiences.iter().position(|e| e.key == key)
    }
}
