//! The Chapter → LearningOutcome → ItemConfigurationRow hierarchy.
//!
//! Every operation is atomic: it either commits in full or returns an error
//! and leaves the tree untouched. Row additions and numeric edits go through
//! [`crate::budget::check_row_mutation`] first.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::budget::{self, BudgetTotals, RowFigures, RowTarget};
use crate::error::{AssessmentError, Result};
use crate::model::{
    BloomsLevel, Chapter, Difficulty, ItemConfigurationRow, ItemType, LearningOutcome,
};

/// A chapter together with the outcomes it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterNode {
    pub chapter: Chapter,
    #[serde(default)]
    pub outcomes: Vec<LearningOutcome>,
}

/// Fields for a new configuration row. The default matches a blank row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    pub blooms_level: Option<BloomsLevel>,
    pub item_type: Option<ItemType>,
    pub item_sub_type: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub no_of_items: u32,
    pub marks_per_item: u32,
}

impl Default for RowDraft {
    fn default() -> Self {
        Self {
            blooms_level: None,
            item_type: None,
            item_sub_type: None,
            difficulty: None,
            no_of_items: RowFigures::NEW_ROW.no_of_items,
            marks_per_item: RowFigures::NEW_ROW.marks_per_item,
        }
    }
}

impl RowDraft {
    pub fn sized(no_of_items: u32, marks_per_item: u32) -> Self {
        Self {
            no_of_items,
            marks_per_item,
            ..Self::default()
        }
    }
}

/// A single-field edit of an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowUpdate {
    BloomsLevel(Option<BloomsLevel>),
    ItemType(Option<ItemType>),
    ItemSubType(Option<String>),
    Difficulty(Option<Difficulty>),
    NoOfItems(u32),
    MarksPerItem(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitField {
    MaxItems,
    MaxMarks,
}

/// A committed row annotated with its owning outcome.
///
/// This is everything the item-generation stage gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    pub elo_id: String,
    pub elo_title: String,
    pub row: ItemConfigurationRow,
}

/// The author's outcome tree for one assessment session.
#[derive(Debug, Clone, Default)]
pub struct OutcomeTree {
    chapters: Vec<ChapterNode>,
    /// outcome id → owning chapter id
    owners: HashMap<String, String>,
    next_row: u64,
}

impl OutcomeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chapters(&self) -> &[ChapterNode] {
        &self.chapters
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&ChapterNode> {
        self.chapters.iter().find(|c| c.chapter.id == chapter_id)
    }

    fn chapter_mut(&mut self, chapter_id: &str) -> Option<&mut ChapterNode> {
        self.chapters.iter_mut().find(|c| c.chapter.id == chapter_id)
    }

    pub fn contains_outcome(&self, outcome_id: &str) -> bool {
        self.owners.contains_key(outcome_id)
    }

    /// Id of the chapter owning `outcome_id`.
    pub fn owner_of(&self, outcome_id: &str) -> Option<&str> {
        self.owners.get(outcome_id).map(String::as_str)
    }

    pub fn outcome(&self, outcome_id: &str) -> Option<&LearningOutcome> {
        let chapter_id = self.owners.get(outcome_id)?;
        self.chapter(chapter_id)?
            .outcomes
            .iter()
            .find(|o| o.id == outcome_id)
    }

    fn outcome_mut(&mut self, outcome_id: &str) -> Result<&mut LearningOutcome> {
        let chapter_id = self
            .owners
            .get(outcome_id)
            .cloned()
            .ok_or_else(|| AssessmentError::OutcomeNotFound(outcome_id.to_string()))?;
        self.chapter_mut(&chapter_id)
            .and_then(|c| c.outcomes.iter_mut().find(|o| o.id == outcome_id))
            .ok_or_else(|| AssessmentError::OutcomeNotFound(outcome_id.to_string()))
    }

    /// Add a chapter with its outcomes. An existing chapter with the same id
    /// has its outcomes replaced.
    pub fn add_chapter(&mut self, chapter: Chapter, outcomes: Vec<LearningOutcome>) -> Result<()> {
        let mut seen = HashSet::new();
        for outcome in &outcomes {
            let taken_elsewhere = self
                .owners
                .get(&outcome.id)
                .is_some_and(|owner| owner != &chapter.id);
            if taken_elsewhere || !seen.insert(outcome.id.as_str()) {
                return Err(AssessmentError::DuplicateOutcome(outcome.id.clone()));
            }
            check_incoming(outcome)?;
        }

        if let Some(existing) = self.chapter(&chapter.id) {
            let stale: Vec<String> = existing.outcomes.iter().map(|o| o.id.clone()).collect();
            for id in stale {
                self.owners.remove(&id);
            }
        }
        for outcome in &outcomes {
            self.owners.insert(outcome.id.clone(), chapter.id.clone());
        }

        debug!(chapter = %chapter.id, outcomes = outcomes.len(), "chapter added");
        match self.chapter_mut(&chapter.id) {
            Some(node) => {
                node.chapter = chapter;
                node.outcomes = outcomes;
            }
            None => self.chapters.push(ChapterNode { chapter, outcomes }),
        }
        Ok(())
    }

    /// Drop a chapter and everything under it (chapter deselection).
    pub fn remove_chapter(&mut self, chapter_id: &str) -> Result<ChapterNode> {
        let index = self
            .chapters
            .iter()
            .position(|c| c.chapter.id == chapter_id)
            .ok_or_else(|| AssessmentError::ChapterNotFound(chapter_id.to_string()))?;
        let node = self.chapters.remove(index);
        for outcome in &node.outcomes {
            self.owners.remove(&outcome.id);
        }
        debug!(chapter = %chapter_id, "chapter removed");
        Ok(node)
    }

    /// Append an outcome to a chapter. Outcome ids are unique tree-wide, and
    /// any rows it already carries must fit its own ceilings.
    pub fn add_outcome(&mut self, chapter_id: &str, outcome: LearningOutcome) -> Result<()> {
        check_incoming(&outcome)?;
        self.insert_outcome(chapter_id, outcome)
    }

    /// Append an outcome without checking its rows against its ceilings.
    /// Imports keep the source's rows as they are.
    pub(crate) fn insert_outcome(
        &mut self,
        chapter_id: &str,
        outcome: LearningOutcome,
    ) -> Result<()> {
        if self.owners.contains_key(&outcome.id) {
            return Err(AssessmentError::DuplicateOutcome(outcome.id));
        }
        let node = self
            .chapter_mut(chapter_id)
            .ok_or_else(|| AssessmentError::ChapterNotFound(chapter_id.to_string()))?;
        let outcome_id = outcome.id.clone();
        node.outcomes.push(outcome);
        self.owners.insert(outcome_id.clone(), chapter_id.to_string());
        debug!(chapter = %chapter_id, outcome = %outcome_id, "outcome added");
        Ok(())
    }

    /// Add a blank row (`1 × 1` mark) to an outcome.
    pub fn add_row(&mut self, outcome_id: &str) -> Result<String> {
        self.add_row_with(outcome_id, RowDraft::default())
    }

    /// Add a fully specified row, subject to the outcome's ceilings.
    pub fn add_row_with(&mut self, outcome_id: &str, draft: RowDraft) -> Result<String> {
        let row_id = self.fresh_row_id(outcome_id)?;
        let outcome = self.outcome_mut(outcome_id)?;
        let figures = RowFigures {
            no_of_items: draft.no_of_items,
            marks_per_item: draft.marks_per_item,
        };
        let totals = budget::check_row_mutation(outcome, RowTarget::New, figures)
            .inspect_err(|v| warn!(outcome = %outcome_id, "row add rejected: {v}"))?;

        let item_sub_type = match draft.item_type {
            Some(ItemType::Others) => draft.item_sub_type,
            _ => None,
        };
        outcome.config_rows.push(ItemConfigurationRow {
            id: row_id.clone(),
            blooms_level: draft.blooms_level,
            item_type: draft.item_type,
            item_sub_type,
            difficulty: draft.difficulty,
            no_of_items: draft.no_of_items,
            marks_per_item: draft.marks_per_item,
        });
        debug!(
            outcome = %outcome_id,
            row = %row_id,
            items = totals.items,
            marks = totals.marks,
            "row added"
        );
        Ok(row_id)
    }

    /// Apply a single-field edit to a row.
    ///
    /// Numeric edits are budget-checked; taxonomy edits are not. Moving the
    /// item type away from `Others` clears the sub-type.
    pub fn update_row(&mut self, outcome_id: &str, row_id: &str, update: RowUpdate) -> Result<()> {
        let outcome = self.outcome_mut(outcome_id)?;
        let current = outcome
            .row(row_id)
            .map(RowFigures::from)
            .ok_or_else(|| AssessmentError::RowNotFound {
                outcome_id: outcome_id.to_string(),
                row_id: row_id.to_string(),
            })?;

        let proposed = match update {
            RowUpdate::NoOfItems(n) => Some(RowFigures {
                no_of_items: n,
                ..current
            }),
            RowUpdate::MarksPerItem(m) => Some(RowFigures {
                marks_per_item: m,
                ..current
            }),
            _ => None,
        };
        if let Some(proposed) = proposed {
            budget::check_row_mutation(outcome, RowTarget::Existing(row_id), proposed).inspect_err(
                |v| warn!(outcome = %outcome_id, row = %row_id, "row edit rejected: {v}"),
            )?;
        }

        let Some(row) = outcome.config_rows.iter_mut().find(|r| r.id == row_id) else {
            return Err(AssessmentError::RowNotFound {
                outcome_id: outcome_id.to_string(),
                row_id: row_id.to_string(),
            });
        };
        match update {
            RowUpdate::BloomsLevel(level) => row.blooms_level = level,
            RowUpdate::ItemType(item_type) => {
                if item_type != Some(ItemType::Others) {
                    row.item_sub_type = None;
                }
                row.item_type = item_type;
            }
            RowUpdate::ItemSubType(sub_type) => row.item_sub_type = sub_type,
            RowUpdate::Difficulty(difficulty) => row.difficulty = difficulty,
            RowUpdate::NoOfItems(n) => row.no_of_items = n,
            RowUpdate::MarksPerItem(m) => row.marks_per_item = m,
        }
        debug!(outcome = %outcome_id, row = %row_id, "row updated");
        Ok(())
    }

    /// Remove a row. Removal can only shrink totals, so it is never checked.
    pub fn remove_row(&mut self, outcome_id: &str, row_id: &str) -> Result<ItemConfigurationRow> {
        let outcome = self.outcome_mut(outcome_id)?;
        let index = outcome
            .config_rows
            .iter()
            .position(|r| r.id == row_id)
            .ok_or_else(|| AssessmentError::RowNotFound {
                outcome_id: outcome_id.to_string(),
                row_id: row_id.to_string(),
            })?;
        let row = outcome.config_rows.remove(index);
        debug!(outcome = %outcome_id, row = %row_id, "row removed");
        Ok(row)
    }

    /// Toggle whether an outcome takes part in generation. Rows are kept.
    pub fn set_outcome_selected(&mut self, outcome_id: &str, selected: bool) -> Result<()> {
        self.outcome_mut(outcome_id)?.selected = selected;
        Ok(())
    }

    /// Change a ceiling. Going below the committed total is allowed; the
    /// existing rows stay, but later adds and edits must fit the new ceiling.
    pub fn set_limits(&mut self, outcome_id: &str, field: LimitField, value: u32) -> Result<()> {
        let outcome = self.outcome_mut(outcome_id)?;
        match field {
            LimitField::MaxItems => outcome.max_items = value,
            LimitField::MaxMarks => outcome.max_marks = value,
        }
        if !budget::within_limits(outcome) {
            warn!(
                outcome = %outcome_id,
                ?field,
                value,
                "ceiling lowered below committed total; further additions are blocked"
            );
        }
        Ok(())
    }

    pub fn outcome_totals(&self, outcome_id: &str) -> Option<BudgetTotals> {
        self.outcome(outcome_id).map(budget::outcome_totals)
    }

    /// Rows of every selected outcome, in chapter then outcome order.
    pub fn committed_rows(&self) -> Vec<AnnotatedRow> {
        self.chapters
            .iter()
            .flat_map(|c| c.outcomes.iter())
            .filter(|o| o.selected)
            .flat_map(|o| {
                o.config_rows.iter().map(move |row| AnnotatedRow {
                    elo_id: o.id.clone(),
                    elo_title: o.title.clone(),
                    row: row.clone(),
                })
            })
            .collect()
    }

    /// Selected outcomes across all chapters, in order.
    pub fn selected_outcomes(&self) -> impl Iterator<Item = &LearningOutcome> {
        self.chapters
            .iter()
            .flat_map(|c| c.outcomes.iter())
            .filter(|o| o.selected)
    }

    fn fresh_row_id(&mut self, outcome_id: &str) -> Result<String> {
        let taken: HashSet<String> = self
            .outcome(outcome_id)
            .ok_or_else(|| AssessmentError::OutcomeNotFound(outcome_id.to_string()))?
            .config_rows
            .iter()
            .map(|r| r.id.clone())
            .collect();
        loop {
            self.next_row += 1;
            let candidate = format!("{outcome_id}-row-{}", self.next_row);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

/// Reject an incoming outcome whose rows repeat an id or break its ceilings.
fn check_incoming(outcome: &LearningOutcome) -> Result<()> {
    let mut seen = HashSet::new();
    for row in &outcome.config_rows {
        if !seen.insert(row.id.as_str()) {
            return Err(AssessmentError::DuplicateRow {
                outcome_id: outcome.id.clone(),
                row_id: row.id.clone(),
            });
        }
    }
    budget::check_outcome(outcome)?;
    Ok(())
}
