//! Budget policy: the single place where item and mark aggregates are computed.
//!
//! Every mutating tree operation asks [`check_row_mutation`] before committing.

use serde::{Deserialize, Serialize};

use crate::error::{BudgetKind, BudgetViolation};
use crate::model::{ItemConfigurationRow, LearningOutcome};
use crate::tree::ChapterNode;

/// Item count and mark sum of some node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub items: u64,
    pub marks: u64,
}

impl BudgetTotals {
    fn add_row(&mut self, no_of_items: u32, marks_per_item: u32) {
        self.items += u64::from(no_of_items);
        self.marks += u64::from(no_of_items) * u64::from(marks_per_item);
    }
}

impl std::ops::Add for BudgetTotals {
    type Output = BudgetTotals;

    fn add(self, rhs: BudgetTotals) -> BudgetTotals {
        BudgetTotals {
            items: self.items + rhs.items,
            marks: self.marks + rhs.marks,
        }
    }
}

impl std::iter::Sum for BudgetTotals {
    fn sum<I: Iterator<Item = BudgetTotals>>(iter: I) -> Self {
        iter.fold(BudgetTotals::default(), |acc, t| acc + t)
    }
}

/// The numeric part of a row that the budget cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFigures {
    pub no_of_items: u32,
    pub marks_per_item: u32,
}

impl RowFigures {
    /// Figures of a freshly added row.
    pub const NEW_ROW: RowFigures = RowFigures {
        no_of_items: 1,
        marks_per_item: 1,
    };
}

impl From<&ItemConfigurationRow> for RowFigures {
    fn from(row: &ItemConfigurationRow) -> Self {
        Self {
            no_of_items: row.no_of_items,
            marks_per_item: row.marks_per_item,
        }
    }
}

/// Which row a proposed mutation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget<'a> {
    Existing(&'a str),
    New,
}

/// Sum of items and marks over an outcome's committed rows.
pub fn outcome_totals(outcome: &LearningOutcome) -> BudgetTotals {
    let mut totals = BudgetTotals::default();
    for row in &outcome.config_rows {
        totals.add_row(row.no_of_items, row.marks_per_item);
    }
    totals
}

/// Check whether `target` taking `proposed` keeps the outcome within both ceilings.
///
/// Items are checked before marks. Returns the totals the outcome would have
/// on success. Never mutates anything.
pub fn check_row_mutation(
    outcome: &LearningOutcome,
    target: RowTarget<'_>,
    proposed: RowFigures,
) -> Result<BudgetTotals, BudgetViolation> {
    let mut totals = BudgetTotals::default();
    for row in &outcome.config_rows {
        if matches!(target, RowTarget::Existing(id) if id == row.id) {
            continue;
        }
        totals.add_row(row.no_of_items, row.marks_per_item);
    }
    totals.add_row(proposed.no_of_items, proposed.marks_per_item);

    if totals.items > u64::from(outcome.max_items) {
        return Err(BudgetViolation {
            kind: BudgetKind::Items,
            limit: outcome.max_items,
            attempted: totals.items,
        });
    }
    if totals.marks > u64::from(outcome.max_marks) {
        return Err(BudgetViolation {
            kind: BudgetKind::Marks,
            limit: outcome.max_marks,
            attempted: totals.marks,
        });
    }
    Ok(totals)
}

/// Check an outcome's existing rows against its own ceilings, items first.
///
/// Used when a whole outcome enters the tree with rows already attached.
pub fn check_outcome(outcome: &LearningOutcome) -> Result<BudgetTotals, BudgetViolation> {
    let totals = outcome_totals(outcome);
    if totals.items > u64::from(outcome.max_items) {
        return Err(BudgetViolation {
            kind: BudgetKind::Items,
            limit: outcome.max_items,
            attempted: totals.items,
        });
    }
    if totals.marks > u64::from(outcome.max_marks) {
        return Err(BudgetViolation {
            kind: BudgetKind::Marks,
            limit: outcome.max_marks,
            attempted: totals.marks,
        });
    }
    Ok(totals)
}

/// Whether the committed rows currently sit within both ceilings.
///
/// Can be false after a ceiling was lowered below the committed total.
pub fn within_limits(outcome: &LearningOutcome) -> bool {
    let totals = outcome_totals(outcome);
    totals.items <= u64::from(outcome.max_items) && totals.marks <= u64::from(outcome.max_marks)
}

/// Aggregates for one chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterTotals {
    /// Committed totals over every outcome in the chapter.
    pub all: BudgetTotals,
    /// Committed totals over selected outcomes only.
    pub selected: BudgetTotals,
    /// Sum of the selected outcomes' ceilings.
    pub selected_ceiling: BudgetTotals,
}

pub fn chapter_totals(chapter: &ChapterNode) -> ChapterTotals {
    let mut totals = ChapterTotals::default();
    for outcome in &chapter.outcomes {
        let committed = outcome_totals(outcome);
        totals.all = totals.all + committed;
        if outcome.selected {
            totals.selected = totals.selected + committed;
            totals.selected_ceiling = totals.selected_ceiling
                + BudgetTotals {
                    items: u64::from(outcome.max_items),
                    marks: u64::from(outcome.max_marks),
                };
        }
    }
    totals
}

/// Aggregates over every chapter of a tree.
pub fn tree_totals<'a>(chapters: impl IntoIterator<Item = &'a ChapterNode>) -> ChapterTotals {
    chapters
        .into_iter()
        .map(chapter_totals)
        .fold(ChapterTotals::default(), |acc, t| ChapterTotals {
            all: acc.all + t.all,
            selected: acc.selected + t.selected,
            selected_ceiling: acc.selected_ceiling + t.selected_ceiling,
        })
}
