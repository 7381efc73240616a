//! Error types for outcome-tree and composition operations.
//!
//! Every error here is recoverable: a rejected operation leaves the tree or
//! composer exactly as it was before the call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which ceiling a rejected row mutation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Items,
    Marks,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetKind::Items => write!(f, "items"),
            BudgetKind::Marks => write!(f, "marks"),
        }
    }
}

/// A row mutation that would push an outcome past one of its ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} budget exceeded: attempted {attempted}, limit {limit}")]
pub struct BudgetViolation {
    pub kind: BudgetKind,
    pub limit: u32,
    pub attempted: u64,
}

/// Errors raised by the outcome tree, merger, selection set, and composer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssessmentError {
    /// A row add/edit would break the outcome's item or mark ceiling.
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetViolation),

    /// A merge was requested without a complete subject/chapter/outcome choice.
    #[error("invalid merge selection: missing {0}")]
    InvalidMergeSelection(&'static str),

    #[error("chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("outcome not found: {0}")]
    OutcomeNotFound(String),

    #[error("outcome id already in use: {0}")]
    DuplicateOutcome(String),

    #[error("row id {row_id} appears twice in outcome {outcome_id}")]
    DuplicateRow { outcome_id: String, row_id: String },

    #[error("row {row_id} not found in outcome {outcome_id}")]
    RowNotFound { outcome_id: String, row_id: String },

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("section not found: {0}")]
    SectionNotFound(String),

    #[error("question {question_id} not found in section {section_id}")]
    QuestionNotFound {
        section_id: String,
        question_id: String,
    },

    #[error("sub-question {sub_question_id} not found in question {question_id}")]
    SubQuestionNotFound {
        question_id: String,
        sub_question_id: String,
    },

    /// Reordering is only allowed between two questions of the same section.
    #[error("cannot move {from_id} to {to_id}: both must belong to section {section_id}")]
    CrossSectionMove {
        section_id: String,
        from_id: String,
        to_id: String,
    },

    #[error("invalid consolidation: {0}")]
    InvalidConsolidation(String),

    #[error("learning experience not found: {0}")]
    ExperienceNotFound(String),

    #[error("invalid value for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl AssessmentError {
    /// Returns the budget violation carried by this error, if any.
    pub fn budget_violation(&self) -> Option<&BudgetViolation> {
        match self {
            AssessmentError::BudgetExceeded(v) => Some(v),
            _ => None,
        }
    }
}

pub type Result<T, E = AssessmentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_violation_message() {
        let err: AssessmentError = BudgetViolation {
            kind: BudgetKind::Marks,
            limit: 8,
            attempted: 10,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "marks budget exceeded: attempted 10, limit 8"
        );
        assert_eq!(err.budget_violation().map(|v| v.limit), Some(8));
    }

    #[test]
    fn non_budget_errors_carry_no_violation() {
        let err = AssessmentError::InvalidMergeSelection("outcome");
        assert!(err.budget_violation().is_none());
        assert!(err.to_string().contains("missing outcome"));
    }
}
