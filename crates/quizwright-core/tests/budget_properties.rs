//! Property tests: no sequence of row edits can push an outcome past its ceilings.

use proptest::prelude::*;

use quizwright_core::budget::within_limits;
use quizwright_core::model::{Chapter, LearningOutcome};
use quizwright_core::tree::{OutcomeTree, RowDraft, RowUpdate};
use quizwright_core::AssessmentError;

#[derive(Debug, Clone)]
enum Op {
    Add { items: u32, marks: u32 },
    SetItems { row: usize, value: u32 },
    SetMarks { row: usize, value: u32 },
    Remove { row: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..6, 0u32..6).prop_map(|(items, marks)| Op::Add { items, marks }),
        (0usize..8, 0u32..8).prop_map(|(row, value)| Op::SetItems { row, value }),
        (0usize..8, 0u32..8).prop_map(|(row, value)| Op::SetMarks { row, value }),
        (0usize..8).prop_map(|row| Op::Remove { row }),
    ]
}

fn tree_with_limits(max_items: u32, max_marks: u32) -> OutcomeTree {
    let mut tree = OutcomeTree::new();
    tree.add_chapter(
        Chapter::new("ch", "Chapter"),
        vec![LearningOutcome::new("elo", "Outcome").with_limits(max_items, max_marks)],
    )
    .unwrap();
    tree
}

fn row_id(tree: &OutcomeTree, index: usize) -> Option<String> {
    let rows = &tree.outcome("elo").unwrap().config_rows;
    if rows.is_empty() {
        None
    } else {
        Some(rows[index % rows.len()].id.clone())
    }
}

proptest! {
    #[test]
    fn totals_never_exceed_ceilings(
        max_items in 0u32..12,
        max_marks in 0u32..24,
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut tree = tree_with_limits(max_items, max_marks);

        for op in ops {
            let before = tree.outcome("elo").unwrap().clone();
            let result = match op {
                Op::Add { items, marks } => tree
                    .add_row_with("elo", RowDraft::sized(items, marks))
                    .map(|_| ()),
                Op::SetItems { row, value } => match row_id(&tree, row) {
                    Some(id) => tree.update_row("elo", &id, RowUpdate::NoOfItems(value)),
                    None => Ok(()),
                },
                Op::SetMarks { row, value } => match row_id(&tree, row) {
                    Some(id) => tree.update_row("elo", &id, RowUpdate::MarksPerItem(value)),
                    None => Ok(()),
                },
                Op::Remove { row } => match row_id(&tree, row) {
                    Some(id) => tree.remove_row("elo", &id).map(|_| ()),
                    None => Ok(()),
                },
            };

            let after = tree.outcome("elo").unwrap();
            prop_assert!(within_limits(after));
            match result {
                Ok(()) => {}
                Err(AssessmentError::BudgetExceeded(_)) => prop_assert_eq!(after, &before),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn rejected_addition_reports_the_breached_ceiling(
        max_items in 1u32..10,
        extra in 1u32..5,
    ) {
        let mut tree = tree_with_limits(max_items, u32::MAX);
        let err = tree
            .add_row_with("elo", RowDraft::sized(max_items + extra, 1))
            .unwrap_err();
        let violation = err.budget_violation().cloned().unwrap();
        prop_assert_eq!(violation.limit, max_items);
        prop_assert_eq!(violation.attempted, u64::from(max_items + extra));
        prop_assert!(tree.outcome("elo").unwrap().config_rows.is_empty());
    }
}
