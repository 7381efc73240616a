//! Generated items and the author's selection over them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssessmentError, Result};
use crate::model::{BloomsLevel, GeneratedItem, ItemType};
use crate::tree::AnnotatedRow;

const STUB_OPTIONS: [&str; 4] = ["Option A", "Option B", "Option C", "Option D"];

/// Aggregates over the selected items. Derived on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTotals {
    pub count: usize,
    pub marks: u64,
    pub distinct_blooms_levels: BTreeSet<BloomsLevel>,
    pub distinct_item_types: BTreeSet<ItemType>,
}

/// The flat set of candidate items for the current configuration.
#[derive(Debug, Clone, Default)]
pub struct ItemSelectionSet {
    items: Vec<GeneratedItem>,
    pass: u32,
}

impl ItemSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every item with a fresh pass over `rows`.
    ///
    /// Each row yields `no_of_items` items worth `marks_per_item`. Prior
    /// items and their selection state are discarded.
    pub fn generate(&mut self, rows: &[AnnotatedRow]) -> &[GeneratedItem] {
        self.pass += 1;
        let pass = self.pass;
        let mut items = Vec::new();
        for annotated in rows {
            let row = &annotated.row;
            for n in 0..row.no_of_items {
                let seq = items.len() + 1;
                let is_mcq = row.item_type == Some(ItemType::MultipleChoice);
                items.push(GeneratedItem {
                    id: format!("gen{pass}-item-{seq}"),
                    question: stub_question(annotated, n + 1),
                    item_type: row.item_type,
                    blooms_level: row.blooms_level,
                    difficulty: row.difficulty,
                    marks: row.marks_per_item,
                    elo_id: annotated.elo_id.clone(),
                    elo_title: annotated.elo_title.clone(),
                    is_selected: true,
                    options: is_mcq.then(|| STUB_OPTIONS.iter().map(|o| o.to_string()).collect()),
                    correct_answer: is_mcq.then(|| STUB_OPTIONS[0].to_string()),
                    has_image: false,
                    image_url: None,
                });
            }
        }
        debug!(pass, items = items.len(), rows = rows.len(), "items generated");
        self.items = items;
        &self.items
    }

    pub fn items(&self) -> &[GeneratedItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&GeneratedItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn selected_items(&self) -> impl Iterator<Item = &GeneratedItem> {
        self.items.iter().filter(|i| i.is_selected)
    }

    /// Flip one item's selection, returning the new state.
    pub fn toggle_selection(&mut self, item_id: &str) -> Result<bool> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AssessmentError::ItemNotFound(item_id.to_string()))?;
        item.is_selected = !item.is_selected;
        Ok(item.is_selected)
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for item in &mut self.items {
            item.is_selected = selected;
        }
    }

    pub fn remove(&mut self, item_id: &str) -> Result<GeneratedItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| AssessmentError::ItemNotFound(item_id.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn selected_totals(&self) -> SelectionTotals {
        let mut totals = SelectionTotals::default();
        for item in self.selected_items() {
            totals.count += 1;
            totals.marks += u64::from(item.marks);
            totals.distinct_blooms_levels.extend(item.blooms_level);
            totals.distinct_item_types.extend(item.item_type);
        }
        totals
    }
}

fn stub_question(row: &AnnotatedRow, n: u32) -> String {
    let kind = row
        .row
        .effective_sub_type()
        .map(str::to_string)
        .or_else(|| row.row.item_type.map(|t| t.to_string()))
        .unwrap_or_else(|| "General".to_string());
    format!("{kind} question {n} on \"{}\"", row.elo_title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, ItemConfigurationRow};

    fn annotated(elo: &str, item_type: Option<ItemType>, items: u32, marks: u32) -> AnnotatedRow {
        AnnotatedRow {
            elo_id: elo.into(),
            elo_title: format!("Title of {elo}"),
            row: ItemConfigurationRow {
                id: format!("{elo}-row"),
                blooms_level: Some(BloomsLevel::Apply),
                item_type,
                item_sub_type: None,
                difficulty: Some(Difficulty::Easy),
                no_of_items: items,
                marks_per_item: marks,
            },
        }
    }

    #[test]
    fn one_item_per_unit_with_row_marks() {
        let mut set = ItemSelectionSet::new();
        let items = set.generate(&[
            annotated("e1", Some(ItemType::MultipleChoice), 2, 1),
            annotated("e2", Some(ItemType::ShortAnswer), 1, 3),
        ]);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].elo_id, "e1");
        assert_eq!(items[0].marks, 1);
        assert_eq!(items[0].options.as_ref().map(Vec::len), Some(4));
        assert_eq!(items[0].correct_answer.as_deref(), Some("Option A"));
        assert_eq!(items[2].elo_title, "Title of e2");
        assert_eq!(items[2].marks, 3);
        assert!(items[2].options.is_none());
        assert!(items[2].correct_answer.is_none());
        assert!(items.iter().all(|i| i.is_selected));
    }

    #[test]
    fn regeneration_replaces_everything() {
        let mut set = ItemSelectionSet::new();
        let first: Vec<String> = set
            .generate(&[annotated("e1", Some(ItemType::TrueFalse), 3, 1)])
            .iter()
            .map(|i| i.id.clone())
            .collect();
        set.toggle_selection(&first[0]).unwrap();

        let second = set.generate(&[annotated("e2", Some(ItemType::LongAnswer), 2, 5)]);
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|i| !first.contains(&i.id)));
        assert!(second.iter().all(|i| i.elo_id == "e2" && i.is_selected));
    }

    #[test]
    fn totals_follow_selection() {
        let mut set = ItemSelectionSet::new();
        set.generate(&[
            annotated("e1", Some(ItemType::MultipleChoice), 2, 1),
            annotated("e2", Some(ItemType::ShortAnswer), 1, 4),
        ]);
        let totals = set.selected_totals();
        assert_eq!(totals.count, 3);
        assert_eq!(totals.marks, 6);
        assert_eq!(totals.distinct_item_types.len(), 2);
        assert_eq!(totals.distinct_blooms_levels.len(), 1);

        let last = set.items()[2].id.clone();
        assert!(!set.toggle_selection(&last).unwrap());
        let totals = set.selected_totals();
        assert_eq!(totals.marks, 2);
        assert_eq!(
            totals.distinct_item_types.into_iter().collect::<Vec<_>>(),
            vec![ItemType::MultipleChoice]
        );

        set.set_all_selected(false);
        assert_eq!(set.selected_totals(), SelectionTotals::default());
    }

    #[test]
    fn remove_and_missing_items() {
        let mut set = ItemSelectionSet::new();
        set.generate(&[annotated("e1", None, 2, 2)]);
        let id = set.items()[0].id.clone();
        let removed = set.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(set.items().len(), 1);
        assert!(matches!(
            set.remove(&id),
            Err(AssessmentError::ItemNotFound(_))
        ));
        assert!(set.toggle_selection("ghost").is_err());
    }

    #[test]
    fn zero_item_rows_produce_nothing() {
        let mut set = ItemSelectionSet::new();
        assert!(set.generate(&[annotated("e1", None, 0, 5)]).is_empty());
    }
}
