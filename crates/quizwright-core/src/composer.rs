//! Arranging selected items into numbered sections.
//!
//! Question numbers and section totals are never stored: they are derived
//! from the current section and question arrays on every call.

use tracing::debug;

use crate::document::{AssessmentDocument, AssessmentHeader};
use crate::error::{AssessmentError, Result};
use crate::model::{
    GeneratedItem, NumberingPolicy, NumberingStyle, QuestionCard, Section, SubQuestion,
};

const ROMAN: [&str; 10] = ["i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x"];

/// Number of question `question_index` in section `section_index`.
///
/// `section_lengths` lists the question count of every section in order.
/// Returns `None` when either index is out of range.
pub fn question_number(
    policy: NumberingPolicy,
    section_lengths: &[usize],
    section_index: usize,
    question_index: usize,
) -> Option<usize> {
    let len = *section_lengths.get(section_index)?;
    if question_index >= len {
        return None;
    }
    match policy {
        NumberingPolicy::Continuous => {
            let before: usize = section_lengths[..section_index].iter().sum();
            Some(1 + question_index + before)
        }
        NumberingPolicy::ResetPerSection => Some(1 + question_index),
    }
}

/// Label shown before a sub-question at position `index`.
///
/// Alpha labels are plain character arithmetic from `a`: past the 26th
/// entry they run into `{`, `|`, `}` and so on.
pub fn sub_question_label(sub: &SubQuestion, index: usize) -> String {
    let numeric = || format!("{}.", index + 1);
    match sub.numbering_style {
        NumberingStyle::Numeric => numeric(),
        NumberingStyle::Alpha => u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(97))
            .and_then(char::from_u32)
            .map(|c| format!("{c}."))
            .unwrap_or_else(numeric),
        NumberingStyle::Roman => ROMAN
            .get(index)
            .map(|r| format!("{r}."))
            .unwrap_or_else(numeric),
        NumberingStyle::Custom => match sub.custom_label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => numeric(),
        },
    }
}

/// Fields for a new sub-question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuestionDraft {
    pub text: String,
    pub marks: u32,
    pub numbering_style: NumberingStyle,
    pub custom_label: Option<String>,
}

impl SubQuestionDraft {
    pub fn new(text: impl Into<String>, marks: u32) -> Self {
        Self {
            text: text.into(),
            marks,
            numbering_style: NumberingStyle::Numeric,
            custom_label: None,
        }
    }

    pub fn styled(mut self, style: NumberingStyle) -> Self {
        self.numbering_style = style;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubQuestionUpdate {
    Text(String),
    Marks(u32),
    NumberingStyle(NumberingStyle),
    CustomLabel(Option<String>),
}

/// Builds the sectioned document model for one assessment.
#[derive(Debug, Clone, Default)]
pub struct AssessmentComposer {
    sections: Vec<Section>,
    policy: NumberingPolicy,
    next_id: u64,
}

impl AssessmentComposer {
    pub fn new(policy: NumberingPolicy) -> Self {
        Self {
            sections: Vec::new(),
            policy,
            next_id: 0,
        }
    }

    /// Start from an existing section list.
    pub fn from_sections(sections: Vec<Section>, policy: NumberingPolicy) -> Self {
        Self {
            sections,
            policy,
            next_id: 0,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn numbering_policy(&self) -> NumberingPolicy {
        self.policy
    }

    pub fn set_numbering_policy(&mut self, policy: NumberingPolicy) {
        self.policy = policy;
    }

    pub fn add_section(&mut self, title: impl Into<String>) -> String {
        let id = self.fresh_id("section");
        self.sections.push(Section {
            id: id.clone(),
            title: title.into(),
            questions: Vec::new(),
        });
        debug!(section = %id, "section added");
        id
    }

    pub fn rename_section(&mut self, section_id: &str, title: impl Into<String>) -> Result<()> {
        self.section_mut(section_id)?.title = title.into();
        Ok(())
    }

    pub fn remove_section(&mut self, section_id: &str) -> Result<Section> {
        let index = self
            .sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or_else(|| AssessmentError::SectionNotFound(section_id.to_string()))?;
        Ok(self.sections.remove(index))
    }

    pub fn add_question_to_section(
        &mut self,
        section_id: &str,
        question_text: impl Into<String>,
        marks: u32,
    ) -> Result<String> {
        self.push_question(section_id, question_text.into(), marks, None)
    }

    /// Add a question card built from a generated item, keeping the item.
    pub fn add_item_to_section(&mut self, section_id: &str, item: &GeneratedItem) -> Result<String> {
        self.push_question(
            section_id,
            item.question.clone(),
            item.marks,
            Some(item.clone()),
        )
    }

    pub fn remove_question(&mut self, section_id: &str, question_id: &str) -> Result<QuestionCard> {
        let section = self.section_mut(section_id)?;
        let index = section
            .position_of(question_id)
            .ok_or_else(|| AssessmentError::QuestionNotFound {
                section_id: section_id.to_string(),
                question_id: question_id.to_string(),
            })?;
        Ok(section.questions.remove(index))
    }

    /// Move one question onto another's position within the same section.
    ///
    /// If either id is not in `section_id` the move is refused and nothing
    /// changes.
    pub fn move_question(&mut self, section_id: &str, from_id: &str, to_id: &str) -> Result<()> {
        let section = self.section_mut(section_id)?;
        let (Some(from), Some(to)) = (section.position_of(from_id), section.position_of(to_id))
        else {
            return Err(AssessmentError::CrossSectionMove {
                section_id: section_id.to_string(),
                from_id: from_id.to_string(),
                to_id: to_id.to_string(),
            });
        };
        if from != to {
            let card = section.questions.remove(from);
            section.questions.insert(to, card);
            debug!(section = %section_id, from, to, "question moved");
        }
        Ok(())
    }

    pub fn add_sub_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        draft: SubQuestionDraft,
    ) -> Result<String> {
        let id = self.fresh_id("sub");
        let question = self.question_mut(section_id, question_id)?;
        question.sub_questions.push(SubQuestion {
            id: id.clone(),
            text: draft.text,
            marks: draft.marks,
            numbering_style: draft.numbering_style,
            custom_label: draft.custom_label,
        });
        Ok(id)
    }

    pub fn update_sub_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        sub_question_id: &str,
        update: SubQuestionUpdate,
    ) -> Result<()> {
        let question = self.question_mut(section_id, question_id)?;
        let sub = question
            .sub_questions
            .iter_mut()
            .find(|s| s.id == sub_question_id)
            .ok_or_else(|| AssessmentError::SubQuestionNotFound {
                question_id: question_id.to_string(),
                sub_question_id: sub_question_id.to_string(),
            })?;
        match update {
            SubQuestionUpdate::Text(text) => sub.text = text,
            SubQuestionUpdate::Marks(marks) => sub.marks = marks,
            SubQuestionUpdate::NumberingStyle(style) => sub.numbering_style = style,
            SubQuestionUpdate::CustomLabel(label) => sub.custom_label = label,
        }
        Ok(())
    }

    pub fn remove_sub_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        sub_question_id: &str,
    ) -> Result<SubQuestion> {
        let question = self.question_mut(section_id, question_id)?;
        let index = question
            .sub_questions
            .iter()
            .position(|s| s.id == sub_question_id)
            .ok_or_else(|| AssessmentError::SubQuestionNotFound {
                question_id: question_id.to_string(),
                sub_question_id: sub_question_id.to_string(),
            })?;
        Ok(question.sub_questions.remove(index))
    }

    /// Displayed number of a question under the current policy.
    pub fn question_number(&self, section_index: usize, question_index: usize) -> Option<usize> {
        question_number(
            self.policy,
            &self.section_lengths(),
            section_index,
            question_index,
        )
    }

    /// Displayed number of a question looked up by id.
    pub fn number_of(&self, question_id: &str) -> Option<usize> {
        self.sections.iter().enumerate().find_map(|(s, section)| {
            section
                .position_of(question_id)
                .and_then(|q| self.question_number(s, q))
        })
    }

    pub fn section_total(&self, section_id: &str) -> Option<u64> {
        self.section(section_id).map(Section::total_marks)
    }

    pub fn total_marks(&self) -> u64 {
        self.sections.iter().map(Section::total_marks).sum()
    }

    /// Snapshot the composition for an export collaborator.
    pub fn to_document(&self, header: AssessmentHeader) -> AssessmentDocument {
        AssessmentDocument::new(header, self.policy, self.sections.clone())
    }

    fn section_lengths(&self) -> Vec<usize> {
        self.sections.iter().map(|s| s.questions.len()).collect()
    }

    fn push_question(
        &mut self,
        section_id: &str,
        question_text: String,
        marks: u32,
        original_item: Option<GeneratedItem>,
    ) -> Result<String> {
        if self.section(section_id).is_none() {
            return Err(AssessmentError::SectionNotFound(section_id.to_string()));
        }
        let id = self.fresh_id("q");
        self.section_mut(section_id)?.questions.push(QuestionCard {
            id: id.clone(),
            question_text,
            marks,
            sub_questions: Vec::new(),
            original_item,
        });
        Ok(id)
    }

    fn section_mut(&mut self, section_id: &str) -> Result<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or_else(|| AssessmentError::SectionNotFound(section_id.to_string()))
    }

    fn question_mut(&mut self, section_id: &str, question_id: &str) -> Result<&mut QuestionCard> {
        self.section_mut(section_id)?
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AssessmentError::QuestionNotFound {
                section_id: section_id.to_string(),
                question_id: question_id.to_string(),
            })
    }

    /// Ids are `<prefix>-<n>`, skipping any already present in loaded sections.
    fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_id += 1;
            let candidate = format!("{prefix}-{}", self.next_id);
            if !self.id_in_use(&candidate) {
                return candidate;
            }
        }
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.sections.iter().any(|s| {
            s.id == id
                || s.questions
                    .iter()
                    .any(|q| q.id == id || q.sub_questions.iter().any(|sq| sq.id == id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, marks: u32) -> QuestionCard {
        QuestionCard {
            id: id.into(),
            question_text: format!("Question {id}"),
            marks,
            sub_questions: Vec::new(),
            original_item: None,
        }
    }

    fn section(id: &str, question_ids: &[&str]) -> Section {
        Section {
            id: id.into(),
            title: id.to_uppercase(),
            questions: question_ids.iter().map(|q| card(q, 1)).collect(),
        }
    }

    fn sub(style: NumberingStyle, custom_label: Option<&str>) -> SubQuestion {
        SubQuestion {
            id: "sq".into(),
            text: String::new(),
            marks: 0,
            numbering_style: style,
            custom_label: custom_label.map(str::to_string),
        }
    }

    #[test]
    fn numbering_policies() {
        let lengths = [3, 2, 4];
        assert_eq!(
            question_number(NumberingPolicy::Continuous, &lengths, 1, 1),
            Some(5)
        );
        assert_eq!(
            question_number(NumberingPolicy::Continuous, &lengths, 2, 1),
            Some(7)
        );
        assert_eq!(
            question_number(NumberingPolicy::ResetPerSection, &lengths, 2, 1),
            Some(2)
        );
        assert_eq!(question_number(NumberingPolicy::Continuous, &lengths, 0, 3), None);
        assert_eq!(question_number(NumberingPolicy::Continuous, &lengths, 3, 0), None);
    }

    #[test]
    fn numbers_follow_reordering() {
        let mut composer = AssessmentComposer::from_sections(
            vec![section("s1", &["q1", "q2"]), section("s2", &["q3", "q4", "q5"])],
            NumberingPolicy::Continuous,
        );
        assert_eq!(composer.number_of("q5"), Some(5));
        composer.move_question("s2", "q5", "q3").unwrap();
        assert_eq!(composer.number_of("q5"), Some(3));
        assert_eq!(composer.number_of("q3"), Some(4));

        composer.set_numbering_policy(NumberingPolicy::ResetPerSection);
        assert_eq!(composer.number_of("q5"), Some(1));
        assert_eq!(composer.number_of("missing"), None);
    }

    #[test]
    fn cross_section_move_rejected() {
        let sections = vec![
            section("s1", &["q1", "q2"]),
            section("s2", &[]),
            section("s3", &["q3", "q5", "q4"]),
        ];
        let mut composer =
            AssessmentComposer::from_sections(sections.clone(), NumberingPolicy::Continuous);

        let err = composer.move_question("s1", "q5", "q1").unwrap_err();
        assert!(matches!(err, AssessmentError::CrossSectionMove { .. }));
        let err = composer.move_question("s3", "q5", "q1").unwrap_err();
        assert!(matches!(err, AssessmentError::CrossSectionMove { .. }));
        assert_eq!(composer.sections(), sections.as_slice());
    }

    #[test]
    fn move_is_a_stable_array_move() {
        let mut composer = AssessmentComposer::from_sections(
            vec![section("s1", &["a", "b", "c", "d"])],
            NumberingPolicy::Continuous,
        );
        composer.move_question("s1", "a", "c").unwrap();
        let order: Vec<&str> = composer.sections()[0]
            .questions
            .iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a", "d"]);

        composer.move_question("s1", "d", "b").unwrap();
        let order: Vec<&str> = composer.sections()[0]
            .questions
            .iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn sub_question_labels() {
        assert_eq!(sub_question_label(&sub(NumberingStyle::Numeric, None), 0), "1.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Alpha, None), 2), "c.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Alpha, None), 25), "z.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Roman, None), 3), "iv.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Roman, None), 9), "x.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Roman, None), 10), "11.");
        assert_eq!(
            sub_question_label(&sub(NumberingStyle::Custom, Some("(P)")), 0),
            "(P)"
        );
        assert_eq!(sub_question_label(&sub(NumberingStyle::Custom, Some("")), 1), "2.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Custom, None), 4), "5.");
    }

    #[test]
    fn alpha_past_twenty_six_is_raw_character_arithmetic() {
        assert_eq!(sub_question_label(&sub(NumberingStyle::Alpha, None), 26), "{.");
        assert_eq!(sub_question_label(&sub(NumberingStyle::Alpha, None), 27), "|.");
    }

    #[test]
    fn section_totals_track_every_mutation() {
        let mut composer = AssessmentComposer::new(NumberingPolicy::Continuous);
        let s1 = composer.add_section("Section A");
        let q1 = composer.add_question_to_section(&s1, "State Newton's first law.", 2).unwrap();
        let sq = composer
            .add_sub_question(&s1, &q1, SubQuestionDraft::new("Give an example.", 1))
            .unwrap();
        assert_eq!(composer.section_total(&s1), Some(3));

        composer
            .update_sub_question(&s1, &q1, &sq, SubQuestionUpdate::Marks(4))
            .unwrap();
        assert_eq!(composer.section_total(&s1), Some(6));

        composer.remove_sub_question(&s1, &q1, &sq).unwrap();
        assert_eq!(composer.total_marks(), 2);

        composer.remove_question(&s1, &q1).unwrap();
        assert_eq!(composer.total_marks(), 0);
    }

    #[test]
    fn item_cards_keep_their_source() {
        let mut composer = AssessmentComposer::new(NumberingPolicy::ResetPerSection);
        let s1 = composer.add_section("Objective");
        let item = GeneratedItem {
            id: "gen1-item-1".into(),
            question: "Which planet is largest?".into(),
            item_type: None,
            blooms_level: None,
            difficulty: None,
            marks: 1,
            elo_id: "e1".into(),
            elo_title: "Solar system".into(),
            is_selected: true,
            options: None,
            correct_answer: None,
            has_image: false,
            image_url: None,
        };
        let q = composer.add_item_to_section(&s1, &item).unwrap();
        let card = &composer.section(&s1).unwrap().questions[0];
        assert_eq!(card.id, q);
        assert_eq!(card.question_text, item.question);
        assert_eq!(card.original_item.as_ref(), Some(&item));
    }

    #[test]
    fn generated_ids_skip_loaded_ones() {
        let mut composer = AssessmentComposer::from_sections(
            vec![section("section-1", &["q-3"])],
            NumberingPolicy::Continuous,
        );
        let s = composer.add_section("Next");
        assert_eq!(s, "section-2");
        let q = composer.add_question_to_section(&s, "Text", 1).unwrap();
        assert_eq!(q, "q-4");
    }

    #[test]
    fn rename_and_remove_sections() {
        let mut composer = AssessmentComposer::new(NumberingPolicy::Continuous);
        let s = composer.add_section("Draft");
        composer.rename_section(&s, "Section B").unwrap();
        assert_eq!(composer.section(&s).unwrap().title, "Section B");
        composer.remove_section(&s).unwrap();
        assert!(matches!(
            composer.rename_section(&s, "x"),
            Err(AssessmentError::SectionNotFound(_))
        ));
        assert!(composer
            .add_question_to_section(&s, "orphan", 1)
            .is_err());
    }

    #[test]
    fn update_sub_question_style() {
        let mut composer = AssessmentComposer::new(NumberingPolicy::Continuous);
        let s = composer.add_section("A");
        let q = composer.add_question_to_section(&s, "Q", 0).unwrap();
        let sq = composer
            .add_sub_question(&s, &q, SubQuestionDraft::new("part", 1).styled(NumberingStyle::Roman))
            .unwrap();
        composer
            .update_sub_question(&s, &q, &sq, SubQuestionUpdate::NumberingStyle(NumberingStyle::Custom))
            .unwrap();
        composer
            .update_sub_question(&s, &q, &sq, SubQuestionUpdate::CustomLabel(Some("(A)".into())))
            .unwrap();
        let sub = &composer.section(&s).unwrap().questions[0].sub_questions[0];
        assert_eq!(sub_question_label(sub, 0), "(A)");
        assert!(composer
            .update_sub_question(&s, &q, "nope", SubQuestionUpdate::Marks(1))
            .is_err());
    }
}
