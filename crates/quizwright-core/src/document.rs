//! The finished assessment handed to export collaborators, with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::composer::{question_number, sub_question_label};
use crate::model::{NumberingPolicy, Section};

/// Header metadata supplied by the author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentHeader {
    pub title: String,
    #[serde(default)]
    pub general_instructions: String,
    /// Allotted time in minutes.
    #[serde(default)]
    pub total_time_minutes: Option<u32>,
}

/// A complete assessment ready for rendering to PDF/Word/QTI elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDocument {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub header: AssessmentHeader,
    /// Σ section totals. Recomputed on save and on load, never trusted from disk.
    pub total_marks: u64,
    pub main_numbering: NumberingPolicy,
    pub sections: Vec<Section>,
}

/// One line of the numbered outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub section_title: String,
    pub label: String,
    pub text: String,
    pub marks: u32,
}

impl AssessmentDocument {
    pub fn new(header: AssessmentHeader, main_numbering: NumberingPolicy, sections: Vec<Section>) -> Self {
        let total_marks = sections.iter().map(Section::total_marks).sum();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            header,
            total_marks,
            main_numbering,
            sections,
        }
    }

    /// Recompute the total from the sections, ignoring the stored field.
    pub fn live_total_marks(&self) -> u64 {
        self.sections.iter().map(Section::total_marks).sum()
    }

    /// Flatten the sections into numbered lines, sub-questions included.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let lengths: Vec<usize> = self.sections.iter().map(|s| s.questions.len()).collect();
        let mut entries = Vec::new();
        for (s, section) in self.sections.iter().enumerate() {
            for (q, question) in section.questions.iter().enumerate() {
                let number = question_number(self.main_numbering, &lengths, s, q).unwrap_or(q + 1);
                entries.push(OutlineEntry {
                    section_title: section.title.clone(),
                    label: format!("{number}."),
                    text: question.question_text.clone(),
                    marks: question.marks,
                });
                for (i, sub) in question.sub_questions.iter().enumerate() {
                    entries.push(OutlineEntry {
                        section_title: section.title.clone(),
                        label: format!("{number}.{}", sub_question_label(sub, i)),
                        text: sub.text.clone(),
                        marks: sub.marks,
                    });
                }
            }
        }
        entries
    }

    /// Save the document as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let mut document = self.clone();
        document.total_marks = self.live_total_marks();
        let json =
            serde_json::to_string_pretty(&document).context("failed to serialize assessment")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write assessment to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read assessment from {}", path.display()))?;
        let mut document: AssessmentDocument =
            serde_json::from_str(&content).context("failed to parse assessment JSON")?;
        document.total_marks = document.live_total_marks();
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{AssessmentComposer, SubQuestionDraft};
    use crate::model::NumberingStyle;

    fn composer() -> AssessmentComposer {
        let mut composer = AssessmentComposer::new(NumberingPolicy::Continuous);
        let a = composer.add_section("Section A");
        composer.add_question_to_section(&a, "Define speed.", 1).unwrap();
        let b = composer.add_section("Section B");
        let q = composer
            .add_question_to_section(&b, "A car travels 100 km.", 2)
            .unwrap();
        composer
            .add_sub_question(
                &b,
                &q,
                SubQuestionDraft::new("Find its speed.", 2).styled(NumberingStyle::Alpha),
            )
            .unwrap();
        composer
    }

    #[test]
    fn total_marks_matches_sections() {
        let doc = composer().to_document(AssessmentHeader {
            title: "Unit test".into(),
            general_instructions: "Answer all questions.".into(),
            total_time_minutes: Some(45),
        });
        assert_eq!(doc.total_marks, 5);
        assert_eq!(doc.live_total_marks(), doc.total_marks);
        assert_eq!(doc.main_numbering, NumberingPolicy::Continuous);
    }

    #[test]
    fn outline_numbers_questions_and_parts() {
        let doc = composer().to_document(AssessmentHeader::default());
        let labels: Vec<String> = doc.outline().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["1.", "2.", "2.a."]);
    }

    #[test]
    fn json_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("assessment.json");
        let doc = composer().to_document(AssessmentHeader {
            title: "Physics".into(),
            ..Default::default()
        });
        doc.save_json(&path).unwrap();

        let loaded = AssessmentDocument::load_json(&path).unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.header.title, "Physics");
        assert_eq!(loaded.sections, doc.sections);
        assert_eq!(loaded.total_marks, 5);
    }

    #[test]
    fn stale_total_in_file_is_recomputed_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessment.json");
        let doc = composer().to_document(AssessmentHeader::default());
        doc.save_json(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["total_marks"] = serde_json::json!(999);
        std::fs::write(&path, raw.to_string()).unwrap();

        let loaded = AssessmentDocument::load_json(&path).unwrap();
        assert_eq!(loaded.total_marks, 5);
    }

    #[test]
    fn edited_sections_are_totalled_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessment.json");
        let mut doc = composer().to_document(AssessmentHeader::default());
        doc.sections.truncate(1);
        doc.save_json(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["total_marks"], 1);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = AssessmentDocument::load_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read assessment"));
    }
}
