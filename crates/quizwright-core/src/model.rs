//! Core data model types for quizwright.
//!
//! Chapters own learning outcomes, outcomes own item configuration rows, and
//! the composer arranges generated items into sections of question cards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default item ceiling for a freshly created outcome.
pub const DEFAULT_MAX_ITEMS: u32 = 10;
/// Default mark ceiling for a freshly created outcome.
pub const DEFAULT_MAX_MARKS: u32 = 20;

/// A curriculum unit. Supplied externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub name: String,
}

impl Chapter {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A gradeable learning objective (ELO) under a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningOutcome {
    /// Unique within the owning tree.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_max_items")]
    pub max_items: u32,
    #[serde(default = "default_max_marks")]
    pub max_marks: u32,
    #[serde(default)]
    pub config_rows: Vec<ItemConfigurationRow>,
    /// Ordered lesson steps, combined by name when outcomes are consolidated.
    #[serde(default)]
    pub learning_sequence: Vec<LessonStep>,
}

impl LearningOutcome {
    /// Create an unselected outcome with default ceilings and no rows.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            selected: false,
            max_items: DEFAULT_MAX_ITEMS,
            max_marks: DEFAULT_MAX_MARKS,
            config_rows: Vec::new(),
            learning_sequence: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_limits(mut self, max_items: u32, max_marks: u32) -> Self {
        self.max_items = max_items;
        self.max_marks = max_marks;
        self
    }

    pub fn row(&self, row_id: &str) -> Option<&ItemConfigurationRow> {
        self.config_rows.iter().find(|r| r.id == row_id)
    }
}

fn default_max_items() -> u32 {
    DEFAULT_MAX_ITEMS
}

fn default_max_marks() -> u32 {
    DEFAULT_MAX_MARKS
}

/// One named step of an outcome's learning sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonStep {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl LessonStep {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// "N items of this type/difficulty, each worth M marks" for one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemConfigurationRow {
    pub id: String,
    #[serde(default)]
    pub blooms_level: Option<BloomsLevel>,
    #[serde(default)]
    pub item_type: Option<ItemType>,
    /// Only meaningful when `item_type` is [`ItemType::Others`].
    #[serde(default)]
    pub item_sub_type: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    pub no_of_items: u32,
    pub marks_per_item: u32,
}

impl ItemConfigurationRow {
    /// Marks this row contributes to its outcome.
    pub fn total_marks(&self) -> u64 {
        u64::from(self.no_of_items) * u64::from(self.marks_per_item)
    }

    /// The sub-type, but only when the item type actually uses one.
    pub fn effective_sub_type(&self) -> Option<&str> {
        match self.item_type {
            Some(ItemType::Others) => self.item_sub_type.as_deref(),
            _ => None,
        }
    }
}

/// Bloom's taxonomy level, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloomsLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomsLevel {
    pub const ALL: [BloomsLevel; 6] = [
        BloomsLevel::Remember,
        BloomsLevel::Understand,
        BloomsLevel::Apply,
        BloomsLevel::Analyze,
        BloomsLevel::Evaluate,
        BloomsLevel::Create,
    ];
}

impl fmt::Display for BloomsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BloomsLevel::Remember => "Remember",
            BloomsLevel::Understand => "Understand",
            BloomsLevel::Apply => "Apply",
            BloomsLevel::Analyze => "Analyze",
            BloomsLevel::Evaluate => "Evaluate",
            BloomsLevel::Create => "Create",
        };
        f.write_str(label)
    }
}

impl FromStr for BloomsLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remember" | "remembering" => Ok(BloomsLevel::Remember),
            "understand" | "understanding" => Ok(BloomsLevel::Understand),
            "apply" | "applying" => Ok(BloomsLevel::Apply),
            "analyze" | "analyse" | "analyzing" => Ok(BloomsLevel::Analyze),
            "evaluate" | "evaluating" => Ok(BloomsLevel::Evaluate),
            "create" | "creating" => Ok(BloomsLevel::Create),
            other => Err(format!("unknown blooms level: {other}")),
        }
    }
}

/// Kind of test item a row asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "Multiple Choice")]
    MultipleChoice,
    #[serde(rename = "True/False")]
    TrueFalse,
    #[serde(rename = "Fill in the Blanks")]
    FillInTheBlanks,
    #[serde(rename = "Short Answer")]
    ShortAnswer,
    #[serde(rename = "Long Answer")]
    LongAnswer,
    #[serde(rename = "Match the Following")]
    MatchTheFollowing,
    #[serde(rename = "Case Study")]
    CaseStudy,
    Others,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemType::MultipleChoice => "Multiple Choice",
            ItemType::TrueFalse => "True/False",
            ItemType::FillInTheBlanks => "Fill in the Blanks",
            ItemType::ShortAnswer => "Short Answer",
            ItemType::LongAnswer => "Long Answer",
            ItemType::MatchTheFollowing => "Match the Following",
            ItemType::CaseStudy => "Case Study",
            ItemType::Others => "Others",
        };
        f.write_str(label)
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiple choice" | "mcq" => Ok(ItemType::MultipleChoice),
            "true/false" | "true or false" => Ok(ItemType::TrueFalse),
            "fill in the blanks" | "fill in the blank" => Ok(ItemType::FillInTheBlanks),
            "short answer" => Ok(ItemType::ShortAnswer),
            "long answer" => Ok(ItemType::LongAnswer),
            "match the following" => Ok(ItemType::MatchTheFollowing),
            "case study" => Ok(ItemType::CaseStudy),
            "others" | "other" => Ok(ItemType::Others),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "moderate" => Ok(Difficulty::Medium),
            "hard" | "difficult" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A candidate test item produced from a configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub id: String,
    pub question: String,
    pub item_type: Option<ItemType>,
    pub blooms_level: Option<BloomsLevel>,
    pub difficulty: Option<Difficulty>,
    pub marks: u32,
    pub elo_id: String,
    pub elo_title: String,
    pub is_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A numbered group of question cards in the final assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuestionCard>,
}

impl Section {
    /// Σ question marks + Σ sub-question marks. Always recomputed.
    pub fn total_marks(&self) -> u64 {
        self.questions.iter().map(QuestionCard::total_marks).sum()
    }

    pub fn position_of(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCard {
    pub id: String,
    pub question_text: String,
    pub marks: u32,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
    /// The generated item this card was built from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_item: Option<GeneratedItem>,
}

impl QuestionCard {
    pub fn total_marks(&self) -> u64 {
        u64::from(self.marks)
            + self
                .sub_questions
                .iter()
                .map(|s| u64::from(s.marks))
                .sum::<u64>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: String,
    pub text: String,
    pub marks: u32,
    #[serde(default)]
    pub numbering_style: NumberingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
}

/// How a sub-question's label is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    #[default]
    Numeric,
    Alpha,
    Roman,
    Custom,
}

impl FromStr for NumberingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "numeric" => Ok(NumberingStyle::Numeric),
            "alpha" => Ok(NumberingStyle::Alpha),
            "roman" => Ok(NumberingStyle::Roman),
            "custom" => Ok(NumberingStyle::Custom),
            other => Err(format!("unknown numbering style: {other}")),
        }
    }
}

/// Whether question numbers run across sections or restart in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberingPolicy {
    #[default]
    Continuous,
    ResetPerSection,
}

impl fmt::Display for NumberingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingPolicy::Continuous => write!(f, "continuous"),
            NumberingPolicy::ResetPerSection => write!(f, "reset-per-section"),
        }
    }
}

impl FromStr for NumberingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continuous" => Ok(NumberingPolicy::Continuous),
            "reset-per-section" | "reset" | "per-section" => Ok(NumberingPolicy::ResetPerSection),
            other => Err(format!("unknown numbering policy: {other}")),
        }
    }
}
