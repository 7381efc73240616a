//! Mock collaborators for testing and offline use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizwright_core::traits::{
    ChapterListing, CourseOutcome, CurriculumBrowser, OutcomeGenerator, OutcomeRequest,
    OutcomeResponse, Subject,
};

use crate::error::ProviderError;

#[derive(Debug, Clone)]
enum Scripted {
    Outcomes(Vec<CourseOutcome>),
    Failure(String),
}

/// An outcome generator that never leaves the process.
///
/// Chapters are matched by name. Unscripted chapters get a canned set of
/// `default_count` outcomes derived from the chapter name.
pub struct MockOutcomeGenerator {
    /// Map of chapter name → scripted answer.
    scripted: HashMap<String, Scripted>,
    default_count: usize,
    call_count: AtomicU32,
    last_request: Mutex<Option<OutcomeRequest>>,
}

impl Default for MockOutcomeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOutcomeGenerator {
    pub fn new() -> Self {
        Self {
            scripted: HashMap::new(),
            default_count: 2,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answer `chapter_name` with exactly these titles.
    pub fn with_outcomes(mut self, chapter_name: &str, titles: &[&str]) -> Self {
        let outcomes = titles
            .iter()
            .map(|t| CourseOutcome {
                co_title: t.to_string(),
                co_description: String::new(),
            })
            .collect();
        self.scripted
            .insert(chapter_name.to_string(), Scripted::Outcomes(outcomes));
        self
    }

    /// Fail every request for `chapter_name` with `message`.
    pub fn failing_on(mut self, chapter_name: &str, message: &str) -> Self {
        self.scripted.insert(
            chapter_name.to_string(),
            Scripted::Failure(message.to_string()),
        );
        self
    }

    /// Number of canned outcomes for unscripted chapters. Zero means empty answers.
    pub fn with_default_count(mut self, count: usize) -> Self {
        self.default_count = count;
        self
    }

    /// Get the number of calls made to this generator.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this generator.
    pub fn last_request(&self) -> Option<OutcomeRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl OutcomeGenerator for MockOutcomeGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_outcomes(&self, request: &OutcomeRequest) -> anyhow::Result<OutcomeResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let course_outcomes = match self.scripted.get(&request.chapter_name) {
            Some(Scripted::Outcomes(outcomes)) => outcomes.clone(),
            Some(Scripted::Failure(message)) => {
                return Err(ProviderError::ApiError {
                    status: 500,
                    message: message.clone(),
                }
                .into())
            }
            None => (1..=self.default_count)
                .map(|n| CourseOutcome {
                    co_title: format!("{} outcome {n}", request.chapter_name),
                    co_description: format!(
                        "Mock outcome {n} for {} ({} grade {})",
                        request.chapter_name, request.subject, request.grade
                    ),
                })
                .collect(),
        };
        Ok(OutcomeResponse { course_outcomes })
    }
}

/// An in-memory curriculum service.
#[derive(Debug, Default)]
pub struct MockCurriculum {
    /// (org, class id) → subjects
    subjects: HashMap<(String, String), Vec<Subject>>,
    /// (org, plan class id) → chapters
    chapters: HashMap<(String, String), Vec<ChapterListing>>,
}

impl MockCurriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subjects(mut self, org: &str, class_id: &str, subjects: Vec<Subject>) -> Self {
        self.subjects
            .insert((org.to_string(), class_id.to_string()), subjects);
        self
    }

    pub fn with_chapters(
        mut self,
        org: &str,
        plan_class_id: &str,
        chapters: Vec<ChapterListing>,
    ) -> Self {
        self.chapters
            .insert((org.to_string(), plan_class_id.to_string()), chapters);
        self
    }
}

#[async_trait]
impl CurriculumBrowser for MockCurriculum {
    async fn list_subjects(&self, org: &str, class_id: &str) -> anyhow::Result<Vec<Subject>> {
        Ok(self
            .subjects
            .get(&(org.to_string(), class_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_chapters(
        &self,
        org: &str,
        plan_class_id: &str,
    ) -> anyhow::Result<Vec<ChapterListing>> {
        Ok(self
            .chapters
            .get(&(org.to_string(), plan_class_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
