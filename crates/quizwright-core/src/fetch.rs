//! Sequential per-chapter outcome fetching with fallback.
//!
//! Chapters are fetched one at a time, in selection order. A chapter whose
//! fetch fails, times out, or comes back empty gets a fixed fallback set
//! instead; the run as a whole never fails because of one chapter.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{Chapter, LearningOutcome, DEFAULT_MAX_ITEMS, DEFAULT_MAX_MARKS};
use crate::traits::{OutcomeGenerator, OutcomeRequest};
use crate::tree::OutcomeTree;

/// Configuration for the fetch orchestrator.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub board: String,
    pub grade: String,
    pub subject: String,
    /// Per-chapter request timeout.
    pub timeout: Duration,
    pub default_max_items: u32,
    pub default_max_marks: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            board: "CBSE".to_string(),
            grade: "8".to_string(),
            subject: "Science".to_string(),
            timeout: Duration::from_secs(30),
            default_max_items: DEFAULT_MAX_ITEMS,
            default_max_marks: DEFAULT_MAX_MARKS,
        }
    }
}

/// Why a chapter ended up with fallback outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    Failed(String),
    TimedOut(u64),
    Empty,
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::Failed(e) => write!(f, "fetch failed: {e}"),
            DegradeReason::TimedOut(secs) => write!(f, "timed out after {secs}s"),
            DegradeReason::Empty => write!(f, "no outcomes returned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FetchSource {
    Live,
    Fallback(DegradeReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterFetchReport {
    pub chapter_id: String,
    pub outcome_count: usize,
    pub source: FetchSource,
    pub duration_ms: u64,
}

impl ChapterFetchReport {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, FetchSource::Fallback(_))
    }
}

/// Per-chapter results of a populate run, in chapter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    pub chapters: Vec<ChapterFetchReport>,
}

impl FetchSummary {
    pub fn degraded(&self) -> impl Iterator<Item = &ChapterFetchReport> {
        self.chapters.iter().filter(|c| c.is_fallback())
    }
}

/// Progress reporting trait.
pub trait FetchProgress: Send + Sync {
    fn on_chapter_start(&self, chapter: &Chapter, position: usize, total: usize);
    fn on_chapter_complete(&self, report: &ChapterFetchReport);
}

/// No-op progress reporter.
pub struct NoopProgress;

impl FetchProgress for NoopProgress {
    fn on_chapter_start(&self, _: &Chapter, _: usize, _: usize) {}
    fn on_chapter_complete(&self, _: &ChapterFetchReport) {}
}

pub struct OutcomeFetchOrchestrator {
    generator: Arc<dyn OutcomeGenerator>,
    config: FetchConfig,
}

impl OutcomeFetchOrchestrator {
    pub fn new(generator: Arc<dyn OutcomeGenerator>, config: FetchConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch outcomes for each chapter in turn and add them to `tree`.
    ///
    /// Only tree-level errors (an outcome id already owned by another
    /// chapter) can fail the call; fetch problems never do.
    pub async fn populate(
        &self,
        tree: &mut OutcomeTree,
        chapters: &[Chapter],
        progress: &dyn FetchProgress,
    ) -> Result<FetchSummary> {
        let mut summary = FetchSummary::default();
        for (i, chapter) in chapters.iter().enumerate() {
            progress.on_chapter_start(chapter, i + 1, chapters.len());
            let (outcomes, report) = self.fetch_chapter(chapter).await;
            tree.add_chapter(chapter.clone(), outcomes)?;
            progress.on_chapter_complete(&report);
            summary.chapters.push(report);
        }
        info!(
            chapters = summary.chapters.len(),
            degraded = summary.degraded().count(),
            generator = self.generator.name(),
            "outcome fetch complete"
        );
        Ok(summary)
    }

    /// Fetch one chapter's outcome candidates, falling back on any problem.
    pub async fn fetch_chapter(&self, chapter: &Chapter) -> (Vec<LearningOutcome>, ChapterFetchReport) {
        let start = Instant::now();
        let request = OutcomeRequest {
            board: self.config.board.clone(),
            grade: self.config.grade.clone(),
            subject: self.config.subject.clone(),
            chapter_name: chapter.name.clone(),
        };

        let attempt =
            tokio::time::timeout(self.config.timeout, self.generator.generate_outcomes(&request))
                .await;
        let live = match attempt {
            Ok(Ok(response)) if !response.course_outcomes.is_empty() => Ok(response),
            Ok(Ok(_)) => Err(DegradeReason::Empty),
            Ok(Err(e)) => Err(DegradeReason::Failed(format!("{e:#}"))),
            Err(_) => Err(DegradeReason::TimedOut(self.config.timeout.as_secs())),
        };

        let (outcomes, source) = match live {
            Ok(response) => {
                let outcomes = response
                    .course_outcomes
                    .into_iter()
                    .enumerate()
                    .map(|(i, co)| {
                        LearningOutcome::new(format!("{}-elo-{}", chapter.id, i + 1), co.co_title)
                            .with_description(co.co_description)
                            .with_limits(self.config.default_max_items, self.config.default_max_marks)
                    })
                    .collect();
                (outcomes, FetchSource::Live)
            }
            Err(reason) => {
                warn!(chapter = %chapter.id, "using fallback outcomes: {reason}");
                (
                    fallback_outcomes(chapter, &self.config),
                    FetchSource::Fallback(reason),
                )
            }
        };

        let report = ChapterFetchReport {
            chapter_id: chapter.id.clone(),
            outcome_count: outcomes.len(),
            source,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (outcomes, report)
    }
}

/// The fixed outcome set used when a chapter cannot be fetched.
pub fn fallback_outcomes(chapter: &Chapter, config: &FetchConfig) -> Vec<LearningOutcome> {
    let name = &chapter.name;
    [
        (
            format!("Understand the key concepts of {name}"),
            format!("Students will be able to explain the core ideas and terminology of {name}."),
        ),
        (
            format!("Apply the principles of {name}"),
            format!("Students will be able to use what they learned in {name} to solve problems."),
        ),
        (
            format!("Analyze real-world examples of {name}"),
            format!("Students will be able to examine everyday situations that involve {name}."),
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (title, description))| {
        LearningOutcome::new(format!("{}-elo-{}", chapter.id, i + 1), title)
            .with_description(description)
            .with_limits(config.default_max_items, config.default_max_marks)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CourseOutcome, OutcomeResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers by chapter name; anything unlisted fails.
    struct ScriptedGenerator {
        answers: Vec<(&'static str, Vec<&'static str>)>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OutcomeGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_outcomes(
            &self,
            request: &OutcomeRequest,
        ) -> anyhow::Result<OutcomeResponse> {
            self.calls.lock().unwrap().push(request.chapter_name.clone());
            let Some((_, titles)) = self
                .answers
                .iter()
                .find(|(name, _)| *name == request.chapter_name)
            else {
                anyhow::bail!("backend unavailable");
            };
            Ok(OutcomeResponse {
                course_outcomes: titles
                    .iter()
                    .map(|t| CourseOutcome {
                        co_title: t.to_string(),
                        co_description: String::new(),
                    })
                    .collect(),
            })
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl OutcomeGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_outcomes(&self, _: &OutcomeRequest) -> anyhow::Result<OutcomeResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(OutcomeResponse::default())
        }
    }

    fn chapters() -> Vec<Chapter> {
        vec![
            Chapter::new("c1", "Motion"),
            Chapter::new("c2", "Sound"),
            Chapter::new("c3", "Light"),
        ]
    }

    #[tokio::test]
    async fn failed_chapter_falls_back_others_stay_live() {
        let generator = Arc::new(ScriptedGenerator {
            answers: vec![
                ("Motion", vec!["Define velocity", "Plot distance-time graphs"]),
                ("Light", vec!["Describe reflection"]),
            ],
            calls: Mutex::new(Vec::new()),
        });
        let orchestrator = OutcomeFetchOrchestrator::new(generator.clone(), FetchConfig::default());
        let mut tree = OutcomeTree::new();

        let summary = orchestrator
            .populate(&mut tree, &chapters(), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(
            *generator.calls.lock().unwrap(),
            vec!["Motion", "Sound", "Light"]
        );
        assert_eq!(summary.chapters[0].source, FetchSource::Live);
        assert!(matches!(
            summary.chapters[1].source,
            FetchSource::Fallback(DegradeReason::Failed(_))
        ));
        assert_eq!(summary.chapters[2].source, FetchSource::Live);

        let ids: Vec<&str> = tree.chapters().iter().map(|c| c.chapter.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(tree.chapter("c1").unwrap().outcomes[1].title, "Plot distance-time graphs");
        let sound = &tree.chapter("c2").unwrap().outcomes;
        assert_eq!(sound, &fallback_outcomes(&Chapter::new("c2", "Sound"), &FetchConfig::default()));
        assert_eq!(tree.chapter("c3").unwrap().outcomes[0].id, "c3-elo-1");
    }

    #[tokio::test]
    async fn empty_response_falls_back() {
        let generator = Arc::new(ScriptedGenerator {
            answers: vec![("Motion", vec![])],
            calls: Mutex::new(Vec::new()),
        });
        let orchestrator = OutcomeFetchOrchestrator::new(generator, FetchConfig::default());
        let (outcomes, report) = orchestrator.fetch_chapter(&Chapter::new("c1", "Motion")).await;
        assert_eq!(report.source, FetchSource::Fallback(DegradeReason::Empty));
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].title.contains("Motion"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_takes_the_fallback_path() {
        let config = FetchConfig {
            timeout: Duration::from_secs(5),
            ..FetchConfig::default()
        };
        let orchestrator = OutcomeFetchOrchestrator::new(Arc::new(SlowGenerator), config);
        let (outcomes, report) = orchestrator.fetch_chapter(&Chapter::new("c9", "Heat")).await;
        assert_eq!(report.source, FetchSource::Fallback(DegradeReason::TimedOut(5)));
        assert_eq!(outcomes[2].id, "c9-elo-3");
    }

    #[tokio::test]
    async fn live_outcomes_use_configured_limits() {
        let generator = Arc::new(ScriptedGenerator {
            answers: vec![("Motion", vec!["Define velocity"])],
            calls: Mutex::new(Vec::new()),
        });
        let config = FetchConfig {
            default_max_items: 4,
            default_max_marks: 8,
            ..FetchConfig::default()
        };
        let orchestrator = OutcomeFetchOrchestrator::new(generator, config);
        let (outcomes, _) = orchestrator.fetch_chapter(&Chapter::new("c1", "Motion")).await;
        assert_eq!(outcomes[0].max_items, 4);
        assert_eq!(outcomes[0].max_marks, 8);
        assert!(!outcomes[0].selected);
    }
}
