//! Quizwright configuration and generator factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizwright_core::fetch::FetchConfig;
use quizwright_core::model::{DEFAULT_MAX_ITEMS, DEFAULT_MAX_MARKS};
use quizwright_core::traits::OutcomeGenerator;

use crate::anthropic::AnthropicOutcomeGenerator;
use crate::http::HttpCurriculumService;
use crate::mock::MockOutcomeGenerator;

/// Which backend generates learning outcomes.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeneratorConfig {
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    Mock {
        #[serde(default = "default_mock_count")]
        outcomes_per_chapter: usize,
        /// Chapter names whose requests fail.
        #[serde(default)]
        fail_chapters: Vec<String>,
    },
}

fn default_mock_count() -> usize {
    2
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorConfig::Anthropic {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            GeneratorConfig::Http { base_url, api_key } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .finish(),
            GeneratorConfig::Mock {
                outcomes_per_chapter,
                fail_chapters,
            } => f
                .debug_struct("Mock")
                .field("outcomes_per_chapter", outcomes_per_chapter)
                .field("fail_chapters", fail_chapters)
                .finish(),
        }
    }
}

/// Top-level quizwright configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizwrightConfig {
    /// Outcome generator; `None` until configured.
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default = "default_board")]
    pub board: String,
    #[serde(default = "default_grade")]
    pub grade: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Per-chapter outcome fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_items")]
    pub default_max_items: u32,
    #[serde(default = "default_max_marks")]
    pub default_max_marks: u32,
    /// Output directory for built assessments.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_board() -> String {
    "CBSE".to_string()
}
fn default_grade() -> String {
    "8".to_string()
}
fn default_subject() -> String {
    "Science".to_string()
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_max_items() -> u32 {
    DEFAULT_MAX_ITEMS
}
fn default_max_marks() -> u32 {
    DEFAULT_MAX_MARKS
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizwright-output")
}

impl Default for QuizwrightConfig {
    fn default() -> Self {
        Self {
            generator: None,
            board: default_board(),
            grade: default_grade(),
            subject: default_subject(),
            fetch_timeout_secs: default_fetch_timeout(),
            default_max_items: default_max_items(),
            default_max_marks: default_max_marks(),
            output_dir: default_output_dir(),
        }
    }
}

impl QuizwrightConfig {
    /// Settings for the outcome fetch orchestrator.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            board: self.board.clone(),
            grade: self.grade.clone(),
            subject: self.subject.clone(),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            default_max_items: self.default_max_items,
            default_max_marks: self.default_max_marks,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Substitute `${VAR}` references in one left-to-right pass.
///
/// Substituted values are copied verbatim, never rescanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_generator_config(config: &GeneratorConfig) -> GeneratorConfig {
    match config {
        GeneratorConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => GeneratorConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            model: model.clone(),
        },
        GeneratorConfig::Http { base_url, api_key } => GeneratorConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_deref().map(resolve_env_vars),
        },
        mock @ GeneratorConfig::Mock { .. } => mock.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizwright.toml` in the current directory
/// 2. `~/.config/quizwright/config.toml`
///
/// Environment variable overrides: `QUIZWRIGHT_ANTHROPIC_KEY`, `QUIZWRIGHT_API_KEY`.
pub fn load_config() -> Result<QuizwrightConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizwrightConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizwright.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizwrightConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizwrightConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.generator = config.generator.as_ref().map(resolve_generator_config);

    Ok(config)
}

fn apply_env_overrides(config: &mut QuizwrightConfig) {
    if let Ok(key) = std::env::var("QUIZWRIGHT_ANTHROPIC_KEY") {
        match &mut config.generator {
            Some(GeneratorConfig::Anthropic { api_key, .. }) => *api_key = key,
            None => {
                config.generator = Some(GeneratorConfig::Anthropic {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
            Some(_) => {}
        }
    }

    if let Ok(key) = std::env::var("QUIZWRIGHT_API_KEY") {
        if let Some(GeneratorConfig::Http { api_key, .. }) = &mut config.generator {
            *api_key = Some(key);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizwright"))
}

/// Create an outcome generator from its configuration.
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn OutcomeGenerator>> {
    match config {
        GeneratorConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("anthropic generator has an empty api_key");
            }
            Ok(Arc::new(AnthropicOutcomeGenerator::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )?))
        }
        GeneratorConfig::Http { base_url, api_key } => Ok(Arc::new(HttpCurriculumService::new(
            base_url,
            api_key.clone(),
        )?)),
        GeneratorConfig::Mock {
            outcomes_per_chapter,
            fail_chapters,
        } => {
            let generator = fail_chapters.iter().fold(
                MockOutcomeGenerator::new().with_default_count(*outcomes_per_chapter),
                |g, chapter| g.failing_on(chapter, "configured to fail"),
            );
            Ok(Arc::new(generator))
        }
    }
}

/// The configured generator, or an error telling the user how to set one up.
pub fn configured_generator(config: &QuizwrightConfig) -> Result<Arc<dyn OutcomeGenerator>> {
    let generator = config.generator.as_ref().context(
        "no outcome generator configured; run `quizwright init` or set QUIZWRIGHT_ANTHROPIC_KEY",
    )?;
    create_generator(generator)
}
