//! quizwright-providers: outcome generator and curriculum service integrations.
//!
//! Implements the `OutcomeGenerator` and `CurriculumBrowser` traits for an
//! Anthropic model, a plain HTTP curriculum backend, and in-memory mocks.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use config::{
    configured_generator, create_generator, load_config, load_config_from, GeneratorConfig,
    QuizwrightConfig,
};
pub use error::ProviderError;
