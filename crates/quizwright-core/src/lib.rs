//! quizwright-core: outcome trees, budgets, item selection, and assessment composition.
//!
//! This crate holds the data model and the in-memory builders that the
//! providers and the CLI drive. Nothing here performs network IO directly;
//! outcome generation is reached through the traits in [`traits`].

pub mod blueprint;
pub mod budget;
pub mod composer;
pub mod document;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod model;
pub mod selection;
pub mod traits;
pub mod tree;

pub use error::{AssessmentError, BudgetKind, BudgetViolation, Result};
