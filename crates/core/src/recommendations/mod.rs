//! Meal gap analysis.
//!
//! Compares the items currently held against a catalog of meals and reports, per
//! meal, which required items are missing and how much of the meal is already
//! covered. The engine is pure: it never touches storage and holds no state across
//! invocations.

mod engine;
mod scoring;
mod types;

pub use engine::RecommendationEngine;
pub use scoring::{completeness_score, evaluate_meal, rank, MealEvaluation, TieBreak};
pub use types::RecommendationFilter;

use crate::errors::DomainError;

/// Result type for recommendation operations
pub type RecommendationResult<T> = Result<T, DomainError>;

/// Score of a meal whose every required item is held.
pub const COMPLETE_SCORE: f64 = 1.0;
