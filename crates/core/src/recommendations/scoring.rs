//! Gap computation and ranking for meal recommendations

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{RecommendationResult, COMPLETE_SCORE};
use crate::domain::item::ItemName;
use crate::domain::meal::Meal;
use crate::domain::recommendation::Recommendation;
use crate::errors::DomainError;

/// Outcome of comparing one meal against the available items
#[derive(Debug, Clone, PartialEq)]
pub struct MealEvaluation {
    /// Required items not held, in the meal's own order
    pub missing_items: Vec<ItemName>,
    /// Fraction of required items already held (0.0 - 1.0)
    pub score: f64,
    /// Distinct required items
    pub required_count: usize,
}

impl MealEvaluation {
    pub fn available_count(&self) -> usize {
        self.required_count - self.missing_items.len()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_items.is_empty()
    }
}

/// Secondary ordering for meals that share a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the order meals appear in the catalog
    #[default]
    CatalogOrder,
    /// Ascending meal identifier
    MealId,
}

impl TieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CatalogOrder => "catalog_order",
            Self::MealId => "meal_id",
        }
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "catalog_order" => Ok(Self::CatalogOrder),
            "meal_id" => Ok(Self::MealId),
            other => {
                Err(format!("unsupported tie break `{other}` (expected catalog_order|meal_id)"))
            }
        }
    }
}

/// Fraction satisfied, not fraction missing.
pub fn completeness_score(required_count: usize, missing_count: usize) -> f64 {
    if required_count == 0 {
        return 0.0;
    }
    if missing_count == 0 {
        return COMPLETE_SCORE;
    }

    let available = required_count.saturating_sub(missing_count);
    available as f64 / required_count as f64
}

/// Compare a meal's requirements against the available item names.
///
/// A meal without requirements cannot be scored and is rejected.
pub fn evaluate_meal(
    meal: &Meal,
    available_item_names: &HashSet<ItemName>,
) -> RecommendationResult<MealEvaluation> {
    let requirements = meal.requirements();
    if requirements.is_empty() {
        return Err(DomainError::EmptyMealRequirements { meal_id: meal.id.clone() });
    }

    let missing_items: Vec<ItemName> = requirements
        .iter()
        .filter(|item| !available_item_names.contains(item.as_str()))
        .map(|item| (*item).clone())
        .collect();

    let score = completeness_score(requirements.len(), missing_items.len());

    Ok(MealEvaluation { missing_items, score, required_count: requirements.len() })
}

/// Sort closest-to-complete first. The sort is stable, so `CatalogOrder` keeps
/// the incoming order for equal scores.
pub fn rank(recommendations: &mut [Recommendation], tie_break: TieBreak) {
    recommendations.sort_by(|a, b| {
        let by_score = b.score.total_cmp(&a.score);
        match tie_break {
            TieBreak::CatalogOrder => by_score,
            TieBreak::MealId => by_score.then_with(|| a.meal_id.cmp(&b.meal_id)),
        }
    });
}
