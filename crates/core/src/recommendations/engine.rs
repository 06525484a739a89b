//! Recommendation Engine implementation

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::scoring::{self, MealEvaluation, TieBreak};
use super::RecommendationResult;
use crate::domain::inventory::InventorySnapshot;
use crate::domain::item::ItemName;
use crate::domain::meal::{Meal, MealCatalog};
use crate::domain::recommendation::{
    Recommendation, RecommendationBatch, RecommendationBatchId, RejectedMeal,
};

/// Stateless gap analyser. Safe to share between callers; every invocation
/// works only on the snapshots it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecommendationEngine {
    tie_break: TieBreak,
}

impl RecommendationEngine {
    /// Create an engine that breaks score ties by catalog order
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Missing items and completeness score for a single meal
    pub fn evaluate_meal(
        &self,
        meal: &Meal,
        available_item_names: &HashSet<ItemName>,
    ) -> RecommendationResult<MealEvaluation> {
        scoring::evaluate_meal(meal, available_item_names)
    }

    /// Score every meal in the catalog against the snapshot, stamped with the
    /// current time.
    pub fn generate_recommendations(
        &self,
        snapshot: &InventorySnapshot,
        catalog: &MealCatalog,
    ) -> RecommendationBatch {
        self.generate_recommendations_at(snapshot, catalog, Utc::now())
    }

    /// Same as [`generate_recommendations`](Self::generate_recommendations) with a
    /// caller-supplied timestamp shared by the whole batch.
    pub fn generate_recommendations_at(
        &self,
        snapshot: &InventorySnapshot,
        catalog: &MealCatalog,
        generated_at: DateTime<Utc>,
    ) -> RecommendationBatch {
        let available = snapshot.available_item_names();

        let mut recommendations = Vec::with_capacity(catalog.len());
        let mut rejected = Vec::new();

        for meal in &catalog.meals {
            match scoring::evaluate_meal(meal, &available) {
                Ok(evaluation) => recommendations.push(Recommendation {
                    meal_id: meal.id.clone(),
                    meal_name: meal.name.clone(),
                    missing_items: evaluation.missing_items,
                    score: evaluation.score,
                    generated_at,
                }),
                Err(error) => {
                    warn!(
                        event_name = "recommendations.meal_rejected",
                        meal_id = %meal.id,
                        meal_name = %meal.name,
                        error = %error,
                        "skipping malformed meal"
                    );
                    rejected.push(RejectedMeal {
                        meal_id: meal.id.clone(),
                        meal_name: meal.name.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        scoring::rank(&mut recommendations, self.tie_break);

        let batch = RecommendationBatch {
            id: RecommendationBatchId::generate(),
            generated_at,
            recommendations,
            rejected,
        };

        debug!(
            event_name = "recommendations.batch_generated",
            batch_id = %batch.id.0,
            available_items = available.len(),
            meals = catalog.len(),
            scored = batch.len(),
            complete = batch.complete_count(),
            rejected = batch.rejected.len(),
            "recommendation batch generated"
        );

        batch
    }
}
