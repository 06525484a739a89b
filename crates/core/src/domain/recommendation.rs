use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::item::ItemName;
use crate::domain::meal::MealId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationBatchId(pub String);

impl RecommendationBatchId {
    pub fn generate() -> Self {
        Self(format!("rec-{}", Uuid::new_v4()))
    }
}

/// Derived gap analysis for one meal. Disposable; regenerated on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub meal_id: MealId,
    pub meal_name: String,
    pub missing_items: Vec<ItemName>,
    /// Fraction of the meal's required items already held, in `0.0..=1.0`.
    pub score: f64,
    pub generated_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn is_complete(&self) -> bool {
        self.missing_items.is_empty()
    }
}

/// A meal left out of a batch because its record is unusable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMeal {
    pub meal_id: MealId,
    pub meal_name: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBatch {
    pub id: RecommendationBatchId,
    pub generated_at: DateTime<Utc>,
    /// Ranked, closest-to-complete first.
    pub recommendations: Vec<Recommendation>,
    pub rejected: Vec<RejectedMeal>,
}

impl RecommendationBatch {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            id: RecommendationBatchId::generate(),
            generated_at,
            recommendations: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    pub fn complete_count(&self) -> usize {
        self.recommendations.iter().filter(|rec| rec.is_complete()).count()
    }
}
