//! Caller-side views over a generated batch

use crate::domain::recommendation::{Recommendation, RecommendationBatch};

/// Display filter applied after generation. The engine itself never drops a
/// scored meal; callers narrow the batch down to what they want to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationFilter {
    /// Drop meals scoring below this fraction
    pub min_score: Option<f64>,
    /// Drop meals that are already fully stocked
    pub hide_complete: bool,
    /// Keep at most this many, after ranking
    pub max_results: Option<usize>,
}

impl RecommendationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn hiding_complete(mut self) -> Self {
        self.hide_complete = true;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn accepts(&self, recommendation: &Recommendation) -> bool {
        if self.hide_complete && recommendation.is_complete() {
            return false;
        }

        self.min_score.map_or(true, |min| recommendation.score >= min)
    }

    /// Filter a batch, keeping its rank order, id and rejected meals.
    pub fn apply(&self, batch: RecommendationBatch) -> RecommendationBatch {
        let limit = self.max_results.unwrap_or(usize::MAX);
        let recommendations =
            batch.recommendations.into_iter().filter(|rec| self.accepts(rec)).take(limit).collect();

        RecommendationBatch { recommendations, ..batch }
    }
}
