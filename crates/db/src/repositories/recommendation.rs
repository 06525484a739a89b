use sqlx::Row;

use expireassist_core::domain::item::ItemName;
use expireassist_core::domain::meal::MealId;
use expireassist_core::domain::recommendation::{
    Recommendation, RecommendationBatch, RecommendationBatchId, RejectedMeal,
};

use super::{parse_timestamp, RecommendationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationRepository for SqlRecommendationRepository {
    async fn save_batch(&self, batch: &RecommendationBatch) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let created_at = batch.generated_at.to_rfc3339();

        for (rank, recommendation) in batch.recommendations.iter().enumerate() {
            let missing_items = serde_json::to_string(&recommendation.missing_items)
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;

            sqlx::query(
                "INSERT INTO recommendations
                     (batch_id, created_at, meal_id, meal_name, missing_items, score, rank, notes)
                 VALUES (?, ?, ?, ?, ?, ?, ?, NULL)",
            )
            .bind(&batch.id.0)
            .bind(&created_at)
            .bind(recommendation.meal_id.as_str())
            .bind(&recommendation.meal_name)
            .bind(missing_items)
            .bind(recommendation.score)
            .bind(rank as i64)
            .execute(&mut *tx)
            .await?;
        }

        for rejected in &batch.rejected {
            sqlx::query(
                "INSERT INTO recommendations
                     (batch_id, created_at, meal_id, meal_name, missing_items, score, rank, notes)
                 VALUES (?, ?, ?, ?, '[]', NULL, NULL, ?)",
            )
            .bind(&batch.id.0)
            .bind(&created_at)
            .bind(rejected.meal_id.as_str())
            .bind(&rejected.meal_name)
            .bind(&rejected.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest_batch(&self) -> Result<Option<RecommendationBatch>, RepositoryError> {
        let latest = sqlx::query(
            "SELECT batch_id, created_at FROM recommendations
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(latest) = latest else {
            return Ok(None);
        };
        let batch_id: String =
            latest.try_get("batch_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at_str: String =
            latest.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let generated_at = parse_timestamp("created_at", &created_at_str)?;

        let rows = sqlx::query(
            "SELECT meal_id, meal_name, missing_items, score, notes
             FROM recommendations
             WHERE batch_id = ?
             ORDER BY rank IS NULL, rank ASC, id ASC",
        )
        .bind(&batch_id)
        .fetch_all(&self.pool)
        .await?;

        let mut batch = RecommendationBatch {
            id: RecommendationBatchId(batch_id),
            generated_at,
            recommendations: Vec::new(),
            rejected: Vec::new(),
        };

        for row in &rows {
            let meal_id: String =
                row.try_get("meal_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let meal_name: String =
                row.try_get("meal_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let missing_items_json: String =
                row.try_get("missing_items").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let score: Option<f64> =
                row.try_get("score").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let notes: Option<String> =
                row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;

            match score {
                Some(score) => {
                    let missing_items: Vec<ItemName> = serde_json::from_str(&missing_items_json)
                        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
                    batch.recommendations.push(Recommendation {
                        meal_id: MealId(meal_id),
                        meal_name,
                        missing_items,
                        score,
                        generated_at,
                    });
                }
                None => batch.rejected.push(RejectedMeal {
                    meal_id: MealId(meal_id),
                    meal_name,
                    reason: notes.unwrap_or_default(),
                }),
            }
        }

        Ok(Some(batch))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use expireassist_core::domain::inventory::InventorySnapshot;
    use expireassist_core::domain::meal::{Meal, MealCatalog};
    use expireassist_core::recommendations::RecommendationEngine;

    use super::SqlRecommendationRepository;
    use crate::repositories::{MealRepository, RecommendationRepository, SqlMealRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, MealCatalog) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let meals = SqlMealRepository::new(pool.clone());
        meals.save(Meal::new("Bacon & Eggs", ["Bacon", "Eggs", "Bread"])).await.expect("save");
        meals.save(Meal::new("Buttered Rice", ["Rice", "Butter"])).await.expect("save");
        meals.save(Meal::new("Mystery Box", Vec::<&str>::new())).await.expect("save");
        let catalog = meals.list_catalog().await.expect("catalog");

        (pool, catalog)
    }

    #[tokio::test]
    async fn latest_batch_is_empty_before_any_save() {
        let (pool, _) = setup().await;
        let repo = SqlRecommendationRepository::new(pool);

        assert!(repo.latest_batch().await.expect("latest").is_none());
    }

    #[tokio::test]
    async fn saved_batch_round_trips_with_rank_and_rejections() {
        let (pool, catalog) = setup().await;
        let repo = SqlRecommendationRepository::new(pool);
        let generated_at =
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp");
        let batch = RecommendationEngine::new().generate_recommendations_at(
            &InventorySnapshot::from_available(["Eggs", "Bread", "Rice", "Butter"]),
            &catalog,
            generated_at,
        );

        repo.save_batch(&batch).await.expect("save batch");
        let loaded = repo.latest_batch().await.expect("latest").expect("batch stored");

        assert_eq!(loaded, batch);
        assert_eq!(loaded.recommendations[0].meal_id.as_str(), "buttered-rice");
        assert_eq!(loaded.rejected.len(), 1);
    }

    #[tokio::test]
    async fn latest_batch_picks_most_recent_generation() {
        let (pool, catalog) = setup().await;
        let repo = SqlRecommendationRepository::new(pool);
        let engine = RecommendationEngine::new();
        let earlier = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().expect("valid timestamp");

        let first = engine.generate_recommendations_at(
            &InventorySnapshot::default(),
            &catalog,
            earlier,
        );
        let second = engine.generate_recommendations_at(
            &InventorySnapshot::from_available(["Bacon"]),
            &catalog,
            earlier + Duration::hours(1),
        );
        repo.save_batch(&first).await.expect("save first");
        repo.save_batch(&second).await.expect("save second");

        let loaded = repo.latest_batch().await.expect("latest").expect("batch stored");
        assert_eq!(loaded.id, second.id);
    }
}
