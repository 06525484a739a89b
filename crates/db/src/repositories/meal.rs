use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use expireassist_core::domain::item::ItemName;
use expireassist_core::domain::meal::{Meal, MealCatalog, MealId};

use super::{MealRepository, RepositoryError};
use crate::DbPool;

pub const DEFAULT_SHELF_LIFE_DAYS: u32 = 7;

pub struct SqlMealRepository {
    pool: DbPool,
    default_shelf_life_days: u32,
}

impl SqlMealRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, default_shelf_life_days: DEFAULT_SHELF_LIFE_DAYS }
    }

    /// Shelf life given to items a meal references but the catalog lacks.
    pub fn with_default_shelf_life_days(mut self, days: u32) -> Self {
        self.default_shelf_life_days = days;
        self
    }
}

/// Meals in catalog order, each with its required items in membership order.
///
/// A meal without membership rows comes back with no required items so that the
/// engine can report it.
pub(crate) async fn fetch_catalog(
    conn: &mut SqliteConnection,
) -> Result<MealCatalog, RepositoryError> {
    let meal_rows =
        sqlx::query("SELECT id, name, description FROM meals ORDER BY position ASC, id ASC")
            .fetch_all(&mut *conn)
            .await?;

    let item_rows = sqlx::query(
        "SELECT mi.meal_id, i.name AS item_name
         FROM meal_items mi
         JOIN items i ON i.id = mi.item_id
         ORDER BY mi.meal_id ASC, mi.position ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut requirements: HashMap<String, Vec<ItemName>> = HashMap::new();
    for row in &item_rows {
        let meal_id: String =
            row.try_get("meal_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let item_name: String =
            row.try_get("item_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        requirements.entry(meal_id).or_default().push(ItemName(item_name));
    }

    let mut meals = Vec::with_capacity(meal_rows.len());
    for row in &meal_rows {
        let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let name: String =
            row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let description: Option<String> =
            row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let required_items = requirements.remove(&id).unwrap_or_default();

        meals.push(Meal { id: MealId(id), name, description, required_items });
    }

    Ok(MealCatalog::new(meals))
}

/// The id already stored under this meal's name, otherwise the meal's own id made unique
/// among the stored ones.
async fn resolve_meal_id(
    conn: &mut SqliteConnection,
    meal: &Meal,
) -> Result<MealId, RepositoryError> {
    let stored: Option<String> = sqlx::query_scalar("SELECT id FROM meals WHERE name = ?")
        .bind(&meal.name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = stored {
        return Ok(MealId(id));
    }

    let taken: HashSet<String> = sqlx::query_scalar::<_, String>("SELECT id FROM meals")
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();
    let id = meal.id.first_free(|candidate| taken.contains(candidate.as_str()));
    if id != meal.id {
        debug!(
            event_name = "db.meals.id_suffixed",
            meal = %meal.name,
            requested = %meal.id,
            assigned = %id,
            "meal id already taken by another meal"
        );
    }
    Ok(id)
}

#[async_trait::async_trait]
impl MealRepository for SqlMealRepository {
    async fn list_catalog(&self) -> Result<MealCatalog, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_catalog(&mut conn).await
    }

    async fn save(&self, meal: Meal) -> Result<MealId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();
        let id = resolve_meal_id(&mut *tx, &meal).await?;

        sqlx::query(
            "INSERT INTO meals (id, name, description, position, created_at)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM meals), ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description",
        )
        .bind(id.as_str())
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM meal_items WHERE meal_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, item_name) in meal.requirements().into_iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO items (name, shelf_life_days, created_at) VALUES (?, ?, ?)",
            )
            .bind(item_name.as_str())
            .bind(i64::from(self.default_shelf_life_days))
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO meal_items (meal_id, item_id, position)
                 SELECT ?, id, ? FROM items WHERE name = ?",
            )
            .bind(id.as_str())
            .bind(position as i64)
            .bind(item_name.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }
}
