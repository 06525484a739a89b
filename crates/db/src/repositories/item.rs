use chrono::Utc;
use sqlx::Row;

use expireassist_core::domain::item::{Item, ItemName};

use super::{decode_u32, ItemRepository, RepositoryError};
use crate::DbPool;

pub struct SqlItemRepository {
    pool: DbPool,
}

impl SqlItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<Item, RepositoryError> {
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let brand: Option<String> =
        row.try_get("brand").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: Option<String> =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let shelf_life_days: Option<i64> =
        row.try_get("shelf_life_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let photo_path: Option<String> =
        row.try_get("photo_path").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Item {
        name: ItemName(name),
        brand,
        category,
        shelf_life_days: shelf_life_days
            .map(|days| decode_u32("shelf_life_days", days))
            .transpose()?,
        photo_path,
    })
}

#[async_trait::async_trait]
impl ItemRepository for SqlItemRepository {
    async fn find_by_name(&self, name: &ItemName) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, brand, category, shelf_life_days, photo_path
             FROM items WHERE name = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn list(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, brand, category, shelf_life_days, photo_path
             FROM items ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn save(&self, item: Item) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO items
                 (name, brand, category, shelf_life_days, photo_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.name.as_str())
        .bind(&item.brand)
        .bind(&item.category)
        .bind(item.shelf_life_days.map(i64::from))
        .bind(&item.photo_path)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_photo_path(
        &self,
        name: &ItemName,
        photo_path: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE items SET photo_path = ? WHERE name = ?")
            .bind(photo_path)
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use expireassist_core::domain::item::{Item, ItemName};

    use super::SqlItemRepository;
    use crate::repositories::ItemRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlItemRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlItemRepository::new(pool)
    }

    #[tokio::test]
    async fn save_then_find_round_trip() {
        let repo = setup().await;
        let milk =
            Item::new("Milk").with_brand("Generic").with_category("Dairy").with_shelf_life_days(7);

        assert!(repo.save(milk.clone()).await.expect("save"));
        let found = repo.find_by_name(&ItemName::from("Milk")).await.expect("find");

        assert_eq!(found, Some(milk));
    }

    #[tokio::test]
    async fn save_ignores_existing_names() {
        let repo = setup().await;
        repo.save(Item::new("Eggs").with_shelf_life_days(21)).await.expect("first save");

        let inserted =
            repo.save(Item::new("Eggs").with_shelf_life_days(1)).await.expect("second save");
        let found = repo.find_by_name(&ItemName::from("Eggs")).await.expect("find");

        assert!(!inserted);
        assert_eq!(found.and_then(|item| item.shelf_life_days), Some(21));
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let repo = setup().await;
        for name in ["Milk", "Eggs", "Bread"] {
            repo.save(Item::new(name)).await.expect("save");
        }

        let names: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|item| item.name.0).collect();
        assert_eq!(names, vec!["Milk", "Eggs", "Bread"]);
    }

    #[tokio::test]
    async fn update_photo_path_reports_unknown_items() {
        let repo = setup().await;
        repo.save(Item::new("Butter")).await.expect("save");

        let updated = repo
            .update_photo_path(&ItemName::from("Butter"), "pictures/butter.jpg")
            .await
            .expect("update butter");
        let missing = repo
            .update_photo_path(&ItemName::from("Saffron"), "pictures/saffron.jpg")
            .await
            .expect("update saffron");

        assert!(updated);
        assert!(!missing);
        let butter = repo.find_by_name(&ItemName::from("Butter")).await.expect("find");
        assert_eq!(
            butter.and_then(|item| item.photo_path),
            Some("pictures/butter.jpg".to_string())
        );
    }
}
