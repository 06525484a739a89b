use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

use expireassist_core::domain::inventory::{InventoryEntry, InventoryEntryId, StockRecord};
use expireassist_core::domain::item::ItemName;
use expireassist_core::errors::DomainError;

use super::{decode_u32, parse_timestamp, InventoryRepository, RepositoryError};
use crate::DbPool;

const ENTRY_COLUMNS: &str = "inv.id, i.name AS item_name, inv.acquired_at, inv.expiry_date,
    inv.cost, inv.quantity, inv.unit, inv.bin_name, inv.notes, inv.is_active";

pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let item_name: String =
        row.try_get("item_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let acquired_at_str: String =
        row.try_get("acquired_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expiry_date_str: Option<String> =
        row.try_get("expiry_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cost_str: Option<String> =
        row.try_get("cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let unit: Option<String> =
        row.try_get("unit").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bin_name: Option<String> =
        row.try_get("bin_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let cost = cost_str
        .map(|value| {
            Decimal::from_str(&value)
                .map_err(|error| RepositoryError::Decode(format!("cost: {error}")))
        })
        .transpose()?;

    Ok(InventoryEntry {
        id: InventoryEntryId(id),
        item_name: ItemName(item_name),
        acquired_at: parse_timestamp("acquired_at", &acquired_at_str)?,
        expiry_date: expiry_date_str
            .map(|value| parse_timestamp("expiry_date", &value))
            .transpose()?,
        cost,
        quantity: decode_u32("quantity", quantity)?,
        unit,
        bin_name,
        notes,
        is_active,
    })
}

/// Active stock as seen through `conn`, which may be a transaction.
pub(crate) async fn fetch_stock_records(
    conn: &mut SqliteConnection,
) -> Result<Vec<StockRecord>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT i.name AS item_name, inv.quantity, inv.is_active
         FROM inventory inv
         JOIN items i ON i.id = inv.item_id
         WHERE inv.is_active = 1
         ORDER BY inv.acquired_at ASC, inv.id ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let item_name: String =
                row.try_get("item_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let quantity: i64 =
                row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let is_active: bool =
                row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Ok(StockRecord {
                item_name: ItemName(item_name),
                quantity: decode_u32("quantity", quantity)?,
                is_active,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn add(&self, mut entry: InventoryEntry) -> Result<InventoryEntry, RepositoryError> {
        if entry.quantity == 0 {
            return Err(DomainError::InvalidQuantity { item: entry.item_name.to_string() }.into());
        }

        let item_row = sqlx::query("SELECT id, shelf_life_days FROM items WHERE name = ?")
            .bind(entry.item_name.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::UnknownItem(entry.item_name.to_string()))?;
        let item_id: i64 =
            item_row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let shelf_life_days: Option<i64> = item_row
            .try_get("shelf_life_days")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if entry.expiry_date.is_none() {
            entry.expiry_date =
                shelf_life_days.map(|days| entry.acquired_at + Duration::days(days));
        }

        sqlx::query(
            "INSERT INTO inventory (id, item_id, acquired_at, expiry_date, cost, quantity,
                                    unit, bin_name, notes, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(item_id)
        .bind(entry.acquired_at.to_rfc3339())
        .bind(entry.expiry_date.map(|dt| dt.to_rfc3339()))
        .bind(entry.cost.map(|cost| cost.to_string()))
        .bind(i64::from(entry.quantity))
        .bind(&entry.unit)
        .bind(&entry.bin_name)
        .bind(&entry.notes)
        .bind(entry.is_active)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn find_by_id(
        &self,
        id: &InventoryEntryId,
    ) -> Result<Option<InventoryEntry>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM inventory inv
             JOIN items i ON i.id = inv.item_id
             WHERE inv.id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn list_active(&self) -> Result<Vec<InventoryEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM inventory inv
             JOIN items i ON i.id = inv.item_id
             WHERE inv.is_active = 1
             ORDER BY inv.acquired_at ASC, inv.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn deactivate(&self, id: &InventoryEntryId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE inventory SET is_active = 0 WHERE id = ? AND is_active = 1")
                .bind(&id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use expireassist_core::domain::inventory::{InventoryEntry, InventoryEntryId};
    use expireassist_core::domain::item::Item;

    use super::{fetch_stock_records, SqlInventoryRepository};
    use crate::repositories::{
        InventoryRepository, ItemRepository, RepositoryError, SqlItemRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, SqlInventoryRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let items = SqlItemRepository::new(pool.clone());
        items.save(Item::new("Bread").with_shelf_life_days(3)).await.expect("save bread");
        items.save(Item::new("Basil")).await.expect("save basil");

        (pool.clone(), SqlInventoryRepository::new(pool))
    }

    fn entry(item: &Item) -> InventoryEntry {
        let acquired_at =
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single().expect("valid timestamp");
        let mut entry = InventoryEntry::acquire(item, 1, acquired_at).expect("acquire");
        entry.expiry_date = None;
        entry
    }

    #[tokio::test]
    async fn add_derives_expiry_from_item_shelf_life() {
        let (_, repo) = setup().await;
        let mut bread = entry(&Item::new("Bread"));
        bread.cost = Some(Decimal::new(300, 2));
        bread.unit = Some("loaf".to_string());

        let stored = repo.add(bread.clone()).await.expect("add bread");
        let found = repo.find_by_id(&bread.id).await.expect("find").expect("entry exists");

        assert_eq!(stored.expiry_date, Some(bread.acquired_at + Duration::days(3)));
        assert_eq!(found, stored);
    }

    #[tokio::test]
    async fn add_without_shelf_life_leaves_expiry_unknown() {
        let (_, repo) = setup().await;

        let stored = repo.add(entry(&Item::new("Basil"))).await.expect("add basil");

        assert_eq!(stored.expiry_date, None);
    }

    #[tokio::test]
    async fn add_rejects_unknown_items() {
        let (_, repo) = setup().await;

        let error = repo.add(entry(&Item::new("Truffle"))).await.expect_err("unknown item");

        assert!(matches!(error, RepositoryError::UnknownItem(ref name) if name == "Truffle"));
    }

    #[tokio::test]
    async fn deactivate_hides_entry_from_active_listing_and_stock() {
        let (pool, repo) = setup().await;
        let first = repo.add(entry(&Item::new("Bread"))).await.expect("add first");
        let second = repo.add(entry(&Item::new("Basil"))).await.expect("add second");

        assert!(repo.deactivate(&first.id).await.expect("deactivate"));
        assert!(!repo.deactivate(&first.id).await.expect("deactivate twice"));
        assert!(!repo
            .deactivate(&InventoryEntryId("inv-missing".to_string()))
            .await
            .expect("deactivate missing"));

        let active = repo.list_active().await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let mut conn = pool.acquire().await.expect("acquire connection");
        let stock = fetch_stock_records(&mut conn).await.expect("stock records");
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].item_name.as_str(), "Basil");
        drop(conn);

        let consumed = repo.find_by_id(&first.id).await.expect("find").expect("row retained");
        assert!(!consumed.is_active);
    }
}
