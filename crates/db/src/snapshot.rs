use expireassist_core::domain::inventory::InventorySnapshot;
use expireassist_core::domain::meal::MealCatalog;

use crate::repositories::inventory::fetch_stock_records;
use crate::repositories::meal::fetch_catalog;
use crate::repositories::RepositoryError;
use crate::DbPool;

/// Inputs for one recommendation run, read at the same instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PantrySnapshot {
    pub inventory: InventorySnapshot,
    pub catalog: MealCatalog,
}

/// Read active stock and the meal catalog inside a single transaction.
pub async fn load_snapshot(pool: &DbPool) -> Result<PantrySnapshot, RepositoryError> {
    let mut tx = pool.begin().await?;

    let records = fetch_stock_records(&mut tx).await?;
    let catalog = fetch_catalog(&mut tx).await?;

    tx.commit().await?;

    Ok(PantrySnapshot { inventory: InventorySnapshot::new(records), catalog })
}
