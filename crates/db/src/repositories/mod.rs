use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use expireassist_core::domain::inventory::{InventoryEntry, InventoryEntryId};
use expireassist_core::domain::item::{Item, ItemName};
use expireassist_core::domain::meal::{Meal, MealCatalog, MealId};
use expireassist_core::domain::recommendation::RecommendationBatch;
use expireassist_core::errors::DomainError;

pub mod inventory;
pub mod item;
pub mod meal;
pub mod memory;
pub mod recommendation;

pub use inventory::SqlInventoryRepository;
pub use item::SqlItemRepository;
pub use meal::SqlMealRepository;
pub use memory::{
    InMemoryInventoryRepository, InMemoryItemRepository, InMemoryMealRepository,
    InMemoryRecommendationRepository,
};
pub use recommendation::SqlRecommendationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unknown item `{0}`")]
    UnknownItem(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_name(&self, name: &ItemName) -> Result<Option<Item>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Item>, RepositoryError>;
    /// Insert-or-ignore. Returns `false` when an item with that name already exists.
    async fn save(&self, item: Item) -> Result<bool, RepositoryError>;
    /// Returns `false` when no item carries that name.
    async fn update_photo_path(
        &self,
        name: &ItemName,
        photo_path: &str,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Store a new entry. A missing expiry is derived from the item's shelf life.
    async fn add(&self, entry: InventoryEntry) -> Result<InventoryEntry, RepositoryError>;
    async fn find_by_id(
        &self,
        id: &InventoryEntryId,
    ) -> Result<Option<InventoryEntry>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<InventoryEntry>, RepositoryError>;
    /// Mark an entry consumed. Returns `false` if it was unknown or already inactive.
    async fn deactivate(&self, id: &InventoryEntryId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MealRepository: Send + Sync {
    async fn list_catalog(&self) -> Result<MealCatalog, RepositoryError>;
    /// Upsert by meal name. Returns the stored id, which carries a numeric suffix when
    /// another meal already holds the id derived from this name.
    async fn save(&self, meal: Meal) -> Result<MealId, RepositoryError>;
}

#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    async fn save_batch(&self, batch: &RecommendationBatch) -> Result<(), RepositoryError>;
    async fn latest_batch(&self) -> Result<Option<RecommendationBatch>, RepositoryError>;
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub(crate) fn decode_u32(field: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{field}: `{value}` is out of range")))
}
