use std::sync::Arc;

use tokio::sync::RwLock;

use expireassist_core::domain::inventory::{InventoryEntry, InventoryEntryId};
use expireassist_core::domain::item::{Item, ItemName};
use expireassist_core::domain::meal::{Meal, MealCatalog, MealId};
use expireassist_core::domain::recommendation::RecommendationBatch;
use expireassist_core::errors::DomainError;

use super::{
    InventoryRepository, ItemRepository, MealRepository, RecommendationRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryItemRepository {
    items: RwLock<Vec<Item>>,
}

#[async_trait::async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn find_by_name(&self, name: &ItemName) -> Result<Option<Item>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| &item.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self.items.read().await.clone())
    }

    async fn save(&self, item: Item) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.name == item.name) {
            return Ok(false);
        }
        items.push(item);
        Ok(true)
    }

    async fn update_photo_path(
        &self,
        name: &ItemName,
        photo_path: &str,
    ) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|item| &item.name == name) {
            Some(item) => {
                item.photo_path = Some(photo_path.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Inventory kept in memory. Entries resolve their items through an item store that
/// can be shared with an [`InMemoryItemRepository`] handed out elsewhere.
#[derive(Default)]
pub struct InMemoryInventoryRepository {
    items: Arc<InMemoryItemRepository>,
    entries: RwLock<Vec<InventoryEntry>>,
}

impl InMemoryInventoryRepository {
    pub fn with_items(items: Arc<InMemoryItemRepository>) -> Self {
        Self { items, entries: RwLock::default() }
    }
}

#[async_trait::async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn add(&self, mut entry: InventoryEntry) -> Result<InventoryEntry, RepositoryError> {
        if entry.quantity == 0 {
            return Err(DomainError::InvalidQuantity { item: entry.item_name.to_string() }.into());
        }

        let item = self
            .items
            .find_by_name(&entry.item_name)
            .await?
            .ok_or_else(|| RepositoryError::UnknownItem(entry.item_name.to_string()))?;
        if entry.expiry_date.is_none() {
            entry.expiry_date = item.expiry_from(entry.acquired_at);
        }

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_id(
        &self,
        id: &InventoryEntryId,
    ) -> Result<Option<InventoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|entry| &entry.id == id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<InventoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|entry| entry.is_active).cloned().collect())
    }

    async fn deactivate(&self, id: &InventoryEntryId) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|entry| &entry.id == id && entry.is_active) {
            Some(entry) => {
                entry.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryMealRepository {
    meals: RwLock<Vec<Meal>>,
}

#[async_trait::async_trait]
impl MealRepository for InMemoryMealRepository {
    async fn list_catalog(&self) -> Result<MealCatalog, RepositoryError> {
        Ok(MealCatalog::new(self.meals.read().await.clone()))
    }

    async fn save(&self, mut meal: Meal) -> Result<MealId, RepositoryError> {
        meal.required_items = meal.requirements().into_iter().cloned().collect();

        let mut meals = self.meals.write().await;
        if let Some(existing) = meals.iter_mut().find(|existing| existing.name == meal.name) {
            meal.id = existing.id.clone();
            *existing = meal;
            return Ok(existing.id.clone());
        }

        meal.id =
            meal.id.first_free(|candidate| meals.iter().any(|existing| &existing.id == candidate));
        let id = meal.id.clone();
        meals.push(meal);
        Ok(id)
    }
}

#[derive(Default)]
pub struct InMemoryRecommendationRepository {
    batches: RwLock<Vec<RecommendationBatch>>,
}

#[async_trait::async_trait]
impl RecommendationRepository for InMemoryRecommendationRepository {
    async fn save_batch(&self, batch: &RecommendationBatch) -> Result<(), RepositoryError> {
        self.batches.write().await.push(batch.clone());
        Ok(())
    }

    async fn latest_batch(&self) -> Result<Option<RecommendationBatch>, RepositoryError> {
        let batches = self.batches.read().await;
        Ok(batches.iter().max_by_key(|batch| batch.generated_at).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use expireassist_core::domain::inventory::{InventoryEntry, InventorySnapshot};
    use expireassist_core::domain::item::{Item, ItemName};
    use expireassist_core::domain::meal::Meal;
    use expireassist_core::recommendations::RecommendationEngine;

    use crate::repositories::{
        InMemoryInventoryRepository, InMemoryItemRepository, InMemoryMealRepository,
        InMemoryRecommendationRepository, InventoryRepository, ItemRepository, MealRepository,
        RecommendationRepository, RepositoryError,
    };

    #[tokio::test]
    async fn in_memory_item_repo_ignores_duplicate_names() {
        let repo = InMemoryItemRepository::default();

        assert!(repo.save(Item::new("Milk").with_shelf_life_days(7)).await.expect("save"));
        assert!(!repo.save(Item::new("Milk").with_shelf_life_days(1)).await.expect("save"));

        let milk = repo.find_by_name(&ItemName::from("Milk")).await.expect("find");
        assert_eq!(milk.and_then(|item| item.shelf_life_days), Some(7));
    }

    #[tokio::test]
    async fn in_memory_inventory_repo_consumes_without_deleting() {
        let items = Arc::new(InMemoryItemRepository::default());
        let repo = InMemoryInventoryRepository::with_items(Arc::clone(&items));
        let eggs = Item::new("Eggs").with_shelf_life_days(21);
        items.save(eggs.clone()).await.expect("save eggs");

        let entry = InventoryEntry::acquire(&eggs, 6, Utc::now()).expect("acquire");
        repo.add(entry.clone()).await.expect("add");

        assert!(repo.deactivate(&entry.id).await.expect("deactivate"));
        assert!(repo.list_active().await.expect("list").is_empty());
        assert!(repo.find_by_id(&entry.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn in_memory_inventory_repo_rejects_unknown_items() {
        let repo = InMemoryInventoryRepository::default();
        let entry = InventoryEntry::acquire(&Item::new("Saffron"), 1, Utc::now()).expect("acquire");

        let error = repo.add(entry).await.expect_err("unknown item");
        assert!(matches!(error, RepositoryError::UnknownItem(_)));
    }

    #[tokio::test]
    async fn in_memory_inventory_sees_items_saved_after_construction() {
        let items = Arc::new(InMemoryItemRepository::default());
        let repo = InMemoryInventoryRepository::with_items(Arc::clone(&items));
        let milk = Item::new("Milk").with_shelf_life_days(7);
        let entry = InventoryEntry::acquire(&milk, 1, Utc::now()).expect("acquire");

        assert!(repo.add(entry.clone()).await.is_err());
        items.save(milk).await.expect("save milk");

        let stored = repo.add(entry).await.expect("add");
        assert!(stored.expiry_date.is_some());
        assert_eq!(repo.list_active().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn in_memory_meal_repo_keeps_colliding_names_apart() {
        let meals = InMemoryMealRepository::default();

        let first = meals.save(Meal::new("Mac & Cheese", ["Macaroni", "Cheese"])).await;
        let second = meals.save(Meal::new("Mac and Cheese", ["Macaroni", "Milk"])).await;
        let resaved = meals.save(Meal::new("Mac & Cheese", ["Macaroni"])).await;

        assert_eq!(first.expect("first").as_str(), "mac-and-cheese");
        assert_eq!(second.expect("second").as_str(), "mac-and-cheese-2");
        assert_eq!(resaved.expect("resave").as_str(), "mac-and-cheese");
        let catalog = meals.list_catalog().await.expect("catalog");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.meals[0].required_items.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_catalog_feeds_engine() {
        let meals = InMemoryMealRepository::default();
        let recommendations = InMemoryRecommendationRepository::default();
        meals.save(Meal::new("Cheese Plate", ["Cheese", "Crackers"])).await.expect("save");
        meals.save(Meal::new("Garlic Bread", ["Bread", "Garlic", "Bread"])).await.expect("save");

        let catalog = meals.list_catalog().await.expect("catalog");
        assert_eq!(catalog.meals[1].required_items.len(), 2);

        let batch = RecommendationEngine::new()
            .generate_recommendations(&InventorySnapshot::from_available(["Bread"]), &catalog);
        recommendations.save_batch(&batch).await.expect("save batch");

        let latest = recommendations.latest_batch().await.expect("latest");
        assert_eq!(latest, Some(batch));
    }
}
