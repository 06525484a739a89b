use std::collections::HashSet;
use std::str::FromStr;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use expireassist_core::domain::inventory::InventoryEntry;
use expireassist_core::domain::item::{Item, ItemName};
use expireassist_core::domain::meal::Meal;

use crate::connection::DbPool;
use crate::repositories::{
    InventoryRepository, ItemRepository, MealRepository, RepositoryError, SqlInventoryRepository,
    SqlItemRepository, SqlMealRepository,
};

/// Shelf life used for starter stock whose item has none, or a zero one.
const STARTER_FALLBACK_SHELF_LIFE_DAYS: u32 = 7;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("could not parse fixture: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not read fixture `{path}`: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid fixture value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Sample catalog, meals and starter stock for a fresh pantry.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleDataset {
    pub dataset_version: String,
    #[serde(default = "default_shelf_life_days")]
    pub default_shelf_life_days: u32,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub meals: Vec<MealRecord>,
    #[serde(default)]
    pub starter_inventory: StarterInventory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub shelf_life_days: Option<u32>,
}

/// `items` stays optional here so a broken record is reported instead of failing
/// the whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct MealRecord {
    pub name: String,
    pub description: Option<String>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StarterInventory {
    #[serde(default)]
    pub items: Vec<String>,
    pub cost: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub unit: Option<String>,
    pub bin: Option<String>,
}

fn default_shelf_life_days() -> u32 {
    7
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureIssue {
    pub record: String,
    pub problem: String,
}

#[derive(Debug, Default)]
pub struct SeedResult {
    pub items_inserted: usize,
    pub meals_saved: usize,
    pub inventory_added: usize,
    pub issues: Vec<FixtureIssue>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DatasetSummary {
    pub items: i64,
    pub inventory: i64,
    pub meals: i64,
    pub meal_items: i64,
}

impl SampleDataset {
    /// Fixture shipped with the repository.
    pub const TOML: &'static str = include_str!("../../../config/fixtures/sample_pantry.toml");

    pub fn bundled() -> Result<Self, FixtureError> {
        Self::parse(Self::TOML)
    }

    pub fn parse(raw: &str) -> Result<Self, FixtureError> {
        Ok(toml::from_str(raw)?)
    }

    /// Meal records that can be stored, and one issue per record that cannot.
    pub fn meals(&self) -> (Vec<Meal>, Vec<FixtureIssue>) {
        let mut meals = Vec::with_capacity(self.meals.len());
        let mut issues = Vec::new();

        for record in &self.meals {
            match &record.items {
                Some(items) => {
                    let mut meal = Meal::new(record.name.clone(), items.iter().map(String::as_str));
                    meal.description = record.description.clone();
                    meals.push(meal);
                }
                None => issues.push(FixtureIssue {
                    record: record.name.clone(),
                    problem: "meal record has no `items` field".to_string(),
                }),
            }
        }

        (meals, issues)
    }

    fn starter_cost(&self) -> Result<Option<Decimal>, FixtureError> {
        self.starter_inventory
            .cost
            .as_deref()
            .map(|value| {
                Decimal::from_str(value).map_err(|_| FixtureError::InvalidValue {
                    field: "starter_inventory.cost",
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    /// Load the dataset. Safe to repeat: items are insert-or-ignore, meals are
    /// upserted and starter stock is only added to an empty inventory.
    pub async fn load(&self, pool: &DbPool) -> Result<SeedResult, FixtureError> {
        let items = SqlItemRepository::new(pool.clone());
        let meals = SqlMealRepository::new(pool.clone())
            .with_default_shelf_life_days(self.default_shelf_life_days);
        let inventory = SqlInventoryRepository::new(pool.clone());

        let mut result = SeedResult::default();

        for record in &self.items {
            let item = Item {
                name: ItemName::from(record.name.as_str()),
                brand: record.brand.clone(),
                category: record.category.clone(),
                shelf_life_days: record.shelf_life_days,
                photo_path: None,
            };
            if items.save(item).await? {
                result.items_inserted += 1;
            }
        }

        let (valid_meals, issues) = self.meals();
        for issue in &issues {
            warn!(
                event_name = "fixtures.meal_skipped",
                meal = %issue.record,
                problem = %issue.problem,
                "skipping malformed meal record"
            );
        }
        result.issues.extend(issues);

        for meal in valid_meals {
            meals.save(meal).await?;
            result.meals_saved += 1;
        }

        let inventory_rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM inventory")
            .fetch_one(pool)
            .await
            .map_err(RepositoryError::from)?;
        if inventory_rows == 0 {
            result.inventory_added =
                self.add_starter_inventory(&items, &inventory, &mut result.issues).await?;
        }

        info!(
            event_name = "fixtures.sample_loaded",
            dataset_version = %self.dataset_version,
            items_inserted = result.items_inserted,
            meals_saved = result.meals_saved,
            inventory_added = result.inventory_added,
            issues = result.issues.len(),
            "sample pantry loaded"
        );

        Ok(result)
    }

    async fn add_starter_inventory(
        &self,
        items: &SqlItemRepository,
        inventory: &SqlInventoryRepository,
        issues: &mut Vec<FixtureIssue>,
    ) -> Result<usize, FixtureError> {
        let starter = &self.starter_inventory;
        let cost = self.starter_cost()?;
        let now = Utc::now();
        let mut added = 0;

        for name in &starter.items {
            let Some(item) = items.find_by_name(&ItemName::from(name.as_str())).await? else {
                issues.push(FixtureIssue {
                    record: name.clone(),
                    problem: "starter inventory references an unknown item".to_string(),
                });
                continue;
            };

            let shelf_life_days = item
                .shelf_life_days
                .filter(|days| *days > 0)
                .unwrap_or(STARTER_FALLBACK_SHELF_LIFE_DAYS);

            let mut entry = InventoryEntry::acquire(&item, starter.quantity, now)
                .map_err(RepositoryError::from)?;
            entry.expiry_date = Some(now + Duration::days(i64::from(shelf_life_days)));
            entry.cost = cost;
            entry.unit = starter.unit.clone();
            entry.bin_name = starter.bin.clone();
            entry.notes = Some(format!("sample {name}"));

            inventory.add(entry).await?;
            added += 1;
        }

        Ok(added)
    }

    /// Check that everything the dataset describes is present in the store.
    pub async fn verify(&self, pool: &DbPool) -> Result<VerificationResult, FixtureError> {
        let mut checks = Vec::new();
        let (valid_meals, _) = self.meals();

        let mut expected_items: HashSet<&str> =
            self.items.iter().map(|record| record.name.as_str()).collect();
        for meal in &valid_meals {
            expected_items.extend(meal.required_items.iter().map(ItemName::as_str));
        }

        let mut missing_items = 0usize;
        for name in &expected_items {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE name = ?1)")
                    .bind(*name)
                    .fetch_one(pool)
                    .await
                    .map_err(RepositoryError::from)?;
            if exists != 1 {
                missing_items += 1;
            }
        }
        checks.push(("catalog-items".to_string(), missing_items == 0));

        for meal in &valid_meals {
            let linked: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM meal_items mi
                 JOIN meals m ON m.id = mi.meal_id
                 WHERE m.id = ?1 AND m.name = ?2",
            )
            .bind(meal.id.as_str())
            .bind(&meal.name)
            .fetch_one(pool)
            .await
            .map_err(RepositoryError::from)?;
            checks.push((format!("meal:{}", meal.id), linked == meal.requirements().len() as i64));
        }

        for name in &self.starter_inventory.items {
            let held: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM inventory inv
                     JOIN items i ON i.id = inv.item_id
                     WHERE i.name = ?1 AND inv.is_active = 1)",
            )
            .bind(name.as_str())
            .fetch_one(pool)
            .await
            .map_err(RepositoryError::from)?;
            checks.push((format!("starter:{name}"), held == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Row counts for the pantry tables.
    pub async fn summary(pool: &DbPool) -> Result<DatasetSummary, RepositoryError> {
        let items: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM items").fetch_one(pool).await?;
        let inventory: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM inventory").fetch_one(pool).await?;
        let meals: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM meals").fetch_one(pool).await?;
        let meal_items: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM meal_items").fetch_one(pool).await?;

        Ok(DatasetSummary { items, inventory, meals, meal_items })
    }
}
