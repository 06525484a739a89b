use std::str::FromStr;

use chrono::{Duration, Utc};
use expireassist_core::config::LoadOptions;
use expireassist_core::domain::inventory::{InventoryEntry, InventoryEntryId};
use expireassist_core::domain::item::ItemName;
use expireassist_db::DbPool;
use expireassist_db::repositories::{
    InventoryRepository, ItemRepository, RepositoryError, SqlInventoryRepository,
    SqlItemRepository,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::commands::{load_config, repository_failure, with_database, CommandResult, Failure};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryAction {
    List,
    Add(AddStock),
    Consume { entry_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddStock {
    pub item: String,
    pub quantity: u32,
    pub unit: Option<String>,
    pub bin: Option<String>,
    pub cost: Option<String>,
    pub notes: Option<String>,
}

pub fn run(action: InventoryAction) -> CommandResult {
    let config = match load_config("inventory", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    match action {
        InventoryAction::List => {
            let result = with_database("inventory", &config, |pool| async move {
                SqlInventoryRepository::new(pool).list_active().await.map_err(repository_failure)
            });
            match result {
                Ok(entries) => CommandResult::success_with_data(
                    "inventory",
                    format!("{} active inventory entries", entries.len()),
                    &entries,
                ),
                Err(result) => result,
            }
        }
        InventoryAction::Add(stock) => {
            let cost = match parse_cost(stock.cost.as_deref()) {
                Ok(cost) => cost,
                Err(failure) => return CommandResult::failure("inventory", failure.0, failure.1, 6),
            };
            let shelf_life_days = config.inventory.default_shelf_life_days;
            let result = with_database("inventory", &config, |pool| async move {
                add_stock(pool, stock, cost, shelf_life_days).await
            });
            match result {
                Ok(entry) => CommandResult::success_with_data(
                    "inventory",
                    format!("added {} x {} as {}", entry.quantity, entry.item_name, entry.id.0),
                    &entry,
                ),
                Err(result) => result,
            }
        }
        InventoryAction::Consume { entry_id } => {
            let id = InventoryEntryId(entry_id);
            let lookup = id.clone();
            let result = with_database("inventory", &config, |pool| async move {
                let consumed = SqlInventoryRepository::new(pool)
                    .deactivate(&lookup)
                    .await
                    .map_err(repository_failure)?;
                if !consumed {
                    return Err((
                        "not_found",
                        format!("no active inventory entry `{}`", lookup.0),
                        6,
                    ));
                }
                info!(
                    event_name = "cli.inventory.consumed",
                    entry_id = %lookup.0,
                    "stock consumed"
                );
                Ok::<(), Failure>(())
            });
            match result {
                Ok(()) => CommandResult::success("inventory", format!("consumed {}", id.0)),
                Err(result) => result,
            }
        }
    }
}

/// Items without a shelf life of their own expire after `default_shelf_life_days`.
async fn add_stock(
    pool: DbPool,
    stock: AddStock,
    cost: Option<Decimal>,
    default_shelf_life_days: u32,
) -> Result<InventoryEntry, Failure> {
    let name = ItemName::new(stock.item.trim());
    let item = SqlItemRepository::new(pool.clone())
        .find_by_name(&name)
        .await
        .map_err(repository_failure)?
        .ok_or_else(|| repository_failure(RepositoryError::UnknownItem(name.to_string())))?;

    let mut entry = InventoryEntry::acquire(&item, stock.quantity, Utc::now())
        .map_err(|error| repository_failure(error.into()))?;
    if entry.expiry_date.is_none() {
        entry.expiry_date =
            Some(entry.acquired_at + Duration::days(i64::from(default_shelf_life_days)));
    }
    entry.cost = cost;
    entry.unit = stock.unit;
    entry.bin_name = stock.bin;
    entry.notes = stock.notes;

    let entry = SqlInventoryRepository::new(pool).add(entry).await.map_err(repository_failure)?;
    info!(
        event_name = "cli.inventory.added",
        item = %entry.item_name,
        quantity = entry.quantity,
        entry_id = %entry.id.0,
        "stock added"
    );
    Ok(entry)
}

fn parse_cost(raw: Option<&str>) -> Result<Option<Decimal>, Failure> {
    let Some(value) = raw else {
        return Ok(None);
    };

    match Decimal::from_str(value.trim()) {
        Ok(cost) if cost.is_sign_negative() => {
            Err(("invalid_input", format!("cost `{value}` must not be negative"), 6))
        }
        Ok(cost) => Ok(Some(cost)),
        Err(error) => Err(("invalid_input", format!("invalid cost `{value}`: {error}"), 6)),
    }
}
