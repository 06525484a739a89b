use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::item::{Item, ItemName};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryEntryId(pub String);

impl InventoryEntryId {
    pub fn generate() -> Self {
        Self(format!("inv-{}", Uuid::new_v4()))
    }
}

/// One unit or batch of an item currently held.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: InventoryEntryId,
    pub item_name: ItemName,
    pub acquired_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub cost: Option<Decimal>,
    pub quantity: u32,
    pub unit: Option<String>,
    pub bin_name: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl InventoryEntry {
    /// Record a fresh acquisition of `item`. Expiry follows the item's shelf life.
    pub fn acquire(
        item: &Item,
        quantity: u32,
        acquired_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { item: item.name.to_string() });
        }

        Ok(Self {
            id: InventoryEntryId::generate(),
            item_name: item.name.clone(),
            acquired_at,
            expiry_date: item.expiry_from(acquired_at),
            cost: None,
            quantity,
            unit: None,
            bin_name: None,
            notes: None,
            is_active: true,
        })
    }

    pub fn is_available(&self) -> bool {
        self.is_active && self.quantity > 0
    }

    /// Consumption keeps the row for history and only clears the active flag.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn stock_record(&self) -> StockRecord {
        StockRecord {
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            is_active: self.is_active,
        }
    }
}

/// The only view of an inventory entry the recommendation engine needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub item_name: ItemName,
    pub quantity: u32,
    pub is_active: bool,
}

impl StockRecord {
    pub fn active(item_name: impl Into<ItemName>, quantity: u32) -> Self {
        Self { item_name: item_name.into(), quantity, is_active: true }
    }

    pub fn inactive(item_name: impl Into<ItemName>, quantity: u32) -> Self {
        Self { item_name: item_name.into(), quantity, is_active: false }
    }

    pub fn is_available(&self) -> bool {
        self.is_active && self.quantity > 0
    }
}

/// Immutable inventory view handed to the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub records: Vec<StockRecord>,
}

impl InventorySnapshot {
    pub fn new(records: Vec<StockRecord>) -> Self {
        Self { records }
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a InventoryEntry>) -> Self {
        Self { records: entries.into_iter().map(InventoryEntry::stock_record).collect() }
    }

    /// Snapshot where every listed name is held once and active.
    pub fn from_available<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ItemName>,
    {
        Self { records: names.into_iter().map(|name| StockRecord::active(name, 1)).collect() }
    }

    pub fn available_item_names(&self) -> HashSet<ItemName> {
        self.records
            .iter()
            .filter(|record| record.is_available())
            .map(|record| record.item_name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::item::Item;
    use crate::errors::DomainError;

    use super::{InventoryEntry, InventorySnapshot, StockRecord};

    #[test]
    fn acquire_computes_expiry_from_shelf_life() {
        let now = Utc::now();
        let bread = Item::new("Bread").with_shelf_life_days(3);
        let entry = InventoryEntry::acquire(&bread, 1, now).expect("acquire bread");

        assert_eq!(entry.expiry_date, Some(now + Duration::days(3)));
        assert!(entry.is_available());
    }

    #[test]
    fn acquire_rejects_zero_quantity() {
        let error = InventoryEntry::acquire(&Item::new("Eggs"), 0, Utc::now())
            .expect_err("zero quantity should be rejected");
        assert!(matches!(error, DomainError::InvalidQuantity { .. }));
    }

    #[test]
    fn deactivated_entries_are_not_available() {
        let mut entry =
            InventoryEntry::acquire(&Item::new("Eggs"), 2, Utc::now()).expect("acquire");
        entry.deactivate();

        let snapshot = InventorySnapshot::from_entries([&entry]);
        assert!(snapshot.available_item_names().is_empty());
    }

    #[test]
    fn available_names_skip_inactive_and_empty_records() {
        let snapshot = InventorySnapshot::new(vec![
            StockRecord::active("Eggs", 2),
            StockRecord::active("Eggs", 1),
            StockRecord::active("Milk", 0),
            StockRecord::inactive("Bacon", 3),
            StockRecord::active("Bread", 1),
        ]);

        let available = snapshot.available_item_names();
        assert_eq!(available.len(), 2);
        assert!(available.contains("Eggs"));
        assert!(available.contains("Bread"));
    }
}
