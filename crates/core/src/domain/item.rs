use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Catalog key for an item. Names are unique and never change once created.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemName(pub String);

impl ItemName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: ItemName,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub shelf_life_days: Option<u32>,
    pub photo_path: Option<String>,
}

impl Item {
    pub fn new(name: impl Into<ItemName>) -> Self {
        Self {
            name: name.into(),
            brand: None,
            category: None,
            shelf_life_days: None,
            photo_path: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_shelf_life_days(mut self, days: u32) -> Self {
        self.shelf_life_days = Some(days);
        self
    }

    /// Expiry for a batch acquired at `acquired_at`, when the shelf life is known.
    pub fn expiry_from(&self, acquired_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.shelf_life_days.map(|days| acquired_at + Duration::days(i64::from(days)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone, Utc};

    use super::{Item, ItemName};

    #[test]
    fn expiry_adds_shelf_life_to_acquisition() {
        let acquired_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("valid date");
        let milk = Item::new("Milk").with_category("Dairy").with_shelf_life_days(7);

        assert_eq!(milk.expiry_from(acquired_at), Some(acquired_at + Duration::days(7)));
    }

    #[test]
    fn expiry_is_unknown_without_shelf_life() {
        let item = Item::new("Basil");
        assert_eq!(item.expiry_from(Utc::now()), None);
    }

    #[test]
    fn item_names_can_be_looked_up_by_str() {
        let names: HashSet<ItemName> = ["Eggs", "Bread"].into_iter().map(ItemName::from).collect();
        assert!(names.contains("Eggs"));
        assert!(!names.contains("Bacon"));
    }
}
