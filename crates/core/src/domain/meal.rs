use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::item::ItemName;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealId(pub String);

impl MealId {
    /// Stable key derived from a meal name, e.g. `"Bacon & Eggs"` -> `"bacon-and-eggs"`.
    ///
    /// Non-ASCII letters and digits are spelled as code points (`"炒饭"` -> `"u7092-u996d"`).
    /// A name with nothing to spell falls back to `"meal"`. Distinct names can still share a
    /// slug, so stores suffix the id on save when it is already taken.
    pub fn from_name(name: &str) -> Self {
        let spelled = name.replace('&', " and ");
        let mut parts: Vec<String> = Vec::new();
        let mut word = String::new();
        for ch in spelled.chars() {
            if ch.is_ascii_alphanumeric() {
                word.push(ch.to_ascii_lowercase());
                continue;
            }
            if !word.is_empty() {
                parts.push(std::mem::take(&mut word));
            }
            if ch.is_alphanumeric() {
                parts.push(format!("u{:04x}", u32::from(ch)));
            }
        }
        if !word.is_empty() {
            parts.push(word);
        }

        if parts.is_empty() {
            return Self("meal".to_string());
        }
        Self(parts.join("-"))
    }

    /// `self` when `taken` rejects it, otherwise the first free `-2`, `-3`, ... variant.
    pub fn first_free(&self, mut taken: impl FnMut(&MealId) -> bool) -> MealId {
        if !taken(self) {
            return self.clone();
        }
        (2u32..)
            .map(|suffix| MealId(format!("{}-{suffix}", self.0)))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| self.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub id: MealId,
    pub name: String,
    pub description: Option<String>,
    /// Required items in catalog order. Presence only, no quantities.
    pub required_items: Vec<ItemName>,
}

impl Meal {
    pub fn new<I, N>(name: impl Into<String>, required_items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ItemName>,
    {
        let name = name.into();
        Self {
            id: MealId::from_name(&name),
            name,
            description: None,
            required_items: required_items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Required items with duplicates collapsed, first occurrence wins.
    pub fn requirements(&self) -> Vec<&ItemName> {
        let mut seen = HashSet::new();
        self.required_items.iter().filter(|item| seen.insert(item.as_str())).collect()
    }
}

/// Meals in catalog order. Order is the default tie-breaker when ranking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCatalog {
    pub meals: Vec<Meal>,
}

impl MealCatalog {
    pub fn new(meals: Vec<Meal>) -> Self {
        Self { meals }
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    pub fn find(&self, id: &MealId) -> Option<&Meal> {
        self.meals.iter().find(|meal| &meal.id == id)
    }
}

impl FromIterator<Meal> for MealCatalog {
    fn from_iter<T: IntoIterator<Item = Meal>>(iter: T) -> Self {
        Self { meals: iter.into_iter().collect() }
    }
}
