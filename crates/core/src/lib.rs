pub mod config;
pub mod domain;
pub mod errors;
pub mod recommendations;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::inventory::{InventoryEntry, InventoryEntryId, InventorySnapshot, StockRecord};
pub use domain::item::{Item, ItemName};
pub use domain::meal::{Meal, MealCatalog, MealId};
pub use domain::recommendation::{
    Recommendation, RecommendationBatch, RecommendationBatchId, RejectedMeal,
};
pub use errors::{ApplicationError, DomainError};
pub use recommendations::{RecommendationEngine, RecommendationFilter, TieBreak};
