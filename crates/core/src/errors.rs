use thiserror::Error;

use crate::domain::meal::MealId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("meal `{meal_id}` has no required items")]
    EmptyMealRequirements { meal_id: MealId },
    #[error("inventory quantity for `{item}` must be greater than zero")]
    InvalidQuantity { item: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable label used in command outcomes and structured logs.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::EmptyMealRequirements { .. }) => "data_integrity",
            Self::Domain(_) => "invalid_input",
            Self::Persistence(_) => "persistence",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Persistence(_) => 5,
            Self::Domain(_) => 6,
        }
    }
}
