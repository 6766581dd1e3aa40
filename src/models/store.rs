use serde::{Deserialize, Serialize};

/// Catalog entry in the point shop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreItem {
    pub id: Option<i64>,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: i64,
    pub created_at: Option<String>,
}

impl StoreItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StoreValidationError> {
        if self.name.trim().is_empty() {
            return Err(StoreValidationError::EmptyName);
        }
        if self.category.trim().is_empty() {
            return Err(StoreValidationError::EmptyCategory);
        }
        if self.price < 0 {
            return Err(StoreValidationError::NegativePrice);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreValidationError {
    #[error("item name must not be empty")]
    EmptyName,
    #[error("item category must not be empty")]
    EmptyCategory,
    #[error("item price cannot be negative")]
    NegativePrice,
    #[error("placement coordinates must be finite")]
    InvalidPlacement,
}

impl From<StoreValidationError> for crate::utils::AppError {
    fn from(err: StoreValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

/// An owned item, optionally placed in the user's room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    /// Category at the time of purchase
    pub category: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub is_placed: bool,
    pub priority: i64,
    pub acquired_at: Option<String>,
}

/// Where to put an owned item in the room
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub priority: i64,
}

impl Placement {
    pub fn validate(&self) -> Result<(), StoreValidationError> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(StoreValidationError::InvalidPlacement);
        }
        Ok(())
    }
}
