// ⚠️ Inventory Errors
// Validation failures are recoverable: the menu re-prompts, the API answers 4xx.
// Storage failures carry the anyhow chain from the store layer.

use crate::product::{MeasurementKind, ProductId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Product ID {0} already exists")]
    DuplicateId(ProductId),

    #[error("No product found with ID: {0}")]
    NotFound(ProductId),

    #[error("No product found with name: {0}")]
    NameNotFound(String),

    #[error("Cannot remove {requested} of {name}: only {available} in stock")]
    InsufficientStock {
        name: String,
        requested: f64,
        available: f64,
    },

    #[error("Price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(f64),

    #[error("{kind} are counted in whole numbers, got {quantity}")]
    FractionalQuantity {
        kind: MeasurementKind,
        quantity: f64,
    },

    #[error("Invalid date '{0}': expected DD-MM-YYYY")]
    InvalidDate(String),

    #[error("Unknown measurement '{0}': expected u, kg, l or p")]
    InvalidMeasurement(String),

    #[error("Product name cannot be empty")]
    EmptyName,

    #[error("{field} {value} exceeds the maximum of {max}")]
    TooLarge {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("Value {0} cannot be represented exactly")]
    OutOfRange(f64),

    #[error("Arithmetic overflow in stock or money total")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl InventoryError {
    /// True for errors caused by caller input rather than the store.
    pub fn is_validation(&self) -> bool {
        !matches!(self, InventoryError::Storage(_))
    }
}
