// 📦 Product - the stock record
//
// One record per caller-supplied ID. Field names on disk match the existing
// inventory_db.json layout ("ID", "Name", "Price", ...), so files written by
// earlier versions load unchanged.

use crate::error::InventoryError;
use crate::expiry::Expiry;
use crate::money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ProductId = u32;

// ============================================================================
// MEASUREMENT KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    /// Discrete items
    #[serde(alias = "u", alias = "units")]
    Units,

    /// Weight, three decimals
    #[serde(alias = "kg", alias = "kilograms")]
    Kilograms,

    /// Volume, three decimals
    #[serde(alias = "l", alias = "liters")]
    Liters,

    /// Packets of any size, counted as discrete items
    #[serde(alias = "p", alias = "packets")]
    Packets,
}

impl MeasurementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Units => "Units",
            MeasurementKind::Kilograms => "Kilograms",
            MeasurementKind::Liters => "Liters",
            MeasurementKind::Packets => "Packets",
        }
    }

    pub fn short_code(&self) -> &'static str {
        match self {
            MeasurementKind::Units => "u",
            MeasurementKind::Kilograms => "kg",
            MeasurementKind::Liters => "l",
            MeasurementKind::Packets => "p",
        }
    }

    /// Units and packets are whole numbers; weight and volume are not.
    pub fn is_discrete(&self) -> bool {
        matches!(self, MeasurementKind::Units | MeasurementKind::Packets)
    }

    /// Normalize a quantity typed at creation time: truncate discrete
    /// kinds, round weight/volume to three decimals.
    pub fn normalize(&self, quantity: f64) -> f64 {
        if self.is_discrete() {
            money::truncate_quantity(quantity)
        } else {
            money::round_quantity(quantity)
        }
    }

    /// Validate a quantity moved in or out of stock.
    pub fn check_movement(&self, quantity: f64) -> Result<f64, InventoryError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(InventoryError::NonPositiveQuantity(quantity));
        }
        check_quantity_bound(quantity)?;
        if self.is_discrete() && !money::is_whole(quantity) {
            return Err(InventoryError::FractionalQuantity {
                kind: *self,
                quantity,
            });
        }

        let normalized = self.normalize(quantity);
        if normalized <= 0.0 {
            return Err(InventoryError::NonPositiveQuantity(quantity));
        }
        Ok(normalized)
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u" | "unit" | "units" => Ok(MeasurementKind::Units),
            "kg" | "kilogram" | "kilograms" => Ok(MeasurementKind::Kilograms),
            "l" | "liter" | "liters" | "litre" | "litres" => Ok(MeasurementKind::Liters),
            "p" | "packet" | "packets" => Ok(MeasurementKind::Packets),
            _ => Err(InventoryError::InvalidMeasurement(s.trim().to_string())),
        }
    }
}

fn default_measurement() -> MeasurementKind {
    MeasurementKind::Units
}

// ============================================================================
// PRODUCT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ID")]
    pub id: ProductId,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Category", default)]
    pub category: String,

    #[serde(rename = "Price")]
    pub price: f64,

    #[serde(rename = "Quantity")]
    pub quantity: f64,

    #[serde(rename = "Measurement Category", default = "default_measurement")]
    pub measurement: MeasurementKind,

    #[serde(rename = "Expiry Date", default)]
    pub expiry: Expiry,
}

impl Product {
    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }

    /// price × quantity, rounded to cents
    pub fn stock_value(&self) -> Result<f64, InventoryError> {
        money::line_total(self.quantity, self.price)
    }

    /// Case-normalized name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == title_case(name)
    }
}

/// Caller input for the add operation, validated into a `Product`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    pub quantity: f64,
    pub measurement: MeasurementKind,
    /// DD-MM-YYYY
    pub expiry: String,
}

impl NewProduct {
    /// Check every field and build the stored record.
    ///
    /// A date already in the past is accepted but stored as expired.
    pub fn validate(self, today: NaiveDate) -> Result<Product, InventoryError> {
        let name = title_case(&self.name);
        if name.is_empty() {
            return Err(InventoryError::EmptyName);
        }

        check_price(self.price)?;

        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(InventoryError::NonPositiveQuantity(self.quantity));
        }
        check_quantity_bound(self.quantity)?;
        let quantity = self.measurement.normalize(self.quantity);
        if quantity <= 0.0 {
            return Err(InventoryError::NonPositiveQuantity(self.quantity));
        }

        let date = Expiry::parse_date(&self.expiry)?;

        Ok(Product {
            id: self.id,
            name,
            category: self.category.trim().to_string(),
            price: self.price,
            quantity,
            measurement: self.measurement,
            expiry: Expiry::on(date).classify(today),
        })
    }
}

pub fn check_price(price: f64) -> Result<f64, InventoryError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(InventoryError::NonPositivePrice(price));
    }
    if price > money::MAX_PRICE {
        return Err(InventoryError::TooLarge {
            field: "Price",
            value: price,
            max: money::MAX_PRICE,
        });
    }
    Ok(price)
}

/// Stock levels and movements stay at or below `MAX_QUANTITY`.
pub fn check_quantity_bound(quantity: f64) -> Result<f64, InventoryError> {
    if quantity > money::MAX_QUANTITY {
        return Err(InventoryError::TooLarge {
            field: "Quantity",
            value: quantity,
            max: money::MAX_QUANTITY,
        });
    }
    Ok(quantity)
}

/// Title-case a product name: first cased letter of every word upper,
/// the rest lower. Words are split on any non-cased character, so
/// "o'neil's rice-2kg" becomes "O'Neil'S Rice-2Kg". Idempotent.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_cased = false;

    for ch in raw.trim().chars() {
        let cased = ch.is_uppercase() || ch.is_lowercase();
        if !cased {
            out.push(ch);
            prev_cased = false;
            continue;
        }

        if prev_cased {
            out.extend(ch.to_lowercase());
        } else {
            // Multi-char uppercase forms ("ß" -> "SS") keep only the first upper
            let mut upper = ch.to_uppercase();
            if let Some(first) = upper.next() {
                out.push(first);
            }
            for rest in upper {
                out.extend(rest.to_lowercase());
            }
        }
        prev_cased = true;
    }

    out
}
