// 🧾 Ledger - append-only sales and expense history
// Entries are written once as a side effect of sell/purchase and never touched again.
// Product names are copied in, so history survives renames and deletes.

use crate::error::InventoryError;
use crate::money;
use crate::product::{Product, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sale (stock going out)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// quantity × unit_price at sale time
    pub revenue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<String>,
}

impl Sale {
    pub fn new(
        product: &Product,
        quantity: f64,
        bill_id: Option<String>,
    ) -> Result<Self, InventoryError> {
        Ok(Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            revenue: money::line_total(quantity, product.price)?,
            bill_id: non_empty(bill_id),
        })
    }
}

/// One purchase (stock coming in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: f64,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl Expense {
    pub fn new(
        product: &Product,
        quantity: f64,
        unit_cost: f64,
        supplier: Option<String>,
    ) -> Result<Self, InventoryError> {
        Ok(Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            total_cost: money::line_total(quantity, unit_cost)?,
            supplier: non_empty(supplier),
        })
    }
}

fn non_empty(tag: Option<String>) -> Option<String> {
    tag.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Full ledger as kept by the JSON backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

/// Aggregates over the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub sales_count: usize,
    pub revenue: f64,
    pub expenses_count: usize,
    pub cost: f64,
    /// revenue - cost
    pub margin: f64,
}

impl LedgerTotals {
    pub fn from_entries(sales: &[Sale], expenses: &[Expense]) -> Result<Self, InventoryError> {
        let revenue = money::sum_money(sales.iter().map(|s| s.revenue))?;
        let cost = money::sum_money(expenses.iter().map(|e| e.total_cost))?;

        Ok(Self {
            sales_count: sales.len(),
            revenue,
            expenses_count: expenses.len(),
            cost,
            margin: money::sum_money([revenue, -cost])?,
        })
    }
}
