// 🗄️ Record Store - persistence boundary for products and the ledger
//
// Three interchangeable backends:
// - memory: nothing on disk (tests, dry runs)
// - json:   inventory_db.json + sibling ledger file, rewritten atomically
// - sqlite: one owned connection, compound writes in explicit transactions
//
// The store never validates; the Inventory service checks every rule
// against its in-memory index before calling in here.

pub mod json;
pub mod memory;
pub mod sqlite;

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::ledger::{Expense, Sale};
use crate::product::{Product, ProductId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub trait RecordStore {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Read every stored product (no classification).
    fn load_products(&mut self) -> Result<Vec<Product>>;

    fn insert_product(&mut self, product: &Product) -> Result<()>;

    /// Overwrite existing records, all or nothing.
    fn update_products(&mut self, products: &[Product]) -> Result<()>;

    /// Returns how many records were removed.
    fn delete_products(&mut self, ids: &[ProductId]) -> Result<usize>;

    /// Persist the decremented product and append the sale atomically.
    fn record_sale(&mut self, product: &Product, sale: &Sale) -> Result<()>;

    /// Persist the incremented product and append the expense atomically.
    fn record_purchase(&mut self, product: &Product, expense: &Expense) -> Result<()>;

    fn sales(&self) -> Result<Vec<Sale>>;

    fn expenses(&self) -> Result<Vec<Expense>>;
}

/// Which backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Json,
    Sqlite,
    Memory,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Json => "json",
            Backend::Sqlite => "sqlite",
            Backend::Memory => "memory",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Backend::Json),
            "sqlite" | "sql" | "db" => Ok(Backend::Sqlite),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(anyhow::anyhow!(
                "unknown backend '{}': expected json, sqlite or memory",
                other
            )),
        }
    }
}

/// Open the configured backend at `path` (ignored for memory).
pub fn open_store(backend: Backend, path: &Path) -> Result<Box<dyn RecordStore + Send>> {
    let store: Box<dyn RecordStore + Send> = match backend {
        Backend::Json => Box::new(JsonStore::open(path)),
        Backend::Sqlite => Box::new(SqliteStore::open(path)?),
        Backend::Memory => Box::new(MemoryStore::new()),
    };

    tracing::debug!(backend = store.name(), path = %path.display(), "record store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("JSON".parse::<Backend>().unwrap(), Backend::Json);
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("mem".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("csv".parse::<Backend>().is_err());
    }

    #[test]
    fn test_open_memory_store() {
        let mut store = open_store(Backend::Memory, Path::new("unused")).unwrap();
        assert_eq!(store.name(), "memory");
        assert!(store.load_products().unwrap().is_empty());
    }
}
