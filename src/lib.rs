// Warehouse Inventory - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod error;
pub mod money;
pub mod product;
pub mod expiry;      // Lifecycle classifier
pub mod ledger;      // Sales + expenses history
pub mod store;       // Record store backends (json / sqlite / memory)
pub mod lookup;      // ID-or-name lookup and disambiguation
pub mod inventory;   // Service tying store, classifier and ledger together
pub mod menu;        // Numbered console menu
pub mod config;

#[cfg(feature = "server")]
pub mod api;         // REST API (axum)

// Re-export commonly used types
pub use error::InventoryError;
pub use product::{
    MeasurementKind, NewProduct, Product, ProductId,
    check_price, title_case,
};
pub use expiry::{
    Expiry, ClassificationReport,
    classify_products, partition,
    DATE_FORMAT, EXPIRED_SENTINEL,
};
pub use ledger::{Sale, Expense, Ledger, LedgerTotals};
pub use store::{
    RecordStore, Backend, open_store,
    JsonStore, MemoryStore, SqliteStore,
};
pub use lookup::{Lookup, Resolution};
pub use inventory::{Inventory, InventorySummary, Clock, local_today};
pub use menu::Menu;
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
