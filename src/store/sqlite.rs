use super::RecordStore;
use crate::error::InventoryError;
use crate::expiry::Expiry;
use crate::ledger::{Expense, Sale};
use crate::product::{Product, ProductId};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::{debug, info};

/// SQLite backend: one owned connection for the lifetime of the store.
///
/// Single-row writes run in autocommit; anything that touches more than one
/// row (stock change + ledger entry, bulk delete, expiry pass) is wrapped in
/// an explicit transaction.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Products Table (one row per caller-supplied ID)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL CHECK (price > 0),
            quantity REAL NOT NULL CHECK (quantity >= 0),
            measurement TEXT NOT NULL,
            expiry TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME
        )",
        [],
    )?;

    // ==========================================================================
    // Ledger Tables (append-only)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sales (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            product_id INTEGER NOT NULL,
            product_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit_price REAL NOT NULL,
            revenue REAL NOT NULL,
            bill_id TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            product_id INTEGER NOT NULL,
            product_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            total_cost REAL NOT NULL,
            supplier TEXT
        )",
        [],
    )?;

    // Databases created by earlier versions
    ensure_column(conn, "products", "category", "TEXT NOT NULL DEFAULT ''")?;
    ensure_column(conn, "products", "updated_at", "DATETIME")?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sales_timestamp ON sales(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_timestamp ON expenses(timestamp)",
        [],
    )?;

    Ok(())
}

/// Add a column to an existing table if it is not there yet.
fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> Result<()> {
    let existing: Vec<String> = {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        columns
    };

    if !existing.iter().any(|c| c == column) {
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
            [],
        )?;
        info!(table, column, "migrated: column added");
    }

    Ok(())
}

fn product_from_row(row: &Row) -> rusqlite::Result<Product> {
    let measurement: String = row.get(5)?;
    let expiry: String = row.get(6)?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
        quantity: row.get(4)?,
        measurement: measurement.parse().map_err(|e: InventoryError| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
        })?,
        expiry: Expiry::parse(&expiry),
    })
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn write_product(conn: &Connection, product: &Product) -> Result<()> {
    let changed = conn.execute(
        "UPDATE products
         SET name = ?2, category = ?3, price = ?4, quantity = ?5,
             measurement = ?6, expiry = ?7, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        params![
            product.id,
            product.name,
            product.category,
            product.price,
            product.quantity,
            product.measurement.as_str(),
            product.expiry.as_stored(),
        ],
    )?;

    if changed == 0 {
        bail!("product {} is not stored", product.id);
    }
    Ok(())
}

fn insert_sale(conn: &Connection, sale: &Sale) -> Result<()> {
    conn.execute(
        "INSERT INTO sales (
            entry_id, timestamp, product_id, product_name, quantity, unit_price, revenue, bill_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            sale.entry_id,
            sale.timestamp.to_rfc3339(),
            sale.product_id,
            sale.product_name,
            sale.quantity,
            sale.unit_price,
            sale.revenue,
            sale.bill_id,
        ],
    )?;
    Ok(())
}

fn insert_expense(conn: &Connection, expense: &Expense) -> Result<()> {
    conn.execute(
        "INSERT INTO expenses (
            entry_id, timestamp, product_id, product_name, quantity, total_cost, supplier
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            expense.entry_id,
            expense.timestamp.to_rfc3339(),
            expense.product_id,
            expense.product_name,
            expense.quantity,
            expense.total_cost,
            expense.supplier,
        ],
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load_products(&mut self) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, price, quantity, measurement, expiry
             FROM products
             ORDER BY id",
        )?;

        let products = stmt
            .query_map([], product_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read products")?;

        Ok(products)
    }

    fn insert_product(&mut self, product: &Product) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO products (id, name, category, price, quantity, measurement, expiry)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    product.id,
                    product.name,
                    product.category,
                    product.price,
                    product.quantity,
                    product.measurement.as_str(),
                    product.expiry.as_stored(),
                ],
            )
            .with_context(|| format!("Failed to insert product {}", product.id))?;
        Ok(())
    }

    fn update_products(&mut self, products: &[Product]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for product in products {
            write_product(&tx, product)?;
        }
        tx.commit()?;
        debug!(count = products.len(), "products updated");
        Ok(())
    }

    fn delete_products(&mut self, ids: &[ProductId]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        for id in ids {
            removed += tx.execute("DELETE FROM products WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn record_sale(&mut self, product: &Product, sale: &Sale) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_product(&tx, product)?;
        insert_sale(&tx, sale)?;
        tx.commit()?;
        Ok(())
    }

    fn record_purchase(&mut self, product: &Product, expense: &Expense) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_product(&tx, product)?;
        insert_expense(&tx, expense)?;
        tx.commit()?;
        Ok(())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, timestamp, product_id, product_name, quantity, unit_price, revenue, bill_id
             FROM sales
             ORDER BY id",
        )?;

        let sales = stmt
            .query_map([], |row| {
                let timestamp: String = row.get(1)?;
                Ok(Sale {
                    entry_id: row.get(0)?,
                    timestamp: parse_timestamp(1, &timestamp)?,
                    product_id: row.get(2)?,
                    product_name: row.get(3)?,
                    quantity: row.get(4)?,
                    unit_price: row.get(5)?,
                    revenue: row.get(6)?,
                    bill_id: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sales)
    }

    fn expenses(&self) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, timestamp, product_id, product_name, quantity, total_cost, supplier
             FROM expenses
             ORDER BY id",
        )?;

        let expenses = stmt
            .query_map([], |row| {
                let timestamp: String = row.get(1)?;
                Ok(Expense {
                    entry_id: row.get(0)?,
                    timestamp: parse_timestamp(1, &timestamp)?,
                    product_id: row.get(2)?,
                    product_name: row.get(3)?,
                    quantity: row.get(4)?,
                    total_cost: row.get(5)?,
                    supplier: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(expenses)
    }
}
