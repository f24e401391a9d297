// JSON file backend
//
// Products live in a pretty-printed array (inventory_db.json layout, 4-space
// indent). The ledger lives next to it in <stem>_ledger.json. Both files are
// rewritten whole through a temp file + rename, so a crash mid-write leaves
// the previous version intact.

use super::RecordStore;
use crate::ledger::{Expense, Ledger, Sale};
use crate::product::{Product, ProductId};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct JsonStore {
    path: PathBuf,
    ledger_path: PathBuf,
    products: BTreeMap<ProductId, Product>,
    ledger: Ledger,
    /// Set when the product file could not be parsed or held duplicate IDs;
    /// the file is backed up before the first write replaces it.
    corrupt: bool,
    /// Same for the ledger file.
    ledger_corrupt: bool,
}

/// Result of reading one JSON file
enum ReadOutcome<T> {
    Missing,
    Corrupt(String),
    Loaded(T),
}

impl JsonStore {
    /// Nothing is read until `load_products`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ledger_path = Self::ledger_path_for(&path);

        Self {
            path,
            ledger_path,
            products: BTreeMap::new(),
            ledger: Ledger::default(),
            corrupt: false,
            ledger_corrupt: false,
        }
    }

    /// `inventory_db.json` → `inventory_db_ledger.json`
    pub fn ledger_path_for(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "inventory".to_string());
        path.with_file_name(format!("{}_ledger.json", stem))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    fn read_file<T: DeserializeOwned>(path: &Path) -> ReadOutcome<T> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        if text.trim().is_empty() {
            return ReadOutcome::Missing;
        }

        match serde_json::from_str(&text) {
            Ok(value) => ReadOutcome::Loaded(value),
            Err(e) => ReadOutcome::Corrupt(e.to_string()),
        }
    }

    fn write_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let tmp = path.with_extension("json.tmp");
        {
            let file = fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
            value
                .serialize(&mut ser)
                .with_context(|| format!("Failed to serialize {}", path.display()))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// `<file>.json` → `<file>.json.corrupt`
    fn back_up(path: &Path) -> Result<()> {
        let backup = path.with_extension("json.corrupt");
        fs::copy(path, &backup)
            .with_context(|| format!("Failed to back up unreadable {}", path.display()))?;
        warn!(backup = %backup.display(), "unreadable file backed up before overwrite");
        Ok(())
    }

    fn flush_products(&mut self) -> Result<()> {
        if self.corrupt {
            Self::back_up(&self.path)?;
            self.corrupt = false;
        }

        let products: Vec<&Product> = self.products.values().collect();
        Self::write_file(&self.path, &products)?;
        debug!(path = %self.path.display(), count = products.len(), "inventory file written");
        Ok(())
    }

    fn flush_ledger(&mut self) -> Result<()> {
        if self.ledger_corrupt {
            Self::back_up(&self.ledger_path)?;
            self.ledger_corrupt = false;
        }

        Self::write_file(&self.ledger_path, &self.ledger)
    }

    /// Rewrite the ledger after its last entry was popped because the
    /// product write failed.
    fn unwind_ledger(&mut self) {
        if let Err(e) = self.flush_ledger() {
            warn!(path = %self.ledger_path.display(), error = %e, "ledger entry could not be removed after failed stock write");
        }
    }

    fn ensure_stored(&self, id: ProductId) -> Result<()> {
        if !self.products.contains_key(&id) {
            bail!("product {} is not stored", id);
        }
        Ok(())
    }
}

impl RecordStore for JsonStore {
    fn name(&self) -> &'static str {
        "json"
    }

    /// Missing or corrupt files degrade to an empty inventory.
    fn load_products(&mut self) -> Result<Vec<Product>> {
        self.corrupt = false;
        self.ledger_corrupt = false;

        let products: Vec<Product> = match Self::read_file(&self.path) {
            ReadOutcome::Loaded(products) => products,
            ReadOutcome::Missing => Vec::new(),
            ReadOutcome::Corrupt(reason) => {
                warn!(path = %self.path.display(), %reason, "inventory file unreadable, starting empty");
                self.corrupt = true;
                Vec::new()
            }
        };

        self.products.clear();
        for product in products {
            if let Some(previous) = self.products.insert(product.id, product) {
                warn!(id = previous.id, "duplicate product ID in inventory file, keeping the later record");
                self.corrupt = true;
            }
        }

        self.ledger = match Self::read_file(&self.ledger_path) {
            ReadOutcome::Loaded(ledger) => ledger,
            ReadOutcome::Missing => Ledger::default(),
            ReadOutcome::Corrupt(reason) => {
                warn!(path = %self.ledger_path.display(), %reason, "ledger file unreadable, starting empty");
                self.ledger_corrupt = true;
                Ledger::default()
            }
        };

        Ok(self.products.values().cloned().collect())
    }

    fn insert_product(&mut self, product: &Product) -> Result<()> {
        if self.products.contains_key(&product.id) {
            bail!("product {} is already stored", product.id);
        }
        self.products.insert(product.id, product.clone());
        if let Err(e) = self.flush_products() {
            self.products.remove(&product.id);
            return Err(e);
        }
        Ok(())
    }

    fn update_products(&mut self, products: &[Product]) -> Result<()> {
        for product in products {
            self.ensure_stored(product.id)?;
        }

        let previous: Vec<Product> = products
            .iter()
            .filter_map(|p| self.products.insert(p.id, p.clone()))
            .collect();

        if let Err(e) = self.flush_products() {
            for old in previous {
                self.products.insert(old.id, old);
            }
            return Err(e);
        }
        Ok(())
    }

    fn delete_products(&mut self, ids: &[ProductId]) -> Result<usize> {
        let removed: Vec<Product> = ids.iter().filter_map(|id| self.products.remove(id)).collect();
        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.flush_products() {
            for old in removed {
                self.products.insert(old.id, old);
            }
            return Err(e);
        }
        Ok(removed.len())
    }

    fn record_sale(&mut self, product: &Product, sale: &Sale) -> Result<()> {
        self.ensure_stored(product.id)?;

        // Two files, no shared transaction: ledger first, unwound if the
        // product write fails.
        self.ledger.sales.push(sale.clone());
        if let Err(e) = self.flush_ledger() {
            self.ledger.sales.pop();
            return Err(e);
        }
        if let Err(e) = self.update_products(std::slice::from_ref(product)) {
            self.ledger.sales.pop();
            self.unwind_ledger();
            return Err(e);
        }
        Ok(())
    }

    fn record_purchase(&mut self, product: &Product, expense: &Expense) -> Result<()> {
        self.ensure_stored(product.id)?;

        self.ledger.expenses.push(expense.clone());
        if let Err(e) = self.flush_ledger() {
            self.ledger.expenses.pop();
            return Err(e);
        }
        if let Err(e) = self.update_products(std::slice::from_ref(product)) {
            self.ledger.expenses.pop();
            self.unwind_ledger();
            return Err(e);
        }
        Ok(())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.ledger.sales.clone())
    }

    fn expenses(&self) -> Result<Vec<Expense>> {
        Ok(self.ledger.expenses.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::Expiry;
    use crate::product::MeasurementKind;
    use tempfile::TempDir;

    fn sugar(id: ProductId) -> Product {
        Product {
            id,
            name: "Sugar".to_string(),
            category: "Baking".to_string(),
            price: 45.0,
            quantity: 2.5,
            measurement: MeasurementKind::Kilograms,
            expiry: Expiry::parse("01-06-2031"),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::open(dir.path().join("inventory_db.json"));

        assert!(store.load_products().unwrap().is_empty());
        assert!(store.sales().unwrap().is_empty());
    }

    #[test]
    fn test_insert_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(1)).unwrap();
        store.insert_product(&sugar(2)).unwrap();

        let mut reopened = JsonStore::open(&path);
        let products = reopened.load_products().unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0], sugar(1));
    }

    #[test]
    fn test_file_uses_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(9)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"ID\": 9"));
        assert!(text.contains("\"Measurement Category\": \"Kilograms\""));
        assert!(text.contains("\"Expiry Date\": \"01-06-2031\""));
        assert!(text.contains("\n        \"Name\""), "expected 4-space indent:\n{text}");
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty_and_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");
        fs::write(&path, "[{ not json").unwrap();

        let mut store = JsonStore::open(&path);
        assert!(store.load_products().unwrap().is_empty());

        // Untouched until something is written
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{ not json");

        store.insert_product(&sugar(1)).unwrap();
        let backup = path.with_extension("json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "[{ not json");
        assert_eq!(JsonStore::open(&path).load_products().unwrap().len(), 1);
    }

    #[test]
    fn test_sale_goes_to_ledger_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stock.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(1)).unwrap();

        let mut sold = sugar(1);
        sold.quantity = 1.5;
        let sale = Sale::new(&sold, 1.0, None).unwrap();
        store.record_sale(&sold, &sale).unwrap();

        assert!(dir.path().join("stock_ledger.json").exists());

        let mut reopened = JsonStore::open(&path);
        let products = reopened.load_products().unwrap();
        assert_eq!(products[0].quantity, 1.5);
        assert_eq!(reopened.sales().unwrap(), vec![sale]);
    }

    #[test]
    fn test_update_unknown_product_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::open(dir.path().join("inventory_db.json"));
        store.load_products().unwrap();

        assert!(store.update_products(&[sugar(5)]).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_delete_products() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");
        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        for id in 1..=3 {
            store.insert_product(&sugar(id)).unwrap();
        }

        assert_eq!(store.delete_products(&[1, 3, 42]).unwrap(), 2);
        let ids: Vec<ProductId> = JsonStore::open(&path)
            .load_products()
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_corrupt_ledger_is_backed_up_before_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stock.json");
        let ledger_path = dir.path().join("stock_ledger.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(1)).unwrap();
        fs::write(&ledger_path, "{\"sales\": [ truncated").unwrap();

        let mut store = JsonStore::open(&path);
        assert_eq!(store.load_products().unwrap().len(), 1);
        assert!(store.sales().unwrap().is_empty());
        assert_eq!(fs::read_to_string(&ledger_path).unwrap(), "{\"sales\": [ truncated");

        let mut sold = sugar(1);
        sold.quantity = 1.5;
        let sale = Sale::new(&sold, 1.0, None).unwrap();
        store.record_sale(&sold, &sale).unwrap();

        let backup = dir.path().join("stock_ledger.json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{\"sales\": [ truncated");

        let mut reopened = JsonStore::open(&path);
        reopened.load_products().unwrap();
        assert_eq!(reopened.sales().unwrap(), vec![sale]);
    }

    #[test]
    fn test_duplicate_ids_are_backed_up_before_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");
        let mut later = sugar(1);
        later.quantity = 9.0;
        let text = serde_json::to_string(&vec![sugar(1), later.clone()]).unwrap();
        fs::write(&path, &text).unwrap();

        let mut store = JsonStore::open(&path);
        assert_eq!(store.load_products().unwrap(), vec![later]);

        store.insert_product(&sugar(2)).unwrap();
        let backup = path.with_extension("json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), text);
        assert_eq!(JsonStore::open(&path).load_products().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_stock_write_removes_ledger_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(1)).unwrap();

        // A directory where the temp file goes makes every product write fail
        let blocker = path.with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();

        let mut sold = sugar(1);
        sold.quantity = 1.5;
        let sale = Sale::new(&sold, 1.0, None).unwrap();
        assert!(store.record_sale(&sold, &sale).is_err());
        assert!(store.sales().unwrap().is_empty());

        let mut bought = sugar(1);
        bought.quantity = 3.5;
        let expense = Expense::new(&bought, 1.0, 40.0, None).unwrap();
        assert!(store.record_purchase(&bought, &expense).is_err());
        assert!(store.expenses().unwrap().is_empty());
        assert_eq!(store.products[&1], sugar(1));

        fs::remove_dir(&blocker).unwrap();
        let mut reopened = JsonStore::open(&path);
        assert_eq!(reopened.load_products().unwrap(), vec![sugar(1)]);
        assert!(reopened.sales().unwrap().is_empty());
        assert!(reopened.expenses().unwrap().is_empty());
    }

    #[test]
    fn test_failed_flush_restores_memory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_db.json");

        let mut store = JsonStore::open(&path);
        store.load_products().unwrap();
        store.insert_product(&sugar(1)).unwrap();
        store.insert_product(&sugar(2)).unwrap();

        let blocker = path.with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();

        assert!(store.insert_product(&sugar(3)).is_err());

        let mut changed = sugar(1);
        changed.price = 99.0;
        assert!(store.update_products(&[changed]).is_err());

        assert!(store.delete_products(&[2]).is_err());

        let ids: Vec<ProductId> = store.products.keys().copied().collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.products[&1], sugar(1));

        fs::remove_dir(&blocker).unwrap();
        store.insert_product(&sugar(3)).unwrap();
        let products = JsonStore::open(&path).load_products().unwrap();
        assert_eq!(products, vec![sugar(1), sugar(2), sugar(3)]);
    }
}
