// 🏬 Inventory - the service every surface talks to
//
// Owns one RecordStore plus an index of every product by ID. Each mutation
// validates against the index, writes through the store, and only then
// updates the index, so a failed write leaves both sides unchanged.

use crate::error::InventoryError;
use crate::expiry::{self, classify_products, ClassificationReport};
use crate::ledger::{Expense, LedgerTotals, Sale};
use crate::lookup::{Lookup, Resolution};
use crate::money;
use crate::product::{
    check_price, check_quantity_bound, title_case, NewProduct, Product, ProductId,
};
use crate::store::RecordStore;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Source of "today" for expiry checks
pub type Clock = Box<dyn Fn() -> NaiveDate + Send>;

/// Local calendar date
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct Inventory {
    store: Box<dyn RecordStore + Send>,
    products: BTreeMap<ProductId, Product>,
    clock: Clock,
    /// Outcome of the most recent classifier pass
    last_report: ClassificationReport,
}

/// Stock overview
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub active_products: usize,
    pub expired_products: usize,
    /// Σ price × quantity over active products
    pub active_stock_value: f64,
    pub expired_stock_value: f64,
}

impl Inventory {
    /// Open with the local wall-clock date.
    pub fn open(store: Box<dyn RecordStore + Send>) -> Result<Self, InventoryError> {
        Self::open_with_clock(store, Box::new(local_today))
    }

    pub fn open_with_clock(
        store: Box<dyn RecordStore + Send>,
        clock: Clock,
    ) -> Result<Self, InventoryError> {
        let mut inventory = Self {
            store,
            products: BTreeMap::new(),
            clock,
            last_report: ClassificationReport::default(),
        };
        inventory.load()?;
        Ok(inventory)
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    // ========================================================================
    // LOAD & CLASSIFY
    // ========================================================================

    /// Re-read the store, expire past-dated products (persisted immediately)
    /// and return (active, expired).
    pub fn load(&mut self) -> Result<(Vec<Product>, Vec<Product>), InventoryError> {
        let products = self.store.load_products()?;
        self.products = products.into_iter().map(|p| (p.id, p)).collect();

        let report = self.reclassify()?;
        let (active, expired) = expiry::partition(self.products.values().cloned().collect());

        info!(
            backend = self.store.name(),
            active = active.len(),
            expired = expired.len(),
            newly_expired = report.newly_expired.len(),
            "inventory loaded"
        );
        Ok((active, expired))
    }

    /// Run the lifecycle classifier against today's date.
    pub fn reclassify(&mut self) -> Result<ClassificationReport, InventoryError> {
        let today = self.today();
        let mut candidates: Vec<Product> = self.products.values().cloned().collect();
        let report = classify_products(candidates.iter_mut(), today);

        if report.changed() {
            let flipped: Vec<Product> = candidates
                .into_iter()
                .filter(|p| report.newly_expired.contains(&p.id))
                .collect();

            self.store.update_products(&flipped)?;
            for product in flipped {
                self.products.insert(product.id, product);
            }
        }

        self.last_report = report.clone();
        Ok(report)
    }

    pub fn last_classification(&self) -> &ClassificationReport {
        &self.last_report
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products, ordered by ID
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn active(&self) -> Vec<&Product> {
        self.products.values().filter(|p| !p.is_expired()).collect()
    }

    pub fn expired(&self) -> Vec<&Product> {
        self.products.values().filter(|p| p.is_expired()).collect()
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.contains_key(&id)
    }

    /// Every product whose name matches after title-casing.
    pub fn find_by_name(&self, name: &str) -> Vec<&Product> {
        let wanted = title_case(name);
        self.products.values().filter(|p| p.name == wanted).collect()
    }

    /// First product with this name.
    pub fn search(&self, name: &str) -> Option<&Product> {
        self.find_by_name(name).into_iter().next()
    }

    pub fn resolve(&self, lookup: &Lookup) -> Resolution {
        match lookup {
            Lookup::Id(id) if self.contains(*id) => Resolution::Unique(*id),
            Lookup::Id(_) => Resolution::NotFound,
            Lookup::Name(name) => {
                Resolution::from_matches(self.find_by_name(name).iter().map(|p| p.id).collect())
            }
        }
    }

    fn require(&self, id: ProductId) -> Result<&Product, InventoryError> {
        self.products.get(&id).ok_or(InventoryError::NotFound(id))
    }

    pub fn summary(&self) -> Result<InventorySummary, InventoryError> {
        let (active, expired): (Vec<&Product>, Vec<&Product>) =
            self.products.values().partition(|p| !p.is_expired());

        Ok(InventorySummary {
            total_products: self.products.len(),
            active_products: active.len(),
            expired_products: expired.len(),
            active_stock_value: stock_value_of(&active)?,
            expired_stock_value: stock_value_of(&expired)?,
        })
    }

    pub fn sales(&self) -> Result<Vec<Sale>, InventoryError> {
        Ok(self.store.sales()?)
    }

    pub fn expenses(&self) -> Result<Vec<Expense>, InventoryError> {
        Ok(self.store.expenses()?)
    }

    pub fn ledger_totals(&self) -> Result<LedgerTotals, InventoryError> {
        LedgerTotals::from_entries(&self.sales()?, &self.expenses()?)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Add a new product. IDs must be unique.
    pub fn add(&mut self, new: NewProduct) -> Result<&Product, InventoryError> {
        if self.contains(new.id) {
            return Err(InventoryError::DuplicateId(new.id));
        }

        let product = new.validate(self.today())?;
        self.store.insert_product(&product)?;
        info!(id = product.id, name = %product.name, quantity = product.quantity, "product added");

        let id = product.id;
        Ok(self.products.entry(id).or_insert(product))
    }

    /// Take stock out and append a Sale. Fails without side effects when
    /// `quantity` exceeds current stock.
    pub fn sell(
        &mut self,
        id: ProductId,
        quantity: f64,
        bill_id: Option<String>,
    ) -> Result<Sale, InventoryError> {
        let current = self.require(id)?.clone();
        let quantity = current.measurement.check_movement(quantity)?;

        if money::exceeds(quantity, current.quantity)? {
            return Err(InventoryError::InsufficientStock {
                name: current.name,
                requested: quantity,
                available: current.quantity,
            });
        }

        let mut updated = current;
        updated.quantity = money::add_quantities(updated.quantity, -quantity)?;
        let sale = Sale::new(&updated, quantity, bill_id)?;

        self.store.record_sale(&updated, &sale)?;
        info!(id, quantity, revenue = sale.revenue, remaining = updated.quantity, "sale recorded");

        self.products.insert(id, updated);
        Ok(sale)
    }

    /// Put stock in and append an Expense. `unit_cost` defaults to the
    /// current selling price.
    pub fn purchase(
        &mut self,
        id: ProductId,
        quantity: f64,
        unit_cost: Option<f64>,
        supplier: Option<String>,
    ) -> Result<Expense, InventoryError> {
        let current = self.require(id)?.clone();
        let quantity = current.measurement.check_movement(quantity)?;
        let unit_cost = match unit_cost {
            Some(cost) => check_price(cost)?,
            None => current.price,
        };

        let mut updated = current;
        let stock = money::add_quantities(updated.quantity, quantity)?;
        updated.quantity = check_quantity_bound(stock)?;
        let expense = Expense::new(&updated, quantity, unit_cost, supplier)?;

        self.store.record_purchase(&updated, &expense)?;
        info!(id, quantity, cost = expense.total_cost, stock = updated.quantity, "purchase recorded");

        self.products.insert(id, updated);
        Ok(expense)
    }

    /// Signed stock correction with no ledger entry.
    pub fn adjust_quantity(&mut self, id: ProductId, delta: f64) -> Result<&Product, InventoryError> {
        let current = self.require(id)?.clone();
        if delta == 0.0 {
            return self.require(id);
        }

        let magnitude = current.measurement.check_movement(delta.abs())?;
        let signed = if delta < 0.0 { -magnitude } else { magnitude };

        if signed < 0.0 && money::exceeds(magnitude, current.quantity)? {
            return Err(InventoryError::InsufficientStock {
                name: current.name,
                requested: magnitude,
                available: current.quantity,
            });
        }

        let mut updated = current;
        let stock = money::add_quantities(updated.quantity, signed)?;
        updated.quantity = check_quantity_bound(stock)?;
        self.store.update_products(std::slice::from_ref(&updated))?;
        debug!(id, delta = signed, stock = updated.quantity, "stock adjusted");

        self.products.insert(id, updated);
        self.require(id)
    }

    pub fn update_price(&mut self, id: ProductId, new_price: f64) -> Result<&Product, InventoryError> {
        let price = check_price(new_price)?;
        let mut updated = self.require(id)?.clone();
        updated.price = price;

        self.store.update_products(std::slice::from_ref(&updated))?;
        info!(id, price, "price updated");

        self.products.insert(id, updated);
        self.require(id)
    }

    pub fn delete(&mut self, id: ProductId) -> Result<Product, InventoryError> {
        self.require(id)?;
        self.store.delete_products(&[id])?;

        let removed = self
            .products
            .remove(&id)
            .ok_or(InventoryError::NotFound(id))?;
        info!(id, name = %removed.name, "product deleted");
        Ok(removed)
    }

    /// Remove every product with this name in one store call.
    pub fn delete_by_name(&mut self, name: &str) -> Result<Vec<Product>, InventoryError> {
        let ids: Vec<ProductId> = self.find_by_name(name).iter().map(|p| p.id).collect();
        if ids.is_empty() {
            return Err(InventoryError::NameNotFound(title_case(name)));
        }

        self.store.delete_products(&ids)?;
        let removed: Vec<Product> = ids.iter().filter_map(|id| self.products.remove(id)).collect();
        info!(name = %title_case(name), count = removed.len(), "products deleted by name");
        Ok(removed)
    }
}
