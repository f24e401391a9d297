use super::RecordStore;
use crate::ledger::{Expense, Ledger, Sale};
use crate::product::{Product, ProductId};
use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Volatile store; everything is lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: BTreeMap<ProductId, Product>,
    ledger: Ledger,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records (later duplicates win).
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            ledger: Ledger::default(),
        }
    }

    fn replace(&mut self, product: &Product) -> Result<()> {
        match self.products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(())
            }
            None => bail!("product {} is not stored", product.id),
        }
    }
}

impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load_products(&mut self) -> Result<Vec<Product>> {
        Ok(self.products.values().cloned().collect())
    }

    fn insert_product(&mut self, product: &Product) -> Result<()> {
        if self.products.contains_key(&product.id) {
            bail!("product {} is already stored", product.id);
        }
        self.products.insert(product.id, product.clone());
        Ok(())
    }

    fn update_products(&mut self, products: &[Product]) -> Result<()> {
        if let Some(missing) = products.iter().find(|p| !self.products.contains_key(&p.id)) {
            bail!("product {} is not stored", missing.id);
        }
        for product in products {
            self.replace(product)?;
        }
        Ok(())
    }

    fn delete_products(&mut self, ids: &[ProductId]) -> Result<usize> {
        Ok(ids
            .iter()
            .filter(|id| self.products.remove(*id).is_some())
            .count())
    }

    fn record_sale(&mut self, product: &Product, sale: &Sale) -> Result<()> {
        self.replace(product)?;
        self.ledger.sales.push(sale.clone());
        Ok(())
    }

    fn record_purchase(&mut self, product: &Product, expense: &Expense) -> Result<()> {
        self.replace(product)?;
        self.ledger.expenses.push(expense.clone());
        Ok(())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.ledger.sales.clone())
    }

    fn expenses(&self) -> Result<Vec<Expense>> {
        Ok(self.ledger.expenses.clone())
    }
}
