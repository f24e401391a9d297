// 📋 Console menu - the numbered 1-7 loop
//
// Reads one line per prompt from any BufRead and writes to any Write, so the
// whole flow can be driven by scripted input in tests. Validation errors are
// printed and re-prompted; storage errors end the session. End of input
// behaves like option 7.

use crate::error::InventoryError;
use crate::expiry::Expiry;
use crate::inventory::Inventory;
use crate::lookup::{Lookup, Resolution};
use crate::product::{check_price, MeasurementKind, NewProduct, Product, ProductId};
use anyhow::Result;
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::{debug, warn};

const MENU: &str = "1. Add Products
2. Remove Product
3. View Inventory
4. Update Inventory Stock
5. Search Product
6. Update Product Price
7. Exit
Select any operation to perform (write any number between 1 and 7):";

/// Input ran out
#[derive(Debug, thiserror::Error)]
#[error("end of input")]
struct EndOfInput;

pub struct Menu<'a, R, W> {
    inventory: &'a mut Inventory,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(inventory: &'a mut Inventory, input: R, output: W) -> Self {
        Self {
            inventory,
            input,
            output,
        }
    }

    /// Run until option 7 or end of input.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "Welcome to the Warehouse Inventory Management.")?;

        match self.run_loop() {
            Err(e) if e.is::<EndOfInput>() => {
                debug!("input closed, leaving menu");
                writeln!(self.output, "\nExiting the program. Goodbye!")?;
                Ok(())
            }
            other => other,
        }
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            let choice = self.read_choice()?;
            debug!(choice, "menu option selected");

            match choice {
                1 => self.add_products()?,
                2 => self.remove_product()?,
                3 => self.view_inventory()?,
                4 => self.update_stock()?,
                5 => self.search_product()?,
                6 => self.update_price()?,
                7 => {
                    writeln!(self.output, "Exiting the program. Goodbye!")?;
                    return Ok(());
                }
                _ => writeln!(
                    self.output,
                    "Invalid choice. Please select a number between 1 and 7.\n"
                )?,
            }
        }
    }

    // ========================================================================
    // INPUT HELPERS
    // ========================================================================

    fn prompt(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(EndOfInput.into());
        }
        Ok(line.trim().to_string())
    }

    fn prompt_parse<T: FromStr>(&mut self, message: &str, invalid: &str) -> Result<T> {
        loop {
            let raw = self.prompt(message)?;
            match raw.parse() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "{}", invalid)?,
            }
        }
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        let answer = self.prompt(message)?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    fn read_choice(&mut self) -> Result<i64> {
        let message = format!("{}\n", MENU);
        self.prompt_parse(
            &message,
            "Invalid input. Please enter a number between 1 and 7.",
        )
    }

    /// Print a validation error and return None; storage errors propagate.
    fn check<T>(&mut self, result: Result<T, InventoryError>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_validation() => {
                writeln!(self.output, "❌ {}", e)?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "storage failure in menu operation");
                Err(e.into())
            }
        }
    }

    fn print_candidate(&mut self, product: &Product) -> Result<()> {
        writeln!(
            self.output,
            "ID: {}, Quantity: {} {}, Price: {}, Expiry: {}",
            product.id,
            product.quantity,
            product.measurement.short_code(),
            product.price,
            product.expiry
        )?;
        Ok(())
    }

    fn print_candidates(&mut self, ids: &[ProductId]) -> Result<()> {
        let candidates: Vec<Product> = ids
            .iter()
            .filter_map(|id| self.inventory.get(*id).cloned())
            .collect();
        for product in &candidates {
            self.print_candidate(product)?;
        }
        Ok(())
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Resolve a typed ID or name to one product, asking the user to pick
    /// by ID when the name is shared. None when nothing matched.
    fn select(&mut self, message: &str, pick_message: &str) -> Result<Option<ProductId>> {
        let raw = self.prompt(message)?;
        let Some(lookup) = Lookup::parse(&raw) else {
            writeln!(self.output, "Please enter a product ID or name.\n")?;
            return Ok(None);
        };

        match self.inventory.resolve(&lookup) {
            Resolution::NotFound => {
                self.report_not_found(&lookup)?;
                Ok(None)
            }
            Resolution::Unique(id) => Ok(Some(id)),
            ambiguous @ Resolution::Ambiguous(_) => {
                writeln!(self.output, "Multiple products found with name {}:", lookup)?;
                self.choose(&ambiguous, pick_message).map(Some)
            }
        }
    }

    fn choose(&mut self, resolution: &Resolution, message: &str) -> Result<ProductId> {
        if let Resolution::Ambiguous(ids) = resolution {
            self.print_candidates(ids)?;
        }

        loop {
            let raw = self.prompt(message)?;
            if let Some(Lookup::Id(id)) = Lookup::parse(&raw) {
                if let Some(chosen) = resolution.pick(id) {
                    return Ok(chosen);
                }
            }
            writeln!(self.output, "Invalid ID. Please choose from the list.")?;
        }
    }

    fn report_not_found(&mut self, lookup: &Lookup) -> Result<()> {
        match lookup {
            Lookup::Id(id) => writeln!(self.output, "No product found with ID: {}\n", id)?,
            Lookup::Name(name) => writeln!(self.output, "No product found with name: {}\n", name)?,
        }
        self.offer_add()
    }

    fn offer_add(&mut self) -> Result<()> {
        if self.confirm("Do you want to add this product to inventory? (yes/no): ")? {
            self.add_one(1)
        } else {
            writeln!(self.output, "Returning to main menu.\n")?;
            Ok(())
        }
    }

    // ========================================================================
    // 1. ADD
    // ========================================================================

    fn add_products(&mut self) -> Result<()> {
        let count = loop {
            let raw = self.prompt("How many products you want to add in the inventory: ")?;
            match raw.parse::<usize>() {
                Ok(count) => break count,
                Err(_) => writeln!(
                    self.output,
                    "Invalid input. Please enter a numeric value for number of products.\n"
                )?,
            }
        };

        for n in 1..=count {
            self.add_one(n)?;
        }
        writeln!(self.output, "All products added successfully to inventory.\n")?;
        Ok(())
    }

    fn add_one(&mut self, n: usize) -> Result<()> {
        writeln!(self.output, "Enter details of product {}:", n)?;

        let id = loop {
            let id: ProductId = self.prompt_parse(
                "Product ID: ",
                "Invalid input. Please enter a numeric value for Product ID.",
            )?;
            if !self.inventory.contains(id) {
                break id;
            }
            writeln!(
                self.output,
                "Product ID already exists. Please enter a unique Product ID."
            )?;
        };

        let name = loop {
            let name = self.prompt("Product Name: ")?;
            if !name.is_empty() {
                break name;
            }
            writeln!(self.output, "❌ {}", InventoryError::EmptyName)?;
        };

        let price = loop {
            let price: f64 = self.prompt_parse(
                "Product Price (INR): ",
                "Invalid input. Please enter a numeric/decimal value for price.",
            )?;
            if let Some(price) = self.check(check_price(price))? {
                break price;
            }
        };

        let measurement = loop {
            let raw = self.prompt(
                "Is the quantity in units(u) or kilograms(kg) or liters(l) or packet(p) of any measurement? (Type u/kg/l/p): ",
            )?;
            match MeasurementKind::from_str(&raw) {
                Ok(kind) => break kind,
                Err(_) => writeln!(
                    self.output,
                    "Invalid input. Please enter 'u' for units, 'kg' for kilograms, 'l' for liters, or 'p' for packets."
                )?,
            }
        };

        let quantity = loop {
            let quantity: f64 = self.prompt_parse(
                "Quantity: ",
                "Invalid input. Please enter a numeric value for quantity.",
            )?;
            if quantity.is_finite() && measurement.normalize(quantity) > 0.0 {
                break quantity;
            }
            writeln!(self.output, "Invalid input. Quantity must be a positive number.")?;
        };

        let expiry = loop {
            let raw = self.prompt("Expiry Date (DD-MM-YYYY): ")?;
            match Expiry::parse_date(&raw) {
                Ok(_) => break raw,
                Err(_) => writeln!(
                    self.output,
                    "Invalid date format. Please enter in DD-MM-YYYY format."
                )?,
            }
        };

        let new = NewProduct {
            id,
            name,
            category: String::new(),
            price,
            quantity,
            measurement,
            expiry,
        };

        let added = self.inventory.add(new).map(|p| (p.name.clone(), p.is_expired()));
        if let Some((name, expired)) = self.check(added)? {
            writeln!(self.output, "Product {} added to inventory.", name)?;
            if expired {
                writeln!(self.output, "⚠️  Expiry date has already passed; stored as expired.")?;
            }
            writeln!(self.output)?;
        }
        Ok(())
    }

    // ========================================================================
    // 2. REMOVE
    // ========================================================================

    fn remove_product(&mut self) -> Result<()> {
        let raw = self.prompt("Product ID or name to delete: ")?;
        let Some(lookup) = Lookup::parse(&raw) else {
            writeln!(self.output, "Please enter a product ID or name.\n")?;
            return Ok(());
        };

        let resolution = self.inventory.resolve(&lookup);
        let ids = match (&lookup, &resolution) {
            (_, Resolution::NotFound) => return self.report_not_found(&lookup),
            (Lookup::Id(_), Resolution::Unique(id)) => {
                return self.delete_one(*id);
            }
            (_, Resolution::Unique(id)) => vec![*id],
            (_, Resolution::Ambiguous(ids)) => ids.clone(),
        };

        let Lookup::Name(name) = &lookup else {
            return Ok(());
        };

        writeln!(self.output, "Found {} product(s) with name '{}':", ids.len(), name)?;
        self.print_candidates(&ids)?;

        if self.confirm("Delete all products with this name? (y/n): ")? {
            let result = self.inventory.delete_by_name(name);
            if let Some(removed) = self.check(result)? {
                writeln!(
                    self.output,
                    "All {} product(s) with name '{}' have been deleted.",
                    removed.len(),
                    name
                )?;
            }
            return Ok(());
        }

        let candidates = Resolution::Ambiguous(ids);
        loop {
            let raw = self.prompt("Enter the ID of the product to delete: ")?;
            if let Some(Lookup::Id(id)) = Lookup::parse(&raw) {
                if let Some(chosen) = candidates.pick(id) {
                    return self.delete_one(chosen);
                }
            }
            writeln!(self.output, "Invalid ID. Please choose from the list.")?;
        }
    }

    fn delete_one(&mut self, id: ProductId) -> Result<()> {
        let result = self.inventory.delete(id);
        if let Some(removed) = self.check(result)? {
            writeln!(
                self.output,
                "Product {} with ID {} has been deleted.",
                removed.name, removed.id
            )?;
        }
        Ok(())
    }

    // ========================================================================
    // 3. VIEW
    // ========================================================================

    fn view_inventory(&mut self) -> Result<()> {
        let products: Vec<Product> = self.inventory.products().cloned().collect();
        let result = self.inventory.summary();

        writeln!(self.output, "📦 Inventory Stock:")?;
        let summary = self.check(result)?;
        if let Some(summary) = &summary {
            writeln!(
                self.output,
                "Total Products: {} ({} active, {} expired)",
                summary.total_products, summary.active_products, summary.expired_products
            )?;
        }
        writeln!(
            self.output,
            "P_ID |      Name       |  Price (INR)  | Quantity   | Expiry Date"
        )?;
        writeln!(
            self.output,
            "-----------------------------------------------------------------"
        )?;
        for p in &products {
            let quantity = format!("{} {}", p.quantity, p.measurement.short_code());
            writeln!(
                self.output,
                "{:5}| {:<15} | {:<13} | {:<10} | {}",
                p.id, p.name, p.price, quantity, p.expiry
            )?;
        }
        if let Some(summary) = &summary {
            writeln!(
                self.output,
                "Stock value (active): INR {:.2}",
                summary.active_stock_value
            )?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    // ========================================================================
    // 4. STOCK
    // ========================================================================

    fn update_stock(&mut self) -> Result<()> {
        let Some(id) = self.select(
            "Product ID or name to update stock: ",
            "Enter the ID of the product to update: ",
        )?
        else {
            return Ok(());
        };
        let name = self.name_of(id);

        loop {
            let message = format!(
                "{} sold or added to the inventory?\n(Type 'sold' or 'added' / 1 for sold, 2 for added): ",
                name
            );
            let answer = self.prompt(&message)?.to_lowercase();
            match answer.as_str() {
                "sold" | "1" => return self.sell(id, &name),
                "added" | "2" => return self.purchase(id, &name),
                _ => writeln!(
                    self.output,
                    "Invalid choice. Please choose 'sold' or 'added'."
                )?,
            }
        }
    }

    /// Re-prompts until a valid quantity is sold; blank cancels.
    fn sell(&mut self, id: ProductId, name: &str) -> Result<()> {
        loop {
            let raw = self.prompt(&format!("How many {} sold (Enter to cancel): ", name))?;
            if raw.is_empty() {
                writeln!(self.output, "Returning to main menu.\n")?;
                return Ok(());
            }
            let Ok(quantity) = raw.parse::<f64>() else {
                writeln!(self.output, "Invalid input. Please enter a number.")?;
                continue;
            };

            let bill = self.prompt("Bill ID (optional): ")?;
            let result = self.inventory.sell(id, quantity, Some(bill));
            if let Some(sale) = self.check(result)? {
                let remaining = self.inventory.get(id).map(|p| p.quantity).unwrap_or_default();
                writeln!(
                    self.output,
                    "Stock updated. New quantity: {} (revenue INR {:.2})",
                    remaining, sale.revenue
                )?;
                return Ok(());
            }
        }
    }

    fn purchase(&mut self, id: ProductId, name: &str) -> Result<()> {
        loop {
            let raw = self.prompt(&format!("How many {} added (Enter to cancel): ", name))?;
            if raw.is_empty() {
                writeln!(self.output, "Returning to main menu.\n")?;
                return Ok(());
            }
            let Ok(quantity) = raw.parse::<f64>() else {
                writeln!(self.output, "Invalid input. Please enter a number.")?;
                continue;
            };

            let unit_cost = loop {
                let raw = self.prompt("Unit cost (INR, Enter for current price): ")?;
                if raw.is_empty() {
                    break None;
                }
                match raw.parse::<f64>() {
                    Ok(cost) => break Some(cost),
                    Err(_) => writeln!(
                        self.output,
                        "Invalid input. Please enter a numeric value for cost."
                    )?,
                }
            };
            let supplier = self.prompt("Supplier (optional): ")?;

            let result = self.inventory.purchase(id, quantity, unit_cost, Some(supplier));
            if let Some(expense) = self.check(result)? {
                let stock = self.inventory.get(id).map(|p| p.quantity).unwrap_or_default();
                writeln!(
                    self.output,
                    "Stock updated. New quantity: {} (cost INR {:.2})",
                    stock, expense.total_cost
                )?;
                return Ok(());
            }
        }
    }

    fn name_of(&self, id: ProductId) -> String {
        self.inventory
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // 5. SEARCH
    // ========================================================================

    fn search_product(&mut self) -> Result<()> {
        let name = self.prompt("Product name to search: ")?;

        match self.inventory.search(&name).cloned() {
            Some(p) => {
                writeln!(self.output, "Here are details of {}:", p.name)?;
                writeln!(self.output, "ID : {}", p.id)?;
                writeln!(self.output, "Price : {}", p.price)?;
                writeln!(self.output, "Quantity : {} {}", p.quantity, p.measurement.short_code())?;
                writeln!(self.output, "Expiry Date : {}\n", p.expiry)?;
                Ok(())
            }
            None => {
                writeln!(self.output, "Sorry, we do not have {} in our inventory.\n", name)?;
                self.offer_add()
            }
        }
    }

    // ========================================================================
    // 6. PRICE
    // ========================================================================

    fn update_price(&mut self) -> Result<()> {
        let Some(id) = self.select(
            "Product ID or Name to update price: ",
            "Enter the ID of the product to update: ",
        )?
        else {
            return Ok(());
        };
        let name = self.name_of(id);

        loop {
            let price: f64 = self.prompt_parse(
                &format!("New price of {} (INR): ", name),
                "Invalid input. Please enter a numeric value for price.",
            )?;
            let result = self.inventory.update_price(id, price).map(|p| p.price);
            if let Some(updated) = self.check(result)? {
                writeln!(self.output, "Price of {} updated to INR {}.\n", name, updated)?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Clock;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn open(products: Vec<Product>) -> Inventory {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let clock: Clock = Box::new(move || today);
        Inventory::open_with_clock(Box::new(MemoryStore::with_products(products)), clock).unwrap()
    }

    fn product(id: ProductId, name: &str, quantity: f64, measurement: MeasurementKind) -> Product {
        Product {
            id,
            name: name.to_string(),
            category: String::new(),
            price: 50.0,
            quantity,
            measurement,
            expiry: Expiry::parse("01-01-2030"),
        }
    }

    fn drive(inventory: &mut Inventory, script: &str) -> String {
        let mut out = Vec::new();
        Menu::new(inventory, script.as_bytes(), &mut out).run().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_add_then_sell() {
        let mut inventory = open(vec![]);
        let out = drive(
            &mut inventory,
            "1\n1\n1\nrice\n50\nkg\n10\n01-01-2030\n4\nrice\n1\n2.5\nB-7\n7\n",
        );

        assert!(out.contains("Product Rice added to inventory."));
        assert!(out.contains("Stock updated. New quantity: 7.5"));
        assert_eq!(inventory.get(1).unwrap().quantity, 7.5);

        let sales = inventory.sales().unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].bill_id.as_deref(), Some("B-7"));
        println!("✅ Menu add + sell flow PASSED");
    }

    #[test]
    fn test_add_re_prompts_until_valid() {
        let mut inventory = open(vec![product(1, "Salt", 1.0, MeasurementKind::Units)]);
        let script = "1\n1\n\
                      abc\n1\n2\n\
                      \ntea leaves\n\
                      free\n-5\n12.5\n\
                      box\np\n\
                      0.5\n4.9\n\
                      31-02-2030\n2030-01-01\n15-08-2030\n\
                      7\n";
        let out = drive(&mut inventory, script);

        assert!(out.contains("Please enter a numeric value for Product ID"));
        assert!(out.contains("Product ID already exists"));
        assert!(out.contains("Product name cannot be empty"));
        assert!(out.contains("numeric/decimal value for price"));
        assert!(out.contains("Price must be positive"));
        assert!(out.contains("Please enter 'u' for units"));
        assert!(out.contains("Quantity must be a positive number"));
        assert!(out.contains("Invalid date format"));

        let tea = inventory.get(2).unwrap();
        assert_eq!(tea.name, "Tea Leaves");
        assert_eq!(tea.quantity, 4.0);
        assert_eq!(tea.measurement, MeasurementKind::Packets);
    }

    #[test]
    fn test_oversell_re_prompts() {
        let mut inventory = open(vec![product(1, "Soap", 3.0, MeasurementKind::Units)]);
        let out = drive(&mut inventory, "4\nsoap\nsold\n5\n\n2\n\n7\n");

        assert!(out.contains("Cannot remove 5 of Soap: only 3 in stock"));
        assert_eq!(inventory.get(1).unwrap().quantity, 1.0);
        assert_eq!(inventory.sales().unwrap().len(), 1);
    }

    #[test]
    fn test_purchase_with_cost_and_supplier() {
        let mut inventory = open(vec![product(1, "Milk", 2.0, MeasurementKind::Liters)]);
        drive(&mut inventory, "4\n1\nadded\n1.25\nlots\n40\nDairy Co\n7\n");

        assert_eq!(inventory.get(1).unwrap().quantity, 3.25);
        let expenses = inventory.expenses().unwrap();
        assert_eq!(expenses[0].total_cost, 50.0);
        assert_eq!(expenses[0].supplier.as_deref(), Some("Dairy Co"));
    }

    #[test]
    fn test_disambiguation_by_id() {
        let mut inventory = open(vec![
            product(1, "Rice", 1.0, MeasurementKind::Kilograms),
            product(2, "Rice", 2.0, MeasurementKind::Kilograms),
        ]);
        let out = drive(&mut inventory, "6\nrice\n9\nabc\n2\n-1\n80\n7\n");

        assert!(out.contains("Multiple products found with name 'Rice'"));
        assert!(out.contains("Invalid ID. Please choose from the list."));
        assert!(out.contains("Price must be positive"));
        assert_eq!(inventory.get(1).unwrap().price, 50.0);
        assert_eq!(inventory.get(2).unwrap().price, 80.0);
    }

    #[test]
    fn test_bulk_delete_by_name() {
        let mut inventory = open(vec![
            product(1, "Rice", 1.0, MeasurementKind::Kilograms),
            product(2, "Rice", 2.0, MeasurementKind::Kilograms),
            product(3, "Salt", 2.0, MeasurementKind::Kilograms),
        ]);
        let out = drive(&mut inventory, "2\nRICE\ny\n7\n");

        assert!(out.contains("Found 2 product(s) with name 'Rice'"));
        assert_eq!(inventory.len(), 1);
        assert!(inventory.contains(3));
    }

    #[test]
    fn test_delete_one_of_several() {
        let mut inventory = open(vec![
            product(1, "Rice", 1.0, MeasurementKind::Kilograms),
            product(2, "Rice", 2.0, MeasurementKind::Kilograms),
        ]);
        drive(&mut inventory, "2\nrice\nn\n3\n1\n2\n2\n7\n");

        assert!(inventory.is_empty());
    }

    #[test]
    fn test_not_found_offers_add() {
        let mut inventory = open(vec![]);
        let out = drive(
            &mut inventory,
            "5\nsugar\nyes\n3\nsugar\n40\nu\n5\n01-01-2030\n5\nsugar\n4\n99\nno\n7\n",
        );

        assert!(out.contains("Sorry, we do not have sugar in our inventory."));
        assert!(out.contains("Here are details of Sugar:"));
        assert!(out.contains("No product found with ID: 99"));
        assert!(out.contains("Returning to main menu."));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_bad_menu_input_and_end_of_input() {
        let mut inventory = open(vec![]);
        let out = drive(&mut inventory, "abc\n9\n3\n");

        assert!(out.contains("Invalid input. Please enter a number between 1 and 7."));
        assert!(out.contains("Invalid choice. Please select a number between 1 and 7."));
        assert!(out.contains("Total Products: 0"));
        assert!(out.ends_with("Exiting the program. Goodbye!\n"));
    }
}
