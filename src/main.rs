use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use warehouse_inventory::{open_store, Backend, Config, Inventory, Menu, Product};

/// Warehouse inventory tracker
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Storage backend (overrides INVENTORY_BACKEND)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Data file (overrides INVENTORY_DATA)
    #[arg(long)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Interactive numbered menu (default)
    Menu,
    /// Print every product
    List,
    /// Print expired products only
    Expired,
    /// Print sales, expenses and totals
    Ledger,
    /// Run the expiry classifier and report what changed
    Classify,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    let store = open_store(config.backend, &config.data_path)?;
    let mut inventory = Inventory::open(store)?;

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => {
            let stdin = io::stdin();
            Menu::new(&mut inventory, stdin.lock(), io::stdout()).run()?;
        }
        Command::List => {
            println!("📦 Inventory ({} backend, {})", inventory.backend(), config.data_path.display());
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            print_products(inventory.products());

            let summary = inventory.summary()?;
            println!("\n✓ {} products ({} active, {} expired)",
                summary.total_products, summary.active_products, summary.expired_products);
            println!("✓ Active stock value: INR {:.2}", summary.active_stock_value);
        }
        Command::Expired => {
            let expired = inventory.expired();
            println!("⏰ Expired products: {}", expired.len());
            print_products(expired.into_iter());
        }
        Command::Ledger => {
            let sales = inventory.sales()?;
            let expenses = inventory.expenses()?;

            println!("💰 Sales");
            for sale in &sales {
                println!(
                    "  {} | {:<15} | {:>8} | INR {:>10.2} | {}",
                    sale.timestamp.format("%Y-%m-%d %H:%M"),
                    sale.product_name,
                    sale.quantity,
                    sale.revenue,
                    sale.bill_id.as_deref().unwrap_or("-")
                );
            }

            println!("\n🧾 Expenses");
            for expense in &expenses {
                println!(
                    "  {} | {:<15} | {:>8} | INR {:>10.2} | {}",
                    expense.timestamp.format("%Y-%m-%d %H:%M"),
                    expense.product_name,
                    expense.quantity,
                    expense.total_cost,
                    expense.supplier.as_deref().unwrap_or("-")
                );
            }

            let totals = inventory.ledger_totals()?;
            println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("✓ Revenue: INR {:.2} ({} sales)", totals.revenue, totals.sales_count);
            println!("✓ Cost:    INR {:.2} ({} purchases)", totals.cost, totals.expenses_count);
            println!("✓ Margin:  INR {:.2}", totals.margin);
        }
        Command::Classify => {
            // Opening the inventory already ran and persisted the pass
            let report = inventory.last_classification().clone();
            println!("🔍 Lifecycle check as of {}", inventory.today().format("%d-%m-%Y"));
            println!("✓ Newly expired: {}", report.newly_expired.len());
            println!("✓ Active: {}", inventory.active().len());
            println!("✓ Expired: {}", inventory.expired().len());
            if !report.unparsed.is_empty() {
                println!("⚠️  Unreadable expiry dates (kept active): {:?}", report.unparsed);
            }
        }
    }

    Ok(())
}

fn print_products<'a>(products: impl Iterator<Item = &'a Product>) {
    println!("P_ID |      Name       |  Price (INR)  | Quantity   | Expiry Date");
    println!("-----------------------------------------------------------------");
    for p in products {
        let quantity = format!("{} {}", p.quantity, p.measurement.short_code());
        println!("{:5}| {:<15} | {:<13} | {:<10} | {}", p.id, p.name, p.price, quantity, p.expiry);
    }
}
