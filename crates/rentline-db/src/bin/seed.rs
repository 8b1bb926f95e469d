//! # Seed Data Generator
//!
//! Populates a database with a demo vendor catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./rentline_dev.db for vendor "demo-vendor"
//! cargo run -p rentline-db --bin seed
//!
//! # Specify database path and vendor
//! cargo run -p rentline-db --bin seed -- --db ./data/rentline.db --vendor acme
//! ```
//!
//! ## Generated Data
//! - One product per entry of `CATALOG` (stock, price per unit, unit)
//! - The `WELCOME10` coupon: 10% off the subtotal

use anyhow::Context;
use chrono::Utc;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rentline_core::{Coupon, DiscountKind, DurationUnit, Money, Product};
use rentline_db::repository::product::generate_product_id;
use rentline_db::{Database, DbConfig};

/// (name, stock, price in cents, billing unit)
const CATALOG: &[(&str, i64, i64, DurationUnit)] = &[
    ("4K Projector", 5, 2_500, DurationUnit::Day),
    ("Projector Screen 120in", 3, 900, DurationUnit::Day),
    ("PA Speaker Pair", 4, 4_000, DurationUnit::Day),
    ("Wireless Microphone", 10, 600, DurationUnit::Day),
    ("DSLR Camera Kit", 2, 3_500, DurationUnit::Day),
    ("Camping Tent 4p", 8, 1_500, DurationUnit::Day),
    ("Folding Table", 40, 300, DurationUnit::Day),
    ("Folding Chair", 200, 50, DurationUnit::Day),
    ("Party Marquee 6x12m", 1, 45_000, DurationUnit::Week),
    ("Generator 5kW", 2, 1_200, DurationUnit::Hour),
    ("Cargo Van", 1, 180_000, DurationUnit::Month),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./rentline_dev.db");
    let mut vendor_id = String::from("demo-vendor");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--vendor" | "-v" => {
                if i + 1 < args.len() {
                    vendor_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Rentline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./rentline_dev.db)");
                println!("  -v, --vendor <ID>    Vendor owning the products (default: demo-vendor)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, vendor = %vendor_id, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has products; skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let now = Utc::now();
    for (name, stock, price_cents, unit) in CATALOG {
        let product = Product {
            id: generate_product_id(),
            vendor_id: vendor_id.clone(),
            name: name.to_string(),
            stock: *stock,
            price: Money::from_cents(*price_cents),
            duration_unit: *unit,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products()
            .insert(&product)
            .await
            .with_context(|| format!("inserting {name}"))?;
        info!(id = %product.id, name = %product.name, stock, price = %product.price, "Seeded product");
    }

    db.coupons()
        .upsert(&Coupon {
            code: "WELCOME10".to_string(),
            kind: DiscountKind::Percent,
            value: 1000,
            is_active: true,
        })
        .await
        .context("inserting WELCOME10")?;

    info!(products = CATALOG.len(), "Seed complete (coupon WELCOME10 active)");
    db.close().await;
    Ok(())
}
