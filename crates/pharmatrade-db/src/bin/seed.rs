//! # Seed Data Generator
//!
//! Populates the catalog with pharmaceutical products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p pharmatrade-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharmatrade-db --bin seed -- --db ./data/pharmatrade.db
//!
//! # Only the first N catalog entries
//! cargo run -p pharmatrade-db --bin seed -- --count 20
//! ```
//!
//! ## Generated Products
//! Each base drug is listed in several pack sizes; price scales with pack
//! size, stock is deterministic per entry so runs are reproducible.

use std::env;

use pharmatrade_core::{Money, ProductInput};
use pharmatrade_db::{Database, DbConfig};

/// Base drugs: (name, strength, unit price in cents per 10 units)
const DRUGS: &[(&str, &str, i64)] = &[
    ("Paracetamol", "500mg", 120),
    ("Ibuprofen", "400mg", 180),
    ("Amoxicillin", "500mg", 650),
    ("Azithromycin", "250mg", 1400),
    ("Metformin", "850mg", 310),
    ("Atorvastatin", "20mg", 520),
    ("Amlodipine", "5mg", 260),
    ("Omeprazole", "20mg", 340),
    ("Salbutamol Inhaler", "100mcg", 2900),
    ("Cetirizine", "10mg", 150),
    ("Loratadine", "10mg", 170),
    ("Ciprofloxacin", "500mg", 880),
    ("Prednisolone", "5mg", 230),
    ("Losartan", "50mg", 410),
    ("Levothyroxine", "50mcg", 290),
];

/// Pack sizes: (label, units / 10)
const PACKS: &[(&str, i64)] = &[("x10", 1), ("x30", 3), ("x100", 10), ("x500", 50)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = DRUGS.len() * PACKS.len();
    let mut db_path = String::from("./data/pharmatrade.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PharmaTrade Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: all)");
                println!("  -d, --db <PATH>    Database file path (default: ./data/pharmatrade.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("PharmaTrade Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (drug_idx, (name, strength, per_ten)) in DRUGS.iter().enumerate() {
        for (pack_idx, (label, tens)) in PACKS.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let input = product_input(name, strength, label, per_ten * tens, drug_idx, pack_idx);
            let display = input.name.clone();

            if let Err(e) = db.products().insert(input).await {
                eprintln!("Failed to insert {}: {}", display, e);
                continue;
            }

            generated += 1;
        }
    }

    println!();
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    Ok(())
}

/// Builds one catalog entry. Larger packs carry a small bulk discount.
fn product_input(
    name: &str,
    strength: &str,
    pack: &str,
    list_cents: i64,
    drug_idx: usize,
    pack_idx: usize,
) -> ProductInput {
    let discount_pct = (pack_idx as i64) * 3;
    let price_cents = list_cents * (100 - discount_pct) / 100;
    let stock = ((drug_idx * 37 + pack_idx * 11) % 200) as i64 + 5;

    ProductInput {
        name: format!("{} {} {}", name, strength, pack),
        price: Money::from_cents(price_cents),
        stock_quantity: stock,
    }
}
