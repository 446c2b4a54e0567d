//! # Seed Data Generator
//!
//! Populates the database with development data.
//!
//! ## Usage
//! ```bash
//! # Seed ./vendo_dev.db
//! cargo run -p vendo-db --bin seed
//!
//! # Specify database path and number of users
//! cargo run -p vendo-db --bin seed -- --db ./data/vendo.db --users 25
//! ```
//!
//! ## Generated Data
//! - Branches: one per entry in `BRANCHES`
//! - Users: `customer01`, `customer02`, … with `@example.com` addresses
//! - Products: every name in `CATALOG` × every size, priced from a base
//!   price plus a size surcharge

use std::env;

use vendo_core::Money;
use vendo_db::{Database, DbConfig, NewProduct};

const BRANCHES: &[&str] = &["Downtown", "Harbour", "Airport"];

/// (category, base price in cents, product names)
const CATALOG: &[(&str, u32, &[&str])] = &[
    (
        "coffee",
        1299,
        &[
            "House Blend",
            "Ethiopia Yirgacheffe",
            "Colombia Huila",
            "Decaf Swiss Water",
            "Espresso Roast",
        ],
    ),
    (
        "tea",
        899,
        &["Earl Grey", "Sencha", "Chamomile", "Rooibos", "Masala Chai"],
    ),
    (
        "equipment",
        2499,
        &["Pour Over Kit", "French Press", "Hand Grinder", "Milk Frother"],
    ),
    ("supplies", 499, &["Paper Filters", "Descaler", "Cleaning Tablets"]),
];

/// (label, surcharge in cents)
const SIZES: &[(&str, u32)] = &[("250g", 0), ("500g", 700), ("1kg", 1800)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut users: usize = 10;
    let mut db_path = String::from("./vendo_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users = args[i + 1].parse().unwrap_or(10);
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
                println!("Vendo Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --users <N>    Number of users to create (default: 10)");
                println!("  -d, --db <PATH>    Database file path (default: ./vendo_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Vendo Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for name in BRANCHES {
        db.branches().insert(name).await?;
    }
    println!("✓ Created {} branches", BRANCHES.len());

    for n in 1..=users {
        let username = format!("customer{:02}", n);
        let email = format!("{}@example.com", username);
        db.users().insert(&username, &email).await?;
    }
    println!("✓ Created {} users", users);

    let mut generated = 0;
    for (category, base_cents, names) in CATALOG {
        for name in names.iter() {
            for (size, surcharge) in SIZES {
                let product = NewProduct::new(
                    format!("{} {}", name, size),
                    Money::from_cents(base_cents + surcharge),
                )
                .category(*category);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.title, e);
                    continue;
                }
                generated += 1;
            }
        }
    }
    println!("✓ Created {} products", generated);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
