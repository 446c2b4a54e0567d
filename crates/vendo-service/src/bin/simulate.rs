//! # Checkout Simulation
//!
//! Walks one customer through the whole workflow against a scratch database
//! and prints what happens at each step.
//!
//! ## Usage
//! ```bash
//! # In-memory database, default config
//! cargo run -p vendo-service --bin simulate
//!
//! # Config file (VENDO_* environment variables still apply)
//! cargo run -p vendo-service --bin simulate -- --config ./vendo.toml
//! ```
//!
//! ## Steps
//! 1. Seed a branch, a customer and three products
//! 2. Add lines at quantities 2, 5 and 15 (one per discount tier)
//! 3. Try quantity 21 (rejected)
//! 4. Convert the cart into a sale
//! 5. Cancel one sale item and watch the total drop
//! 6. Print every event received on the channel
//! 7. Relay the outbox to a downstream channel

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use vendo_core::Money;
use vendo_db::NewProduct;
use vendo_service::{telemetry, ChannelAnnouncer, OutboxRelay, ServiceConfig, Vendo};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let mut config_path: Option<PathBuf> = None;
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config_path = args.get(i + 1).map(PathBuf::from);
                i += 1;
            }
            "--help" | "-h" => {
                println!("Vendo Checkout Simulation");
                println!();
                println!("Usage: simulate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  TOML config file (default: in-memory database)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => ServiceConfig::load(Some(path)).context("loading config")?,
        None => {
            let mut config = ServiceConfig::default();
            config.database.path = PathBuf::from(":memory:");
            config.apply_overrides(|key| env::var(key).ok());
            config.validate().context("validating config")?;
            config
        }
    };

    println!("🛒 Vendo Checkout Simulation");
    println!("============================");
    println!("Database: {}", config.database.path.display());
    println!();

    let (vendo, mut events) = Vendo::open(&config).await.context("opening database")?;

    let branch = vendo.db.branches().insert("Simulation Branch").await?;
    let user = vendo.db.users().insert("simulated", "simulated@example.com").await?;
    let mut products = Vec::new();
    for (title, price) in [("Grinder Burr", 100), ("Filter Papers", 4), ("Cold Brew Bag", 2)] {
        let product = vendo
            .db
            .products()
            .insert(&NewProduct::new(title, Money::whole(price)))
            .await?;
        products.push(product);
    }
    println!("✓ Seeded branch, customer and {} products", products.len());

    let mut cart_id = 0;
    for (product, quantity) in products.iter().zip([2, 5, 15]) {
        let cart = vendo.carts.add_item(user.id, product.id, quantity).await?;
        cart_id = cart.id;
        if let Some(line) = cart.item(product.id) {
            println!(
                "  + {:<16} x{:<3} @ {:>7}  discount {:>4}  total {:>8}",
                product.title, quantity, line.unit_price, line.discount, line.total_amount
            );
        }
    }

    match vendo.carts.update_item_quantity(cart_id, products[0].id, 21).await {
        Ok(_) => println!("⚠ Quantity 21 was accepted"),
        Err(e) => println!("✓ Quantity 21 rejected: {} [{:?}]", e, e.code()),
    }

    let outcome = vendo.sales.convert_cart(cart_id, branch.id).await?;
    println!();
    println!(
        "✓ Sale {} created, total {}",
        outcome.sale.number, outcome.sale.total_amount
    );

    let first = outcome
        .sale
        .items
        .first()
        .context("sale has no items")?
        .id;
    let outcome = vendo.sales.cancel_sale_item(outcome.sale.id, first).await?;
    println!("✓ Item {} canceled, total now {}", first, outcome.sale.total_amount);

    println!();
    println!("Events:");
    while let Ok(event) = events.try_recv() {
        println!("  {}", serde_json::to_string(&event)?);
    }

    let pending = vendo.db.outbox().count_pending().await?;
    println!("Outbox entries pending delivery: {}", pending);

    if pending > 0 {
        let (downstream, mut relayed) = ChannelAnnouncer::new(pending as usize);
        let relay = OutboxRelay::new(vendo.db.outbox(), Arc::new(downstream));
        let report = relay.relay_once().await?;
        println!(
            "✓ Relayed outbox: {} delivered, {} failed, {} skipped",
            report.delivered, report.failed, report.skipped
        );
        let mut received = 0;
        while relayed.try_recv().is_ok() {
            received += 1;
        }
        println!("  downstream received {} events", received);
        println!(
            "  pending after relay: {}",
            vendo.db.outbox().count_pending().await?
        );
    }

    vendo.db.close().await;
    println!();
    println!("✓ Simulation complete!");

    Ok(())
}
