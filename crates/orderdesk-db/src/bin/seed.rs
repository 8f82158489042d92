//! # Seed Data Generator
//!
//! Populates the database with a small demo catalog, one customer override
//! and a pair of orders written in each portal's field naming.
//!
//! ## Usage
//! ```bash
//! cargo run -p orderdesk-db --bin seed
//!
//! # Specify database path
//! cargo run -p orderdesk-db --bin seed -- --db ./data/orderdesk.db
//! ```

use std::env;

use chrono::Utc;
use orderdesk_core::{
    Category, Money, OverrideKey, PricePair, Product, TaxRate, Variation, VariationSelector,
};
use orderdesk_db::{CatalogStore, Database, DbConfig, OrderStore, PricingStore};
use serde_json::json;

/// (category id, category name, products: (name, gross price in agorot, variations))
type SeedProduct = (&'static str, i64, &'static [(&'static str, i64)]);

const CATALOG: &[(&str, &str, &[SeedProduct])] = &[
    (
        "cat-bakery",
        "Bakery",
        &[
            ("Sourdough Loaf", 2400, &[]),
            ("Challah", 0, &[("Plain", 1800), ("Sesame", 2000)]),
            ("Pita (10 pack)", 1200, &[]),
        ],
    ),
    (
        "cat-dairy",
        "Dairy",
        &[
            ("Labneh", 0, &[("250g", 1400), ("500g", 2500)]),
            ("Goat Cheese", 3200, &[]),
        ],
    ),
    (
        "cat-pantry",
        "Pantry",
        &[
            ("Olive Oil", 0, &[("500ml", 3500), ("1L", 6200)]),
            ("Tahini", 2200, &[]),
            ("Date Syrup", 1900, &[]),
        ],
    ),
];

const DEMO_CUSTOMER: &str = "demo-customer";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./orderdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("OrderDesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./orderdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 OrderDesk Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let rate = TaxRate::default();
    let mut generated = 0;

    for (category_id, category_name, products) in CATALOG {
        catalog
            .save_category(&Category {
                id: category_id.to_string(),
                name: category_name.to_string(),
                image_url: None,
                is_active: true,
            })
            .await?;

        for (name, gross, variations) in products.iter() {
            let product = seed_product(category_id, name, *gross, variations, rate);
            if let Err(e) = catalog.save_product(&product).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ Generated {} products", generated);

    // The demo customer pays 0.59 for a sourdough loaf
    let key = OverrideKey::new(DEMO_CUSTOMER, "p-sourdough-loaf", VariationSelector::Base);
    db.pricing()
        .upsert_override(
            &key,
            PricePair::new(Money::from_cents(50), Money::from_cents(59)),
        )
        .await?;
    println!("✓ Override for {}", key);

    let orders = db.orders();
    orders
        .insert_order(json!({
            "userId": DEMO_CUSTOMER,
            "customerName": "Demo Customer",
            "createdAt": Utc::now().to_rfc3339(),
            "status": "pending",
            "items": [{
                "productId": "p-sourdough-loaf",
                "productName": "Sourdough Loaf",
                "quantity": 2,
                "priceBeforeVat": 0.5,
                "priceWithVat": 0.59
            }],
            "totalBeforeVat": 1.0,
            "totalWithVat": 1.18
        }))
        .await?;
    orders
        .insert_order(json!({
            "customer_id": DEMO_CUSTOMER,
            "customer_name": "Demo Customer",
            "created_at": Utc::now().to_rfc3339(),
            "status": "new",
            "order_items": [{
                "product_id": "p-olive-oil",
                "product_name": "Olive Oil",
                "variation_index": 1,
                "variation_name": "1L",
                "quantity": 1,
                "price_before_vat": 52.54,
                "price_with_vat": 62.0
            }],
            "total_before_vat": 52.54,
            "total_with_vat": 62.0,
            "comments": "Leave at the door"
        }))
        .await?;
    println!("✓ Inserted 2 orders");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a product from its gross price, deriving the net half at `rate`.
fn seed_product(
    category_id: &str,
    name: &str,
    gross: i64,
    variations: &[(&str, i64)],
    rate: TaxRate,
) -> Product {
    let id = format!(
        "p-{}",
        name.to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    );

    let base = (gross > 0).then(|| PricePair::from_tax_inclusive(Money::from_cents(gross), rate));

    Product {
        id,
        name: name.to_string(),
        category_id: Some(category_id.to_string()),
        image_url: None,
        price_before_tax: base.map(|p| p.before_tax),
        price_with_tax: base.map(|p| p.with_tax),
        variations: variations
            .iter()
            .map(|(variation, gross)| {
                let prices = PricePair::from_tax_inclusive(Money::from_cents(*gross), rate);
                Variation {
                    name: variation.to_string(),
                    price_before_tax: prices.before_tax,
                    price_with_tax: prices.with_tax,
                }
            })
            .collect(),
        is_active: true,
    }
}
