//! # Repository Module
//!
//! SQLite implementations of the store traits.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.catalog()  → CatalogRepository  → products, categories             │
//! │  db.pricing()  → PricingRepository  → customer_pricing                 │
//! │  db.orders()   → OrderRepository    → orders (JSON documents)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository holds a clone of the pool and uses runtime-checked
//! queries with `FromRow` row types.

pub mod catalog;
pub mod order;
pub mod pricing;
