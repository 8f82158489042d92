//! # OrderDesk Service Library
//!
//! Async services over the OrderDesk stores: price resolution, order
//! composition, order placement and lifecycle, and the invoicing relay.
//!
//! ## Module Organization
//! ```text
//! orderdesk_service/
//! ├── lib.rs          ◄─── You are here (module exports)
//! ├── app.rs          ◄─── OrderDesk: services wired from config
//! ├── resolver.rs     ◄─── PriceResolver (override → variation → base)
//! ├── composer.rs     ◄─── OrderComposer (draft with live prices)
//! ├── catalog.rs      ◄─── CatalogService (priced listings)
//! ├── pricing.rs      ◄─── PricingAdmin (override management)
//! ├── orders.rs       ◄─── OrderService (place, list, transition)
//! ├── batch.rs        ◄─── BatchReport for bulk operations
//! ├── invoicing.rs    ◄─── InvoicingRelay trait + HTTP relay
//! ├── config.rs       ◄─── AppConfig (defaults → TOML → env)
//! └── error.rs        ◄─── ServiceError + ErrorCode
//! ```
//!
//! ## Quick Start
//! ```rust,no_run
//! use orderdesk_core::{CustomerRef, OrderOrigin, VariationSelector};
//! use orderdesk_service::{AppConfig, OrderDesk};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let (_db, desk) = OrderDesk::connect(&config).await?;
//!
//! let mut composer = desk.composer(
//!     OrderOrigin::CustomerPortal,
//!     Some(CustomerRef::with_id("c-42")),
//! );
//! composer.add_line("p-sourdough-loaf", VariationSelector::Base, 2).await?;
//! let placed = desk.orders.place_order(&composer).await?;
//! println!("{} {}", placed.order.id, placed.order.total_with_tax);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod batch;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod error;
pub mod invoicing;
pub mod orders;
pub mod pricing;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use app::OrderDesk;
pub use batch::{BatchFailure, BatchReport};
pub use catalog::{CatalogEntry, CatalogService, PriceQuote};
pub use composer::OrderComposer;
pub use config::{AppConfig, ConfigError, ConfigResult};
pub use error::{ErrorCode, ErrorResponse, ServiceError, ServiceResult};
pub use invoicing::{HttpInvoicingRelay, InvoicingConfig, InvoicingError, InvoicingRelay};
pub use orders::{Actor, OrderService, PlacedOrder, VersionedOrder};
pub use pricing::{OverrideEntry, PriceSheetEntry, PricingAdmin};
pub use resolver::PriceResolver;
