//! # orderdesk-core: Pure Business Logic for OrderDesk
//!
//! Pricing resolution, order composition and order reconciliation as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OrderDesk Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────┐      │
//! │  │      Admin portal        │        │     Customer portal      │      │
//! │  │  snake_case documents    │        │  camelCase documents     │      │
//! │  └────────────┬─────────────┘        └─────────────┬────────────┘      │
//! │               └──────────────┬─────────────────────┘                   │
//! │  ┌───────────────────────────▼─────────────────────────────────────┐   │
//! │  │                 orderdesk-service (async)                       │   │
//! │  │   PriceResolver, OrderComposer, OrderService, InvoicingRelay    │   │
//! │  └───────────────────────────┬─────────────────────────────────────┘   │
//! │                              │                                          │
//! │  ┌───────────────────────────▼─────────────────────────────────────┐   │
//! │  │              ★ orderdesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌────────┐ │   │
//! │  │   │  money  │ │ pricing │ │  draft  │ │ reconcile │ │ status │ │   │
//! │  │   │  Money  │ │  tiers  │ │ totals  │ │ dual-shape│ │  FSM   │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │  ┌───────────────────────────▼─────────────────────────────────────┐   │
//! │  │                orderdesk-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, repositories, stores         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, PricingOverrideRule, Order, etc.)
//! - [`money`] - Money type with integer arithmetic and the rounding policy
//! - [`status`] - Order status labels, severities and transitions
//! - [`pricing`] - Catalog price tiers
//! - [`draft`] - Mutable order draft with running totals
//! - [`reconcile`] - Dual-schema order documents to canonical [`Order`]
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use orderdesk_core::money::Money;
//! use orderdesk_core::types::TaxRate;
//!
//! // A cart that only knows the tax-inclusive price
//! let with_vat = Money::from_cents(100);
//! let before_vat = with_vat.tax_exclusive(TaxRate::default());
//! assert_eq!(before_vat.cents(), 85);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod money;
pub mod pricing;
pub mod reconcile;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{NewLine, OrderDraft};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{PriceSource, ResolvedPrice};
pub use reconcile::Reconciler;
pub use status::{OrderStatus, StatusSeverity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default VAT rate in basis points (18%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1800;

/// Maximum lines allowed in a single order draft.
///
/// ## Business Reason
/// Lines are never merged, so a runaway cart would otherwise grow
/// without bound.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Display name for a line whose product name cannot be resolved.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown product";

/// Display name for an order without any customer field.
pub const UNKNOWN_CUSTOMER_NAME: &str = "Unknown customer";
