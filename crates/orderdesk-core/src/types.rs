//! # Domain Types
//!
//! Core domain types shared by the admin portal and the customer portal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │    Product      │   │ PricingOverrideRule │   │     Order       │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  id             │   │  customer_id ┐      │   │  id             │   │
//! │  │  base_price?    │   │  product_id  ├ key  │   │  customer       │   │
//! │  │  variations[]   │   │  variation   ┘      │   │  items[]        │   │
//! │  └─────────────────┘   │  prices             │   │  totals         │   │
//! │                        └─────────────────────┘   │  status         │   │
//! │  ┌─────────────────┐   ┌─────────────────────┐   └─────────────────┘   │
//! │  │   Variation     │   │  VariationSelector  │                         │
//! │  │  name, prices   │   │  Base (-1) | Index  │                         │
//! │  └─────────────────┘   └─────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderLineItem` freezes name and unit prices when the line is added.
//! Later catalog or override edits never reach an existing order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use ts_rs::TS;

use crate::money::Money;
use crate::status::OrderStatus;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (Israeli VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Price Pair
// =============================================================================

/// A tax-exclusive / tax-inclusive price pair.
///
/// The two halves are stored independently everywhere in the system and
/// are never assumed to agree with each other through the tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricePair {
    pub before_tax: Money,
    pub with_tax: Money,
}

impl PricePair {
    pub const fn new(before_tax: Money, with_tax: Money) -> Self {
        PricePair {
            before_tax,
            with_tax,
        }
    }

    pub const fn zero() -> Self {
        PricePair::new(Money::zero(), Money::zero())
    }

    /// Builds a pair from a tax-inclusive price only.
    ///
    /// The tax-exclusive half is derived with [`Money::tax_exclusive`].
    pub fn from_tax_inclusive(with_tax: Money, rate: TaxRate) -> Self {
        PricePair::new(with_tax.tax_exclusive(rate), with_tax)
    }

    /// Both halves multiplied by a quantity.
    #[inline]
    pub fn times(&self, quantity: i64) -> PricePair {
        PricePair::new(self.before_tax * quantity, self.with_tax * quantity)
    }
}

impl Add for PricePair {
    type Output = PricePair;

    fn add(self, other: PricePair) -> PricePair {
        PricePair::new(self.before_tax + other.before_tax, self.with_tax + other.with_tax)
    }
}

impl Sub for PricePair {
    type Output = PricePair;

    fn sub(self, other: PricePair) -> PricePair {
        PricePair::new(self.before_tax - other.before_tax, self.with_tax - other.with_tax)
    }
}

// =============================================================================
// Variation Selector
// =============================================================================

/// Which price of a product a line or override refers to.
///
/// Stored as a plain integer: `-1` is the product's base price, `0..n-1`
/// index into `Product::variations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VariationSelector {
    /// The product's base price, no variation.
    Base,
    /// A variation by position.
    Index(usize),
}

impl VariationSelector {
    /// Stored value for [`VariationSelector::Base`].
    pub const BASE_INDEX: i64 = -1;

    /// Only `-1` selects the base price; other negative values are not a
    /// selector at all.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            Self::BASE_INDEX => Some(VariationSelector::Base),
            i => usize::try_from(i).ok().map(VariationSelector::Index),
        }
    }

    pub fn as_index(&self) -> i64 {
        match self {
            VariationSelector::Base => Self::BASE_INDEX,
            VariationSelector::Index(i) => *i as i64,
        }
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        matches!(self, VariationSelector::Base)
    }
}

impl Default for VariationSelector {
    fn default() -> Self {
        VariationSelector::Base
    }
}

/// A stored variation index below `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid variation index {0}: expected -1 or a variation position")]
pub struct InvalidVariationIndex(pub i64);

impl TryFrom<i64> for VariationSelector {
    type Error = InvalidVariationIndex;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        VariationSelector::from_index(index).ok_or(InvalidVariationIndex(index))
    }
}

impl From<VariationSelector> for i64 {
    fn from(selector: VariationSelector) -> Self {
        selector.as_index()
    }
}

impl fmt::Display for VariationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_index())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A named sub-SKU of a product carrying its own price pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Variation {
    /// Unique within its product.
    pub name: String,
    pub price_before_tax: Money,
    pub price_with_tax: Money,
}

impl Variation {
    #[inline]
    pub fn prices(&self) -> PricePair {
        PricePair::new(self.price_before_tax, self.price_with_tax)
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
    /// Base price, used when the product has no variations.
    pub price_before_tax: Option<Money>,
    pub price_with_tax: Option<Money>,
    /// Ordered; line items and overrides refer to these by position.
    pub variations: Vec<Variation>,
    /// Soft delete flag.
    pub is_active: bool,
}

impl Product {
    /// Base price pair, present only when the tax-inclusive half is set.
    ///
    /// A missing tax-exclusive half reads as zero; the two halves are
    /// edited independently in the admin portal.
    pub fn base_prices(&self) -> Option<PricePair> {
        self.price_with_tax.map(|with_tax| {
            PricePair::new(self.price_before_tax.unwrap_or_default(), with_tax)
        })
    }

    #[inline]
    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }

    /// Variation at a selector, `None` for `Base` or an out-of-range index.
    pub fn variation(&self, selector: VariationSelector) -> Option<&Variation> {
        match selector {
            VariationSelector::Base => None,
            VariationSelector::Index(i) => self.variations.get(i),
        }
    }

    /// Display name of the priced item ("Olive Oil / 1L" for a variation).
    pub fn display_name(&self, selector: VariationSelector) -> String {
        match self.variation(selector) {
            Some(variation) => format!("{} / {}", self.name, variation.name),
            None => self.name.clone(),
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Pricing Overrides
// =============================================================================

/// Composite key of an override rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverrideKey {
    pub customer_id: String,
    pub product_id: String,
    pub variation: VariationSelector,
}

impl OverrideKey {
    pub fn new(
        customer_id: impl Into<String>,
        product_id: impl Into<String>,
        variation: VariationSelector,
    ) -> Self {
        OverrideKey {
            customer_id: customer_id.into(),
            product_id: product_id.into(),
            variation,
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.customer_id, self.product_id, self.variation)
    }
}

/// A customer-specific price that wins over the catalog for one exact key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingOverrideRule {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    #[ts(as = "i64")]
    pub variation: VariationSelector,
    pub price_before_tax: Money,
    pub price_with_tax: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PricingOverrideRule {
    pub fn key(&self) -> OverrideKey {
        OverrideKey::new(self.customer_id.clone(), self.product_id.clone(), self.variation)
    }

    #[inline]
    pub fn prices(&self) -> PricePair {
        PricePair::new(self.price_before_tax, self.price_with_tax)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Which front-end wrote an order document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderOrigin {
    CustomerPortal,
    AdminPortal,
}

impl OrderOrigin {
    /// Status a freshly finalized order starts in.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            OrderOrigin::CustomerPortal => OrderStatus::Pending,
            OrderOrigin::AdminPortal => OrderStatus::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOrigin::CustomerPortal => "customer_portal",
            OrderOrigin::AdminPortal => "admin_portal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer_portal" | "customer" | "storefront" => Some(OrderOrigin::CustomerPortal),
            "admin_portal" | "admin" | "console" => Some(OrderOrigin::AdminPortal),
            _ => None,
        }
    }
}

/// Who placed an order. Either portal may fill any subset of the fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CustomerRef {
    pub fn with_id(id: impl Into<String>) -> Self {
        CustomerRef {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// True when at least one field carries a non-blank value.
    pub fn is_present(&self) -> bool {
        [&self.id, &self.name, &self.email]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Best human-readable label: name, then email, then id.
    pub fn display_name(&self) -> &str {
        [&self.name, &self.email, &self.id]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|v| !v.trim().is_empty())
            .unwrap_or(crate::UNKNOWN_CUSTOMER_NAME)
    }
}

/// Invoice issued by the invoicing relay for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceRef {
    pub invoice_id: String,
    pub invoice_number: Option<String>,
    pub invoice_url: Option<String>,
}

/// A line in an order. Prices are snapshots taken when the line was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineItem {
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub product_name: String,
    #[ts(as = "i64")]
    pub variation: VariationSelector,
    pub variation_name: Option<String>,
    pub quantity: i64,
    /// Unit prices at time of adding (frozen).
    pub unit_price: PricePair,
}

impl OrderLineItem {
    /// Unit prices × quantity.
    #[inline]
    pub fn line_total(&self) -> PricePair {
        self.unit_price.times(self.quantity)
    }
}

/// The canonical, schema-agnostic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer: CustomerRef,
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderLineItem>,
    pub total_before_tax: Money,
    pub total_with_tax: Money,
    pub status: OrderStatus,
    pub origin: OrderOrigin,
    pub notes: Option<String>,
    pub invoice: Option<InvoiceRef>,
}

impl Order {
    #[inline]
    pub fn totals(&self) -> PricePair {
        PricePair::new(self.total_before_tax, self.total_with_tax)
    }

    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// True when `customer_id` is recorded as this order's customer.
    pub fn is_owned_by(&self, customer_id: &str) -> bool {
        self.customer.id.as_deref() == Some(customer_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_variations() -> Product {
        Product {
            id: "p-oil".to_string(),
            name: "Olive Oil".to_string(),
            category_id: None,
            image_url: None,
            price_before_tax: None,
            price_with_tax: None,
            variations: vec![
                Variation {
                    name: "500ml".to_string(),
                    price_before_tax: Money::from_cents(1695),
                    price_with_tax: Money::from_cents(2000),
                },
                Variation {
                    name: "1L".to_string(),
                    price_before_tax: Money::from_cents(2966),
                    price_with_tax: Money::from_cents(3500),
                },
            ],
            is_active: true,
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
        assert_eq!(TaxRate::from_percentage(18.0), rate);
        assert_eq!(TaxRate::default(), rate);
    }

    #[test]
    fn test_variation_selector_round_trips_stored_index() {
        assert_eq!(VariationSelector::from_index(-1), Some(VariationSelector::Base));
        assert_eq!(VariationSelector::from_index(-7), None);
        assert_eq!(VariationSelector::from_index(2), Some(VariationSelector::Index(2)));
        assert_eq!(VariationSelector::Base.as_index(), -1);

        let json = serde_json::to_string(&VariationSelector::Index(3)).unwrap();
        assert_eq!(json, "3");
        let parsed: VariationSelector = serde_json::from_str("-1").unwrap();
        assert!(parsed.is_base());
    }

    #[test]
    fn test_variation_selector_rejects_other_negatives() {
        assert_eq!(
            VariationSelector::try_from(-2),
            Err(InvalidVariationIndex(-2))
        );
        assert!(serde_json::from_str::<VariationSelector>("-7").is_err());
    }

    #[test]
    fn test_product_display_name() {
        let product = product_with_variations();
        assert_eq!(product.display_name(VariationSelector::Index(1)), "Olive Oil / 1L");
        assert_eq!(product.display_name(VariationSelector::Base), "Olive Oil");
        assert_eq!(product.display_name(VariationSelector::Index(9)), "Olive Oil");
    }

    #[test]
    fn test_base_prices_require_tax_inclusive_half() {
        let mut product = product_with_variations();
        assert_eq!(product.base_prices(), None);

        product.price_with_tax = Some(Money::from_cents(100));
        assert_eq!(
            product.base_prices(),
            Some(PricePair::new(Money::zero(), Money::from_cents(100)))
        );
    }

    #[test]
    fn test_customer_ref_presence() {
        assert!(!CustomerRef::default().is_present());
        assert!(!CustomerRef {
            name: Some("   ".to_string()),
            ..Default::default()
        }
        .is_present());
        assert!(CustomerRef::with_id("c-1").is_present());

        let by_email = CustomerRef {
            email: Some("dana@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(by_email.display_name(), "dana@example.com");
        assert_eq!(CustomerRef::default().display_name(), "Unknown customer");
    }

    #[test]
    fn test_origin_initial_status() {
        assert_eq!(OrderOrigin::CustomerPortal.initial_status(), OrderStatus::Pending);
        assert_eq!(OrderOrigin::AdminPortal.initial_status(), OrderStatus::New);
        assert_eq!(OrderOrigin::parse("ADMIN"), Some(OrderOrigin::AdminPortal));
        assert_eq!(OrderOrigin::parse("kiosk"), None);
    }

    #[test]
    fn test_price_pair_arithmetic() {
        let unit = PricePair::new(Money::from_cents(85), Money::from_cents(100));
        let three = unit.times(3);
        assert_eq!(three, PricePair::new(Money::from_cents(255), Money::from_cents(300)));
        assert_eq!(three - unit, unit.times(2));
        assert_eq!(unit + unit, unit.times(2));
    }
}
