//! # Order Draft
//!
//! The mutable in-progress order. Lines carry frozen unit prices and the
//! draft keeps running totals for both tax halves.
//!
//! ## Draft Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Draft Operations                                     │
//! │                                                                         │
//! │  Operation                   Lines                 Running totals       │
//! │  ─────────                   ─────                 ──────────────       │
//! │                                                                         │
//! │  add_priced_line ──────────► push(snapshot) ─────► += unit × qty       │
//! │                                                                         │
//! │  set_quantity(i, q ≥ 1) ───► lines[i].qty = q ───► += unit × (q - old) │
//! │                                                                         │
//! │  set_quantity(i, q < 1) ───► remove_line(i)                            │
//! │                                                                         │
//! │  remove_line(i) ───────────► remove(i) ──────────► -= unit × qty       │
//! │                                                                         │
//! │  finalize ─────────────────► (read only) ────────► Order               │
//! │                                                                         │
//! │  NOTE: every check runs before the first mutation, so a failed call     │
//! │        leaves lines and totals exactly as they were.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adding the same product twice appends two lines. Lines are never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CustomerRef, Order, OrderLineItem, OrderOrigin, PricePair, Product, TaxRate,
    VariationSelector,
};
use crate::validation::{validate_draft_size, validate_quantity};

/// What to add, before a price is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    pub product_id: String,
    pub product_name: String,
    pub variation: VariationSelector,
    pub variation_name: Option<String>,
    pub quantity: i64,
}

impl NewLine {
    /// Snapshots the product's name and the selected variation's name.
    pub fn from_product(product: &Product, variation: VariationSelector, quantity: i64) -> Self {
        NewLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            variation,
            variation_name: product.variation(variation).map(|v| v.name.clone()),
            quantity,
        }
    }
}

/// A draft order.
///
/// ## Invariants
/// - `totals == Σ(line.unit_price × line.quantity)` after every call
/// - Every line has `1 <= quantity <= MAX_ITEM_QUANTITY`
/// - At most MAX_ORDER_LINES lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    lines: Vec<OrderLineItem>,
    totals: PricePair,
    tax_rate: TaxRate,
    origin: OrderOrigin,
    notes: Option<String>,
}

impl OrderDraft {
    /// Creates an empty draft at the default tax rate.
    pub fn new(origin: OrderOrigin) -> Self {
        OrderDraft {
            lines: Vec::new(),
            totals: PricePair::zero(),
            tax_rate: TaxRate::default(),
            origin,
            notes: None,
        }
    }

    /// Overrides the rate used by [`OrderDraft::add_tax_inclusive_line`].
    pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn lines(&self) -> &[OrderLineItem] {
        &self.lines
    }

    pub fn totals(&self) -> PricePair {
        self.totals
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn origin(&self) -> OrderOrigin {
        self.origin
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Blank notes are stored as none.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends a line at a known unit price.
    ///
    /// Returns the index of the new line.
    pub fn add_priced_line(&mut self, line: NewLine, unit_price: PricePair) -> CoreResult<usize> {
        validate_quantity(line.quantity)?;
        validate_draft_size(self.lines.len())?;

        let item = OrderLineItem {
            product_id: line.product_id,
            product_name: line.product_name,
            variation: line.variation,
            variation_name: line.variation_name,
            quantity: line.quantity,
            unit_price,
        };
        self.totals = self.totals + item.line_total();
        self.lines.push(item);

        Ok(self.lines.len() - 1)
    }

    /// Appends a line when only the tax-inclusive unit price is known.
    ///
    /// The tax-exclusive half is derived at the draft's tax rate.
    pub fn add_tax_inclusive_line(&mut self, line: NewLine, with_tax: Money) -> CoreResult<usize> {
        let unit_price = PricePair::from_tax_inclusive(with_tax, self.tax_rate);
        self.add_priced_line(line, unit_price)
    }

    /// Removes a line and subtracts its contribution from the totals.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<OrderLineItem> {
        self.check_index(index)?;

        let item = self.lines.remove(index);
        self.totals = self.totals - item.line_total();
        Ok(item)
    }

    /// Changes a line's quantity. Anything below 1 removes the line.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        if quantity < 1 {
            return self.remove_line(index).map(|_| ());
        }

        self.check_index(index)?;
        validate_quantity(quantity)?;

        let line = &mut self.lines[index];
        let delta = line.unit_price.times(quantity - line.quantity);
        line.quantity = quantity;
        self.totals = self.totals + delta;
        Ok(())
    }

    /// Drops every line and resets the totals.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.totals = PricePair::zero();
    }

    /// Builds the immutable order, stamped now.
    pub fn finalize(&self, customer: Option<CustomerRef>) -> CoreResult<Order> {
        self.finalize_at(customer, Utc::now())
    }

    /// Builds the immutable order with an explicit creation time.
    ///
    /// ## Errors
    /// - `EmptyOrder` if there are no lines
    /// - `MissingCustomer` if the reference is absent or has no non-blank field
    pub fn finalize_at(
        &self,
        customer: Option<CustomerRef>,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Order> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyOrder);
        }

        let customer = customer
            .filter(CustomerRef::is_present)
            .ok_or(CoreError::MissingCustomer)?;

        Ok(Order {
            id: Uuid::new_v4().to_string(),
            customer,
            created_at: Some(created_at),
            items: self.lines.clone(),
            total_before_tax: self.totals.before_tax,
            total_with_tax: self.totals.with_tax,
            status: self.origin.initial_status(),
            origin: self.origin,
            notes: self.notes.clone(),
            invoice: None,
        })
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound {
                index,
                len: self.lines.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::OrderStatus;
    use proptest::prelude::*;

    fn line(product_id: &str, quantity: i64) -> NewLine {
        NewLine {
            product_id: product_id.to_string(),
            product_name: format!("Product {}", product_id),
            variation: VariationSelector::Base,
            variation_name: None,
            quantity,
        }
    }

    fn price(before: i64, with: i64) -> PricePair {
        PricePair::new(Money::from_cents(before), Money::from_cents(with))
    }

    fn resummed(draft: &OrderDraft) -> PricePair {
        draft
            .lines()
            .iter()
            .fold(PricePair::zero(), |acc, l| acc + l.line_total())
    }

    #[test]
    fn test_set_quantity_adjusts_totals_by_delta() {
        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        draft.add_priced_line(line("P", 3), price(85, 100)).unwrap();
        assert_eq!(draft.totals().with_tax.cents(), 300);

        draft.set_quantity(0, 5).unwrap();
        assert_eq!(draft.lines()[0].quantity, 5);
        assert_eq!(draft.totals().with_tax, Money::from_cents(500));
        assert_eq!(draft.totals().before_tax, Money::from_cents(425));
    }

    #[test]
    fn test_same_product_twice_appends_two_lines() {
        let mut draft = OrderDraft::new(OrderOrigin::AdminPortal);
        draft.add_priced_line(line("P", 1), price(85, 100)).unwrap();
        draft.add_priced_line(line("P", 2), price(85, 100)).unwrap();
        assert_eq!(draft.len(), 2);
        assert_eq!(draft.totals().with_tax.cents(), 300);
    }

    #[test]
    fn test_failed_add_leaves_draft_untouched() {
        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        draft.add_priced_line(line("P", 2), price(85, 100)).unwrap();
        let before = draft.clone();

        assert!(matches!(
            draft.add_priced_line(line("Q", 0), price(10, 12)),
            Err(CoreError::InvalidQuantity(0))
        ));
        assert!(matches!(
            draft.add_priced_line(line("Q", 5000), price(10, 12)),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert_eq!(draft, before);
    }

    #[test]
    fn test_set_quantity_below_one_removes_line() {
        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        draft.add_priced_line(line("A", 2), price(85, 100)).unwrap();
        draft.add_priced_line(line("B", 1), price(170, 200)).unwrap();

        draft.set_quantity(0, 0).unwrap();
        assert_eq!(draft.len(), 1);
        assert_eq!(draft.lines()[0].product_id, "B");
        assert_eq!(draft.totals(), price(170, 200));
    }

    #[test]
    fn test_line_not_found() {
        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        assert!(matches!(
            draft.remove_line(0),
            Err(CoreError::LineNotFound { index: 0, len: 0 })
        ));
        assert!(matches!(
            draft.set_quantity(3, 2),
            Err(CoreError::LineNotFound { index: 3, .. })
        ));
    }

    #[test]
    fn test_tax_inclusive_line_derives_before_tax() {
        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        draft
            .add_tax_inclusive_line(line("P", 2), Money::from_cents(59))
            .unwrap();
        assert_eq!(draft.lines()[0].unit_price, price(50, 59));
        assert_eq!(draft.totals(), price(100, 118));
    }

    #[test]
    fn test_finalize_preconditions() {
        let draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        assert!(matches!(
            draft.finalize(Some(CustomerRef::with_id("C"))),
            Err(CoreError::EmptyOrder)
        ));

        let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);
        draft.add_priced_line(line("P", 1), price(85, 100)).unwrap();
        assert!(matches!(draft.finalize(None), Err(CoreError::MissingCustomer)));
        assert!(matches!(
            draft.finalize(Some(CustomerRef::default())),
            Err(CoreError::MissingCustomer)
        ));
    }

    #[test]
    fn test_finalize_builds_order() {
        let mut draft = OrderDraft::new(OrderOrigin::AdminPortal);
        draft.add_priced_line(line("P", 3), price(85, 100)).unwrap();
        draft.set_notes(Some("leave at the door".to_string()));

        let now = Utc::now();
        let order = draft.finalize_at(Some(CustomerRef::with_id("C")), now).unwrap();

        assert!(Uuid::parse_str(&order.id).is_ok());
        assert_eq!(order.created_at, Some(now));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.total_with_tax.cents(), 300);
        assert_eq!(order.total_before_tax.cents(), 255);
        assert_eq!(order.notes.as_deref(), Some("leave at the door"));
        assert_eq!(order.items, draft.lines());

        let customer_order = {
            let mut d = OrderDraft::new(OrderOrigin::CustomerPortal);
            d.add_priced_line(line("P", 1), price(85, 100)).unwrap();
            d.finalize(Some(CustomerRef::with_id("C"))).unwrap()
        };
        assert_eq!(customer_order.status, OrderStatus::Pending);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { quantity: i64, net: i64, gross: i64 },
        SetQuantity { index: usize, quantity: i64 },
        Remove { index: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-2i64..20, 0i64..50_000, 0i64..60_000)
                .prop_map(|(quantity, net, gross)| Op::Add { quantity, net, gross }),
            (0usize..12, -2i64..1200)
                .prop_map(|(index, quantity)| Op::SetQuantity { index, quantity }),
            (0usize..12).prop_map(|index| Op::Remove { index }),
        ]
    }

    proptest! {
        #[test]
        fn prop_totals_match_resummed_lines(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let mut draft = OrderDraft::new(OrderOrigin::CustomerPortal);

            for op in ops {
                let snapshot = draft.clone();
                let result = match op {
                    Op::Add { quantity, net, gross } => draft
                        .add_priced_line(line("P", quantity), price(net, gross))
                        .map(|_| ()),
                    Op::SetQuantity { index, quantity } => draft.set_quantity(index, quantity),
                    Op::Remove { index } => draft.remove_line(index).map(|_| ()),
                };

                if result.is_err() {
                    prop_assert_eq!(&draft, &snapshot);
                }
                prop_assert_eq!(draft.totals(), resummed(&draft));
                prop_assert!(draft.lines().iter().all(|l| l.quantity >= 1));
            }
        }
    }
}
