//! # Order Composer
//!
//! A draft bound to a customer, with prices resolved at the moment each
//! line is added.
//!
//! ```text
//! add_line(p, sel, q)
//!   1. validate q                  ── InvalidQuantity / QuantityTooLarge
//!   2. resolver.resolve(customer)  ── ProductNotFound / VariationNotFound /
//!                                     NoPriceDefined / UpstreamUnavailable
//!   3. draft.add_priced_line       ── TooManyLines
//! ```
//!
//! Steps 1 and 2 never touch the draft, and step 3 checks before it
//! mutates, so a failed call leaves lines and totals as they were.
//! `add_cart_line` skips resolution but still requires the product and a
//! selector it sells.

use orderdesk_core::pricing::check_selector;
use orderdesk_core::validation::validate_quantity;
use orderdesk_core::{
    CoreError, CustomerRef, Money, NewLine, Order, OrderDraft, OrderLineItem, OrderOrigin, PricePair,
    Product, TaxRate, VariationSelector,
};
use tracing::debug;

use crate::error::ServiceResult;
use crate::resolver::PriceResolver;

fn snapshot_line(
    product: Option<&Product>,
    product_id: &str,
    selector: VariationSelector,
    quantity: i64,
) -> NewLine {
    match product {
        Some(product) => NewLine::from_product(product, selector, quantity),
        None => NewLine {
            product_id: product_id.to_string(),
            product_name: orderdesk_core::UNKNOWN_PRODUCT_NAME.to_string(),
            variation: selector,
            variation_name: None,
            quantity,
        },
    }
}

/// Composes one order.
#[derive(Debug, Clone)]
pub struct OrderComposer {
    resolver: PriceResolver,
    customer: Option<CustomerRef>,
    draft: OrderDraft,
}

impl OrderComposer {
    pub fn new(resolver: PriceResolver, origin: OrderOrigin) -> Self {
        OrderComposer {
            resolver,
            customer: None,
            draft: OrderDraft::new(origin),
        }
    }

    /// Prices are resolved for this customer, who is also the order's
    /// customer at finalize.
    pub fn for_customer(mut self, customer: CustomerRef) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.draft = self.draft.with_tax_rate(tax_rate);
        self
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn lines(&self) -> &[OrderLineItem] {
        self.draft.lines()
    }

    pub fn totals(&self) -> PricePair {
        self.draft.totals()
    }

    pub fn customer(&self) -> Option<&CustomerRef> {
        self.customer.as_ref()
    }

    fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.id.as_deref())
    }

    /// Resolves the current price and appends a snapshot line.
    ///
    /// Returns the index of the new line.
    pub async fn add_line(
        &mut self,
        product_id: &str,
        selector: VariationSelector,
        quantity: i64,
    ) -> ServiceResult<usize> {
        validate_quantity(quantity)?;

        let (resolved, product) = self
            .resolver
            .resolve_with_product(self.customer_id(), product_id, selector)
            .await?;

        let line = snapshot_line(product.as_ref(), product_id, selector, quantity);
        let index = self.draft.add_priced_line(line, resolved.prices)?;

        debug!(
            product_id = %product_id,
            quantity,
            source = ?resolved.source,
            lines = self.draft.len(),
            "Line added"
        );
        Ok(index)
    }

    /// Appends a line at a caller-supplied price.
    pub fn add_priced_line(&mut self, line: NewLine, unit_price: PricePair) -> ServiceResult<usize> {
        Ok(self.draft.add_priced_line(line, unit_price)?)
    }

    /// Appends a cart line that only carries a tax-inclusive unit price.
    ///
    /// The price is the cart's, with the tax-exclusive half derived at the
    /// draft's rate. The product must exist and sell `selector`.
    pub async fn add_cart_line(
        &mut self,
        product_id: &str,
        selector: VariationSelector,
        quantity: i64,
        with_tax: Money,
    ) -> ServiceResult<usize> {
        validate_quantity(quantity)?;

        let product = self
            .resolver
            .product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        check_selector(&product, selector)?;

        let line = NewLine::from_product(&product, selector, quantity);
        Ok(self.draft.add_tax_inclusive_line(line, with_tax)?)
    }

    pub fn remove_line(&mut self, index: usize) -> ServiceResult<OrderLineItem> {
        Ok(self.draft.remove_line(index)?)
    }

    /// Below 1 removes the line.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> ServiceResult<()> {
        Ok(self.draft.set_quantity(index, quantity)?)
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.draft.set_notes(notes);
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Builds the immutable order. Nothing is persisted here.
    pub fn finalize(&self) -> ServiceResult<Order> {
        Ok(self.draft.finalize(self.customer.clone())?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
