//! # Pricing Admin
//!
//! Admin-side management of per-customer price overrides.
//!
//! ```text
//! set_override(key, prices)
//!   1. validate ids and both price halves   ── Validation
//!   2. product must exist                   ── ProductNotFound
//!   3. selector must be sellable            ── VariationNotFound (i ≥ len)
//!                                              NoPriceDefined (Base with
//!                                              variations present)
//!   4. PricingStore::upsert_override        (atomic, id preserved)
//! ```

use std::sync::Arc;

use orderdesk_core::pricing::{check_selector, resolve_catalog_price};
use orderdesk_core::validation::{validate_customer_id, validate_price_pair, validate_product_id};
use orderdesk_core::{
    CoreError, OverrideKey, PricePair, PricingOverrideRule, Product, VariationSelector,
    UNKNOWN_PRODUCT_NAME,
};
use orderdesk_db::{CatalogStore, PricingStore, Stores};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::BatchReport;
use crate::error::ServiceResult;

/// One row of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub product_id: String,
    pub variation: VariationSelector,
    pub prices: PricePair,
}

/// An override next to the catalog price it replaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSheetEntry {
    pub rule: PricingOverrideRule,
    pub product_name: String,
    /// `None` when the product is gone or has no catalog price there.
    pub catalog: Option<PricePair>,
}

#[derive(Clone)]
pub struct PricingAdmin {
    catalog: Arc<dyn CatalogStore>,
    pricing: Arc<dyn PricingStore>,
}

fn catalog_price(product: &Product, selector: VariationSelector) -> Option<PricePair> {
    resolve_catalog_price(product, selector)
        .ok()
        .map(|resolved| resolved.prices)
}

impl PricingAdmin {
    pub fn new(stores: &Stores) -> Self {
        PricingAdmin {
            catalog: stores.catalog.clone(),
            pricing: stores.pricing.clone(),
        }
    }

    /// Creates the override or updates the existing one for the key.
    pub async fn set_override(
        &self,
        key: &OverrideKey,
        prices: PricePair,
    ) -> ServiceResult<PricingOverrideRule> {
        validate_customer_id(&key.customer_id).map_err(CoreError::from)?;
        validate_product_id(&key.product_id).map_err(CoreError::from)?;
        validate_price_pair(&prices).map_err(CoreError::from)?;

        let product = self
            .catalog
            .product(&key.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(key.product_id.clone()))?;

        check_selector(&product, key.variation)?;

        let rule = self.pricing.upsert_override(key, prices).await?;
        info!(key = %key, rule_id = %rule.id, "Price override saved");
        Ok(rule)
    }

    /// Returns whether a rule existed for the key.
    pub async fn remove_override(&self, key: &OverrideKey) -> ServiceResult<bool> {
        let removed = self.pricing.delete_override(key).await?;
        if removed {
            info!(key = %key, "Price override removed");
        } else {
            debug!(key = %key, "No price override to remove");
        }
        Ok(removed)
    }

    /// All overrides of a customer with product names and catalog prices.
    pub async fn price_sheet(&self, customer_id: &str) -> ServiceResult<Vec<PriceSheetEntry>> {
        let rules = self.pricing.overrides_for_customer(customer_id).await?;
        let mut sheet = Vec::with_capacity(rules.len());

        for rule in rules {
            let product = self.catalog.product(&rule.product_id).await?;
            let (product_name, catalog) = match &product {
                Some(product) => (
                    product.display_name(rule.variation),
                    catalog_price(product, rule.variation),
                ),
                None => (UNKNOWN_PRODUCT_NAME.to_string(), None),
            };
            sheet.push(PriceSheetEntry {
                rule,
                product_name,
                catalog,
            });
        }
        Ok(sheet)
    }

    /// Applies each entry on its own; failures are reported, not raised.
    pub async fn apply_batch(
        &self,
        customer_id: &str,
        entries: Vec<OverrideEntry>,
    ) -> BatchReport<OverrideKey> {
        let mut report = BatchReport::new();
        for entry in entries {
            let key = OverrideKey::new(customer_id, entry.product_id, entry.variation);
            let outcome = self.set_override(&key, entry.prices).await;
            report.record(key, outcome);
        }

        info!(
            customer_id = %customer_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Override batch applied"
        );
        report
    }
}
