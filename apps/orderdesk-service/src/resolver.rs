//! # Price Resolver
//!
//! Store-backed price resolution. Fetches the exact-key override and, only
//! on a miss, the product; the tier logic itself is
//! [`orderdesk_core::pricing`].
//!
//! ```text
//! resolve(customer?, product, selector)
//!   │
//!   ├── customer present ──► PricingStore::find_override(exact key)
//!   │                              │ hit → Override prices
//!   │                              ▼ miss
//!   └───────────────────────► CatalogStore::product(id)
//!                                  │ none → ProductNotFound
//!                                  ▼
//!                             Index(i) → variations[i] | VariationNotFound
//!                             Base     → base prices   | NoPriceDefined
//! ```
//!
//! An override hit is still checked against the product when the product
//! exists: a stored override for `Base` on a product with variations, or
//! for an index past the end, does not make that slot sellable.

use std::sync::Arc;

use orderdesk_core::pricing::{self, purchasable_selectors};
use orderdesk_core::{OverrideKey, PricePair, Product, ResolvedPrice, VariationSelector};
use orderdesk_db::{CatalogStore, PricingStore, Stores};
use tracing::debug;

use crate::error::ServiceResult;

/// Resolves effective unit prices.
///
/// Cloning is cheap: both store handles are reference counted.
#[derive(Clone)]
pub struct PriceResolver {
    catalog: Arc<dyn CatalogStore>,
    pricing: Arc<dyn PricingStore>,
}

impl PriceResolver {
    pub fn new(catalog: Arc<dyn CatalogStore>, pricing: Arc<dyn PricingStore>) -> Self {
        PriceResolver { catalog, pricing }
    }

    pub fn from_stores(stores: &Stores) -> Self {
        PriceResolver::new(stores.catalog.clone(), stores.pricing.clone())
    }

    /// The effective unit price and the tier it came from.
    ///
    /// A blank `customer_id` is treated as absent.
    pub async fn resolve(
        &self,
        customer_id: Option<&str>,
        product_id: &str,
        selector: VariationSelector,
    ) -> ServiceResult<ResolvedPrice> {
        self.resolve_with_product(customer_id, product_id, selector)
            .await
            .map(|(resolved, _)| resolved)
    }

    /// Just the price pair.
    pub async fn resolve_price(
        &self,
        customer_id: Option<&str>,
        product_id: &str,
        selector: VariationSelector,
    ) -> ServiceResult<PricePair> {
        Ok(self.resolve(customer_id, product_id, selector).await?.prices)
    }

    /// Resolves and also returns the product when it was fetched.
    ///
    /// On an override hit the product is fetched anyway so callers can
    /// snapshot its name; a missing product does not fail an override hit.
    pub(crate) async fn resolve_with_product(
        &self,
        customer_id: Option<&str>,
        product_id: &str,
        selector: VariationSelector,
    ) -> ServiceResult<(ResolvedPrice, Option<Product>)> {
        let rule = match customer_id.filter(|id| !id.trim().is_empty()) {
            Some(customer_id) => {
                let key = OverrideKey::new(customer_id, product_id, selector);
                self.pricing.find_override(&key).await?
            }
            None => None,
        };

        let product = self.catalog.product(product_id).await?;
        let resolved = pricing::resolve_price(rule.as_ref(), product.as_ref(), product_id, selector)?;

        debug!(
            product_id = %product_id,
            selector = %selector,
            source = ?resolved.source,
            "Resolved price"
        );
        Ok((resolved, product))
    }

    /// Catalog lookup without price resolution.
    pub(crate) async fn product(&self, product_id: &str) -> ServiceResult<Option<Product>> {
        Ok(self.catalog.product(product_id).await?)
    }

    /// Every purchasable selector of a product with its effective price for
    /// this customer.
    pub async fn price_list(
        &self,
        customer_id: Option<&str>,
        product: &Product,
    ) -> ServiceResult<Vec<(VariationSelector, ResolvedPrice)>> {
        let mut prices = Vec::new();
        for selector in purchasable_selectors(product) {
            let resolved = self.resolve(customer_id, &product.id, selector).await?;
            prices.push((selector, resolved));
        }
        Ok(prices)
    }
}

impl std::fmt::Debug for PriceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceResolver").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{bread, oil, seeded_store};
    use orderdesk_core::{CoreError, Money, PriceSource};

    fn pair(before: i64, with: i64) -> PricePair {
        PricePair::new(Money::from_cents(before), Money::from_cents(with))
    }

    #[tokio::test]
    async fn test_override_wins_for_its_customer_only() {
        let (store, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        store
            .upsert_override(
                &OverrideKey::new("C", &bread().id, VariationSelector::Base),
                pair(50, 59),
            )
            .await
            .unwrap();

        let theirs = resolver
            .resolve(Some("C"), &bread().id, VariationSelector::Base)
            .await
            .unwrap();
        assert_eq!(theirs.prices, pair(50, 59));
        assert_eq!(theirs.source, PriceSource::Override);

        let catalog = resolver
            .resolve_price(None, &bread().id, VariationSelector::Base)
            .await
            .unwrap();
        assert_eq!(catalog, pair(85, 100));

        let other = resolver
            .resolve_price(Some("D"), &bread().id, VariationSelector::Base)
            .await
            .unwrap();
        assert_eq!(other, pair(85, 100));
    }

    #[tokio::test]
    async fn test_variation_tier_and_out_of_range() {
        let (_, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);

        let one_litre = resolver
            .resolve(None, &oil().id, VariationSelector::Index(1))
            .await
            .unwrap();
        assert_eq!(one_litre.source, PriceSource::Variation);
        assert_eq!(one_litre.prices, oil().variations[1].prices());

        let err = resolver
            .resolve(None, &oil().id, VariationSelector::Index(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::VariationNotFound { available: 2, .. })
        ));

        // No base price and variations present
        let err = resolver
            .resolve(None, &oil().id, VariationSelector::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::NoPriceDefined { .. })));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (_, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        let err = resolver
            .resolve(Some("C"), "missing", VariationSelector::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_override_for_variation_does_not_answer_base() {
        let (store, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        store
            .upsert_override(
                &OverrideKey::new("C", &oil().id, VariationSelector::Index(0)),
                pair(1000, 1180),
            )
            .await
            .unwrap();

        let first = resolver
            .resolve_price(Some("C"), &oil().id, VariationSelector::Index(0))
            .await
            .unwrap();
        assert_eq!(first, pair(1000, 1180));

        let second = resolver
            .resolve_price(Some("C"), &oil().id, VariationSelector::Index(1))
            .await
            .unwrap();
        assert_eq!(second, oil().variations[1].prices());
    }

    #[tokio::test]
    async fn test_override_cannot_price_unsellable_slot() {
        let (store, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        for selector in [VariationSelector::Base, VariationSelector::Index(7)] {
            store
                .upsert_override(&OverrideKey::new("C", &oil().id, selector), pair(100, 118))
                .await
                .unwrap();
        }

        let err = resolver
            .resolve(Some("C"), &oil().id, VariationSelector::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::NoPriceDefined { .. })));

        let err = resolver
            .resolve(Some("C"), &oil().id, VariationSelector::Index(7))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::VariationNotFound { index: 7, .. })
        ));
    }

    #[tokio::test]
    async fn test_price_list_applies_overrides() {
        let (store, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        store
            .upsert_override(
                &OverrideKey::new("C", &oil().id, VariationSelector::Index(1)),
                pair(5000, 5900),
            )
            .await
            .unwrap();

        let list = resolver.price_list(Some("C"), &oil()).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, VariationSelector::Index(0));
        assert_eq!(list[1].1.prices, pair(5000, 5900));
    }

    #[tokio::test]
    async fn test_store_outage_is_upstream_unavailable() {
        let (store, stores) = seeded_store().await;
        let resolver = PriceResolver::from_stores(&stores);
        store.set_unavailable(true);

        let err = resolver
            .resolve(Some("C"), &bread().id, VariationSelector::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamUnavailable(_)));
    }
}
