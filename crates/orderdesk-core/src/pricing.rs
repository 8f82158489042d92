//! # Price Tiers
//!
//! Pure half of the price resolver. The store-backed half lives in
//! `orderdesk-service::resolver` and only decides which of these inputs to
//! fetch.
//!
//! ## Resolution Order (first match wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Override     exact (customer, product, selector) key               │
//! │        │ miss                                                           │
//! │        ▼                                                                │
//! │  2. Variation    selector = Index(i)  → variations[i]                   │
//! │        │                              → VariationNotFound if i ≥ len    │
//! │        ▼                                                                │
//! │  3. Base         selector = Base      → base price pair                 │
//! │                                       → NoPriceDefined if none         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no partial matching: an override for `Index(0)` never answers
//! a `Base` lookup and vice versa.
//!
//! A product with variations is only sold by variation. `Base` on such a
//! product is `NoPriceDefined` even when a base price is stored, and an
//! override cannot reopen it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{PricePair, PricingOverrideRule, Product, VariationSelector};

/// Which tier produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Override,
    Variation,
    Base,
}

/// A resolved price together with the tier it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedPrice {
    pub prices: PricePair,
    pub source: PriceSource,
}

impl ResolvedPrice {
    /// Tier 1: the override's prices, as stored.
    pub fn from_override(rule: &PricingOverrideRule) -> Self {
        ResolvedPrice {
            prices: rule.prices(),
            source: PriceSource::Override,
        }
    }
}

/// Tiers 2 and 3: the catalog price of a product at a selector.
///
/// ## Example
/// ```rust
/// use orderdesk_core::pricing::resolve_catalog_price;
/// use orderdesk_core::{Money, Product, VariationSelector};
///
/// let product = Product {
///     id: "p-1".into(),
///     name: "Pita".into(),
///     category_id: None,
///     image_url: None,
///     price_before_tax: Some(Money::from_cents(85)),
///     price_with_tax: Some(Money::from_cents(100)),
///     variations: vec![],
///     is_active: true,
/// };
/// let resolved = resolve_catalog_price(&product, VariationSelector::Base).unwrap();
/// assert_eq!(resolved.prices.with_tax.cents(), 100);
/// ```
pub fn resolve_catalog_price(
    product: &Product,
    selector: VariationSelector,
) -> CoreResult<ResolvedPrice> {
    check_selector(product, selector)?;

    let resolved = match selector {
        VariationSelector::Index(index) => product.variations.get(index).map(|variation| {
            ResolvedPrice {
                prices: variation.prices(),
                source: PriceSource::Variation,
            }
        }),
        VariationSelector::Base => product.base_prices().map(|prices| ResolvedPrice {
            prices,
            source: PriceSource::Base,
        }),
    };
    resolved.ok_or_else(|| CoreError::NoPriceDefined {
        product_id: product.id.clone(),
        variation: selector.as_index(),
    })
}

/// Checks that `selector` names a sellable slot of `product`.
///
/// Out-of-range indices are `VariationNotFound`; `Base` on a product with
/// variations is `NoPriceDefined`.
pub fn check_selector(product: &Product, selector: VariationSelector) -> CoreResult<()> {
    match selector {
        VariationSelector::Index(index) if index >= product.variations.len() => {
            Err(CoreError::VariationNotFound {
                product_id: product.id.clone(),
                index,
                available: product.variations.len(),
            })
        }
        VariationSelector::Base if product.has_variations() => Err(CoreError::NoPriceDefined {
            product_id: product.id.clone(),
            variation: selector.as_index(),
        }),
        _ => Ok(()),
    }
}

/// Full three-tier resolution over already-fetched inputs.
///
/// `rule` must be the override for the exact key, if any. When both are
/// given the selector is checked against `product` first, so an override
/// never prices a slot the product does not sell. An override for a
/// product that no longer exists still answers.
pub fn resolve_price(
    rule: Option<&PricingOverrideRule>,
    product: Option<&Product>,
    product_id: &str,
    selector: VariationSelector,
) -> CoreResult<ResolvedPrice> {
    if let Some(rule) = rule {
        if let Some(product) = product {
            check_selector(product, selector)?;
        }
        return Ok(ResolvedPrice::from_override(rule));
    }

    let product = product.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    resolve_catalog_price(product, selector)
}

/// Every selector of a product whose catalog price has a positive
/// tax-inclusive half.
pub fn purchasable_selectors(product: &Product) -> Vec<VariationSelector> {
    std::iter::once(VariationSelector::Base)
        .chain((0..product.variations.len()).map(VariationSelector::Index))
        .filter(|selector| {
            resolve_catalog_price(product, *selector)
                .is_ok_and(|resolved| resolved.prices.with_tax.is_positive())
        })
        .collect()
}

/// True when at least one selector resolves to a positive tax-inclusive
/// catalog price. Used by the portals to enable add-to-cart.
pub fn is_purchasable(product: &Product) -> bool {
    !purchasable_selectors(product).is_empty()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::Variation;
    use chrono::Utc;

    fn pita() -> Product {
        Product {
            id: "P".to_string(),
            name: "Pita".to_string(),
            category_id: None,
            image_url: None,
            price_before_tax: Some(Money::from_cents(85)),
            price_with_tax: Some(Money::from_cents(100)),
            variations: vec![],
            is_active: true,
        }
    }

    fn oil() -> Product {
        Product {
            id: "oil".to_string(),
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
                    name: "sample".to_string(),
                    price_before_tax: Money::zero(),
                    price_with_tax: Money::zero(),
                },
            ],
            is_active: true,
        }
    }

    fn rule(customer: &str, product: &str, selector: VariationSelector, before: i64, with: i64) -> PricingOverrideRule {
        PricingOverrideRule {
            id: "r-1".to_string(),
            customer_id: customer.to_string(),
            product_id: product.to_string(),
            variation: selector,
            price_before_tax: Money::from_cents(before),
            price_with_tax: Money::from_cents(with),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_override_wins_over_catalog() {
        let product = pita();
        let rule = rule("C", "P", VariationSelector::Base, 50, 59);

        let resolved = resolve_price(Some(&rule), Some(&product), "P", VariationSelector::Base).unwrap();
        assert_eq!(resolved.prices, PricePair::new(Money::from_cents(50), Money::from_cents(59)));
        assert_eq!(resolved.source, PriceSource::Override);

        let resolved = resolve_price(None, Some(&product), "P", VariationSelector::Base).unwrap();
        assert_eq!(resolved.prices, PricePair::new(Money::from_cents(85), Money::from_cents(100)));
        assert_eq!(resolved.source, PriceSource::Base);
    }

    #[test]
    fn test_override_needs_no_product() {
        let rule = rule("C", "gone", VariationSelector::Index(3), 10, 12);
        let resolved = resolve_price(Some(&rule), None, "gone", VariationSelector::Index(3)).unwrap();
        assert_eq!(resolved.prices.with_tax.cents(), 12);
    }

    #[test]
    fn test_variation_tier() {
        let resolved = resolve_catalog_price(&oil(), VariationSelector::Index(0)).unwrap();
        assert_eq!(resolved.prices.with_tax.cents(), 2000);
        assert_eq!(resolved.source, PriceSource::Variation);
    }

    #[test]
    fn test_variation_out_of_range() {
        let err = resolve_catalog_price(&oil(), VariationSelector::Index(2)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::VariationNotFound { index: 2, available: 2, .. }
        ));

        let err = resolve_catalog_price(&pita(), VariationSelector::Index(0)).unwrap_err();
        assert!(matches!(err, CoreError::VariationNotFound { available: 0, .. }));
    }

    #[test]
    fn test_base_without_base_price() {
        let err = resolve_catalog_price(&oil(), VariationSelector::Base).unwrap_err();
        assert!(matches!(err, CoreError::NoPriceDefined { variation: -1, .. }));

        let mut bare = pita();
        bare.price_with_tax = None;
        bare.price_before_tax = None;
        assert!(matches!(
            resolve_catalog_price(&bare, VariationSelector::Base),
            Err(CoreError::NoPriceDefined { .. })
        ));
    }

    #[test]
    fn test_base_closed_when_product_has_variations() {
        let mut both = oil();
        both.price_before_tax = Some(Money::from_cents(85));
        both.price_with_tax = Some(Money::from_cents(100));

        let err = resolve_catalog_price(&both, VariationSelector::Base).unwrap_err();
        assert!(matches!(err, CoreError::NoPriceDefined { variation: -1, .. }));
        assert_eq!(purchasable_selectors(&both), vec![VariationSelector::Index(0)]);

        let base_rule = rule("C", "oil", VariationSelector::Base, 50, 59);
        let err = resolve_price(Some(&base_rule), Some(&both), "oil", VariationSelector::Base)
            .unwrap_err();
        assert!(matches!(err, CoreError::NoPriceDefined { .. }));

        let stale = rule("C", "oil", VariationSelector::Index(5), 50, 59);
        let err = resolve_price(Some(&stale), Some(&both), "oil", VariationSelector::Index(5))
            .unwrap_err();
        assert!(matches!(err, CoreError::VariationNotFound { index: 5, .. }));
    }

    #[test]
    fn test_check_selector() {
        assert!(check_selector(&pita(), VariationSelector::Base).is_ok());
        assert!(check_selector(&oil(), VariationSelector::Index(1)).is_ok());
        assert!(check_selector(&oil(), VariationSelector::Base).is_err());
        assert!(check_selector(&pita(), VariationSelector::Index(0)).is_err());
    }

    #[test]
    fn test_missing_product() {
        let err = resolve_price(None, None, "nope", VariationSelector::Base).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "nope"));
    }

    #[test]
    fn test_purchasable() {
        assert!(is_purchasable(&pita()));
        assert_eq!(purchasable_selectors(&oil()), vec![VariationSelector::Index(0)]);

        let mut free = pita();
        free.price_with_tax = Some(Money::zero());
        assert!(!is_purchasable(&free));
    }
}
