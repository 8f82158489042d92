//! # Catalog Service
//!
//! Read side of the catalog as the portals see it: active products with
//! each purchasable price already resolved for the viewing customer.

use std::collections::HashMap;
use std::sync::Arc;

use orderdesk_core::pricing::is_purchasable;
use orderdesk_core::{Category, PriceSource, PricePair, Product, VariationSelector};
use orderdesk_db::{CatalogStore, Stores};
use serde::Serialize;
use tracing::debug;

use crate::error::ServiceResult;
use crate::resolver::PriceResolver;

/// One purchasable price of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub variation: VariationSelector,
    /// "Olive Oil / 1L" for a variation, the product name otherwise.
    pub display_name: String,
    pub prices: PricePair,
    pub source: PriceSource,
}

/// A product with its quotes for one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub product: Product,
    pub quotes: Vec<PriceQuote>,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    resolver: PriceResolver,
}

impl CatalogService {
    pub fn new(stores: &Stores) -> Self {
        CatalogService {
            catalog: stores.catalog.clone(),
            resolver: PriceResolver::from_stores(stores),
        }
    }

    /// Active products ordered by name, priced for `customer_id`.
    ///
    /// With `purchasable_only`, products without any positive catalog price
    /// are left out, matching the portals' add-to-cart rule.
    pub async fn listing(
        &self,
        customer_id: Option<&str>,
        purchasable_only: bool,
    ) -> ServiceResult<Vec<CatalogEntry>> {
        let products = self.catalog.products(false).await?;
        let mut entries = Vec::with_capacity(products.len());

        for product in products {
            if purchasable_only && !is_purchasable(&product) {
                continue;
            }
            let quotes = self
                .resolver
                .price_list(customer_id, &product)
                .await?
                .into_iter()
                .map(|(variation, resolved)| PriceQuote {
                    variation,
                    display_name: product.display_name(variation),
                    prices: resolved.prices,
                    source: resolved.source,
                })
                .collect();
            entries.push(CatalogEntry { product, quotes });
        }

        debug!(count = entries.len(), "Catalog listing built");
        Ok(entries)
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.catalog.categories().await?)
    }

    /// Product id to name, inactive products included, for joining names
    /// into stored order lines.
    pub async fn product_names(&self) -> ServiceResult<HashMap<String, String>> {
        Ok(self
            .catalog
            .products(true)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect())
    }
}
