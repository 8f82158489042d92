//! # In-Memory Store
//!
//! Implements all three store traits over plain collections behind one
//! async mutex. Service tests run against it.
//!
//! Holding a single lock for every operation makes each trait call atomic,
//! which gives the same guarantees as the SQLite statements: the override
//! upsert can't race, and the version check plus write of a status update
//! happen together.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use orderdesk_core::validation::validate_product;
use orderdesk_core::{
    Category, InvoiceRef, OrderStatus, OverrideKey, PricePair, PricingOverrideRule, Product,
};

use crate::error::{DbError, DbResult};
use crate::store::{
    set_document_invoice, set_document_status, CatalogStore, OrderIndex, OrderStore, PricingStore,
    StoredOrder,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<String, Product>,
    categories: HashMap<String, Category>,
    overrides: BTreeMap<(String, String, i64), PricingOverrideRule>,
    /// Insertion order matters for listing.
    orders: Vec<(OrderIndex, StoredOrder)>,
}

impl State {
    fn order_position(&self, id: &str) -> Option<usize> {
        self.orders.iter().position(|(index, _)| index.id == id)
    }
}

fn override_key(key: &OverrideKey) -> (String, String, i64) {
    (
        key.customer_id.clone(),
        key.product_id.clone(),
        key.variation.as_index(),
    )
}

/// Collections-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `ConnectionFailed` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> DbResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionFailed("store unavailable".to_string()));
        }
        Ok(())
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: &str) -> DbResult<Option<Product>> {
        self.check_available()?;
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn products(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn categories(&self) -> DbResult<Vec<Category>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn save_product(&self, product: &Product) -> DbResult<()> {
        self.check_available()?;
        validate_product(product)?;
        let mut state = self.state.lock().await;
        if let Some(category_id) = &product.category_id {
            if !state.categories.contains_key(category_id) {
                return Err(DbError::ForeignKeyViolation {
                    message: format!("category {category_id} does not exist"),
                });
            }
        }
        state.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn save_category(&self, category: &Category) -> DbResult<()> {
        self.check_available()?;
        self.state
            .lock()
            .await
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    async fn find_override(&self, key: &OverrideKey) -> DbResult<Option<PricingOverrideRule>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .await
            .overrides
            .get(&override_key(key))
            .cloned())
    }

    async fn upsert_override(
        &self,
        key: &OverrideKey,
        prices: PricePair,
    ) -> DbResult<PricingOverrideRule> {
        self.check_available()?;
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let rule = state
            .overrides
            .entry(override_key(key))
            .and_modify(|rule| {
                rule.price_before_tax = prices.before_tax;
                rule.price_with_tax = prices.with_tax;
                rule.updated_at = now;
            })
            .or_insert_with(|| PricingOverrideRule {
                id: Uuid::new_v4().to_string(),
                customer_id: key.customer_id.clone(),
                product_id: key.product_id.clone(),
                variation: key.variation,
                price_before_tax: prices.before_tax,
                price_with_tax: prices.with_tax,
                created_at: now,
                updated_at: now,
            });

        Ok(rule.clone())
    }

    async fn delete_override(&self, key: &OverrideKey) -> DbResult<bool> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .await
            .overrides
            .remove(&override_key(key))
            .is_some())
    }

    async fn overrides_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<PricingOverrideRule>> {
        self.check_available()?;
        // BTreeMap keys already sort by (customer, product, variation)
        Ok(self
            .state
            .lock()
            .await
            .overrides
            .values()
            .filter(|rule| rule.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, mut document: Value) -> DbResult<StoredOrder> {
        self.check_available()?;
        let index = OrderIndex::extract(&mut document)?;
        let mut state = self.state.lock().await;

        if state.order_position(&index.id).is_some() {
            return Err(DbError::duplicate("orders.id", &index.id));
        }

        let stored = StoredOrder {
            id: index.id.clone(),
            document,
            version: 1,
            updated_at: Utc::now(),
        };
        state.orders.push((index, stored.clone()));
        Ok(stored)
    }

    async fn get_order(&self, id: &str) -> DbResult<Option<StoredOrder>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .order_position(id)
            .map(|pos| state.orders[pos].1.clone()))
    }

    async fn list_orders(&self, customer_id: Option<&str>) -> DbResult<Vec<StoredOrder>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .filter(|(index, _)| match customer_id {
                Some(wanted) => index.customer_id.as_deref() == Some(wanted),
                None => true,
            })
            .map(|(_, stored)| stored.clone())
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        expected_version: i64,
    ) -> DbResult<StoredOrder> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let pos = state
            .order_position(id)
            .ok_or_else(|| DbError::not_found("Order", id))?;

        let (index, stored) = &mut state.orders[pos];
        if stored.version != expected_version {
            return Err(DbError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
            });
        }

        set_document_status(&mut stored.document, status);
        index.status = status;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn attach_invoice(&self, id: &str, invoice: &InvoiceRef) -> DbResult<()> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let pos = state
            .order_position(id)
            .ok_or_else(|| DbError::not_found("Order", id))?;

        let (_, stored) = &mut state.orders[pos];
        set_document_invoice(&mut stored.document, invoice);
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_order(&self, id: &str) -> DbResult<bool> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        match state.order_position(id) {
            Some(pos) => {
                state.orders.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
