//! # Store Traits
//!
//! The three narrow interfaces the services talk to. Each has a SQLite
//! implementation in [`crate::repository`] and an in-memory one in
//! [`crate::memory`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PriceResolver ──► PricingStore ──┬──► PricingRepository (SQLite)      │
//! │        │                          └──► MemoryStore                     │
//! │        └─────────► CatalogStore ──┬──► CatalogRepository (SQLite)      │
//! │                                   └──► MemoryStore                     │
//! │  OrderService ───► OrderStore ────┬──► OrderRepository (SQLite)        │
//! │                                   └──► MemoryStore                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderdesk_core::reconcile;
use orderdesk_core::{
    Category, InvoiceRef, OrderStatus, OverrideKey, PricePair, PricingOverrideRule, Product,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::memory::MemoryStore;
use crate::pool::Database;

// =============================================================================
// Traits
// =============================================================================

/// Products and categories.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Product by id, active or not.
    async fn product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Products ordered by name.
    async fn products(&self, include_inactive: bool) -> DbResult<Vec<Product>>;

    /// Active categories ordered by name.
    async fn categories(&self) -> DbResult<Vec<Category>>;

    /// Inserts or replaces a product by id.
    async fn save_product(&self, product: &Product) -> DbResult<()>;

    /// Inserts or replaces a category by id.
    async fn save_category(&self, category: &Category) -> DbResult<()>;
}

/// Per-customer price overrides.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// The rule for this exact key, if any.
    async fn find_override(&self, key: &OverrideKey) -> DbResult<Option<PricingOverrideRule>>;

    /// Creates the rule, or updates the prices of the existing rule for the
    /// key in place. Atomic: two racing calls never produce two rules.
    async fn upsert_override(
        &self,
        key: &OverrideKey,
        prices: PricePair,
    ) -> DbResult<PricingOverrideRule>;

    /// Deletes the rule for this exact key. Returns whether one existed.
    async fn delete_override(&self, key: &OverrideKey) -> DbResult<bool>;

    /// Every rule of one customer, ordered by product then variation.
    async fn overrides_for_customer(&self, customer_id: &str)
        -> DbResult<Vec<PricingOverrideRule>>;
}

/// Raw order documents with an optimistic lock counter.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stores a document as-is. A document without an id gets one.
    async fn insert_order(&self, document: Value) -> DbResult<StoredOrder>;

    async fn get_order(&self, id: &str) -> DbResult<Option<StoredOrder>>;

    /// Documents in insertion order, optionally for one customer.
    async fn list_orders(&self, customer_id: Option<&str>) -> DbResult<Vec<StoredOrder>>;

    /// Sets the status if the stored version still equals `expected_version`.
    ///
    /// ## Errors
    /// - `NotFound` if the order doesn't exist
    /// - `VersionConflict` if someone else wrote first
    async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        expected_version: i64,
    ) -> DbResult<StoredOrder>;

    /// Writes the invoice sub-document (both field sets). Not version-checked.
    async fn attach_invoice(&self, id: &str, invoice: &InvoiceRef) -> DbResult<()>;

    /// Returns whether the order existed.
    async fn delete_order(&self, id: &str) -> DbResult<bool>;
}

// =============================================================================
// Stored Order
// =============================================================================

/// A raw document plus its storage metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub id: String,
    pub document: Value,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Columns kept next to the document for filtering.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrderIndex {
    pub id: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderIndex {
    /// Reads the indexed columns through the reconciler, assigning an id to
    /// documents that have none.
    pub(crate) fn extract(document: &mut Value) -> DbResult<Self> {
        let map = document
            .as_object_mut()
            .ok_or_else(|| DbError::Serialization("order document must be a JSON object".into()))?;

        let canonical = reconcile::normalize(&Value::Object(map.clone()));
        let id = if canonical.id.is_empty() {
            let id = Uuid::new_v4().to_string();
            map.insert("id".to_string(), Value::String(id.clone()));
            id
        } else {
            canonical.id
        };

        Ok(OrderIndex {
            id,
            customer_id: canonical.customer.id,
            status: canonical.status,
            created_at: canonical.created_at,
        })
    }
}

/// Sets the status field of a stored document. Both portals use `status`.
pub(crate) fn set_document_status(document: &mut Value, status: OrderStatus) {
    if let Some(map) = document.as_object_mut() {
        map.insert("status".to_string(), Value::String(status.as_str().to_string()));
    }
}

/// Sets the invoice sub-document of a stored document.
pub(crate) fn set_document_invoice(document: &mut Value, invoice: &InvoiceRef) {
    if let Some(map) = document.as_object_mut() {
        map.insert("invoice".to_string(), reconcile::invoice_document(invoice));
    }
}

// =============================================================================
// Store Bundle
// =============================================================================

/// The three store handles services are constructed with.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub pricing: Arc<dyn PricingStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// SQLite-backed stores sharing one pool.
    pub fn from_database(db: &Database) -> Self {
        Stores {
            catalog: Arc::new(db.catalog()),
            pricing: Arc::new(db.pricing()),
            orders: Arc::new(db.orders()),
        }
    }

    /// All three roles served by one in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Stores {
            catalog: store.clone(),
            pricing: store.clone(),
            orders: store,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_reads_either_shape() {
        let mut doc = json!({ "id": "o-1", "customer_id": "c-1", "status": "shipped" });
        let index = OrderIndex::extract(&mut doc).unwrap();
        assert_eq!(index.customer_id.as_deref(), Some("c-1"));
        assert_eq!(index.status, OrderStatus::Shipped);

        let mut doc = json!({ "userId": "c-2" });
        let index = OrderIndex::extract(&mut doc).unwrap();
        assert_eq!(index.customer_id.as_deref(), Some("c-2"));
        assert_eq!(index.status, OrderStatus::Pending);
        assert_eq!(doc["id"], index.id.as_str());
    }

    #[test]
    fn test_index_rejects_non_objects() {
        let mut doc = json!([1, 2, 3]);
        assert!(matches!(
            OrderIndex::extract(&mut doc),
            Err(DbError::Serialization(_))
        ));
    }
}
