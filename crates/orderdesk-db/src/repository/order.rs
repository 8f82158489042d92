//! # Order Repository
//!
//! Raw order documents. The document column is the source of truth; the
//! `customer_id`, `status` and `created_at` columns are derived from it on
//! every write so lists can be filtered without parsing JSON.
//!
//! ## Optimistic Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read order (version 3)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE ... SET version = version + 1 WHERE id = ? AND version = 3     │
//! │       │                                                                 │
//! │       ├── 1 row  → written, now version 4                              │
//! │       └── 0 rows → order gone (NotFound) or moved on (VersionConflict) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use orderdesk_core::{InvoiceRef, OrderStatus};

use crate::error::{DbError, DbResult};
use crate::store::{set_document_invoice, set_document_status, OrderIndex, OrderStore, StoredOrder};

/// Repository for order documents.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    document: String,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_stored(self) -> DbResult<StoredOrder> {
        Ok(StoredOrder {
            document: serde_json::from_str(&self.document)?,
            id: self.id,
            version: self.version,
            updated_at: self.updated_at,
        })
    }
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Counts orders, optionally in one status (for diagnostics).
    pub async fn count(&self, status: Option<OrderStatus>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ?1 IS NULL OR status = ?1")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Writes a modified document back if the version still matches.
    async fn write_document(
        &self,
        id: &str,
        mut document: Value,
        expected_version: Option<i64>,
    ) -> DbResult<StoredOrder> {
        let index = OrderIndex::extract(&mut document)?;
        let body = serde_json::to_string(&document)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                customer_id = ?2,
                status = ?3,
                document = ?4,
                created_at = ?5,
                version = version + 1,
                updated_at = ?6
            WHERE id = ?1 AND (?7 IS NULL OR version = ?7)
            "#,
        )
        .bind(id)
        .bind(&index.customer_id)
        .bind(index.status)
        .bind(body)
        .bind(index.created_at)
        .bind(now)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match (self.get_order(id).await?, expected_version) {
                (None, _) => Err(DbError::not_found("Order", id)),
                (Some(_), Some(expected)) => Err(DbError::VersionConflict {
                    id: id.to_string(),
                    expected,
                }),
                (Some(_), None) => Err(DbError::Internal(format!("order {id} was not updated"))),
            };
        }

        self.get_order(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert_order(&self, mut document: Value) -> DbResult<StoredOrder> {
        let index = OrderIndex::extract(&mut document)?;
        debug!(id = %index.id, status = %index.status, "Inserting order");

        let body = serde_json::to_string(&document)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, document, created_at, version, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&index.id)
        .bind(&index.customer_id)
        .bind(index.status)
        .bind(body)
        .bind(index.created_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &index.id),
            other => other,
        })?;

        Ok(StoredOrder {
            id: index.id,
            document,
            version: 1,
            updated_at: now,
        })
    }

    async fn get_order(&self, id: &str) -> DbResult<Option<StoredOrder>> {
        let row: Option<OrderRow> =
            sqlx::query_as("SELECT id, document, version, updated_at FROM orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(OrderRow::into_stored).transpose()
    }

    async fn list_orders(&self, customer_id: Option<&str>) -> DbResult<Vec<StoredOrder>> {
        debug!(customer_id = ?customer_id, "Listing orders");

        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, document, version, updated_at
            FROM orders
            WHERE ?1 IS NULL OR customer_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_stored).collect()
    }

    async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        expected_version: i64,
    ) -> DbResult<StoredOrder> {
        debug!(id = %id, status = %status, expected_version, "Updating order status");

        let mut stored = self
            .get_order(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        if stored.version != expected_version {
            return Err(DbError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
            });
        }

        set_document_status(&mut stored.document, status);
        self.write_document(id, stored.document, Some(expected_version))
            .await
    }

    async fn attach_invoice(&self, id: &str, invoice: &InvoiceRef) -> DbResult<()> {
        debug!(id = %id, invoice_id = %invoice.invoice_id, "Attaching invoice");

        let mut stored = self
            .get_order(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        set_document_invoice(&mut stored.document, invoice);
        self.write_document(id, stored.document, None).await?;
        Ok(())
    }

    async fn delete_order(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn repo() -> OrderRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().orders()
    }

    #[tokio::test]
    async fn test_insert_keeps_document_verbatim() {
        let repo = repo().await;
        let doc = json!({
            "id": "o-1",
            "userId": "c-1",
            "items": [{ "productId": "p", "quantity": 2, "priceWithVat": 1.0 }],
            "extra": { "kept": true }
        });

        let stored = repo.insert_order(doc.clone()).await.unwrap();
        assert_eq!(stored.version, 1);

        let loaded = repo.get_order("o-1").await.unwrap().unwrap();
        assert_eq!(loaded.document, doc);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let repo = repo().await;
        repo.insert_order(json!({ "id": "o-1" })).await.unwrap();
        let err = repo.insert_order(json!({ "id": "o-1" })).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_customer_in_either_shape() {
        let repo = repo().await;
        repo.insert_order(json!({ "id": "a", "userId": "c-1" })).await.unwrap();
        repo.insert_order(json!({ "id": "b", "customer_id": "c-2" })).await.unwrap();
        repo.insert_order(json!({ "id": "c", "customer_id": "c-1" })).await.unwrap();

        let mine: Vec<String> = repo
            .list_orders(Some("c-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, ["a", "c"]);
        assert_eq!(repo.list_orders(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_update_is_version_checked() {
        let repo = repo().await;
        repo.insert_order(json!({ "id": "o-1", "customer_id": "c" })).await.unwrap();

        let updated = repo
            .update_status("o-1", OrderStatus::Processing, 1)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.document["status"], "processing");
        assert_eq!(repo.count(Some(OrderStatus::Processing)).await.unwrap(), 1);

        let err = repo
            .update_status("o-1", OrderStatus::Shipped, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { expected: 1, .. }));

        let err = repo
            .update_status("nope", OrderStatus::Shipped, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_attach_invoice_and_delete() {
        let repo = repo().await;
        repo.insert_order(json!({ "id": "o-1" })).await.unwrap();

        let invoice = InvoiceRef {
            invoice_id: "inv-1".to_string(),
            invoice_number: Some("1001".to_string()),
            invoice_url: Some("https://invoices.example/1001".to_string()),
        };
        repo.attach_invoice("o-1", &invoice).await.unwrap();

        let loaded = repo.get_order("o-1").await.unwrap().unwrap();
        assert_eq!(loaded.document["invoice"]["invoiceId"], "inv-1");
        assert_eq!(loaded.document["invoice"]["invoice_url"], "https://invoices.example/1001");

        assert!(repo.delete_order("o-1").await.unwrap());
        assert!(!repo.delete_order("o-1").await.unwrap());
        assert!(repo.get_order("o-1").await.unwrap().is_none());
    }
}
