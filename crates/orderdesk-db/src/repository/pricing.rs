//! # Pricing Override Repository
//!
//! Per-customer price rules keyed by `(customer_id, product_id, variation_index)`.
//!
//! ## Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ find existing rule, then INSERT or UPDATE                          │
//! │     two racing callers both see "none" → two rules for one key         │
//! │                                                                         │
//! │  ✅ INSERT ... ON CONFLICT(key) DO UPDATE ... RETURNING                │
//! │     one statement; the UNIQUE index arbitrates, last writer wins,      │
//! │     the first rule's id survives                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use orderdesk_core::{Money, OverrideKey, PricePair, PricingOverrideRule, VariationSelector};

use crate::error::{DbError, DbResult};
use crate::store::PricingStore;

/// Repository for override rules.
#[derive(Debug, Clone)]
pub struct PricingRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    id: String,
    customer_id: String,
    product_id: String,
    variation_index: i64,
    price_before_cents: i64,
    price_with_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OverrideRow> for PricingOverrideRule {
    type Error = DbError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let variation = VariationSelector::try_from(row.variation_index)
            .map_err(|e| DbError::Serialization(format!("override {}: {e}", row.id)))?;

        Ok(PricingOverrideRule {
            id: row.id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            variation,
            price_before_tax: Money::from_cents(row.price_before_cents),
            price_with_tax: Money::from_cents(row.price_with_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PricingRepository {
    /// Creates a new PricingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PricingRepository { pool }
    }

    /// Counts rules (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_pricing")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl PricingStore for PricingRepository {
    async fn find_override(&self, key: &OverrideKey) -> DbResult<Option<PricingOverrideRule>> {
        let row: Option<OverrideRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, product_id, variation_index,
                   price_before_cents, price_with_cents, created_at, updated_at
            FROM customer_pricing
            WHERE customer_id = ?1 AND product_id = ?2 AND variation_index = ?3
            "#,
        )
        .bind(&key.customer_id)
        .bind(&key.product_id)
        .bind(key.variation.as_index())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PricingOverrideRule::try_from).transpose()
    }

    async fn upsert_override(
        &self,
        key: &OverrideKey,
        prices: PricePair,
    ) -> DbResult<PricingOverrideRule> {
        debug!(key = %key, "Upserting price override");

        let row: OverrideRow = sqlx::query_as(
            r#"
            INSERT INTO customer_pricing (
                id, customer_id, product_id, variation_index,
                price_before_cents, price_with_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(customer_id, product_id, variation_index) DO UPDATE SET
                price_before_cents = excluded.price_before_cents,
                price_with_cents = excluded.price_with_cents,
                updated_at = excluded.updated_at
            RETURNING id, customer_id, product_id, variation_index,
                      price_before_cents, price_with_cents, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&key.customer_id)
        .bind(&key.product_id)
        .bind(key.variation.as_index())
        .bind(prices.before_tax.cents())
        .bind(prices.with_tax.cents())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn delete_override(&self, key: &OverrideKey) -> DbResult<bool> {
        debug!(key = %key, "Deleting price override");

        let result = sqlx::query(
            r#"
            DELETE FROM customer_pricing
            WHERE customer_id = ?1 AND product_id = ?2 AND variation_index = ?3
            "#,
        )
        .bind(&key.customer_id)
        .bind(&key.product_id)
        .bind(key.variation.as_index())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn overrides_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<PricingOverrideRule>> {
        let rows: Vec<OverrideRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, product_id, variation_index,
                   price_before_cents, price_with_cents, created_at, updated_at
            FROM customer_pricing
            WHERE customer_id = ?1
            ORDER BY product_id, variation_index
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PricingOverrideRule::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn prices(before: i64, with: i64) -> PricePair {
        PricePair::new(Money::from_cents(before), Money::from_cents(with))
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pricing();
        let key = OverrideKey::new("C", "P", VariationSelector::Base);

        let first = repo.upsert_override(&key, prices(50, 59)).await.unwrap();
        let second = repo.upsert_override(&key, prices(40, 47)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.prices(), prices(40, 47));
        assert_eq!(repo.count().await.unwrap(), 1);

        let found = repo.find_override(&key).await.unwrap().unwrap();
        assert_eq!(found.prices(), prices(40, 47));
    }

    #[tokio::test]
    async fn test_keys_are_exact() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pricing();

        let base = OverrideKey::new("C", "P", VariationSelector::Base);
        let first_variation = OverrideKey::new("C", "P", VariationSelector::Index(0));
        repo.upsert_override(&base, prices(50, 59)).await.unwrap();

        assert!(repo.find_override(&first_variation).await.unwrap().is_none());
        assert!(repo
            .find_override(&OverrideKey::new("D", "P", VariationSelector::Base))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_only_the_exact_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pricing();

        let base = OverrideKey::new("C", "P", VariationSelector::Base);
        let variation = OverrideKey::new("C", "P", VariationSelector::Index(1));
        repo.upsert_override(&base, prices(50, 59)).await.unwrap();
        repo.upsert_override(&variation, prices(70, 83)).await.unwrap();

        assert!(repo.delete_override(&base).await.unwrap());
        assert!(!repo.delete_override(&base).await.unwrap());

        let remaining = repo.overrides_for_customer("C").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].key(), variation);
    }

    #[test]
    fn test_row_with_invalid_index_is_rejected() {
        let row = OverrideRow {
            id: "r-1".to_string(),
            customer_id: "C".to_string(),
            product_id: "P".to_string(),
            variation_index: -3,
            price_before_cents: 50,
            price_with_cents: 59,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = PricingOverrideRule::try_from(row).unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_schema_rejects_invalid_index() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = sqlx::query(
            r#"
            INSERT INTO customer_pricing (
                id, customer_id, product_id, variation_index,
                price_before_cents, price_with_cents, created_at, updated_at
            ) VALUES ('r-1', 'C', 'P', -3, 50, 59, ?1, ?1)
            "#,
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await;
        assert!(result.is_err());
        assert_eq!(db.pricing().count().await.unwrap(), 0);
    }
}
