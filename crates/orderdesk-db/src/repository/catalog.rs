//! # Catalog Repository
//!
//! Products and categories.
//!
//! Variations live in a JSON column on the product row: they are always
//! read and written together with their product, and line items refer to
//! them by position, so the array order is the identity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use orderdesk_core::validation::validate_product;
use orderdesk_core::{Category, Money, Product, Variation};

use crate::error::DbResult;
use crate::store::CatalogStore;

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category_id: Option<String>,
    image_url: Option<String>,
    price_before_cents: Option<i64>,
    price_with_cents: Option<i64>,
    variations: String,
    is_active: bool,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        let variations: Vec<Variation> = serde_json::from_str(&self.variations)?;
        Ok(Product {
            id: self.id,
            name: self.name,
            category_id: self.category_id,
            image_url: self.image_url,
            price_before_tax: self.price_before_cents.map(Money::from_cents),
            price_with_tax: self.price_with_cents.map(Money::from_cents),
            variations,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    image_url: Option<String>,
    is_active: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            is_active: row.is_active,
        }
    }
}

const PRODUCT_COLUMNS: &str = r#"
    id, name, category_id, image_url,
    price_before_cents, price_with_cents,
    variations, is_active
"#;

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Counts active products (for diagnostics).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Soft-deletes a product. Existing orders keep their snapshots.
    pub async fn deactivate_product(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn product(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ProductRow::into_product).transpose()
    }

    async fn products(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        debug!(include_inactive, "Listing products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 OR ?1 ORDER BY name, id"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    async fn categories(&self) -> DbResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, name, image_url, is_active
            FROM categories
            WHERE is_active = 1
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn save_product(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, "Saving product");

        let variations = serde_json::to_string(&product.variations)?;
        let now: DateTime<Utc> = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, image_url,
                price_before_cents, price_with_cents,
                variations, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category_id = excluded.category_id,
                image_url = excluded.image_url,
                price_before_cents = excluded.price_before_cents,
                price_with_cents = excluded.price_with_cents,
                variations = excluded.variations,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(&product.image_url)
        .bind(product.price_before_tax.map(|m| m.cents()))
        .bind(product.price_with_tax.map(|m| m.cents()))
        .bind(variations)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_category(&self, category: &Category) -> DbResult<()> {
        debug!(id = %category.id, "Saving category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, image_url, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                image_url = excluded.image_url,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.image_url)
        .bind(category.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    fn oil() -> Product {
        Product {
            id: "p-oil".to_string(),
            name: "Olive Oil".to_string(),
            category_id: Some("c-pantry".to_string()),
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
                    name: "1L".to_string(),
                    price_before_tax: Money::from_cents(2966),
                    price_with_tax: Money::from_cents(3500),
                },
            ],
            is_active: true,
        }
    }

    fn pantry() -> Category {
        Category {
            id: "c-pantry".to_string(),
            name: "Pantry".to_string(),
            image_url: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_product_with_variations() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.save_category(&pantry()).await.unwrap();
        repo.save_product(&oil()).await.unwrap();

        let loaded = repo.product("p-oil").await.unwrap().unwrap();
        assert_eq!(loaded, oil());
        assert_eq!(loaded.variations[1].name, "1L");
        assert!(repo.product("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_product_replaces_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();
        repo.save_category(&pantry()).await.unwrap();

        let mut product = oil();
        repo.save_product(&product).await.unwrap();
        product.price_with_tax = Some(Money::from_cents(100));
        product.price_before_tax = Some(Money::from_cents(85));
        repo.save_product(&product).await.unwrap();

        assert_eq!(repo.products(false).await.unwrap(), vec![product]);
    }

    #[tokio::test]
    async fn test_inactive_products_are_hidden_by_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();
        repo.save_category(&pantry()).await.unwrap();
        repo.save_product(&oil()).await.unwrap();

        assert!(repo.deactivate_product("p-oil").await.unwrap());
        assert!(repo.products(false).await.unwrap().is_empty());
        assert_eq!(repo.products(true).await.unwrap().len(), 1);
        assert_eq!(repo.count_products().await.unwrap(), 0);
        assert_eq!(repo.categories().await.unwrap(), vec![pantry()]);
    }

    #[tokio::test]
    async fn test_duplicate_variation_names_are_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();
        repo.save_category(&pantry()).await.unwrap();

        let mut product = oil();
        product.variations[1].name = "500ML".to_string();
        let err = repo.save_product(&product).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(repo.product("p-oil").await.unwrap().is_none());
    }
}
