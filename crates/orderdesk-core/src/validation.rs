//! # Validation Module
//!
//! Input validation for admin writes and draft operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Portals (TypeScript)                                         │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: orderdesk-service                                            │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE(customer_id, product_id, variation_index)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stored order documents are NOT validated here: the reconciler reads
//! whatever it finds and degrades instead of failing.
//!
//! ## Usage
//! ```rust,no_run
//! use orderdesk_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Olive Oil").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PricePair, Product, Variation};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use orderdesk_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Olive Oil 1L").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require("name", name, 200)
}

/// Validates a customer id used as an override key or order owner.
pub fn validate_customer_id(customer_id: &str) -> ValidationResult<()> {
    require("customer_id", customer_id, 128)
}

/// Validates a product id.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    require("product_id", product_id, 128)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - At least 1 (`InvalidQuantity`)
/// - At most MAX_ITEM_QUANTITY (`QuantityTooLarge`)
///
/// Returns [`CoreError`] rather than [`ValidationError`] so draft callers
/// can match the two failures directly.
pub fn validate_quantity(qty: i64) -> CoreResult<()> {
    if qty < 1 {
        return Err(CoreError::InvalidQuantity(qty));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: qty,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a single price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates both halves of a price pair.
///
/// The halves are independent; no relation through the tax rate is checked.
pub fn validate_price_pair(prices: &PricePair) -> ValidationResult<()> {
    validate_price("price_before_vat", prices.before_tax)?;
    validate_price("price_with_vat", prices.with_tax)
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a product's variation list.
///
/// ## Rules
/// - Every name non-empty and unique within the product
/// - Every price non-negative
pub fn validate_variations(variations: &[Variation]) -> ValidationResult<()> {
    let mut seen = HashSet::new();

    for variation in variations {
        require("variation name", &variation.name, 100)?;

        let name = variation.name.trim().to_lowercase();
        if !seen.insert(name) {
            return Err(ValidationError::Duplicate {
                field: "variation name".to_string(),
                value: variation.name.trim().to_string(),
            });
        }

        validate_price_pair(&variation.prices())?;
    }

    Ok(())
}

/// Validates a product before it is written to the catalog.
///
/// ## Rules
/// - Id and name non-empty
/// - Base price halves, when present, non-negative
/// - Variations as in [`validate_variations`]
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_id(&product.id)?;
    validate_product_name(&product.name)?;
    if let Some(price) = product.price_before_tax {
        validate_price("price_before_vat", price)?;
    }
    if let Some(price) = product.price_with_tax {
        validate_price("price_with_vat", price)?;
    }
    validate_variations(&product.variations)
}

/// Validates draft size before appending a line.
///
/// ## Rules
/// - Must be below MAX_ORDER_LINES (100)
pub fn validate_draft_size(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_ORDER_LINES {
        return Err(CoreError::TooManyLines {
            max: MAX_ORDER_LINES,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(name: &str, before: i64, with: i64) -> Variation {
        Variation {
            name: name.to_string(),
            price_before_tax: Money::from_cents(before),
            price_with_tax: Money::from_cents(with),
        }
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Olive Oil 1L").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(matches!(validate_quantity(0), Err(CoreError::InvalidQuantity(0))));
        assert!(matches!(validate_quantity(-3), Err(CoreError::InvalidQuantity(-3))));
        assert!(matches!(
            validate_quantity(1000),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
    }

    #[test]
    fn test_validate_prices() {
        assert!(validate_price("price", Money::zero()).is_ok());
        assert!(validate_price("price", Money::from_cents(-1)).is_err());

        let inconsistent = PricePair::new(Money::from_cents(500), Money::from_cents(100));
        assert!(validate_price_pair(&inconsistent).is_ok());
    }

    #[test]
    fn test_validate_variations() {
        assert!(validate_variations(&[]).is_ok());
        assert!(validate_variations(&[variation("500ml", 1695, 2000), variation("1L", 2966, 3500)]).is_ok());

        let err = validate_variations(&[variation("1L", 1, 1), variation(" 1l ", 2, 2)]).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));

        assert!(validate_variations(&[variation("", 1, 1)]).is_err());
        assert!(validate_variations(&[variation("Big", -1, 1)]).is_err());
    }

    #[test]
    fn test_validate_product() {
        let mut product = Product {
            id: "p-oil".to_string(),
            name: "Olive Oil".to_string(),
            category_id: None,
            image_url: None,
            price_before_tax: None,
            price_with_tax: None,
            variations: vec![variation("500ml", 1695, 2000), variation("1L", 2966, 3500)],
            is_active: true,
        };
        assert!(validate_product(&product).is_ok());

        product.variations.push(variation("1l", 1, 1));
        assert!(matches!(
            validate_product(&product),
            Err(ValidationError::Duplicate { .. })
        ));

        product.variations.pop();
        product.name = "  ".to_string();
        assert!(matches!(
            validate_product(&product),
            Err(ValidationError::Required { .. })
        ));

        product.name = "Olive Oil".to_string();
        product.price_with_tax = Some(Money::from_cents(-5));
        assert!(validate_product(&product).is_err());
    }

    #[test]
    fn test_validate_draft_size() {
        assert!(validate_draft_size(0).is_ok());
        assert!(validate_draft_size(MAX_ORDER_LINES - 1).is_ok());
        assert!(validate_draft_size(MAX_ORDER_LINES).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_ids() {
        assert!(validate_customer_id("cust-1").is_ok());
        assert!(validate_customer_id(" ").is_err());
        assert!(validate_product_id("").is_err());
    }
}
