//! Shared fixtures for service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orderdesk_core::{Category, InvoiceRef, Money, Product, Variation};
use orderdesk_db::{CatalogStore, MemoryStore, Stores};

use crate::invoicing::{InvoiceRequest, InvoicingError, InvoicingRelay};

fn category(id: &str, name: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        image_url: None,
        is_active: true,
    }
}

/// Base-priced product at {0.85, 1.00}.
pub fn bread() -> Product {
    Product {
        id: "p-bread".to_string(),
        name: "Bread".to_string(),
        category_id: Some("c-bakery".to_string()),
        image_url: None,
        price_before_tax: Some(Money::from_cents(85)),
        price_with_tax: Some(Money::from_cents(100)),
        variations: Vec::new(),
        is_active: true,
    }
}

/// Variation-only product: 500ml {16.95, 20.00}, 1L {29.66, 35.00}.
pub fn oil() -> Product {
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

/// Inactive product without any price.
pub fn retired() -> Product {
    Product {
        id: "p-retired".to_string(),
        name: "Retired Jam".to_string(),
        category_id: Some("c-pantry".to_string()),
        image_url: None,
        price_before_tax: None,
        price_with_tax: None,
        variations: Vec::new(),
        is_active: false,
    }
}

/// A memory store holding both categories and the three products.
pub async fn seeded_store() -> (Arc<MemoryStore>, Stores) {
    let store = Arc::new(MemoryStore::new());
    for c in [category("c-bakery", "Bakery"), category("c-pantry", "Pantry")] {
        store.save_category(&c).await.unwrap();
    }
    for p in [bread(), oil(), retired()] {
        store.save_product(&p).await.unwrap();
    }
    let stores = Stores::from_memory(store.clone());
    (store, stores)
}

/// Relay double that records every request.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    pub requests: Mutex<Vec<InvoiceRequest>>,
    pub fail: bool,
}

impl RecordingRelay {
    pub fn failing() -> Self {
        RecordingRelay {
            fail: true,
            ..Default::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl InvoicingRelay for RecordingRelay {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoicingError> {
        let number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail {
            return Err(InvoicingError::Unavailable("connection refused".into()));
        }
        Ok(InvoiceRef {
            invoice_id: format!("inv-{number}"),
            invoice_number: Some(format!("{}", 1000 + number)),
            invoice_url: None,
        })
    }
}
