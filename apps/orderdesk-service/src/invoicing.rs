//! # Invoicing Relay
//!
//! Outbound collaborator that turns a placed order into an invoice.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST {endpoint}                                                        │
//! │  Authorization: Bearer {api_token}                                      │
//! │  X-Company-Id: {company_id}            (when configured)                │
//! │                                                                         │
//! │  { "client": "Dana Levi",                                               │
//! │    "items": [{ "description": "Olive Oil - 1L", "price": 62.0,          │
//! │                "quantity": 1, "vatType": "INC" }],                      │
//! │    "comments": "Leave at the door",                                     │
//! │    "payment_type": "bank_transfer" }                                    │
//! │                                                                         │
//! │  200 → { "invoiceId": "...", "invoiceNumber": "...", "invoiceUrl": ".." }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Best-effort: the order service logs relay failures and keeps the order.
//! Credentials travel inside [`InvoicingConfig`], handed to the relay at
//! construction.

use std::time::Duration;

use async_trait::async_trait;
use orderdesk_core::{InvoiceRef, Order, OrderLineItem};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

fn default_payment_type() -> String {
    "bank_transfer".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

/// Relay settings, the `[invoicing]` section of the config file.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoicingConfig {
    /// Placing an order calls the relay only when true.
    #[serde(default)]
    pub enabled: bool,

    /// Relay URL, `http://` or `https://`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub company_id: Option<String>,

    /// Sent as `payment_type` on every request.
    #[serde(default = "default_payment_type")]
    pub payment_type: String,

    /// Whole-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        InvoicingConfig {
            enabled: false,
            endpoint: None,
            api_token: None,
            company_id: None,
            payment_type: default_payment_type(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Keeps the token out of logs
impl std::fmt::Debug for InvoicingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoicingConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("company_id", &self.company_id)
            .field("payment_type", &self.payment_type)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// VAT marker for prices that already include VAT.
pub const VAT_INCLUDED: &str = "INC";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceItem {
    pub description: String,
    /// Tax-inclusive unit price in major units.
    pub price: f64,
    pub quantity: i64,
    #[serde(rename = "vatType")]
    pub vat_type: String,
}

impl InvoiceItem {
    fn from_line(line: &OrderLineItem) -> Self {
        let description = match &line.variation_name {
            Some(variation) => format!("{} - {}", line.product_name, variation),
            None => line.product_name.clone(),
        };
        InvoiceItem {
            description,
            price: line.unit_price.with_tax.to_major_f64(),
            quantity: line.quantity,
            vat_type: VAT_INCLUDED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRequest {
    pub client: String,
    pub items: Vec<InvoiceItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub payment_type: String,
}

impl InvoiceRequest {
    pub fn from_order(order: &Order, payment_type: impl Into<String>) -> Self {
        InvoiceRequest {
            client: order.customer.display_name().to_string(),
            items: order.items.iter().map(InvoiceItem::from_line).collect(),
            comments: order.notes.clone(),
            payment_type: payment_type.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceResponse {
    invoice_id: String,
    #[serde(default)]
    invoice_number: Option<String>,
    #[serde(default)]
    invoice_url: Option<String>,
}

impl From<InvoiceResponse> for InvoiceRef {
    fn from(response: InvoiceResponse) -> Self {
        InvoiceRef {
            invoice_id: response.invoice_id,
            invoice_number: response.invoice_number,
            invoice_url: response.invoice_url,
        }
    }
}

// =============================================================================
// Relay
// =============================================================================

#[derive(Debug, Error)]
pub enum InvoicingError {
    #[error("Invoicing relay is not configured: {0}")]
    NotConfigured(String),

    #[error("Invoicing relay unreachable: {0}")]
    Unavailable(String),

    #[error("Invoicing relay rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invoicing relay sent an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Anything that can issue an invoice for an order.
#[async_trait]
pub trait InvoicingRelay: Send + Sync {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoicingError>;
}

/// The relay over HTTP.
#[derive(Debug, Clone)]
pub struct HttpInvoicingRelay {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    company_id: Option<String>,
}

impl HttpInvoicingRelay {
    pub fn new(config: &InvoicingConfig) -> Result<Self, InvoicingError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| InvoicingError::NotConfigured("endpoint is missing".into()))?;
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| InvoicingError::NotConfigured("api_token is missing".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InvoicingError::NotConfigured(e.to_string()))?;

        Ok(HttpInvoicingRelay {
            client,
            endpoint,
            api_token,
            company_id: config.company_id.clone(),
        })
    }
}

#[async_trait]
impl InvoicingRelay for HttpInvoicingRelay {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoicingError> {
        debug!(endpoint = %self.endpoint, items = request.items.len(), "Requesting invoice");

        let mut builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(request);
        if let Some(company_id) = &self.company_id {
            builder = builder.header("X-Company-Id", company_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InvoicingError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvoicingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InvoiceResponse = response
            .json()
            .await
            .map_err(|e| InvoicingError::InvalidResponse(e.to_string()))?;

        Ok(parsed.into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_core::{CustomerRef, Money, OrderOrigin, OrderStatus, PricePair, VariationSelector};

    fn order() -> Order {
        Order {
            id: "o-1".into(),
            customer: CustomerRef {
                id: Some("c-1".into()),
                name: Some("Dana Levi".into()),
                email: None,
            },
            created_at: None,
            items: vec![OrderLineItem {
                product_id: "p-oil".into(),
                product_name: "Olive Oil".into(),
                variation: VariationSelector::Index(1),
                variation_name: Some("1L".into()),
                quantity: 2,
                unit_price: PricePair::new(Money::from_cents(5254), Money::from_cents(6200)),
            }],
            total_before_tax: Money::from_cents(10508),
            total_with_tax: Money::from_cents(12400),
            status: OrderStatus::Pending,
            origin: OrderOrigin::CustomerPortal,
            notes: Some("Leave at the door".into()),
            invoice: None,
        }
    }

    #[test]
    fn test_request_shape() {
        let request = InvoiceRequest::from_order(&order(), "bank_transfer");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["client"], "Dana Levi");
        assert_eq!(json["items"][0]["description"], "Olive Oil - 1L");
        assert_eq!(json["items"][0]["price"], 62.0);
        assert_eq!(json["items"][0]["quantity"], 2);
        assert_eq!(json["items"][0]["vatType"], "INC");
        assert_eq!(json["comments"], "Leave at the door");
        assert_eq!(json["payment_type"], "bank_transfer");
    }

    #[test]
    fn test_response_parses_camel_case() {
        let response: InvoiceResponse = serde_json::from_str(
            r#"{"invoiceId":"inv-7","invoiceNumber":"1007","invoiceUrl":"https://x/1007"}"#,
        )
        .unwrap();
        let invoice: InvoiceRef = response.into();
        assert_eq!(invoice.invoice_id, "inv-7");
        assert_eq!(invoice.invoice_number.as_deref(), Some("1007"));
    }

    #[test]
    fn test_relay_requires_endpoint_and_token() {
        let config = InvoicingConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(matches!(
            HttpInvoicingRelay::new(&config),
            Err(InvoicingError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = InvoicingConfig {
            api_token: Some("secret-token".into()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_unavailable() {
        let config = InvoicingConfig {
            enabled: true,
            endpoint: Some("http://127.0.0.1:9/invoices".into()),
            api_token: Some("token".into()),
            timeout_secs: 2,
            ..Default::default()
        };
        let relay = HttpInvoicingRelay::new(&config).unwrap();
        let err = relay
            .create_invoice(&InvoiceRequest::from_order(&order(), "cash"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvoicingError::Unavailable(_)));
    }
}
