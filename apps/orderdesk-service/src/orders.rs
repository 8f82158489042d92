//! # Order Service
//!
//! Placing, reading and moving orders through their lifecycle.
//!
//! ## Place Order Flow
//! ```text
//! place_order(composer)
//!   │
//!   ├── 1. composer.finalize()          EmptyOrder / MissingCustomer
//!   ├── 2. to_document(order)           both field sets + origin marker
//!   ├── 3. OrderStore::insert_order     the order now exists
//!   │
//!   └── 4. invoicing (when configured, best-effort)
//!          ├── relay.create_invoice     failure → warn!, order stands
//!          └── attach_invoice           failure → warn!, order stands
//! ```
//!
//! Reads go through the [`Reconciler`], so documents written by either
//! portal come back as the same canonical [`Order`].

use std::sync::Arc;

use orderdesk_core::reconcile::to_document;
use orderdesk_core::{InvoiceRef, Order, OrderStatus, Reconciler};
use orderdesk_db::{OrderStore, StoredOrder, Stores};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::BatchReport;
use crate::catalog::CatalogService;
use crate::composer::OrderComposer;
use crate::error::{ServiceError, ServiceResult};
use crate::invoicing::{InvoiceRequest, InvoicingRelay};

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Sees every order and may make any legal transition.
    Admin,
    /// Sees their own orders and may only cancel them.
    Customer(String),
}

impl Actor {
    fn may_read(&self, order: &Order) -> bool {
        match self {
            Actor::Admin => true,
            Actor::Customer(id) => order.is_owned_by(id),
        }
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    /// Carries the invoice only when it was attached to the stored order.
    pub order: Order,
    /// The invoice the relay issued, attached or not.
    pub invoice: Option<InvoiceRef>,
}

/// A canonical order and the version to pass back for updates.
#[derive(Debug, Clone, Serialize)]
pub struct VersionedOrder {
    pub order: Order,
    pub version: i64,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    catalog: CatalogService,
    invoicing: Option<Arc<dyn InvoicingRelay>>,
    payment_type: String,
}

impl OrderService {
    pub fn new(stores: &Stores) -> Self {
        OrderService {
            orders: stores.orders.clone(),
            catalog: CatalogService::new(stores),
            invoicing: None,
            payment_type: String::new(),
        }
    }

    /// Invoices every placed order through `relay`.
    pub fn with_invoicing(
        mut self,
        relay: Arc<dyn InvoicingRelay>,
        payment_type: impl Into<String>,
    ) -> Self {
        self.invoicing = Some(relay);
        self.payment_type = payment_type.into();
        self
    }

    /// Finalizes the composer's draft, stores it and requests an invoice.
    pub async fn place_order(&self, composer: &OrderComposer) -> ServiceResult<PlacedOrder> {
        let mut order = composer.finalize()?;
        let stored = self.orders.insert_order(to_document(&order)).await?;

        info!(
            order_id = %stored.id,
            origin = order.origin.as_str(),
            lines = order.items.len(),
            total = %order.total_with_tax,
            "Order placed"
        );

        let invoice = self.issue_invoice(&order).await;
        if let Some(invoice) = &invoice {
            match self.orders.attach_invoice(&order.id, invoice).await {
                Ok(()) => order.invoice = Some(invoice.clone()),
                Err(err) => warn!(
                    order_id = %order.id,
                    invoice_id = %invoice.invoice_id,
                    error = %err,
                    "Invoice issued but could not be attached"
                ),
            }
        }

        Ok(PlacedOrder { order, invoice })
    }

    async fn issue_invoice(&self, order: &Order) -> Option<InvoiceRef> {
        let relay = self.invoicing.as_ref()?;
        let request = InvoiceRequest::from_order(order, &self.payment_type);

        match relay.create_invoice(&request).await {
            Ok(invoice) => {
                info!(order_id = %order.id, invoice_id = %invoice.invoice_id, "Invoice issued");
                Some(invoice)
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "Invoicing failed; order kept");
                None
            }
        }
    }

    async fn reconciler(&self) -> ServiceResult<Reconciler> {
        Ok(Reconciler::new().with_product_names(self.catalog.product_names().await?))
    }

    /// Canonical orders, most recent first.
    ///
    /// Admins see everything; customers see their own orders whichever
    /// portal wrote them.
    pub async fn list_orders(&self, actor: &Actor) -> ServiceResult<Vec<Order>> {
        let filter = match actor {
            Actor::Admin => None,
            Actor::Customer(id) => Some(id.as_str()),
        };
        self.list_for_customer(filter).await
    }

    /// Canonical orders of one customer, or of everyone, most recent first.
    pub async fn list_for_customer(&self, customer_id: Option<&str>) -> ServiceResult<Vec<Order>> {
        let stored = self.orders.list_orders(customer_id).await?;
        let reconciler = self.reconciler().await?;
        let orders = reconciler.normalize_all(stored.iter().map(|s| &s.document));
        debug!(count = orders.len(), "Orders listed");
        Ok(orders)
    }

    async fn load(&self, actor: &Actor, id: &str) -> ServiceResult<(StoredOrder, Order)> {
        let stored = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))?;
        let order = self.reconciler().await?.normalize(&stored.document);

        // Someone else's order reads as missing
        if !actor.may_read(&order) {
            return Err(ServiceError::not_found("Order", id));
        }
        Ok((stored, order))
    }

    pub async fn get_order(&self, actor: &Actor, id: &str) -> ServiceResult<VersionedOrder> {
        let (stored, order) = self.load(actor, id).await?;
        Ok(VersionedOrder {
            order,
            version: stored.version,
        })
    }

    /// Moves an order to `next`.
    ///
    /// `expected_version` is the version the caller read; when `None`, the
    /// version loaded here is used.
    ///
    /// ## Errors
    /// - `NotFound` if the order doesn't exist or isn't the customer's
    /// - `Forbidden` if a customer asks for anything but cancellation
    /// - `InvalidStatusTransition` if the state machine disallows it
    /// - `ConcurrentWriteConflict` if the order changed since it was read
    pub async fn transition_status(
        &self,
        actor: &Actor,
        id: &str,
        next: OrderStatus,
        expected_version: Option<i64>,
    ) -> ServiceResult<VersionedOrder> {
        let (stored, order) = self.load(actor, id).await?;

        if matches!(actor, Actor::Customer(_)) && next != OrderStatus::Cancelled {
            return Err(ServiceError::Forbidden(format!(
                "customers may only cancel orders, not move them to {next}"
            )));
        }

        let from = order.status;
        from.transition_to(next)?;

        let version = expected_version.unwrap_or(stored.version);
        let updated = self.orders.update_status(id, next, version).await?;

        info!(order_id = %id, from = %from, to = %next, "Order status changed");
        Ok(VersionedOrder {
            order: self.reconciler().await?.normalize(&updated.document),
            version: updated.version,
        })
    }

    /// Deletes each order on its own. Unknown ids are reported as failures.
    pub async fn delete_orders(&self, ids: &[String]) -> BatchReport<String> {
        let mut report = BatchReport::new();
        for id in ids {
            let outcome = match self.orders.delete_order(id).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(ServiceError::not_found("Order", id)),
                Err(err) => Err(ServiceError::from(err)),
            };
            report.record(id.clone(), outcome);
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Order deletion batch finished"
        );
        report
    }

    /// Stores a document from either portal as-is and returns how it reads.
    pub async fn import_raw(&self, document: Value) -> ServiceResult<Order> {
        let stored = self.orders.insert_order(document).await?;
        debug!(order_id = %stored.id, "Raw order imported");
        Ok(self.reconciler().await?.normalize(&stored.document))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
