//! # Service Bundle
//!
//! Wires stores, configuration and the invoicing relay into the services.
//!
//! ```text
//! AppConfig ──► Database::new(db_config) ──► Stores::from_database
//!     │                                            │
//!     │ [invoicing] enabled?                       ▼
//!     └──► HttpInvoicingRelay ─────────────► OrderDesk { catalog, pricing,
//!                                                         orders, resolver }
//! ```

use std::sync::Arc;

use orderdesk_core::{CustomerRef, OrderOrigin, TaxRate};
use orderdesk_db::{Database, Stores};
use tracing::info;

use crate::catalog::CatalogService;
use crate::composer::OrderComposer;
use crate::config::{AppConfig, ConfigError};
use crate::error::ServiceResult;
use crate::invoicing::{HttpInvoicingRelay, InvoicingRelay};
use crate::orders::OrderService;
use crate::pricing::PricingAdmin;
use crate::resolver::PriceResolver;

/// Every service, built over one set of stores.
#[derive(Clone)]
pub struct OrderDesk {
    pub catalog: CatalogService,
    pub pricing: PricingAdmin,
    pub orders: OrderService,
    pub resolver: PriceResolver,
    tax_rate: TaxRate,
}

impl OrderDesk {
    /// Services over `stores` without invoicing, at the default tax rate.
    pub fn new(stores: &Stores) -> Self {
        OrderDesk {
            catalog: CatalogService::new(stores),
            pricing: PricingAdmin::new(stores),
            orders: OrderService::new(stores),
            resolver: PriceResolver::from_stores(stores),
            tax_rate: TaxRate::default(),
        }
    }

    /// Services configured from `config`; the relay is only built when
    /// invoicing is enabled.
    pub fn from_config(stores: &Stores, config: &AppConfig) -> ServiceResult<Self> {
        let mut desk = OrderDesk::new(stores);
        desk.tax_rate = config.tax_rate();

        if config.invoicing.enabled {
            let relay = HttpInvoicingRelay::new(&config.invoicing)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let relay: Arc<dyn InvoicingRelay> = Arc::new(relay);
            desk.orders = desk
                .orders
                .with_invoicing(relay, config.invoicing.payment_type.clone());
            info!("Invoicing relay enabled");
        }

        Ok(desk)
    }

    /// Opens the configured database and builds the services over it.
    pub async fn connect(config: &AppConfig) -> ServiceResult<(Database, Self)> {
        let db = Database::new(config.db_config()).await?;
        let desk = OrderDesk::from_config(&Stores::from_database(&db), config)?;
        Ok((db, desk))
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// A new composer at the configured tax rate.
    pub fn composer(&self, origin: OrderOrigin, customer: Option<CustomerRef>) -> OrderComposer {
        let composer =
            OrderComposer::new(self.resolver.clone(), origin).with_tax_rate(self.tax_rate);
        match customer {
            Some(customer) => composer.for_customer(customer),
            None => composer,
        }
    }
}
