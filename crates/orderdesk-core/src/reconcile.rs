//! # Order Reconciler
//!
//! Turns a stored order document, written by either portal in either field
//! naming scheme, into the canonical [`Order`]. Also writes documents that
//! carry both schemes so both portals can read them.
//!
//! ## Concept Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Concept             Customer portal    Admin portal       Winner       │
//! │  ───────             ───────────────    ────────────       ──────       │
//! │  customer id         userId             customer_id        admin        │
//! │  customer name       customerName       customer_name      customer     │
//! │  customer email      customerEmail      customer_email     customer     │
//! │  created at          createdAt          created_at         admin        │
//! │  items               items              order_items        admin        │
//! │  totals              totalWithVat ...   total_with_vat ... admin        │
//! │  notes               notes              comments           customer     │
//! │  line product id     productId          product_id         admin        │
//! │  line product name   productName        product_name       customer     │
//! │  line variation      variationIndex     variation_index    admin        │
//! │  line unit prices    priceWithVat ...   price_with_vat ... admin        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Display concepts prefer the customer portal's field; structural concepts
//! prefer the admin portal's, since the admin schema is what fulfillment
//! reads. A `null` or empty-string field counts as absent.
//!
//! ## Degradation
//! Normalizing never fails. Malformed prices become zero, malformed or
//! non-positive quantities become 0, unknown statuses read as `pending`,
//! unparseable timestamps are dropped and unnamed products show as
//! [`UNKNOWN_PRODUCT_NAME`](crate::UNKNOWN_PRODUCT_NAME).

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};

use crate::money::Money;
use crate::status::OrderStatus;
use crate::types::{
    CustomerRef, InvoiceRef, Order, OrderLineItem, OrderOrigin, PricePair, VariationSelector,
};

// =============================================================================
// Field Mapping
// =============================================================================

/// Which portal's field wins when a document carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Display concepts.
    Customer,
    /// Structural concepts.
    Admin,
}

/// One concept and its two physical field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub customer: &'static str,
    pub admin: &'static str,
    pub precedence: Precedence,
}

impl FieldMapping {
    const fn display(customer: &'static str, admin: &'static str) -> Self {
        FieldMapping {
            customer,
            admin,
            precedence: Precedence::Customer,
        }
    }

    const fn structural(customer: &'static str, admin: &'static str) -> Self {
        FieldMapping {
            customer,
            admin,
            precedence: Precedence::Admin,
        }
    }

    /// The winning present value for this concept.
    pub fn pick<'a>(&self, doc: &'a Map<String, Value>) -> Option<&'a Value> {
        self.pick_where(doc, |_| true)
    }

    /// Like [`FieldMapping::pick`], but a present value of the wrong shape
    /// does not shadow the other field.
    pub fn pick_where<'a>(
        &self,
        doc: &'a Map<String, Value>,
        accept: impl Fn(&Value) -> bool,
    ) -> Option<&'a Value> {
        let (first, second) = match self.precedence {
            Precedence::Customer => (self.customer, self.admin),
            Precedence::Admin => (self.admin, self.customer),
        };
        present(doc, first)
            .filter(|value| accept(value))
            .or_else(|| present(doc, second).filter(|value| accept(value)))
    }

    /// Writes `value` under both field names.
    fn write(&self, doc: &mut Map<String, Value>, value: Value) {
        if self.customer != self.admin {
            doc.insert(self.customer.to_string(), value.clone());
        }
        doc.insert(self.admin.to_string(), value);
    }
}

fn present<'a>(doc: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match doc.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

/// Order-level concepts.
pub mod order_fields {
    use super::FieldMapping;

    pub const ID: FieldMapping = FieldMapping::structural("id", "id");
    pub const CUSTOMER_ID: FieldMapping = FieldMapping::structural("userId", "customer_id");
    pub const CUSTOMER_NAME: FieldMapping = FieldMapping::display("customerName", "customer_name");
    pub const CUSTOMER_EMAIL: FieldMapping =
        FieldMapping::display("customerEmail", "customer_email");
    pub const CREATED_AT: FieldMapping = FieldMapping::structural("createdAt", "created_at");
    pub const ITEMS: FieldMapping = FieldMapping::structural("items", "order_items");
    pub const TOTAL_BEFORE_TAX: FieldMapping =
        FieldMapping::structural("totalBeforeVat", "total_before_vat");
    pub const TOTAL_WITH_TAX: FieldMapping =
        FieldMapping::structural("totalWithVat", "total_with_vat");
    pub const STATUS: FieldMapping = FieldMapping::structural("status", "status");
    pub const NOTES: FieldMapping = FieldMapping::display("notes", "comments");
    pub const INVOICE: FieldMapping = FieldMapping::structural("invoice", "invoice");
}

/// Line-level concepts.
pub mod line_fields {
    use super::FieldMapping;

    pub const PRODUCT_ID: FieldMapping = FieldMapping::structural("productId", "product_id");
    pub const PRODUCT_NAME: FieldMapping = FieldMapping::display("productName", "product_name");
    pub const VARIATION: FieldMapping =
        FieldMapping::structural("variationIndex", "variation_index");
    pub const VARIATION_NAME: FieldMapping =
        FieldMapping::display("variationName", "variation_name");
    pub const QUANTITY: FieldMapping = FieldMapping::structural("quantity", "quantity");
    pub const PRICE_BEFORE_TAX: FieldMapping =
        FieldMapping::structural("priceBeforeVat", "price_before_vat");
    pub const PRICE_WITH_TAX: FieldMapping =
        FieldMapping::structural("priceWithVat", "price_with_vat");
}

/// Invoice sub-document concepts.
pub mod invoice_fields {
    use super::FieldMapping;

    pub const ID: FieldMapping = FieldMapping::structural("invoiceId", "invoice_id");
    pub const NUMBER: FieldMapping = FieldMapping::structural("invoiceNumber", "invoice_number");
    pub const URL: FieldMapping = FieldMapping::structural("invoiceUrl", "invoice_url");
}

/// Explicit origin marker written by [`to_document`].
pub const ORIGIN_FIELD: &str = "origin";

/// Keys only the admin portal writes.
const ADMIN_ONLY_KEYS: [&str; 5] = [
    "customer_id",
    "order_items",
    "total_with_vat",
    "total_before_vat",
    "comments",
];

// =============================================================================
// Reconciler
// =============================================================================

/// Normalizes stored order documents.
///
/// Holds an optional product-name index used when a line carries a product
/// id but no stored name.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    product_names: HashMap<String, String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins product names by id for lines without a stored name.
    pub fn with_product_names<I, K, V>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.product_names
            .extend(names.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Reads a raw document into the canonical order. Never fails.
    pub fn normalize(&self, raw: &Value) -> Order {
        let empty = Map::new();
        let doc = raw.as_object().unwrap_or(&empty);
        let origin = detect_origin(doc);

        let customer = CustomerRef {
            id: order_fields::CUSTOMER_ID.pick(doc).and_then(read_string),
            name: order_fields::CUSTOMER_NAME.pick(doc).and_then(read_string),
            email: order_fields::CUSTOMER_EMAIL.pick(doc).and_then(read_string),
        };

        let status = match order_fields::STATUS.pick(doc).and_then(Value::as_str) {
            Some(text) => OrderStatus::parse(text).unwrap_or(OrderStatus::Pending),
            None if order_fields::STATUS.pick(doc).is_some() => OrderStatus::Pending,
            None => origin.initial_status(),
        };

        let items = order_fields::ITEMS
            .pick_where(doc, Value::is_array)
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|line| self.normalize_line(line))
                    .collect()
            })
            .unwrap_or_default();

        Order {
            id: order_fields::ID
                .pick(doc)
                .and_then(read_string)
                .unwrap_or_default(),
            customer,
            created_at: order_fields::CREATED_AT.pick(doc).and_then(read_timestamp),
            items,
            total_before_tax: read_money(order_fields::TOTAL_BEFORE_TAX.pick(doc)),
            total_with_tax: read_money(order_fields::TOTAL_WITH_TAX.pick(doc)),
            status,
            origin,
            notes: order_fields::NOTES.pick(doc).and_then(read_string),
            invoice: order_fields::INVOICE
                .pick_where(doc, Value::is_object)
                .and_then(Value::as_object)
                .and_then(read_invoice),
        }
    }

    fn normalize_line(&self, line: &Map<String, Value>) -> OrderLineItem {
        let product_id = line_fields::PRODUCT_ID
            .pick(line)
            .and_then(read_string)
            .unwrap_or_default();

        let product_name = line_fields::PRODUCT_NAME
            .pick(line)
            .and_then(read_string)
            .or_else(|| self.product_names.get(&product_id).cloned())
            .unwrap_or_else(|| crate::UNKNOWN_PRODUCT_NAME.to_string());

        // Unreadable indices fall back to the base price; the line keeps its
        // stored prices either way.
        let variation = line_fields::VARIATION
            .pick(line)
            .and_then(read_integer)
            .and_then(VariationSelector::from_index)
            .unwrap_or_default();

        let quantity = line_fields::QUANTITY
            .pick(line)
            .and_then(read_integer)
            .filter(|q| *q >= 1)
            .unwrap_or(0);

        OrderLineItem {
            product_id,
            product_name,
            variation,
            variation_name: line_fields::VARIATION_NAME.pick(line).and_then(read_string),
            quantity,
            unit_price: PricePair::new(
                read_money(line_fields::PRICE_BEFORE_TAX.pick(line)),
                read_money(line_fields::PRICE_WITH_TAX.pick(line)),
            ),
        }
    }

    /// Normalizes a batch and sorts it most recent first.
    pub fn normalize_all<'a, I>(&self, raws: I) -> Vec<Order>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut orders: Vec<Order> = raws.into_iter().map(|raw| self.normalize(raw)).collect();
        sort_most_recent_first(&mut orders);
        orders
    }
}

/// [`Reconciler::normalize`] without a product-name index.
pub fn normalize(raw: &Value) -> Order {
    Reconciler::new().normalize(raw)
}

/// Decided once per document.
fn detect_origin(doc: &Map<String, Value>) -> OrderOrigin {
    if let Some(origin) = present(doc, ORIGIN_FIELD)
        .and_then(Value::as_str)
        .and_then(OrderOrigin::parse)
    {
        return origin;
    }

    if ADMIN_ONLY_KEYS.iter().any(|key| present(doc, key).is_some()) {
        OrderOrigin::AdminPortal
    } else {
        OrderOrigin::CustomerPortal
    }
}

// =============================================================================
// Value Readers
// =============================================================================

fn read_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decimal major units, as a number or a numeric string. Anything else is zero.
fn read_money(value: Option<&Value>) -> Money {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().and_then(Money::from_major_f64),
        Some(Value::String(s)) => Money::from_major_str(s),
        _ => None,
    };
    parsed.unwrap_or_default()
}

/// RFC 3339 text, `YYYY-MM-DD HH:MM:SS` text (UTC), epoch milliseconds, or
/// a `{seconds, nanoseconds}` object with optional leading underscores.
fn read_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(obj) => {
            let seconds = ["seconds", "_seconds"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_i64))?;
            let nanos = ["nanoseconds", "_nanoseconds"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_u64))
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

fn read_invoice(doc: &Map<String, Value>) -> Option<InvoiceRef> {
    Some(InvoiceRef {
        invoice_id: invoice_fields::ID.pick(doc).and_then(read_string)?,
        invoice_number: invoice_fields::NUMBER.pick(doc).and_then(read_string),
        invoice_url: invoice_fields::URL.pick(doc).and_then(read_string),
    })
}

// =============================================================================
// Sorting
// =============================================================================

/// Most recent first. Stable: equal timestamps keep their original order,
/// and orders without a timestamp go last in their original order.
pub fn sort_most_recent_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

// =============================================================================
// Writing
// =============================================================================

fn money_value(money: Money) -> Value {
    json!(money.to_major_f64())
}

/// Renders an order as a stored document carrying BOTH field sets plus an
/// explicit origin marker. Absent optional fields are omitted.
pub fn to_document(order: &Order) -> Value {
    let mut doc = Map::new();

    order_fields::ID.write(&mut doc, json!(order.id));
    doc.insert(ORIGIN_FIELD.to_string(), json!(order.origin.as_str()));

    if let Some(id) = &order.customer.id {
        order_fields::CUSTOMER_ID.write(&mut doc, json!(id));
    }
    if let Some(name) = &order.customer.name {
        order_fields::CUSTOMER_NAME.write(&mut doc, json!(name));
    }
    if let Some(email) = &order.customer.email {
        order_fields::CUSTOMER_EMAIL.write(&mut doc, json!(email));
    }
    if let Some(created_at) = order.created_at {
        order_fields::CREATED_AT.write(&mut doc, json!(created_at.to_rfc3339()));
    }

    let items: Vec<Value> = order.items.iter().map(line_document).collect();
    order_fields::ITEMS.write(&mut doc, Value::Array(items));

    order_fields::TOTAL_BEFORE_TAX.write(&mut doc, money_value(order.total_before_tax));
    order_fields::TOTAL_WITH_TAX.write(&mut doc, money_value(order.total_with_tax));
    order_fields::STATUS.write(&mut doc, json!(order.status.as_str()));

    if let Some(notes) = &order.notes {
        order_fields::NOTES.write(&mut doc, json!(notes));
    }
    if let Some(invoice) = &order.invoice {
        order_fields::INVOICE.write(&mut doc, invoice_document(invoice));
    }

    Value::Object(doc)
}

fn line_document(line: &OrderLineItem) -> Value {
    let mut doc = Map::new();
    line_fields::PRODUCT_ID.write(&mut doc, json!(line.product_id));
    line_fields::PRODUCT_NAME.write(&mut doc, json!(line.product_name));
    line_fields::VARIATION.write(&mut doc, json!(line.variation.as_index()));
    if let Some(name) = &line.variation_name {
        line_fields::VARIATION_NAME.write(&mut doc, json!(name));
    }
    line_fields::QUANTITY.write(&mut doc, json!(line.quantity));
    line_fields::PRICE_BEFORE_TAX.write(&mut doc, money_value(line.unit_price.before_tax));
    line_fields::PRICE_WITH_TAX.write(&mut doc, money_value(line.unit_price.with_tax));
    Value::Object(doc)
}

/// Invoice sub-document in both field sets.
pub fn invoice_document(invoice: &InvoiceRef) -> Value {
    let mut doc = Map::new();
    invoice_fields::ID.write(&mut doc, json!(invoice.invoice_id));
    if let Some(number) = &invoice.invoice_number {
        invoice_fields::NUMBER.write(&mut doc, json!(number));
    }
    if let Some(url) = &invoice.invoice_url {
        invoice_fields::URL.write(&mut doc, json!(url));
    }
    Value::Object(doc)
}

// =============================================================================
// Unit Tests
// =============================================================================
