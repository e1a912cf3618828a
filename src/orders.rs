//! Order facts: the resolver boundary and the in-memory catalog behind it.
//!
//! An unknown order is not an error. It resolves to a sentinel record
//! (`"Not Found"`, no delivery date, refund eligibility unknown), and the run
//! continues with degraded context.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{SupportError, WorkflowError};
use crate::workflow::WorkflowRecord;

/// Status string used when the order id is unknown.
pub const NOT_FOUND_STATUS: &str = "Not Found";

/// Facts about one order. `None` means unknown, never "no" or "false".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFacts {
    pub order_status: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub refund_eligible: Option<bool>,
}

impl OrderFacts {
    pub fn not_found() -> Self {
        Self {
            order_status: NOT_FOUND_STATUS.to_string(),
            delivery_date: None,
            refund_eligible: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.order_status == NOT_FOUND_STATUS
    }
}

/// Maps an order id to its facts.
pub trait FactResolver: Send + Sync {
    /// Never fails: unknown ids resolve to [`OrderFacts::not_found`].
    fn resolve(&self, order_id: &str) -> OrderFacts;
}

#[derive(Debug, Deserialize)]
struct OrderEntry {
    order_id: String,
    #[serde(flatten)]
    facts: OrderFacts,
}

#[derive(Debug, Deserialize)]
struct OrderFile {
    #[serde(default)]
    orders: Vec<OrderEntry>,
}

/// In-memory order catalog.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: BTreeMap<String, OrderFacts>,
}

impl OrderBook {
    /// The catalog used when no orders file is configured.
    pub fn sample() -> Self {
        let mut book = Self::default();
        book.insert("ORD123", OrderFacts {
            order_status: "In Transit".into(),
            delivery_date: None,
            refund_eligible: Some(false),
        });
        book.insert("ORD456", OrderFacts {
            order_status: "Delivered".into(),
            delivery_date: Some("2024-05-10".into()),
            refund_eligible: Some(true),
        });
        book.insert("ORD789", OrderFacts {
            order_status: "Delayed".into(),
            delivery_date: Some("2024-05-20".into()),
            refund_eligible: Some(false),
        });
        book
    }

    /// Parses a catalog from TOML made of `[[orders]]` tables.
    pub fn from_toml_str(contents: &str) -> Result<Self, SupportError> {
        let file: OrderFile = toml::from_str(contents)?;
        let mut book = Self::default();
        for entry in file.orders {
            if entry.order_id.trim().is_empty() {
                return Err(SupportError::Config(
                    "order entry with empty order_id".to_string(),
                ));
            }
            book.insert(entry.order_id, entry.facts);
        }
        Ok(book)
    }

    pub fn load(path: &Path) -> Result<Self, SupportError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn insert(&mut self, order_id: impl Into<String>, facts: OrderFacts) {
        self.orders.insert(order_id.into(), facts);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OrderFacts)> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl FactResolver for OrderBook {
    fn resolve(&self, order_id: &str) -> OrderFacts {
        self.orders
            .get(order_id)
            .cloned()
            .unwrap_or_else(OrderFacts::not_found)
    }
}

/// FETCHING step: resolves the order and writes the facts into the record.
pub fn fetch_context(
    resolver: &impl FactResolver,
    record: &mut WorkflowRecord,
) -> Result<(), WorkflowError> {
    let facts = resolver.resolve(&record.order_id);
    if facts.is_not_found() {
        warn!(task_id = %record.task_id, order_id = %record.order_id, "Order not found");
        record.log(format!("Error: Order {} not found in DB.", record.order_id));
    } else {
        info!(
            task_id = %record.task_id,
            order_id = %record.order_id,
            status = %facts.order_status,
            "Fetched order context"
        );
        record.log(format!("Successfully fetched context for {}.", record.order_id));
    }
    record.apply_facts(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Inquiry;
    use uuid::Uuid;

    fn record_for(order_id: &str) -> WorkflowRecord {
        WorkflowRecord::new(
            Inquiry {
                order_id: order_id.into(),
                customer_message: "hello".into(),
            },
            Uuid::new_v4(),
        )
    }

    #[test]
    fn sample_catalog_resolves_known_orders() {
        let book = OrderBook::sample();
        assert_eq!(book.len(), 3);

        let facts = book.resolve("ORD123");
        assert_eq!(facts.order_status, "In Transit");
        assert_eq!(facts.delivery_date, None);
        assert_eq!(facts.refund_eligible, Some(false));

        let facts = book.resolve("ORD456");
        assert_eq!(facts.delivery_date.as_deref(), Some("2024-05-10"));
        assert_eq!(facts.refund_eligible, Some(true));
    }

    #[test]
    fn unknown_order_resolves_to_sentinel() {
        let facts = OrderBook::sample().resolve("ORD000");
        assert!(facts.is_not_found());
        assert_eq!(facts.order_status, "Not Found");
        assert_eq!(facts.delivery_date, None);
        assert_eq!(facts.refund_eligible, None);
    }

    #[test]
    fn fetch_context_degrades_on_unknown_order() {
        let mut rec = record_for("NOPE-1");
        fetch_context(&OrderBook::sample(), &mut rec).unwrap();

        assert_eq!(rec.order_status.as_deref(), Some(NOT_FOUND_STATUS));
        assert_eq!(rec.delivery_date, None);
        assert_eq!(rec.refund_eligible, None);
        assert_eq!(
            rec.internal_logs.last().unwrap(),
            "Error: Order NOPE-1 not found in DB."
        );
    }

    #[test]
    fn fetch_context_copies_known_facts() {
        let mut rec = record_for("ORD789");
        fetch_context(&OrderBook::sample(), &mut rec).unwrap();

        assert_eq!(rec.order_status.as_deref(), Some("Delayed"));
        assert_eq!(rec.delivery_date.as_deref(), Some("2024-05-20"));
        assert_eq!(rec.refund_eligible, Some(false));
        assert_eq!(
            rec.internal_logs.last().unwrap(),
            "Successfully fetched context for ORD789."
        );
    }

    #[test]
    fn catalog_parses_from_toml() {
        let toml_str = r#"
            [[orders]]
            order_id = "A-1"
            order_status = "Shipped"
            delivery_date = "2025-01-02"
            refund_eligible = true

            [[orders]]
            order_id = "A-2"
            order_status = "Processing"
        "#;
        let book = OrderBook::from_toml_str(toml_str).unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.resolve("A-1").refund_eligible, Some(true));

        let pending = book.resolve("A-2");
        assert_eq!(pending.order_status, "Processing");
        assert_eq!(pending.delivery_date, None);
        assert_eq!(pending.refund_eligible, None);
    }

    #[test]
    fn catalog_rejects_blank_order_id() {
        let toml_str = r#"
            [[orders]]
            order_id = " "
            order_status = "Shipped"
        "#;
        assert!(matches!(
            OrderBook::from_toml_str(toml_str),
            Err(SupportError::Config(_))
        ));
    }

    #[test]
    fn catalog_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.toml");
        std::fs::write(
            &path,
            "[[orders]]\norder_id = \"F-1\"\norder_status = \"Delivered\"\n",
        )
        .unwrap();
        let book = OrderBook::load(&path).unwrap();
        assert_eq!(book.resolve("F-1").order_status, "Delivered");
    }
}
