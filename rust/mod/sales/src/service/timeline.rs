//! Sales events in a unit's history.

use std::sync::Arc;

use invctl_core::{format_rupiah, ServiceError, UserDirectory};
use invctl_sql::{RecordStore, SQLStore, Value};
use stock::model::Sku;
use stock::{TimelineEntry, TimelineSource};

use crate::model::{Payment, SalesOrder};

/// Contributes the latest order on a unit, its payments, shipping and
/// completion.
pub struct SalesTimeline {
    sql: Arc<dyn SQLStore>,
    users: Arc<dyn UserDirectory>,
}

impl SalesTimeline {
    pub fn new(sql: Arc<dyn SQLStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { sql, users }
    }
}

impl TimelineSource for SalesTimeline {
    fn entries(&self, sku: &Sku) -> Result<Vec<TimelineEntry>, ServiceError> {
        let order: Option<SalesOrder> = self.sql.select_one(
            "WHERE sku_id = ?1 ORDER BY created_at DESC",
            &[Value::text(&sku.id)],
        )?;
        let Some(order) = order else {
            return Ok(vec![]);
        };
        let seller = self.users.display_name(&order.sales_person);

        let mut out = vec![TimelineEntry::new(
            &order.created_at,
            "ORDER_CREATED",
            seller.clone(),
            format!("Order for {} at {}", order.customer_name, format_rupiah(order.price)),
        )];
        let payments: Vec<Payment> = self.sql.select(
            "WHERE order_id = ?1 ORDER BY payment_date",
            &[Value::text(&order.id)],
        )?;
        for p in payments {
            out.push(
                TimelineEntry::new(
                    &p.payment_date,
                    "PAYMENT",
                    self.users.display_name(&p.recorded_by),
                    format_rupiah(p.amount),
                )
                .with_attachment(Some(&p.proof_of_transfer)),
            );
        }
        if let Some(at) = &order.shipped_at {
            out.push(
                TimelineEntry::new(
                    at,
                    "SHIPPED",
                    seller.clone(),
                    format!("Shipped via {}", order.shipping_type.as_deref().unwrap_or("-")),
                )
                .with_attachment(order.shipping_receipt.as_deref()),
            );
        }
        if let Some(at) = &order.completed_at {
            out.push(
                TimelineEntry::new(
                    at,
                    "COMPLETED",
                    seller,
                    format!("Received by {}", order.customer_name),
                )
                .with_attachment(order.proof_of_receipt.as_deref()),
            );
        }
        Ok(out)
    }
}
