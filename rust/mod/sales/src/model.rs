use serde::{Deserialize, Serialize};

use invctl_core::{status_enum, ServiceError};
use invctl_sql::{Record, Value};

status_enum! {
    /// PENDING → BOOKED (down payment) → SOLD (paid in full) → SHIPPED → COMPLETED.
    OrderStatus {
        Pending => "PENDING",
        Booked => "BOOKED",
        Sold => "SOLD",
        Shipped => "SHIPPED",
        Completed => "COMPLETED",
    }
}

/// A customer order for one unit on the store floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub sku_id: String,
    /// Final sale price in whole rupiah.
    pub price: i64,
    /// Courier or "pickup".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_of_receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub status: OrderStatus,
    pub sales_person: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for SalesOrder {
    const TABLE: &'static str = "sales_orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("sku_id", Value::text(&self.sku_id)),
            ("sales_person", Value::text(&self.sales_person)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// One transfer against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    /// Blob key of the transfer slip.
    pub proof_of_transfer: String,
    pub payment_date: String,
    pub recorded_by: String,
}

impl Record for Payment {
    const TABLE: &'static str = "payments";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("order_id", Value::text(&self.order_id)),
            ("amount", Value::Integer(self.amount)),
            ("payment_date", Value::text(&self.payment_date)),
        ]
    }
}

status_enum! {
    QuotationStatus {
        Draft => "DRAFT",
        Converted => "CONVERTED",
    }
}

/// A priced offer that can later become an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    pub id: String,
    /// `Q-YYYY/MM/NNN` unless given explicitly.
    pub quotation_number: String,
    /// `YYYY-MM-DD`, inclusive.
    pub valid_until: String,
    pub sku_id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub quantity: i64,
    pub price: i64,
    pub extra_discount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: QuotationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub sales_person: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Quotation {
    /// `(subtotal, total)`: quantity × price, less the extra discount.
    /// Amounts that do not fit in an `i64` are a validation error.
    pub fn amounts(&self) -> Result<(i64, i64), ServiceError> {
        let subtotal = self.quantity.checked_mul(self.price);
        let total = subtotal.and_then(|s| s.checked_sub(self.extra_discount));
        match (subtotal, total) {
            (Some(subtotal), Some(total)) => Ok((subtotal, total)),
            _ => Err(ServiceError::Validation("amount too large".into())),
        }
    }

    /// Past its validity date (`today` is `YYYY-MM-DD`).
    pub fn is_expired(&self, today: &str) -> bool {
        self.valid_until.as_str() < today
    }
}

impl Record for Quotation {
    const TABLE: &'static str = "quotations";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("quotation_number", Value::text(&self.quotation_number)),
            ("sku_id", Value::text(&self.sku_id)),
            ("sales_person", Value::text(&self.sales_person)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotation(qty: i64, price: i64, discount: i64) -> Quotation {
        Quotation {
            id: "q".into(),
            quotation_number: "Q-2026/10/001".into(),
            valid_until: "2026-10-31".into(),
            sku_id: "s".into(),
            customer_name: "Budi".into(),
            customer_address: "Jl. Melati 3".into(),
            customer_phone: "0812".into(),
            quantity: qty,
            price,
            extra_discount: discount,
            notes: None,
            status: QuotationStatus::Draft,
            order_id: None,
            sales_person: "sales1".into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn quotation_totals() {
        let q = quotation(2, 1_500_000, 250_000);
        assert_eq!(q.amounts().unwrap(), (3_000_000, 2_750_000));
    }

    #[test]
    fn oversized_amounts_do_not_wrap() {
        let q = quotation(10_000_000_000, 10_000_000_000, 0);
        assert!(matches!(q.amounts(), Err(ServiceError::Validation(_))));
        let q = quotation(1, i64::MAX, -1);
        assert!(matches!(q.amounts(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn validity_is_inclusive() {
        let q = quotation(1, 1, 0);
        assert!(!q.is_expired("2026-10-31"));
        assert!(q.is_expired("2026-11-01"));
    }
}
