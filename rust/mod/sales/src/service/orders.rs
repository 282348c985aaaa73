use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use invctl_core::{
    format_rupiah, new_id, now_rfc3339, optional, required, Claims, FilePart, Role, ServiceError,
};
use invctl_sql::{record, RecordStore, Value};
use stock::model::{Sku, SkuStatus};

use crate::model::{OrderStatus, Payment, SalesOrder};
use crate::service::{check_owner, SalesService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub sku_id: String,
    pub price: i64,
}

/// An order with its money trail.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: SalesOrder,
    pub sku: Sku,
    /// Newest first.
    pub payments: Vec<Payment>,
    pub total_paid: i64,
    pub remaining_balance: i64,
}

/// Order and unit status implied by what has been paid so far.
fn status_for(paid: i64, price: i64) -> (OrderStatus, SkuStatus) {
    if paid >= price {
        (OrderStatus::Sold, SkuStatus::Sold)
    } else if paid > 0 {
        (OrderStatus::Booked, SkuStatus::Booked)
    } else {
        (OrderStatus::Pending, SkuStatus::Shop)
    }
}

impl SalesService {
    /// Open an order for a unit on the store floor. The unit keeps its SHOP
    /// status until the first payment arrives.
    pub fn create_order(&self, claims: &Claims, input: CreateOrder) -> Result<SalesOrder, ServiceError> {
        claims.require(Role::Sales)?;
        let customer_name = required("customer_name", &input.customer_name)?;
        let customer_address = required("customer_address", &input.customer_address)?;
        let customer_phone = required("customer_phone", &input.customer_phone)?;
        if input.price < 1 {
            return Err(ServiceError::Validation("price must be at least Rp 1".into()));
        }

        let _guard = self.stock.write_guard()?;
        let sku = self.stock.get_sku(&input.sku_id)?;
        self.check_sellable(&sku)?;
        let now = now_rfc3339();
        let order = SalesOrder {
            id: new_id(),
            customer_name,
            customer_address,
            customer_phone,
            sku_id: sku.id.clone(),
            price: input.price,
            shipping_type: None,
            shipping_receipt: None,
            proof_of_receipt: None,
            shipped_at: None,
            completed_at: None,
            status: OrderStatus::Pending,
            sales_person: claims.sub.clone(),
            quotation_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&order)?;
        info!(sku = %sku.sku_code, customer = %order.customer_name, price = order.price, "created sales order");
        Ok(order)
    }

    /// The caller's orders, newest first.
    pub fn list_orders(&self, claims: &Claims) -> Result<Vec<SalesOrder>, ServiceError> {
        claims.require(Role::Sales)?;
        Ok(self.sql.select(
            "WHERE sales_person = ?1 ORDER BY created_at DESC",
            &[Value::text(&claims.sub)],
        )?)
    }

    pub(crate) fn owned_order(&self, claims: &Claims, id: &str) -> Result<SalesOrder, ServiceError> {
        claims.require(Role::Sales)?;
        let order: SalesOrder = self.sql.load(id)?;
        check_owner(claims, &order.sales_person, "sales_orders", id)?;
        Ok(order)
    }

    pub(crate) fn payments(&self, order_id: &str) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.sql.select(
            "WHERE order_id = ?1 ORDER BY payment_date DESC",
            &[Value::text(order_id)],
        )?)
    }

    pub fn order_detail(&self, claims: &Claims, id: &str) -> Result<OrderDetail, ServiceError> {
        let order = self.owned_order(claims, id)?;
        self.detail(order)
    }

    fn detail(&self, order: SalesOrder) -> Result<OrderDetail, ServiceError> {
        let payments = self.payments(&order.id)?;
        let total_paid = payments.iter().map(|p| p.amount).sum::<i64>();
        Ok(OrderDetail {
            sku: self.stock.get_sku(&order.sku_id)?,
            remaining_balance: order.price - total_paid,
            total_paid,
            payments,
            order,
        })
    }

    /// Record a transfer. Order and unit status follow the running total:
    /// any payment books the unit, full payment sells it.
    pub fn add_payment(
        &self,
        claims: &Claims,
        order_id: &str,
        amount: i64,
        proof_of_transfer: Option<FilePart>,
    ) -> Result<OrderDetail, ServiceError> {
        if amount < 1 {
            return Err(ServiceError::Validation("amount must be at least 1".into()));
        }
        let proof = proof_of_transfer
            .ok_or_else(|| ServiceError::Validation("proof of transfer is required".into()))?;

        let _guard = self.stock.write_guard()?;
        let mut order = self.owned_order(claims, order_id)?;
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Booked) {
            return Err(ServiceError::InvalidState(format!(
                "order is {}, payments are closed",
                order.status
            )));
        }
        let paid: i64 = self.payments(&order.id)?.iter().map(|p| p.amount).sum();
        let remaining = order.price - paid;
        if amount > remaining {
            warn!(order = %order.id, amount, remaining, "payment exceeds balance");
            return Err(ServiceError::Validation(format!(
                "payment of {} exceeds the remaining balance of {}",
                format_rupiah(amount),
                format_rupiah(remaining)
            )));
        }

        let now = now_rfc3339();
        let payment = Payment {
            id: new_id(),
            order_id: order.id.clone(),
            amount,
            proof_of_transfer: self.stock.store_file(&format!("payments/{}", order.id), &proof)?,
            payment_date: now.clone(),
            recorded_by: claims.sub.clone(),
        };
        let mut sku = self.stock.get_sku(&order.sku_id)?;
        let (order_status, sku_status) = status_for(paid + amount, order.price);
        order.status = order_status;
        order.updated_at = now.clone();
        sku.status = sku_status;
        sku.updated_at = now;
        self.sql.exec_batch(&[
            record::insert(&payment)?,
            record::update(&order)?,
            record::update(&sku)?,
        ])?;
        info!(
            order = %order.id,
            sku = %sku.sku_code,
            amount = %format_rupiah(amount),
            status = %order.status,
            "recorded payment"
        );
        self.detail(order)
    }

    /// Hand a fully paid order to the courier.
    pub fn process_shipping(
        &self,
        claims: &Claims,
        order_id: &str,
        shipping_type: Option<String>,
        shipping_receipt: Option<FilePart>,
    ) -> Result<SalesOrder, ServiceError> {
        let receipt = shipping_receipt
            .ok_or_else(|| ServiceError::Validation("shipping receipt is required".into()))?;
        let _guard = self.stock.write_guard()?;
        let mut order = self.owned_order(claims, order_id)?;
        if order.status != OrderStatus::Sold {
            return Err(ServiceError::InvalidState(format!(
                "order is {}, only SOLD orders can ship",
                order.status
            )));
        }
        let now = now_rfc3339();
        if let Some(kind) = optional(shipping_type) {
            order.shipping_type = Some(kind);
        }
        order.shipping_receipt =
            Some(self.stock.store_file(&format!("shipping/{}", order.id), &receipt)?);
        order.status = OrderStatus::Shipped;
        order.shipped_at = Some(now.clone());
        order.updated_at = now;
        self.sql.save(&order)?;
        info!(order = %order.id, courier = ?order.shipping_type, "order shipped");
        Ok(order)
    }

    /// Attach a courier receipt (ships the order) and/or the customer's
    /// proof of receipt (completes it). Either file may come alone.
    pub fn upload_shipping_files(
        &self,
        claims: &Claims,
        order_id: &str,
        shipping_receipt: Option<FilePart>,
        proof_of_receipt: Option<FilePart>,
    ) -> Result<SalesOrder, ServiceError> {
        if shipping_receipt.is_none() && proof_of_receipt.is_none() {
            return Err(ServiceError::Validation("no file uploaded".into()));
        }
        let _guard = self.stock.write_guard()?;
        let mut order = self.owned_order(claims, order_id)?;

        let mut status = order.status;
        if shipping_receipt.is_some() {
            if !matches!(status, OrderStatus::Sold | OrderStatus::Shipped) {
                return Err(ServiceError::InvalidState(format!(
                    "order is {}, a shipping receipt needs a SOLD order",
                    order.status
                )));
            }
            status = OrderStatus::Shipped;
        }
        if proof_of_receipt.is_some()
            && !matches!(status, OrderStatus::Shipped | OrderStatus::Completed)
        {
            return Err(ServiceError::InvalidState(format!(
                "order is {}, proof of receipt needs a shipped order",
                order.status
            )));
        }

        let now = now_rfc3339();
        let prefix = format!("shipping/{}", order.id);
        if let Some(file) = shipping_receipt {
            order.shipping_receipt = Some(self.stock.store_file(&prefix, &file)?);
            order.status = OrderStatus::Shipped;
            order.shipped_at = Some(now.clone());
        }
        if let Some(file) = proof_of_receipt {
            order.proof_of_receipt = Some(self.stock.store_file(&prefix, &file)?);
            order.status = OrderStatus::Completed;
            order.completed_at = Some(now.clone());
        }
        order.updated_at = now;
        self.sql.save(&order)?;
        info!(order = %order.id, status = %order.status, "updated shipping files");
        Ok(order)
    }
}
