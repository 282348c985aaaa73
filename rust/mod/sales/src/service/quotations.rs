use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use invctl_core::{
    code, format_rupiah, new_id, now_rfc3339, optional, required, today, Claims, Role, ServiceError,
};
use invctl_sql::{record, RecordStore, Value};
use stock::model::Sku;

use crate::model::{OrderStatus, Quotation, QuotationStatus, SalesOrder};
use crate::service::{check_owner, SalesService};

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotation {
    /// Generated when blank.
    #[serde(default)]
    pub quotation_number: Option<String>,
    /// `YYYY-MM-DD`.
    pub valid_until: String,
    pub sku_id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub price: i64,
    #[serde(default)]
    pub extra_discount: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotationDetail {
    pub quotation: Quotation,
    pub sku: Sku,
    pub subtotal: i64,
    pub total: i64,
    pub expired: bool,
}

/// `Q-YYYY/MM/` for the month of `date`.
fn number_prefix(date: NaiveDate) -> String {
    format!("Q-{:04}/{:02}/", date.year(), date.month())
}

impl SalesService {
    pub fn create_quotation(
        &self,
        claims: &Claims,
        input: CreateQuotation,
    ) -> Result<Quotation, ServiceError> {
        claims.require(Role::Sales)?;
        let customer_name = required("customer_name", &input.customer_name)?;
        let customer_address = required("customer_address", &input.customer_address)?;
        let customer_phone = required("customer_phone", &input.customer_phone)?;
        let today = today();
        let valid_until = NaiveDate::parse_from_str(input.valid_until.trim(), "%Y-%m-%d")
            .map_err(|_| ServiceError::Validation("valid_until must be YYYY-MM-DD".into()))?;
        if valid_until < today {
            return Err(ServiceError::Validation("valid_until cannot be in the past".into()));
        }
        if input.quantity < 1 {
            return Err(ServiceError::Validation("quantity must be at least 1".into()));
        }
        if input.price < 0 {
            return Err(ServiceError::Validation("price cannot be negative".into()));
        }
        let subtotal = input
            .quantity
            .checked_mul(input.price)
            .ok_or_else(|| ServiceError::Validation("amount too large".into()))?;
        if !(0..subtotal).contains(&input.extra_discount) {
            return Err(ServiceError::Validation(
                "extra_discount must leave a total of at least Rp 1".into(),
            ));
        }

        let _guard = self.stock.write_guard()?;
        let sku = self.stock.get_sku(&input.sku_id)?;
        let quotation_number = match optional(input.quotation_number) {
            Some(n) => {
                let n = code("quotation_number", &n)?;
                if self.quotation_by_number(&n)?.is_some() {
                    return Err(ServiceError::Conflict(format!("quotation '{}' already exists", n)));
                }
                n
            }
            None => self.next_quotation_number(today)?,
        };
        let now = now_rfc3339();
        let quotation = Quotation {
            id: new_id(),
            quotation_number,
            valid_until: valid_until.format("%Y-%m-%d").to_string(),
            sku_id: sku.id,
            customer_name,
            customer_address,
            customer_phone,
            quantity: input.quantity,
            price: input.price,
            extra_discount: input.extra_discount,
            notes: optional(input.notes),
            status: QuotationStatus::Draft,
            order_id: None,
            sales_person: claims.sub.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&quotation)?;
        info!(
            number = %quotation.quotation_number,
            total = subtotal - quotation.extra_discount,
            "created quotation"
        );
        Ok(quotation)
    }

    fn quotation_by_number(&self, number: &str) -> Result<Option<Quotation>, ServiceError> {
        Ok(self
            .sql
            .select_one("WHERE quotation_number = ?1", &[Value::text(number)])?)
    }

    /// Next free number in the month's sequence.
    fn next_quotation_number(&self, date: NaiveDate) -> Result<String, ServiceError> {
        let prefix = number_prefix(date);
        let mut seq = self.sql.count::<Quotation>(
            "WHERE quotation_number LIKE ?1",
            &[Value::text(format!("{}%", prefix))],
        )? + 1;
        loop {
            let number = format!("{}{:03}", prefix, seq);
            if self.quotation_by_number(&number)?.is_none() {
                return Ok(number);
            }
            seq += 1;
        }
    }

    /// The caller's quotations, newest first.
    pub fn list_quotations(&self, claims: &Claims) -> Result<Vec<Quotation>, ServiceError> {
        claims.require(Role::Sales)?;
        Ok(self.sql.select(
            "WHERE sales_person = ?1 ORDER BY created_at DESC",
            &[Value::text(&claims.sub)],
        )?)
    }

    pub(crate) fn owned_quotation(&self, claims: &Claims, id: &str) -> Result<Quotation, ServiceError> {
        claims.require(Role::Sales)?;
        let quotation: Quotation = self.sql.load(id)?;
        check_owner(claims, &quotation.sales_person, "quotations", id)?;
        Ok(quotation)
    }

    pub fn quotation_detail(&self, claims: &Claims, id: &str) -> Result<QuotationDetail, ServiceError> {
        let quotation = self.owned_quotation(claims, id)?;
        let (subtotal, total) = quotation.amounts()?;
        Ok(QuotationDetail {
            sku: self.stock.get_sku(&quotation.sku_id)?,
            subtotal,
            total,
            expired: quotation.is_expired(&today().format("%Y-%m-%d").to_string()),
            quotation,
        })
    }

    /// Turn a live draft into an order priced at the quotation total.
    pub fn convert_to_order(&self, claims: &Claims, id: &str) -> Result<SalesOrder, ServiceError> {
        let _guard = self.stock.write_guard()?;
        let mut quotation = self.owned_quotation(claims, id)?;
        if quotation.status != QuotationStatus::Draft {
            return Err(ServiceError::InvalidState(format!(
                "quotation '{}' was already converted",
                quotation.quotation_number
            )));
        }
        if quotation.is_expired(&today().format("%Y-%m-%d").to_string()) {
            return Err(ServiceError::InvalidState(format!(
                "quotation '{}' expired on {}",
                quotation.quotation_number, quotation.valid_until
            )));
        }
        let (_, total) = quotation.amounts()?;
        if total < 1 {
            return Err(ServiceError::Validation(format!(
                "quotation '{}' totals {}, nothing to sell",
                quotation.quotation_number,
                format_rupiah(total)
            )));
        }
        let sku = self.stock.get_sku(&quotation.sku_id)?;
        self.check_sellable(&sku)?;

        let now = now_rfc3339();
        let order = SalesOrder {
            id: new_id(),
            customer_name: quotation.customer_name.clone(),
            customer_address: quotation.customer_address.clone(),
            customer_phone: quotation.customer_phone.clone(),
            sku_id: sku.id.clone(),
            price: total,
            shipping_type: None,
            shipping_receipt: None,
            proof_of_receipt: None,
            shipped_at: None,
            completed_at: None,
            status: OrderStatus::Pending,
            sales_person: quotation.sales_person.clone(),
            quotation_id: Some(quotation.id.clone()),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        quotation.status = QuotationStatus::Converted;
        quotation.order_id = Some(order.id.clone());
        quotation.updated_at = now;
        self.sql
            .exec_batch(&[record::insert(&order)?, record::update(&quotation)?])?;
        info!(number = %quotation.quotation_number, order = %order.id, "converted quotation");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::service::testutil::{as_user, fixture, shop_sku, Fixture};

    fn input(sku: &Sku, valid_until: NaiveDate) -> CreateQuotation {
        CreateQuotation {
            quotation_number: None,
            valid_until: valid_until.format("%Y-%m-%d").to_string(),
            sku_id: sku.id.clone(),
            customer_name: "PT Sinar Jaya".into(),
            customer_address: "Jl. Asia Afrika 8, Bandung".into(),
            customer_phone: "022-4201234".into(),
            quantity: 1,
            price: 4_000_000,
            extra_discount: 250_000,
            notes: Some("Harga termasuk ongkir".into()),
        }
    }

    fn quote(fx: &Fixture, sku: &Sku) -> Quotation {
        fx.create_quotation(&as_user("sales1"), input(sku, today() + Duration::days(14)))
            .unwrap()
    }

    #[test]
    fn numbers_follow_the_month_sequence() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-1");
        let prefix = number_prefix(today());
        assert_eq!(quote(&fx, &sku).quotation_number, format!("{}001", prefix));
        assert_eq!(quote(&fx, &sku).quotation_number, format!("{}002", prefix));

        let mut manual = input(&sku, today());
        manual.quotation_number = Some(format!("{}003", prefix));
        fx.create_quotation(&as_user("sales1"), manual.clone()).unwrap();
        assert!(matches!(
            fx.create_quotation(&as_user("sales1"), manual),
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(quote(&fx, &sku).quotation_number, format!("{}004", prefix));
    }

    #[test]
    fn rejects_bad_input() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-2");
        let sales = as_user("sales1");

        let past = input(&sku, today() - Duration::days(1));
        assert!(matches!(fx.create_quotation(&sales, past), Err(ServiceError::Validation(_))));

        let mut discount = input(&sku, today());
        discount.extra_discount = 4_000_001;
        assert!(matches!(fx.create_quotation(&sales, discount), Err(ServiceError::Validation(_))));

        let mut qty = input(&sku, today());
        qty.quantity = 0;
        assert!(matches!(fx.create_quotation(&sales, qty), Err(ServiceError::Validation(_))));

        let mut date = input(&sku, today());
        date.valid_until = "31/12/2030".into();
        assert!(matches!(fx.create_quotation(&sales, date), Err(ServiceError::Validation(_))));

        let mut number = input(&sku, today());
        number.quotation_number = Some("Q-2026/../x".into());
        assert!(matches!(fx.create_quotation(&sales, number), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn amounts_must_fit_and_leave_something_to_pay() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-4");
        let sales = as_user("sales1");

        let mut huge = input(&sku, today());
        huge.quantity = 10_000_000_000;
        huge.price = 10_000_000_000;
        huge.extra_discount = 0;
        assert!(matches!(fx.create_quotation(&sales, huge), Err(ServiceError::Validation(_))));

        let mut free = input(&sku, today());
        free.extra_discount = free.price;
        assert!(matches!(fx.create_quotation(&sales, free), Err(ServiceError::Validation(_))));

        let mut zero_price = input(&sku, today());
        zero_price.price = 0;
        zero_price.extra_discount = 0;
        assert!(matches!(fx.create_quotation(&sales, zero_price), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn zero_total_draft_does_not_convert() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-5");
        let mut q = quote(&fx, &sku);
        q.extra_discount = q.price;
        fx.sql.save(&q).unwrap();

        assert!(matches!(
            fx.convert_to_order(&as_user("sales1"), &q.id),
            Err(ServiceError::Validation(_))
        ));
        let after = fx.quotation_detail(&as_user("sales1"), &q.id).unwrap();
        assert_eq!(after.total, 0);
        assert_eq!(after.quotation.status, QuotationStatus::Draft);
        assert!(fx.list_orders(&as_user("sales1")).unwrap().is_empty());
    }

    #[test]
    fn convert_creates_order_at_quotation_total() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-3");
        let q = quote(&fx, &sku);

        let detail = fx.quotation_detail(&as_user("sales1"), &q.id).unwrap();
        assert_eq!(detail.subtotal, 4_000_000);
        assert_eq!(detail.total, 3_750_000);
        assert!(!detail.expired);
        assert!(matches!(
            fx.quotation_detail(&as_user("sales2"), &q.id),
            Err(ServiceError::NotFound(_))
        ));

        let order = fx.convert_to_order(&as_user("sales1"), &q.id).unwrap();
        assert_eq!(order.price, 3_750_000);
        assert_eq!(order.quotation_id.as_deref(), Some(q.id.as_str()));
        assert_eq!(order.customer_name, "PT Sinar Jaya");

        let after = fx.quotation_detail(&as_user("sales1"), &q.id).unwrap();
        assert_eq!(after.quotation.status, QuotationStatus::Converted);
        assert_eq!(after.quotation.order_id.as_deref(), Some(order.id.as_str()));
        assert!(matches!(
            fx.convert_to_order(&as_user("sales1"), &q.id),
            Err(ServiceError::InvalidState(_))
        ));

        // The unit now has a pending order; a second quotation cannot convert.
        let second = quote(&fx, &sku);
        assert!(matches!(
            fx.convert_to_order(&as_user("sales1"), &second.id),
            Err(ServiceError::Conflict(_))
        ));
    }
}
