use invctl_core::{Claims, ServiceError};
use stock::model::{Sku, Store};

use crate::pdf::{self, InvoiceData, LabelData, QuotationData};
use crate::service::SalesService;

/// A rendered PDF and the file name to offer it under.
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SalesService {
    fn store_of(&self, sku: &Sku) -> Result<Option<Store>, ServiceError> {
        match &sku.store_id {
            Some(id) => Ok(Some(self.stock.get_store(id)?)),
            None => Ok(None),
        }
    }

    pub fn print_invoice_a4(&self, claims: &Claims, order_id: &str) -> Result<PdfFile, ServiceError> {
        let order = self.owned_order(claims, order_id)?;
        let sku = self.stock.get_sku(&order.sku_id)?;
        let store = self.store_of(&sku)?;
        // Oldest first on paper.
        let mut payments = self.payments(&order.id)?;
        payments.reverse();
        let sales_person = self.stock.users().display_name(&order.sales_person);
        let bytes = pdf::render_invoice(&InvoiceData {
            order: &order,
            sku: &sku,
            payments: &payments,
            store: store.as_ref(),
            sales_person: &sales_person,
        })?;
        Ok(PdfFile {
            file_name: format!("{}.pdf", pdf::invoice_number(&order)),
            bytes,
        })
    }

    pub fn print_quotation_a4(&self, claims: &Claims, quotation_id: &str) -> Result<PdfFile, ServiceError> {
        let quotation = self.owned_quotation(claims, quotation_id)?;
        let sku = self.stock.get_sku(&quotation.sku_id)?;
        let store = self.store_of(&sku)?;
        let sales_person = self.stock.users().display_name(&quotation.sales_person);
        let bytes = pdf::render_quotation(&QuotationData {
            quotation: &quotation,
            sku: &sku,
            store: store.as_ref(),
            sales_person: &sales_person,
        })?;
        Ok(PdfFile {
            file_name: format!("{}.pdf", quotation.quotation_number.replace('/', "-")),
            bytes,
        })
    }

    pub fn print_order_label(&self, claims: &Claims, order_id: &str) -> Result<PdfFile, ServiceError> {
        let order = self.owned_order(claims, order_id)?;
        let sku = self.stock.get_sku(&order.sku_id)?;
        let store = self.store_of(&sku)?;
        let bytes = pdf::render_label(&LabelData {
            order: &order,
            sku: &sku,
            store: store.as_ref(),
        })?;
        Ok(PdfFile {
            file_name: format!("label-{}.pdf", sku.sku_code),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::orders::CreateOrder;
    use crate::service::testutil::{as_user, fixture, shop_sku};

    #[test]
    fn documents_are_owner_only() {
        let fx = fixture();
        let sku = shop_sku(&fx, "KS-9");
        let order = fx
            .create_order(
                &as_user("sales1"),
                CreateOrder {
                    customer_name: "Budi".into(),
                    customer_address: "Jl. Melati 3".into(),
                    customer_phone: "0812".into(),
                    sku_id: sku.id.clone(),
                    price: 1_000_000,
                },
            )
            .unwrap();

        let invoice = fx.print_invoice_a4(&as_user("sales1"), &order.id).unwrap();
        assert!(invoice.file_name.starts_with("INV-"));
        assert!(invoice.bytes.starts_with(b"%PDF"));
        let label = fx.print_order_label(&as_user("sales1"), &order.id).unwrap();
        assert_eq!(label.file_name, "label-KS-9.pdf");

        assert!(matches!(
            fx.print_invoice_a4(&as_user("sales2"), &order.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.print_order_label(&as_user("wm1"), &order.id),
            Err(ServiceError::PermissionDenied(_))
        ));
    }
}
