pub mod documents;
pub mod orders;
pub mod quotations;
pub mod schema;
pub mod timeline;

use std::sync::Arc;

use serde::Serialize;

use invctl_core::{Claims, FilePart, Role, ServiceError};
use invctl_sql::{RecordStore, SQLStore, Value};
use stock::model::{MovementRequest, Sku, SkuStatus, Store};
use stock::service::movement::MovementView;
use stock::StockService;

use crate::model::{OrderStatus, Quotation, SalesOrder};
use crate::service::timeline::SalesTimeline;

/// Orders, payments, shipping and quotations for units on the store floor.
///
/// Sales shares the stock write guard: payments move SKU status, and a
/// unit must not be sold twice while a transfer or another order touches it.
pub struct SalesService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) stock: Arc<StockService>,
}

/// What a sales user sees on login.
#[derive(Debug, Clone, Serialize)]
pub struct SalesDashboard {
    pub store: Option<Store>,
    pub orders: Vec<SalesOrder>,
    pub quotations: Vec<Quotation>,
    pub incoming: Vec<MovementView>,
}

impl SalesService {
    /// Create the sales tables and hook sales events into SKU history.
    pub fn new(stock: Arc<StockService>) -> Result<Arc<Self>, ServiceError> {
        let sql = stock.sql().clone();
        schema::init_schema(sql.as_ref())?;
        stock.register_timeline(Arc::new(SalesTimeline::new(
            sql.clone(),
            stock.users().clone(),
        )));
        Ok(Arc::new(Self { sql, stock }))
    }

    pub fn stock(&self) -> &Arc<StockService> {
        &self.stock
    }

    pub fn sales_dashboard(&self, claims: &Claims) -> Result<SalesDashboard, ServiceError> {
        claims.require(Role::Sales)?;
        let store = match self.stock.assignment_for(&claims.sub)? {
            Some(a) => Some(self.stock.get_store(&a.store_id)?),
            None => None,
        };
        Ok(SalesDashboard {
            store,
            orders: self.list_orders(claims)?,
            quotations: self.list_quotations(claims)?,
            incoming: self.stock.incoming_movements(claims)?,
        })
    }

    /// A sales user confirms a transfer arrived at their store.
    pub fn sales_receive_sku(
        &self,
        claims: &Claims,
        movement_id: &str,
        receipt: Option<FilePart>,
    ) -> Result<MovementRequest, ServiceError> {
        claims.require(Role::Sales)?;
        self.stock.confirm_received(claims, movement_id, receipt)
    }

    /// A unit can be sold when it is on the store floor and nobody else has
    /// an open order on it.
    pub(crate) fn check_sellable(&self, sku: &Sku) -> Result<(), ServiceError> {
        if sku.status != SkuStatus::Shop {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, only SHOP units can be sold",
                sku.sku_code, sku.status
            )));
        }
        let open = self.sql.count::<SalesOrder>(
            "WHERE sku_id = ?1 AND status = ?2",
            &[Value::text(&sku.id), Value::text(OrderStatus::Pending.as_str())],
        )?;
        if open > 0 {
            return Err(ServiceError::Conflict(format!(
                "SKU '{}' already has a pending order",
                sku.sku_code
            )));
        }
        Ok(())
    }
}

/// Orders and quotations belong to the sales person who made them; anyone
/// else gets `NotFound`.
pub(crate) fn check_owner(claims: &Claims, owner: &str, what: &str, id: &str) -> Result<(), ServiceError> {
    if claims.is_root() || claims.sub == owner {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("{} '{}' not found", what, id)))
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{as_user, delivering_sku, file, fixture};
    use super::*;

    #[test]
    fn sales_receives_only_for_own_store() {
        let fx = fixture();
        let (sku, movement_id) = delivering_sku(&fx, "KS-1");
        assert_eq!(sku.status, SkuStatus::Delivering);

        assert!(matches!(
            fx.sales_receive_sku(&as_user("sales2"), &movement_id, Some(file("r.jpg"))),
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            fx.sales_receive_sku(&as_user("wm1"), &movement_id, Some(file("r.jpg"))),
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            fx.sales_receive_sku(&as_user("sales1"), &movement_id, None),
            Err(ServiceError::Validation(_))
        ));

        let dash = fx.sales_dashboard(&as_user("sales1")).unwrap();
        assert_eq!(dash.incoming.len(), 1);
        assert_eq!(dash.store.map(|s| s.name).as_deref(), Some("Toko Pusat"));

        fx.sales_receive_sku(&as_user("sales1"), &movement_id, Some(file("r.jpg")))
            .unwrap();
        let sku = fx.stock().get_sku(&sku.id).unwrap();
        assert_eq!(sku.status, SkuStatus::Shop);
        assert_eq!(sku.store_id.as_deref(), Some(fx.store.id.as_str()));
        assert!(fx.sales_dashboard(&as_user("sales1")).unwrap().incoming.is_empty());
    }
}
