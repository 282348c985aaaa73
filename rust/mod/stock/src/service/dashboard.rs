use serde::Serialize;
use serde_json::{json, Value as Json};

use invctl_core::{Claims, Role, ServiceError};
use invctl_sql::{RecordStore, Value};

use crate::model::{
    AdjustmentStatus, PoStatus, PurchaseOrder, RequestStatus, Sku, SkuStatus, TechnicianAnalytics,
};
use crate::service::StockService;

/// Quality figures for one technician.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicianStats {
    pub technician_id: String,
    pub username: String,
    pub wrong_qc_count: i64,
    pub units_in_workshop: usize,
}

/// Units visible on every non-technician dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Sidebar {
    pub under_technicians: Vec<Sku>,
    pub ready: Vec<Sku>,
    pub shop: Vec<Sku>,
}

impl StockService {
    /// The caller's landing page, chosen by their first role group.
    pub fn dashboard(&self, claims: &Claims) -> Result<Json, ServiceError> {
        let role = claims.primary_role();
        let mut body = match role {
            Some(Role::WarehouseManager) => self.warehouse_dashboard(claims)?,
            Some(Role::Technician) => json!({ "my_units": self.my_workshop_skus(claims)? }),
            Some(Role::LeadTechnician) => json!({
                "pending_qc": self.list_pending_qc(claims)?,
                "pending_final_check": self.list_pending_final_check(claims)?,
                "awaiting_receipt": self.list_part_requests(claims, Some(RequestStatus::PendingLeadReceipt))?,
                "technicians": self.technician_analytics(claims)?,
            }),
            Some(Role::Purchasing) => self.purchasing_dashboard(claims)?,
            Some(Role::Sales) => {
                let store = match self.assignment_for(&claims.sub)? {
                    Some(a) => Some(self.get_store(&a.store_id)?),
                    None => None,
                };
                json!({ "store": store, "incoming": self.incoming_movements(claims)? })
            }
            Some(Role::Master) => json!({
                "stores": self.list_stores(claims)?,
                "assignments": self.list_assignments(claims)?,
            }),
            None => json!({}),
        };
        body["role"] = json!(role);
        if role.is_some() && role != Some(Role::Technician) {
            body["sidebar"] = serde_json::to_value(self.sidebar()?)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
        }
        Ok(body)
    }

    fn warehouse_dashboard(&self, claims: &Claims) -> Result<Json, ServiceError> {
        Ok(json!({
            "pending_approvals": self.list_pending_approvals(claims)?,
            "receiving": self.list_receiving(claims)?,
            "part_requests": self.list_part_requests(claims, Some(RequestStatus::Pending))?,
            "unshelved": self.list_unshelved(claims)?,
            "movements": self.movement_overview(claims)?.delivering,
        }))
    }

    fn purchasing_dashboard(&self, claims: &Claims) -> Result<Json, ServiceError> {
        let my_orders: Vec<PurchaseOrder> = self.sql.select(
            "WHERE json_extract(data, '$.created_by') = ?1 AND status IN (?2, ?3) \
             ORDER BY created_at DESC",
            &[
                Value::text(&claims.sub),
                Value::text(PoStatus::PendingApproval.as_str()),
                Value::text(PoStatus::Rejected.as_str()),
            ],
        )?;
        Ok(json!({
            "my_orders": my_orders,
            "to_buy": self.list_part_requests(claims, Some(RequestStatus::ApprovedBuy))?,
            "adjustments": self.list_adjustments(claims, Some(AdjustmentStatus::Pending))?,
            "notifications": self.list_notifications(claims, false)?,
        }))
    }

    pub fn sidebar(&self) -> Result<Sidebar, ServiceError> {
        let workshop: Vec<Value> = SkuStatus::IN_WORKSHOP
            .iter()
            .map(|s| Value::text(s.as_str()))
            .collect();
        Ok(Sidebar {
            under_technicians: self.sql.select(
                "WHERE status IN (?1, ?2, ?3, ?4) ORDER BY created_at DESC",
                &workshop,
            )?,
            ready: self.list_skus(Some(SkuStatus::Ready))?,
            shop: self.list_skus(Some(SkuStatus::Shop))?,
        })
    }

    pub fn technician_analytics(&self, claims: &Claims) -> Result<Vec<TechnicianStats>, ServiceError> {
        claims.require_any(&[Role::LeadTechnician, Role::WarehouseManager])?;
        let workshop: Vec<Value> = SkuStatus::IN_WORKSHOP
            .iter()
            .map(|s| Value::text(s.as_str()))
            .collect();
        self.users
            .members(Role::Technician)?
            .into_iter()
            .map(|user| {
                let stats: Option<TechnicianAnalytics> = self.sql.find(&user.id)?;
                let mut args = vec![Value::text(&user.id)];
                args.extend(workshop.iter().cloned());
                let units_in_workshop = self.sql.count::<Sku>(
                    "WHERE technician_id = ?1 AND status IN (?2, ?3, ?4, ?5)",
                    &args,
                )?;
                Ok(TechnicianStats {
                    wrong_qc_count: stats.map(|s| s.wrong_qc_count).unwrap_or(0),
                    technician_id: user.id,
                    username: user.username,
                    units_in_workshop,
                })
            })
            .collect()
    }
}
