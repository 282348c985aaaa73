use serde::Serialize;
use tracing::{info, warn};

use invctl_core::{new_id, now_rfc3339, Claims, Role, ServiceError};
use invctl_sql::{record, RecordStore, Statement, Value};

use crate::model::{
    part_key, Decision, PartOrigin, PartStatus, QcForm, RequestStatus, Sku, SkuStatus, SparePart,
    SparePartRequest,
};
use crate::service::{in_clause, StockService};

/// A part request with its unit and the matching inventory line.
#[derive(Debug, Clone, Serialize)]
pub struct PartRequestView {
    pub request: SparePartRequest,
    pub sku: Sku,
    pub stock: Option<SparePart>,
}

impl StockService {
    pub(crate) fn part_by_name(&self, name: &str) -> Result<Option<SparePart>, ServiceError> {
        Ok(self
            .sql
            .select_one("WHERE part_key = ?1", &[Value::Text(part_key(name))])?)
    }

    fn request_view(&self, request: SparePartRequest) -> Result<PartRequestView, ServiceError> {
        let sku = self.get_sku(&request.sku_id)?;
        let stock = self.part_by_name(&request.part_name)?;
        Ok(PartRequestView {
            request,
            sku,
            stock,
        })
    }

    /// Requests in a status, oldest first. Warehouse managers work the
    /// PENDING queue, Purchasing the APPROVED_BUY queue, leads the
    /// PENDING_LEAD_RECEIPT queue.
    pub fn list_part_requests(
        &self,
        claims: &Claims,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PartRequestView>, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing, Role::LeadTechnician])?;
        let requests: Vec<SparePartRequest> = match status {
            Some(s) => self.sql.select(
                "WHERE status = ?1 ORDER BY created_at",
                &[Value::text(s.as_str())],
            )?,
            None => self.sql.select("ORDER BY created_at DESC", &[])?,
        };
        requests.into_iter().map(|r| self.request_view(r)).collect()
    }

    pub fn manage_part_request(&self, claims: &Claims, id: &str) -> Result<PartRequestView, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let request: SparePartRequest = self.sql.load(id)?;
        self.request_view(request)
    }

    /// Hand a part out of stock to the technician. The lead then confirms
    /// receipt.
    pub fn issue_part(&self, claims: &Claims, id: &str) -> Result<SparePartRequest, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut request: SparePartRequest = self.sql.load(id)?;
        if !matches!(request.status, RequestStatus::Pending | RequestStatus::Received) {
            return Err(ServiceError::InvalidState(format!(
                "request for '{}' is {}, nothing to issue",
                request.part_name, request.status
            )));
        }
        let mut part = self.part_by_name(&request.part_name)?.ok_or_else(|| {
            ServiceError::Validation(format!("'{}' is not in inventory", request.part_name))
        })?;
        if part.status == PartStatus::PendingAdjustment {
            return Err(ServiceError::InvalidState(format!(
                "'{}' has a stock count under review",
                part.part_name
            )));
        }
        if part.quantity_in_stock < request.quantity_needed {
            warn!(
                part = %part.part_name,
                stock = part.quantity_in_stock,
                needed = request.quantity_needed,
                "insufficient stock to issue"
            );
            return Err(ServiceError::Validation(format!(
                "insufficient stock for '{}': {} available, {} needed",
                part.part_name, part.quantity_in_stock, request.quantity_needed
            )));
        }

        let now = now_rfc3339();
        part.adjust_stock(-request.quantity_needed);
        part.updated_at = now.clone();
        request.status = RequestStatus::PendingLeadReceipt;
        request.issued_by = Some(claims.sub.clone());
        request.issued_at = Some(now);
        self.sql
            .exec_batch(&[record::update(&part)?, record::update(&request)?])?;
        info!(
            part = %part.part_name,
            qty = request.quantity_needed,
            left = part.quantity_in_stock,
            "issued spare part"
        );
        Ok(request)
    }

    /// Ask Purchasing to buy the part.
    pub fn approve_buy(&self, claims: &Claims, id: &str) -> Result<SparePartRequest, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut request: SparePartRequest = self.sql.load(id)?;
        if request.status != RequestStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "request for '{}' is {}, not PENDING",
                request.part_name, request.status
            )));
        }
        let now = now_rfc3339();
        request.status = RequestStatus::ApprovedBuy;
        request.buy_approved_by = Some(claims.sub.clone());
        request.buy_approved_at = Some(now.clone());
        let mut stmts = vec![record::update(&request)?];
        if let Some(mut part) = self.part_by_name(&request.part_name)? {
            if part.status == PartStatus::OutOfStock {
                part.status = PartStatus::OnOrder;
                part.updated_at = now;
                stmts.push(record::update(&part)?);
            }
        }
        self.sql.exec_batch(&stmts)?;
        info!(part = %request.part_name, qty = request.quantity_needed, "approved purchase of part");
        Ok(request)
    }

    /// Purchasing confirms the bought parts arrived; they go into stock.
    pub fn mark_part_received(&self, claims: &Claims, id: &str) -> Result<SparePartRequest, ServiceError> {
        claims.require(Role::Purchasing)?;
        let _guard = self.write_guard()?;
        let mut request: SparePartRequest = self.sql.load(id)?;
        if request.status != RequestStatus::ApprovedBuy {
            return Err(ServiceError::InvalidState(format!(
                "request for '{}' is {}, not APPROVED_BUY",
                request.part_name, request.status
            )));
        }
        let now = now_rfc3339();
        let stock = match self.part_by_name(&request.part_name)? {
            Some(mut part) => {
                part.adjust_stock(request.quantity_needed);
                part.updated_at = now.clone();
                record::update(&part)?
            }
            None => record::insert(&SparePart {
                id: new_id(),
                part_name: request.part_name.clone(),
                part_sku: None,
                quantity_in_stock: request.quantity_needed,
                location: None,
                primary_supplier: None,
                status: PartStatus::Ready,
                origin: PartOrigin::Purchase,
                created_at: now.clone(),
                updated_at: now.clone(),
            })?,
        };
        request.status = RequestStatus::Received;
        request.received_at = Some(now);
        self.sql.exec_batch(&[stock, record::update(&request)?])?;
        info!(part = %request.part_name, qty = request.quantity_needed, "received purchased part");
        Ok(request)
    }

    /// The lead confirms the technician got the part. Rejection puts the
    /// quantity back on the shelf and reopens the request.
    pub fn approve_part_receipt(
        &self,
        claims: &Claims,
        id: &str,
        decision: Decision,
    ) -> Result<SparePartRequest, ServiceError> {
        claims.require(Role::LeadTechnician)?;
        let _guard = self.write_guard()?;
        let mut request: SparePartRequest = self.sql.load(id)?;
        if request.status != RequestStatus::PendingLeadReceipt {
            return Err(ServiceError::InvalidState(format!(
                "request for '{}' is {}, not awaiting lead receipt",
                request.part_name, request.status
            )));
        }
        let now = now_rfc3339();
        let mut stmts: Vec<Statement> = Vec::new();
        request.lead_receipt_approver = Some(claims.sub.clone());
        request.lead_receipt_at = Some(now.clone());
        match decision {
            Decision::Approve => {
                request.status = RequestStatus::Issued;
                stmts.push(record::update(&request)?);
                if let Some(sku) = self.unblocked_sku(&request, &now)? {
                    stmts.push(record::update(&sku)?);
                }
            }
            Decision::Reject => {
                request.status = RequestStatus::Pending;
                stmts.push(record::update(&request)?);
                if let Some(mut part) = self.part_by_name(&request.part_name)? {
                    part.adjust_stock(request.quantity_needed);
                    part.updated_at = now;
                    stmts.push(record::update(&part)?);
                }
            }
        }
        self.sql.exec_batch(&stmts)?;
        info!(part = %request.part_name, status = %request.status, by = %claims.name, "lead part receipt");
        Ok(request)
    }

    /// The unit behind `request`, moved to AWAITING_INSTALL, if `request`
    /// was the last open one on an approved QC form.
    fn unblocked_sku(&self, request: &SparePartRequest, now: &str) -> Result<Option<Sku>, ServiceError> {
        let open: Vec<&str> = RequestStatus::OPEN.iter().map(|s| s.as_str()).collect();
        let (cond, mut args) = in_clause("status", &open, 3);
        args.insert(0, Value::text(&request.id));
        args.insert(0, Value::text(&request.qc_id));
        let others = self.sql.count::<SparePartRequest>(
            &format!("WHERE qc_id = ?1 AND id != ?2 AND {}", cond),
            &args,
        )?;
        if others > 0 {
            return Ok(None);
        }
        let form: QcForm = self.sql.load(&request.qc_id)?;
        let mut sku = self.get_sku(&request.sku_id)?;
        if !form.is_approved_by_lead || sku.status != SkuStatus::QcPending {
            return Ok(None);
        }
        sku.status = SkuStatus::AwaitingInstall;
        sku.updated_at = now.to_string();
        Ok(Some(sku))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::qc::QcSubmission;
    use crate::service::testutil::{as_user, fixture, received_sku, stocked_part};

    fn requested(svc: &StockService, code: &str, part: &str, qty: i64) -> SparePartRequest {
        let sku = received_sku(svc, code);
        let form = svc
            .submit_qc(
                &as_user("tech1"),
                &sku.id,
                QcSubmission {
                    condition_notes: "needs part".into(),
                    needs_spare_part: true,
                    part_name: Some(part.into()),
                    part_quantity: Some(qty),
                    document: None,
                },
            )
            .unwrap();
        svc.verify_qc(&as_user("lead1"), &form.id, Decision::Approve, None)
            .unwrap();
        svc.list_part_requests(&as_user("wm1"), Some(RequestStatus::Pending))
            .unwrap()
            .into_iter()
            .find(|v| v.sku.id == sku.id)
            .unwrap()
            .request
    }

    #[test]
    fn issue_deducts_stock_and_waits_for_lead() {
        let svc = fixture();
        stocked_part(&svc, "Fan Motor", None, 2);
        let req = requested(&svc, "MC-1", "FAN MOTOR", 2);

        let view = svc.manage_part_request(&as_user("wm1"), &req.id).unwrap();
        assert_eq!(view.stock.as_ref().unwrap().quantity_in_stock, 2);

        let issued = svc.issue_part(&as_user("wm1"), &req.id).unwrap();
        assert_eq!(issued.status, RequestStatus::PendingLeadReceipt);
        let part = svc.part_by_name("fan motor").unwrap().unwrap();
        assert_eq!(part.quantity_in_stock, 0);
        assert_eq!(part.status, PartStatus::OutOfStock);

        assert!(matches!(
            svc.issue_part(&as_user("wm1"), &req.id),
            Err(ServiceError::InvalidState(_))
        ));

        svc.approve_part_receipt(&as_user("lead1"), &req.id, Decision::Approve)
            .unwrap();
        assert_eq!(svc.get_sku(&req.sku_id).unwrap().status, SkuStatus::AwaitingInstall);
    }

    #[test]
    fn insufficient_stock_is_rejected() {
        let svc = fixture();
        stocked_part(&svc, "Belt", None, 1);
        let req = requested(&svc, "MC-2", "Belt", 3);
        let err = svc.issue_part(&as_user("wm1"), &req.id).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let unknown = requested(&svc, "MC-3", "Magnetron", 1);
        assert!(matches!(
            svc.issue_part(&as_user("wm1"), &unknown.id),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn lead_rejection_restores_stock() {
        let svc = fixture();
        stocked_part(&svc, "Hose", None, 4);
        let req = requested(&svc, "MC-4", "Hose", 3);
        svc.issue_part(&as_user("wm1"), &req.id).unwrap();

        let back = svc
            .approve_part_receipt(&as_user("lead1"), &req.id, Decision::Reject)
            .unwrap();
        assert_eq!(back.status, RequestStatus::Pending);
        assert_eq!(svc.part_by_name("hose").unwrap().unwrap().quantity_in_stock, 4);
        assert_eq!(svc.get_sku(&req.sku_id).unwrap().status, SkuStatus::QcPending);
    }

    #[test]
    fn purchase_path_creates_inventory_line() {
        let svc = fixture();
        let req = requested(&svc, "MC-5", "Thermostat", 2);
        assert!(matches!(
            svc.mark_part_received(&as_user("pur1"), &req.id),
            Err(ServiceError::InvalidState(_))
        ));
        svc.approve_buy(&as_user("wm1"), &req.id).unwrap();
        assert_eq!(
            svc.list_part_requests(&as_user("pur1"), Some(RequestStatus::ApprovedBuy))
                .unwrap()
                .len(),
            1
        );

        assert!(matches!(
            svc.mark_part_received(&as_user("wm1"), &req.id),
            Err(ServiceError::PermissionDenied(_))
        ));
        let received = svc.mark_part_received(&as_user("pur1"), &req.id).unwrap();
        assert!(received.received_at.is_some());
        let part = svc.part_by_name("thermostat").unwrap().unwrap();
        assert_eq!(part.origin, PartOrigin::Purchase);
        assert_eq!(part.quantity_in_stock, 2);

        svc.issue_part(&as_user("wm1"), &req.id).unwrap();
        svc.approve_part_receipt(&as_user("lead1"), &req.id, Decision::Approve)
            .unwrap();
        assert_eq!(svc.get_sku(&req.sku_id).unwrap().status, SkuStatus::AwaitingInstall);
    }

    #[test]
    fn approve_buy_marks_empty_line_on_order() {
        let svc = fixture();
        let part = stocked_part(&svc, "Valve", None, 0);
        assert_eq!(part.status, PartStatus::OutOfStock);
        let req = requested(&svc, "MC-6", "valve", 1);
        svc.approve_buy(&as_user("wm1"), &req.id).unwrap();
        assert_eq!(svc.part_by_name("Valve").unwrap().unwrap().status, PartStatus::OnOrder);
        svc.mark_part_received(&as_user("pur1"), &req.id).unwrap();
        assert_eq!(svc.part_by_name("Valve").unwrap().unwrap().status, PartStatus::Ready);
    }
}
