use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use invctl_core::{
    code, new_id, now_rfc3339, required, Claims, FilePart, ListParams, ListResult, Role, ServiceError,
    UserRef,
};
use invctl_sql::{contains_pattern, record, RecordStore, Value};

use crate::model::{PoStatus, PurchaseOrder, PurchasingNotification, Sku, SkuLocation, SkuStatus};
use crate::service::{in_clause, StockService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseOrder {
    pub po_number: String,
    pub expected_sku_count: i64,
    pub buy_price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSku {
    pub sku_code: String,
    pub name: String,
    pub technician_id: String,
}

/// A PO being received, its units so far and the technicians to assign.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivingDetail {
    pub po: PurchaseOrder,
    pub skus: Vec<Sku>,
    pub sku_count: usize,
    pub technicians: Vec<UserRef>,
}

const RECEIVABLE: &[&str] = &["PENDING", "DELIVERED", "FINISHED"];

impl StockService {
    // ── Purchasing ──────────────────────────────────────────────────

    pub fn create_po(
        &self,
        claims: &Claims,
        input: CreatePurchaseOrder,
        forwarder_receipt: Option<FilePart>,
    ) -> Result<PurchaseOrder, ServiceError> {
        claims.require(Role::Purchasing)?;
        let po_number = code("po_number", &input.po_number)?;
        if input.expected_sku_count < 1 {
            return Err(ServiceError::Validation(
                "expected_sku_count must be at least 1".into(),
            ));
        }
        if input.buy_price < 0 {
            return Err(ServiceError::Validation("buy_price cannot be negative".into()));
        }

        let _guard = self.write_guard()?;
        let existing: Option<PurchaseOrder> = self
            .sql
            .select_one("WHERE po_number = ?1", &[Value::text(&po_number)])?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "PO number '{}' already exists",
                po_number
            )));
        }

        let forwarder_receipt = match forwarder_receipt {
            Some(f) => Some(self.store_file(&format!("receipts/{}", po_number), &f)?),
            None => None,
        };
        let now = now_rfc3339();
        let po = PurchaseOrder {
            id: new_id(),
            po_number,
            expected_sku_count: input.expected_sku_count,
            buy_price: input.buy_price,
            status: PoStatus::PendingApproval,
            forwarder_receipt,
            delivery_receipt: None,
            created_by: claims.sub.clone(),
            approved_by: None,
            rejection_reason: None,
            created_at: now.clone(),
            managed_at: None,
            updated_at: now,
        };
        self.sql.create(&po)?;
        info!(po = %po.po_number, by = %claims.name, "created purchase order");
        Ok(po)
    }

    /// All POs, filterable by status and PO number.
    pub fn list_pos(
        &self,
        claims: &Claims,
        params: &ListParams,
    ) -> Result<ListResult<PurchaseOrder>, ServiceError> {
        claims.require_any(&[Role::Purchasing, Role::WarehouseManager])?;
        let mut conds = Vec::new();
        let mut args = Vec::new();
        if let Some(status) = params.status.as_deref() {
            let status = PoStatus::parse(status)
                .ok_or_else(|| ServiceError::Validation(format!("unknown PO status '{}'", status)))?;
            args.push(Value::text(status.as_str()));
            conds.push(format!("status = ?{}", args.len()));
        }
        if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
            args.push(Value::Text(contains_pattern(q.trim())));
            conds.push(format!("lower(po_number) LIKE ?{} ESCAPE '\\'", args.len()));
        }
        let clause = if conds.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conds.join(" AND "))
        };
        let total = self.sql.count::<PurchaseOrder>(&clause, &args)?;
        let page = format!(
            "{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            clause,
            args.len() + 1,
            args.len() + 2
        );
        args.push(Value::Integer(params.limit as i64));
        args.push(Value::Integer(params.offset as i64));
        let items = self.sql.select(&page, &args)?;
        Ok(ListResult { items, total })
    }

    pub fn get_po(&self, claims: &Claims, id: &str) -> Result<PurchaseOrder, ServiceError> {
        claims.require_any(&[Role::Purchasing, Role::WarehouseManager])?;
        Ok(self.sql.load(id)?)
    }

    pub fn upload_forwarder_receipt(
        &self,
        claims: &Claims,
        id: &str,
        file: FilePart,
    ) -> Result<PurchaseOrder, ServiceError> {
        claims.require(Role::Purchasing)?;
        let _guard = self.write_guard()?;
        let mut po: PurchaseOrder = self.sql.load(id)?;
        po.forwarder_receipt = Some(self.store_file(&format!("receipts/{}", po.po_number), &file)?);
        po.updated_at = now_rfc3339();
        self.sql.save(&po)?;
        Ok(po)
    }

    // ── Approval (WM) ───────────────────────────────────────────────

    pub fn list_pending_approvals(&self, claims: &Claims) -> Result<Vec<PurchaseOrder>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        Ok(self.sql.select(
            "WHERE status = ?1 ORDER BY created_at DESC",
            &[Value::text(PoStatus::PendingApproval.as_str())],
        )?)
    }

    pub fn approve_po(&self, claims: &Claims, id: &str) -> Result<PurchaseOrder, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut po = self.pending_approval(id)?;
        let now = now_rfc3339();
        po.status = PoStatus::Pending;
        po.approved_by = Some(claims.sub.clone());
        po.rejection_reason = None;
        po.managed_at = Some(now.clone());
        po.updated_at = now;
        self.sql.save(&po)?;
        info!(po = %po.po_number, by = %claims.name, "approved purchase order");
        Ok(po)
    }

    pub fn reject_po(
        &self,
        claims: &Claims,
        id: &str,
        reason: &str,
    ) -> Result<PurchaseOrder, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let reason = required("rejection reason", reason)?;
        let _guard = self.write_guard()?;
        let mut po = self.pending_approval(id)?;
        let now = now_rfc3339();
        po.status = PoStatus::Rejected;
        po.approved_by = Some(claims.sub.clone());
        po.rejection_reason = Some(reason);
        po.managed_at = Some(now.clone());
        po.updated_at = now;
        self.sql.save(&po)?;
        info!(po = %po.po_number, by = %claims.name, "rejected purchase order");
        Ok(po)
    }

    fn pending_approval(&self, id: &str) -> Result<PurchaseOrder, ServiceError> {
        let po: PurchaseOrder = self.sql.load(id)?;
        if po.status != PoStatus::PendingApproval {
            return Err(ServiceError::InvalidState(format!(
                "PO '{}' is {}, not awaiting approval",
                po.po_number, po.status
            )));
        }
        Ok(po)
    }

    // ── Receiving (WM) ──────────────────────────────────────────────

    /// Approved POs, newest first.
    pub fn list_receiving(&self, claims: &Claims) -> Result<Vec<PurchaseOrder>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let (cond, args) = in_clause("status", RECEIVABLE, 1);
        Ok(self
            .sql
            .select(&format!("WHERE {} ORDER BY created_at DESC", cond), &args)?)
    }

    pub fn receiving_detail(&self, claims: &Claims, id: &str) -> Result<ReceivingDetail, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let po = self.receivable(id)?;
        let skus = self.po_skus(&po.id)?;
        Ok(ReceivingDetail {
            sku_count: skus.len(),
            skus,
            technicians: self.users.members(Role::Technician)?,
            po,
        })
    }

    /// Register one delivered unit and hand it to a technician for QC.
    pub fn add_sku(&self, claims: &Claims, po_id: &str, input: AddSku) -> Result<Sku, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let sku_code = code("sku_code", &input.sku_code)?;
        let name = required("name", &input.name)?;
        let technician = required("technician_id", &input.technician_id)?;
        if !self.users.has_role(&technician, Role::Technician)? {
            return Err(ServiceError::Validation(format!(
                "user '{}' is not a technician",
                technician
            )));
        }

        let _guard = self.write_guard()?;
        let mut po = self.receivable(po_id)?;
        let existing: Option<Sku> = self
            .sql
            .select_one("WHERE sku_code = ?1", &[Value::text(&sku_code)])?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!("SKU '{}' already exists", sku_code)));
        }

        let now = now_rfc3339();
        let sku = Sku {
            id: new_id(),
            sku_code,
            name,
            po_id: po.id.clone(),
            assigned_technician: Some(technician),
            status: SkuStatus::Qc,
            location: SkuLocation::Warehouse,
            rack_id: None,
            shelf_location: None,
            store_id: None,
            received_by: Some(claims.sub.clone()),
            created_at: now.clone(),
            shelved_at: None,
            updated_at: now.clone(),
        };
        let received = self.sql.count::<Sku>("WHERE po_id = ?1", &[Value::text(&po.id)])? as i64 + 1;
        po.status = if received >= po.expected_sku_count {
            PoStatus::Finished
        } else {
            PoStatus::Delivered
        };
        po.updated_at = now;
        self.sql
            .exec_batch(&[record::insert(&sku)?, record::update(&po)?])?;
        info!(
            sku = %sku.sku_code,
            po = %po.po_number,
            received,
            expected = po.expected_sku_count,
            "received unit"
        );
        Ok(sku)
    }

    pub fn upload_delivery_receipt(
        &self,
        claims: &Claims,
        id: &str,
        file: FilePart,
    ) -> Result<PurchaseOrder, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut po = self.receivable(id)?;
        po.delivery_receipt = Some(self.store_file(&format!("receipts/{}", po.po_number), &file)?);
        po.updated_at = now_rfc3339();
        self.sql.save(&po)?;
        Ok(po)
    }

    /// Flag a delivery that doesn't match its packing list. Purchasing is
    /// notified and the PO goes back to PENDING.
    pub fn report_packing_list(
        &self,
        claims: &Claims,
        id: &str,
        message: &str,
    ) -> Result<PurchasingNotification, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let message = required("message", message)?;
        let _guard = self.write_guard()?;
        let mut po = self.receivable(id)?;
        let now = now_rfc3339();
        let note = PurchasingNotification {
            id: new_id(),
            po_id: po.id.clone(),
            message,
            reported_by: claims.sub.clone(),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: now.clone(),
        };
        po.status = PoStatus::Pending;
        po.updated_at = now;
        self.sql
            .exec_batch(&[record::insert(&note)?, record::update(&po)?])?;
        warn!(po = %po.po_number, by = %claims.name, "packing list mismatch reported");
        Ok(note)
    }

    fn receivable(&self, id: &str) -> Result<PurchaseOrder, ServiceError> {
        let po: PurchaseOrder = self.sql.load(id)?;
        if !po.status.is_receivable() {
            return Err(ServiceError::NotFound(format!(
                "PO '{}' is not open for receiving",
                po.po_number
            )));
        }
        Ok(po)
    }

    pub(crate) fn po_skus(&self, po_id: &str) -> Result<Vec<Sku>, ServiceError> {
        Ok(self
            .sql
            .select("WHERE po_id = ?1 ORDER BY created_at", &[Value::text(po_id)])?)
    }

    // ── Notifications (Purchasing) ──────────────────────────────────

    pub fn list_notifications(
        &self,
        claims: &Claims,
        include_resolved: bool,
    ) -> Result<Vec<PurchasingNotification>, ServiceError> {
        claims.require(Role::Purchasing)?;
        let clause = if include_resolved {
            "ORDER BY created_at DESC"
        } else {
            "WHERE is_resolved = 0 ORDER BY created_at DESC"
        };
        Ok(self.sql.select(clause, &[])?)
    }

    pub fn resolve_notification(
        &self,
        claims: &Claims,
        id: &str,
    ) -> Result<PurchasingNotification, ServiceError> {
        claims.require(Role::Purchasing)?;
        let _guard = self.write_guard()?;
        let mut note: PurchasingNotification = self.sql.load(id)?;
        if note.is_resolved {
            return Err(ServiceError::InvalidState("notification is already resolved".into()));
        }
        note.is_resolved = true;
        note.resolved_by = Some(claims.sub.clone());
        note.resolved_at = Some(now_rfc3339());
        self.sql.save(&note)?;
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{approved_po, as_user, file, fixture};

    fn add(svc: &StockService, po: &str, code: &str, tech: &str) -> Result<Sku, ServiceError> {
        svc.add_sku(
            &as_user("wm1"),
            po,
            AddSku {
                sku_code: code.into(),
                name: "Kulkas Sharp".into(),
                technician_id: tech.into(),
            },
        )
    }

    fn input(number: &str) -> CreatePurchaseOrder {
        CreatePurchaseOrder {
            po_number: number.into(),
            expected_sku_count: 2,
            buy_price: 2_500_000,
        }
    }

    #[test]
    fn create_requires_purchasing_and_unique_number() {
        let svc = fixture();
        let err = svc.create_po(&as_user("wm1"), input("PO-1"), None).unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let po = svc
            .create_po(&as_user("pur1"), input("PO-1"), Some(file("resi.pdf")))
            .unwrap();
        assert_eq!(po.status, PoStatus::PendingApproval);
        assert!(po.forwarder_receipt.as_deref().unwrap().starts_with("receipts/PO-1/"));

        let err = svc.create_po(&as_user("pur1"), input("PO-1"), None).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let bad = CreatePurchaseOrder {
            expected_sku_count: 0,
            ..input("PO-2")
        };
        assert!(matches!(
            svc.create_po(&as_user("pur1"), bad, None),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn approval_flow() {
        let svc = fixture();
        let po = svc.create_po(&as_user("pur1"), input("PO-7"), None).unwrap();
        assert_eq!(svc.list_pending_approvals(&as_user("wm1")).unwrap().len(), 1);

        assert!(matches!(
            svc.reject_po(&as_user("wm1"), &po.id, "  "),
            Err(ServiceError::Validation(_))
        ));
        let approved = svc.approve_po(&as_user("wm1"), &po.id).unwrap();
        assert_eq!(approved.status, PoStatus::Pending);
        assert_eq!(approved.approved_by.as_deref(), Some("wm1"));
        assert!(approved.managed_at.is_some());
        assert!(svc.list_pending_approvals(&as_user("wm1")).unwrap().is_empty());

        let err = svc.approve_po(&as_user("wm1"), &po.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[test]
    fn rejected_po_is_not_receivable() {
        let svc = fixture();
        let po = svc.create_po(&as_user("pur1"), input("PO-8"), None).unwrap();
        let rejected = svc.reject_po(&as_user("wm1"), &po.id, "wrong model").unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("wrong model"));
        assert!(matches!(
            svc.receiving_detail(&as_user("wm1"), &po.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(svc.list_receiving(&as_user("wm1")).unwrap().is_empty());
    }

    #[test]
    fn receiving_moves_po_to_finished() {
        let svc = fixture();
        let po = approved_po(&svc, "PO-9", 2);

        assert!(matches!(
            add(&svc, &po.id, "MC-1", "wm1"),
            Err(ServiceError::Validation(_))
        ));
        for unsafe_code in ["..", "MC/../x", "MC \"1\""] {
            assert!(matches!(
                add(&svc, &po.id, unsafe_code, "tech1"),
                Err(ServiceError::Validation(_))
            ));
        }

        let sku = add(&svc, &po.id, "MC-1", "tech1").unwrap();
        assert_eq!(sku.status, SkuStatus::Qc);
        assert_eq!(sku.location, SkuLocation::Warehouse);
        assert_eq!(svc.get_po(&as_user("pur1"), &po.id).unwrap().status, PoStatus::Delivered);

        assert!(matches!(
            add(&svc, &po.id, "MC-1", "tech2"),
            Err(ServiceError::Conflict(_))
        ));

        add(&svc, &po.id, "MC-2", "tech2").unwrap();
        let detail = svc.receiving_detail(&as_user("wm1"), &po.id).unwrap();
        assert_eq!(detail.po.status, PoStatus::Finished);
        assert_eq!(detail.sku_count, 2);
        assert_eq!(detail.technicians.len(), 2);
    }

    #[test]
    fn packing_list_report_notifies_purchasing() {
        let svc = fixture();
        let po = approved_po(&svc, "PO-10", 3);
        add(&svc, &po.id, "MC-10", "tech1").unwrap();

        assert!(matches!(
            svc.report_packing_list(&as_user("wm1"), &po.id, ""),
            Err(ServiceError::Validation(_))
        ));
        let note = svc
            .report_packing_list(&as_user("wm1"), &po.id, "2 units missing")
            .unwrap();
        assert_eq!(svc.get_po(&as_user("wm1"), &po.id).unwrap().status, PoStatus::Pending);

        let open = svc.list_notifications(&as_user("pur1"), false).unwrap();
        assert_eq!(open.len(), 1);
        svc.resolve_notification(&as_user("pur1"), &note.id).unwrap();
        assert!(svc.list_notifications(&as_user("pur1"), false).unwrap().is_empty());
        assert_eq!(svc.list_notifications(&as_user("pur1"), true).unwrap().len(), 1);
    }

    #[test]
    fn list_filters_by_status_and_number() {
        let svc = fixture();
        approved_po(&svc, "PO-A1", 1);
        svc.create_po(&as_user("pur1"), input("PO-B1"), None).unwrap();

        let params = ListParams {
            status: Some("PENDING_APPROVAL".into()),
            ..Default::default()
        };
        let res = svc.list_pos(&as_user("pur1"), &params).unwrap();
        assert_eq!(res.total, 1);
        assert_eq!(res.items[0].po_number, "PO-B1");

        let params = ListParams {
            q: Some("a1".into()),
            ..Default::default()
        };
        assert_eq!(svc.list_pos(&as_user("wm1"), &params).unwrap().total, 1);
    }
}
