use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use invctl_core::{new_id, now_rfc3339, optional, required, Claims, FilePart, Role, ServiceError};
use invctl_sql::{record, RecordStore, Statement, Value};

use crate::model::{
    part_key, Decision, InstallationPhoto, PartOrigin, PartStatus, PhotoType, QcForm,
    RequestStatus, ReturnedPart, ReturnedPartStatus, Sku, SkuStatus, SparePart,
    SparePartRequest, TechnicianAnalytics,
};
use crate::service::StockService;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QcSubmission {
    pub condition_notes: String,
    #[serde(default)]
    pub needs_spare_part: bool,
    #[serde(default)]
    pub part_name: Option<String>,
    #[serde(default)]
    pub part_quantity: Option<i64>,
    #[serde(skip)]
    pub document: Option<FilePart>,
}

/// A photo upload paired with the remark typed next to it.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file: FilePart,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InstallationSubmission {
    pub notes: String,
    pub before: Vec<PhotoUpload>,
    pub after: Vec<PhotoUpload>,
    /// Name of the old part taken out of the machine, if any.
    pub old_part_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalCheck {
    pub decision: Decision,
    #[serde(default)]
    pub comments: Option<String>,
    /// Inventory part SKU the returned part is booked under.
    #[serde(default)]
    pub lead_assigned_sku: Option<String>,
}

/// Everything recorded against one unit in the workshop.
#[derive(Debug, Clone, Serialize)]
pub struct QcFormView {
    pub sku: Sku,
    pub form: Option<QcForm>,
    pub part_requests: Vec<SparePartRequest>,
    pub photos: Vec<InstallationPhoto>,
    pub returned_parts: Vec<ReturnedPart>,
}

const DEFAULT_APPROVE: &str = "Approved.";
const DEFAULT_REJECT: &str = "Rejected. Please fix.";
const DEFAULT_INSTALL_APPROVE: &str = "Installation approved.";

impl StockService {
    /// The technician's view of a unit. Leads and warehouse managers see
    /// any unit; technicians only their own.
    pub fn qc_form_view(&self, claims: &Claims, sku_id: &str) -> Result<QcFormView, ServiceError> {
        claims.require_any(&[Role::Technician, Role::LeadTechnician, Role::WarehouseManager])?;
        let sku = self.get_sku(sku_id)?;
        if !claims.in_group(Role::LeadTechnician) && !claims.in_group(Role::WarehouseManager) {
            check_owner(claims, &sku)?;
        }
        self.form_view(sku)
    }

    pub(crate) fn form_view(&self, sku: Sku) -> Result<QcFormView, ServiceError> {
        let form = self.form_for_sku(&sku.id)?;
        let (part_requests, photos, returned_parts) = match &form {
            Some(f) => {
                let args = [Value::text(&f.id)];
                (
                    self.sql.select("WHERE qc_id = ?1 ORDER BY created_at DESC", &args)?,
                    self.sql.select("WHERE qc_id = ?1 ORDER BY created_at", &args)?,
                    self.sql.select("WHERE qc_id = ?1 ORDER BY created_at DESC", &args)?,
                )
            }
            None => (vec![], vec![], vec![]),
        };
        Ok(QcFormView {
            sku,
            form,
            part_requests,
            photos,
            returned_parts,
        })
    }

    pub(crate) fn form_for_sku(&self, sku_id: &str) -> Result<Option<QcForm>, ServiceError> {
        Ok(self
            .sql
            .select_one("WHERE sku_id = ?1", &[Value::text(sku_id)])?)
    }

    /// Units assigned to the calling technician that are still in the workshop.
    pub fn my_workshop_skus(&self, claims: &Claims) -> Result<Vec<Sku>, ServiceError> {
        claims.require(Role::Technician)?;
        Ok(self.sql.select(
            "WHERE technician_id = ?1 AND status IN ('QC', 'QC_PENDING', 'AWAITING_INSTALL', \
             'PENDING_FINAL_CHECK') ORDER BY created_at DESC",
            &[Value::text(&claims.sub)],
        )?)
    }

    /// Submit (or resubmit) the QC form for a unit in QC.
    pub fn submit_qc(
        &self,
        claims: &Claims,
        sku_id: &str,
        input: QcSubmission,
    ) -> Result<QcForm, ServiceError> {
        claims.require(Role::Technician)?;
        let notes = required("condition_notes", &input.condition_notes)?;
        let part = if input.needs_spare_part {
            let name = required("part_name", input.part_name.as_deref().unwrap_or_default())?;
            let qty = input.part_quantity.unwrap_or(0);
            if qty < 1 {
                return Err(ServiceError::Validation("part_quantity must be at least 1".into()));
            }
            Some((name, qty))
        } else {
            None
        };

        let _guard = self.write_guard()?;
        let mut sku = self.get_sku(sku_id)?;
        check_owner(claims, &sku)?;
        if sku.status != SkuStatus::Qc {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, not in QC",
                sku.sku_code, sku.status
            )));
        }

        let document = match &input.document {
            Some(f) => Some(self.store_file(&format!("qc/{}", sku.sku_code), f)?),
            None => None,
        };
        let now = now_rfc3339();
        let mut stmts = Vec::new();
        let form = match self.form_for_sku(&sku.id)? {
            Some(mut form) => {
                form.condition_notes = notes;
                if document.is_some() {
                    form.qc_document = document;
                }
                form.is_approved_by_lead = false;
                form.lead_comments = None;
                form.managed_by = None;
                form.managed_at = None;
                form.submitted_at = now.clone();
                stmts.push(record::update(&form)?);
                form
            }
            None => {
                let form = QcForm {
                    id: new_id(),
                    sku_id: sku.id.clone(),
                    technician_id: claims.sub.clone(),
                    qc_document: document,
                    condition_notes: notes,
                    is_approved_by_lead: false,
                    lead_comments: None,
                    submitted_at: now.clone(),
                    managed_by: None,
                    managed_at: None,
                    installation_notes: None,
                    installation_submitted_at: None,
                    final_approval_at: None,
                    final_lead_comments: None,
                    final_managed_by: None,
                    final_managed_at: None,
                    created_at: now.clone(),
                };
                stmts.push(record::insert(&form)?);
                form
            }
        };

        // Superseded requests go; anything already bought or issued stays.
        stmts.push(Statement::new(
            "DELETE FROM spare_part_requests WHERE qc_id = ?1 AND status IN (?2, ?3)",
            vec![
                Value::text(&form.id),
                Value::text(RequestStatus::Pending.as_str()),
                Value::text(RequestStatus::Rejected.as_str()),
            ],
        ));
        if let Some((part_name, quantity_needed)) = part {
            let request = SparePartRequest {
                id: new_id(),
                qc_id: form.id.clone(),
                sku_id: sku.id.clone(),
                part_name,
                quantity_needed,
                status: RequestStatus::Pending,
                buy_approved_by: None,
                buy_approved_at: None,
                issued_by: None,
                issued_at: None,
                lead_receipt_approver: None,
                lead_receipt_at: None,
                created_at: now.clone(),
                received_at: None,
            };
            stmts.push(record::insert(&request)?);
        }

        sku.status = SkuStatus::QcPending;
        sku.updated_at = now;
        stmts.push(record::update(&sku)?);
        self.sql.exec_batch(&stmts)?;
        info!(sku = %sku.sku_code, by = %claims.name, needs_part = input.needs_spare_part, "submitted QC");
        Ok(form)
    }

    /// Units waiting for a lead's QC verdict.
    pub fn list_pending_qc(&self, claims: &Claims) -> Result<Vec<QcFormView>, ServiceError> {
        claims.require(Role::LeadTechnician)?;
        self.list_skus(Some(SkuStatus::QcPending))?
            .into_iter()
            .map(|sku| self.form_view(sku))
            .collect()
    }

    pub fn verify_qc(
        &self,
        claims: &Claims,
        qc_id: &str,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<QcForm, ServiceError> {
        claims.require(Role::LeadTechnician)?;
        let _guard = self.write_guard()?;
        let mut form: QcForm = self.sql.load(qc_id)?;
        let mut sku = self.get_sku(&form.sku_id)?;
        if sku.status != SkuStatus::QcPending {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, not awaiting QC verification",
                sku.sku_code, sku.status
            )));
        }

        let now = now_rfc3339();
        form.managed_by = Some(claims.sub.clone());
        form.managed_at = Some(now.clone());
        let mut stmts = Vec::new();
        match decision {
            Decision::Approve => {
                form.is_approved_by_lead = true;
                form.lead_comments = Some(optional(comments).unwrap_or_else(|| DEFAULT_APPROVE.into()));
                let waiting = self.sql.count::<SparePartRequest>(
                    "WHERE qc_id = ?1 AND status = ?2",
                    &[Value::text(&form.id), Value::text(RequestStatus::Pending.as_str())],
                )?;
                if waiting == 0 {
                    sku.status = SkuStatus::Ready;
                }
            }
            Decision::Reject => {
                form.is_approved_by_lead = false;
                form.lead_comments = Some(optional(comments).unwrap_or_else(|| DEFAULT_REJECT.into()));
                stmts.push(set_request_status(
                    &form.id,
                    RequestStatus::Pending,
                    RequestStatus::Rejected,
                ));
                stmts.push(self.bump_wrong_qc(&form.technician_id, &now)?);
                sku.status = SkuStatus::Qc;
            }
        }
        sku.updated_at = now;
        stmts.push(record::update(&form)?);
        stmts.push(record::update(&sku)?);
        self.sql.exec_batch(&stmts)?;

        match decision {
            Decision::Approve => {
                info!(sku = %sku.sku_code, by = %claims.name, status = %sku.status, "approved QC")
            }
            Decision::Reject => {
                warn!(sku = %sku.sku_code, by = %claims.name, technician = %form.technician_id, "rejected QC")
            }
        }
        Ok(form)
    }

    fn bump_wrong_qc(&self, technician_id: &str, now: &str) -> Result<Statement, ServiceError> {
        let existing: Option<TechnicianAnalytics> = self.sql.find(technician_id)?;
        Ok(match existing {
            Some(mut stats) => {
                stats.wrong_qc_count += 1;
                stats.updated_at = now.to_string();
                record::update(&stats)?
            }
            None => record::insert(&TechnicianAnalytics {
                id: technician_id.to_string(),
                wrong_qc_count: 1,
                created_at: now.to_string(),
                updated_at: now.to_string(),
            })?,
        })
    }

    // ── Installation ────────────────────────────────────────────────

    pub fn installation_view(&self, claims: &Claims, qc_id: &str) -> Result<QcFormView, ServiceError> {
        let form: QcForm = self.sql.load(qc_id)?;
        self.qc_form_view(claims, &form.sku_id)
    }

    /// Report the installation work: notes, before/after photos and any
    /// old part taken out.
    pub fn submit_installation(
        &self,
        claims: &Claims,
        qc_id: &str,
        input: InstallationSubmission,
    ) -> Result<QcForm, ServiceError> {
        claims.require(Role::Technician)?;
        let notes = required("installation notes", &input.notes)?;
        let old_part = optional(input.old_part_name);

        let _guard = self.write_guard()?;
        let mut form: QcForm = self.sql.load(qc_id)?;
        let mut sku = self.get_sku(&form.sku_id)?;
        check_owner(claims, &sku)?;
        if sku.status != SkuStatus::AwaitingInstall {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, not awaiting installation",
                sku.sku_code, sku.status
            )));
        }

        let now = now_rfc3339();
        let prefix = format!("installation/{}", sku.sku_code);
        let mut stmts = Vec::new();
        for (kind, photos) in [(PhotoType::Before, &input.before), (PhotoType::After, &input.after)] {
            for photo in photos {
                let image = self.store_file(&prefix, &photo.file)?;
                stmts.push(record::insert(&InstallationPhoto {
                    id: new_id(),
                    qc_id: form.id.clone(),
                    image,
                    photo_type: kind,
                    remarks: optional(photo.remarks.clone()),
                    uploaded_at: now.clone(),
                })?);
            }
        }

        stmts.push(Statement::new(
            "DELETE FROM returned_parts WHERE qc_id = ?1 AND status = ?2",
            vec![
                Value::text(&form.id),
                Value::text(ReturnedPartStatus::PendingLead.as_str()),
            ],
        ));
        if let Some(name) = old_part {
            stmts.push(record::insert(&ReturnedPart {
                id: new_id(),
                qc_id: form.id.clone(),
                part_name_reported: name,
                lead_assigned_sku: None,
                status: ReturnedPartStatus::PendingLead,
                approved_by_lead: None,
                reported_at: now.clone(),
                managed_at: None,
            })?);
        }

        form.installation_notes = Some(notes);
        form.installation_submitted_at = Some(now.clone());
        form.final_approval_at = None;
        form.final_lead_comments = None;
        form.final_managed_by = None;
        form.final_managed_at = None;
        sku.status = SkuStatus::PendingFinalCheck;
        sku.updated_at = now;
        stmts.push(record::update(&form)?);
        stmts.push(record::update(&sku)?);
        self.sql.exec_batch(&stmts)?;
        info!(
            sku = %sku.sku_code,
            by = %claims.name,
            photos = input.before.len() + input.after.len(),
            "submitted installation"
        );
        Ok(form)
    }

    /// Units waiting for a lead's final check.
    pub fn list_pending_final_check(&self, claims: &Claims) -> Result<Vec<QcFormView>, ServiceError> {
        claims.require(Role::LeadTechnician)?;
        self.list_skus(Some(SkuStatus::PendingFinalCheck))?
            .into_iter()
            .map(|sku| self.form_view(sku))
            .collect()
    }

    pub fn final_check(
        &self,
        claims: &Claims,
        qc_id: &str,
        input: FinalCheck,
    ) -> Result<QcForm, ServiceError> {
        claims.require(Role::LeadTechnician)?;
        let comments = optional(input.comments);
        let assigned_sku = optional(input.lead_assigned_sku);

        let _guard = self.write_guard()?;
        let mut form: QcForm = self.sql.load(qc_id)?;
        let mut sku = self.get_sku(&form.sku_id)?;
        if sku.status != SkuStatus::PendingFinalCheck {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, not awaiting final check",
                sku.sku_code, sku.status
            )));
        }
        let returned: Option<ReturnedPart> = self.sql.select_one(
            "WHERE qc_id = ?1 AND status = ?2",
            &[
                Value::text(&form.id),
                Value::text(ReturnedPartStatus::PendingLead.as_str()),
            ],
        )?;

        let now = now_rfc3339();
        let mut stmts = Vec::new();
        form.final_managed_by = Some(claims.sub.clone());
        form.final_managed_at = Some(now.clone());
        match input.decision {
            Decision::Approve => {
                if let Some(mut part) = returned {
                    let part_sku = assigned_sku.ok_or_else(|| {
                        ServiceError::Validation(
                            "lead_assigned_sku is required to book the returned part".into(),
                        )
                    })?;
                    stmts.push(self.book_returned_part(&part.part_name_reported, &part_sku, &now)?);
                    part.status = ReturnedPartStatus::Approved;
                    part.lead_assigned_sku = Some(part_sku);
                    part.approved_by_lead = Some(claims.sub.clone());
                    part.managed_at = Some(now.clone());
                    stmts.push(record::update(&part)?);
                }
                form.final_approval_at = Some(now.clone());
                form.final_lead_comments =
                    Some(comments.unwrap_or_else(|| DEFAULT_INSTALL_APPROVE.into()));
                sku.status = SkuStatus::Ready;
            }
            Decision::Reject => {
                let comments = comments.ok_or_else(|| {
                    ServiceError::Validation("comments are required when rejecting".into())
                })?;
                if let Some(mut part) = returned {
                    part.status = ReturnedPartStatus::Rejected;
                    part.managed_at = Some(now.clone());
                    stmts.push(record::update(&part)?);
                }
                form.final_approval_at = None;
                form.final_lead_comments = Some(comments);
                sku.status = SkuStatus::AwaitingInstall;
            }
        }
        sku.updated_at = now;
        stmts.push(record::update(&form)?);
        stmts.push(record::update(&sku)?);
        self.sql.exec_batch(&stmts)?;
        info!(sku = %sku.sku_code, by = %claims.name, status = %sku.status, "final check");
        Ok(form)
    }

    /// Put a returned part back into stock under `part_sku`, matching an
    /// existing line by part SKU, then by name.
    fn book_returned_part(
        &self,
        part_name: &str,
        part_sku: &str,
        now: &str,
    ) -> Result<Statement, ServiceError> {
        let mut existing: Option<SparePart> = self
            .sql
            .select_one("WHERE part_sku = ?1", &[Value::text(part_sku)])?;
        if existing.is_none() {
            existing = self
                .sql
                .select_one("WHERE part_key = ?1", &[Value::Text(part_key(part_name))])?;
        }
        Ok(match existing {
            Some(mut part) => {
                part.adjust_stock(1);
                part.origin = PartOrigin::Return;
                if part.part_sku.is_none() {
                    part.part_sku = Some(part_sku.to_string());
                }
                part.updated_at = now.to_string();
                record::update(&part)?
            }
            None => record::insert(&SparePart {
                id: new_id(),
                part_name: part_name.to_string(),
                part_sku: Some(part_sku.to_string()),
                quantity_in_stock: 1,
                location: None,
                primary_supplier: None,
                status: PartStatus::Ready,
                origin: PartOrigin::Return,
                created_at: now.to_string(),
                updated_at: now.to_string(),
            })?,
        })
    }
}

/// Units are only visible to the technician they're assigned to.
fn check_owner(claims: &Claims, sku: &Sku) -> Result<(), ServiceError> {
    if claims.is_root() || sku.assigned_technician.as_deref() == Some(claims.sub.as_str()) {
        return Ok(());
    }
    Err(ServiceError::NotFound(format!(
        "SKU '{}' is not assigned to you",
        sku.sku_code
    )))
}

/// Move every request of a form from one status to another in place.
pub(crate) fn set_request_status(qc_id: &str, from: RequestStatus, to: RequestStatus) -> Statement {
    Statement::new(
        "UPDATE spare_part_requests SET status = ?1, data = json_set(data, '$.status', ?1) \
         WHERE qc_id = ?2 AND status = ?3",
        vec![
            Value::text(to.as_str()),
            Value::text(qc_id),
            Value::text(from.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{as_user, file, fixture, ready_sku, received_sku, stocked_part};

    fn notes(s: &str) -> QcSubmission {
        QcSubmission {
            condition_notes: s.into(),
            ..Default::default()
        }
    }

    fn with_part(name: &str, qty: i64) -> QcSubmission {
        QcSubmission {
            condition_notes: "drum bearing worn".into(),
            needs_spare_part: true,
            part_name: Some(name.into()),
            part_quantity: Some(qty),
            document: Some(file("qc.pdf")),
        }
    }

    /// Drive a unit through QC with one part request, issue and receipt,
    /// leaving it AWAITING_INSTALL.
    fn awaiting_install(svc: &StockService, code: &str) -> QcForm {
        stocked_part(svc, "Bearing 6203", Some("BR-6203"), 5);
        let sku = received_sku(svc, code);
        let form = svc.submit_qc(&as_user("tech1"), &sku.id, with_part("bearing 6203", 1)).unwrap();
        svc.verify_qc(&as_user("lead1"), &form.id, Decision::Approve, None).unwrap();
        let req: SparePartRequest = svc
            .sql
            .select_one("WHERE qc_id = ?1", &[Value::text(&form.id)])
            .unwrap()
            .unwrap();
        svc.issue_part(&as_user("wm1"), &req.id).unwrap();
        svc.approve_part_receipt(&as_user("lead1"), &req.id, Decision::Approve).unwrap();
        assert_eq!(svc.get_sku(&sku.id).unwrap().status, SkuStatus::AwaitingInstall);
        form
    }

    #[test]
    fn only_the_assigned_technician_submits() {
        let svc = fixture();
        let sku = received_sku(&svc, "MC-1");
        let err = svc.submit_qc(&as_user("tech2"), &sku.id, notes("ok")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(matches!(
            svc.qc_form_view(&as_user("tech2"), &sku.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(svc.qc_form_view(&as_user("lead1"), &sku.id).is_ok());

        let err = svc.submit_qc(&as_user("tech1"), &sku.id, notes(" ")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = svc
            .submit_qc(&as_user("tech1"), &sku.id, with_part("belt", 0))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn approval_without_parts_makes_unit_ready() {
        let svc = fixture();
        let sku = received_sku(&svc, "MC-2");
        let form = svc.submit_qc(&as_user("tech1"), &sku.id, notes("clean")).unwrap();
        assert_eq!(svc.get_sku(&sku.id).unwrap().status, SkuStatus::QcPending);
        assert_eq!(svc.list_pending_qc(&as_user("lead1")).unwrap().len(), 1);

        assert!(matches!(
            svc.verify_qc(&as_user("tech1"), &form.id, Decision::Approve, None),
            Err(ServiceError::PermissionDenied(_))
        ));
        let form = svc.verify_qc(&as_user("lead1"), &form.id, Decision::Approve, None).unwrap();
        assert!(form.is_approved_by_lead);
        assert_eq!(form.lead_comments.as_deref(), Some("Approved."));
        assert_eq!(svc.get_sku(&sku.id).unwrap().status, SkuStatus::Ready);

        let err = svc
            .verify_qc(&as_user("lead1"), &form.id, Decision::Approve, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[test]
    fn approval_with_pending_part_holds_unit() {
        let svc = fixture();
        let sku = received_sku(&svc, "MC-3");
        let form = svc.submit_qc(&as_user("tech1"), &sku.id, with_part("Belt", 2)).unwrap();
        assert!(form.qc_document.is_some());
        svc.verify_qc(&as_user("lead1"), &form.id, Decision::Approve, Some("ok".into()))
            .unwrap();
        assert_eq!(svc.get_sku(&sku.id).unwrap().status, SkuStatus::QcPending);
    }

    #[test]
    fn rejection_counts_against_technician_and_resubmit_resets() {
        let svc = fixture();
        let sku = received_sku(&svc, "MC-4");
        let form = svc.submit_qc(&as_user("tech1"), &sku.id, with_part("Belt", 1)).unwrap();
        let form = svc.verify_qc(&as_user("lead1"), &form.id, Decision::Reject, None).unwrap();
        assert_eq!(form.lead_comments.as_deref(), Some("Rejected. Please fix."));
        assert_eq!(svc.get_sku(&sku.id).unwrap().status, SkuStatus::Qc);

        let view = svc.qc_form_view(&as_user("tech1"), &sku.id).unwrap();
        assert_eq!(view.part_requests[0].status, RequestStatus::Rejected);
        let stats: TechnicianAnalytics = svc.sql.load("tech1").unwrap();
        assert_eq!(stats.wrong_qc_count, 1);

        let again = svc.submit_qc(&as_user("tech1"), &sku.id, notes("fixed")).unwrap();
        assert_eq!(again.id, form.id);
        assert!(again.lead_comments.is_none());
        assert!(again.qc_document.is_some());
        let view = svc.qc_form_view(&as_user("tech1"), &sku.id).unwrap();
        assert!(view.part_requests.is_empty());

        let form = svc.verify_qc(&as_user("lead1"), &form.id, Decision::Reject, None).unwrap();
        svc.submit_qc(&as_user("tech1"), &sku.id, notes("fixed twice")).unwrap();
        svc.verify_qc(&as_user("lead1"), &form.id, Decision::Approve, None).unwrap();
        let stats: TechnicianAnalytics = svc.sql.load("tech1").unwrap();
        assert_eq!(stats.wrong_qc_count, 2);
    }

    #[test]
    fn installation_and_final_check_book_returned_part() {
        let svc = fixture();
        let form = awaiting_install(&svc, "MC-5");

        let err = svc
            .submit_installation(&as_user("tech2"), &form.id, InstallationSubmission {
                notes: "done".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        svc.submit_installation(
            &as_user("tech1"),
            &form.id,
            InstallationSubmission {
                notes: "replaced bearing".into(),
                before: vec![PhotoUpload {
                    file: file("before.jpg"),
                    remarks: Some("noisy drum".into()),
                }],
                after: vec![PhotoUpload {
                    file: file("after.jpg"),
                    remarks: None,
                }],
                old_part_name: Some("Bearing 6203".into()),
            },
        )
        .unwrap();
        let view = svc.installation_view(&as_user("lead1"), &form.id).unwrap();
        assert_eq!(view.sku.status, SkuStatus::PendingFinalCheck);
        assert_eq!(view.photos.len(), 2);
        assert_eq!(view.photos[0].remarks.as_deref(), Some("noisy drum"));
        assert_eq!(view.returned_parts.len(), 1);

        let approve = |sku: Option<&str>| FinalCheck {
            decision: Decision::Approve,
            comments: None,
            lead_assigned_sku: sku.map(str::to_string),
        };
        let err = svc.final_check(&as_user("lead1"), &form.id, approve(None)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let done = svc
            .final_check(&as_user("lead1"), &form.id, approve(Some("BR-6203")))
            .unwrap();
        assert_eq!(done.final_lead_comments.as_deref(), Some("Installation approved."));
        let view = svc.installation_view(&as_user("lead1"), &form.id).unwrap();
        assert_eq!(view.sku.status, SkuStatus::Ready);
        assert_eq!(view.returned_parts[0].status, ReturnedPartStatus::Approved);

        // 5 stocked, 1 issued, 1 returned.
        let part: SparePart = svc
            .sql
            .select_one("WHERE part_sku = ?1", &[Value::text("BR-6203")])
            .unwrap()
            .unwrap();
        assert_eq!(part.quantity_in_stock, 5);
        assert_eq!(part.origin, PartOrigin::Return);
    }

    #[test]
    fn final_rejection_sends_unit_back() {
        let svc = fixture();
        let form = awaiting_install(&svc, "MC-6");
        svc.submit_installation(
            &as_user("tech1"),
            &form.id,
            InstallationSubmission {
                notes: "installed".into(),
                old_part_name: Some("Old Pump".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let reject = |c: Option<&str>| FinalCheck {
            decision: Decision::Reject,
            comments: c.map(str::to_string),
            lead_assigned_sku: None,
        };
        assert!(matches!(
            svc.final_check(&as_user("lead1"), &form.id, reject(None)),
            Err(ServiceError::Validation(_))
        ));
        svc.final_check(&as_user("lead1"), &form.id, reject(Some("leaking")))
            .unwrap();
        let view = svc.installation_view(&as_user("tech1"), &form.id).unwrap();
        assert_eq!(view.sku.status, SkuStatus::AwaitingInstall);
        assert_eq!(view.returned_parts[0].status, ReturnedPartStatus::Rejected);
        assert_eq!(view.form.unwrap().final_lead_comments.as_deref(), Some("leaking"));
    }

    #[test]
    fn returned_part_without_stock_line_creates_one() {
        let svc = fixture();
        let form = awaiting_install(&svc, "MC-7");
        svc.submit_installation(
            &as_user("tech1"),
            &form.id,
            InstallationSubmission {
                notes: "ok".into(),
                old_part_name: Some("Control Board".into()),
                ..Default::default()
            },
        )
        .unwrap();
        svc.final_check(
            &as_user("lead1"),
            &form.id,
            FinalCheck {
                decision: Decision::Approve,
                comments: Some("good".into()),
                lead_assigned_sku: Some("CB-01".into()),
            },
        )
        .unwrap();
        let part: SparePart = svc
            .sql
            .select_one("WHERE part_sku = ?1", &[Value::text("CB-01")])
            .unwrap()
            .unwrap();
        assert_eq!(part.quantity_in_stock, 1);
        assert_eq!(part.status, PartStatus::Ready);
        assert_eq!(part.origin, PartOrigin::Return);
    }

    #[test]
    fn ready_units_cannot_be_resubmitted() {
        let svc = fixture();
        let sku = ready_sku(&svc, "MC-8");
        assert!(matches!(
            svc.submit_qc(&as_user("tech1"), &sku.id, notes("again")),
            Err(ServiceError::InvalidState(_))
        ));
    }
}
