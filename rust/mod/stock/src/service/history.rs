//! Per-unit timeline assembled from every record that touches a SKU.

use serde::Serialize;

use invctl_core::{Claims, ServiceError};
use invctl_sql::{RecordStore, Value};

use crate::model::{
    InstallationPhoto, MovementRequest, MovementStatus, PhotoType, PurchaseOrder, QcForm,
    Sku, SparePartRequest, Store,
};
use crate::service::StockService;

/// One event in a unit's life.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: String,
    pub details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl TimelineEntry {
    pub fn new(date: &str, kind: &str, actor: String, details: String) -> Self {
        Self {
            date: date.to_string(),
            kind: kind.to_string(),
            actor,
            details,
            attachments: vec![],
        }
    }

    pub fn with_attachment(mut self, key: Option<&str>) -> Self {
        self.attachments.extend(key.map(str::to_string));
        self
    }
}

/// Something outside the stock module with events for a unit (sales
/// orders, payments, shipping).
pub trait TimelineSource: Send + Sync {
    fn entries(&self, sku: &Sku) -> Result<Vec<TimelineEntry>, ServiceError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SkuHistory {
    pub sku: Sku,
    pub timeline: Vec<TimelineEntry>,
}

impl StockService {
    /// Full history of a unit, newest first. Open to any signed-in user.
    pub fn sku_history(&self, _claims: &Claims, sku_id: &str) -> Result<SkuHistory, ServiceError> {
        let sku = self.get_sku(sku_id)?;
        let mut timeline = self.stock_entries(&sku)?;
        for source in self.timeline_sources() {
            timeline.extend(source.entries(&sku)?);
        }
        // Entries are pushed in event order; reversing first keeps ties newest-first.
        timeline.reverse();
        timeline.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(SkuHistory { sku, timeline })
    }

    fn actor(&self, id: Option<&str>) -> String {
        id.map(|id| self.users.display_name(id))
            .unwrap_or_else(|| "-".to_string())
    }

    fn stock_entries(&self, sku: &Sku) -> Result<Vec<TimelineEntry>, ServiceError> {
        let mut out = Vec::new();

        let po: Option<PurchaseOrder> = self.sql.find(&sku.po_id)?;
        let po_number = po.map(|p| p.po_number).unwrap_or_default();
        out.push(TimelineEntry::new(
            &sku.created_at,
            "RECEIVED",
            self.actor(sku.received_by.as_deref()),
            format!(
                "Received under PO {}, assigned to {}",
                po_number,
                self.actor(sku.assigned_technician.as_deref())
            ),
        ));

        if let Some(form) = self.form_for_sku(&sku.id)? {
            self.qc_entries(&form, &mut out)?;
        }

        if let (Some(at), Some(shelf)) = (&sku.shelved_at, &sku.shelf_location) {
            out.push(TimelineEntry::new(
                at,
                "SHELVED",
                "-".to_string(),
                format!("Placed on rack {}", shelf),
            ));
        }

        let movements: Vec<MovementRequest> = self
            .sql
            .select("WHERE sku_id = ?1 ORDER BY created_at", &[Value::text(&sku.id)])?;
        for m in movements {
            let store: Option<Store> = self.sql.find(&m.store_id)?;
            let store_name = store.map(|s| s.name).unwrap_or_default();
            out.push(
                TimelineEntry::new(
                    &m.created_at,
                    "SENT_TO_STORE",
                    self.actor(Some(&m.requested_by)),
                    format!("Sent to {}", store_name),
                )
                .with_attachment(m.delivery_form.as_deref()),
            );
            if let (MovementStatus::Received, Some(at)) = (m.status, &m.received_at) {
                out.push(
                    TimelineEntry::new(
                        at,
                        "RECEIVED_AT_STORE",
                        self.actor(m.received_by.as_deref()),
                        format!("Received at {}", store_name),
                    )
                    .with_attachment(m.receipt_form.as_deref()),
                );
            }
        }
        Ok(out)
    }

    fn qc_entries(&self, form: &QcForm, out: &mut Vec<TimelineEntry>) -> Result<(), ServiceError> {
        let technician = self.actor(Some(&form.technician_id));
        out.push(
            TimelineEntry::new(
                &form.submitted_at,
                "QC_SUBMITTED",
                technician.clone(),
                form.condition_notes.clone(),
            )
            .with_attachment(form.qc_document.as_deref()),
        );
        if let Some(at) = &form.managed_at {
            let kind = if form.is_approved_by_lead { "QC_APPROVED" } else { "QC_REJECTED" };
            out.push(TimelineEntry::new(
                at,
                kind,
                self.actor(form.managed_by.as_deref()),
                form.lead_comments.clone().unwrap_or_default(),
            ));
        }

        let requests: Vec<SparePartRequest> = self
            .sql
            .select("WHERE qc_id = ?1 ORDER BY created_at", &[Value::text(&form.id)])?;
        for r in requests {
            let part = format!("{} x{}", r.part_name, r.quantity_needed);
            out.push(TimelineEntry::new(
                &r.created_at,
                "PART_REQUESTED",
                technician.clone(),
                part.clone(),
            ));
            if let Some(at) = &r.buy_approved_at {
                out.push(TimelineEntry::new(
                    at,
                    "PART_BUY_APPROVED",
                    self.actor(r.buy_approved_by.as_deref()),
                    part.clone(),
                ));
            }
            if let Some(at) = &r.received_at {
                out.push(TimelineEntry::new(at, "PART_RECEIVED", "-".to_string(), part.clone()));
            }
            if let Some(at) = &r.issued_at {
                out.push(TimelineEntry::new(
                    at,
                    "PART_ISSUED",
                    self.actor(r.issued_by.as_deref()),
                    part.clone(),
                ));
            }
            if let Some(at) = &r.lead_receipt_at {
                out.push(TimelineEntry::new(
                    at,
                    "PART_LEAD_RECEIPT",
                    self.actor(r.lead_receipt_approver.as_deref()),
                    format!("{} ({})", part, r.status),
                ));
            }
        }

        if let Some(at) = &form.installation_submitted_at {
            let photos: Vec<InstallationPhoto> = self
                .sql
                .select("WHERE qc_id = ?1 ORDER BY created_at", &[Value::text(&form.id)])?;
            let mut entry = TimelineEntry::new(
                at,
                "INSTALLATION_SUBMITTED",
                technician.clone(),
                form.installation_notes.clone().unwrap_or_default(),
            );
            for kind in [PhotoType::Before, PhotoType::After] {
                entry
                    .attachments
                    .extend(photos.iter().filter(|p| p.photo_type == kind).map(|p| p.image.clone()));
            }
            out.push(entry);
        }
        if let Some(at) = &form.final_managed_at {
            let kind = if form.final_approval_at.is_some() {
                "INSTALLATION_APPROVED"
            } else {
                "INSTALLATION_REJECTED"
            };
            out.push(TimelineEntry::new(
                at,
                kind,
                self.actor(form.final_managed_by.as_deref()),
                form.final_lead_comments.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}
