use serde::{Deserialize, Serialize};

use invctl_core::status_enum;
use invctl_sql::{Record, Value};

/// QC, installation and final-check record for one SKU.
///
/// There is at most one form per SKU; resubmissions overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcForm {
    pub id: String,
    pub sku_id: String,
    pub technician_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qc_document: Option<String>,
    pub condition_notes: String,
    #[serde(default)]
    pub is_approved_by_lead: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_comments: Option<String>,
    pub submitted_at: String,
    /// Lead who decided the QC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_at: Option<String>,

    // ── installation ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_submitted_at: Option<String>,

    // ── final check ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_approval_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_lead_comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_managed_at: Option<String>,

    pub created_at: String,
}

impl Record for QcForm {
    const TABLE: &'static str = "qc_forms";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("sku_id", Value::text(&self.sku_id)),
            ("technician_id", Value::text(&self.technician_id)),
            ("is_approved", Value::bool(self.is_approved_by_lead)),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

status_enum! {
    PhotoType {
        Before => "BEFORE",
        After => "AFTER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationPhoto {
    pub id: String,
    pub qc_id: String,
    /// Blob key.
    pub image: String,
    pub photo_type: PhotoType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub uploaded_at: String,
}

impl Record for InstallationPhoto {
    const TABLE: &'static str = "installation_photos";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("qc_id", Value::text(&self.qc_id)),
            ("created_at", Value::text(&self.uploaded_at)),
        ]
    }
}

status_enum! {
    ReturnedPartStatus {
        PendingLead => "PENDING_LEAD",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

/// An old part removed during installation, reported back to stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnedPart {
    pub id: String,
    pub qc_id: String,
    pub part_name_reported: String,
    /// Inventory part SKU chosen by the lead at final check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_assigned_sku: Option<String>,
    pub status: ReturnedPartStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by_lead: Option<String>,
    pub reported_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_at: Option<String>,
}

impl Record for ReturnedPart {
    const TABLE: &'static str = "returned_parts";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("qc_id", Value::text(&self.qc_id)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.reported_at)),
        ]
    }
}

/// Per-technician quality counter. The id is the technician's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianAnalytics {
    pub id: String,
    pub wrong_qc_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for TechnicianAnalytics {
    const TABLE: &'static str = "technician_analytics";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![("created_at", Value::text(&self.created_at))]
    }
}
