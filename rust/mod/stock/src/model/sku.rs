use serde::{Deserialize, Serialize};

use invctl_core::status_enum;
use invctl_sql::{Record, Value};

status_enum! {
    /// Where a unit is in its life, from receiving to sale.
    SkuStatus {
        Receiving => "RECEIVING",
        Qc => "QC",
        QcPending => "QC_PENDING",
        AwaitingInstall => "AWAITING_INSTALL",
        PendingFinalCheck => "PENDING_FINAL_CHECK",
        Ready => "READY",
        Delivering => "DELIVERING",
        Shop => "SHOP",
        Booked => "BOOKED",
        Sold => "SOLD",
    }
}

impl SkuStatus {
    /// Statuses during which the unit is in the hands of a technician.
    pub const IN_WORKSHOP: &'static [SkuStatus] = &[
        SkuStatus::Qc,
        SkuStatus::QcPending,
        SkuStatus::AwaitingInstall,
        SkuStatus::PendingFinalCheck,
    ];
}

status_enum! {
    SkuLocation {
        Warehouse => "WAREHOUSE",
        Shop => "SHOP",
    }
}

/// A single tracked machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sku {
    pub id: String,
    /// Serial/label code, unique.
    pub sku_code: String,
    pub name: String,
    pub po_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_technician: Option<String>,
    pub status: SkuStatus,
    pub location: SkuLocation,
    /// Rack currently holding the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_id: Option<String>,
    /// Rack code at shelving time; kept after the unit leaves the rack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf_location: Option<String>,
    /// Store the unit was delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Warehouse manager who registered the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelved_at: Option<String>,
    pub updated_at: String,
}

impl Record for Sku {
    const TABLE: &'static str = "skus";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("sku_code", Value::text(&self.sku_code)),
            ("po_id", Value::text(&self.po_id)),
            ("status", Value::text(self.status.as_str())),
            ("technician_id", Value::opt_text(self.assigned_technician.as_deref())),
            ("rack_id", Value::opt_text(self.rack_id.as_deref())),
            ("store_id", Value::opt_text(self.store_id.as_deref())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}
