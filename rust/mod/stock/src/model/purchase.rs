use serde::{Deserialize, Serialize};

use invctl_core::status_enum;
use invctl_sql::{Record, Value};

status_enum! {
    /// PENDING_APPROVAL → (REJECTED | PENDING) → DELIVERED → FINISHED.
    PoStatus {
        PendingApproval => "PENDING_APPROVAL",
        Rejected => "REJECTED",
        Pending => "PENDING",
        Delivered => "DELIVERED",
        Finished => "FINISHED",
    }
}

impl PoStatus {
    /// Approved orders the warehouse can receive against.
    pub fn is_receivable(&self) -> bool {
        matches!(self, PoStatus::Pending | PoStatus::Delivered | PoStatus::Finished)
    }
}

/// A purchase order raised by Purchasing and approved by the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,
    pub po_number: String,
    /// Number of units the supplier should deliver.
    pub expected_sku_count: i64,
    /// Whole rupiah.
    pub buy_price: i64,
    pub status: PoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarder_receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_receipt: Option<String>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_at: Option<String>,
    pub updated_at: String,
}

impl Record for PurchaseOrder {
    const TABLE: &'static str = "purchase_orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("po_number", Value::text(&self.po_number)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// Raised by the warehouse when a delivery does not match its packing list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasingNotification {
    pub id: String,
    pub po_id: String,
    pub message: String,
    pub reported_by: String,
    #[serde(default)]
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl Record for PurchasingNotification {
    const TABLE: &'static str = "purchasing_notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("po_id", Value::text(&self.po_id)),
            ("is_resolved", Value::bool(self.is_resolved)),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}
