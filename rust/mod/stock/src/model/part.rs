use serde::{Deserialize, Serialize};

use invctl_core::status_enum;
use invctl_sql::{Record, Value};

status_enum! {
    /// Spare-part request lifecycle.
    ///
    /// PENDING → PENDING_LEAD_RECEIPT (issued from stock) → ISSUED, or
    /// PENDING → APPROVED_BUY → RECEIVED → PENDING_LEAD_RECEIPT → ISSUED.
    /// QC rejection moves PENDING requests to REJECTED.
    RequestStatus {
        Pending => "PENDING",
        ApprovedBuy => "APPROVED_BUY",
        Received => "RECEIVED",
        PendingLeadReceipt => "PENDING_LEAD_RECEIPT",
        Issued => "ISSUED",
        Rejected => "REJECTED",
    }
}

impl RequestStatus {
    /// Requests that still block installation.
    pub const OPEN: &'static [RequestStatus] = &[
        RequestStatus::Pending,
        RequestStatus::ApprovedBuy,
        RequestStatus::Received,
        RequestStatus::PendingLeadReceipt,
    ];

    /// Requests that consumed or will consume a part.
    pub const USAGE: &'static [RequestStatus] = &[
        RequestStatus::Issued,
        RequestStatus::Received,
        RequestStatus::ApprovedBuy,
        RequestStatus::PendingLeadReceipt,
    ];
}

/// A technician's request for a part needed to fix a SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparePartRequest {
    pub id: String,
    pub qc_id: String,
    pub sku_id: String,
    pub part_name: String,
    pub quantity_needed: i64,
    pub status: RequestStatus,
    /// Warehouse manager who sent the request to Purchasing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_approved_at: Option<String>,
    /// Warehouse manager who handed the part out of stock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_receipt_approver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_receipt_at: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
}

impl Record for SparePartRequest {
    const TABLE: &'static str = "spare_part_requests";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("qc_id", Value::text(&self.qc_id)),
            ("sku_id", Value::text(&self.sku_id)),
            ("part_key", Value::Text(part_key(&self.part_name))),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

status_enum! {
    PartStatus {
        Ready => "READY",
        OnOrder => "ON_ORDER",
        InQc => "IN_QC",
        OutOfStock => "OUT_OF_STOCK",
        PendingAdjustment => "PENDING_ADJUSTMENT",
    }
}

impl PartStatus {
    /// Status implied by a stock level once no adjustment is pending.
    pub fn for_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            PartStatus::Ready
        } else {
            PartStatus::OutOfStock
        }
    }
}

status_enum! {
    PartOrigin {
        Manual => "MANUAL",
        Purchase => "PURCHASE",
        Return => "RETURN",
    }
}

/// A spare-part inventory line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparePart {
    pub id: String,
    /// Unique, matched case-insensitively.
    pub part_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_sku: Option<String>,
    pub quantity_in_stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_supplier: Option<String>,
    pub status: PartStatus,
    pub origin: PartOrigin,
    pub created_at: String,
    pub updated_at: String,
}

impl SparePart {
    /// Add (or with a negative delta, remove) stock. The status follows the
    /// level unless a count is under review.
    pub fn adjust_stock(&mut self, delta: i64) {
        self.quantity_in_stock += delta;
        if self.status != PartStatus::PendingAdjustment {
            self.status = match (self.status, self.quantity_in_stock > 0) {
                (_, false) => PartStatus::OutOfStock,
                (PartStatus::OutOfStock | PartStatus::OnOrder, true) => PartStatus::Ready,
                (s, true) => s,
            };
        }
    }
}

impl Record for SparePart {
    const TABLE: &'static str = "spare_parts";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("part_key", Value::Text(part_key(&self.part_name))),
            ("part_sku", Value::opt_text(self.part_sku.as_deref())),
            ("quantity", Value::Integer(self.quantity_in_stock)),
            ("status", Value::text(self.status.as_str())),
            ("origin", Value::text(self.origin.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// Case-insensitive lookup key for part names.
pub fn part_key(name: &str) -> String {
    name.trim().to_lowercase()
}

status_enum! {
    AdjustmentStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

/// A stock count correction awaiting Purchasing's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: String,
    pub part_id: String,
    pub part_name: String,
    pub requested_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    /// Stock on record when the count was submitted.
    pub quantity_in_system: i64,
    /// Physically counted stock.
    pub quantity_actual: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub status: AdjustmentStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_at: Option<String>,
}

impl StockAdjustment {
    pub fn difference(&self) -> i64 {
        self.quantity_actual - self.quantity_in_system
    }
}

impl Record for StockAdjustment {
    const TABLE: &'static str = "stock_adjustments";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("part_id", Value::text(&self.part_id)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// An adjustment with its signed difference, as shown to reviewers.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentView {
    #[serde(flatten)]
    pub adjustment: StockAdjustment,
    pub difference: i64,
}

impl From<StockAdjustment> for AdjustmentView {
    fn from(adjustment: StockAdjustment) -> Self {
        let difference = adjustment.difference();
        Self {
            adjustment,
            difference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(qty: i64, status: PartStatus) -> SparePart {
        SparePart {
            id: "p".into(),
            part_name: "Fan Motor".into(),
            part_sku: None,
            quantity_in_stock: qty,
            location: None,
            primary_supplier: None,
            status,
            origin: PartOrigin::Manual,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn stock_level_drives_status() {
        let mut p = part(1, PartStatus::Ready);
        p.adjust_stock(-1);
        assert_eq!(p.status, PartStatus::OutOfStock);
        p.adjust_stock(3);
        assert_eq!(p.status, PartStatus::Ready);

        let mut on_order = part(0, PartStatus::OnOrder);
        on_order.adjust_stock(2);
        assert_eq!(on_order.status, PartStatus::Ready);

        let mut in_qc = part(2, PartStatus::InQc);
        in_qc.adjust_stock(1);
        assert_eq!(in_qc.status, PartStatus::InQc);

        let mut locked = part(2, PartStatus::PendingAdjustment);
        locked.adjust_stock(-2);
        assert_eq!(locked.status, PartStatus::PendingAdjustment);
    }

    #[test]
    fn difference_is_signed() {
        let adj = StockAdjustment {
            id: "a".into(),
            part_id: "p".into(),
            part_name: "Belt".into(),
            requested_by: "w".into(),
            managed_by: None,
            quantity_in_system: 10,
            quantity_actual: 7,
            reason: "recount".into(),
            rejection_reason: None,
            status: AdjustmentStatus::Pending,
            created_at: String::new(),
            managed_at: None,
        };
        assert_eq!(adj.difference(), -3);
        let view = serde_json::to_value(AdjustmentView::from(adj)).unwrap();
        assert_eq!(view["difference"], -3);
        assert_eq!(view["status"], "PENDING");
    }

    #[test]
    fn part_keys_fold_case() {
        assert_eq!(part_key("  Fan MOTOR "), "fan motor");
    }
}
