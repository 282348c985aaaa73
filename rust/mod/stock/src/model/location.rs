use serde::{Deserialize, Serialize};

use invctl_core::status_enum;
use invctl_sql::{Record, Value};

/// A warehouse rack with a fixed number of slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rack {
    pub id: String,
    /// Label such as `A-01`, unique.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub capacity: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for Rack {
    const TABLE: &'static str = "racks";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("code", Value::text(&self.code)),
            ("zone", Value::opt_text(self.zone.as_deref())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// A retail store that receives units from the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for Store {
    const TABLE: &'static str = "stores";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name_key", Value::Text(self.name.trim().to_lowercase())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

/// Places one sales user at one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesAssignment {
    pub id: String,
    pub sales_user_id: String,
    pub store_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for SalesAssignment {
    const TABLE: &'static str = "sales_assignments";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("sales_user_id", Value::text(&self.sales_user_id)),
            ("store_id", Value::text(&self.store_id)),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}

status_enum! {
    MovementStatus {
        Delivering => "DELIVERING",
        Received => "RECEIVED",
    }
}

/// Transfer of one unit from the warehouse to a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRequest {
    pub id: String,
    pub sku_id: String,
    pub store_id: String,
    pub requested_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_form: Option<String>,
    pub status: MovementStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
}

impl Record for MovementRequest {
    const TABLE: &'static str = "movements";

    fn id(&self) -> &str {
        &self.id
    }

    fn columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("sku_id", Value::text(&self.sku_id)),
            ("store_id", Value::text(&self.store_id)),
            ("status", Value::text(self.status.as_str())),
            ("created_at", Value::text(&self.created_at)),
        ]
    }
}
