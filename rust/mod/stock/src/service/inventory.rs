use serde::{Deserialize, Serialize};
use tracing::info;

use invctl_core::{new_id, now_rfc3339, optional, required, Claims, Role, ServiceError};
use invctl_sql::{contains_pattern, record, RecordStore, Value};

use crate::model::{
    part_key, AdjustmentStatus, AdjustmentView, Decision, PartOrigin, PartStatus, RequestStatus,
    Sku, SparePart, SparePartRequest, StockAdjustment,
};
use crate::service::{in_clause, StockService};

#[derive(Debug, Clone, Serialize)]
pub struct InventoryList {
    /// Bought or manually registered lines.
    pub manual: Vec<SparePart>,
    /// Lines fed by parts returned from installations.
    pub returned: Vec<SparePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartInput {
    pub part_name: String,
    #[serde(default)]
    pub part_sku: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub primary_supplier: Option<String>,
    /// Ignored on create.
    #[serde(default)]
    pub status: Option<PartStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentInput {
    pub quantity_actual: i64,
    pub reason: String,
}

/// One row of the typeahead search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartSearchHit {
    pub name: String,
    pub stock: i64,
    pub location: String,
    pub sku_part: String,
    pub supplier: String,
}

/// A request that consumed (or will consume) a part.
#[derive(Debug, Clone, Serialize)]
pub struct PartUsage {
    pub request: SparePartRequest,
    pub sku_code: String,
    pub sku_name: String,
    pub technician: Option<String>,
}

const SEARCH_LIMIT: i64 = 10;

impl StockService {
    pub fn list_inventory(&self, claims: &Claims) -> Result<InventoryList, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing])?;
        let (manual, manual_args) = in_clause(
            "origin",
            &[PartOrigin::Manual.as_str(), PartOrigin::Purchase.as_str()],
            1,
        );
        Ok(InventoryList {
            manual: self
                .sql
                .select(&format!("WHERE {} ORDER BY part_key", manual), &manual_args)?,
            returned: self.sql.select(
                "WHERE origin = ?1 ORDER BY part_key",
                &[Value::text(PartOrigin::Return.as_str())],
            )?,
        })
    }

    pub fn get_part(&self, claims: &Claims, id: &str) -> Result<SparePart, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing])?;
        Ok(self.sql.load(id)?)
    }

    /// Register a part line. Stock starts at zero and only moves through
    /// adjustments, purchases, issues and returns.
    pub fn add_part(&self, claims: &Claims, input: PartInput) -> Result<SparePart, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing])?;
        let part_name = required("part_name", &input.part_name)?;
        let part_sku = optional(input.part_sku);

        let _guard = self.write_guard()?;
        self.check_part_unique(None, &part_name, part_sku.as_deref())?;
        let now = now_rfc3339();
        let part = SparePart {
            id: new_id(),
            part_name,
            part_sku,
            quantity_in_stock: 0,
            location: optional(input.location),
            primary_supplier: optional(input.primary_supplier),
            status: PartStatus::OutOfStock,
            origin: PartOrigin::Manual,
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&part)?;
        info!(part = %part.part_name, by = %claims.name, "added part");
        Ok(part)
    }

    /// Edit the descriptive fields. Quantity is not editable here.
    pub fn edit_part(&self, claims: &Claims, id: &str, input: PartInput) -> Result<SparePart, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing])?;
        let part_name = required("part_name", &input.part_name)?;
        let part_sku = optional(input.part_sku);

        let _guard = self.write_guard()?;
        let mut part: SparePart = self.sql.load(id)?;
        self.check_part_unique(Some(&part.id), &part_name, part_sku.as_deref())?;
        if let Some(status) = input.status {
            let locked = part.status == PartStatus::PendingAdjustment;
            if status == PartStatus::PendingAdjustment && !locked {
                return Err(ServiceError::Validation(
                    "PENDING_ADJUSTMENT is set by requesting an adjustment".into(),
                ));
            }
            if locked && status != PartStatus::PendingAdjustment {
                return Err(ServiceError::InvalidState(format!(
                    "'{}' has a stock count under review",
                    part.part_name
                )));
            }
            part.status = status;
        }
        part.part_name = part_name;
        part.part_sku = part_sku;
        part.location = optional(input.location);
        part.primary_supplier = optional(input.primary_supplier);
        part.updated_at = now_rfc3339();
        self.sql.save(&part)?;
        Ok(part)
    }

    fn check_part_unique(
        &self,
        id: Option<&str>,
        name: &str,
        part_sku: Option<&str>,
    ) -> Result<(), ServiceError> {
        let other = |p: &SparePart| Some(p.id.as_str()) != id;
        if let Some(p) = self.part_by_name(name)? {
            if other(&p) {
                return Err(ServiceError::Conflict(format!("part '{}' already exists", name)));
            }
        }
        if let Some(sku) = part_sku {
            let found: Option<SparePart> =
                self.sql.select_one("WHERE part_sku = ?1", &[Value::text(sku)])?;
            if found.as_ref().is_some_and(other) {
                return Err(ServiceError::Conflict(format!("part SKU '{}' already exists", sku)));
            }
        }
        Ok(())
    }

    // ── Stock adjustments ───────────────────────────────────────────

    /// Submit a physical count for Purchasing to confirm. The part is
    /// locked until the count is decided.
    pub fn request_adjustment(
        &self,
        claims: &Claims,
        part_id: &str,
        input: AdjustmentInput,
    ) -> Result<StockAdjustment, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let reason = required("reason", &input.reason)?;
        if input.quantity_actual < 0 {
            return Err(ServiceError::Validation("quantity_actual cannot be negative".into()));
        }

        let _guard = self.write_guard()?;
        let mut part: SparePart = self.sql.load(part_id)?;
        let pending = self.sql.count::<StockAdjustment>(
            "WHERE part_id = ?1 AND status = ?2",
            &[Value::text(&part.id), Value::text(AdjustmentStatus::Pending.as_str())],
        )?;
        if pending > 0 {
            return Err(ServiceError::Conflict(format!(
                "'{}' already has an adjustment pending",
                part.part_name
            )));
        }

        let now = now_rfc3339();
        let adjustment = StockAdjustment {
            id: new_id(),
            part_id: part.id.clone(),
            part_name: part.part_name.clone(),
            requested_by: claims.sub.clone(),
            managed_by: None,
            quantity_in_system: part.quantity_in_stock,
            quantity_actual: input.quantity_actual,
            reason,
            rejection_reason: None,
            status: AdjustmentStatus::Pending,
            created_at: now.clone(),
            managed_at: None,
        };
        part.status = PartStatus::PendingAdjustment;
        part.updated_at = now;
        self.sql
            .exec_batch(&[record::insert(&adjustment)?, record::update(&part)?])?;
        info!(
            part = %part.part_name,
            system = adjustment.quantity_in_system,
            actual = adjustment.quantity_actual,
            "requested stock adjustment"
        );
        Ok(adjustment)
    }

    pub fn list_adjustments(
        &self,
        claims: &Claims,
        status: Option<AdjustmentStatus>,
    ) -> Result<Vec<AdjustmentView>, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Purchasing])?;
        let adjustments: Vec<StockAdjustment> = match status {
            Some(s) => self.sql.select(
                "WHERE status = ?1 ORDER BY created_at DESC",
                &[Value::text(s.as_str())],
            )?,
            None => self.sql.select("ORDER BY created_at DESC", &[])?,
        };
        Ok(adjustments.into_iter().map(AdjustmentView::from).collect())
    }

    pub fn decide_adjustment(
        &self,
        claims: &Claims,
        id: &str,
        decision: Decision,
        rejection_reason: Option<String>,
    ) -> Result<AdjustmentView, ServiceError> {
        claims.require(Role::Purchasing)?;
        let rejection_reason = optional(rejection_reason);
        if decision == Decision::Reject && rejection_reason.is_none() {
            return Err(ServiceError::Validation("rejection reason is required".into()));
        }

        let _guard = self.write_guard()?;
        let mut adjustment: StockAdjustment = self.sql.load(id)?;
        if adjustment.status != AdjustmentStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "adjustment is already {}",
                adjustment.status
            )));
        }
        let mut part: SparePart = self.sql.load(&adjustment.part_id)?;
        let now = now_rfc3339();
        match decision {
            Decision::Approve => {
                adjustment.status = AdjustmentStatus::Approved;
                part.quantity_in_stock = adjustment.quantity_actual;
            }
            Decision::Reject => {
                adjustment.status = AdjustmentStatus::Rejected;
                adjustment.rejection_reason = rejection_reason;
            }
        }
        part.status = PartStatus::for_quantity(part.quantity_in_stock);
        part.updated_at = now.clone();
        adjustment.managed_by = Some(claims.sub.clone());
        adjustment.managed_at = Some(now);
        self.sql
            .exec_batch(&[record::update(&adjustment)?, record::update(&part)?])?;
        info!(
            part = %part.part_name,
            status = %adjustment.status,
            stock = part.quantity_in_stock,
            "decided stock adjustment"
        );
        Ok(adjustment.into())
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Typeahead over part name and part SKU, best stocked first.
    pub fn inventory_search(&self, q: &str) -> Result<Vec<PartSearchHit>, ServiceError> {
        let q = q.trim();
        if q.is_empty() {
            return Ok(vec![]);
        }
        let parts: Vec<SparePart> = self.sql.select(
            "WHERE part_key LIKE ?1 ESCAPE '\\' OR lower(part_sku) LIKE ?1 ESCAPE '\\' \
             ORDER BY quantity DESC, part_key LIMIT ?2",
            &[Value::Text(contains_pattern(q)), Value::Integer(SEARCH_LIMIT)],
        )?;
        let dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        Ok(parts
            .into_iter()
            .map(|p| PartSearchHit {
                name: p.part_name,
                stock: p.quantity_in_stock,
                location: dash(p.location),
                sku_part: dash(p.part_sku),
                supplier: dash(p.primary_supplier),
            })
            .collect())
    }

    /// Where a part went: requests that drew on it, newest first.
    pub fn part_usage_history(&self, claims: &Claims, part_name: &str) -> Result<Vec<PartUsage>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let usage: Vec<&str> = RequestStatus::USAGE.iter().map(|s| s.as_str()).collect();
        let (cond, mut args) = in_clause("status", &usage, 2);
        args.insert(0, Value::Text(part_key(part_name)));
        let requests: Vec<SparePartRequest> = self.sql.select(
            &format!("WHERE part_key = ?1 AND {} ORDER BY created_at DESC", cond),
            &args,
        )?;
        requests
            .into_iter()
            .map(|request| {
                let sku: Sku = self.get_sku(&request.sku_id)?;
                Ok(PartUsage {
                    technician: sku
                        .assigned_technician
                        .as_deref()
                        .map(|t| self.users.display_name(t)),
                    sku_code: sku.sku_code,
                    sku_name: sku.name,
                    request,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{as_user, fixture, stocked_part};

    fn input(name: &str, sku: Option<&str>) -> PartInput {
        PartInput {
            part_name: name.into(),
            part_sku: sku.map(str::to_string),
            location: Some("Lemari B".into()),
            ..Default::default()
        }
    }

    #[test]
    fn new_parts_start_empty_and_names_are_unique() {
        let svc = fixture();
        let part = svc.add_part(&as_user("wm1"), input("Drain Pump", Some("DP-1"))).unwrap();
        assert_eq!(part.quantity_in_stock, 0);
        assert_eq!(part.status, PartStatus::OutOfStock);
        assert_eq!(part.origin, PartOrigin::Manual);

        let err = svc.add_part(&as_user("pur1"), input("drain pump", None)).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let err = svc.add_part(&as_user("pur1"), input("Other", Some("DP-1"))).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(matches!(
            svc.add_part(&as_user("tech1"), input("Other", None)),
            Err(ServiceError::PermissionDenied(_))
        ));

        let list = svc.list_inventory(&as_user("wm1")).unwrap();
        assert_eq!(list.manual.len(), 1);
        assert!(list.returned.is_empty());
    }

    #[test]
    fn adjustment_locks_part_until_decided() {
        let svc = fixture();
        let part = stocked_part(&svc, "Capacitor", None, 10);
        assert_eq!(part.status, PartStatus::Ready);

        let adj = svc
            .request_adjustment(
                &as_user("wm1"),
                &part.id,
                AdjustmentInput {
                    quantity_actual: 7,
                    reason: "recount".into(),
                },
            )
            .unwrap();
        assert_eq!(adj.quantity_in_system, 10);
        assert_eq!(
            svc.get_part(&as_user("wm1"), &part.id).unwrap().status,
            PartStatus::PendingAdjustment
        );

        let dup = svc.request_adjustment(
            &as_user("wm1"),
            &part.id,
            AdjustmentInput {
                quantity_actual: 8,
                reason: "again".into(),
            },
        );
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        let err = svc
            .edit_part(
                &as_user("wm1"),
                &part.id,
                PartInput {
                    status: Some(PartStatus::Ready),
                    ..input("Capacitor", None)
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        assert!(matches!(
            svc.decide_adjustment(&as_user("pur1"), &adj.id, Decision::Reject, None),
            Err(ServiceError::Validation(_))
        ));
        let view = svc
            .decide_adjustment(&as_user("pur1"), &adj.id, Decision::Approve, None)
            .unwrap();
        assert_eq!(view.difference, -3);
        let part = svc.get_part(&as_user("wm1"), &part.id).unwrap();
        assert_eq!(part.quantity_in_stock, 7);
        assert_eq!(part.status, PartStatus::Ready);

        assert!(matches!(
            svc.decide_adjustment(&as_user("pur1"), &adj.id, Decision::Approve, None),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn rejected_adjustment_keeps_quantity() {
        let svc = fixture();
        let part = stocked_part(&svc, "Gasket", None, 0);
        let adj = svc
            .request_adjustment(
                &as_user("wm1"),
                &part.id,
                AdjustmentInput {
                    quantity_actual: 4,
                    reason: "found a box".into(),
                },
            )
            .unwrap();
        let view = svc
            .decide_adjustment(&as_user("pur1"), &adj.id, Decision::Reject, Some("no proof".into()))
            .unwrap();
        assert_eq!(view.adjustment.rejection_reason.as_deref(), Some("no proof"));
        let part = svc.get_part(&as_user("pur1"), &part.id).unwrap();
        assert_eq!(part.quantity_in_stock, 0);
        assert_eq!(part.status, PartStatus::OutOfStock);
        assert_eq!(
            svc.list_adjustments(&as_user("wm1"), Some(AdjustmentStatus::Rejected))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn edit_cannot_lock_part() {
        let svc = fixture();
        let part = stocked_part(&svc, "Timer", Some("TM-1"), 1);
        let err = svc
            .edit_part(
                &as_user("wm1"),
                &part.id,
                PartInput {
                    status: Some(PartStatus::PendingAdjustment),
                    ..input("Timer", Some("TM-1"))
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let edited = svc
            .edit_part(
                &as_user("wm1"),
                &part.id,
                PartInput {
                    primary_supplier: Some("PT Sumber".into()),
                    ..input("Timer Switch", Some("TM-1"))
                },
            )
            .unwrap();
        assert_eq!(edited.part_name, "Timer Switch");
        assert_eq!(edited.quantity_in_stock, 1);
    }

    #[test]
    fn search_orders_by_stock() {
        let svc = fixture();
        stocked_part(&svc, "Fan Motor Small", None, 2);
        stocked_part(&svc, "Fan Motor Big", Some("FM-B"), 9);
        stocked_part(&svc, "Belt", None, 50);

        assert!(svc.inventory_search("  ").unwrap().is_empty());
        let hits = svc.inventory_search("fan").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Fan Motor Big");
        assert_eq!(hits[0].sku_part, "FM-B");
        assert_eq!(hits[1].sku_part, "-");
        assert_eq!(hits[1].supplier, "-");

        assert_eq!(svc.inventory_search("fm-b").unwrap().len(), 1);
    }
}
