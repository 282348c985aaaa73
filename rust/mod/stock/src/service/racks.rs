use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use invctl_core::{new_id, now_rfc3339, optional, required, Claims, Role, ServiceError};
use invctl_sql::{RecordStore, Value};

use crate::model::{Rack, Sku, SkuStatus};
use crate::service::StockService;

#[derive(Debug, Clone, Deserialize)]
pub struct RackInput {
    pub code: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub capacity: i64,
}

/// A rack with the units on it.
#[derive(Debug, Clone, Serialize)]
pub struct RackSlots {
    pub rack: Rack,
    pub occupants: Vec<Sku>,
    pub free_slots: i64,
}

/// Racks of one zone, in code order.
#[derive(Debug, Clone, Serialize)]
pub struct RackZone {
    pub zone: String,
    pub racks: Vec<RackSlots>,
}

const NO_ZONE: &str = "Unzoned";

impl StockService {
    pub fn list_racks(&self, claims: &Claims) -> Result<Vec<Rack>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        Ok(self.sql.select("ORDER BY code", &[])?)
    }

    pub fn create_rack(&self, claims: &Claims, input: RackInput) -> Result<Rack, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let code = required("code", &input.code)?;
        check_capacity(input.capacity)?;

        let _guard = self.write_guard()?;
        self.check_rack_code(None, &code)?;
        let now = now_rfc3339();
        let rack = Rack {
            id: new_id(),
            code,
            zone: optional(input.zone),
            description: optional(input.description),
            capacity: input.capacity,
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&rack)?;
        info!(rack = %rack.code, capacity = rack.capacity, "created rack");
        Ok(rack)
    }

    pub fn update_rack(&self, claims: &Claims, id: &str, input: RackInput) -> Result<Rack, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let code = required("code", &input.code)?;
        check_capacity(input.capacity)?;

        let _guard = self.write_guard()?;
        let mut rack: Rack = self.sql.load(id)?;
        self.check_rack_code(Some(&rack.id), &code)?;
        let occupied = self.rack_occupancy(&rack.id)? as i64;
        if input.capacity < occupied {
            return Err(ServiceError::Validation(format!(
                "rack '{}' holds {} units; capacity cannot be {}",
                rack.code, occupied, input.capacity
            )));
        }
        rack.code = code;
        rack.zone = optional(input.zone);
        rack.description = optional(input.description);
        rack.capacity = input.capacity;
        rack.updated_at = now_rfc3339();
        self.sql.save(&rack)?;
        Ok(rack)
    }

    pub fn delete_rack(&self, claims: &Claims, id: &str) -> Result<(), ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let rack: Rack = self.sql.load(id)?;
        if self.rack_occupancy(&rack.id)? > 0 {
            return Err(ServiceError::Conflict(format!("rack '{}' is not empty", rack.code)));
        }
        self.sql.remove::<Rack>(&rack.id)?;
        info!(rack = %rack.code, "deleted rack");
        Ok(())
    }

    fn check_rack_code(&self, id: Option<&str>, code: &str) -> Result<(), ServiceError> {
        let found: Option<Rack> = self.sql.select_one("WHERE code = ?1", &[Value::text(code)])?;
        match found {
            Some(r) if Some(r.id.as_str()) != id => {
                Err(ServiceError::Conflict(format!("rack '{}' already exists", code)))
            }
            _ => Ok(()),
        }
    }

    fn rack_occupancy(&self, rack_id: &str) -> Result<usize, ServiceError> {
        Ok(self
            .sql
            .count::<Sku>("WHERE rack_id = ?1", &[Value::text(rack_id)])?)
    }

    /// The warehouse floor: every rack grouped by zone, with its units.
    pub fn rack_grid(&self, claims: &Claims) -> Result<Vec<RackZone>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let racks: Vec<Rack> = self.sql.select("ORDER BY code", &[])?;
        let mut zones: BTreeMap<String, Vec<RackSlots>> = BTreeMap::new();
        for rack in racks {
            let occupants: Vec<Sku> = self.sql.select(
                "WHERE rack_id = ?1 ORDER BY created_at",
                &[Value::text(&rack.id)],
            )?;
            let zone = rack.zone.clone().unwrap_or_else(|| NO_ZONE.to_string());
            zones.entry(zone).or_default().push(RackSlots {
                free_slots: (rack.capacity - occupants.len() as i64).max(0),
                occupants,
                rack,
            });
        }
        Ok(zones
            .into_iter()
            .map(|(zone, racks)| RackZone { zone, racks })
            .collect())
    }

    /// READY units not yet on a rack.
    pub fn list_unshelved(&self, claims: &Claims) -> Result<Vec<Sku>, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        Ok(self.sql.select(
            "WHERE status = ?1 AND rack_id IS NULL ORDER BY created_at",
            &[Value::text(SkuStatus::Ready.as_str())],
        )?)
    }

    /// Put a READY unit on a rack with a free slot. Moving an already
    /// shelved unit to another rack is allowed.
    pub fn assign_shelf(&self, claims: &Claims, sku_id: &str, rack_id: &str) -> Result<Sku, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut sku = self.get_sku(sku_id)?;
        if sku.status != SkuStatus::Ready {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' is {}, only READY units can be shelved",
                sku.sku_code, sku.status
            )));
        }
        let rack: Rack = self.sql.load(rack_id)?;
        if sku.rack_id.as_deref() == Some(rack.id.as_str()) {
            return Ok(sku);
        }
        if self.rack_occupancy(&rack.id)? as i64 >= rack.capacity {
            return Err(ServiceError::InvalidState(format!("rack '{}' is full", rack.code)));
        }
        let now = now_rfc3339();
        sku.rack_id = Some(rack.id.clone());
        sku.shelf_location = Some(rack.code.clone());
        sku.shelved_at = Some(now.clone());
        sku.updated_at = now;
        self.sql.save(&sku)?;
        info!(sku = %sku.sku_code, rack = %rack.code, "shelved unit");
        Ok(sku)
    }
}

fn check_capacity(capacity: i64) -> Result<(), ServiceError> {
    if capacity < 1 {
        return Err(ServiceError::Validation("capacity must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::{as_user, fixture, ready_sku, received_sku};

    fn rack(code: &str, zone: Option<&str>, capacity: i64) -> RackInput {
        RackInput {
            code: code.into(),
            zone: zone.map(str::to_string),
            description: None,
            capacity,
        }
    }

    #[test]
    fn rack_codes_are_unique() {
        let svc = fixture();
        let wm = as_user("wm1");
        svc.create_rack(&wm, rack("A-01", Some("A"), 2)).unwrap();
        assert!(matches!(
            svc.create_rack(&wm, rack("A-01", None, 2)),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.create_rack(&wm, rack("A-02", None, 0)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_rack(&as_user("tech1"), rack("A-03", None, 1)),
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[test]
    fn shelving_respects_capacity_and_status() {
        let svc = fixture();
        let wm = as_user("wm1");
        let r = svc.create_rack(&wm, rack("B-01", Some("B"), 1)).unwrap();
        let other = svc.create_rack(&wm, rack("B-02", Some("B"), 3)).unwrap();

        let in_qc = received_sku(&svc, "MC-0");
        assert!(matches!(
            svc.assign_shelf(&wm, &in_qc.id, &r.id),
            Err(ServiceError::InvalidState(_))
        ));

        let a = ready_sku(&svc, "MC-1");
        let b = ready_sku(&svc, "MC-2");
        assert_eq!(svc.list_unshelved(&wm).unwrap().len(), 2);

        let shelved = svc.assign_shelf(&wm, &a.id, &r.id).unwrap();
        assert_eq!(shelved.shelf_location.as_deref(), Some("B-01"));
        assert!(shelved.shelved_at.is_some());
        assert!(matches!(
            svc.assign_shelf(&wm, &b.id, &r.id),
            Err(ServiceError::InvalidState(_))
        ));
        svc.assign_shelf(&wm, &b.id, &other.id).unwrap();

        assert!(matches!(svc.delete_rack(&wm, &r.id), Err(ServiceError::Conflict(_))));
        assert!(matches!(
            svc.update_rack(&wm, &other.id, rack("B-02", Some("B"), 0)),
            Err(ServiceError::Validation(_))
        ));

        let grid = svc.rack_grid(&wm).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].zone, "B");
        assert_eq!(grid[0].racks[0].free_slots, 0);
        assert_eq!(grid[0].racks[1].free_slots, 2);
        assert_eq!(grid[0].racks[1].occupants[0].sku_code, "MC-2");
    }

    #[test]
    fn empty_rack_can_be_deleted() {
        let svc = fixture();
        let wm = as_user("wm1");
        let r = svc.create_rack(&wm, rack("C-01", None, 4)).unwrap();
        svc.delete_rack(&wm, &r.id).unwrap();
        assert!(svc.list_racks(&wm).unwrap().is_empty());
        assert!(matches!(svc.delete_rack(&wm, &r.id), Err(ServiceError::NotFound(_))));
    }
}
