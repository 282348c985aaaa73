use serde::{Deserialize, Serialize};
use tracing::info;

use invctl_core::{
    new_id, now_rfc3339, optional, required, Claims, FilePart, Role, ServiceError,
};
use invctl_sql::{record, RecordStore, Value};

use crate::model::{
    MovementRequest, MovementStatus, SalesAssignment, Sku, SkuLocation, SkuStatus, Store,
};
use crate::service::StockService;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreInput {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentInput {
    pub sales_user_id: String,
    pub store_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: SalesAssignment,
    pub sales_username: String,
    pub store_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementView {
    pub movement: MovementRequest,
    pub sku: Sku,
    pub store: Store,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementOverview {
    /// Shelved READY units that can be sent out.
    pub ready: Vec<Sku>,
    pub delivering: Vec<MovementView>,
    pub stores: Vec<Store>,
}

impl StockService {
    // ── Stores (Master Role) ────────────────────────────────────────

    pub fn list_stores(&self, claims: &Claims) -> Result<Vec<Store>, ServiceError> {
        claims.require_any(&[Role::Master, Role::WarehouseManager, Role::Sales])?;
        Ok(self.sql.select("ORDER BY name_key", &[])?)
    }

    pub fn get_store(&self, id: &str) -> Result<Store, ServiceError> {
        Ok(self.sql.load(id)?)
    }

    pub fn create_store(&self, claims: &Claims, input: StoreInput) -> Result<Store, ServiceError> {
        claims.require(Role::Master)?;
        let name = required("name", &input.name)?;
        let _guard = self.write_guard()?;
        self.check_store_name(None, &name)?;
        let now = now_rfc3339();
        let store = Store {
            id: new_id(),
            name,
            address: optional(input.address),
            phone: optional(input.phone),
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&store)?;
        info!(store = %store.name, "created store");
        Ok(store)
    }

    pub fn update_store(&self, claims: &Claims, id: &str, input: StoreInput) -> Result<Store, ServiceError> {
        claims.require(Role::Master)?;
        let name = required("name", &input.name)?;
        let _guard = self.write_guard()?;
        let mut store: Store = self.sql.load(id)?;
        self.check_store_name(Some(&store.id), &name)?;
        store.name = name;
        store.address = optional(input.address);
        store.phone = optional(input.phone);
        store.updated_at = now_rfc3339();
        self.sql.save(&store)?;
        Ok(store)
    }

    /// Stores with units, transfers or staff attached cannot be removed.
    pub fn delete_store(&self, claims: &Claims, id: &str) -> Result<(), ServiceError> {
        claims.require(Role::Master)?;
        let _guard = self.write_guard()?;
        let store: Store = self.sql.load(id)?;
        let args = [Value::text(&store.id)];
        let referenced = self.sql.count::<Sku>("WHERE store_id = ?1", &args)?
            + self.sql.count::<MovementRequest>("WHERE store_id = ?1", &args)?
            + self.sql.count::<SalesAssignment>("WHERE store_id = ?1", &args)?;
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!("store '{}' is in use", store.name)));
        }
        self.sql.remove::<Store>(&store.id)?;
        info!(store = %store.name, "deleted store");
        Ok(())
    }

    fn check_store_name(&self, id: Option<&str>, name: &str) -> Result<(), ServiceError> {
        let found: Option<Store> = self
            .sql
            .select_one("WHERE name_key = ?1", &[Value::Text(name.to_lowercase())])?;
        match found {
            Some(s) if Some(s.id.as_str()) != id => {
                Err(ServiceError::Conflict(format!("store '{}' already exists", name)))
            }
            _ => Ok(()),
        }
    }

    // ── Sales assignments (Master Role) ─────────────────────────────

    pub fn list_assignments(&self, claims: &Claims) -> Result<Vec<AssignmentView>, ServiceError> {
        claims.require(Role::Master)?;
        let assignments: Vec<SalesAssignment> = self.sql.select("ORDER BY created_at", &[])?;
        assignments
            .into_iter()
            .map(|assignment| {
                let store = self.get_store(&assignment.store_id)?;
                Ok(AssignmentView {
                    sales_username: self.users.display_name(&assignment.sales_user_id),
                    store_name: store.name,
                    assignment,
                })
            })
            .collect()
    }

    pub fn create_assignment(
        &self,
        claims: &Claims,
        input: AssignmentInput,
    ) -> Result<SalesAssignment, ServiceError> {
        claims.require(Role::Master)?;
        let _guard = self.write_guard()?;
        let (user_id, store_id) = self.check_assignment(None, input)?;
        let now = now_rfc3339();
        let assignment = SalesAssignment {
            id: new_id(),
            sales_user_id: user_id,
            store_id,
            created_at: now.clone(),
            updated_at: now,
        };
        self.sql.create(&assignment)?;
        info!(user = %assignment.sales_user_id, store = %assignment.store_id, "assigned sales user");
        Ok(assignment)
    }

    pub fn update_assignment(
        &self,
        claims: &Claims,
        id: &str,
        input: AssignmentInput,
    ) -> Result<SalesAssignment, ServiceError> {
        claims.require(Role::Master)?;
        let _guard = self.write_guard()?;
        let mut assignment: SalesAssignment = self.sql.load(id)?;
        let (user_id, store_id) = self.check_assignment(Some(&assignment.id), input)?;
        assignment.sales_user_id = user_id;
        assignment.store_id = store_id;
        assignment.updated_at = now_rfc3339();
        self.sql.save(&assignment)?;
        Ok(assignment)
    }

    pub fn delete_assignment(&self, claims: &Claims, id: &str) -> Result<(), ServiceError> {
        claims.require(Role::Master)?;
        self.sql.remove::<SalesAssignment>(id)?;
        Ok(())
    }

    fn check_assignment(
        &self,
        id: Option<&str>,
        input: AssignmentInput,
    ) -> Result<(String, String), ServiceError> {
        let user_id = required("sales_user_id", &input.sales_user_id)?;
        let store_id = required("store_id", &input.store_id)?;
        if !self.users.has_role(&user_id, Role::Sales)? {
            return Err(ServiceError::Validation(format!(
                "user '{}' is not in the Sales group",
                user_id
            )));
        }
        self.get_store(&store_id)?;
        if let Some(existing) = self.assignment_for(&user_id)? {
            if Some(existing.id.as_str()) != id {
                return Err(ServiceError::Conflict(format!(
                    "user '{}' is already assigned to a store",
                    self.users.display_name(&user_id)
                )));
            }
        }
        Ok((user_id, store_id))
    }

    /// The store a sales user works at.
    pub fn assignment_for(&self, user_id: &str) -> Result<Option<SalesAssignment>, ServiceError> {
        Ok(self
            .sql
            .select_one("WHERE sales_user_id = ?1", &[Value::text(user_id)])?)
    }

    // ── Movement to stores ──────────────────────────────────────────

    fn movement_view(&self, movement: MovementRequest) -> Result<MovementView, ServiceError> {
        Ok(MovementView {
            sku: self.get_sku(&movement.sku_id)?,
            store: self.get_store(&movement.store_id)?,
            movement,
        })
    }

    pub fn movement_overview(&self, claims: &Claims) -> Result<MovementOverview, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let ready = self.sql.select(
            "WHERE status = ?1 AND rack_id IS NOT NULL ORDER BY created_at",
            &[Value::text(SkuStatus::Ready.as_str())],
        )?;
        let delivering: Vec<MovementRequest> = self.sql.select(
            "WHERE status = ?1 ORDER BY created_at DESC",
            &[Value::text(MovementStatus::Delivering.as_str())],
        )?;
        Ok(MovementOverview {
            ready,
            delivering: delivering
                .into_iter()
                .map(|m| self.movement_view(m))
                .collect::<Result<_, _>>()?,
            stores: self.sql.select("ORDER BY name_key", &[])?,
        })
    }

    /// Send a shelved READY unit to a store. The unit leaves its rack.
    pub fn create_movement(
        &self,
        claims: &Claims,
        sku_id: &str,
        store_id: &str,
        delivery_form: Option<FilePart>,
    ) -> Result<MovementRequest, ServiceError> {
        claims.require(Role::WarehouseManager)?;
        let _guard = self.write_guard()?;
        let mut sku = self.get_sku(sku_id)?;
        if sku.status != SkuStatus::Ready || sku.rack_id.is_none() {
            return Err(ServiceError::InvalidState(format!(
                "SKU '{}' must be READY and shelved to move",
                sku.sku_code
            )));
        }
        let store = self.get_store(store_id)?;
        let delivery_form = match delivery_form {
            Some(f) => Some(self.store_file(&format!("movement/{}", sku.sku_code), &f)?),
            None => None,
        };

        let now = now_rfc3339();
        let movement = MovementRequest {
            id: new_id(),
            sku_id: sku.id.clone(),
            store_id: store.id.clone(),
            requested_by: claims.sub.clone(),
            delivery_form,
            receipt_form: None,
            status: MovementStatus::Delivering,
            created_at: now.clone(),
            received_by: None,
            received_at: None,
        };
        sku.status = SkuStatus::Delivering;
        sku.rack_id = None;
        sku.updated_at = now;
        self.sql
            .exec_batch(&[record::insert(&movement)?, record::update(&sku)?])?;
        info!(sku = %sku.sku_code, store = %store.name, "sent unit to store");
        Ok(movement)
    }

    /// Confirm a unit arrived at the store. Allowed for warehouse managers
    /// and for sales staff assigned to the destination store.
    pub fn confirm_received(
        &self,
        claims: &Claims,
        movement_id: &str,
        receipt: Option<FilePart>,
    ) -> Result<MovementRequest, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Sales])?;
        let receipt = receipt
            .ok_or_else(|| ServiceError::Validation("receipt form is required".into()))?;

        let _guard = self.write_guard()?;
        let mut movement: MovementRequest = self.sql.load(movement_id)?;
        if !claims.is_root() && !claims.in_group(Role::WarehouseManager) {
            let at_store = self
                .assignment_for(&claims.sub)?
                .is_some_and(|a| a.store_id == movement.store_id);
            if !at_store {
                return Err(ServiceError::PermissionDenied(
                    "you are not assigned to the destination store".into(),
                ));
            }
        }
        if movement.status != MovementStatus::Delivering {
            return Err(ServiceError::InvalidState("movement was already received".into()));
        }

        let mut sku = self.get_sku(&movement.sku_id)?;
        let now = now_rfc3339();
        movement.receipt_form = Some(self.store_file(&format!("movement/{}", sku.sku_code), &receipt)?);
        movement.status = MovementStatus::Received;
        movement.received_by = Some(claims.sub.clone());
        movement.received_at = Some(now.clone());
        sku.status = SkuStatus::Shop;
        sku.location = SkuLocation::Shop;
        sku.store_id = Some(movement.store_id.clone());
        sku.updated_at = now;
        self.sql
            .exec_batch(&[record::update(&movement)?, record::update(&sku)?])?;
        info!(sku = %sku.sku_code, by = %claims.name, "unit received at store");
        Ok(movement)
    }

    /// Transfers on their way. Sales staff only see their own store's.
    pub fn incoming_movements(&self, claims: &Claims) -> Result<Vec<MovementView>, ServiceError> {
        claims.require_any(&[Role::WarehouseManager, Role::Sales])?;
        let delivering = Value::text(MovementStatus::Delivering.as_str());
        let movements: Vec<MovementRequest> =
            if claims.is_root() || claims.in_group(Role::WarehouseManager) {
                self.sql
                    .select("WHERE status = ?1 ORDER BY created_at DESC", &[delivering])?
            } else {
                match self.assignment_for(&claims.sub)? {
                    Some(a) => self.sql.select(
                        "WHERE status = ?1 AND store_id = ?2 ORDER BY created_at DESC",
                        &[delivering, Value::text(&a.store_id)],
                    )?,
                    None => vec![],
                }
            };
        movements.into_iter().map(|m| self.movement_view(m)).collect()
    }
}
