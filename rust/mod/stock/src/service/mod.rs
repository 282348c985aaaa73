pub mod dashboard;
pub mod history;
pub mod inventory;
pub mod movement;
pub mod parts;
pub mod purchase;
pub mod qc;
pub mod racks;
pub mod schema;

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use invctl_blob::{store_upload, BlobStore};
use invctl_core::{FilePart, ServiceError, UserDirectory};
use invctl_sql::{RecordStore, SQLStore, Value};

use crate::model::{Sku, SkuStatus};
use crate::service::history::TimelineSource;

/// The stock service: purchasing, receiving, workshop flow, spare parts,
/// racks and transfers to stores.
pub struct StockService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) blob: Arc<dyn BlobStore>,
    pub(crate) users: Arc<dyn UserDirectory>,
    /// Serializes read-modify-write workflows across stock and sales.
    write_lock: Mutex<()>,
    timeline: RwLock<Vec<Arc<dyn TimelineSource>>>,
}

impl StockService {
    /// Create a new StockService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        blob: Arc<dyn BlobStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Arc<Self>, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self {
            sql,
            blob,
            users,
            write_lock: Mutex::new(()),
            timeline: RwLock::new(Vec::new()),
        }))
    }

    pub fn sql(&self) -> &Arc<dyn SQLStore> {
        &self.sql
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    /// Hold this while reading records that a write will depend on.
    pub fn write_guard(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.write_lock
            .lock()
            .map_err(|_| ServiceError::Internal("stock write lock poisoned".into()))
    }

    /// Store an uploaded file and return its blob key.
    pub fn store_file(&self, prefix: &str, file: &FilePart) -> Result<String, ServiceError> {
        Ok(store_upload(self.blob.as_ref(), prefix, &file.file_name, &file.data)?)
    }

    pub fn get_sku(&self, id: &str) -> Result<Sku, ServiceError> {
        Ok(self.sql.load(id)?)
    }

    /// SKUs, optionally filtered by status, newest first.
    pub fn list_skus(&self, status: Option<SkuStatus>) -> Result<Vec<Sku>, ServiceError> {
        Ok(match status {
            Some(s) => self.sql.select(
                "WHERE status = ?1 ORDER BY created_at DESC",
                &[Value::text(s.as_str())],
            )?,
            None => self.sql.select("ORDER BY created_at DESC", &[])?,
        })
    }

    /// Add a contributor to the SKU history timeline.
    pub fn register_timeline(&self, source: Arc<dyn TimelineSource>) {
        if let Ok(mut sources) = self.timeline.write() {
            sources.push(source);
        }
    }

    pub(crate) fn timeline_sources(&self) -> Vec<Arc<dyn TimelineSource>> {
        self.timeline
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

/// `column IN (?n, ?n+1, ...)` for a list of status strings, numbering
/// placeholders from `first`.
pub(crate) fn in_clause(column: &str, values: &[&str], first: usize) -> (String, Vec<Value>) {
    let placeholders: Vec<String> = (0..values.len()).map(|i| format!("?{}", first + i)).collect();
    (
        format!("{} IN ({})", column, placeholders.join(", ")),
        values.iter().map(|v| Value::text(*v)).collect(),
    )
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use invctl_blob::FileStore;
    use invctl_core::{Claims, FilePart, FixedDirectory, Role, ROOT_ROLE_ID};
    use invctl_sql::SqliteStore;

    use super::StockService;
    use crate::model::{Decision, PurchaseOrder, Sku, SparePart};
    use crate::service::inventory::{AdjustmentInput, PartInput};
    use crate::service::purchase::{AddSku, CreatePurchaseOrder};
    use crate::service::qc::QcSubmission;

    pub struct Fixture {
        pub svc: Arc<StockService>,
        _dir: tempfile::TempDir,
    }

    impl std::ops::Deref for Fixture {
        type Target = StockService;
        fn deref(&self) -> &StockService {
            &self.svc
        }
    }

    pub fn directory() -> FixedDirectory {
        FixedDirectory::new()
            .with_user("wm1", "sari", &[Role::WarehouseManager])
            .with_user("tech1", "agus", &[Role::Technician])
            .with_user("tech2", "wawan", &[Role::Technician])
            .with_user("lead1", "dewi", &[Role::LeadTechnician])
            .with_user("pur1", "eko", &[Role::Purchasing])
            .with_user("sales1", "rina", &[Role::Sales])
            .with_user("sales2", "tono", &[Role::Sales])
            .with_user("master1", "bos", &[Role::Master])
    }

    pub fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let blob = Arc::new(FileStore::open(dir.path()).unwrap());
        let svc = StockService::new(sql, blob, Arc::new(directory())).unwrap();
        Fixture { svc, _dir: dir }
    }

    pub fn as_user(id: &str) -> Claims {
        let dir = directory();
        let groups = Role::ALL
            .into_iter()
            .filter(|r| invctl_core::UserDirectory::has_role(&dir, id, *r).unwrap())
            .map(|r| r.group_name().to_string())
            .collect();
        Claims {
            sub: id.to_string(),
            name: invctl_core::UserDirectory::display_name(&dir, id),
            groups,
            roles: vec![],
            sid: "test".into(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    pub fn root() -> Claims {
        Claims {
            sub: "root".into(),
            name: "root".into(),
            groups: vec![],
            roles: vec![ROOT_ROLE_ID.into()],
            sid: "test".into(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    pub fn file(name: &str) -> FilePart {
        FilePart::new(name, name.as_bytes().to_vec())
    }

    /// An approved PO with `expected` units.
    pub fn approved_po(svc: &StockService, number: &str, expected: i64) -> PurchaseOrder {
        let po = svc
            .create_po(
                &as_user("pur1"),
                CreatePurchaseOrder {
                    po_number: number.into(),
                    expected_sku_count: expected,
                    buy_price: 1_000_000,
                },
                None,
            )
            .unwrap();
        svc.approve_po(&as_user("wm1"), &po.id).unwrap()
    }

    /// A SKU received under a fresh PO, in QC with tech1.
    pub fn received_sku(svc: &StockService, code: &str) -> Sku {
        let po = approved_po(svc, &format!("PO-{}", code), 1);
        svc.add_sku(
            &as_user("wm1"),
            &po.id,
            AddSku {
                sku_code: code.into(),
                name: "Mesin Cuci LG".into(),
                technician_id: "tech1".into(),
            },
        )
        .unwrap()
    }

    /// A part line holding `qty` units, stocked through an approved count.
    pub fn stocked_part(svc: &StockService, name: &str, part_sku: Option<&str>, qty: i64) -> SparePart {
        let part = svc
            .add_part(
                &as_user("wm1"),
                PartInput {
                    part_name: name.into(),
                    part_sku: part_sku.map(str::to_string),
                    ..Default::default()
                },
            )
            .unwrap();
        if qty == 0 {
            return part;
        }
        let adj = svc
            .request_adjustment(
                &as_user("wm1"),
                &part.id,
                AdjustmentInput {
                    quantity_actual: qty,
                    reason: "opening stock".into(),
                },
            )
            .unwrap();
        svc.decide_adjustment(&as_user("pur1"), &adj.id, Decision::Approve, None)
            .unwrap();
        svc.get_part(&as_user("wm1"), &part.id).unwrap()
    }

    /// A SKU that passed QC without parts: READY.
    pub fn ready_sku(svc: &StockService, code: &str) -> Sku {
        let sku = received_sku(svc, code);
        let qc = svc
            .submit_qc(
                &as_user("tech1"),
                &sku.id,
                QcSubmission {
                    condition_notes: "all good".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        svc.verify_qc(&as_user("lead1"), &qc.id, Decision::Approve, None)
            .unwrap();
        svc.get_sku(&sku.id).unwrap()
    }
}
