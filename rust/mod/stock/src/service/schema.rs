use invctl_core::ServiceError;
use invctl_sql::SQLStore;

const SCHEMA: &[&str] = &[
    // Purchase orders
    "CREATE TABLE IF NOT EXISTS purchase_orders (
        id TEXT PRIMARY KEY,
        po_number TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_po_status ON purchase_orders(status)",
    "CREATE TABLE IF NOT EXISTS purchasing_notifications (
        id TEXT PRIMARY KEY,
        po_id TEXT NOT NULL,
        is_resolved INTEGER NOT NULL DEFAULT 0,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    // Units
    "CREATE TABLE IF NOT EXISTS skus (
        id TEXT PRIMARY KEY,
        sku_code TEXT NOT NULL UNIQUE,
        po_id TEXT NOT NULL,
        status TEXT NOT NULL,
        technician_id TEXT,
        rack_id TEXT,
        store_id TEXT,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_skus_po ON skus(po_id)",
    "CREATE INDEX IF NOT EXISTS idx_skus_status ON skus(status)",
    "CREATE INDEX IF NOT EXISTS idx_skus_technician ON skus(technician_id)",
    "CREATE INDEX IF NOT EXISTS idx_skus_rack ON skus(rack_id)",
    // QC / installation
    "CREATE TABLE IF NOT EXISTS qc_forms (
        id TEXT PRIMARY KEY,
        sku_id TEXT NOT NULL UNIQUE,
        technician_id TEXT NOT NULL,
        is_approved INTEGER NOT NULL DEFAULT 0,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS installation_photos (
        id TEXT PRIMARY KEY,
        qc_id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_photos_qc ON installation_photos(qc_id)",
    "CREATE TABLE IF NOT EXISTS returned_parts (
        id TEXT PRIMARY KEY,
        qc_id TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS technician_analytics (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    // Spare parts
    "CREATE TABLE IF NOT EXISTS spare_part_requests (
        id TEXT PRIMARY KEY,
        qc_id TEXT NOT NULL,
        sku_id TEXT NOT NULL,
        part_key TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_requests_qc ON spare_part_requests(qc_id)",
    "CREATE INDEX IF NOT EXISTS idx_requests_status ON spare_part_requests(status)",
    "CREATE TABLE IF NOT EXISTS spare_parts (
        id TEXT PRIMARY KEY,
        part_key TEXT NOT NULL UNIQUE,
        part_sku TEXT UNIQUE,
        quantity INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        origin TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stock_adjustments (
        id TEXT PRIMARY KEY,
        part_id TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_adjustments_part ON stock_adjustments(part_id)",
    // Locations
    "CREATE TABLE IF NOT EXISTS racks (
        id TEXT PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        zone TEXT,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stores (
        id TEXT PRIMARY KEY,
        name_key TEXT NOT NULL UNIQUE,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sales_assignments (
        id TEXT PRIMARY KEY,
        sales_user_id TEXT NOT NULL UNIQUE,
        store_id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS movements (
        id TEXT PRIMARY KEY,
        sku_id TEXT NOT NULL,
        store_id TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_movements_sku ON movements(sku_id)",
    "CREATE INDEX IF NOT EXISTS idx_movements_store ON movements(store_id)",
];

/// Create the stock tables if they don't exist.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])?;
    }
    Ok(())
}
