use invctl_core::ServiceError;
use invctl_sql::SQLStore;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sales_orders (
        id TEXT PRIMARY KEY,
        sku_id TEXT NOT NULL,
        sales_person TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_sku ON sales_orders(sku_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_person ON sales_orders(sales_person)",
    "CREATE TABLE IF NOT EXISTS payments (
        id TEXT PRIMARY KEY,
        order_id TEXT NOT NULL,
        amount INTEGER NOT NULL,
        data TEXT NOT NULL,
        payment_date TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_payments_order ON payments(order_id)",
    "CREATE TABLE IF NOT EXISTS quotations (
        id TEXT PRIMARY KEY,
        quotation_number TEXT NOT NULL UNIQUE,
        sku_id TEXT NOT NULL,
        sales_person TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
];

/// Create the sales tables if they don't exist.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])?;
    }
    Ok(())
}
