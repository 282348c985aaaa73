//! Stock module: everything that happens to a unit between the purchase
//! order and the store floor.
//!
//! # Resources
//!
//! - **PurchaseOrder** — raised by Purchasing, approved and received by the warehouse
//! - **Sku** — one tracked machine
//! - **QcForm** — QC, installation and final check for one SKU
//! - **SparePartRequest** / **SparePart** / **StockAdjustment** — parts flow and stock
//! - **Rack**, **Store**, **SalesAssignment**, **MovementRequest** — where units live
//!
//! Other modules add their own events to a unit's history through
//! [`service::history::TimelineSource`].

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use invctl_blob::BlobStore;
use invctl_core::{Module, ServiceError, UserDirectory};
use invctl_sql::SQLStore;

pub use service::history::{TimelineEntry, TimelineSource};
pub use service::StockService;

/// Stock module implementing the Module trait.
pub struct StockModule {
    service: Arc<StockService>,
}

impl StockModule {
    pub fn new(
        sql: Arc<dyn SQLStore>,
        blob: Arc<dyn BlobStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, ServiceError> {
        let service = StockService::new(sql, blob, users)?;
        Ok(Self { service })
    }

    pub fn service(&self) -> &Arc<StockService> {
        &self.service
    }
}

impl Module for StockModule {
    fn name(&self) -> &str {
        "stock"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
