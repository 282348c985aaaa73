//! Sales module: orders, payments, shipping, quotations and the printed
//! documents that go with them.
//!
//! Sales works on units the stock module has delivered to a store, so it
//! is built on top of [`stock::StockService`] and shares its write guard.

pub mod api;
pub mod model;
pub mod pdf;
pub mod service;

use std::sync::Arc;

use axum::Router;

use invctl_core::{Module, ServiceError};
use stock::StockService;

pub use service::SalesService;

/// Sales module implementing the Module trait.
pub struct SalesModule {
    service: Arc<SalesService>,
}

impl SalesModule {
    pub fn new(stock: Arc<StockService>) -> Result<Self, ServiceError> {
        Ok(Self {
            service: SalesService::new(stock)?,
        })
    }

    pub fn service(&self) -> &Arc<SalesService> {
        &self.service
    }
}

impl Module for SalesModule {
    fn name(&self) -> &str {
        "sales"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
