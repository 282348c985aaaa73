//! Startup: config checks, storage, role groups and module wiring.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use auth::service::AuthConfig;
use auth::AuthModule;
use invctl_blob::{BlobStore, FileStore};
use invctl_core::{ServiceConfig, UserDirectory};
use invctl_sql::{SQLStore, SqliteStore};
use sales::SalesModule;
use stock::StockModule;

use crate::config::ServerConfig;

/// Refuse to start on a half-written config.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.root.password_hash.is_empty() {
        anyhow::bail!(
            "No root password hash found in configuration.\n\
             Generate one with an argon2id tool and set [root] password_hash."
        );
    }
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    Ok(())
}

/// Everything the router needs.
pub struct Services {
    pub auth: AuthModule,
    pub stock: StockModule,
    pub sales: SalesModule,
    pub blob: Arc<dyn BlobStore>,
}

/// Open storage under `data_dir`, seed the role groups and build the modules.
pub fn open_services(config: &ServerConfig) -> anyhow::Result<Services> {
    let data_dir = PathBuf::from(&config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let core_config = ServiceConfig {
        data_dir: Some(data_dir),
        ..Default::default()
    };

    let sql: Arc<dyn SQLStore> = Arc::new(
        SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let blob: Arc<dyn BlobStore> = Arc::new(
        FileStore::open(&core_config.resolve_blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    let auth = AuthModule::new(
        Arc::clone(&sql),
        AuthConfig {
            jwt_secret: config.jwt.secret.clone(),
            access_token_ttl: config.jwt.expire_secs,
            root_password_hash: Some(config.root.password_hash.clone()),
        },
    )?;
    let created = auth
        .service()
        .ensure_role_groups()
        .map_err(|e| anyhow::anyhow!("failed to seed role groups: {}", e))?;
    if created > 0 {
        info!(created, "seeded role groups");
    }
    info!("Auth module initialized");

    let users: Arc<dyn UserDirectory> = auth.service().clone();
    let stock = StockModule::new(Arc::clone(&sql), Arc::clone(&blob), users)?;
    info!("Stock module initialized");

    let sales = SalesModule::new(stock.service().clone())?;
    info!("Sales module initialized");

    Ok(Services {
        auth,
        stock,
        sales,
        blob,
    })
}
