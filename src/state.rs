use std::sync::Arc;

use crate::{
    catalog::CatalogRegistry,
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    storage::{LocalStorage, ObjectStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub catalogs: Arc<CatalogRegistry>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Default wiring: both catalog variants and local-disk image storage.
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let storage = LocalStorage::new(&config.upload_dir, &config.public_base_url);
        Self {
            orm: orm_from_pool(&pool),
            pool,
            catalogs: Arc::new(CatalogRegistry::default()),
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }
}
