//! Catalog variants and the registry that resolves a [`CatalogRef`] to its
//! authoritative row.
//!
//! `products` and `electronics` live in parallel tables with no shared base.
//! Instead of branching on the raw `source` string, every lookup goes
//! through [`CatalogRegistry`], which maps each [`CatalogSource`] to the
//! [`CatalogProvider`] that knows how to query its table.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
    sync::Arc,
};

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DeriveActiveEnum, EntityTrait, EnumIter, FromQueryResult,
    QueryFilter, QuerySelect, QueryTrait, sea_query::SelectStatement,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{electronics, products},
    error::{AppError, AppResult},
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[sea_orm(string_value = "products")]
    Products,
    #[sea_orm(string_value = "electronics")]
    Electronics,
}

impl CatalogSource {
    pub const ALL: [CatalogSource; 2] = [CatalogSource::Products, CatalogSource::Electronics];

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogSource::Products => "products",
            CatalogSource::Electronics => "electronics",
        }
    }

    /// Table backing this variant. Only ever one of a fixed set of literals.
    pub fn table_name(self) -> &'static str {
        self.as_str()
    }

    pub fn item(self, id: Uuid) -> CatalogRef {
        CatalogRef::new(self, id)
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown catalog source `{0}`")]
pub struct UnknownCatalogSource(pub String);

impl FromStr for CatalogSource {
    type Err = UnknownCatalogSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "products" => Ok(CatalogSource::Products),
            "electronics" => Ok(CatalogSource::Electronics),
            other => Err(UnknownCatalogSource(other.to_string())),
        }
    }
}

/// Reference to one catalog row, tagged with the variant it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "productId", rename_all = "lowercase")]
pub enum CatalogRef {
    Products(Uuid),
    Electronics(Uuid),
}

impl CatalogRef {
    pub fn new(source: CatalogSource, id: Uuid) -> Self {
        match source {
            CatalogSource::Products => CatalogRef::Products(id),
            CatalogSource::Electronics => CatalogRef::Electronics(id),
        }
    }

    pub fn source(&self) -> CatalogSource {
        match self {
            CatalogRef::Products(_) => CatalogSource::Products,
            CatalogRef::Electronics(_) => CatalogSource::Electronics,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            CatalogRef::Products(id) | CatalogRef::Electronics(id) => *id,
        }
    }
}

impl fmt::Display for CatalogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source(), self.id())
    }
}

/// The fields an order needs from a catalog row.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct CatalogSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

pub trait CatalogProvider: Send + Sync {
    fn source(&self) -> CatalogSource;

    /// `SELECT id, name, price` for the given ids.
    fn select_snapshots(&self, ids: &[Uuid]) -> SelectStatement;
}

pub struct ProductCatalog;

impl CatalogProvider for ProductCatalog {
    fn source(&self) -> CatalogSource {
        CatalogSource::Products
    }

    fn select_snapshots(&self, ids: &[Uuid]) -> SelectStatement {
        products::Entity::find()
            .select_only()
            .columns([
                products::Column::Id,
                products::Column::Name,
                products::Column::Price,
            ])
            .filter(products::Column::Id.is_in(ids.to_vec()))
            .into_query()
    }
}

pub struct ElectronicsCatalog;

impl CatalogProvider for ElectronicsCatalog {
    fn source(&self) -> CatalogSource {
        CatalogSource::Electronics
    }

    fn select_snapshots(&self, ids: &[Uuid]) -> SelectStatement {
        electronics::Entity::find()
            .select_only()
            .columns([
                electronics::Column::Id,
                electronics::Column::Name,
                electronics::Column::Price,
            ])
            .filter(electronics::Column::Id.is_in(ids.to_vec()))
            .into_query()
    }
}

/// Upper bound on ids bound into one lookup query.
pub const SNAPSHOT_BATCH: usize = 1000;

#[derive(Clone)]
pub struct CatalogRegistry {
    providers: HashMap<CatalogSource, Arc<dyn CatalogProvider>>,
}

impl CatalogRegistry {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one for the same source.
    pub fn register<P>(&mut self, provider: P) -> &mut Self
    where
        P: CatalogProvider + 'static,
    {
        self.providers.insert(provider.source(), Arc::new(provider));
        self
    }

    pub fn provider(&self, source: CatalogSource) -> AppResult<&dyn CatalogProvider> {
        self.providers
            .get(&source)
            .map(|p| p.as_ref())
            .ok_or_else(|| AppError::BadRequest(format!("no catalog registered for {source}")))
    }

    /// Load snapshots for a batch of ids from one catalog variant, at most
    /// [`SNAPSHOT_BATCH`] ids per query.
    pub async fn snapshots<C>(
        &self,
        db: &C,
        source: CatalogSource,
        ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, CatalogSnapshot>>
    where
        C: ConnectionTrait,
    {
        let provider = self.provider(source)?;
        let backend = db.get_database_backend();

        let mut found = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(SNAPSHOT_BATCH) {
            let stmt = provider.select_snapshots(chunk);
            for row in db.query_all(backend.build(&stmt)).await? {
                let snapshot = CatalogSnapshot::from_query_result(&row, "")?;
                found.insert(snapshot.id, snapshot);
            }
        }
        Ok(found)
    }

    /// Resolve a mixed set of references, grouping ids by source.
    /// References with no matching row are absent from the result.
    pub async fn resolve<C, I>(&self, db: &C, items: I) -> AppResult<HashMap<CatalogRef, CatalogSnapshot>>
    where
        C: ConnectionTrait,
        I: IntoIterator<Item = CatalogRef>,
    {
        let mut by_source: HashMap<CatalogSource, HashSet<Uuid>> = HashMap::new();
        for item in items {
            by_source.entry(item.source()).or_default().insert(item.id());
        }

        let mut resolved = HashMap::new();
        for (source, ids) in by_source {
            let ids: Vec<Uuid> = ids.into_iter().collect();
            for (id, snapshot) in self.snapshots(db, source, &ids).await? {
                resolved.insert(CatalogRef::new(source, id), snapshot);
            }
        }
        Ok(resolved)
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ProductCatalog).register(ElectronicsCatalog);
        registry
    }
}
