use async_trait::async_trait;

pub mod connection;
pub mod error;
pub mod models;
pub mod repository;
#[cfg(any(test, feature = "testing"))]
pub mod schema;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use repository::*;

/// Data access seam used by the HTTP layer.
///
/// Every call is independent: implementations must verify connectivity
/// before touching the database and report failures to the caller without
/// retrying.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a catalog and returns its database-assigned id. The `id` of
    /// the argument is ignored.
    async fn create(&self, catalog: &Catalog) -> CatalogResult<i64>;

    async fn read_all(&self) -> CatalogResult<Vec<Catalog>>;

    async fn find(&self, id: i64) -> CatalogResult<Option<Catalog>>;

    /// Overwrites the row identified by `catalog.id`, returning the number
    /// of affected rows.
    async fn update(&self, catalog: &Catalog) -> CatalogResult<u64>;

    async fn delete(&self, id: i64) -> CatalogResult<u64>;

    /// Liveness probe.
    async fn ping(&self) -> CatalogResult<()>;
}
