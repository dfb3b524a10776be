//! Cluster registry abstraction for the Garage console.
//!
//! This crate defines the [`ClusterRegistry`] trait, a keyed CRUD store for
//! [`ClusterRecord`]s that knows nothing about encryption or HTTP. Token
//! fields arrive here already encrypted by the token cipher in
//! `garage-console-core`; the registry only ever sees ciphertext.
//!
//! Two implementations are provided:
//!
//! - [`MemoryRegistry`]: in-memory, for development and tests
//! - [`PostgresRegistry`]: backed by PostgreSQL (feature `postgres-backend`)

mod error;
mod memory;
#[cfg(feature = "postgres-backend")]
mod postgres_registry;
mod record;

pub use error::RegistryError;
pub use memory::MemoryRegistry;
#[cfg(feature = "postgres-backend")]
pub use postgres_registry::PostgresRegistry;
pub use record::ClusterRecord;

/// A pluggable store of registered clusters.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// The proxy path only calls [`get`](ClusterRegistry::get); the remaining
/// operations back the cluster bookkeeping routes.
#[async_trait::async_trait]
pub trait ClusterRegistry: Send + Sync + 'static {
    /// Fetch a cluster by id.
    ///
    /// Returns `Ok(None)` if no cluster with that id exists.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Read`] if the underlying store fails.
    async fn get(&self, id: &str) -> Result<Option<ClusterRecord>, RegistryError>;

    /// List every registered cluster, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Read`] if the underlying store fails.
    async fn list(&self) -> Result<Vec<ClusterRecord>, RegistryError>;

    /// Insert a new cluster.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyExists`] if the id is taken, or
    /// [`RegistryError::Write`] if the underlying store fails.
    async fn create(&self, record: ClusterRecord) -> Result<(), RegistryError>;

    /// Replace an existing cluster.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the id is unknown, or
    /// [`RegistryError::Write`] if the underlying store fails.
    async fn update(&self, record: ClusterRecord) -> Result<(), RegistryError>;

    /// Remove a cluster. Returns `true` if a record was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Delete`] if the underlying store fails.
    async fn delete(&self, id: &str) -> Result<bool, RegistryError>;
}
