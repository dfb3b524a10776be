//! PostgreSQL cluster registry.
//!
//! Stores every cluster as one row of the `clusters` table. Token columns
//! hold cipher wire strings; this layer never sees plaintext.
//!
//! Feature-gated behind `postgres-backend`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{ClusterRecord, ClusterRegistry, RegistryError};

/// A registry backed by PostgreSQL.
///
/// Thread-safe via `PgPool`. All operations are fully async.
///
/// # Examples
///
/// ```no_run
/// # use garage_console_storage::PostgresRegistry;
/// # #[tokio::main]
/// # async fn main() {
/// let registry = PostgresRegistry::connect("postgres://localhost/console").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresRegistry {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRegistry")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresRegistry {
    /// Connect to PostgreSQL and create the `clusters` table if missing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Open`] if the connection or migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, RegistryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| RegistryError::Open {
                location: "[redacted database url]".to_owned(),
                reason: e.to_string(),
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS clusters (\
                id           TEXT        PRIMARY KEY, \
                name         TEXT        NOT NULL, \
                endpoint     TEXT        NOT NULL, \
                admin_token  TEXT        NOT NULL, \
                metric_token TEXT, \
                created_at   TIMESTAMPTZ NOT NULL, \
                updated_at   TIMESTAMPTZ NOT NULL\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| RegistryError::Open {
            location: "[redacted database url]".to_owned(),
            reason: format!("migration failed: {e}"),
        })?;

        tracing::debug!("clusters table ready");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ClusterRegistry for PostgresRegistry {
    async fn get(&self, id: &str) -> Result<Option<ClusterRecord>, RegistryError> {
        sqlx::query_as::<_, ClusterRecord>("SELECT * FROM clusters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RegistryError::Read {
                id: id.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<ClusterRecord>, RegistryError> {
        sqlx::query_as::<_, ClusterRecord>("SELECT * FROM clusters ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RegistryError::Read {
                id: "*".to_owned(),
                reason: e.to_string(),
            })
    }

    async fn create(&self, record: ClusterRecord) -> Result<(), RegistryError> {
        let result = sqlx::query(
            r"INSERT INTO clusters (id, name, endpoint, admin_token, metric_token, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.endpoint)
        .bind(&record.admin_token)
        .bind(&record.metric_token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::Write {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::AlreadyExists { id: record.id });
        }
        Ok(())
    }

    async fn update(&self, record: ClusterRecord) -> Result<(), RegistryError> {
        let result = sqlx::query(
            r"UPDATE clusters
              SET name = $2, endpoint = $3, admin_token = $4, metric_token = $5, updated_at = $6
              WHERE id = $1",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.endpoint)
        .bind(&record.admin_token)
        .bind(&record.metric_token)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::Write {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound { id: record.id });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RegistryError> {
        let result = sqlx::query("DELETE FROM clusters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Delete {
                id: id.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(result.rows_affected() > 0)
    }
}
