//! Resource repository implementation.

use sqlx::{PgConnection, PgPool};

use boxoffice_core::error::{AppError, ErrorKind};
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{EventId, ResourceId};
use boxoffice_entity::resource::Resource;

/// Repository for resource queries and row-locked updates.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    pool: PgPool,
}

impl ResourceRepository {
    /// Create a new resource repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the underlying pool for callers that open transactions.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find a resource by ID.
    pub async fn find_by_id(&self, id: ResourceId) -> AppResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to find resource", e)
            })
    }

    /// List all resources of an event in registration order.
    pub async fn find_by_event(&self, event_id: EventId) -> AppResult<Vec<Resource>> {
        sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources WHERE event_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to list resources", e)
        })
    }

    /// Insert a batch of resources atomically.
    pub async fn insert_many(&self, resources: &[Resource]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to begin transaction", e)
        })?;

        for resource in resources {
            sqlx::query(
                "INSERT INTO resources (id, event_id, label, status, created_at, updated_at, revision) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(resource.id)
            .bind(resource.event_id)
            .bind(&resource.label)
            .bind(resource.status)
            .bind(resource.created_at)
            .bind(resource.updated_at)
            .bind(resource.revision)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to insert resource", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to commit resources", e)
        })
    }

    /// Lock a resource row for the rest of the transaction.
    ///
    /// Concurrent lockers of the same row queue behind this one until the
    /// transaction ends.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: ResourceId,
    ) -> AppResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to lock resource", e)
            })
    }

    /// Persist a status transition inside an open transaction.
    pub async fn update_status(conn: &mut PgConnection, resource: &Resource) -> AppResult<()> {
        sqlx::query(
            "UPDATE resources SET status = $2, updated_at = $3, revision = $4 WHERE id = $1",
        )
        .bind(resource.id)
        .bind(resource.status)
        .bind(resource.updated_at)
        .bind(resource.revision)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                "Failed to update resource status",
                e,
            )
        })?;
        Ok(())
    }
}
