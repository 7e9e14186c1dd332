//! Hold repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use boxoffice_core::error::{AppError, ErrorKind};
use boxoffice_core::result::AppResult;
use boxoffice_core::types::{HoldId, ResourceId};
use boxoffice_entity::hold::Hold;

/// Repository for hold queries and writes.
#[derive(Debug, Clone)]
pub struct HoldRepository {
    pool: PgPool,
}

impl HoldRepository {
    /// Create a new hold repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a hold by ID.
    pub async fn find_by_id(&self, id: HoldId) -> AppResult<Option<Hold>> {
        sqlx::query_as::<_, Hold>("SELECT * FROM holds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to find hold", e)
            })
    }

    /// Active holds whose expiry is at or before `now`, oldest first,
    /// skipping the ids in `exclude`.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        exclude: &[HoldId],
        limit: i64,
    ) -> AppResult<Vec<Hold>> {
        sqlx::query_as::<_, Hold>(
            "SELECT * FROM holds WHERE status = 'active' AND expires_at <= $1 \
             AND NOT (id = ANY($2)) \
             ORDER BY expires_at ASC, id ASC LIMIT $3",
        )
        .bind(now)
        .bind(exclude.to_vec())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to find expired holds", e)
        })
    }

    /// The active hold on a resource, read inside the locking transaction.
    pub async fn find_active_for_resource(
        conn: &mut PgConnection,
        resource_id: ResourceId,
    ) -> AppResult<Option<Hold>> {
        sqlx::query_as::<_, Hold>(
            "SELECT * FROM holds WHERE resource_id = $1 AND status = 'active'",
        )
        .bind(resource_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to find active hold", e)
        })
    }

    /// Insert a hold, or update the status of an existing one.
    pub async fn upsert(conn: &mut PgConnection, hold: &Hold) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO holds (id, resource_id, claimant_id, status, created_at, expires_at, closed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                status = EXCLUDED.status, \
                closed_at = EXCLUDED.closed_at",
        )
        .bind(hold.id)
        .bind(hold.resource_id)
        .bind(&hold.claimant_id)
        .bind(hold.status)
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .bind(hold.closed_at)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to write hold", e)
        })?;
        Ok(())
    }
}
