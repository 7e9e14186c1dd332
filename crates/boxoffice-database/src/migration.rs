//! Embedded schema migrations.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use boxoffice_core::error::{AppError, ErrorKind};
use boxoffice_core::result::AppResult;

/// Migrations compiled in from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every pending migration.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::StoreUnavailable, "Schema migration failed", e)
    })?;

    info!(
        available = MIGRATOR.iter().count(),
        "Reservation schema is up to date"
    );
    Ok(())
}
