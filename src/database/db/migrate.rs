use anyhow::Result;
use sqlx::PgPool;

/// Applies the schema embedded from `migrations/` at build time.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}
