use sqlx::PgPool;

/// Apply the relational schema (tables and indexes). Safe to run on every
/// start; already-applied files are skipped.
pub async fn init(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
