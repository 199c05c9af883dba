use sqlx::postgres::PgPool;

use crate::types::AppResult;

pub async fn health_check(pool: &PgPool) -> AppResult<bool> {
    let _result = sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await?;

    Ok(true)
}

/// Whether `table` exists in the `public` schema.
pub async fn table_exists(pool: &PgPool, table: &str) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = 'public' AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
