use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::DbError;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Open a pool and run the embedded migrations
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Open a pool, retrying with exponential backoff for `attempts` tries in total
pub async fn connect_with_retry(
    database_url: &str,
    max_connections: u32,
    attempts: usize,
) -> Result<PgPool, DbError> {
    let backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(8))
        .with_max_times(attempts.saturating_sub(1));

    let pool = (|| async {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
    })
    .retry(backoff)
    .notify(|err: &sqlx::Error, delay: Duration| {
        warn!("Database connection failed: {}. Retrying in {:?}", err, delay);
    })
    .await?;

    Ok(pool)
}
