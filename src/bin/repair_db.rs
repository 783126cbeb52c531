use clap::Parser;
use meteo_alert_service::db::pool;
use sqlx::PgPool;
use tracing::{info, warn};

/// Columns that older schemas may lack, with the statement adding each one
const REQUIRED_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "is_active", "ALTER TABLE users ADD COLUMN IF NOT EXISTS is_active BOOLEAN NOT NULL DEFAULT TRUE"),
    ("users", "is_admin", "ALTER TABLE users ADD COLUMN IF NOT EXISTS is_admin BOOLEAN NOT NULL DEFAULT FALSE"),
    ("users", "last_login", "ALTER TABLE users ADD COLUMN IF NOT EXISTS last_login TIMESTAMPTZ"),
    ("users", "created_at", "ALTER TABLE users ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
    ("users", "city_id", "ALTER TABLE users ADD COLUMN IF NOT EXISTS city_id BIGINT REFERENCES cities(id) ON DELETE SET NULL"),
    ("alerts", "region", "ALTER TABLE alerts ADD COLUMN IF NOT EXISTS region VARCHAR(100) NOT NULL DEFAULT ''"),
    ("alerts", "department_code", "ALTER TABLE alerts ADD COLUMN IF NOT EXISTS department_code VARCHAR(3)"),
    ("alerts", "active", "ALTER TABLE alerts ADD COLUMN IF NOT EXISTS active BOOLEAN NOT NULL DEFAULT TRUE"),
    ("alerts", "source", "ALTER TABLE alerts ADD COLUMN IF NOT EXISTS source VARCHAR(32) NOT NULL DEFAULT 'manual'"),
    ("alerts", "created_at", "ALTER TABLE alerts ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
    ("cities", "latitude", "ALTER TABLE cities ADD COLUMN IF NOT EXISTS latitude DOUBLE PRECISION"),
    ("cities", "longitude", "ALTER TABLE cities ADD COLUMN IF NOT EXISTS longitude DOUBLE PRECISION"),
];

#[derive(Parser)]
#[command(name = "repair-db")]
#[command(about = "Bring an existing database up to the current schema", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Connection attempts before giving up
    #[arg(long, default_value = "5")]
    attempts: usize,
}

async fn existing_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT table_name::TEXT FROM information_schema.tables
         WHERE table_schema = current_schema() ORDER BY table_name",
    )
    .fetch_all(pool)
    .await
}

async fn column_exists(pool: &PgPool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
         )",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await
}

async fn has_unique_index(pool: &PgPool, table: &str, definition: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM pg_indexes
            WHERE schemaname = current_schema() AND tablename = $1
              AND indexdef LIKE 'CREATE UNIQUE INDEX%' AND indexdef LIKE $2
         )",
    )
    .bind(table)
    .bind(format!("%({definition})"))
    .fetch_one(pool)
    .await
}

/// Remove duplicate alerts, keeping the oldest row of each (type, region, date)
async fn dedupe_alerts(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM alerts a USING alerts b
         WHERE a.id > b.id
           AND a.type_id = b.type_id
           AND a.region = b.region
           AND a.date_alert = b.date_alert",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Connecting to database ({} attempts)...", cli.attempts);
    let pool = pool::connect_with_retry(&cli.database_url, 2, cli.attempts.max(1)).await?;
    info!("Connected");

    let tables = existing_tables(&pool).await?;
    if tables.is_empty() {
        info!("No existing tables");
    } else {
        info!("Existing tables: {}", tables.join(", "));
    }

    let mut repaired = 0;
    for (table, column, statement) in REQUIRED_COLUMNS {
        if !tables.iter().any(|t| t == table) {
            continue;
        }
        if !column_exists(&pool, table, column).await? {
            info!("Adding column {}.{}", table, column);
            sqlx::query(statement).execute(&pool).await?;
            repaired += 1;
        }
    }

    if tables.iter().any(|t| t == "users")
        && !has_unique_index(&pool, "users", "email").await?
    {
        let duplicates: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT LOWER(email) FROM users GROUP BY LOWER(email) HAVING COUNT(*) > 1
             ) d",
        )
        .fetch_one(&pool)
        .await?;
        if duplicates > 0 {
            warn!(
                "{} email addresses are used by several accounts, unique constraint not added",
                duplicates
            );
        } else {
            info!("Adding unique constraint on users.email");
            sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users(email)")
                .execute(&pool)
                .await?;
            repaired += 1;
        }
    }

    if tables.iter().any(|t| t == "alerts")
        && !has_unique_index(&pool, "alerts", "type_id, region, date_alert").await?
    {
        let removed = dedupe_alerts(&pool).await?;
        if removed > 0 {
            info!("Removed {} duplicate alerts", removed);
        }
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS alerts_type_region_date_key
             ON alerts(type_id, region, date_alert)",
        )
        .execute(&pool)
        .await?;
        repaired += 1;
    }

    info!("Applying migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("\n✓ Database repaired ({repaired} fixes applied)");
    Ok(())
}
