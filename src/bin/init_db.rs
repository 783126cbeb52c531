use clap::Parser;
use meteo_alert_service::alert_rules::AlertKind;
use meteo_alert_service::db::{pool, AlertRepository, LocationRepository};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Tables created by the migrations, dependents first
const TABLES: &[&str] = &[
    "weather",
    "type_sky",
    "users",
    "alerts",
    "type_alert",
    "cities",
    "departments",
    "regions",
    "_sqlx_migrations",
];

#[derive(Parser)]
#[command(name = "init-db")]
#[command(about = "Create the schema and seed reference data", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Drop all tables before recreating them
    #[arg(long)]
    drop: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
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

    if cli.drop {
        if !cli.yes {
            println!("\n⚠️  This will DROP every table and all stored data.");
            println!("\nContinue? [y/N]: ");

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Initialization cancelled.");
                return Ok(());
            }
        }

        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&cli.database_url)
            .await?;
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
                .execute(&admin_pool)
                .await?;
            info!("Dropped table {}", table);
        }
        admin_pool.close().await;
    }

    info!("Connecting to database and applying migrations...");
    let pool = pool::connect(&cli.database_url, 5).await?;

    let counts = LocationRepository::new(pool.clone()).seed_geography().await?;

    let alert_repo = AlertRepository::new(pool);
    for kind in AlertKind::ALL {
        alert_repo.get_or_create_type(kind.label()).await?;
    }

    println!("\n✓ Database initialized");
    println!("  Regions:     {}", counts.regions);
    println!("  Departments: {}", counts.departments);
    println!("  Cities:      {}", counts.cities);
    println!("  Alert types: {}", AlertKind::ALL.len());
    Ok(())
}
