use clap::Parser;
use meteo_alert_service::db::{pool, UserRepository};
use meteo_alert_service::services::user_service::{ensure_admin, AdminOutcome};
use tracing::info;

#[derive(Parser)]
#[command(name = "create-admin")]
#[command(about = "Create the administrator account", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Administrator email
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@exemple.com")]
    email: String,

    /// Administrator password
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// Reset the password when the account already exists
    #[arg(long)]
    update: bool,
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

    info!("Connecting to database...");
    let pool = pool::connect(&cli.database_url, 2).await?;
    let user_repo = UserRepository::new(pool);

    match ensure_admin(&user_repo, &cli.email, &cli.password, cli.update).await? {
        AdminOutcome::Created => println!("✓ Administrator {} created", cli.email),
        AdminOutcome::Updated => println!("✓ Password updated for {}", cli.email),
        AdminOutcome::AlreadyExists => println!(
            "Administrator {} already exists (use --update to reset the password)",
            cli.email
        ),
    }
    Ok(())
}
