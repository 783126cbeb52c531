use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use meteo_alert_service::config::{DEFAULT_VIGILANCE_API_URL, DEFAULT_VIGILANCE_MAP_URL};
use meteo_alert_service::db::{pool, AlertRepository};
use meteo_alert_service::services::alert_service::vigilance_to_new_alerts;
use meteo_alert_service::vigilance_client::VigilanceClient;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// Text bulletin, requires an API key
    Bulletin,
    /// Public vigilance map
    Map,
}

#[derive(Parser)]
#[command(name = "import-vigilance-alerts")]
#[command(about = "Import orange and red vigilance alerts", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Vigilance feed to read
    #[arg(long, value_enum, default_value = "map")]
    source: Source,

    /// Vigilance API key (bulletin source only)
    #[arg(long, env = "VIGILANCE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Print the alerts without storing them
    #[arg(long)]
    dry_run: bool,
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

    let client = VigilanceClient::new(
        DEFAULT_VIGILANCE_API_URL.to_string(),
        DEFAULT_VIGILANCE_MAP_URL.to_string(),
        cli.api_key.clone(),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Fetching vigilance...");

    let alerts = match cli.source {
        Source::Bulletin => {
            if !client.has_api_key() {
                spinner.finish_and_clear();
                return Err("the bulletin source needs VIGILANCE_API_KEY".into());
            }
            client.fetch_bulletin().await?
        }
        Source::Map => {
            let (updated, alerts) = client.fetch_map().await?;
            info!("Vigilance map updated at {}", updated);
            alerts
        }
    };
    spinner.finish_with_message(format!("Fetched {} vigilance entries", alerts.len()));

    let today = Utc::now().date_naive();
    let new_alerts = vigilance_to_new_alerts(&alerts, today);
    if new_alerts.is_empty() {
        println!("No orange or red vigilance in effect.");
        return Ok(());
    }

    if cli.dry_run {
        for alert in &new_alerts {
            println!(
                "  {} | {} | {}",
                alert.type_label, alert.region, alert.description
            );
        }
        println!("\n{} alerts (dry run, nothing stored)", new_alerts.len());
        return Ok(());
    }

    let pool = pool::connect(&cli.database_url, 2).await?;
    let inserted = AlertRepository::new(pool).insert_many(&new_alerts).await?;
    println!(
        "✓ {} alerts imported, {} already present",
        inserted,
        new_alerts.len() - inserted
    );
    Ok(())
}
