use chrono::Utc;
use clap::Parser;
use meteo_alert_service::db::{pool, AlertRepository, NewAlert, SOURCE_MANUAL};
use meteo_alert_service::geo;
use tracing::info;

/// (type, region, description) of the demonstration alerts
const TEST_ALERTS: &[(&str, &str, &str)] = &[
    (
        "Fortes pluies",
        geo::ILE_DE_FRANCE,
        "Fortes précipitations attendues avec plus de 30mm de pluie en 24h.",
    ),
    (
        "Vents violents",
        geo::BRETAGNE,
        "Vents violents pouvant atteindre 100 km/h sur le littoral.",
    ),
    (
        "Orages",
        geo::PROVENCE_ALPES_COTE_DAZUR,
        "Orages violents avec risque de grêle et fortes rafales.",
    ),
    (
        "Chutes de neige",
        geo::AUVERGNE_RHONE_ALPES,
        "Chutes de neige importantes prévues en montagne, 20-30cm attendus.",
    ),
];

#[derive(Parser)]
#[command(name = "seed-test-alerts")]
#[command(about = "Replace all stored alerts with demonstration alerts dated today", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

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

    if !cli.yes {
        println!("\n⚠️  This will DELETE every stored alert before seeding.");
        println!("\nContinue? [y/N]: ");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Seeding cancelled.");
            return Ok(());
        }
    }

    let pool = pool::connect(&cli.database_url, 2).await?;
    let alert_repo = AlertRepository::new(pool);

    let today = Utc::now().date_naive();
    let alerts: Vec<NewAlert> = TEST_ALERTS
        .iter()
        .map(|(kind, region, description)| NewAlert {
            type_label: kind.to_string(),
            region: region.to_string(),
            department_code: None,
            description: description.to_string(),
            date_alert: today,
            source: SOURCE_MANUAL.to_string(),
        })
        .collect();

    let (deleted, inserted) = alert_repo.replace_all(&alerts).await?;
    info!("Deleted {} existing alerts", deleted);
    println!("✓ {} test alerts added for {}", inserted, today);
    Ok(())
}
