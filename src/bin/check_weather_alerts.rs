use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use meteo_alert_service::alert_rules::{RuleEngine, Thresholds, DEFAULT_MAX_ALERTS};
use meteo_alert_service::config::{
    DEFAULT_OPENWEATHER_BASE_URL, DEFAULT_OPENWEATHER_GEO_URL, DEFAULT_OPENWEATHER_ONECALL_URL,
    DEFAULT_VIGILANCE_API_URL, DEFAULT_VIGILANCE_MAP_URL,
};
use meteo_alert_service::db::{pool, AlertRepository, InsertOutcome, UserRepository};
use meteo_alert_service::geo;
use meteo_alert_service::services::AlertService;
use meteo_alert_service::vigilance_client::VigilanceClient;
use meteo_alert_service::weather_client::OpenWeatherClient;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "check-weather-alerts")]
#[command(about = "Check forecast and provider alerts for the regions where users live", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Regions to check instead of the users' regions (repeatable)
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Check every region with known coordinates
    #[arg(long, conflicts_with = "regions")]
    all_regions: bool,

    /// Number of regions checked concurrently
    #[arg(long, default_value = "3")]
    parallel: usize,
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

    let pool = pool::connect(&cli.database_url, 5).await?;
    let alert_repo = AlertRepository::new(pool.clone());
    let user_repo = UserRepository::new(pool);

    let regions: Vec<String> = if cli.all_regions {
        geo::REGION_COORDINATES
            .iter()
            .map(|p| p.name.to_string())
            .collect()
    } else if !cli.regions.is_empty() {
        cli.regions.clone()
    } else {
        user_repo.user_regions().await?
    };

    if regions.is_empty() {
        println!("No region to check (no registered user with a city).");
        return Ok(());
    }

    let weather_client = OpenWeatherClient::new(
        cli.api_key.clone(),
        DEFAULT_OPENWEATHER_BASE_URL.to_string(),
        DEFAULT_OPENWEATHER_GEO_URL.to_string(),
        DEFAULT_OPENWEATHER_ONECALL_URL.to_string(),
    );
    let vigilance_client = VigilanceClient::new(
        DEFAULT_VIGILANCE_API_URL.to_string(),
        DEFAULT_VIGILANCE_MAP_URL.to_string(),
        None,
    );
    let engine = RuleEngine::new(&Thresholds::default(), DEFAULT_MAX_ALERTS);
    let service = AlertService::new(alert_repo, user_repo, weather_client, vigilance_client, engine);

    info!("Checking {} regions", regions.len());
    let pb = ProgressBar::new(regions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let results: Vec<_> = stream::iter(regions.iter())
        .map(|region| {
            let service = &service;
            let pb = &pb;
            async move {
                let alerts = match geo::region_coordinates(region) {
                    Some(place) => service.region_new_alerts(region, place).await,
                    None => {
                        warn!("No coordinates available for region {}", region);
                        Vec::new()
                    }
                };
                pb.set_message(region.clone());
                pb.inc(1);
                (region, alerts)
            }
        })
        .buffer_unordered(cli.parallel.max(1))
        .collect()
        .await;
    pb.finish_with_message("done");

    let mut created = 0;
    let mut existing = 0;
    for (region, alerts) in results {
        if alerts.is_empty() {
            println!("  {region}: no alert");
            continue;
        }
        for alert in &alerts {
            match service.record_alert(alert).await? {
                InsertOutcome::Created => {
                    created += 1;
                    println!("  + {region}: {} ({})", alert.type_label, alert.date_alert);
                }
                InsertOutcome::AlreadyExists => {
                    existing += 1;
                    println!("  = {region}: {} already recorded", alert.type_label);
                }
            }
        }
    }

    println!("\n✓ {created} alerts created, {existing} already present");
    Ok(())
}
