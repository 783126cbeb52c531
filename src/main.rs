use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meteo_alert_service::app::Application;
use meteo_alert_service::config::Config;
use meteo_alert_service::db::pool;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,meteo_alert_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting meteo alert service with config: {:?}", config);

    info!("Connecting to database...");
    let pool = pool::connect(&config.database_url, pool::DEFAULT_MAX_CONNECTIONS).await?;
    info!("Database ready");

    let app = Application::build(config, pool).await?;
    app.run_until_stopped().await
}
