use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::alert_rules::{RuleEngine, Thresholds};
use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{AlertRepository, LocationRepository, UserRepository, WeatherRepository};
use crate::scheduler;
use crate::services::{AlertService, UserService, WeatherService};
use crate::vigilance_client::VigilanceClient;
use crate::weather_client::OpenWeatherClient;

/// Wire repositories, clients and services into the router state
pub fn build_state(config: &Config, pool: PgPool) -> AppState {
    let alert_repo = AlertRepository::new(pool.clone());
    let location_repo = LocationRepository::new(pool.clone());
    let user_repo = UserRepository::new(pool.clone());
    let weather_repo = WeatherRepository::new(pool);

    let weather_client = OpenWeatherClient::from_config(config);
    let vigilance_client = VigilanceClient::from_config(config);
    let engine = RuleEngine::new(&Thresholds::default(), config.max_forecast_alerts);

    let weather_service = WeatherService::new(
        weather_client.clone(),
        engine.clone(),
        location_repo.clone(),
        weather_repo,
        alert_repo.clone(),
    );
    let alert_service = AlertService::new(
        alert_repo.clone(),
        user_repo.clone(),
        weather_client,
        vigilance_client,
        engine,
    );
    let user_service = UserService::new(
        user_repo,
        location_repo,
        alert_repo,
        config.jwt_secret.clone(),
        config.token_expire_secs,
    );

    AppState {
        weather_service,
        alert_service,
        user_service,
        jwt_secret: config.jwt_secret.clone(),
    }
}

/// Application with the server task and the optional alert sync scheduler
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub scheduler_handle: Option<JoinHandle<()>>,
}

impl Application {
    /// Build the router, spawn the server and, when configured, the alert sync scheduler
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let app_state = build_state(&config, pool);

        let scheduler_handle = config.alert_sync_interval_minutes.map(|interval| {
            info!("Spawning alert sync scheduler");
            let alert_service = app_state.alert_service.clone();
            let vigilance_client = VigilanceClient::from_config(&config);
            tokio::spawn(async move {
                scheduler::start_alert_sync_scheduler(alert_service, vigilance_client, interval)
                    .await;
            })
        });
        if scheduler_handle.is_none() {
            info!("Alert sync scheduler disabled");
        }

        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            scheduler_handle,
        })
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
