use chrono::Utc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::services::AlertService;
use crate::vigilance_client::VigilanceClient;

/// Periodically imports vigilance alerts and checks the regions where users live
#[instrument(skip(alert_service, vigilance_client), fields(interval_minutes = %interval_minutes))]
pub async fn start_alert_sync_scheduler(
    alert_service: AlertService,
    vigilance_client: VigilanceClient,
    interval_minutes: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_minutes * 60));

    info!("Alert sync scheduler started with {} minute interval", interval_minutes);

    loop {
        interval.tick().await;
        debug!("Scheduler tick - initiating alert sync");

        match import_vigilance(&alert_service, &vigilance_client).await {
            Ok(created) if created > 0 => info!("Imported {} new vigilance alerts", created),
            Ok(_) => debug!("No new vigilance alerts"),
            Err(e) => error!("Failed to import vigilance alerts: {}", e),
        }

        match alert_service.sync_region_alerts().await {
            Ok(summary) => debug!("Region sync created {} alerts", summary.alerts_created),
            Err(e) => error!("Failed to sync region alerts: {}", e),
        }
    }
}

#[instrument(skip(alert_service, vigilance_client))]
async fn import_vigilance(
    alert_service: &AlertService,
    vigilance_client: &VigilanceClient,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let alerts = vigilance_client.fetch_current().await?;
    info!("Fetched {} vigilance alerts", alerts.len());

    if alerts.is_empty() {
        warn!("No vigilance alerts returned");
    }

    let created = alert_service
        .import_vigilance(&alerts, Utc::now().date_naive())
        .await?;
    Ok(created)
}
