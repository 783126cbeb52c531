use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::alert_rules::{ForecastAlert, RuleEngine};
use crate::db::{
    Alert, AlertFilter, AlertRepository, DbError, InsertOutcome, NewAlert, UserRepository,
    SOURCE_FORECAST, SOURCE_PROVIDER, SOURCE_VIGILANCE,
};
use crate::geo;
use crate::severity::Severity;
use crate::vigilance_client::{VigilanceAlert, VigilanceClient, VigilanceLevel};
use crate::weather_client::{OpenWeatherClient, ProviderAlert};

/// Days of forecast scanned by a region sync
const SYNC_FORECAST_DAYS: u32 = 5;

/// Provider alert with a severity assessed from its text
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassifiedProviderAlert {
    pub sender: String,
    pub event: String,
    pub description: String,
    pub severity: Severity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<ProviderAlert> for ClassifiedProviderAlert {
    fn from(alert: ProviderAlert) -> Self {
        let severity = Severity::from_description(&format!("{} {}", alert.event, alert.description));
        Self {
            sender: alert.sender,
            event: alert.event,
            description: alert.description,
            severity,
            start: alert.start,
            end: alert.end,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub regions_checked: usize,
    pub regions_skipped: usize,
    pub alerts_found: usize,
    pub alerts_created: usize,
}

pub fn forecast_to_new_alert(region: &str, alert: &ForecastAlert) -> NewAlert {
    NewAlert {
        type_label: alert.event.clone(),
        region: region.to_string(),
        department_code: None,
        description: alert.description.clone(),
        date_alert: alert.start.date_naive(),
        source: SOURCE_FORECAST.to_string(),
    }
}

pub fn provider_to_new_alert(region: &str, alert: &ClassifiedProviderAlert) -> NewAlert {
    let type_label = if alert.event.trim().is_empty() {
        "Alerte météo".to_string()
    } else {
        alert.event.clone()
    };
    NewAlert {
        type_label,
        region: region.to_string(),
        department_code: None,
        description: alert.description.clone(),
        date_alert: alert.start.date_naive(),
        source: SOURCE_PROVIDER.to_string(),
    }
}

/// Orange and red vigilance alerts, dated on the import day
pub fn vigilance_to_new_alerts(alerts: &[VigilanceAlert], today: NaiveDate) -> Vec<NewAlert> {
    alerts
        .iter()
        .filter(|a| a.level.is_alerting())
        .map(|a| NewAlert {
            type_label: a.type_label(),
            region: a.region.clone(),
            department_code: Some(a.department_code.clone()),
            description: if a.description.is_empty() {
                format!(
                    "Vigilance {} pour {} dans le département {} ({})",
                    a.level.colour(),
                    a.hazard,
                    a.department_name,
                    a.department_code
                )
            } else {
                a.description.clone()
            },
            date_alert: today,
            source: SOURCE_VIGILANCE.to_string(),
        })
        .collect()
}

#[derive(Clone)]
pub struct AlertService {
    alert_repo: AlertRepository,
    user_repo: UserRepository,
    weather_client: OpenWeatherClient,
    vigilance_client: VigilanceClient,
    engine: RuleEngine,
}

impl AlertService {
    pub fn new(
        alert_repo: AlertRepository,
        user_repo: UserRepository,
        weather_client: OpenWeatherClient,
        vigilance_client: VigilanceClient,
        engine: RuleEngine,
    ) -> Self {
        Self {
            alert_repo,
            user_repo,
            weather_client,
            vigilance_client,
            engine,
        }
    }

    pub async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError> {
        self.alert_repo.find_filtered(filter).await
    }

    /// Active alerts of a region from today onwards
    pub async fn region_alerts(&self, region: &str) -> Result<Vec<Alert>, DbError> {
        self.alert_repo
            .find_active_for_region(region, Utc::now().date_naive())
            .await
    }

    pub async fn record_alert(&self, alert: &NewAlert) -> Result<InsertOutcome, DbError> {
        self.alert_repo.insert_if_absent(alert).await
    }

    /// Store orange/red vigilance alerts, returns the number created
    #[instrument(skip(self, alerts), fields(count = alerts.len()))]
    pub async fn import_vigilance(
        &self,
        alerts: &[VigilanceAlert],
        today: NaiveDate,
    ) -> Result<usize, DbError> {
        let new_alerts = vigilance_to_new_alerts(alerts, today);
        if new_alerts.is_empty() {
            info!("No orange or red vigilance to import");
            return Ok(0);
        }
        self.alert_repo.insert_many(&new_alerts).await
    }

    /// Live vigilance at or above `min_level`; empty when the upstream fails
    #[instrument(skip(self))]
    pub async fn current_vigilance(&self, min_level: VigilanceLevel) -> Vec<VigilanceAlert> {
        match self.vigilance_client.fetch_current().await {
            Ok(alerts) => alerts
                .into_iter()
                .filter(|a| a.level >= min_level)
                .collect(),
            Err(e) => {
                warn!("Failed to fetch vigilance alerts: {}", e);
                Vec::new()
            }
        }
    }

    /// Check forecast and provider alerts for every region where users live
    #[instrument(skip(self))]
    pub async fn sync_region_alerts(&self) -> Result<SyncSummary, DbError> {
        let regions = self.user_repo.user_regions().await?;
        let mut summary = SyncSummary::default();

        for region in &regions {
            let Some(place) = geo::region_coordinates(region) else {
                warn!("No coordinates available for region {}", region);
                summary.regions_skipped += 1;
                continue;
            };

            let new_alerts = self.region_new_alerts(region, place).await;
            summary.regions_checked += 1;
            summary.alerts_found += new_alerts.len();
            if !new_alerts.is_empty() {
                summary.alerts_created += self.alert_repo.insert_many(&new_alerts).await?;
            }
        }

        info!(
            "Region sync: {} checked, {} skipped, {} alerts found, {} created",
            summary.regions_checked,
            summary.regions_skipped,
            summary.alerts_found,
            summary.alerts_created
        );
        Ok(summary)
    }

    /// Forecast and provider alerts for one region; upstream failures yield nothing
    pub async fn region_new_alerts(&self, region: &str, place: &geo::NamedPlace) -> Vec<NewAlert> {
        let mut new_alerts = Vec::new();

        match self
            .weather_client
            .forecast(place.name, "FR", SYNC_FORECAST_DAYS)
            .await
        {
            Ok(entries) => {
                let readings: Vec<_> = entries.iter().map(|e| e.reading()).collect();
                new_alerts.extend(
                    self.engine
                        .evaluate(&readings)
                        .iter()
                        .map(|a| forecast_to_new_alert(region, a)),
                );
            }
            Err(e) => warn!("Forecast for {} failed: {}", region, e),
        }

        match self
            .weather_client
            .provider_alerts(place.latitude, place.longitude)
            .await
        {
            Ok(alerts) => new_alerts.extend(
                alerts
                    .into_iter()
                    .map(ClassifiedProviderAlert::from)
                    .map(|a| provider_to_new_alert(region, &a)),
            ),
            Err(e) => debug!("Provider alerts for {} unavailable: {}", region, e),
        }

        new_alerts
    }
}
