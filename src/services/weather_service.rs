use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::alert_rules::{ForecastAlert, RuleEngine};
use crate::db::{
    Alert, AlertRepository, CityDetails, DailyWeather, DbError, Department, LocationRepository,
    Region, RegionWithDepartments, WeatherRecord, WeatherRepository,
};
use crate::geo;
use crate::services::alert_service::ClassifiedProviderAlert;
use crate::services::ServiceError;
use crate::weather_client::{CurrentWeather, ForecastEntry, GeoLocation, OpenWeatherClient};

pub const COUNTRY_CODE: &str = "FR";
pub const DEFAULT_FORECAST_DAYS: u32 = 5;
const OVERVIEW_CONCURRENCY: usize = 5;
const SEARCH_LIMIT: i64 = 10;
const GEOCODE_LIMIT: u32 = 5;
const HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CityWeatherReport {
    pub city: String,
    pub region: Option<String>,
    pub weather: Option<CurrentWeather>,
    pub alerts: Vec<ForecastAlert>,
    pub provider_alerts: Vec<ClassifiedProviderAlert>,
    pub stored_alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CityForecast {
    pub city: String,
    pub entries: Vec<ForecastEntry>,
    pub alerts: Vec<ForecastAlert>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CitySnapshot {
    pub city: String,
    pub department_code: String,
    pub weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResults {
    pub query: String,
    pub cities: Vec<CityDetails>,
    pub locations: Vec<GeoLocation>,
}

#[derive(Clone)]
pub struct WeatherService {
    client: OpenWeatherClient,
    engine: RuleEngine,
    location_repo: LocationRepository,
    weather_repo: WeatherRepository,
    alert_repo: AlertRepository,
}

impl WeatherService {
    pub fn new(
        client: OpenWeatherClient,
        engine: RuleEngine,
        location_repo: LocationRepository,
        weather_repo: WeatherRepository,
        alert_repo: AlertRepository,
    ) -> Self {
        Self {
            client,
            engine,
            location_repo,
            weather_repo,
            alert_repo,
        }
    }

    /// Current weather; known cities also get their daily record updated
    #[instrument(skip(self))]
    pub async fn current_weather(
        &self,
        city: &str,
        known: Option<&CityDetails>,
    ) -> Result<CurrentWeather, ServiceError> {
        let weather = self.client.current_weather(city, COUNTRY_CODE).await?;

        if let Some(details) = known {
            let daily = daily_from_current(details.id, &weather);
            if let Err(e) = self.weather_repo.upsert_daily(&daily).await {
                warn!("Failed to record daily weather for {}: {}", city, e);
            }
        }

        Ok(weather)
    }

    /// Forecast entries and their alerts; an upstream failure degrades to an empty forecast
    #[instrument(skip(self))]
    pub async fn forecast(&self, city: &str, days: u32) -> CityForecast {
        let entries = match self.client.forecast(city, COUNTRY_CODE, days).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Forecast for {} unavailable: {}", city, e);
                Vec::new()
            }
        };
        let readings: Vec<_> = entries.iter().map(ForecastEntry::reading).collect();
        let alerts = self.engine.evaluate(&readings);
        debug!("{} forecast entries, {} alerts", entries.len(), alerts.len());

        CityForecast {
            city: city.to_string(),
            entries,
            alerts,
        }
    }

    /// Current weather, forecast alerts and stored alerts; upstream failures degrade to empty
    #[instrument(skip(self))]
    pub async fn city_report(&self, city: &str) -> Result<CityWeatherReport, ServiceError> {
        let known = self.location_repo.find_city_by_label(city).await?;

        let (weather, forecast) = tokio::join!(
            self.current_weather(city, known.as_ref()),
            self.forecast(city, DEFAULT_FORECAST_DAYS)
        );

        let weather = weather
            .map_err(|e| warn!("Current weather for {} unavailable: {}", city, e))
            .ok();
        let alerts = forecast.alerts;

        let provider_alerts = match &weather {
            Some(w) => match self.client.provider_alerts(w.latitude, w.longitude).await {
                Ok(alerts) => alerts.into_iter().map(ClassifiedProviderAlert::from).collect(),
                Err(e) => {
                    debug!("Provider alerts unavailable: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let region = known.as_ref().map(|c| c.region.clone());
        let stored_alerts = match &region {
            Some(region) => {
                self.alert_repo
                    .find_active_for_region(region, chrono::Utc::now().date_naive())
                    .await?
            }
            None => Vec::new(),
        };

        Ok(CityWeatherReport {
            city: known.map(|c| c.label).unwrap_or_else(|| city.to_string()),
            region,
            weather,
            alerts,
            provider_alerts,
            stored_alerts,
        })
    }

    /// Current weather of the main cities, in table order
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Vec<CitySnapshot> {
        let snapshots: Vec<_> = geo::MAIN_CITIES
            .iter()
            .map(|(place, code)| self.snapshot(place.name, *code))
            .collect();

        stream::iter(snapshots)
            .buffered(OVERVIEW_CONCURRENCY)
            .collect()
            .await
    }

    async fn snapshot(&self, name: &'static str, code: &'static str) -> CitySnapshot {
        let weather = match self.client.current_weather(name, COUNTRY_CODE).await {
            Ok(w) => Some(w),
            Err(e) => {
                warn!("Overview weather for {} unavailable: {}", name, e);
                None
            }
        };
        CitySnapshot {
            city: name.to_string(),
            department_code: code.to_string(),
            weather,
        }
    }

    #[instrument(skip(self))]
    pub async fn history(&self, city: &str) -> Result<Vec<WeatherRecord>, ServiceError> {
        let known = self
            .location_repo
            .find_city_by_label(city)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("City {city}")))?;

        Ok(self.weather_repo.find_history(known.id, HISTORY_DAYS).await?)
    }

    #[instrument(skip(self))]
    pub async fn regions(&self) -> Result<Vec<RegionWithDepartments>, DbError> {
        let regions = self.location_repo.list_regions().await?;
        let departments = self.location_repo.list_departments().await?;
        Ok(group_departments(regions, departments))
    }

    /// Stored cities plus geocoding matches; geocoding failures are ignored
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchResults, ServiceError> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Err(ServiceError::Validation(
                "search query needs at least 2 characters".to_string(),
            ));
        }

        let cities = self.location_repo.search_cities(query, SEARCH_LIMIT).await?;
        let locations = self
            .client
            .geocode(query, GEOCODE_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!("Geocoding {} failed: {}", query, e);
                Vec::new()
            });

        Ok(SearchResults {
            query: query.to_string(),
            cities,
            locations,
        })
    }
}

/// Attach each department to its region, regions keep their order
pub fn group_departments(
    regions: Vec<Region>,
    departments: Vec<Department>,
) -> Vec<RegionWithDepartments> {
    let mut grouped: Vec<RegionWithDepartments> = regions
        .into_iter()
        .map(|r| RegionWithDepartments {
            id: r.id,
            label: r.label,
            departments: Vec::new(),
        })
        .collect();

    for dept in departments {
        if let Some(region) = grouped.iter_mut().find(|r| r.id == dept.region_id) {
            region.departments.push(dept);
        }
    }
    grouped
}

fn daily_from_current(city_id: i64, weather: &CurrentWeather) -> DailyWeather {
    DailyWeather {
        city_id,
        date_weather: weather.observed_at.date_naive(),
        temperature: weather.temperature,
        pressure: weather.pressure,
        humidity: weather.humidity,
        wind_speed: weather.wind_speed,
        sunrise: weather.sunrise,
        sunset: weather.sunset,
        sky: weather.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_group_departments() {
        let regions = vec![
            Region { id: 1, label: "Bretagne".to_string() },
            Region { id: 2, label: "Corse".to_string() },
        ];
        let departments = vec![
            Department { id: 10, code: "2A".to_string(), label: "Corse-du-Sud".to_string(), region_id: 2 },
            Department { id: 11, code: "29".to_string(), label: "Finistère".to_string(), region_id: 1 },
            Department { id: 12, code: "2B".to_string(), label: "Haute-Corse".to_string(), region_id: 2 },
            Department { id: 13, code: "99".to_string(), label: "Orphelin".to_string(), region_id: 9 },
        ];

        let grouped = group_departments(regions, departments);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].label, "Bretagne");
        assert_eq!(grouped[0].departments.len(), 1);
        let corsica: Vec<_> = grouped[1].departments.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(corsica, vec!["2A", "2B"]);
    }

    #[test]
    fn test_daily_from_current() {
        let observed_at = Utc.with_ymd_and_hms(2025, 6, 21, 13, 0, 0).unwrap();
        let weather = CurrentWeather {
            city: "Lyon".to_string(),
            country: "FR".to_string(),
            temperature: 31.2,
            feels_like: 30.0,
            humidity: 40.0,
            pressure: 1015.0,
            description: "ciel dégagé".to_string(),
            icon: "01d".to_string(),
            weather_code: 800,
            wind_speed: 3.1,
            wind_direction: 180.0,
            clouds: 0.0,
            rain_1h: 0.0,
            snow_1h: 0.0,
            observed_at,
            sunrise: None,
            sunset: None,
            latitude: 45.76,
            longitude: 4.83,
        };

        let daily = daily_from_current(7, &weather);
        assert_eq!(daily.city_id, 7);
        assert_eq!(daily.date_weather, observed_at.date_naive());
        assert_eq!(daily.temperature, 31.2);
        assert_eq!(daily.sky, "ciel dégagé");
    }
}
