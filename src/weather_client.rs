use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::fetch_error::{truncate_body, FetchError};

/// Temperature used when the upstream omits it, chosen so it never triggers a rule
pub const BENIGN_TEMPERATURE_C: f64 = 20.0;
/// OpenWeatherMap "clear sky" condition code
pub const CLEAR_SKY_CODE: u32 = 800;
/// Forecast entries are 3 hours apart, 8 per day, 40 at most on the free tier
const FORECAST_STEPS_PER_DAY: u32 = 8;
const MAX_FORECAST_STEPS: u32 = 40;

/// A single observation or forecast step, as seen by the alert rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherReading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub wind_speed: f64,
    pub rain_3h: f64,
    pub snow_3h: f64,
    pub weather_code: u32,
    pub description: String,
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self {
            timestamp: DateTime::<Utc>::default(),
            temperature: BENIGN_TEMPERATURE_C,
            wind_speed: 0.0,
            rain_3h: 0.0,
            snow_3h: 0.0,
            weather_code: CLEAR_SKY_CODE,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentWeather {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub description: String,
    pub icon: String,
    pub weather_code: u32,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub clouds: f64,
    pub rain_1h: f64,
    pub snow_1h: f64,
    pub observed_at: DateTime<Utc>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub description: String,
    pub icon: String,
    pub weather_code: u32,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub clouds: f64,
    pub rain_3h: f64,
    pub snow_3h: f64,
}

impl ForecastEntry {
    pub fn reading(&self) -> WeatherReading {
        WeatherReading {
            timestamp: self.timestamp,
            temperature: self.temperature,
            wind_speed: self.wind_speed,
            rain_3h: self.rain_3h,
            snow_3h: self.snow_3h,
            weather_code: self.weather_code,
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeoLocation {
    pub name: String,
    pub local_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub state: Option<String>,
}

/// Alert published by the provider itself (One Call API)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderAlert {
    pub sender: String,
    pub event: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tags: Vec<String>,
}

fn benign_temperature() -> f64 {
    BENIGN_TEMPERATURE_C
}

fn clear_sky_code() -> u32 {
    CLEAR_SKY_CODE
}

#[derive(Debug, Deserialize)]
struct OwMain {
    #[serde(default = "benign_temperature")]
    temp: f64,
    #[serde(default = "benign_temperature")]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

impl Default for OwMain {
    fn default() -> Self {
        Self {
            temp: BENIGN_TEMPERATURE_C,
            feels_like: BENIGN_TEMPERATURE_C,
            humidity: 0.0,
            pressure: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default = "clear_sky_code")]
    id: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwPrecipitation {
    #[serde(rename = "1h", default)]
    one_hour: f64,
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCoord {
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    #[serde(default)]
    sys: OwSys,
    #[serde(default)]
    coord: OwCoord,
    #[serde(default)]
    rain: OwPrecipitation,
    #[serde(default)]
    snow: OwPrecipitation,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    #[serde(default)]
    rain: OwPrecipitation,
    #[serde(default)]
    snow: OwPrecipitation,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    local_names: HashMap<String, String>,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwAlert {
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    start: i64,
    #[serde(default)]
    end: i64,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwOneCallResponse {
    #[serde(default)]
    alerts: Vec<OwAlert>,
}

/// Client for the OpenWeatherMap current weather, forecast, geocoding and One Call APIs
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    geo_url: String,
    onecall_url: String,
    units: String,
    lang: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, base_url: String, geo_url: String, onecall_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            geo_url: geo_url.trim_end_matches('/').to_string(),
            onecall_url,
            units: "metric".to_string(),
            lang: "fr".to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openweather_api_key.clone(),
            config.openweather_base_url.clone(),
            config.openweather_geo_url.clone(),
            config.openweather_onecall_url.clone(),
        )
    }

    #[instrument(skip(self), fields(city = %city, country = %country_code))]
    pub async fn current_weather(
        &self,
        city: &str,
        country_code: &str,
    ) -> Result<CurrentWeather, FetchError> {
        let url = format!("{}/weather", self.base_url);
        let body = self
            .get(&url, &[("q", format!("{city},{country_code}"))])
            .await?;
        parse_current(&body)
    }

    #[instrument(skip(self))]
    pub async fn weather_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentWeather, FetchError> {
        let url = format!("{}/weather", self.base_url);
        let body = self
            .get(&url, &[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await?;
        parse_current(&body)
    }

    #[instrument(skip(self), fields(city = %city, country = %country_code, days = days))]
    pub async fn forecast(
        &self,
        city: &str,
        country_code: &str,
        days: u32,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        let url = format!("{}/forecast", self.base_url);
        let steps = (days * FORECAST_STEPS_PER_DAY).clamp(1, MAX_FORECAST_STEPS);
        let body = self
            .get(
                &url,
                &[
                    ("q", format!("{city},{country_code}")),
                    ("cnt", steps.to_string()),
                ],
            )
            .await?;
        parse_forecast(&body)
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeoLocation>, FetchError> {
        let url = format!("{}/direct", self.geo_url);
        let body = self
            .get(&url, &[("q", query.to_string()), ("limit", limit.to_string())])
            .await?;
        parse_geocoding(&body, &self.lang)
    }

    #[instrument(skip(self))]
    pub async fn provider_alerts(&self, lat: f64, lon: f64) -> Result<Vec<ProviderAlert>, FetchError> {
        let body = self
            .get(
                &self.onecall_url,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("exclude", "minutely,hourly".to_string()),
                ],
            )
            .await?;
        parse_provider_alerts(&body)
    }

    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("appid", self.api_key.as_str()));
        query.push(("units", self.units.as_str()));
        query.push(("lang", self.lang.as_str()));

        debug!("Sending HTTP request to {}", url);
        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            warn!("OpenWeatherMap returned {}: {}", status, truncate_body(&body));
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        debug!("Retrieved JSON content, size: {} bytes", body.len());
        Ok(body)
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn parse_current(body: &str) -> Result<CurrentWeather, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;
    let condition = parsed.weather.into_iter().next();
    let (weather_code, description, icon) = match condition {
        Some(w) => (w.id, w.description, w.icon),
        None => (CLEAR_SKY_CODE, String::new(), String::new()),
    };

    Ok(CurrentWeather {
        city: parsed.name,
        country: parsed.sys.country,
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity: parsed.main.humidity,
        pressure: parsed.main.pressure,
        description,
        icon,
        weather_code,
        wind_speed: parsed.wind.speed,
        wind_direction: parsed.wind.deg,
        clouds: parsed.clouds.all,
        rain_1h: parsed.rain.one_hour,
        snow_1h: parsed.snow.one_hour,
        observed_at: unix_to_utc(parsed.dt).unwrap_or_else(Utc::now),
        sunrise: parsed.sys.sunrise.and_then(unix_to_utc),
        sunset: parsed.sys.sunset.and_then(unix_to_utc),
        latitude: parsed.coord.lat,
        longitude: parsed.coord.lon,
    })
}

fn parse_forecast(body: &str) -> Result<Vec<ForecastEntry>, FetchError> {
    let parsed: OwForecastResponse = serde_json::from_str(body)?;
    let mut entries = Vec::with_capacity(parsed.list.len());
    let mut skipped = 0;

    for item in parsed.list {
        let Some(timestamp) = unix_to_utc(item.dt) else {
            skipped += 1;
            continue;
        };
        let condition = item.weather.into_iter().next();
        let (weather_code, description, icon) = match condition {
            Some(w) => (w.id, w.description, w.icon),
            None => (CLEAR_SKY_CODE, String::new(), String::new()),
        };

        entries.push(ForecastEntry {
            timestamp,
            temperature: item.main.temp,
            feels_like: item.main.feels_like,
            humidity: item.main.humidity,
            pressure: item.main.pressure,
            description,
            icon,
            weather_code,
            wind_speed: item.wind.speed,
            wind_direction: item.wind.deg,
            clouds: item.clouds.all,
            rain_3h: item.rain.three_hours,
            snow_3h: item.snow.three_hours,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} forecast entries with invalid timestamps", skipped);
    }
    debug!("Parsed {} forecast entries", entries.len());
    Ok(entries)
}

fn parse_geocoding(body: &str, lang: &str) -> Result<Vec<GeoLocation>, FetchError> {
    let parsed: Vec<OwGeoEntry> = serde_json::from_str(body)?;
    Ok(parsed
        .into_iter()
        .map(|entry| GeoLocation {
            local_name: entry.local_names.get(lang).cloned(),
            name: entry.name,
            latitude: entry.lat,
            longitude: entry.lon,
            country: entry.country,
            state: entry.state,
        })
        .collect())
}

fn parse_provider_alerts(body: &str) -> Result<Vec<ProviderAlert>, FetchError> {
    let parsed: OwOneCallResponse = serde_json::from_str(body)?;
    let mut alerts = Vec::with_capacity(parsed.alerts.len());

    for alert in parsed.alerts {
        let (Some(start), Some(end)) = (unix_to_utc(alert.start), unix_to_utc(alert.end)) else {
            warn!(
                "Skipping provider alert {:?} with invalid period start={} end={}",
                alert.event, alert.start, alert.end
            );
            continue;
        };
        alerts.push(ProviderAlert {
            sender: alert.sender_name,
            event: alert.event,
            description: alert.description,
            start,
            end,
            tags: alert.tags,
        });
    }

    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_SAMPLE: &str = r#"{
        "coord": {"lon": 2.3488, "lat": 48.8534},
        "weather": [{"id": 500, "main": "Rain", "description": "légère pluie", "icon": "10d"}],
        "main": {"temp": 14.2, "feels_like": 13.6, "pressure": 1012, "humidity": 81},
        "wind": {"speed": 4.6, "deg": 220},
        "rain": {"1h": 0.35},
        "clouds": {"all": 75},
        "dt": 1700000000,
        "sys": {"country": "FR", "sunrise": 1699944000, "sunset": 1699977600},
        "name": "Paris"
    }"#;

    const FORECAST_SAMPLE: &str = r#"{
        "cod": "200",
        "cnt": 2,
        "list": [
            {
                "dt": 1700000000,
                "main": {"temp": 9.5, "feels_like": 7.0, "pressure": 1004, "humidity": 90},
                "weather": [{"id": 502, "description": "forte pluie", "icon": "10n"}],
                "wind": {"speed": 12.3, "deg": 250},
                "clouds": {"all": 100},
                "rain": {"3h": 9.1}
            },
            {
                "dt": 1700010800,
                "main": {"temp": 8.1},
                "weather": [],
                "wind": {"speed": 6.0}
            }
        ],
        "city": {"name": "Brest", "country": "FR"}
    }"#;

    #[test]
    fn test_parse_current() {
        let weather = parse_current(CURRENT_SAMPLE).unwrap();
        assert_eq!(weather.city, "Paris");
        assert_eq!(weather.country, "FR");
        assert_eq!(weather.temperature, 14.2);
        assert_eq!(weather.weather_code, 500);
        assert_eq!(weather.description, "légère pluie");
        assert_eq!(weather.rain_1h, 0.35);
        assert_eq!(weather.snow_1h, 0.0);
        assert_eq!(weather.observed_at.timestamp(), 1_700_000_000);
        assert!(weather.sunrise.is_some());
    }

    #[test]
    fn test_parse_current_missing_fields_are_benign() {
        let weather = parse_current(r#"{"name": "Nulle-Part"}"#).unwrap();
        assert_eq!(weather.temperature, BENIGN_TEMPERATURE_C);
        assert_eq!(weather.wind_speed, 0.0);
        assert_eq!(weather.weather_code, CLEAR_SKY_CODE);
        assert!(weather.sunrise.is_none());
    }

    #[test]
    fn test_parse_forecast() {
        let entries = parse_forecast(FORECAST_SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rain_3h, 9.1);
        assert_eq!(entries[0].weather_code, 502);
        assert_eq!(entries[0].wind_speed, 12.3);

        // Second entry has no weather block and no humidity
        assert_eq!(entries[1].weather_code, CLEAR_SKY_CODE);
        assert_eq!(entries[1].rain_3h, 0.0);
        assert_eq!(entries[1].temperature, 8.1);
    }

    #[test]
    fn test_forecast_entry_reading() {
        let entries = parse_forecast(FORECAST_SAMPLE).unwrap();
        let reading = entries[0].reading();
        assert_eq!(reading.rain_3h, 9.1);
        assert_eq!(reading.timestamp, entries[0].timestamp);
        assert_eq!(reading.description, "forte pluie");
    }

    #[test]
    fn test_parse_forecast_invalid_json() {
        let result = parse_forecast("<html>oops</html>");
        assert!(matches!(result, Err(FetchError::Json(_))));
    }

    #[test]
    fn test_parse_geocoding_prefers_french_name() {
        let body = r#"[
            {"name": "Lyon", "local_names": {"fr": "Lyon", "en": "Lyons"}, "lat": 45.75, "lon": 4.85, "country": "FR", "state": "Auvergne-Rhône-Alpes"}
        ]"#;
        let locations = parse_geocoding(body, "fr").unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].local_name.as_deref(), Some("Lyon"));
        assert_eq!(locations[0].state.as_deref(), Some("Auvergne-Rhône-Alpes"));
    }

    #[test]
    fn test_parse_provider_alerts() {
        let body = r#"{
            "lat": 48.85, "lon": 2.35,
            "alerts": [{
                "sender_name": "METEO-FRANCE",
                "event": "Moderate thunderstorm warning",
                "start": 1700000000,
                "end": 1700040000,
                "description": "Orages localement violents",
                "tags": ["Thunderstorm"]
            }]
        }"#;
        let alerts = parse_provider_alerts(body).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sender, "METEO-FRANCE");
        assert_eq!(alerts[0].tags, vec!["Thunderstorm".to_string()]);
        assert!(alerts[0].end > alerts[0].start);
    }

    #[test]
    fn test_parse_provider_alerts_skips_invalid_period() {
        let body = r#"{
            "alerts": [
                {"event": "Vent violent", "start": 9223372036854775807, "end": 1700040000},
                {"event": "Canicule", "start": 1700000000, "end": 1700040000},
                {"event": "Orages", "start": 1700000000, "end": -9223372036854775807}
            ]
        }"#;
        let alerts = parse_provider_alerts(body).unwrap();
        let events: Vec<_> = alerts.iter().map(|a| a.event.as_str()).collect();
        assert_eq!(events, vec!["Canicule"]);
    }

    #[test]
    fn test_parse_provider_alerts_none() {
        let alerts = parse_provider_alerts(r#"{"lat": 48.85, "lon": 2.35}"#).unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_default_reading_is_benign() {
        let reading = WeatherReading::default();
        assert_eq!(reading.temperature, 20.0);
        assert_eq!(reading.wind_speed, 0.0);
        assert_eq!(reading.weather_code, 800);
    }
}
