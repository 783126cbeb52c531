use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

// Database entity models
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Region {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Department {
    pub id: i64,
    pub code: String,
    pub label: String,
    pub region_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct City {
    pub id: i64,
    pub label: String,
    pub department_id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// City joined with its department and region
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CityDetails {
    pub id: i64,
    pub label: String,
    pub department_code: String,
    pub department_label: String,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct TypeAlert {
    pub id: i64,
    pub label: String,
}

/// Stored alert joined with its type label
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Alert {
    pub id: i64,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub region: String,
    pub department_code: Option<String>,
    pub description: String,
    pub active: bool,
    #[serde(rename = "date")]
    pub date_alert: NaiveDate,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub city_id: Option<i64>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct WeatherRecord {
    pub id: i64,
    pub city_id: i64,
    pub date_weather: NaiveDate,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub sky: Option<String>,
}

// Write models
pub const SOURCE_FORECAST: &str = "forecast";
pub const SOURCE_PROVIDER: &str = "provider";
pub const SOURCE_VIGILANCE: &str = "vigilance";
pub const SOURCE_MANUAL: &str = "manual";

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub type_label: String,
    pub region: String,
    pub department_code: Option<String>,
    pub description: String,
    pub date_alert: NaiveDate,
    pub source: String,
}

/// Longest description the alerts table accepts
pub const MAX_DESCRIPTION_CHARS: usize = 255;

impl NewAlert {
    /// Description cut to the column width on a char boundary
    pub fn truncated_description(&self) -> &str {
        match self.description.char_indices().nth(MAX_DESCRIPTION_CHARS) {
            Some((idx, _)) => &self.description[..idx],
            None => &self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyWeather {
    pub city_id: i64,
    pub date_weather: NaiveDate,
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub sky: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AlertFilter {
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub active: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

// API response DTOs
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegionWithDepartments {
    pub id: i64,
    pub label: String,
    pub departments: Vec<Department>,
}
