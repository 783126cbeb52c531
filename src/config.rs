use std::env;

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_OPENWEATHER_GEO_URL: &str = "https://api.openweathermap.org/geo/1.0";
pub const DEFAULT_OPENWEATHER_ONECALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
pub const DEFAULT_VIGILANCE_API_URL: &str =
    "https://public-api.meteofrance.fr/public/DPVigilance/v1/textesvigilance/encours";
pub const DEFAULT_VIGILANCE_MAP_URL: &str =
    "https://vigilance.meteofrance.fr/fr/carte-de-vigilance.json";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_geo_url: String,
    pub openweather_onecall_url: String,
    pub vigilance_api_url: String,
    pub vigilance_map_url: String,
    pub vigilance_api_key: Option<String>,
    pub jwt_secret: String,
    pub token_expire_secs: u64,
    pub max_forecast_alerts: usize,
    pub alert_sync_interval_minutes: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            openweather_api_key: env::var("OPENWEATHER_API_KEY")?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_BASE_URL.to_string()),
            openweather_geo_url: env::var("OPENWEATHER_GEO_URL")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_GEO_URL.to_string()),
            openweather_onecall_url: env::var("OPENWEATHER_ONECALL_URL")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_ONECALL_URL.to_string()),
            vigilance_api_url: env::var("VIGILANCE_API_URL")
                .unwrap_or_else(|_| DEFAULT_VIGILANCE_API_URL.to_string()),
            vigilance_map_url: env::var("VIGILANCE_MAP_URL")
                .unwrap_or_else(|_| DEFAULT_VIGILANCE_MAP_URL.to_string()),
            vigilance_api_key: env::var("VIGILANCE_API_KEY").ok().filter(|k| !k.is_empty()),
            jwt_secret: env::var("JWT_SECRET")?,
            token_expire_secs: env::var("TOKEN_EXPIRE_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
            max_forecast_alerts: env::var("MAX_FORECAST_ALERTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            alert_sync_interval_minutes: env::var("ALERT_SYNC_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|minutes| *minutes > 0),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

// Secrets stay out of the startup log line.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("openweather_base_url", &self.openweather_base_url)
            .field("vigilance_api_url", &self.vigilance_api_url)
            .field("vigilance_map_url", &self.vigilance_map_url)
            .field("vigilance_api_key", &self.vigilance_api_key.as_ref().map(|_| "***"))
            .field("token_expire_secs", &self.token_expire_secs)
            .field("max_forecast_alerts", &self.max_forecast_alerts)
            .field("alert_sync_interval_minutes", &self.alert_sync_interval_minutes)
            .finish_non_exhaustive()
    }
}
