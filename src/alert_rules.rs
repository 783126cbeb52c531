//! Threshold rules classifying weather readings into named alert events.
//!
//! Rules are evaluated in a fixed priority order (dangerous phenomena, then
//! precipitation, wind, temperature and finally other conditions). The first
//! matching rule wins, so a reading produces at most one alert. Over a forecast
//! series, alerts are grouped by event and only the most severe one is kept.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::severity::{contains_severe_keyword, Severity};
use crate::weather_client::WeatherReading;

/// Default cap on the number of distinct events returned for a series
pub const DEFAULT_MAX_ALERTS: usize = 5;
/// Forecast steps cover 3 hours
const READING_SPAN_HOURS: i64 = 3;

const TORNADO_CODES: &[u32] = &[781];
const SQUALL_CODES: &[u32] = &[771];
const SEVERE_THUNDERSTORM_CODES: &[u32] = &[202, 212, 221, 232];
const FOG_CODES: &[u32] = &[741];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    DangerousPhenomenon,
    Precipitation,
    Wind,
    Temperature,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Tornado,
    Storm,
    SevereThunderstorm,
    TorrentialRain,
    HeavyRain,
    HeavySnow,
    Gale,
    StrongWind,
    Heatwave,
    Hot,
    SevereCold,
    Frost,
    Fog,
}

impl AlertKind {
    pub const ALL: [AlertKind; 13] = [
        Self::Tornado,
        Self::Storm,
        Self::SevereThunderstorm,
        Self::TorrentialRain,
        Self::HeavyRain,
        Self::HeavySnow,
        Self::Gale,
        Self::StrongWind,
        Self::Heatwave,
        Self::Hot,
        Self::SevereCold,
        Self::Frost,
        Self::Fog,
    ];

    /// Event label, also used as the alert type label in the database
    pub fn label(self) -> &'static str {
        match self {
            Self::Tornado => "Tornade",
            Self::Storm => "Tempête",
            Self::SevereThunderstorm => "Orages forts",
            Self::TorrentialRain => "Pluies torrentielles",
            Self::HeavyRain => "Fortes pluies",
            Self::HeavySnow => "Fortes chutes de neige",
            Self::Gale => "Coup de vent",
            Self::StrongWind => "Vent fort",
            Self::Heatwave => "Canicule",
            Self::Hot => "Fortes chaleurs",
            Self::SevereCold => "Grand froid",
            Self::Frost => "Gel",
            Self::Fog => "Brouillard",
        }
    }

    pub fn category(self) -> RuleCategory {
        match self {
            Self::Tornado | Self::Storm | Self::SevereThunderstorm => {
                RuleCategory::DangerousPhenomenon
            }
            Self::TorrentialRain | Self::HeavyRain | Self::HeavySnow => RuleCategory::Precipitation,
            Self::Gale | Self::StrongWind => RuleCategory::Wind,
            Self::Heatwave | Self::Hot | Self::SevereCold | Self::Frost => RuleCategory::Temperature,
            Self::Fog => RuleCategory::Other,
        }
    }
}

/// Threshold table; precipitation in mm over 3h, wind in m/s, temperature in °C
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub torrential_rain_mm: f64,
    pub torrential_rain_extreme_mm: f64,
    pub heavy_rain_mm: f64,
    pub heavy_snow_mm: f64,
    pub heavy_snow_extreme_mm: f64,
    pub gale_ms: f64,
    pub gale_extreme_ms: f64,
    pub strong_wind_ms: f64,
    pub heatwave_c: f64,
    pub heatwave_extreme_c: f64,
    pub hot_c: f64,
    pub severe_cold_c: f64,
    pub severe_cold_extreme_c: f64,
    pub frost_c: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            torrential_rain_mm: 15.0,
            torrential_rain_extreme_mm: 30.0,
            heavy_rain_mm: 7.5,
            heavy_snow_mm: 5.0,
            heavy_snow_extreme_mm: 10.0,
            gale_ms: 17.2,
            gale_extreme_ms: 24.5,
            strong_wind_ms: 10.8,
            heatwave_c: 32.0,
            heatwave_extreme_c: 38.0,
            hot_c: 28.0,
            severe_cold_c: -5.0,
            severe_cold_extreme_c: -10.0,
            frost_c: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    WeatherCodes(&'static [u32]),
    RainAbove(f64),
    SnowAbove(f64),
    WindAbove(f64),
    TemperatureAbove(f64),
    TemperatureBelow(f64),
}

impl Condition {
    fn matches(&self, reading: &WeatherReading) -> bool {
        match *self {
            Self::WeatherCodes(codes) => codes.contains(&reading.weather_code),
            Self::RainAbove(limit) => reading.rain_3h > limit,
            Self::SnowAbove(limit) => reading.snow_3h > limit,
            Self::WindAbove(limit) => reading.wind_speed > limit,
            Self::TemperatureAbove(limit) => reading.temperature > limit,
            Self::TemperatureBelow(limit) => reading.temperature < limit,
        }
    }

    /// Whether the reading reaches `extreme` in the direction of this condition
    fn reaches(&self, reading: &WeatherReading, extreme: f64) -> bool {
        match self {
            Self::WeatherCodes(_) => false,
            Self::RainAbove(_) => reading.rain_3h >= extreme,
            Self::SnowAbove(_) => reading.snow_3h >= extreme,
            Self::WindAbove(_) => reading.wind_speed >= extreme,
            Self::TemperatureAbove(_) => reading.temperature >= extreme,
            Self::TemperatureBelow(_) => reading.temperature <= extreme,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub kind: AlertKind,
    pub severity: Severity,
    pub condition: Condition,
    /// Past this level the rule escalates one severity step
    pub extreme: Option<f64>,
}

impl AlertRule {
    fn new(kind: AlertKind, severity: Severity, condition: Condition) -> Self {
        Self {
            kind,
            severity,
            condition,
            extreme: None,
        }
    }

    fn with_extreme(mut self, extreme: f64) -> Self {
        self.extreme = Some(extreme);
        self
    }

    pub fn matches(&self, reading: &WeatherReading) -> bool {
        self.condition.matches(reading)
    }

    fn is_extreme(&self, reading: &WeatherReading) -> bool {
        self.extreme
            .is_some_and(|extreme| self.condition.reaches(reading, extreme))
    }

    pub fn apply(&self, reading: &WeatherReading) -> Option<ForecastAlert> {
        if !self.matches(reading) {
            return None;
        }

        let extreme = self.is_extreme(reading);
        let severity = if extreme {
            self.severity.escalate()
        } else {
            self.severity
        };

        Some(ForecastAlert {
            event: self.kind.label().to_string(),
            kind: self.kind,
            severity,
            description: describe(self.kind, reading, extreme),
            start: reading.timestamp,
            end: reading.timestamp + Duration::hours(READING_SPAN_HOURS),
        })
    }
}

fn describe(kind: AlertKind, reading: &WeatherReading, extreme: bool) -> String {
    let wind_kmh = reading.wind_speed * 3.6;
    match (kind, extreme) {
        (AlertKind::Tornado, _) => "Risque de tornade".to_string(),
        (AlertKind::Storm, _) => format!(
            "Tempête avec grains : rafales à {:.1} m/s ({:.0} km/h)",
            reading.wind_speed, wind_kmh
        ),
        (AlertKind::SevereThunderstorm, _) if reading.description.is_empty() => {
            "Orages forts attendus".to_string()
        }
        (AlertKind::SevereThunderstorm, _) => format!("Orages forts : {}", reading.description),
        (AlertKind::TorrentialRain, true) => format!(
            "Pluies torrentielles exceptionnelles : {:.1} mm en 3h",
            reading.rain_3h
        ),
        (AlertKind::TorrentialRain, false) => {
            format!("Pluies torrentielles : {:.1} mm en 3h", reading.rain_3h)
        }
        (AlertKind::HeavyRain, _) => format!("Fortes pluies : {:.1} mm en 3h", reading.rain_3h),
        (AlertKind::HeavySnow, true) => format!(
            "Chutes de neige exceptionnelles : {:.1} mm en 3h",
            reading.snow_3h
        ),
        (AlertKind::HeavySnow, false) => format!(
            "Chutes de neige importantes : {:.1} mm en 3h",
            reading.snow_3h
        ),
        (AlertKind::Gale, true) => format!(
            "Vent violent : {:.1} m/s ({:.0} km/h)",
            reading.wind_speed, wind_kmh
        ),
        (AlertKind::Gale, false) => format!(
            "Coup de vent : {:.1} m/s ({:.0} km/h)",
            reading.wind_speed, wind_kmh
        ),
        (AlertKind::StrongWind, _) => format!(
            "Vent fort : {:.1} m/s ({:.0} km/h)",
            reading.wind_speed, wind_kmh
        ),
        (AlertKind::Heatwave, true) => {
            format!("Canicule exceptionnelle : {:.1} °C", reading.temperature)
        }
        (AlertKind::Heatwave, false) => format!("Canicule : {:.1} °C", reading.temperature),
        (AlertKind::Hot, _) => format!("Fortes chaleurs : {:.1} °C", reading.temperature),
        (AlertKind::SevereCold, true) => {
            format!("Grand froid exceptionnel : {:.1} °C", reading.temperature)
        }
        (AlertKind::SevereCold, false) => format!("Grand froid : {:.1} °C", reading.temperature),
        (AlertKind::Frost, _) => format!("Gel : {:.1} °C", reading.temperature),
        (AlertKind::Fog, _) => "Brouillard : visibilité réduite".to_string(),
    }
}

/// Alert derived from a forecast reading
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastAlert {
    pub event: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Build the ordered rule list for a threshold table
pub fn build_rules(t: &Thresholds) -> Vec<AlertRule> {
    use AlertKind::*;
    use Condition::*;

    let mut rules = vec![
        AlertRule::new(Tornado, Severity::Extreme, WeatherCodes(TORNADO_CODES)),
        AlertRule::new(Storm, Severity::High, WeatherCodes(SQUALL_CODES)),
        AlertRule::new(
            SevereThunderstorm,
            Severity::High,
            WeatherCodes(SEVERE_THUNDERSTORM_CODES),
        ),
        AlertRule::new(TorrentialRain, Severity::High, RainAbove(t.torrential_rain_mm))
            .with_extreme(t.torrential_rain_extreme_mm),
        AlertRule::new(HeavyRain, Severity::Moderate, RainAbove(t.heavy_rain_mm)),
        AlertRule::new(HeavySnow, Severity::Moderate, SnowAbove(t.heavy_snow_mm))
            .with_extreme(t.heavy_snow_extreme_mm),
        AlertRule::new(Gale, Severity::High, WindAbove(t.gale_ms)).with_extreme(t.gale_extreme_ms),
        AlertRule::new(StrongWind, Severity::Moderate, WindAbove(t.strong_wind_ms)),
        AlertRule::new(Heatwave, Severity::High, TemperatureAbove(t.heatwave_c))
            .with_extreme(t.heatwave_extreme_c),
        AlertRule::new(Hot, Severity::Low, TemperatureAbove(t.hot_c)),
        AlertRule::new(SevereCold, Severity::High, TemperatureBelow(t.severe_cold_c))
            .with_extreme(t.severe_cold_extreme_c),
        AlertRule::new(Frost, Severity::Low, TemperatureBelow(t.frost_c)),
        AlertRule::new(Fog, Severity::Low, WeatherCodes(FOG_CODES)),
    ];

    // Stable sort keeps the in-category order above
    rules.sort_by_key(|rule| rule.kind.category());
    rules
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<AlertRule>,
    max_alerts: usize,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(&Thresholds::default(), DEFAULT_MAX_ALERTS)
    }
}

impl RuleEngine {
    pub fn new(thresholds: &Thresholds, max_alerts: usize) -> Self {
        Self {
            rules: build_rules(thresholds),
            max_alerts,
        }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn max_alerts(&self) -> usize {
        self.max_alerts
    }

    /// First matching rule wins
    pub fn classify(&self, reading: &WeatherReading) -> Option<ForecastAlert> {
        self.rules.iter().find_map(|rule| rule.apply(reading))
    }

    /// Classify a series, keep the most severe alert per event, most severe first
    pub fn evaluate(&self, readings: &[WeatherReading]) -> Vec<ForecastAlert> {
        let alerts: Vec<ForecastAlert> = readings.iter().filter_map(|r| self.classify(r)).collect();
        let mut kept = keep_most_severe(alerts);
        kept.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.start.cmp(&b.start)));
        kept.truncate(self.max_alerts);
        kept
    }
}

/// One alert per event kind. On equal severity an alert with severe wording
/// replaces one without, otherwise the earliest is kept.
pub fn keep_most_severe(alerts: Vec<ForecastAlert>) -> Vec<ForecastAlert> {
    let mut slots: HashMap<AlertKind, usize> = HashMap::new();
    let mut kept: Vec<ForecastAlert> = Vec::new();

    for alert in alerts {
        match slots.get(&alert.kind) {
            Some(&idx) => {
                let current = &kept[idx];
                let more_severe = alert.severity > current.severity;
                let better_worded = alert.severity == current.severity
                    && contains_severe_keyword(&alert.description)
                    && !contains_severe_keyword(&current.description);
                if more_severe || better_worded {
                    kept[idx] = alert;
                }
            }
            None => {
                slots.insert(alert.kind, kept.len());
                kept.push(alert);
            }
        }
    }

    kept
}
