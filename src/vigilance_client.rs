//! Météo-France vigilance: text bulletin API and public vigilance map.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::fetch_error::{truncate_body, FetchError};
use crate::geo;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum VigilanceLevel {
    Green = 1,
    Yellow = 2,
    Orange = 3,
    Red = 4,
}

impl VigilanceLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Green),
            2 => Some(Self::Yellow),
            3 => Some(Self::Orange),
            4 => Some(Self::Red),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Colour name as published by Météo-France
    pub fn colour(self) -> &'static str {
        match self {
            Self::Green => "Vert",
            Self::Yellow => "Jaune",
            Self::Orange => "Orange",
            Self::Red => "Rouge",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            Self::Green => "Pas de vigilance particulière",
            Self::Yellow => "Soyez attentif",
            Self::Orange => "Soyez très vigilant",
            Self::Red => "Vigilance absolue",
        }
    }

    /// Only orange and red vigilance gets stored as alerts
    pub fn is_alerting(self) -> bool {
        self >= Self::Orange
    }
}

impl fmt::Display for VigilanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.colour(), self.advice())
    }
}

/// Phenomenon names used by the vigilance map, indexed by phenomenon id
pub fn phenomenon_name(id: u8) -> Option<&'static str> {
    match id {
        1 => Some("Vent violent"),
        2 => Some("Pluie-inondation"),
        3 => Some("Orages"),
        4 => Some("Crues"),
        5 => Some("Neige-verglas"),
        6 => Some("Canicule"),
        7 => Some("Grand froid"),
        8 => Some("Avalanches"),
        9 => Some("Vagues-submersion"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VigilanceAlert {
    pub hazard: String,
    pub department_code: String,
    pub department_name: String,
    pub region: String,
    pub description: String,
    pub level: VigilanceLevel,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl VigilanceAlert {
    /// Label of the stored alert type, e.g. "Vigilance Orange - Orages"
    pub fn type_label(&self) -> String {
        format!("Vigilance {} - {}", self.level.colour(), self.hazard)
    }
}

// Bulletin document

#[derive(Debug, Deserialize)]
struct Bulletin {
    product: BulletinProduct,
}

#[derive(Debug, Default, Deserialize)]
struct BulletinProduct {
    #[serde(default)]
    text_bloc_items: Vec<TextBloc>,
}

#[derive(Debug, Deserialize)]
struct TextBloc {
    #[serde(default)]
    domain_id: Value,
    #[serde(default)]
    domain_name: Option<String>,
    #[serde(default)]
    bloc_items: Vec<BlocItem>,
}

#[derive(Debug, Deserialize)]
struct BlocItem {
    #[serde(default)]
    text_items: Vec<TextItem>,
}

#[derive(Debug, Deserialize)]
struct TextItem {
    #[serde(default)]
    hazard_name: Option<String>,
    #[serde(default)]
    term_items: Vec<TermItem>,
}

#[derive(Debug, Deserialize)]
struct TermItem {
    #[serde(default)]
    risk_code: Value,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    subdivision_text: Vec<SubdivisionText>,
}

#[derive(Debug, Deserialize)]
struct SubdivisionText {
    #[serde(default)]
    bold_text: Option<String>,
    #[serde(default)]
    text: Vec<String>,
}

// Map document

#[derive(Debug, Deserialize)]
struct VigilanceMap {
    #[serde(default)]
    meta: Option<MapMeta>,
    #[serde(default)]
    data: Option<MapData>,
}

#[derive(Debug, Deserialize)]
struct MapMeta {
    #[serde(default)]
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapData {
    #[serde(default)]
    departments: Vec<MapDepartment>,
}

#[derive(Debug, Deserialize)]
struct MapDepartment {
    #[serde(default)]
    department_code: Value,
    #[serde(default)]
    department_name: Option<String>,
    #[serde(default)]
    phenomenons_items: Vec<MapPhenomenon>,
}

#[derive(Debug, Deserialize)]
struct MapPhenomenon {
    #[serde(default)]
    phenomenon_id: Value,
    #[serde(default)]
    phenomenon_max_level: Value,
}

/// Codes and levels come either as strings or as numbers
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u8(value: &Value) -> Option<u8> {
    value_as_string(value)?.parse().ok()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FetchError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| FetchError::DateTimeError(format!("{raw}: {e}")))
}

fn optional_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match parse_timestamp(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("Ignoring vigilance time: {}", e);
            None
        }
    }
}

fn describe_term(term: &TermItem) -> String {
    term.subdivision_text
        .iter()
        .flat_map(|sub| sub.bold_text.iter().chain(sub.text.iter()))
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the first alert for each (region, hazard, level)
fn dedupe(alerts: Vec<VigilanceAlert>) -> Vec<VigilanceAlert> {
    let mut seen = HashSet::new();
    alerts
        .into_iter()
        .filter(|a| seen.insert((a.region.clone(), a.hazard.clone(), a.level)))
        .collect()
}

/// Parse a DPVigilance text bulletin into flat alerts
pub fn parse_bulletin(body: &str) -> Result<Vec<VigilanceAlert>, FetchError> {
    let bulletin: Bulletin = serde_json::from_str(body)?;
    let mut alerts = Vec::new();

    for bloc in &bulletin.product.text_bloc_items {
        let Some(code) = value_as_string(&bloc.domain_id) else {
            continue;
        };
        let Some(dept) = geo::department(&code) else {
            debug!("Skipping bulletin block for domain {}", code);
            continue;
        };
        let department_name = bloc
            .domain_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| dept.name.to_string());

        for text_item in bloc.bloc_items.iter().flat_map(|b| b.text_items.iter()) {
            let hazard = text_item
                .hazard_name
                .as_deref()
                .map(str::trim)
                .unwrap_or_default();
            if hazard.is_empty() {
                continue;
            }

            for term in &text_item.term_items {
                let Some(level) = value_as_u8(&term.risk_code).and_then(VigilanceLevel::from_level)
                else {
                    debug!("Skipping {} term with risk code {:?}", hazard, term.risk_code);
                    continue;
                };

                alerts.push(VigilanceAlert {
                    hazard: hazard.to_string(),
                    department_code: dept.code.to_string(),
                    department_name: department_name.clone(),
                    region: dept.region.to_string(),
                    description: describe_term(term),
                    level,
                    start: optional_timestamp(term.start_time.as_deref()),
                    end: optional_timestamp(term.end_time.as_deref()),
                });
            }
        }
    }

    Ok(dedupe(alerts))
}

/// Parse the public vigilance map; returns the update time with the alerts
pub fn parse_vigilance_map(
    body: &str,
) -> Result<(DateTime<Utc>, Vec<VigilanceAlert>), FetchError> {
    let map: VigilanceMap = serde_json::from_str(body)?;
    let update_time = map
        .meta
        .and_then(|m| m.update_time)
        .ok_or_else(|| FetchError::Format("missing meta.update_time".to_string()))?;
    let updated_at = parse_timestamp(&update_time)?;

    let mut alerts = Vec::new();
    for department in map.data.map(|d| d.departments).unwrap_or_default() {
        let Some(code) = value_as_string(&department.department_code) else {
            continue;
        };
        let Some(dept) = geo::department(&code) else {
            debug!("Skipping map entry for department {}", code);
            continue;
        };
        let department_name = department
            .department_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| dept.name.to_string());

        for phenomenon in &department.phenomenons_items {
            let Some(hazard) = value_as_u8(&phenomenon.phenomenon_id).and_then(phenomenon_name)
            else {
                continue;
            };
            let Some(level) =
                value_as_u8(&phenomenon.phenomenon_max_level).and_then(VigilanceLevel::from_level)
            else {
                continue;
            };

            alerts.push(VigilanceAlert {
                hazard: hazard.to_string(),
                department_code: dept.code.to_string(),
                department_name: department_name.clone(),
                region: dept.region.to_string(),
                description: format!(
                    "Vigilance {} pour {} dans le département {} ({})",
                    level.colour(),
                    hazard,
                    department_name,
                    dept.code
                ),
                level,
                start: Some(updated_at),
                end: None,
            });
        }
    }

    Ok((updated_at, dedupe(alerts)))
}

#[derive(Clone)]
pub struct VigilanceClient {
    client: reqwest::Client,
    api_url: String,
    map_url: String,
    api_key: Option<String>,
}

impl VigilanceClient {
    pub fn new(api_url: String, map_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            map_url,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.vigilance_api_url.clone(),
            config.vigilance_map_url.clone(),
            config.vigilance_api_key.clone(),
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current text bulletin (requires an API key)
    #[instrument(skip(self))]
    pub async fn fetch_bulletin(&self) -> Result<Vec<VigilanceAlert>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::Format("no vigilance API key configured".to_string()))?;

        let body = self
            .get(
                self.client
                    .get(&self.api_url)
                    .header("apikey", api_key)
                    .header("accept", "application/json"),
            )
            .await?;
        let alerts = parse_bulletin(&body)?;
        debug!("Parsed {} vigilance alerts from bulletin", alerts.len());
        Ok(alerts)
    }

    /// Public vigilance map, no key needed
    #[instrument(skip(self))]
    pub async fn fetch_map(&self) -> Result<(DateTime<Utc>, Vec<VigilanceAlert>), FetchError> {
        let body = self.get(self.client.get(&self.map_url)).await?;
        let (updated_at, alerts) = parse_vigilance_map(&body)?;
        debug!(
            "Parsed {} vigilance alerts from map updated at {}",
            alerts.len(),
            updated_at
        );
        Ok((updated_at, alerts))
    }

    /// Bulletin when a key is configured, map otherwise
    pub async fn fetch_current(&self) -> Result<Vec<VigilanceAlert>, FetchError> {
        if self.has_api_key() {
            self.fetch_bulletin().await
        } else {
            self.fetch_map().await.map(|(_, alerts)| alerts)
        }
    }

    async fn get(&self, request: reqwest::RequestBuilder) -> Result<String, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Vigilance API returned {}: {}", status, truncate_body(&body));
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels() {
        assert_eq!(
            VigilanceLevel::Orange.to_string(),
            "Orange - Soyez très vigilant"
        );
        assert_eq!(VigilanceLevel::from_level(5), None);
        assert!(VigilanceLevel::Red.is_alerting());
        assert!(!VigilanceLevel::Yellow.is_alerting());
    }

    #[test]
    fn test_phenomenon_names() {
        assert_eq!(phenomenon_name(1), Some("Vent violent"));
        assert_eq!(phenomenon_name(9), Some("Vagues-submersion"));
        assert_eq!(phenomenon_name(0), None);
        assert_eq!(phenomenon_name(10), None);
    }

    #[test]
    fn test_bulletin_skips_unknown_domain_and_bad_level() {
        let body = r#"{
          "product": {
            "text_bloc_items": [
              {"domain_id": "FRA", "domain_name": "France",
               "bloc_items": [{"text_items": [{"hazard_name": "Orages",
                 "term_items": [{"risk_code": "3"}]}]}]},
              {"domain_id": "13", "domain_name": "Bouches-du-Rhône",
               "bloc_items": [{"text_items": [
                 {"hazard_name": "", "term_items": [{"risk_code": "3"}]},
                 {"hazard_name": "Orages", "term_items": [
                   {"risk_code": "x"},
                   {"risk_code": 3, "start_time": "2025-08-12T14:00:00Z",
                    "end_time": "2025-08-13T06:00:00Z",
                    "subdivision_text": [{"bold_text": "Qualification :", "text": ["Orages forts", " "]}]}
                 ]}
               ]}]}
            ]
          }
        }"#;

        let alerts = parse_bulletin(body).unwrap();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.department_code, "13");
        assert_eq!(alert.region, geo::PROVENCE_ALPES_COTE_DAZUR);
        assert_eq!(alert.level, VigilanceLevel::Orange);
        assert_eq!(alert.description, "Qualification : Orages forts");
        assert!(alert.start.is_some());
        assert_eq!(alert.type_label(), "Vigilance Orange - Orages");
    }

    #[test]
    fn test_map_requires_update_time() {
        let result = parse_vigilance_map(r#"{"data": {"departments": []}}"#);
        assert!(matches!(result, Err(FetchError::Format(_))));
    }

    #[test]
    fn test_map_string_levels() {
        let body = r#"{
          "meta": {"update_time": "2025-01-09T16:00:00+01:00"},
          "data": {"departments": [
            {"department_code": "29", "department_name": "Finistère", "vigilance_level": "3",
             "phenomenons_items": [
               {"phenomenon_id": "1", "phenomenon_max_level": "3"},
               {"phenomenon_id": "42", "phenomenon_max_level": "4"}
             ]}
          ]}
        }"#;

        let (updated_at, alerts) = parse_vigilance_map(body).unwrap();
        assert_eq!(updated_at.to_rfc3339(), "2025-01-09T15:00:00+00:00");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].hazard, "Vent violent");
        assert_eq!(alerts[0].region, geo::BRETAGNE);
        assert!(alerts[0].description.contains("Finistère (29)"));
    }
}
