// Upstream clients against a mocked HTTP server

use meteo_alert_service::fetch_error::FetchError;
use meteo_alert_service::services::alert_service::ClassifiedProviderAlert;
use meteo_alert_service::severity::Severity;
use meteo_alert_service::vigilance_client::{VigilanceClient, VigilanceLevel};
use meteo_alert_service::weather_client::OpenWeatherClient;
use mockito::{Matcher, Server};

const API_KEY: &str = "test-key";

fn weather_client(server: &Server) -> OpenWeatherClient {
    OpenWeatherClient::new(
        API_KEY.to_string(),
        server.url(),
        format!("{}/geo", server.url()),
        format!("{}/onecall", server.url()),
    )
}

const CURRENT_BREST: &str = r#"{
    "coord": {"lon": -4.4861, "lat": 48.3904},
    "weather": [{"id": 501, "main": "Rain", "description": "pluie modérée", "icon": "10d"}],
    "main": {"temp": 11.4, "feels_like": 10.2, "pressure": 998, "humidity": 87},
    "wind": {"speed": 14.9, "deg": 250},
    "clouds": {"all": 100},
    "rain": {"1h": 2.1},
    "dt": 1737640800,
    "sys": {"country": "FR", "sunrise": 1737619200, "sunset": 1737651600},
    "name": "Brest"
}"#;

#[tokio::test]
async fn test_current_weather_by_city() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/weather")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Brest,FR".into()),
            Matcher::UrlEncoded("appid".into(), API_KEY.into()),
            Matcher::UrlEncoded("units".into(), "metric".into()),
            Matcher::UrlEncoded("lang".into(), "fr".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CURRENT_BREST)
        .create_async()
        .await;

    let weather = weather_client(&server)
        .current_weather("Brest", "FR")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(weather.city, "Brest");
    assert_eq!(weather.weather_code, 501);
    assert_eq!(weather.description, "pluie modérée");
    assert_eq!(weather.wind_speed, 14.9);
    assert_eq!(weather.rain_1h, 2.1);
    assert_eq!(weather.snow_1h, 0.0);
    assert!(weather.sunrise.is_some());
}

#[tokio::test]
async fn test_forecast_requests_steps_and_fills_defaults() {
    let mut server = Server::new_async().await;
    let body = r#"{"cnt": 2, "list": [
        {"dt": 1737640800, "main": {"temp": 9.0}, "weather": [{"id": 502, "description": "forte pluie"}], "wind": {"speed": 6.0}, "rain": {"3h": 20.5}},
        {"dt": 1737651600}
    ]}"#;
    let mock = server
        .mock("GET", "/forecast")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Quimper,FR".into()),
            Matcher::UrlEncoded("cnt".into(), "16".into()),
        ]))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let entries = weather_client(&server)
        .forecast("Quimper", "FR", 2)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].rain_3h, 20.5);

    // missing fields never look like dangerous weather
    let empty = entries[1].reading();
    assert_eq!(empty.temperature, 20.0);
    assert_eq!(empty.weather_code, 800);
    assert_eq!(empty.rain_3h, 0.0);
    assert_eq!(empty.wind_speed, 0.0);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/weather")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"cod": 401, "message": "Invalid API key"}"#)
        .create_async()
        .await;

    let result = weather_client(&server).current_weather("Brest", "FR").await;
    match result {
        Err(FetchError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/forecast")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let result = weather_client(&server).forecast("Brest", "FR", 1).await;
    assert!(matches!(result, Err(FetchError::Json(_))));
}

#[tokio::test]
async fn test_geocode_prefers_local_name() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/geo/direct")
        .match_query(Matcher::UrlEncoded("q".into(), "Saint-Malo".into()))
        .with_status(200)
        .with_body(
            r#"[{"name": "Saint-Malo", "local_names": {"fr": "Saint-Malo", "br": "Sant-Maloù"},
                 "lat": 48.649, "lon": -2.0257, "country": "FR", "state": "Brittany"}]"#,
        )
        .create_async()
        .await;

    let locations = weather_client(&server).geocode("Saint-Malo", 5).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].local_name.as_deref(), Some("Saint-Malo"));
    assert_eq!(locations[0].state.as_deref(), Some("Brittany"));
}

#[tokio::test]
async fn test_provider_alerts_are_classified() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/onecall")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"lat": 48.11, "lon": -1.67, "alerts": [
                {"sender_name": "METEO-FRANCE", "event": "Vent violent", "start": 1737640800, "end": 1737727200,
                 "description": "Tempête avec rafales exceptionnelles", "tags": ["Wind"]},
                {"sender_name": "METEO-FRANCE", "event": "Orages", "start": 1737640800, "end": 1737662400,
                 "description": "Orages localement forts", "tags": []}
            ]}"#,
        )
        .create_async()
        .await;

    let alerts = weather_client(&server)
        .provider_alerts(48.11, -1.67)
        .await
        .unwrap();
    let classified: Vec<ClassifiedProviderAlert> =
        alerts.into_iter().map(ClassifiedProviderAlert::from).collect();

    assert_eq!(classified.len(), 2);
    assert_eq!(classified[0].severity, Severity::High);
    assert_eq!(classified[1].severity, Severity::Moderate);
}

#[tokio::test]
async fn test_bulletin_sends_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/bulletin")
        .match_header("apikey", "vigilance-key")
        .with_status(200)
        .with_body(include_str!("fixtures/vigilance_bulletin.json"))
        .create_async()
        .await;

    let client = VigilanceClient::new(
        format!("{}/bulletin", server.url()),
        format!("{}/map", server.url()),
        Some("vigilance-key".to_string()),
    );
    let alerts = client.fetch_current().await.unwrap();

    mock.assert_async().await;
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn test_map_used_without_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/map")
        .with_status(200)
        .with_body(include_str!("fixtures/vigilance_map.json"))
        .create_async()
        .await;

    let client = VigilanceClient::new(
        format!("{}/bulletin", server.url()),
        format!("{}/map", server.url()),
        None,
    );
    assert!(matches!(
        client.fetch_bulletin().await,
        Err(FetchError::Format(_))
    ));

    let alerts = client.fetch_current().await.unwrap();
    mock.assert_async().await;
    assert!(alerts.iter().any(|a| a.level == VigilanceLevel::Red));
}
