// Forecast classification properties of the rule engine

use chrono::{Duration, TimeZone, Utc};
use meteo_alert_service::alert_rules::{AlertKind, RuleEngine, Thresholds, DEFAULT_MAX_ALERTS};
use meteo_alert_service::severity::{contains_severe_keyword, Severity};
use meteo_alert_service::weather_client::WeatherReading;

fn reading(step: i64) -> WeatherReading {
    WeatherReading {
        timestamp: Utc.with_ymd_and_hms(2025, 8, 10, 0, 0, 0).unwrap() + Duration::hours(3 * step),
        ..WeatherReading::default()
    }
}

#[test]
fn test_torrential_rain_is_not_also_heavy_rain() {
    let engine = RuleEngine::default();
    let alerts = engine.evaluate(&[WeatherReading {
        rain_3h: 20.0,
        ..reading(0)
    }]);

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::TorrentialRain);
    assert_eq!(alerts[0].event, "Pluies torrentielles");
    assert!(alerts.iter().all(|a| a.kind != AlertKind::HeavyRain));
}

#[test]
fn test_default_readings_produce_no_alert() {
    let engine = RuleEngine::default();
    let readings: Vec<_> = (0..40).map(reading).collect();
    assert!(engine.evaluate(&readings).is_empty());
}

#[test]
fn test_same_event_keeps_severe_wording() {
    let engine = RuleEngine::default();
    let readings = vec![
        WeatherReading {
            wind_speed: 18.0,
            ..reading(0)
        },
        WeatherReading {
            wind_speed: 27.0,
            ..reading(1)
        },
        WeatherReading {
            wind_speed: 19.0,
            ..reading(2)
        },
    ];

    let alerts = engine.evaluate(&readings);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Gale);
    assert_eq!(alerts[0].severity, Severity::Extreme);
    assert_eq!(alerts[0].start, readings[1].timestamp);
    assert!(contains_severe_keyword(&alerts[0].description));
}

#[test]
fn test_result_is_capped() {
    let engine = RuleEngine::default();
    let readings = vec![
        WeatherReading { weather_code: 781, ..reading(0) },
        WeatherReading { weather_code: 771, ..reading(1) },
        WeatherReading { weather_code: 202, ..reading(2) },
        WeatherReading { rain_3h: 16.0, ..reading(3) },
        WeatherReading { snow_3h: 6.0, ..reading(4) },
        WeatherReading { wind_speed: 12.0, ..reading(5) },
        WeatherReading { temperature: 35.0, ..reading(6) },
        WeatherReading { temperature: -2.0, ..reading(7) },
        WeatherReading { weather_code: 741, ..reading(8) },
    ];

    let alerts = engine.evaluate(&readings);
    assert_eq!(alerts.len(), DEFAULT_MAX_ALERTS);
    assert_eq!(alerts[0].kind, AlertKind::Tornado);
    for pair in alerts.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
    }
    assert!(alerts.iter().all(|a| a.kind != AlertKind::Fog));
}

#[test]
fn test_configurable_cap() {
    let engine = RuleEngine::new(&Thresholds::default(), 2);
    let readings = vec![
        WeatherReading { rain_3h: 16.0, ..reading(0) },
        WeatherReading { wind_speed: 12.0, ..reading(1) },
        WeatherReading { temperature: 30.0, ..reading(2) },
    ];
    assert_eq!(engine.evaluate(&readings).len(), 2);
}

#[test]
fn test_alert_spans_three_hours() {
    let engine = RuleEngine::default();
    let r = WeatherReading {
        temperature: -7.0,
        ..reading(4)
    };
    let alert = engine.classify(&r).unwrap();
    assert_eq!(alert.kind, AlertKind::SevereCold);
    assert_eq!(alert.end - alert.start, Duration::hours(3));
}
