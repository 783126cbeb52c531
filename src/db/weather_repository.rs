use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DailyWeather, DbError, WeatherRecord};

#[derive(Clone)]
pub struct WeatherRepository {
    pool: PgPool,
}

impl WeatherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One row per city and day: min/max widen, other fields take the latest value
    #[instrument(skip(self, daily), fields(city_id = daily.city_id, date = %daily.date_weather))]
    pub async fn upsert_daily(&self, daily: &DailyWeather) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;

        let sky_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO type_sky (label) VALUES ($1)
            ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label
            RETURNING id
            "#,
        )
        .bind(&daily.sky)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO weather (
                city_id, date_weather, temperature_min, temperature_max,
                pressure, humidity, wind_speed, sunrise, sunset, sky_type_id
            )
            VALUES ($1, $2, $3, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (city_id, date_weather) DO UPDATE SET
                temperature_min = LEAST(weather.temperature_min, EXCLUDED.temperature_min),
                temperature_max = GREATEST(weather.temperature_max, EXCLUDED.temperature_max),
                pressure = EXCLUDED.pressure,
                humidity = EXCLUDED.humidity,
                wind_speed = EXCLUDED.wind_speed,
                sunrise = EXCLUDED.sunrise,
                sunset = EXCLUDED.sunset,
                sky_type_id = EXCLUDED.sky_type_id
            RETURNING id
            "#,
        )
        .bind(daily.city_id)
        .bind(daily.date_weather)
        .bind(daily.temperature)
        .bind(daily.pressure)
        .bind(daily.humidity)
        .bind(daily.wind_speed)
        .bind(daily.sunrise)
        .bind(daily.sunset)
        .bind(sky_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Upserted daily weather {}", id);
        Ok(id)
    }

    /// Most recent days first
    #[instrument(skip(self))]
    pub async fn find_history(&self, city_id: i64, limit: i64) -> Result<Vec<WeatherRecord>, DbError> {
        let records = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT w.id, w.city_id, w.date_weather, w.temperature_min, w.temperature_max,
                   w.pressure, w.humidity, w.wind_speed, w.sunrise, w.sunset, s.label AS sky
            FROM weather w
            LEFT JOIN type_sky s ON s.id = w.sky_type_id
            WHERE w.city_id = $1
            ORDER BY w.date_weather DESC
            LIMIT $2
            "#,
        )
        .bind(city_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} weather records", records.len());
        Ok(records)
    }
}
