use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, instrument};

use crate::db::{Alert, AlertFilter, DbError, NewAlert, TypeAlert};

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    AlreadyExists,
}

const ALERT_COLUMNS: &str = r#"
    a.id, t.label AS alert_type, a.region, a.department_code, a.description,
    a.active, a.date_alert, a.source, a.created_at
"#;

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

async fn type_id(conn: &mut PgConnection, label: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO type_alert (label) VALUES ($1)
        ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label
        RETURNING id
        "#,
    )
    .bind(label)
    .fetch_one(conn)
    .await
}

async fn insert_alert(conn: &mut PgConnection, alert: &NewAlert) -> Result<bool, sqlx::Error> {
    let type_id = type_id(&mut *conn, &alert.type_label).await?;
    let result = sqlx::query(
        r#"
        INSERT INTO alerts (type_id, region, department_code, description, active, date_alert, source)
        VALUES ($1, $2, $3, $4, TRUE, $5, $6)
        ON CONFLICT (type_id, region, date_alert) DO NOTHING
        "#,
    )
    .bind(type_id)
    .bind(&alert.region)
    .bind(&alert.department_code)
    .bind(alert.truncated_description())
    .bind(alert.date_alert)
    .bind(&alert.source)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn get_or_create_type(&self, label: &str) -> Result<TypeAlert, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = type_id(&mut conn, label).await?;
        Ok(TypeAlert {
            id,
            label: label.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_types(&self) -> Result<Vec<TypeAlert>, DbError> {
        let types = sqlx::query_as::<_, TypeAlert>("SELECT id, label FROM type_alert ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    /// Insert unless an alert of the same type already exists for the region and date
    #[instrument(skip(self, alert), fields(alert_type = %alert.type_label, region = %alert.region, date = %alert.date_alert))]
    pub async fn insert_if_absent(&self, alert: &NewAlert) -> Result<InsertOutcome, DbError> {
        let mut tx = self.pool.begin().await?;
        let created = insert_alert(&mut tx, alert).await.map_err(|e| {
            error!(error = %e, "Failed to insert alert");
            e
        })?;
        tx.commit().await?;

        if created {
            debug!("Alert created");
            Ok(InsertOutcome::Created)
        } else {
            debug!("Alert already exists");
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    /// Insert multiple alerts in a transaction, returns the number created
    #[instrument(skip(self, alerts), fields(count = alerts.len()))]
    pub async fn insert_many(&self, alerts: &[NewAlert]) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for alert in alerts {
            if insert_alert(&mut tx, alert).await? {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        tx.commit().await?;
        info!(
            "Inserted {} new alerts, {} duplicates skipped",
            inserted, duplicates
        );
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn find_filtered(&self, filter: &AlertFilter) -> Result<Vec<Alert>, DbError> {
        let sql = format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts a
            JOIN type_alert t ON t.id = a.type_id
            WHERE ($1::text IS NULL OR a.region = $1)
              AND ($2::text IS NULL OR t.label = $2)
              AND ($3::boolean IS NULL OR a.active = $3)
              AND ($4::date IS NULL OR a.date_alert >= $4)
              AND ($5::date IS NULL OR a.date_alert <= $5)
            ORDER BY a.date_alert DESC, a.id DESC
            "#
        );

        let alerts = sqlx::query_as::<_, Alert>(&sql)
            .bind(&filter.region)
            .bind(&filter.alert_type)
            .bind(filter.active)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} alerts", alerts.len());
        Ok(alerts)
    }

    /// Active alerts for a region from `since` onwards
    #[instrument(skip(self))]
    pub async fn find_active_for_region(
        &self,
        region: &str,
        since: NaiveDate,
    ) -> Result<Vec<Alert>, DbError> {
        let filter = AlertFilter {
            region: Some(region.to_string()),
            active: Some(true),
            date_from: Some(since),
            ..AlertFilter::default()
        };
        self.find_filtered(&filter).await
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete every alert and insert `alerts` in one transaction; nothing changes on failure.
    /// Returns (deleted, inserted).
    #[instrument(skip(self, alerts), fields(count = alerts.len()))]
    pub async fn replace_all(&self, alerts: &[NewAlert]) -> Result<(u64, usize), DbError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM alerts")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0;
        for alert in alerts {
            if insert_alert(&mut tx, alert).await? {
                inserted += 1;
            }
        }

        tx.commit().await?;
        info!("Replaced {} alerts with {}", deleted, inserted);
        Ok((deleted, inserted))
    }
}
