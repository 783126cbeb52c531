use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::db::{CityDetails, DbError, Department, Region};
use crate::geo;

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

/// Counts of rows written by a geography seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedCounts {
    pub regions: usize,
    pub departments: usize,
    pub cities: usize,
}

const CITY_DETAILS_SELECT: &str = r#"
    SELECT c.id, c.label, d.code AS department_code, d.label AS department_label,
           r.label AS region, c.latitude, c.longitude
    FROM cities c
    JOIN departments d ON d.id = c.department_id
    JOIN regions r ON r.id = d.region_id
"#;

async fn upsert_region(conn: &mut PgConnection, label: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO regions (label) VALUES ($1)
        ON CONFLICT (label) DO UPDATE SET label = EXCLUDED.label
        RETURNING id
        "#,
    )
    .bind(label)
    .fetch_one(conn)
    .await
}

async fn upsert_department(
    conn: &mut PgConnection,
    code: &str,
    label: &str,
    region_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO departments (code, label, region_id) VALUES ($1, $2, $3)
        ON CONFLICT (code) DO UPDATE SET label = EXCLUDED.label, region_id = EXCLUDED.region_id
        RETURNING id
        "#,
    )
    .bind(code)
    .bind(label)
    .bind(region_id)
    .fetch_one(conn)
    .await
}

async fn upsert_city(
    conn: &mut PgConnection,
    place: &geo::NamedPlace,
    department_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO cities (label, department_id, latitude, longitude) VALUES ($1, $2, $3, $4)
        ON CONFLICT (label, department_id) DO UPDATE SET
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude
        RETURNING id
        "#,
    )
    .bind(place.name)
    .bind(department_id)
    .bind(place.latitude)
    .bind(place.longitude)
    .fetch_one(conn)
    .await
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert regions, departments and main cities from the static tables
    #[instrument(skip(self))]
    pub async fn seed_geography(&self) -> Result<SeedCounts, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = SeedCounts::default();

        for region in geo::REGIONS {
            upsert_region(&mut tx, region).await?;
            counts.regions += 1;
        }

        for dept in geo::DEPARTMENTS {
            let region_id = upsert_region(&mut tx, dept.region).await?;
            upsert_department(&mut tx, dept.code, dept.name, region_id).await?;
            counts.departments += 1;
        }

        for (place, code) in geo::MAIN_CITIES {
            let department_id: i64 =
                sqlx::query_scalar("SELECT id FROM departments WHERE code = $1")
                    .bind(*code)
                    .fetch_one(&mut *tx)
                    .await?;
            upsert_city(&mut tx, place, department_id).await?;
            counts.cities += 1;
        }

        tx.commit().await?;
        info!(
            "Seeded {} regions, {} departments, {} cities",
            counts.regions, counts.departments, counts.cities
        );
        Ok(counts)
    }

    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> Result<Vec<Region>, DbError> {
        let regions = sqlx::query_as::<_, Region>("SELECT id, label FROM regions ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(regions)
    }

    #[instrument(skip(self))]
    pub async fn list_departments(&self) -> Result<Vec<Department>, DbError> {
        let departments = sqlx::query_as::<_, Department>(
            "SELECT id, code, label, region_id FROM departments ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(departments)
    }

    /// Cities whose label contains `query`, case-insensitive
    #[instrument(skip(self))]
    pub async fn search_cities(&self, query: &str, limit: i64) -> Result<Vec<CityDetails>, DbError> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!("{CITY_DETAILS_SELECT} WHERE c.label ILIKE $1 ORDER BY c.label LIMIT $2");
        let cities = sqlx::query_as::<_, CityDetails>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        debug!("Found {} cities matching {}", cities.len(), query);
        Ok(cities)
    }

    #[instrument(skip(self))]
    pub async fn find_city_by_label(&self, label: &str) -> Result<Option<CityDetails>, DbError> {
        let sql =
            format!("{CITY_DETAILS_SELECT} WHERE LOWER(c.label) = LOWER($1) ORDER BY c.id LIMIT 1");
        let city = sqlx::query_as::<_, CityDetails>(&sql)
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;
        Ok(city)
    }

    #[instrument(skip(self))]
    pub async fn find_city_by_id(&self, id: i64) -> Result<Option<CityDetails>, DbError> {
        let sql = format!("{CITY_DETAILS_SELECT} WHERE c.id = $1");
        let city = sqlx::query_as::<_, CityDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(city)
    }
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Saint_Malo 100%"), "Saint\\_Malo 100\\%");
        assert_eq!(escape_like("Brest"), "Brest");
    }
}
