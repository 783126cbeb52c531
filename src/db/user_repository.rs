use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DbError, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, city_id, is_active, is_admin, created_at, last_login";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Email is stored lowercase
    #[instrument(skip(self, password_hash))]
    pub async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        city_id: Option<i64>,
        is_admin: bool,
    ) -> Result<User, DbError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, city_id, is_admin)
            VALUES (LOWER($1), $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(city_id)
            .bind(is_admin)
            .fetch_one(&self.pool)
            .await?;

        debug!("Created user {}", user.id);
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_credentials(
        &self,
        id: i64,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, is_admin = $3, is_active = TRUE WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(is_admin)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "user",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn touch_last_login(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Distinct regions of active users' cities
    #[instrument(skip(self))]
    pub async fn user_regions(&self) -> Result<Vec<String>, DbError> {
        let regions: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT r.label
            FROM users u
            JOIN cities c ON c.id = u.city_id
            JOIN departments d ON d.id = c.department_id
            JOIN regions r ON r.id = d.region_id
            WHERE u.is_active
            ORDER BY r.label
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Users are spread over {} regions", regions.len());
        Ok(regions)
    }
}
