#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Unknown {entity}: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl DbError {
    /// Whether the error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::SqlxError(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
