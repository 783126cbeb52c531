use crate::db::DbError;
use crate::fetch_error::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is disabled")]
    Inactive,
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
