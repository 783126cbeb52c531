use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth;
use crate::db::{Alert, AlertRepository, CityDetails, LocationRepository, User, UserRepository};
use crate::services::ServiceError;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// City label, must be a city known to the database
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Profile {
    pub user: User,
    pub city: Option<CityDetails>,
    pub region: Option<String>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Created,
    Updated,
    AlreadyExists,
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), ServiceError> {
    if !is_valid_email(email.trim()) {
        return Err(ServiceError::Validation("invalid email address".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    location_repo: LocationRepository,
    alert_repo: AlertRepository,
    jwt_secret: String,
    token_expire_secs: u64,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        location_repo: LocationRepository,
        alert_repo: AlertRepository,
        jwt_secret: String,
        token_expire_secs: u64,
    ) -> Self {
        Self {
            user_repo,
            location_repo,
            alert_repo,
            jwt_secret,
            token_expire_secs,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ServiceError> {
        validate_credentials(&request.email, &request.password)?;
        let email = request.email.trim();

        if self.user_repo.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict(format!("User {email}")));
        }

        let city_id = match request.city.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => {
                let city = self
                    .location_repo
                    .find_city_by_label(label)
                    .await?
                    .ok_or_else(|| ServiceError::Validation(format!("unknown city {label}")))?;
                Some(city.id)
            }
            _ => None,
        };

        let hash = hash_password(&request.password).await?;
        let user = self
            .user_repo
            .insert(email, &hash, city_id, false)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ServiceError::Conflict(format!("User {email}"))
                } else {
                    ServiceError::Db(e)
                }
            })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ServiceError> {
        let user = self
            .user_repo
            .find_by_email(request.email.trim())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash).await? {
            warn!("Failed login for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(ServiceError::Inactive);
        }

        let token = auth::create_token(
            &self.jwt_secret,
            user.id,
            &user.email,
            self.token_expire_secs,
        )?;
        self.user_repo.touch_last_login(user.id).await?;

        Ok(LoginResponse {
            token,
            expires_in: self.token_expire_secs,
        })
    }

    /// User, city, region and the region's current alerts
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: i64) -> Result<Profile, ServiceError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id}")))?;

        let city = match user.city_id {
            Some(id) => self.location_repo.find_city_by_id(id).await?,
            None => None,
        };
        let region = city.as_ref().map(|c| c.region.clone());
        let alerts = match &region {
            Some(region) => {
                self.alert_repo
                    .find_active_for_region(region, chrono::Utc::now().date_naive())
                    .await?
            }
            None => Vec::new(),
        };

        Ok(Profile {
            user,
            city,
            region,
            alerts,
        })
    }
}

/// bcrypt at the default cost, off the async workers
pub async fn hash_password(password: &str) -> Result<String, ServiceError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await??;
    Ok(hash)
}

/// A malformed stored hash counts as a mismatch
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let matches =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await?;
    Ok(matches)
}

/// Create an administrator, or reset its password when `update` is set
#[instrument(skip(user_repo, password))]
pub async fn ensure_admin(
    user_repo: &UserRepository,
    email: &str,
    password: &str,
    update: bool,
) -> Result<AdminOutcome, ServiceError> {
    validate_credentials(email, password)?;
    let email = email.trim();

    match user_repo.find_by_email(email).await? {
        Some(existing) if update => {
            let hash = hash_password(password).await?;
            user_repo
                .update_credentials(existing.id, &hash, true)
                .await?;
            Ok(AdminOutcome::Updated)
        }
        Some(_) => Ok(AdminOutcome::AlreadyExists),
        None => {
            let hash = hash_password(password).await?;
            user_repo.insert(email, &hash, None, true).await?;
            Ok(AdminOutcome::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("motdepasse").await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("motdepasse", &hash).await.unwrap());
        assert!(!verify_password("mauvais-mot", &hash).await.unwrap());
        assert!(!verify_password("motdepasse", "pas-un-hash").await.unwrap());
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("marie@example.fr", "motdepasse").is_ok());
        assert!(matches!(
            validate_credentials("marie@", "motdepasse"),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("marie@example.fr", "court"),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_email_regex_accepts_subdomains() {
        assert!(is_valid_email("jean.dupont+meteo@mail.example.co.uk"));
        assert!(!is_valid_email("jean dupont@example.fr"));
    }
}
