use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi, ToSchema};

use crate::alert_rules::{AlertKind, ForecastAlert};
use crate::auth::{self, Claims};
use crate::db::{
    Alert, AlertFilter, CityDetails, Department, RegionWithDepartments, User, WeatherRecord,
};
use crate::services::alert_service::ClassifiedProviderAlert;
use crate::services::user_service::{LoginRequest, LoginResponse, Profile, RegisterRequest};
use crate::services::weather_service::{
    CityForecast, CitySnapshot, CityWeatherReport, SearchResults, DEFAULT_FORECAST_DAYS,
};
use crate::services::{AlertService, ServiceError, UserService, WeatherService};
use crate::severity::Severity;
use crate::vigilance_client::{VigilanceAlert, VigilanceLevel};
use crate::weather_client::{CurrentWeather, ForecastEntry, GeoLocation};

#[derive(Clone)]
pub struct AppState {
    pub weather_service: WeatherService,
    pub alert_service: AlertService,
    pub user_service: UserService,
    pub jwt_secret: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// JSON error body
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    /// Days of forecast, 1 to 5
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VigilanceQuery {
    /// Lowest vigilance level returned, 1 (green) to 4 (red)
    pub min_level: Option<u8>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: String,
}

fn api_error(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: msg.into(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            ServiceError::Validation(msg) => api_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ServiceError::Conflict(_) => api_error(StatusCode::CONFLICT, "CONFLICT", self.to_string()),
            ServiceError::NotFound(_) => {
                api_error(StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            ServiceError::InvalidCredentials => {
                api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "invalid credentials")
            }
            ServiceError::Inactive => {
                api_error(StatusCode::FORBIDDEN, "FORBIDDEN", "account is disabled")
            }
            ServiceError::Fetch(e) => {
                warn!("Upstream failure: {}", e);
                api_error(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "weather provider unavailable")
            }
            ServiceError::Db(_)
            | ServiceError::Hash(_)
            | ServiceError::Task(_)
            | ServiceError::Token(_) => {
                error!("Internal error: {}", self);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error",
                )
            }
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Meteo Alert Service API", description = "French weather and vigilance alerts"),
    paths(
        health,
        get_city_weather,
        get_city_history,
        get_forecast,
        get_overview,
        list_alerts,
        list_vigilance,
        list_regions,
        search,
        register,
        login,
        get_profile,
    ),
    components(schemas(
        HealthResponse,
        ApiError,
        CityWeatherReport,
        CityForecast,
        CitySnapshot,
        SearchResults,
        CurrentWeather,
        ForecastEntry,
        GeoLocation,
        ForecastAlert,
        AlertKind,
        Severity,
        ClassifiedProviderAlert,
        VigilanceAlert,
        VigilanceLevel,
        Alert,
        WeatherRecord,
        RegionWithDepartments,
        Department,
        CityDetails,
        User,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        Profile,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Weather", description = "Current weather and forecasts"),
        (name = "Alerts", description = "Stored and live alerts"),
        (name = "Auth", description = "Registration and login"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/profile", get(get_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::jwt_auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/weather/{city}", get(get_city_weather))
        .route("/weather/{city}/history", get(get_city_history))
        .route("/forecast/{city}", get(get_forecast))
        .route("/overview", get(get_overview))
        .route("/alerts", get(list_alerts))
        .route("/alerts/vigilance", get(list_vigilance))
        .route("/regions", get(list_regions))
        .route("/search", get(search))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/openapi.json", get(openapi_json))
        .merge(protected_routes)
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/weather/{city}",
    tag = "Weather",
    params(("city" = String, Path, description = "City name")),
    responses(
        (status = 200, description = "Current weather and alerts; weather is null when the provider fails", body = CityWeatherReport),
        (status = 500, description = "Database error", body = ApiError)
    )
)]
#[instrument(skip(state), fields(city = %city))]
async fn get_city_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<CityWeatherReport>, ServiceError> {
    let report = state.weather_service.city_report(&city).await?;
    info!(
        "Weather report for {}: {} forecast alerts, {} stored alerts",
        city,
        report.alerts.len(),
        report.stored_alerts.len()
    );
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/weather/{city}/history",
    tag = "Weather",
    params(("city" = String, Path, description = "City name")),
    responses(
        (status = 200, description = "Stored daily records, most recent first", body = [WeatherRecord]),
        (status = 404, description = "City not in the database", body = ApiError)
    )
)]
#[instrument(skip(state), fields(city = %city))]
async fn get_city_history(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<Vec<WeatherRecord>>, ServiceError> {
    let records = state.weather_service.history(&city).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/v1/forecast/{city}",
    tag = "Weather",
    params(("city" = String, Path, description = "City name"), ForecastQuery),
    responses(
        (status = 200, description = "Forecast entries and classified alerts, empty when the provider is unavailable", body = CityForecast)
    )
)]
#[instrument(skip(state), fields(city = %city))]
async fn get_forecast(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Json<CityForecast> {
    let days = query.days.unwrap_or(DEFAULT_FORECAST_DAYS).clamp(1, DEFAULT_FORECAST_DAYS);
    Json(state.weather_service.forecast(&city, days).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/overview",
    tag = "Weather",
    responses((status = 200, description = "Current weather of the main cities", body = [CitySnapshot]))
)]
#[instrument(skip(state))]
async fn get_overview(State(state): State<AppState>) -> Json<Vec<CitySnapshot>> {
    Json(state.weather_service.overview().await)
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    tag = "Alerts",
    params(AlertFilter),
    responses((status = 200, description = "Stored alerts, newest first", body = [Alert]))
)]
#[instrument(skip(state))]
async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Result<Json<Vec<Alert>>, StatusCode> {
    let alerts = state.alert_service.list_alerts(&filter).await.map_err(|e| {
        error!("Failed to list alerts: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!("Returning {} alerts", alerts.len());
    Ok(Json(alerts))
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts/vigilance",
    tag = "Alerts",
    params(VigilanceQuery),
    responses(
        (status = 200, description = "Live vigilance alerts; empty when the upstream fails", body = [VigilanceAlert]),
        (status = 400, description = "Invalid level", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn list_vigilance(
    State(state): State<AppState>,
    Query(query): Query<VigilanceQuery>,
) -> Result<Json<Vec<VigilanceAlert>>, ServiceError> {
    let min_level = match query.min_level {
        None => VigilanceLevel::Yellow,
        Some(level) => VigilanceLevel::from_level(level).ok_or_else(|| {
            ServiceError::Validation(format!("min_level must be between 1 and 4, got {level}"))
        })?,
    };

    Ok(Json(state.alert_service.current_vigilance(min_level).await))
}

#[utoipa::path(
    get,
    path = "/api/v1/regions",
    tag = "Alerts",
    responses((status = 200, description = "Regions with their departments", body = [RegionWithDepartments]))
)]
#[instrument(skip(state))]
async fn list_regions(
    State(state): State<AppState>,
) -> Result<Json<Vec<RegionWithDepartments>>, StatusCode> {
    let regions = state.weather_service.regions().await.map_err(|e| {
        error!("Failed to list regions: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(regions))
}

#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "Weather",
    params(SearchQuery),
    responses(
        (status = 200, description = "Known cities and geocoding matches", body = SearchResults),
        (status = 400, description = "Query too short", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ServiceError> {
    Ok(Json(state.weather_service.search(&query.q).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid email, password or city", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    )
)]
#[instrument(skip(state, request))]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let user = state.user_service.register(&request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ApiError)
    )
)]
#[instrument(skip(state, request))]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ServiceError::Validation(
            "email and password are required".to_string(),
        ));
    }
    Ok(Json(state.user_service.login(&request).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User profile with regional alerts", body = Profile),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    )
)]
#[instrument(skip(state, claims), fields(sub = %claims.sub))]
async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ServiceError> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ServiceError::NotFound(format!("User {}", claims.sub)))?;
    Ok(Json(state.user_service.profile(user_id).await?))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(generate_openapi_spec())
}
