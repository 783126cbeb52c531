pub mod alert_service;
pub mod error;
pub mod user_service;
pub mod weather_service;

pub use alert_service::AlertService;
pub use error::ServiceError;
pub use user_service::UserService;
pub use weather_service::WeatherService;
