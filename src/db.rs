pub mod alert_repository;
pub mod error;
pub mod location_repository;
pub mod models;
pub mod pool;
pub mod user_repository;
pub mod weather_repository;

pub use alert_repository::{AlertRepository, InsertOutcome};
pub use error::DbError;
pub use location_repository::LocationRepository;
pub use models::*;
pub use user_repository::UserRepository;
pub use weather_repository::WeatherRepository;
