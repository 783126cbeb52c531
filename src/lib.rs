pub mod alert_rules;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod fetch_error;
pub mod geo;
pub mod scheduler;
pub mod services;
pub mod severity;
pub mod vigilance_client;
pub mod weather_client;
