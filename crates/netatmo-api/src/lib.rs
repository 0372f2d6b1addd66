// netatmo-api: Async Rust client for the Netatmo weather station cloud API

pub mod auth;
pub mod client;
pub mod error;
pub mod stations;
pub mod transport;

pub use auth::{AccessToken, PasswordGrant, READ_STATION_SCOPE};
pub use client::{DEFAULT_BASE_URL, NetatmoClient};
pub use error::Error;
pub use stations::{LastData, StationDevice, StationModule, StationsData};
pub use transport::TransportConfig;
