pub mod config;
pub mod database;
pub mod error;
pub mod interview;
pub mod notifications;
pub mod proctor; // Client-side proctored test runner

pub use config::{AppConfig, DatabaseConfig, ProctorPolicy};
pub use error::ErrorKind;

use log::info;

/// Initializes logging from `RUST_LOG` and reports which backends this
/// process is configured against.
pub fn init(config: &AppConfig) {
    let _ = env_logger::Builder::from_default_env().try_init();
    info!(
        "PlaceMate starting (interview service: {}, placement api: {})",
        config.interview_service_url, config.placement_api_url
    );
}
