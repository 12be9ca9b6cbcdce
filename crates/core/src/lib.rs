//! Settings, error taxonomy and logging shared by every explorer crate.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::Settings;
pub use error::AppError;
