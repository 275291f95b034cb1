//! Infrastructure layer module
//!
//! Everything that touches the host rather than the engine:
//! - Catalog loading from CSV
//! - Configuration management
//! - Logging infrastructure

pub mod catalog;
pub mod config;
pub mod logging;

pub use catalog::CatalogLoader;
pub use config::{ConfigError, ConfigLoader};
pub use logging::LoggerImpl;
