//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - pretty or JSON console output on stderr
//! - optional daily rolling JSON log file
pub mod logger;

pub use logger::LoggerImpl;
