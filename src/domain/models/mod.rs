//! Domain models for bearing generation.

pub mod catalog;
pub mod config;
pub mod convergence;
pub mod dof;
pub mod parameter_set;
pub mod request;

pub use catalog::Catalog;
pub use config::{
    CatalogConfig, Config, ConvergenceConfig, EngineConfig, LoggingConfig, OutputConfig,
    TemplateConfig,
};
pub use convergence::{AttemptOutcome, ConvergenceAttempt, DofPolicy};
pub use dof::Dof;
pub use parameter_set::ParameterSet;
pub use request::{BatchRequest, ExportFormat, ExportKind, Selection, ALL_BEARINGS};
