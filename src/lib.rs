//! Bearings - parametric bearing generator
//!
//! Resolves a constraint-based bearing template to the dimensions listed in a
//! catalog, one degree of freedom at a time, and exports the results through
//! an external geometry engine.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the `GeometryEngine` port
//! - **Service Layer** (`services`): DOF scheduling, convergence and batching
//! - **Adapters** (`adapters`): process-hosted and simulated engines
//! - **Infrastructure Layer** (`infrastructure`): catalog, config and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use bearings::adapters::SimulatedEngine;
//! use bearings::{BatchRequest, BatchRunner, CatalogLoader, Config, ExportFormat, Selection};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let catalog = CatalogLoader::load("bearings-data.csv")?;
//!     let request = BatchRequest::build(Selection::parse("608"), ExportFormat::Stl, "out", &catalog)?;
//!     let report = BatchRunner::from_config(&config)
//!         .run(&mut SimulatedEngine::default(), &request, &catalog)
//!         .await?;
//!     println!("{} failed", report.failed_count());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    BatchRequest, Catalog, Config, Dof, DofPolicy, ExportFormat, ParameterSet, Selection,
};
pub use domain::ports::{EngineError, GeometryEngine, InstanceHandle};
pub use infrastructure::{CatalogLoader, ConfigError, ConfigLoader};
pub use services::{BatchReport, BatchRunner, ConvergenceDriver};
