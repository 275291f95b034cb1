//! Domain layer for the bearing generator
//!
//! This module contains the catalog and request models, convergence
//! bookkeeping, and the port the geometry engine is reached through.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
