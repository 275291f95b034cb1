//! Port trait definitions (Hexagonal Architecture)
//!
//! - GeometryEngine: clone, mutate, recompute and export template instances
//!
//! Adapters live in `crate::adapters`.

pub mod geometry_engine;

pub use geometry_engine::{EngineError, EngineResult, GeometryEngine, InstanceHandle};
