//! Geometry engine adapters.

pub mod process;
pub mod simulated;

pub use process::ProcessEngine;
pub use simulated::{EngineCall, SimulatedEngine, SimulatedRules, SimulatedTemplate};
