//! Geometry engine port - interface to the constraint solver.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{Dof, ExportFormat};

/// Errors reported by a geometry engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The solver refused a value or could not satisfy the constraints.
    #[error("solver rejected the change: {0}")]
    Rejected(String),

    #[error("engine protocol error: {0}")]
    Protocol(String),

    #[error("engine process failed: {0}")]
    Process(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Rejections leave the engine usable; everything else does not.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Opaque handle to a cloned template living inside the engine.
///
/// Not `Clone`: discarding an instance consumes its handle.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    label: String,
}

impl InstanceHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Capability interface of a stateful, non-reentrant geometry engine.
///
/// Every method takes `&mut self`, so at most one mutation sequence runs at a
/// time. Calls within one instance must follow the convergence order.
#[async_trait]
pub trait GeometryEngine: Send {
    /// Engine type name for logs.
    fn name(&self) -> &'static str;

    /// Open the template document and locate the object carrying `label`.
    async fn open_template(&mut self, path: &Path, label: &str) -> EngineResult<()>;

    /// Clone the template into a new object labelled `label`.
    async fn clone_template(&mut self, label: &str) -> EngineResult<InstanceHandle>;

    async fn set_parameter(
        &mut self,
        instance: &InstanceHandle,
        dof: Dof,
        value: f64,
    ) -> EngineResult<()>;

    /// Read back the value the solver actually holds for a DOF.
    async fn get_parameter(&mut self, instance: &InstanceHandle, dof: Dof) -> EngineResult<f64>;

    async fn recompute(&mut self, instance: &InstanceHandle) -> EngineResult<()>;

    async fn export(
        &mut self,
        instance: &InstanceHandle,
        format: ExportFormat,
        path: &Path,
    ) -> EngineResult<()>;

    /// Remove an instance from the document.
    async fn discard(&mut self, instance: InstanceHandle) -> EngineResult<()>;

    /// Prune the document to the objects labelled in `keep` and save it.
    async fn save_document(&mut self, keep: &[String], path: &Path) -> EngineResult<()>;

    /// Release the template document.
    async fn close(&mut self) -> EngineResult<()>;
}
