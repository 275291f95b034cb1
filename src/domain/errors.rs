//! Domain errors for the bearing generator.

use thiserror::Error;

use super::models::Dof;
use super::ports::EngineError;

/// Format a list of tried values as `[1.5, 2, 4]`.
fn format_tried(values: &[f64]) -> String {
    let joined = values
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

/// Domain-level errors that can occur while generating bearings.
///
/// `Convergence`, `Apply` and `CloneRejected` are scoped to a single instance:
/// the batch moves on to the next bearing. Every other variant aborts the
/// whole invocation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Catalog parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Invalid mode: {0}")]
    Mode(String),

    #[error("Bearing not found in catalog: {0}")]
    NotFound(String),

    #[error("{name}: {dof} did not converge (tried {})", format_tried(.tried))]
    Convergence {
        name: String,
        dof: Dof,
        tried: Vec<f64>,
    },

    #[error("{name}: engine rejected {dof} (tried {})", format_tried(.tried))]
    Apply {
        name: String,
        dof: Dof,
        tried: Vec<f64>,
    },

    #[error("{name}: engine refused to clone the template: {reason}")]
    CloneRejected { name: String, reason: String },

    #[error("Engine process error: {0}")]
    EngineProcess(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Whether this failure only affects the bearing being resolved.
    pub const fn is_instance_scoped(&self) -> bool {
        matches!(
            self,
            Self::Convergence { .. } | Self::Apply { .. } | Self::CloneRejected { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<EngineError> for DomainError {
    fn from(err: EngineError) -> Self {
        Self::EngineProcess(err.to_string())
    }
}
