//! Convergence bookkeeping for a single DOF.

use serde::{Deserialize, Serialize};

use super::Dof;

/// How the driver moves a DOF toward its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DofPolicy {
    /// Apply the target once.
    Direct,
    /// Apply increasing fractions of the target.
    #[default]
    Ramp,
    /// Walk from the current value in bounded increments.
    Walk,
}

/// Result of trying to bring one DOF to its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AttemptOutcome {
    Resolved { value: f64 },
    Unresolved { last_applied: Option<f64> },
}

/// Record of one attempt: every value proposed, in order, and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceAttempt {
    pub dof: Dof,
    pub policy: DofPolicy,
    pub tried_values: Vec<f64>,
    pub outcome: AttemptOutcome,
}

impl ConvergenceAttempt {
    pub fn resolved(dof: Dof, policy: DofPolicy, tried_values: Vec<f64>, value: f64) -> Self {
        Self {
            dof,
            policy,
            tried_values,
            outcome: AttemptOutcome::Resolved { value },
        }
    }

    pub fn unresolved(
        dof: Dof,
        policy: DofPolicy,
        tried_values: Vec<f64>,
        last_applied: Option<f64>,
    ) -> Self {
        Self {
            dof,
            policy,
            tried_values,
            outcome: AttemptOutcome::Unresolved { last_applied },
        }
    }

    pub const fn is_resolved(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Resolved { .. })
    }

    pub const fn last_applied(&self) -> Option<f64> {
        match self.outcome {
            AttemptOutcome::Resolved { value } => Some(value),
            AttemptOutcome::Unresolved { last_applied } => last_applied,
        }
    }
}
