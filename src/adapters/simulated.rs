//! In-memory geometry engine for tests and dry runs.
//!
//! Models the bearing cross-section with a handful of constraints that mirror
//! how the real solver behaves around the template:
//! - the ring must stay thicker than both fillets (`OR - IR > 2 * Radius`)
//! - the width must stay wider than both fillets (`Width > 2 * Radius`)
//! - the inner radius can at most double per recompute
//! - the outer radius moves at most one walk increment per recompute
//!
//! A rejected recompute rolls the instance back to its last valid state.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::models::{Dof, ExportFormat};
use crate::domain::ports::{EngineError, EngineResult, GeometryEngine, InstanceHandle};

const SLACK: f64 = 1e-9;

/// DOF values of the simulated template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedTemplate {
    pub width: f64,
    pub fillet_radius: f64,
    pub outer_radius: f64,
    pub inner_radius: f64,
}

impl Default for SimulatedTemplate {
    fn default() -> Self {
        Self {
            width: 5.0,
            fillet_radius: 0.5,
            outer_radius: 15.0,
            inner_radius: 5.0,
        }
    }
}

impl SimulatedTemplate {
    fn values(self) -> BTreeMap<Dof, f64> {
        BTreeMap::from([
            (Dof::Width, self.width),
            (Dof::FilletRadius, self.fillet_radius),
            (Dof::OuterRadius, self.outer_radius),
            (Dof::InnerRadius, self.inner_radius),
        ])
    }
}

/// Tunable limits of the simulated solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedRules {
    /// Largest accepted change of the outer radius per recompute
    pub max_outer_step: f64,
    /// Largest accepted growth factor of the inner radius per recompute
    pub max_inner_growth: f64,
}

impl Default for SimulatedRules {
    fn default() -> Self {
        Self {
            max_outer_step: 0.5,
            max_inner_growth: 2.0,
        }
    }
}

/// One call received by the engine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Open { path: PathBuf, label: String },
    Clone { label: String },
    SetParameter { instance: String, dof: Dof, value: f64 },
    GetParameter { instance: String, dof: Dof },
    Recompute { instance: String, accepted: bool },
    Export { instance: String, path: PathBuf },
    Discard { instance: String },
    Save { keep: Vec<String>, path: PathBuf },
    Close,
}

#[derive(Debug, Clone)]
struct SimulatedInstance {
    committed: BTreeMap<Dof, f64>,
    pending: BTreeMap<Dof, f64>,
}

#[derive(Debug, Serialize)]
struct ExportedObject<'a> {
    label: &'a str,
    format: ExportFormat,
    values: &'a BTreeMap<Dof, f64>,
}

#[derive(Debug, Serialize)]
struct SavedDocument<'a> {
    objects: Vec<SavedObject<'a>>,
}

#[derive(Debug, Serialize)]
struct SavedObject<'a> {
    label: &'a str,
    values: &'a BTreeMap<Dof, f64>,
}

/// Simulated geometry engine.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    template: SimulatedTemplate,
    rules: SimulatedRules,
    template_label: Option<String>,
    instances: BTreeMap<String, SimulatedInstance>,
    ceilings: BTreeMap<Dof, f64>,
    stalled: Vec<Dof>,
    refused_clones: Vec<String>,
    calls: Vec<EngineCall>,
    closed: bool,
}

impl SimulatedEngine {
    pub fn new(template: SimulatedTemplate, rules: SimulatedRules) -> Self {
        Self {
            template,
            rules,
            ..Self::default()
        }
    }

    /// Reject any recompute that moves `dof` above `limit`.
    pub fn reject_above(&mut self, dof: Dof, limit: f64) {
        self.ceilings.insert(dof, limit);
    }

    /// Accept changes to `dof` but never move it.
    pub fn stall(&mut self, dof: Dof) {
        self.stalled.push(dof);
    }

    /// Make the solver refuse to copy the template into `label`.
    pub fn refuse_clone(&mut self, label: impl Into<String>) {
        self.refused_clones.push(label.into());
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn has_instance(&self, label: &str) -> bool {
        self.instances.contains_key(label)
    }

    pub fn instance_labels(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }

    pub const fn is_open(&self) -> bool {
        self.template_label.is_some()
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn instance_mut(&mut self, handle: &InstanceHandle) -> EngineResult<&mut SimulatedInstance> {
        self.instances
            .get_mut(handle.label())
            .ok_or_else(|| EngineError::Protocol(format!("unknown instance: {handle}")))
    }

    fn check(&self, state: &BTreeMap<Dof, f64>, previous: &BTreeMap<Dof, f64>) -> Result<(), String> {
        let value = |dof: Dof| state.get(&dof).copied().unwrap_or_default();
        let before = |dof: Dof| previous.get(&dof).copied().unwrap_or_default();

        let fillet = value(Dof::FilletRadius);
        if value(Dof::OuterRadius) - value(Dof::InnerRadius) <= 2.0 * fillet {
            return Err("ring thickness collapsed".to_string());
        }
        if value(Dof::Width) <= 2.0 * fillet {
            return Err("width smaller than fillets".to_string());
        }
        if (value(Dof::OuterRadius) - before(Dof::OuterRadius)).abs()
            > self.rules.max_outer_step + SLACK
        {
            return Err("outer radius moved too far".to_string());
        }
        if value(Dof::InnerRadius) > before(Dof::InnerRadius) * self.rules.max_inner_growth + SLACK {
            return Err("inner radius grew too fast".to_string());
        }
        for (dof, limit) in &self.ceilings {
            let moved = (value(*dof) - before(*dof)).abs() > SLACK;
            if moved && value(*dof) > *limit + SLACK {
                return Err(format!("{dof} above {limit}"));
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::Protocol("template already closed".to_string()));
        }
        if self.template_label.is_none() {
            return Err(EngineError::Protocol("no template opened".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GeometryEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn open_template(&mut self, path: &Path, label: &str) -> EngineResult<()> {
        self.calls.push(EngineCall::Open {
            path: path.to_path_buf(),
            label: label.to_string(),
        });
        self.template_label = Some(label.to_string());
        self.closed = false;
        Ok(())
    }

    async fn clone_template(&mut self, label: &str) -> EngineResult<InstanceHandle> {
        self.calls.push(EngineCall::Clone {
            label: label.to_string(),
        });
        self.ensure_open()?;
        if self.template_label.as_deref() == Some(label) || self.instances.contains_key(label) {
            return Err(EngineError::Protocol(format!("label already in use: {label}")));
        }
        if self.refused_clones.iter().any(|refused| refused == label) {
            return Err(EngineError::Rejected(format!("copy failed for {label}")));
        }

        let values = self.template.values();
        self.instances.insert(
            label.to_string(),
            SimulatedInstance {
                committed: values.clone(),
                pending: values,
            },
        );
        Ok(InstanceHandle::new(label))
    }

    async fn set_parameter(
        &mut self,
        instance: &InstanceHandle,
        dof: Dof,
        value: f64,
    ) -> EngineResult<()> {
        self.calls.push(EngineCall::SetParameter {
            instance: instance.label().to_string(),
            dof,
            value,
        });
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::Rejected(format!("{dof} must be positive, got {value}")));
        }
        self.instance_mut(instance)?.pending.insert(dof, value);
        Ok(())
    }

    async fn get_parameter(&mut self, instance: &InstanceHandle, dof: Dof) -> EngineResult<f64> {
        self.calls.push(EngineCall::GetParameter {
            instance: instance.label().to_string(),
            dof,
        });
        let state = self.instance_mut(instance)?;
        state
            .pending
            .get(&dof)
            .copied()
            .ok_or_else(|| EngineError::Protocol(format!("missing datum {dof}")))
    }

    async fn recompute(&mut self, instance: &InstanceHandle) -> EngineResult<()> {
        let stalled = self.stalled.clone();
        let mut state = self.instance_mut(instance)?.clone();
        for dof in stalled {
            if let Some(value) = state.committed.get(&dof).copied() {
                state.pending.insert(dof, value);
            }
        }

        let verdict = self.check(&state.pending, &state.committed);
        self.calls.push(EngineCall::Recompute {
            instance: instance.label().to_string(),
            accepted: verdict.is_ok(),
        });

        let slot = self.instance_mut(instance)?;
        match verdict {
            Ok(()) => {
                slot.committed = state.pending.clone();
                slot.pending = state.pending;
                Ok(())
            }
            Err(reason) => {
                debug!(instance = %instance, reason, "simulated recompute rejected");
                slot.pending = slot.committed.clone();
                Err(EngineError::Rejected(reason))
            }
        }
    }

    async fn export(
        &mut self,
        instance: &InstanceHandle,
        format: ExportFormat,
        path: &Path,
    ) -> EngineResult<()> {
        self.calls.push(EngineCall::Export {
            instance: instance.label().to_string(),
            path: path.to_path_buf(),
        });
        let state = self.instance_mut(instance)?;
        let body = serde_json::to_string_pretty(&ExportedObject {
            label: instance.label(),
            format,
            values: &state.committed,
        })
        .map_err(|e| EngineError::Protocol(e.to_string()))?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    async fn discard(&mut self, instance: InstanceHandle) -> EngineResult<()> {
        self.calls.push(EngineCall::Discard {
            instance: instance.label().to_string(),
        });
        self.instances
            .remove(instance.label())
            .map(|_| ())
            .ok_or_else(|| EngineError::Protocol(format!("unknown instance: {instance}")))
    }

    async fn save_document(&mut self, keep: &[String], path: &Path) -> EngineResult<()> {
        self.calls.push(EngineCall::Save {
            keep: keep.to_vec(),
            path: path.to_path_buf(),
        });
        self.ensure_open()?;
        self.instances.retain(|label, _| keep.contains(label));

        let objects = keep
            .iter()
            .filter_map(|label| {
                self.instances.get(label).map(|state| SavedObject {
                    label,
                    values: &state.committed,
                })
            })
            .collect();
        let body = serde_json::to_string_pretty(&SavedDocument { objects })
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.calls.push(EngineCall::Close);
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}
