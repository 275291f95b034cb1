//! Drives one template clone to a parameter set.
//!
//! Resolution order:
//! 1. clone the template
//! 2. width
//! 3. fillet radius to an inert placeholder
//! 4. inner radius (first pass, failure tolerated)
//! 5. outer radius
//! 6. inner radius (second pass)
//! 7. fail if the inner radius is still unresolved
//! 8. fillet radius to its target
//!
//! Solver rejections end the instance, never the batch. Any other engine
//! error is returned as [`DomainError::EngineProcess`].

use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use super::parameter_scheduler::{ramp_schedule, WalkSchedule, WalkStep};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConvergenceAttempt, ConvergenceConfig, Dof, DofPolicy, ParameterSet};
use crate::domain::ports::{GeometryEngine, InstanceHandle};

/// A clone whose DOFs all reached their targets.
#[derive(Debug)]
pub struct ResolvedInstance {
    pub handle: InstanceHandle,
    /// Values read back from the engine after resolution.
    pub values: BTreeMap<Dof, f64>,
    /// Every attempt made, in order.
    pub attempts: Vec<ConvergenceAttempt>,
}

impl ResolvedInstance {
    pub fn label(&self) -> &str {
        self.handle.label()
    }

    pub fn value(&self, dof: Dof) -> Option<f64> {
        self.values.get(&dof).copied()
    }
}

/// Convergence driver for single instances.
#[derive(Debug, Clone)]
pub struct ConvergenceDriver {
    settings: ConvergenceConfig,
}

impl ConvergenceDriver {
    pub const fn new(settings: ConvergenceConfig) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &ConvergenceConfig {
        &self.settings
    }

    /// Clone the open template and resolve it to `params`.
    ///
    /// On an instance-scoped failure the partial clone is discarded before
    /// the error is returned. A clone the solver refuses never existed, so
    /// there is nothing to discard.
    #[instrument(skip(self, engine, params), fields(bearing = %params.name, engine = engine.name()))]
    pub async fn resolve<E>(&self, engine: &mut E, params: &ParameterSet) -> DomainResult<ResolvedInstance>
    where
        E: GeometryEngine + ?Sized,
    {
        let handle = match engine.clone_template(&params.name).await {
            Ok(handle) => handle,
            Err(err) if err.is_rejection() => {
                warn!(error = %err, "engine refused to clone the template");
                return Err(DomainError::CloneRejected {
                    name: params.name.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        let mut attempts = Vec::new();

        match self.drive(engine, &handle, params, &mut attempts).await {
            Ok(values) => {
                info!(attempts = attempts.len(), "bearing resolved");
                Ok(ResolvedInstance {
                    handle,
                    values,
                    attempts,
                })
            }
            Err(err) if err.is_instance_scoped() => {
                warn!(error = %err, "discarding unresolved instance");
                engine.discard(handle).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn drive<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        params: &ParameterSet,
        attempts: &mut Vec<ConvergenceAttempt>,
    ) -> DomainResult<BTreeMap<Dof, f64>>
    where
        E: GeometryEngine + ?Sized,
    {
        let width = self
            .attempt(engine, instance, Dof::Width, params.width)
            .await?;
        require(width, params, attempts, apply_error)?;

        let placeholder = self.settings.fillet_placeholder;
        let inert = if self
            .apply_step(engine, instance, Dof::FilletRadius, placeholder)
            .await?
        {
            ConvergenceAttempt::resolved(Dof::FilletRadius, DofPolicy::Direct, vec![placeholder], placeholder)
        } else {
            ConvergenceAttempt::unresolved(Dof::FilletRadius, DofPolicy::Direct, vec![placeholder], None)
        };
        require(inert, params, attempts, apply_error)?;

        let inner_target = params.target(Dof::InnerRadius);
        let first_pass = self
            .attempt(engine, instance, Dof::InnerRadius, inner_target)
            .await?;
        if !first_pass.is_resolved() {
            debug!(
                last_applied = ?first_pass.last_applied(),
                "inner radius blocked, resolving outer radius first"
            );
        }
        let mut inner_tried = first_pass.tried_values.clone();
        attempts.push(first_pass);

        let outer = self
            .attempt(engine, instance, Dof::OuterRadius, params.target(Dof::OuterRadius))
            .await?;
        require(outer, params, attempts, convergence_error)?;

        let second_pass = self
            .attempt(engine, instance, Dof::InnerRadius, inner_target)
            .await?;
        inner_tried.extend_from_slice(&second_pass.tried_values);
        let resolved = second_pass.is_resolved();
        attempts.push(second_pass);
        if !resolved {
            return Err(DomainError::Convergence {
                name: params.name.clone(),
                dof: Dof::InnerRadius,
                tried: inner_tried,
            });
        }

        let fillet = self
            .attempt(engine, instance, Dof::FilletRadius, params.fillet_radius)
            .await?;
        require(fillet, params, attempts, apply_error)?;

        self.verify(engine, instance, params).await
    }

    /// Run the configured policy for `dof`.
    ///
    /// Rejections come back as an unresolved attempt; only engine failures
    /// are errors.
    async fn attempt<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        dof: Dof,
        target: f64,
    ) -> DomainResult<ConvergenceAttempt>
    where
        E: GeometryEngine + ?Sized,
    {
        let attempt = match self.settings.policy_for(dof) {
            DofPolicy::Direct => self.direct(engine, instance, dof, target).await?,
            DofPolicy::Ramp => self.ramp(engine, instance, dof, target).await?,
            DofPolicy::Walk => self.walk(engine, instance, dof, target).await?,
        };

        debug!(
            dof = %dof,
            policy = ?attempt.policy,
            tried = ?attempt.tried_values,
            resolved = attempt.is_resolved(),
            "attempt finished"
        );
        Ok(attempt)
    }

    async fn direct<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        dof: Dof,
        target: f64,
    ) -> DomainResult<ConvergenceAttempt>
    where
        E: GeometryEngine + ?Sized,
    {
        let tried = vec![target];
        if self.apply_step(engine, instance, dof, target).await? {
            Ok(ConvergenceAttempt::resolved(dof, DofPolicy::Direct, tried, target))
        } else {
            Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Direct, tried, None))
        }
    }

    async fn ramp<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        dof: Dof,
        target: f64,
    ) -> DomainResult<ConvergenceAttempt>
    where
        E: GeometryEngine + ?Sized,
    {
        let mut tried = Vec::new();
        let mut last_applied = None;

        for value in ramp_schedule(target, &self.settings.ramp_fractions) {
            tried.push(value);
            if !self.apply_step(engine, instance, dof, value).await? {
                return Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Ramp, tried, last_applied));
            }
            last_applied = Some(value);
        }

        Ok(ConvergenceAttempt::resolved(dof, DofPolicy::Ramp, tried, target))
    }

    async fn walk<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        dof: Dof,
        target: f64,
    ) -> DomainResult<ConvergenceAttempt>
    where
        E: GeometryEngine + ?Sized,
    {
        let schedule = WalkSchedule::new(target, self.settings.walk_step);
        let mut tried = Vec::new();
        let mut last_applied = None;
        let mut current = engine.get_parameter(instance, dof).await?;

        for _ in 0..self.settings.max_walk_steps {
            match schedule.next(current) {
                WalkStep::Finish(value) => {
                    tried.push(value);
                    return if self.apply_step(engine, instance, dof, value).await? {
                        Ok(ConvergenceAttempt::resolved(dof, DofPolicy::Walk, tried, value))
                    } else {
                        Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Walk, tried, last_applied))
                    };
                }
                WalkStep::Advance(value) => {
                    tried.push(value);
                    if !self.apply_step(engine, instance, dof, value).await? {
                        return Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Walk, tried, last_applied));
                    }
                    last_applied = Some(value);

                    // The solver may settle elsewhere when DOFs are coupled.
                    let landed = engine.get_parameter(instance, dof).await?;
                    if !schedule.made_progress(current, landed) {
                        warn!(dof = %dof, current, landed, target, "walk stopped making progress");
                        return Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Walk, tried, last_applied));
                    }
                    current = landed;
                }
            }
        }

        warn!(
            dof = %dof,
            max_walk_steps = self.settings.max_walk_steps,
            "walk exhausted its step budget"
        );
        Ok(ConvergenceAttempt::unresolved(dof, DofPolicy::Walk, tried, last_applied))
    }

    /// Set one value and recompute. `Ok(false)` means the solver refused.
    async fn apply_step<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        dof: Dof,
        value: f64,
    ) -> DomainResult<bool>
    where
        E: GeometryEngine + ?Sized,
    {
        let result = match engine.set_parameter(instance, dof, value).await {
            Ok(()) => engine.recompute(instance).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => Ok(true),
            Err(err) if err.is_rejection() => {
                debug!(dof = %dof, value, error = %err, "solver rejected value");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn verify<E>(
        &self,
        engine: &mut E,
        instance: &InstanceHandle,
        params: &ParameterSet,
    ) -> DomainResult<BTreeMap<Dof, f64>>
    where
        E: GeometryEngine + ?Sized,
    {
        let mut values = BTreeMap::new();
        for dof in Dof::ALL {
            let actual = engine.get_parameter(instance, dof).await?;
            let expected = params.target(dof);
            if (actual - expected).abs() > self.settings.tolerance {
                warn!(dof = %dof, actual, expected, "resolved value off target");
                return Err(DomainError::Convergence {
                    name: params.name.clone(),
                    dof,
                    tried: vec![actual],
                });
            }
            values.insert(dof, actual);
        }
        Ok(values)
    }
}

fn apply_error(params: &ParameterSet, attempt: &ConvergenceAttempt) -> DomainError {
    DomainError::Apply {
        name: params.name.clone(),
        dof: attempt.dof,
        tried: attempt.tried_values.clone(),
    }
}

fn convergence_error(params: &ParameterSet, attempt: &ConvergenceAttempt) -> DomainError {
    DomainError::Convergence {
        name: params.name.clone(),
        dof: attempt.dof,
        tried: attempt.tried_values.clone(),
    }
}

/// Record `attempt` and turn an unresolved one into the given error.
fn require(
    attempt: ConvergenceAttempt,
    params: &ParameterSet,
    attempts: &mut Vec<ConvergenceAttempt>,
    classify: fn(&ParameterSet, &ConvergenceAttempt) -> DomainError,
) -> DomainResult<()> {
    let result = if attempt.is_resolved() {
        Ok(())
    } else {
        Err(classify(params, &attempt))
    };
    attempts.push(attempt);
    result
}
