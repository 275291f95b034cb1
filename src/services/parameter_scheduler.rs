//! Pure scheduling of intermediate DOF values.
//!
//! Nothing here talks to the engine. The convergence driver applies each
//! proposed value and decides what to do when the solver refuses one.

/// Fractions of the target applied by the default ramp.
pub const DEFAULT_RAMP_FRACTIONS: [f64; 4] = [0.125, 0.25, 0.5, 1.0];

/// Values proposed by the ramp policy for `target`, in application order.
pub fn ramp_schedule(target: f64, fractions: &[f64]) -> Vec<f64> {
    fractions.iter().map(|fraction| target * fraction).collect()
}

/// Check that a fraction list is strictly increasing, within `(0, 1]`, and
/// ends at exactly `1` so the last proposal is the target itself.
pub fn validate_ramp_fractions(fractions: &[f64]) -> Result<(), String> {
    let Some(&last) = fractions.last() else {
        return Err("ramp fractions cannot be empty".to_string());
    };

    if fractions.iter().any(|f| !f.is_finite() || *f <= 0.0 || *f > 1.0) {
        return Err(format!("ramp fractions must lie in (0, 1], got {fractions:?}"));
    }

    if fractions.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(format!(
            "ramp fractions must be strictly increasing, got {fractions:?}"
        ));
    }

    #[allow(clippy::float_cmp)]
    if last != 1.0 {
        return Err(format!("ramp fractions must end at 1, got {last}"));
    }

    Ok(())
}

/// Next move of a bounded-step walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkStep {
    /// Apply this intermediate value, recompute, then re-read the DOF.
    Advance(f64),
    /// Within one increment of the target: apply it exactly and stop.
    Finish(f64),
}

/// Bounded-step walk toward a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSchedule {
    target: f64,
    step: f64,
}

impl WalkSchedule {
    /// `step` must be positive.
    pub fn new(target: f64, step: f64) -> Self {
        debug_assert!(step > 0.0, "walk step must be positive");
        Self { target, step }
    }

    pub const fn target(&self) -> f64 {
        self.target
    }

    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Propose the next value given where the solver currently is.
    pub fn next(&self, current: f64) -> WalkStep {
        let remaining = self.target - current;
        if remaining.abs() < self.step {
            WalkStep::Finish(self.target)
        } else {
            WalkStep::Advance(current + self.step.copysign(remaining))
        }
    }

    /// Whether moving from `previous` to `current` got strictly closer.
    pub fn made_progress(&self, previous: f64, current: f64) -> bool {
        (self.target - current).abs() < (self.target - previous).abs()
    }
}
