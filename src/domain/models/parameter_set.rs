use serde::{Deserialize, Serialize};

use super::Dof;
use crate::domain::errors::{DomainError, DomainResult};

/// Target dimensions of one bearing, as listed in the catalog.
///
/// All four dimensions are strictly positive and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub name: String,
    pub inner_diameter: f64,
    pub outer_diameter: f64,
    pub width: f64,
    pub fillet_radius: f64,
}

impl ParameterSet {
    pub fn new(
        name: impl Into<String>,
        inner_diameter: f64,
        outer_diameter: f64,
        width: f64,
        fillet_radius: f64,
    ) -> DomainResult<Self> {
        let params = Self {
            name: name.into(),
            inner_diameter,
            outer_diameter,
            width,
            fillet_radius,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "bearing name cannot be empty".to_string(),
            ));
        }

        let fields = [
            ("inner diameter", self.inner_diameter),
            ("outer diameter", self.outer_diameter),
            ("width", self.width),
            ("fillet radius", self.fillet_radius),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(DomainError::ValidationFailed(format!(
                    "{}: {field} must be a positive number, got {value}",
                    self.name
                )));
            }
        }

        Ok(())
    }

    /// Value the given DOF must reach for this bearing.
    pub fn target(&self, dof: Dof) -> f64 {
        match dof {
            Dof::Width => self.width,
            Dof::FilletRadius => self.fillet_radius,
            Dof::OuterRadius => self.outer_diameter / 2.0,
            Dof::InnerRadius => self.inner_diameter / 2.0,
        }
    }

    /// Make a catalog name safe to use as a file stem and object label.
    pub fn sanitize_name(raw: &str) -> String {
        raw.trim().replace(['/', ' '], "_")
    }
}
