use serde::{Deserialize, Serialize};
use std::fmt;

/// A degree of freedom of the bearing template.
///
/// Each variant maps onto one named datum constraint in the template sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dof {
    Width,
    FilletRadius,
    OuterRadius,
    InnerRadius,
}

impl Dof {
    /// Every DOF, in the order they are reported.
    pub const ALL: [Self; 4] = [
        Self::Width,
        Self::FilletRadius,
        Self::OuterRadius,
        Self::InnerRadius,
    ];

    /// Name of the datum constraint inside the template.
    pub const fn datum(self) -> &'static str {
        match self {
            Self::Width => "Width",
            Self::FilletRadius => "Radius",
            Self::OuterRadius => "OR",
            Self::InnerRadius => "IR",
        }
    }

    pub fn from_datum(datum: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dof| dof.datum() == datum)
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.datum())
    }
}
