//! Typed batch requests.
//!
//! A request is built and validated once, before any engine is launched, and
//! then handed to the batch runner as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{Catalog, ParameterSet};
use crate::domain::errors::{DomainError, DomainResult};

/// Keyword selecting every catalog entry.
pub const ALL_BEARINGS: &str = "ALL";

/// Which catalog entries a request covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    All,
    Named(String),
}

impl Selection {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == ALL_BEARINGS {
            Self::All
        } else {
            Self::Named(ParameterSet::sanitize_name(raw))
        }
    }

    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_BEARINGS),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Category of output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Mesh,
    BoundaryRepresentation,
    CombinedDocument,
}

/// Concrete file format requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Stl,
    Obj,
    Ply,
    Stp,
    Fcstd,
}

impl ExportFormat {
    pub const ALL: [Self; 5] = [Self::Stl, Self::Obj, Self::Ply, Self::Stp, Self::Fcstd];

    pub const fn kind(self) -> ExportKind {
        match self {
            Self::Stl | Self::Obj | Self::Ply => ExportKind::Mesh,
            Self::Stp => ExportKind::BoundaryRepresentation,
            Self::Fcstd => ExportKind::CombinedDocument,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Ply => "ply",
            Self::Stp => "stp",
            Self::Fcstd => "fcstd",
        }
    }

    /// File extension of the written artifact.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Fcstd => "FCStd",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == lowered)
            .ok_or_else(|| {
                let valid = Self::ALL.map(Self::as_str).join(", ");
                format!("unknown export type '{s}' (expected one of: {valid})")
            })
    }
}

/// A validated request: which bearings, in which format, written where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub selection: Selection,
    pub format: ExportFormat,
    pub output_dir: PathBuf,
}

impl BatchRequest {
    /// Validate a request against the catalog.
    ///
    /// Combined documents are only produced for `ALL`, and a single name must
    /// exist in the catalog. Both checks run before any engine interaction.
    pub fn build(
        selection: Selection,
        format: ExportFormat,
        output_dir: impl Into<PathBuf>,
        catalog: &Catalog,
    ) -> DomainResult<Self> {
        if format.kind() == ExportKind::CombinedDocument && !selection.is_all() {
            return Err(DomainError::Mode(format!(
                "--type={format} can only be used with {ALL_BEARINGS} to export one document with every bearing"
            )));
        }

        if let Selection::Named(name) = &selection {
            if !catalog.contains(name) {
                return Err(DomainError::NotFound(name.clone()));
            }
        }

        Ok(Self {
            selection,
            format,
            output_dir: output_dir.into(),
        })
    }

    pub fn aggregates(&self) -> bool {
        self.format.kind() == ExportKind::CombinedDocument
    }

    /// Catalog entries this request covers, in catalog order.
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> DomainResult<Vec<&'a ParameterSet>> {
        match &self.selection {
            Selection::All => Ok(catalog.iter().collect()),
            Selection::Named(name) => catalog
                .get(name)
                .map(|entry| vec![entry])
                .ok_or_else(|| DomainError::NotFound(name.clone())),
        }
    }

    /// Path of the per-instance artifact for `name`.
    pub fn instance_path(&self, name: &str) -> PathBuf {
        instance_file(&self.output_dir, name, self.format)
    }
}

fn instance_file(dir: &Path, name: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{name}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![
            ParameterSet::new("608", 8.0, 22.0, 7.0, 0.3).unwrap(),
            ParameterSet::new("6200", 10.0, 30.0, 9.0, 0.6).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse("ALL"), Selection::All);
        assert_eq!(Selection::parse("608"), Selection::Named("608".to_string()));
        assert_eq!(
            Selection::parse("R4/ZZ"),
            Selection::Named("R4_ZZ".to_string())
        );
    }

    #[test]
    fn test_format_parse_and_kind() {
        assert_eq!("STL".parse::<ExportFormat>().unwrap(), ExportFormat::Stl);
        assert_eq!(ExportFormat::Stp.kind(), ExportKind::BoundaryRepresentation);
        assert_eq!(ExportFormat::Ply.kind(), ExportKind::Mesh);
        assert_eq!(ExportFormat::Fcstd.kind(), ExportKind::CombinedDocument);
        assert!("dxf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_combined_document_requires_all() {
        let result = BatchRequest::build(
            Selection::parse("608"),
            ExportFormat::Fcstd,
            "out",
            &catalog(),
        );
        assert!(matches!(result, Err(DomainError::Mode(_))));
    }

    #[test]
    fn test_combined_document_with_all() {
        let request =
            BatchRequest::build(Selection::All, ExportFormat::Fcstd, "out", &catalog()).unwrap();
        assert!(request.aggregates());
        assert_eq!(request.resolve(&catalog()).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let result =
            BatchRequest::build(Selection::parse("999"), ExportFormat::Stl, "out", &catalog());
        match result {
            Err(DomainError::NotFound(name)) => assert_eq!(name, "999"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_mode_checked_before_lookup() {
        let result =
            BatchRequest::build(Selection::parse("999"), ExportFormat::Fcstd, "out", &catalog());
        assert!(matches!(result, Err(DomainError::Mode(_))));
    }

    #[test]
    fn test_instance_path() {
        let request =
            BatchRequest::build(Selection::parse("608"), ExportFormat::Stp, "/tmp/out", &catalog())
                .unwrap();
        assert_eq!(request.instance_path("608"), PathBuf::from("/tmp/out/608.stp"));
    }
}
