//! CSV catalog loading.
//!
//! The catalog has a header naming the columns `Name`, `ID`, `OD`, `Width`
//! and `Radius` in any order. Extra columns are ignored. A blank `ID` reuses
//! the inner diameter of the row above it.
//!
//! Fields may be double-quoted, with `""` standing for a literal quote.
//! A quoted field cannot span lines.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Catalog, ParameterSet};

const COLUMNS: [&str; 5] = ["Name", "ID", "OD", "Width", "Radius"];

/// Loads bearing catalogs from disk.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Read and parse the catalog at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Catalog> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog = Self::parse_str(&raw)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        debug!(path = %path.display(), entries = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Parse catalog text. Line numbers in errors are 1-based and count the
    /// header.
    pub fn parse_str(raw: &str) -> DomainResult<Catalog> {
        let mut lines = raw
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Err(DomainError::Parse {
                line: 1,
                reason: "catalog is empty".to_string(),
            });
        };
        let columns = Columns::from_header(header_line, header)?;

        let mut catalog = Catalog::new();
        let mut carried_id: Option<f64> = None;

        for (line, row) in lines {
            let fields = split_row(row);
            let field = |name: &str| columns.field(&fields, name);

            let name = ParameterSet::sanitize_name(field("Name"));
            if name.is_empty() {
                return Err(parse_error(line, "missing bearing name"));
            }

            let outer_diameter = number(line, "OD", field("OD"))?;
            let inner_diameter = if field("ID").is_empty() {
                let carried = carried_id
                    .ok_or_else(|| parse_error(line, "blank ID with no previous row to carry from"))?;
                if carried >= outer_diameter {
                    return Err(parse_error(
                        line,
                        format!("carried ID {carried} is not smaller than OD {outer_diameter}"),
                    ));
                }
                carried
            } else {
                let explicit = number(line, "ID", field("ID"))?;
                if explicit >= outer_diameter {
                    warn!(bearing = %name, id = explicit, od = outer_diameter, "ID is not smaller than OD");
                }
                explicit
            };
            carried_id = Some(inner_diameter);

            let entry = ParameterSet {
                name,
                inner_diameter,
                outer_diameter,
                width: number(line, "Width", field("Width"))?,
                fillet_radius: number(line, "Radius", field("Radius"))?,
            };
            catalog.insert(entry).map_err(|err| match err {
                DomainError::ValidationFailed(reason) => parse_error(line, reason),
                other => other,
            })?;
        }

        Ok(catalog)
    }
}

/// Positions of the required columns within a row.
struct Columns {
    positions: HashMap<&'static str, usize>,
}

impl Columns {
    fn from_header(line: usize, header: &str) -> DomainResult<Self> {
        let names = split_row(header);
        let mut positions = HashMap::new();
        for column in COLUMNS {
            let position = names
                .iter()
                .position(|name| *name == column)
                .ok_or_else(|| parse_error(line, format!("missing column {column}")))?;
            positions.insert(column, position);
        }
        Ok(Self { positions })
    }

    fn field<'a>(&self, fields: &'a [Cow<'_, str>], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|position| fields.get(*position))
            .map_or("", |field| &**field)
    }
}

/// Split one CSV row, honouring double-quoted fields.
fn split_row(row: &str) -> Vec<Cow<'_, str>> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (index, ch) in row.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(unquote(&row[start..index]));
                start = index + 1;
            }
            _ => {}
        }
    }
    fields.push(unquote(&row[start..]));
    fields
}

fn unquote(field: &str) -> Cow<'_, str> {
    let field = field.trim();
    match field.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')) {
        Some(inner) if inner.contains("\"\"") => Cow::Owned(inner.trim().replace("\"\"", "\"")),
        Some(inner) => Cow::Borrowed(inner.trim()),
        None => Cow::Borrowed(field),
    }
}

fn number(line: usize, column: &str, raw: &str) -> DomainResult<f64> {
    if raw.is_empty() {
        return Err(parse_error(line, format!("missing {column}")));
    }
    raw.parse::<f64>()
        .map_err(|_| parse_error(line, format!("{column} is not a number: {raw:?}")))
}

fn parse_error(line: usize, reason: impl Into<String>) -> DomainError {
    DomainError::Parse {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Name,ID,OD,Width,Radius
608,8,22,7,0.3
6200,10,30,9,0.6
6200 2RS,,30,9,0.6
";

    #[test]
    fn test_parse_sample() {
        let catalog = CatalogLoader::parse_str(SAMPLE).unwrap();
        assert_eq!(catalog.names(), vec!["608", "6200", "6200_2RS"]);

        let sealed = catalog.get("6200_2RS").unwrap();
        assert!((sealed.inner_diameter - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_columns_in_any_order() {
        let raw = "Radius,Width,OD,ID,Name,Notes\n0.3,7,22,8,608,skate\n";
        let catalog = CatalogLoader::parse_str(raw).unwrap();
        let entry = catalog.get("608").unwrap();
        assert!((entry.outer_diameter - 22.0).abs() < f64::EPSILON);
        assert!((entry.fillet_radius - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quoted_and_crlf_rows() {
        let raw = "Name,ID,OD,Width,Radius\r\n\"R4/ZZ\",6.35,15.875,4.978,0.3\r\n";
        let catalog = CatalogLoader::parse_str(raw).unwrap();
        assert!(catalog.contains("R4_ZZ"));
    }

    #[test]
    fn test_doubled_quotes_collapse() {
        let raw = "Name,ID,OD,Width,Radius\n\"608 \"\"skate\"\", blue\",8,22,7,0.3\n";
        let catalog = CatalogLoader::parse_str(raw).unwrap();
        assert_eq!(catalog.names(), vec!["608_\"skate\",_blue"]);
    }

    #[test]
    fn test_missing_column() {
        let err = CatalogLoader::parse_str("Name,ID,OD,Width\n608,8,22,7\n").unwrap_err();
        match err {
            DomainError::Parse { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("Radius"));
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_number_reports_line() {
        let raw = "Name,ID,OD,Width,Radius\n608,8,22,7,0.3\n625,5,sixteen,5,0.3\n";
        let err = CatalogLoader::parse_str(raw).unwrap_err();
        assert!(matches!(err, DomainError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_blank_id_on_first_row() {
        let raw = "Name,ID,OD,Width,Radius\n608,,22,7,0.3\n";
        let err = CatalogLoader::parse_str(raw).unwrap_err();
        assert!(matches!(err, DomainError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_carried_id_must_fit_outer_diameter() {
        let raw = "Name,ID,OD,Width,Radius\n6206,30,62,16,1\n608,,22,7,0.3\n";
        let err = CatalogLoader::parse_str(raw).unwrap_err();
        match err {
            DomainError::Parse { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("carried ID 30"));
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_inverted_diameters_are_kept() {
        let raw = "Name,ID,OD,Width,Radius\ninverted,30,22,7,0.3\n";
        let catalog = CatalogLoader::parse_str(raw).unwrap();
        assert!(catalog.contains("inverted"));
    }

    #[test]
    fn test_duplicate_name_is_parse_error() {
        let raw = "Name,ID,OD,Width,Radius\n608,8,22,7,0.3\n608,8,22,7,0.3\n";
        let err = CatalogLoader::parse_str(raw).unwrap_err();
        assert!(matches!(err, DomainError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_non_positive_value_is_parse_error() {
        let raw = "Name,ID,OD,Width,Radius\n608,8,22,0,0.3\n";
        let err = CatalogLoader::parse_str(raw).unwrap_err();
        assert!(matches!(err, DomainError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_catalog() {
        assert!(matches!(
            CatalogLoader::parse_str("\n\n"),
            Err(DomainError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let catalog = CatalogLoader::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogLoader::load(dir.path().join("absent.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog"));
    }
}
