use super::ParameterSet;
use crate::domain::errors::{DomainError, DomainResult};

/// Ordered collection of bearing parameter sets keyed by name.
///
/// Iteration follows catalog order, which is also the order `ALL` is built in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<ParameterSet>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ParameterSet>) -> DomainResult<Self> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    /// Add an entry. Names must be unique.
    pub fn insert(&mut self, entry: ParameterSet) -> DomainResult<()> {
        entry.validate()?;
        if self.contains(&entry.name) {
            return Err(DomainError::ValidationFailed(format!(
                "duplicate bearing name: {}",
                entry.name
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSet> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSet> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ParameterSet {
        ParameterSet::new(name, 8.0, 22.0, 7.0, 0.3).unwrap()
    }

    #[test]
    fn test_preserves_insertion_order() {
        let catalog =
            Catalog::from_entries(vec![entry("6000"), entry("608"), entry("625")]).unwrap();
        assert_eq!(catalog.names(), vec!["6000", "608", "625"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Catalog::from_entries(vec![entry("608"), entry("608")]);
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::from_entries(vec![entry("608")]).unwrap();
        assert!(catalog.contains("608"));
        assert!(catalog.get("999").is_none());
        assert!(!catalog.is_empty());
    }
}
