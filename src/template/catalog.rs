//! Template catalog: named markup fragments plus search.
//!
//! The builtin catalog ships as YAML compiled into the binary.

use serde::Deserialize;

use super::TemplateError;

const BUILTIN_YAML: &str = include_str!("../../templates/catalog.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub markup: String,
}

/// Read-only name → template lookup.
pub trait TemplateCatalog: Send + Sync {
    fn entries(&self) -> &[TemplateEntry];

    fn get(&self, name: &str) -> Option<&TemplateEntry> {
        self.entries()
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    templates: Vec<TemplateEntry>,
}

/// Catalog loaded from YAML.
#[derive(Debug, Clone)]
pub struct YamlCatalog {
    entries: Vec<TemplateEntry>,
}

impl YamlCatalog {
    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Catalog`] on malformed YAML or duplicate names.
    pub fn from_yaml(yaml: &str) -> Result<Self, TemplateError> {
        let file: CatalogFile = serde_yaml::from_str(yaml).map_err(|e| TemplateError::Catalog(e.to_string()))?;
        let mut seen = std::collections::HashSet::new();
        for entry in &file.templates {
            if !seen.insert(entry.name.to_ascii_lowercase()) {
                return Err(TemplateError::Catalog(format!("duplicate template name: {}", entry.name)));
            }
        }
        Ok(Self { entries: file.templates })
    }

    /// The catalog compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Catalog`] if the bundled YAML is malformed.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_yaml(BUILTIN_YAML)
    }
}

impl TemplateCatalog for YamlCatalog {
    fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Keyword search. Scores each query term: name match 3, exact tag 2,
/// description match 1. Empty query returns the whole catalog in order.
#[must_use]
pub fn search<'a>(catalog: &'a dyn TemplateCatalog, query: &str) -> Vec<&'a TemplateEntry> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return catalog.entries().iter().collect();
    }

    let mut scored: Vec<(u32, &TemplateEntry)> = catalog
        .entries()
        .iter()
        .map(|entry| (score(entry, &terms), entry))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    scored.into_iter().map(|(_, e)| e).collect()
}

fn score(entry: &TemplateEntry, terms: &[String]) -> u32 {
    let name = entry.name.to_lowercase();
    let description = entry.description.to_lowercase();
    terms
        .iter()
        .map(|term| {
            let mut s = 0;
            if name.contains(term.as_str()) {
                s += 3;
            }
            if entry.tags.iter().any(|t| t.eq_ignore_ascii_case(term)) {
                s += 2;
            }
            if description.contains(term.as_str()) {
                s += 1;
            }
            s
        })
        .sum()
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
