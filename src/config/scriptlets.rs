//! Scriptlet metadata catalogue
//!
//! Maps every native scriptlet name and alias to its definition. The
//! rephraser consults it before emitting a call to a native scriptlet.

use crate::error::CatalogueError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One scriptlet as described in the metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptletDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    scriptlets: Vec<ScriptletDefinition>,
}

/// Lookup table from scriptlet name or alias to definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptletCatalogue {
    by_name: HashMap<String, ScriptletDefinition>,
    definitions: usize,
}

impl ScriptletCatalogue {
    /// Parse metadata JSON of the form `{"scriptlets": [{"name": ..., "aliases": [...]}]}`
    pub fn from_json(content: &str) -> Result<Self, CatalogueError> {
        let file: MetadataFile = serde_json::from_str(content)
            .map_err(|e| CatalogueError::InvalidMetadata(e.to_string()))?;

        let mut catalogue = Self::default();
        for definition in file.scriptlets {
            catalogue.insert(definition)?;
        }
        Ok(catalogue)
    }

    /// Load metadata JSON from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogueError::InvalidMetadata(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Adds a definition under its name and every alias
    pub fn insert(&mut self, definition: ScriptletDefinition) -> Result<(), CatalogueError> {
        if definition.name.trim().is_empty() {
            return Err(CatalogueError::InvalidMetadata(
                "scriptlet definition without a name".to_string(),
            ));
        }
        for key in std::iter::once(&definition.name).chain(definition.aliases.iter()) {
            self.by_name.insert(key.clone(), definition.clone());
        }
        self.definitions += 1;
        Ok(())
    }

    /// Merges another catalogue into this one; later definitions win
    pub fn extend(&mut self, other: ScriptletCatalogue) {
        self.definitions += other.definitions;
        self.by_name.extend(other.by_name);
    }

    /// Resolves a name with or without the `.js` suffix
    pub fn get(&self, name: &str) -> Option<&ScriptletDefinition> {
        let name = name.trim();
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(&format!("{name}.js")))
            .or_else(|| name.strip_suffix(".js").and_then(|n| self.by_name.get(n)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of definitions (aliases not counted)
    pub fn len(&self) -> usize {
        self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.definitions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "scriptlets": [
            { "name": "json-prune.js", "aliases": ["json-prune"], "kind": "template" },
            { "name": "noop.js", "aliases": ["blank.js"] }
        ]
    }"#;

    #[test]
    fn test_lookup_by_name_and_alias() {
        let catalogue = ScriptletCatalogue::from_json(METADATA).unwrap();
        assert_eq!(catalogue.len(), 2);
        assert!(catalogue.contains("json-prune.js"));
        assert!(catalogue.contains("json-prune"));
        assert!(catalogue.contains("blank.js"));
        assert!(catalogue.contains("noop"));
        assert!(!catalogue.contains("user-log"));
        assert_eq!(catalogue.get("blank").unwrap().name, "noop.js");
    }

    #[test]
    fn test_missing_scriptlets_key_is_an_error() {
        let err = ScriptletCatalogue::from_json(r#"{"other": []}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid scriptlet metadata"));
    }

    #[test]
    fn test_nameless_definition_rejected() {
        let err = ScriptletCatalogue::from_json(r#"{"scriptlets": [{"name": " "}]}"#).unwrap_err();
        assert!(err.to_string().contains("without a name"));
    }

    #[test]
    fn test_extend() {
        let mut a = ScriptletCatalogue::from_json(METADATA).unwrap();
        let b = ScriptletCatalogue::from_json(r#"{"scriptlets": [{"name": "log.js"}]}"#).unwrap();
        a.extend(b);
        assert_eq!(a.len(), 3);
        assert!(a.contains("log"));
    }
}
