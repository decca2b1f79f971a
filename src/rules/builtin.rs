#![forbid(unsafe_code)]

//! Builtin policy data embedded at compile time
//!
//! The policy catalogue and the scriptlet metadata are compiled into the
//! binary using `include_str!`, so `powerlist` runs without any external
//! data files. A user catalogue configured in `powerlist.toml` is merged on
//! top of these (or replaces them).

use crate::config::{CatalogueDefinition, ScriptletCatalogue};
use crate::error::CatalogueError;

/// Embedded policy catalogue
pub const BUILTIN_CATALOGUE: &str = include_str!("../../builtin/catalogue.toml");

/// Embedded scriptlet metadata
pub const BUILTIN_SCRIPTLETS: &str = include_str!("../../builtin/scriptlets.json");

/// Parse the builtin policy catalogue
///
/// # Errors
///
/// Returns `CatalogueError` if the embedded TOML is malformed, which only
/// happens when the data file is edited by hand.
pub fn builtin_catalogue() -> Result<CatalogueDefinition, CatalogueError> {
    CatalogueDefinition::parse(BUILTIN_CATALOGUE).map_err(|e| {
        CatalogueError::InvalidDefinition(format!("Failed to parse builtin catalogue: {}", e))
    })
}

/// Parse the builtin scriptlet metadata
pub fn builtin_scriptlets() -> Result<ScriptletCatalogue, CatalogueError> {
    ScriptletCatalogue::from_json(BUILTIN_SCRIPTLETS).map_err(|e| {
        CatalogueError::InvalidMetadata(format!("Failed to parse builtin scriptlets: {}", e))
    })
}
