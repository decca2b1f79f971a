//! Configuration, policy catalogues and scriptlet metadata

pub mod catalogue;
pub mod powerlist_toml;
pub mod scriptlets;

pub use catalogue::{Catalogue, CatalogueDefinition, CatalogueSummary};
pub use powerlist_toml::{
    CatalogueConfig, Config, HeaderConfig, LogLevel, OutputConfig, ScriptletsConfig,
    UnifierConfig,
};
pub use scriptlets::{ScriptletCatalogue, ScriptletDefinition};
