//! Pipeline stages and the driver that runs them

pub mod classifier;
pub mod pipeline;
pub mod rephraser;
pub mod rewrite;
pub mod source_walker;
pub mod unifier;
pub mod validator;

pub use pipeline::{Pipeline, PipelineOutput, PipelineStats, ValidityCounts};
pub use rewrite::{ImpliedScriptlet, RewriteRule};
pub use source_walker::SourceWalker;
pub use unifier::UnifierOptions;
