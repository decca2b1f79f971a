#![forbid(unsafe_code)]

//! Rule text: grammar helpers, the record type and the syntax engine boundary

pub mod builtin;
pub mod grammar;
mod record;
pub mod syntax;

// Re-export core types
pub use record::{ClassifyHints, CommentStyle, Components, HeaderKind, RuleRecord};
pub use syntax::{HeuristicSyntaxEngine, RuleSyntaxEngine, SyntaxReport};
