//! SQL/JSON path executor
//!
//! An executor for the SQL/JSON path language over `serde_json` documents.
//! The crate consumes pre-compiled path programs (built with [`path::builder`]),
//! evaluates them against a borrowed JSON document plus optional named
//! variables, and produces existence answers, single items, or item
//! sequences.

pub mod collation;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod path;
pub mod vars;

// Re-export main types
pub use engine::{EngineConfig, JsonPathEngine};
pub use error::{JsonPathError, Result};
pub use model::{DateTimeItem, DateTimeValue, JsonItem, JsonType, ValueSequence};
pub use path::{ItemKind, PathExpr, PathItem};
pub use vars::{ObjectVariables, VariableResolver};
