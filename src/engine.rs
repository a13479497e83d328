//! Engine facade: configuration plus the callable query surface

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use crate::collation::{CodepointCollation, StrCollation};
use crate::error::{JsonPathError, Result};
use crate::evaluator::{BaseObject, ExecContext, ExecOutcome, ExecResult};
use crate::model::{JsonItem, ValueSequence};
use crate::path::PathExpr;
use crate::vars::VariableResolver;

/// Configuration options for path evaluation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum recursion depth of the path walk
    pub max_recursion_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 512,
        }
    }
}

/// The SQL/JSON path engine.
///
/// Stateless between calls: each operation borrows the document, the
/// compiled path, and the variables for the duration of the call and
/// owns nothing of them afterwards. `silent` converts suppressible
/// errors into empty/null results, the way the `@?`-style operators
/// need; guard errors (recursion limit, interrupts, undefined
/// variables, malformed programs) always propagate.
#[derive(Clone)]
pub struct JsonPathEngine {
    config: EngineConfig,
    collation: Arc<dyn StrCollation>,
    interrupt: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl Default for JsonPathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonPathEngine {
    /// Create an engine with the default configuration and code-point
    /// string ordering.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            collation: Arc::new(CodepointCollation),
            interrupt: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the string-ordering collation.
    pub fn with_collation(mut self, collation: Arc<dyn StrCollation>) -> Self {
        self.collation = collation;
        self
    }

    /// Install an interrupt hook, checked at every recursion entry and
    /// during `.**` descent. Returning `true` aborts the evaluation.
    pub fn with_interrupt(mut self, hook: Arc<dyn Fn() -> bool + Send + Sync>) -> Self {
        self.interrupt = Some(hook);
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether at least one item matches the path. `None` on a
    /// suppressed error.
    pub fn exists(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Option<bool>> {
        debug!(lax = path.is_lax(), silent, "jsonpath existence probe");
        match self.execute(path, doc, vars, None) {
            Ok(outcome) => Ok(Some(outcome == ExecOutcome::Found)),
            Err(e) if silent && e.can_suppress() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The path's singleton boolean result. `None` when the result is
    /// null, or (in silent mode) when it is not a singleton boolean or
    /// a suppressible error occurred.
    pub fn matches(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Option<bool>> {
        debug!(lax = path.is_lax(), silent, "jsonpath match");
        let mut found = ValueSequence::new();
        match self.execute(path, doc, vars, Some(&mut found)) {
            Ok(_) => {
                if found.len() == 1 {
                    match found.head() {
                        Some(JsonItem::Bool(b)) => return Ok(Some(*b)),
                        Some(JsonItem::Null) => return Ok(None),
                        _ => {}
                    }
                }
                if silent {
                    Ok(None)
                } else {
                    Err(JsonPathError::singleton_required(
                        "expression should return a singleton boolean",
                    ))
                }
            }
            Err(e) if silent && e.can_suppress() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All items the path yields, one JSON value per item.
    pub fn query(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Vec<Value>> {
        debug!(lax = path.is_lax(), silent, "jsonpath query");
        let mut found = ValueSequence::new();
        match self.execute(path, doc, vars, Some(&mut found)) {
            Ok(_) => Ok(found.iter().map(JsonItem::to_json).collect()),
            Err(e) if silent && e.can_suppress() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// All result items wrapped into a JSON array.
    pub fn query_array(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Value> {
        self.query(doc, path, vars, silent).map(Value::Array)
    }

    /// The first result item, if any.
    pub fn query_first(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Option<Value>> {
        let mut found = ValueSequence::new();
        match self.execute(path, doc, vars, Some(&mut found)) {
            Ok(_) => Ok(found.head().map(JsonItem::to_json)),
            Err(e) if silent && e.can_suppress() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The first result item rendered as unquoted text.
    pub fn query_first_text(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Option<String>> {
        let mut found = ValueSequence::new();
        match self.execute(path, doc, vars, Some(&mut found)) {
            Ok(_) => Ok(found.head().map(JsonItem::unquote_text)),
            Err(e) if silent && e.can_suppress() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The path's singleton scalar result. Errors when the result holds
    /// more than one item or a composite.
    pub fn query_value(
        &self,
        doc: &Value,
        path: &PathExpr,
        vars: Option<&dyn VariableResolver>,
        silent: bool,
    ) -> Result<Option<Value>> {
        let mut found = ValueSequence::new();
        match self.execute(path, doc, vars, Some(&mut found)) {
            Ok(_) => {
                if found.is_empty() {
                    return Ok(None);
                }
                if found.len() > 1 {
                    return if silent {
                        Ok(None)
                    } else {
                        Err(JsonPathError::singleton_required(
                            "expression should return a singleton scalar",
                        ))
                    };
                }
                match found.head() {
                    Some(JsonItem::Binary(_)) => {
                        if silent {
                            Ok(None)
                        } else {
                            Err(JsonPathError::scalar_required(
                                "expression should return a scalar value",
                            ))
                        }
                    }
                    Some(item) => Ok(Some(item.to_json())),
                    None => Ok(None),
                }
            }
            Err(e) if silent && e.can_suppress() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a compiled path over a document.
    ///
    /// With a result sequence, every matching item is collected. Without
    /// one this is an existence probe; strict mode still computes the
    /// full sequence first, because it must observe all errors before
    /// answering.
    fn execute<'a>(
        &'a self,
        path: &'a PathExpr,
        doc: &'a Value,
        vars: Option<&'a dyn VariableResolver>,
        result: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let root = JsonItem::from_json(doc);
        let mut cxt = ExecContext {
            vars,
            root: root.clone(),
            stack: vec![root.clone()],
            base_object: BaseObject {
                container: None,
                id: 0,
            },
            last_generated_id: 1 + vars.map_or(0, VariableResolver::base_object_count),
            innermost_array_size: -1,
            lax: path.is_lax(),
            ignore_structural_errors: path.is_lax(),
            depth: 0,
            max_depth: self.config.max_recursion_depth,
            collation: self.collation.as_ref(),
            interrupt: self.interrupt.as_deref(),
            regex_cache: FxHashMap::default(),
        };

        if !path.is_lax() && result.is_none() {
            let mut vals = ValueSequence::new();
            cxt.execute(path.root(), &root, Some(&mut vals))?;
            return Ok(if vals.is_empty() {
                ExecOutcome::NotFound
            } else {
                ExecOutcome::Found
            });
        }

        cxt.execute(path.root(), &root, result)
    }
}

impl std::fmt::Debug for JsonPathEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonPathEngine")
            .field("config", &self.config)
            .field("collation", &self.collation)
            .finish_non_exhaustive()
    }
}
