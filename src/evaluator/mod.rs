//! Recursive-descent evaluator for compiled path programs
//!
//! Execution walks the path-item chain, processing one input item per
//! step and producing a sequence of output items that feed the next
//! step. When no output sequence is provided the walk is an existence
//! probe and stops at the first satisfying item (except in strict mode,
//! which must observe every error before answering).
//!
//! Lax mode decomposes into three separately-toggled behaviours:
//! auto-unwrapping arrays on access, auto-wrapping scalars on
//! subscripting, and ignoring structural errors. `.**` descent and
//! `exists()` adjust only the pieces they need.

mod arithmetic;
mod methods;
mod predicate;

pub use predicate::TriBool;

use std::borrow::Cow;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::collation::StrCollation;
use crate::error::{JsonPathError, Result};
use crate::model::{ContainerRef, JsonItem, JsonType, ValueSequence};
use crate::path::{ArraySubscript, ItemKind, PathItem, ANY_UNBOUNDED};
use crate::vars::VariableResolver;

/// Outcome of executing a path item when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// At least one result item was produced
    Found,
    /// The result sequence is empty
    NotFound,
}

pub(crate) type ExecResult = Result<ExecOutcome>;

/// Base object and id for `.keyvalue()` id generation.
#[derive(Debug, Clone)]
pub(crate) struct BaseObject<'a> {
    pub container: Option<ContainerRef<'a>>,
    pub id: i64,
}

/// Per-evaluation execution state, threaded through every recursive
/// call. Created by the engine for one evaluation and discarded after.
pub(crate) struct ExecContext<'a> {
    pub vars: Option<&'a dyn VariableResolver>,
    pub root: JsonItem<'a>,
    /// LIFO of `@` items; the top is the current filter item
    pub stack: Vec<JsonItem<'a>>,
    pub base_object: BaseObject<'a>,
    pub last_generated_id: i64,
    /// Size of the innermost array subscript context, -1 outside one
    pub innermost_array_size: i64,
    pub lax: bool,
    pub ignore_structural_errors: bool,
    pub depth: usize,
    pub max_depth: usize,
    pub collation: &'a dyn StrCollation,
    pub interrupt: Option<&'a (dyn Fn() -> bool + Send + Sync)>,
    /// Compiled `like_regex` patterns, keyed by pattern identity
    pub regex_cache: FxHashMap<usize, Regex>,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn auto_unwrap(&self) -> bool {
        self.lax
    }

    pub(crate) fn auto_wrap(&self) -> bool {
        self.lax
    }

    pub(crate) fn strict_absence_of_errors(&self) -> bool {
        !self.lax
    }

    fn check_interrupt(&self) -> Result<()> {
        if let Some(hook) = self.interrupt {
            if hook() {
                return Err(JsonPathError::Interrupted);
            }
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.check_interrupt()?;
        if self.depth >= self.max_depth {
            return Err(JsonPathError::RecursionLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Execute a path item with automatic unwrapping of the current item
    /// in lax mode.
    pub(crate) fn execute(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let unwrap = self.auto_unwrap();
        self.execute_opt_unwrap_target(node, item, found, unwrap)
    }

    /// Main dispatch: process one path item over one input item. When
    /// `unwrap` is true an array input is unwrapped element-wise first.
    pub(crate) fn execute_opt_unwrap_target(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        found: Option<&mut ValueSequence<'a>>,
        unwrap: bool,
    ) -> ExecResult {
        self.enter()?;
        let res = self.dispatch(node, item, found, unwrap);
        self.depth -= 1;
        res
    }

    fn dispatch(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        mut found: Option<&mut ValueSequence<'a>>,
        unwrap: bool,
    ) -> ExecResult {
        if node.is_predicate() {
            let st = self.execute_bool(node, item, true)?;
            return self.append_bool_result(node, found, st);
        }

        match node.kind() {
            ItemKind::Key(name) => match item {
                JsonItem::Binary(c) if c.is_object() => {
                    if let Some(child) = c.member(name) {
                        self.execute_next(Some(node), None, &child, found)
                    } else if !self.ignore_structural_errors {
                        Err(JsonPathError::member_not_found(format!(
                            "JSON object does not contain key \"{name}\""
                        )))
                    } else {
                        Ok(ExecOutcome::NotFound)
                    }
                }
                JsonItem::Binary(c) if unwrap && c.is_array() => {
                    self.unwrap_target_array(Some(node), c, found, false)
                }
                _ => {
                    if !self.ignore_structural_errors {
                        Err(JsonPathError::member_not_found(
                            "jsonpath member accessor can only be applied to an object",
                        ))
                    } else {
                        Ok(ExecOutcome::NotFound)
                    }
                }
            },

            ItemKind::Root => {
                let root = self.root.clone();
                let saved = self.set_base_object(&root, 0);
                let res = self.execute_next(Some(node), None, &root, found);
                self.base_object = saved;
                res
            }

            ItemKind::Current => {
                let current = self
                    .stack
                    .last()
                    .cloned()
                    .unwrap_or_else(|| self.root.clone());
                self.execute_next(Some(node), None, &current, found)
            }

            ItemKind::AnyArray => match item {
                JsonItem::Binary(c) if c.is_array() => {
                    let unwrap_elements = self.auto_unwrap();
                    self.unwrap_target_array(node.next(), c, found, unwrap_elements)
                }
                _ if self.auto_wrap() => self.execute_next(Some(node), None, item, found),
                _ if !self.ignore_structural_errors => Err(JsonPathError::array_not_found(
                    "jsonpath wildcard array accessor can only be applied to an array",
                )),
                _ => Ok(ExecOutcome::NotFound),
            },

            ItemKind::IndexArray(subscripts) => {
                if item.json_type() == JsonType::Array || self.auto_wrap() {
                    let size = item.array_size();
                    let singleton = size.is_none();
                    let size = size.unwrap_or(1) as i64;

                    let saved_size = self.innermost_array_size;
                    self.innermost_array_size = size;
                    let res =
                        self.execute_array_subscripts(node, subscripts, item, size, singleton, found);
                    self.innermost_array_size = saved_size;
                    res
                } else if !self.ignore_structural_errors {
                    Err(JsonPathError::array_not_found(
                        "jsonpath array accessor can only be applied to an array",
                    ))
                } else {
                    Ok(ExecOutcome::NotFound)
                }
            }

            ItemKind::Last => {
                if self.innermost_array_size < 0 {
                    return Err(JsonPathError::LastOutsideSubscript);
                }
                if !node.has_next() && found.is_none() {
                    return Ok(ExecOutcome::Found);
                }
                let last = JsonItem::Number(Decimal::from(self.innermost_array_size - 1));
                self.execute_next(Some(node), None, &last, found)
            }

            ItemKind::AnyKey => match item {
                JsonItem::Binary(c) if c.is_object() => {
                    let unwrap_next = self.auto_unwrap();
                    self.execute_any(node.next(), c, found, 1, 1, 1, false, unwrap_next)
                }
                JsonItem::Binary(c) if unwrap && c.is_array() => {
                    self.unwrap_target_array(Some(node), c, found, false)
                }
                _ => {
                    if !self.ignore_structural_errors {
                        Err(JsonPathError::object_not_found(
                            "jsonpath wildcard member accessor can only be applied to an object",
                        ))
                    } else {
                        Ok(ExecOutcome::NotFound)
                    }
                }
            },

            ItemKind::BinaryArith { op, left, right } => {
                self.execute_binary_arith(node, *op, left, right, item, found)
            }

            ItemKind::UnaryArith { op, operand } => {
                self.execute_unary_arith(node, *op, operand, item, found)
            }

            ItemKind::Filter(predicate) => {
                if unwrap && item.json_type() == JsonType::Array {
                    if let JsonItem::Binary(c) = item {
                        return self.unwrap_target_array(Some(node), c, found, false);
                    }
                }
                let st = self.execute_nested_bool(predicate, item)?;
                if st != TriBool::True {
                    Ok(ExecOutcome::NotFound)
                } else {
                    self.execute_next(Some(node), None, item, found)
                }
            }

            ItemKind::Any { first, last } => {
                let mut res = ExecOutcome::NotFound;

                // try the item itself before descending
                if *first == 0 {
                    let saved = self.ignore_structural_errors;
                    self.ignore_structural_errors = true;
                    let shortcut =
                        self.execute_next(Some(node), None, item, found.as_deref_mut());
                    self.ignore_structural_errors = saved;
                    res = shortcut?;
                    if res == ExecOutcome::Found && found.is_none() {
                        return Ok(res);
                    }
                }

                if let JsonItem::Binary(c) = item {
                    let unwrap_next = self.auto_unwrap();
                    res = self.execute_any(
                        node.next(),
                        c,
                        found,
                        1,
                        *first,
                        *last,
                        true,
                        unwrap_next,
                    )?;
                }
                Ok(res)
            }

            ItemKind::Null => self.execute_literal(node, JsonItem::Null, found),
            ItemKind::Bool(b) => self.execute_literal(node, JsonItem::Bool(*b), found),
            ItemKind::Numeric(n) => self.execute_literal(node, JsonItem::Number(*n), found),
            ItemKind::String(s) => {
                self.execute_literal(node, JsonItem::String(Cow::Borrowed(s.as_str())), found)
            }
            ItemKind::Variable(name) => self.execute_variable(node, name, found),

            ItemKind::Type => {
                let type_name = JsonItem::String(Cow::Borrowed(item.type_name()));
                self.execute_next(Some(node), None, &type_name, found)
            }

            ItemKind::Size => {
                let size = match item.array_size() {
                    Some(size) => size as i64,
                    None => {
                        if !self.auto_wrap() {
                            if !self.ignore_structural_errors {
                                return Err(JsonPathError::array_not_found(
                                    "jsonpath item method .size() can only be applied to an array",
                                ));
                            }
                            return Ok(ExecOutcome::NotFound);
                        }
                        1
                    }
                };
                let size = JsonItem::Number(Decimal::from(size));
                self.execute_next(Some(node), None, &size, found)
            }

            ItemKind::Abs => self.execute_numeric_method(node, Decimal::abs, item, unwrap, found),
            ItemKind::Floor => {
                self.execute_numeric_method(node, Decimal::floor, item, unwrap, found)
            }
            ItemKind::Ceiling => {
                self.execute_numeric_method(node, Decimal::ceil, item, unwrap, found)
            }
            ItemKind::Double => self.execute_double(node, item, unwrap, found),

            ItemKind::Datetime { template, timezone } => self.execute_datetime(
                node,
                template.as_deref(),
                timezone.as_deref(),
                item,
                unwrap,
                found,
            ),

            ItemKind::KeyValue => {
                if unwrap && item.json_type() == JsonType::Array {
                    if let JsonItem::Binary(c) = item {
                        return self.unwrap_target_array(Some(node), c, found, false);
                    }
                }
                self.execute_keyvalue(node, item, found)
            }

            // predicates were handled above
            ItemKind::And(..)
            | ItemKind::Or(..)
            | ItemKind::Not(_)
            | ItemKind::IsUnknown(_)
            | ItemKind::Comparison { .. }
            | ItemKind::StartsWith { .. }
            | ItemKind::LikeRegex { .. }
            | ItemKind::Exists(_) => Err(JsonPathError::NotAPredicate),
        }
    }

    /// Execute the next path item if one exists; otherwise append the
    /// item to the output sequence (when collecting).
    pub(crate) fn execute_next(
        &mut self,
        cur: Option<&'a PathItem>,
        next: Option<&'a PathItem>,
        item: &JsonItem<'a>,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let next = next.or_else(|| cur.and_then(PathItem::next));

        if let Some(next) = next {
            return self.execute(next, item, found);
        }

        if let Some(seq) = found {
            seq.append(item.clone());
        }
        Ok(ExecOutcome::Found)
    }

    fn execute_literal(
        &mut self,
        node: &'a PathItem,
        value: JsonItem<'a>,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        if !node.has_next() && found.is_none() {
            return Ok(ExecOutcome::Found);
        }
        let saved = self.base_object.clone();
        let res = self.execute_next(Some(node), None, &value, found);
        self.base_object = saved;
        res
    }

    fn execute_variable(
        &mut self,
        node: &'a PathItem,
        name: &str,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        if !node.has_next() && found.is_none() {
            return Ok(ExecOutcome::Found);
        }
        let saved = self.base_object.clone();
        let value = self.get_variable(name)?;
        let res = self.execute_next(Some(node), None, &value, found);
        self.base_object = saved;
        res
    }

    fn get_variable(&mut self, name: &str) -> Result<JsonItem<'a>> {
        let resolved = self
            .vars
            .and_then(|vars| vars.resolve(name))
            .ok_or_else(|| JsonPathError::undefined_variable(name))?;

        if let Some(base) = resolved.base {
            if base.id > 0 {
                self.base_object = BaseObject {
                    container: Some(ContainerRef::Doc(base.container)),
                    id: base.id,
                };
            }
        }
        Ok(resolved.item)
    }

    /// Unwrap an array container and execute a path item (or collect)
    /// for each of its elements.
    pub(crate) fn unwrap_target_array(
        &mut self,
        node: Option<&'a PathItem>,
        container: &ContainerRef<'a>,
        found: Option<&mut ValueSequence<'a>>,
        unwrap_elements: bool,
    ) -> ExecResult {
        self.execute_any(node, container, found, 1, 1, 1, false, unwrap_elements)
    }

    /// Shared driver for `.*`, `[*]` and `.**`: iterate a container's
    /// children in document order, executing `node` (or collecting) for
    /// every child whose depth falls within `[first, last]`, and
    /// recursing into composite children while `level < last`.
    #[allow(clippy::too_many_arguments)]
    fn execute_any(
        &mut self,
        node: Option<&'a PathItem>,
        container: &ContainerRef<'a>,
        found: Option<&mut ValueSequence<'a>>,
        level: u32,
        first: u32,
        last: u32,
        ignore_structural: bool,
        unwrap_next: bool,
    ) -> ExecResult {
        self.enter()?;
        let res = self.execute_any_inner(
            node,
            container,
            found,
            level,
            first,
            last,
            ignore_structural,
            unwrap_next,
        );
        self.depth -= 1;
        res
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_any_inner(
        &mut self,
        node: Option<&'a PathItem>,
        container: &ContainerRef<'a>,
        mut found: Option<&mut ValueSequence<'a>>,
        level: u32,
        first: u32,
        last: u32,
        ignore_structural: bool,
        unwrap_next: bool,
    ) -> ExecResult {
        let mut res = ExecOutcome::NotFound;
        if level > last {
            return Ok(res);
        }

        let leaves_only = first == ANY_UNBOUNDED && last == ANY_UNBOUNDED;

        for child in container.children() {
            if level >= first || (leaves_only && !child.is_binary()) {
                match node {
                    Some(next) => {
                        let saved = self.ignore_structural_errors;
                        if ignore_structural {
                            self.ignore_structural_errors = true;
                        }
                        let step = self.execute_opt_unwrap_target(
                            next,
                            &child,
                            found.as_deref_mut(),
                            unwrap_next,
                        );
                        self.ignore_structural_errors = saved;
                        res = step?;
                        if res == ExecOutcome::Found && found.is_none() {
                            return Ok(res);
                        }
                    }
                    None => match found.as_deref_mut() {
                        Some(seq) => seq.append(child.clone()),
                        None => return Ok(ExecOutcome::Found),
                    },
                }
            }

            if level < last {
                if let JsonItem::Binary(c) = &child {
                    res = self.execute_any(
                        node,
                        c,
                        found.as_deref_mut(),
                        level + 1,
                        first,
                        last,
                        ignore_structural,
                        unwrap_next,
                    )?;
                    if res == ExecOutcome::Found && found.is_none() {
                        return Ok(res);
                    }
                }
            }
        }

        Ok(res)
    }

    /// Like [`execute`](Self::execute), but when `unwrap` is set each
    /// array in the *result* sequence is unwrapped in lax mode.
    pub(crate) fn execute_opt_unwrap_result(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        unwrap: bool,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        match found {
            Some(found) if unwrap && self.auto_unwrap() => {
                let mut seq = ValueSequence::new();
                self.execute(node, item, Some(&mut seq))?;

                for result in seq.iter() {
                    match result {
                        JsonItem::Binary(c) if c.is_array() => {
                            self.unwrap_target_array(None, c, Some(&mut *found), false)?;
                        }
                        _ => found.append(result.clone()),
                    }
                }
                Ok(ExecOutcome::Found)
            }
            found => self.execute(node, item, found),
        }
    }

    fn execute_array_subscripts(
        &mut self,
        node: &'a PathItem,
        subscripts: &'a [ArraySubscript],
        item: &JsonItem<'a>,
        size: i64,
        singleton: bool,
        mut found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let has_next = node.has_next();
        let mut res = ExecOutcome::NotFound;

        for subscript in subscripts {
            let (from_expr, to_expr) = match subscript {
                ArraySubscript::Index(e) => (e, None),
                ArraySubscript::Range(from, to) => (from, Some(to)),
            };

            let index_from = self.array_index(from_expr, item)?;
            let index_to = match to_expr {
                Some(to) => self.array_index(to, item)?,
                None => index_from,
            };

            if !self.ignore_structural_errors
                && (index_from < 0 || index_from > index_to || index_to >= size)
            {
                return Err(JsonPathError::invalid_subscript(
                    "jsonpath array subscript is out of bounds",
                ));
            }

            let index_from = index_from.max(0);
            let index_to = index_to.min(size - 1);
            res = ExecOutcome::NotFound;

            for index in index_from..=index_to {
                let element = if singleton {
                    Some(item.clone())
                } else {
                    item.container().and_then(|c| c.element(index as usize))
                };
                let Some(element) = element else { continue };

                if !has_next && found.is_none() {
                    return Ok(ExecOutcome::Found);
                }

                res = self.execute_next(Some(node), None, &element, found.as_deref_mut())?;
                if res == ExecOutcome::Found && found.is_none() {
                    break;
                }
            }

            if res == ExecOutcome::Found && found.is_none() {
                break;
            }
        }

        Ok(res)
    }

    /// Evaluate a subscript expression to a single array index,
    /// truncating toward zero.
    fn array_index(&mut self, expr: &'a PathItem, item: &JsonItem<'a>) -> Result<i64> {
        let mut seq = ValueSequence::new();
        self.execute(expr, item, Some(&mut seq))?;

        let index = match (seq.len(), seq.head()) {
            (1, Some(JsonItem::Number(n))) => n.trunc().to_i64(),
            _ => {
                return Err(JsonPathError::invalid_subscript(
                    "jsonpath array subscript is not a singleton numeric value",
                ));
            }
        };

        index
            .filter(|i| *i >= i32::MIN as i64 && *i <= i32::MAX as i64)
            .ok_or_else(|| {
                JsonPathError::invalid_subscript("jsonpath array subscript is out of integer range")
            })
    }

    /// Evaluate a nested predicate with the current item pushed as `@`.
    pub(crate) fn execute_nested_bool(
        &mut self,
        predicate: &'a PathItem,
        item: &JsonItem<'a>,
    ) -> Result<TriBool> {
        self.stack.push(item.clone());
        let res = self.execute_bool(predicate, item, false);
        self.stack.pop();
        res
    }

    /// Install a new base object, returning the previous one.
    pub(crate) fn set_base_object(&mut self, item: &JsonItem<'a>, id: i64) -> BaseObject<'a> {
        std::mem::replace(
            &mut self.base_object,
            BaseObject {
                container: item.container().cloned(),
                id,
            },
        )
    }

    /// Allocate a fresh generated-object id.
    pub(crate) fn next_generated_id(&mut self) -> i64 {
        let id = self.last_generated_id;
        self.last_generated_id += 1;
        id
    }

    /// The current base object's JSON root, if it has one.
    pub(crate) fn base_object_json(&self) -> Option<&Value> {
        self.base_object.container.as_ref().map(ContainerRef::json)
    }
}
