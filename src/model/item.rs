//! Core item type for SQL/JSON path execution

use std::borrow::Cow;
use std::rc::Rc;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value;

use super::datetime::DateTimeItem;

/// Type of an SQL/JSON item as reported by `.type()` and used by the
/// structural checks. A binary container is always reported as `Array`
/// or `Object`, never as an opaque "binary".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// JSON null
    Null,
    /// JSON boolean
    Bool,
    /// JSON number
    Number,
    /// JSON string
    String,
    /// JSON array container
    Array,
    /// JSON object container
    Object,
    /// Virtual datetime item
    Datetime,
}

/// An SQL/JSON item flowing between path nodes.
///
/// Scalars are always carried unwrapped; composites stay as references
/// to containers ([`ContainerRef`]) and are never materialised
/// element-by-element unless iterated. The `Datetime` variant exists
/// only in memory and renders as an ISO string on serialization.
#[derive(Debug, Clone)]
pub enum JsonItem<'a> {
    /// JSON null
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number as an arbitrary-precision decimal
    Number(Decimal),
    /// JSON string, borrowed from the document where possible
    String(Cow<'a, str>),
    /// Reference to an array or object container
    Binary(ContainerRef<'a>),
    /// Virtual datetime item produced by `.datetime()`
    Datetime(DateTimeItem),
}

/// Reference to a composite JSON container.
///
/// `Doc` borrows from the caller's input document (or variables).
/// `Generated` points into an object synthesized during evaluation
/// (by `.keyvalue()`), addressed by its pre-order node ordinal within
/// the generated root so the reference stays cheap to clone and
/// position-identifiable.
#[derive(Debug, Clone)]
pub enum ContainerRef<'a> {
    /// Borrowed container inside the input document
    Doc(&'a Value),
    /// Node inside a generated object, addressed by pre-order ordinal
    Generated {
        /// The generated object owning this container
        root: Rc<Value>,
        /// Pre-order ordinal of the container within `root` (0 = root)
        node: usize,
    },
}

impl<'a> ContainerRef<'a> {
    /// Wrap a freshly generated object as its own container root.
    pub(crate) fn generated_root(root: Rc<Value>) -> Self {
        Self::Generated { root, node: 0 }
    }

    /// The underlying JSON value of this container.
    pub fn json(&self) -> &Value {
        match self {
            Self::Doc(v) => v,
            Self::Generated { root, node } => preorder_get(root, *node).unwrap_or(root),
        }
    }

    /// Whether the container is an object.
    pub fn is_object(&self) -> bool {
        self.json().is_object()
    }

    /// Whether the container is an array.
    pub fn is_array(&self) -> bool {
        self.json().is_array()
    }

    /// Number of elements or key-value pairs.
    pub fn len(&self) -> usize {
        match self.json() {
            Value::Array(elems) => elems.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    /// Whether the container has no elements or pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child items in document order: array elements, or object member
    /// values (keys are skipped, as the accessors require).
    pub fn children(&self) -> Vec<JsonItem<'a>> {
        match self {
            Self::Doc(v) => match v {
                Value::Array(elems) => elems.iter().map(JsonItem::from_json).collect(),
                Value::Object(map) => map.values().map(JsonItem::from_json).collect(),
                _ => Vec::new(),
            },
            Self::Generated { root, node } => {
                let Some(parent) = preorder_get(root, *node) else {
                    return Vec::new();
                };
                let kids: Vec<&Value> = match parent {
                    Value::Array(elems) => elems.iter().collect(),
                    Value::Object(map) => map.values().collect(),
                    _ => Vec::new(),
                };
                kids.into_iter()
                    .map(|child| generated_child(root, child))
                    .collect()
            }
        }
    }

    /// Look up an object member by key.
    pub fn member(&self, key: &str) -> Option<JsonItem<'a>> {
        match self {
            Self::Doc(v) => v.as_object()?.get(key).map(JsonItem::from_json),
            Self::Generated { root, node } => {
                let parent = preorder_get(root, *node)?;
                let child = parent.as_object()?.get(key)?;
                Some(generated_child(root, child))
            }
        }
    }

    /// Extract the i-th array element.
    pub fn element(&self, index: usize) -> Option<JsonItem<'a>> {
        match self {
            Self::Doc(v) => v.as_array()?.get(index).map(JsonItem::from_json),
            Self::Generated { root, node } => {
                let parent = preorder_get(root, *node)?;
                let child = parent.as_array()?.get(index)?;
                Some(generated_child(root, child))
            }
        }
    }
}

impl PartialEq for ContainerRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.json() == other.json()
    }
}

impl<'a> JsonItem<'a> {
    /// Build an item from a JSON value, unwrapping scalars.
    ///
    /// Numbers follow a conversion ladder: integers stay exact, other
    /// values go through `f64`, and anything outside the decimal range
    /// is carried as its literal text.
    pub fn from_json(v: &'a Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::from_number(n),
            Value::String(s) => Self::String(Cow::Borrowed(s.as_str())),
            Value::Array(_) | Value::Object(_) => Self::Binary(ContainerRef::Doc(v)),
        }
    }

    pub(crate) fn from_number(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Self::Number(Decimal::from(i))
        } else if let Some(u) = n.as_u64() {
            Self::Number(Decimal::from(u))
        } else if let Some(d) = n.as_f64().and_then(Decimal::from_f64) {
            Self::Number(d)
        } else {
            Self::String(Cow::Owned(n.to_string()))
        }
    }

    /// The item's SQL/JSON type.
    pub fn json_type(&self) -> JsonType {
        match self {
            Self::Null => JsonType::Null,
            Self::Bool(_) => JsonType::Bool,
            Self::Number(_) => JsonType::Number,
            Self::String(_) => JsonType::String,
            Self::Binary(c) => {
                if c.is_object() {
                    JsonType::Object
                } else {
                    JsonType::Array
                }
            }
            Self::Datetime(_) => JsonType::Datetime,
        }
    }

    /// The `.type()` name of the item.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Binary(c) => {
                if c.is_object() {
                    "object"
                } else {
                    "array"
                }
            }
            Self::Datetime(dt) => dt.type_name(),
        }
    }

    /// Size of an array item, or `None` if the item is not an array.
    pub fn array_size(&self) -> Option<usize> {
        match self {
            Self::Binary(c) if c.is_array() => Some(c.len()),
            _ => None,
        }
    }

    /// The numeric payload, if the item is a number.
    pub fn as_number(&self) -> Option<&Decimal> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The string payload, if the item is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if the item is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the item is a composite container.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// The container reference, if the item is a composite.
    pub fn container(&self) -> Option<&ContainerRef<'a>> {
        match self {
            Self::Binary(c) => Some(c),
            _ => None,
        }
    }

    /// Render the item as an owned JSON value. Datetimes render as ISO
    /// strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => decimal_to_json(n),
            Self::String(s) => Value::String(s.to_string()),
            Self::Binary(c) => c.json().clone(),
            Self::Datetime(dt) => Value::String(dt.to_iso_string()),
        }
    }

    /// Render the item as unquoted text: strings are raw, scalars use
    /// their canonical form, composites serialize as compact JSON.
    pub fn unquote_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.to_string(),
            Self::Binary(c) => c.json().to_string(),
            Self::Datetime(dt) => dt.to_iso_string(),
        }
    }
}

impl PartialEq for JsonItem<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Datetime(a), Self::Datetime(b)) => a == b,
            _ => false,
        }
    }
}

fn decimal_to_json(n: &Decimal) -> Value {
    if n.fract().is_zero() {
        if let Some(i) = n.to_i64() {
            return Value::Number(serde_json::Number::from(i));
        }
    }
    if let Some(f) = n.to_f64() {
        if let Some(num) = serde_json::Number::from_f64(f) {
            return Value::Number(num);
        }
    }
    Value::String(n.to_string())
}

fn generated_child<'a>(root: &Rc<Value>, child: &Value) -> JsonItem<'a> {
    match child {
        Value::Null => JsonItem::Null,
        Value::Bool(b) => JsonItem::Bool(*b),
        Value::Number(n) => JsonItem::from_number(n),
        Value::String(s) => JsonItem::String(Cow::Owned(s.clone())),
        Value::Array(_) | Value::Object(_) => {
            let node = preorder_ordinal(root, child).unwrap_or(0);
            JsonItem::Binary(ContainerRef::Generated {
                root: Rc::clone(root),
                node,
            })
        }
    }
}

/// Fetch the value at a pre-order ordinal within `root` (0 = root).
pub(crate) fn preorder_get(root: &Value, index: usize) -> Option<&Value> {
    fn walk<'v>(v: &'v Value, counter: &mut usize, index: usize) -> Option<&'v Value> {
        if *counter == index {
            return Some(v);
        }
        *counter += 1;
        match v {
            Value::Array(elems) => elems.iter().find_map(|e| walk(e, counter, index)),
            Value::Object(map) => map.values().find_map(|e| walk(e, counter, index)),
            _ => None,
        }
    }
    let mut counter = 0;
    walk(root, &mut counter, index)
}

/// Pre-order ordinal of `target` (by identity) within `root`.
pub(crate) fn preorder_ordinal(root: &Value, target: &Value) -> Option<usize> {
    fn walk(v: &Value, counter: &mut usize, target: *const Value) -> Option<usize> {
        if std::ptr::eq(v, target) {
            return Some(*counter);
        }
        *counter += 1;
        match v {
            Value::Array(elems) => elems.iter().find_map(|e| walk(e, counter, target)),
            Value::Object(map) => map.values().find_map(|e| walk(e, counter, target)),
            _ => None,
        }
    }
    let mut counter = 0;
    walk(root, &mut counter, target)
}
