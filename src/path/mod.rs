//! Compiled path programs
//!
//! A path program is an immutable tree of [`PathItem`] nodes. The first
//! node of a chain is the leftmost step; each node optionally links to
//! the next step to its right. Argument subtrees (predicate operands,
//! arithmetic operands, subscript expressions) hang off the node's
//! payload. Producing this tree from path text is the job of an external
//! parser; the [`builder`] module constructs programs programmatically.

pub mod builder;

use rust_decimal::Decimal;

/// Sentinel bound meaning "unbounded" in `.**{m,n}` level bounds.
pub const ANY_UNBOUNDED: u32 = u32::MAX;

/// A compiled path program: the first path item plus the lax/strict
/// mode flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    root: PathItem,
    lax: bool,
}

impl PathExpr {
    /// Wrap a chain as a lax-mode program.
    pub fn lax(root: PathItem) -> Self {
        Self { root, lax: true }
    }

    /// Wrap a chain as a strict-mode program.
    pub fn strict(root: PathItem) -> Self {
        Self { root, lax: false }
    }

    /// Whether the program runs in lax mode.
    pub fn is_lax(&self) -> bool {
        self.lax
    }

    /// The first path item of the program.
    pub fn root(&self) -> &PathItem {
        &self.root
    }
}

/// One node of a compiled path program.
#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    kind: ItemKind,
    next: Option<Box<PathItem>>,
}

impl PathItem {
    /// Create a node with no next step.
    pub fn new(kind: ItemKind) -> Self {
        Self { kind, next: None }
    }

    /// The node's kind and payload.
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// The next step in the chain, if any.
    pub fn next(&self) -> Option<&PathItem> {
        self.next.as_deref()
    }

    /// Whether a next step exists.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Whether the node is a boolean-valued predicate.
    pub fn is_predicate(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::And(..)
                | ItemKind::Or(..)
                | ItemKind::Not(_)
                | ItemKind::IsUnknown(_)
                | ItemKind::Comparison { .. }
                | ItemKind::StartsWith { .. }
                | ItemKind::LikeRegex { .. }
                | ItemKind::Exists(_)
        )
    }

    /// Operator or method name used in error details.
    pub fn operation_name(&self) -> &'static str {
        match &self.kind {
            ItemKind::Root => "$",
            ItemKind::Current => "@",
            ItemKind::Key(_) => "key",
            ItemKind::AnyKey => ".*",
            ItemKind::AnyArray => "[*]",
            ItemKind::IndexArray(_) => "[]",
            ItemKind::Any { .. } => ".**",
            ItemKind::Last => "last",
            ItemKind::Null => "null",
            ItemKind::Bool(_) => "boolean",
            ItemKind::Numeric(_) => "number",
            ItemKind::String(_) => "string",
            ItemKind::Variable(_) => "variable",
            ItemKind::Filter(_) => "?",
            ItemKind::And(..) => "&&",
            ItemKind::Or(..) => "||",
            ItemKind::Not(_) => "!",
            ItemKind::IsUnknown(_) => "is unknown",
            ItemKind::Comparison { op, .. } => op.name(),
            ItemKind::BinaryArith { op, .. } => op.name(),
            ItemKind::UnaryArith { op, .. } => op.name(),
            ItemKind::StartsWith { .. } => "starts with",
            ItemKind::LikeRegex { .. } => "like_regex",
            ItemKind::Exists(_) => "exists",
            ItemKind::Type => "type",
            ItemKind::Size => "size",
            ItemKind::Abs => "abs",
            ItemKind::Floor => "floor",
            ItemKind::Ceiling => "ceiling",
            ItemKind::Double => "double",
            ItemKind::KeyValue => "keyvalue",
            ItemKind::Datetime { .. } => "datetime",
        }
    }

    pub(crate) fn set_tail(&mut self, next: PathItem) {
        match self.next {
            Some(ref mut tail) => tail.set_tail(next),
            None => self.next = Some(Box::new(next)),
        }
    }
}

/// Comparison operators of the path language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
}

impl ComparisonOp {
    /// The operator's source spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinaryArithOp {
    /// The operator's source spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

/// Unary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryArithOp {
    /// Unary `+`
    Plus,
    /// Unary `-`
    Minus,
}

impl UnaryArithOp {
    /// The operator's source spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

/// `like_regex` mode flags, mirroring the XQuery flag letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegexFlags {
    /// `i`: case insensitive
    pub case_insensitive: bool,
    /// `s`: `.` matches newline
    pub dot_matches_newline: bool,
    /// `m`: `^`/`$` match at line boundaries
    pub multi_line: bool,
    /// `x`: ignore pattern whitespace
    pub whitespace: bool,
    /// `q`: treat the pattern as a literal string
    pub literal: bool,
}

/// One subscript of an `[...]` accessor: a single index expression or
/// an inclusive `from TO to` range.
#[derive(Debug, Clone, PartialEq)]
pub enum ArraySubscript {
    /// `[expr]`
    Index(PathItem),
    /// `[expr TO expr]`
    Range(PathItem, PathItem),
}

/// Kind and payload of a path item node.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// `$`: the root document
    Root,
    /// `@`: the current filter item
    Current,
    /// `.key` member accessor
    Key(String),
    /// `.*` wildcard member accessor
    AnyKey,
    /// `[*]` wildcard array accessor
    AnyArray,
    /// `[s, ...]` subscripted array accessor
    IndexArray(Vec<ArraySubscript>),
    /// `.**{first, last}` recursive descent (bounds inclusive,
    /// [`ANY_UNBOUNDED`] = unbounded)
    Any {
        /// Minimum depth, 0 = the item itself
        first: u32,
        /// Maximum depth
        last: u32,
    },
    /// `last` inside an array subscript
    Last,
    /// `null` literal
    Null,
    /// Boolean literal
    Bool(bool),
    /// Numeric literal
    Numeric(Decimal),
    /// String literal
    String(String),
    /// `$name` variable reference
    Variable(String),
    /// `? (predicate)` filter
    Filter(Box<PathItem>),
    /// `predicate && predicate`
    And(Box<PathItem>, Box<PathItem>),
    /// `predicate || predicate`
    Or(Box<PathItem>, Box<PathItem>),
    /// `! predicate`
    Not(Box<PathItem>),
    /// `(predicate) is unknown`
    IsUnknown(Box<PathItem>),
    /// Comparison predicate
    Comparison {
        /// The comparison operator
        op: ComparisonOp,
        /// Left operand expression
        left: Box<PathItem>,
        /// Right operand expression
        right: Box<PathItem>,
    },
    /// Binary arithmetic expression
    BinaryArith {
        /// The arithmetic operator
        op: BinaryArithOp,
        /// Left operand expression
        left: Box<PathItem>,
        /// Right operand expression
        right: Box<PathItem>,
    },
    /// Unary arithmetic expression
    UnaryArith {
        /// The arithmetic operator
        op: UnaryArithOp,
        /// Operand expression
        operand: Box<PathItem>,
    },
    /// `whole starts with prefix` predicate
    StartsWith {
        /// The searched expression
        whole: Box<PathItem>,
        /// The prefix (string literal or variable)
        prefix: Box<PathItem>,
    },
    /// `expr like_regex pattern flags` predicate
    LikeRegex {
        /// The matched expression
        operand: Box<PathItem>,
        /// Regex pattern source
        pattern: String,
        /// Mode flags
        flags: RegexFlags,
    },
    /// `exists (expr)` predicate
    Exists(Box<PathItem>),
    /// `.type()` item method
    Type,
    /// `.size()` item method
    Size,
    /// `.abs()` item method
    Abs,
    /// `.floor()` item method
    Floor,
    /// `.ceiling()` item method
    Ceiling,
    /// `.double()` item method
    Double,
    /// `.keyvalue()` item method
    KeyValue,
    /// `.datetime([template [, timezone]])` item method
    Datetime {
        /// Parse template; `None` tries the ISO template ladder
        template: Option<String>,
        /// Timezone argument expression
        timezone: Option<Box<PathItem>>,
    },
}
