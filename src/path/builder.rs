//! Programmatic construction of path programs
//!
//! Accessor methods append a step at the end of the chain, so programs
//! read left to right the way path text does:
//!
//! ```
//! use sqljsonpath::path::builder::*;
//! use sqljsonpath::path::PathExpr;
//!
//! // lax $.a.b[1]
//! let path = PathExpr::lax(root().key("a").key("b").index(1));
//!
//! // lax $[*] ? (@.x >= 2)
//! let path = PathExpr::lax(root().any_array().filter(current().key("x").ge(number(2))));
//! # let _ = path;
//! ```

use rust_decimal::Decimal;

use super::{
    ArraySubscript, BinaryArithOp, ComparisonOp, ItemKind, PathItem, RegexFlags, UnaryArithOp,
    ANY_UNBOUNDED,
};

/// `$`: the root document.
pub fn root() -> PathItem {
    PathItem::new(ItemKind::Root)
}

/// `@`: the current filter item.
pub fn current() -> PathItem {
    PathItem::new(ItemKind::Current)
}

/// `last`: usable only inside array subscripts.
pub fn last() -> PathItem {
    PathItem::new(ItemKind::Last)
}

/// `null` literal.
pub fn null() -> PathItem {
    PathItem::new(ItemKind::Null)
}

/// Boolean literal.
pub fn boolean(value: bool) -> PathItem {
    PathItem::new(ItemKind::Bool(value))
}

/// Numeric literal.
pub fn number(value: impl Into<Decimal>) -> PathItem {
    PathItem::new(ItemKind::Numeric(value.into()))
}

/// String literal.
pub fn string(value: impl Into<String>) -> PathItem {
    PathItem::new(ItemKind::String(value.into()))
}

/// `$name` variable reference.
pub fn variable(name: impl Into<String>) -> PathItem {
    PathItem::new(ItemKind::Variable(name.into()))
}

/// `exists (expr)` predicate.
pub fn exists(expr: PathItem) -> PathItem {
    PathItem::new(ItemKind::Exists(Box::new(expr)))
}

impl PathItem {
    /// Append a step at the end of this chain.
    pub fn then(mut self, next: PathItem) -> Self {
        self.set_tail(next);
        self
    }

    fn step(self, kind: ItemKind) -> Self {
        self.then(PathItem::new(kind))
    }

    /// `.key` member accessor.
    pub fn key(self, name: impl Into<String>) -> Self {
        self.step(ItemKind::Key(name.into()))
    }

    /// `.*` wildcard member accessor.
    pub fn any_key(self) -> Self {
        self.step(ItemKind::AnyKey)
    }

    /// `[*]` wildcard array accessor.
    pub fn any_array(self) -> Self {
        self.step(ItemKind::AnyArray)
    }

    /// `[n]` single-index accessor.
    pub fn index(self, index: i64) -> Self {
        self.index_expr(number(index))
    }

    /// `[expr]` accessor with a computed subscript.
    pub fn index_expr(self, subscript: PathItem) -> Self {
        self.step(ItemKind::IndexArray(vec![ArraySubscript::Index(subscript)]))
    }

    /// `[from TO to]` range accessor.
    pub fn slice(self, from: PathItem, to: PathItem) -> Self {
        self.step(ItemKind::IndexArray(vec![ArraySubscript::Range(from, to)]))
    }

    /// `[s, ...]` accessor with an explicit subscript list.
    pub fn subscripts(self, subscripts: Vec<ArraySubscript>) -> Self {
        self.step(ItemKind::IndexArray(subscripts))
    }

    /// `.**` unbounded recursive descent.
    pub fn descendants(self) -> Self {
        self.descendants_bounded(0, ANY_UNBOUNDED)
    }

    /// `.**{first, last}` bounded recursive descent.
    pub fn descendants_bounded(self, first: u32, last: u32) -> Self {
        self.step(ItemKind::Any { first, last })
    }

    /// `? (predicate)` filter.
    pub fn filter(self, predicate: PathItem) -> Self {
        self.step(ItemKind::Filter(Box::new(predicate)))
    }

    /// `.type()` item method.
    pub fn type_(self) -> Self {
        self.step(ItemKind::Type)
    }

    /// `.size()` item method.
    pub fn size(self) -> Self {
        self.step(ItemKind::Size)
    }

    /// `.abs()` item method.
    pub fn abs(self) -> Self {
        self.step(ItemKind::Abs)
    }

    /// `.floor()` item method.
    pub fn floor(self) -> Self {
        self.step(ItemKind::Floor)
    }

    /// `.ceiling()` item method.
    pub fn ceiling(self) -> Self {
        self.step(ItemKind::Ceiling)
    }

    /// `.double()` item method.
    pub fn double(self) -> Self {
        self.step(ItemKind::Double)
    }

    /// `.keyvalue()` item method.
    pub fn keyvalue(self) -> Self {
        self.step(ItemKind::KeyValue)
    }

    /// `.datetime()` with the default ISO templates.
    pub fn datetime(self) -> Self {
        self.step(ItemKind::Datetime {
            template: None,
            timezone: None,
        })
    }

    /// `.datetime(template)` with an explicit template.
    pub fn datetime_format(self, template: impl Into<String>) -> Self {
        self.step(ItemKind::Datetime {
            template: Some(template.into()),
            timezone: None,
        })
    }

    /// `.datetime(template, timezone)` with an explicit template and a
    /// timezone argument expression.
    pub fn datetime_format_tz(self, template: impl Into<String>, timezone: PathItem) -> Self {
        self.step(ItemKind::Datetime {
            template: Some(template.into()),
            timezone: Some(Box::new(timezone)),
        })
    }

    fn compare(self, op: ComparisonOp, rhs: PathItem) -> Self {
        PathItem::new(ItemKind::Comparison {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        })
    }

    /// `==` comparison predicate.
    pub fn eq(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::Equal, rhs)
    }

    /// `!=` comparison predicate.
    pub fn ne(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::NotEqual, rhs)
    }

    /// `<` comparison predicate.
    pub fn lt(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::Less, rhs)
    }

    /// `<=` comparison predicate.
    pub fn le(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::LessOrEqual, rhs)
    }

    /// `>` comparison predicate.
    pub fn gt(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::Greater, rhs)
    }

    /// `>=` comparison predicate.
    pub fn ge(self, rhs: PathItem) -> Self {
        self.compare(ComparisonOp::GreaterOrEqual, rhs)
    }

    /// `&&` conjunction of two predicates.
    pub fn and(self, rhs: PathItem) -> Self {
        PathItem::new(ItemKind::And(Box::new(self), Box::new(rhs)))
    }

    /// `||` disjunction of two predicates.
    pub fn or(self, rhs: PathItem) -> Self {
        PathItem::new(ItemKind::Or(Box::new(self), Box::new(rhs)))
    }

    /// `!` negation of a predicate.
    pub fn negated(self) -> Self {
        PathItem::new(ItemKind::Not(Box::new(self)))
    }

    /// `(predicate) is unknown`.
    pub fn is_unknown(self) -> Self {
        PathItem::new(ItemKind::IsUnknown(Box::new(self)))
    }

    /// `starts with` predicate; the prefix must evaluate to a singleton
    /// string.
    pub fn starts_with(self, prefix: PathItem) -> Self {
        PathItem::new(ItemKind::StartsWith {
            whole: Box::new(self),
            prefix: Box::new(prefix),
        })
    }

    /// `like_regex` predicate.
    pub fn like_regex(self, pattern: impl Into<String>, flags: RegexFlags) -> Self {
        PathItem::new(ItemKind::LikeRegex {
            operand: Box::new(self),
            pattern: pattern.into(),
            flags,
        })
    }

    fn arith(self, op: BinaryArithOp, rhs: PathItem) -> Self {
        PathItem::new(ItemKind::BinaryArith {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        })
    }

    /// `+` addition.
    pub fn plus(self, rhs: PathItem) -> Self {
        self.arith(BinaryArithOp::Add, rhs)
    }

    /// `-` subtraction.
    pub fn minus(self, rhs: PathItem) -> Self {
        self.arith(BinaryArithOp::Sub, rhs)
    }

    /// `*` multiplication.
    pub fn multiply(self, rhs: PathItem) -> Self {
        self.arith(BinaryArithOp::Mul, rhs)
    }

    /// `/` division.
    pub fn divide(self, rhs: PathItem) -> Self {
        self.arith(BinaryArithOp::Div, rhs)
    }

    /// `%` modulo.
    pub fn modulo(self, rhs: PathItem) -> Self {
        self.arith(BinaryArithOp::Mod, rhs)
    }

    /// Unary `-`.
    pub fn negate(self) -> Self {
        PathItem::new(ItemKind::UnaryArith {
            op: UnaryArithOp::Minus,
            operand: Box::new(self),
        })
    }

    /// Unary `+`.
    pub fn unary_plus(self) -> Self {
        PathItem::new(ItemKind::UnaryArith {
            op: UnaryArithOp::Plus,
            operand: Box::new(self),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_sugar() {
        let item = root().key("a").index(1);
        let key = item.next().unwrap();
        let idx = key.next().unwrap();
        match idx.kind() {
            ItemKind::IndexArray(subs) => {
                assert_eq!(subs.len(), 1);
                assert!(matches!(&subs[0], ArraySubscript::Index(e)
                    if matches!(e.kind(), ItemKind::Numeric(n) if *n == Decimal::from(1))));
            }
            other => panic!("expected IndexArray, got {other:?}"),
        }
    }

    #[test]
    fn test_predicate_operands_keep_chains() {
        let pred = current().key("x").ge(number(2));
        match pred.kind() {
            ItemKind::Comparison { op, left, right } => {
                assert_eq!(*op, ComparisonOp::GreaterOrEqual);
                assert!(matches!(left.kind(), ItemKind::Current));
                assert!(matches!(left.next().unwrap().kind(), ItemKind::Key(k) if k == "x"));
                assert!(matches!(right.kind(), ItemKind::Numeric(_)));
            }
            other => panic!("expected Comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_descendants_bounds() {
        let item = root().descendants();
        assert!(matches!(
            item.next().unwrap().kind(),
            ItemKind::Any { first: 0, last: ANY_UNBOUNDED }
        ));

        let item = root().descendants_bounded(1, 2);
        assert!(matches!(
            item.next().unwrap().kind(),
            ItemKind::Any { first: 1, last: 2 }
        ));
    }
}
