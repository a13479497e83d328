//! Tri-state predicate evaluation

use std::cmp::Ordering;

use regex::Regex;

use crate::error::{JsonPathError, Result};
use crate::model::{JsonItem, ValueSequence};
use crate::path::{ComparisonOp, ItemKind, PathItem, RegexFlags};

use super::{ExecContext, ExecOutcome, ExecResult};

/// Three-valued predicate result. `Unknown` (the SQL NULL analogue) is
/// produced by errors, type mismatches, and null comparisons, and is
/// only collapsed to a boolean at the outermost match/filter/exists
/// site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriBool {
    /// The predicate holds
    True,
    /// The predicate does not hold
    False,
    /// The predicate could not be decided
    Unknown,
}

impl TriBool {
    /// Logical negation; `Unknown` stays `Unknown`.
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    /// Lift a boolean into the tri-state domain.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

enum PredicateOp<'a> {
    Comparison(ComparisonOp),
    StartsWith,
    LikeRegex {
        pattern: &'a str,
        flags: RegexFlags,
    },
}

impl<'a> ExecContext<'a> {
    /// Evaluate a boolean-valued path item.
    ///
    /// Evaluation errors never escape as errors here; they fold into
    /// `Unknown`. Only usage errors (malformed programs) and guard
    /// errors propagate.
    pub(crate) fn execute_bool(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        can_have_next: bool,
    ) -> Result<TriBool> {
        if !can_have_next && node.has_next() {
            return Err(JsonPathError::PredicateWithTail);
        }

        match node.kind() {
            ItemKind::And(left, right) => {
                let res = self.execute_bool(left, item, false)?;
                if res == TriBool::False {
                    return Ok(TriBool::False);
                }

                // the right side still runs so its errors are observed
                let res2 = self.execute_bool(right, item, false)?;
                Ok(if res2 == TriBool::True { res } else { res2 })
            }

            ItemKind::Or(left, right) => {
                let res = self.execute_bool(left, item, false)?;
                if res == TriBool::True {
                    return Ok(TriBool::True);
                }

                let res2 = self.execute_bool(right, item, false)?;
                Ok(if res2 == TriBool::False { res } else { res2 })
            }

            ItemKind::Not(arg) => Ok(self.execute_bool(arg, item, false)?.negate()),

            ItemKind::IsUnknown(arg) => {
                let res = self.execute_bool(arg, item, false)?;
                Ok(TriBool::from_bool(res == TriBool::Unknown))
            }

            ItemKind::Comparison { op, left, right } => self.execute_predicate(
                PredicateOp::Comparison(*op),
                left,
                Some(right.as_ref()),
                item,
                true,
            ),

            ItemKind::StartsWith { whole, prefix } => self.execute_predicate(
                PredicateOp::StartsWith,
                whole,
                Some(prefix.as_ref()),
                item,
                false,
            ),

            ItemKind::LikeRegex {
                operand,
                pattern,
                flags,
            } => self.execute_predicate(
                PredicateOp::LikeRegex {
                    pattern,
                    flags: *flags,
                },
                operand,
                None,
                item,
                false,
            ),

            ItemKind::Exists(arg) => self.execute_exists(arg, item),

            _ => Err(JsonPathError::NotAPredicate),
        }
    }

    fn execute_exists(&mut self, arg: &'a PathItem, item: &JsonItem<'a>) -> Result<TriBool> {
        if self.strict_absence_of_errors() {
            // run to completion so every error is observed
            let mut vals = ValueSequence::new();
            match self.execute_opt_unwrap_result(arg, item, false, Some(&mut vals)) {
                Ok(_) => Ok(TriBool::from_bool(!vals.is_empty())),
                Err(e) if e.can_suppress() => Ok(TriBool::Unknown),
                Err(e) => Err(e),
            }
        } else {
            match self.execute_opt_unwrap_result(arg, item, false, None) {
                Ok(outcome) => Ok(TriBool::from_bool(outcome == ExecOutcome::Found)),
                Err(e) if e.can_suppress() => Ok(TriBool::Unknown),
                Err(e) => Err(e),
            }
        }
    }

    /// Pair every left item with every right item, applying the
    /// predicate operation. Strict mode examines all pairs to observe
    /// errors; lax mode returns on the first `True`.
    fn execute_predicate(
        &mut self,
        op: PredicateOp<'a>,
        larg: &'a PathItem,
        rarg: Option<&'a PathItem>,
        item: &JsonItem<'a>,
        unwrap_right: bool,
    ) -> Result<TriBool> {
        let mut lseq = ValueSequence::new();
        match self.execute_opt_unwrap_result(larg, item, true, Some(&mut lseq)) {
            Ok(_) => {}
            Err(e) if e.can_suppress() => return Ok(TriBool::Unknown),
            Err(e) => return Err(e),
        }

        let mut rseq = ValueSequence::new();
        if let Some(rarg) = rarg {
            match self.execute_opt_unwrap_result(rarg, item, unwrap_right, Some(&mut rseq)) {
                Ok(_) => {}
                Err(e) if e.can_suppress() => return Ok(TriBool::Unknown),
                Err(e) => return Err(e),
            }
        }

        let mut error = false;
        let mut found = false;

        for lval in lseq.iter() {
            let rvals: Vec<Option<&JsonItem<'a>>> = if rarg.is_some() {
                rseq.iter().map(Some).collect()
            } else {
                vec![None]
            };

            for rval in rvals {
                let res = self.apply_predicate(&op, lval, rval)?;
                match res {
                    TriBool::Unknown => {
                        if self.strict_absence_of_errors() {
                            return Ok(TriBool::Unknown);
                        }
                        error = true;
                    }
                    TriBool::True => {
                        if !self.strict_absence_of_errors() {
                            return Ok(TriBool::True);
                        }
                        found = true;
                    }
                    TriBool::False => {}
                }
            }
        }

        if found {
            // possible only in strict mode
            return Ok(TriBool::True);
        }
        if error {
            // possible only in lax mode
            return Ok(TriBool::Unknown);
        }
        Ok(TriBool::False)
    }

    fn apply_predicate(
        &mut self,
        op: &PredicateOp<'a>,
        lval: &JsonItem<'a>,
        rval: Option<&JsonItem<'a>>,
    ) -> Result<TriBool> {
        match (op, rval) {
            (PredicateOp::Comparison(op), Some(rval)) => Ok(self.compare_items(*op, lval, rval)),
            (PredicateOp::StartsWith, Some(rval)) => Ok(starts_with(lval, rval)),
            (PredicateOp::LikeRegex { pattern, flags }, _) => {
                self.like_regex(pattern, *flags, lval)
            }
            _ => Ok(TriBool::Unknown),
        }
    }

    /// Compare two items under a comparison operator.
    fn compare_items(&self, op: ComparisonOp, a: &JsonItem<'a>, b: &JsonItem<'a>) -> TriBool {
        let cmp: Ordering = match (a, b) {
            (JsonItem::Null, JsonItem::Null) => Ordering::Equal,
            (JsonItem::Bool(x), JsonItem::Bool(y)) => x.cmp(y),
            (JsonItem::Number(x), JsonItem::Number(y)) => x.cmp(y),
            (JsonItem::String(x), JsonItem::String(y)) => {
                if op == ComparisonOp::Equal {
                    return TriBool::from_bool(x.as_bytes() == y.as_bytes());
                }
                self.collation.compare(x, y)
            }
            (JsonItem::Datetime(x), JsonItem::Datetime(y)) => match x.compare(y) {
                Some(cmp) => cmp,
                None => return TriBool::Unknown,
            },
            (JsonItem::Binary(_), JsonItem::Binary(_)) => return TriBool::Unknown,
            _ => {
                // Equality and order comparison of nulls to non-nulls is
                // always false, but inequality comparison is true.
                if matches!(a, JsonItem::Null) || matches!(b, JsonItem::Null) {
                    return TriBool::from_bool(op == ComparisonOp::NotEqual);
                }
                // non-null items of different types are not comparable
                return TriBool::Unknown;
            }
        };

        let res = match op {
            ComparisonOp::Equal => cmp == Ordering::Equal,
            ComparisonOp::NotEqual => cmp != Ordering::Equal,
            ComparisonOp::Less => cmp == Ordering::Less,
            ComparisonOp::Greater => cmp == Ordering::Greater,
            ComparisonOp::LessOrEqual => cmp != Ordering::Greater,
            ComparisonOp::GreaterOrEqual => cmp != Ordering::Less,
        };
        TriBool::from_bool(res)
    }

    fn like_regex(
        &mut self,
        pattern: &'a str,
        flags: RegexFlags,
        item: &JsonItem<'a>,
    ) -> Result<TriBool> {
        let Some(subject) = item.as_str() else {
            return Ok(TriBool::Unknown);
        };

        // compile lazily, once per pattern per evaluation
        let key = pattern.as_ptr() as usize;
        if !self.regex_cache.contains_key(&key) {
            let re = compile_like_regex(pattern, flags)?;
            self.regex_cache.insert(key, re);
        }
        let re = &self.regex_cache[&key];

        Ok(TriBool::from_bool(re.is_match(subject)))
    }

    /// Convert a tri-state result to a JSON item (`unknown` becomes
    /// null) and chain into the next path item.
    pub(crate) fn append_bool_result(
        &mut self,
        node: &'a PathItem,
        found: Option<&mut ValueSequence<'a>>,
        res: TriBool,
    ) -> ExecResult {
        if !node.has_next() && found.is_none() {
            // found singleton boolean value
            return Ok(ExecOutcome::Found);
        }

        let item = match res {
            TriBool::Unknown => JsonItem::Null,
            other => JsonItem::Bool(other == TriBool::True),
        };
        self.execute_next(Some(node), None, &item, found)
    }
}

fn starts_with(whole: &JsonItem<'_>, prefix: &JsonItem<'_>) -> TriBool {
    match (whole.as_str(), prefix.as_str()) {
        (Some(whole), Some(prefix)) => {
            TriBool::from_bool(whole.as_bytes().starts_with(prefix.as_bytes()))
        }
        _ => TriBool::Unknown,
    }
}

fn compile_like_regex(pattern: &str, flags: RegexFlags) -> Result<Regex> {
    let source = if flags.literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };

    let mut inline = String::new();
    if flags.case_insensitive {
        inline.push('i');
    }
    if flags.multi_line {
        inline.push('m');
    }
    if flags.dot_matches_newline {
        inline.push('s');
    }
    if flags.whitespace {
        inline.push('x');
    }

    let full = if inline.is_empty() {
        source
    } else {
        format!("(?{inline}){source}")
    };

    Regex::new(&full).map_err(|e| JsonPathError::invalid_regex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tribool_negation_involution() {
        for v in [TriBool::True, TriBool::False, TriBool::Unknown] {
            assert_eq!(v.negate().negate(), v);
        }
        assert_eq!(TriBool::True.negate(), TriBool::False);
        assert_eq!(TriBool::Unknown.negate(), TriBool::Unknown);
    }

    #[test]
    fn test_literal_flag_escapes_pattern() {
        let flags = RegexFlags {
            literal: true,
            ..Default::default()
        };
        let re = compile_like_regex("a.b", flags).unwrap();
        assert!(re.is_match("a.b"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn test_case_insensitive_flag() {
        let flags = RegexFlags {
            case_insensitive: true,
            ..Default::default()
        };
        let re = compile_like_regex("^abc$", flags).unwrap();
        assert!(re.is_match("ABC"));
    }

    #[test]
    fn test_bad_pattern_is_hard_error() {
        let err = compile_like_regex("(", RegexFlags::default()).unwrap_err();
        assert!(matches!(err, JsonPathError::InvalidRegex { .. }));
        assert!(!err.can_suppress());
    }
}
