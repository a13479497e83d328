//! Arithmetic over singleton numeric operands

use rust_decimal::Decimal;

use crate::error::{JsonPathError, Result};
use crate::model::{JsonItem, ValueSequence};
use crate::path::{BinaryArithOp, PathItem, UnaryArithOp};

use super::{ExecContext, ExecOutcome, ExecResult};

impl<'a> ExecContext<'a> {
    /// Execute a binary arithmetic expression. Operand sequences are
    /// auto-unwrapped in lax mode and must each be a numeric singleton.
    pub(crate) fn execute_binary_arith(
        &mut self,
        node: &'a PathItem,
        op: BinaryArithOp,
        left: &'a PathItem,
        right: &'a PathItem,
        item: &JsonItem<'a>,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let mut lseq = ValueSequence::new();
        self.execute_opt_unwrap_result(left, item, true, Some(&mut lseq))?;

        let mut rseq = ValueSequence::new();
        self.execute_opt_unwrap_result(right, item, true, Some(&mut rseq))?;

        let lval = singleton_number(&lseq).ok_or_else(|| {
            JsonPathError::singleton_required(format!(
                "left operand of binary jsonpath operator {} is not a singleton numeric value",
                node.operation_name()
            ))
        })?;
        let rval = singleton_number(&rseq).ok_or_else(|| {
            JsonPathError::singleton_required(format!(
                "right operand of binary jsonpath operator {} is not a singleton numeric value",
                node.operation_name()
            ))
        })?;

        let result = apply_binary(op, lval, rval)?;

        if !node.has_next() && found.is_none() {
            return Ok(ExecOutcome::Found);
        }

        let result = JsonItem::Number(result);
        self.execute_next(Some(node), None, &result, found)
    }

    /// Execute a unary arithmetic expression for each numeric item in
    /// the operand sequence.
    pub(crate) fn execute_unary_arith(
        &mut self,
        node: &'a PathItem,
        op: UnaryArithOp,
        operand: &'a PathItem,
        item: &JsonItem<'a>,
        mut found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let mut seq = ValueSequence::new();
        self.execute_opt_unwrap_result(operand, item, true, Some(&mut seq))?;

        let has_next = node.has_next();
        let mut outcome = ExecOutcome::NotFound;

        for val in seq.iter() {
            let num = match val.as_number() {
                Some(num) => {
                    if found.is_none() && !has_next {
                        return Ok(ExecOutcome::Found);
                    }
                    *num
                }
                None => {
                    if found.is_none() && !has_next {
                        // existence probe: non-numerics are silently skipped
                        continue;
                    }
                    return Err(JsonPathError::number_not_found(format!(
                        "operand of unary jsonpath operator {} is not a numeric value",
                        node.operation_name()
                    )));
                }
            };

            let value = JsonItem::Number(match op {
                UnaryArithOp::Plus => num,
                UnaryArithOp::Minus => -num,
            });

            let res = self.execute_next(Some(node), None, &value, found.as_deref_mut())?;
            if res == ExecOutcome::Found {
                if found.is_none() {
                    return Ok(ExecOutcome::Found);
                }
                outcome = ExecOutcome::Found;
            }
        }

        Ok(outcome)
    }
}

fn singleton_number(seq: &ValueSequence<'_>) -> Option<Decimal> {
    if seq.len() != 1 {
        return None;
    }
    seq.head().and_then(JsonItem::as_number).copied()
}

fn apply_binary(op: BinaryArithOp, a: Decimal, b: Decimal) -> Result<Decimal> {
    match op {
        BinaryArithOp::Add => a.checked_add(b).ok_or(JsonPathError::NumericOverflow),
        BinaryArithOp::Sub => a.checked_sub(b).ok_or(JsonPathError::NumericOverflow),
        BinaryArithOp::Mul => a.checked_mul(b).ok_or(JsonPathError::NumericOverflow),
        BinaryArithOp::Div => {
            if b.is_zero() {
                return Err(JsonPathError::DivisionByZero);
            }
            a.checked_div(b).ok_or(JsonPathError::NumericOverflow)
        }
        BinaryArithOp::Mod => {
            if b.is_zero() {
                return Err(JsonPathError::DivisionByZero);
            }
            a.checked_rem(b).ok_or(JsonPathError::NumericOverflow)
        }
    }
}
