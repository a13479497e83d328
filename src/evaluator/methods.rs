//! Item methods: numeric transforms, `.double()`, `.datetime()`,
//! `.keyvalue()`

use std::rc::Rc;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::{JsonPathError, Result};
use crate::model::{
    parse_datetime_text, parse_tz_offset_name, preorder_ordinal, ContainerRef, DatetimeParseError,
    JsonItem, JsonType, ValueSequence,
};
use crate::path::PathItem;

use super::{ExecContext, ExecOutcome, ExecResult};

/// Decimal multiplier separating base-object id from the pair offset in
/// `.keyvalue()` ids; the first round decimal number above 2^32.
const KEYVALUE_ID_MULTIPLIER: i64 = 10_000_000_000;

impl<'a> ExecContext<'a> {
    /// Execute `.abs()`, `.floor()` or `.ceiling()` via the supplied
    /// numeric transform.
    pub(crate) fn execute_numeric_method(
        &mut self,
        node: &'a PathItem,
        func: fn(&Decimal) -> Decimal,
        item: &JsonItem<'a>,
        unwrap: bool,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        if unwrap && item.json_type() == JsonType::Array {
            if let JsonItem::Binary(c) = item {
                return self.unwrap_target_array(Some(node), c, found, false);
            }
        }

        let Some(num) = item.as_number() else {
            return Err(JsonPathError::non_numeric(format!(
                "jsonpath item method .{}() can only be applied to a numeric value",
                node.operation_name()
            )));
        };
        let result = func(num);

        if !node.has_next() && found.is_none() {
            return Ok(ExecOutcome::Found);
        }

        let result = JsonItem::Number(result);
        self.execute_next(Some(node), None, &result, found)
    }

    /// Execute `.double()`: numbers must fit a finite double, strings
    /// are parsed as one.
    pub(crate) fn execute_double(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        unwrap: bool,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        if unwrap && item.json_type() == JsonType::Array {
            if let JsonItem::Binary(c) = item {
                return self.unwrap_target_array(Some(node), c, found, false);
            }
        }

        let value = match item {
            JsonItem::Number(num) => {
                if num.to_f64().map_or(true, |f| !f.is_finite()) {
                    return Err(JsonPathError::non_numeric(
                        "jsonpath item method .double() can only be applied to a numeric value",
                    ));
                }
                *num
            }
            JsonItem::String(text) => {
                let parsed: f64 = text.trim().parse().map_err(|_| {
                    JsonPathError::non_numeric(
                        "jsonpath item method .double() can only be applied to a numeric value",
                    )
                })?;
                if !parsed.is_finite() {
                    return Err(JsonPathError::non_numeric(
                        "jsonpath item method .double() can only be applied to a numeric value",
                    ));
                }
                Decimal::from_f64(parsed).ok_or_else(|| {
                    JsonPathError::non_numeric(
                        "jsonpath item method .double() can only be applied to a numeric value",
                    )
                })?
            }
            _ => {
                return Err(JsonPathError::non_numeric(
                    "jsonpath item method .double() can only be applied to a string or numeric value",
                ));
            }
        };

        let value = JsonItem::Number(value);
        self.execute_next(Some(node), None, &value, found)
    }

    /// Execute `.datetime([template [, timezone]])`.
    pub(crate) fn execute_datetime(
        &mut self,
        node: &'a PathItem,
        template: Option<&str>,
        timezone: Option<&'a PathItem>,
        item: &JsonItem<'a>,
        unwrap: bool,
        found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        if unwrap && item.json_type() == JsonType::Array {
            if let JsonItem::Binary(c) = item {
                return self.unwrap_target_array(Some(node), c, found, false);
            }
        }

        let Some(text) = item.as_str() else {
            return Err(JsonPathError::invalid_datetime(
                "jsonpath item method .datetime() is applied to not a string",
            ));
        };

        let default_tz = match timezone {
            Some(tz_expr) => Some(self.evaluate_timezone_argument(tz_expr, item)?),
            None => None,
        };

        let template = template.filter(|t| !t.is_empty());
        let parsed = parse_datetime_text(text, template, default_tz).map_err(|e| match e {
            DatetimeParseError::UnsupportedTemplate(field) => JsonPathError::invalid_datetime(
                format!("datetime format field \"{field}\" is not supported"),
            ),
            DatetimeParseError::NoMatch => match template {
                Some(fmt) => JsonPathError::invalid_datetime(format!(
                    "\"{text}\" does not match datetime template \"{fmt}\""
                )),
                None => JsonPathError::invalid_datetime(
                    "unrecognized datetime format; \
                     use a datetime template argument for explicit format specification",
                ),
            },
        })?;

        if !node.has_next() && found.is_none() {
            return Ok(ExecOutcome::Found);
        }

        let value = JsonItem::Datetime(parsed);
        self.execute_next(Some(node), None, &value, found)
    }

    fn evaluate_timezone_argument(
        &mut self,
        tz_expr: &'a PathItem,
        item: &JsonItem<'a>,
    ) -> Result<i32> {
        let mut seq = ValueSequence::new();
        self.execute(tz_expr, item, Some(&mut seq))?;

        if seq.len() != 1 {
            return Err(JsonPathError::invalid_datetime(
                "timezone argument of jsonpath item method .datetime() \
                 is not a singleton string or number",
            ));
        }

        match seq.head() {
            Some(JsonItem::String(name)) => parse_tz_offset_name(name).ok_or_else(|| {
                JsonPathError::invalid_datetime(format!("time zone \"{name}\" is not recognized"))
            }),
            Some(JsonItem::Number(num)) => num.to_i32().ok_or_else(|| {
                JsonPathError::invalid_datetime(
                    "timezone argument of jsonpath item method .datetime() \
                     is out of integer range",
                )
            }),
            _ => Err(JsonPathError::invalid_datetime(
                "timezone argument of jsonpath item method .datetime() \
                 is not a singleton string or number",
            )),
        }
    }

    /// Execute `.keyvalue()`: one `{"key", "value", "id"}` object per
    /// pair, in object iteration order. Each emitted object becomes the
    /// base object for its own downstream chain.
    pub(crate) fn execute_keyvalue(
        &mut self,
        node: &'a PathItem,
        item: &JsonItem<'a>,
        mut found: Option<&mut ValueSequence<'a>>,
    ) -> ExecResult {
        let map = match item {
            JsonItem::Binary(c) => c.json().as_object(),
            _ => None,
        };
        let Some(map) = map else {
            return Err(JsonPathError::object_not_found(
                "jsonpath item method .keyvalue() can only be applied to an object",
            ));
        };

        if map.is_empty() {
            return Ok(ExecOutcome::NotFound);
        }

        let has_next = node.has_next();
        let base_id = self.base_object.id;

        // ids derive from the pair's position inside the base object
        let offsets: Vec<i64> = {
            let base_root = self.base_object_json();
            map.values()
                .map(|value| {
                    base_root
                        .and_then(|root| preorder_ordinal(root, value))
                        .unwrap_or(0) as i64
                })
                .collect()
        };

        let mut res = ExecOutcome::NotFound;

        for ((key, value), offset) in map.iter().zip(offsets) {
            res = ExecOutcome::Found;
            if !has_next && found.is_none() {
                break;
            }

            let id = base_id * KEYVALUE_ID_MULTIPLIER + offset;
            let generated = Rc::new(serde_json::json!({
                "key": key.clone(),
                "value": value.clone(),
                "id": id,
            }));
            let object = JsonItem::Binary(ContainerRef::generated_root(generated));

            let generated_id = self.next_generated_id();
            let saved = self.set_base_object(&object, generated_id);
            let step = self.execute_next(Some(node), None, &object, found.as_deref_mut());
            self.base_object = saved;

            res = step?;
            if res == ExecOutcome::Found && found.is_none() {
                break;
            }
        }

        Ok(res)
    }
}
