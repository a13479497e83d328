//! Named-variable resolution for `$name` references

use serde_json::Value;

use crate::model::JsonItem;

/// Base-object identity a variable contributes for `.keyvalue()` id
/// generation.
#[derive(Debug, Clone)]
pub struct VariableBase<'a> {
    /// The container the variable's value lives in
    pub container: &'a Value,
    /// Base-object id (1..count of variable bases)
    pub id: i64,
}

/// A resolved variable: its item value plus an optional base object.
#[derive(Debug)]
pub struct ResolvedVariable<'a> {
    /// The variable's value as an item
    pub item: JsonItem<'a>,
    /// Base-object identity, when the variable derives from a container
    pub base: Option<VariableBase<'a>>,
}

/// Supplies values for `$name` references during evaluation.
pub trait VariableResolver {
    /// Number of base objects the variables contribute; used to seed the
    /// generated-object id counter.
    fn base_object_count(&self) -> i64;

    /// Look up a variable by name.
    fn resolve(&self, name: &str) -> Option<ResolvedVariable<'_>>;
}

/// Variables backed by a single JSON object: each member is one
/// variable, and all of them share the object as base (id 1).
#[derive(Debug, Clone, Copy)]
pub struct ObjectVariables<'a> {
    vars: &'a Value,
}

impl<'a> ObjectVariables<'a> {
    /// Wrap a JSON object of variables. A non-object value resolves
    /// nothing.
    pub fn new(vars: &'a Value) -> Self {
        Self { vars }
    }
}

impl VariableResolver for ObjectVariables<'_> {
    fn base_object_count(&self) -> i64 {
        i64::from(self.vars.is_object())
    }

    fn resolve(&self, name: &str) -> Option<ResolvedVariable<'_>> {
        let value = self.vars.as_object()?.get(name)?;
        Some(ResolvedVariable {
            item: JsonItem::from_json(value),
            base: Some(VariableBase {
                container: self.vars,
                id: 1,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JsonType;
    use serde_json::json;

    #[test]
    fn test_object_variables_lookup() {
        let vars = json!({"x": 2, "name": "bob"});
        let resolver = ObjectVariables::new(&vars);

        assert_eq!(resolver.base_object_count(), 1);

        let x = resolver.resolve("x").unwrap();
        assert_eq!(x.item.json_type(), JsonType::Number);
        assert_eq!(x.base.as_ref().unwrap().id, 1);

        assert!(resolver.resolve("missing").is_none());
    }

    #[test]
    fn test_non_object_variables_resolve_nothing() {
        let vars = json!([1, 2, 3]);
        let resolver = ObjectVariables::new(&vars);
        assert_eq!(resolver.base_object_count(), 0);
        assert!(resolver.resolve("x").is_none());
    }
}
