//! End-to-end path execution tests over literal documents

use std::sync::Arc;

use serde_json::{json, Value};
use sqljsonpath::path::builder::*;
use sqljsonpath::path::{ArraySubscript, PathExpr, RegexFlags, ANY_UNBOUNDED};
use sqljsonpath::{JsonPathEngine, JsonPathError, ObjectVariables};

fn query(doc: &Value, path: &PathExpr) -> Vec<Value> {
    JsonPathEngine::new()
        .query(doc, path, None, false)
        .unwrap()
}

#[test]
fn test_member_chain_with_index() {
    let doc = json!({"a": {"b": [1, 2, 3]}});
    let chain = || root().key("a").key("b").index(1);

    assert_eq!(query(&doc, &PathExpr::strict(chain())), vec![json!(2)]);
    assert_eq!(query(&doc, &PathExpr::lax(chain())), vec![json!(2)]);
}

#[test]
fn test_filter_on_wildcard_array() {
    let doc = json!([{"x": 1}, {"x": 2}, {"x": 3}]);
    let chain = || {
        root()
            .any_array()
            .filter(current().key("x").ge(number(2)))
    };

    let expected = vec![json!({"x": 2}), json!({"x": 3})];
    assert_eq!(query(&doc, &PathExpr::lax(chain())), expected);
    assert_eq!(query(&doc, &PathExpr::strict(chain())), expected);
}

#[test]
fn test_range_subscript_with_last() {
    let doc = json!({"a": [10, 20, 30, 40]});
    let path = PathExpr::strict(root().key("a").slice(number(1), last()));
    assert_eq!(
        query(&doc, &path),
        vec![json!(20), json!(30), json!(40)]
    );
}

#[test]
fn test_conjunction_filter() {
    let doc = json!({"a": 1, "b": "x"});

    let matching = PathExpr::strict(root().filter(
        current()
            .key("a")
            .eq(number(1))
            .and(current().key("b").eq(string("x"))),
    ));
    assert_eq!(query(&doc, &matching), vec![json!({"a": 1, "b": "x"})]);

    let failing = PathExpr::strict(root().filter(
        current()
            .key("a")
            .eq(number(1))
            .and(current().key("b").eq(string("y"))),
    ));
    assert_eq!(query(&doc, &failing), Vec::<Value>::new());
}

#[test]
fn test_datetime_type_name() {
    let doc = json!({"a": "2024-01-31"});
    let path = PathExpr::strict(root().key("a").datetime().type_());
    assert_eq!(query(&doc, &path), vec![json!("date")]);

    let doc = json!({"a": "2024-01-31 10:00:00+02"});
    let path = PathExpr::strict(root().key("a").datetime().type_());
    assert_eq!(
        query(&doc, &path),
        vec![json!("timestamp with time zone")]
    );
}

#[test]
fn test_keyvalue_pairs_and_ids() {
    let doc = json!({"k": {"a": 1, "b": 2}});
    let path = PathExpr::strict(root().key("k").keyvalue());
    let results = query(&doc, &path);
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["key"], json!("a"));
    assert_eq!(results[0]["value"], json!(1));
    assert_eq!(results[1]["key"], json!("b"));
    assert_eq!(results[1]["value"], json!(2));

    let id0 = results[0]["id"].as_i64().unwrap();
    let id1 = results[1]["id"].as_i64().unwrap();
    assert_ne!(id0, id1);
    // base object is the root ($ has id 0), so the ids are bare
    // pre-order offsets of the pair values within the document
    assert_eq!(id0 % 10_000_000_000, id0);
    assert_eq!(id1 % 10_000_000_000, id1);
}

#[test]
fn test_keyvalue_chained_ids_stay_traceable() {
    let doc = json!({"k": {"a": {"x": 1}}});
    let path = PathExpr::lax(root().key("k").keyvalue().key("value").keyvalue());
    let results = query(&doc, &path);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["key"], json!("x"));
    assert_eq!(results[0]["value"], json!(1));

    // the generated object became the base (id 1), and the pair value
    // sits at a nonzero pre-order offset inside it
    let id = results[0]["id"].as_i64().unwrap();
    assert_eq!(id / 10_000_000_000, 1);
    assert_ne!(id % 10_000_000_000, 0);
}

#[test]
fn test_mixed_type_comparison_drops_unknown_pairs() {
    let doc = json!([1, "two", 3]);
    let chain = || root().any_array().filter(current().gt(number(0)));

    // the non-numeric pair is unknown; the filter drops it without
    // raising, in both modes
    assert_eq!(
        query(&doc, &PathExpr::lax(chain())),
        vec![json!(1), json!(3)]
    );
    assert_eq!(
        query(&doc, &PathExpr::strict(chain())),
        vec![json!(1), json!(3)]
    );
}

#[test]
fn test_missing_member_strict_vs_lax() {
    let doc = json!({});
    let engine = JsonPathEngine::new();

    let strict = PathExpr::strict(root().key("missing"));
    assert!(matches!(
        engine.query(&doc, &strict, None, false),
        Err(JsonPathError::MemberNotFound { .. })
    ));

    let lax = PathExpr::lax(root().key("missing"));
    assert_eq!(
        engine.query(&doc, &lax, None, false).unwrap(),
        Vec::<Value>::new()
    );
}

#[test]
fn test_exists_matches_query_emptiness() {
    let engine = JsonPathEngine::new();
    let docs = [
        json!({"a": {"b": 1}}),
        json!({"a": {}}),
        json!([1, 2, 3]),
    ];
    let paths = [
        PathExpr::lax(root().key("a").key("b")),
        PathExpr::lax(root().any_array().filter(current().gt(number(1)))),
    ];

    for doc in &docs {
        for path in &paths {
            let exists = engine.exists(doc, path, None, true).unwrap();
            let rows = engine.query(doc, path, None, true).unwrap();
            assert_eq!(exists, Some(!rows.is_empty()));
        }
    }
}

#[test]
fn test_exists_silent_suppresses_strict_errors() {
    let engine = JsonPathEngine::new();
    let doc = json!({});
    let path = PathExpr::strict(root().key("missing"));

    assert_eq!(engine.exists(&doc, &path, None, true).unwrap(), None);
    assert!(matches!(
        engine.exists(&doc, &path, None, false),
        Err(JsonPathError::MemberNotFound { .. })
    ));
}

#[test]
fn test_matches_singleton_boolean() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": 1});

    let path = PathExpr::lax(root().key("a").eq(number(1)));
    assert_eq!(engine.matches(&doc, &path, None, false).unwrap(), Some(true));

    let path = PathExpr::lax(root().key("a").eq(number(2)));
    assert_eq!(engine.matches(&doc, &path, None, false).unwrap(), Some(false));

    // unknown comparison surfaces as null
    let path = PathExpr::lax(root().eq(number(1)));
    assert_eq!(engine.matches(&doc, &path, None, false).unwrap(), None);

    // non-boolean result: error unless silent
    let path = PathExpr::lax(root().key("a"));
    assert_eq!(engine.matches(&doc, &path, None, true).unwrap(), None);
    assert!(matches!(
        engine.matches(&doc, &path, None, false),
        Err(JsonPathError::SingletonRequired { .. })
    ));
}

#[test]
fn test_query_array_and_first() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": [1, 2, 3]});
    let path = PathExpr::lax(root().key("a").any_array());

    assert_eq!(
        engine.query_array(&doc, &path, None, false).unwrap(),
        json!([1, 2, 3])
    );
    assert_eq!(
        engine.query_first(&doc, &path, None, false).unwrap(),
        Some(json!(1))
    );

    let empty = PathExpr::lax(root().key("zzz"));
    assert_eq!(engine.query_first(&doc, &empty, None, false).unwrap(), None);
}

#[test]
fn test_query_first_text_unquotes() {
    let engine = JsonPathEngine::new();
    let doc = json!({"s": "plain text", "a": [1, 2]});

    let path = PathExpr::lax(root().key("s"));
    assert_eq!(
        engine.query_first_text(&doc, &path, None, false).unwrap(),
        Some("plain text".to_string())
    );

    let path = PathExpr::lax(root().key("a"));
    assert_eq!(
        engine.query_first_text(&doc, &path, None, false).unwrap(),
        Some("[1,2]".to_string())
    );
}

#[test]
fn test_query_value_requires_singleton_scalar() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": [1, 2], "s": "x"});

    let path = PathExpr::lax(root().key("s"));
    assert_eq!(
        engine.query_value(&doc, &path, None, false).unwrap(),
        Some(json!("x"))
    );

    let composite = PathExpr::lax(root().key("a"));
    assert!(matches!(
        engine.query_value(&doc, &composite, None, false),
        Err(JsonPathError::ScalarRequired { .. })
    ));
    assert_eq!(
        engine.query_value(&doc, &composite, None, true).unwrap(),
        None
    );

    let multi = PathExpr::lax(root().key("a").any_array());
    assert!(matches!(
        engine.query_value(&doc, &multi, None, false),
        Err(JsonPathError::SingletonRequired { .. })
    ));
}

#[test]
fn test_variables_in_filters() {
    let engine = JsonPathEngine::new();
    let doc = json!([{"x": 1}, {"x": 2}, {"x": 3}]);
    let vars = json!({"min": 2});
    let resolver = ObjectVariables::new(&vars);

    let path = PathExpr::lax(
        root()
            .any_array()
            .filter(current().key("x").ge(variable("min"))),
    );
    assert_eq!(
        engine.query(&doc, &path, Some(&resolver), false).unwrap(),
        vec![json!({"x": 2}), json!({"x": 3})]
    );
}

#[test]
fn test_undefined_variable_not_suppressed() {
    let engine = JsonPathEngine::new();
    let doc = json!({});
    let path = PathExpr::lax(variable("nope").key("a"));

    assert!(matches!(
        engine.query(&doc, &path, None, true),
        Err(JsonPathError::UndefinedVariable { .. })
    ));
}

#[test]
fn test_arithmetic_expressions() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": 4, "b": 2});

    let sum = PathExpr::strict(root().key("a").plus(root().key("b")));
    assert_eq!(engine.query(&doc, &sum, None, false).unwrap(), vec![json!(6)]);

    let product = PathExpr::strict(root().key("a").multiply(root().key("b")));
    assert_eq!(
        engine.query(&doc, &product, None, false).unwrap(),
        vec![json!(8)]
    );

    let modulo = PathExpr::strict(root().key("a").modulo(root().key("b")));
    assert_eq!(
        engine.query(&doc, &modulo, None, false).unwrap(),
        vec![json!(0)]
    );

    let by_zero = PathExpr::strict(root().key("a").divide(number(0)));
    assert_eq!(
        engine.query(&doc, &by_zero, None, false),
        Err(JsonPathError::DivisionByZero)
    );
    // suppressible in silent mode
    assert_eq!(engine.query(&doc, &by_zero, None, true).unwrap(), Vec::<Value>::new());
}

#[test]
fn test_arithmetic_singleton_rule() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": [1, 2]});

    // lax auto-unwrap turns $.a into two items
    let path = PathExpr::lax(root().key("a").plus(number(1)));
    assert!(matches!(
        engine.query(&doc, &path, None, false),
        Err(JsonPathError::SingletonRequired { .. })
    ));
}

#[test]
fn test_unary_minus_maps_over_sequence() {
    let doc = json!({"a": [1, 2, 3]});
    let path = PathExpr::lax(root().key("a").negate());
    assert_eq!(
        query(&doc, &path),
        vec![json!(-1), json!(-2), json!(-3)]
    );

    let doc = json!({"a": [1, "x"]});
    let engine = JsonPathEngine::new();
    let path = PathExpr::lax(root().key("a").negate());
    assert!(matches!(
        engine.query(&doc, &path, None, false),
        Err(JsonPathError::NumberNotFound { .. })
    ));
}

#[test]
fn test_numeric_item_methods() {
    let doc = json!({"n": -2.5});

    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("n").abs())),
        vec![json!(2.5)]
    );
    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("n").floor())),
        vec![json!(-3)]
    );
    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("n").ceiling())),
        vec![json!(-2)]
    );
}

#[test]
fn test_double_method() {
    let engine = JsonPathEngine::new();
    let doc = json!({"s": "1.5e2", "bad": "inf", "n": 3});

    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("s").double())),
        vec![json!(150)]
    );
    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("n").double())),
        vec![json!(3)]
    );
    assert!(matches!(
        engine.query(&doc, &PathExpr::lax(root().key("bad").double()), None, false),
        Err(JsonPathError::NonNumericItem { .. })
    ));
}

#[test]
fn test_size_method() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": [1, 2, 3], "s": "x"});

    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("a").size())),
        vec![json!(3)]
    );
    // lax wraps non-arrays
    assert_eq!(
        query(&doc, &PathExpr::lax(root().key("s").size())),
        vec![json!(1)]
    );
    assert!(matches!(
        engine.query(&doc, &PathExpr::strict(root().key("s").size()), None, false),
        Err(JsonPathError::ArrayNotFound { .. })
    ));
}

#[test]
fn test_type_method_names() {
    let doc = json!({
        "null": null,
        "bool": true,
        "num": 1,
        "str": "s",
        "arr": [],
        "obj": {}
    });

    for (key, expected) in [
        ("null", "null"),
        ("bool", "boolean"),
        ("num", "number"),
        ("str", "string"),
        ("arr", "array"),
        ("obj", "object"),
    ] {
        // strict mode: .type() must not unwrap the array
        let path = PathExpr::strict(root().key(key).type_());
        assert_eq!(query(&doc, &path), vec![json!(expected)], "key {key}");
    }
}

#[test]
fn test_like_regex_filter() {
    let doc = json!(["apple", "banana", "avocado", 1]);
    let path = PathExpr::lax(
        root()
            .any_array()
            .filter(current().like_regex("^a", RegexFlags::default())),
    );
    assert_eq!(query(&doc, &path), vec![json!("apple"), json!("avocado")]);

    let flags = RegexFlags {
        case_insensitive: true,
        ..Default::default()
    };
    let path = PathExpr::lax(root().any_array().filter(current().like_regex("^A", flags)));
    assert_eq!(query(&doc, &path), vec![json!("apple"), json!("avocado")]);
}

#[test]
fn test_starts_with_filter() {
    let doc = json!(["abc", "abd", "xyz", 5]);
    let path = PathExpr::lax(
        root()
            .any_array()
            .filter(current().starts_with(string("ab"))),
    );
    assert_eq!(query(&doc, &path), vec![json!("abc"), json!("abd")]);
}

#[test]
fn test_is_unknown_filter() {
    let doc = json!([1, "two", 3]);
    let path = PathExpr::lax(
        root()
            .any_array()
            .filter(current().gt(number(0)).is_unknown()),
    );
    assert_eq!(query(&doc, &path), vec![json!("two")]);
}

#[test]
fn test_exists_predicate() {
    let doc = json!([{"x": 1}, {"y": 2}]);
    let path = PathExpr::lax(
        root()
            .any_array()
            .filter(exists(current().key("x"))),
    );
    assert_eq!(query(&doc, &path), vec![json!({"x": 1})]);
}

#[test]
fn test_datetime_comparison_in_filter() {
    let doc = json!({"events": [
        {"d": "2024-01-01"},
        {"d": "2024-06-15"}
    ]});
    let path = PathExpr::lax(root().key("events").any_array().filter(
        current()
            .key("d")
            .datetime()
            .lt(string("2024-03-01").datetime()),
    ));
    assert_eq!(query(&doc, &path), vec![json!({"d": "2024-01-01"})]);
}

#[test]
fn test_datetime_renders_as_iso_string() {
    let doc = json!({"t": "2024-01-31 10:30:00+02"});
    let engine = JsonPathEngine::new();
    let path = PathExpr::lax(root().key("t").datetime());
    assert_eq!(
        engine.query(&doc, &path, None, false).unwrap(),
        vec![json!("2024-01-31T10:30:00+02:00")]
    );
}

#[test]
fn test_datetime_with_template_and_timezone() {
    let engine = JsonPathEngine::new();
    let doc = json!({"t": "31/01/2024 10:00"});

    let path = PathExpr::lax(
        root()
            .key("t")
            .datetime_format("DD/MM/YYYY HH24:MI")
            .type_(),
    );
    assert_eq!(
        engine.query(&doc, &path, None, false).unwrap(),
        vec![json!("timestamp without time zone")]
    );

    let bad = PathExpr::lax(root().key("t").datetime());
    assert!(matches!(
        engine.query(&doc, &bad, None, false),
        Err(JsonPathError::InvalidDatetimeArgument { .. })
    ));

    // the timezone argument supplies the offset for cross-type
    // comparison: 10:00 at +02 is the same instant as 09:00+01
    let cross = PathExpr::lax(
        root()
            .key("t")
            .datetime_format_tz("DD/MM/YYYY HH24:MI", string("+02"))
            .eq(string("2024-01-31 09:00:00+01").datetime()),
    );
    assert_eq!(engine.matches(&doc, &cross, None, false).unwrap(), Some(true));
}

#[test]
fn test_descendants_with_bounds() {
    let doc = json!({"a": {"b": {"c": 1}}});

    let all = PathExpr::lax(root().descendants());
    assert_eq!(query(&doc, &all).len(), 4);

    let depth_one = PathExpr::lax(root().descendants_bounded(1, 1));
    assert_eq!(query(&doc, &depth_one), vec![json!({"b": {"c": 1}})]);

    // leaves only
    let leaves = PathExpr::lax(root().descendants_bounded(ANY_UNBOUNDED, ANY_UNBOUNDED));
    assert_eq!(query(&doc, &leaves), vec![json!(1)]);
}

#[test]
fn test_multiple_subscripts_in_declared_order() {
    let doc = json!(["a", "b", "c", "d"]);
    let path = PathExpr::strict(root().subscripts(vec![
        ArraySubscript::Index(number(2)),
        ArraySubscript::Range(number(0), number(1)),
        ArraySubscript::Index(last()),
    ]));
    assert_eq!(
        query(&doc, &path),
        vec![json!("c"), json!("a"), json!("b"), json!("d")]
    );
}

#[test]
fn test_determinism_across_runs() {
    let engine = JsonPathEngine::new();
    let doc = json!({"k": {"a": [1, {"b": 2}], "c": 3}});
    let path = PathExpr::lax(root().descendants());

    let first = engine.query(&doc, &path, None, false).unwrap();
    let second = engine.query(&doc, &path, None, false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_interrupt_hook_aborts() {
    let engine = JsonPathEngine::new().with_interrupt(Arc::new(|| true));
    let doc = json!({"a": 1});
    let path = PathExpr::lax(root().key("a"));

    // not suppressible even in silent mode
    assert_eq!(
        engine.query(&doc, &path, None, true),
        Err(JsonPathError::Interrupted)
    );
}

#[test]
fn test_lax_result_contains_strict_result() {
    let engine = JsonPathEngine::new();
    let doc = json!({"a": [{"x": 1}, {"x": 2}]});

    let strict = PathExpr::strict(root().key("a").any_array().key("x"));
    let lax = PathExpr::lax(root().key("a").key("x"));

    let strict_rows = engine.query(&doc, &strict, None, false).unwrap();
    let lax_rows = engine.query(&doc, &lax, None, false).unwrap();
    assert_eq!(strict_rows, lax_rows);
}
