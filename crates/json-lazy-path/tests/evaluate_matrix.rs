use json_lazy_path::{Config, Error, EvalError, Evaluator, Kind};
use serde_json::json;

const STORE: &str = r#"{
    // inventory
    "store": {
        "books": [
            {"title": "A", "price": 8},
            {"title": "B", "price": 12},
            {"title": "C", "price": 5}
        ]
    },
    "picks": [2, 0],
    "name": "store",
    "limits": {"low": 1}
}"#;

fn store(config: Config) -> Evaluator {
    let mut evaluator = Evaluator::new(config);
    evaluator
        .load_document(STORE)
        .unwrap_or_else(|e| panic!("document failed to load: {e}"));
    evaluator
}

fn eval(evaluator: &mut Evaluator, expr: &str) -> String {
    let id = evaluator
        .evaluate(expr)
        .unwrap_or_else(|e| panic!("evaluate failed for '{expr}': {e}"));
    evaluator
        .stringify(id)
        .unwrap_or_else(|e| panic!("stringify failed for '{expr}': {e}"))
}

fn eval_err(evaluator: &mut Evaluator, expr: &str) -> EvalError {
    match evaluator.evaluate(expr) {
        Err(Error::Eval(e)) => e,
        Err(other) => panic!("expected evaluation error for '{expr}', got {other}"),
        Ok(id) => panic!(
            "expected evaluation error for '{expr}', got {:?}",
            evaluator.stringify(id)
        ),
    }
}

// ---- Paths

#[test]
fn evaluate_path_matrix() {
    let mut e = store(Config::default());
    let cases = [
        ("store.books[0].title", r#""A""#),
        ("$.store.books[1].price", "12"),
        (r#"$["store"]["books"][2]["title"]"#, r#""C""#),
        ("$.store.books[$.picks[0]].price", "5"),
        ("store.books[picks[1]].title", r#""A""#),
        ("$[$.name].books[1].title", r#""B""#),
        ("limits.low", "1"),
        ("picks", "[2, 0]"),
    ];
    for (input, expected) in cases {
        assert_eq!(eval(&mut e, input), expected, "input: {input}");
    }
}

#[test]
fn evaluate_selection_matrix() {
    let mut e = store(Config::default());
    let cases = [
        ("store.books{[0].price, [1].price}", "[8, 12]"),
        ("store.books[0, 2].title", r#"["A", "C"]"#),
        ("${.picks, .name}", r#"[[2, 0], "store"]"#),
        ("store.books[$.picks[0], $.picks[1]].price", "[5, 8]"),
        ("store.books{[0], [2]}{.title, .price}", r#"[["A", 8], ["C", 5]]"#),
    ];
    for (input, expected) in cases {
        assert_eq!(eval(&mut e, input), expected, "input: {input}");
    }
}

#[test]
fn evaluate_function_matrix() {
    let mut e = store(Config::default());
    let cases = [
        ("size(store.books)", "3"),
        ("size($)", "4"),
        ("max(store.books[0].price, store.books[1].price)", "12"),
        ("min([$.store.books[0].price, 3])", "3"),
        ("max(picks)", "2"),
        ("fu($.name)", r#"fu("store")"#),
    ];
    for (input, expected) in cases {
        assert_eq!(eval(&mut e, input), expected, "input: {input}");
    }

    // Calls used as accessors are never applied to the running anchor.
    let id = e.evaluate("picks[size(picks)]").unwrap();
    assert_eq!(e.arena().kind(id), Kind::Reference);
    assert_eq!(e.stringify(id).unwrap(), r#"[2, 0][size($["picks"])]"#);
}

#[test]
fn evaluate_literal_with_root_matrix() {
    let mut e = store(Config::default());
    let cases = [
        ("[$.name, size($.picks)]", r#"["store", 2]"#),
        (
            r#"{"total": size(store.books), "first": store.books[0].title}"#,
            r#"{"total": 3, "first": "A"}"#,
        ),
        (r#"{"low": limits.low, "again": @.low}"#, r#"{"low": 1, "again": 1}"#),
        ("[[$.name]]", r#"[["store"]]"#),
    ];
    for (input, expected) in cases {
        assert_eq!(eval(&mut e, input), expected, "input: {input}");
    }
}

#[test]
fn evaluate_error_matrix() {
    let mut e = store(Config::default());
    assert_eq!(
        eval_err(&mut e, "store.missing"),
        EvalError::KeyNotFound("missing".into())
    );
    assert_eq!(
        eval_err(&mut e, "store.books[7]"),
        EvalError::IndexOutOfRange { index: 7, len: 3 }
    );
    assert!(matches!(
        eval_err(&mut e, "name[0]"),
        EvalError::InvalidOperand {
            anchor: Kind::String,
            item: Kind::Integer,
            ..
        }
    ));
    assert_eq!(
        eval_err(&mut e, "max(store.books)"),
        EvalError::NotAnInteger("max".into())
    );

    // A failed evaluation leaves the document usable.
    assert_eq!(eval(&mut e, "store.books[2].price"), "5");
}

#[test]
fn evaluate_negative_indexing() {
    let mut e = store(Config::default().with_negative_indexing(true));
    assert_eq!(eval(&mut e, "store.books[-1].title"), r#""C""#);
    assert_eq!(eval(&mut e, "picks[-2]"), "2");
    assert!(eval_err(&mut e, "picks[-3]").is_out_of_range());

    let mut e = store(Config::default());
    assert_eq!(eval_err(&mut e, "picks[-1]"), EvalError::NegativeIndex(-1));
}

#[test]
fn evaluate_symmetric_indexing() {
    let mut e = store(Config::default().with_symmetric_indexing(true));
    assert_eq!(eval(&mut e, "1[picks]"), "0");
    assert_eq!(eval(&mut e, r#""low"[limits]"#), "1");

    let mut e = store(Config::default());
    assert!(matches!(
        eval_err(&mut e, "1[picks]"),
        EvalError::InvalidOperand { .. }
    ));
}

#[test]
fn evaluate_output_matrix() {
    let mut e = store(Config::default());
    let id = e.evaluate("store.books[0]").unwrap();
    assert_eq!(
        e.stringify_pretty(id).unwrap(),
        "{\n\t\"title\": \"A\",\n\t\"price\": 8\n}"
    );
    assert_eq!(e.to_json(id).unwrap(), json!({"title": "A", "price": 8}));

    let id = e.evaluate("$.unknown_root_function()").unwrap();
    assert!(matches!(e.to_json(id), Err(Error::Eval(EvalError::Unresolved))));
}

#[test]
fn evaluate_loaded_json() {
    let mut e = Evaluator::default();
    e.load_json(&json!({"matrix": [[1, 2], [3, 4]]})).unwrap();
    assert_eq!(eval(&mut e, "matrix[1][0]"), "3");
    assert_eq!(eval(&mut e, "matrix{[0][1], [1][1]}"), "[2, 4]");
    assert_eq!(eval(&mut e, "max(matrix[1])"), "4");
}

#[test]
fn evaluate_long_chains() {
    let chain = |links: usize| {
        let slots: Vec<String> = (1..links).map(|i| format!("@[{i}]")).collect();
        format!("[{}, $.limits.low]", slots.join(", "))
    };
    let mut e = store(Config::default());
    let ones = vec!["1"; 100].join(", ");
    assert_eq!(eval(&mut e, &chain(100)), format!("[{ones}]"));
    assert_eq!(eval_err(&mut e, &chain(5000)), EvalError::TooDeep(128));
    assert_eq!(eval(&mut e, "limits.low"), "1");
}
