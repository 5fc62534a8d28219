//! Lazy JSON path expressions.
//!
//! One grammar covers plain JSON and a path syntax on top of it: `$` is the
//! document, `@` the enclosing container, `.name` and `[item]` are
//! accessors, `[a, b]` and `{.a, .b}` select several paths at once and
//! `size`, `min` and `max` are builtin functions. Whatever can be resolved
//! while parsing is resolved immediately; the rest stays a reference until
//! a document is bound.
//!
//! # Example
//!
//! ```
//! use json_lazy_path::{parse_expression, Config, Evaluator};
//!
//! // Without a document, `$` stays symbolic.
//! let expr = parse_expression("$.store.books[0]").unwrap();
//! assert_eq!(expr.stringify().unwrap(), r#"$["store"]["books"][0]"#);
//!
//! // Literals resolve at parse time.
//! let expr = parse_expression(r#"{"a": 1, "b": 2, "c": 3}{.b, .c}"#).unwrap();
//! assert_eq!(expr.stringify().unwrap(), "[2, 3]");
//!
//! let mut evaluator = Evaluator::new(Config::default());
//! evaluator
//!     .load_document(r#"{"store": {"books": ["Sayings", "Sword"]}}"#)
//!     .unwrap();
//! let result = evaluator.evaluate("size(store.books)").unwrap();
//! assert_eq!(evaluator.stringify(result).unwrap(), "2");
//! ```

mod types;
pub use types::*;

mod arena;
pub use arena::Arena;

mod config;
pub use config::Config;

mod error;
pub use error::{Error, EvalError, ParseError, ParseErrorKind, ValueError};

mod cursor;
pub use cursor::Cursor;

mod parser;
pub use parser::Parser;

mod eval;
pub use eval::{Resolver, Scope};

mod functions;
pub use functions::Builtin;

mod format;

mod convert;

mod evaluator;
pub use evaluator::{
    parse_document, parse_document_with, parse_expression, parse_expression_with, Evaluator,
    Parsed,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> String {
        parse_expression(text)
            .and_then(|p| Ok(p.stringify()?))
            .unwrap_or_else(|e| panic!("expression failed for '{text}': {e}"))
    }

    #[test]
    fn test_root_path() {
        assert_eq!(
            expr("$.first.second.third.fourth"),
            r#"$["first"]["second"]["third"]["fourth"]"#
        );
    }

    #[test]
    fn test_local_path() {
        assert_eq!(expr(r#"@["library"]["books"]"#), r#"@["library"]["books"]"#);
    }

    #[test]
    fn test_bare_identifier() {
        assert_eq!(expr("array[0][1][2][3][4]"), r#"$["array"][0][1][2][3][4]"#);
    }

    #[test]
    fn test_literal_lookup() {
        assert_eq!(expr(r#"{"life":42}.life"#), "42");
        assert_eq!(expr("[10,20,30,40,50][3]"), "40");
    }

    #[test]
    fn test_static_document() {
        let doc = parse_document(r#"{"a": [1, 2.50, "x"]}"#).unwrap();
        assert_eq!(doc.kind(), Kind::Object);
        assert_eq!(doc.stringify().unwrap(), r#"{"a": [1, 2.50, "x"]}"#);
        assert!(parse_document("$").is_err());
    }

    #[test]
    fn test_reference_kind() {
        let parsed = parse_expression("$[0, 1]").unwrap();
        assert_eq!(parsed.kind(), Kind::Reference);
        assert_eq!(parsed.get().reference_kind(), Some(ReferenceKind::Path));
        let parsed = parse_expression("fu(1)").unwrap();
        assert_eq!(parsed.get().reference_kind(), Some(ReferenceKind::Function));
    }
}
