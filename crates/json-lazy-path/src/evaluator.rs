//! Document loading and expression evaluation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::arena::Arena;
use crate::config::Config;
use crate::error::{Error, EvalError};
use crate::eval::Resolver;
use crate::parser::Parser;
use crate::types::{Kind, Node, NodeId};

/// A parsed value together with the arena that owns it.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub arena: Arena,
    pub node: NodeId,
}

impl Parsed {
    pub fn get(&self) -> &Node {
        self.arena.get(self.node)
    }

    pub fn kind(&self) -> Kind {
        self.arena.kind(self.node)
    }

    pub fn stringify(&self) -> Result<String, EvalError> {
        self.arena.stringify(self.node)
    }

    pub fn stringify_pretty(&self) -> Result<String, EvalError> {
        self.arena.stringify_pretty(self.node)
    }
}

/// Parse plain JSON.
pub fn parse_document(text: &str) -> Result<Parsed, Error> {
    parse_document_with(text, Config::default())
}

pub fn parse_document_with(text: &str, config: Config) -> Result<Parsed, Error> {
    let mut arena = Arena::new();
    let node = Parser::new(&mut arena, text, config).parse(false)?;
    Ok(Parsed { arena, node })
}

/// Parse JSON extended with path syntax, resolving what needs no document.
pub fn parse_expression(text: &str) -> Result<Parsed, Error> {
    parse_expression_with(text, Config::default())
}

pub fn parse_expression_with(text: &str, config: Config) -> Result<Parsed, Error> {
    let mut arena = Arena::new();
    let node = Parser::new(&mut arena, text, config).parse(true)?;
    Ok(Parsed { arena, node })
}

/// Holds a document and evaluates expressions against it.
///
/// Documents and expressions share one arena, so results may point straight
/// into the document. The arena only grows: every successful load or
/// evaluation keeps its nodes for as long as the evaluator lives, while a
/// failed one gives its nodes back. Create a fresh evaluator to reclaim
/// memory held by old results.
#[derive(Debug, Default)]
pub struct Evaluator {
    arena: Arena,
    config: Config,
    document: Option<NodeId>,
}

impl Evaluator {
    pub fn new(config: Config) -> Self {
        Self {
            arena: Arena::new(),
            config,
            document: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn document(&self) -> Option<NodeId> {
        self.document
    }

    pub fn load_document(&mut self, text: &str) -> Result<NodeId, Error> {
        let id = self.rollback(|e| Parser::new(&mut e.arena, text, e.config).parse(false))?;
        self.set_document(id);
        Ok(id)
    }

    pub fn load_reader(&mut self, reader: impl BufRead) -> Result<NodeId, Error> {
        let id =
            self.rollback(|e| Parser::from_reader(&mut e.arena, reader, e.config).parse(false))?;
        self.set_document(id);
        Ok(id)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<NodeId, Error> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading document");
        let file = File::open(path)?;
        self.load_reader(BufReader::new(file))
    }

    pub fn load_json(&mut self, value: &Value) -> Result<NodeId, Error> {
        let id = self.rollback(|e| Ok(e.arena.import_json(value)?))?;
        self.set_document(id);
        Ok(id)
    }

    fn set_document(&mut self, id: NodeId) {
        debug!(nodes = self.arena.len(), kind = %self.arena.kind(id), "document loaded");
        self.document = Some(id);
    }

    /// Parse an expression without binding `$`.
    pub fn parse_expression(&mut self, text: &str) -> Result<NodeId, Error> {
        self.rollback(|e| Parser::new(&mut e.arena, text, e.config).parse(true))
    }

    /// Parse an expression and bind `$` to the loaded document, if any.
    pub fn evaluate(&mut self, text: &str) -> Result<NodeId, Error> {
        self.rollback(|e| {
            let expr = Parser::new(&mut e.arena, text, e.config).parse(true)?;
            e.bind(expr)
        })
    }

    /// Run `f`, dropping the nodes it allocated if it fails. Only sound when
    /// `f` patches no container allocated before it started: documents hold
    /// no deferred slots and a fresh expression reaches nothing older.
    fn rollback<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        let mark = self.arena.len();
        let result = f(self);
        if result.is_err() {
            self.arena.truncate(mark);
        }
        result
    }

    /// Bind `$` in an already parsed expression.
    ///
    /// Nodes allocated by a failed bind are kept, since binding may already
    /// have patched containers of `expr`.
    pub fn bind(&mut self, expr: NodeId) -> Result<NodeId, Error> {
        match self.document {
            Some(root) => Ok(Resolver::new(&mut self.arena, self.config).bind_root(expr, root)?),
            None => Ok(expr),
        }
    }

    pub fn stringify(&self, id: NodeId) -> Result<String, Error> {
        Ok(self.arena.stringify(id)?)
    }

    pub fn stringify_pretty(&self, id: NodeId) -> Result<String, Error> {
        Ok(self.arena.stringify_pretty(id)?)
    }

    pub fn to_json(&self, id: NodeId) -> Result<Value, Error> {
        Ok(self.arena.export_json(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator(doc: &str) -> Evaluator {
        let mut evaluator = Evaluator::default();
        evaluator.load_document(doc).unwrap();
        evaluator
    }

    fn eval(evaluator: &mut Evaluator, expr: &str) -> String {
        let id = evaluator
            .evaluate(expr)
            .unwrap_or_else(|e| panic!("evaluate failed for '{expr}': {e}"));
        evaluator.stringify(id).unwrap()
    }

    #[test]
    fn test_evaluate_path() {
        let mut e = evaluator(r#"{"a": [10, 20], "i": 1}"#);
        assert_eq!(eval(&mut e, "$.a[$.i]"), "20");
        assert_eq!(eval(&mut e, "a[i]"), "20");
        assert_eq!(eval(&mut e, "$"), r#"{"a": [10, 20], "i": 1}"#);
    }

    #[test]
    fn test_evaluate_without_document() {
        let mut e = Evaluator::default();
        assert_eq!(eval(&mut e, "$.a"), "$[\"a\"]");
        assert!(e.document().is_none());
    }

    #[test]
    fn test_load_json() {
        let mut e = Evaluator::default();
        e.load_json(&json!({"x": {"y": [1, 2, 3]}})).unwrap();
        let id = e.evaluate("size($.x.y)").unwrap();
        assert_eq!(e.to_json(id).unwrap(), json!(3));
    }

    #[test]
    fn test_load_reader() {
        let mut e = Evaluator::default();
        e.load_reader("// header\n[1, 2, 3]\n".as_bytes()).unwrap();
        assert_eq!(eval(&mut e, "max($)"), "3");
    }

    #[test]
    fn test_failures_release_nodes() {
        let mut e = evaluator(r#"{"a": [10, 20]}"#);
        let len = e.arena().len();
        assert!(e.evaluate("[$.a[0], $.a[1], $.a[7]]").is_err());
        assert!(e.evaluate("[1, 2").is_err());
        assert!(e.parse_expression("{\"k\": 1, \"k\": 2}").is_err());
        assert!(e.load_document("[1, 2, 3] x").is_err());
        assert_eq!(e.arena().len(), len);

        assert_eq!(eval(&mut e, "a[1]"), "20");
        assert!(e.arena().len() > len);
    }

    #[test]
    fn test_load_missing_file() {
        let mut e = Evaluator::default();
        let err = e.load_file("/nonexistent/document.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
