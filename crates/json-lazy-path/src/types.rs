//! Node types for JSON values and deferred references.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::ValueError;

/// Handle of a node stored in an [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A JSON value or a deferred expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integer literal: `42`, `-7`
    Integer(i64),
    /// Real literal, stored with its canonical text: `3.14`, `1e12`
    Real(Real),
    /// String literal: `"key"`
    String(String),
    /// Array literal: `[1, 2]`
    Array(Array),
    /// Object literal: `{"a": 1}`
    Object(Object),
    /// Path waiting for its anchor: `$.a[0]`
    Reference(Reference),
    /// Union of paths: `{.a, .b}` or `[0, 1]`
    Set(Set),
    /// Function call: `size($.a)`
    Function(Function),
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Boolean(_) => Kind::Boolean,
            Node::Integer(_) => Kind::Integer,
            Node::Real(_) => Kind::Real,
            Node::String(_) => Kind::String,
            Node::Array(_) => Kind::Array,
            Node::Object(_) => Kind::Object,
            Node::Reference(_) | Node::Set(_) | Node::Function(_) => Kind::Reference,
        }
    }

    /// Sub-kind of a deferred node, `None` for values.
    pub fn reference_kind(&self) -> Option<ReferenceKind> {
        match self {
            Node::Reference(_) => Some(ReferenceKind::Path),
            Node::Set(_) => Some(ReferenceKind::Set),
            Node::Function(_) => Some(ReferenceKind::Function),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.reference_kind().is_some()
    }

    /// True when the node has no children: scalars, deferred nodes and
    /// empty containers.
    pub fn is_leaf(&self) -> bool {
        match self {
            Node::Array(a) => a.items.is_empty(),
            Node::Object(o) => o.entries.is_empty(),
            _ => true,
        }
    }

    pub fn as_index(&self) -> Option<i64> {
        match self {
            Node::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Value kinds visible to lookups and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Array,
    Object,
    Reference,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "JSON-Null",
            Kind::Boolean => "JSON-Boolean",
            Kind::Integer => "JSON-Integer",
            Kind::Real => "JSON-Real",
            Kind::String => "JSON-String",
            Kind::Array => "JSON-Array",
            Kind::Object => "JSON-Object",
            Kind::Reference => "JSON-Reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Path,
    Set,
    Function,
}

/// Single-precision real that remembers how it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Real {
    value: f32,
    text: String,
}

impl Real {
    /// Build from a value. The text is the six-decimal rendering with
    /// trailing zeros removed, keeping at least one fractional digit.
    pub fn new(value: f32) -> Self {
        let mut text = format!("{value:.6}");
        if text.contains('.') {
            while text.ends_with('0') && !text.ends_with(".0") {
                text.pop();
            }
        }
        Self { value, text }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl FromStr for Real {
    type Err = ValueError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let numeric = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
        if text.trim().is_empty() || !text.chars().all(numeric) {
            return Err(ValueError::MalformedReal(text.to_string()));
        }
        let value: f32 = text
            .parse()
            .map_err(|_| ValueError::MalformedReal(text.to_string()))?;
        if !value.is_finite() {
            return Err(ValueError::RealOutOfRange(text.to_string()));
        }
        Ok(Self {
            value,
            text: text.to_string(),
        })
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    pub(crate) items: Vec<NodeId>,
}

impl Array {
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Insertion-ordered map with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    pub(crate) entries: IndexMap<String, NodeId>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a reference starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `@`, the innermost enclosing container
    Local,
    /// `$`, the document
    Root,
    /// Member of an unbound set; anchored by whatever the set is applied to
    Accessor,
    /// A concrete or deferred node
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub anchor: Anchor,
    pub tail: Vec<NodeId>,
}

/// Union of paths. Unbound sets are accessors (`{.a, .b}`); applying one
/// to an anchor produces a bound set holding one result per member.
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    pub members: Vec<NodeId>,
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub args: Vec<NodeId>,
}
