//! Node storage and structural lookups.
//!
//! All nodes live in one append-only [`Arena`] and refer to each other by
//! [`NodeId`]. A container that holds itself through `@`, or a reference
//! that resolves into the document, simply shares a handle. Existing nodes
//! are never rewritten except for container slots patched while binding.
//!
//! Methods taking a [`NodeId`] expect a handle from the same arena and panic
//! otherwise; [`Arena::try_get`] checks first.

use std::collections::HashSet;
use std::panic::Location;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::config::Config;
use crate::error::{EvalError, ValueError};
use crate::types::*;

#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// `None` if `id` was not allocated by this arena.
    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Drop every node allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ── Constructors ──────────────────────────────────────────────────────

    pub fn null(&mut self) -> NodeId {
        self.alloc(Node::Null)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.alloc(Node::Boolean(value))
    }

    pub fn integer(&mut self, value: i64) -> NodeId {
        self.alloc(Node::Integer(value))
    }

    pub fn real(&mut self, value: Real) -> NodeId {
        self.alloc(Node::Real(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(Node::String(value.into()))
    }

    pub fn array(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Array(Array { items }))
    }

    /// Build an object, rejecting repeated keys.
    pub fn object(&mut self, entries: Vec<(String, NodeId)>) -> Result<NodeId, ValueError> {
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            match map.entry(key) {
                Entry::Occupied(e) => return Err(ValueError::DuplicateKey(e.key().clone())),
                Entry::Vacant(e) => {
                    e.insert(value);
                }
            }
        }
        Ok(self.alloc(Node::Object(Object { entries: map })))
    }

    pub fn reference(&mut self, anchor: Anchor, tail: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Reference(Reference { anchor, tail }))
    }

    pub fn set(&mut self, members: Vec<NodeId>, bound: bool) -> NodeId {
        self.alloc(Node::Set(Set { members, bound }))
    }

    /// Build a call. A bare `@` argument would make the call part of its own
    /// container and is rejected.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        args: Vec<NodeId>,
    ) -> Result<NodeId, EvalError> {
        let name = name.into();
        let recursive = args.iter().any(|&arg| {
            matches!(self.get(arg), Node::Reference(r) if r.anchor == Anchor::Local && r.tail.is_empty())
        });
        if recursive {
            return Err(EvalError::RecursiveFunction(name));
        }
        Ok(self.alloc(Node::Function(Function { name, args })))
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn kind(&self, id: NodeId) -> Kind {
        self.get(id).kind()
    }

    pub fn is_deferred(&self, id: NodeId) -> bool {
        self.get(id).is_deferred()
    }

    /// True when no deferred node is reachable from `id`.
    pub fn is_resolved(&self, id: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if self.is_deferred(id) {
                return false;
            }
            stack.extend(self.children(id));
        }
        true
    }

    /// Number of elements of an array or entries of an object.
    pub fn size(&self, id: NodeId) -> Option<usize> {
        match self.get(id) {
            Node::Array(a) => Some(a.len()),
            Node::Object(o) => Some(o.len()),
            _ => None,
        }
    }

    /// Keys of an object in insertion order; empty for anything else.
    pub fn keys(&self, id: NodeId) -> Vec<&str> {
        match self.get(id) {
            Node::Object(o) => o.keys().collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_integer(&self, id: NodeId) -> Option<i64> {
        self.get(id).as_index()
    }

    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        self.get(id).as_key()
    }

    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        match self.get(id) {
            Node::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_real(&self, id: NodeId) -> Option<&Real> {
        match self.get(id) {
            Node::Real(r) => Some(r),
            _ => None,
        }
    }

    /// Container slots in order: array items or object values.
    pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            Node::Array(a) => a.items.clone(),
            Node::Object(o) => o.entries.values().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn set_child(&mut self, id: NodeId, slot: usize, value: NodeId) {
        match &mut self.nodes[id.index()] {
            Node::Array(a) => a.items[slot] = value,
            Node::Object(o) => {
                if let Some((_, v)) = o.entries.get_index_mut(slot) {
                    *v = value;
                }
            }
            _ => {}
        }
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// Element of an array. Negative indices count from the end only when
    /// the config allows it.
    pub fn at_index(&self, array: NodeId, index: i64, config: &Config) -> Result<NodeId, EvalError> {
        match self.get(array) {
            Node::Array(a) => index_items(&a.items, index, config),
            other => Err(EvalError::InvalidOperand {
                anchor: other.kind(),
                item: Kind::Integer,
                detail: None,
            }),
        }
    }

    pub fn at_key(&self, object: NodeId, key: &str) -> Result<NodeId, EvalError> {
        match self.get(object) {
            Node::Object(o) => o.get(key).ok_or_else(|| EvalError::KeyNotFound(key.to_string())),
            other => Err(EvalError::InvalidOperand {
                anchor: other.kind(),
                item: Kind::String,
                detail: None,
            }),
        }
    }

    /// Apply `item` as an accessor to `anchor`.
    ///
    /// Arrays take integers and objects take strings. With symmetric
    /// indexing the operands may also be swapped.
    #[track_caller]
    pub fn by(&self, anchor: NodeId, item: NodeId, config: &Config) -> Result<NodeId, EvalError> {
        match (self.get(anchor), self.get(item)) {
            (Node::Array(a), Node::Integer(i)) => index_items(&a.items, *i, config),
            (Node::Object(o), Node::String(k)) => {
                o.get(k).ok_or_else(|| EvalError::KeyNotFound(k.clone()))
            }
            (Node::Integer(i), Node::Array(a)) if config.symmetric_indexing => {
                index_items(&a.items, *i, config)
            }
            (Node::String(k), Node::Object(o)) if config.symmetric_indexing => {
                o.get(k).ok_or_else(|| EvalError::KeyNotFound(k.clone()))
            }
            _ => Err(self.invalid_operand(anchor, item)),
        }
    }

    #[track_caller]
    fn invalid_operand(&self, anchor: NodeId, item: NodeId) -> EvalError {
        let detail = if cfg!(debug_assertions) {
            let loc = Location::caller();
            Some(format!(
                "{} by {} at {}:{}",
                self.describe(anchor),
                self.describe(item),
                loc.file(),
                loc.line()
            ))
        } else {
            None
        };
        EvalError::InvalidOperand {
            anchor: self.kind(anchor),
            item: self.kind(item),
            detail,
        }
    }

    /// Compact text of a node, or a marker when it cannot be printed.
    pub fn describe(&self, id: NodeId) -> String {
        self.stringify(id)
            .unwrap_or_else(|_| "{ structure is cyclic }".to_string())
    }
}

fn index_items(items: &[NodeId], index: i64, config: &Config) -> Result<NodeId, EvalError> {
    let len = items.len();
    let mut position = index;
    if position < 0 {
        if !config.negative_indexing {
            return Err(EvalError::NegativeIndex(index));
        }
        position += len as i64;
    }
    if position < 0 || position as usize >= len {
        return Err(EvalError::IndexOutOfRange { index, len });
    }
    Ok(items[position as usize])
}
