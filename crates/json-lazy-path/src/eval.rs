//! Reference resolution.
//!
//! [`Resolver::resolve`] returns the most resolved form of a node. Deferred
//! nodes are never modified: any progress allocates a new node, so a
//! failure leaves every existing handle as it was. Only container slots are
//! overwritten, by [`Resolver::bind_local`] and [`Resolver::bind_root`].

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::arena::Arena;
use crate::config::Config;
use crate::error::EvalError;
use crate::functions;
use crate::types::*;

/// Anchors available to `$` and `@`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub root: Option<NodeId>,
    pub local: Option<NodeId>,
}

impl Scope {
    pub fn root(root: NodeId) -> Self {
        Self {
            root: Some(root),
            local: None,
        }
    }

    pub fn local(local: NodeId) -> Self {
        Self {
            root: None,
            local: Some(local),
        }
    }
}

/// Result of applying a tail to an anchor.
enum Outcome {
    /// Handle of the result, possibly still deferred.
    Done(NodeId),
    /// Stopped before the tail was used up.
    Pending(Anchor, Vec<NodeId>),
}

/// What one accessor does to the running anchor.
enum Step {
    Key(NodeId),
    Stop(NodeId),
    Bound(Vec<NodeId>),
}

pub struct Resolver<'a> {
    arena: &'a mut Arena,
    config: Config,
    visiting: HashSet<NodeId>,
}

impl<'a> Resolver<'a> {
    pub fn new(arena: &'a mut Arena, config: Config) -> Self {
        Self {
            arena,
            config,
            visiting: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, id: NodeId, scope: Scope) -> Result<NodeId, EvalError> {
        if !self.arena.is_deferred(id) {
            return Ok(id);
        }
        if self.visiting.contains(&id) {
            debug!(node = id.index(), "cyclic reference");
            return Err(EvalError::CyclicReference);
        }
        // Every node being resolved is on the call stack.
        if self.visiting.len() >= self.config.max_depth {
            debug!(node = id.index(), depth = self.visiting.len(), "resolution too deep");
            return Err(EvalError::TooDeep(self.config.max_depth));
        }
        self.visiting.insert(id);
        let result = match self.arena.get(id).clone() {
            Node::Reference(r) => self.resolve_reference(id, r, scope),
            Node::Set(s) => self.resolve_set(id, s, scope),
            Node::Function(f) => self.resolve_function(id, f, scope),
            _ => Ok(id),
        };
        self.visiting.remove(&id);
        result
    }

    /// Resolve the deferred slots of a freshly built container with `@`
    /// bound to the container itself.
    pub fn bind_local(&mut self, container: NodeId) -> Result<(), EvalError> {
        trace!(container = container.index(), "binding local");
        self.bind_slots(container, None)
    }

    /// Resolve `expr` against the document `root`, then patch every
    /// container reachable from the result that still holds deferred
    /// slots.
    pub fn bind_root(&mut self, expr: NodeId, root: NodeId) -> Result<NodeId, EvalError> {
        debug!(expr = expr.index(), root = root.index(), "binding root");
        let result = self.resolve(expr, Scope::root(root))?;
        let mut seen = HashSet::new();
        let mut stack = vec![result];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            self.bind_slots(id, Some(root))?;
            stack.extend(self.arena.children(id));
        }
        Ok(result)
    }

    fn bind_slots(&mut self, container: NodeId, root: Option<NodeId>) -> Result<(), EvalError> {
        let scope = Scope {
            root,
            local: Some(container),
        };
        for (slot, child) in self.arena.children(container).into_iter().enumerate() {
            if !self.arena.is_deferred(child) {
                continue;
            }
            let resolved = self.resolve(child, scope)?;
            if resolved != child {
                self.arena.set_child(container, slot, resolved);
            }
        }
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        id: NodeId,
        reference: Reference,
        scope: Scope,
    ) -> Result<NodeId, EvalError> {
        let start = match reference.anchor {
            Anchor::Root => scope.root,
            Anchor::Local => scope.local,
            Anchor::Accessor => None,
            Anchor::Node(node) => Some(node),
        };
        let Some(start) = start else {
            return Ok(id);
        };
        match self.walk(start, &reference.tail, scope)? {
            Outcome::Done(result) => Ok(result),
            Outcome::Pending(anchor, tail) => {
                if anchor == reference.anchor && tail == reference.tail {
                    Ok(id)
                } else {
                    Ok(self.arena.reference(anchor, tail))
                }
            }
        }
    }

    fn resolve_set(&mut self, id: NodeId, set: Set, scope: Scope) -> Result<NodeId, EvalError> {
        if !set.bound {
            return Ok(id);
        }
        let mut members = Vec::with_capacity(set.members.len());
        let mut changed = false;
        for member in set.members {
            let resolved = self.resolve(member, scope)?;
            changed |= resolved != member;
            members.push(resolved);
        }
        if !changed && members.iter().any(|&m| self.arena.is_deferred(m)) {
            return Ok(id);
        }
        Ok(self.finish_set(members))
    }

    fn resolve_function(
        &mut self,
        id: NodeId,
        function: Function,
        scope: Scope,
    ) -> Result<NodeId, EvalError> {
        let mut args = Vec::with_capacity(function.args.len());
        let mut changed = false;
        for &arg in &function.args {
            let resolved = self.resolve(arg, scope)?;
            changed |= resolved != arg;
            if self.arena.size(resolved).is_some() {
                self.bind_slots(resolved, scope.root)?;
            }
            args.push(resolved);
        }
        if let Some(value) = functions::call(self.arena, &function.name, &args)? {
            trace!(function = %function.name, "evaluated");
            return Ok(value);
        }
        if changed {
            Ok(self.arena.alloc(Node::Function(Function {
                name: function.name,
                args,
            })))
        } else {
            Ok(id)
        }
    }

    /// Apply `tail` to `start` one accessor at a time.
    fn walk(&mut self, start: NodeId, tail: &[NodeId], scope: Scope) -> Result<Outcome, EvalError> {
        let mut anchor = start;
        let mut rest = tail;
        loop {
            if let Node::Set(s) = self.arena.get(anchor) {
                if s.bound {
                    let members = s.members.clone();
                    return self.broadcast(members, rest, scope).map(Outcome::Done);
                }
            }
            if self.arena.is_deferred(anchor) {
                anchor = self.resolve(anchor, scope)?;
                match self.arena.get(anchor) {
                    Node::Reference(r) if !rest.is_empty() => {
                        let mut merged = r.tail.clone();
                        merged.extend_from_slice(rest);
                        return Ok(Outcome::Pending(r.anchor, merged));
                    }
                    Node::Set(s) if s.bound => {
                        let members = s.members.clone();
                        return self.broadcast(members, rest, scope).map(Outcome::Done);
                    }
                    node if node.is_deferred() => {
                        return Ok(if rest.is_empty() {
                            Outcome::Done(anchor)
                        } else {
                            Outcome::Pending(Anchor::Node(anchor), rest.to_vec())
                        });
                    }
                    _ => {}
                }
            }

            let Some((&head, remaining)) = rest.split_first() else {
                return Ok(Outcome::Done(anchor));
            };
            match self.step(anchor, head, scope)? {
                Step::Key(key) => {
                    anchor = self.arena.by(anchor, key, &self.config)?;
                    rest = remaining;
                }
                Step::Stop(accessor) => {
                    let mut pending = Vec::with_capacity(rest.len());
                    pending.push(accessor);
                    pending.extend_from_slice(remaining);
                    return Ok(Outcome::Pending(Anchor::Node(anchor), pending));
                }
                Step::Bound(members) => {
                    return self.broadcast(members, remaining, scope).map(Outcome::Done);
                }
            }
        }
    }

    fn step(&mut self, anchor: NodeId, head: NodeId, scope: Scope) -> Result<Step, EvalError> {
        match self.arena.get(head).clone() {
            Node::Reference(r) => {
                let key = match r.anchor {
                    // Relative accessors continue from the running anchor.
                    Anchor::Local | Anchor::Accessor => match self.walk(anchor, &r.tail, scope)? {
                        Outcome::Done(key) => key,
                        Outcome::Pending(a, t) if a == Anchor::Node(anchor) && t == r.tail => head,
                        Outcome::Pending(a, t) => self.arena.reference(a, t),
                    },
                    Anchor::Root | Anchor::Node(_) => self.resolve(head, scope)?,
                };
                if self.arena.is_deferred(key) {
                    Ok(Step::Stop(key))
                } else {
                    Ok(Step::Key(key))
                }
            }
            Node::Set(s) if !s.bound => {
                let mut bound = Vec::with_capacity(s.members.len());
                for member in s.members {
                    bound.push(self.member(anchor, member, scope)?);
                }
                Ok(Step::Bound(bound))
            }
            Node::Set(_) | Node::Function(_) => Ok(Step::Stop(head)),
            _ => Ok(Step::Key(head)),
        }
    }

    /// Apply one member of an unbound set to `anchor`.
    fn member(&mut self, anchor: NodeId, member: NodeId, scope: Scope) -> Result<NodeId, EvalError> {
        let path = match self.arena.get(member) {
            Node::Reference(r) if r.anchor == Anchor::Accessor => r.tail.clone(),
            _ => vec![member],
        };
        match self.walk(anchor, &path, scope)? {
            Outcome::Done(id) => Ok(id),
            Outcome::Pending(a, t) => Ok(self.arena.reference(a, t)),
        }
    }

    /// Apply `rest` to every member of a bound set.
    fn broadcast(
        &mut self,
        members: Vec<NodeId>,
        rest: &[NodeId],
        scope: Scope,
    ) -> Result<NodeId, EvalError> {
        let mut results = Vec::with_capacity(members.len());
        for member in members {
            let result = match self.walk(member, rest, scope)? {
                Outcome::Done(id) => id,
                Outcome::Pending(a, t) => self.arena.reference(a, t),
            };
            results.push(result);
        }
        Ok(self.finish_set(results))
    }

    /// A bound set whose members are all values becomes an array.
    fn finish_set(&mut self, members: Vec<NodeId>) -> NodeId {
        if members.iter().all(|&m| !self.arena.is_deferred(m)) {
            self.arena.array(members)
        } else {
            self.arena.set(members, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_reference_is_unchanged() {
        let mut arena = Arena::new();
        let key = arena.string("a");
        let root = arena.reference(Anchor::Root, vec![key]);
        let len = arena.len();
        let resolved = Resolver::new(&mut arena, Config::default())
            .resolve(root, Scope::default())
            .unwrap();
        assert_eq!(resolved, root);
        assert_eq!(arena.len(), len);
    }

    #[test]
    fn test_root_reference() {
        let mut arena = Arena::new();
        let value = arena.integer(7);
        let doc = arena.object(vec![("a".into(), value)]).unwrap();
        let key = arena.string("a");
        let path = arena.reference(Anchor::Root, vec![key]);
        let resolved = Resolver::new(&mut arena, Config::default())
            .resolve(path, Scope::root(doc))
            .unwrap();
        assert_eq!(resolved, value);
    }

    #[test]
    fn test_local_binding_writes_back() {
        let mut arena = Arena::new();
        let five = arena.integer(5);
        let key = arena.string("key1");
        let sibling = arena.reference(Anchor::Local, vec![key]);
        let object = arena
            .object(vec![("key1".into(), five), ("key2".into(), sibling)])
            .unwrap();
        Resolver::new(&mut arena, Config::default())
            .bind_local(object)
            .unwrap();
        assert_eq!(arena.at_key(object, "key2").unwrap(), five);
    }

    #[test]
    fn test_mutual_references_are_cyclic() {
        let mut arena = Arena::new();
        let a = arena.string("a");
        let b = arena.string("b");
        let to_b = arena.reference(Anchor::Local, vec![b]);
        let to_a = arena.reference(Anchor::Local, vec![a]);
        let object = arena
            .object(vec![("a".into(), to_b), ("b".into(), to_a)])
            .unwrap();
        let err = Resolver::new(&mut arena, Config::default())
            .bind_local(object)
            .unwrap_err();
        assert_eq!(err, EvalError::CyclicReference);
    }

    fn chain(arena: &mut Arena, links: usize) -> NodeId {
        let key = arena.string("a");
        let mut head = arena.reference(Anchor::Root, vec![key]);
        for _ in 0..links {
            head = arena.reference(Anchor::Node(head), Vec::new());
        }
        head
    }

    #[test]
    fn test_long_chain_is_too_deep() {
        let mut arena = Arena::new();
        let head = chain(&mut arena, 5000);
        let err = Resolver::new(&mut arena, Config::default())
            .resolve(head, Scope::default())
            .unwrap_err();
        assert_eq!(err, EvalError::TooDeep(128));
    }

    #[test]
    fn test_bind_root_through_chain() {
        let mut arena = Arena::new();
        let one = arena.integer(1);
        let doc = arena.object(vec![("a".into(), one)]).unwrap();

        let head = chain(&mut arena, 50);
        let resolved = Resolver::new(&mut arena, Config::default())
            .bind_root(head, doc)
            .unwrap();
        assert_eq!(resolved, one);

        let head = chain(&mut arena, 5000);
        let err = Resolver::new(&mut arena, Config::default())
            .bind_root(head, doc)
            .unwrap_err();
        assert_eq!(err, EvalError::TooDeep(128));

        let head = chain(&mut arena, 20);
        let config = Config::default().with_max_depth(16);
        assert_eq!(
            Resolver::new(&mut arena, config).bind_root(head, doc),
            Err(EvalError::TooDeep(16))
        );
    }

    #[test]
    fn test_failed_resolution_keeps_reference() {
        let mut arena = Arena::new();
        let five = arena.integer(5);
        let doc = arena.object(vec![("b".into(), five)]).unwrap();
        let key = arena.string("a");
        let path = arena.reference(Anchor::Root, vec![key]);
        let err = Resolver::new(&mut arena, Config::default())
            .resolve(path, Scope::root(doc))
            .unwrap_err();
        assert_eq!(err, EvalError::KeyNotFound("a".into()));
        assert_eq!(arena.stringify(path).unwrap(), "$[\"a\"]");
        assert_eq!(arena.stringify(doc).unwrap(), "{\"b\": 5}");
    }
}
