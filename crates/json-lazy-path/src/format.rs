//! Text rendering of nodes.

use std::collections::HashSet;

use crate::arena::Arena;
use crate::error::EvalError;
use crate::types::*;

impl Arena {
    /// Render `id` on a single line.
    pub fn stringify(&self, id: NodeId) -> Result<String, EvalError> {
        self.render(id, false)
    }

    /// Render `id` with one element per line and tab indentation. Containers
    /// whose elements are all leaves still fit on one line.
    pub fn stringify_pretty(&self, id: NodeId) -> Result<String, EvalError> {
        self.render(id, true)
    }

    pub fn render(&self, id: NodeId, pretty: bool) -> Result<String, EvalError> {
        self.render_indented(id, pretty, 0)
    }

    pub fn render_indented(
        &self,
        id: NodeId,
        pretty: bool,
        indent: usize,
    ) -> Result<String, EvalError> {
        let mut writer = Writer {
            arena: self,
            pretty,
            on_path: HashSet::new(),
            out: String::new(),
        };
        writer.node(id, indent)?;
        Ok(writer.out)
    }

    /// A container is compact when it prints on one line even in pretty
    /// mode.
    pub fn is_compact(&self, id: NodeId) -> bool {
        match self.get(id) {
            Node::Array(a) => a.items.iter().all(|&item| self.get(item).is_leaf()),
            Node::Object(o) => match o.len() {
                0 => true,
                1 => o.entries.values().all(|&value| self.get(value).is_leaf()),
                _ => false,
            },
            _ => true,
        }
    }
}

struct Writer<'a> {
    arena: &'a Arena,
    pretty: bool,
    on_path: HashSet<NodeId>,
    out: String,
}

impl Writer<'_> {
    fn node(&mut self, id: NodeId, indent: usize) -> Result<(), EvalError> {
        let arena = self.arena;
        match arena.get(id) {
            Node::Null => self.out.push_str("null"),
            Node::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Node::Integer(i) => self.out.push_str(&i.to_string()),
            Node::Real(r) => self.out.push_str(r.text()),
            Node::String(s) => write_quoted(&mut self.out, s),
            Node::Array(a) => {
                let items = a.items.clone();
                self.container(id, indent, ('[', ']'), &items, |w, item, indent| {
                    w.node(item, indent)
                })?;
            }
            Node::Object(o) => {
                let entries: Vec<(String, NodeId)> =
                    o.entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
                self.container(id, indent, ('{', '}'), &entries, |w, (key, value), indent| {
                    write_quoted(&mut w.out, &key);
                    w.out.push_str(": ");
                    w.node(value, indent)
                })?;
            }
            Node::Reference(r) => {
                match r.anchor {
                    Anchor::Local => self.out.push('@'),
                    Anchor::Root => self.out.push('$'),
                    Anchor::Accessor => {}
                    Anchor::Node(anchor) => self.node(anchor, indent)?,
                }
                for &accessor in &r.tail {
                    if matches!(arena.get(accessor), Node::Set(s) if !s.bound) {
                        self.node(accessor, indent)?;
                    } else {
                        self.out.push('[');
                        self.node(accessor, indent)?;
                        self.out.push(']');
                    }
                }
            }
            Node::Set(s) => {
                let (open, close) = if s.bound { ('[', ']') } else { ('{', '}') };
                self.out.push(open);
                self.list(&s.members, indent)?;
                self.out.push(close);
            }
            Node::Function(f) => {
                self.out.push_str(&f.name);
                self.out.push('(');
                self.list(&f.args, indent)?;
                self.out.push(')');
            }
        }
        Ok(())
    }

    fn list(&mut self, items: &[NodeId], indent: usize) -> Result<(), EvalError> {
        for (n, &item) in items.iter().enumerate() {
            if n > 0 {
                self.out.push_str(", ");
            }
            self.node(item, indent)?;
        }
        Ok(())
    }

    fn container<T: Clone>(
        &mut self,
        id: NodeId,
        indent: usize,
        (open, close): (char, char),
        items: &[T],
        mut write_item: impl FnMut(&mut Self, T, usize) -> Result<(), EvalError>,
    ) -> Result<(), EvalError> {
        if !self.on_path.insert(id) {
            return Err(EvalError::CyclicStructure);
        }
        let pretty = self.pretty && !self.arena.is_compact(id);
        self.out.push(open);
        for (n, item) in items.iter().enumerate() {
            if n > 0 {
                self.out.push(',');
                if !pretty {
                    self.out.push(' ');
                }
            }
            if pretty {
                self.out.push('\n');
                push_tabs(&mut self.out, indent + 1);
            }
            write_item(self, item.clone(), indent + 1)?;
        }
        if pretty && !items.is_empty() {
            self.out.push('\n');
            push_tabs(&mut self.out, indent);
        }
        self.out.push(close);
        self.on_path.remove(&id);
        Ok(())
    }
}

fn push_tabs(out: &mut String, count: usize) {
    out.extend(std::iter::repeat('\t').take(count));
}

/// Write `s` as a JSON string literal.
pub(crate) fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
