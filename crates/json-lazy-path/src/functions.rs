//! Builtin functions: `size`, `min` and `max`.

use crate::arena::Arena;
use crate::error::EvalError;
use crate::types::{Node, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Size,
    Min,
    Max,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "size" => Some(Builtin::Size),
            "min" => Some(Builtin::Min),
            "max" => Some(Builtin::Max),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Size => "size",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }
}

/// Evaluate a call whose arguments are already resolved as far as they go.
///
/// `Ok(None)` means the call stays as it is: the name is unknown or an
/// argument it needs is still deferred.
pub fn call(arena: &mut Arena, name: &str, args: &[NodeId]) -> Result<Option<NodeId>, EvalError> {
    let Some(builtin) = Builtin::lookup(name) else {
        return Ok(None);
    };
    let value = match builtin {
        Builtin::Size => size(arena, args)?,
        Builtin::Min | Builtin::Max => reduce(arena, builtin, args)?,
    };
    Ok(value.map(|v| arena.integer(v)))
}

/// Length of a single collection argument. Any other argument count
/// yields the count itself.
fn size(arena: &Arena, args: &[NodeId]) -> Result<Option<i64>, EvalError> {
    let [arg] = args else {
        return Ok(Some(args.len() as i64));
    };
    match arena.get(*arg) {
        Node::Array(a) => Ok(Some(a.len() as i64)),
        Node::Object(o) => Ok(Some(o.len() as i64)),
        node if node.is_deferred() => Ok(None),
        node => Err(EvalError::InvalidArgument {
            function: Builtin::Size.name().to_string(),
            kind: node.kind(),
        }),
    }
}

/// Minimum or maximum over the elements of a single array argument, or
/// over the arguments themselves.
fn reduce(arena: &Arena, builtin: Builtin, args: &[NodeId]) -> Result<Option<i64>, EvalError> {
    let name = builtin.name();
    let elements: Vec<NodeId> = match args {
        [] => return Err(EvalError::EmptyReduction(name.to_string())),
        [single] => match arena.get(*single) {
            Node::Array(a) => a.items().to_vec(),
            _ => vec![*single],
        },
        many => many.to_vec(),
    };
    if elements.is_empty() {
        return Err(EvalError::EmptyReduction(name.to_string()));
    }
    if elements.iter().any(|&e| arena.is_deferred(e)) {
        return Ok(None);
    }
    let mut values = Vec::with_capacity(elements.len());
    for &element in &elements {
        let value = arena
            .as_integer(element)
            .ok_or_else(|| EvalError::NotAnInteger(name.to_string()))?;
        values.push(value);
    }
    let result = match builtin {
        Builtin::Max => values.into_iter().max(),
        _ => values.into_iter().min(),
    };
    Ok(result)
}
