//! Value IR: the expression tree produced by generation and mutation.
//!
//! A [`Value`] is a tagged-variant tree describing one constructor
//! expression: class instantiations, static member access, literals, and
//! primitives. Every node except [`Value::Variable`] carries a [`DistPtr`]
//! recording which distribution and which alternative inside it produced
//! the node; the mutator uses it to locate sibling alternatives.
//!
//! Values are immutable trees. Sharing is unobservable: every edit made by
//! the zipper yields a new root.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;

/// Stable handle into the distribution table (a content address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistRef(pub String);

impl DistRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the alternative that produced a node: a distribution handle
/// plus an index into that distribution's *resolved* source list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistPtr {
    pub dist: DistRef,
    pub source_index: usize,
}

impl DistPtr {
    pub fn new(dist: DistRef, source_index: usize) -> Self {
        Self { dist, source_index }
    }
}

/// Typed payload of a primitive node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrimitiveValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl PrimitiveValue {
    /// The Unix epoch, the minimal date.
    pub fn epoch() -> Self {
        PrimitiveValue::Date(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Name of the primitive family ("string", "number", ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveValue::String(_) => "string",
            PrimitiveValue::Number(_) => "number",
            PrimitiveValue::Boolean(_) => "boolean",
            PrimitiveValue::Date(_) => "date",
        }
    }
}

/// One node of the expression tree.
///
/// Serialized with an explicit `kind` tag so persisted values round-trip
/// structurally and stay diff-friendly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    /// `new Fqn(arguments...)`
    ClassInstantiation {
        fqn: String,
        parameter_names: Vec<String>,
        arguments: Vec<Value>,
        dist_ptr: DistPtr,
    },
    /// `TargetFqn.method(arguments...)` declared on `fqn`
    StaticMethodCall {
        fqn: String,
        static_method: String,
        target_fqn: String,
        parameter_names: Vec<String>,
        arguments: Vec<Value>,
        dist_ptr: DistPtr,
    },
    /// `Fqn.property`
    StaticPropertyAccess {
        fqn: String,
        static_property: String,
        target_fqn: String,
        dist_ptr: DistPtr,
    },
    /// A value-object literal; entry order is the struct's declaration order.
    StructLiteral {
        fqn: String,
        entries: Vec<(String, Value)>,
        dist_ptr: DistPtr,
    },
    /// A free-form string-keyed map literal.
    MapLiteral {
        entries: Vec<(String, Value)>,
        dist_ptr: DistPtr,
    },
    ArrayValue {
        elements: Vec<Value>,
        dist_ptr: DistPtr,
    },
    Primitive {
        value: PrimitiveValue,
        dist_ptr: DistPtr,
    },
    /// Explicit absence; legal only in argument/field positions for
    /// optional parameters.
    NoValue { dist_ptr: DistPtr },
    /// Opaque placeholder for the host-provided root object.
    Scope { dist_ptr: DistPtr },
    /// Reference to an earlier extracted binding; only present after
    /// statement discretization.
    Variable { name: String },
}

impl Value {
    /// The distribution pointer that produced this node, if any.
    pub fn dist_ptr(&self) -> Option<&DistPtr> {
        match self {
            Value::ClassInstantiation { dist_ptr, .. }
            | Value::StaticMethodCall { dist_ptr, .. }
            | Value::StaticPropertyAccess { dist_ptr, .. }
            | Value::StructLiteral { dist_ptr, .. }
            | Value::MapLiteral { dist_ptr, .. }
            | Value::ArrayValue { dist_ptr, .. }
            | Value::Primitive { dist_ptr, .. }
            | Value::NoValue { dist_ptr }
            | Value::Scope { dist_ptr } => Some(dist_ptr),
            Value::Variable { .. } => None,
        }
    }

    /// Clone of this node with its pointer replaced. Children keep theirs.
    pub fn with_ptr(&self, ptr: DistPtr) -> Value {
        let mut out = self.clone();
        match &mut out {
            Value::ClassInstantiation { dist_ptr, .. }
            | Value::StaticMethodCall { dist_ptr, .. }
            | Value::StaticPropertyAccess { dist_ptr, .. }
            | Value::StructLiteral { dist_ptr, .. }
            | Value::MapLiteral { dist_ptr, .. }
            | Value::ArrayValue { dist_ptr, .. }
            | Value::Primitive { dist_ptr, .. }
            | Value::NoValue { dist_ptr }
            | Value::Scope { dist_ptr } => *dist_ptr = ptr,
            Value::Variable { .. } => {}
        }
        out
    }

    pub fn is_no_value(&self) -> bool {
        matches!(self, Value::NoValue { .. })
    }

    /// Content hash of the canonical JSON form, used for output file names
    /// and dedup during exploration.
    pub fn content_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("value serialization is infallible");
        let mut hasher = sha2::Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(&hasher.finalize()[..8])
    }
}

/// Last segment of a dotted FQN (`m.sub.Stack` -> `Stack`).
pub fn simple_name(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

/// Lowercase the first character (`Stack` -> `stack`).
pub fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[Value]) -> fmt::Result {
    // Trailing no-value placeholders are unfilled optionals; keep them out
    // of the printed call.
    let visible = arguments
        .iter()
        .rposition(|a| !a.is_no_value())
        .map(|i| i + 1)
        .unwrap_or(0);
    for (i, arg) in arguments[..visible].iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::String(s) => {
                write!(f, "{}", serde_json::to_string(s).map_err(|_| fmt::Error)?)
            }
            PrimitiveValue::Number(n) => write!(f, "{}", n),
            PrimitiveValue::Boolean(b) => write!(f, "{}", b),
            PrimitiveValue::Date(d) => {
                write!(f, "date(\"{}\")", d.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::ClassInstantiation { fqn, arguments, .. } => {
                write!(f, "new {}(", fqn)?;
                write_arguments(f, arguments)?;
                write!(f, ")")
            }
            Value::StaticMethodCall {
                fqn,
                static_method,
                arguments,
                ..
            } => {
                write!(f, "{}.{}(", fqn, static_method)?;
                write_arguments(f, arguments)?;
                write!(f, ")")
            }
            Value::StaticPropertyAccess {
                fqn,
                static_property,
                ..
            } => write!(f, "{}.{}", fqn, static_property),
            Value::StructLiteral { entries, .. } => {
                write!(f, "{{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::MapLiteral { entries, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "{}: {}",
                        serde_json::to_string(key).map_err(|_| fmt::Error)?,
                        value
                    )?;
                }
                write!(f, "}}")
            }
            Value::ArrayValue { elements, .. } => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Primitive { value, .. } => write!(f, "{}", value),
            Value::NoValue { .. } => write!(f, "undefined"),
            Value::Scope { .. } => write!(f, "scope"),
            Value::Variable { name } => write!(f, "{}", name),
        }
    }
}
