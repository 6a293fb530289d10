//! Evaluation of discretized programs against a host library.
//!
//! The engine never reflects over a real library itself; it talks to a
//! [`Host`], whose contract mirrors the reflection facility of the
//! original runtime: split an FQN on `.`, the leftmost segment names a
//! top-level module, and each following segment indexes member by member.
//! Resolved FQNs are memoized per [`Evaluator`] instance.
//!
//! The built-in [`JsonHost`] reifies programs as JSON artifacts while
//! enforcing the registry's argument contracts, which is enough for the
//! CLI's `explore -s` loop to separate semantically valid mutations from
//! invalid ones.

use crate::errors::{ErrorCode, Failure, FailureContext};
use crate::statements::Statement;
use crate::typereg::TypeRegistry;
use crate::value::{PrimitiveValue, Value};
use chrono::SecondsFormat;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// A resolved type handle: the callable surface of one FQN.
pub trait HostType: Clone {
    /// Invoke the constructor.
    fn construct(&self, args: Vec<JsonValue>) -> Result<JsonValue, Failure>;
    /// Read the named static member as a callable and apply it.
    fn call_static(&self, method: &str, args: Vec<JsonValue>) -> Result<JsonValue, Failure>;
    /// Read the named static member.
    fn get_static(&self, property: &str) -> Result<JsonValue, Failure>;
}

/// The host library's reflection facility.
pub trait Host {
    type Type: HostType;

    /// Resolve an FQN to a type handle.
    fn resolve(&self, fqn: &str) -> Result<Self::Type, Failure>;

    /// The root object handed to `scope` placeholders. Created once per
    /// evaluator.
    fn scope_root(&self) -> JsonValue;
}

/// Interprets statements against a host, binding each variable once.
pub struct Evaluator<H: Host> {
    host: H,
    variables: HashMap<String, JsonValue>,
    resolved: HashMap<String, H::Type>,
    scope: Option<JsonValue>,
}

impl<H: Host> Evaluator<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            variables: HashMap::new(),
            resolved: HashMap::new(),
            scope: None,
        }
    }

    /// Run a program; the artifact is the result of the last expression.
    pub fn run(&mut self, statements: &[Statement]) -> Result<JsonValue, Failure> {
        let mut artifact = JsonValue::Null;
        for statement in statements {
            match statement {
                Statement::Assignment { name, value } => {
                    let evaluated = self.eval(value)?;
                    if self.variables.insert(name.clone(), evaluated).is_some() {
                        return Err(Failure::new(
                            ErrorCode::DuplicateBinding,
                            format!("variable {} bound twice", name),
                        ));
                    }
                }
                Statement::Expression { value } => artifact = self.eval(value)?,
            }
        }
        Ok(artifact)
    }

    fn eval(&mut self, value: &Value) -> Result<JsonValue, Failure> {
        match value {
            Value::Primitive { value, .. } => Ok(primitive_to_json(value)?),
            Value::Scope { .. } => match &self.scope {
                Some(scope) => Ok(scope.clone()),
                None => {
                    let scope = self.host.scope_root();
                    self.scope = Some(scope.clone());
                    Ok(scope)
                }
            },
            Value::ArrayValue { elements, .. } => {
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    if element.is_no_value() {
                        return Err(no_value_failure("array element"));
                    }
                    out.push(self.eval(element)?);
                }
                Ok(JsonValue::Array(out))
            }
            Value::MapLiteral { entries, .. } | Value::StructLiteral { entries, .. } => {
                let mut out = Map::new();
                for (key, entry_value) in entries {
                    // An absent optional simply drops the entry.
                    if entry_value.is_no_value() {
                        continue;
                    }
                    out.insert(key.clone(), self.eval(entry_value)?);
                }
                Ok(JsonValue::Object(out))
            }
            Value::ClassInstantiation { fqn, arguments, .. } => {
                let args = self.eval_arguments(arguments)?;
                let handle = self.resolve_cached(fqn)?;
                handle.construct(args)
            }
            Value::StaticMethodCall {
                fqn,
                static_method,
                arguments,
                ..
            } => {
                let args = self.eval_arguments(arguments)?;
                let handle = self.resolve_cached(fqn)?;
                handle.call_static(static_method, args)
            }
            Value::StaticPropertyAccess {
                fqn,
                static_property,
                ..
            } => {
                let handle = self.resolve_cached(fqn)?;
                handle.get_static(static_property)
            }
            Value::Variable { name } => self.variables.get(name).cloned().ok_or_else(|| {
                Failure::new(
                    ErrorCode::UnboundVariable,
                    format!("variable {} referenced before binding", name),
                )
            }),
            Value::NoValue { .. } => Err(no_value_failure("expression position")),
        }
    }

    /// Trailing no-value arguments are unfilled optionals and are trimmed;
    /// interior ones evaluate to null (the absent-argument marker).
    fn eval_arguments(&mut self, arguments: &[Value]) -> Result<Vec<JsonValue>, Failure> {
        let visible = arguments
            .iter()
            .rposition(|a| !a.is_no_value())
            .map(|i| i + 1)
            .unwrap_or(0);
        arguments[..visible]
            .iter()
            .map(|argument| {
                if argument.is_no_value() {
                    Ok(JsonValue::Null)
                } else {
                    self.eval(argument)
                }
            })
            .collect()
    }

    fn resolve_cached(&mut self, fqn: &str) -> Result<H::Type, Failure> {
        if let Some(handle) = self.resolved.get(fqn) {
            return Ok(handle.clone());
        }
        let handle = self.host.resolve(fqn)?;
        self.resolved.insert(fqn.to_string(), handle.clone());
        Ok(handle)
    }
}

fn primitive_to_json(value: &PrimitiveValue) -> Result<JsonValue, Failure> {
    Ok(match value {
        PrimitiveValue::String(s) => JsonValue::String(s.clone()),
        PrimitiveValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .ok_or_else(|| {
                Failure::new(
                    ErrorCode::EvaluationFailed,
                    format!("non-finite number {} cannot be reified", n),
                )
            })?,
        PrimitiveValue::Boolean(b) => JsonValue::Bool(*b),
        PrimitiveValue::Date(d) => {
            JsonValue::String(d.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
    })
}

fn no_value_failure(position: &str) -> Failure {
    Failure::new(
        ErrorCode::NoValueAtEval,
        format!("no-value cannot be evaluated ({})", position),
    )
}

// =============================================================================
// Built-in JSON host
// =============================================================================

/// A registry-backed host that reifies programs as tagged JSON objects and
/// enforces the registry's declared argument contracts.
#[derive(Clone)]
pub struct JsonHost {
    registry: Arc<TypeRegistry>,
}

impl JsonHost {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl Host for JsonHost {
    type Type = JsonTypeHandle;

    fn resolve(&self, fqn: &str) -> Result<JsonTypeHandle, Failure> {
        // Member-by-member walk: every dotted prefix must lead towards a
        // declared type, and the full path must name one.
        let segments: Vec<&str> = fqn.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(resolution_failure(fqn, "malformed fqn"));
        }
        for depth in 1..=segments.len() {
            let prefix = segments[..depth].join(".");
            let is_final = depth == segments.len();
            if is_final {
                if !self.registry.declares(&prefix) {
                    return Err(resolution_failure(fqn, "no such member"));
                }
            } else {
                // Intermediate segments are namespaces: some declared FQN
                // must extend this prefix.
                let extends_prefix = |candidate: &str| {
                    candidate.starts_with(&prefix)
                        && candidate.as_bytes().get(prefix.len()) == Some(&b'.')
                };
                let known = self.registry.classes.iter().map(|c| c.fqn.as_str())
                    .chain(self.registry.structs.iter().map(|s| s.fqn.as_str()))
                    .chain(self.registry.enums.iter().map(|e| e.fqn.as_str()))
                    .chain(self.registry.interfaces.iter().map(|i| i.fqn.as_str()))
                    .any(extends_prefix);
                if !known {
                    return Err(resolution_failure(fqn, "no such module"));
                }
            }
        }
        Ok(JsonTypeHandle {
            registry: self.registry.clone(),
            fqn: fqn.to_string(),
        })
    }

    fn scope_root(&self) -> JsonValue {
        json!({ "$scope": "root" })
    }
}

fn resolution_failure(fqn: &str, detail: &str) -> Failure {
    Failure::with_context(
        ErrorCode::FqnResolutionFailed,
        format!("cannot resolve {}: {}", fqn, detail),
        FailureContext {
            fqn: Some(fqn.to_string()),
            ..Default::default()
        },
    )
}

/// Handle to one declared type of the [`JsonHost`].
#[derive(Clone, Debug)]
pub struct JsonTypeHandle {
    registry: Arc<TypeRegistry>,
    fqn: String,
}

impl JsonTypeHandle {
    fn check_arguments(
        &self,
        declared: &[crate::typereg::ParamDef],
        args: &[JsonValue],
        what: &str,
    ) -> Result<(), Failure> {
        if args.len() > declared.len() {
            return Err(Failure::new(
                ErrorCode::EvaluationFailed,
                format!(
                    "{} takes at most {} arguments, got {}",
                    what,
                    declared.len(),
                    args.len()
                ),
            ));
        }
        for (index, param) in declared.iter().enumerate() {
            let absent = matches!(args.get(index), None | Some(JsonValue::Null));
            if absent && !param.optional {
                return Err(Failure::new(
                    ErrorCode::EvaluationFailed,
                    format!("{} is missing required argument `{}`", what, param.name),
                ));
            }
        }
        Ok(())
    }
}

impl HostType for JsonTypeHandle {
    fn construct(&self, args: Vec<JsonValue>) -> Result<JsonValue, Failure> {
        let class = self.registry.class(&self.fqn).ok_or_else(|| {
            Failure::new(
                ErrorCode::EvaluationFailed,
                format!("{} is not constructible", self.fqn),
            )
        })?;
        let ctor = class.constructor.as_ref().ok_or_else(|| {
            Failure::new(
                ErrorCode::EvaluationFailed,
                format!("{} has no constructor", self.fqn),
            )
        })?;
        self.check_arguments(&ctor.parameters, &args, &format!("new {}", self.fqn))?;
        Ok(json!({ "$type": self.fqn, "arguments": args }))
    }

    fn call_static(&self, method: &str, args: Vec<JsonValue>) -> Result<JsonValue, Failure> {
        let class = self.registry.class(&self.fqn).ok_or_else(|| {
            Failure::new(
                ErrorCode::EvaluationFailed,
                format!("{} has no static members", self.fqn),
            )
        })?;
        let declared = class
            .static_methods
            .iter()
            .find(|m| m.name == method)
            .ok_or_else(|| {
                Failure::new(
                    ErrorCode::EvaluationFailed,
                    format!("{} has no static method {}", self.fqn, method),
                )
            })?;
        self.check_arguments(
            &declared.parameters,
            &args,
            &format!("{}.{}", self.fqn, method),
        )?;
        Ok(json!({ "$call": format!("{}.{}", self.fqn, method), "arguments": args }))
    }

    fn get_static(&self, property: &str) -> Result<JsonValue, Failure> {
        if let Some(enum_def) = self.registry.enum_def(&self.fqn) {
            if enum_def.members.iter().any(|m| m == property) {
                return Ok(json!({ "$enum": format!("{}.{}", self.fqn, property) }));
            }
            return Err(Failure::new(
                ErrorCode::EvaluationFailed,
                format!("{} has no member {}", self.fqn, property),
            ));
        }
        if let Some(class) = self.registry.class(&self.fqn) {
            if class.static_properties.iter().any(|p| p.name == property) {
                return Ok(json!({ "$get": format!("{}.{}", self.fqn, property) }));
            }
        }
        Err(Failure::new(
            ErrorCode::EvaluationFailed,
            format!("{} has no static property {}", self.fqn, property),
        ))
    }
}
