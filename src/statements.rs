//! Statement discretization: nested expressions to a flat program.
//!
//! [`discretize`] converts one nested [`Value`] into a sequence of
//! statements: every *nested* class instantiation or static method call is
//! extracted to a named binding (emitted as an [`Statement::Assignment`]
//! before its use site) and replaced by a [`Value::Variable`] reference;
//! the top-level expression stays inline. Extraction is depth-first, so
//! assignments always precede the statements that reference them.

use crate::value::{lcfirst, simple_name, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One statement of the discretized program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `let name = value` — binds an extracted sub-expression.
    Assignment { name: String, value: Value },
    /// A bare expression; the last one yields the program's artifact.
    Expression { value: Value },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment { name, value } => write!(f, "let {} = {}", name, value),
            Statement::Expression { value } => write!(f, "{}", value),
        }
    }
}

/// Render a program as deterministic pseudo-source, one statement per line.
pub fn render(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| format!("{};", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a value into assignment/expression statements.
pub fn discretize(value: &Value) -> Vec<Statement> {
    let mut discretizer = Discretizer::default();
    let terminal = discretizer.extract(value, true);
    let mut statements = discretizer.statements;

    // Tail optimization: a terminal variable reference collapses its
    // defining assignment back into the trailing expression.
    if let Value::Variable { name } = &terminal {
        if let Some(Statement::Assignment {
            name: assigned, ..
        }) = statements.last()
        {
            if assigned == name {
                let Some(Statement::Assignment { value, .. }) = statements.pop() else {
                    unreachable!("just matched an assignment");
                };
                statements.push(Statement::Expression { value });
                return statements;
            }
        }
    }
    statements.push(Statement::Expression { value: terminal });
    statements
}

#[derive(Default)]
struct Discretizer {
    statements: Vec<Statement>,
    counters: BTreeMap<String, usize>,
}

impl Discretizer {
    /// Rebuild `value` bottom-up, extracting nested calls to bindings.
    fn extract(&mut self, value: &Value, top_level: bool) -> Value {
        match value {
            Value::ClassInstantiation {
                fqn,
                parameter_names,
                arguments,
                dist_ptr,
            } => {
                let rebuilt = Value::ClassInstantiation {
                    fqn: fqn.clone(),
                    parameter_names: parameter_names.clone(),
                    arguments: self.extract_all(arguments),
                    dist_ptr: dist_ptr.clone(),
                };
                self.bind_unless_top(rebuilt, fqn, top_level)
            }
            Value::StaticMethodCall {
                fqn,
                static_method,
                target_fqn,
                parameter_names,
                arguments,
                dist_ptr,
            } => {
                let rebuilt = Value::StaticMethodCall {
                    fqn: fqn.clone(),
                    static_method: static_method.clone(),
                    target_fqn: target_fqn.clone(),
                    parameter_names: parameter_names.clone(),
                    arguments: self.extract_all(arguments),
                    dist_ptr: dist_ptr.clone(),
                };
                self.bind_unless_top(rebuilt, fqn, top_level)
            }
            Value::StructLiteral {
                fqn,
                entries,
                dist_ptr,
            } => Value::StructLiteral {
                fqn: fqn.clone(),
                entries: self.extract_entries(entries),
                dist_ptr: dist_ptr.clone(),
            },
            Value::MapLiteral { entries, dist_ptr } => Value::MapLiteral {
                entries: self.extract_entries(entries),
                dist_ptr: dist_ptr.clone(),
            },
            Value::ArrayValue { elements, dist_ptr } => Value::ArrayValue {
                elements: self.extract_all(elements),
                dist_ptr: dist_ptr.clone(),
            },
            leaf => leaf.clone(),
        }
    }

    fn extract_all(&mut self, values: &[Value]) -> Vec<Value> {
        values.iter().map(|v| self.extract(v, false)).collect()
    }

    fn extract_entries(&mut self, entries: &[(String, Value)]) -> Vec<(String, Value)> {
        entries
            .iter()
            .map(|(name, v)| (name.clone(), self.extract(v, false)))
            .collect()
    }

    fn bind_unless_top(&mut self, rebuilt: Value, fqn: &str, top_level: bool) -> Value {
        if top_level {
            return rebuilt;
        }
        let base = lcfirst(simple_name(fqn));
        let counter = self.counters.entry(base.clone()).or_insert(0);
        *counter += 1;
        let name = format!("{}{}", base, counter);
        self.statements.push(Statement::Assignment {
            name: name.clone(),
            value: rebuilt,
        });
        Value::Variable { name }
    }
}
