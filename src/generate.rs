//! Minimal value generation.
//!
//! [`Generator::minimal`] produces the smallest syntactically valid value
//! of a target FQN: the first resolved alternative that can be completed,
//! with optional arguments absent, single-element arrays, and empty maps.
//!
//! Recursion through the (cyclic) type graph is broken per traversal with
//! a set of [`DistPtr`]s currently on the construction stack: an
//! alternative already being attempted higher up is skipped, and the skip
//! only surfaces as `NoOptionsLeft` when every alternative of a
//! distribution recurses or fails. Distributions are content-addressed, so
//! a cycle always shows up as a repeated (distribution, index) pair.

use crate::custom::CustomRegistry;
use crate::errors::{ErrorCode, Failure, FailureContext};
use crate::model::{DistributionModel, FqnSource, ParameterSource, ResolvedSource, ValueSource};
use crate::random::Rng;
use crate::value::{DistPtr, DistRef, PrimitiveValue, Value};
use crate::zipper::{Locator, Zipper};
use std::collections::HashSet;
use tracing::debug;

/// Knobs for minimal generation.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    /// Hard ceiling on construction depth, a backstop behind the
    /// recursion-breaker set.
    pub max_depth: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Produces minimal values of registered FQNs.
pub struct Generator<'a> {
    model: &'a mut DistributionModel,
    customs: &'a CustomRegistry,
    rng: &'a mut Rng,
    options: GeneratorOptions,
}

impl<'a> Generator<'a> {
    pub fn new(
        model: &'a mut DistributionModel,
        customs: &'a CustomRegistry,
        rng: &'a mut Rng,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            model,
            customs,
            rng,
            options,
        }
    }

    /// Produce the minimal value of `fqn`.
    ///
    /// Records an anonymous single-ref distribution for the target so the
    /// returned root carries a resolvable [`DistPtr`] like every other
    /// node (the mutator relies on it to switch the root between
    /// alternatives).
    pub fn minimal(&mut self, fqn: &str) -> Result<Value, Failure> {
        if self.model.lookup_fqn(fqn).is_none() {
            return Err(Failure::with_context(
                ErrorCode::ModelNotFound,
                format!("fqn {} has no sources in the model", fqn),
                FailureContext {
                    fqn: Some(fqn.to_string()),
                    ..Default::default()
                },
            ));
        }
        let dist = self
            .model
            .record_distribution(vec![ValueSource::FqnRef {
                fqn: fqn.to_string(),
            }])?;
        debug!(fqn, dist = dist.id(), "generating minimal value");
        let mut walk = MinimalWalk::new(self.model, self.customs, self.rng, self.options);
        walk.minimal_value(&dist, &Zipper::empty())
    }
}

/// One minimal-construction traversal. The recursion-breaker set is scoped
/// to a single walk and must not persist across top-level calls.
pub(crate) struct MinimalWalk<'a> {
    model: &'a DistributionModel,
    customs: &'a CustomRegistry,
    rng: &'a mut Rng,
    breaker: HashSet<DistPtr>,
    max_depth: usize,
}

impl<'a> MinimalWalk<'a> {
    pub(crate) fn new(
        model: &'a DistributionModel,
        customs: &'a CustomRegistry,
        rng: &'a mut Rng,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            model,
            customs,
            rng,
            breaker: HashSet::new(),
            max_depth: options.max_depth,
        }
    }

    /// Minimal value for a distribution: the first alternative, in resolved
    /// order, that completes without recursing into itself.
    pub(crate) fn minimal_value(
        &mut self,
        dist: &DistRef,
        zipper: &Zipper,
    ) -> Result<Value, Failure> {
        if zipper.depth() > self.max_depth {
            return Err(Failure::new(
                ErrorCode::DepthExceeded,
                format!("construction deeper than {} levels", self.max_depth),
            ));
        }
        let resolved = self.model.resolve(dist)?;
        let mut last_failure: Option<Failure> = None;
        for (index, source) in resolved.iter().enumerate() {
            let ptr = DistPtr::new(dist.clone(), index);
            if self.breaker.contains(&ptr) {
                continue;
            }
            self.breaker.insert(ptr.clone());
            let attempt = self.minimal_from_source(source, ptr.clone(), zipper);
            self.breaker.remove(&ptr);
            match attempt {
                Ok(value) => return Ok(value),
                Err(failure) => last_failure = Some(failure),
            }
        }
        let mut failure = Failure::with_context(
            ErrorCode::NoOptionsLeft,
            format!(
                "all {} alternatives of distribution {} recursed or failed",
                resolved.len(),
                dist
            ),
            FailureContext {
                dist_id: Some(dist.id().to_string()),
                ..Default::default()
            },
        );
        if let Some(last) = last_failure {
            failure.message = format!("{} (last: {})", failure.message, last.message);
        }
        Err(failure)
    }

    /// Build a minimal value from one specific alternative. Used by the
    /// mutator to construct sibling alternatives.
    pub(crate) fn minimal_at_index(
        &mut self,
        dist: &DistRef,
        index: usize,
        zipper: &Zipper,
    ) -> Result<Value, Failure> {
        let resolved = self.model.resolve(dist)?;
        let source = resolved.get(index).ok_or_else(|| {
            Failure::with_context(
                ErrorCode::NoSourcesInDistribution,
                format!("source index {} out of range for distribution {}", index, dist),
                FailureContext {
                    dist_id: Some(dist.id().to_string()),
                    source_index: Some(index),
                    ..Default::default()
                },
            )
        })?;
        let ptr = DistPtr::new(dist.clone(), index);
        self.breaker.insert(ptr.clone());
        let attempt = self.minimal_from_source(source, ptr.clone(), zipper);
        self.breaker.remove(&ptr);
        attempt
    }

    fn minimal_from_source(
        &mut self,
        source: &ResolvedSource,
        ptr: DistPtr,
        zipper: &Zipper,
    ) -> Result<Value, Failure> {
        match source {
            ResolvedSource::Fqn(fqn_source) => self.minimal_from_fqn(fqn_source, ptr, zipper),
            ResolvedSource::Primitive(name) => self.minimal_primitive(name, ptr),
            ResolvedSource::NoValue => Ok(Value::NoValue { dist_ptr: ptr }),
            ResolvedSource::Array(element) => {
                // Many libraries reject empty collections, so the minimal
                // array carries one element.
                let partial = Value::ArrayValue {
                    elements: vec![],
                    dist_ptr: ptr.clone(),
                };
                let z = zipper.descend(&partial, Locator::Element(0));
                let element = self
                    .minimal_value(element, &z)
                    .map_err(|f| f.prepend("while generating array element"))?;
                Ok(Value::ArrayValue {
                    elements: vec![element],
                    dist_ptr: ptr,
                })
            }
            ResolvedSource::Map(_) => Ok(Value::MapLiteral {
                entries: vec![],
                dist_ptr: ptr,
            }),
            ResolvedSource::Constant(value) => Ok(value.with_ptr(ptr)),
            ResolvedSource::Custom(name) => {
                self.customs.get(name)?.minimal_value(&ptr, zipper, self.rng)
            }
        }
    }

    fn minimal_from_fqn(
        &mut self,
        source: &FqnSource,
        ptr: DistPtr,
        zipper: &Zipper,
    ) -> Result<Value, Failure> {
        match source {
            FqnSource::ClassInstantiation { fqn, parameters } => {
                let make = |arguments: Vec<Value>| Value::ClassInstantiation {
                    fqn: fqn.clone(),
                    parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
                    arguments,
                    dist_ptr: ptr.clone(),
                };
                let arguments = self.build_arguments(parameters, fqn, zipper, &make)?;
                Ok(make(arguments))
            }
            FqnSource::StaticMethodCall {
                fqn,
                static_method,
                target_fqn,
                parameters,
            } => {
                let make = |arguments: Vec<Value>| Value::StaticMethodCall {
                    fqn: fqn.clone(),
                    static_method: static_method.clone(),
                    target_fqn: target_fqn.clone(),
                    parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
                    arguments,
                    dist_ptr: ptr.clone(),
                };
                let arguments = self.build_arguments(parameters, fqn, zipper, &make)?;
                Ok(make(arguments))
            }
            FqnSource::StaticPropertyAccess {
                fqn,
                static_property,
                target_fqn,
            } => Ok(Value::StaticPropertyAccess {
                fqn: fqn.clone(),
                static_property: static_property.clone(),
                target_fqn: target_fqn.clone(),
                dist_ptr: ptr,
            }),
            FqnSource::ValueObject { fqn, fields } => {
                let mut entries: Vec<(String, Value)> = Vec::new();
                for field in fields {
                    let partial = Value::StructLiteral {
                        fqn: fqn.clone(),
                        entries: entries.clone(),
                        dist_ptr: ptr.clone(),
                    };
                    let z = zipper.descend(&partial, Locator::Field(field.name.clone()));
                    let value = self.minimal_value(&field.dist, &z).map_err(|f| {
                        f.prepend(format!("while generating field `{}` of {}", field.name, fqn))
                    })?;
                    // A no-value field is simply absent from the literal.
                    if !value.is_no_value() {
                        entries.push((field.name.clone(), value));
                    }
                }
                Ok(Value::StructLiteral {
                    fqn: fqn.clone(),
                    entries,
                    dist_ptr: ptr,
                })
            }
        }
    }

    /// Generate call arguments in order. Once an argument resolves to
    /// no-value, remaining optional arguments become no-value placeholders
    /// (keeping their own pointers); the argument list always matches the
    /// parameter list in length.
    fn build_arguments(
        &mut self,
        parameters: &[ParameterSource],
        fqn: &str,
        zipper: &Zipper,
        make_partial: &dyn Fn(Vec<Value>) -> Value,
    ) -> Result<Vec<Value>, Failure> {
        let mut arguments: Vec<Value> = Vec::new();
        let mut truncated = false;
        for (index, param) in parameters.iter().enumerate() {
            let partial = make_partial(arguments.clone());
            let z = zipper.descend(&partial, Locator::Argument(index));
            if truncated {
                if let Some(placeholder) = self.no_value_placeholder(&param.dist)? {
                    arguments.push(placeholder);
                    continue;
                }
                // A required parameter declared after an optional one still
                // has to be generated.
            }
            let value = self.minimal_value(&param.dist, &z).map_err(|f| {
                f.prepend(format!("while generating argument `{}` of {}", param.name, fqn))
            })?;
            if value.is_no_value() {
                truncated = true;
            }
            arguments.push(value);
        }
        Ok(arguments)
    }

    /// The no-value alternative of a distribution, if it has one.
    fn no_value_placeholder(&self, dist: &DistRef) -> Result<Option<Value>, Failure> {
        let resolved = self.model.resolve(dist)?;
        Ok(resolved
            .iter()
            .position(|s| matches!(s, ResolvedSource::NoValue))
            .map(|index| Value::NoValue {
                dist_ptr: DistPtr::new(dist.clone(), index),
            }))
    }

    fn minimal_primitive(&mut self, name: &str, ptr: DistPtr) -> Result<Value, Failure> {
        let value = match name {
            "string" => PrimitiveValue::String(self.rng.string(1, 10)),
            "number" => PrimitiveValue::Number(self.rng.range_inclusive(1, 10) as f64),
            "boolean" => PrimitiveValue::Boolean(false),
            "date" => PrimitiveValue::epoch(),
            // Free-form payloads start as the empty map.
            "json" | "any" => {
                return Ok(Value::MapLiteral {
                    entries: vec![],
                    dist_ptr: ptr,
                })
            }
            other => {
                return Err(Failure::new(
                    ErrorCode::UnknownTypeRef,
                    format!("unknown primitive family {:?}", other),
                ))
            }
        };
        Ok(Value::Primitive {
            value,
            dist_ptr: ptr,
        })
    }
}
