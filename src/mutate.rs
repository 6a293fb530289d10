//! Single-point mutation of values.
//!
//! [`Mutator::mutate`] enumerates every candidate single-point edit of a
//! value (switching a node to a sibling alternative of its distribution,
//! growing or shrinking collections, nudging primitives) and draws up to
//! `k` of them by reservoir sampling: a counter advances per proposal, and
//! proposal `n` overwrites slot `Uniform(0..n-1)` iff that slot index is
//! below `k`. Proposals are sampled over an on-the-fly enumeration, never a
//! materialized list, keeping memory `O(k)` across deeply nested values.
//!
//! The per-node visit order is: propose sibling switches first, then
//! structurally recurse according to the node's currently-chosen source
//! (known via its [`DistPtr`](crate::value::DistPtr)). A proposal-counter snapshot decides whether
//! a recursion branch produced anything, which implements "recurse into the
//! first argument that proposes at least one edit".

use crate::custom::CustomRegistry;
use crate::errors::{ErrorCode, Failure};
use crate::generate::{GeneratorOptions, MinimalWalk};
use crate::model::{DistributionModel, FqnSource, ParameterSource, ResolvedSource};
use crate::random::Rng;
use crate::value::{PrimitiveValue, Value};
use crate::zipper::{Locator, Zipper};

/// Knobs for one mutation pass.
#[derive(Debug, Clone, Copy)]
pub struct MutatorOptions {
    /// Reservoir size: the maximum number of variants returned.
    pub variants: usize,
}

impl Default for MutatorOptions {
    fn default() -> Self {
        Self { variants: 4 }
    }
}

/// Receives mutation proposals (complete edited roots) during the walk.
/// Custom distribution plug-ins get this to contribute their own edits.
pub trait Proposer {
    /// Number of proposals seen so far.
    fn count(&self) -> usize;
    /// Offer one edited root.
    fn propose(&mut self, root: Value);
    /// The walk's random source (for fresh identifiers and the like).
    fn rng(&mut self) -> &mut Rng;
}

/// Samples up to `k` single-point edits of one value. Single use: the
/// reservoir is consumed by [`Mutator::mutate`].
pub struct Mutator<'a> {
    model: &'a DistributionModel,
    customs: &'a CustomRegistry,
    rng: &'a mut Rng,
    options: MutatorOptions,
    used: bool,
}

impl<'a> Mutator<'a> {
    pub fn new(
        model: &'a DistributionModel,
        customs: &'a CustomRegistry,
        rng: &'a mut Rng,
        options: MutatorOptions,
    ) -> Self {
        Self {
            model,
            customs,
            rng,
            options,
            used: false,
        }
    }

    /// Enumerate candidate edits of `value` and return a uniform sample of
    /// at most `variants` of them.
    pub fn mutate(&mut self, value: &Value) -> Result<Vec<Value>, Failure> {
        if self.used {
            return Err(Failure::new(
                ErrorCode::MutatorReused,
                "mutate was already called on this instance",
            ));
        }
        self.used = true;
        let mut walk = MutationWalk {
            model: self.model,
            customs: self.customs,
            rng: &mut *self.rng,
            store: Store::Reservoir {
                slots: vec![None; self.options.variants],
            },
            proposals: 0,
        };
        walk.mutate_value(value, &Zipper::empty())?;
        Ok(walk.into_variants())
    }
}

enum Store {
    /// Fixed slots, overwrite at a uniform index.
    Reservoir { slots: Vec<Option<Value>> },
    /// Keep everything; used by tests to observe the full enumeration.
    All(Vec<Value>),
}

pub(crate) struct MutationWalk<'a> {
    model: &'a DistributionModel,
    customs: &'a CustomRegistry,
    rng: &'a mut Rng,
    store: Store,
    proposals: usize,
}

impl Proposer for MutationWalk<'_> {
    fn count(&self) -> usize {
        self.proposals
    }

    fn propose(&mut self, root: Value) {
        self.proposals += 1;
        match &mut self.store {
            Store::Reservoir { slots } => {
                let j = self.rng.index(self.proposals);
                if j < slots.len() {
                    slots[j] = Some(root);
                }
            }
            Store::All(all) => all.push(root),
        }
    }

    fn rng(&mut self) -> &mut Rng {
        self.rng
    }
}

impl<'a> MutationWalk<'a> {
    #[cfg(test)]
    pub(crate) fn collecting(
        model: &'a DistributionModel,
        customs: &'a CustomRegistry,
        rng: &'a mut Rng,
    ) -> Self {
        Self {
            model,
            customs,
            rng,
            store: Store::All(Vec::new()),
            proposals: 0,
        }
    }

    pub(crate) fn into_variants(self) -> Vec<Value> {
        match self.store {
            Store::Reservoir { slots } => slots.into_iter().flatten().collect(),
            Store::All(all) => all,
        }
    }

    /// Enumerate proposals for one node, then its children.
    pub(crate) fn mutate_value(&mut self, value: &Value, zipper: &Zipper) -> Result<(), Failure> {
        // Nodes without a pointer (variables) take no part in mutation.
        let Some(ptr) = value.dist_ptr().cloned() else {
            return Ok(());
        };
        let resolved = self.model.resolve(&ptr.dist)?;

        // Switch-alternative proposals: a minimal build of every sibling
        // source. Siblings that recurse or fail are silently skipped.
        for (index, _) in resolved.iter().enumerate() {
            if index == ptr.source_index {
                continue;
            }
            let built = MinimalWalk::new(
                self.model,
                self.customs,
                self.rng,
                GeneratorOptions::default(),
            )
            .minimal_at_index(&ptr.dist, index, zipper);
            if let Ok(sibling) = built {
                self.propose(zipper.set(sibling));
            }
        }

        // Structural recursion, keyed by the currently-chosen source.
        let Some(source) = resolved.get(ptr.source_index) else {
            return Ok(());
        };
        match source {
            ResolvedSource::Array(element) => {
                let element = element.clone();
                self.mutate_array(value, zipper, &element)
            }
            ResolvedSource::Map(values) => {
                let values = values.clone();
                self.mutate_map(value, zipper, &values)
            }
            ResolvedSource::Fqn(FqnSource::ClassInstantiation { parameters, .. })
            | ResolvedSource::Fqn(FqnSource::StaticMethodCall { parameters, .. }) => {
                let parameters = parameters.clone();
                self.mutate_call(value, zipper, &parameters)
            }
            ResolvedSource::Fqn(FqnSource::ValueObject { .. }) => {
                self.mutate_struct(value, zipper)
            }
            ResolvedSource::Primitive(_) => {
                self.mutate_primitive(value, zipper);
                Ok(())
            }
            ResolvedSource::Custom(name) => {
                let plugin = self.customs.get(name)?;
                plugin.mutate(value, zipper, self);
                Ok(())
            }
            // Nothing structural beyond the sibling switches above.
            ResolvedSource::NoValue
            | ResolvedSource::Constant(_)
            | ResolvedSource::Fqn(FqnSource::StaticPropertyAccess { .. }) => Ok(()),
        }
    }

    fn mutate_array(
        &mut self,
        value: &Value,
        zipper: &Zipper,
        element_dist: &crate::value::DistRef,
    ) -> Result<(), Failure> {
        let Value::ArrayValue { elements, .. } = value else {
            return Ok(());
        };
        // Append a minimal element.
        let append_at = zipper.descend(value, Locator::Element(elements.len()));
        let built = MinimalWalk::new(
            self.model,
            self.customs,
            self.rng,
            GeneratorOptions::default(),
        )
        .minimal_value(element_dist, &append_at);
        if let Ok(element) = built {
            self.propose(append_at.set(element));
        }
        if elements.is_empty() {
            return Ok(());
        }
        let index = self.rng.index(elements.len());
        let focus = zipper.descend(value, Locator::Element(index));
        self.propose(focus.delete());
        self.mutate_value(&elements[index], &focus)
    }

    fn mutate_map(
        &mut self,
        value: &Value,
        zipper: &Zipper,
        value_dist: &crate::value::DistRef,
    ) -> Result<(), Failure> {
        let Value::MapLiteral { entries, .. } = value else {
            return Ok(());
        };
        // Set a fresh key to a minimal value.
        let key = self.rng.string(1, 10);
        let set_at = zipper.descend(value, Locator::Key(key));
        let built = MinimalWalk::new(
            self.model,
            self.customs,
            self.rng,
            GeneratorOptions::default(),
        )
        .minimal_value(value_dist, &set_at);
        if let Ok(entry_value) = built {
            self.propose(set_at.set(entry_value));
        }
        if entries.is_empty() {
            return Ok(());
        }
        let index = self.rng.index(entries.len());
        let (picked_key, picked_value) = entries[index].clone();
        let focus = zipper.descend(value, Locator::Key(picked_key));
        self.propose(focus.delete());
        self.mutate_value(&picked_value, &focus)
    }

    fn mutate_call(
        &mut self,
        value: &Value,
        zipper: &Zipper,
        parameters: &[ParameterSource],
    ) -> Result<(), Failure> {
        let (Value::ClassInstantiation { arguments, .. }
        | Value::StaticMethodCall { arguments, .. }) = value
        else {
            return Ok(());
        };
        if arguments.len() < parameters.len() {
            // A previously deleted slot: propose filling it back in.
            let param = &parameters[arguments.len()];
            let append_at = zipper.descend(value, Locator::Argument(arguments.len()));
            let built = MinimalWalk::new(
                self.model,
                self.customs,
                self.rng,
                GeneratorOptions::default(),
            )
            .minimal_value(&param.dist, &append_at);
            if let Ok(argument) = built {
                self.propose(append_at.set(argument));
            }
            return Ok(());
        }
        // Visit arguments in a shuffled order and recurse into the first
        // one that proposes an edit.
        let order = self.rng.shuffled_indices(arguments.len());
        for index in order {
            let before = self.count();
            let focus = zipper.descend(value, Locator::Argument(index));
            self.mutate_value(&arguments[index], &focus)?;
            if self.count() > before {
                break;
            }
        }
        Ok(())
    }

    fn mutate_struct(&mut self, value: &Value, zipper: &Zipper) -> Result<(), Failure> {
        let Value::StructLiteral { entries, .. } = value else {
            return Ok(());
        };
        for (name, entry_value) in entries {
            let focus = zipper.descend(value, Locator::Field(name.clone()));
            self.mutate_value(entry_value, &focus)?;
        }
        Ok(())
    }

    /// Exactly one replacement proposal, drawn from the per-type family.
    fn mutate_primitive(&mut self, value: &Value, zipper: &Zipper) {
        let Value::Primitive {
            value: primitive,
            dist_ptr,
        } = value
        else {
            return;
        };
        let mutated = match primitive {
            PrimitiveValue::Boolean(b) => Some(PrimitiveValue::Boolean(!b)),
            PrimitiveValue::Number(n) => {
                let k = self.rng.range_inclusive(1, 5) as f64;
                let mutated = match self.rng.index(4) {
                    0 => n + k,
                    1 => n - k,
                    2 => n * k,
                    _ => (n / k).round(),
                };
                Some(PrimitiveValue::Number(mutated))
            }
            PrimitiveValue::String(s) => Some(PrimitiveValue::String(self.mutate_string(s))),
            // Dates only move by switching distribution alternatives.
            PrimitiveValue::Date(_) => None,
        };
        if let Some(mutated) = mutated {
            self.propose(zipper.set(Value::Primitive {
                value: mutated,
                dist_ptr: dist_ptr.clone(),
            }));
        }
    }

    fn mutate_string(&mut self, s: &str) -> String {
        let chars: Vec<char> = s.chars().collect();
        // An empty string has nothing to slice.
        let ops = if chars.is_empty() { 2 } else { 3 };
        match self.rng.index(ops) {
            0 => format!("{}{}", s, self.rng.string(1, 4)),
            1 => format!("{}{}", self.rng.string(1, 4), s),
            _ => {
                let start = self.rng.index(chars.len());
                let end = start + 1 + self.rng.index(chars.len() - start);
                chars[..start].iter().chain(chars[end..].iter()).collect()
            }
        }
    }
}
