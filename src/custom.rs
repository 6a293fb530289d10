//! Custom distribution plug-ins.
//!
//! A custom distribution produces values the generic extraction rules
//! cannot derive: opaque host roots, correlated identifiers that must be
//! fresh per sibling. Plug-ins are registered by string name and referenced
//! from distributions via [`ValueSource::Custom`](crate::model::ValueSource).

use crate::errors::{ErrorCode, Failure};
use crate::mutate::Proposer;
use crate::random::Rng;
use crate::value::{DistPtr, PrimitiveValue, Value};
use crate::zipper::Zipper;
use std::collections::BTreeMap;

/// Name of the built-in scope plug-in.
pub const SCOPE: &str = "scope";
/// Name of the built-in construct-id plug-in.
pub const CONSTRUCT_ID: &str = "construct_id";

/// A named value-source plug-in.
pub trait CustomDistribution {
    fn name(&self) -> &str;

    /// Build the minimal value for this source.
    fn minimal_value(
        &self,
        ptr: &DistPtr,
        zipper: &Zipper,
        rng: &mut Rng,
    ) -> Result<Value, Failure>;

    /// Enumerate mutation proposals for a value this plug-in produced.
    fn mutate(&self, value: &Value, zipper: &Zipper, proposer: &mut dyn Proposer);
}

impl std::fmt::Debug for dyn CustomDistribution + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomDistribution")
            .field("name", &self.name())
            .finish()
    }
}

/// Produces the opaque placeholder for the host-provided root object.
/// The root is a fixed point of exploration, so there is nothing to mutate.
pub struct ScopeDistribution;

impl CustomDistribution for ScopeDistribution {
    fn name(&self) -> &str {
        SCOPE
    }

    fn minimal_value(
        &self,
        ptr: &DistPtr,
        _zipper: &Zipper,
        _rng: &mut Rng,
    ) -> Result<Value, Failure> {
        Ok(Value::Scope {
            dist_ptr: ptr.clone(),
        })
    }

    fn mutate(&self, _value: &Value, _zipper: &Zipper, _proposer: &mut dyn Proposer) {}
}

/// Produces construct identifiers. Identifiers must be fresh per sibling,
/// so both the minimal value and every mutation proposal draw a new one.
pub struct ConstructIdDistribution;

impl ConstructIdDistribution {
    fn fresh_id(rng: &mut Rng) -> String {
        format!("id{}", rng.range_inclusive(1, 99999))
    }
}

impl CustomDistribution for ConstructIdDistribution {
    fn name(&self) -> &str {
        CONSTRUCT_ID
    }

    fn minimal_value(
        &self,
        ptr: &DistPtr,
        _zipper: &Zipper,
        rng: &mut Rng,
    ) -> Result<Value, Failure> {
        Ok(Value::Primitive {
            value: PrimitiveValue::String(Self::fresh_id(rng)),
            dist_ptr: ptr.clone(),
        })
    }

    fn mutate(&self, value: &Value, zipper: &Zipper, proposer: &mut dyn Proposer) {
        let Some(ptr) = value.dist_ptr().cloned() else {
            return;
        };
        let replacement = Value::Primitive {
            value: PrimitiveValue::String(Self::fresh_id(proposer.rng())),
            dist_ptr: ptr,
        };
        proposer.propose(zipper.set(replacement));
    }
}

/// String-keyed registry of custom distribution plug-ins.
pub struct CustomRegistry {
    plugins: BTreeMap<String, Box<dyn CustomDistribution>>,
}

impl CustomRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `scope` and `construct_id` plug-ins.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ScopeDistribution));
        registry.register(Box::new(ConstructIdDistribution));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn CustomDistribution>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn get(&self, name: &str) -> Result<&dyn CustomDistribution, Failure> {
        self.plugins
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| {
                Failure::new(
                    ErrorCode::UnknownCustomDistribution,
                    format!("no plug-in registered under name {:?}", name),
                )
            })
    }
}

impl Default for CustomRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
