//! Biasing policies applied while the extractor builds FQN sources.
//!
//! A biaser gets the chance to rewrite the parameter distributions of each
//! freshly built [`FqnSource`] using position context: which parameter it
//! is, what it is named, what its distribution references. The stock
//! policies recognize the "scope + id" constructor shape of composable
//! resource libraries and semantic hints in parameter names.

use crate::custom;
use crate::errors::Failure;
use crate::model::{DistributionModel, FqnSource, ParameterSource, ValueSource};
use crate::value::{DistPtr, DistRef, PrimitiveValue, Value};
use tracing::debug;

/// A policy hook rewriting sources given position context. Pure apart from
/// recording new distributions in the registry.
pub trait Biaser {
    fn bias(
        &self,
        source: FqnSource,
        model: &mut DistributionModel,
    ) -> Result<FqnSource, Failure>;
}

/// Ordered set of biasers, applied first to last.
pub struct BiaserSet {
    biasers: Vec<Box<dyn Biaser>>,
}

impl BiaserSet {
    pub fn empty() -> Self {
        Self { biasers: Vec::new() }
    }

    /// The stock policies: scope/id recognition, then arn constants.
    pub fn with_defaults(root_fqns: Vec<String>) -> Self {
        Self {
            biasers: vec![
                Box::new(ScopeIdBiaser::new(root_fqns)),
                Box::new(ArnBiaser),
            ],
        }
    }

    pub fn push(&mut self, biaser: Box<dyn Biaser>) {
        self.biasers.push(biaser);
    }

    pub fn apply(
        &self,
        mut source: FqnSource,
        model: &mut DistributionModel,
    ) -> Result<FqnSource, Failure> {
        for biaser in &self.biasers {
            source = biaser.bias(source, model)?;
        }
        Ok(source)
    }
}

impl Default for BiaserSet {
    fn default() -> Self {
        Self::with_defaults(Vec::new())
    }
}

fn parameters_mut(source: &mut FqnSource) -> Option<&mut Vec<ParameterSource>> {
    match source {
        FqnSource::ClassInstantiation { parameters, .. }
        | FqnSource::StaticMethodCall { parameters, .. } => Some(parameters),
        _ => None,
    }
}

/// Recognizes the "scope + id" constructor shape: a first parameter named
/// `scope` (or typed by a configured root interface) becomes the host-root
/// custom source, and the parameter following it becomes a fresh construct
/// id.
pub struct ScopeIdBiaser {
    root_fqns: Vec<String>,
}

impl ScopeIdBiaser {
    pub fn new(root_fqns: Vec<String>) -> Self {
        Self { root_fqns }
    }

    fn is_scope_param(&self, param: &ParameterSource, model: &DistributionModel) -> bool {
        if param.name == "scope" {
            return true;
        }
        if self.root_fqns.is_empty() {
            return false;
        }
        model
            .lookup_dist(&param.dist)
            .map(|sources| {
                sources.iter().any(|s| {
                    matches!(s, ValueSource::FqnRef { fqn } if self.root_fqns.contains(fqn))
                })
            })
            .unwrap_or(false)
    }
}

impl Biaser for ScopeIdBiaser {
    fn bias(
        &self,
        mut source: FqnSource,
        model: &mut DistributionModel,
    ) -> Result<FqnSource, Failure> {
        let fqn = source.fqn().to_string();
        if let Some(parameters) = parameters_mut(&mut source) {
            let first_is_scope = parameters
                .first()
                .map(|p| self.is_scope_param(p, model))
                .unwrap_or(false);
            if first_is_scope {
                debug!(fqn = fqn.as_str(), "biasing scope/id constructor shape");
                let scope_dist = model.record_distribution(vec![ValueSource::Custom {
                    name: custom::SCOPE.to_string(),
                }])?;
                parameters[0].dist = scope_dist;
                if let Some(second) = parameters.get_mut(1) {
                    let id_dist = model.record_distribution(vec![ValueSource::Custom {
                        name: custom::CONSTRUCT_ID.to_string(),
                    }])?;
                    second.dist = id_dist;
                }
            }
        }
        Ok(source)
    }
}

/// Parameters whose name mentions `arn` receive a plausible constant
/// resource name instead of a free-form string.
pub struct ArnBiaser;

/// The constant handed to arn-named parameters.
pub const ARN_SAMPLE: &str = "arn:partition:service:region:000000000000:resource";

impl Biaser for ArnBiaser {
    fn bias(
        &self,
        mut source: FqnSource,
        model: &mut DistributionModel,
    ) -> Result<FqnSource, Failure> {
        if let Some(parameters) = parameters_mut(&mut source) {
            for param in parameters.iter_mut() {
                if !param.name.to_ascii_lowercase().contains("arn") {
                    continue;
                }
                let constant = Value::Primitive {
                    value: PrimitiveValue::String(ARN_SAMPLE.to_string()),
                    dist_ptr: DistPtr::new(DistRef("constant".to_string()), 0),
                };
                param.dist =
                    model.record_distribution(vec![ValueSource::Constant { value: constant }])?;
            }
        }
        Ok(source)
    }
}
