//! Distribution model: the universe of expressions that can produce each
//! type.
//!
//! Two tables back the model:
//!
//! - `fqn_sources` maps every FQN to the [`FqnSource`]s that can produce a
//!   value of it (constructors, static factories, static properties,
//!   value-object literals). A class contributes a source for itself *and*
//!   every supertype and interface it satisfies.
//! - `distributions` is a content-addressed table of [`ValueSource`] lists;
//!   the id of a distribution is a truncated SHA-256 of its canonical JSON
//!   form, so equal distributions collapse to one id and persisted models
//!   stay diff-friendly.
//!
//! An [`ValueSource::FqnRef`] is lazily resolved: [`DistributionModel::resolve`]
//! splats the referenced FQN's sources in place, producing the ordered list
//! whose indices become [`DistPtr::source_index`](crate::value::DistPtr).

use crate::errors::{ErrorCode, Failure, FailureContext};
use crate::value::{DistRef, Value};
use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Hex chars kept from the SHA-256 of a distribution's canonical JSON.
/// A collision at this width is a fatal programming error (E101).
const DIST_ID_WIDTH: usize = 12;

/// One alternative inside a value distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSource {
    /// Produce any source registered for `fqn` (resolved by splatting).
    FqnRef { fqn: String },
    /// Produce a primitive of the named family.
    Primitive { name: String },
    /// Produce the explicit-absence marker (optional positions).
    NoValue,
    /// Produce an array whose elements draw from `element`.
    Array { element: DistRef },
    /// Produce a string-keyed map whose values draw from `value`.
    Map { value: DistRef },
    /// Produce a fixed value.
    Constant { value: Value },
    /// Delegate to a named custom distribution plug-in.
    Custom { name: String },
}

/// A named parameter backed by a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSource {
    pub name: String,
    pub dist: DistRef,
}

/// A struct field backed by a distribution, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSource {
    pub name: String,
    pub dist: DistRef,
}

/// One way to obtain a value of a specific FQN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FqnSource {
    ClassInstantiation {
        fqn: String,
        parameters: Vec<ParameterSource>,
    },
    StaticMethodCall {
        fqn: String,
        static_method: String,
        target_fqn: String,
        parameters: Vec<ParameterSource>,
    },
    StaticPropertyAccess {
        fqn: String,
        static_property: String,
        target_fqn: String,
    },
    ValueObject {
        fqn: String,
        fields: Vec<FieldSource>,
    },
}

impl FqnSource {
    /// The FQN this source is declared on.
    pub fn fqn(&self) -> &str {
        match self {
            FqnSource::ClassInstantiation { fqn, .. }
            | FqnSource::StaticMethodCall { fqn, .. }
            | FqnSource::StaticPropertyAccess { fqn, .. }
            | FqnSource::ValueObject { fqn, .. } => fqn,
        }
    }
}

/// A fully resolved alternative: `FqnRef`s are gone, replaced by the
/// sources they referenced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSource {
    Fqn(FqnSource),
    Primitive(String),
    NoValue,
    Array(DistRef),
    Map(DistRef),
    Constant(Value),
    Custom(String),
}

/// Counts over a model, for `inspect` and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStats {
    pub fqns: usize,
    pub distributions: usize,
    pub class_sources: usize,
    pub static_method_sources: usize,
    pub static_property_sources: usize,
    pub value_object_sources: usize,
}

impl fmt::Display for ModelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fqns, {} distributions ({} constructors, {} static methods, {} static properties, {} value objects)",
            self.fqns,
            self.distributions,
            self.class_sources,
            self.static_method_sources,
            self.static_property_sources,
            self.value_object_sources
        )
    }
}

/// Content-addressed registry of value distributions plus the FQN source
/// map. Read-only during generation and mutation; extended only by the
/// extractor and by the generator's anonymous root distributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionModel {
    #[serde(rename = "fqnSources")]
    pub fqn_sources: BTreeMap<String, Vec<FqnSource>>,
    pub distributions: BTreeMap<String, Vec<ValueSource>>,
}

impl DistributionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content id for a source list: truncated SHA-256 of canonical JSON.
    pub fn dist_id(sources: &[ValueSource]) -> String {
        let json =
            serde_json::to_string(sources).expect("value source serialization is infallible");
        let mut hasher = sha2::Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())[..DIST_ID_WIDTH].to_string()
    }

    /// Record a distribution, returning its handle. Idempotent: recording
    /// an equal distribution returns the existing handle. An unequal
    /// distribution under the same id means the hash width is too small
    /// and is a fatal programming error.
    pub fn record_distribution(&mut self, sources: Vec<ValueSource>) -> Result<DistRef, Failure> {
        let id = Self::dist_id(&sources);
        if let Some(existing) = self.distributions.get(&id) {
            if *existing != sources {
                return Err(Failure::with_context(
                    ErrorCode::HashCollision,
                    format!(
                        "distribution id {} already maps to a different source list; \
                         increase the hash width",
                        id
                    ),
                    FailureContext {
                        dist_id: Some(id),
                        ..Default::default()
                    },
                ));
            }
        } else {
            self.distributions.insert(id.clone(), sources);
        }
        Ok(DistRef(id))
    }

    /// Raw (unresolved) sources of a distribution.
    pub fn lookup_dist(&self, dist: &DistRef) -> Result<&[ValueSource], Failure> {
        self.distributions
            .get(dist.id())
            .map(|v| v.as_slice())
            .ok_or_else(|| {
                Failure::with_context(
                    ErrorCode::ModelNotFound,
                    format!("distribution {} not present in the model", dist),
                    FailureContext {
                        dist_id: Some(dist.id().to_string()),
                        ..Default::default()
                    },
                )
            })
    }

    /// All registered ways to produce a value of `fqn`.
    pub fn lookup_fqn(&self, fqn: &str) -> Option<&[FqnSource]> {
        self.fqn_sources.get(fqn).map(|v| v.as_slice())
    }

    /// Register another way to produce `fqn`.
    pub fn add_fqn_source(&mut self, fqn: &str, source: FqnSource) {
        self.fqn_sources
            .entry(fqn.to_string())
            .or_default()
            .push(source);
    }

    /// Resolve a distribution into its ordered alternative list, splatting
    /// every `FqnRef` into the sources registered for that FQN. Indices
    /// into the returned list are what `DistPtr::source_index` records.
    ///
    /// An `FqnRef` to an FQN with no sources is skipped with a diagnostic;
    /// the skip only becomes an error when the whole resolution comes out
    /// empty.
    pub fn resolve(&self, dist: &DistRef) -> Result<Vec<ResolvedSource>, Failure> {
        let sources = self.lookup_dist(dist)?;
        let mut resolved = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for source in sources {
            match source {
                ValueSource::FqnRef { fqn } => match self.lookup_fqn(fqn) {
                    Some(list) => {
                        resolved.extend(list.iter().cloned().map(ResolvedSource::Fqn));
                    }
                    None => {
                        warn!(fqn = fqn.as_str(), dist = dist.id(), "fqn ref has no sources");
                        missing.push(fqn.clone());
                    }
                },
                ValueSource::Primitive { name } => {
                    resolved.push(ResolvedSource::Primitive(name.clone()))
                }
                ValueSource::NoValue => resolved.push(ResolvedSource::NoValue),
                ValueSource::Array { element } => {
                    resolved.push(ResolvedSource::Array(element.clone()))
                }
                ValueSource::Map { value } => resolved.push(ResolvedSource::Map(value.clone())),
                ValueSource::Constant { value } => {
                    resolved.push(ResolvedSource::Constant(value.clone()))
                }
                ValueSource::Custom { name } => {
                    resolved.push(ResolvedSource::Custom(name.clone()))
                }
            }
        }
        if resolved.is_empty() {
            let detail = if missing.is_empty() {
                String::new()
            } else {
                format!(" (unresolvable fqns: {})", missing.join(", "))
            };
            return Err(Failure::with_context(
                ErrorCode::NoSourcesInDistribution,
                format!("no values in distribution {}{}", dist, detail),
                FailureContext {
                    dist_id: Some(dist.id().to_string()),
                    ..Default::default()
                },
            ));
        }
        Ok(resolved)
    }

    pub fn stats(&self) -> ModelStats {
        let mut class_sources = 0;
        let mut static_method_sources = 0;
        let mut static_property_sources = 0;
        let mut value_object_sources = 0;
        for source in self.fqn_sources.values().flatten() {
            match source {
                FqnSource::ClassInstantiation { .. } => class_sources += 1,
                FqnSource::StaticMethodCall { .. } => static_method_sources += 1,
                FqnSource::StaticPropertyAccess { .. } => static_property_sources += 1,
                FqnSource::ValueObject { .. } => value_object_sources += 1,
            }
        }
        ModelStats {
            fqns: self.fqn_sources.len(),
            distributions: self.distributions.len(),
            class_sources,
            static_method_sources,
            static_property_sources,
            value_object_sources,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("model serialization is infallible")
    }

    pub fn from_json(raw: &str) -> AnyResult<Self> {
        serde_json::from_str(raw).context("parsing distribution model JSON")
    }

    pub fn save(&self, path: &Path) -> AnyResult<()> {
        std::fs::write(path, self.to_json())
            .with_context(|| format!("writing model {}", path.display()))
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading model {}", path.display()))?;
        Self::from_json(&raw)
    }
}
