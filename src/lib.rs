//! Program-Space Exploration Engine
//!
//! Tools for exploring the constructor space of strongly-typed class
//! libraries described by a normalized type registry:
//!
//! - **Distribution extraction**: derive the universe of value sources for
//!   every FQN from the registry
//! - **Minimal generation**: the smallest syntactically valid expression
//!   producing a value of a target type
//! - **Mutation**: reservoir-sampled single-point edits over an immutable
//!   zipper
//! - **Evaluation**: discretize expressions into statements and reify them
//!   against a host library
//!
//! The CLI in `main.rs` wires these together; embedders use the library
//! surface re-exported below.

#![allow(clippy::result_large_err)]

pub mod args;
pub mod bias;
pub mod custom;
pub mod errors;
pub mod eval;
pub mod explore;
pub mod extract;
pub mod generate;
pub mod model;
pub mod mutate;
pub mod random;
pub mod statements;
pub mod typereg;
pub mod value;
pub mod zipper;

pub use bias::{Biaser, BiaserSet};
pub use custom::{CustomDistribution, CustomRegistry};
pub use errors::{ErrorCode, Failure, Phase};
pub use eval::{Evaluator, Host, HostType, JsonHost};
pub use explore::{explore, ExploreOptions, ExploreReport};
pub use extract::extract_distributions;
pub use generate::{Generator, GeneratorOptions};
pub use model::{DistributionModel, FqnSource, ValueSource};
pub use mutate::{Mutator, MutatorOptions, Proposer};
pub use random::Rng;
pub use statements::{discretize, Statement};
pub use typereg::TypeRegistry;
pub use value::{DistPtr, DistRef, PrimitiveValue, Value};
