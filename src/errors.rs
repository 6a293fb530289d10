//! Error codes and diagnostic messages for the exploration pipeline.
//!
//! # Error Taxonomy
//!
//! The pipeline uses a phase-based error taxonomy:
//!
//! | Phase | Purpose | Error Codes |
//! |-------|---------|-------------|
//! | Extraction | Registry -> distribution model | E101-E102 |
//! | Resolution | Distribution / FQN lookup | E201-E202 |
//! | Generation | Minimal value construction | E301-E303 |
//! | Mutation | Candidate-edit enumeration | E401 |
//! | Evaluation | Host-library execution | E501-E505 |
//!
//! Each error carries the phase it occurred in, a specific code, a
//! human-readable message, and optional structured context (which FQN,
//! which distribution, which parameter).
//!
//! Expected conditions during generation (a candidate recursing into
//! itself, an alternative failing) are handled by trying the next
//! alternative and never surface as errors on their own; they degrade to
//! `NoOptionsLeft` only when every alternative is exhausted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the exploration pipeline.
///
/// The pipeline processes in order: Extraction -> Resolution -> Generation
/// -> Mutation -> Evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 1: Building the distribution model from a type registry
    Extraction,
    /// Phase 2: Distribution and FQN-source resolution
    Resolution,
    /// Phase 3: Minimal value construction
    Generation,
    /// Phase 4: Mutation enumeration and sampling
    Mutation,
    /// Phase 5: Statement evaluation against the host library
    Evaluation,
}

impl Phase {
    /// Get the numeric prefix for this phase (1xx, 2xx, etc.)
    pub fn code_prefix(&self) -> u16 {
        match self {
            Phase::Extraction => 100,
            Phase::Resolution => 200,
            Phase::Generation => 300,
            Phase::Mutation => 400,
            Phase::Evaluation => 500,
        }
    }

    /// Get a short name for this phase
    pub fn short_name(&self) -> &'static str {
        match self {
            Phase::Extraction => "extraction",
            Phase::Resolution => "resolution",
            Phase::Generation => "generation",
            Phase::Mutation => "mutation",
            Phase::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Specific error codes within each phase.
///
/// Error codes are numbered by phase:
/// - 1xx: Extraction errors
/// - 2xx: Resolution errors
/// - 3xx: Generation errors
/// - 4xx: Mutation errors
/// - 5xx: Evaluation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // =========================================================================
    // Extraction Errors (1xx)
    // =========================================================================
    /// E101: Two unequal distributions hashed to the same id.
    /// Programming error: the hash width is too small.
    #[serde(rename = "E101")]
    HashCollision,

    /// E102: A type reference names an FQN the registry does not declare
    #[serde(rename = "E102")]
    UnknownTypeRef,

    // =========================================================================
    // Resolution Errors (2xx)
    // =========================================================================
    /// E201: FQN has no entry in the model's source map
    #[serde(rename = "E201")]
    ModelNotFound,

    /// E202: A distribution resolved to zero value sources
    #[serde(rename = "E202")]
    NoSourcesInDistribution,

    // =========================================================================
    // Generation Errors (3xx)
    // =========================================================================
    /// E301: A source names a custom distribution with no registered plug-in
    #[serde(rename = "E301")]
    UnknownCustomDistribution,

    /// E302: Every alternative in a distribution recursed or failed
    #[serde(rename = "E302")]
    NoOptionsLeft,

    /// E303: Value construction exceeded the configured depth limit
    #[serde(rename = "E303")]
    DepthExceeded,

    // =========================================================================
    // Mutation Errors (4xx)
    // =========================================================================
    /// E401: A Mutator instance was asked to mutate twice
    #[serde(rename = "E401")]
    MutatorReused,

    // =========================================================================
    // Evaluation Errors (5xx)
    // =========================================================================
    /// E501: The host library rejected a statement
    #[serde(rename = "E501")]
    EvaluationFailed,

    /// E502: A no-value marker reached evaluation outside an optional slot
    /// (generator bug)
    #[serde(rename = "E502")]
    NoValueAtEval,

    /// E503: A variable was bound twice
    #[serde(rename = "E503")]
    DuplicateBinding,

    /// E504: A variable reference has no binding
    #[serde(rename = "E504")]
    UnboundVariable,

    /// E505: The host's reflection facility could not resolve an FQN
    #[serde(rename = "E505")]
    FqnResolutionFailed,
}

impl ErrorCode {
    /// Get the numeric code (e.g., 101, 201, etc.)
    pub fn numeric_code(&self) -> u16 {
        match self {
            // Extraction (1xx)
            ErrorCode::HashCollision => 101,
            ErrorCode::UnknownTypeRef => 102,
            // Resolution (2xx)
            ErrorCode::ModelNotFound => 201,
            ErrorCode::NoSourcesInDistribution => 202,
            // Generation (3xx)
            ErrorCode::UnknownCustomDistribution => 301,
            ErrorCode::NoOptionsLeft => 302,
            ErrorCode::DepthExceeded => 303,
            // Mutation (4xx)
            ErrorCode::MutatorReused => 401,
            // Evaluation (5xx)
            ErrorCode::EvaluationFailed => 501,
            ErrorCode::NoValueAtEval => 502,
            ErrorCode::DuplicateBinding => 503,
            ErrorCode::UnboundVariable => 504,
            ErrorCode::FqnResolutionFailed => 505,
        }
    }

    /// Get the phase this error belongs to
    pub fn phase(&self) -> Phase {
        match self.numeric_code() / 100 {
            1 => Phase::Extraction,
            2 => Phase::Resolution,
            3 => Phase::Generation,
            4 => Phase::Mutation,
            5 => Phase::Evaluation,
            _ => unreachable!("Invalid error code"),
        }
    }

    /// Get a short description of this error
    pub fn description(&self) -> &'static str {
        match self {
            // Extraction
            ErrorCode::HashCollision => "distribution hash collision (increase hash width)",
            ErrorCode::UnknownTypeRef => "type reference names an undeclared FQN",
            // Resolution
            ErrorCode::ModelNotFound => "FQN not present in the distribution model",
            ErrorCode::NoSourcesInDistribution => "no values in distribution",
            // Generation
            ErrorCode::UnknownCustomDistribution => "no plug-in registered for custom distribution",
            ErrorCode::NoOptionsLeft => "every alternative recursed or failed",
            ErrorCode::DepthExceeded => "value construction exceeded depth limit",
            // Mutation
            ErrorCode::MutatorReused => "a Mutator instance may only mutate once",
            // Evaluation
            ErrorCode::EvaluationFailed => "host library rejected the statement",
            ErrorCode::NoValueAtEval => "no-value cannot be evaluated",
            ErrorCode::DuplicateBinding => "variable bound twice",
            ErrorCode::UnboundVariable => "variable reference has no binding",
            ErrorCode::FqnResolutionFailed => "host could not resolve FQN",
        }
    }

    /// Check if this error indicates a programming error in the engine
    /// itself (as opposed to an expected exploration outcome).
    pub fn is_engine_bug(&self) -> bool {
        matches!(
            self,
            ErrorCode::HashCollision
                | ErrorCode::NoValueAtEval
                | ErrorCode::DuplicateBinding
                | ErrorCode::MutatorReused
        )
    }

    /// Get the string code (e.g., "E101", "E201", etc.)
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric_code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.description())
    }
}

/// Complete failure information for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    /// Which phase the failure occurred in
    pub phase: Phase,
    /// Specific error code
    pub code: ErrorCode,
    /// Human-readable error message with context
    pub message: String,
    /// Optional structured context (which FQN, distribution, parameter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<FailureContext>,
}

/// Additional context for a failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureContext {
    /// FQN involved in the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqn: Option<String>,
    /// Distribution id involved in the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_id: Option<String>,
    /// Parameter or field name involved in the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    /// Source index within the resolved distribution (0-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
}

impl Failure {
    /// Create a new failure with just the essentials
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            phase: code.phase(),
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create a failure with context
    pub fn with_context(
        code: ErrorCode,
        message: impl Into<String>,
        context: FailureContext,
    ) -> Self {
        Self {
            phase: code.phase(),
            code,
            message: message.into(),
            context: Some(context),
        }
    }

    /// Add or replace the context on an existing failure
    pub fn add_context(mut self, context: FailureContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Prepend a location note to the failure message, keeping code and
    /// context intact. Used to build "while generating argument `x` of
    /// `M.Stack`: ..." chains as a failure propagates outward.
    pub fn prepend(mut self, note: impl AsRef<str>) -> Self {
        self.message = format!("{}: {}", note.as_ref(), self.message);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.phase,
            self.code.code_string(),
            self.message
        )
    }
}

impl std::error::Error for Failure {}
