//! The exploration loop: minimal value, then repeated mutation steps.
//!
//! Each step samples up to `samples` single-point edits of the current
//! value. With evaluation enabled, every candidate is discretized and run
//! against the host; failures are counted into a histogram keyed by error
//! message and the current value only advances to a candidate that
//! evaluates successfully. Without evaluation the walk advances blindly to
//! the first candidate.

use crate::custom::CustomRegistry;
use crate::errors::Failure;
use crate::eval::{Evaluator, Host};
use crate::generate::{Generator, GeneratorOptions};
use crate::model::DistributionModel;
use crate::mutate::{Mutator, MutatorOptions};
use crate::random::Rng;
use crate::statements::{discretize, Statement};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Knobs for one exploration run.
#[derive(Debug, Clone)]
pub struct ExploreOptions {
    /// Number of mutation steps after the minimal value.
    pub steps: usize,
    /// Reservoir size per step (candidates sampled per mutation).
    pub samples: usize,
    /// Seed for the whole run.
    pub seed: u64,
    /// Evaluate candidates and only advance through successes.
    pub evaluate: bool,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            steps: 8,
            samples: 4,
            seed: 0,
            evaluate: false,
        }
    }
}

/// Summary of an exploration run, persistable alongside its outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreReport {
    /// Target FQN.
    pub target: String,
    /// Seed used (for replay).
    pub seed: u64,
    pub steps_requested: usize,
    pub steps_completed: usize,
    /// Candidates produced by the mutator across all steps.
    pub candidates: u64,
    /// Candidates that were evaluated.
    pub evaluated: u64,
    /// Candidates that evaluated successfully.
    pub succeeded: u64,
    /// Evaluation failures grouped by message.
    pub failure_histogram: BTreeMap<String, u64>,
    /// Content hashes of surviving values, in discovery order.
    pub survivors: Vec<String>,
}

/// Everything an exploration run produced.
pub struct ExploreOutcome {
    pub report: ExploreReport,
    /// Surviving values (deduplicated by content hash).
    pub survivors: Vec<Value>,
    /// The value the walk ended on.
    pub final_value: Value,
}

/// Progress events surfaced to the caller while the loop runs.
pub enum StepEvent<'a> {
    /// The minimal seed value was generated.
    Minimal {
        value: &'a Value,
        statements: &'a [Statement],
    },
    /// One candidate was produced (and possibly evaluated).
    Candidate {
        step: usize,
        value: &'a Value,
        statements: &'a [Statement],
        artifact: Option<&'a JsonValue>,
        failure: Option<&'a Failure>,
    },
    /// A step finished; `advanced` tells whether the current value moved.
    StepDone { step: usize, advanced: bool },
}

/// Run the exploration loop for `fqn`.
pub fn explore<H, F>(
    model: &mut DistributionModel,
    customs: &CustomRegistry,
    fqn: &str,
    options: &ExploreOptions,
    host: Option<&H>,
    mut progress: F,
) -> Result<ExploreOutcome, Failure>
where
    H: Host + Clone,
    F: FnMut(StepEvent<'_>),
{
    let mut rng = Rng::seeded(options.seed);
    let mut current = Generator::new(model, customs, &mut rng, GeneratorOptions::default())
        .minimal(fqn)?;
    let minimal_statements = discretize(&current);
    progress(StepEvent::Minimal {
        value: &current,
        statements: &minimal_statements,
    });

    let mut report = ExploreReport {
        target: fqn.to_string(),
        seed: options.seed,
        steps_requested: options.steps,
        steps_completed: 0,
        candidates: 0,
        evaluated: 0,
        succeeded: 0,
        failure_histogram: BTreeMap::new(),
        survivors: Vec::new(),
    };
    let mut survivors: Vec<Value> = Vec::new();

    for step in 0..options.steps {
        // A mutator instance is single-use; one per step.
        let candidates = Mutator::new(
            model,
            customs,
            &mut rng,
            MutatorOptions {
                variants: options.samples,
            },
        )
        .mutate(&current)?;
        report.candidates += candidates.len() as u64;

        let mut next: Option<Value> = None;
        for candidate in &candidates {
            let statements = discretize(candidate);
            if options.evaluate {
                let Some(host) = host else {
                    return Err(Failure::new(
                        crate::errors::ErrorCode::EvaluationFailed,
                        "evaluation requested but no host was provided",
                    ));
                };
                report.evaluated += 1;
                match Evaluator::new(host.clone()).run(&statements) {
                    Ok(artifact) => {
                        report.succeeded += 1;
                        record_survivor(&mut report, &mut survivors, candidate);
                        progress(StepEvent::Candidate {
                            step,
                            value: candidate,
                            statements: &statements,
                            artifact: Some(&artifact),
                            failure: None,
                        });
                        if next.is_none() {
                            next = Some(candidate.clone());
                        }
                    }
                    Err(failure) => {
                        // The walk never advances onto a failing candidate.
                        *report
                            .failure_histogram
                            .entry(failure.message.clone())
                            .or_insert(0) += 1;
                        progress(StepEvent::Candidate {
                            step,
                            value: candidate,
                            statements: &statements,
                            artifact: None,
                            failure: Some(&failure),
                        });
                    }
                }
            } else {
                record_survivor(&mut report, &mut survivors, candidate);
                progress(StepEvent::Candidate {
                    step,
                    value: candidate,
                    statements: &statements,
                    artifact: None,
                    failure: None,
                });
                if next.is_none() {
                    next = Some(candidate.clone());
                }
            }
        }

        let advanced = next.is_some();
        if let Some(next) = next {
            current = next;
        }
        report.steps_completed = step + 1;
        progress(StepEvent::StepDone { step, advanced });
    }

    Ok(ExploreOutcome {
        report,
        survivors,
        final_value: current,
    })
}

fn record_survivor(report: &mut ExploreReport, survivors: &mut Vec<Value>, candidate: &Value) {
    let hash = candidate.content_hash();
    if report.survivors.contains(&hash) {
        return;
    }
    report.survivors.push(hash);
    survivors.push(candidate.clone());
}
