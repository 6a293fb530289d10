//! Program-space exploration CLI.
//!
//! **Primary goal**: derive deterministic, replayable exploration artifacts
//! from a normalized type registry: a distribution model, minimal
//! constructor programs, and seeded walks through their mutation space.
//!
//! **Key modes**
//! - Model extraction: `extract registry.json -o model.json`
//! - Blind exploration: `explore m.Stack -m model.json -S 42 -V 16`
//! - Filtered exploration: `explore m.Stack -m model.json -s --registry registry.json -o out/`
//! - Re-evaluation of saved values: `synth out/*.json --registry registry.json`
//!
//! **Guardrails**
//! - `explore -s` refuses to run without a registry for the host.
//! - Exploration output directories get a report JSON so results stay
//!   attributable to a seed.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::Path;

use progspace::args::{Args, Command, ExploreArgs, ExtractArgs, InspectArgs, SynthArgs};
use progspace::bias::BiaserSet;
use progspace::custom::CustomRegistry;
use progspace::eval::{Evaluator, JsonHost};
use progspace::explore::{explore, ExploreOptions, StepEvent};
use progspace::extract::extract_distributions;
use progspace::model::DistributionModel;
use progspace::statements::{discretize, render};
use progspace::typereg::TypeRegistry;
use progspace::value::Value;

fn main() {
    let args = Args::parse();
    if let Err(error) = run(args) {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Extract(cmd) => cmd_extract(cmd),
        Command::Explore(cmd) => cmd_explore(cmd, args.verbose),
        Command::Synth(cmd) => cmd_synth(cmd, args.verbose),
        Command::Inspect(cmd) => cmd_inspect(cmd),
    }
}

fn cmd_extract(cmd: ExtractArgs) -> Result<()> {
    let mut registry = TypeRegistry::default();
    for path in &cmd.registries {
        registry.merge(TypeRegistry::load(path)?);
    }
    let biasers = if cmd.no_bias {
        BiaserSet::empty()
    } else {
        BiaserSet::with_defaults(cmd.root_interface.clone())
    };
    let model = extract_distributions(&registry, &biasers)
        .map_err(|f| anyhow!("extraction failed: {}", f))?;
    model.save(&cmd.output)?;
    eprintln!("wrote {} ({})", cmd.output.display(), model.stats());
    Ok(())
}

fn cmd_explore(cmd: ExploreArgs, verbose: u8) -> Result<()> {
    let mut model = DistributionModel::load(&cmd.model)?;
    let customs = CustomRegistry::with_defaults();

    let host = match (cmd.synth, &cmd.registry) {
        (true, Some(path)) => Some(JsonHost::new(TypeRegistry::load(path)?)),
        (true, None) => bail!("`explore -s` needs --registry for the evaluation host"),
        (false, _) => None,
    };

    let options = ExploreOptions {
        steps: cmd.variants,
        samples: cmd.samples,
        seed: cmd.seed,
        evaluate: cmd.synth,
    };

    let outcome = explore(
        &mut model,
        &customs,
        &cmd.fqn,
        &options,
        host.as_ref(),
        |event| report_progress(event, verbose),
    )
    .map_err(|f| anyhow!("exploration failed: {}", f))?;
    if verbose == 0 {
        eprintln!();
    }

    eprintln!(
        "explored {}: {} steps, {} candidates, {} evaluated, {} succeeded, {} survivors",
        outcome.report.target,
        outcome.report.steps_completed,
        outcome.report.candidates,
        outcome.report.evaluated,
        outcome.report.succeeded,
        outcome.survivors.len()
    );

    if let Some(out_dir) = &cmd.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
        for value in &outcome.survivors {
            let path = out_dir.join(format!("{}.json", value.content_hash()));
            fs::write(&path, serde_json::to_string_pretty(value)?)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        let report_path = out_dir.join("explore_report.json");
        fs::write(&report_path, serde_json::to_string_pretty(&outcome.report)?)
            .with_context(|| format!("writing {}", report_path.display()))?;
        eprintln!(
            "wrote {} value(s) and report to {}",
            outcome.survivors.len(),
            out_dir.display()
        );
    }
    Ok(())
}

fn report_progress(event: StepEvent<'_>, verbose: u8) {
    match event {
        StepEvent::Minimal { statements, .. } => {
            if verbose >= 1 {
                eprintln!("minimal:\n{}", render(statements));
            }
        }
        StepEvent::Candidate {
            step,
            statements,
            artifact,
            failure,
            ..
        } => {
            if verbose == 0 {
                eprint!(".");
                let _ = std::io::stderr().flush();
                return;
            }
            eprintln!("step {}:\n{}", step, render(statements));
            match (artifact, failure) {
                (Some(artifact), _) => {
                    if verbose >= 2 {
                        eprintln!(
                            "-> ok: {}",
                            serde_json::to_string_pretty(artifact)
                                .unwrap_or_else(|_| "<unprintable>".to_string())
                        );
                    } else {
                        eprintln!("-> ok");
                    }
                }
                (None, Some(failure)) => eprintln!("-> {}", failure),
                (None, None) => {}
            }
        }
        StepEvent::StepDone { step, advanced } => {
            if verbose >= 1 && !advanced {
                eprintln!("step {}: no candidate survived, keeping current value", step);
            }
        }
    }
}

fn cmd_synth(cmd: SynthArgs, verbose: u8) -> Result<()> {
    let registry = TypeRegistry::load(&cmd.registry)?;
    let host = JsonHost::new(registry);
    let mut failures = 0usize;
    for path in &cmd.files {
        match synth_file(path, &host, verbose) {
            Ok(()) => {}
            Err(error) => {
                failures += 1;
                eprintln!("{}: {:#}", path.display(), error);
            }
        }
    }
    if failures > 0 {
        bail!("{}/{} file(s) failed to evaluate", failures, cmd.files.len());
    }
    Ok(())
}

fn synth_file(path: &Path, host: &JsonHost, verbose: u8) -> Result<()> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let statements = discretize(&value);
    if verbose >= 1 {
        eprintln!("{}:\n{}", path.display(), render(&statements));
    }
    let artifact = Evaluator::new(host.clone())
        .run(&statements)
        .map_err(|f| anyhow!("{}", f))?;
    if verbose >= 2 {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        eprintln!("{}: ok", path.display());
    }
    Ok(())
}

fn cmd_inspect(cmd: InspectArgs) -> Result<()> {
    let model = DistributionModel::load(&cmd.model)?;
    println!("{}", model.stats());
    Ok(())
}
