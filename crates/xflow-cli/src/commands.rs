//! Subcommand handlers
//!
//! Each handler writes its report to `out` so tests can capture it.

use std::io::Write;

use anyhow::{bail, Context};
use xflow_engine::{detect_cycles, Environment, EnvironmentConfig, Signature};

use crate::config::{load_program, parse_inputs, CheckArgs, FunctionsArgs, LibraryArgs, RunArgs};

/// Build an environment over the standard library plus `--function` programs
fn environment(library: &LibraryArgs, config: EnvironmentConfig) -> anyhow::Result<Environment> {
    let mut env = Environment::with_config(xflow_std::catalog(), config);
    for (name, path) in &library.functions {
        let program = load_program(path)?;
        env.add_function(name.clone(), program);
    }
    Ok(env)
}

pub fn run(args: &RunArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut config = EnvironmentConfig {
        budget_slack: args.budget_slack,
        ..EnvironmentConfig::default()
    };
    if let Some(max) = args.cache {
        config = config.with_cache(max);
    }

    let mut env = environment(&args.library, config)?;
    if args.trace {
        env = env.with_run_info(|caller, node_id| eprintln!("{}:{}", caller, node_id));
    }

    let program = load_program(&args.program)?;
    let inputs = parse_inputs(&args.input)?;
    let outputs = env
        .run(&program, &inputs)
        .with_context(|| format!("run of {} failed", args.program.display()))?;

    if let Some(stats) = env.cache_stats() {
        log::info!(
            "Cache: {} entries, {} hits, {} misses",
            stats.entries,
            stats.hits,
            stats.misses
        );
    }

    // sorted for stable output
    let outputs: serde_json::Map<String, serde_json::Value> = {
        let mut pairs: Vec<_> = outputs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.into_iter().collect()
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&outputs)?)?;
    Ok(())
}

pub fn check(args: &CheckArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let env = environment(&args.library, EnvironmentConfig::default())?;
    let program = load_program(&args.program)?;

    let mut diagnostics = env.validate(&program);
    if args.cycles {
        diagnostics.extend(detect_cycles(&program, env.catalog()));
    }

    for diagnostic in &diagnostics {
        writeln!(out, "{}", diagnostic)?;
    }
    if !diagnostics.is_empty() {
        bail!(
            "{} has {} problem(s)",
            args.program.display(),
            diagnostics.len()
        );
    }
    writeln!(out, "{}: ok ({} nodes)", args.program.display(), program.len())?;
    Ok(())
}

pub fn functions(args: &FunctionsArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let env = environment(&args.library, EnvironmentConfig::default())?;

    if args.json {
        let catalog: serde_json::Map<String, serde_json::Value> = env
            .functions()
            .map(|(name, signature)| Ok((name.to_string(), serde_json::to_value(signature)?)))
            .collect::<serde_json::Result<_>>()?;
        writeln!(out, "{}", serde_json::to_string_pretty(&catalog)?)?;
        return Ok(());
    }

    for (name, signature) in env.functions() {
        writeln!(out, "{}", describe(name, signature))?;
    }
    Ok(())
}

/// One-line summary such as `str.join(arr, sep) -> str`
fn describe(name: &str, signature: &Signature) -> String {
    let mut line = format!(
        "{}({}) -> {}",
        name,
        signature.input_names().join(", "),
        signature.output_names().join(", ")
    );
    for (callback, cb) in &signature.cb {
        let input: Vec<&str> = cb.input.iter().map(|p| p.name.as_str()).collect();
        let output: Vec<&str> = cb.output.iter().map(|p| p.name.as_str()).collect();
        line.push_str(&format!(
            " [{}: ({}) -> {}]",
            callback,
            input.join(", "),
            output.join(", ")
        ));
    }
    line
}
