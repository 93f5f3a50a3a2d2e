//! `xflow`: run and check xflow programs from the command line
//!
//! ```bash
//! xflow run main.json --input '{"n": 30}' --function fib=fib.json --cache 100
//! xflow check main.json --function fib=fib.json --cycles
//! xflow functions --json
//! ```

mod commands;
mod config;

use std::io::{self, Write};
use std::process;

use clap::Parser;
use log::LevelFilter;

use crate::config::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Err(error) = run(&cli) else {
        process::exit(0);
    };

    log::debug!("xflow terminated with error: {:?}", error);
    eprintln!("Error: {error:#}");
    process::exit(1);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cli.command {
        Command::Run(args) => commands::run(args, &mut out)?,
        Command::Check(args) => commands::check(args, &mut out)?,
        Command::Functions(args) => commands::functions(args, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// Install `env_logger`, defaulting to warnings; each `-v` raises the level
fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    let level = match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp_millis().init();
}
