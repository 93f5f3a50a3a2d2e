//! Command-line configuration
//!
//! ```text
//! Cli
//! ├── verbose: u8          # -v info, -vv debug, -vvv trace
//! └── command: Command
//!     ├── run              # execute a program file
//!     ├── check            # validate a program file
//!     └── functions        # list the function catalog
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use xflow_engine::{Program, Values};

#[derive(Debug, Clone, Parser)]
#[command(name = "xflow")]
#[command(about = "Run and check xflow dataflow programs")]
#[command(version)]
pub struct Cli {
    /// Raise the log level (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute a program and print its outputs as JSON
    Run(RunArgs),
    /// Validate a program against the catalog
    Check(CheckArgs),
    /// List every callable function with its signature
    Functions(FunctionsArgs),
}

/// Programs to register as callable functions before the main program loads
#[derive(Debug, Clone, Default, Args)]
pub struct LibraryArgs {
    /// Register a program file as function NAME (repeatable)
    #[arg(long = "function", value_name = "NAME=FILE", value_parser = parse_function)]
    pub functions: Vec<(String, PathBuf)>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Program file (JSON)
    pub program: PathBuf,

    /// External inputs as a JSON object
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub input: String,

    /// Memoize program function calls, keeping at most N entries
    #[arg(long, value_name = "N")]
    pub cache: Option<usize>,

    /// Extra steps granted on top of the node count
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub budget_slack: usize,

    /// Print every node firing to stderr as CALLER:NODE
    #[arg(long)]
    pub trace: bool,

    #[command(flatten)]
    pub library: LibraryArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Program file (JSON)
    pub program: PathBuf,

    /// Also report data cycles not closed through a callback
    #[arg(long)]
    pub cycles: bool,

    #[command(flatten)]
    pub library: LibraryArgs,
}

#[derive(Debug, Clone, Args)]
pub struct FunctionsArgs {
    /// Print signatures as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub library: LibraryArgs,
}

fn parse_function(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=FILE, got '{}'", raw)),
    }
}

/// Read and parse a program file
pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid program in {}", path.display()))
}

/// Parse the `--input` object
pub fn parse_inputs(raw: &str) -> anyhow::Result<Values> {
    let value: Value = serde_json::from_str(raw).context("--input is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(anyhow!("--input must be a JSON object, got {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "xflow",
            "-vv",
            "run",
            "main.json",
            "--input",
            r#"{"n": 5}"#,
            "--function",
            "fib=fib.json",
            "--cache",
            "100",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.program, PathBuf::from("main.json"));
        assert_eq!(args.cache, Some(100));
        assert_eq!(args.budget_slack, 10);
        assert_eq!(
            args.library.functions,
            vec![("fib".to_string(), PathBuf::from("fib.json"))]
        );
    }

    #[test]
    fn test_parse_function_rejects_malformed() {
        assert!(parse_function("fib").is_err());
        assert!(parse_function("=fib.json").is_err());
        assert!(Cli::try_parse_from(["xflow", "check", "p.json", "--function", "x"]).is_err());
    }

    #[test]
    fn test_parse_inputs() {
        let values = parse_inputs(r#"{"it": "a b", "n": 2}"#).unwrap();
        assert_eq!(values["n"], serde_json::json!(2));
        assert!(parse_inputs("[1, 2]").is_err());
        assert!(parse_inputs("{").is_err());
    }
}
