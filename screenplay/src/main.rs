//! `screenplay` command-line tool.
//!
//! Inspects and exercises the failure classification configured in
//! `screenplay.toml` (plus `SCREENPLAY_*` overrides).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use screenplay::core::analysis::{Rule, RuleMatch};
use screenplay::core::failure::{ErrorType, StepError};
use screenplay::core::outcome::TestResult;
use screenplay::exit_codes;
use screenplay::io::config::{
    DEFAULT_CONFIG_FILE, ScreenplayConfig, load_config_with_env, write_config,
};
use screenplay::logging;

#[derive(Parser)]
#[command(
    name = "screenplay",
    version,
    about = "Actor performance engine: failure classification tools"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Check the configuration file.
    Validate,
    /// Print the classification rule table in evaluation order.
    Rules {
        #[arg(long)]
        json: bool,
    },
    /// Classify an error given its cause chain, outermost first.
    ///
    /// Each entry is `name` or `name:super1+super2`.
    Classify {
        #[arg(required = true)]
        chain: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Validate => cmd_validate(&cli.config),
        Command::Rules { json } => cmd_rules(&cli.config, json),
        Command::Classify { chain, json } => cmd_classify(&cli.config, &chain, json),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &ScreenplayConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(path: &Path) -> Result<i32> {
    load_config_with_env(path)?;
    println!("{} is valid", path.display());
    Ok(exit_codes::OK)
}

fn cmd_rules(path: &Path, json: bool) -> Result<i32> {
    let cfg = load_config_with_env(path)?;
    let analysis = cfg.failure_analysis();
    if json {
        let payload = serde_json::to_string_pretty(analysis.rules()).context("serialize rules")?;
        println!("{payload}");
        return Ok(exit_codes::OK);
    }
    for (position, rule) in analysis.rules().iter().enumerate() {
        println!("{:>2}. {}", position + 1, describe_rule(rule));
    }
    println!("    otherwise => {}", TestResult::Error);
    Ok(exit_codes::OK)
}

fn describe_rule(rule: &Rule) -> String {
    match &rule.matches {
        RuleMatch::RootCauseIsA { type_name } => {
            format!("root cause is-a {type_name} => {}", rule.result)
        }
        RuleMatch::WrappedFailure => {
            format!("step failure wrapping a failure => {}", rule.result)
        }
    }
}

#[derive(Serialize)]
struct Classification<'a> {
    result: TestResult,
    root_cause: &'a str,
    chain: &'a [String],
}

fn cmd_classify(path: &Path, chain: &[String], json: bool) -> Result<i32> {
    let cfg = load_config_with_env(path)?;
    let error = build_chain(chain)?;
    let result = cfg.failure_analysis().result_for(&error);
    if json {
        let payload = Classification {
            result,
            root_cause: error.root_cause().error_type().name(),
            chain,
        };
        println!(
            "{}",
            serde_json::to_string(&payload).context("serialize classification")?
        );
    } else {
        println!("{result}");
    }
    if result.is_unsuccessful() {
        Ok(exit_codes::UNSUCCESSFUL)
    } else {
        Ok(exit_codes::OK)
    }
}

/// Build a cause chain from type names listed outermost first.
fn build_chain(chain: &[String]) -> Result<StepError> {
    let mut error: Option<StepError> = None;
    for entry in chain.iter().rev() {
        let error_type =
            ErrorType::parse(entry).with_context(|| format!("invalid error type {entry:?}"))?;
        let raised = StepError::new(error_type, format!("raised {entry}"));
        error = Some(match error {
            Some(cause) => raised.caused_by(cause),
            None => raised,
        });
    }
    error.context("empty cause chain")
}
