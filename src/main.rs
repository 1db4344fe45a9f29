//! embedql command-line tool
//!
//! Usage: embedql [OPTIONS] <COMMAND>
//!
//! Commands:
//!   parse    Parse statements and print their syntax trees as JSON
//!   eval     Evaluate a formula against a JSON record
//!   check    Run a validation predicate; exits with status 1 when it fails
//!   encode   Convert a JSON document to portable text
//!   decode   Convert portable text to JSON

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use embedql::{Engine, EngineConfig, Record, Value};

#[derive(Parser, Debug)]
#[command(name = "embedql")]
#[command(about = "Embedded SQL-subset formula and statement engine", long_about = None)]
struct Args {
    /// Directory holding embedql.toml and .env
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse `;`-separated statements
    Parse { sql: String },
    /// Evaluate a formula
    Eval {
        formula: String,
        /// Record as a JSON object
        #[arg(short, long, default_value = "{}")]
        record: String,
    },
    /// Run a validation predicate
    Check {
        predicate: String,
        /// Record as a JSON object
        #[arg(short, long, default_value = "{}")]
        record: String,
    },
    /// JSON to portable text
    Encode { json: String },
    /// Portable text to JSON
    Decode { text: String },
}

fn parse_record(json: &str) -> anyhow::Result<Record> {
    let json: serde_json::Value = serde_json::from_str(json).context("Invalid --record JSON")?;
    match Value::from(json) {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--record must be a JSON object, got {}", other.type_name()),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = EngineConfig::load(&args.config_dir)?;
    embedql::telemetry::init(&config);
    tracing::debug!(?config, "Loaded configuration");

    let engine = Engine::new(config);

    match args.command {
        Command::Parse { sql } => {
            let statements = engine.parse(&sql)?;
            println!("{}", serde_json::to_string_pretty(&statements)?);
        }
        Command::Eval { formula, record } => {
            let record = parse_record(&record)?;
            let value = engine.evaluate_formula(&formula, &record)?;
            println!("{}", value.to_json());
        }
        Command::Check { predicate, record } => {
            let record = parse_record(&record)?;
            let passed = engine.check(&predicate, &record)?;
            println!("{}", passed);
            if !passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Encode { json } => {
            let json: serde_json::Value = serde_json::from_str(&json).context("Invalid JSON")?;
            println!("{}", engine.to_text(&Value::from(json)));
        }
        Command::Decode { text } => {
            let value = engine.from_text(&text)?;
            println!("{}", serde_json::to_string_pretty(&value.to_json())?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
