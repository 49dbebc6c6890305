use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(name = "xtask", about = "site-listings workspace tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Validate a dataset JSON file against schemas/<kind>.schema.json
    ValidateDataset {
        #[arg(long, value_enum)]
        kind: Kind,
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind { Lectures, Officers }

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::ValidateDataset { kind, file } => validate_dataset(kind, &file),
    }
}

fn validate_dataset(kind: Kind, path: &PathBuf) -> Result<()> {
    let schema_text = match kind {
        Kind::Lectures => include_str!("../../schemas/lectures.schema.json"),
        Kind::Officers => include_str!("../../schemas/officers.schema.json"),
    };
    let schema: serde_json::Value = serde_json::from_str(schema_text)?;
    let compiled = jsonschema::validator_for(&schema)?;
    let data_text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&data_text).with_context(|| "parse json")?;
    let errors: Vec<_> = compiled.iter_errors(&data).collect();
    if !errors.is_empty() {
        eprintln!("Invalid {kind:?} dataset: {}", path.display());
        for e in errors {
            eprintln!("- {}", e);
        }
        std::process::exit(1);
    }
    println!("OK: {}", path.display());
    Ok(())
}
