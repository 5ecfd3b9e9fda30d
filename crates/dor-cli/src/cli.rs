use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dor",
    about = "Digital object repository tools: translate, validate and checksum",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Repository configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest a document in one format and export it in another
    Translate(TranslateArgs),
    /// Check that a document parses into a structurally sound object
    Validate(ValidateArgs),
    /// Compute, or verify, the checksum of a file
    Checksum(ChecksumArgs),
}

#[derive(Args)]
pub struct TranslateArgs {
    pub input: PathBuf,
    #[arg(long, default_value = "foxml1.1")]
    pub from: String,
    #[arg(long, default_value = "foxml1.1")]
    pub to: String,
    /// store, public, migrate or archive
    #[arg(long, default_value = "public")]
    pub context: String,
    #[arg(long, default_value = "UTF-8")]
    pub encoding: String,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    pub input: PathBuf,
    #[arg(long = "input-format", default_value = "foxml1.1")]
    pub input_format: String,
    #[arg(long, default_value = "UTF-8")]
    pub encoding: String,
}

#[derive(Args)]
pub struct ChecksumArgs {
    pub file: PathBuf,
    #[arg(short, long, default_value = "SHA-256")]
    pub algorithm: String,
    /// Fail unless the file has this checksum
    #[arg(long)]
    pub expect: Option<String>,
}
