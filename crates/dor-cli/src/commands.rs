use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use dor_crypto::{Checksum, ChecksumType};
use dor_management::{CallContext, Management, RepositoryConfig};
use dor_model::{DigitalObject, IntegrityValidator, ViolationKind};
use dor_translation::{TranslationContext, TranslatorRegistry};
use dor_types::Pid;

use crate::cli::*;

/// Subject recorded in audit records written by the CLI.
const CLI_SUBJECT: &str = "dor-cli";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Translate(args) => cmd_translate(&config, &args, &mut out),
        Command::Validate(args) => cmd_validate(&config, &args, &cli.format, &mut out),
        Command::Checksum(args) => cmd_checksum(&args, &cli.format, &mut out),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RepositoryConfig> {
    match path {
        Some(path) => RepositoryConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(RepositoryConfig::default()),
    }
}

fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Ingest into a scratch in-memory repository, then export. Managed content
/// travels with the object, so `archive` output embeds it.
fn cmd_translate(
    config: &RepositoryConfig,
    args: &TranslateArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;
    let context = TranslationContext::parse(&args.context)?;
    let repo = Management::in_memory(config.clone())?;
    let ctx = CallContext::new(CLI_SUBJECT);

    let pid = repo
        .ingest(&ctx, &mut input.as_slice(), &args.from, &args.encoding, "dor translate")
        .with_context(|| format!("reading {} as {}", args.input.display(), args.from))?;
    let document = repo
        .export(&ctx, &pid, &args.to, context, &args.encoding)
        .with_context(|| format!("writing {pid} as {}", args.to))?;
    debug!(pid = %pid, from = %args.from, to = %args.to, context = context.name(), bytes = document.len(), "translated");

    match &args.output {
        Some(path) => {
            fs::write(path, &document)
                .with_context(|| format!("cannot write {}", path.display()))?;
            writeln!(
                out,
                "{} {} as {} ({}) to {}",
                "✓".green().bold(),
                pid.as_str().cyan(),
                args.to.yellow(),
                context.name(),
                path.display()
            )?;
        }
        None => out.write_all(&document)?,
    }
    Ok(())
}

fn cmd_validate(
    config: &RepositoryConfig,
    args: &ValidateArgs,
    format: &OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;
    let registry = TranslatorRegistry::new(config.translation_config());
    let mut object = DigitalObject::default();
    registry
        .deserialize(
            &mut input.as_slice(),
            &mut object,
            &args.input_format,
            &args.encoding,
            TranslationContext::Migration,
        )
        .with_context(|| format!("{} is not a readable {} document", args.input.display(), args.input_format))?;

    let mut report = IntegrityValidator::validate(&object, &config.default_binding_target);
    // Ingest assigns a pid to documents without one.
    report.violations.retain(|v| v.kind != ViolationKind::MissingPid);
    let pid = object.pid.as_ref().map(Pid::as_str).unwrap_or("(unassigned)");

    match format {
        OutputFormat::Json => {
            let violations: Vec<_> = report
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "component": v.component,
                        "kind": format!("{:?}", v.kind),
                        "description": v.description,
                    })
                })
                .collect();
            let value = json!({
                "pid": pid,
                "valid": report.is_valid(),
                "datastreams": report.datastream_count,
                "disseminators": report.disseminator_count,
                "violations": violations,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        OutputFormat::Text => {
            if report.is_valid() {
                writeln!(
                    out,
                    "{} {} is valid ({} datastreams, {} disseminators)",
                    "✓".green().bold(),
                    pid.cyan(),
                    report.datastream_count,
                    report.disseminator_count
                )?;
            } else {
                writeln!(out, "{} {} has problems:", "✗".red().bold(), pid.cyan())?;
                for v in &report.violations {
                    writeln!(out, "  {} {}", v.component.yellow(), v.description)?;
                }
            }
        }
    }

    if !report.is_valid() {
        bail!("{} violation(s) in {}", report.violations.len(), args.input.display());
    }
    Ok(())
}

fn cmd_checksum(args: &ChecksumArgs, format: &OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let kind = ChecksumType::parse(&args.algorithm)?;
    let data = read_input(&args.file)?;
    let checksum = Checksum::compute(kind, &data);
    let matches = args.expect.as_deref().map(|e| checksum.matches(e));

    match format {
        OutputFormat::Json => {
            let value = json!({
                "file": args.file.display().to_string(),
                "algorithm": kind.name(),
                "checksum": checksum.value,
                "size": data.len(),
                "matches": matches,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{}  {}  {}", kind.name().bold(), checksum.value, args.file.display())?;
        }
    }

    if let (Some(false), Some(expected)) = (matches, &args.expect) {
        bail!(
            "checksum mismatch for {}: expected {expected}, computed {}",
            args.file.display(),
            checksum.value
        );
    }
    Ok(())
}
