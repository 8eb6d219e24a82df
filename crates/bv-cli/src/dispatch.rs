use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bv_store::{
    ArtifactStore, StoreConfig, StoreError, VerifyReport, VerifyStatus, VersionRecord,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::{BvCli, BvCommand, FetchArgs, IngestArgs};
use crate::outcome::{HumanOutput, Outcome};

pub fn execute(cli: &BvCli) -> Outcome {
    let name = command_name(&cli.command);
    let config = match StoreConfig::from_env(cli.root.clone()) {
        Ok(config) => config,
        Err(err) => return Outcome::failure(name, format!("{err:#}"), json!({})),
    };
    debug!(versions_dir = %config.versions_dir.display(), "resolved store configuration");
    let store = match ArtifactStore::open(config) {
        Ok(store) => store,
        Err(err) => return Outcome::from_store_error(name, &err),
    };
    match run(&store, cli, name) {
        Ok(outcome) => outcome,
        Err(err) => match err.downcast_ref::<StoreError>() {
            Some(store_err) => Outcome::from_store_error(name, store_err),
            None => Outcome::failure(name, format!("{err:#}"), json!({})),
        },
    }
}

pub fn command_name(command: &BvCommand) -> &'static str {
    match command {
        BvCommand::List => "list",
        BvCommand::Latest => "latest",
        BvCommand::Show(_) => "show",
        BvCommand::Ingest(_) => "ingest",
        BvCommand::Fetch(_) => "fetch",
        BvCommand::Backfill => "backfill",
        BvCommand::Verify(_) => "verify",
        BvCommand::Changelog(_) => "changelog",
    }
}

fn run(store: &ArtifactStore, cli: &BvCli, name: &'static str) -> Result<Outcome> {
    match &cli.command {
        BvCommand::List => {
            let records = store.list_versions()?;
            let message = match records.len() {
                1 => "1 version".to_string(),
                n => format!("{n} versions"),
            };
            Ok(Outcome::success(
                name,
                message,
                json!({ "versions": records_json(&records)? }),
            ))
        }
        BvCommand::Latest => {
            let record = store.get_latest()?;
            Ok(Outcome::success(
                name,
                record.version.clone(),
                record_json(&record)?,
            ))
        }
        BvCommand::Show(args) => {
            let record = store.get_by_version(&args.version)?;
            Ok(Outcome::success(
                name,
                describe_record(&record),
                record_json(&record)?,
            ))
        }
        BvCommand::Ingest(args) => ingest(store, args, name),
        BvCommand::Fetch(args) => fetch(store, args, name, cli.json),
        BvCommand::Backfill => {
            let summary = store.backfill_hashes()?;
            let message = format!(
                "hashed {} of {} legacy records ({} missing blobs, {} failed)",
                summary.hashed, summary.scanned, summary.missing_blobs, summary.failed
            );
            Ok(Outcome::success(name, message, serde_json::to_value(summary)?))
        }
        BvCommand::Verify(args) => match &args.version {
            Some(version) => {
                let report = store.verify(version)?;
                let message = match report.status {
                    VerifyStatus::Unhashed => format!("{version} has no recorded hash"),
                    _ => format!("{version} ok"),
                };
                Ok(Outcome::success(name, message, serde_json::to_value(report)?))
            }
            None => verify_all(store, name),
        },
        BvCommand::Changelog(args) => {
            let notes = store.changelog(&args.version)?;
            let details = json!({ "version": args.version, "changelog": notes });
            Ok(Outcome::success(name, notes, details).with_human(HumanOutput::Raw))
        }
    }
}

fn ingest(store: &ArtifactStore, args: &IngestArgs, name: &'static str) -> Result<Outcome> {
    let record = if args.input == Path::new("-") {
        store.ingest(&args.version, io::stdin().lock())?
    } else {
        let file = match File::open(&args.input) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Outcome::user_error(
                    name,
                    format!("input file {} does not exist", args.input.display()),
                    json!({ "path": args.input }),
                ));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to open {}", args.input.display()))
            }
        };
        store.ingest(&args.version, file)?
    };
    Ok(Outcome::success(
        name,
        format!("stored {}", describe_record(&record)),
        record_json(&record)?,
    ))
}

fn fetch(
    store: &ArtifactStore,
    args: &FetchArgs,
    name: &'static str,
    json_output: bool,
) -> Result<Outcome> {
    let Some(path) = &args.output else {
        if json_output {
            return Ok(Outcome::user_error(
                name,
                "--json needs --output; artifact bytes cannot share stdout with the envelope",
                json!({}),
            ));
        }
        let mut reader = store.fetch(&args.version)?;
        let mut stdout = io::stdout().lock();
        io::copy(&mut reader, &mut stdout).context("failed to write artifact to stdout")?;
        stdout.flush().context("failed to flush stdout")?;
        return Ok(Outcome::success(name, "", json!({})).with_human(HumanOutput::Silent));
    };

    let mut reader = store.fetch(&args.version)?;
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let written = io::copy(&mut reader, &mut file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(Outcome::success(
        name,
        format!("wrote {} ({written} bytes) to {}", args.version, path.display()),
        json!({ "version": args.version, "path": path, "size": written }),
    ))
}

fn verify_all(store: &ArtifactStore, name: &'static str) -> Result<Outcome> {
    let reports = store.verify_all()?;
    let problems: Vec<&VerifyReport> = reports
        .iter()
        .filter(|report| {
            matches!(
                report.status,
                VerifyStatus::Mismatch | VerifyStatus::MissingBlob
            )
        })
        .collect();
    let details = json!({ "reports": reports });
    if problems.is_empty() {
        return Ok(Outcome::success(
            name,
            format!("{} versions verified", reports.len()),
            details,
        ));
    }
    let listed: Vec<String> = problems
        .iter()
        .map(|report| format!("{} ({})", report.version, status_label(report.status)))
        .collect();
    Ok(Outcome::failure(
        name,
        format!("integrity problems: {}", listed.join(", ")),
        details,
    ))
}

fn status_label(status: VerifyStatus) -> &'static str {
    match status {
        VerifyStatus::Ok => "ok",
        VerifyStatus::Mismatch => "digest mismatch",
        VerifyStatus::MissingBlob => "missing blob",
        VerifyStatus::Unhashed => "unhashed",
    }
}

fn describe_record(record: &VersionRecord) -> String {
    format!("{} ({} bytes)", record.version, record.size)
}

fn record_json(record: &VersionRecord) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

fn records_json(records: &[VersionRecord]) -> Result<Value> {
    Ok(serde_json::to_value(records)?)
}
