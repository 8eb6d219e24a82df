use color_eyre::Result;
use serde_json::Value;

use crate::cli::BvCli;
use crate::outcome::{CommandStatus, HumanOutput, Outcome};

const HASH_PREVIEW: usize = 12;

/// Print `outcome` and return the process exit code.
pub fn emit(cli: &BvCli, outcome: &Outcome) -> Result<i32> {
    let code = outcome.status.exit_code();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
        return Ok(code);
    }

    if outcome.status != CommandStatus::Ok {
        eprintln!("{}", outcome.status_line());
        if let Some(hint) = outcome.hint() {
            eprintln!("Hint: {hint}");
        }
        return Ok(code);
    }
    if cli.quiet {
        return Ok(code);
    }
    match outcome.human {
        HumanOutput::Silent => {}
        HumanOutput::Raw => print!("{}", with_trailing_newline(&outcome.message)),
        HumanOutput::Status => {
            println!("{}", outcome.status_line());
            if let Some(table) = render_versions_table(&outcome.details) {
                println!("{table}");
            }
        }
    }
    Ok(code)
}

fn with_trailing_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

struct VersionRow {
    version: String,
    size: String,
    uploaded_at: String,
    hash: String,
}

fn render_versions_table(details: &Value) -> Option<String> {
    let versions = details.get("versions")?.as_array()?;
    if versions.is_empty() {
        return None;
    }
    let mut rows = Vec::with_capacity(versions.len());
    for entry in versions {
        let hash = entry
            .get("hash")
            .and_then(Value::as_str)
            .map_or_else(|| "-".to_string(), |h| h.chars().take(HASH_PREVIEW).collect());
        rows.push(VersionRow {
            version: entry.get("version")?.as_str()?.to_string(),
            size: entry.get("size")?.as_u64()?.to_string(),
            uploaded_at: entry.get("uploaded_at")?.as_str()?.to_string(),
            hash,
        });
    }
    Some(format_versions_table(&rows))
}

fn format_versions_table(rows: &[VersionRow]) -> String {
    let headers = ["Version", "Size", "Uploaded", "Hash"];
    let mut widths = headers.map(str::len);
    for row in rows {
        widths[0] = widths[0].max(row.version.len());
        widths[1] = widths[1].max(row.size.len());
        widths[2] = widths[2].max(row.uploaded_at.len());
        widths[3] = widths[3].max(row.hash.len());
    }

    let line = |cells: [&str; 4]| {
        format!(
            "{:<w0$}  {:>w1$}  {:<w2$}  {:<w3$}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        )
        .trim_end()
        .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(line([
            row.version.as_str(),
            row.size.as_str(),
            row.uploaded_at.as_str(),
            row.hash.as_str(),
        ]));
    }
    lines.join("\n")
}
