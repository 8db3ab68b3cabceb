use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use datalib_core::{DataLibrary, IndexEntry, LibraryConfig, PutOutcome};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::cli::{CommandGroupCli, GcArgs, GetArgs, ListArgs, PutArgs, VerifyArgs};
use crate::outcome::CommandOutcome;

pub fn dispatch_command(root: Option<&Path>, group: &CommandGroupCli) -> CommandOutcome {
    core_call(|| {
        let config = library_config(root)?;
        tracing::debug!(root = %config.root().display(), "opening library");
        let library = DataLibrary::open(&config)?;
        run(&library, &config, group)
    })
}

fn core_call<F>(action: F) -> CommandOutcome
where
    F: FnOnce() -> anyhow::Result<CommandOutcome>,
{
    match action() {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            CommandOutcome::from_error(&err)
        }
    }
}

fn library_config(root: Option<&Path>) -> anyhow::Result<LibraryConfig> {
    match root {
        Some(root) => Ok(LibraryConfig::from_env()
            .map_or_else(|_| LibraryConfig::with_root(root), |config| {
                config.with_store_root(root)
            })),
        None => LibraryConfig::from_env(),
    }
}

fn run(
    library: &DataLibrary,
    config: &LibraryConfig,
    group: &CommandGroupCli,
) -> anyhow::Result<CommandOutcome> {
    match group {
        CommandGroupCli::Put(args) => put(library, args),
        CommandGroupCli::Get(args) => get(library, args),
        CommandGroupCli::Delete(args) => Ok(match library.delete(&args.name)? {
            Some(removal) => CommandOutcome::success(
                if removal.reclaimed {
                    format!("deleted {} and reclaimed {}", args.name, removal.hash)
                } else {
                    format!(
                        "deleted {} ({} other name(s) still share {})",
                        args.name, removal.remaining, removal.hash
                    )
                },
                json!({ "name": args.name, "removal": removal }),
            ),
            None => CommandOutcome::success(
                format!("nothing to delete; no entry named '{}'", args.name),
                json!({ "name": args.name, "removal": null }),
            ),
        }),
        CommandGroupCli::Info(args) => Ok(match library.info(&args.name)? {
            Some(entry) => {
                let details = entry_json(&entry)?;
                let lines = vec![
                    format!("hash:        {}", entry.hash),
                    format!("size:        {}", entry.size),
                    format!("created_at:  {}", details["created_at"].as_str().unwrap_or("")),
                    format!(
                        "accessed_at: {}",
                        details["accessed_at"].as_str().unwrap_or("never")
                    ),
                ];
                CommandOutcome::success(entry.name.clone(), details).with_lines(lines)
            }
            None => CommandOutcome::not_found(&args.name),
        }),
        CommandGroupCli::Refs(args) => Ok(match library.references(&args.hash)? {
            Some(names) => CommandOutcome::success(
                format!("{} name(s) reference {}", names.len(), args.hash),
                json!({ "hash": args.hash, "names": names }),
            )
            .with_lines(names),
            None => CommandOutcome::user_error(
                format!("no names reference {}", args.hash),
                json!({ "reason": "not_found", "hash": args.hash }),
            ),
        }),
        CommandGroupCli::List(args) => list(library, args),
        CommandGroupCli::Stats => {
            let stats = library.stats()?;
            Ok(CommandOutcome::success(
                format!(
                    "{} name(s), {} blob(s), {} logical byte(s), {} stored",
                    stats.names, stats.blobs, stats.logical_bytes, stats.physical_bytes
                ),
                json!({ "stats": stats }),
            ))
        }
        CommandGroupCli::Verify(args) => verify(library, args),
        CommandGroupCli::Doctor => {
            let summary = library.doctor()?;
            Ok(CommandOutcome::success(
                format!(
                    "doctor removed {} partial(s), {} orphan(s), {} corrupt blob(s); pruned {} name(s)",
                    summary.partials_removed,
                    summary.orphans_removed,
                    summary.corrupt_removed,
                    summary.names_pruned.len()
                ),
                json!({ "summary": summary }),
            )
            .with_lines(summary.names_pruned.clone()))
        }
        CommandGroupCli::Gc(args) => gc(library, config, args),
    }
}

fn put(library: &DataLibrary, args: &PutArgs) -> anyhow::Result<CommandOutcome> {
    let outcome = if args.source.as_os_str() == "-" {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        library.put(&args.name, bytes)?
    } else {
        library.put(&args.name, args.source.as_path())?
    };
    let message = match &outcome {
        PutOutcome::Inserted {
            hash,
            size,
            deduplicated,
        } => {
            let shared = if *deduplicated { ", deduplicated" } else { "" };
            format!("stored {} ({hash}, {size} bytes{shared})", args.name)
        }
        PutOutcome::Unchanged { hash } => format!("{} already holds {hash}", args.name),
        PutOutcome::KeptExisting { existing, .. } => format!(
            "{} is already bound to {existing}; kept the original content",
            args.name
        ),
    };
    Ok(CommandOutcome::success(
        message,
        json!({ "name": args.name, "put": outcome }),
    ))
}

fn get(library: &DataLibrary, args: &GetArgs) -> anyhow::Result<CommandOutcome> {
    let Some(bytes) = library.get(&args.name)? else {
        return Ok(CommandOutcome::not_found(&args.name));
    };
    let size = bytes.len();
    match &args.output {
        Some(path) => {
            fs::write(path, &bytes)?;
            Ok(CommandOutcome::success(
                format!("wrote {} ({size} bytes) to {}", args.name, path.display()),
                json!({ "name": args.name, "size": size, "output": path.display().to_string() }),
            ))
        }
        None => {
            let content = std::str::from_utf8(&bytes).ok().map(str::to_string);
            let details = json!({ "name": args.name, "size": size, "content": content });
            Ok(CommandOutcome::success(args.name.clone(), details).with_passthrough(bytes))
        }
    }
}

fn list(library: &DataLibrary, args: &ListArgs) -> anyhow::Result<CommandOutcome> {
    let entries = library.list(args.prefix.as_deref())?;
    let width = entries.iter().map(|entry| entry.name.len()).max().unwrap_or(0);
    let lines = entries
        .iter()
        .map(|entry| {
            format!(
                "{:<width$}  {:>10}  {}",
                entry.name, entry.size, entry.hash
            )
        })
        .collect();
    let json_entries = entries
        .iter()
        .map(entry_json)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CommandOutcome::success(
        format!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" }),
        json!({ "entries": json_entries }),
    )
    .with_lines(lines))
}

fn verify(library: &DataLibrary, args: &VerifyArgs) -> anyhow::Result<CommandOutcome> {
    if let Some(sample) = args.sample {
        let failures = library.verify_sample(sample)?;
        let details = json!({ "sample": sample, "failures": failures });
        return Ok(if failures.is_empty() {
            CommandOutcome::success(format!("sampled {sample} blob(s); all intact"), details)
        } else {
            CommandOutcome::failure(
                format!("{} sampled blob(s) failed verification", failures.len()),
                details,
            )
            .with_lines(failures)
        });
    }

    let report = library.verify()?;
    let details = json!({ "report": report });
    if report.is_clean() {
        return Ok(CommandOutcome::success(
            format!(
                "library is consistent ({} name(s), {} blob(s))",
                report.names_checked, report.blobs_checked
            ),
            details,
        ));
    }
    let mut lines = Vec::new();
    lines.extend(
        report
            .dangling
            .iter()
            .map(|entry| format!("missing blob: {} -> {}", entry.name, entry.hash)),
    );
    lines.extend(report.corrupt.iter().map(|hash| format!("corrupt blob: {hash}")));
    lines.extend(report.orphans.iter().map(|hash| format!("orphan blob:  {hash}")));
    if report.partials > 0 {
        lines.push(format!("partial writes: {}", report.partials));
    }
    lines.push("run `datalib doctor` to repair".to_string());
    Ok(CommandOutcome::failure("library has inconsistencies", details).with_lines(lines))
}

fn gc(
    library: &DataLibrary,
    config: &LibraryConfig,
    args: &GcArgs,
) -> anyhow::Result<CommandOutcome> {
    let grace = args
        .grace_secs
        .map_or_else(|| config.orphan_grace(), Duration::from_secs);
    let summary = library.sweep_orphans(grace)?;
    Ok(CommandOutcome::success(
        format!(
            "reclaimed {} of {} blob(s) ({} bytes)",
            summary.reclaimed, summary.scanned, summary.reclaimed_bytes
        ),
        json!({ "grace_secs": grace.as_secs(), "summary": summary }),
    ))
}

fn entry_json(entry: &IndexEntry) -> anyhow::Result<Value> {
    Ok(json!({
        "name": entry.name,
        "hash": entry.hash,
        "size": entry.size,
        "created_at": rfc3339(entry.created_at)?,
        "accessed_at": entry.accessed_at.map(rfc3339).transpose()?,
    }))
}

fn rfc3339(at: OffsetDateTime) -> anyhow::Result<String> {
    Ok(at.format(&Rfc3339)?)
}
