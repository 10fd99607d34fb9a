// Stowage: backups for container data volumes.
// Copyright 2026 Stowage contributors.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Command-line entry point for Stowage backups.

use std::error::Error as _;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thousands::Separable;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn, Level};

use stowage::monitor::log::LogMonitor;
use stowage::*;

mod log;

use crate::log::{enable_tracing, TraceTimeStyle};

#[derive(Debug, Parser)]
#[command(author, about, version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Deployment configuration file.
    #[arg(long, short)]
    config: PathBuf,

    /// Break a lock left behind by an interrupted run, then run the command.
    #[arg(long, global = true)]
    break_lock: bool,

    /// Show debug trace on stderr.
    #[arg(long, short = 'D', global = true)]
    debug: bool,

    /// Control timestamps prefixes on stderr.
    #[arg(long, value_enum, global = true, default_value_t = TraceTimeStyle::None)]
    trace_time: TraceTimeStyle,

    /// Append a json formatted log to this file.
    #[arg(long, global = true)]
    log_json: Option<PathBuf>,

    /// Print results as json on stdout.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Back up the configuration tree and volumes.
    Backup {
        /// Kind of backup to make.
        #[arg(value_enum)]
        backup_type: BackupType,
        /// Use this id rather than generating one.
        #[arg(long)]
        id: Option<BackupId>,
        /// Parent full backup of an incremental; by default the most recent.
        #[arg(long)]
        parent: Option<BackupId>,
        /// Verify checksums once the backup is written.
        #[arg(long)]
        verify: bool,
    },

    /// List backups, including incomplete and damaged ones.
    List,

    /// Delete backups of one type older than a retention window.
    ///
    /// Full backups that incremental backups still depend on are kept.
    Prune {
        #[arg(value_enum)]
        backup_type: BackupType,
        /// Retention window in days; by default taken from the configuration.
        ///
        /// Required when the configuration sets this type's retention to 0.
        #[arg(long)]
        days: Option<u32>,
        /// Show what would be deleted without deleting it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Restore a backup onto the live volumes and configuration tree.
    Restore {
        id: BackupId,
        /// Restore only this component, as `config` or `volume:<name>`. May be repeated.
        #[arg(long, short = 'C')]
        component: Vec<Component>,
        /// Overwrite destinations that already hold data, and restore archives
        /// that fail their checksum.
        #[arg(long, short)]
        force: bool,
        /// Show which archive would supply each component, without restoring.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a backup's archives against their checksums.
    Verify { id: BackupId },
}

enum ExitCode {
    Success = 0,
    Failure = 1,
    NonFatalErrors = 2,
}

impl std::process::Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        (self as u8).into()
    }
}

/// Print a result either as json or as text.
fn show<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::from)?;
        writeln!(stdout)?;
    } else {
        text(&mut stdout)?;
    }
    Ok(())
}

fn format_time(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_else(|_| t.to_string())
}

impl Command {
    fn run(&self, engine: &Engine, json: bool) -> Result<ExitCode> {
        let clean = match self {
            Command::Backup {
                backup_type,
                id,
                parent,
                verify,
            } => {
                let outcome = match backup_type {
                    BackupType::Full => {
                        if parent.is_some() {
                            return Err(Error::InvalidConfig {
                                details: "--parent is only meaningful for incremental backups"
                                    .to_owned(),
                            });
                        }
                        engine.create_full(id.clone(), *verify)?
                    }
                    BackupType::Incremental => {
                        engine.create_incremental(id.clone(), parent.clone(), *verify)?
                    }
                };
                show(json, &outcome, |out| {
                    writeln!(out, "{}", outcome.id)?;
                    for archived in &outcome.archived {
                        writeln!(
                            out,
                            "  archived  {:<24} {} bytes",
                            archived.component.to_string(),
                            archived.stats.archive_bytes.separate_with_commas()
                        )?;
                    }
                    for component in &outcome.unchanged {
                        writeln!(out, "  unchanged {component}")?;
                    }
                    for failure in &outcome.failed {
                        writeln!(
                            out,
                            "  FAILED    {:<24} {}",
                            failure.component.to_string(),
                            error_chain_message(&failure.error)
                        )?;
                    }
                    Ok(())
                })?;
                outcome.is_clean()
            }
            Command::List => {
                let inventory = engine.list()?;
                show(json, &inventory, |out| {
                    for record in &inventory.records {
                        write!(
                            out,
                            "{:<32} {:<11} {}",
                            record.id.to_string(),
                            record.backup_type.to_string(),
                            format_time(record.timestamp),
                        )?;
                        if let Some(parent) = &record.parent {
                            write!(out, " parent={parent}")?;
                        }
                        if record.verified {
                            write!(out, " verified")?;
                        }
                        writeln!(out)?;
                    }
                    for incomplete in &inventory.incomplete {
                        writeln!(
                            out,
                            "{:<32} {:<11} incomplete",
                            incomplete.name, incomplete.backup_type
                        )?;
                    }
                    for damaged in &inventory.damaged {
                        writeln!(
                            out,
                            "{:<32} {:<11} damaged: {}",
                            damaged.name, damaged.backup_type, damaged.message
                        )?;
                    }
                    Ok(())
                })?;
                inventory.damaged.is_empty()
            }
            Command::Prune {
                backup_type,
                days,
                dry_run,
            } => {
                let Some(days) =
                    days.or_else(|| engine.config().retention.days(*backup_type))
                else {
                    return Err(Error::InvalidConfig {
                        details: format!(
                            "retention of {backup_type} backups is disabled; \
                             give --days to prune them anyway"
                        ),
                    });
                };
                let report = engine.prune_with_options(
                    *backup_type,
                    days,
                    &PruneOptions { dry_run: *dry_run },
                )?;
                show(json, &report, |out| {
                    let verb = if report.dry_run { "would delete" } else { "deleted" };
                    for id in &report.deleted {
                        writeln!(out, "{verb} {id}")?;
                    }
                    for retained in &report.retained {
                        writeln!(out, "kept {} ({:?})", retained.id, retained.reason)?;
                    }
                    for failure in &report.failed {
                        writeln!(out, "FAILED {}: {}", failure.id, failure.message)?;
                    }
                    Ok(())
                })?;
                report.failed.is_empty()
            }
            Command::Restore {
                id,
                component,
                force,
                dry_run,
            } => {
                let components = (!component.is_empty()).then(|| component.clone());
                if *dry_run {
                    let plan = plan_restore(engine.repository(), id, components.as_deref())?;
                    show(json, &plan, |out| {
                        for planned in &plan.components {
                            match &planned.source {
                                Some(source) => writeln!(
                                    out,
                                    "{:<24} from {} {:?}",
                                    planned.component.to_string(),
                                    source.backup_id,
                                    source.archive
                                )?,
                                None => writeln!(
                                    out,
                                    "{:<24} not available",
                                    planned.component.to_string()
                                )?,
                            }
                        }
                        Ok(())
                    })?;
                    plan.components.iter().all(|p| p.source.is_some())
                } else {
                    let report = engine.restore(id, components, *force)?;
                    show(json, &report, |out| {
                        for restored in &report.restored {
                            writeln!(
                                out,
                                "restored {:<24} from {}",
                                restored.component.to_string(),
                                restored.source.backup_id
                            )?;
                        }
                        for skipped in &report.skipped {
                            writeln!(
                                out,
                                "skipped  {:<24} {}",
                                skipped.component.to_string(),
                                skipped.message
                            )?;
                        }
                        for failure in &report.failed {
                            writeln!(
                                out,
                                "FAILED   {:<24} {}",
                                failure.component.to_string(),
                                error_chain_message(&failure.error)
                            )?;
                        }
                        Ok(())
                    })?;
                    report.is_complete()
                }
            }
            Command::Verify { id } => {
                let report = engine.verify(id)?;
                show(json, &report, |out| {
                    for artifact in &report.artifacts {
                        writeln!(
                            out,
                            "{:<24} {:?}",
                            artifact.component.to_string(),
                            artifact.status
                        )?;
                    }
                    writeln!(
                        out,
                        "{}",
                        if report.verified { "verified" } else { "DAMAGED" }
                    )
                })?;
                report.verified
            }
        };
        Ok(if clean {
            ExitCode::Success
        } else {
            ExitCode::NonFatalErrors
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let start_time = Instant::now();
    let trace_level = if args.debug {
        Level::TRACE
    } else {
        Level::INFO
    };
    let json_log = args.log_json.as_deref();
    let _flush_tracing = match enable_tracing(&args.trace_time, trace_level, json_log) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to open json log {:?}: {err}", args.log_json);
            return ExitCode::Failure;
        }
    };
    let monitor = Arc::new(LogMonitor::new());
    let result = Config::load(&args.config)
        .and_then(|config| Engine::new(config, monitor.clone()))
        .and_then(|engine| {
            if args.break_lock {
                engine.break_lock()?;
            }
            args.command.run(&engine, args.json)
        });
    monitor.log_counters();
    debug!(elapsed = ?start_time.elapsed());
    match result {
        Err(err) => {
            error!(category = %err.category(), "{err}");
            let mut cause = err.source();
            while let Some(source) = cause {
                error!("caused by: {source}");
                cause = source.source();
            }
            ExitCode::Failure
        }
        Ok(exit_code) => exit_code,
    }
}

#[test]
fn verify_clap() {
    use clap::CommandFactory;
    Args::command().debug_assert()
}
