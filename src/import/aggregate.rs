// src/import/aggregate.rs

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use super::layout;
use super::run::RunImporter;
use crate::engine::{Command, Session, Transport};

/// Import every run of a single-variant directory.
///
/// Non-aggregate mode persists one snapshot per run directory as it
/// goes; aggregate mode persists a single cumulative snapshot in the
/// variant directory once every run is in. Either way the workspace is
/// cleared afterwards so the next variant starts clean.
pub fn aggregate_runs<T: Transport>(
    session: &mut Session<T>,
    importer: &mut RunImporter,
    dir: &Path,
    snapshot: &str,
) -> Result<()> {
    importer.reset();
    layout::ensure_single_variant(dir)?;
    info!("aggregating runs of config {}", layout::dir_name(dir));
    for file in layout::run_files(dir)? {
        let run_dir = file.parent().unwrap_or(dir);
        let run = layout::dir_name(run_dir);
        if run == "bad" {
            debug!("skipping quarantined run directory {}", run_dir.display());
            continue;
        }
        debug!("importing {} as run {}", file.display(), run);
        importer.import_run(session, &file, &run)?;
        if !importer.options().aggregate {
            session.exec(&[Command::PersistSnapshot {
                file: run_dir.join(snapshot).display().to_string(),
            }])?;
        }
    }
    if importer.options().aggregate {
        session.exec(&[Command::PersistSnapshot {
            file: dir.join(snapshot).display().to_string(),
        }])?;
    }
    session.exec(&[Command::RemoveAll])?;
    Ok(())
}
