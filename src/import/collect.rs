// src/import/collect.rs

use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use super::aggregate::aggregate_runs;
use super::layout;
use super::run::RunImporter;
use super::{AGG_PREFIX, COMBINED_PREFIX};
use crate::engine::{Command, Session, Transport};

/// Merge every variant's cumulative snapshot into one combined snapshot.
///
/// With aggregation on, each qualifying variant directory is aggregated
/// first. Every cumulative frame found in a variant snapshot is tagged
/// with the variant's name in its `scheme` column, then row-unioned into
/// a combined `s.`-prefixed frame. The combined snapshot is persisted
/// after each merge, so an interrupted collection loses at most one
/// frame's worth of work.
pub fn collect_variants<T: Transport>(
    session: &mut Session<T>,
    importer: &mut RunImporter,
    dir: &Path,
    snapshot: &str,
    super_snapshot: &str,
) -> Result<()> {
    let aggregate = importer.options().aggregate;
    if aggregate && !layout::contains_vec_files(dir)? {
        bail!(
            "cannot aggregate runs when no vec files exist below {}",
            dir.display()
        );
    }

    let variants = layout::variant_dirs(dir)?;
    let variant_names: BTreeSet<String> =
        variants.iter().map(|v| layout::dir_name(v)).collect();
    if !variant_names.is_empty() {
        info!(
            "configs found: {}",
            variant_names.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    if aggregate {
        for variant in &variants {
            aggregate_runs(session, importer, variant, snapshot)?;
        }
    }

    let snapshots = layout::snapshot_files(dir, snapshot)?;
    if snapshots.is_empty() {
        bail!(
            "not even one file named {} was found below {} when collecting variants; \
             name the per-variant snapshot with --output",
            snapshot,
            dir.display()
        );
    }

    let frame_pattern = format!("^{}.+", AGG_PREFIX.replace('.', "[.]"));
    let super_out = dir.join(super_snapshot).display().to_string();
    let mut done: BTreeSet<String> = BTreeSet::new();
    for snap in snapshots {
        let config = layout::dir_name(snap.parent().unwrap_or(dir));
        if aggregate && !variant_names.is_empty() && !variant_names.contains(&config) {
            warn!("unknown config dir {} was never aggregated", config);
        }
        session.exec(&[Command::LoadSnapshot {
            file: snap.display().to_string(),
        }])?;
        for frame in session.list_matching_names(&frame_pattern)? {
            let base = frame.strip_prefix(AGG_PREFIX).unwrap_or(&frame);
            let combined = format!("{}{}", COMBINED_PREFIX, base);
            let mut batch = vec![Command::TagConfig {
                frame: frame.clone(),
                config: config.clone(),
            }];
            if done.contains(&frame) {
                batch.push(Command::RowUnion {
                    dest: combined,
                    src: frame.clone(),
                });
            } else {
                batch.push(Command::Assign {
                    dest: combined,
                    src: frame.clone(),
                });
                done.insert(frame.clone());
            }
            batch.push(Command::Remove {
                names: vec![frame.clone()],
            });
            batch.push(Command::PersistSnapshot {
                file: super_out.clone(),
            });
            session.exec(&batch)?;
        }
    }
    Ok(())
}
