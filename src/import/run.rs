// src/import/run.rs

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use super::{ImportOptions, AGG_PREFIX};
use crate::engine::{Command, Session, Transport};
use crate::vecfile;

/// Imports one `.vec` file per call, folding repeated vectors into
/// cumulative frames when aggregation is on.
///
/// The importer remembers which vectors already own a cumulative frame,
/// so the first run of a vector assigns `a.<name>` and every later run
/// row-unions onto it.
pub struct RunImporter {
    opts: ImportOptions,
    started: BTreeSet<String>,
}

impl RunImporter {
    pub fn new(opts: ImportOptions) -> Self {
        RunImporter {
            opts,
            started: BTreeSet::new(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.opts
    }

    /// Forget which cumulative frames exist. Called between variants so
    /// one variant's frames never absorb another variant's runs.
    pub fn reset(&mut self) {
        self.started.clear();
    }

    /// Import every selected vector of `vec_file`, tagging rows with `run`.
    ///
    /// Each vector becomes a one-run frame named `<safe>.<run>` whose
    /// value column is the safe label without its index suffix. With
    /// aggregation on the frame is folded into `a.<safe>` and removed;
    /// otherwise it stays in the workspace for the caller to persist.
    pub fn import_run<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        vec_file: &Path,
        run: &str,
    ) -> Result<()> {
        let labels = vecfile::read_labels_suffixed(vec_file)?;
        let safe = session
            .sanitize_names(&labels)
            .with_context(|| format!("sanitizing column names for {}", vec_file.display()))?;

        let mut imported = 0usize;
        for (index, name) in &safe {
            if let Some(filter) = &self.opts.filter {
                // Indices named in the filter but absent from this file
                // are skipped silently, not an error.
                if !filter.contains(index) {
                    continue;
                }
            }
            let limit = match &self.opts.restrict {
                Some(restrict) if restrict.contains(index) => self.opts.row_cap,
                _ => 0,
            };
            let column = strip_index_suffix(name).to_string();
            let frame = format!("{}.{}", name, run);
            let mut batch = vec![
                Command::ExtractRows {
                    index: index.clone(),
                    file: vec_file.display().to_string(),
                    column: column.clone(),
                    limit,
                },
                Command::BindTable {
                    frame: frame.clone(),
                    run: run.to_string(),
                    column,
                },
            ];
            if self.opts.aggregate {
                let agg = format!("{}{}", AGG_PREFIX, name);
                if self.started.contains(index) {
                    batch.push(Command::RowUnion {
                        dest: agg,
                        src: frame.clone(),
                    });
                } else {
                    batch.push(Command::Assign {
                        dest: agg,
                        src: frame.clone(),
                    });
                    self.started.insert(index.clone());
                }
                batch.push(Command::Remove { names: vec![frame] });
            }
            session.exec(&batch)?;
            imported += 1;
        }
        if imported > 0 {
            session.exec(&[Command::Remove {
                names: vec!["tempscan".to_string(), "p".to_string()],
            }])?;
        }
        debug!(
            "imported {} vectors from {} as run {}",
            imported,
            vec_file.display(),
            run
        );
        Ok(())
    }
}

/// Strip one trailing `.<digits>` group, turning a suffixed frame label
/// back into its column name.
fn strip_index_suffix(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot)
            if dot + 1 < name.len()
                && name[dot + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &name[..dot]
        }
        _ => name,
    }
}
