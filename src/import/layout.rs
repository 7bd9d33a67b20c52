// src/import/layout.rs

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Distinct depths, counted in directory levels below `dir`, at which
/// `.vec` files sit.
fn vec_depths(dir: &Path) -> Result<BTreeSet<usize>> {
    fn walk(dir: &Path, depth: usize, depths: &mut BTreeSet<usize>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("reading directory {}", dir.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("reading directory {}", dir.display()))?;
            let path = entry.path();
            if path.is_dir() {
                walk(&path, depth + 1, depths)?;
            } else if path.extension().map_or(false, |ext| ext == "vec") {
                depths.insert(depth);
            }
        }
        Ok(())
    }
    let mut depths = BTreeSet::new();
    walk(dir, 0, &mut depths)?;
    Ok(depths)
}

/// Whether any `.vec` file exists at any depth below `dir`.
pub fn contains_vec_files(dir: &Path) -> Result<bool> {
    Ok(!vec_depths(dir)?.is_empty())
}

/// A single-variant directory keeps every `.vec` file exactly one
/// directory level below it, one run subdirectory per random seed.
pub fn is_single_variant(dir: &Path) -> Result<bool> {
    let depths = vec_depths(dir)?;
    Ok(depths.len() == 1 && depths.contains(&1))
}

/// Fail with a user-facing diagnostic unless `dir` is single-variant.
pub fn ensure_single_variant(dir: &Path) -> Result<()> {
    let depths = vec_depths(dir)?;
    if depths.is_empty() {
        bail!(
            "cannot aggregate runs when no vec files exist below {}",
            dir.display()
        );
    }
    if depths.len() > 1 || !depths.contains(&1) {
        bail!(
            "cannot aggregate runs when vector files are not one dir level below {}",
            dir.display()
        );
    }
    Ok(())
}

/// Run vector files of a single-variant directory, sorted so import
/// order is stable across platforms.
pub fn run_files(dir: &Path) -> Result<Vec<PathBuf>> {
    sorted_glob(&format!("{}/*/*.vec", dir.display()))
}

/// Per-variant snapshot files one level below `dir`, sorted.
pub fn snapshot_files(dir: &Path, snapshot: &str) -> Result<Vec<PathBuf>> {
    sorted_glob(&format!("{}/*/{}", dir.display(), snapshot))
}

fn sorted_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("globbing {}", pattern))? {
        files.push(entry.with_context(|| format!("walking matches of {}", pattern))?);
    }
    files.sort();
    Ok(files)
}

/// Immediate subdirectories of `dir` qualifying as single-variant, sorted
/// by name. Subdirectories that cannot be inspected are skipped with a
/// warning rather than aborting the whole collection.
pub fn variant_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut variants = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading directory {}", dir.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match is_single_variant(&path) {
            Ok(true) => variants.push(path),
            Ok(false) => {}
            Err(err) => warn!("skipping unreadable directory {}: {:#}", path.display(), err),
        }
    }
    variants.sort();
    Ok(variants)
}

/// Final path component as a printable name.
pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn run_files_are_sorted_one_level_below() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "4/omnetpp.vec");
        touch(&dir, "3/omnetpp.vec");
        touch(&dir, "3/notes.txt");
        let files = run_files(dir.path()).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(rel, vec!["3/omnetpp.vec", "4/omnetpp.vec"]);
    }

    #[test]
    fn single_variant_holds_for_one_level_layouts() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "3/omnetpp.vec");
        touch(&dir, "4/omnetpp.vec");
        assert!(is_single_variant(dir.path()).unwrap());
        ensure_single_variant(dir.path()).unwrap();
    }

    #[test]
    fn missing_vec_files_are_fatal_for_aggregation() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "3/readme.txt");
        let err = ensure_single_variant(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no vec files exist"));
    }

    #[test]
    fn nested_vec_files_are_fatal_for_aggregation() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "deep/3/omnetpp.vec");
        let err = ensure_single_variant(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not one dir level below"));
    }

    #[test]
    fn mixed_depth_vec_files_are_fatal_for_aggregation() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "3/omnetpp.vec");
        touch(&dir, "stray.vec");
        let err = ensure_single_variant(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not one dir level below"));
        assert!(!is_single_variant(dir.path()).unwrap());
    }

    #[test]
    fn variant_dirs_lists_only_single_variant_children() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "beta/1/omnetpp.vec");
        touch(&dir, "alpha/1/omnetpp.vec");
        touch(&dir, "alpha/2/omnetpp.vec");
        touch(&dir, "flat/omnetpp.vec");
        touch(&dir, "empty/readme.txt");
        touch(&dir, "toplevel.txt");
        let variants = variant_dirs(dir.path()).unwrap();
        let names: Vec<_> = variants.iter().map(|v| dir_name(v)).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn snapshot_files_match_only_the_given_name() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "beta/combined.Rdata");
        touch(&dir, "alpha/combined.Rdata");
        touch(&dir, "alpha/other.Rdata");
        let files = snapshot_files(dir.path(), "combined.Rdata").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha/combined.Rdata", "beta/combined.Rdata"]);
    }

    #[test]
    fn contains_vec_files_sees_any_depth() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "a/b/c/omnetpp.vec");
        assert!(contains_vec_files(dir.path()).unwrap());
        let empty = TempDir::new().unwrap();
        assert!(!contains_vec_files(empty.path()).unwrap());
    }
}
