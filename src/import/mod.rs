// src/import/mod.rs

pub mod aggregate;
pub mod collect;
pub mod layout;
pub mod run;

pub use aggregate::aggregate_runs;
pub use collect::collect_variants;
pub use run::RunImporter;

/// Prefix of cumulative per-vector frames built while aggregating runs.
pub const AGG_PREFIX: &str = "a.";

/// Prefix of combined frames built while collecting variants.
pub const COMBINED_PREFIX: &str = "s.";

/// Default per-variant snapshot file name.
pub const DEFAULT_SNAPSHOT: &str = "combined.Rdata";

/// Default combined snapshot file name written by variant collection.
pub const DEFAULT_SUPER_SNAPSHOT: &str = "superCombined.Rdata";

/// Knobs shared by every import mode.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Allow-list of vector indices. `None` imports every vector; indices
    /// listed here but absent from a file are silently skipped.
    pub filter: Option<Vec<String>>,
    /// Vector indices whose extraction is capped to `row_cap` rows.
    pub restrict: Option<Vec<String>>,
    /// Row cap paired with `restrict`. Zero means unbounded.
    pub row_cap: usize,
    /// Fold every run's frames into cumulative `a.`-prefixed frames.
    pub aggregate: bool,
}
