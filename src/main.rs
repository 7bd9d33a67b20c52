use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use vecr::engine::{Command, RProcess, Session};
use vecr::import::{
    aggregate_runs, collect_variants, ImportOptions, RunImporter, DEFAULT_SNAPSHOT,
    DEFAULT_SUPER_SNAPSHOT,
};

/// Import OMNeT++ vector files into R workspace snapshots.
#[derive(Parser, Debug)]
#[command(name = "vecr", version, about)]
struct Args {
    /// Vector file to import as a single run
    vec_file: Option<PathBuf>,

    /// Aggregate every run below the current directory into cumulative
    /// frames
    #[arg(short, long)]
    aggregate: bool,

    /// Collect per-variant snapshots into one combined snapshot; with
    /// --aggregate each variant is aggregated first
    #[arg(short, long)]
    collect: bool,

    /// Per-variant snapshot file name
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT)]
    output: String,

    /// Combined snapshot file name written by collection
    #[arg(short = 'O', long, default_value = DEFAULT_SUPER_SNAPSHOT)]
    super_output: String,

    /// Vector indices to import; every other index is ignored
    #[arg(short, long, value_delimiter = ',')]
    filter: Option<Vec<String>>,

    /// Vector indices whose extraction is capped to --size rows
    #[arg(short, long, value_delimiter = ',')]
    restrict: Option<Vec<String>>,

    /// Row cap applied to --restrict vectors; zero means unbounded
    #[arg(short, long, default_value_t = 0)]
    size: usize,

    /// Print progress while importing
    #[arg(short, long)]
    verbose: bool,

    /// Echo every line sent to the engine
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let transport = RProcess::spawn()?;
    let mut session = Session::new(transport, args.debug);
    match run(&args, &mut session) {
        Ok(()) => {
            session.quit()?;
            session.into_transport().wait()
        }
        Err(err) => {
            // There is no reply to correlate a pipe failure with, so the
            // tail of outbound traffic is the diagnostic of record.
            let recent = session.recent();
            if !recent.is_empty() {
                error!("last {} engine commands before failure:", recent.len());
                for line in recent.iter() {
                    error!("  {}", line);
                }
            }
            Err(err)
        }
    }
}

fn run(args: &Args, session: &mut Session<RProcess>) -> Result<()> {
    let opts = ImportOptions {
        filter: args.filter.clone().map(dedup),
        restrict: args.restrict.clone(),
        row_cap: args.size,
        aggregate: args.aggregate,
    };
    let mut importer = RunImporter::new(opts);
    let cwd = std::env::current_dir().context("resolving current directory")?;

    if args.collect {
        collect_variants(
            session,
            &mut importer,
            &cwd,
            &args.output,
            &args.super_output,
        )
    } else if args.aggregate {
        aggregate_runs(session, &mut importer, &cwd, &args.output)
    } else {
        let vec_file = args
            .vec_file
            .as_deref()
            .context("no vector file specified")?;
        importer.import_run(session, vec_file, "0")?;
        session.exec(&[Command::PersistSnapshot {
            file: args.output.clone(),
        }])?;
        info!("saved workspace to {}", args.output);
        Ok(())
    }
}

fn init_logging(args: &Args) {
    let default = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder().with_env_filter(env).init();
}

fn dedup(list: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    list.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
