use std::{io, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use llc_partition_sim::{
    CacheConfig,
    experiments::{
        ExperimentFile, PrivateConfig, clusters_owned_sweep, llc_schemes, llc_size_sweep,
        private_cache_sizes, run_scenarios, with_private,
    },
    report::Report,
    trace::TraceFile,
};
use log::info;

/// Replays memory traces against partitioned last-level cache models.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Trace files of `<hex address> <hex cpu index> <store flag>` records
    #[arg(short, long = "trace", required = true, num_args = 1..)]
    traces: Vec<PathBuf>,

    /// TOML experiment file; the built-in experiments run when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of cores sharing the LLC in the built-in experiments
    #[arg(long, default_value_t = 4)]
    cores: usize,

    /// LLC slice sizes in KiB swept by the built-in experiments
    #[arg(long = "slice-kib", value_delimiter = ',', default_values_t = [512u64, 1024, 2048])]
    slice_kib: Vec<u64>,

    /// Slices (clusters) owned per core in the built-in cluster experiments
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8])]
    owned: Vec<usize>,

    /// Print the parsed trace records and exit
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let traces = load_traces(&args.traces)?;
    info!("Loaded {} trace files.", traces.len());

    if args.dump {
        let mut out = io::stdout().lock();
        for trace in &traces {
            trace.dump(&mut out)?;
        }
        return Ok(());
    }

    let mut report = Report::new(io::stdout().lock());
    match &args.config {
        Some(path) => {
            let experiments = ExperimentFile::load(path)?;
            let results = run_scenarios(&traces, &experiments.scenarios)?;
            report.section(&path.display().to_string(), &results)?;
        }
        None => run_builtin(&traces, &args, &mut report)?,
    }
    Ok(())
}

fn run_builtin(traces: &[TraceFile], args: &Args, report: &mut Report<impl io::Write>) -> Result<()> {
    let llc = CacheConfig::new(1024 * 1024, 16, 64);
    let cores = args.cores;
    if !cores.is_power_of_two() || cores > llc.associativity {
        bail!(
            "--cores must be a power of two no larger than {}, got {cores}",
            llc.associativity
        );
    }
    if let Some(owned) = args.owned.iter().find(|n| !n.is_power_of_two()) {
        bail!("--owned values must be powers of two, got {owned}");
    }
    let slice_sizes: Vec<u64> = args.slice_kib.iter().map(|kib| kib * 1024).collect();

    // Experiment 1: private cache sizes, 4-way with 64 byte blocks
    let private_base = CacheConfig::default();
    let sizes = private_cache_sizes(&private_base, &[16 * 1024, 32 * 1024, 64 * 1024, 128 * 1024]);
    report.section("Multiple private cache sizes", &run_scenarios(traces, &sizes)?)?;

    // Experiment 2: LLC partitioning schemes
    let schemes = llc_schemes(&llc, cores);
    report.section(
        &format!("LLC partitioning, {cores} cores"),
        &run_scenarios(traces, &schemes)?,
    )?;

    // Experiment 3: same schemes behind private L1s
    let private = PrivateConfig {
        cores,
        cache_size: private_base.cache_size,
        associativity: private_base.associativity,
        block_size: private_base.block_size,
    };
    let two_level = with_private(schemes, &private);
    report.section(
        &format!("Two-level hierarchy, {cores} cores"),
        &run_scenarios(traces, &two_level)?,
    )?;

    // Experiment 4: way vs intra-node vs inter/intra over LLC slice sizes
    report.section(
        &format!("LLC slice size sweep, {cores} cores"),
        &run_scenarios(traces, &llc_size_sweep(&llc, cores, &slice_sizes))?,
    )?;

    // Experiment 5: inter-node vs cluster way vs inter/intra per slices owned
    for &owned in &args.owned {
        report.section(
            &format!("{owned} slices owned per core, {cores} cores"),
            &run_scenarios(traces, &clusters_owned_sweep(&llc, cores, owned, &slice_sizes))?,
        )?;
    }
    Ok(())
}

fn load_traces(paths: &[PathBuf]) -> Result<Vec<TraceFile>> {
    let mut traces = Vec::new();
    for path in paths {
        traces.push(TraceFile::load(path).context("Unable to load traces")?);
    }
    Ok(traces)
}
