//! Command-line interface
//!
//! `orbit-sweep run` executes a sweep; the other subcommands inspect what a
//! sweep produced.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use crate::config::{parse_int_list, parse_modalities, positive_seconds, SweepConfig};
use crate::invoker::{InvocationTemplate, ProcessInvoker, TrainerInvoker};
use crate::monitor::{format_utilization, NvidiaSmiProbe, UtilizationProbe};
use crate::sink::{dedup, format_record, read_records, FileSink, KeepPolicy, ResultsSink};
use crate::summary::{format_table, summarize};
use crate::sweep::{FailurePolicy, SweepDriver, SweepOrdering, SweepResult};
use crate::tracking::{TrackingSink, TrackingStore};
use crate::Error;

/// Parameter-sweep benchmarking harness for simulator training runs
#[derive(Debug, Parser)]
#[command(name = "orbit-sweep", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a sweep, appending one line per successful point to the results file
    Run(SweepArgs),

    /// Print the planned invocations without running them
    Plan(SweepArgs),

    /// Summarize durations per modality and environment count
    Summarize {
        /// Results file to read
        results: PathBuf,
        /// Occurrence kept when a point was recorded more than once
        #[arg(long, default_value_t = KeepPolicy::First)]
        keep: KeepPolicy,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Drop repeated points from a results file
    Dedup {
        /// Results file to read
        results: PathBuf,
        /// Occurrence kept when a point was recorded more than once
        #[arg(long, default_value_t = KeepPolicy::First)]
        keep: KeepPolicy,
        /// Write here instead of stdout (must not be the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print accelerator utilization periodically
    Monitor {
        /// Seconds between readings
        #[arg(long, default_value_t = 10.0)]
        interval: f64,
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration: Option<f64>,
        /// nvidia-smi binary
        #[arg(long, default_value = "nvidia-smi")]
        nvidia_smi: String,
    },

    /// Derive max_<metric> values from recorded metric histories
    Backfill {
        /// Tracking store written by `run --tracking`
        tracking: PathBuf,
        /// Metric key to backfill (repeatable)
        #[arg(long = "metric", required = true)]
        metrics: Vec<String>,
    },
}

/// Options shared by `run` and `plan`; each overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SweepArgs {
    /// Sweep config file (TOML)
    #[arg(short, long, env = "ORBIT_SWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment counts, e.g. `1,2,4` or `1..=512*2`
    #[arg(long)]
    pub num_envs: Option<String>,

    /// Modalities, e.g. `state,visual`
    #[arg(long)]
    pub modalities: Option<String>,

    /// Seeds, e.g. `0..5`
    #[arg(long)]
    pub seeds: Option<String>,

    /// Loop nesting: modality-major or seed-major
    #[arg(long)]
    pub ordering: Option<SweepOrdering>,

    /// Reaction to a failed run: abort-sub-sweep, continue, or abort-sweep
    #[arg(long)]
    pub on_failure: Option<FailurePolicy>,

    /// Results file (appended to)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tracking store (JSON) recording runs and system metrics
    #[arg(long)]
    pub tracking: Option<PathBuf>,

    /// Kill a trainer run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Sample accelerator utilization every N seconds during each run
    #[arg(long)]
    pub monitor_interval: Option<f64>,

    /// Trainer program and arguments, with {task} {num_envs} {seed} {modality} placeholders
    #[arg(last = true)]
    pub trainer: Vec<String>,
}

impl SweepArgs {
    /// Load the config file (or defaults), apply flag overrides, and validate.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unreadable files, malformed lists,
    /// or an invalid resulting sweep.
    pub fn resolve(&self) -> crate::Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };

        if let Some(list) = &self.num_envs {
            config.sweep.environment_counts = parse_int_list(list)?
                .into_iter()
                .map(|n| {
                    u32::try_from(n)
                        .map_err(|_| Error::Config(format!("environment count {n} is too large")))
                })
                .collect::<crate::Result<_>>()?;
        }
        if let Some(list) = &self.modalities {
            config.sweep.modalities = parse_modalities(list)?;
        }
        if let Some(list) = &self.seeds {
            config.sweep.seeds = parse_int_list(list)?;
        }
        if let Some(ordering) = self.ordering {
            config.sweep.ordering = ordering;
        }
        if let Some(policy) = self.on_failure {
            config.sweep.on_failure = policy;
        }
        if let Some(output) = &self.output {
            config.output.results.clone_from(output);
        }
        if self.tracking.is_some() {
            config.output.tracking.clone_from(&self.tracking);
        }
        if self.timeout.is_some() {
            config.trainer.timeout_secs = self.timeout;
        }
        if self.monitor_interval.is_some() {
            config.monitor.interval_secs = self.monitor_interval;
        }
        if let Some((program, args)) = self.trainer.split_first() {
            config.trainer.program.clone_from(program);
            config.trainer.args = args.to_vec();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns any fatal error; non-fatal trainer failures during `run` are
/// logged and do not produce an error.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run_sweep(&args),
        Command::Plan(args) => print_plan(&args),
        Command::Summarize {
            results,
            keep,
            json,
        } => print_summary(&results, keep, json),
        Command::Dedup {
            results,
            keep,
            output,
        } => dedup_results(&results, keep, output.as_deref()),
        Command::Monitor {
            interval,
            duration,
            nvidia_smi,
        } => monitor(NvidiaSmiProbe::with_program(nvidia_smi), interval, duration),
        Command::Backfill { tracking, metrics } => backfill(&tracking, &metrics),
    }
}

fn run_sweep(args: &SweepArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let plan = config.plan()?;
    let template = config.command_template()?;

    let file = FileSink::open(&config.output.results)?;
    let sink: Box<dyn ResultsSink> = match &config.output.tracking {
        Some(path) => {
            let tracking = TrackingSink::open(path, &config.experiment)
                .with_context(|| format!("loading tracking store {}", path.display()))?
                .with_config(serde_json::to_value(&config)?);
            Box::new((file, tracking))
        }
        None => Box::new(file),
    };

    let mut process = ProcessInvoker::new();
    if let Some(timeout) = config.timeout() {
        process = process.with_timeout(timeout);
    }
    let invoker: Box<dyn TrainerInvoker> = match config.monitor_interval() {
        Some(interval) => Box::new(process.with_monitor(NvidiaSmiProbe::new(), interval)),
        None => Box::new(process),
    };

    let report = SweepDriver::new(invoker, sink)
        .with_failure_policy(config.sweep.on_failure)
        .run(&plan, &template)?;

    for failure in report.failures() {
        tracing::warn!(point = %failure.point(), "re-run with: {}", failure.command());
    }
    tracing::info!(
        results = %config.output.results.display(),
        recorded = report.succeeded(),
        failed = report.failures().len(),
        skipped = report.skipped(),
        "done"
    );
    Ok(())
}

fn print_plan(args: &SweepArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let plan = config.plan()?;
    let template = config.command_template()?;

    println!(
        "# {} points, {} ordering, on failure: {}",
        plan.len(),
        plan.ordering(),
        config.sweep.on_failure
    );
    let mut index = 0;
    for sub_sweep in plan.sub_sweeps() {
        println!();
        for point in sub_sweep {
            index += 1;
            println!("{index:>5}  {}", template.resolve(point));
        }
    }
    Ok(())
}

fn load_results(path: &Path) -> anyhow::Result<Vec<SweepResult>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_records(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

fn print_summary(path: &Path, keep: KeepPolicy, json: bool) -> anyhow::Result<()> {
    let records = dedup(load_results(path)?, keep);
    let summaries = summarize(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", format_table(&summaries));
    }
    Ok(())
}

fn dedup_results(path: &Path, keep: KeepPolicy, output: Option<&Path>) -> anyhow::Result<()> {
    if let Some(out) = output {
        if same_file(path, out) {
            bail!(Error::Config(format!(
                "--output {} is the results file itself; results files are append-only",
                out.display()
            )));
        }
    }

    let records = load_results(path)?;
    let before = records.len();
    let kept = dedup(records, keep);

    let mut text = String::new();
    for record in &kept {
        text.push_str(&format_record(record));
        text.push('\n');
    }

    match output {
        Some(out) => {
            let tmp = out.with_extension("dedup.tmp");
            fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
            fs::rename(&tmp, out).with_context(|| format!("replacing {}", out.display()))?;
            tracing::info!(kept = kept.len(), dropped = before - kept.len(), "de-duplicated");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn monitor<P: UtilizationProbe>(
    mut probe: P,
    interval: f64,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let interval = positive_seconds("--interval", interval)?;
    let deadline = match duration {
        Some(secs) => {
            let limit = Duration::try_from_secs_f64(secs).map_err(|e| {
                Error::Config(format!("--duration must be non-negative seconds (found {secs}): {e}"))
            })?;
            // Past the representable range means no deadline at all
            Instant::now().checked_add(limit)
        }
        None => None,
    };

    loop {
        match probe.sample() {
            Ok(samples) => print!("{}", format_utilization(&samples)),
            Err(e) => tracing::warn!(error = %e, "utilization unavailable"),
        }
        let past_deadline = deadline.is_some_and(|d| {
            Instant::now()
                .checked_add(interval)
                .map_or(true, |next| next > d)
        });
        if past_deadline {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

fn backfill(path: &Path, metrics: &[String]) -> anyhow::Result<()> {
    let mut store = TrackingStore::load(path)
        .with_context(|| format!("loading tracking store {}", path.display()))?;
    let keys: Vec<&str> = metrics.iter().map(String::as_str).collect();

    let logged = store.backfill_peaks(&keys);
    for sample in &logged {
        println!("{} {}: {}", sample.run_id(), sample.key(), sample.value());
    }
    store.save(path)?;
    tracing::info!(runs = store.run_count(), backfilled = logged.len(), "backfill complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::Modality;

    #[test]
    fn test_cli_parses_run_with_trainer() {
        let cli = Cli::try_parse_from([
            "orbit-sweep",
            "run",
            "--num-envs",
            "1,2",
            "--ordering",
            "seed-major",
            "--",
            "./trainer",
            "--seed",
            "{seed}",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.sweep.environment_counts, vec![1, 2]);
        assert_eq!(config.sweep.ordering, SweepOrdering::SeedMajor);
        assert_eq!(config.trainer.program, "./trainer");
        assert_eq!(config.trainer.args, vec!["--seed", "{seed}"]);
    }

    #[test]
    fn test_resolve_rejects_unknown_modality() {
        let args = SweepArgs {
            modalities: Some("lidar".to_string()),
            ..SweepArgs::default()
        };
        assert!(args.resolve().unwrap_err().is_config());
    }

    #[test]
    fn test_resolve_overrides_modalities() {
        let args = SweepArgs {
            modalities: Some("visual".to_string()),
            seeds: Some("0..2".to_string()),
            ..SweepArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.sweep.modalities, vec![Modality::Visual]);
        assert_eq!(config.sweep.seeds, vec![0, 1]);
    }

    #[test]
    fn test_cli_parses_summarize() {
        let cli =
            Cli::try_parse_from(["orbit-sweep", "summarize", "out.txt", "--keep", "last"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Summarize {
                keep: KeepPolicy::Last,
                json: false,
                ..
            }
        ));
    }
}
