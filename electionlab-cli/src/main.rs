//! ElectionLab CLI: run elections, flip analyses, ensembles and trends.
//!
//! Commands:
//! - `single`: one election, print the winner-first ranking
//! - `flips`: leave-one-out flip analysis of one electorate
//! - `ensemble`: many independent flip analyses, print the rank histogram
//! - `trend`: one ensemble per point while a constraint is swept
//!
//! Every command takes either `--config <toml>` or `--preset <name>`.
//! Logging goes through `env_logger`; `RUST_LOG` wins over `-v`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use electionlab_core::{ElectionEngine, PipelinePreset, VoterPredicate};
use electionlab_runner::export::{
    export_histogram_csv, export_json, export_trend_csv, write_file,
};
use electionlab_runner::{
    linear_sweep, Artifact, ElectionTrend, EnsembleResult, Report, SimulationConfig, TrendConfig,
    TrendPoint,
};

#[derive(Parser)]
#[command(
    name = "electionlab",
    about = "ElectionLab CLI: preferential voting simulation and sensitivity analysis"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Path to a TOML simulation config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named pipeline: majority, runoff, borda.
    #[arg(long)]
    preset: Option<PipelinePreset>,

    /// Override the number of candidates.
    #[arg(long)]
    candidates: Option<u32>,

    /// Override the number of voters.
    #[arg(long)]
    people: Option<usize>,

    /// Override the master seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct Output {
    /// Write the rank histogram as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the full result as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one election and print the winner-first ranking.
    Single {
        #[command(flatten)]
        source: Source,

        /// Write the ranking as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Count how often removing one losing candidate changes the winner.
    Flips {
        #[command(flatten)]
        source: Source,

        /// Write the flip result as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run many independent flip analyses.
    Ensemble {
        #[command(flatten)]
        source: Source,

        /// Override the number of trials.
        #[arg(long)]
        trials: Option<usize>,

        #[command(flatten)]
        output: Output,
    },
    /// Sweep the share of voters ranking one candidate first.
    Trend {
        #[command(flatten)]
        source: Source,

        /// Candidate whose first-choice share is swept (ignored with a [trend] section).
        #[arg(long, default_value_t = 0)]
        candidate: u32,

        /// Number of trend points.
        #[arg(long)]
        points: Option<usize>,

        /// Trials per point.
        #[arg(long)]
        trials: Option<usize>,

        #[command(flatten)]
        output: Output,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Single { source, json } => run_single(&source, json.as_deref()),
        Commands::Flips { source, json } => run_flips(&source, json.as_deref()),
        Commands::Ensemble {
            source,
            trials,
            output,
        } => run_ensemble(&source, trials, &output),
        Commands::Trend {
            source,
            candidate,
            points,
            trials,
            output,
        } => run_trend(&source, candidate, points, trials, &output),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

// ─── Config resolution ──────────────────────────────────────────────

fn load_config(source: &Source) -> Result<SimulationConfig> {
    let mut config = match (&source.config, source.preset) {
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
        (None, None) => bail!("one of --config or --preset is required"),
        (Some(path), None) => SimulationConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(preset)) => SimulationConfig::from_preset(preset),
    };
    if let Some(candidates) = source.candidates {
        config.election.candidates = candidates;
    }
    if let Some(people) = source.people {
        config.election.people = people;
    }
    if let Some(seed) = source.seed {
        config.election.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(config: &SimulationConfig) -> Result<ElectionEngine> {
    let engine = config.build_engine()?;
    info!(
        "engine: {} candidates, {} people, seed {}, {} steps",
        engine.number_of_candidates(),
        engine.number_of_people(),
        engine.seed(),
        engine.steps().len()
    );
    Ok(engine)
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_single(source: &Source, json: Option<&Path>) -> Result<()> {
    let config = load_config(source)?;
    let ranking = build_engine(&config)?.run_single_election()?;

    println!("{:>6}  {:>10}  {:>8}", "place", "candidate", "score");
    for (place, r) in ranking.iter().enumerate() {
        println!("{:>6}  {:>10}  {:>8}", place + 1, r.candidate, r.ranking);
    }

    if let Some(path) = json {
        write_file(path, &serde_json::to_string_pretty(&ranking)?)?;
        println!("Ranking saved to: {}", path.display());
    }
    Ok(())
}

fn run_flips(source: &Source, json: Option<&Path>) -> Result<()> {
    let config = load_config(source)?;
    let result = build_engine(&config)?.run_election()?;

    match result.winner() {
        Some(winner) => println!("Winner: candidate {winner}"),
        None => println!("No winner"),
    }
    println!(
        "Flips: {} of {} removals",
        result.flips,
        result.candidate_ordering.len().saturating_sub(1)
    );

    if let Some(path) = json {
        write_file(path, &serde_json::to_string_pretty(&result)?)?;
        println!("Flip result saved to: {}", path.display());
    }
    Ok(())
}

fn run_ensemble(source: &Source, trials: Option<usize>, output: &Output) -> Result<()> {
    let mut config = load_config(source)?;
    if let Some(trials) = trials {
        config.ensemble.trials = trials;
    }
    config.validate()?;

    let engine = build_engine(&config)?;
    let result = config.aggregator().run(&engine)?;
    print_ensemble(&result);

    if let Some(path) = &output.csv {
        write_file(path, &export_histogram_csv(&result)?)?;
        println!("Histogram saved to: {}", path.display());
    }
    if let Some(path) = &output.json {
        let artifact = Artifact::new(config.config_id()?, Report::Ensemble { result });
        write_file(path, &export_json(&artifact)?)?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn run_trend(
    source: &Source,
    candidate: u32,
    points: Option<usize>,
    trials: Option<usize>,
    output: &Output,
) -> Result<()> {
    let mut config = load_config(source)?;
    let mut trend = config.trend.clone().unwrap_or(TrendConfig {
        points: 10,
        trials_per_point: 50,
        max_fraction: 1.0,
        predicate: VoterPredicate::RanksFirst { candidate },
    });
    if let Some(points) = points {
        trend.points = points;
    }
    if let Some(trials) = trials {
        trend.trials_per_point = trials;
    }
    config.trend = Some(trend.clone());
    config.validate()?;

    let runner = ElectionTrend::new(build_engine(&config)?).with_aggregator(config.aggregator());
    let results = runner.run_trend(
        linear_sweep(trend.predicate.clone(), trend.max_fraction),
        trend.trials_per_point,
        trend.points,
    )?;
    print_trend(&results);

    if let Some(path) = &output.csv {
        write_file(path, &export_trend_csv(&results)?)?;
        println!("Histograms saved to: {}", path.display());
    }
    if let Some(path) = &output.json {
        let artifact = Artifact::new(config.config_id()?, Report::Trend { points: results });
        write_file(path, &export_json(&artifact)?)?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

// ─── Printing ───────────────────────────────────────────────────────

fn print_ensemble(result: &EnsembleResult) {
    println!(
        "Trials: {}  skipped: {}  with flips: {} ({:.1}%)",
        result.trials,
        result.skipped,
        result.flips,
        result.flip_fraction() * 100.0
    );
    println!("{:>10}  {:>6}  {:>8}  {:>8}", "candidate", "wins", "win %", "ranked");
    let mut rows: Vec<_> = result.candidates().collect();
    rows.sort_by_key(|&c| std::cmp::Reverse(result.win_count(c)));
    for c in rows {
        println!(
            "{:>10}  {:>6}  {:>7.1}%  {:>8}",
            c,
            result.win_count(c),
            result.win_fraction(c) * 100.0,
            result.rank_total(c)
        );
    }
}

fn print_trend(points: &[TrendPoint]) {
    println!("{:>6}  {:>9}  {:>8}  {:>7}", "point", "fraction", "leader", "flip %");
    for p in points {
        let leader = p
            .result
            .candidates()
            .max_by_key(|&c| p.result.win_count(c))
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "{:>6}  {:>9.3}  {:>8}  {:>6.1}%",
            p.index,
            p.fraction,
            leader,
            p.result.flip_fraction() * 100.0
        );
    }
}
