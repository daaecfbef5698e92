//! stylized-facts CLI - check stylized facts of intraday market data
//!
//! ## Example Usage
//!
//! ```bash
//! # Check OHLCV tables
//! stylized-facts check day1.csv day2.csv --output report.csv
//!
//! # Resample tick tables first
//! stylized-facts --config cfg.toml ticks ticks1.csv ticks2.csv
//!
//! # Synthetic ticks with reference curves per session
//! stylized-facts ticks sim.csv --synthetic --session1-curves s1.csv --session2-curves s2.csv
//!
//! # Write mean cumulative transaction curves
//! stylized-facts curves day1.csv day2.csv --session session1 --output s1.csv
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use stylized_facts::data::csv_io::{
    read_ohlcv, read_reference_curves, read_ticks, write_reference_curves, TickFormat,
};
use stylized_facts::prelude::*;

/// stylized-facts: stylized facts checker for intraday market data
#[derive(Parser)]
#[command(name = "stylized-facts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Check stylized facts of intraday market data", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check stylized facts of OHLCV tables
    Check {
        /// OHLCV CSV files, one series each
        #[arg(value_name = "OHLCV", required = true)]
        files: Vec<PathBuf>,

        /// Output file for the report (CSV, or JSON with a .json extension)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Resample tick tables, then check stylized facts
    Ticks {
        /// Tick CSV files, one series each
        #[arg(value_name = "TICKS", required = true)]
        files: Vec<PathBuf>,

        /// Read simulator output (session ids, transaction-count resampling)
        #[arg(long)]
        synthetic: bool,

        /// Reference curves for session 1 (synthetic mode)
        #[arg(long)]
        session1_curves: Option<PathBuf>,

        /// Reference curves for session 2 (synthetic mode)
        #[arg(long)]
        session2_curves: Option<PathBuf>,

        /// Output file for the report
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Write cumulative transaction curves of OHLCV tables
    Curves {
        /// OHLCV CSV files, one series each
        #[arg(value_name = "OHLCV", required = true)]
        files: Vec<PathBuf>,

        /// Restrict to one session (session1, session2)
        #[arg(short = 's', long)]
        session: Option<SessionId>,

        /// Output file for the curves (stdout if omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<CheckerConfig> {
    match path {
        Some(path) => CheckerConfig::load(path),
        None => Ok(CheckerConfig::default()),
    }
}

fn series_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Failed to load config: {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if cli.verbose {
        println!(
            "{} v{}",
            "stylized-facts".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "Cadence: {}, cut-off: {}, lags: {}",
            config.resample_rule.to_string().dimmed(),
            config.cut_off_th,
            config.lags.len()
        );
    }

    let result = match cli.command {
        Commands::Check { files, output } => run_check(config, &files, output.as_deref()),
        Commands::Ticks {
            files,
            synthetic,
            session1_curves,
            session2_curves,
            output,
        } => run_ticks(TicksConfig {
            files,
            synthetic,
            session1_curves,
            session2_curves,
            output,
            config,
        }),
        Commands::Curves {
            files,
            session,
            output,
        } => write_curves(config, &files, session, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

struct TicksConfig {
    files: Vec<PathBuf>,
    synthetic: bool,
    session1_curves: Option<PathBuf>,
    session2_curves: Option<PathBuf>,
    output: Option<PathBuf>,
    config: CheckerConfig,
}

fn checker_from_ohlcv(config: CheckerConfig, files: &[PathBuf]) -> Result<StylizedFactsChecker> {
    let mut checker = StylizedFactsChecker::new(config)?;
    for path in files {
        let sequence = read_ohlcv(open(path)?)?;
        checker.add_sequence(series_name(path), sequence)?;
    }
    Ok(checker)
}

fn run_check(config: CheckerConfig, files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    println!("{}", "Checking stylized facts...".cyan().bold());
    let mut checker = checker_from_ohlcv(config, files)?;
    report(&mut checker, output)
}

fn run_ticks(cfg: TicksConfig) -> Result<()> {
    println!("{}", "Resampling tick data...".cyan().bold());
    let mut config = cfg.config;
    if cfg.synthetic {
        config.mode = MarketMode::Synthetic;
    }
    let format = match config.mode {
        MarketMode::Synthetic => TickFormat::synthetic(),
        MarketMode::Real => TickFormat::default(),
    };
    let mode = config.mode;

    let mut checker = StylizedFactsChecker::new(config)?;
    let curves = match (cfg.session1_curves, cfg.session2_curves) {
        (Some(s1), Some(s2)) => Some((
            read_reference_curves(open(&s1)?)?,
            read_reference_curves(open(&s2)?)?,
        )),
        _ => None,
    };
    let resampler = checker.resampler(curves)?;

    let mut dropped = 0;
    for path in &cfg.files {
        let events = read_ticks(open(path)?, &format, mode)?;
        if !checker.add_ticks(series_name(path), &events, resampler.as_ref())? {
            dropped += 1;
        }
    }
    println!(
        "  {} {} kept, {} dropped",
        "Series:".bold(),
        checker.len(),
        dropped
    );

    report(&mut checker, cfg.output.as_deref())
}

fn report(checker: &mut StylizedFactsChecker, output: Option<&Path>) -> Result<()> {
    let report = checker.check_stylized_facts()?;

    println!();
    println!("{}", "Summary".green().bold());
    for column in report.summary() {
        println!(
            "  {:<14} mean {:>12.6}  std {:>12.6}",
            column.column.bold(),
            column.mean,
            column.std
        );
    }

    match output {
        Some(path) if path.extension().is_some_and(|e| e == "json") => {
            std::fs::write(path, report.to_json()?)?;
            println!("\n{} {}", "Report written to".green(), path.display());
        }
        Some(path) => {
            report.write_csv(File::create(path)?)?;
            println!("\n{} {}", "Report written to".green(), path.display());
        }
        None => report.write_csv(io::stdout())?,
    }
    Ok(())
}

fn write_curves(
    config: CheckerConfig,
    files: &[PathBuf],
    session: Option<SessionId>,
    output: Option<&Path>,
) -> Result<()> {
    let checker = checker_from_ohlcv(config, files)?;
    let curves = checker
        .mean_cumulative_transactions(session)?
        .into_reference_curves()?;
    match output {
        Some(path) => {
            write_reference_curves(&curves, File::create(path)?)?;
            println!("{} {}", "Curves written to".green(), path.display());
        }
        None => write_reference_curves(&curves, io::stdout())?,
    }
    Ok(())
}
