//! Vigil - offline vigilance replay
//!
//! Feeds recorded landmark windows through window analysis and driver state
//! classification, writing one JSON document per line to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod logging;
mod recorded;
mod settings;

use recorded::RecordedWindow;
use settings::Settings;
use state_classifier::{StateBucket, StateClassifier, StateResult};
use window_metrics::{PrecomputedLandmarks, WindowAnalyzer, WindowSummary};

/// Vigil - driver vigilance analysis over recorded landmark windows
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one recorded window
    Analyze {
        /// Recorded window JSON file
        #[arg(long)]
        input: PathBuf,
    },
    /// Classify state buckets, one JSON object per line
    Classify {
        /// JSON lines file of state buckets
        #[arg(long)]
        input: PathBuf,
    },
    /// Analyze and classify a sequence of recorded windows
    Replay {
        /// JSON lines file of recorded windows
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        session: String,
        #[arg(long)]
        driver: String,
    },
}

#[derive(Serialize)]
struct ReplayLine<'a> {
    summary: &'a WindowSummary,
    state: &'a StateResult,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init_logging(&settings.logging, cli.json_logs)?;

    info!("=== Vigil v{} ===", env!("CARGO_PKG_VERSION"));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match &cli.command {
        Commands::Analyze { input } => analyze(&settings, input, &mut out)?,
        Commands::Classify { input } => classify(&settings, input, &mut out)?,
        Commands::Replay {
            input,
            session,
            driver,
        } => replay(&settings, input, session, driver, &mut out)?,
    }
    out.flush().context("failed to flush output")?;
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

/// Non-empty lines with their 1-based line numbers
fn json_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn analyze<W: Write>(settings: &Settings, input: &Path, out: &mut W) -> Result<()> {
    let analyzer = WindowAnalyzer::new(settings.analyzer.clone())?;
    let mut window: RecordedWindow = serde_json::from_str(&read_input(input)?)
        .with_context(|| format!("invalid recorded window in {}", input.display()))?;
    let timestamp = window.timestamp.seconds()?;

    let analyzed = analyzer.analyze_window(&mut window, &mut PrecomputedLandmarks, timestamp)?;
    write_line(out, &analyzed.summary)
}

fn classify<W: Write>(settings: &Settings, input: &Path, out: &mut W) -> Result<()> {
    let classifier = StateClassifier::new(settings.thresholds.clone(), settings.hysteresis)?;
    let text = read_input(input)?;

    let mut count = 0usize;
    for (line_no, line) in json_lines(&text) {
        let bucket: StateBucket = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid state bucket", input.display(), line_no))?;
        write_line(out, &classifier.classify(&bucket))?;
        count += 1;
    }
    info!("Classified {} bucket(s) from {}", count, input.display());
    Ok(())
}

fn replay<W: Write>(
    settings: &Settings,
    input: &Path,
    session: &str,
    driver: &str,
    out: &mut W,
) -> Result<()> {
    let analyzer = WindowAnalyzer::new(settings.analyzer.clone())?;
    let classifier = StateClassifier::new(settings.thresholds.clone(), settings.hysteresis)?;
    let text = read_input(input)?;

    let (mut classified, mut skipped) = (0usize, 0usize);
    for (line_no, line) in json_lines(&text) {
        let mut window: RecordedWindow = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid recorded window", input.display(), line_no))?;

        let analyzed = match window
            .timestamp
            .seconds()
            .and_then(|ts| analyzer.analyze_window(&mut window, &mut PrecomputedLandmarks, ts))
        {
            Ok(analyzed) => analyzed,
            Err(e) => {
                warn!("Skipping window on line {}: {}", line_no, e);
                skipped += 1;
                continue;
            }
        };

        let bucket = StateBucket::from_summary(&analyzed.summary, analyzed.ts_end, session, driver);
        let state = classifier.classify(&bucket);
        write_line(
            out,
            &ReplayLine {
                summary: &analyzed.summary,
                state: &state,
            },
        )?;
        classified += 1;
    }

    info!(
        "Replayed {} window(s) for {}/{} ({} skipped)",
        classified, session, driver, skipped
    );
    Ok(())
}
