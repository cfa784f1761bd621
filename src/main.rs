use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use rhythm_judge::config::GameSettings;
use rhythm_judge::game::{FinalResult, NoteWindow, SessionController, SessionState};
use rhythm_judge::model::{AudioFeatures, Chart, ChartGenerator, Difficulty, NoteType};
use rhythm_judge::traits::{
    InputEvent, InputProvider, MediaClock, MockTimeProvider, ScriptedInput,
};
use rhythm_judge::util::init_logging;

/// Extra media time after the last note before a simulated song ends.
const TAIL_PADDING: f64 = 1.0;

#[derive(Parser, Debug)]
#[command(name = "rhythm-judge", about = "Rhythm game timing judge", version)]
struct Args {
    /// Enable per-judgment debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily file in this directory.
    #[arg(long, global = true, env = "RHYTHM_JUDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Settings JSON file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print chart metadata and note field geometry.
    Inspect {
        /// Chart JSON file.
        chart: PathBuf,
    },
    /// Play a chart on a manual clock and print the final result.
    Simulate {
        /// Chart JSON file.
        chart: PathBuf,

        /// JSON array of `{"lane": n, "time": secs}` presses.
        #[arg(long)]
        inputs: Option<PathBuf>,

        /// Tick rate of the simulated frame loop.
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Generate a chart from detected onsets and beats.
    Generate {
        /// Audio features JSON with `onset_times`, `beat_times`,
        /// `note_intensities`, `tempo` and `duration`.
        features: PathBuf,

        /// easy, normal or hard.
        #[arg(long, default_value_t = Difficulty::Normal)]
        difficulty: Difficulty,

        /// Seed for a reproducible chart.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the chart here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct ChartSummary {
    tempo: f64,
    difficulty: String,
    duration: f64,
    lanes: usize,
    notes: usize,
    taps: usize,
    holds: usize,
    slides: usize,
    notes_per_lane: Vec<usize>,
    note_speed: f64,
    preview_time: f64,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    #[serde(flatten)]
    result: FinalResult,
    full_combo: bool,
    judgments: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_dir.as_deref(), args.verbose)?;

    let settings = match &args.settings {
        Some(path) => GameSettings::load_from(path)?,
        None => GameSettings::load(),
    };

    match args.command {
        Command::Inspect { chart } => inspect(&chart, &settings),
        Command::Simulate { chart, inputs, fps } => {
            simulate(&chart, inputs.as_deref(), fps, settings)
        }
        Command::Generate {
            features,
            difficulty,
            seed,
            output,
        } => generate(&features, difficulty, seed, output.as_deref(), &settings),
    }
}

fn inspect(path: &Path, settings: &GameSettings) -> Result<()> {
    let chart = Chart::load(path, settings.lanes)?;
    let window = NoteWindow::for_chart(settings.layout(), &chart);
    let count = |ty: NoteType| chart.notes().iter().filter(|n| n.note_type == ty).count();

    let summary = ChartSummary {
        tempo: chart.tempo(),
        difficulty: chart.difficulty().to_string(),
        duration: chart.duration(),
        lanes: chart.lane_count(),
        notes: chart.len(),
        taps: count(NoteType::Tap),
        holds: count(NoteType::Hold),
        slides: count(NoteType::Slide),
        notes_per_lane: (0..chart.lane_count())
            .map(|lane| chart.lane_notes(lane).len())
            .collect(),
        note_speed: window.note_speed(),
        preview_time: window.preview_time(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_inputs(path: &Path) -> Result<Vec<InputEvent>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading inputs {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing inputs {}", path.display()))
}

fn simulate(
    chart_path: &Path,
    inputs_path: Option<&Path>,
    fps: u32,
    settings: GameSettings,
) -> Result<()> {
    if fps == 0 {
        bail!("fps must be positive");
    }
    let chart = Chart::load(chart_path, settings.lanes)?;
    let mut input = ScriptedInput::new(match inputs_path {
        Some(path) => load_inputs(path)?,
        None => Vec::new(),
    });

    let end = if chart.duration() > 0.0 {
        chart.duration()
    } else {
        chart.last_note_time() + settings.judge.miss_threshold + TAIL_PADDING
    };
    info!(
        "simulating {} notes, {} inputs, {fps} fps, until {end:.3}s",
        chart.len(),
        input.remaining()
    );

    let host = MockTimeProvider::new();
    let clock = MediaClock::new(host.clone()).with_duration(end);
    let mut session = SessionController::new(settings)
        .with_chart(chart)
        .with_time_source(clock);
    session.start()?;

    let frame_us = (1_000_000 / i64::from(fps)).max(1);
    while session.state() == SessionState::Playing {
        host.advance(frame_us);
        let now = session.now();
        for event in input.poll_events(now) {
            if let Err(e) = session.judge(event.lane, event.time) {
                warn!("input at {:.3}s rejected: {e}", event.time);
            }
        }
        if let Err(e) = session.frame() {
            warn!("simulation stopped: {e}");
            break;
        }
        if input.remaining() == 0 && session.resolved().all_resolved() {
            info!("every note judged at {:.3}s", session.now());
            session.stop();
        }
    }

    let result: FinalResult = session
        .final_result()
        .context("session ended without a result")?;
    let report = SimulationReport {
        full_combo: result.is_full_combo(),
        judgments: session.history().len(),
        result,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn generate(
    features_path: &Path,
    difficulty: Difficulty,
    seed: Option<u64>,
    output: Option<&Path>,
    settings: &GameSettings,
) -> Result<()> {
    let content = fs::read_to_string(features_path)
        .with_context(|| format!("reading features {}", features_path.display()))?;
    let features: AudioFeatures = serde_json::from_str(&content)
        .with_context(|| format!("parsing features {}", features_path.display()))?;

    let chart = match seed {
        Some(seed) => ChartGenerator::seeded(difficulty, settings.lanes, seed).generate(&features)?,
        None => ChartGenerator::from_entropy(difficulty, settings.lanes).generate(&features)?,
    };
    info!(
        "generated {difficulty} chart: {} notes over {} onsets",
        chart.len(),
        features.onset_times.len()
    );

    match output {
        Some(path) => chart.save(path)?,
        None => println!("{}", serde_json::to_string_pretty(&chart)?),
    }
    Ok(())
}
