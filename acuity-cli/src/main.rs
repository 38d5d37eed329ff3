//! `acuity`: screen calibration and the visual acuity test in a terminal.
//!
//! Subcommands:
//! - `calibrate`: store a calibration from a known distance or replayed face detections
//! - `run`: take the two-eye test and submit the result
//! - `sizes`: print the optotype size for every level
//! - `render`: write a single optotype as PNG
//! - `clear`: forget the stored calibration

mod render;
mod replay;
mod terminal;

use std::path::{Path, PathBuf};
use std::time::Duration;

use acuity_engine::calibration::{
    build_record, run_calibration, CalibrationOutcome, DistanceEstimator, EstimatorConfig,
    EstimatorUpdate, FileStore, KeyValueStore, ScreenParams,
};
use acuity_engine::{
    load_calibration, optotype_size_mm, optotype_size_px, save_calibration, size_table,
    submit_result, Calibration, Rotation, TestAction, TestConfig, TestState, TimingConfig,
    VisualAcuityTest,
};
use acuity_shared::{ResultsClient, CALIBRATION_STORAGE_KEY};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use replay::{DetectionReplay, RecordedDetector};
use terminal::Terminal;

/// Default address of the web application receiving results
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Visual acuity self-test
#[derive(Parser, Debug)]
#[command(name = "acuity")]
#[command(about = "Landolt C visual acuity test with screen calibration")]
#[command(version)]
struct Args {
    /// Directory holding the calibration record (default: ~/.acuity)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Server the results are posted to
    #[arg(long, global = true, default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calibrate screen size and viewing distance
    Calibrate {
        /// Measured viewing distance in millimeters
        #[arg(long, conflicts_with = "detections", required_unless_present = "detections")]
        distance_mm: Option<f64>,

        /// JSON lines of face boxes (or null) to replay through the distance estimator
        #[arg(long)]
        detections: Option<PathBuf>,

        /// Screen width in device-independent pixels
        #[arg(long, default_value = "1920")]
        screen_width_px: f64,

        /// Screen height in device-independent pixels
        #[arg(long, default_value = "1080")]
        screen_height_px: f64,

        /// Device pixel ratio
        #[arg(long, default_value = "1.0")]
        pixel_ratio: f64,
    },

    /// Take the test
    Run {
        /// Seed for a reproducible level sequence
        #[arg(long)]
        seed: Option<u64>,

        /// Write a PNG of every presented optotype into this directory
        #[arg(long)]
        preview_dir: Option<PathBuf>,
    },

    /// Print optotype sizes for the stored calibration
    Sizes,

    /// Write one optotype as PNG
    Render {
        /// Acuity level (1-17)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=17))]
        level: u8,

        /// Gap rotation in degrees, a multiple of 45
        #[arg(short, long, default_value = "0")]
        rotation: u16,

        /// Size in pixels (default: computed from the stored calibration)
        #[arg(long)]
        size_px: Option<u32>,

        /// Output PNG file
        #[arg(short, long, default_value = "landolt_c.png")]
        output: PathBuf,
    },

    /// Remove the stored calibration
    Clear,
}

fn open_store(dir: Option<&Path>) -> FileStore {
    match dir {
        Some(dir) => FileStore::with_path(dir.to_path_buf()),
        None => FileStore::default(),
    }
}

/// Load the calibration or explain how to get one.
fn require_calibration(store: &FileStore) -> Result<Calibration> {
    load_calibration(store).map_err(|e| {
        anyhow!(
            "{e}\nPlease calibrate first: acuity calibrate --distance-mm <MM> (store: {})",
            store.root_path().display()
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let mut store = open_store(args.store_dir.as_deref());

    match args.command {
        Command::Calibrate {
            distance_mm,
            detections,
            screen_width_px,
            screen_height_px,
            pixel_ratio,
        } => {
            let screen = ScreenParams::new(screen_width_px, screen_height_px, pixel_ratio);
            calibrate(
                &mut store,
                distance_mm,
                detections.as_deref(),
                &screen,
                &TimingConfig::default(),
            )
            .await
        }
        Command::Run { seed, preview_dir } => {
            run_test(&store, &args.server_url, seed, preview_dir).await
        }
        Command::Sizes => print_sizes(&store),
        Command::Render {
            level,
            rotation,
            size_px,
            output,
        } => render_one(&store, level, rotation, size_px, &output),
        Command::Clear => {
            if store.remove(CALIBRATION_STORAGE_KEY)? {
                println!("Calibration removed");
            } else {
                println!("No calibration stored");
            }
            Ok(())
        }
    }
}

async fn calibrate(
    store: &mut FileStore,
    distance_mm: Option<f64>,
    detections: Option<&Path>,
    screen: &ScreenParams,
    timing: &TimingConfig,
) -> Result<()> {
    println!(
        "Screen: {:.1} x {:.1} mm at pixel ratio {}",
        screen.physical_width_mm(),
        screen.physical_height_mm(),
        screen.pixel_ratio
    );

    let record = match (distance_mm, detections) {
        (Some(distance), _) => build_record(distance, screen, chrono::Utc::now()),
        (None, Some(path)) => {
            let mut source = DetectionReplay::open(path)
                .with_context(|| format!("opening detections {}", path.display()))?;
            let mut estimator = DistanceEstimator::new(EstimatorConfig::default());
            let outcome = run_calibration(
                &mut source,
                &mut RecordedDetector,
                &mut estimator,
                screen,
                || false,
                print_update,
            );
            match outcome {
                Ok(CalibrationOutcome::Completed(record)) => record,
                Ok(CalibrationOutcome::Cancelled) => bail!("Calibration cancelled"),
                Ok(CalibrationOutcome::StreamEnded) => {
                    bail!("Detections ended before the distance was stable")
                }
                Err(e) => bail!("{}\n{}", e.message(), e.instructions()),
            }
        }
        (None, None) => bail!("either --distance-mm or --detections is required"),
    };

    // Reject before writing anything unusable.
    let calibration = Calibration::new(record)?;
    save_calibration(store, calibration.record())?;

    println!("Calibration Complete!");
    println!(
        "Distance: {:.0} cm, scaling factor {:.3}",
        calibration.measured_distance_mm() / 10.0,
        calibration.record().scaling_factor
    );
    println!("Saved to {}", store.root_path().display());
    tokio::time::sleep(Duration::from_millis(timing.redirect_after_calibration_ms)).await;
    Ok(())
}

fn print_update(update: &EstimatorUpdate) {
    match update.distance_cm() {
        Some(cm) => println!(
            "{:>3} cm  {:<24} {:>3}%  {}",
            cm,
            update.message(),
            update.progress_percent(),
            update.hint()
        ),
        None => println!("  -     {:<24}       {}", update.message(), update.hint()),
    }
}

fn print_sizes(store: &FileStore) -> Result<()> {
    let calibration = require_calibration(store)?;
    let config = TestConfig::default();
    println!("Level  Size (mm)  Size (px)");
    for (level, px) in size_table(&calibration, &config.sizing) {
        println!(
            "{level:>5}  {:>9.2}  {px:>9}",
            optotype_size_mm(level, &config.sizing)
        );
    }
    Ok(())
}

fn render_one(
    store: &FileStore,
    level: u8,
    degrees: u16,
    size_px: Option<u32>,
    output: &Path,
) -> Result<()> {
    let rotation = Rotation::from_degrees(degrees)
        .ok_or_else(|| anyhow!("rotation must be a multiple of 45 below 360, got {degrees}"))?;
    let size = match size_px {
        Some(size) => size,
        None => {
            let calibration = require_calibration(store)?;
            optotype_size_px(level, &calibration, &TestConfig::default().sizing)
        }
    };

    if size > render::MAX_IMAGE_PX {
        bail!(
            "{size} px exceeds the {} px image limit",
            render::MAX_IMAGE_PX
        );
    }

    render::generate(size, rotation)
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Level {level}, gap {} (answer {}), {size} px -> {}",
        render::gap_direction(rotation),
        rotation.correct_answer(),
        output.display()
    );
    Ok(())
}

enum Input {
    Line(String),
    Quit,
}

fn read_input(rl: &mut DefaultEditor, prompt: &str) -> Result<Input> {
    match rl.readline(prompt) {
        Ok(line) => Ok(Input::Line(line.trim().to_string())),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(Input::Quit),
        Err(e) => Err(e.into()),
    }
}

/// Only an explicit Enter at the result prompt saves; Ctrl-C or Ctrl-D leave
/// without submitting.
fn submits_result(input: &Input) -> bool {
    matches!(input, Input::Line(_))
}

/// Leaving mid-test needs confirmation.
fn confirm_quit(rl: &mut DefaultEditor, in_progress: bool) -> Result<bool> {
    if !in_progress {
        return Ok(true);
    }
    match read_input(rl, "A test is in progress. Quit anyway? [y/N] ")? {
        Input::Line(answer) => Ok(answer.eq_ignore_ascii_case("y")),
        Input::Quit => Ok(true),
    }
}

async fn run_test(
    store: &FileStore,
    server_url: &str,
    seed: Option<u64>,
    preview_dir: Option<PathBuf>,
) -> Result<()> {
    let calibration = require_calibration(store)?;
    let config = TestConfig::default();
    let timing = TimingConfig::default();
    let mut test = match seed {
        Some(seed) => VisualAcuityTest::seeded(calibration, config, seed),
        None => VisualAcuityTest::new(calibration, config),
    };
    let mut terminal = Terminal::new(preview_dir)?;
    let mut rl = DefaultEditor::new()?;

    println!("Type the number of the segment where the gap is.");
    println!("{}", terminal::legend());
    if let Input::Quit = read_input(&mut rl, "Press Enter to start the test ")? {
        return Ok(());
    }

    let mut actions = test.start();
    loop {
        for action in &actions {
            terminal.show(action)?;
        }

        if let Some(request) = actions.iter().find_map(|a| match a {
            TestAction::SubmitResult(request) => Some(request),
            _ => None,
        }) {
            let client = ResultsClient::new(server_url);
            let outcome = submit_result(&client, request).await;
            if !outcome.is_saved() {
                warn!("Results were not saved: {outcome:?}");
            }
            tokio::time::sleep(Duration::from_millis(timing.redirect_after_save_ms)).await;
            return Ok(());
        }

        actions = match test.state() {
            TestState::NotStarted => test.start(),
            TestState::AwaitingResponse { .. } => {
                match read_input(&mut rl, "gap (1-8, q to quit)> ")? {
                    Input::Line(line) if line.eq_ignore_ascii_case("q") => {
                        if confirm_quit(&mut rl, test.in_progress())? {
                            info!("Test abandoned");
                            return Ok(());
                        }
                        Vec::new()
                    }
                    Input::Line(line) => test.answer_label(&line).unwrap_or_else(|e| {
                        println!("{e}");
                        Vec::new()
                    }),
                    Input::Quit => {
                        if confirm_quit(&mut rl, test.in_progress())? {
                            return Ok(());
                        }
                        Vec::new()
                    }
                }
            }
            TestState::EyeComplete { .. } => {
                if let Input::Quit = read_input(&mut rl, "Press Enter when ready ")? {
                    if confirm_quit(&mut rl, test.in_progress())? {
                        return Ok(());
                    }
                }
                tokio::time::sleep(Duration::from_millis(timing.cover_eye_fade_ms)).await;
                test.acknowledge_cover_eye()
            }
            TestState::SessionComplete => {
                let input = read_input(&mut rl, "Press Enter to save the results ")?;
                if !submits_result(&input) {
                    warn!("Leaving without saving the results");
                    return Ok(());
                }
                test.acknowledge_result()
            }
        };
    }
}
