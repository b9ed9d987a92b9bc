//! Command-line driver for the measurement pipeline.
//!
//! Loads a microscopy image (directly or by dataset index), replays a
//! stream of grow/erase points, and prints per-stage diagnostics plus
//! the calibrated length. Optionally persists the skeleton PNG and a
//! JSON measurement record, and compares against a ground-truth table.
//!
//! ```text
//! filum-measure cell.png --point grow:120,88
//! filum-measure --dataset data --difficulty medium --index 3 \
//!     --point grow:210,340 --point erase:200,300 --export-dir out
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use filum_export::{Difficulty, MeasurementRecord};
use filum_pipeline::diagnostics::Clock;
use filum_pipeline::{
    PipelineConfig, ProcessResult, SeedPoint, TraceAction, process_with_diagnostics,
};

/// Measure a cell length from a microscopy image.
#[derive(Parser)]
#[command(name = "filum-measure", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, TIFF). Omit when selecting
    /// from a dataset with --dataset.
    image_path: Option<PathBuf>,

    /// Dataset root containing easy/, medium/, hard/ image directories.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Difficulty tier: dataset subdirectory and record label.
    #[arg(long, value_enum, default_value_t = Tier::Easy)]
    difficulty: Tier,

    /// Zero-based image index within the difficulty directory,
    /// lexicographic order.
    #[arg(long, default_value_t = 0, requires = "dataset")]
    index: usize,

    /// Trace actions in order: grow:ROW,COL or erase:ROW,COL.
    #[arg(long = "point", value_name = "MODE:ROW,COL", value_parser = parse_action)]
    points: Vec<TraceAction>,

    /// Adaptive threshold window side (odd, 3..=255).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Offset subtracted from the local mean; larger marks more
    /// foreground.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_C_VALUE, allow_negative_numbers = true)]
    c_value: i32,

    /// Closing kernel side (odd, 3..=255).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_KERNEL_SIZE)]
    kernel_size: u32,

    /// Closing repetitions.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Erase disk radius in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ERASE_RADIUS)]
    erase_radius: u32,

    /// Calibration factor in pixels per micrometre.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CALIBRATION_FACTOR)]
    calibration: f64,

    /// Full pipeline config as JSON; overrides the individual flags.
    #[arg(long)]
    config_json: Option<String>,

    /// Emit diagnostics as JSON instead of the aligned report.
    #[arg(long)]
    json: bool,

    /// Directory to receive measurements.json and skeleton_images/.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Record identifier; defaults to the image file stem.
    #[arg(long)]
    image_id: Option<String>,

    /// Ground-truth JSON table, difficulty -> image id -> length.
    #[arg(long)]
    ground_truth: Option<PathBuf>,
}

/// Difficulty tier selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    const fn to_difficulty(self) -> Difficulty {
        match self {
            Self::Easy => Difficulty::Easy,
            Self::Medium => Difficulty::Medium,
            Self::Hard => Difficulty::Hard,
        }
    }
}

/// Wall-clock timing for pipeline diagnostics.
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Parse one `mode:row,col` trace action.
fn parse_action(raw: &str) -> Result<TraceAction, String> {
    let (mode, coords) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MODE:ROW,COL, got {raw:?}"))?;
    let (row, col) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL after \"{mode}:\", got {coords:?}"))?;
    let row: u32 = row
        .trim()
        .parse()
        .map_err(|error| format!("bad row {row:?}: {error}"))?;
    let col: u32 = col
        .trim()
        .parse()
        .map_err(|error| format!("bad col {col:?}: {error}"))?;

    let seed = SeedPoint::new(row, col);
    match mode {
        "grow" => Ok(TraceAction::Grow(seed)),
        "erase" => Ok(TraceAction::Erase(seed)),
        other => Err(format!("unknown mode {other:?} (expected grow or erase)")),
    }
}

fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|error| format!("bad --config-json: {error}"));
    }
    Ok(PipelineConfig {
        iterations: cli.iterations,
        kernel_size: cli.kernel_size,
        block_size: cli.block_size,
        c_value: cli.c_value,
        erase_radius: cli.erase_radius,
        calibration_factor: cli.calibration,
    })
}

/// Extensions accepted when listing a dataset directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Pick the `index`-th image, lexicographic, under `<root>/<tier>/`.
fn dataset_image(root: &Path, difficulty: Difficulty, index: usize) -> Result<PathBuf, String> {
    let dir = root.join(difficulty.dir_name());
    let entries = std::fs::read_dir(&dir)
        .map_err(|error| format!("cannot read {}: {error}", dir.display()))?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| {
                    IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
                })
        })
        .collect();
    images.sort();

    if images.is_empty() {
        return Err(format!("no images found in {}", dir.display()));
    }
    images.get(index).cloned().ok_or_else(|| {
        format!(
            "index {index} out of range: {} holds {} images",
            dir.display(),
            images.len()
        )
    })
}

fn resolve_image(cli: &Cli) -> Result<PathBuf, String> {
    match (&cli.image_path, &cli.dataset) {
        (Some(path), None) => Ok(path.clone()),
        (None, Some(root)) => dataset_image(root, cli.difficulty.to_difficulty(), cli.index),
        (Some(_), Some(_)) => Err("give either an image path or --dataset, not both".to_string()),
        (None, None) => Err("give an image path, or --dataset with --index".to_string()),
    }
}

/// Ground-truth lengths keyed difficulty -> image id.
type GroundTruth = BTreeMap<String, BTreeMap<String, f64>>;

fn lookup_ground_truth(
    path: &Path,
    difficulty: Difficulty,
    image_id: &str,
) -> Result<Option<f64>, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|error| format!("cannot read {}: {error}", path.display()))?;
    let table: GroundTruth = serde_json::from_str(&json)
        .map_err(|error| format!("cannot parse {}: {error}", path.display()))?;
    Ok(table
        .get(difficulty.dir_name())
        .and_then(|tier| tier.get(image_id))
        .copied())
}

/// Write the skeleton PNG and upsert the measurement record.
fn export_results(
    export_dir: &Path,
    image_id: &str,
    difficulty: Difficulty,
    result: &ProcessResult,
) -> Result<(), String> {
    let skeleton_dir = export_dir.join("skeleton_images");
    std::fs::create_dir_all(&skeleton_dir)
        .map_err(|error| format!("cannot create {}: {error}", skeleton_dir.display()))?;

    let png = filum_export::skeleton_png(&result.skeleton).map_err(|error| error.to_string())?;
    let png_path = skeleton_dir.join(filum_export::skeleton_file_name(image_id));
    std::fs::write(&png_path, &png)
        .map_err(|error| format!("cannot write {}: {error}", png_path.display()))?;
    eprintln!("Skeleton written to {} ({} bytes)", png_path.display(), png.len());

    let log_path = export_dir.join("measurements.json");
    let mut records = match std::fs::read_to_string(&log_path) {
        Ok(json) => filum_export::from_json(&json)
            .map_err(|error| format!("cannot parse {}: {error}", log_path.display()))?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(error) => return Err(format!("cannot read {}: {error}", log_path.display())),
    };

    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    filum_export::upsert(
        &mut records,
        MeasurementRecord {
            image_id: image_id.to_string(),
            difficulty,
            length_um: result.length,
            timestamp,
        },
    );

    let json = filum_export::to_json(&records).map_err(|error| error.to_string())?;
    std::fs::write(&log_path, json)
        .map_err(|error| format!("cannot write {}: {error}", log_path.display()))?;
    eprintln!(
        "Measurement recorded in {} ({} records)",
        log_path.display(),
        records.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let image_path = match resolve_image(&cli) {
        Ok(path) => path,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&image_path) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("Error reading {}: {error}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let image_id = cli.image_id.clone().unwrap_or_else(|| {
        image_path
            .file_stem()
            .map_or_else(|| "image".to_string(), |stem| stem.to_string_lossy().into_owned())
    });

    eprintln!(
        "Measuring {} ({} bytes, {} actions)",
        image_path.display(),
        image_bytes.len(),
        cli.points.len()
    );

    let (result, diagnostics) =
        match process_with_diagnostics(&image_bytes, &config, &cli.points, &StdClock) {
            Ok(output) => output,
            Err(error) => {
                eprintln!("Pipeline error: {error}");
                return ExitCode::FAILURE;
            }
        };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("Error serializing diagnostics: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    for (index, status) in result.grow_statuses.iter().enumerate() {
        if !status.is_grown() {
            eprintln!("note: grow #{} landed on background and was skipped", index + 1);
        }
    }

    println!("Length: {:.2} um", result.length);

    if let Some(ref path) = cli.ground_truth {
        match lookup_ground_truth(path, cli.difficulty.to_difficulty(), &image_id) {
            Ok(Some(expected)) => {
                let delta = result.length - expected;
                println!(
                    "Ground truth: {expected:.2} um (delta {delta:+.2}, {:+.1}%)",
                    100.0 * delta / expected
                );
            }
            Ok(None) => {
                eprintln!(
                    "note: no ground-truth entry for {}/{image_id}",
                    cli.difficulty.to_difficulty()
                );
            }
            Err(message) => {
                eprintln!("Error: {message}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(ref export_dir) = cli.export_dir {
        if let Err(message) =
            export_results(export_dir, &image_id, cli.difficulty.to_difficulty(), &result)
        {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
