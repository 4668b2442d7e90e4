//! Photomon CLI - radiometric calibration and index processing of multi-band photos

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use photomon_algorithms::calibration::{Calibrate, SourceRect};
use photomon_algorithms::imagery::{IndexKind, LutKind};
use photomon_core::{FileImageStore, ImageStore};
use photomon_pipeline::{
    process, BatchSummary, CalibrationRecord, CancelFlag, ProcessingJob, RadiometricCalibrator,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "photomon")]
#[command(author, version, about = "Radiometric calibration of multi-band photos", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about an image file
    Info {
        /// Input image file
        input: PathBuf,
    },
    /// Inspect and edit the calibration stored in a reference image
    Calibrate {
        #[command(subcommand)]
        action: CalibrateCommands,
    },
    /// Calibrate, compute an index and write every image of a directory
    Process {
        /// Source directory
        source: Option<PathBuf>,
        /// Destination directory (created if missing)
        dest: Option<PathBuf>,
        /// Job description in JSON; other options override its fields
        #[arg(long)]
        job: Option<PathBuf>,
        /// Extension of input files, case-sensitive, without the dot
        #[arg(short, long)]
        ext: Option<String>,
        /// Calibration image whose stored model is applied to every file
        #[arg(short, long)]
        calibrate_from: Option<PathBuf>,
        /// Index to compute after calibration
        #[arg(short, long, value_enum)]
        index: Option<IndexArg>,
        /// First band of the index (red for NDVI), 1-based
        #[arg(long, alias = "red")]
        band_a: Option<usize>,
        /// Second band of the index (NIR for NDVI), 1-based
        #[arg(long, alias = "nir")]
        band_b: Option<usize>,
        /// Lower bound of the output scale
        #[arg(long)]
        scale_from: Option<f64>,
        /// Upper bound of the output scale: 1 = float, up to 255 = 8-bit, above = 16-bit
        #[arg(long)]
        scale_to: Option<f64>,
        /// Colour lookup table for index output
        #[arg(long, value_enum)]
        lut: Option<LutArg>,
        /// Worker threads: 0 = all cores, 1 = sequential
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

// ─── Calibrate subcommands ──────────────────────────────────────────────

#[derive(Subcommand)]
enum CalibrateCommands {
    /// Print regions, correction parameters and the fitted model
    Show {
        /// Reference image
        image: PathBuf,
    },
    /// Append reference targets from a `label,r,g,b` file and save
    Import {
        /// Reference image
        image: PathBuf,
        /// Delimited text file with one target per line
        targets: PathBuf,
    },
    /// Sample a region of the image as the observation of a target and save
    Mark {
        /// Reference image
        image: PathBuf,
        /// Region index, 0-based
        index: usize,
        x: f64,
        y: f64,
        /// Width in pixels
        w: f64,
        /// Height in pixels
        h: f64,
    },
    /// Remove a region and save
    Remove {
        /// Reference image
        image: PathBuf,
        /// Region index, 0-based
        index: usize,
    },
    /// Change correction parameters and save
    Set {
        /// Reference image
        image: PathBuf,
        /// Gamma exponent, 0 disables the correction
        #[arg(short, long)]
        gamma: Option<f64>,
        /// Band subtraction as `percent,source,target` (bands 1-based)
        #[arg(short, long)]
        subtract: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexArg {
    None,
    Ndvi,
    Nd,
}

#[derive(Clone, Copy, ValueEnum)]
enum LutArg {
    None,
    Palette,
}

impl From<LutArg> for LutKind {
    fn from(arg: LutArg) -> Self {
        match arg {
            LutArg::None => LutKind::None,
            LutArg::Palette => LutKind::Palette,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

fn open_session(image: &Path) -> Result<RadiometricCalibrator<FileImageStore>> {
    let pb = spinner("Reading image...");
    let session = RadiometricCalibrator::open(FileImageStore::default(), image)
        .with_context(|| format!("Failed to open {}", image.display()))?;
    pb.finish_and_clear();
    Ok(session)
}

fn save_session(session: &mut RadiometricCalibrator<FileImageStore>) -> Result<()> {
    let pb = spinner("Saving calibration...");
    let saved = session.save().context("Failed to save calibration")?;
    pb.finish_and_clear();
    println!("Calibration saved to: {}", saved.display());
    Ok(())
}

fn parse_subtraction(text: &str) -> Result<(f64, usize, usize)> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [percent, source, target] = parts.as_slice() else {
        bail!("Expected `percent,source,target`, got `{}`", text);
    };
    Ok((
        percent.parse().context("Invalid subtraction percent")?,
        source.parse().context("Invalid source band")?,
        target.parse().context("Invalid target band")?,
    ))
}

fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
    format!("[{}]", parts.join(", "))
}

fn print_calibration(session: &RadiometricCalibrator<FileImageStore>) {
    let params = session.params();
    println!(
        "Value range: {} - {}",
        params.min_pixel_value, params.max_pixel_value
    );
    println!(
        "Gamma: {}{}",
        params.gamma,
        if params.gamma_enabled() { "" } else { " (off)" }
    );
    println!(
        "Subtraction: {}% of band {} from band {}{}",
        params.subtraction_percent,
        params.subtraction_source_band,
        params.subtraction_target_band,
        if params.subtraction_enabled() { "" } else { " (off)" }
    );

    println!("\nRegions ({}):", session.regions().len());
    for (i, region) in session.regions().iter().enumerate() {
        let r = &region.rect;
        let rect = if r.is_placeholder() {
            "not marked".to_string()
        } else {
            format!("{}x{} at ({}, {})", r.w, r.h, r.x, r.y)
        };
        println!(
            "  {:>2}. {:<16} target {} observed {} ({})",
            i,
            region.label,
            format_values(&region.target),
            format_values(&region.observed_mean),
            rect
        );
    }

    match session.model() {
        Some(model) => {
            println!("\nModel:");
            for (b, fit) in model.bands().iter().enumerate() {
                println!(
                    "  Band {}: slope {:.4}, intercept {:.4}, r {:.4}",
                    b + 1,
                    fit.slope,
                    fit.intercept,
                    fit.r_value
                );
            }
        }
        None => println!("\nModel: none (needs two marked regions)"),
    }
}

fn print_summary(summary: &BatchSummary, elapsed: std::time::Duration) {
    println!(
        "Processed {} of {} file(s)",
        summary.processed, summary.total
    );
    if summary.cancelled {
        println!("  Cancelled, {} not started", summary.skipped());
    }
    for failure in &summary.failures {
        println!("  Failed: {}", failure);
    }
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let store = FileImageStore::default();
            let pb = spinner("Reading image...");
            let image = store
                .load(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            pb.finish_and_clear();
            let (rows, cols) = image.shape();

            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} bands)",
                cols,
                rows,
                image.band_count()
            );
            if let Some((lo, hi)) = image.extrema() {
                println!("Value range: {} - {}", lo, hi);
            }

            println!("\nStatistics:");
            for (b, band) in image.bands().iter().enumerate() {
                let stats = band.statistics();
                println!(
                    "  Band {}: min {:.2}, max {:.2}, mean {:.4}",
                    b + 1,
                    stats.min.unwrap_or(f64::NAN),
                    stats.max.unwrap_or(f64::NAN),
                    stats.mean.unwrap_or(f64::NAN)
                );
            }

            match store.read_comment(&input) {
                Ok(Some(comment)) => match CalibrationRecord::from_comment(&comment) {
                    Some(record) => println!(
                        "\nCalibration record: {} region(s), gamma {}",
                        record.regions.len(),
                        record.gamma
                    ),
                    None => println!("\nUser comment: {}", comment),
                },
                Ok(None) => {}
                Err(e) => println!("\nMetadata unreadable: {}", e),
            }
        }

        // ── Calibration ──────────────────────────────────────────────
        Commands::Calibrate { action } => match action {
            CalibrateCommands::Show { image } => {
                let session = open_session(&image)?;
                println!("File: {}", image.display());
                print_calibration(&session);
            }
            CalibrateCommands::Import { image, targets } => {
                let mut session = open_session(&image)?;
                let file = File::open(&targets)
                    .with_context(|| format!("Failed to open {}", targets.display()))?;
                let count = session
                    .import_reference_targets(BufReader::new(file))
                    .context("Failed to import reference targets")?;
                println!("Imported {} target(s)", count);
                save_session(&mut session)?;
            }
            CalibrateCommands::Mark {
                image,
                index,
                x,
                y,
                w,
                h,
            } => {
                let mut session = open_session(&image)?;
                session
                    .mark_region(index, SourceRect::new(x, y, w, h))
                    .with_context(|| format!("Failed to mark region {}", index))?;
                let region = &session.regions()[index];
                println!(
                    "Region {} ({}) observed {}",
                    index,
                    region.label,
                    format_values(&region.observed_mean)
                );
                save_session(&mut session)?;
            }
            CalibrateCommands::Remove { image, index } => {
                let mut session = open_session(&image)?;
                let removed = session
                    .delete_region(index)
                    .with_context(|| format!("Failed to remove region {}", index))?;
                println!("Removed region {} ({})", index, removed.label);
                save_session(&mut session)?;
            }
            CalibrateCommands::Set {
                image,
                gamma,
                subtract,
            } => {
                if gamma.is_none() && subtract.is_none() {
                    bail!("Nothing to set: pass --gamma and/or --subtract");
                }
                let mut session = open_session(&image)?;
                if let Some(gamma) = gamma {
                    session.set_gamma(gamma).context("Failed to set gamma")?;
                }
                if let Some(text) = subtract {
                    let (percent, source, target) = parse_subtraction(&text)?;
                    session
                        .set_subtraction(percent, source, target)
                        .context("Failed to set subtraction")?;
                }
                save_session(&mut session)?;
            }
        },

        // ── Batch processing ─────────────────────────────────────────
        Commands::Process {
            source,
            dest,
            job,
            ext,
            calibrate_from,
            index,
            band_a,
            band_b,
            scale_from,
            scale_to,
            lut,
            workers,
        } => {
            let mut job = match job {
                Some(path) => ProcessingJob::from_json_file(&path)
                    .with_context(|| format!("Failed to read job {}", path.display()))?,
                None => match (&source, &dest) {
                    (Some(_), Some(_)) => ProcessingJob::default(),
                    _ => bail!("Source and destination directories are required without --job"),
                },
            };
            if let Some(source) = source {
                job.source_dir = source;
            }
            if let Some(dest) = dest {
                job.dest_dir = dest;
            }
            if let Some(ext) = ext {
                job.file_extension = ext;
            }
            if let Some(index) = index {
                job.index = match index {
                    IndexArg::None => IndexKind::None,
                    IndexArg::Ndvi => IndexKind::Ndvi {
                        red_band: band_a.unwrap_or(1),
                        nir_band: band_b.unwrap_or(3),
                    },
                    IndexArg::Nd => {
                        let (band_a, band_b) = band_a
                            .zip(band_b)
                            .context("--index nd needs --band-a and --band-b")?;
                        IndexKind::NormalizedDifference { band_a, band_b }
                    }
                };
            }
            if let Some(from) = scale_from {
                job.output_scale_from = from;
            }
            if let Some(to) = scale_to {
                job.output_scale_to = to;
            }
            if let Some(lut) = lut {
                job.lut = lut.into();
            }
            if let Some(workers) = workers {
                job.workers = workers;
            }

            let calibrator = match &calibrate_from {
                Some(path) => {
                    job.calibration_enabled = true;
                    Some(open_session(path)?)
                }
                None => None,
            };
            if let Some(session) = &calibrator {
                if session.model().is_none() {
                    bail!(
                        "{} holds no usable calibration model",
                        session.path().unwrap_or(Path::new("")).display()
                    );
                }
            }

            job.validate().context("Invalid processing job")?;
            std::fs::create_dir_all(&job.dest_dir).with_context(|| {
                format!("Failed to create {}", job.dest_dir.display())
            })?;

            let store = FileImageStore::default();
            let total = store
                .list(&job.source_dir, &job.file_extension)
                .map(|files| files.len())
                .unwrap_or(0);
            let bar = progress_bar(total);
            let observer = |message: &str, progress: Option<usize>| match progress {
                Some(done) => {
                    bar.set_position(done as u64);
                    bar.set_message(message.to_string());
                }
                None => bar.println(message),
            };

            info!(
                "Processing {} -> {}",
                job.source_dir.display(),
                job.dest_dir.display()
            );
            let start = Instant::now();
            let summary = process(
                &job,
                &store,
                calibrator.as_ref().map(|c| c as &dyn Calibrate),
                &observer,
                &CancelFlag::new(),
            )
            .context("Batch processing failed")?;
            bar.finish_and_clear();

            print_summary(&summary, start.elapsed());
            if !summary.failures.is_empty() {
                bail!("{} file(s) failed", summary.failures.len());
            }
        }
    }

    Ok(())
}
