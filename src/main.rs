//! Power-outage schedule detector.
//!
//! Command-line front end for the extraction pipeline: processes schedule
//! images into JSON, prints sampled grids, renders calibration previews, and
//! prepares the Tesseract installation.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use poweroff_detector::detection::{Extraction, GridSampler, ScheduleExtractor};
use poweroff_detector::export::{export_to_json, ExportRecord};
use poweroff_detector::notify::{day_label, format_update, upcoming_outages};
use poweroff_detector::ocr::{ensure_tesseract, Tesseract};
use poweroff_detector::{history, log, paths, preview, worker, ExtractorConfig};

/// Reads power-outage schedule images into per-group on/off intervals.
#[derive(Debug, Parser)]
#[command(name = "poweroff-detector")]
struct Cli {
    /// Path to config.json (defaults to the one next to the executable).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract schedules from images, one JSON line per image on stdout.
    Extract {
        /// Image files to process.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Number of worker threads.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Reference date (YYYY-MM-DD) for year-less dates and day labels.
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Current hour used to drop past outages from today's messages.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
        now_hour: Option<u8>,

        /// Also print the subscriber message for every group.
        #[arg(long)]
        messages: bool,

        /// Append extracted intervals to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write all results to this JSON file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the sampled grid of one image.
    ///
    /// Uses the calibration entry given by `--entry`, or the one whose anchor
    /// date is recognised.
    Grid {
        image: PathBuf,

        #[arg(long)]
        entry: Option<usize>,
    },

    /// Draw anchor boxes and probe points of a calibration entry onto an image.
    Preview {
        image: PathBuf,

        #[arg(long, default_value_t = 0)]
        entry: usize,

        #[arg(long)]
        out: PathBuf,
    },

    /// Check the Tesseract installation and download missing language data.
    Setup,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("invalid date '{value}': {e}"))
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    let cli = Cli::parse();

    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: could not create log directory: {}", e);
    }

    let config = ExtractorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Extract {
            images,
            jobs,
            today,
            now_hour,
            messages,
            csv,
            out,
        } => run_extract(config, images, jobs, today, now_hour, messages, csv, out),
        Command::Grid { image, entry } => run_grid(config, image, entry),
        Command::Preview { image, entry, out } => run_preview(config, image, entry, out),
        Command::Setup => {
            let installed = ensure_tesseract(&config.ocr)?;
            println!(
                "tesseract: {} (languages: {})",
                installed.executable.display(),
                installed.languages.join(", ")
            );
            Ok(())
        }
    }
}

fn build_extractor(config: ExtractorConfig) -> Result<ScheduleExtractor<Tesseract>> {
    let tesseract = Tesseract::from_config(&config.ocr)
        .context("Tesseract is required; run `poweroff-detector setup`")?;
    ScheduleExtractor::new(config, tesseract)
}

#[allow(clippy::too_many_arguments)]
fn run_extract(
    config: ExtractorConfig,
    images: Vec<PathBuf>,
    jobs: Option<usize>,
    today: Option<NaiveDate>,
    now_hour: Option<u8>,
    messages: bool,
    csv: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let now = Local::now();
    let today = today.unwrap_or_else(|| now.date_naive());
    let now_hour = now_hour.unwrap_or(now.hour() as u8);
    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let extractor = build_extractor(config)?;
    let groups = extractor.config().geometry.groups.clone();

    if let Some(csv_path) = &csv {
        history::init_csv(csv_path)?;
    }

    let results = worker::run_batch(&extractor, images, jobs, today);

    for result in &results {
        let record = ExportRecord {
            source: &result.path,
            extraction: &result.extraction,
        };
        println!("{}", serde_json::to_string(&record)?);

        let Some(schedule) = result.extraction.to_schedule(&groups) else {
            continue;
        };

        if let Some(csv_path) = &csv {
            history::append_schedule(csv_path, &schedule, &result.path.to_string_lossy())?;
        }

        if messages {
            let label = day_label(schedule.date, today);
            for (group, intervals) in &schedule.groups {
                let outages = upcoming_outages(intervals, label, now_hour);
                println!("{}", format_update(group, label, &outages));
            }
        }
    }

    if let Some(out_path) = &out {
        let pairs: Vec<(PathBuf, Extraction)> = results
            .into_iter()
            .map(|r| (r.path, r.extraction))
            .collect();
        export_to_json(&pairs, out_path)?;
        log(&format!("Results saved: {}", out_path.display()));
    }

    Ok(())
}

fn run_grid(config: ExtractorConfig, image: PathBuf, entry: Option<usize>) -> Result<()> {
    let img = image::open(&image)
        .with_context(|| format!("Failed to open {}", image.display()))?
        .to_rgba8();

    let (offset, date) = match entry {
        Some(idx) => {
            let calibration = config
                .geometry
                .calibrations
                .get(idx)
                .ok_or_else(|| anyhow!("no calibration entry {}", idx))?;
            (calibration.offset, None)
        }
        None => {
            let extractor = build_extractor(config.clone())?;
            let located = extractor
                .date_locator()
                .locate(&img)?
                .ok_or_else(|| anyhow!("no calibration entry matched; pass --entry to force one"))?;
            (located.offset, Some(located.date))
        }
    };

    let status = GridSampler::new(&config.geometry, config.red_threshold).sample(&img, offset)?;

    if let Some(date) = date {
        println!("date: {}", date.format("%d.%m.%Y"));
    }
    print!("{}", status.render_grid());
    Ok(())
}

fn run_preview(config: ExtractorConfig, image: PathBuf, entry: usize, out: PathBuf) -> Result<()> {
    if entry >= config.geometry.calibrations.len() {
        return Err(anyhow!("no calibration entry {}", entry));
    }

    let img = image::open(&image)
        .with_context(|| format!("Failed to open {}", image.display()))?
        .to_rgba8();

    let rendered = preview::render_preview(&img, &config.geometry, entry);
    preview::save_preview(&rendered, &out)?;
    log(&format!("Preview saved: {}", out.display()));
    Ok(())
}
