use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Serialize;

use cascade_detect_core::analysis::comparison::{
    compare, summarize_sections, CompareOptions, SectionSummary, SeriesComparison,
};
use cascade_detect_core::analysis::face_series::{face_series, SeriesKind};
use cascade_detect_core::analysis::series_file::read_series;
use cascade_detect_core::detection::domain::detection_params::DetectionParams;
use cascade_detect_core::detection::infrastructure::haar_cascade_detector::HaarCascadeDetector;
use cascade_detect_core::pipeline::detect_faces_use_case::{DetectFacesUseCase, FrameDetections};
use cascade_detect_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use cascade_detect_core::shared::constants::{
    CASCADE_MODEL_NAME, CASCADE_MODEL_URL, DEFAULT_MAX_FACE, DEFAULT_MIN_FACE,
    DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR, DEFAULT_VIDEO, IMAGE_EXTENSIONS,
};
use cascade_detect_core::shared::model_resolver;
use cascade_detect_core::video::domain::image_writer::ImageWriter;
use cascade_detect_core::video::domain::video_reader::VideoReader;
use cascade_detect_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use cascade_detect_core::video::infrastructure::image_file_reader::ImageFileReader;
use cascade_detect_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Detect faces in the first frame of a video with a Haar cascade.
#[derive(Parser, Debug)]
#[command(name = "face-detect")]
struct Cli {
    /// Input video or image file.
    #[arg(default_value = DEFAULT_VIDEO)]
    input: PathBuf,

    /// Cascade XML file (default: cached or downloaded frontal face model).
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Image shrink factor between scan scales (> 1.0).
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR)]
    scale_factor: f64,

    /// Raw hits a detection needs to be kept (0 = keep every hit).
    #[arg(long, default_value_t = DEFAULT_MIN_NEIGHBORS)]
    min_neighbors: u32,

    /// Smallest face side in pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_FACE)]
    min_size: u32,

    /// Largest face side in pixels (0 = no limit).
    #[arg(long, default_value_t = DEFAULT_MAX_FACE)]
    max_size: u32,

    /// Smallest face side as a fraction of the shorter frame side; overrides --min-size.
    #[arg(long)]
    min_size_ratio: Option<f64>,

    /// Number of leading frames to scan.
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Save the first frame with detections outlined to this image path.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Print detections as JSON instead of text lines.
    #[arg(long)]
    json: bool,

    /// Reference series (one value per frame) to score the detections against.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Per-frame quantity compared and summarized: count, width, center-x, center-y.
    #[arg(long, default_value = "count")]
    series: SeriesKind,

    /// Sentinel value marking a missing sample (repeatable).
    #[arg(long = "invalid-value", allow_hyphen_values = true)]
    invalid_values: Vec<f64>,

    /// Fixed shift of the detections against the reference, in frames
    /// (default: estimated by cross-correlation).
    #[arg(long, allow_hyphen_values = true)]
    delay: Option<isize>,

    /// Largest absolute error counted as accurate.
    #[arg(long, default_value_t = 0.5)]
    accuracy_threshold: f64,

    /// Summarize the series in sections of this many frames.
    #[arg(long)]
    section: Option<usize>,

    /// Frames skipped before the first section.
    #[arg(long, default_value_t = 0)]
    section_offset: usize,
}

/// Everything printed for one run.
#[derive(Serialize)]
struct Report {
    frames: Vec<FrameDetections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sections: Option<Vec<SectionSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<SeriesComparison>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let params = build_params(&cli)?;
    params.validate()?;

    log::info!("Resolving cascade: {CASCADE_MODEL_NAME}");
    let cascade_path = model_resolver::resolve(
        CASCADE_MODEL_NAME,
        CASCADE_MODEL_URL,
        cli.cascade.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    let detector = HaarCascadeDetector::from_file(&cascade_path, params)?;
    let (window_w, window_h) = detector.cascade().window_size();
    let scan = detector.params();
    log::info!(
        "Scanning with {window_w}x{window_h} window, scale {}, min neighbors {}, min {:?}, max {:?}",
        scan.scale_factor,
        scan.min_neighbors,
        scan.min_size,
        scan.max_size
    );

    let image_writer: Option<Box<dyn ImageWriter>> = cli
        .annotate
        .as_ref()
        .map(|_| Box::new(ImageFileWriter::new()) as Box<dyn ImageWriter>);
    let mut use_case = DetectFacesUseCase::new(
        open_reader(&cli.input),
        Box::new(detector),
        image_writer,
        Box::new(StdoutPipelineLogger::new()),
    );
    let results = use_case.execute(&cli.input, cli.frames, cli.annotate.as_deref())?;

    let total: usize = results.iter().map(|r| r.detections.len()).sum();
    log::info!("{total} detections in {} frames", results.len());

    let report = analyze(&cli, results)?;

    let mut out = std::io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for line in format_report(&report) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

/// Section statistics and reference comparison of the chosen series.
fn analyze(cli: &Cli, frames: Vec<FrameDetections>) -> Result<Report, Box<dyn std::error::Error>> {
    let series = face_series(&frames, cli.series);

    let sections = match cli.section {
        Some(window) => Some(summarize_sections(
            &series,
            window,
            cli.section_offset,
            &cli.invalid_values,
        )?),
        None => None,
    };

    let comparison = match &cli.reference {
        Some(path) => {
            let reference = read_series(path)?;
            log::info!(
                "Comparing {} series ({} frames) with {} ({} samples)",
                cli.series,
                series.len(),
                path.display(),
                reference.len()
            );
            let options = CompareOptions {
                invalid_values: cli.invalid_values.clone(),
                delay: cli.delay,
                accuracy_threshold: cli.accuracy_threshold,
            };
            Some(compare(&series, &reference, &options)?)
        }
        None => None,
    };

    Ok(Report {
        frames,
        sections,
        comparison,
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(cascade) = &cli.cascade {
        if !cascade.is_file() {
            return Err(format!("Cascade file not found: {}", cascade.display()).into());
        }
    }
    if cli.frames == 0 {
        return Err("--frames must be at least 1".into());
    }
    if let Some(reference) = &cli.reference {
        if !reference.is_file() {
            return Err(format!("Reference file not found: {}", reference.display()).into());
        }
    }
    if cli.section == Some(0) {
        return Err("--section must be at least 1".into());
    }
    Ok(())
}

/// Detection parameters from the flags. A size ratio needs the frame size,
/// so the source is opened once before the real run.
fn build_params(cli: &Cli) -> Result<DetectionParams, Box<dyn std::error::Error>> {
    let min_size = match cli.min_size_ratio {
        Some(ratio) => {
            let mut reader = open_reader(&cli.input);
            let metadata = reader.open(&cli.input)?;
            reader.close();
            let size = DetectionParams::min_size_for(metadata.width, metadata.height, ratio)?;
            log::info!(
                "Min face size {}x{} ({ratio} of {}x{})",
                size.0,
                size.1,
                metadata.width,
                metadata.height
            );
            size
        }
        None => (cli.min_size, cli.min_size),
    };
    Ok(DetectionParams {
        scale_factor: cli.scale_factor,
        min_neighbors: cli.min_neighbors,
        min_size,
        max_size: (cli.max_size, cli.max_size),
    })
}

/// One `frame x y w h neighbors` line per detection.
fn format_lines(results: &[FrameDetections]) -> Vec<String> {
    results
        .iter()
        .flat_map(|frame| {
            frame.detections.iter().map(move |d| {
                let r = d.region;
                format!(
                    "{} {} {} {} {} {}",
                    frame.frame_index, r.x, r.y, r.width, r.height, d.neighbors
                )
            })
        })
        .collect()
}

/// Detection lines followed by `section` and `compare` lines when requested.
fn format_report(report: &Report) -> Vec<String> {
    let mut lines = format_lines(&report.frames);
    for s in report.sections.iter().flatten() {
        lines.push(format!(
            "section {} {:.3} {:.3} {}",
            s.start, s.average, s.std_dev, s.mode
        ));
    }
    if let Some(c) = &report.comparison {
        lines.push(format!(
            "compare delay={} samples={} r={:.4} me={:.4} mae={:.4} rmse={:.4} accuracy={:.4}",
            c.delay,
            c.samples,
            c.correlation,
            c.mean_error,
            c.mean_abs_error,
            c.root_mean_sq_error,
            c.accuracy
        ));
    }
    lines
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading cascade... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading cascade... {downloaded} bytes");
    }
}
