use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use plate_detect_core::detection::infrastructure::cascade_loader;
use plate_detect_core::io::domain::image_reader::ImageReader;
use plate_detect_core::io::infrastructure::image_file_reader::ImageFileReader;
use plate_detect_core::io::infrastructure::image_file_writer::ImageFileWriter;
use plate_detect_core::io::infrastructure::raw_yuv_reader::RawYuvReader;
use plate_detect_core::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use plate_detect_core::pipeline::detection_config::DetectionConfig;
use plate_detect_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use plate_detect_core::pipeline::plate_pipeline::PlatePipeline;
use plate_detect_core::shared::constants::{
    CLASSIFIER_FILE_NAME, CLASSIFIER_URL, IMAGE_EXTENSIONS, RAW_YUV_EXTENSIONS,
};
use plate_detect_core::shared::model_resolver;
use plate_detect_core::shared::region::Region;
use plate_detect_core::shared::runtime;

/// Licence-plate detection for images and raw camera frames.
#[derive(Parser)]
#[command(name = "plate-detect")]
struct Cli {
    /// Input image files or raw YUV-420 camera frames.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for annotated images. Only inputs with plates are written.
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Haar cascade XML. Downloaded and cached when omitted.
    #[arg(long)]
    classifier: Option<PathBuf>,

    /// Enlargement applied before detection (> 1.0).
    #[arg(long)]
    resize_factor: Option<f64>,

    /// Step between pyramid levels of the cascade search (> 1.0).
    #[arg(long)]
    search_scale: Option<f64>,

    /// Neighbouring hits needed to keep a detection.
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Frame size of raw camera inputs, e.g. 640x480.
    #[arg(long, value_parser = parse_size)]
    yuv_size: Option<(u32, u32)>,

    /// JSON file with detection settings. Flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print detections as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct InputReport {
    input: PathBuf,
    output: Option<PathBuf>,
    plates: Vec<Region>,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns `false` when at least one input failed.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    runtime::init();
    let classifier_path = resolve_classifier(&cli)?;
    log::info!("Loading classifier {}", classifier_path.display());
    let cascade = Arc::new(cascade_loader::load(&classifier_path)?);
    let pipeline = PlatePipeline::new(cascade, &config)?;

    let mut logger = StdoutPipelineLogger::default();
    let total = cli.inputs.len();
    let mut reports = Vec::with_capacity(total);
    let mut failures = 0;
    let outputs = output_paths(&cli.inputs, &cli.output_dir);

    for (i, (input, output)) in cli.inputs.iter().zip(outputs).enumerate() {
        let use_case = AnnotateImageUseCase::new(
            open_reader(input, cli.yuv_size)?,
            Box::new(ImageFileWriter::new()),
            &pipeline,
        );

        match use_case.execute(input, &output, &mut logger) {
            Ok(plates) => {
                let output = (!plates.is_empty()).then_some(output);
                if !cli.json {
                    print_text(input, output.as_deref(), &plates);
                }
                reports.push(InputReport {
                    input: input.clone(),
                    output,
                    plates,
                });
            }
            Err(e) => {
                log::error!("{}: {e}", input.display());
                failures += 1;
            }
        }
        logger.progress(i + 1, total);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    logger.summary();

    if failures > 0 {
        eprintln!("{failures} of {total} inputs failed");
    }
    Ok(failures == 0)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_raw_yuv(input) && !is_image(input) {
            return Err(format!("Unsupported input type: {}", input.display()).into());
        }
        if is_raw_yuv(input) && cli.yuv_size.is_none() {
            return Err(format!(
                "--yuv-size is required for raw camera frame {}",
                input.display()
            )
            .into());
        }
    }
    if cli.output_dir.is_file() {
        return Err(format!(
            "Output directory is a file: {}",
            cli.output_dir.display()
        )
        .into());
    }
    if let Some(path) = &cli.classifier {
        if !path.exists() {
            return Err(format!("Classifier not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<DetectionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => DetectionConfig::from_json_file(path)?,
        None => DetectionConfig::default(),
    };
    if let Some(factor) = cli.resize_factor {
        config.resize_factor = factor;
    }
    if let Some(factor) = cli.search_scale {
        config.search_scale_factor = factor;
    }
    if let Some(n) = cli.min_neighbors {
        config.min_neighbors = n;
    }
    config.validate()?;
    Ok(config)
}

fn resolve_classifier(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.classifier {
        return Ok(path.clone());
    }
    log::info!("Resolving classifier: {CLASSIFIER_FILE_NAME}");
    let progress = DownloadProgress::default();
    let path = model_resolver::resolve(
        CLASSIFIER_FILE_NAME,
        CLASSIFIER_URL,
        None,
        Some(progress.callback()),
    );
    if progress.started() {
        eprintln!();
    }
    Ok(path?)
}

/// Tracks whether a download printed a progress line that needs ending.
#[derive(Default)]
struct DownloadProgress {
    started: Arc<AtomicBool>,
}

impl DownloadProgress {
    fn callback(&self) -> model_resolver::ProgressFn {
        let started = Arc::clone(&self.started);
        Box::new(move |downloaded, total| {
            started.store(true, Ordering::Relaxed);
            download_progress(downloaded, total);
        })
    }

    fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_raw_yuv(path: &Path) -> bool {
    has_extension(path, RAW_YUV_EXTENSIONS)
}

fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

fn open_reader(
    input: &Path,
    yuv_size: Option<(u32, u32)>,
) -> Result<Box<dyn ImageReader>, Box<dyn std::error::Error>> {
    if !is_raw_yuv(input) {
        return Ok(Box::new(ImageFileReader::new()));
    }
    let (width, height) =
        yuv_size.ok_or_else(|| format!("no frame size for {}", input.display()))?;
    Ok(Box::new(RawYuvReader::new(width, height)))
}

/// `<output_dir>/<input stem>.png` for each input, in order. Repeated stems
/// get a `-2`, `-3`, ... suffix so no output overwrites another.
fn output_paths(inputs: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame".to_string());
            let mut name = stem.clone();
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}-{n}");
                n += 1;
            }
            output_dir.join(format!("{name}.png"))
        })
        .collect()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid dimension '{s}' in '{value}'"))
    };
    let size = (parse(w)?, parse(h)?);
    if size.0 == 0 || size.1 == 0 || size.0 % 2 != 0 || size.1 % 2 != 0 {
        return Err(format!(
            "camera frame size must be positive and even, got {}x{}",
            size.0, size.1
        ));
    }
    Ok(size)
}

fn print_text(input: &Path, output: Option<&Path>, plates: &[Region]) {
    match output {
        Some(output) => {
            println!(
                "{}: {} plate(s) -> {}",
                input.display(),
                plates.len(),
                output.display()
            );
            for p in plates {
                println!("  x={} y={} w={} h={}", p.x, p.y, p.width, p.height);
            }
        }
        None => println!("{}: nothing to display", input.display()),
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading plate classifier... {pct}%");
    } else {
        eprint!("\rDownloading plate classifier... {downloaded} bytes");
    }
}
