//! goal_highlights - detect goals in a match video and cut highlight clips

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use goal_highlights::{
    ClipExtractor, DetectorBackend, DirectoryUploader, FfmpegClipExtractor, FileConfig,
    FileSource, GoalDetector, HighlightConfig, HighlightPipeline, ReplayBackend, StubBackend,
    Uploader,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Match video (local file, or stub://name?seconds=S&fps=F).
    video: String,
    /// TOML config file (defaults to GOAL_HIGHLIGHTS_CONFIG when set).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Detector backend: replay, stub, or tract (overrides config).
    #[arg(long)]
    backend: Option<String>,
    /// JSON-lines detections file for the replay backend.
    #[arg(long)]
    detections: Option<PathBuf>,
    /// Goal times in seconds for the stub backend's synthetic match.
    #[arg(long, value_delimiter = ',')]
    stub_goals: Vec<f64>,
    /// ONNX model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Directory for highlight clips (default: a temporary directory).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Skip optimisation and upload.
    #[arg(long)]
    no_upload: bool,
    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// Print the result as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty || args.json);

    // Temp output is cleaned up when `run` returns, before the exit code is set.
    if !run(args, &ui)? {
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: Args, ui: &ui::Ui) -> Result<bool> {
    let config = {
        let _stage = ui.stage("Load configuration");
        match &args.config {
            Some(path) => HighlightConfig::from_path(path)?,
            None => HighlightConfig::load()?,
        }
    };

    let backend = {
        let _stage = ui.stage("Open detector");
        open_backend(&args, &config)?
    };
    log::info!("detector backend: {}", backend.name());

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let progress = ui.frames(0);
    let progress_handle = progress.clone();
    let detector = GoalDetector::new(config.clone(), backend)
        .with_cancel_flag(cancel.clone())
        .with_progress(move |done, total| progress_handle.update(done, total));

    let extractor: Box<dyn ClipExtractor> = match FfmpegClipExtractor::new() {
        Ok(extractor) => Box::new(extractor),
        Err(e) => {
            log::warn!("{:#}; clip extraction will fail", e);
            Box::new(FfmpegClipExtractor::with_binary("ffmpeg"))
        }
    };
    let uploader = if args.no_upload {
        None
    } else {
        Some(open_uploader(&config)?)
    };

    let temp_dir;
    let out_dir = match &args.out {
        Some(dir) => dir.clone(),
        None => {
            temp_dir = tempfile::Builder::new()
                .prefix("goal_highlights")
                .tempdir()
                .context("create temporary output directory")?;
            log::info!("writing clips to temporary directory {}", temp_dir.path().display());
            temp_dir.path().to_path_buf()
        }
    };

    let mut pipeline = HighlightPipeline::new(detector, extractor, uploader);
    let result = pipeline.process_video(&args.video, &out_dir);
    progress.finish();

    if cancel.load(Ordering::SeqCst) {
        log::warn!("interrupted by user");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{}", result);
    }
    if args.out.is_none() && args.no_upload && !result.highlight_clips.is_empty() {
        log::warn!("clips were written to a temporary directory and are removed on exit; pass --out to keep them");
    }
    Ok(result.success)
}

fn open_backend(args: &Args, config: &HighlightConfig) -> Result<Box<dyn DetectorBackend>> {
    let name = args
        .backend
        .as_deref()
        .unwrap_or(config.detection.backend.as_str());
    match name {
        "replay" => {
            let path = args
                .detections
                .as_ref()
                .ok_or_else(|| anyhow!("replay backend needs --detections <file>"))?;
            Ok(Box::new(ReplayBackend::open(path)?))
        }
        "stub" => {
            let info = FileSource::new(FileConfig {
                path: args.video.clone(),
                max_frame_width: config.detection.max_frame_width,
            })?
            .info();
            Ok(Box::new(StubBackend::synthetic_match(
                info.fps,
                info.frame_count as usize,
                info.width,
                info.height,
                &args.stub_goals,
            )))
        }
        "tract" => open_tract(args),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn open_tract(args: &Args) -> Result<Box<dyn DetectorBackend>> {
    let model = args
        .model
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend needs --model <file.onnx>"))?;
    Ok(Box::new(goal_highlights::detect::TractBackend::new(model, 640, 640)?))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_args: &Args) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}

fn open_uploader(config: &HighlightConfig) -> Result<Box<dyn Uploader>> {
    match &config.upload.url {
        #[cfg(feature = "upload-http")]
        Some(url) => Ok(Box::new(goal_highlights::HttpUploader::new(url)?)),
        #[cfg(not(feature = "upload-http"))]
        Some(_) => Err(anyhow!("upload url requires the upload-http feature")),
        None => Ok(Box::new(DirectoryUploader::new(&config.upload.directory)?)),
    }
}
