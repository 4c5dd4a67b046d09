//! Processing session and the end-to-end highlight pipeline.
//!
//! `GoalDetector` owns one pass over a video: it decodes frames in order,
//! keeps the most recent ones in a `FrameRetentionBuffer`, asks the detector
//! backend about each frame, and records the filtered detections. Once the
//! stream ends the two scorers run over the full history, their outputs are
//! fused, and the event localizer turns the fused signal into goal
//! timestamps.
//!
//! `HighlightPipeline` wraps a detector with clip extraction and upload and
//! reports the outcome as a `PipelineResult`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::config::HighlightConfig;
use crate::detect::{nms, DetectionHistory, DetectorBackend, FrameDetections};
use crate::events::EventLocalizer;
use crate::frame::FrameRetentionBuffer;
use crate::highlight::{create_highlights, ClipExtractor};
use crate::ingest::{validate_input, FileConfig, FileSource, VideoInfo};
use crate::scoring::{CelebrationScorer, GoalAreaScorer, ProbabilityFusion};
use crate::upload::{upload_all, Uploader};

const PROGRESS_LOG_INTERVAL: u64 = 100;

type ProgressFn = Box<dyn FnMut(u64, u64)>;

/// What one processing session found.
#[derive(Clone, Debug)]
pub struct GoalAnalysis {
    pub info: VideoInfo,
    pub frames_processed: u64,
    /// Seconds covered by the processed frames, or the container duration
    /// when that is known.
    pub duration: f64,
    /// The session stopped early on request.
    pub cancelled: bool,
    /// Fused per-frame goal probability.
    pub probabilities: Vec<f64>,
    /// Ascending, in seconds.
    pub goal_timestamps: Vec<f64>,
}

pub struct GoalDetector {
    config: HighlightConfig,
    backend: Box<dyn DetectorBackend>,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressFn>,
}

impl GoalDetector {
    pub fn new(config: HighlightConfig, backend: Box<dyn DetectorBackend>) -> Self {
        Self {
            config,
            backend,
            cancel: None,
            progress: None,
        }
    }

    /// Stop reading frames once `flag` is set; what was read is still scored.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Called after every frame with `(processed, expected_total)`.
    pub fn with_progress<F: FnMut(u64, u64) + 'static>(mut self, progress: F) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Validate and open `video_path`, then run a full session over it.
    pub fn process_video(&mut self, video_path: &str) -> Result<GoalAnalysis> {
        validate_input(video_path)?;
        let mut source = FileSource::new(FileConfig {
            path: video_path.to_string(),
            max_frame_width: self.config.detection.max_frame_width,
        })?;
        self.process_source(&mut source)
    }

    pub fn process_source(&mut self, source: &mut FileSource) -> Result<GoalAnalysis> {
        let info = source.info();
        if !(info.fps > 0.0) || !info.fps.is_finite() {
            return Err(anyhow!("could not determine frame rate of the video"));
        }
        log::info!(
            "video: {:.2} fps, {} frames, {:.2}s",
            info.fps,
            info.frame_count,
            info.duration
        );

        let (history, cancelled) = self.collect_detections(source, &info)?;
        let frames_processed = history.len() as u64;
        let duration = decoded_duration(&info, frames_processed);

        let probabilities = self.score_history(&history);
        let goal_timestamps =
            EventLocalizer::from_config(&self.config.events).find_events(&probabilities, info.fps);
        for (i, t) in goal_timestamps.iter().enumerate() {
            log::info!("goal {} at {} ({:.2}s)", i + 1, format_timestamp(*t), t);
        }

        Ok(GoalAnalysis {
            info,
            frames_processed,
            duration,
            cancelled,
            probabilities,
            goal_timestamps,
        })
    }

    /// Fused goal probability for every frame of `history`.
    pub fn score_history(&self, history: &DetectionHistory) -> Vec<f64> {
        let ball = GoalAreaScorer::default().scores(history);
        let celebration = CelebrationScorer::from_config(&self.config.celebration).scores(history);
        ProbabilityFusion::new(self.config.fusion).fuse(&ball, &celebration, history.len())
    }

    fn collect_detections(
        &mut self,
        source: &mut FileSource,
        info: &VideoInfo,
    ) -> Result<(DetectionHistory, bool)> {
        let mut retained = FrameRetentionBuffer::for_video(info.fps, self.config.retention_secs)?;
        let mut history = DetectionHistory::new();
        let threshold = self.config.detection.confidence_threshold;
        let nms_threshold = self.config.detection.nms_threshold;
        self.backend.warm_up()?;

        loop {
            if self.is_cancelled() {
                log::warn!(
                    "processing cancelled after {} frames; scoring what was read",
                    history.len()
                );
                return Ok((history, true));
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("decode failed after {} frames, ending stream: {:#}", history.len(), e);
                    break;
                }
            };
            retained.push(frame);
            let Some(frame) = retained.latest() else {
                break;
            };

            let raw = match self.backend.detect(frame.pixels(), frame.width, frame.height) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("detector {} failed on frame {}: {:#}", self.backend.name(), frame.index, e);
                    Vec::new()
                }
            };
            let detections = nms::postprocess(raw, threshold, nms_threshold);
            history.push(FrameDetections::new(frame.width, frame.height, detections));

            let processed = history.len() as u64;
            if processed % PROGRESS_LOG_INTERVAL == 0 {
                log::info!("processed {}/{} frames", processed, info.frame_count);
                log::debug!(
                    "retained {} frames ({} bytes)",
                    retained.len(),
                    retained.memory_bytes()
                );
            }
            if let Some(progress) = self.progress.as_mut() {
                progress(processed, info.frame_count);
            }
        }

        log::info!(
            "detection finished: {} frames from {}",
            history.len(),
            source.stats().path
        );
        Ok((history, false))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }
}

/// Outcome of one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineResult {
    pub video_path: String,
    pub goal_timestamps: Vec<f64>,
    pub highlight_clips: Vec<PathBuf>,
    pub uploaded_files: Vec<String>,
    pub success: bool,
}

impl PipelineResult {
    fn new(video_path: &str) -> Self {
        Self {
            video_path: video_path.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "FOOTBALL GOAL DETECTION RESULTS")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Input Video: {}", self.video_path)?;
        writeln!(f, "Goals Detected: {}", self.goal_timestamps.len())?;
        if !self.goal_timestamps.is_empty() {
            writeln!(f, "\nGoal Timestamps:")?;
            for (i, t) in self.goal_timestamps.iter().enumerate() {
                writeln!(f, "  Goal {}: {} ({:.2}s)", i + 1, format_timestamp(*t), t)?;
            }
        }
        writeln!(f, "\nHighlight Clips Generated: {}", self.highlight_clips.len())?;
        for clip in &self.highlight_clips {
            let name = clip
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| clip.display().to_string());
            writeln!(f, "  - {}", name)?;
        }
        writeln!(f, "\nFiles Uploaded: {}", self.uploaded_files.len())?;
        for key in &self.uploaded_files {
            writeln!(f, "  - {}", key)?;
        }
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        writeln!(f, "\nPipeline Status: {}", status)?;
        write!(f, "{}", rule)
    }
}

/// `MM:SS`, truncating fractional seconds. Minutes are not capped at 59.
/// Container duration, extended to cover every decoded frame when the
/// container under-reports it.
fn decoded_duration(info: &VideoInfo, frames_processed: u64) -> f64 {
    let decoded = frames_processed as f64 / info.fps;
    if info.duration.is_finite() {
        info.duration.max(decoded)
    } else {
        decoded
    }
}

pub fn format_timestamp(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Detection, clip extraction, optimisation and upload for one video.
pub struct HighlightPipeline {
    detector: GoalDetector,
    extractor: Box<dyn ClipExtractor>,
    uploader: Option<Box<dyn Uploader>>,
}

impl HighlightPipeline {
    /// Without an uploader, success means at least one clip was written.
    pub fn new(
        detector: GoalDetector,
        extractor: Box<dyn ClipExtractor>,
        uploader: Option<Box<dyn Uploader>>,
    ) -> Self {
        Self {
            detector,
            extractor,
            uploader,
        }
    }

    /// Run every stage, writing clips to `out_dir`. Failures are logged and
    /// reflected in `success` rather than returned.
    pub fn process_video(&mut self, video_path: &str, out_dir: &Path) -> PipelineResult {
        let mut result = PipelineResult::new(video_path);
        log::info!("starting goal detection for {}", video_path);

        log::info!("step 1/4: detecting goals");
        let analysis = match self.detector.process_video(video_path) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::error!("goal detection failed: {:#}", e);
                return result;
            }
        };
        result.goal_timestamps = analysis.goal_timestamps.clone();
        if result.goal_timestamps.is_empty() {
            log::warn!("no goals detected in the video");
            return result;
        }

        log::info!("step 2/4: generating highlight clips");
        let settings = &self.detector.config().highlight;
        result.highlight_clips = match create_highlights(
            self.extractor.as_ref(),
            Path::new(video_path),
            &analysis.goal_timestamps,
            analysis.duration,
            settings,
            out_dir,
        ) {
            Ok(clips) => clips,
            Err(e) => {
                log::error!("clip generation failed: {:#}", e);
                return result;
            }
        };
        if result.highlight_clips.is_empty() {
            log::error!("failed to generate any highlight clips");
            return result;
        }

        let Some(uploader) = self.uploader.as_deref() else {
            log::info!("upload disabled; keeping {} clips", result.highlight_clips.len());
            result.success = true;
            return result;
        };

        log::info!("step 3/4: optimizing clips for upload");
        for clip in &result.highlight_clips {
            if let Err(e) = self.extractor.optimize_for_upload(clip, settings.max_upload_mb) {
                log::warn!("keeping unoptimized clip: {:#}", e);
            }
        }

        log::info!("step 4/4: uploading clips");
        result.uploaded_files = upload_all(uploader, &result.highlight_clips);
        result.success = !result.uploaded_files.is_empty();
        if result.success {
            log::info!(
                "pipeline completed: {} clips, {} uploaded",
                result.highlight_clips.len(),
                result.uploaded_files.len()
            );
        } else {
            log::error!("failed to upload any clips");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;

    fn stub_detector(seconds: f64, fps: f64, goals: &[f64]) -> GoalDetector {
        let frames = (seconds * fps).round() as usize;
        let backend = StubBackend::synthetic_match(fps, frames, 640, 360, goals);
        GoalDetector::new(HighlightConfig::default(), Box::new(backend))
    }

    #[test]
    fn finds_goals_in_synthetic_match() -> Result<()> {
        let mut detector = stub_detector(120.0, 10.0, &[30.0, 75.0]);
        let analysis = detector.process_video("stub://match?seconds=120&fps=10")?;
        assert_eq!(analysis.frames_processed, 1200);
        assert_eq!(analysis.probabilities.len(), 1200);
        assert_eq!(analysis.goal_timestamps.len(), 2);
        assert!((analysis.goal_timestamps[0] - 30.0).abs() < 1.0);
        assert!((analysis.goal_timestamps[1] - 75.0).abs() < 1.0);
        Ok(())
    }

    #[test]
    fn quiet_match_has_no_goals() -> Result<()> {
        let mut detector = stub_detector(60.0, 10.0, &[]);
        let analysis = detector.process_video("stub://match?seconds=60&fps=10")?;
        assert!(analysis.goal_timestamps.is_empty());
        Ok(())
    }

    #[test]
    fn cancelled_session_scores_nothing_read() -> Result<()> {
        let flag = Arc::new(AtomicBool::new(true));
        let mut detector = stub_detector(60.0, 10.0, &[30.0]).with_cancel_flag(flag);
        let analysis = detector.process_video("stub://match?seconds=60&fps=10")?;
        assert!(analysis.cancelled);
        assert_eq!(analysis.frames_processed, 0);
        assert!(analysis.goal_timestamps.is_empty());
        Ok(())
    }

    #[test]
    fn progress_sees_every_frame() -> Result<()> {
        let seen = std::rc::Rc::new(std::cell::Cell::new(0u64));
        let sink = seen.clone();
        let mut detector =
            stub_detector(5.0, 10.0, &[]).with_progress(move |done, total| {
                assert_eq!(total, 50);
                sink.set(done);
            });
        detector.process_video("stub://match?seconds=5&fps=10")?;
        assert_eq!(seen.get(), 50);
        Ok(())
    }

    #[test]
    fn late_goal_fits_when_container_under_reports_duration() {
        let info = VideoInfo::new(10.0, 500, 640, 360);
        let duration = decoded_duration(&info, 600);
        assert_eq!(duration, 60.0);
        assert!(crate::highlight::HighlightWindow::compute(58.0, duration, 10.0, 10.0).is_ok());

        assert_eq!(decoded_duration(&info, 300), 50.0);
        assert_eq!(decoded_duration(&VideoInfo::new(10.0, 0, 640, 360), 120), 12.0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.9), "01:15");
        assert_eq!(format_timestamp(3725.0), "62:05");
    }

    #[test]
    fn missing_video_is_a_failed_result() {
        let detector = stub_detector(1.0, 10.0, &[]);
        let extractor = crate::highlight::FfmpegClipExtractor::with_binary("ffmpeg");
        let mut pipeline = HighlightPipeline::new(detector, Box::new(extractor), None);
        let result = pipeline.process_video("/no/such/match.mp4", Path::new("/tmp"));
        assert!(!result.success);
        assert!(result.goal_timestamps.is_empty());
        assert_eq!(result.video_path, "/no/such/match.mp4");
    }
}
