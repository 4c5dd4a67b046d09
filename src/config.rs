use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::frame::DEFAULT_RETENTION_SECS;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.45;
const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
const DEFAULT_BACKEND: &str = "replay";
const DEFAULT_MAX_FRAME_WIDTH: u32 = 1280;
const DEFAULT_PRE_GOAL_SECS: f64 = 10.0;
const DEFAULT_POST_GOAL_SECS: f64 = 10.0;
const DEFAULT_OUTPUT_PREFIX: &str = "goal_highlight_";
const DEFAULT_OUTPUT_FORMAT: &str = "mp4";
const DEFAULT_MAX_UPLOAD_MB: f64 = 50.0;
const DEFAULT_MIN_EVENT_SEPARATION_SECS: f64 = 20.0;
const DEFAULT_HEIGHT_STD_MULTIPLIER: f64 = 1.0;
const DEFAULT_MIN_PROMINENCE: f64 = 0.3;
const DEFAULT_CELEBRATION_WEIGHT: f64 = 0.35;
const DEFAULT_BALL_WEIGHT: f64 = 0.65;
const DEFAULT_MIN_PERSONS: usize = 6;
const DEFAULT_MAX_CLUSTERS: usize = 6;
const DEFAULT_CLUSTER_FALLBACK_SCORE: f64 = 0.1;
const DEFAULT_UPLOAD_DIR: &str = "highlights";

const MAX_EVENT_SEPARATION_SECS: f64 = 3600.0;
const MAX_RETENTION_SECS: f64 = 600.0;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct HighlightConfigFile {
    detection: Option<DetectionConfigFile>,
    highlight: Option<HighlightSectionFile>,
    events: Option<EventsConfigFile>,
    fusion: Option<FusionConfigFile>,
    celebration: Option<CelebrationConfigFile>,
    retention: Option<RetentionConfigFile>,
    upload: Option<UploadConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    backend: Option<String>,
    max_frame_width: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct HighlightSectionFile {
    pre_goal_duration: Option<f64>,
    post_goal_duration: Option<f64>,
    output_prefix: Option<String>,
    output_format: Option<String>,
    max_upload_mb: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EventsConfigFile {
    min_event_separation_seconds: Option<f64>,
    height_std_multiplier: Option<f64>,
    min_prominence: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FusionConfigFile {
    celebration: Option<f64>,
    ball: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CelebrationConfigFile {
    min_persons: Option<usize>,
    max_clusters: Option<usize>,
    fallback_score: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RetentionConfigFile {
    seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct UploadConfigFile {
    directory: Option<PathBuf>,
    url: Option<String>,
}

/// All tunables of the detection and highlight pipeline.
///
/// Components are constructed from their own section rather than reading
/// globals, so tests can build any stage with a hand-made config.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightConfig {
    pub detection: DetectionSettings,
    pub highlight: HighlightSettings,
    pub events: EventSettings,
    pub fusion: FusionWeights,
    pub celebration: CelebrationSettings,
    pub retention_secs: f64,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub backend: String,
    pub max_frame_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSettings {
    pub pre_goal_duration: f64,
    pub post_goal_duration: f64,
    pub output_prefix: String,
    pub output_format: String,
    pub max_upload_mb: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSettings {
    pub min_event_separation_seconds: f64,
    pub height_std_multiplier: f64,
    pub min_prominence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub celebration: f64,
    pub ball: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CelebrationSettings {
    /// A frame needs strictly more persons than this to be clustered.
    pub min_persons: usize,
    pub max_clusters: usize,
    pub fallback_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub url: Option<String>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        // Every field of an empty file falls back to its default.
        Self::from_file(HighlightConfigFile::default())
    }
}

impl HighlightConfig {
    /// Load from `GOAL_HIGHLIGHTS_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GOAL_HIGHLIGHTS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load an explicit config file, then apply env overrides.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HighlightConfigFile) -> Self {
        let detection = file.detection.unwrap_or_default();
        let highlight = file.highlight.unwrap_or_default();
        let events = file.events.unwrap_or_default();
        let fusion = file.fusion.unwrap_or_default();
        let celebration = file.celebration.unwrap_or_default();
        let upload = file.upload.unwrap_or_default();

        Self {
            detection: DetectionSettings {
                confidence_threshold: detection
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                nms_threshold: detection.nms_threshold.unwrap_or(DEFAULT_NMS_THRESHOLD),
                backend: detection
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                max_frame_width: detection
                    .max_frame_width
                    .unwrap_or(DEFAULT_MAX_FRAME_WIDTH),
            },
            highlight: HighlightSettings {
                pre_goal_duration: highlight
                    .pre_goal_duration
                    .unwrap_or(DEFAULT_PRE_GOAL_SECS),
                post_goal_duration: highlight
                    .post_goal_duration
                    .unwrap_or(DEFAULT_POST_GOAL_SECS),
                output_prefix: highlight
                    .output_prefix
                    .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
                output_format: highlight
                    .output_format
                    .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),
                max_upload_mb: highlight.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB),
            },
            events: EventSettings {
                min_event_separation_seconds: events
                    .min_event_separation_seconds
                    .unwrap_or(DEFAULT_MIN_EVENT_SEPARATION_SECS),
                height_std_multiplier: events
                    .height_std_multiplier
                    .unwrap_or(DEFAULT_HEIGHT_STD_MULTIPLIER),
                min_prominence: events.min_prominence.unwrap_or(DEFAULT_MIN_PROMINENCE),
            },
            fusion: FusionWeights {
                celebration: fusion.celebration.unwrap_or(DEFAULT_CELEBRATION_WEIGHT),
                ball: fusion.ball.unwrap_or(DEFAULT_BALL_WEIGHT),
            },
            celebration: CelebrationSettings {
                min_persons: celebration.min_persons.unwrap_or(DEFAULT_MIN_PERSONS),
                max_clusters: celebration.max_clusters.unwrap_or(DEFAULT_MAX_CLUSTERS),
                fallback_score: celebration
                    .fallback_score
                    .unwrap_or(DEFAULT_CLUSTER_FALLBACK_SCORE),
            },
            retention_secs: file
                .retention
                .and_then(|retention| retention.seconds)
                .unwrap_or(DEFAULT_RETENTION_SECS),
            upload: UploadSettings {
                directory: upload
                    .directory
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                url: upload.url,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("GOAL_HIGHLIGHTS_CONFIDENCE") {
            self.detection.confidence_threshold = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("GOAL_HIGHLIGHTS_CONFIDENCE must be a number"))?;
        }
        if let Ok(value) = std::env::var("GOAL_HIGHLIGHTS_NMS") {
            self.detection.nms_threshold = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("GOAL_HIGHLIGHTS_NMS must be a number"))?;
        }
        if let Ok(value) = std::env::var("GOAL_HIGHLIGHTS_PRE_GOAL_SECS") {
            self.highlight.pre_goal_duration = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("GOAL_HIGHLIGHTS_PRE_GOAL_SECS must be a number of seconds"))?;
        }
        if let Ok(value) = std::env::var("GOAL_HIGHLIGHTS_POST_GOAL_SECS") {
            self.highlight.post_goal_duration = value.trim().parse().map_err(|_| {
                anyhow!("GOAL_HIGHLIGHTS_POST_GOAL_SECS must be a number of seconds")
            })?;
        }
        if let Ok(dir) = std::env::var("GOAL_HIGHLIGHTS_UPLOAD_DIR") {
            if !dir.trim().is_empty() {
                self.upload.directory = PathBuf::from(dir);
            }
        }
        if let Ok(url) = std::env::var("GOAL_HIGHLIGHTS_UPLOAD_URL") {
            if !url.trim().is_empty() {
                self.upload.url = Some(url);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("detection.confidence_threshold", self.detection.confidence_threshold as f64)?;
        check_unit("detection.nms_threshold", self.detection.nms_threshold as f64)?;
        if self.detection.max_frame_width == 0 {
            return Err(anyhow!("detection.max_frame_width must be greater than zero"));
        }
        check_non_negative("highlight.pre_goal_duration", self.highlight.pre_goal_duration)?;
        check_non_negative("highlight.post_goal_duration", self.highlight.post_goal_duration)?;
        if self.highlight.pre_goal_duration + self.highlight.post_goal_duration <= 0.0 {
            return Err(anyhow!("highlight window must span a positive duration"));
        }
        if self.highlight.output_format.trim().is_empty() {
            return Err(anyhow!("highlight.output_format must not be empty"));
        }
        check_non_negative("highlight.max_upload_mb", self.highlight.max_upload_mb)?;
        check_positive_at_most(
            "events.min_event_separation_seconds",
            self.events.min_event_separation_seconds,
            MAX_EVENT_SEPARATION_SECS,
        )?;
        check_non_negative("events.height_std_multiplier", self.events.height_std_multiplier)?;
        check_non_negative("events.min_prominence", self.events.min_prominence)?;
        check_non_negative("fusion.celebration", self.fusion.celebration)?;
        check_non_negative("fusion.ball", self.fusion.ball)?;
        if self.fusion.celebration + self.fusion.ball <= 0.0 {
            return Err(anyhow!("fusion weights must not both be zero"));
        }
        if self.celebration.max_clusters == 0 {
            return Err(anyhow!("celebration.max_clusters must be at least 1"));
        }
        check_unit("celebration.fallback_score", self.celebration.fallback_score)?;
        check_positive_at_most("retention.seconds", self.retention_secs, MAX_RETENTION_SECS)?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("{} must be a non-negative number, got {}", name, value));
    }
    Ok(())
}

fn check_positive_at_most(name: &str, value: f64, max: f64) -> Result<()> {
    if !(value > 0.0 && value <= max) {
        return Err(anyhow!("{} must be within (0, {}], got {}", name, max, value));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<HighlightConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
