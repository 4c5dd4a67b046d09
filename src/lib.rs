//! Goal highlights
//!
//! Finds goals in football match footage from per-frame object detections
//! and cuts highlight clips around them.
//!
//! # Pipeline
//!
//! 1. A `FileSource` decodes frames in order; the most recent ones are held
//!    in a bounded `FrameRetentionBuffer`.
//! 2. A `DetectorBackend` reports persons and balls per frame; detections
//!    are confidence-gated and NMS-filtered into a `DetectionHistory`.
//! 3. Two scorers read the history: ball presence in a goal mouth and
//!    player clustering. Their max-normalized outputs are fused with fixed
//!    weights into one probability per frame.
//! 4. The `EventLocalizer` picks well-separated, prominent peaks of the
//!    fused signal as goal timestamps.
//! 5. Each goal gets a `HighlightWindow`; a `ClipExtractor` writes the clip
//!    and an `Uploader` stores it.
//!
//! # Module Structure
//!
//! - `config`: TOML + environment configuration
//! - `detect`: detection types, backends, NMS
//! - `frame`: decoded frames and the retention buffer
//! - `ingest`: video sources and input validation
//! - `scoring`: goal-area and celebration scorers, fusion
//! - `events`: peak-based event localization
//! - `highlight`: clip windows and extraction
//! - `upload`: clip uploaders
//! - `pipeline`: the processing session and end-to-end pipeline

pub mod config;
pub mod detect;
pub mod events;
pub mod frame;
pub mod highlight;
pub mod ingest;
pub mod pipeline;
pub mod scoring;
pub mod upload;

pub use config::HighlightConfig;
pub use detect::{
    BoundingBox, Detection, DetectionHistory, DetectorBackend, FrameDetections, ObjectClass,
    ReplayBackend, StubBackend,
};
pub use events::EventLocalizer;
pub use frame::{Frame, FrameRetentionBuffer};
pub use highlight::{
    clip_file_name, create_highlights, ClipExtractor, ClipRequest, FfmpegClipExtractor,
    HighlightWindow,
};
pub use ingest::{validate_input, FileConfig, FileSource, VideoInfo};
pub use pipeline::{format_timestamp, GoalAnalysis, GoalDetector, HighlightPipeline, PipelineResult};
pub use scoring::{CelebrationScorer, GoalAreaScorer, ProbabilityFusion};
pub use upload::{upload_all, DirectoryUploader, Uploader};

#[cfg(feature = "upload-http")]
pub use upload::HttpUploader;
