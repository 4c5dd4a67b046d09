//! Local file frame source.
//!
//! `FileSource` decodes a local video file frame by frame. Paths of the form
//! `stub://<name>?seconds=<s>&fps=<f>` produce blank synthetic footage of a
//! known length, which pairs with the scripted stub detector in tests.

use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Serialize;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

const LARGE_FILE_MB: f64 = 1000.0;
const KNOWN_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "flv", "wmv"];

const STUB_DEFAULT_SECONDS: f64 = 60.0;
const STUB_DEFAULT_FPS: f64 = 10.0;
const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 360;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path or `stub://` URL.
    pub path: String,
    /// Frames wider than this are downscaled, preserving aspect ratio.
    pub max_frame_width: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            max_frame_width: 1280,
        }
    }
}

/// Stream properties known before decoding starts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoInfo {
    pub fps: f64,
    pub frame_count: u64,
    /// Seconds; `frame_count / fps`, or 0 when fps is unknown.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    pub fn new(fps: f64, frame_count: u64, width: u32, height: u32) -> Self {
        let duration = if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        };
        Self {
            fps,
            frame_count,
            duration,
            width,
            height,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(&config.path)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    pub fn info(&self) -> VideoInfo {
        match &self.backend {
            FileBackend::Synthetic(source) => source.info.clone(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.info(),
        }
    }

    /// Decode the next frame; `Ok(None)` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => Ok(source.next_frame()),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
    pub path: String,
}

/// Check that an input video exists and looks like a video file.
///
/// Only a missing file is an error; very large files and unusual extensions
/// are logged.
pub fn validate_input(path: &str) -> Result<()> {
    if path.starts_with("stub://") {
        return Ok(());
    }
    let file = Path::new(path);
    let metadata = std::fs::metadata(file)
        .map_err(|e| anyhow!("video file not found: {} ({})", path, e))?;
    if !metadata.is_file() {
        return Err(anyhow!("video path is not a file: {}", path));
    }

    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
    if size_mb > LARGE_FILE_MB {
        log::warn!("large video file detected: {:.2}MB", size_mb);
        log::warn!("processing may take considerable time on CPU-only hosts");
    }

    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !KNOWN_EXTENSIONS.contains(&extension.as_str()) {
        log::warn!("unusual video format: .{}", extension);
    }

    log::info!("input validation passed for {} ({:.2}MB)", path, size_mb);
    Ok(())
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    path: String,
    info: VideoInfo,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(path: &str) -> Result<Self> {
        let mut seconds = STUB_DEFAULT_SECONDS;
        let mut fps = STUB_DEFAULT_FPS;
        if let Some((_, query)) = path.split_once('?') {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| anyhow!("stub parameter {} must be a number", key))?;
                match key {
                    "seconds" => seconds = parsed,
                    "fps" => fps = parsed,
                    other => return Err(anyhow!("unknown stub parameter '{}'", other)),
                }
            }
        }
        if !(fps > 0.0) || !(seconds >= 0.0) {
            return Err(anyhow!("stub source needs fps > 0 and seconds >= 0"));
        }

        let total = (seconds * fps).round() as u64;
        log::info!("FileSource: opened {} (synthetic, {} frames)", path, total);
        Ok(Self {
            path: path.to_string(),
            info: VideoInfo::new(fps, total, STUB_WIDTH, STUB_HEIGHT),
            frame_count: 0,
        })
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.frame_count >= self.info.frame_count {
            return None;
        }
        let pixels = vec![0u8; (STUB_WIDTH * STUB_HEIGHT * 3) as usize];
        let frame = Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT, self.frame_count);
        self.frame_count += 1;
        Some(frame)
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
            path: self.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(path: &str) -> Result<FileSource> {
        FileSource::new(FileConfig {
            path: path.to_string(),
            ..FileConfig::default()
        })
    }

    #[test]
    fn rejects_remote_urls() {
        assert!(stub("rtsp://camera/stream").is_err());
        assert!(stub("").is_err());
    }

    #[test]
    fn synthetic_source_has_known_length() -> Result<()> {
        let mut source = stub("stub://match?seconds=2&fps=5")?;
        let info = source.info();
        assert_eq!(info.frame_count, 10);
        assert_eq!(info.duration, 2.0);

        let mut seen = 0;
        while let Some(frame) = source.next_frame()? {
            assert_eq!(frame.index, seen);
            seen += 1;
        }
        assert_eq!(seen, 10);
        assert_eq!(source.stats().frames_decoded, 10);
        Ok(())
    }

    #[test]
    fn synthetic_source_rejects_bad_params() {
        assert!(stub("stub://match?fps=0").is_err());
        assert!(stub("stub://match?speed=2").is_err());
        assert!(stub("stub://match?fps=abc").is_err());
    }

    #[test]
    fn video_info_duration_handles_zero_fps() {
        assert_eq!(VideoInfo::new(0.0, 100, 1, 1).duration, 0.0);
        assert_eq!(VideoInfo::new(25.0, 100, 1, 1).duration, 4.0);
    }

    #[test]
    fn validate_input_reports_missing_file() {
        assert!(validate_input("/definitely/not/here.mp4").is_err());
        assert!(validate_input("stub://anything").is_ok());
    }
}
