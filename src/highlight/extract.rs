//! Clip extraction through the `ffmpeg` command-line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

use super::window::HighlightWindow;

const MARKER_SECS: f64 = 2.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One clip to cut from a source video.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipRequest {
    pub video_path: PathBuf,
    pub start: f64,
    pub end: f64,
    pub relative_goal_offset: f64,
}

impl ClipRequest {
    pub fn new(video_path: impl Into<PathBuf>, window: &HighlightWindow) -> Self {
        Self {
            video_path: video_path.into(),
            start: window.start,
            end: window.end,
            relative_goal_offset: window.relative_goal_offset,
        }
    }
}

/// Writes highlight clips to disk.
pub trait ClipExtractor {
    fn extract(&self, request: &ClipRequest, output: &Path) -> Result<()>;

    /// Shrink `clip` in place when it is larger than `max_mb`.
    fn optimize_for_upload(&self, _clip: &Path, _max_mb: f64) -> Result<()> {
        Ok(())
    }
}

/// Re-encodes clips with libx264/aac and overlays a "GOAL!" caption.
#[derive(Clone, Debug)]
pub struct FfmpegClipExtractor {
    binary: PathBuf,
    mark_goal_moment: bool,
}

impl FfmpegClipExtractor {
    /// Locate `ffmpeg` on `PATH`.
    pub fn new() -> Result<Self> {
        let binary = which::which("ffmpeg").context("ffmpeg not found on PATH")?;
        Ok(Self::with_binary(binary))
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            mark_goal_moment: true,
        }
    }

    pub fn with_marker(mut self, enabled: bool) -> Self {
        self.mark_goal_moment = enabled;
        self
    }

    fn extract_args(&self, request: &ClipRequest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", request.start).into(),
            "-i".into(),
            request.video_path.clone().into_os_string(),
            "-t".into(),
            format!("{:.3}", request.end - request.start).into(),
        ];
        if self.mark_goal_moment {
            args.push("-vf".into());
            args.push(goal_marker_filter(request.relative_goal_offset).into());
        }
        args.extend(encode_args("medium", 23));
        args.push(output.as_os_str().to_owned());
        args
    }

    fn run(&self, args: &[OsString]) -> Result<()> {
        log::debug!("running {} {:?}", self.binary.display(), args);
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run {}", self.binary.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
            return Err(anyhow!(
                "ffmpeg exited with {}: {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            ));
        }
        Ok(())
    }
}

impl ClipExtractor for FfmpegClipExtractor {
    fn extract(&self, request: &ClipRequest, output: &Path) -> Result<()> {
        log::info!(
            "extracting clip from {:.2}s to {:.2}s",
            request.start,
            request.end
        );
        self.run(&self.extract_args(request, output))
            .with_context(|| format!("extract {}", output.display()))?;
        log::info!("created highlight clip {}", output.display());
        Ok(())
    }

    fn optimize_for_upload(&self, clip: &Path, max_mb: f64) -> Result<()> {
        let size_mb = std::fs::metadata(clip)
            .with_context(|| format!("stat {}", clip.display()))?
            .len() as f64
            / BYTES_PER_MB;
        if size_mb <= max_mb {
            return Ok(());
        }
        log::info!(
            "{} is {:.2}MB, applying additional compression",
            clip.display(),
            size_mb
        );

        let compressed = compressed_sibling(clip);
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), clip.as_os_str().to_owned()];
        args.extend(encode_args("fast", 28));
        args.push(compressed.as_os_str().to_owned());

        if let Err(e) = self.run(&args) {
            let _ = std::fs::remove_file(&compressed);
            return Err(e.context(format!("compress {}", clip.display())));
        }
        std::fs::rename(&compressed, clip)
            .with_context(|| format!("replace {} with compressed copy", clip.display()))?;
        if let Ok(meta) = std::fs::metadata(clip) {
            log::info!("compressed video to {:.2}MB", meta.len() as f64 / BYTES_PER_MB);
        }
        Ok(())
    }
}

fn encode_args(preset: &str, crf: u32) -> Vec<OsString> {
    let crf = crf.to_string();
    [
        "-c:v", "libx264", "-preset", preset, "-crf", crf.as_str(), "-c:a", "aac",
    ]
    .iter()
    .map(OsString::from)
    .collect()
}

/// Centered red caption shown for two seconds, starting one second before
/// the goal (or at the clip start).
fn goal_marker_filter(relative_goal_offset: f64) -> String {
    let show_at = (relative_goal_offset - 1.0).max(0.0);
    format!(
        "drawtext=text='GOAL!':fontsize=50:fontcolor=red:borderw=2:bordercolor=white:\
         x=(w-text_w)/2:y=(h-text_h)/2:enable='between(t,{:.3},{:.3})'",
        show_at,
        show_at + MARKER_SECS
    )
}

fn compressed_sibling(clip: &Path) -> PathBuf {
    let stem = clip
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = clip
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    clip.with_file_name(format!("{}_compressed.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ClipRequest {
        ClipRequest {
            video_path: PathBuf::from("match.mp4"),
            start: 88.0,
            end: 100.0,
            relative_goal_offset: 10.0,
        }
    }

    fn as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn extract_args_seek_and_encode() {
        let extractor = FfmpegClipExtractor::with_binary("ffmpeg");
        let args = as_strings(&extractor.extract_args(&request(), Path::new("out.mp4")));
        assert_eq!(&args[..7], ["-y", "-ss", "88.000", "-i", "match.mp4", "-t", "12.000"]);
        assert!(args.windows(2).any(|w| w == ["-preset", "medium"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "23"]));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        let filter = &args[8];
        assert!(filter.contains("between(t,9.000,11.000)"));
    }

    #[test]
    fn marker_can_be_disabled() {
        let extractor = FfmpegClipExtractor::with_binary("ffmpeg").with_marker(false);
        let args = as_strings(&extractor.extract_args(&request(), Path::new("out.mp4")));
        assert!(!args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn marker_never_starts_before_clip() {
        assert!(goal_marker_filter(0.3).contains("between(t,0.000,2.000)"));
    }

    #[test]
    fn compressed_file_sits_next_to_clip() {
        assert_eq!(
            compressed_sibling(Path::new("/tmp/goal_highlight_12_1.mp4")),
            PathBuf::from("/tmp/goal_highlight_12_1_compressed.mp4")
        );
    }

    #[test]
    fn small_clips_are_left_alone() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"tiny")?;
        let extractor = FfmpegClipExtractor::with_binary("/nonexistent/ffmpeg");
        extractor.optimize_for_upload(&clip, 50.0)?;
        assert_eq!(std::fs::read(&clip)?, b"tiny");
        Ok(())
    }

    #[test]
    fn failed_compression_keeps_original() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, vec![0u8; 2048])?;
        let extractor = FfmpegClipExtractor::with_binary("/nonexistent/ffmpeg");
        assert!(extractor.optimize_for_upload(&clip, 0.001).is_err());
        assert_eq!(std::fs::metadata(&clip)?.len(), 2048);
        Ok(())
    }
}
