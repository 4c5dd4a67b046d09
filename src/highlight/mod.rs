//! Highlight clips around detected goals.
//!
//! - `window`: clip boundaries for a goal timestamp.
//! - `extract`: the clip extractor seam and its ffmpeg implementation.

mod extract;
mod window;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::HighlightSettings;

pub use extract::{ClipExtractor, ClipRequest, FfmpegClipExtractor};
pub use window::HighlightWindow;

/// `{prefix}{minute:02}_{n}.{format}`, where `n` is the 1-based event number.
pub fn clip_file_name(prefix: &str, format: &str, goal: f64, number: usize) -> String {
    let minute = (goal / 60.0).floor().max(0.0) as u64;
    format!("{}{:02}_{}.{}", prefix, minute, number, format)
}

/// Cut one clip per goal into `out_dir`.
///
/// Goals whose window cannot be computed or whose extraction fails are
/// logged and skipped. Only a missing output directory is an error.
pub fn create_highlights(
    extractor: &dyn ClipExtractor,
    video_path: &Path,
    goals: &[f64],
    duration: f64,
    settings: &HighlightSettings,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;

    let mut clips = Vec::with_capacity(goals.len());
    for (i, &goal) in goals.iter().enumerate() {
        let window = match HighlightWindow::compute(
            goal,
            duration,
            settings.pre_goal_duration,
            settings.post_goal_duration,
        ) {
            Ok(window) => window,
            Err(e) => {
                log::error!("skipping goal at {:.2}s: {:#}", goal, e);
                continue;
            }
        };

        let name = clip_file_name(&settings.output_prefix, &settings.output_format, goal, i + 1);
        let output = out_dir.join(&name);
        match extractor.extract(&ClipRequest::new(video_path, &window), &output) {
            Ok(()) => {
                log::info!("created highlight clip {}/{}: {}", i + 1, goals.len(), name);
                clips.push(output);
            }
            Err(e) => log::error!("failed to create highlight clip for goal at {:.2}s: {:#}", goal, e),
        }
    }
    Ok(clips)
}
