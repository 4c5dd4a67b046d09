//! Video frame sources.
//!
//! - Local video files (feature: ingest-file-ffmpeg)
//! - `stub://` synthetic footage (testing)
//!
//! Sources yield decoded RGB24 `Frame`s strictly in capture order. A decode
//! failure ends the stream; there is no retry.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{validate_input, FileConfig, FileSource, FileStats, VideoInfo};
