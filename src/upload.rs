//! Storing finished clips somewhere other than the scratch directory.
//!
//! `DirectoryUploader` copies into a local or mounted directory;
//! `HttpUploader` (feature `upload-http`) PUTs each clip to a base URL.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Stores one clip remotely and returns its identifier there.
pub trait Uploader {
    fn upload(&self, clip: &Path) -> Result<String>;
}

/// Upload every clip, returning the identifiers of those that succeeded.
pub fn upload_all(uploader: &dyn Uploader, clips: &[PathBuf]) -> Vec<String> {
    let mut uploaded = Vec::with_capacity(clips.len());
    for clip in clips {
        match uploader.upload(clip) {
            Ok(key) => {
                log::info!("uploaded {} as {}", clip.display(), key);
                uploaded.push(key);
            }
            Err(e) => log::error!("failed to upload {}: {:#}", clip.display(), e),
        }
    }
    log::info!("uploaded {}/{} clips", uploaded.len(), clips.len());
    uploaded
}

fn object_key(clip: &Path) -> Result<String> {
    clip.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("clip path has no usable file name: {}", clip.display()))
}

/// Copies clips into a target directory, keyed by file name.
#[derive(Clone, Debug)]
pub struct DirectoryUploader {
    target: PathBuf,
}

impl DirectoryUploader {
    pub fn new(target: impl Into<PathBuf>) -> Result<Self> {
        let target = target.into();
        std::fs::create_dir_all(&target)
            .with_context(|| format!("create upload directory {}", target.display()))?;
        Ok(Self { target })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Uploader for DirectoryUploader {
    fn upload(&self, clip: &Path) -> Result<String> {
        if !clip.is_file() {
            return Err(anyhow!("local file not found: {}", clip.display()));
        }
        let key = object_key(clip)?;
        let dest = self.target.join(&key);
        std::fs::copy(clip, &dest)
            .with_context(|| format!("copy {} to {}", clip.display(), dest.display()))?;
        Ok(key)
    }
}

/// PUTs clips to `{base_url}/{file name}` as `video/mp4`.
#[cfg(feature = "upload-http")]
#[derive(Clone, Debug)]
pub struct HttpUploader {
    base_url: String,
}

#[cfg(feature = "upload-http")]
impl HttpUploader {
    pub fn new(base_url: &str) -> Result<Self> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow!("upload url must be http(s): {}", base_url));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(feature = "upload-http")]
impl Uploader for HttpUploader {
    fn upload(&self, clip: &Path) -> Result<String> {
        let key = object_key(clip)?;
        let file = std::fs::File::open(clip)
            .with_context(|| format!("open {}", clip.display()))?;
        let url = format!("{}/{}", self.base_url, key);
        log::info!("uploading {} to {}", clip.display(), url);
        ureq::put(&url)
            .set("Content-Type", "video/mp4")
            .send(file)
            .with_context(|| format!("PUT {}", url))?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Picky;

    impl Uploader for Picky {
        fn upload(&self, clip: &Path) -> Result<String> {
            let key = object_key(clip)?;
            if key.contains("bad") {
                return Err(anyhow!("rejected"));
            }
            Ok(key)
        }
    }

    #[test]
    fn upload_all_returns_successful_subset() {
        let clips = vec![
            PathBuf::from("/tmp/a.mp4"),
            PathBuf::from("/tmp/bad.mp4"),
            PathBuf::from("/tmp/c.mp4"),
        ];
        assert_eq!(upload_all(&Picky, &clips), vec!["a.mp4", "c.mp4"]);
        assert!(upload_all(&Picky, &[]).is_empty());
    }

    #[test]
    fn directory_uploader_copies_by_name() -> Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        let clip = src.path().join("goal_highlight_03_1.mp4");
        std::fs::write(&clip, b"video")?;

        let uploader = DirectoryUploader::new(dst.path().join("bucket"))?;
        let key = uploader.upload(&clip)?;
        assert_eq!(key, "goal_highlight_03_1.mp4");
        assert_eq!(std::fs::read(uploader.target().join(&key))?, b"video");
        Ok(())
    }

    #[test]
    fn directory_uploader_rejects_missing_file() -> Result<()> {
        let dst = tempfile::tempdir()?;
        let uploader = DirectoryUploader::new(dst.path())?;
        assert!(uploader.upload(&dst.path().join("missing.mp4")).is_err());
        Ok(())
    }
}
