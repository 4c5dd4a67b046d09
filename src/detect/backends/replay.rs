use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Replays detections computed ahead of time by an external detector.
///
/// Input is JSON lines, one array of detections per frame in capture order:
///
/// ```text
/// [{"class":"person","confidence":0.91,"bbox":[12.0,40.5,60.0,180.0]}]
/// []
/// ```
///
/// Blank lines are frames without detections. Frames past the end of the
/// input yield no detections.
pub struct ReplayBackend {
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    exhausted: bool,
}

impl ReplayBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open detections file {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            line_no: 0,
            exhausted: false,
        }
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("failed to read detections file")?;
        if read == 0 {
            log::debug!("replay: detections exhausted after {} frames", self.line_no);
            self.exhausted = true;
            return Ok(Vec::new());
        }
        self.line_no += 1;

        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(line)
            .with_context(|| format!("invalid detections on line {}", self.line_no))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::ObjectClass;
    use std::io::Cursor;

    #[test]
    fn reads_one_frame_per_line() {
        let input = concat!(
            r#"[{"class":"person","confidence":0.9,"bbox":[0,0,10,10]}]"#,
            "\n\n",
            r#"[{"class":"ball","confidence":0.5,"bbox":[1,1,3,3]}]"#,
            "\n"
        );
        let mut backend = ReplayBackend::from_reader(Cursor::new(input.as_bytes().to_vec()));

        let first = backend.detect(&[], 0, 0).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].class, ObjectClass::Person);
        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
        assert_eq!(backend.detect(&[], 0, 0).unwrap()[0].class, ObjectClass::Ball);
        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn reports_bad_line() {
        let mut backend = ReplayBackend::from_reader(Cursor::new(b"not json\n".to_vec()));
        let err = backend.detect(&[], 0, 0).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
