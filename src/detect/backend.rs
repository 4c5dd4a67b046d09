use anyhow::Result;

use crate::detect::result::Detection;

/// Object detector backend.
///
/// The detector is an external oracle: given one decoded RGB frame it returns
/// the objects it recognised, in pixel coordinates of that frame. Backends
/// need not be deterministic and are not expected to filter by confidence or
/// apply NMS; the processing session does that with the configured thresholds.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB24 frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
