mod backend;
pub mod backends;
pub mod nms;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ReplayBackend, StubBackend};
pub use result::{
    BoundingBox, Detection, DetectionHistory, FrameDetections, ObjectClass, COCO_PERSON,
    COCO_SPORTS_BALL,
};

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
