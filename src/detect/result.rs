use serde::{Deserialize, Serialize};

/// COCO class id for `person`.
pub const COCO_PERSON: u16 = 0;
/// COCO class id for `sports ball`.
pub const COCO_SPORTS_BALL: u16 = 32;

/// Object classes the scorers care about. Everything else is `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Person,
    #[serde(alias = "sports_ball", alias = "sports ball")]
    Ball,
    #[serde(other)]
    Other,
}

impl ObjectClass {
    pub fn from_coco_id(id: u16) -> Self {
        match id {
            COCO_PERSON => ObjectClass::Person,
            COCO_SPORTS_BALL => ObjectClass::Ball,
            _ => ObjectClass::Other,
        }
    }
}

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let l = self.x1.max(other.x1);
        let r = self.x2.min(other.x2);
        let t = self.y1.max(other.y1);
        let b = self.y2.min(other.y2);
        (r - l).max(0.0) * (b - t).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let union = self.area() + other.area() - self.intersection_area(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / union
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One recognised object in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: ObjectClass,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: ObjectClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class,
            confidence,
            bbox,
        }
    }
}

/// Detections for a single frame, with the frame's dimensions.
///
/// The frame index is implicit: it is the record's position in a
/// [`DetectionHistory`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDetections {
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
}

impl FrameDetections {
    pub fn new(width: u32, height: u32, detections: Vec<Detection>) -> Self {
        Self {
            width,
            height,
            detections,
        }
    }

    pub fn persons(&self) -> impl Iterator<Item = &Detection> {
        self.of_class(ObjectClass::Person)
    }

    pub fn balls(&self) -> impl Iterator<Item = &Detection> {
        self.of_class(ObjectClass::Ball)
    }

    fn of_class(&self, class: ObjectClass) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(move |d| d.class == class)
    }
}

/// Append-only, capture-ordered detection records for one video pass.
#[derive(Clone, Debug, Default)]
pub struct DetectionHistory {
    frames: Vec<FrameDetections>,
}

impl DetectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: FrameDetections) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FrameDetections] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameDetections> {
        self.frames.iter()
    }
}

impl FromIterator<FrameDetections> for DetectionHistory {
    fn from_iter<I: IntoIterator<Item = FrameDetections>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replay_json_labels() {
        let json = r#"[
            {"class": "person", "confidence": 0.9, "bbox": [0, 0, 10, 20]},
            {"class": "sports ball", "confidence": 0.7, "bbox": [5, 5, 7, 7]},
            {"class": "car", "confidence": 0.5, "bbox": [1, 1, 2, 2]}
        ]"#;
        let parsed: Vec<Detection> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].class, ObjectClass::Person);
        assert_eq!(parsed[1].class, ObjectClass::Ball);
        assert_eq!(parsed[2].class, ObjectClass::Other);
        assert_eq!(parsed[1].bbox.center(), (6.0, 6.0));
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
        let disjoint = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(b.iou(&disjoint), 0.0);
    }

    #[test]
    fn partitions_by_class() {
        let frame = FrameDetections::new(
            100,
            100,
            vec![
                Detection::new(ObjectClass::Person, 0.9, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
                Detection::new(ObjectClass::Ball, 0.8, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
                Detection::new(ObjectClass::Person, 0.7, BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            ],
        );
        assert_eq!(frame.persons().count(), 2);
        assert_eq!(frame.balls().count(), 1);
    }
}
