//! Detection post-processing: confidence gate and per-class NMS.

use crate::detect::result::Detection;

/// Drop detections below `confidence_threshold`, then greedily suppress any
/// detection whose IoU with a stronger detection of the same class exceeds
/// `nms_threshold`. Output is ordered by descending confidence.
pub fn postprocess(
    mut detections: Vec<Detection>,
    confidence_threshold: f32,
    nms_threshold: f32,
) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite() && d.confidence >= confidence_threshold);
    non_max_suppression(&mut detections, nms_threshold);
    detections
}

pub fn non_max_suppression(detections: &mut Vec<Detection>, iou_threshold: f32) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..detections.len() {
        let candidate = detections[index];
        let suppressed = detections[..kept].iter().any(|prev| {
            prev.class == candidate.class && prev.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            detections.swap(kept, index);
            kept += 1;
        }
    }
    detections.truncate(kept);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::{BoundingBox, ObjectClass};

    fn det(class: ObjectClass, confidence: f32, x: f32) -> Detection {
        Detection::new(class, confidence, BoundingBox::new(x, 0.0, x + 10.0, 10.0))
    }

    #[test]
    fn drops_low_confidence() {
        let out = postprocess(
            vec![det(ObjectClass::Person, 0.3, 0.0), det(ObjectClass::Person, 0.6, 50.0)],
            0.45,
            0.4,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.6);
    }

    #[test]
    fn suppresses_overlapping_same_class() {
        let out = postprocess(
            vec![
                det(ObjectClass::Person, 0.6, 1.0),
                det(ObjectClass::Person, 0.9, 0.0),
                det(ObjectClass::Person, 0.8, 100.0),
            ],
            0.0,
            0.4,
        );
        let confidences: Vec<f32> = out.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.8]);
    }

    #[test]
    fn keeps_overlapping_different_classes() {
        let out = postprocess(
            vec![det(ObjectClass::Person, 0.9, 0.0), det(ObjectClass::Ball, 0.8, 0.0)],
            0.0,
            0.4,
        );
        assert_eq!(out.len(), 2);
    }
}
