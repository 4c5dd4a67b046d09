#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, ObjectClass};

const CXCYWH: usize = 4;

/// Tract-based YOLOv8 backend.
///
/// Loads a local ONNX export (`[1, 3, H, W]` input, `[1, 4 + nc, anchors]`
/// output) and stretches each frame into the model input. Boxes come back in
/// the frame's pixel coordinates. Confidence gating and NMS are left to the
/// caller.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
    min_confidence: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
            min_confidence: 0.01,
        })
    }

    /// Floor below which raw anchors are discarded before NMS.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len || expected_len == 0 {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let (src_w, src_h) = (width as usize, height as usize);
        let (dst_w, dst_h) = (self.input_width as usize, self.input_height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            let sx = (x * src_w / dst_w).min(src_w - 1);
            let sy = (y * src_h / dst_h).min(src_h - 1);
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = preds.shape();
        if shape.len() != 3 || shape[1] <= CXCYWH {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let (channels, anchors) = (shape[1], shape[2]);

        let sx = width as f32 / self.input_width as f32;
        let sy = height as f32 / self.input_height as f32;

        let mut detections = Vec::new();
        for a in 0..anchors {
            let mut best = (0usize, f32::NEG_INFINITY);
            for c in CXCYWH..channels {
                let score = preds[[0, c, a]];
                if score > best.1 {
                    best = (c - CXCYWH, score);
                }
            }
            if best.1 < self.min_confidence {
                continue;
            }

            let cx = preds[[0, 0, a]] * sx;
            let cy = preds[[0, 1, a]] * sy;
            let w = preds[[0, 2, a]] * sx;
            let h = preds[[0, 3, a]] * sy;
            let bbox = BoundingBox::new(
                (cx - w / 2.0).clamp(0.0, width as f32),
                (cy - h / 2.0).clamp(0.0, height as f32),
                (cx + w / 2.0).clamp(0.0, width as f32),
                (cy + h / 2.0).clamp(0.0, height as f32),
            );
            let class = u16::try_from(best.0)
                .map(ObjectClass::from_coco_id)
                .unwrap_or(ObjectClass::Other);
            detections.push(Detection::new(class, best.1, bbox));
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, width, height)
    }
}
