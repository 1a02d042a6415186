#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{PpeDetector, MODEL_CONFIDENCE_FLOOR};
use crate::detect::result::{BBox, Detection};
use crate::frame::Frame;

/// Taxonomy size baked into the trained model (ids 0..=10).
const MODEL_CLASSES: usize = 11;
const IOU_SUPPRESSION: f32 = 0.45;

/// Tract-based backend running a local ONNX PPE model.
///
/// Expects a YOLO-style export: input `[1, 3, H, W]` normalized to 0..1,
/// output `[1, 4 + classes, anchors]` with center-size boxes. The backend
/// loads the model file once and performs no network I/O.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
    width: u32,
    height: u32,
    floor: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            floor: MODEL_CONFIDENCE_FLOOR,
        })
    }

    /// Override the default model confidence floor.
    pub fn with_floor(mut self, floor: f32) -> Self {
        self.floor = floor;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width != self.width || frame.height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                frame.width,
                frame.height,
                self.width,
                self.height
            ));
        }

        let width = frame.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, frame.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                frame.pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode_output(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] != 4 + MODEL_CLASSES {
            return Err(anyhow!(
                "unexpected model output shape {:?}, expected [1, {}, anchors]",
                shape,
                4 + MODEL_CLASSES
            ));
        }

        let anchors = shape[2];
        let mut candidates: Vec<Detection> = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..MODEL_CLASSES {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if best_score <= self.floor {
                continue;
            }

            let cx = view[[0, 0, anchor]];
            let cy = view[[0, 1, anchor]];
            let w = view[[0, 2, anchor]];
            let h = view[[0, 3, anchor]];
            let x1 = (cx - w / 2.0).clamp(0.0, self.width as f32 - 1.0);
            let y1 = (cy - h / 2.0).clamp(0.0, self.height as f32 - 1.0);
            let x2 = (cx + w / 2.0).clamp(0.0, self.width as f32);
            let y2 = (cy + h / 2.0).clamp(0.0, self.height as f32);
            if !(x1 < x2 && y1 < y2) {
                continue;
            }

            candidates.push(Detection::new(
                best_class as u32,
                best_score,
                BBox::new(x1, y1, x2, y2)?,
            ));
        }

        Ok(non_max_suppress(candidates))
    }
}

impl PpeDetector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs)
    }
}

/// Greedy per-class non-maximum suppression.
fn non_max_suppress(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > IOU_SUPPRESSION
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let union = a.width() * a.height() + b.width() * b.height() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}
