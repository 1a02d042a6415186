use anyhow::{anyhow, Result};

/// One detected object instance in a frame.
///
/// `class_id` is the raw model id; the evaluator resolves it against the
/// taxonomy (and fails on ids outside it). Keeping the raw id here keeps the
/// detector boundary dumb: backends never interpret classes.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    /// Model confidence in [0, 1].
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Axis-aligned box in frame pixel coordinates, corners ordered x1<x2, y1<y2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self> {
        if !(x1 < x2 && y1 < y2) {
            return Err(anyhow!(
                "bbox corners must be ordered (x1<x2, y1<y2), got ({}, {}, {}, {})",
                x1,
                y1,
                x2,
                y2
            ));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}
