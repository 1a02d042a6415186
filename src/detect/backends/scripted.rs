use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::{PpeDetector, MODEL_CONFIDENCE_FLOOR};
use crate::detect::result::{BBox, Detection};
use crate::frame::Frame;
use crate::taxonomy::PpeClass;

/// Scripted backend for tests and the demo.
///
/// Two modes:
/// - scene playback: a pre-built list of per-frame detection sets, replayed
///   in order and looped, so tests can drive exact verdict sequences;
/// - synthetic: with no scenes, detections are derived from a hash of the
///   frame pixels, giving a deterministic but varied stream for running the
///   daemon against a `stub://` source.
pub struct ScriptedBackend {
    scenes: Vec<Vec<Detection>>,
    cursor: usize,
    floor: f32,
}

impl ScriptedBackend {
    /// Playback of pre-built scenes, looping when exhausted.
    pub fn from_scenes(scenes: Vec<Vec<Detection>>) -> Self {
        Self {
            scenes,
            cursor: 0,
            floor: MODEL_CONFIDENCE_FLOOR,
        }
    }

    /// Pixel-hash synthesis, no script.
    pub fn synthetic() -> Self {
        Self::from_scenes(Vec::new())
    }

    /// Override the model confidence floor.
    pub fn with_floor(mut self, floor: f32) -> Self {
        self.floor = floor;
        self
    }

    fn synthesize(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let digest: [u8; 32] = Sha256::digest(&frame.pixels).into();
        let mut detections = Vec::new();

        // A worker is in frame most of the time.
        if digest[0] % 8 != 0 {
            detections.push(Detection::new(
                PpeClass::Person.id(),
                scaled_conf(digest[1]),
                fractional_box(frame, 0.3, 0.2, 0.3, 0.7)?,
            ));
            if digest[2] % 2 == 0 {
                detections.push(Detection::new(
                    PpeClass::Vest.id(),
                    scaled_conf(digest[3]),
                    fractional_box(frame, 0.35, 0.3, 0.2, 0.25)?,
                ));
            }
            if digest[4] % 4 == 0 {
                detections.push(Detection::new(
                    PpeClass::NoHelmet.id(),
                    scaled_conf(digest[5]),
                    fractional_box(frame, 0.38, 0.18, 0.12, 0.12)?,
                ));
            }
            if digest[6] % 8 == 0 {
                detections.push(Detection::new(
                    PpeClass::NoGloves.id(),
                    scaled_conf(digest[7]),
                    fractional_box(frame, 0.28, 0.55, 0.1, 0.1)?,
                ));
            }
        }

        Ok(detections)
    }
}

impl PpeDetector for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut detections = if self.scenes.is_empty() {
            self.synthesize(frame)?
        } else {
            let scene = self.scenes[self.cursor % self.scenes.len()].clone();
            self.cursor += 1;
            scene
        };
        detections.retain(|d| d.confidence > self.floor);
        Ok(detections)
    }
}

/// Map a digest byte into (0.35, 0.95]: some detections land below the
/// evaluator's 0.5 threshold, most above.
fn scaled_conf(byte: u8) -> f32 {
    0.35 + (byte as f32 / 255.0) * 0.6
}

fn fractional_box(frame: &Frame, x: f32, y: f32, w: f32, h: f32) -> Result<BBox> {
    let fw = frame.width as f32;
    let fh = frame.height as f32;
    BBox::new(x * fw, y * fh, (x + w) * fw, (y + h) * fh)
}
