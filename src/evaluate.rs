//! Frame evaluation.
//!
//! Turns one frame's detection set into a `ComplianceVerdict` plus the
//! overlay payload describing what a renderer would draw. Evaluation is a
//! pure function of its inputs; all session state (debounce, throttles,
//! ledger) lives elsewhere.
//!
//! Two thresholds are in play and both are load-bearing: the detector
//! applies a 0.3 model floor inside `infer`, then the evaluator re-filters
//! at a strictly-greater-than 0.5 threshold. Detections between the two
//! exist but have no effect on the verdict or the overlay.

use anyhow::Result;

use crate::detect::{BBox, Detection};
use crate::taxonomy::{join_items, MissingItem, PpeClass};

/// Default evaluator threshold. Detections at or below it are ignored.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Verdict for one evaluated frame.
///
/// `missing_items` is set-deduplicated with insertion order preserved:
/// violation-class items in detection scan order first, then the frame-wide
/// vest check. Compliance is derived, so the verdict cannot disagree with
/// its own missing list.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplianceVerdict {
    pub frame_index: u64,
    pub missing_items: Vec<MissingItem>,
}

impl ComplianceVerdict {
    pub fn is_compliant(&self) -> bool {
        self.missing_items.is_empty()
    }

    /// Items joined with ", " for log lines and reports.
    pub fn joined_items(&self) -> String {
        join_items(&self.missing_items)
    }
}

/// One overlay drawing operation. Text renders red; boxes carry their color.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawInstruction {
    /// Outline plus a `"{label} {confidence:.2}"` caption above the box.
    Box {
        bbox: BBox,
        color: OverlayColor,
        label: String,
    },
    /// Free-standing caption at a pixel anchor.
    Text { text: String, x: f32, y: f32 },
    /// Full-width warning line at the top-left of the frame.
    Banner { text: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayColor {
    Red,
    Green,
}

impl OverlayColor {
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            OverlayColor::Red => [255, 0, 0],
            OverlayColor::Green => [0, 255, 0],
        }
    }
}

/// Result of evaluating one frame: the verdict and the overlay payload.
#[derive(Clone, Debug)]
pub struct FrameEvaluation {
    pub verdict: ComplianceVerdict,
    pub draw: Vec<DrawInstruction>,
}

/// Stateless evaluator for per-frame detection sets.
#[derive(Clone, Debug)]
pub struct FrameEvaluator {
    confidence_threshold: f32,
}

impl FrameEvaluator {
    pub fn new() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Evaluate one frame's detections.
    ///
    /// Fails with `UnknownClassError` when any detection references a class
    /// id outside the taxonomy, including detections under the confidence
    /// threshold: a model mismatch must surface immediately, not on the
    /// first coincidental high-confidence hit.
    pub fn evaluate(&self, detections: &[Detection], frame_index: u64) -> Result<FrameEvaluation> {
        let classified = detections
            .iter()
            .map(|det| Ok((det, PpeClass::from_id(det.class_id)?)))
            .collect::<Result<Vec<(&Detection, PpeClass)>>>()?;

        let survivors: Vec<(&Detection, PpeClass)> = classified
            .into_iter()
            .filter(|(det, _)| det.confidence > self.confidence_threshold)
            .collect();

        let mut missing: Vec<MissingItem> = Vec::new();
        let mut draw: Vec<DrawInstruction> = Vec::new();

        // Pass 1: direct violation classes, in detection scan order.
        for (det, class) in &survivors {
            let color = if class.is_violation() {
                OverlayColor::Red
            } else {
                OverlayColor::Green
            };
            draw.push(DrawInstruction::Box {
                bbox: det.bbox,
                color,
                label: format!("{} {:.2}", class.label(), det.confidence),
            });
            if let Some(item) = class.missing_item() {
                if !missing.contains(&item) {
                    missing.push(item);
                }
                draw.push(DrawInstruction::Text {
                    text: format!("Missing: {}!", item),
                    x: det.bbox.x1,
                    y: det.bbox.y2 + 20.0,
                });
            }
        }

        // Pass 2: frame-wide vest presence. Deliberately not per-person
        // geometry; one vest anywhere in the frame satisfies every person.
        let has_vest = survivors
            .iter()
            .any(|(_, class)| *class == PpeClass::Vest);
        let first_person = survivors
            .iter()
            .find(|(_, class)| *class == PpeClass::Person)
            .map(|(det, _)| det.bbox);
        if let Some(person_box) = first_person {
            if !has_vest {
                if !missing.contains(&MissingItem::VestHarness) {
                    missing.push(MissingItem::VestHarness);
                }
                draw.push(DrawInstruction::Text {
                    text: format!("Missing: {}", join_items(&missing)),
                    x: person_box.x1,
                    y: person_box.y1 + 40.0,
                });
            }
        }

        if !missing.is_empty() {
            draw.push(DrawInstruction::Banner {
                text: format!("CRITICAL: PPE NON-COMPLIANCE - {}", join_items(&missing)),
            });
        }

        Ok(FrameEvaluation {
            verdict: ComplianceVerdict {
                frame_index,
                missing_items: missing,
            },
            draw,
        })
    }
}

impl Default for FrameEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampling gate for the frame loop.
///
/// The counter increments before the check, so with interval 10 the
/// evaluated frames are 10, 20, 30...; frame 1 is never evaluated. Interval
/// 1 evaluates every frame.
pub fn sample_due(frame_index: u64, interval: u64) -> bool {
    interval > 0 && frame_index % interval == 0
}
