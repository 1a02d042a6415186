use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Confidence floor applied inside every backend's `infer` call.
///
/// This is the model-level floor, distinct from (and lower than) the
/// evaluator's 0.5 threshold. Detections at or below this floor never leave
/// the backend.
pub const MODEL_CONFIDENCE_FLOOR: f32 = 0.3;

/// Detection collaborator trait.
///
/// Implementations MUST:
/// - Apply `MODEL_CONFIDENCE_FLOOR` (or a configured floor) before returning
/// - Report `bbox` in pixel coordinates of the frame they were given
/// - Return class ids from the model as-is; the taxonomy is enforced
///   downstream, so a misconfigured model surfaces as a fatal error instead
///   of silently dropped detections
///
/// Implementations MUST NOT perform network I/O during `infer`.
pub trait PpeDetector: Send {
    /// Backend identifier, as used in configuration.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the frame loop.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
