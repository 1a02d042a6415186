//! Detection collaborator.
//!
//! Backends implement `PpeDetector` and are selected once at startup by
//! configured name. The heavy ONNX backend is feature-gated; the scripted
//! backend is always available and keeps the pipeline runnable without a
//! model file.

use std::path::Path;

use anyhow::{anyhow, Result};

mod backend;
mod backends;
mod result;

pub use backend::{PpeDetector, MODEL_CONFIDENCE_FLOOR};
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BBox, Detection};

/// Construct the configured detection backend.
///
/// `model_path` is required for model-backed backends and ignored by the
/// scripted one. An unknown name is a startup error.
pub fn create_backend(
    name: &str,
    model_path: Option<&Path>,
    width: u32,
    height: u32,
    floor: f32,
) -> Result<Box<dyn PpeDetector>> {
    match name {
        "scripted" => Ok(Box::new(ScriptedBackend::synthetic().with_floor(floor))),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let path = model_path
                .ok_or_else(|| anyhow!("backend 'tract' requires a configured model path"))?;
            Ok(Box::new(
                TractBackend::new(path, width, height)?.with_floor(floor),
            ))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => {
            let _ = (model_path, width, height);
            Err(anyhow!(
                "backend 'tract' requires the backend-tract feature"
            ))
        }
        other => Err(anyhow!("unknown detection backend '{}'", other)),
    }
}
