//! Detector capability and its implementations

pub mod manager;
pub mod yolo;
#[cfg(feature = "onnx")]
pub mod onnx;

use dronesight_core::{DetectionSet, RasterFrame, Result};

pub use manager::{build_detector, resolve_labels};
pub use yolo::{YoloPostprocess, COCO_CLASSES};
#[cfg(feature = "onnx")]
pub use onnx::OnnxYoloDetector;

/// Object detector shared by every session.
///
/// Implementations must tolerate concurrent `detect` calls; anything with
/// mutable inference state guards it internally.
pub trait Detector: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Detect objects in one frame, in detector-defined order
    fn detect(&self, frame: &RasterFrame) -> Result<DetectionSet>;
}

/// Detector that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDetector;

impl Detector for EmptyDetector {
    fn name(&self) -> &str {
        "empty"
    }

    fn detect(&self, _frame: &RasterFrame) -> Result<DetectionSet> {
        Ok(Vec::new())
    }
}
