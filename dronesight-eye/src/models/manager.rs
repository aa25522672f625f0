//! Detector construction from configuration

use super::yolo::{load_labels, COCO_CLASSES};
use super::{Detector, EmptyDetector};
use dronesight_core::config::DetectorConfig;
use dronesight_core::{DetectorBackend, Error, Result};
use std::sync::Arc;
use tracing::info;

/// Class names from the configured labels file, or the COCO set
pub fn resolve_labels(config: &DetectorConfig) -> Result<Vec<String>> {
    match &config.labels_path {
        Some(path) => {
            let labels = load_labels(path)?;
            info!("Loaded {} class labels from {:?}", labels.len(), path);
            Ok(labels)
        }
        None => Ok(COCO_CLASSES.iter().map(|s| s.to_string()).collect()),
    }
}

/// Build the process-wide detector once at startup
pub fn build_detector(config: &DetectorConfig) -> Result<Arc<dyn Detector>> {
    match config.backend {
        DetectorBackend::None => {
            info!("Detector backend 'none': every frame reports no detections");
            Ok(Arc::new(EmptyDetector))
        }
        DetectorBackend::Onnx => build_onnx(config),
    }
}

#[cfg(feature = "onnx")]
fn build_onnx(config: &DetectorConfig) -> Result<Arc<dyn Detector>> {
    use super::onnx::OnnxYoloDetector;
    use super::yolo::YoloPostprocess;

    let model_path = config.model_path.as_ref().ok_or_else(|| {
        Error::Configuration("detector.model_path is required for the onnx backend".to_string())
    })?;
    let postprocess = YoloPostprocess::new(
        resolve_labels(config)?,
        config.score_threshold,
        config.iou_threshold,
    )
    .with_max_detections(config.max_detections);
    let detector = OnnxYoloDetector::new(model_path, config.input_size, postprocess)?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx(_config: &DetectorConfig) -> Result<Arc<dyn Detector>> {
    Err(Error::Configuration(
        "this build has no onnx support; rebuild with `--features onnx`".to_string(),
    ))
}
