//! YOLOv8 detector on ONNX Runtime

use super::yolo::YoloPostprocess;
use super::Detector;
use crate::utils::{frame_to_chw_tensor, input_scale};
use dronesight_core::{DetectionSet, Error, RasterFrame, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// YOLOv8 ONNX detector.
///
/// `Session::run` needs exclusive access, so calls from concurrent sessions
/// are serialized on an internal mutex.
pub struct OnnxYoloDetector {
    session: Mutex<Session>,
    input_size: u32,
    postprocess: YoloPostprocess,
}

impl OnnxYoloDetector {
    pub fn new(model_path: &Path, input_size: u32, postprocess: YoloPostprocess) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                Error::Configuration(format!(
                    "Failed to load YOLO model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            postprocess,
        })
    }
}

impl Detector for OnnxYoloDetector {
    fn name(&self) -> &str {
        "onnx-yolov8"
    }

    fn detect(&self, frame: &RasterFrame) -> Result<DetectionSet> {
        let size = self.input_size as usize;
        let input = frame_to_chw_tensor(frame, self.input_size)?;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| Error::Detection(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| Error::Detection(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Detection(format!("Failed to extract output tensor: {}", e)))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        debug!("YOLO output shape: {:?}", dims);

        self.postprocess.decode(
            data,
            &dims,
            input_scale(frame, self.input_size),
            (frame.width(), frame.height()),
        )
    }
}
