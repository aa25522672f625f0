//! Vision processing pipelines

pub mod detection;

pub use detection::{validate_detections, DetectionPipeline};
