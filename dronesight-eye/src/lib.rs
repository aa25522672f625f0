//! dronesight-eye: vision side of the dronesight relay
//!
//! Decodes incoming frames, runs the shared object detector and turns its
//! output into a spatial description of the scene.

pub mod decoder;
pub mod models;
pub mod processing;
pub mod scene;
pub mod utils;

pub use decoder::{decode_message, FrameDecoder, ImageDecoder};
pub use models::{build_detector, Detector, EmptyDetector};
pub use processing::DetectionPipeline;
pub use scene::SpatialDescriber;
