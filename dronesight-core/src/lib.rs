//! dronesight-core: shared data model, error taxonomy and configuration
//! for the dronesight frame-analysis relay.

pub mod types;
pub mod error;
pub mod config;

pub use error::{Error, Result, DECODE_FAILURE_DESCRIPTION};
pub use config::{ConfigError, RelayConfig, DetectorBackend};
pub use types::{
    AnalysisResult, BoundingBox, DetectionSet, Distance, ObjectRecord, Position, RasterFrame,
    RawDetection, SpatialDescriptor, NO_OBJECTS_DESCRIPTION,
};
