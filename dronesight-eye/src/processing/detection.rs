//! Shared detection pipeline
//!
//! Every session funnels detector calls through one `DetectionPipeline`.
//! A semaphore bounds how many inferences run at once (one by default, which
//! fully serializes access), inference runs on the blocking pool, and output
//! is checked before anyone describes it.

use crate::models::Detector;
use dronesight_core::config::LimitsConfig;
use dronesight_core::{DetectionSet, Error, RasterFrame, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Object detection pipeline
#[derive(Clone)]
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl DetectionPipeline {
    /// Create a pipeline allowing `max_concurrent` inferences in flight
    pub fn new(detector: Arc<dyn Detector>, max_concurrent: usize) -> Self {
        Self {
            detector,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout: None,
        }
    }

    pub fn from_limits(detector: Arc<dyn Detector>, limits: &LimitsConfig) -> Self {
        Self::new(detector, limits.max_concurrent_inferences).with_timeout(limits.inference_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Run the detector on a frame.
    ///
    /// The permit travels with the blocking task, so a timed-out call keeps
    /// its slot until the detector actually returns.
    pub async fn detect(&self, frame: RasterFrame) -> Result<DetectionSet> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Detection("detector pool is closed".to_string()))?;

        let detector = self.detector.clone();
        let task = tokio::task::spawn_blocking(move || {
            let result = detector.detect(&frame);
            drop(permit);
            result
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Detector {} exceeded {:?}", self.detector.name(), limit);
                    return Err(Error::Detection(format!(
                        "detector timed out after {}ms",
                        limit.as_millis()
                    )));
                }
            },
            None => task.await,
        };

        let detections = joined.map_err(|e| {
            if e.is_panic() {
                Error::Detection("detector panicked".to_string())
            } else {
                Error::Detection(format!("detector task failed: {}", e))
            }
        })??;

        validate_detections(&detections)?;
        debug!("Detected {} objects", detections.len());
        Ok(detections)
    }
}

/// Reject detector output that cannot be described safely
pub fn validate_detections(detections: &DetectionSet) -> Result<()> {
    for (idx, detection) in detections.iter().enumerate() {
        if detection.class_name.is_empty() {
            return Err(Error::Detection(format!("detection {} has no class label", idx)));
        }

        if !detection.confidence.is_finite() || !(0.0..=1.0).contains(&detection.confidence) {
            return Err(Error::Detection(format!(
                "detection {} has confidence {} outside [0, 1]",
                idx, detection.confidence
            )));
        }

        if !detection.bbox.is_well_formed() {
            return Err(Error::Detection(format!(
                "detection {} has malformed box {:?}",
                idx,
                detection.bbox.to_array()
            )));
        }
    }

    Ok(())
}
