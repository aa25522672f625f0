//! Spatial description of a detection set
//!
//! Turns raw detector output into a short natural-language summary of what is
//! around the camera and where, plus the list of objects that qualified.
//! Everything here is pure: same detections and frame size, same result.

use dronesight_core::{
    AnalysisResult, DetectionSet, Distance, ObjectRecord, Position, RawDetection,
    SpatialDescriptor,
};
use tracing::{debug, trace};

/// Detections below this confidence are dropped
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Half-width of the centre band, as a fraction of frame width
pub const CENTER_BAND_FRACTION: f64 = 0.2;

/// Box/frame area ratio above which an object is near
pub const NEAR_AREA_RATIO: f64 = 0.2;

/// Box/frame area ratio below which an object is far
pub const FAR_AREA_RATIO: f64 = 0.05;

/// Classify the horizontal position of a box centre
pub fn classify_position(center_x: f64, frame_width: u32) -> Position {
    // midpoint is the integer pixel column, band is fractional
    let mid_x = (frame_width / 2) as f64;
    let band = CENTER_BAND_FRACTION * frame_width as f64;

    if center_x < mid_x - band {
        Position::Left
    } else if center_x > mid_x + band {
        Position::Right
    } else {
        Position::Center
    }
}

/// Classify distance from the fraction of the frame a box covers
pub fn classify_distance(area_ratio: f64) -> Distance {
    if area_ratio > NEAR_AREA_RATIO {
        Distance::Near
    } else if area_ratio < FAR_AREA_RATIO {
        Distance::Far
    } else {
        Distance::Mid
    }
}

/// Position and distance buckets for one detection
pub fn spatial_descriptor(
    detection: &RawDetection,
    frame_width: u32,
    frame_height: u32,
) -> SpatialDescriptor {
    let frame_area = frame_width as f64 * frame_height as f64;
    let ratio = detection.bbox.area() / frame_area;

    SpatialDescriptor {
        position: classify_position(detection.bbox.center_x(), frame_width),
        distance: classify_distance(ratio),
    }
}

/// Render the phrase for one qualifying detection
pub fn phrase(class_name: &str, descriptor: SpatialDescriptor) -> String {
    let position = match descriptor.position {
        Position::Left => "on the left",
        Position::Center => "ahead",
        Position::Right => "on the right",
    };
    let distance = match descriptor.distance {
        Distance::Near => "close",
        Distance::Mid => "at medium distance",
        Distance::Far => "far away",
    };
    format!("{} {}, {}.", class_name, position, distance)
}

/// Stateless describer; a unit struct so it can be handed around like the
/// other pipeline stages
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialDescriber;

impl SpatialDescriber {
    pub fn new() -> Self {
        Self
    }

    /// Describe a frame's detections.
    ///
    /// Detections keep their input order, one phrase each, with no grouping
    /// by class. When nothing reaches [`CONFIDENCE_THRESHOLD`] the sentinel
    /// result is returned.
    pub fn describe(
        &self,
        detections: &DetectionSet,
        frame_width: u32,
        frame_height: u32,
    ) -> AnalysisResult {
        let mut phrases = Vec::new();
        let mut objects = Vec::new();

        for detection in detections {
            if detection.confidence.is_nan() || detection.confidence < CONFIDENCE_THRESHOLD {
                continue;
            }

            let descriptor = spatial_descriptor(detection, frame_width, frame_height);
            trace!(
                "{} ({:.2}) -> {} / {}",
                detection.class_name,
                detection.confidence,
                descriptor.position,
                descriptor.distance
            );
            phrases.push(phrase(&detection.class_name, descriptor));
            objects.push(ObjectRecord::from(detection));
        }

        debug!(
            "Described {} of {} detections",
            objects.len(),
            detections.len()
        );

        if objects.is_empty() {
            return AnalysisResult::nothing_detected();
        }

        AnalysisResult {
            description: phrases.join(" "),
            objects,
        }
    }
}

/// Free-function form of [`SpatialDescriber::describe`]
pub fn describe(detections: &DetectionSet, frame_width: u32, frame_height: u32) -> AnalysisResult {
    SpatialDescriber.describe(detections, frame_width, frame_height)
}
