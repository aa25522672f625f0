use crate::error::{Error, Result};
use std::fmt;

/// Description used when no detection in a frame qualifies
pub const NO_OBJECTS_DESCRIPTION: &str = "no notable objects detected";

/// Decoded RGB8 frame, row-major, three bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterFrame {
    /// Build a frame from raw RGB8 pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Decode(format!(
                "frame has zero dimension ({}x{})",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(3))
            .ok_or_else(|| Error::Decode("frame dimensions overflow".to_string()))?;

        if pixels.len() != expected {
            return Err(Error::Decode(format!(
                "pixel buffer holds {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }

        Ok(Self { width, height, pixels })
    }

    /// Black frame of the given size
    pub fn blank(width: u32, height: u32) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(3))
            .ok_or_else(|| Error::Decode("frame dimensions overflow".to_string()))?;
        Self::new(width, height, vec![0; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Frame area in pixels
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Axis-aligned rectangle (x1, y1, x2, y2) in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from centre-format coordinates (cx, cy, w, h)
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() as f64 * self.height() as f64
    }

    pub fn center_x(&self) -> f64 {
        (self.x1 as f64 + self.x2 as f64) / 2.0
    }

    /// All corners finite and x1 <= x2, y1 <= y2
    pub fn is_well_formed(&self) -> bool {
        let finite = self.x1.is_finite()
            && self.y1.is_finite()
            && self.x2.is_finite()
            && self.y2.is_finite();
        finite && self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Clamp corners into [0, width] x [0, height]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Intersection over union; 0.0 for degenerate or malformed boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.is_well_formed() || !other.is_well_formed() {
            return 0.0;
        }

        let inter_x_min = self.x1.max(other.x1);
        let inter_y_min = self.y1.max(other.y1);
        let inter_x_max = self.x2.min(other.x2);
        let inter_y_max = self.y2.min(other.y2);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.width() * self.height() + other.width() * other.height() - inter_area;

        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        let iou = inter_area / union_area;
        if iou.is_finite() && (0.0..=1.0).contains(&iou) {
            iou
        } else {
            0.0
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One detector output for a frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }
}

/// Detections for one frame, in detector order
pub type DetectionSet = Vec<RawDetection>;

/// Coarse horizontal bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Left,
    Center,
    Right,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Left => write!(f, "left"),
            Position::Center => write!(f, "center"),
            Position::Right => write!(f, "right"),
        }
    }
}

/// Coarse distance bucket derived from apparent size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distance {
    Near,
    Mid,
    Far,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Near => write!(f, "near"),
            Distance::Mid => write!(f, "mid"),
            Distance::Far => write!(f, "far"),
        }
    }
}

/// (position, distance) pair for one detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialDescriptor {
    pub position: Position,
    pub distance: Distance,
}

/// Detection exposed to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl From<&RawDetection> for ObjectRecord {
    fn from(detection: &RawDetection) -> Self {
        Self {
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}

/// Per-frame outcome: description plus qualifying objects
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub description: String,
    pub objects: Vec<ObjectRecord>,
}

impl AnalysisResult {
    /// Sentinel result for a frame with nothing worth reporting
    pub fn nothing_detected() -> Self {
        Self {
            description: NO_OBJECTS_DESCRIPTION.to_string(),
            objects: Vec::new(),
        }
    }

    /// Result carrying a failure reason and no objects
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            description: reason.into(),
            objects: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_frame_rejects_zero_dimension() {
        assert!(RasterFrame::new(0, 10, vec![]).is_err());
        assert!(RasterFrame::new(10, 0, vec![]).is_err());
    }

    #[test]
    fn test_raster_frame_rejects_wrong_buffer_length() {
        let result = RasterFrame::new(2, 2, vec![0; 11]);
        match result {
            Err(Error::Decode(msg)) => assert!(msg.contains("expected 12")),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_raster_frame_blank() {
        let frame = RasterFrame::blank(640, 480).unwrap();
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.pixels().len(), 640 * 480 * 3);
        assert_eq!(frame.area(), 307200.0);
    }

    #[test]
    fn test_bbox_geometry() {
        let bbox = BoundingBox::new(50.0, 50.0, 150.0, 150.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 100.0);
        assert_eq!(bbox.area(), 10000.0);
        assert_eq!(bbox.center_x(), 100.0);
        assert_eq!(bbox.to_array(), [50.0, 50.0, 150.0, 150.0]);
    }

    #[test]
    fn test_bbox_from_center() {
        let bbox = BoundingBox::from_center(100.0, 100.0, 20.0, 40.0);
        assert_eq!(bbox, BoundingBox::new(90.0, 80.0, 110.0, 120.0));
    }

    #[test]
    fn test_bbox_well_formed() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_well_formed());
        assert!(!BoundingBox::new(10.0, 0.0, 5.0, 5.0).is_well_formed());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 5.0, 5.0).is_well_formed());
        assert!(!BoundingBox::new(0.0, 0.0, f32::INFINITY, 5.0).is_well_formed());
    }

    #[test]
    fn test_bbox_clamp() {
        let bbox = BoundingBox::new(-5.0, -1.0, 700.0, 500.0).clamp_to(640, 480);
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_bbox_iou() {
        let a = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        assert!((a.iou(&a) - 1.0).abs() < 0.001);

        let far = BoundingBox::new(200.0, 200.0, 250.0, 250.0);
        assert_eq!(a.iou(&far), 0.0);

        let partial = BoundingBox::new(30.0, 30.0, 80.0, 80.0);
        let iou = a.iou(&partial);
        assert!(iou > 0.0 && iou < 1.0);

        let broken = BoundingBox::new(f32::NAN, 10.0, 60.0, 60.0);
        assert_eq!(a.iou(&broken), 0.0);
    }

    #[test]
    fn test_object_record_from_detection() {
        let detection = RawDetection::new("car", 0.75, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let record = ObjectRecord::from(&detection);
        assert_eq!(record.class_name, "car");
        assert_eq!(record.confidence, 0.75);
        assert_eq!(record.bbox, detection.bbox);
    }

    #[test]
    fn test_analysis_result_constructors() {
        let empty = AnalysisResult::nothing_detected();
        assert_eq!(empty.description, NO_OBJECTS_DESCRIPTION);
        assert!(empty.objects.is_empty());

        let failed = AnalysisResult::failure("boom");
        assert_eq!(failed.description, "boom");
        assert!(failed.objects.is_empty());
    }

    #[test]
    fn test_bucket_display() {
        assert_eq!(Position::Left.to_string(), "left");
        assert_eq!(Position::Center.to_string(), "center");
        assert_eq!(Distance::Far.to_string(), "far");
        assert_eq!(Distance::Mid.to_string(), "mid");
    }
}
