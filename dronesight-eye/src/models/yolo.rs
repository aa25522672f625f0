//! YOLOv8 output decoding

use dronesight_core::{BoundingBox, DetectionSet, Error, RawDetection, Result};
use std::path::Path;
use tracing::debug;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Read class names, one per line, blank lines skipped
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(Error::Configuration(format!(
            "labels file {} contains no class names",
            path.display()
        )));
    }

    Ok(labels)
}

/// Turns a raw `[1, 4 + classes, anchors]` YOLOv8 tensor into detections
#[derive(Debug, Clone)]
pub struct YoloPostprocess {
    labels: Vec<String>,
    score_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl YoloPostprocess {
    pub fn new(labels: Vec<String>, score_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            labels,
            score_threshold,
            iou_threshold,
            max_detections: 300,
        }
    }

    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections;
        self
    }

    fn label(&self, class_idx: usize) -> String {
        self.labels
            .get(class_idx)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_idx))
    }

    /// Decode model output into frame-space detections.
    ///
    /// `scale` maps model input coordinates back to the frame
    /// (frame_width / input_width, frame_height / input_height). Boxes are
    /// clamped to the frame; degenerate ones are dropped.
    pub fn decode(
        &self,
        output: &[f32],
        shape: &[usize],
        scale: (f32, f32),
        frame_size: (u32, u32),
    ) -> Result<DetectionSet> {
        if shape.len() != 3 || shape[0] != 1 {
            return Err(Error::Detection(format!(
                "unexpected output shape {:?}, expected [1, 4 + classes, anchors]",
                shape
            )));
        }

        let (rows, anchors) = (shape[1], shape[2]);
        if rows < 5 {
            return Err(Error::Detection(format!(
                "output has {} rows, need at least 5",
                rows
            )));
        }

        let expected = rows
            .checked_mul(anchors)
            .ok_or_else(|| Error::Detection("output shape overflows".to_string()))?;
        if output.len() != expected {
            return Err(Error::Detection(format!(
                "output holds {} values, shape {:?} needs {}",
                output.len(),
                shape,
                expected
            )));
        }

        let num_classes = rows - 4;
        let at = |row: usize, anchor: usize| output[row * anchors + anchor];
        let mut detections = Vec::new();

        for anchor in 0..anchors {
            let mut best_class = 0;
            let mut best_score = f32::NEG_INFINITY;
            for class_idx in 0..num_classes {
                let score = at(4 + class_idx, anchor);
                if score > best_score {
                    best_score = score;
                    best_class = class_idx;
                }
            }

            if !best_score.is_finite() || best_score < self.score_threshold {
                continue;
            }

            let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
            if !cx.is_finite() || !cy.is_finite() || !w.is_finite() || !h.is_finite() {
                continue;
            }

            let bbox = BoundingBox::from_center(cx * scale.0, cy * scale.1, w * scale.0, h * scale.1)
                .clamp_to(frame_size.0, frame_size.1);
            if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                continue;
            }

            detections.push(RawDetection::new(
                self.label(best_class),
                best_score.min(1.0),
                bbox,
            ));
        }

        let mut kept = apply_nms(detections, self.iou_threshold);
        kept.truncate(self.max_detections);

        debug!("YOLO decoded {} detections from {} anchors", kept.len(), anchors);
        Ok(kept)
    }
}

/// Per-class non-maximum suppression; result is sorted by confidence, highest first
pub fn apply_nms(mut detections: DetectionSet, iou_threshold: f32) -> DetectionSet {
    if detections.is_empty() {
        return detections;
    }

    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[j].class_name != detections[i].class_name {
                continue;
            }

            if detections[i].bbox.iou(&detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }

        keep.push(detections[i].clone());
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn coco() -> Vec<String> {
        COCO_CLASSES.iter().map(|s| s.to_string()).collect()
    }

    /// Build a [1, 4 + classes, anchors] tensor from (cx, cy, w, h, class, score) rows
    fn tensor(classes: usize, anchors: &[(f32, f32, f32, f32, usize, f32)]) -> (Vec<f32>, Vec<usize>) {
        let n = anchors.len();
        let rows = 4 + classes;
        let mut data = vec![0.0f32; rows * n];
        for (a, &(cx, cy, w, h, class_idx, score)) in anchors.iter().enumerate() {
            data[a] = cx;
            data[n + a] = cy;
            data[2 * n + a] = w;
            data[3 * n + a] = h;
            data[(4 + class_idx) * n + a] = score;
        }
        (data, vec![1, rows, n])
    }

    #[test]
    fn test_decode_single_detection() {
        let post = YoloPostprocess::new(coco(), 0.25, 0.7);
        let (data, shape) = tensor(80, &[(100.0, 100.0, 100.0, 100.0, 0, 0.9)]);
        let detections = post.decode(&data, &shape, (1.0, 1.0), (640, 640)).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_name, "person");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(detections[0].bbox, BoundingBox::new(50.0, 50.0, 150.0, 150.0));
    }

    #[test]
    fn test_decode_scales_and_clamps() {
        let post = YoloPostprocess::new(coco(), 0.25, 0.7);
        // model space 320x320 mapped onto a 640x480 frame
        let (data, shape) = tensor(80, &[(300.0, 300.0, 80.0, 80.0, 2, 0.8)]);
        let detections = post.decode(&data, &shape, (2.0, 1.5), (640, 480)).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_name, "car");
        assert_eq!(detections[0].bbox, BoundingBox::new(520.0, 390.0, 640.0, 480.0));
    }

    #[test]
    fn test_decode_drops_low_scores() {
        let post = YoloPostprocess::new(coco(), 0.5, 0.7);
        let (data, shape) = tensor(80, &[(100.0, 100.0, 20.0, 20.0, 0, 0.3)]);
        let detections = post.decode(&data, &shape, (1.0, 1.0), (640, 640)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_decode_unknown_class_label() {
        let post = YoloPostprocess::new(vec!["drone".to_string()], 0.25, 0.7);
        let (data, shape) = tensor(2, &[(50.0, 50.0, 10.0, 10.0, 1, 0.9)]);
        let detections = post.decode(&data, &shape, (1.0, 1.0), (100, 100)).unwrap();
        assert_eq!(detections[0].class_name, "class_1");
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let post = YoloPostprocess::new(coco(), 0.25, 0.7);
        assert!(matches!(post.decode(&[0.0; 4], &[1, 4], (1.0, 1.0), (10, 10)), Err(Error::Detection(_))));
        assert!(matches!(post.decode(&[0.0; 8], &[1, 4, 2], (1.0, 1.0), (10, 10)), Err(Error::Detection(_))));
        assert!(matches!(post.decode(&[0.0; 9], &[1, 5, 2], (1.0, 1.0), (10, 10)), Err(Error::Detection(_))));
    }

    #[test]
    fn test_decode_skips_non_finite_boxes() {
        let post = YoloPostprocess::new(coco(), 0.25, 0.7);
        let (data, shape) = tensor(80, &[(f32::NAN, 100.0, 20.0, 20.0, 0, 0.9)]);
        let detections = post.decode(&data, &shape, (1.0, 1.0), (640, 640)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_decode_caps_detection_count() {
        let post = YoloPostprocess::new(coco(), 0.25, 0.7).with_max_detections(2);
        let (data, shape) = tensor(
            80,
            &[
                (50.0, 50.0, 20.0, 20.0, 0, 0.6),
                (150.0, 50.0, 20.0, 20.0, 0, 0.9),
                (250.0, 50.0, 20.0, 20.0, 0, 0.8),
            ],
        );
        let detections = post.decode(&data, &shape, (1.0, 1.0), (640, 640)).unwrap();

        assert_eq!(detections.len(), 2);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert!((detections[1].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let detections = vec![
            RawDetection::new("person", 0.7, BoundingBox::new(10.0, 10.0, 60.0, 60.0)),
            RawDetection::new("person", 0.9, BoundingBox::new(12.0, 12.0, 62.0, 62.0)),
        ];
        let kept = apply_nms(detections, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_other_classes() {
        let detections = vec![
            RawDetection::new("person", 0.9, BoundingBox::new(10.0, 10.0, 60.0, 60.0)),
            RawDetection::new("dog", 0.8, BoundingBox::new(10.0, 10.0, 60.0, 60.0)),
        ];
        let kept = apply_nms(detections, 0.5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_sorted_by_confidence() {
        let detections = vec![
            RawDetection::new("a", 0.3, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            RawDetection::new("b", 0.9, BoundingBox::new(100.0, 0.0, 110.0, 10.0)),
            RawDetection::new("c", 0.6, BoundingBox::new(200.0, 0.0, 210.0, 10.0)),
        ];
        let kept = apply_nms(detections, 0.5);
        let names: Vec<&str> = kept.iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_load_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "drone\n\n  bird  \nplane").unwrap();
        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, vec!["drone", "bird", "plane"]);
    }

    #[test]
    fn test_load_labels_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(load_labels(file.path()), Err(Error::Configuration(_))));
    }
}
