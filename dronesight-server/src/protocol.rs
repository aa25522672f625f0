// Wire contract for analysis responses

use dronesight_core::{AnalysisResult, ObjectRecord};
use serde::{Deserialize, Serialize};

/// One detected object as the client sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireObject {
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in frame pixels
    pub bbox: [f32; 4],
}

impl From<&ObjectRecord> for WireObject {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            class_name: record.class_name.clone(),
            confidence: record.confidence,
            bbox: record.bbox.to_array(),
        }
    }
}

/// The single JSON message sent back for every client frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub description: String,
    pub objects: Vec<WireObject>,
}

impl WireMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Turns analysis results into wire messages
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Total: every analysis result has a wire form, object order preserved
    pub fn encode(&self, result: &AnalysisResult) -> WireMessage {
        WireMessage {
            description: result.description.clone(),
            objects: result.objects.iter().map(WireObject::from).collect(),
        }
    }
}
