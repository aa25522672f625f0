// Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use dronesight_core::{BoundingBox, DetectionSet, Error, RasterFrame, RawDetection, Result};
use dronesight_eye::{DetectionPipeline, Detector, ImageDecoder};
use dronesight_server::{AnalysisContext, FrameTransport, TransportEvent};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const PERSON_LEFT_FAR: &str = "person on the left, far away.";

/// Always reports the same detections
pub struct FixedDetector(pub DetectionSet);

impl Detector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn detect(&self, _frame: &RasterFrame) -> Result<DetectionSet> {
        Ok(self.0.clone())
    }
}

/// Tracks how many calls overlap; holds each call for `hold`
pub struct CountingDetector {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    hold: Duration,
}

impl CountingDetector {
    pub fn new(hold: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            hold,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for CountingDetector {
    fn name(&self) -> &str {
        "counting"
    }

    fn detect(&self, _frame: &RasterFrame) -> Result<DetectionSet> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(person())
    }
}

pub fn person() -> DetectionSet {
    vec![RawDetection::new(
        "person",
        0.9,
        BoundingBox::new(50.0, 50.0, 150.0, 150.0),
    )]
}

pub fn context(detector: Arc<dyn Detector>, max_concurrent: usize) -> AnalysisContext {
    context_with_limit(detector, max_concurrent, 8 * 1024 * 1024)
}

pub fn context_with_limit(
    detector: Arc<dyn Detector>,
    max_concurrent: usize,
    max_message_bytes: usize,
) -> AnalysisContext {
    AnalysisContext::new(
        DetectionPipeline::new(detector, max_concurrent),
        Arc::new(ImageDecoder::new()),
        max_message_bytes,
    )
}

/// A PNG frame framed the way browser clients send it
pub fn frame_message(width: u32, height: u32) -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
    format!("data:image/png;base64,{}", base64::encode(cursor.into_inner()))
}

pub fn corrupt_message() -> String {
    format!("data:image/jpeg;base64,{}", base64::encode(b"\x00\x01 truncated frame"))
}

/// In-memory transport: events in over one channel, responses out over another
pub struct ChannelTransport {
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    outgoing: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn pair() -> (
        ChannelTransport,
        mpsc::UnboundedSender<TransportEvent>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let transport = ChannelTransport {
            incoming: event_rx,
            outgoing: response_tx,
        };
        (transport, event_tx, response_rx)
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn recv(&mut self) -> Option<Result<TransportEvent>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn send(&mut self, text: String) -> Result<()> {
        self.outgoing
            .send(text)
            .map_err(|_| Error::Transport("client went away".to_string()))
    }
}
