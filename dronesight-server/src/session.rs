//! Per-connection session state machine
//!
//! A session sits in `Connected` waiting for the next client message, moves
//! to `Processing` while one frame is decoded, detected, described and
//! answered, then returns to `Connected`. Only the transport going away
//! (close frame, end of stream, receive or send error) reaches the terminal
//! `Disconnected` state. Every other failure is answered with a failure
//! response and the loop carries on.

use crate::protocol::{ResponseEncoder, WireMessage};
use async_trait::async_trait;
use dronesight_core::config::LimitsConfig;
use dronesight_core::{AnalysisResult, Error, Result};
use dronesight_eye::{decode_message, DetectionPipeline, FrameDecoder, SpatialDescriber};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sent if a response ever fails to serialize
const FALLBACK_RESPONSE: &str =
    r#"{"description":"frame processing failed: response encoding error","objects":[]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Processing,
    Disconnected,
}

/// What the transport delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

/// Message-oriented, bidirectional connection driving one session
#[async_trait]
pub trait FrameTransport: Send {
    /// Next event; `None` once the peer is gone
    async fn recv(&mut self) -> Option<Result<TransportEvent>>;

    async fn send(&mut self, text: String) -> Result<()>;
}

/// Everything sessions share: the detector pipeline, the frame decoder and
/// the message size limit. Built once at startup and cloned into sessions.
#[derive(Clone)]
pub struct AnalysisContext {
    pipeline: DetectionPipeline,
    decoder: Arc<dyn FrameDecoder>,
    max_message_bytes: usize,
}

impl AnalysisContext {
    pub fn new(
        pipeline: DetectionPipeline,
        decoder: Arc<dyn FrameDecoder>,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            pipeline,
            decoder,
            max_message_bytes,
        }
    }

    pub fn from_limits(
        pipeline: DetectionPipeline,
        decoder: Arc<dyn FrameDecoder>,
        limits: &LimitsConfig,
    ) -> Self {
        Self::new(pipeline, decoder, limits.max_message_bytes)
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    pub fn detector_name(&self) -> &str {
        self.pipeline.detector_name()
    }
}

/// Frame counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub failures: u64,
}

pub struct SessionHandler {
    id: String,
    context: AnalysisContext,
    describer: SpatialDescriber,
    encoder: ResponseEncoder,
    state: SessionState,
    stats: SessionStats,
}

impl SessionHandler {
    pub fn new(context: AnalysisContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context,
            describer: SpatialDescriber::new(),
            encoder: ResponseEncoder::new(),
            state: SessionState::Connected,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Drive the session until the transport disconnects
    pub async fn run<T: FrameTransport>(&mut self, transport: &mut T) -> SessionStats {
        info!("Session {} connected", self.id);

        while self.state != SessionState::Disconnected {
            let event = match transport.recv().await {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    warn!("Session {} receive failed: {}", self.id, e);
                    self.state = SessionState::Disconnected;
                    break;
                }
                None => {
                    debug!("Session {} stream ended", self.id);
                    self.state = SessionState::Disconnected;
                    break;
                }
            };

            self.handle_event(transport, event).await;
        }

        info!(
            "Session {} disconnected after {} frames ({} failed)",
            self.id, self.stats.frames, self.stats.failures
        );
        self.stats
    }

    /// Apply one transport event to the state machine
    pub async fn handle_event<T: FrameTransport>(&mut self, transport: &mut T, event: TransportEvent) {
        let result = match event {
            TransportEvent::Text(text) => {
                self.state = SessionState::Processing;
                self.process_text(text).await
            }
            TransportEvent::Binary(data) => {
                self.state = SessionState::Processing;
                debug!("Session {} got {} byte binary frame", self.id, data.len());
                self.failure_response(Error::Encoding(
                    "binary messages are not supported, send base64 text".to_string(),
                ))
            }
            TransportEvent::Ping | TransportEvent::Pong => return,
            TransportEvent::Close => {
                debug!("Session {} closed by client", self.id);
                self.state = SessionState::Disconnected;
                return;
            }
        };

        self.respond(transport, &result).await;
    }

    async fn process_text(&mut self, text: String) -> AnalysisResult {
        self.stats.frames += 1;
        match self.analyze(text).await {
            Ok(result) => result,
            Err(e) => self.failure_response(e),
        }
    }

    fn failure_response(&mut self, err: Error) -> AnalysisResult {
        self.stats.failures += 1;
        if err.is_recoverable() {
            warn!("Session {} {} failure: {}", self.id, err.kind(), err);
        } else {
            error!("Session {} unexpected failure while processing: {}", self.id, err);
        }
        AnalysisResult::failure(err.client_message())
    }

    /// Decode, detect and describe one text message
    pub async fn analyze(&self, text: String) -> Result<AnalysisResult> {
        if text.len() > self.context.max_message_bytes {
            return Err(Error::Encoding(format!(
                "message of {} bytes exceeds the {} byte limit",
                text.len(),
                self.context.max_message_bytes
            )));
        }

        let decoder = self.context.decoder.clone();
        let frame = tokio::task::spawn_blocking(move || decode_message(decoder.as_ref(), &text))
            .await
            .map_err(|e| Error::Decode(format!("decoder task failed: {}", e)))??;

        let (width, height) = (frame.width(), frame.height());
        let detections = self.context.pipeline.detect(frame).await?;

        Ok(self.describer.describe(&detections, width, height))
    }

    async fn respond<T: FrameTransport>(&mut self, transport: &mut T, result: &AnalysisResult) {
        let message: WireMessage = self.encoder.encode(result);
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Session {} failed to serialize response: {}", self.id, e);
                FALLBACK_RESPONSE.to_string()
            }
        };

        match transport.send(json).await {
            Ok(()) => self.state = SessionState::Connected,
            Err(e) => {
                warn!("Session {} send failed: {}", self.id, e);
                self.state = SessionState::Disconnected;
            }
        }
    }
}
