//! Incoming frame decoding
//!
//! A client message is text: an optional metadata prefix ending in a comma
//! (usually a data URI such as `data:image/jpeg;base64,`) followed by a base64
//! encoded image. Framing and base64 problems are encoding failures; bytes
//! that do not form a usable image are decode failures.

use dronesight_core::{Error, RasterFrame, Result};
use tracing::debug;

/// Capability that turns encoded image bytes into a raster frame
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RasterFrame>;
}

/// Decoder backed by the `image` crate (JPEG, PNG, BMP)
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RasterFrame> {
        if bytes.is_empty() {
            return Err(Error::Decode("empty image buffer".to_string()));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::Decode(format!("unreadable image: {}", e)))?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Decoded {}x{} frame from {} bytes", width, height, bytes.len());

        RasterFrame::new(width, height, rgb.into_raw())
    }
}

/// Strip an optional metadata prefix; only text after the last comma counts
pub fn extract_payload(text: &str) -> Result<&str> {
    let payload = match text.rfind(',') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };
    let payload = payload.trim();

    if payload.is_empty() {
        return Err(Error::Encoding("message carries no image payload".to_string()));
    }

    Ok(payload)
}

/// Decode standard-alphabet base64
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    base64::decode(payload).map_err(|e| Error::Encoding(format!("invalid base64 payload: {}", e)))
}

/// Full text-message path: framing, base64, then the image codec
pub fn decode_message(decoder: &dyn FrameDecoder, text: &str) -> Result<RasterFrame> {
    let payload = extract_payload(text)?;
    let bytes = decode_base64(payload)?;
    decoder.decode(&bytes)
}
