use thiserror::Error;

/// Client-facing description for any payload that could not become a frame
pub const DECODE_FAILURE_DESCRIPTION: &str = "failed to decode image frame";

#[derive(Error, Debug)]
pub enum Error {
    /// Payload decoded to bytes but not to a usable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Message framing or base64 text was malformed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Detector failed or produced output that could not be interpreted
    #[error("Detection error: {0}")]
    Detection(String),

    /// Connection closed or broken
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Only transport failures end a session
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Transport(_))
    }

    /// Short category label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Decode(_) => "decode",
            Error::Encoding(_) => "encoding",
            Error::Detection(_) => "detection",
            Error::Transport(_) => "transport",
            Error::Configuration(_) => "configuration",
            Error::Io(_) => "io",
        }
    }

    /// Description sent back to the client in place of an analysis
    pub fn client_message(&self) -> String {
        match self {
            Error::Decode(_) | Error::Encoding(_) => DECODE_FAILURE_DESCRIPTION.to_string(),
            Error::Detection(diagnostic) => format!("detection failed: {}", diagnostic),
            other => format!("frame processing failed: {}", other),
        }
    }
}
