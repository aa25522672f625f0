//! dronesight-server: WebSocket relay for real-time frame analysis
//!
//! Clients stream base64 frames to the analyze endpoint and get one JSON
//! description back per frame.

pub mod http;
pub mod protocol;
pub mod session;
pub mod startup;
pub mod websocket;

pub use http::{create_router, AppState, HealthResponse};
pub use protocol::{ResponseEncoder, WireMessage, WireObject};
pub use session::{AnalysisContext, FrameTransport, SessionHandler, SessionState, SessionStats, TransportEvent};
