use thiserror::Error;

/// Failures of a direct peer transport.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("rtc error: {0}")]
    Rtc(#[from] webrtc::Error),
    #[error("bad session payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("link is closed")]
    Closed,
}
