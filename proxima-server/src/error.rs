use proxima_core::ClientId;
use thiserror::Error;

/// Per-connection failures. Each is reported back to the offending client
/// as `ServerMessage::Error` and never affects other clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Client must send UpdatePosition first.")]
    NotRegistered,

    #[error("Client {0} not found")]
    UnknownTarget(ClientId),

    #[error("Invalid message format: {0}")]
    Malformed(String),

    #[error("Connection is registered as {registered}, refusing update for {claimed}")]
    ConflictingId {
        registered: ClientId,
        claimed: ClientId,
    },
}

/// Why a message could not be queued for a client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("no connection registered for {0}")]
    Unknown(ClientId),

    #[error("connection for {0} is closed")]
    Closed(ClientId),

    #[error("outbound queue for {0} is full")]
    Saturated(ClientId),
}
