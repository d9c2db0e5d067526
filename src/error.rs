//! Error types for the session coordinator
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers fatal connection errors (terminate the connection) and the one
/// domain error that is surfaced to clients (`RoomNotFound`). Everything
/// else stays inside a single connection's failure domain.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal to the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal to the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Join attempted against a room that does not exist
    #[error("Room not found: {0}")]
    RoomNotFound(String),
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
