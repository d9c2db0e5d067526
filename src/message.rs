//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Wire event names are
//! kebab-case (`create-room`, `video-play`, ...), matching what the thin
//! clients emit and consume.
//!
//! Signaling payloads (offer/answer/ICE candidate) are opaque
//! `serde_json::Value`s: the server relays them without interpretation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::playback::PlaybackState;

/// Client → Server message
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Create a room (or join it if the key already exists)
    CreateRoom { room: String, username: String },
    /// Join an existing room; fails if the key is unknown
    JoinRoom { room: String, username: String },
    /// Report a play command at the given position
    VideoPlay { room: String, time: f64 },
    /// Report a pause command at the given position
    VideoPause { room: String, time: f64 },
    /// Report a seek to the given position
    VideoSeek { room: String, time: f64 },
    /// Select a different video URL
    VideoUrlChange { room: String, url: String },
    /// Send a chat message to the room
    ChatMessage { room: String, text: String },
    /// WebRTC offer, relayed to everyone else in the room
    WebrtcOffer { room: String, offer: Value },
    /// WebRTC answer, relayed to exactly the targeted connection
    WebrtcAnswer {
        room: String,
        answer: Value,
        target: String,
    },
    /// ICE candidate; unicast when a target is given, otherwise relayed
    /// to everyone else in the room
    WebrtcIceCandidate {
        room: String,
        candidate: Value,
        #[serde(default)]
        target: Option<String>,
    },
    /// Screen sharing started
    ScreenShareStart { room: String },
    /// Screen sharing stopped
    ScreenShareStop { room: String },
}

/// Server → Client message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Room created (ack to the creator)
    RoomCreated { room: String },
    /// Current participant display names, in admission order
    UserList { users: Vec<String> },
    /// A participant joined the room
    UserJoined { username: String },
    /// A participant left the room
    UserLeft { username: String },
    /// Full playback state, sent to a newly joined participant
    VideoState {
        is_playing: bool,
        current_time: f64,
        video_url: String,
    },
    /// Another participant pressed play at this position
    VideoPlay { time: f64 },
    /// Another participant paused at this position
    VideoPause { time: f64 },
    /// Another participant seeked to this position
    VideoSeek { time: f64 },
    /// Another participant selected a different video
    VideoUrlChange { url: String },
    /// Chat message, timestamp assigned by the server at relay time
    /// (milliseconds since the Unix epoch)
    ChatMessage {
        username: String,
        text: String,
        timestamp: u64,
    },
    /// Relayed WebRTC offer; `sender` is the offering connection's id
    WebrtcOffer { sender: String, offer: Value },
    /// Relayed WebRTC answer
    WebrtcAnswer { sender: String, answer: Value },
    /// Relayed ICE candidate
    WebrtcIceCandidate { sender: String, candidate: Value },
    /// A participant started sharing their screen
    ScreenShareStart { sender: String },
    /// A participant stopped sharing their screen
    ScreenShareStop { sender: String },
    /// Error occurred (currently only join against a missing room)
    Error { message: String },
}

impl ServerMessage {
    /// Snapshot a room's playback state for a `video-state` message
    pub fn video_state(state: &PlaybackState) -> Self {
        Self::VideoState {
            is_playing: state.is_playing,
            current_time: state.current_time,
            video_url: state.video_url.clone(),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let message = match &err {
            AppError::RoomNotFound(room) => format!("Room '{}' not found", room),
            _ => "Internal error".to_string(),
        };
        ServerMessage::Error { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize() {
        let json = r#"{"type": "create-room", "room": "movie-night", "username": "Alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::CreateRoom { room, username } => {
                assert_eq!(room, "movie-night");
                assert_eq!(username, "Alice");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_ice_candidate_target_optional() {
        let json = r#"{"type": "webrtc-ice-candidate", "room": "r", "candidate": {"sdpMid": "0"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::WebrtcIceCandidate { target, .. } => assert!(target.is_none()),
            _ => panic!("Wrong variant"),
        }

        let json = r#"{"type": "webrtc-ice-candidate", "room": "r", "candidate": {}, "target": "abc"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::WebrtcIceCandidate { target, .. } => {
                assert_eq!(target.as_deref(), Some("abc"));
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_signaling_payload_is_opaque() {
        let json = r#"{"type": "webrtc-offer", "room": "r", "offer": {"sdp": "v=0...", "type": "offer"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::WebrtcOffer { offer, .. } => {
                assert_eq!(offer["type"], "offer");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_unknown_event_rejected() {
        let json = r#"{"type": "self-destruct", "room": "r"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"type": "video-play", "room": "r"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::ChatMessage {
            username: "Alice".to_string(),
            text: "hi".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"chat-message\""));
        assert!(json.contains("\"username\":\"Alice\""));
        assert!(json.contains("\"timestamp\":1700000000000"));
    }

    #[test]
    fn test_video_state_snapshot() {
        let mut state = PlaybackState::default();
        state.play(12.5);
        let json = serde_json::to_string(&ServerMessage::video_state(&state)).unwrap();
        assert!(json.contains("\"type\":\"video-state\""));
        assert!(json.contains("\"is_playing\":true"));
        assert!(json.contains("\"current_time\":12.5"));
    }

    #[test]
    fn test_room_not_found_to_error_message() {
        let msg: ServerMessage = AppError::RoomNotFound("ghost".to_string()).into();
        match msg {
            ServerMessage::Error { message } => assert!(message.contains("ghost")),
            _ => panic!("Wrong variant"),
        }
    }
}
