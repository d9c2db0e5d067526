//! Watch-party session coordinator
//!
//! A WebSocket server that tracks ephemeral rooms of participants and
//! relays three kinds of time-sensitive events among them: chat messages,
//! playback-synchronization commands for a shared video, and WebRTC
//! signaling for audio calls and screen sharing.
//!
//! # What the server does (and doesn't)
//! - Rooms are keyed by client-chosen strings, created on `create-room`,
//!   and deleted the instant they empty. Nothing is persisted.
//! - Playback state is a last-writer-wins cache of the most recent
//!   play/pause/seek/url command, handed to late joiners as their
//!   starting point. The server never advances it on its own clock.
//! - Signaling payloads are relayed opaquely; media flows peer-to-peer
//!   once negotiated and never touches this server.
//!
//! # Architecture
//! Actor pattern with `mpsc` channels:
//! - `RelayServer` is the central actor owning all state
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - all state access goes through message passing,
//!   and one-command-at-a-time processing keeps every room's
//!   mutate-then-broadcast sequence atomic
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use watch_party_server::{RelayServer, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(RelayServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod message;
pub mod playback;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ServerMessage};
pub use playback::PlaybackState;
pub use room::{Participant, Room};
pub use server::{RelayServer, ServerCommand};
pub use types::{ClientId, RoomKey};
