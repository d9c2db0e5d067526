//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, message
//! parsing, and bidirectional communication with the RelayServer.
//!
//! Malformed frames are dropped with a warning rather than terminating
//! the connection or the process; a misbehaving client must not affect
//! the rooms of others.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::{ClientId, RoomKey};

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. Whatever ends the connection
/// (close frame, stream error, server shutdown) funnels into exactly one
/// `Disconnect` command.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Generate connection id
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(32);

    // Register with the RelayServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (WebSocket -> ServerCommand)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            let Some(cmd) = client_message_to_command(client_id, client_msg)
                            else {
                                continue;
                            };
                            if cmd_tx_read.send(cmd).await.is_err() {
                                debug!("Server closed, ending read task for {}", client_id);
                                break;
                            }
                        }
                        Err(e) => {
                            // Drop the frame, keep the connection.
                            warn!("Invalid message from {}: {}", client_id, e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong is handled automatically by tungstenite
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for client");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", client_id);
        }
    }

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Convert a ClientMessage to a ServerCommand
///
/// Returns None when a targeted signaling message carries an unparseable
/// target id; such events are dropped defensively.
fn client_message_to_command(client_id: ClientId, msg: ClientMessage) -> Option<ServerCommand> {
    let cmd = match msg {
        ClientMessage::CreateRoom { room, username } => ServerCommand::CreateRoom {
            client_id,
            room: RoomKey::new(room),
            username,
        },
        ClientMessage::JoinRoom { room, username } => ServerCommand::JoinRoom {
            client_id,
            room: RoomKey::new(room),
            username,
        },
        ClientMessage::VideoPlay { room, time } => ServerCommand::VideoPlay {
            client_id,
            room: RoomKey::new(room),
            time,
        },
        ClientMessage::VideoPause { room, time } => ServerCommand::VideoPause {
            client_id,
            room: RoomKey::new(room),
            time,
        },
        ClientMessage::VideoSeek { room, time } => ServerCommand::VideoSeek {
            client_id,
            room: RoomKey::new(room),
            time,
        },
        ClientMessage::VideoUrlChange { room, url } => ServerCommand::VideoUrlChange {
            client_id,
            room: RoomKey::new(room),
            url,
        },
        ClientMessage::ChatMessage { room, text } => ServerCommand::Chat {
            client_id,
            room: RoomKey::new(room),
            text,
        },
        ClientMessage::WebrtcOffer { room, offer } => ServerCommand::WebrtcOffer {
            client_id,
            room: RoomKey::new(room),
            offer,
        },
        ClientMessage::WebrtcAnswer { answer, target, .. } => {
            let Some(target) = ClientId::parse(&target) else {
                warn!("Client {} sent answer with invalid target id", client_id);
                return None;
            };
            ServerCommand::WebrtcAnswer {
                client_id,
                target,
                answer,
            }
        }
        ClientMessage::WebrtcIceCandidate {
            room,
            candidate,
            target,
        } => {
            let target = match target {
                Some(raw) => {
                    let Some(parsed) = ClientId::parse(&raw) else {
                        warn!("Client {} sent candidate with invalid target id", client_id);
                        return None;
                    };
                    Some(parsed)
                }
                None => None,
            };
            ServerCommand::WebrtcIceCandidate {
                client_id,
                room: RoomKey::new(room),
                candidate,
                target,
            }
        }
        ClientMessage::ScreenShareStart { room } => ServerCommand::ScreenShareStart {
            client_id,
            room: RoomKey::new(room),
        },
        ClientMessage::ScreenShareStop { room } => ServerCommand::ScreenShareStop {
            client_id,
            room: RoomKey::new(room),
        },
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_with_bad_target_is_dropped() {
        let msg = ClientMessage::WebrtcAnswer {
            room: "r".to_string(),
            answer: serde_json::json!({}),
            target: "not-a-uuid".to_string(),
        };
        assert!(client_message_to_command(ClientId::new(), msg).is_none());
    }

    #[test]
    fn test_untargeted_candidate_converts() {
        let msg = ClientMessage::WebrtcIceCandidate {
            room: "r".to_string(),
            candidate: serde_json::json!({}),
            target: None,
        };
        match client_message_to_command(ClientId::new(), msg) {
            Some(ServerCommand::WebrtcIceCandidate { target, .. }) => assert!(target.is_none()),
            other => panic!("unexpected conversion: {:?}", other),
        }
    }

    #[test]
    fn test_create_room_converts() {
        let id = ClientId::new();
        let msg = ClientMessage::CreateRoom {
            room: "movie-night".to_string(),
            username: "alice".to_string(),
        };
        match client_message_to_command(id, msg) {
            Some(ServerCommand::CreateRoom {
                client_id,
                room,
                username,
            }) => {
                assert_eq!(client_id, id);
                assert_eq!(room, RoomKey::new("movie-night"));
                assert_eq!(username, "alice");
            }
            other => panic!("unexpected conversion: {:?}", other),
        }
    }
}
