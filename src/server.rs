//! RelayServer Actor implementation
//!
//! The central actor that owns all state: clients, rooms, and the
//! client-room mapping. Commands arrive over an mpsc channel and are
//! processed one at a time, which makes every mutate-then-broadcast
//! sequence atomic with respect to other events touching the same room.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::room::Room;
use crate::types::{ClientId, RoomKey};

/// Commands sent from connection handlers to the RelayServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected (explicit close or network drop)
    Disconnect {
        client_id: ClientId,
    },
    /// Create a room, or enter it if the key already exists
    CreateRoom {
        client_id: ClientId,
        room: RoomKey,
        username: String,
    },
    /// Join an existing room
    JoinRoom {
        client_id: ClientId,
        room: RoomKey,
        username: String,
    },
    /// Playback: play at the reported position
    VideoPlay {
        client_id: ClientId,
        room: RoomKey,
        time: f64,
    },
    /// Playback: pause at the reported position
    VideoPause {
        client_id: ClientId,
        room: RoomKey,
        time: f64,
    },
    /// Playback: seek to the reported position
    VideoSeek {
        client_id: ClientId,
        room: RoomKey,
        time: f64,
    },
    /// Playback: switch the shared video URL
    VideoUrlChange {
        client_id: ClientId,
        room: RoomKey,
        url: String,
    },
    /// Chat message to the sender's room
    Chat {
        client_id: ClientId,
        room: RoomKey,
        text: String,
    },
    /// WebRTC offer for everyone else in the room
    WebrtcOffer {
        client_id: ClientId,
        room: RoomKey,
        offer: Value,
    },
    /// WebRTC answer for one specific connection
    WebrtcAnswer {
        client_id: ClientId,
        target: ClientId,
        answer: Value,
    },
    /// ICE candidate, unicast when targeted, room-wide otherwise
    WebrtcIceCandidate {
        client_id: ClientId,
        room: RoomKey,
        candidate: Value,
        target: Option<ClientId>,
    },
    /// Screen share started
    ScreenShareStart {
        client_id: ClientId,
        room: RoomKey,
    },
    /// Screen share stopped
    ScreenShareStop {
        client_id: ClientId,
        room: RoomKey,
    },
}

/// The main RelayServer actor
///
/// Owns the room registry, membership, and per-client send handles.
/// HashMaps give O(1) lookups on clients, rooms, and the client-room
/// mapping.
pub struct RelayServer {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All live rooms: RoomKey -> Room
    rooms: HashMap<RoomKey, Room>,
    /// Client to room mapping for fast lookup: ClientId -> RoomKey
    client_rooms: HashMap<ClientId, RoomKey>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl RelayServer {
    /// Create a new RelayServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            client_rooms: HashMap::new(),
            receiver,
        }
    }

    /// Run the RelayServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("RelayServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("RelayServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id).await;
            }
            ServerCommand::CreateRoom { client_id, room, username } => {
                self.handle_create_room(client_id, room, username).await;
            }
            ServerCommand::JoinRoom { client_id, room, username } => {
                self.handle_join_room(client_id, room, username).await;
            }
            ServerCommand::VideoPlay { client_id, room, time } => {
                self.handle_video_play(client_id, room, time).await;
            }
            ServerCommand::VideoPause { client_id, room, time } => {
                self.handle_video_pause(client_id, room, time).await;
            }
            ServerCommand::VideoSeek { client_id, room, time } => {
                self.handle_video_seek(client_id, room, time).await;
            }
            ServerCommand::VideoUrlChange { client_id, room, url } => {
                self.handle_video_url_change(client_id, room, url).await;
            }
            ServerCommand::Chat { client_id, room, text } => {
                self.handle_chat(client_id, room, text).await;
            }
            ServerCommand::WebrtcOffer { client_id, room, offer } => {
                self.handle_webrtc_offer(client_id, room, offer).await;
            }
            ServerCommand::WebrtcAnswer { client_id, target, answer } => {
                self.handle_webrtc_answer(client_id, target, answer).await;
            }
            ServerCommand::WebrtcIceCandidate { client_id, room, candidate, target } => {
                self.handle_webrtc_ice(client_id, room, candidate, target).await;
            }
            ServerCommand::ScreenShareStart { client_id, room } => {
                self.handle_screen_share(client_id, room, true).await;
            }
            ServerCommand::ScreenShareStop { client_id, room } => {
                self.handle_screen_share(client_id, room, false).await;
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.clients.insert(client_id, Client::new(client_id, sender));
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle client disconnection
    ///
    /// Safe to run after an implicit leave already fired: removing an
    /// absent membership is a no-op.
    async fn handle_disconnect(&mut self, client_id: ClientId) {
        info!("Client {} disconnected", client_id);

        if let Some(room_key) = self.client_rooms.remove(&client_id) {
            self.leave_room(client_id, &room_key).await;
        }

        self.clients.remove(&client_id);

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Handle room creation
    ///
    /// Get-or-create on the key: a second create against a live key joins
    /// that room. A client already in a different room is moved out first.
    async fn handle_create_room(&mut self, client_id: ClientId, key: RoomKey, username: String) {
        if !self.clients.contains_key(&client_id) {
            return;
        }

        self.move_out_if_elsewhere(client_id, &key).await;

        let (members, users) = {
            let room = self
                .rooms
                .entry(key.clone())
                .or_insert_with(|| Room::new(key.clone()));
            room.add_participant(client_id, username.clone());
            (room.participant_ids(), room.usernames())
        };
        self.client_rooms.insert(client_id, key.clone());

        info!("Client {} ('{}') entered room {} via create", client_id, username, key);

        self.send_to(
            client_id,
            ServerMessage::RoomCreated {
                room: key.to_string(),
            },
        )
        .await;
        self.broadcast(&members, &ServerMessage::UserList { users }).await;
    }

    /// Handle room joining
    ///
    /// Asymmetric with create: a missing key is an error surfaced to the
    /// joiner, and no room is created.
    async fn handle_join_room(&mut self, client_id: ClientId, key: RoomKey, username: String) {
        if !self.clients.contains_key(&client_id) {
            return;
        }

        // Existence is checked before any membership change: a failed join
        // leaves the joiner in whatever room they were already in.
        if !self.rooms.contains_key(&key) {
            debug!("Client {} tried to join unknown room {}", client_id, key);
            self.send_to(client_id, AppError::RoomNotFound(key.to_string()).into())
                .await;
            return;
        }

        self.move_out_if_elsewhere(client_id, &key).await;

        let Some(room) = self.rooms.get_mut(&key) else {
            return;
        };

        room.add_participant(client_id, username.clone());
        let state_msg = ServerMessage::video_state(&room.playback);
        let members = room.participant_ids();
        let users = room.usernames();
        self.client_rooms.insert(client_id, key.clone());

        info!("Client {} ('{}') joined room {}", client_id, username, key);

        // The joiner starts from the room's last-known playback state.
        self.send_to(client_id, state_msg).await;
        self.broadcast(&members, &ServerMessage::UserJoined { username }).await;
        self.broadcast(&members, &ServerMessage::UserList { users }).await;
    }

    /// Playback: play
    async fn handle_video_play(&mut self, client_id: ClientId, key: RoomKey, time: f64) {
        // Unknown room: silent drop. The sender may have raced a disconnect.
        let Some(room) = self.rooms.get_mut(&key) else {
            return;
        };
        room.playback.play(time);
        let members = room.participant_ids();
        debug!("Room {}: play at {}", key, time);
        self.broadcast_except(&members, client_id, &ServerMessage::VideoPlay { time })
            .await;
    }

    /// Playback: pause
    async fn handle_video_pause(&mut self, client_id: ClientId, key: RoomKey, time: f64) {
        let Some(room) = self.rooms.get_mut(&key) else {
            return;
        };
        room.playback.pause(time);
        let members = room.participant_ids();
        debug!("Room {}: pause at {}", key, time);
        self.broadcast_except(&members, client_id, &ServerMessage::VideoPause { time })
            .await;
    }

    /// Playback: seek
    async fn handle_video_seek(&mut self, client_id: ClientId, key: RoomKey, time: f64) {
        let Some(room) = self.rooms.get_mut(&key) else {
            return;
        };
        room.playback.seek(time);
        let members = room.participant_ids();
        debug!("Room {}: seek to {}", key, time);
        self.broadcast_except(&members, client_id, &ServerMessage::VideoSeek { time })
            .await;
    }

    /// Playback: URL change
    async fn handle_video_url_change(&mut self, client_id: ClientId, key: RoomKey, url: String) {
        let Some(room) = self.rooms.get_mut(&key) else {
            return;
        };
        room.playback.set_url(url.clone());
        let members = room.participant_ids();
        info!("Room {}: video URL changed", key);
        self.broadcast_except(&members, client_id, &ServerMessage::VideoUrlChange { url })
            .await;
    }

    /// Handle chat message
    ///
    /// Goes to the whole room including the sender, with a server-assigned
    /// timestamp so all participants share one ordering reference.
    async fn handle_chat(&mut self, client_id: ClientId, key: RoomKey, text: String) {
        let Some(room) = self.rooms.get(&key) else {
            return;
        };
        let username = room
            .username_of(client_id)
            .unwrap_or("anonymous")
            .to_string();
        let members = room.participant_ids();
        let msg = ServerMessage::ChatMessage {
            username,
            text,
            timestamp: unix_millis(),
        };
        self.broadcast(&members, &msg).await;
    }

    /// Relay a WebRTC offer to everyone else in the room
    async fn handle_webrtc_offer(&mut self, client_id: ClientId, key: RoomKey, offer: Value) {
        let Some(room) = self.rooms.get(&key) else {
            return;
        };
        let members = room.participant_ids();
        debug!("Room {}: relaying offer from {}", key, client_id);
        self.broadcast_except(
            &members,
            client_id,
            &ServerMessage::WebrtcOffer {
                sender: client_id.to_string(),
                offer,
            },
        )
        .await;
    }

    /// Relay a WebRTC answer to exactly one connection
    ///
    /// A target that no longer maps to a live connection drops the message
    /// silently; the sender cannot be expected to track remote liveness.
    async fn handle_webrtc_answer(&mut self, client_id: ClientId, target: ClientId, answer: Value) {
        debug!("Relaying answer from {} to {}", client_id, target);
        self.send_to(
            target,
            ServerMessage::WebrtcAnswer {
                sender: client_id.to_string(),
                answer,
            },
        )
        .await;
    }

    /// Relay an ICE candidate
    ///
    /// Unicast when the sender named a target, room-wide (minus sender)
    /// during early peer discovery when it did not.
    async fn handle_webrtc_ice(
        &mut self,
        client_id: ClientId,
        key: RoomKey,
        candidate: Value,
        target: Option<ClientId>,
    ) {
        let msg = ServerMessage::WebrtcIceCandidate {
            sender: client_id.to_string(),
            candidate,
        };
        match target {
            Some(target) => {
                self.send_to(target, msg).await;
            }
            None => {
                let Some(room) = self.rooms.get(&key) else {
                    return;
                };
                let members = room.participant_ids();
                self.broadcast_except(&members, client_id, &msg).await;
            }
        }
    }

    /// Relay a screen-share start/stop notice to everyone else in the room
    async fn handle_screen_share(&mut self, client_id: ClientId, key: RoomKey, start: bool) {
        let Some(room) = self.rooms.get(&key) else {
            return;
        };
        let members = room.participant_ids();
        let sender = client_id.to_string();
        info!(
            "Room {}: {} screen share {}",
            key,
            client_id,
            if start { "started" } else { "stopped" }
        );
        let msg = if start {
            ServerMessage::ScreenShareStart { sender }
        } else {
            ServerMessage::ScreenShareStop { sender }
        };
        self.broadcast_except(&members, client_id, &msg).await;
    }

    /// Helper: implicit leave before entering a different room
    ///
    /// A repeated create/join against the client's current room stays put;
    /// any other room membership is removed first, with the usual left
    /// notifications and empty-room teardown.
    async fn move_out_if_elsewhere(&mut self, client_id: ClientId, new_key: &RoomKey) {
        let old_key = match self.client_rooms.get(&client_id) {
            Some(old) if old != new_key => old.clone(),
            _ => return,
        };
        self.client_rooms.remove(&client_id);
        info!("Client {} moved out of room {}", client_id, old_key);
        self.leave_room(client_id, &old_key).await;
    }

    /// Helper: remove a client from a room and handle cleanup
    ///
    /// Deleting the room the instant it empties is the sole teardown path;
    /// there is no idle-timeout eviction.
    async fn leave_room(&mut self, client_id: ClientId, room_key: &RoomKey) {
        let Some(room) = self.rooms.get_mut(room_key) else {
            return;
        };
        let Some(left) = room.remove_participant(client_id) else {
            return;
        };

        if room.is_empty() {
            self.rooms.remove(room_key);
            debug!("Room {} deleted (empty)", room_key);
            return;
        }

        let members = room.participant_ids();
        let users = room.usernames();
        self.broadcast(
            &members,
            &ServerMessage::UserLeft {
                username: left.username,
            },
        )
        .await;
        self.broadcast(&members, &ServerMessage::UserList { users }).await;
    }

    /// Helper: best-effort send to one connection
    ///
    /// An unknown id or a closed channel drops the message; relays are
    /// at-most-once with no redelivery.
    async fn send_to(&self, id: ClientId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&id) else {
            debug!("Dropping message for unknown client {}", id);
            return;
        };
        if client.send(msg).await.is_err() {
            debug!("Dropping message for unreachable client {}", id);
        }
    }

    /// Helper: fan out to every listed connection
    async fn broadcast(&self, members: &[ClientId], msg: &ServerMessage) {
        for &id in members {
            self.send_to(id, msg.clone()).await;
        }
    }

    /// Helper: fan out to every listed connection except one
    async fn broadcast_except(&self, members: &[ClientId], except: ClientId, msg: &ServerMessage) {
        for &id in members {
            if id != except {
                self.send_to(id, msg.clone()).await;
            }
        }
    }
}

/// Server-side timestamp for chat messages, milliseconds since the epoch
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
