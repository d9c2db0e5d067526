//! Room struct definition
//!
//! An ephemeral group of participants sharing chat, playback state, and a
//! signaling relay. Created on first `create-room` for an unseen key,
//! destroyed the instant the last participant leaves.

use crate::playback::PlaybackState;
use crate::types::{ClientId, RoomKey};

/// One admitted member of a room
#[derive(Debug, Clone)]
pub struct Participant {
    /// Connection id of the member
    pub id: ClientId,
    /// Display name, arbitrary non-empty text, not unique
    pub username: String,
}

/// A watch-party room
///
/// Participants are kept in admission order, which is the order the
/// `user-list` broadcast reflects. Rooms are small, so membership lookups
/// are linear scans.
#[derive(Debug)]
pub struct Room {
    /// Client-chosen key identifying this room
    pub key: RoomKey,
    /// Current members, in admission order
    participants: Vec<Participant>,
    /// Last-known playback status of the shared video
    pub playback: PlaybackState,
}

impl Room {
    /// Create an empty room with default playback state
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            participants: Vec::new(),
            playback: PlaybackState::default(),
        }
    }

    /// Admit a participant, or update their display name if already present
    ///
    /// A repeated create/join from the same connection against the same
    /// room replaces the record in place rather than appending a duplicate.
    pub fn add_participant(&mut self, id: ClientId, username: String) {
        if let Some(existing) = self.participants.iter_mut().find(|p| p.id == id) {
            existing.username = username;
        } else {
            self.participants.push(Participant { id, username });
        }
    }

    /// Remove a participant, returning their record if they were a member
    pub fn remove_participant(&mut self, id: ClientId) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(pos))
    }

    /// Check whether a connection is a member of this room
    pub fn contains(&self, id: ClientId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    /// Display name of a member, if they are one
    pub fn username_of(&self, id: ClientId) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.username.as_str())
    }

    /// Display names in admission order, for the `user-list` broadcast
    pub fn usernames(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.username.clone()).collect()
    }

    /// Connection ids of all members, in admission order
    pub fn participant_ids(&self) -> Vec<ClientId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    /// True when nobody is left; the registry deletes the room then
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Number of current members
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
