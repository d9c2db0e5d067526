//! Basic type definitions for the session coordinator
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `RoomKey`: opaque client-chosen room identifier

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 assigned when a connection attaches. Never reused:
/// a reconnecting client gets a fresh id. Implements Hash and Eq for
/// use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random connection id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a connection id from its wire form
    ///
    /// Returns None for anything that is not a valid UUID, so malformed
    /// target ids can be dropped instead of crashing the handler.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room key (opaque, client-chosen)
///
/// Rooms are keyed by whatever string the creating client picked; two
/// clients using the same key end up in the same room. Compared exactly,
/// no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey(pub String);

impl RoomKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_unique() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_id_parse_roundtrip() {
        let id = ClientId::new();
        assert_eq!(ClientId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_client_id_parse_rejects_garbage() {
        assert!(ClientId::parse("not-a-uuid").is_none());
        assert!(ClientId::parse("").is_none());
    }

    #[test]
    fn test_room_key_exact_match() {
        assert_eq!(RoomKey::new("movie-night"), RoomKey::new("movie-night"));
        assert_ne!(RoomKey::new("Movie-Night"), RoomKey::new("movie-night"));
    }
}
