//! Client struct definition
//!
//! Represents a connected client: their connection id and the channel the
//! write task drains toward their WebSocket.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client handle
///
/// Room membership and display name live on the room side; the client
/// handle only knows how to reach the connection.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given id and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Send a message to this client
    ///
    /// Returns an error if the channel is closed (client disconnected).
    /// Callers treat that as best-effort delivery failure and move on.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(ClientId::new(), tx);

        client
            .send(ServerMessage::UserJoined {
                username: "alice".to_string(),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(ServerMessage::UserJoined { username }) => assert_eq!(username, "alice"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_send_closed_channel() {
        let (tx, rx) = mpsc::channel(32);
        drop(rx);
        let client = Client::new(ClientId::new(), tx);

        let result = client
            .send(ServerMessage::UserJoined {
                username: "alice".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
