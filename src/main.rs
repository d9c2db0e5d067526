//! Watch-party session coordinator - Entry Point
//!
//! Wires up logging, the RelayServer actor, and the accept loop.

use std::env;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use watch_party_server::{handle_connection, RelayServer, ServerCommand};

/// Default bind address when none is given on the command line
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(RelayServer::new(cmd_rx).run());

    let listener = TcpListener::bind(&addr).await?;
    info!("Watch-party server listening on {}", addr);

    run_listener(listener, cmd_tx).await
}

/// Set up log output, filterable via RUST_LOG
/// (e.g. RUST_LOG=debug or RUST_LOG=watch_party_server=trace)
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watch_party_server=info")),
        )
        .init();
}

/// Accept connections forever, one handler task per client
///
/// An accept failure is logged and skipped; it never takes the server
/// down.
async fn run_listener(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Accept failed: {}", e);
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let cmd_tx = cmd_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, cmd_tx).await {
                error!("Connection handler error: {}", e);
            }
        });
    }
}
