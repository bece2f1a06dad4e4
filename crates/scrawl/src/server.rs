//! Server wiring: listener, shared state, and the room sweeper.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::interval;
use tracing::{error, info};

use scrawl_engine::Dispatcher;
use scrawl_protocol::JsonCodec;
use scrawl_store::{MemoryStore, RoomStore};
use scrawl_transport::{Registry, WsListener};

use crate::ScrawlError;
use crate::config::Settings;
use crate::handler::handle_connection;

/// Shared state cloned into every connection task.
pub(crate) struct ServerState {
    pub(crate) dispatcher: Dispatcher<MemoryStore>,
    pub(crate) registry: Registry,
    pub(crate) codec: JsonCodec,
    pub(crate) settings: Settings,
}

/// A bound, ready-to-run game server.
pub struct ScrawlServer {
    listener: WsListener,
    state: Arc<ServerState>,
}

impl ScrawlServer {
    /// Binds the listener and assembles the stack.
    pub async fn bind(settings: Settings) -> Result<Self, ScrawlError> {
        let listener = WsListener::bind(&settings.bind_addr).await?;
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(ServerState {
            dispatcher: Dispatcher::new(store, settings.room_ttl_sec),
            registry: Registry::new(),
            codec: JsonCodec,
            settings,
        });
        Ok(ScrawlServer { listener, state })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ScrawlError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop plus the background sweeper. Runs until the process
    /// is terminated.
    pub async fn run(self) -> Result<(), ScrawlError> {
        info!("scrawl server running");

        let sweeper_state = Arc::clone(&self.state);
        tokio::spawn(async move {
            sweep_loop(sweeper_state).await;
        });

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically evicts idle rooms; the lazy per-command eviction in the
/// store covers lookups, this reclaims rooms nobody touches again.
async fn sweep_loop(state: Arc<ServerState>) {
    let mut ticker = interval(Duration::from_secs(state.settings.sweep_interval_sec.max(1)));
    loop {
        ticker.tick().await;
        let swept = state.dispatcher.store().sweep_expired(unix_now()).await;
        for code in swept {
            info!(room = %code, "room expired");
        }
    }
}

/// Seconds since the unix epoch; the single time source for the server.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
