//! The session aggregate: registry, mapping tables, game state and the
//! services that act on them.
//!
//! Two locks guard the mutable state. `game` (selection, settings, lifecycle
//! flags) is always taken before `registry` (clients, mappings, readiness).
//! Nothing awaits while holding either; every send is a non-blocking queue push.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use lockstep_netproto::PlayerId;
use lockstep_netproto::messages::game::NetSettings;
use lockstep_netproto::messages::session::Ping;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::async_queue::{AsyncQueue, AsyncQueueRx, QueueItem, Target};
use crate::catalog::GameCatalog;
use crate::chunked::{ChunkEngine, Roster};
use crate::config::ServerConfig;
use crate::proto_dispatch::build_registry;
use crate::proto_dispatch::registry::HandlerRegistry;
use crate::services::Services;

pub mod desync;
pub mod handle;
pub mod lifecycle;
pub mod mapping;
pub mod readiness;
pub mod registry;
pub mod state;

pub use handle::SessionHandle;
use registry::Registry;
use state::GameState;

pub struct Session {
    pub(crate) game: Mutex<GameState>,
    pub(crate) registry: RwLock<Registry>,
    pub(crate) queue: AsyncQueue,
    pub(crate) chunks: ChunkEngine,
    pub(crate) services: Services,
    pub(crate) catalog: Arc<GameCatalog>,
    pub(crate) config: ServerConfig,
    /// Background work (delayed commands, save writes) joined at shutdown.
    pub(crate) tasks: TaskTracker,
    pub(crate) shutdown: CancellationToken,
    pub(crate) handlers: HandlerRegistry,
}

/// Receiving ends owned by [`crate::run_server`].
pub struct SessionRuntime {
    pub(crate) queue_rx: AsyncQueueRx,
}

impl Session {
    pub fn new(
        config: ServerConfig,
        settings: NetSettings,
        services: Services,
    ) -> (Arc<Self>, SessionRuntime) {
        let (queue, queue_rx) = AsyncQueue::new();
        let session = Arc::new(Self {
            game: Mutex::new(GameState::new(settings, config.pad_buffer_size)),
            registry: RwLock::new(Registry::default()),
            queue,
            chunks: ChunkEngine::new(config.chunk.clone()),
            services,
            catalog: Arc::new(GameCatalog::new(config.catalog_path.clone())),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            handlers: build_registry(),
            config,
        });
        (session, SessionRuntime { queue_rx })
    }

    pub fn handle(self: &Arc<Self>) -> SessionHandle {
        SessionHandle::new(self.clone())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Take both locks in the only permitted order.
    pub(crate) fn lock(&self) -> (MutexGuard<'_, GameState>, RwLockWriteGuard<'_, Registry>) {
        let game = self.game.lock();
        let registry = self.registry.write();
        (game, registry)
    }

    /// Deliver one item from the async queue.
    pub(crate) fn deliver(&self, item: QueueItem) {
        match item {
            QueueItem::Packet {
                frame,
                channel,
                target,
            } => self.registry.read().send_frame(frame, channel, target),
            QueueItem::Kick { pid, reason } => self.disconnect(pid, reason),
        }
    }

    /// Broadcast a fresh ping key and remember when it went out.
    pub(crate) fn send_pings(&self) {
        let mut game = self.game.lock();
        game.ping_key = wall_clock_token();
        game.ping_sent_at = Some(Instant::now());
        let registry = self.registry.read();
        trace!(key = game.ping_key, players = registry.len(), "Sending pings");
        registry.broadcast(&Ping { key: game.ping_key }, Target::ALL);
    }

    /// Milliseconds since the last ping broadcast.
    pub(crate) fn ping_elapsed_ms(game: &GameState) -> u32 {
        game.ping_sent_at
            .map(|t| t.elapsed().as_millis().min(u32::MAX as u128) as u32)
            .unwrap_or(0)
    }

    /// Stop background work and close every peer.
    pub(crate) async fn shutdown(&self) {
        debug!("Session shutting down");
        self.shutdown.cancel();
        self.chunks.abort();
        {
            let (_game, mut registry) = self.lock();
            for pid in registry.pids() {
                if let Some(client) = registry.remove(pid) {
                    client.cancel_token.cancel();
                }
            }
        }
        self.tasks.close();
        self.tasks.wait().await;
    }
}

impl Roster for Session {
    fn connected(&self) -> Vec<PlayerId> {
        self.registry.read().pids()
    }

    fn is_connected(&self, pid: PlayerId) -> bool {
        self.registry.read().contains(pid)
    }
}

/// Wall-clock milliseconds truncated to 32 bits. Used as an opaque token.
pub(crate) fn wall_clock_token() -> u32 {
    Utc::now().timestamp_millis() as u32
}
