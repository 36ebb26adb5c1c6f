//! WebSocket Game Server
//!
//! Async WebSocket server for quiz and duel clients.
//! Handles identification, cooldown gating and routing into the engine.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::engine::stats::{JsonFileStats, MemoryStats, StatsError, StatsGateway};
use crate::engine::{DuelEngine, EngineError};
use crate::game::session::Identity;
use crate::game::words::{WordPool, WordPoolError};
use crate::network::cooldown::Cooldown;
use crate::network::protocol::{
    ClientMessage, ErrorCode, IdentifyRequest, ServerError, ServerMessage,
    DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT,
};
use crate::network::registry::ClientRegistry;

/// Outbound queue per connection.
const OUTBOUND_CAPACITY: usize = 64;

/// How often idle connections are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Stats storage could not be opened.
    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),

    /// Word list could not be loaded.
    #[error("Word list error: {0}")]
    Words(#[from] WordPoolError),
}

/// Connected client bookkeeping.
struct ConnectedClient {
    /// Identified user, if any.
    identity: Option<Identity>,
    /// Last activity.
    last_activity: Instant,
    /// Wakes the connection task to close it.
    kick: Arc<Notify>,
}

/// Everything a connection task needs.
#[derive(Clone)]
struct ServerContext {
    config: Arc<ServerConfig>,
    engine: Arc<DuelEngine>,
    registry: Arc<ClientRegistry>,
    cooldown: Arc<Cooldown>,
}

/// Per-connection state owned by its task.
struct Connection {
    addr: SocketAddr,
    identity: Option<Identity>,
    sender: mpsc::Sender<ServerMessage>,
    watcher: Option<JoinHandle<()>>,
}

/// The game server.
pub struct GameServer {
    /// Shared handles.
    ctx: ServerContext,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server around an existing engine. `registry` must be the
    /// engine's notifier.
    pub fn new(config: ServerConfig, engine: Arc<DuelEngine>, registry: Arc<ClientRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let cooldown = Arc::new(Cooldown::new(config.cooldown));

        Self {
            ctx: ServerContext {
                config: Arc::new(config),
                engine,
                registry,
                cooldown,
            },
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Build stats, vocabulary, registry and engine from configuration.
    pub fn from_config(config: ServerConfig) -> Result<Self, GameServerError> {
        let stats: Arc<dyn StatsGateway> = match &config.stats_path {
            Some(path) => Arc::new(JsonFileStats::open(path)?),
            None => {
                info!("No stats file configured, keeping stats in memory");
                Arc::new(MemoryStats::new())
            }
        };
        let words = match &config.words_path {
            Some(path) => WordPool::from_json_file(path)?,
            None => WordPool::builtin(),
        };

        let registry = Arc::new(ClientRegistry::new());
        let engine = Arc::new(DuelEngine::new(
            config.engine.clone(),
            words,
            stats,
            registry.clone(),
        ));
        Ok(Self::new(config, engine, registry))
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.ctx.config.bind_addr).await?;
        info!("Game server listening on {}", self.ctx.config.bind_addr);

        let cleanup_clients = self.clients.clone();
        let cleanup_ctx = self.ctx.clone();
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, cleanup_ctx).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.ctx.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let ctx = self.ctx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
            let kick = Arc::new(Notify::new());

            // Register client
            clients.write().await.insert(
                addr,
                ConnectedClient {
                    identity: None,
                    last_activity: Instant::now(),
                    kick: kick.clone(),
                },
            );

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut conn = Connection {
                addr,
                identity: None,
                sender: msg_tx.clone(),
                watcher: None,
            };

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => ctx.handle_client_message(&mut conn, client_msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        Some(ServerMessage::error(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))
                                    }
                                };

                                // Update activity
                                if let Some(client) = clients.write().await.get_mut(&addr) {
                                    client.last_activity = Instant::now();
                                    client.identity = conn.identity.clone();
                                }

                                if let Some(reply) = reply {
                                    if msg_tx.send(reply).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = kick.notified() => {
                        info!("Closing idle client {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            conn.close(&ctx.registry);
            drop(conn);
            drop(msg_tx);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Sender for {} did not drain in time", addr);
            }

            clients.write().await.remove(&addr);
            info!("Client {} cleaned up", addr);
        });
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(
        clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        ctx: ServerContext,
    ) {
        let mut interval = interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;

            // Kick idle connections; their tasks remove themselves.
            let now = Instant::now();
            let idle_timeout = ctx.config.idle_timeout;
            {
                let clients = clients.read().await;
                for (addr, client) in clients.iter() {
                    if now.saturating_duration_since(client.last_activity) > idle_timeout {
                        debug!(
                            user_id = ?client.identity.as_ref().map(|i| &i.user_id),
                            "Kicking idle client {}",
                            addr
                        );
                        client.kick.notify_one();
                    }
                }
            }

            ctx.cooldown.prune();
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get live session count.
    pub async fn session_count(&self) -> usize {
        self.ctx.engine.session_count().await
    }

    /// The engine behind this server.
    pub fn engine(&self) -> &Arc<DuelEngine> {
        &self.ctx.engine
    }
}

impl ServerContext {
    /// Handle one client message. Returns the direct reply, if any.
    async fn handle_client_message(
        &self,
        conn: &mut Connection,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        let identity = match (&conn.identity, msg.is_anonymous()) {
            (Some(identity), _) => Some(identity.clone()),
            (None, true) => None,
            (None, false) => {
                return Some(ServerMessage::error(
                    ErrorCode::NotIdentified,
                    "Identify first",
                ));
            }
        };

        if let Some(identity) = identity.as_ref().filter(|_| msg.is_rate_limited()) {
            if let Err(wait) = self.cooldown.check(&identity.user_id) {
                debug!(user_id = %identity.user_id, wait_ms = wait.as_millis() as u64, "Cooldown");
                return Some(ServerMessage::error(
                    ErrorCode::RateLimited,
                    format!("Slow down, try again in {} ms", wait.as_millis()),
                ));
            }
        }

        let result = match (msg, identity) {
            (ClientMessage::Identify(req), _) => Ok(self.identify(conn, req)),
            (ClientMessage::Ping { timestamp }, _) => Ok(pong(timestamp)),
            (_, None) => Ok(ServerMessage::error(ErrorCode::NotIdentified, "Identify first")),
            (ClientMessage::StartSolo, Some(me)) => {
                self.engine.start_solo(&me).await.map(ServerMessage::Event)
            }
            (ClientMessage::Guess { symbol }, Some(me)) => self
                .engine
                .guess(&me.user_id, &symbol)
                .await
                .map(ServerMessage::Event),
            (ClientMessage::Cancel, Some(me)) => {
                self.engine.cancel(&me.user_id).await.map(ServerMessage::Event)
            }
            (ClientMessage::IssueChallenge { opponent_id, channel }, Some(me)) => self
                .engine
                .issue_challenge(&me, &opponent_id, channel)
                .await
                .map(ServerMessage::Event),
            (ClientMessage::RespondChallenge { challenger_id, accept }, Some(me)) => self
                .engine
                .respond_challenge(&challenger_id, &me, accept)
                .await
                .map(ServerMessage::Event),
            (ClientMessage::Translate { text, direction }, Some(me)) => self
                .engine
                .translate(&me.user_id, &text, direction)
                .await
                .map(|text| ServerMessage::Translation { text }),
            (ClientMessage::Stats { user_id }, Some(me)) => self
                .engine
                .stats(user_id.as_ref().unwrap_or(&me.user_id))
                .map(ServerMessage::Stats),
            (ClientMessage::Leaderboard { limit }, Some(_)) => {
                let limit = limit
                    .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
                    .clamp(1, MAX_LEADERBOARD_LIMIT);
                self.engine
                    .leaderboard(limit)
                    .map(|entries| ServerMessage::Leaderboard { entries })
            }
            (ClientMessage::WatchResults, Some(_)) => {
                self.watch_results(conn);
                return None;
            }
        };

        Some(result.unwrap_or_else(|e| self.reject(conn, e)))
    }

    fn identify(&self, conn: &mut Connection, req: IdentifyRequest) -> ServerMessage {
        let username = req
            .username
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| req.user_id.to_string());
        let display_name = req
            .display_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| username.clone());
        let identity = Identity {
            user_id: req.user_id,
            username,
            display_name,
        };

        if let Some(previous) = conn.identity.take() {
            if previous.user_id != identity.user_id {
                self.registry.unregister(&previous.user_id, &conn.sender);
            }
        }
        self.registry
            .register(identity.user_id.clone(), conn.sender.clone());
        if let Err(e) = self.engine.refresh_identity(&identity) {
            error!(user_id = %identity.user_id, error = %e, "Identity refresh failed");
        }

        info!(user_id = %identity.user_id, addr = %conn.addr, "Client identified");
        let reply = ServerMessage::Identified {
            user_id: identity.user_id.clone(),
            server_version: self.config.version.clone(),
        };
        conn.identity = Some(identity);
        reply
    }

    fn watch_results(&self, conn: &mut Connection) {
        if conn.watcher.is_some() {
            return;
        }
        let mut results = self.registry.subscribe_results();
        let sender = conn.sender.clone();
        let addr = conn.addr;

        conn.watcher = Some(tokio::spawn(async move {
            loop {
                match results.recv().await {
                    Ok(post) => {
                        if sender.send(ServerMessage::Event(post.event)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Results watcher {} lagged", addr);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        debug!("Client {} watching results", addr);
    }

    fn reject(&self, conn: &Connection, err: EngineError) -> ServerMessage {
        match &err {
            EngineError::Stats(e) => error!(addr = %conn.addr, error = %e, "Stats query failed"),
            EngineError::OpponentUnavailable(_) => warn!(addr = %conn.addr, error = %err, "Rejected"),
            _ => debug!(addr = %conn.addr, error = %err, "Rejected"),
        }
        ServerMessage::Error(ServerError::from(&err))
    }
}

impl Connection {
    /// Detach from the registry and stop the results feed.
    fn close(&mut self, registry: &ClientRegistry) {
        if let Some(identity) = self.identity.take() {
            registry.unregister(&identity.user_id, &self.sender);
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

fn pong(timestamp: u64) -> ServerMessage {
    ServerMessage::Pong {
        timestamp,
        server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::game::events::GameEvent;

    fn test_server(cooldown: Duration) -> GameServer {
        let config = ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cooldown,
            engine: EngineConfig {
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        GameServer::from_config(config).unwrap()
    }

    fn connection() -> (Connection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = Connection {
            addr: SocketAddr::from(([127, 0, 0, 1], 40000)),
            identity: None,
            sender: tx,
            watcher: None,
        };
        (conn, rx)
    }

    fn identify(user: &str) -> ClientMessage {
        ClientMessage::Identify(IdentifyRequest {
            user_id: user.into(),
            username: None,
            display_name: Some(format!("{user} the Brave")),
        })
    }

    fn error_code(msg: Option<ServerMessage>) -> Option<ErrorCode> {
        match msg {
            Some(ServerMessage::Error(e)) => Some(e.code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = test_server(Duration::ZERO);
        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = test_server(Duration::ZERO);
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_identify_required() {
        let server = test_server(Duration::ZERO);
        let (mut conn, _rx) = connection();

        let reply = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::StartSolo)
            .await;
        assert_eq!(error_code(reply), Some(ErrorCode::NotIdentified));

        let reply = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::Ping { timestamp: 9 })
            .await;
        assert!(matches!(reply, Some(ServerMessage::Pong { timestamp: 9, .. })));
    }

    #[tokio::test]
    async fn test_identify_registers_and_plays() {
        let server = test_server(Duration::ZERO);
        let (mut conn, _rx) = connection();

        let reply = server
            .ctx
            .handle_client_message(&mut conn, identify("alice"))
            .await;
        assert!(matches!(reply, Some(ServerMessage::Identified { .. })));
        assert!(server.ctx.registry.is_connected(&"alice".into()));
        assert_eq!(
            conn.identity.as_ref().map(|i| i.display_name.as_str()),
            Some("alice the Brave")
        );

        let reply = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::StartSolo)
            .await;
        assert!(matches!(
            reply,
            Some(ServerMessage::Event(GameEvent::GameStarted { .. }))
        ));

        let reply = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::StartSolo)
            .await;
        assert_eq!(error_code(reply), Some(ErrorCode::AlreadyActive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_rejects_rapid_repeats() {
        let server = test_server(Duration::from_secs(2));
        let (mut conn, _rx) = connection();
        server
            .ctx
            .handle_client_message(&mut conn, identify("alice"))
            .await;

        let first = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::Stats { user_id: None })
            .await;
        assert!(matches!(first, Some(ServerMessage::Stats(_))));

        let second = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::Stats { user_id: None })
            .await;
        assert_eq!(error_code(second), Some(ErrorCode::RateLimited));

        tokio::time::advance(Duration::from_secs(2)).await;
        let third = server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::Leaderboard { limit: None })
            .await;
        assert!(matches!(third, Some(ServerMessage::Leaderboard { .. })));
    }

    #[tokio::test]
    async fn test_challenge_routed_to_opponent_connection() {
        let server = test_server(Duration::ZERO);
        let (mut alice, _alice_rx) = connection();
        let (mut bob, mut bob_rx) = connection();
        server.ctx.handle_client_message(&mut alice, identify("alice")).await;
        server.ctx.handle_client_message(&mut bob, identify("bob")).await;

        let reply = server
            .ctx
            .handle_client_message(
                &mut alice,
                ClientMessage::IssueChallenge {
                    opponent_id: "bob".into(),
                    channel: None,
                },
            )
            .await;
        assert!(matches!(
            reply,
            Some(ServerMessage::Event(GameEvent::ChallengeIssued { .. }))
        ));
        assert!(matches!(
            bob_rx.recv().await,
            Some(ServerMessage::Event(GameEvent::ChallengeReceived { .. }))
        ));

        // challenging someone who never connected fails cleanly
        let (mut carol, _carol_rx) = connection();
        server.ctx.handle_client_message(&mut carol, identify("carol")).await;
        let reply = server
            .ctx
            .handle_client_message(
                &mut carol,
                ClientMessage::IssueChallenge {
                    opponent_id: "nobody".into(),
                    channel: None,
                },
            )
            .await;
        assert_eq!(error_code(reply), Some(ErrorCode::OpponentUnavailable));
    }

    #[tokio::test]
    async fn test_close_unregisters() {
        let server = test_server(Duration::ZERO);
        let (mut conn, _rx) = connection();
        server.ctx.handle_client_message(&mut conn, identify("alice")).await;
        server
            .ctx
            .handle_client_message(&mut conn, ClientMessage::WatchResults)
            .await;
        assert!(conn.watcher.is_some());

        conn.close(&server.ctx.registry);
        assert!(!server.ctx.registry.is_connected(&"alice".into()));
        assert!(conn.watcher.is_none());
    }
}
