//! Network gateway: WebSocket intents in, snapshots out.
//!
//! The gateway never mutates simulation state directly. Join/leave are
//! lifecycle operations applied under the engine lock; movement, split and
//! eject intents are queued on the world and drained at the next tick
//! boundary.

pub mod game;

pub use game::{Engine, SharedEngine, run_game_loop};

use crate::config::Config;
use crate::entity::EntityId;
use crate::metrics;
use crate::unix_now_ms;
use futures_util::{SinkExt, StreamExt};
use protocol::messages::{ClientIntent, ServerMessage, Snapshot};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

/// Longest accepted player name.
const MAX_NAME_LEN: usize = 24;

/// Connection tracking state shared across connection handlers.
struct ConnectionState {
    ip_connections: HashMap<IpAddr, usize>,
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }
        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the game server: engine, game loop, ops endpoint, ws gateway.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = Engine::new(config.clone())?;
    let state: SharedEngine = Arc::new(RwLock::new(engine));

    let (world_tx, _world_rx) = broadcast::channel::<Snapshot>(8);

    // Game loop.
    tokio::spawn(run_game_loop(
        state.clone(),
        world_tx.clone(),
        config.tick_interval_ms(),
    ));

    // Ops endpoint.
    let ops_addr: SocketAddr =
        format!("{}:{}", config.server.bind, config.server.ops_port).parse()?;
    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(state, ops_addr).await {
                error!("Ops endpoint failed: {e}");
            }
        });
    }

    // Periodic health check, independent of the tick loop.
    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            ticker.tick().await; // skip the immediate first fire
            loop {
                ticker.tick().await;
                state.write().await.health_report(unix_now_ms());
            }
        });
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut conns = conn_state.write().await;
            if !conns.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let state = state.clone();
        let conn_state = conn_state.clone();
        let world_rx = world_tx.subscribe();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, state, world_rx).await;
            {
                let mut conns = conn_state.write().await;
                conns.remove_connection(addr.ip());
            }
            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedEngine,
    mut world_rx: broadcast::Receiver<Snapshot>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let mut player_id: Option<EntityId> = None;
    let mut last_score: u64 = 0;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(frame))) => {
                        let intent = match ClientIntent::decode(frame.as_str()) {
                            Ok(intent) => intent,
                            Err(e) => {
                                warn!("Bad frame from {}: {}", addr, e);
                                let reply = ServerMessage::Error {
                                    message: e.to_string(),
                                };
                                send_message(&mut write, &reply).await?;
                                continue;
                            }
                        };
                        if let Some(reply) =
                            handle_intent(&state, &mut player_id, intent).await
                        {
                            send_message(&mut write, &reply).await?;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
            snapshot = world_rx.recv() => {
                let Ok(snapshot) = snapshot else {
                    // Lagged receivers just pick up the next snapshot.
                    continue;
                };
                let Some(id) = &player_id else {
                    continue;
                };

                let owner = id.to_string();
                let score: u64 = snapshot
                    .players
                    .iter()
                    .filter(|p| p.owner == owner)
                    .map(|p| p.score)
                    .sum();
                let alive = snapshot.players.iter().any(|p| p.owner == owner);

                if alive {
                    last_score = score;
                    send_message(&mut write, &ServerMessage::Snapshot(snapshot)).await?;
                } else {
                    send_message(&mut write, &ServerMessage::Dead { score: last_score }).await?;
                    player_id = None;
                }
            }
        }
    }

    // Remove the player and all of its state on disconnect.
    if let Some(id) = player_id {
        let mut engine = state.write().await;
        engine.world.remove_player(&id);
    }

    Ok(())
}

/// Apply one decoded intent. Join is immediate; everything else is queued
/// for the next tick.
async fn handle_intent(
    state: &SharedEngine,
    player_id: &mut Option<EntityId>,
    intent: ClientIntent,
) -> Option<ServerMessage> {
    match intent {
        ClientIntent::Join { name } => {
            if player_id.is_some() {
                return None;
            }
            let mut engine = state.write().await;

            let (humans, _) = engine.world.owner_counts();
            if humans >= engine.config.world.max_players {
                return Some(ServerMessage::Error {
                    message: "Server is full".to_string(),
                });
            }

            let name: String = name.chars().take(MAX_NAME_LEN).collect();
            let name = if name.trim().is_empty() {
                "An unnamed blob".to_string()
            } else {
                name
            };
            let player_cfg = engine.config.player.clone();
            let id = engine.world.add_player(name, false, &player_cfg, unix_now_ms());
            *player_id = Some(id.clone());

            Some(ServerMessage::Welcome {
                player_id: id.to_string(),
                world_size: engine.world.size,
                room: engine.world.room.clone(),
                obstacles: engine.obstacle_views(),
            })
        }
        other => {
            if let Some(id) = player_id {
                let mut engine = state.write().await;
                engine.world.queue_intent(id.clone(), other);
            }
            None
        }
    }
}

async fn send_message<S>(write: &mut S, message: &ServerMessage) -> anyhow::Result<()>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(message)?;
    write.send(Message::Text(json.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_limits_are_enforced() {
        let mut conns = ConnectionState::new();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(conns.try_add_connection(ip, 2, 2));
        assert!(conns.try_add_connection(ip, 2, 2));
        // Total cap reached.
        assert!(!conns.try_add_connection(ip, 2, 2));

        conns.remove_connection(ip);
        assert!(conns.try_add_connection(ip, 2, 2));
    }

    #[test]
    fn per_ip_limit_is_enforced() {
        let mut conns = ConnectionState::new();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(conns.try_add_connection(a, 10, 1));
        assert!(!conns.try_add_connection(a, 10, 1));
        // A different IP still fits.
        assert!(conns.try_add_connection(b, 10, 1));
    }
}
