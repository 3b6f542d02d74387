//! Engine state and the main loop.

use crate::config::Config;
use crate::error::EngineError;
use crate::orchestrator::{Orchestrator, SubsystemHealth, TickContext};
use crate::stores::{FoodStore, ObstacleStore, PowerUpStore};
use crate::systems::default_systems;
use crate::unix_now_ms;
use crate::world::WorldState;
use protocol::messages::{
    FoodView, LeaderboardEntry, MetricsReport, ObstacleView, PlayerCounts, PlayerView,
    PowerUpView, Snapshot, SubsystemMetrics,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info};

/// Engine shared between the game loop, the gateway and the ops endpoint.
pub type SharedEngine = Arc<RwLock<Engine>>;

/// The authoritative simulation for one world instance.
pub struct Engine {
    pub config: Config,
    pub world: WorldState,
    pub food: FoodStore,
    pub power_ups: PowerUpStore,
    pub obstacles: ObstacleStore,
    orchestrator: Orchestrator,
    pub tick_count: u64,
}

impl Engine {
    /// Build the engine and generate the obstacle map. Fails fast on an
    /// invalid obstacle template.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let world_size = config.world.size;
        let world = WorldState::new(world_size, config.world.room.clone());
        let food = FoodStore::new(world_size);
        let power_ups = PowerUpStore::new(world_size);
        let mut obstacles = ObstacleStore::new(world_size);
        obstacles.generate(&config.obstacle, unix_now_ms())?;

        Ok(Self {
            orchestrator: Orchestrator::new(default_systems(world_size)),
            config,
            world,
            food,
            power_ups,
            obstacles,
            tick_count: 0,
        })
    }

    /// Run a single tick across all subsystems.
    pub fn tick(&mut self, now: u64) {
        let dt = self.config.tick_interval_ms() as f32 / 1_000.0;
        let mut ctx = TickContext {
            world: &mut self.world,
            food: &mut self.food,
            power_ups: &mut self.power_ups,
            obstacles: &mut self.obstacles,
            config: &self.config,
            now,
            dt,
            consumptions: Vec::new(),
        };
        self.orchestrator.run_tick(&mut ctx);
        self.tick_count += 1;

        if self.tick_count % 400 == 0 {
            let (humans, ai) = self.world.owner_counts();
            debug!(
                tick = self.tick_count,
                blobs = self.world.players().len(),
                humans,
                ai,
                food = self.food.len(),
                power_ups = self.power_ups.len(),
                "Tick stats"
            );
        }
    }

    /// Periodic health sweep (observability only).
    pub fn health_report(&mut self, now: u64) {
        self.orchestrator.health_report(now);
    }

    pub fn health(&self) -> &HashMap<&'static str, SubsystemHealth> {
        self.orchestrator.health()
    }

    /// Build the per-tick snapshot broadcast.
    pub fn snapshot(&self, now: u64) -> Snapshot {
        let players = self
            .world
            .players()
            .values()
            .map(|p| PlayerView {
                id: p.id.to_string(),
                owner: p.owner.to_string(),
                name: p.name.clone(),
                x: p.position.x,
                y: p.position.y,
                radius: p.effective_radius(),
                mass: p.mass,
                color: p.color,
                is_ai: p.is_ai,
                score: p.score,
                effects: p
                    .active_effects
                    .iter()
                    .map(|e| e.kind.name().to_string())
                    .collect(),
            })
            .collect();

        let food = self
            .food
            .get_all()
            .map(|f| FoodView {
                id: f.id.to_string(),
                x: f.position.x,
                y: f.position.y,
                radius: f.radius(),
                kind: f.kind.name().to_string(),
                color: f.color,
            })
            .collect();

        let power_ups = self
            .power_ups
            .get_all()
            .map(|p| PowerUpView {
                id: p.id.to_string(),
                x: p.position.x,
                y: p.position.y,
                radius: p.radius(),
                kind: p.kind.name().to_string(),
            })
            .collect();

        let leaderboard = self
            .world
            .leaderboard(10)
            .into_iter()
            .map(|(name, score)| LeaderboardEntry { name, score })
            .collect();

        Snapshot {
            players,
            food,
            power_ups,
            leaderboard,
            timestamp: now,
        }
    }

    /// Obstacles are static; clients get them once at join.
    pub fn obstacle_views(&self) -> Vec<ObstacleView> {
        self.obstacles
            .get_all()
            .map(|o| ObstacleView {
                id: o.id.to_string(),
                kind: o.kind.name().to_string(),
                x: o.position.x,
                y: o.position.y,
                width: o.width,
                height: o.height,
                rotation: o.rotation,
                health: o.health,
            })
            .collect()
    }

    /// The aggregate report polled by ops tooling.
    pub fn metrics_report(&self) -> MetricsReport {
        let mut health = std::collections::BTreeMap::new();
        let mut metrics = std::collections::BTreeMap::new();
        for (name, entry) in self.orchestrator.health() {
            health.insert(name.to_string(), entry.healthy);
            metrics.insert(
                name.to_string(),
                SubsystemMetrics {
                    update_time: entry.last_duration.as_secs_f64() * 1_000.0,
                    error_count: entry.error_count,
                    last_update: entry.last_update,
                },
            );
        }
        let (humans, ai) = self.world.owner_counts();
        MetricsReport {
            health,
            metrics,
            player_counts: PlayerCounts {
                humans,
                ai,
                total: humans + ai,
            },
        }
    }
}

/// Drive the engine at the configured tick rate, broadcasting a snapshot
/// after every tick.
pub async fn run_game_loop(
    state: SharedEngine,
    world_tx: broadcast::Sender<Snapshot>,
    tick_interval_ms: u64,
) {
    let start = Instant::now() + Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(start, Duration::from_millis(tick_interval_ms));
    // Skip missed ticks instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Game loop started ({}ms tick)", tick_interval_ms);

    loop {
        ticker.tick().await;

        // Hibernate while no humans are connected to save CPU.
        {
            let engine = state.read().await;
            let (humans, _) = engine.world.owner_counts();
            if humans == 0 && engine.tick_count > 0 {
                drop(engine);
                sleep(Duration::from_millis((tick_interval_ms * 4).max(100))).await;
                continue;
            }
        }

        let now = unix_now_ms();
        let mut engine = state.write().await;
        // Last-resort boundary: a panic escaping every subsystem boundary is
        // an orchestrator bug. Log it as critical and keep the process up;
        // the broadcast for this tick is simply skipped.
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            engine.tick(now);
            engine.snapshot(now)
        }));
        drop(engine);

        match outcome {
            Ok(snapshot) => {
                let _ = world_tx.send(snapshot);
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    reason = %reason,
                    "CRITICAL: tick panicked outside all subsystem boundaries"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_ticks_and_snapshots() {
        let mut config = Config::default();
        config.world.min_players = 2;
        let mut engine = Engine::new(config).unwrap();

        let mut now = unix_now_ms();
        for _ in 0..5 {
            now += 500;
            engine.tick(now);
        }

        let snapshot = engine.snapshot(now);
        // AI backfill means the snapshot is already populated.
        assert!(!snapshot.players.is_empty());
        assert!(!snapshot.food.is_empty());
        assert_eq!(snapshot.timestamp, now);
        assert!(!engine.obstacle_views().is_empty());
    }

    #[test]
    fn metrics_report_covers_every_subsystem() {
        let engine = Engine::new(Config::default()).unwrap();
        let report = engine.metrics_report();
        for name in ["game_state", "food", "power_up", "ai", "collision", "combo"] {
            assert!(report.health.contains_key(name), "missing {name}");
            assert!(report.metrics.contains_key(name), "missing {name}");
        }
    }
}
