//! Collision detection.
//!
//! Rebuilds the player grid each tick, queries neighboring cells for
//! candidates and confirms with exact circle-circle overlap. Produces typed
//! events; the effect engine applies the outcomes.

use crate::config::PlayerConfig;
use crate::entity::{EntityId, Player};
use crate::spatial::{CELL_SIZE, SpatialGrid};
use crate::stores::{FoodStore, ObstacleStore, PowerUpStore};
use glam::Vec2;
use std::collections::HashMap;

/// The larger blob consumes the smaller only when
/// `smaller.radius × 1.25 ≤ larger.radius`.
pub const CONSUME_RATIO: f32 = 1.25;

/// One detected interaction for this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionEvent {
    PlayerFood {
        player: EntityId,
        food: EntityId,
    },
    PlayerPowerUp {
        player: EntityId,
        power_up: EntityId,
    },
    PlayerObstacle {
        player: EntityId,
        obstacle: EntityId,
    },
    PlayerPlayer {
        larger: EntityId,
        smaller: EntityId,
        /// Whether the larger one consumes the smaller; bounce otherwise.
        consumed: bool,
    },
}

/// Exact circle-circle overlap test.
#[inline]
pub fn circles_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    a_pos.distance_squared(b_pos) < (a_radius + b_radius) * (a_radius + b_radius)
}

/// Consumption rule. Equal radii never consume; the exact ratio boundary does.
#[inline]
pub fn can_consume(larger_radius: f32, smaller_radius: f32) -> bool {
    smaller_radius * CONSUME_RATIO <= larger_radius
}

/// Grid-accelerated collision detection over the current player set and the
/// per-kind entity stores.
pub struct CollisionEngine {
    player_grid: SpatialGrid<EntityId>,
    max_player_radius: f32,
}

impl CollisionEngine {
    pub fn new(world_size: f32) -> Self {
        Self {
            player_grid: SpatialGrid::new(world_size),
            max_player_radius: 0.0,
        }
    }

    /// Drop transient per-tick state.
    pub fn reset(&mut self) {
        self.player_grid.clear();
        self.max_player_radius = 0.0;
    }

    /// Detect all interactions for this tick.
    pub fn check(
        &mut self,
        players: &HashMap<EntityId, Player>,
        food: &FoodStore,
        power_ups: &PowerUpStore,
        obstacles: &ObstacleStore,
        cfg: &PlayerConfig,
        now: u64,
    ) -> Vec<CollisionEvent> {
        self.rebuild(players);

        let mut events = Vec::new();
        for player in players.values() {
            let radius = player.effective_radius();
            let pos = player.position;

            for id in food.grid().query_neighbors(pos.x, pos.y, radius + CELL_SIZE) {
                if let Some(pellet) = food.get(&id) {
                    if circles_overlap(pos, radius, pellet.position, pellet.radius()) {
                        events.push(CollisionEvent::PlayerFood {
                            player: player.id.clone(),
                            food: id,
                        });
                    }
                }
            }

            for id in power_ups
                .grid()
                .query_neighbors(pos.x, pos.y, radius + CELL_SIZE)
            {
                if let Some(power_up) = power_ups.get(&id) {
                    if circles_overlap(pos, radius, power_up.position, power_up.radius()) {
                        events.push(CollisionEvent::PlayerPowerUp {
                            player: player.id.clone(),
                            power_up: id,
                        });
                    }
                }
            }

            let obstacle_reach = radius + obstacles.max_radius().max(CELL_SIZE);
            for id in obstacles.grid().query_neighbors(pos.x, pos.y, obstacle_reach) {
                if let Some(obstacle) = obstacles.get(&id) {
                    if circles_overlap(pos, radius, obstacle.position, obstacle.radius()) {
                        events.push(CollisionEvent::PlayerObstacle {
                            player: player.id.clone(),
                            obstacle: id,
                        });
                    }
                }
            }

            let player_reach = radius + self.max_player_radius.max(CELL_SIZE);
            for other_id in self
                .player_grid
                .query_neighbors(pos.x, pos.y, player_reach)
            {
                // Each mutually-near pair is visited twice; keep one ordering.
                if other_id <= player.id {
                    continue;
                }
                let Some(other) = players.get(&other_id) else {
                    continue;
                };
                if let Some(event) = resolve_player_pair(player, other, cfg, now) {
                    events.push(event);
                }
            }
        }

        events
    }

    fn rebuild(&mut self, players: &HashMap<EntityId, Player>) {
        self.player_grid.clear();
        self.max_player_radius = 0.0;
        for player in players.values() {
            self.max_player_radius = self.max_player_radius.max(player.effective_radius());
            self.player_grid
                .insert(player.id.clone(), player.position.x, player.position.y);
        }
    }
}

/// Resolve a confirmed-near player pair into an event, if any.
fn resolve_player_pair(
    a: &Player,
    b: &Player,
    cfg: &PlayerConfig,
    now: u64,
) -> Option<CollisionEvent> {
    if !circles_overlap(
        a.position,
        a.effective_radius(),
        b.position,
        b.effective_radius(),
    ) {
        return None;
    }
    // Ghosts pass through other players entirely.
    if a.is_ghost() || b.is_ghost() {
        return None;
    }
    // Fresh blobs are collision-immune.
    if a.is_immune(now, cfg.spawn_grace_ms) || b.is_immune(now, cfg.spawn_grace_ms) {
        return None;
    }

    let (larger, smaller) = if a.effective_radius() >= b.effective_radius() {
        (a, b)
    } else {
        (b, a)
    };

    let consumed = can_consume(larger.effective_radius(), smaller.effective_radius())
        && !smaller.is_shielded()
        && larger.owner != smaller.owner;

    Some(CollisionEvent::PlayerPlayer {
        larger: larger.id.clone(),
        smaller: smaller.id.clone(),
        consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::mass_to_radius;

    fn blob(raw_id: &str, x: f32, y: f32, mass: f32, spawned_at: u64) -> Player {
        let id = EntityId::from_raw(raw_id);
        Player::new(
            id.clone(),
            id,
            raw_id.to_string(),
            "arena".to_string(),
            Vec2::new(x, y),
            mass,
            false,
            spawned_at,
        )
    }

    fn player_config() -> PlayerConfig {
        PlayerConfig::default()
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            (Vec2::new(0.0, 0.0), 50.0, Vec2::new(30.0, 0.0), 20.0),
            (Vec2::new(0.0, 0.0), 10.0, Vec2::new(100.0, 0.0), 10.0),
            (Vec2::new(5.0, 5.0), 1.0, Vec2::new(5.0, 7.0), 1.0),
        ];
        for (a_pos, a_r, b_pos, b_r) in cases {
            assert_eq!(
                circles_overlap(a_pos, a_r, b_pos, b_r),
                circles_overlap(b_pos, b_r, a_pos, a_r),
            );
        }
    }

    #[test]
    fn consumption_boundary_is_exact() {
        // Exactly at the ratio: consumes.
        assert!(can_consume(125.0, 100.0));
        // Just under the ratio: bounce.
        assert!(!can_consume(124.9, 100.0));
        // Equal radii never consume.
        assert!(!can_consume(100.0, 100.0));
    }

    #[test]
    fn grid_filtered_pair_detection() {
        let cfg = player_config();
        let mut players = HashMap::new();
        // Large enough that radii overlap and the ratio is met.
        let big = blob("a", 500.0, 500.0, 200.0, 0);
        let small = blob("b", 500.0 + big.radius, 500.0, 10.0, 0);
        let far = blob("c", 3_000.0, 3_000.0, 10.0, 0);
        players.insert(big.id.clone(), big);
        players.insert(small.id.clone(), small);
        players.insert(far.id.clone(), far);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &FoodStore::new(4_000.0),
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            cfg.spawn_grace_ms + 1,
        );

        assert_eq!(events.len(), 1);
        match &events[0] {
            CollisionEvent::PlayerPlayer {
                larger,
                smaller,
                consumed,
            } => {
                assert_eq!(larger.as_str(), "a");
                assert_eq!(smaller.as_str(), "b");
                assert!(consumed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn fresh_blobs_are_immune() {
        let cfg = player_config();
        let mut players = HashMap::new();
        let big = blob("a", 500.0, 500.0, 200.0, 0);
        // Spawned just now: still inside the grace window at `now`.
        let fresh = blob("b", 510.0, 500.0, 10.0, 900);
        players.insert(big.id.clone(), big);
        players.insert(fresh.id.clone(), fresh);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &FoodStore::new(4_000.0),
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            1_000,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn shielded_blobs_bounce_instead_of_being_consumed() {
        let cfg = player_config();
        let mut players = HashMap::new();
        let big = blob("a", 500.0, 500.0, 200.0, 0);
        let mut small = blob("b", 510.0, 500.0, 10.0, 0);
        small.shield_stacks = 1;
        players.insert(big.id.clone(), big);
        players.insert(small.id.clone(), small);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &FoodStore::new(4_000.0),
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            cfg.spawn_grace_ms + 1,
        );
        assert!(matches!(
            events[0],
            CollisionEvent::PlayerPlayer {
                consumed: false,
                ..
            }
        ));
    }

    #[test]
    fn ghosts_pass_through_players() {
        let cfg = player_config();
        let mut players = HashMap::new();
        let big = blob("a", 500.0, 500.0, 200.0, 0);
        let mut small = blob("b", 510.0, 500.0, 10.0, 0);
        small.ghost_stacks = 1;
        players.insert(big.id.clone(), big);
        players.insert(small.id.clone(), small);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &FoodStore::new(4_000.0),
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            cfg.spawn_grace_ms + 1,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn same_owner_blobs_never_consume() {
        let cfg = player_config();
        let mut players = HashMap::new();
        let big = blob("a", 500.0, 500.0, 200.0, 0);
        let mut sibling = blob("a-2", 510.0, 500.0, 10.0, 0);
        sibling.owner = EntityId::from_raw("a");
        players.insert(big.id.clone(), big);
        players.insert(sibling.id.clone(), sibling);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &FoodStore::new(4_000.0),
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            cfg.spawn_grace_ms + 1,
        );
        assert!(matches!(
            events[0],
            CollisionEvent::PlayerPlayer {
                consumed: false,
                ..
            }
        ));
    }

    #[test]
    fn player_food_event_confirmed_by_overlap() {
        let cfg = player_config();
        let mut players = HashMap::new();
        let eater = blob("a", 500.0, 500.0, 50.0, 0);
        players.insert(eater.id.clone(), eater);

        let mut food = FoodStore::new(4_000.0);
        let near = crate::entity::Food::new(
            crate::entity::FoodKind::Normal,
            Vec2::new(500.0 + mass_to_radius(50.0), 500.0),
            0,
        );
        food.insert_ejected(near);

        let mut engine = CollisionEngine::new(4_000.0);
        let events = engine.check(
            &players,
            &food,
            &PowerUpStore::new(4_000.0),
            &ObstacleStore::new(4_000.0),
            &cfg,
            cfg.spawn_grace_ms + 1,
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, CollisionEvent::PlayerFood { .. })));
    }
}
