//! Effect application: turns the tick's collision events into state changes.

pub mod obstacle;
pub mod power_up;

use crate::collision::CollisionEvent;
use crate::config::Config;
use crate::entity::{EntityId, ObstacleKind};
use crate::stores::{FoodStore, ObstacleStore, PowerUpStore};
use crate::world::WorldState;
use std::collections::HashMap;
use tracing::debug;

/// A consumption that happened this tick, for combo tracking.
#[derive(Debug, Clone)]
pub struct Consumption {
    /// Owner id of the consuming player.
    pub eater: EntityId,
    /// Base points awarded before combo bonuses.
    pub points: u64,
}

/// Applies collision outcomes and expires effects. Holds the per-teleporter
/// cooldown map, which is independent of the power-up stacking system.
pub struct EffectEngine {
    teleport_ready_at: HashMap<EntityId, u64>,
}

impl EffectEngine {
    pub fn new() -> Self {
        Self {
            teleport_ready_at: HashMap::new(),
        }
    }

    /// Drop transient state (recovery path).
    pub fn reset(&mut self) {
        self.teleport_ready_at.clear();
    }

    /// Apply all events for this tick. Events referring to entities already
    /// removed by an earlier event in the same batch are skipped.
    pub fn apply(
        &mut self,
        events: Vec<CollisionEvent>,
        world: &mut WorldState,
        food: &mut FoodStore,
        power_ups: &mut PowerUpStore,
        obstacles: &mut ObstacleStore,
        config: &Config,
        now: u64,
    ) -> Vec<Consumption> {
        let mut consumptions = Vec::new();

        for event in events {
            match event {
                CollisionEvent::PlayerFood { player, food: id } => {
                    let Some(pellet) = food.remove(&id) else {
                        continue;
                    };
                    let Some(blob) = world.get_mut(&player) else {
                        continue;
                    };
                    blob.grow(pellet.mass_gain());
                    blob.award_points(pellet.kind.points());
                    consumptions.push(Consumption {
                        eater: blob.owner.clone(),
                        points: pellet.kind.points(),
                    });
                }

                CollisionEvent::PlayerPowerUp { player, power_up } => {
                    let Some(kind) = power_ups.get(&power_up).map(|p| p.kind) else {
                        continue;
                    };
                    let Some(blob) = world.get_mut(&player) else {
                        continue;
                    };
                    // A rejected collection leaves the power-up in the
                    // world for someone else.
                    if power_up::try_collect(blob, kind, now) {
                        power_ups.remove(&power_up);
                        debug!(player = %player, kind = kind.name(), "Power-up collected");
                    }
                }

                CollisionEvent::PlayerObstacle { player, obstacle } => {
                    self.resolve_obstacle(&player, &obstacle, world, obstacles, config, now);
                }

                CollisionEvent::PlayerPlayer {
                    larger,
                    smaller,
                    consumed,
                } => {
                    if consumed {
                        let Some(prey_mass) = world.get(&smaller).map(|p| p.mass) else {
                            continue;
                        };
                        if world.get(&larger).is_none() {
                            continue;
                        }
                        let prey_points = prey_mass.round() as u64;
                        world.remove_blob(&smaller);
                        if let Some(blob) = world.get_mut(&larger) {
                            blob.grow(prey_mass);
                            blob.award_points(prey_points);
                            consumptions.push(Consumption {
                                eater: blob.owner.clone(),
                                points: prey_points,
                            });
                        }
                        debug!(eater = %larger, eaten = %smaller, "Blob consumed");
                    } else {
                        self.bounce_pair(&larger, &smaller, world, config);
                    }
                }
            }
        }

        consumptions
    }

    /// Expire power-up effects across all players, reverting each exactly
    /// once.
    pub fn expire_effects(&mut self, world: &mut WorldState, now: u64) -> usize {
        let mut expired = 0;
        for blob in world.players_mut().values_mut() {
            expired += power_up::expire(blob, now);
        }
        expired
    }

    fn resolve_obstacle(
        &mut self,
        player: &EntityId,
        obstacle_id: &EntityId,
        world: &mut WorldState,
        obstacles: &mut ObstacleStore,
        config: &Config,
        now: u64,
    ) {
        let Some(kind) = obstacles.get(obstacle_id).map(|o| o.kind) else {
            return;
        };

        match kind {
            ObstacleKind::Wall | ObstacleKind::Spike | ObstacleKind::Breakable => {
                let Some(obstacle) = obstacles.get(obstacle_id) else {
                    return;
                };
                let Some(blob) = world.get_mut(player) else {
                    return;
                };
                let damage =
                    obstacle::solid_contact(blob, obstacle, config.player.min_mass);
                if damage > 0.0 {
                    obstacles.damage(obstacle_id, damage);
                }
            }

            ObstacleKind::Slime => {
                let Some(blob) = world.get_mut(player) else {
                    return;
                };
                // Fixed-duration slow, outside the power-up stacking rules.
                blob.slow_until = now + config.obstacle.slime_slow_ms;
                blob.slow_factor = config.obstacle.slime_slow_factor;
            }

            ObstacleKind::Teleporter => {
                self.teleport(player, obstacle_id, world, obstacles, config, now);
            }
        }
    }

    fn teleport(
        &mut self,
        player: &EntityId,
        teleporter_id: &EntityId,
        world: &mut WorldState,
        obstacles: &ObstacleStore,
        config: &Config,
        now: u64,
    ) {
        let ready_at = self
            .teleport_ready_at
            .get(teleporter_id)
            .copied()
            .unwrap_or(0);
        if now < ready_at {
            return;
        }

        let Some(link) = obstacles.get(teleporter_id).and_then(|t| t.linked_to.clone()) else {
            return;
        };
        let Some(destination) = obstacles.get(&link).map(|t| t.position) else {
            return;
        };
        let Some(blob) = world.get_mut(player) else {
            return;
        };

        blob.position = destination;
        // Both ends cool down, so the entity is not bounced straight back.
        let ready = now + config.obstacle.teleporter_cooldown_ms;
        self.teleport_ready_at.insert(teleporter_id.clone(), ready);
        self.teleport_ready_at.insert(link, ready);
        debug!(player = %player, teleporter = %teleporter_id, "Teleported");
    }

    fn bounce_pair(
        &self,
        a_id: &EntityId,
        b_id: &EntityId,
        world: &mut WorldState,
        config: &Config,
    ) {
        let Some(a_pos) = world.get(a_id).map(|p| p.position) else {
            return;
        };
        let Some(b_pos) = world.get(b_id).map(|p| p.position) else {
            return;
        };
        let force = config.player.bounce_force;
        let impulse = obstacle::bounce_impulse(b_pos, a_pos, force);
        if let Some(a) = world.get_mut(a_id) {
            a.velocity += impulse;
        }
        if let Some(b) = world.get_mut(b_id) {
            b.velocity -= impulse;
        }
    }
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
