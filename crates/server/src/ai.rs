//! AI backfill.
//!
//! Keeps the world populated up to `min_players`. Steering stays simple:
//! chase the nearest pellet in range, wander otherwise.

use crate::config::Config;
use crate::entity::EntityId;
use crate::stores::FoodStore;
use crate::world::WorldState;
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info};

const BOT_NAMES: [&str; 8] = [
    "Wobble", "Gulp", "Nibbles", "Squish", "Bloop", "Chomper", "Drift", "Morsel",
];

/// Owns the AI player roster and its steering state.
pub struct AiManager {
    bots: Vec<EntityId>,
    /// Per-bot timestamp of the last wander direction change.
    last_wander: HashMap<EntityId, u64>,
    spawned_total: usize,
}

impl AiManager {
    pub fn new() -> Self {
        Self {
            bots: Vec::new(),
            last_wander: HashMap::new(),
            spawned_total: 0,
        }
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    /// Reset internal steering state (recovery path). The bots themselves
    /// stay in the world; backfill re-adopts them on the next update.
    pub fn reset(&mut self) {
        self.last_wander.clear();
    }

    /// Per-tick update: adjust the roster toward `min_players`, then steer.
    pub fn update(&mut self, world: &mut WorldState, food: &FoodStore, config: &Config, now: u64) {
        self.bots.retain(|id| world.get(id).is_some());

        let (humans, _) = world.owner_counts();
        let min = config.world.min_players;

        // Backfill with bots when the room is short of players.
        while humans + self.bots.len() < min {
            let name = BOT_NAMES[self.spawned_total % BOT_NAMES.len()].to_string();
            let id = world.add_player(name, true, &config.player, now);
            self.spawned_total += 1;
            self.bots.push(id);
        }

        // Drop surplus bots as humans fill the room back up.
        while humans + self.bots.len() > min && !self.bots.is_empty() {
            if let Some(id) = self.bots.pop() {
                world.remove_player(&id);
                self.last_wander.remove(&id);
                info!(bot = %id, "AI player retired");
            }
        }

        for id in self.bots.clone() {
            self.steer(&id, world, food, config, now);
        }
    }

    /// Nearest-pellet chase with a timed wander fallback.
    fn steer(
        &mut self,
        id: &EntityId,
        world: &mut WorldState,
        food: &FoodStore,
        config: &Config,
        now: u64,
    ) {
        let Some(position) = world.get(id).map(|b| b.position) else {
            return;
        };

        let nearest = food
            .grid()
            .query_neighbors(position.x, position.y, config.ai.chase_range)
            .into_iter()
            .filter_map(|fid| food.get(&fid).map(|f| f.position))
            .min_by(|a, b| {
                a.distance_squared(position)
                    .total_cmp(&b.distance_squared(position))
            });

        let speed = config.player.base_speed;
        if let Some(target) = nearest {
            if let Some(blob) = world.get_mut(id) {
                let dir = (target - position).try_normalize().unwrap_or(Vec2::X);
                blob.velocity = dir * speed;
            }
            self.last_wander.remove(id);
            return;
        }

        let stale = self
            .last_wander
            .get(id)
            .is_none_or(|&t| now.saturating_sub(t) >= config.ai.wander_interval_ms);
        if stale {
            let mut rng = rand::rng();
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            if let Some(blob) = world.get_mut(id) {
                blob.velocity = Vec2::new(angle.cos(), angle.sin()) * speed;
            }
            self.last_wander.insert(id.clone(), now);
            debug!(bot = %id, "Bot wandering");
        }
    }
}

impl Default for AiManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Food, FoodKind};

    fn fixture() -> (AiManager, WorldState, FoodStore, Config) {
        let config = Config::default();
        (
            AiManager::new(),
            WorldState::new(config.world.size, config.world.room.clone()),
            FoodStore::new(config.world.size),
            config,
        )
    }

    #[test]
    fn backfills_to_min_players() {
        let (mut ai, mut world, food, config) = fixture();
        ai.update(&mut world, &food, &config, 1_000);
        assert_eq!(ai.bot_count(), config.world.min_players);
        let (humans, bots) = world.owner_counts();
        assert_eq!(humans, 0);
        assert_eq!(bots, config.world.min_players);
    }

    #[test]
    fn retires_bots_as_humans_join() {
        let (mut ai, mut world, food, config) = fixture();
        ai.update(&mut world, &food, &config, 1_000);
        assert_eq!(ai.bot_count(), config.world.min_players);

        for i in 0..config.world.min_players {
            world.add_player(format!("human-{i}"), false, &config.player, 2_000);
        }
        ai.update(&mut world, &food, &config, 3_000);
        assert_eq!(ai.bot_count(), 0);
        let (humans, bots) = world.owner_counts();
        assert_eq!(humans, config.world.min_players);
        assert_eq!(bots, 0);
    }

    #[test]
    fn bots_chase_nearby_food() {
        let (mut ai, mut world, mut food, config) = fixture();
        ai.update(&mut world, &food, &config, 1_000);
        let bot = ai.bots[0].clone();
        let bot_pos = world.get(&bot).unwrap().position;

        let pellet = Food::new(FoodKind::Normal, bot_pos + Vec2::new(80.0, 0.0), 0);
        food.insert_ejected(pellet);

        ai.update(&mut world, &food, &config, 2_000);
        let velocity = world.get(&bot).unwrap().velocity;
        assert!(velocity.x > 0.0, "bot should move toward the pellet");
        assert!((velocity.length() - config.player.base_speed).abs() < 1e-3);
    }

    #[test]
    fn bots_wander_without_food() {
        let (mut ai, mut world, food, config) = fixture();
        ai.update(&mut world, &food, &config, 1_000);
        let bot = ai.bots[0].clone();
        assert!(world.get(&bot).unwrap().velocity.length() > 0.0);
    }
}
