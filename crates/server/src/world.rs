//! Authoritative world state: the player map, intent queue, movement
//! integration and split/eject mechanics.
//!
//! Network handlers never mutate player state directly; intents are queued
//! and drained at the next tick boundary, so the tick loop is the only
//! writer during simulation.

use crate::config::{Config, PlayerConfig};
use crate::effect::power_up as effects;
use crate::entity::{EntityId, Food, Player};
use crate::stores::FoodStore;
use glam::Vec2;
use protocol::messages::ClientIntent;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// An intent waiting for the next tick boundary.
#[derive(Debug, Clone)]
pub struct PendingIntent {
    pub owner: EntityId,
    pub intent: ClientIntent,
}

/// The game world for a single room instance.
pub struct WorldState {
    pub size: f32,
    pub room: String,
    players: HashMap<EntityId, Player>,
    intents: Vec<PendingIntent>,
}

impl WorldState {
    pub fn new(size: f32, room: String) -> Self {
        Self {
            size,
            room,
            players: HashMap::new(),
            intents: Vec::new(),
        }
    }

    /// Spawn a new player at a random position. Returns the owner id.
    pub fn add_player(&mut self, name: String, is_ai: bool, cfg: &PlayerConfig, now: u64) -> EntityId {
        let id = EntityId::generate(now);
        let mut rng = rand::rng();
        let margin = crate::entity::mass_to_radius(cfg.start_mass);
        let position = Vec2::new(
            rng.random_range(margin..self.size - margin),
            rng.random_range(margin..self.size - margin),
        );
        let player = Player::new(
            id.clone(),
            id.clone(),
            name,
            self.room.clone(),
            position,
            cfg.start_mass,
            is_ai,
            now,
        );
        info!(player = %id, ai = is_ai, "Player joined");
        self.players.insert(id.clone(), player);
        id
    }

    /// Remove one blob, reverting its active effects. Returns the blob.
    pub fn remove_blob(&mut self, id: &EntityId) -> Option<Player> {
        let mut player = self.players.remove(id)?;
        effects::clear_all(&mut player);
        Some(player)
    }

    /// Remove a player and every blob it owns, reverting all active effects
    /// so no state leaks. Returns the removed blobs.
    pub fn remove_player(&mut self, owner: &EntityId) -> Vec<Player> {
        let ids = self.blobs_of(owner);
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(blob) = self.remove_blob(&id) {
                removed.push(blob);
            }
        }
        self.intents.retain(|p| &p.owner != owner);
        if !removed.is_empty() {
            info!(player = %owner, blobs = removed.len(), "Player removed");
        }
        removed
    }

    /// Queue an intent for the next tick.
    pub fn queue_intent(&mut self, owner: EntityId, intent: ClientIntent) {
        self.intents.push(PendingIntent { owner, intent });
    }

    /// Drain and apply queued intents (tick-boundary command model;
    /// last-write-wins within a tick).
    pub fn apply_intents(&mut self, config: &Config, food: &mut FoodStore, now: u64) {
        let pending = std::mem::take(&mut self.intents);
        for PendingIntent { owner, intent } in pending {
            match intent {
                ClientIntent::Move { x, y, vx, vy } => self.apply_move(&owner, x, y, vx, vy),
                ClientIntent::Split => self.split(&owner, &config.player, now),
                ClientIntent::Eject => self.eject(&owner, &config.player, food, now),
                // Joins are lifecycle operations handled by the gateway.
                ClientIntent::Join { .. } => {}
            }
        }
    }

    /// Client-reported movement is trusted as-is: the primary blob takes the
    /// reported position, every blob takes the reported velocity.
    fn apply_move(&mut self, owner: &EntityId, x: f32, y: f32, vx: f32, vy: f32) {
        for id in self.blobs_of(owner) {
            if let Some(blob) = self.players.get_mut(&id) {
                if &blob.id == owner {
                    let r = blob.radius;
                    blob.position = Vec2::new(
                        x.clamp(r, self.size - r),
                        y.clamp(r, self.size - r),
                    );
                }
                blob.velocity = Vec2::new(vx, vy);
            }
        }
    }

    /// Split every eligible blob of a player in half.
    pub fn split(&mut self, owner: &EntityId, cfg: &PlayerConfig, now: u64) {
        let blob_ids = self.blobs_of(owner);
        let mut count = blob_ids.len();

        for id in blob_ids {
            if count >= cfg.max_blobs {
                break;
            }
            let Some(blob) = self.players.get_mut(&id) else {
                continue;
            };
            if blob.mass < cfg.min_split_mass
                || now.saturating_sub(blob.last_split) < cfg.split_cooldown_ms
            {
                continue;
            }

            let half = blob.mass / 2.0;
            blob.set_mass(half);
            blob.last_split = now;

            let dir = blob.velocity.try_normalize().unwrap_or(Vec2::X);
            let mut sibling = Player::new(
                EntityId::generate(now),
                owner.clone(),
                blob.name.clone(),
                blob.room.clone(),
                blob.position + dir * blob.radius * 2.0,
                half,
                blob.is_ai,
                now,
            );
            sibling.color = blob.color;
            sibling.velocity = dir * cfg.base_speed * 2.0;
            sibling.last_split = now;
            debug!(player = %owner, blob = %sibling.id, "Blob split");
            self.players.insert(sibling.id.clone(), sibling);
            count += 1;
        }
    }

    /// Eject a pellet of mass from every eligible blob of a player.
    pub fn eject(&mut self, owner: &EntityId, cfg: &PlayerConfig, food: &mut FoodStore, now: u64) {
        for id in self.blobs_of(owner) {
            let Some(blob) = self.players.get_mut(&id) else {
                continue;
            };
            if blob.mass < cfg.min_eject_mass
                || now.saturating_sub(blob.last_eject) < cfg.eject_cooldown_ms
            {
                continue;
            }

            blob.set_mass(blob.mass - cfg.eject_mass_cost);
            blob.last_eject = now;

            let dir = blob.velocity.try_normalize().unwrap_or(Vec2::X);
            let spawn_pos = blob.position + dir * (blob.radius + 15.0);
            let pellet = Food::ejected(spawn_pos, blob.color, now);
            food.insert_ejected(pellet);
        }
    }

    /// Integrate velocities into positions, clamped to the world border.
    pub fn integrate(&mut self, dt: f32, now: u64) {
        let size = self.size;
        for blob in self.players.values_mut() {
            let mult = blob.speed_multiplier(now);
            blob.position += blob.velocity * mult * dt;
            let r = blob.radius;
            blob.position.x = blob.position.x.clamp(r, size - r);
            blob.position.y = blob.position.y.clamp(r, size - r);
        }
    }

    pub fn players(&self) -> &HashMap<EntityId, Player> {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut HashMap<EntityId, Player> {
        &mut self.players
    }

    pub fn get(&self, id: &EntityId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Ids of all blobs owned by a player.
    pub fn blobs_of(&self, owner: &EntityId) -> Vec<EntityId> {
        self.players
            .values()
            .filter(|p| &p.owner == owner)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Blob positions and radii, for spawn-placement rejection.
    pub fn blob_shapes(&self) -> Vec<(Vec2, f32)> {
        self.players
            .values()
            .map(|p| (p.position, p.effective_radius()))
            .collect()
    }

    /// Distinct owners, split into (humans, ai).
    pub fn owner_counts(&self) -> (usize, usize) {
        let mut humans = HashSet::new();
        let mut ai = HashSet::new();
        for p in self.players.values() {
            if p.is_ai {
                ai.insert(&p.owner);
            } else {
                humans.insert(&p.owner);
            }
        }
        (humans.len(), ai.len())
    }

    /// Top scores, one entry per owner, highest first.
    pub fn leaderboard(&self, limit: usize) -> Vec<(String, u64)> {
        let mut by_owner: HashMap<&EntityId, (String, u64)> = HashMap::new();
        for p in self.players.values() {
            let entry = by_owner
                .entry(&p.owner)
                .or_insert_with(|| (p.name.clone(), 0));
            entry.1 += p.score;
        }
        let mut entries: Vec<(String, u64)> = by_owner.into_values().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (WorldState, Config) {
        let config = Config::default();
        (
            WorldState::new(config.world.size, config.world.room.clone()),
            config,
        )
    }

    #[test]
    fn join_spawns_inside_the_world() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        let blob = world.get(&id).unwrap();
        assert!(blob.position.x >= 0.0 && blob.position.x <= world.size);
        assert!(blob.position.y >= 0.0 && blob.position.y <= world.size);
        assert_eq!(blob.mass, config.player.start_mass);
    }

    #[test]
    fn queued_move_applies_at_tick_boundary() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        let before = world.get(&id).unwrap().position;

        world.queue_intent(
            id.clone(),
            ClientIntent::Move {
                x: 1_500.0,
                y: 1_500.0,
                vx: 10.0,
                vy: 0.0,
            },
        );
        // Nothing moves until the boundary.
        assert_eq!(world.get(&id).unwrap().position, before);

        let mut food = FoodStore::new(world.size);
        world.apply_intents(&config, &mut food, 1_100);
        let blob = world.get(&id).unwrap();
        assert_eq!(blob.position, Vec2::new(1_500.0, 1_500.0));
        assert_eq!(blob.velocity, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn last_move_wins_within_a_tick() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        let mut food = FoodStore::new(world.size);

        for x in [200.0, 900.0, 1_400.0] {
            world.queue_intent(
                id.clone(),
                ClientIntent::Move {
                    x,
                    y: 500.0,
                    vx: 0.0,
                    vy: 0.0,
                },
            );
        }
        world.apply_intents(&config, &mut food, 1_100);
        assert_eq!(world.get(&id).unwrap().position.x, 1_400.0);
    }

    #[test]
    fn split_requires_minimum_mass() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);

        // Start mass is below the split threshold.
        world.split(&id, &config.player, 10_000);
        assert_eq!(world.blobs_of(&id).len(), 1);

        world
            .get_mut(&id)
            .unwrap()
            .set_mass(config.player.min_split_mass);
        world.split(&id, &config.player, 10_000);
        assert_eq!(world.blobs_of(&id).len(), 2);

        // Mass was halved between the two blobs.
        let total: f32 = world
            .blobs_of(&id)
            .iter()
            .map(|b| world.get(b).unwrap().mass)
            .sum();
        assert!((total - config.player.min_split_mass).abs() < 1e-3);
    }

    #[test]
    fn split_cooldown_gates_resplitting() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        world.get_mut(&id).unwrap().set_mass(200.0);

        world.split(&id, &config.player, 10_000);
        assert_eq!(world.blobs_of(&id).len(), 2);
        // Both blobs are on cooldown.
        world.split(&id, &config.player, 10_001);
        assert_eq!(world.blobs_of(&id).len(), 2);

        world.split(&id, &config.player, 10_000 + config.player.split_cooldown_ms);
        assert_eq!(world.blobs_of(&id).len(), 4);
    }

    #[test]
    fn blob_count_is_capped() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        world.get_mut(&id).unwrap().set_mass(100_000.0);

        let mut now = 10_000;
        for _ in 0..10 {
            world.split(&id, &config.player, now);
            for blob_id in world.blobs_of(&id) {
                // Keep everything splittable so only the cap stops growth.
                world.get_mut(&blob_id).unwrap().set_mass(10_000.0);
            }
            now += config.player.split_cooldown_ms;
        }
        assert_eq!(world.blobs_of(&id).len(), config.player.max_blobs);
    }

    #[test]
    fn eject_gates_on_mass_and_spawns_food() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        let mut food = FoodStore::new(world.size);

        // Below the eject threshold: nothing happens.
        world.get_mut(&id).unwrap().set_mass(config.player.min_eject_mass - 1.0);
        world.eject(&id, &config.player, &mut food, 10_000);
        assert!(food.is_empty());

        world.get_mut(&id).unwrap().set_mass(config.player.min_eject_mass);
        world.eject(&id, &config.player, &mut food, 10_000);
        assert_eq!(food.len(), 1);
        let blob = world.get(&id).unwrap();
        assert!(
            (blob.mass - (config.player.min_eject_mass - config.player.eject_mass_cost)).abs()
                < 1e-3
        );
        // Mass never drops below the action floor.
        assert!(blob.mass >= config.player.min_mass);
    }

    #[test]
    fn integration_respects_border_and_slow_zones() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        {
            let blob = world.get_mut(&id).unwrap();
            blob.position = Vec2::new(50.0, 50.0);
            blob.velocity = Vec2::new(-1_000.0, 0.0);
        }
        world.integrate(1.0, 2_000);
        let blob = world.get(&id).unwrap();
        assert_eq!(blob.position.x, blob.radius);

        {
            let blob = world.get_mut(&id).unwrap();
            blob.position = Vec2::new(500.0, 500.0);
            blob.velocity = Vec2::new(100.0, 0.0);
            blob.slow_until = 3_000;
            blob.slow_factor = 0.5;
        }
        world.integrate(1.0, 2_500);
        assert_eq!(world.get(&id).unwrap().position.x, 550.0);
        let _ = config;
    }

    #[test]
    fn removal_cleans_up_blobs_and_intents() {
        let (mut world, config) = world();
        let id = world.add_player("alice".to_string(), false, &config.player, 1_000);
        world.get_mut(&id).unwrap().set_mass(200.0);
        world.split(&id, &config.player, 10_000);
        world.queue_intent(id.clone(), ClientIntent::Split);

        let removed = world.remove_player(&id);
        assert_eq!(removed.len(), 2);
        assert!(world.players().is_empty());
        assert!(world.intents.is_empty());
    }

    #[test]
    fn leaderboard_aggregates_blobs_by_owner() {
        let (mut world, config) = world();
        let a = world.add_player("alice".to_string(), false, &config.player, 1_000);
        let b = world.add_player("bob".to_string(), false, &config.player, 1_000);
        world.get_mut(&a).unwrap().score = 10;
        world.get_mut(&b).unwrap().score = 50;
        world.get_mut(&a).unwrap().set_mass(200.0);
        world.split(&a, &config.player, 10_000);
        for blob_id in world.blobs_of(&a) {
            world.get_mut(&blob_id).unwrap().score = 10;
        }

        let board = world.leaderboard(10);
        assert_eq!(board[0], ("bob".to_string(), 50));
        assert_eq!(board[1], ("alice".to_string(), 20));
    }
}
