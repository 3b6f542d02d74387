//! Food store: targeting, spawn placement and ejected-mass decay.

use super::scatter;
use crate::config::FoodConfig;
use crate::entity::{EntityId, Food, FoodKind};
use crate::spatial::SpatialGrid;
use glam::Vec2;
use std::collections::HashMap;
use tracing::debug;

/// Minimum spacing between spawned pellets.
const MIN_FOOD_SPACING: f32 = 30.0;

/// Owns all food pellets and their spatial grid.
pub struct FoodStore {
    items: HashMap<EntityId, Food>,
    grid: SpatialGrid<EntityId>,
    world_size: f32,
    last_spawn: u64,
}

impl FoodStore {
    pub fn new(world_size: f32) -> Self {
        Self {
            items: HashMap::new(),
            grid: SpatialGrid::new(world_size),
            world_size,
            last_spawn: 0,
        }
    }

    /// Target pellet count for the current player count.
    pub fn target_count(cfg: &FoodConfig, player_count: usize) -> usize {
        (cfg.min_per_player * player_count)
            .max(cfg.min_per_player * 2)
            .min(cfg.max_total)
    }

    /// Spawn up to `count` pellets, avoiding other pellets and player blobs.
    ///
    /// `players` holds `(position, radius)` for every live blob; candidates
    /// within 3× a blob's radius of it are rejected.
    pub fn spawn(&mut self, count: usize, now: u64, players: &[(Vec2, f32)]) {
        let mut rng = rand::rng();
        for _ in 0..count {
            let kind = FoodKind::weighted(&mut rng);
            let position = scatter(&mut rng, self.world_size, kind.radius(), |p| {
                let crowded = !self
                    .grid
                    .query_neighbors(p.x, p.y, MIN_FOOD_SPACING)
                    .is_empty();
                crowded
                    || players
                        .iter()
                        .any(|(pos, radius)| pos.distance(p) < radius * 3.0)
            });
            let food = Food::new(kind, position, now);
            self.grid.insert(food.id.clone(), position.x, position.y);
            self.items.insert(food.id.clone(), food);
        }
    }

    /// Add player-ejected mass.
    pub fn insert_ejected(&mut self, food: Food) {
        self.grid
            .insert(food.id.clone(), food.position.x, food.position.y);
        self.items.insert(food.id.clone(), food);
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Food> {
        self.items.remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Food> {
        self.items.get(id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &Food> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn grid(&self) -> &SpatialGrid<EntityId> {
        &self.grid
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.grid.clear();
        self.last_spawn = 0;
    }

    /// Per-tick update: decay ejected mass, top up toward the target count
    /// (rate-limited to one batch per cooldown window), rebuild the grid.
    pub fn update(
        &mut self,
        now: u64,
        cfg: &FoodConfig,
        player_count: usize,
        players: &[(Vec2, f32)],
    ) {
        let expired: Vec<EntityId> = self
            .items
            .values()
            .filter(|f| {
                f.kind == FoodKind::Ejected
                    && now.saturating_sub(f.spawned_at) >= cfg.ejected_decay_ms
            })
            .map(|f| f.id.clone())
            .collect();
        for id in &expired {
            self.items.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Ejected mass decayed");
        }

        let target = Self::target_count(cfg, player_count);
        if self.items.len() < target && now.saturating_sub(self.last_spawn) >= cfg.spawn_interval_ms
        {
            let missing = target - self.items.len();
            self.spawn(missing.min(cfg.spawn_batch_limit), now, players);
            self.last_spawn = now;
        }

        self.rebuild_grid();
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for food in self.items.values() {
            self.grid
                .insert(food.id.clone(), food.position.x, food.position.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FoodConfig {
        FoodConfig {
            min_per_player: 10,
            max_total: 300,
            spawn_interval_ms: 500,
            spawn_batch_limit: 5,
            ejected_decay_ms: 30_000,
        }
    }

    #[test]
    fn target_scales_with_players_up_to_cap() {
        let cfg = config();
        assert_eq!(FoodStore::target_count(&cfg, 3), 30);
        // Floor of two players' worth when nearly empty.
        assert_eq!(FoodStore::target_count(&cfg, 0), 20);
        assert_eq!(FoodStore::target_count(&cfg, 1), 20);
        // Capped at the global maximum.
        assert_eq!(FoodStore::target_count(&cfg, 1_000), 300);
    }

    #[test]
    fn spawning_converges_to_target_without_exceeding_cap() {
        let cfg = config();
        let mut store = FoodStore::new(4_000.0);

        let mut now = 0;
        for _ in 0..40 {
            now += cfg.spawn_interval_ms;
            store.update(now, &cfg, 3, &[]);
            assert!(store.len() <= 30, "overshot target: {}", store.len());
        }
        assert_eq!(store.len(), 30);

        // Stays put once the target is reached.
        now += cfg.spawn_interval_ms;
        store.update(now, &cfg, 3, &[]);
        assert_eq!(store.len(), 30);
    }

    #[test]
    fn spawning_is_rate_limited_per_window() {
        let cfg = config();
        let mut store = FoodStore::new(4_000.0);

        store.update(cfg.spawn_interval_ms, &cfg, 3, &[]);
        let after_first = store.len();
        assert_eq!(after_first, cfg.spawn_batch_limit);

        // Within the same window nothing new spawns.
        store.update(cfg.spawn_interval_ms + 1, &cfg, 3, &[]);
        assert_eq!(store.len(), after_first);
    }

    #[test]
    fn ejected_mass_decays() {
        let cfg = config();
        let mut store = FoodStore::new(4_000.0);
        let food = Food::ejected(Vec2::new(100.0, 100.0), protocol::Color::default(), 1_000);
        let id = food.id.clone();
        store.insert_ejected(food);
        assert_eq!(store.len(), 1);

        store.update(1_000 + cfg.ejected_decay_ms - 1, &cfg, 0, &[]);
        assert!(store.get(&id).is_some());

        // Target floor also spawns pellets here; only the ejected one matters.
        store.update(1_000 + cfg.ejected_decay_ms, &cfg, 0, &[]);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn grid_tracks_spawned_food() {
        let cfg = config();
        let mut store = FoodStore::new(4_000.0);
        store.update(cfg.spawn_interval_ms, &cfg, 3, &[]);

        let total: usize = store.grid().len();
        assert_eq!(total, store.len());
    }
}
