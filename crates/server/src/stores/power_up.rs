//! Power-up store: interval spawning with weighted kind selection.

use super::scatter;
use crate::config::PowerUpConfig;
use crate::entity::{EntityId, PowerUp, PowerUpKind};
use crate::spatial::SpatialGrid;
use std::collections::HashMap;
use tracing::debug;

/// Minimum spacing between spawned power-ups.
const MIN_POWER_UP_SPACING: f32 = 120.0;

/// Owns all collectible power-ups and their spatial grid.
pub struct PowerUpStore {
    items: HashMap<EntityId, PowerUp>,
    grid: SpatialGrid<EntityId>,
    world_size: f32,
    last_spawn: u64,
}

impl PowerUpStore {
    pub fn new(world_size: f32) -> Self {
        Self {
            items: HashMap::new(),
            grid: SpatialGrid::new(world_size),
            world_size,
            last_spawn: 0,
        }
    }

    /// Spawn `count` power-ups of weighted-random kinds.
    pub fn spawn(&mut self, count: usize, now: u64) {
        let mut rng = rand::rng();
        for _ in 0..count {
            let kind = PowerUpKind::weighted(&mut rng);
            let position = scatter(&mut rng, self.world_size, kind.spec().radius, |p| {
                !self
                    .grid
                    .query_neighbors(p.x, p.y, MIN_POWER_UP_SPACING)
                    .is_empty()
            });
            let power_up = PowerUp::new(kind, position, now);
            self.grid
                .insert(power_up.id.clone(), position.x, position.y);
            self.items.insert(power_up.id.clone(), power_up);
        }
    }

    /// Insert a pre-built power-up directly (tests and admin tooling).
    pub fn insert(&mut self, power_up: PowerUp) {
        self.grid
            .insert(power_up.id.clone(), power_up.position.x, power_up.position.y);
        self.items.insert(power_up.id.clone(), power_up);
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<PowerUp> {
        self.items.remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&PowerUp> {
        self.items.get(id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &PowerUp> {
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

    /// Per-tick update: optional lifetime expiry, one interval-gated spawn,
    /// grid rebuild.
    ///
    /// With `lifetime_ms == 0` power-ups persist until collected.
    pub fn update(&mut self, now: u64, cfg: &PowerUpConfig) {
        if cfg.lifetime_ms > 0 {
            let expired: Vec<EntityId> = self
                .items
                .values()
                .filter(|p| now.saturating_sub(p.spawned_at) >= cfg.lifetime_ms)
                .map(|p| p.id.clone())
                .collect();
            for id in &expired {
                self.items.remove(id);
            }
            if !expired.is_empty() {
                debug!(count = expired.len(), "Power-ups expired");
            }
        }

        if self.items.len() < cfg.max_total
            && now.saturating_sub(self.last_spawn) >= cfg.spawn_interval_ms
        {
            self.spawn(1, now);
            self.last_spawn = now;
        }

        self.rebuild_grid();
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for power_up in self.items.values() {
            self.grid
                .insert(power_up.id.clone(), power_up.position.x, power_up.position.y);
        }
    }
}
