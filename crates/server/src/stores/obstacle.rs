//! Obstacle store: map generation, teleporter pairing, destructible health.

use super::scatter;
use crate::config::ObstacleConfig;
use crate::entity::{EntityId, Obstacle, ObstacleKind};
use crate::error::EngineError;
use crate::spatial::SpatialGrid;
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info};

/// Minimum spacing between generated obstacles.
const MIN_OBSTACLE_SPACING: f32 = 150.0;

/// Attempts to place a teleporter partner at the required separation before
/// falling back to a random location.
const PARTNER_PLACEMENT_ATTEMPTS: usize = 10;

/// Procedural kind weights: (kind, weight).
const PROCEDURAL_KINDS: [(ObstacleKind, u32); 5] = [
    (ObstacleKind::Wall, 4),
    (ObstacleKind::Spike, 3),
    (ObstacleKind::Breakable, 2),
    (ObstacleKind::Slime, 2),
    (ObstacleKind::Teleporter, 1),
];

/// Owns all obstacles and their spatial grid. Obstacles are static after
/// map generation; the grid is rebuilt only on generation and removal.
pub struct ObstacleStore {
    items: HashMap<EntityId, Obstacle>,
    grid: SpatialGrid<EntityId>,
    world_size: f32,
    max_radius: f32,
}

impl ObstacleStore {
    pub fn new(world_size: f32) -> Self {
        Self {
            items: HashMap::new(),
            grid: SpatialGrid::new(world_size),
            world_size,
            max_radius: 0.0,
        }
    }

    /// Generate the map: declarative template when supplied, procedural
    /// placement at a density proportional to world size otherwise.
    pub fn generate(&mut self, cfg: &ObstacleConfig, now: u64) -> Result<(), EngineError> {
        if cfg.template.is_empty() {
            self.generate_procedural(cfg, now);
        } else {
            self.generate_from_template(cfg, now)?;
        }
        self.pair_unlinked_teleporters(cfg, now);
        self.rebuild_grid();
        info!(count = self.items.len(), "Obstacle map generated");
        Ok(())
    }

    fn generate_from_template(
        &mut self,
        cfg: &ObstacleConfig,
        now: u64,
    ) -> Result<(), EngineError> {
        for spec in &cfg.template {
            let kind: ObstacleKind = spec.kind.parse()?;
            let mut obstacle = self.build(kind, Vec2::new(spec.x, spec.y), cfg, now);
            // Entries that link to each other must carry explicit ids.
            if let Some(id) = &spec.id {
                obstacle.id = EntityId::from_raw(id.clone());
            }
            if let Some(w) = spec.width {
                obstacle.width = w;
            }
            if let Some(h) = spec.height {
                obstacle.height = h;
            }
            if let Some(r) = spec.rotation {
                obstacle.rotation = r;
            }
            if let Some(link) = &spec.link {
                obstacle.linked_to = Some(EntityId::from_raw(link.clone()));
            }
            self.items.insert(obstacle.id.clone(), obstacle);
        }

        // Every declared link must resolve to a teleporter in the template.
        for obstacle in self.items.values() {
            if let Some(link) = &obstacle.linked_to {
                let target = self
                    .items
                    .get(link)
                    .ok_or_else(|| {
                        EngineError::InvalidConfig(format!(
                            "teleporter {} links to unknown obstacle {link}",
                            obstacle.id
                        ))
                    })?;
                if target.kind != ObstacleKind::Teleporter {
                    return Err(EngineError::InvalidConfig(format!(
                        "teleporter {} links to non-teleporter {link}",
                        obstacle.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn generate_procedural(&mut self, cfg: &ObstacleConfig, now: u64) {
        let count = ((self.world_size / 1_000.0) * cfg.per_1000_units as f32) as usize;
        let mut rng = rand::rng();
        for _ in 0..count {
            let kind = Self::weighted_kind(&mut rng);
            let position = self.scatter_clear(&mut rng);
            let obstacle = self.build(kind, position, cfg, now);
            self.items.insert(obstacle.id.clone(), obstacle);
        }
    }

    fn weighted_kind(rng: &mut impl Rng) -> ObstacleKind {
        let total: u32 = PROCEDURAL_KINDS.iter().map(|(_, w)| w).sum();
        let mut roll = rng.random_range(0..total);
        for (kind, weight) in PROCEDURAL_KINDS {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        ObstacleKind::Wall
    }

    /// A position away from already-placed obstacles.
    fn scatter_clear(&self, rng: &mut impl Rng) -> Vec2 {
        scatter(rng, self.world_size, MIN_OBSTACLE_SPACING, |p| {
            self.items
                .values()
                .any(|o| o.position.distance(p) < MIN_OBSTACLE_SPACING)
        })
    }

    /// Construct an obstacle with per-kind defaults.
    fn build(&self, kind: ObstacleKind, position: Vec2, cfg: &ObstacleConfig, now: u64) -> Obstacle {
        let (width, height) = match kind {
            ObstacleKind::Wall => (200.0, 40.0),
            ObstacleKind::Spike => (60.0, 60.0),
            ObstacleKind::Breakable => (80.0, 80.0),
            ObstacleKind::Slime => (150.0, 150.0),
            ObstacleKind::Teleporter => (70.0, 70.0),
        };
        let mut obstacle = Obstacle::new(kind, position, width, height, now);
        match kind {
            ObstacleKind::Wall => {
                obstacle.bounce_force = cfg.bounce_force;
            }
            ObstacleKind::Spike => {
                obstacle.bounce_force = cfg.bounce_force;
                obstacle.damage = cfg.spike_damage;
            }
            ObstacleKind::Breakable => {
                obstacle.bounce_force = cfg.bounce_force;
                obstacle.health = Some(cfg.breakable_health);
            }
            ObstacleKind::Slime | ObstacleKind::Teleporter => {}
        }
        obstacle
    }

    /// Every teleporter without a partner gets one, placed at least
    /// `teleporter_min_separation` away when possible.
    fn pair_unlinked_teleporters(&mut self, cfg: &ObstacleConfig, now: u64) {
        // One-sided template links become mutual before new partners spawn.
        let one_sided: Vec<(EntityId, EntityId)> = self
            .items
            .values()
            .filter_map(|o| {
                let link = o.linked_to.clone()?;
                let target = self.items.get(&link)?;
                target
                    .linked_to
                    .is_none()
                    .then(|| (link, o.id.clone()))
            })
            .collect();
        for (target, source) in one_sided {
            if let Some(obstacle) = self.items.get_mut(&target) {
                obstacle.linked_to = Some(source);
            }
        }

        let unlinked: Vec<EntityId> = self
            .items
            .values()
            .filter(|o| o.kind == ObstacleKind::Teleporter && o.linked_to.is_none())
            .map(|o| o.id.clone())
            .collect();

        for id in unlinked {
            // The reciprocal pass above may have linked this one already.
            if self.items.get(&id).is_none_or(|o| o.linked_to.is_some()) {
                continue;
            }
            self.spawn_teleporter_partner(&id, cfg, now);
        }
    }

    /// Create and link a partner for an existing teleporter.
    fn spawn_teleporter_partner(&mut self, id: &EntityId, cfg: &ObstacleConfig, now: u64) {
        let Some(origin) = self.items.get(id).map(|o| o.position) else {
            return;
        };

        let mut rng = rand::rng();
        let mut position = None;
        for _ in 0..PARTNER_PLACEMENT_ATTEMPTS {
            let candidate = Vec2::new(
                rng.random_range(0.0..self.world_size),
                rng.random_range(0.0..self.world_size),
            );
            if candidate.distance(origin) >= cfg.teleporter_min_separation {
                position = Some(candidate);
                break;
            }
        }
        // Bounded retries exhausted: accept a random location.
        let position = position.unwrap_or_else(|| {
            Vec2::new(
                rng.random_range(0.0..self.world_size),
                rng.random_range(0.0..self.world_size),
            )
        });

        let mut partner = self.build(ObstacleKind::Teleporter, position, cfg, now);
        partner.linked_to = Some(id.clone());
        let partner_id = partner.id.clone();
        self.items.insert(partner_id.clone(), partner);
        if let Some(original) = self.items.get_mut(id) {
            original.linked_to = Some(partner_id);
        }
    }

    /// Remove an obstacle. Removing a teleporter removes its linked partner
    /// as well; all removed obstacles are returned.
    pub fn remove(&mut self, id: &EntityId) -> Vec<Obstacle> {
        let mut removed = Vec::new();
        if let Some(obstacle) = self.items.remove(id) {
            if let Some(link) = obstacle.linked_to.clone() {
                if let Some(partner) = self.items.remove(&link) {
                    removed.push(partner);
                }
            }
            removed.push(obstacle);
            self.rebuild_grid();
        }
        removed
    }

    /// Apply damage to a destructible; removes it when destroyed.
    pub fn damage(&mut self, id: &EntityId, amount: f32) -> bool {
        let destroyed = match self.items.get_mut(id) {
            Some(obstacle) => obstacle.apply_damage(amount),
            None => false,
        };
        if destroyed {
            debug!(%id, "Breakable obstacle destroyed");
            self.remove(id);
        }
        destroyed
    }

    pub fn get(&self, id: &EntityId) -> Option<&Obstacle> {
        self.items.get(id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &Obstacle> {
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

    /// Largest collision radius among current obstacles; collision queries
    /// widen their search window by this much.
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        self.max_radius = 0.0;
        for obstacle in self.items.values() {
            self.max_radius = self.max_radius.max(obstacle.radius());
            self.grid
                .insert(obstacle.id.clone(), obstacle.position.x, obstacle.position.y);
        }
    }

    /// Insert a pre-built obstacle directly (tests and admin tooling).
    pub fn insert(&mut self, obstacle: Obstacle) -> EntityId {
        let id = obstacle.id.clone();
        self.items.insert(id.clone(), obstacle);
        self.rebuild_grid();
        id
    }
}
