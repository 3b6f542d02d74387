//! Player blobs.

use super::power_up::{ActiveEffect, PowerUpKind};
use super::{EntityId, mass_to_radius, random_color};
use glam::Vec2;
use protocol::Color;

/// Radius multiplier per SIZE stack.
pub const SIZE_FACTOR: f32 = 1.25;
/// Movement multiplier per SPEED stack.
pub const SPEED_FACTOR: f32 = 1.5;
/// Score multiplier per POINTS stack.
pub const POINTS_FACTOR: f32 = 2.0;

/// One player blob. A split produces additional blobs sharing the same
/// `owner`; the primary blob's `id` equals its `owner`.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub owner: EntityId,
    pub name: String,
    pub room: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub color: Color,
    pub is_ai: bool,
    pub score: u64,

    /// Active power-up effects (kind + expiry, nothing captured).
    pub active_effects: Vec<ActiveEffect>,
    // Integer stack counters derived from the effects above. Applying an
    // effect increments a counter, reverting decrements it, so reverts are
    // exact regardless of ordering.
    pub speed_stacks: u8,
    pub shield_stacks: u8,
    pub size_stacks: u8,
    pub points_stacks: u8,
    pub ghost_stacks: u8,

    /// Slow-zone state (slime contact), outside the stacking rules.
    pub slow_until: u64,
    pub slow_factor: f32,

    // Last-action timestamps for cooldown gating.
    pub last_split: u64,
    pub last_eject: u64,
    pub spawned_at: u64,
}

impl Player {
    pub fn new(
        id: EntityId,
        owner: EntityId,
        name: String,
        room: String,
        position: Vec2,
        mass: f32,
        is_ai: bool,
        now: u64,
    ) -> Self {
        Self {
            id,
            owner,
            name,
            room,
            position,
            velocity: Vec2::ZERO,
            mass,
            radius: mass_to_radius(mass),
            color: random_color(),
            is_ai,
            score: 0,
            active_effects: Vec::new(),
            speed_stacks: 0,
            shield_stacks: 0,
            size_stacks: 0,
            points_stacks: 0,
            ghost_stacks: 0,
            slow_until: 0,
            slow_factor: 1.0,
            last_split: 0,
            last_eject: 0,
            spawned_at: now,
        }
    }

    /// Set mass and update the derived radius.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.radius = mass_to_radius(self.mass);
    }

    #[inline]
    pub fn grow(&mut self, mass_gain: f32) {
        self.set_mass(self.mass + mass_gain);
    }

    /// Collision radius with SIZE effect scaling applied.
    #[inline]
    pub fn effective_radius(&self) -> f32 {
        self.radius * SIZE_FACTOR.powi(self.size_stacks as i32)
    }

    /// Movement multiplier from SPEED stacks and any active slow zone.
    pub fn speed_multiplier(&self, now: u64) -> f32 {
        let mut mult = SPEED_FACTOR.powi(self.speed_stacks as i32);
        if now < self.slow_until {
            mult *= self.slow_factor;
        }
        mult
    }

    /// Score multiplier from POINTS stacks.
    #[inline]
    pub fn score_multiplier(&self) -> f32 {
        POINTS_FACTOR.powi(self.points_stacks as i32)
    }

    #[inline]
    pub fn is_shielded(&self) -> bool {
        self.shield_stacks > 0
    }

    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.ghost_stacks > 0
    }

    /// Collision immunity for newly created blobs.
    #[inline]
    pub fn is_immune(&self, now: u64, grace_ms: u64) -> bool {
        now.saturating_sub(self.spawned_at) < grace_ms
    }

    /// Number of active effects of a kind.
    pub fn active_stacks(&self, kind: PowerUpKind) -> usize {
        self.active_effects.iter().filter(|e| e.kind == kind).count()
    }

    /// Award points, scaled by the POINTS multiplier.
    pub fn award_points(&mut self, base: u64) {
        self.score += (base as f32 * self.score_multiplier()).round() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(mass: f32) -> Player {
        let id = EntityId::from_raw("p1");
        Player::new(
            id.clone(),
            id,
            "tester".to_string(),
            "arena".to_string(),
            Vec2::new(100.0, 100.0),
            mass,
            false,
            1_000,
        )
    }

    #[test]
    fn radius_tracks_mass() {
        let mut p = blob(10.0);
        let before = p.radius;
        p.grow(10.0);
        assert!(p.radius > before);
        assert_eq!(p.radius, mass_to_radius(20.0));
    }

    #[test]
    fn size_stacks_scale_effective_radius() {
        let mut p = blob(10.0);
        assert_eq!(p.effective_radius(), p.radius);
        p.size_stacks = 2;
        let expected = p.radius * SIZE_FACTOR * SIZE_FACTOR;
        assert!((p.effective_radius() - expected).abs() < 1e-3);
    }

    #[test]
    fn slow_zone_expires() {
        let mut p = blob(10.0);
        p.speed_stacks = 1;
        p.slow_until = 2_000;
        p.slow_factor = 0.5;
        assert!((p.speed_multiplier(1_500) - SPEED_FACTOR * 0.5).abs() < 1e-6);
        assert!((p.speed_multiplier(2_000) - SPEED_FACTOR).abs() < 1e-6);
    }

    #[test]
    fn grace_period_immunity() {
        let p = blob(10.0);
        assert!(p.is_immune(1_500, 2_000));
        assert!(!p.is_immune(3_000, 2_000));
    }

    #[test]
    fn points_multiplier_scales_awards() {
        let mut p = blob(10.0);
        p.award_points(10);
        assert_eq!(p.score, 10);
        p.points_stacks = 1;
        p.award_points(10);
        assert_eq!(p.score, 30);
    }
}
