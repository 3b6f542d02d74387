//! World entities.
//!
//! Every positioned, radius-bearing object in the world: player blobs, food
//! pellets, power-ups and obstacles.

mod food;
mod obstacle;
mod player;
mod power_up;

pub use food::{Food, FoodKind};
pub use obstacle::{Obstacle, ObstacleKind};
pub use player::Player;
pub use power_up::{ActiveEffect, PowerUp, PowerUpKind, PowerUpSpec};

use protocol::Color;
use rand::Rng;

/// Mass = radius² / 100, matching the classic blob growth curve.
const MASS_CONVERSION: f32 = 100.0;

/// Globally unique entity id: millisecond timestamp plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn generate(now_ms: u64) -> Self {
        let suffix: u32 = rand::rng().random();
        Self(format!("{now_ms:x}-{suffix:08x}"))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Radius for a given mass.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    (mass * MASS_CONVERSION).sqrt()
}

/// Mass for a given radius.
#[inline]
pub fn radius_to_mass(radius: f32) -> f32 {
    (radius * radius) / MASS_CONVERSION
}

/// Generate a random, reasonably bright entity color.
#[inline]
pub fn random_color() -> Color {
    let mut rng = rand::rng();
    Color::new(
        rng.random_range(50..=255),
        rng.random_range(50..=255),
        rng.random_range(50..=255),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_radius_round_trip() {
        let mass = 42.0;
        let back = radius_to_mass(mass_to_radius(mass));
        assert!((back - mass).abs() < 0.001);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EntityId::generate(1_000);
        let b = EntityId::generate(1_000);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("3e8-"));
    }
}
