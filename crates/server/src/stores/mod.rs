//! Per-entity-kind stores.
//!
//! Each store owns its entity map and its own spatial grid instance, and is
//! the only owner of those entities; the collision engine only ever sees
//! read-only views for the duration of one tick.

mod food;
mod obstacle;
mod power_up;

pub use food::FoodStore;
pub use obstacle::ObstacleStore;
pub use power_up::PowerUpStore;

use glam::Vec2;
use rand::Rng;

/// Placement attempts before giving up on spacing constraints.
const SCATTER_ATTEMPTS: usize = 12;

/// Pick a spawn position: up to [`SCATTER_ATTEMPTS`] uniform-random draws,
/// rejecting candidates `reject` dislikes; the last candidate is accepted
/// when every attempt is rejected.
pub(crate) fn scatter(
    rng: &mut impl Rng,
    world_size: f32,
    margin: f32,
    reject: impl Fn(Vec2) -> bool,
) -> Vec2 {
    let lo = margin.min(world_size / 2.0);
    let hi = (world_size - margin).max(lo + f32::EPSILON);
    let mut candidate = Vec2::ZERO;
    for _ in 0..SCATTER_ATTEMPTS {
        candidate = Vec2::new(rng.random_range(lo..hi), rng.random_range(lo..hi));
        if !reject(candidate) {
            return candidate;
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_respects_rejection_when_possible() {
        let mut rng = rand::rng();
        let pos = scatter(&mut rng, 1_000.0, 10.0, |p| p.x < 500.0);
        // Either a passing candidate, or the final rejected one.
        assert!(pos.x >= 10.0 && pos.x <= 990.0);
    }

    #[test]
    fn scatter_accepts_last_candidate_on_exhaustion() {
        let mut rng = rand::rng();
        // Reject everything; must still return a position inside the world.
        let pos = scatter(&mut rng, 1_000.0, 10.0, |_| true);
        assert!(pos.x >= 10.0 && pos.x <= 990.0);
        assert!(pos.y >= 10.0 && pos.y <= 990.0);
    }
}
