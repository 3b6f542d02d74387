//! Obstacle collision responses.

use crate::entity::{Obstacle, Player};
use glam::Vec2;

/// Damage dealt to a breakable per unit of colliding mass.
pub const BREAKABLE_MASS_DAMAGE: f32 = 10.0;

/// Dampening applied to bounce impulses.
const BOUNCE_DAMPING: f32 = 0.8;

/// Impulse pushing an entity away from an obstacle center, scaled by the
/// obstacle's bounce force and dampened.
pub fn bounce_impulse(obstacle_pos: Vec2, entity_pos: Vec2, force: f32) -> Vec2 {
    let delta = entity_pos - obstacle_pos;
    // Entities sitting exactly on the center get pushed along +x.
    let dir = delta.try_normalize().unwrap_or(Vec2::X);
    dir * force * BOUNCE_DAMPING
}

/// Apply a solid obstacle's contact response: bounce plus contact damage.
/// The player's mass never drops below `min_mass`. Returns the damage the
/// obstacle itself takes (nonzero for breakables only).
pub fn solid_contact(player: &mut Player, obstacle: &Obstacle, min_mass: f32) -> f32 {
    player.velocity += bounce_impulse(obstacle.position, player.position, obstacle.bounce_force);

    if obstacle.damage > 0.0 {
        let new_mass = (player.mass - obstacle.damage).max(min_mass);
        player.set_mass(new_mass);
    }

    if obstacle.health.is_some() {
        player.mass * BREAKABLE_MASS_DAMAGE
    } else {
        0.0
    }
}
