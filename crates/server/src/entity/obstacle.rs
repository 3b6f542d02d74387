//! Static obstacles.

use super::EntityId;
use crate::error::EngineError;
use glam::Vec2;
use std::str::FromStr;

/// Obstacle kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    Wall,
    Spike,
    Breakable,
    Slime,
    Teleporter,
}

impl ObstacleKind {
    /// Solid obstacles bounce entities; non-solid ones are pass-through
    /// zones with their own contact behavior.
    pub const fn is_solid(self) -> bool {
        matches!(
            self,
            ObstacleKind::Wall | ObstacleKind::Spike | ObstacleKind::Breakable
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            ObstacleKind::Wall => "WALL",
            ObstacleKind::Spike => "SPIKE",
            ObstacleKind::Breakable => "BREAKABLE",
            ObstacleKind::Slime => "SLIME",
            ObstacleKind::Teleporter => "TELEPORTER",
        }
    }
}

impl FromStr for ObstacleKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WALL" => Ok(ObstacleKind::Wall),
            "SPIKE" => Ok(ObstacleKind::Spike),
            "BREAKABLE" => Ok(ObstacleKind::Breakable),
            "SLIME" => Ok(ObstacleKind::Slime),
            "TELEPORTER" => Ok(ObstacleKind::Teleporter),
            other => Err(EngineError::UnknownObstacleKind(other.to_string())),
        }
    }
}

/// A static world obstacle.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: EntityId,
    pub kind: ObstacleKind,
    pub position: Vec2,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    /// Contact damage applied to colliding entities (0 for walls).
    pub damage: f32,
    pub bounce_force: f32,
    /// Remaining health; `Some` for BREAKABLE only. Monotonically
    /// non-increasing until removal.
    pub health: Option<f32>,
    /// Partner id; `Some` for TELEPORTER only. Pairs are always mutual.
    pub linked_to: Option<EntityId>,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, position: Vec2, width: f32, height: f32, now: u64) -> Self {
        Self {
            id: EntityId::generate(now),
            kind,
            position,
            width,
            height,
            rotation: 0.0,
            damage: 0.0,
            bounce_force: 0.0,
            health: None,
            linked_to: None,
        }
    }

    /// Collision radius (circle approximation of the footprint).
    #[inline]
    pub fn radius(&self) -> f32 {
        self.width.max(self.height) / 2.0
    }

    /// Apply damage; health never increases. Returns true once destroyed.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if let Some(health) = self.health.as_mut() {
            *health -= amount.max(0.0);
            *health <= 0.0
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_fails_fast_on_unknown() {
        assert!("wall".parse::<ObstacleKind>().is_ok());
        let err = "LAVA".parse::<ObstacleKind>().unwrap_err();
        assert!(err.to_string().contains("LAVA"));
    }

    #[test]
    fn damage_is_monotonic() {
        let mut o = Obstacle::new(ObstacleKind::Breakable, Vec2::ZERO, 80.0, 80.0, 0);
        o.health = Some(100.0);

        assert!(!o.apply_damage(40.0));
        assert_eq!(o.health, Some(60.0));
        // Negative amounts never heal.
        assert!(!o.apply_damage(-50.0));
        assert_eq!(o.health, Some(60.0));
        assert!(o.apply_damage(60.0));
    }

    #[test]
    fn non_breakables_ignore_damage() {
        let mut o = Obstacle::new(ObstacleKind::Wall, Vec2::ZERO, 200.0, 40.0, 0);
        assert!(!o.apply_damage(1_000.0));
        assert_eq!(o.health, None);
    }
}
