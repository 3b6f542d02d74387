//! Power-up entities and effect descriptors.

use super::EntityId;
use crate::error::EngineError;
use glam::Vec2;
use rand::Rng;
use std::str::FromStr;

/// Collectible power-up kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    Speed,
    Shield,
    Size,
    Points,
    Ghost,
}

/// Static parameters for one power-up kind.
#[derive(Debug, Clone, Copy)]
pub struct PowerUpSpec {
    pub duration_ms: u64,
    pub stackable: bool,
    pub max_stacks: u8,
    /// Relative spawn probability weight.
    pub weight: u32,
    pub radius: f32,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Speed,
        PowerUpKind::Shield,
        PowerUpKind::Size,
        PowerUpKind::Points,
        PowerUpKind::Ghost,
    ];

    pub const fn spec(self) -> PowerUpSpec {
        match self {
            PowerUpKind::Speed => PowerUpSpec {
                duration_ms: 8_000,
                stackable: false,
                max_stacks: 1,
                weight: 30,
                radius: 16.0,
            },
            PowerUpKind::Shield => PowerUpSpec {
                duration_ms: 10_000,
                stackable: true,
                max_stacks: 3,
                weight: 15,
                radius: 16.0,
            },
            PowerUpKind::Size => PowerUpSpec {
                duration_ms: 12_000,
                stackable: false,
                max_stacks: 1,
                weight: 25,
                radius: 18.0,
            },
            PowerUpKind::Points => PowerUpSpec {
                duration_ms: 15_000,
                stackable: false,
                max_stacks: 1,
                weight: 20,
                radius: 16.0,
            },
            PowerUpKind::Ghost => PowerUpSpec {
                duration_ms: 6_000,
                stackable: false,
                max_stacks: 1,
                weight: 10,
                radius: 16.0,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PowerUpKind::Speed => "SPEED",
            PowerUpKind::Shield => "SHIELD",
            PowerUpKind::Size => "SIZE",
            PowerUpKind::Points => "POINTS",
            PowerUpKind::Ghost => "GHOST",
        }
    }

    /// Weighted-random kind selection (cumulative-weight draw).
    pub fn weighted(rng: &mut impl Rng) -> Self {
        let total: u32 = Self::ALL.iter().map(|k| k.spec().weight).sum();
        let mut roll = rng.random_range(0..total);
        for kind in Self::ALL {
            let weight = kind.spec().weight;
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        // Unreachable while every weight is positive.
        PowerUpKind::Speed
    }
}

impl FromStr for PowerUpKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SPEED" => Ok(PowerUpKind::Speed),
            "SHIELD" => Ok(PowerUpKind::Shield),
            "SIZE" => Ok(PowerUpKind::Size),
            "POINTS" => Ok(PowerUpKind::Points),
            "GHOST" => Ok(PowerUpKind::Ghost),
            other => Err(EngineError::UnknownPowerUpKind(other.to_string())),
        }
    }
}

/// A spawned, collectible power-up.
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub position: Vec2,
    pub spawned_at: u64,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, position: Vec2, now: u64) -> Self {
        Self {
            id: EntityId::generate(now),
            kind,
            position,
            spawned_at: now,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.kind.spec().radius
    }
}

/// One active effect instance on a player. Kind plus expiry only, so effect
/// state survives serialization and replays without captured closures.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub expires_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_draw_returns_valid_kinds() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let kind = PowerUpKind::weighted(&mut rng);
            assert!(kind.spec().weight > 0);
        }
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("shield".parse::<PowerUpKind>().unwrap(), PowerUpKind::Shield);
        assert_eq!("GHOST".parse::<PowerUpKind>().unwrap(), PowerUpKind::Ghost);
    }

    #[test]
    fn unknown_kind_fails_fast() {
        let err = "warp".parse::<PowerUpKind>().unwrap_err();
        assert!(err.to_string().contains("warp"));
    }

    #[test]
    fn shield_is_stackable_to_three() {
        let spec = PowerUpKind::Shield.spec();
        assert!(spec.stackable);
        assert_eq!(spec.max_stacks, 3);
    }
}
