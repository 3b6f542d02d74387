//! Food pellets.

use super::{EntityId, random_color};
use glam::Vec2;
use protocol::Color;
use rand::Rng;

/// Mass gained from a plain pellet before the growth multiplier.
const BASE_MASS_GAIN: f32 = 1.0;

/// Food tiers, plus mass ejected by players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoodKind {
    Normal,
    Super,
    Mega,
    Ultra,
    /// Player-ejected mass. Never drawn randomly; decays on a timeout.
    Ejected,
}

impl FoodKind {
    const SPAWNABLE: [FoodKind; 4] = [
        FoodKind::Normal,
        FoodKind::Super,
        FoodKind::Mega,
        FoodKind::Ultra,
    ];

    /// Score awarded on consumption.
    pub const fn points(self) -> u64 {
        match self {
            FoodKind::Normal => 1,
            FoodKind::Super => 5,
            FoodKind::Mega => 10,
            FoodKind::Ultra => 25,
            FoodKind::Ejected => 3,
        }
    }

    /// Mass growth multiplier.
    pub const fn growth(self) -> f32 {
        match self {
            FoodKind::Normal => 1.0,
            FoodKind::Super => 1.5,
            FoodKind::Mega => 2.0,
            FoodKind::Ultra => 3.0,
            FoodKind::Ejected => 1.0,
        }
    }

    pub const fn radius(self) -> f32 {
        match self {
            FoodKind::Normal => 10.0,
            FoodKind::Super => 14.0,
            FoodKind::Mega => 18.0,
            FoodKind::Ultra => 24.0,
            FoodKind::Ejected => 12.0,
        }
    }

    /// Relative spawn probability weight.
    pub const fn weight(self) -> u32 {
        match self {
            FoodKind::Normal => 70,
            FoodKind::Super => 20,
            FoodKind::Mega => 8,
            FoodKind::Ultra => 2,
            FoodKind::Ejected => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FoodKind::Normal => "NORMAL",
            FoodKind::Super => "SUPER",
            FoodKind::Mega => "MEGA",
            FoodKind::Ultra => "ULTRA",
            FoodKind::Ejected => "ejected",
        }
    }

    /// Weighted-random tier selection (cumulative-weight draw).
    pub fn weighted(rng: &mut impl Rng) -> Self {
        let total: u32 = Self::SPAWNABLE.iter().map(|k| k.weight()).sum();
        let mut roll = rng.random_range(0..total);
        for kind in Self::SPAWNABLE {
            let weight = kind.weight();
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        FoodKind::Normal
    }
}

/// A food pellet.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: EntityId,
    pub kind: FoodKind,
    pub position: Vec2,
    pub color: Color,
    pub spawned_at: u64,
}

impl Food {
    pub fn new(kind: FoodKind, position: Vec2, now: u64) -> Self {
        Self {
            id: EntityId::generate(now),
            kind,
            position,
            color: random_color(),
            spawned_at: now,
        }
    }

    /// Ejected mass keeps the ejecting blob's color.
    pub fn ejected(position: Vec2, color: Color, now: u64) -> Self {
        Self {
            id: EntityId::generate(now),
            kind: FoodKind::Ejected,
            position,
            color,
            spawned_at: now,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.kind.radius()
    }

    /// Mass the consumer gains.
    #[inline]
    pub fn mass_gain(&self) -> f32 {
        BASE_MASS_GAIN * self.kind.growth()
    }
}
