//! Consumption combos.
//!
//! Consecutive consumptions inside a rolling window build a per-player
//! streak; each consumption beyond the first pays a bonus scaled by the
//! current streak, capped at the configured multiplier.

use crate::config::ComboConfig;
use crate::effect::Consumption;
use crate::entity::EntityId;
use crate::world::WorldState;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Streak {
    count: u32,
    last: u64,
}

/// Per-player consumption streak tracking.
pub struct ComboTracker {
    streaks: HashMap<EntityId, Streak>,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self {
            streaks: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.streaks.clear();
    }

    /// Current streak length for a player.
    pub fn streak(&self, owner: &EntityId) -> u32 {
        self.streaks.get(owner).map(|s| s.count).unwrap_or(0)
    }

    /// Fold this tick's consumptions into streaks and pay bonuses.
    pub fn update(
        &mut self,
        consumptions: &[Consumption],
        world: &mut WorldState,
        cfg: &ComboConfig,
        now: u64,
    ) {
        // Streaks that outlived the window lapse first, so a late
        // consumption starts fresh instead of extending a dead streak.
        self.streaks
            .retain(|_, s| now.saturating_sub(s.last) <= cfg.window_ms);
        // Owners that left the world take their streaks with them.
        self.streaks.retain(|owner, _| {
            world.players().values().any(|p| &p.owner == owner)
        });

        for consumption in consumptions {
            let streak = self
                .streaks
                .entry(consumption.eater.clone())
                .or_insert(Streak { count: 0, last: now });
            streak.count += 1;
            streak.last = now;

            let multiplier = streak.count.min(cfg.max_multiplier);
            if multiplier > 1 {
                let bonus = consumption.points * (multiplier - 1) as u64;
                let Some(primary) = world.get_mut(&consumption.eater) else {
                    continue;
                };
                primary.score += bonus;
                debug!(
                    player = %consumption.eater,
                    streak = streak.count,
                    bonus,
                    "Combo bonus"
                );
            }
        }
    }
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new()
    }
}
