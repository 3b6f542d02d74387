//! Power-up effect application and reversal.
//!
//! Effects are pure counter adjustments keyed by kind; the active list holds
//! only `(kind, expiry)` pairs. The per-(player, kind) state machine is
//! `absent → active(1..max_stacks) → expired → absent`, and no transition
//! skips the revert.

use crate::entity::{ActiveEffect, Player, PowerUpKind};

/// Apply one stack of an effect to a player.
pub fn apply(player: &mut Player, kind: PowerUpKind) {
    match kind {
        PowerUpKind::Speed => player.speed_stacks += 1,
        PowerUpKind::Shield => player.shield_stacks += 1,
        PowerUpKind::Size => player.size_stacks += 1,
        PowerUpKind::Points => player.points_stacks += 1,
        PowerUpKind::Ghost => player.ghost_stacks += 1,
    }
}

/// Revert one stack of an effect. Counters saturate at zero, so a stray
/// revert can never push a player into negative stacks.
pub fn revert(player: &mut Player, kind: PowerUpKind) {
    match kind {
        PowerUpKind::Speed => player.speed_stacks = player.speed_stacks.saturating_sub(1),
        PowerUpKind::Shield => player.shield_stacks = player.shield_stacks.saturating_sub(1),
        PowerUpKind::Size => player.size_stacks = player.size_stacks.saturating_sub(1),
        PowerUpKind::Points => player.points_stacks = player.points_stacks.saturating_sub(1),
        PowerUpKind::Ghost => player.ghost_stacks = player.ghost_stacks.saturating_sub(1),
    }
}

/// Try to collect a power-up: rejected when a non-stackable kind is already
/// active, or a stackable kind is at its cap. Returns whether it applied.
pub fn try_collect(player: &mut Player, kind: PowerUpKind, now: u64) -> bool {
    let spec = kind.spec();
    let active = player.active_stacks(kind);
    if !spec.stackable && active >= 1 {
        return false;
    }
    if spec.stackable && active >= spec.max_stacks as usize {
        return false;
    }

    apply(player, kind);
    player.active_effects.push(ActiveEffect {
        kind,
        expires_at: now + spec.duration_ms,
    });
    true
}

/// Expire effects whose end time has passed, reverting each exactly once.
/// Returns the number of expired effects.
pub fn expire(player: &mut Player, now: u64) -> usize {
    let mut expired = 0;
    let mut i = 0;
    while i < player.active_effects.len() {
        if player.active_effects[i].expires_at <= now {
            let effect = player.active_effects.swap_remove(i);
            revert(player, effect.kind);
            expired += 1;
        } else {
            i += 1;
        }
    }
    expired
}

/// Revert and drop every active effect (player removal path). Returns the
/// number of reverted effects.
pub fn clear_all(player: &mut Player) -> usize {
    let effects = std::mem::take(&mut player.active_effects);
    let cleared = effects.len();
    for effect in effects {
        revert(player, effect.kind);
    }
    cleared
}
