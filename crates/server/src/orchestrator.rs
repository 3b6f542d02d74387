//! Tick orchestration with per-subsystem fault isolation.
//!
//! Subsystems are run in a fixed order behind a uniform trait, each inside
//! its own fault boundary: a failing update is logged, counted, and answered
//! with that subsystem's bounded recovery. One subsystem's fault never
//! aborts the tick; the orchestrator always reaches the broadcast step.

use crate::config::Config;
use crate::effect::Consumption;
use crate::error::EngineError;
use crate::stores::{FoodStore, ObstacleStore, PowerUpStore};
use crate::world::WorldState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A subsystem is flagged unhealthy after this long without an update.
pub const STALE_AFTER_MS: u64 = 30_000;
/// ... or after accumulating this many errors.
pub const MAX_ERRORS: u32 = 5;

/// Mutable world context handed to each subsystem for one tick.
pub struct TickContext<'a> {
    pub world: &'a mut WorldState,
    pub food: &'a mut FoodStore,
    pub power_ups: &'a mut PowerUpStore,
    pub obstacles: &'a mut ObstacleStore,
    pub config: &'a Config,
    /// Wall-clock milliseconds for this tick.
    pub now: u64,
    /// Tick delta in seconds.
    pub dt: f32,
    /// Consumptions recorded by the collision subsystem, consumed by combo.
    pub consumptions: Vec<Consumption>,
}

/// One orchestrated simulation subsystem.
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// Per-tick update. An error here is isolated by the orchestrator.
    fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EngineError>;

    /// Bounded local recovery after a failed update. Never re-raised into
    /// the tick; a failure here only leaves the subsystem unhealthy.
    fn recover(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EngineError>;
}

/// Health bookkeeping for one subsystem.
#[derive(Debug, Clone)]
pub struct SubsystemHealth {
    pub healthy: bool,
    pub error_count: u32,
    /// Wall-clock ms of the last successful update.
    pub last_update: Option<u64>,
    pub last_duration: Duration,
}

impl Default for SubsystemHealth {
    fn default() -> Self {
        Self {
            healthy: true,
            error_count: 0,
            last_update: None,
            last_duration: Duration::ZERO,
        }
    }
}

/// Runs every subsystem once per tick inside a fault boundary.
pub struct Orchestrator {
    systems: Vec<Box<dyn Subsystem>>,
    health: HashMap<&'static str, SubsystemHealth>,
}

impl Orchestrator {
    pub fn new(systems: Vec<Box<dyn Subsystem>>) -> Self {
        let health = systems
            .iter()
            .map(|s| (s.name(), SubsystemHealth::default()))
            .collect();
        Self { systems, health }
    }

    /// Run one tick across all subsystems, in registration order.
    pub fn run_tick(&mut self, ctx: &mut TickContext<'_>) {
        for system in &mut self.systems {
            let name = system.name();
            let start = Instant::now();
            match system.update(ctx) {
                Ok(()) => {
                    let entry = self.health.entry(name).or_default();
                    entry.last_duration = start.elapsed();
                    entry.last_update = Some(ctx.now);
                    entry.healthy = true;
                }
                Err(err) => {
                    let entry = self.health.entry(name).or_default();
                    entry.error_count += 1;
                    entry.healthy = false;
                    error!(
                        subsystem = name,
                        error = %err,
                        errors = entry.error_count,
                        last_update = ?entry.last_update,
                        "Subsystem update failed, running recovery"
                    );
                    match system.recover(ctx) {
                        Ok(()) => warn!(subsystem = name, "Subsystem recovery completed"),
                        Err(recover_err) => {
                            // Distinct event; the subsystem stays unhealthy
                            // until a future tick succeeds.
                            error!(
                                subsystem = name,
                                error = %recover_err,
                                "Subsystem recovery failed"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Periodic health sweep: observability only, no restarts. Flags
    /// subsystems that are stale or error-saturated and logs the aggregate.
    pub fn health_report(&mut self, now: u64) {
        let mut unhealthy = Vec::new();
        for (name, entry) in &mut self.health {
            let stale = entry
                .last_update
                .is_none_or(|t| now.saturating_sub(t) > STALE_AFTER_MS);
            if stale || entry.error_count >= MAX_ERRORS {
                entry.healthy = false;
            }
            if !entry.healthy {
                unhealthy.push(*name);
            }
        }

        if unhealthy.is_empty() {
            info!(subsystems = self.health.len(), "Health check: all subsystems healthy");
        } else {
            warn!(?unhealthy, "Health check: degraded subsystems");
        }
    }

    pub fn health(&self) -> &HashMap<&'static str, SubsystemHealth> {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts successful updates.
    struct Heartbeat {
        name: &'static str,
        updates: std::sync::Arc<std::sync::atomic::AtomicU32>,
    }

    impl Subsystem for Heartbeat {
        fn name(&self) -> &'static str {
            self.name
        }
        fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            self.updates
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Ok(())
        }
        fn recover(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            Ok(())
        }
    }

    /// Fails every update; recovery also fails.
    struct AlwaysFailing;

    impl Subsystem for AlwaysFailing {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            Err(EngineError::subsystem("broken", "synthetic failure"))
        }
        fn recover(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
            Err(EngineError::subsystem("broken", "recovery failure"))
        }
    }

    fn run_ticks(orchestrator: &mut Orchestrator, ticks: u64) {
        let config = Config::default();
        let mut world = WorldState::new(config.world.size, config.world.room.clone());
        let mut food = FoodStore::new(config.world.size);
        let mut power_ups = PowerUpStore::new(config.world.size);
        let mut obstacles = ObstacleStore::new(config.world.size);

        for tick in 0..ticks {
            let mut ctx = TickContext {
                world: &mut world,
                food: &mut food,
                power_ups: &mut power_ups,
                obstacles: &mut obstacles,
                config: &config,
                now: 1_000 + tick * 16,
                dt: 0.016,
                consumptions: Vec::new(),
            };
            orchestrator.run_tick(&mut ctx);
        }
    }

    #[test]
    fn faulting_subsystem_never_aborts_the_tick() {
        let updates = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let mut orchestrator = Orchestrator::new(vec![
            Box::new(AlwaysFailing),
            Box::new(Heartbeat {
                name: "heartbeat",
                updates: updates.clone(),
            }),
        ]);

        run_ticks(&mut orchestrator, 12);

        // The broken subsystem errored every tick...
        let broken = &orchestrator.health()["broken"];
        assert_eq!(broken.error_count, 12);
        assert!(!broken.healthy);
        assert!(broken.last_update.is_none());

        // ...while the healthy one kept updating through all 12 ticks.
        let beat = &orchestrator.health()["heartbeat"];
        assert!(beat.healthy);
        assert_eq!(updates.load(std::sync::atomic::Ordering::Relaxed), 12);
        assert_eq!(beat.last_update, Some(1_000 + 11 * 16));
    }

    #[test]
    fn health_report_flags_error_saturation() {
        let mut orchestrator = Orchestrator::new(vec![Box::new(AlwaysFailing)]);
        run_ticks(&mut orchestrator, MAX_ERRORS as u64);
        orchestrator.health_report(2_000);
        assert!(!orchestrator.health()["broken"].healthy);
    }

    #[test]
    fn health_report_flags_staleness() {
        let updates = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let mut orchestrator = Orchestrator::new(vec![Box::new(Heartbeat {
            name: "heartbeat",
            updates,
        })]);
        run_ticks(&mut orchestrator, 1);

        // Fresh: healthy.
        orchestrator.health_report(1_100);
        assert!(orchestrator.health()["heartbeat"].healthy);

        // No updates for longer than the staleness window.
        orchestrator.health_report(1_000 + STALE_AFTER_MS + 1);
        assert!(!orchestrator.health()["heartbeat"].healthy);
    }
}
