//! Blob Arena game server library.

pub mod ai;
pub mod collision;
pub mod combo;
pub mod config;
pub mod effect;
pub mod entity;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod server;
pub mod spatial;
pub mod stores;
pub mod systems;
pub mod world;

pub use config::Config;
pub use error::EngineError;
pub use server::{Engine, run};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. All cooldowns, effect expiries and
/// snapshot timestamps compare against this clock.
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
