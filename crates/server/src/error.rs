//! Engine error types.

use thiserror::Error;

/// Errors raised by the simulation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An unknown obstacle kind was requested (template or command input).
    #[error("Unknown obstacle kind: {0}")]
    UnknownObstacleKind(String),

    /// An unknown power-up kind was requested.
    #[error("Unknown power-up kind: {0}")]
    UnknownPowerUpKind(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transient per-tick subsystem fault, carried across the fault boundary.
    #[error("Subsystem '{name}' failed: {reason}")]
    Subsystem { name: &'static str, reason: String },
}

impl EngineError {
    /// Wrap an arbitrary failure as a subsystem fault.
    pub fn subsystem(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Subsystem {
            name,
            reason: reason.into(),
        }
    }
}
