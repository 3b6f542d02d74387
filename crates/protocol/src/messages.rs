//! Client intents and server messages.
//!
//! All messages cross the wire as tagged JSON. Intents are trusted as-is;
//! plausibility checks live outside this boundary.

use crate::{Color, ProtocolError};
use serde::{Deserialize, Serialize};

// ── Client → Server ──

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    Join {
        name: String,
    },
    /// Client-reported position and velocity, applied last-write-wins.
    Move {
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    Split,
    Eject,
}

impl ClientIntent {
    /// Decode a single text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        if frame.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        Ok(serde_json::from_str(frame)?)
    }
}

// ── Server → Client ──

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        player_id: String,
        world_size: f32,
        room: String,
        /// Obstacles are static for the lifetime of a world and sent once.
        obstacles: Vec<ObstacleView>,
    },
    Snapshot(Snapshot),
    Dead {
        score: u64,
    },
    Error {
        message: String,
    },
}

/// Per-tick world snapshot. Flat arrays, no delta compression.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub players: Vec<PlayerView>,
    pub food: Vec<FoodView>,
    pub power_ups: Vec<PowerUpView>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub mass: f32,
    pub color: Color,
    pub is_ai: bool,
    pub score: u64,
    /// Active power-up kind names, one entry per stack.
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub kind: String,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleView {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub health: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
}

// ── Ops tooling ──

/// Aggregate health/metrics report, polled read-only by ops tooling.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Per-subsystem healthy flag.
    pub health: std::collections::BTreeMap<String, bool>,
    /// Per-subsystem timing and error counters.
    pub metrics: std::collections::BTreeMap<String, SubsystemMetrics>,
    pub player_counts: PlayerCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemMetrics {
    /// Last update duration in milliseconds.
    pub update_time: f64,
    pub error_count: u32,
    /// Milliseconds since the Unix epoch of the last successful update.
    pub last_update: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCounts {
    pub humans: usize,
    pub ai: usize,
    pub total: usize,
}
