//! Shared protocol crate for the Blob Arena server.
//!
//! This crate contains:
//! - Client intent and server message definitions (tagged JSON)
//! - Snapshot and metrics report shapes
//! - Shared types (Color)

mod error;
pub mod messages;

pub use error::ProtocolError;

use serde::{Deserialize, Serialize};

/// RGB color used for blobs and food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
