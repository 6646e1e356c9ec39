//! Arcade Core - shared real-time simulation engine for 2D canvas games
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, physics, collisions, waves)
//! - `platform`: Tick sources, input sampling, teardown, host bindings
//! - `renderer`: Draw-API agnostic render adapter
//! - `session`: One mounted game wired to a loop, input and renderer
//! - `config`: Data-driven engine configuration

pub mod config;
pub mod demo;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod session;
pub mod sim;

pub use config::{EngineConfig, QualityPreset};
pub use error::{ConfigError, EngineError};
pub use platform::input::create_input_sampler;
pub use platform::scheduler::create_loop;
pub use session::Session;
pub use sim::collision::collide;

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Default fixed simulation rate (Hz)
    pub const DEFAULT_TICK_HZ: f32 = 60.0;
    /// Maximum fixed-step ticks run per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest measured delta accepted in display-synced mode (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Default playfield dimensions (matches the 800x600 game canvases)
    pub const DEFAULT_WIDTH: f32 = 800.0;
    pub const DEFAULT_HEIGHT: f32 = 600.0;

    /// How far an unbounded entity may drift outside the playfield before pruning
    pub const OFFSCREEN_MARGIN: f32 = 64.0;

    /// Absolute ceiling on spawns in one wave, used when a wave curve has no cap
    pub const HARD_SPAWN_CAP: u32 = 500;
    /// Smallest cadence interval accepted by the spawn director (seconds)
    pub const MIN_SPAWN_INTERVAL: f32 = 1.0 / 120.0;
}

/// Fallback direction used when a vector cannot be normalized
pub const DEFAULT_DIRECTION: Vec2 = Vec2::X;

/// Clamp a value into `[min, max]`; NaN collapses to `min`
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Euclidean distance between two points
#[inline]
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Unit vector from `from` toward `to`, or [`DEFAULT_DIRECTION`] when the points coincide
#[inline]
pub fn direction_or_default(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).try_normalize().unwrap_or(DEFAULT_DIRECTION)
}

/// True if a box at `pos` (top-left) with `size` overlaps the `[0, width] x [0, height]` area
#[inline]
pub fn is_in_bounds(pos: Vec2, size: Vec2, width: f32, height: f32) -> bool {
    pos.x + size.x >= 0.0 && pos.x <= width && pos.y + size.y >= 0.0 && pos.y <= height
}
