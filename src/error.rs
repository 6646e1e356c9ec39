//! Engine error types
//!
//! Teardown paths (`stop`, `cleanup`, `unmount`) never return errors; everything
//! else that can fail returns `Result<_, EngineError>`.

use thiserror::Error;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The host could not provide a required primitive (canvas, context, timer)
    #[error("host error: {0}")]
    Host(String),

    /// Configuration JSON could not be parsed or written
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A configuration value that would break a loop, integrator or director invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tick rate must be a positive finite number of hertz, got {0}")]
    InvalidTickRate(f32),

    #[error("friction factor must be in (0, 1], got {0}")]
    InvalidFriction(f32),
    #[error("offscreen margin must be a non-negative finite distance, got {0}")]
    InvalidMargin(f32),

    #[error("playfield bounds must be positive, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },

    #[error("spawn interval must be at least {min}s, got {got}s")]
    InvalidSpawnInterval { got: f32, min: f32 },

    #[error("spawn chance must be in (0, 1], got {0}")]
    InvalidSpawnChance(f32),

    #[error("spawn rate must be a positive finite number per second, got {0}")]
    InvalidSpawnRate(f32),

    #[error("wave {wave} quota {quota} exceeds the hard spawn cap {cap} and the curve has no cap")]
    UnboundedQuota { wave: u32, quota: u32, cap: u32 },

    #[error("max spawns per tick must be at least 1")]
    ZeroSpawnsPerTick,

    #[error("grace delay must be a non-negative finite number of seconds, got {0}")]
    InvalidGrace(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: EngineError = ConfigError::InvalidTickRate(0.0).into();
        assert!(matches!(err, EngineError::Config(ConfigError::InvalidTickRate(_))));
        assert!(err.to_string().contains("tick rate"));
    }
}
