//! Engine configuration
//!
//! Persisted as JSON: LocalStorage in the browser, the file named by
//! `ARCADE_CONFIG` on native builds.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};
use crate::platform::scheduler::TickMode;
use crate::sim::director::DirectorConfig;
use crate::sim::physics::PhysicsConfig;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Everything a game session needs besides its own rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick source: fixed-step for deterministic physics, display-synced otherwise
    pub tick: TickMode,
    pub physics: PhysicsConfig,
    pub director: DirectorConfig,
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Particle effects (explosions, sparks, etc.)
    pub particles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: TickMode::default(),
            physics: PhysicsConfig::default(),
            director: DirectorConfig::default(),
            quality: QualityPreset::Medium,
            particles: true,
        }
    }
}

impl EngineConfig {
    /// LocalStorage key
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "arcade_core_config";

    /// Environment variable naming the native config file
    pub const CONFIG_ENV: &'static str = "ARCADE_CONFIG";

    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle budget
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tick.validate()?;
        self.physics.validate()?;
        self.director.validate()
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config from LocalStorage");
                        return config;
                    }
                    Err(err) => log::warn!("Stored config rejected: {err}"),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save configuration to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            match self.to_json() {
                Ok(json) => {
                    if storage.set_item(Self::STORAGE_KEY, &json).is_err() {
                        log::warn!("Config save failed: storage refused write");
                    } else {
                        log::info!("Config saved");
                    }
                }
                Err(err) => log::warn!("Config save failed: {err}"),
            }
        }
    }

    /// Load from the file named by `ARCADE_CONFIG`, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::CONFIG_ENV) else {
            log::info!("Using default config");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded config from {path}");
                config
            }
            Err(err) => {
                log::warn!("Config {path} rejected ({err}); using defaults");
                Self::default()
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        let Ok(path) = std::env::var(Self::CONFIG_ENV) else {
            log::debug!("{} not set; config not saved", Self::CONFIG_ENV);
            return;
        };
        match self.save_to(&path) {
            Ok(()) => log::info!("Config saved to {path}"),
            Err(err) => log::warn!("Config save to {path} failed: {err}"),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: impl AsRef<std::path::Path>) -> Result<(), EngineError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::director::SpawnModel;
    use crate::sim::physics::Boundary;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_quality_presets() {
        assert_eq!(QualityPreset::Low.max_particles(), 100);
        assert_eq!(QualityPreset::Medium.max_particles(), 500);
        assert_eq!(QualityPreset::High.max_particles(), 2000);
        assert_eq!(QualityPreset::from_name("MED"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_name("ultra"), None);

        let mut config = EngineConfig::from_preset(QualityPreset::High);
        assert_eq!(config.max_particles(), 2000);
        config.particles = false;
        assert_eq!(config.max_particles(), 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "quality": "High", "physics": { "boundary": "Wrap" } }"#).unwrap();
        assert_eq!(config.quality, QualityPreset::High);
        assert_eq!(config.physics.boundary, Boundary::Wrap);
        assert_eq!(config.director, DirectorConfig::default());
        assert!(config.particles);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.tick = TickMode::DisplaySync;
        config.director.model = SpawnModel::Rate { per_second: 2.5 };
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json(r#"{ "tick": { "FixedStep": { "hz": 0.0 } } }"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::InvalidTickRate(_))));

        let json = r#"{ "physics": { "boundary": { "Unbounded": { "margin": -60.0 } } } }"#;
        let err = EngineConfig::from_json(json).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::InvalidMargin(_))));

        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("arcade_core_config_{}.json", std::process::id()));
        let config = EngineConfig::from_preset(QualityPreset::Low);
        config.save_to(&path).unwrap();
        let loaded = EngineConfig::load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::load_from("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
