//! Spawn/wave director
//!
//! State machine: Idle -> Spawning -> WaveComplete -> (Idle | Victory).
//! Spawns are counted, never inferred from elapsed time, so a wave can never
//! exceed its quota no matter how the frame rate behaves.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{HARD_SPAWN_CAP, MIN_SPAWN_INTERVAL};
use crate::error::ConfigError;

/// Current director phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Waiting for a start signal (or the auto-start delay)
    Idle,
    /// Spawning toward the wave quota
    Spawning,
    /// Quota reached and field cleared; grace delay running
    WaveComplete,
    /// Final wave cleared
    Victory,
}

/// Difficulty curve: `quota(wave) = min(cap, base + wave * step)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveCurve {
    pub base: u32,
    pub step: u32,
    pub cap: Option<u32>,
    /// Last wave to play; clearing it means victory
    pub final_wave: Option<u32>,
}

impl Default for WaveCurve {
    fn default() -> Self {
        Self {
            base: 3,
            step: 2,
            cap: Some(40),
            final_wave: None,
        }
    }
}

impl WaveCurve {
    pub fn quota(&self, wave: u32) -> u32 {
        let raw = self.base.saturating_add(wave.saturating_mul(self.step));
        match self.cap {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// First wave whose quota would pass the hard cap, for uncapped curves
    fn first_unbounded_wave(&self) -> Option<u32> {
        if self.cap.is_some() {
            return None;
        }
        let wave = if self.step == 0 {
            if self.base > HARD_SPAWN_CAP { 1 } else { return None }
        } else {
            HARD_SPAWN_CAP.saturating_sub(self.base) / self.step + 1
        };
        match self.final_wave {
            Some(last) if wave > last => None,
            _ => Some(wave),
        }
    }
}

/// When new entities appear while spawning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpawnModel {
    /// One spawn every `interval` seconds of simulated time
    Cadence { interval: f32 },
    /// Roll `chance` once per tick (frame-rate dependent)
    PerTick { chance: f32 },
    /// Roll with `1 - e^(-per_second * dt)`, independent of tick rate
    Rate { per_second: f32 },
}

impl Default for SpawnModel {
    fn default() -> Self {
        SpawnModel::Cadence { interval: 1.0 }
    }
}

/// Director configuration supplied by each game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub curve: WaveCurve,
    pub model: SpawnModel,
    /// Seconds between WaveComplete and the next Idle
    pub grace: f32,
    /// Start spawning automatically after this many idle seconds
    pub auto_start: Option<f32>,
    /// Upper bound on spawns in a single tick
    pub max_per_tick: u32,
    /// RNG seed for the probability models
    pub seed: u64,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            curve: WaveCurve::default(),
            model: SpawnModel::default(),
            grace: 2.0,
            auto_start: Some(1.0),
            max_per_tick: 4,
            seed: 0x5eed,
        }
    }
}

impl DirectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.model {
            SpawnModel::Cadence { interval } => {
                if !(interval >= MIN_SPAWN_INTERVAL && interval.is_finite()) {
                    return Err(ConfigError::InvalidSpawnInterval {
                        got: interval,
                        min: MIN_SPAWN_INTERVAL,
                    });
                }
            }
            SpawnModel::PerTick { chance } => {
                if !(chance > 0.0 && chance <= 1.0) {
                    return Err(ConfigError::InvalidSpawnChance(chance));
                }
            }
            SpawnModel::Rate { per_second } => {
                if !(per_second > 0.0 && per_second.is_finite()) {
                    return Err(ConfigError::InvalidSpawnRate(per_second));
                }
            }
        }
        if self.max_per_tick == 0 {
            return Err(ConfigError::ZeroSpawnsPerTick);
        }
        if !(self.grace >= 0.0 && self.grace.is_finite()) {
            return Err(ConfigError::InvalidGrace(self.grace));
        }
        if let Some(wave) = self.curve.first_unbounded_wave() {
            return Err(ConfigError::UnboundedQuota {
                wave,
                quota: self.curve.quota(wave),
                cap: HARD_SPAWN_CAP,
            });
        }
        Ok(())
    }

    /// Copy with every invalid value replaced by a safe one
    pub fn sanitized(&self) -> Self {
        let mut cfg = *self;
        cfg.model = match cfg.model {
            SpawnModel::Cadence { interval } if !(interval >= MIN_SPAWN_INTERVAL && interval.is_finite()) => {
                SpawnModel::Cadence {
                    interval: MIN_SPAWN_INTERVAL,
                }
            }
            SpawnModel::PerTick { chance } if !(chance > 0.0 && chance <= 1.0) => SpawnModel::PerTick {
                chance: if chance > 1.0 { 1.0 } else { 0.01 },
            },
            SpawnModel::Rate { per_second } if !(per_second > 0.0 && per_second.is_finite()) => {
                SpawnModel::Rate { per_second: 1.0 }
            }
            model => model,
        };
        cfg.max_per_tick = cfg.max_per_tick.max(1);
        if !(cfg.grace >= 0.0 && cfg.grace.is_finite()) {
            cfg.grace = 0.0;
        }
        if cfg.curve.first_unbounded_wave().is_some() {
            cfg.curve.cap = Some(HARD_SPAWN_CAP);
        }
        cfg
    }
}

/// One entity the game should create now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub wave: u32,
    /// 0-based position of this spawn within its wave
    pub index: u32,
    pub quota: u32,
}

/// Serializable wave progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveState {
    /// 1-based wave index; never decreases until reset
    pub wave: u32,
    pub phase: WavePhase,
    pub spawned: u32,
    pub quota: u32,
    /// Phase-local timer: auto-start delay, cadence accumulator or grace delay
    pub timer: f32,
}

/// Drives spawn cadence and wave escalation
#[derive(Debug, Clone)]
pub struct Director {
    config: DirectorConfig,
    state: WaveState,
    rng: Pcg32,
}

impl Director {
    /// Create a director; invalid configuration is logged and replaced with safe values
    pub fn new(config: DirectorConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log::warn!("Director config rejected ({err}); falling back to safe values");
                config.sanitized()
            }
        };
        Self {
            state: Self::initial_state(&config),
            rng: Pcg32::seed_from_u64(config.seed),
            config,
        }
    }

    fn initial_state(config: &DirectorConfig) -> WaveState {
        WaveState {
            wave: 1,
            phase: WavePhase::Idle,
            spawned: 0,
            quota: config.curve.quota(1),
            timer: 0.0,
        }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn state(&self) -> WaveState {
        self.state
    }

    pub fn phase(&self) -> WavePhase {
        self.state.phase
    }

    pub fn wave(&self) -> u32 {
        self.state.wave
    }

    pub fn quota(&self) -> u32 {
        self.state.quota
    }

    pub fn spawned(&self) -> u32 {
        self.state.spawned
    }

    /// Back to wave 1, reseeding the RNG
    pub fn reset(&mut self) {
        self.state = Self::initial_state(&self.config);
        self.rng = Pcg32::seed_from_u64(self.config.seed);
    }

    /// Explicit start signal; returns false unless the director was idle
    pub fn start(&mut self) -> bool {
        if self.state.phase != WavePhase::Idle {
            return false;
        }
        self.state.phase = WavePhase::Spawning;
        self.state.timer = 0.0;
        log::info!("Wave {} started (quota {})", self.state.wave, self.state.quota);
        true
    }

    /// Abandon the current wave and move to the next one
    pub fn skip_wave(&mut self) {
        if self.state.phase != WavePhase::Victory {
            self.advance_wave();
        }
    }

    fn past_final_wave(&self) -> bool {
        self.config
            .curve
            .final_wave
            .is_some_and(|last| self.state.wave > last)
    }

    fn advance_wave(&mut self) {
        self.state.wave += 1;
        self.state.spawned = 0;
        self.state.timer = 0.0;
        if self.past_final_wave() {
            self.state.phase = WavePhase::Victory;
            log::info!("Final wave cleared - victory");
            return;
        }
        self.state.quota = self.config.curve.quota(self.state.wave);
        self.state.phase = WavePhase::Idle;
        log::info!("Wave {} ready (quota {})", self.state.wave, self.state.quota);
    }

    /// Number of spawns due this tick under the configured model
    fn due(&mut self, dt: f32) -> u32 {
        match self.config.model {
            SpawnModel::Cadence { interval } => {
                self.state.timer += dt;
                let due = (self.state.timer / interval).floor();
                self.state.timer -= due * interval;
                due as u32
            }
            SpawnModel::PerTick { chance } => u32::from(self.rng.random::<f32>() < chance),
            SpawnModel::Rate { per_second } => {
                let chance = 1.0 - (-per_second * dt).exp();
                u32::from(self.rng.random::<f32>() < chance)
            }
        }
    }

    /// Advance one tick
    ///
    /// `live_enemies` is the count of wave entities still alive before this
    /// tick's spawns. `spawn` is called once per entity the game must create.
    /// Returns how many spawns were requested.
    pub fn update(&mut self, dt: f32, live_enemies: usize, mut spawn: impl FnMut(SpawnRequest)) -> u32 {
        if matches!(self.state.phase, WavePhase::Spawning | WavePhase::WaveComplete)
            && self.past_final_wave()
        {
            self.state.phase = WavePhase::Victory;
            return 0;
        }

        match self.state.phase {
            WavePhase::Idle => {
                if let Some(delay) = self.config.auto_start {
                    self.state.timer += dt;
                    if self.state.timer >= delay {
                        self.start();
                    }
                }
                0
            }
            WavePhase::Spawning => {
                let remaining = self.state.quota.saturating_sub(self.state.spawned);
                let mut count = 0;
                if remaining > 0 {
                    count = self.due(dt).min(remaining).min(self.config.max_per_tick);
                    for _ in 0..count {
                        spawn(SpawnRequest {
                            wave: self.state.wave,
                            index: self.state.spawned,
                            quota: self.state.quota,
                        });
                        self.state.spawned += 1;
                    }
                    if count > 0 {
                        log::debug!(
                            "Wave {}: spawned {}/{}",
                            self.state.wave,
                            self.state.spawned,
                            self.state.quota
                        );
                    }
                }

                if self.state.spawned >= self.state.quota && live_enemies == 0 && count == 0 {
                    self.state.phase = WavePhase::WaveComplete;
                    self.state.timer = 0.0;
                    log::info!("Wave {} complete", self.state.wave);
                }
                count
            }
            WavePhase::WaveComplete => {
                self.state.timer += dt;
                if self.state.timer >= self.config.grace {
                    self.advance_wave();
                }
                0
            }
            WavePhase::Victory => 0,
        }
    }
}
