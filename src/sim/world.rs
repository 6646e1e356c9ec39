//! Simulation world and the game-rule seam

use serde::{Deserialize, Serialize};

use super::collision::{Contact, Resolver};
use super::director::{Director, DirectorConfig, SpawnRequest};
use super::entity::Kind;
use super::physics::{Bounds, PhysicsConfig};
use super::store::EntityStore;
use super::tick::InputSnapshot;
use crate::config::EngineConfig;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Running,
    Paused,
    GameOver,
    Victory,
}

impl Phase {
    /// Terminal phases end the session's loop
    pub fn is_over(self) -> bool {
        matches!(self, Phase::GameOver | Phase::Victory)
    }
}

/// Everything one game session simulates
#[derive(Debug, Clone)]
pub struct World<P = ()> {
    pub store: EntityStore<P>,
    pub physics: PhysicsConfig,
    pub resolver: Resolver,
    pub director: Director,
    pub phase: Phase,
    /// Ticks advanced while running
    pub tick: u64,
    /// Simulated seconds while running
    pub elapsed: f32,
}

impl<P> World<P> {
    pub fn new(physics: PhysicsConfig, resolver: Resolver, director: DirectorConfig) -> Self {
        Self {
            store: EntityStore::new(),
            physics,
            resolver,
            director: Director::new(director),
            phase: Phase::Running,
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Build from engine config; the particle budget becomes the store's particle limit
    pub fn from_config(config: &EngineConfig, resolver: Resolver) -> Self {
        let mut world = Self::new(config.physics, resolver, config.director);
        world
            .store
            .set_limit(Kind::Particle, Some(config.max_particles()));
        world
    }

    pub fn bounds(&self) -> Bounds {
        self.physics.bounds
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Running <-> Paused; terminal phases are left alone
    pub fn toggle_pause(&mut self) -> Phase {
        self.phase = match self.phase {
            Phase::Running => Phase::Paused,
            Phase::Paused => Phase::Running,
            other => other,
        };
        log::info!("Phase: {:?}", self.phase);
        self.phase
    }

    pub fn game_over(&mut self) {
        if !self.phase.is_over() {
            log::info!("Game over at tick {}", self.tick);
            self.phase = Phase::GameOver;
        }
    }

    /// Empty the store and restart the director at wave 1
    pub fn reset(&mut self) {
        self.store.clear();
        self.director.reset();
        self.phase = Phase::Running;
        self.tick = 0;
        self.elapsed = 0.0;
    }
}

/// The rules a concrete game layers on top of the engine
///
/// Games own their score and other bookkeeping; the engine only hands them
/// spawn requests, input and contacts at the right point of each tick.
pub trait Game {
    type Payload;

    /// Create the entity (or entities) for one director spawn
    fn spawn(&mut self, request: SpawnRequest, world: &mut World<Self::Payload>);

    /// Apply the input snapshot: steering, firing, ...
    fn control(&mut self, input: &InputSnapshot, world: &mut World<Self::Payload>, dt: f32);

    /// Apply gameplay consequences of one contact
    fn on_contact(&mut self, contact: &Contact, world: &mut World<Self::Payload>);

    /// Runs after every contact has been applied, before pruning
    fn after_tick(&mut self, _world: &mut World<Self::Payload>) {}

    /// Populate a fresh world: at mount and after every reset
    fn on_reset(&mut self, _world: &mut World<Self::Payload>) {}

    /// Entities that keep the current wave open
    fn live_enemies(&self, world: &World<Self::Payload>) -> usize {
        world.store.count(Kind::Enemy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityPreset;
    use crate::sim::entity::Entity;
    use glam::Vec2;

    #[test]
    fn test_pause_toggle() {
        let mut world: World = World::new(PhysicsConfig::default(), Resolver::default(), DirectorConfig::default());
        assert_eq!(world.toggle_pause(), Phase::Paused);
        assert_eq!(world.toggle_pause(), Phase::Running);
        world.game_over();
        assert_eq!(world.toggle_pause(), Phase::GameOver);
    }

    #[test]
    fn test_from_config_sets_particle_limit() {
        let config = EngineConfig::from_preset(QualityPreset::Low);
        let world: World = World::from_config(&config, Resolver::default());
        assert_eq!(world.store.limit(Kind::Particle), Some(100));
    }

    #[test]
    fn test_reset() {
        let mut world: World = World::new(PhysicsConfig::default(), Resolver::default(), DirectorConfig::default());
        world.store.add(Entity::circle(Kind::Enemy, Vec2::ZERO, 4.0, ()));
        world.director.start();
        world.director.skip_wave();
        world.tick = 40;
        world.game_over();

        world.reset();
        assert!(world.store.is_empty());
        assert_eq!(world.director.wave(), 1);
        assert_eq!(world.phase, Phase::Running);
        assert_eq!(world.tick, 0);
    }
}
