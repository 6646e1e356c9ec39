//! Per-tick data flow
//!
//! One call advances a world by exactly one step, in a fixed order:
//! input, director, integration and lifetimes, contacts, game rules, prune.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Contact;
use super::director::WavePhase;
use super::physics::integrate;
use super::world::{Game, Phase, World};

/// Input commands for a single tick (deterministic)
///
/// An immutable copy of the sampler state, so every system in a tick sees the
/// same keys even if host events arrive mid-tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Held keys, lowercase
    pub keys: BTreeSet<String>,
    /// Held pointer buttons
    pub buttons: BTreeSet<u16>,
    /// Last known pointer position in playfield coordinates
    pub pointer: Option<Vec2>,
}

impl InputSnapshot {
    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    pub fn any_pressed(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.is_pressed(k))
    }

    pub fn is_button_down(&self, button: u16) -> bool {
        self.buttons.contains(&button)
    }

    /// -1, 0 or 1 from a pair of opposing key sets
    pub fn axis(&self, negative: &[&str], positive: &[&str]) -> f32 {
        let mut value = 0.0;
        if self.any_pressed(negative) {
            value -= 1.0;
        }
        if self.any_pressed(positive) {
            value += 1.0;
        }
        value
    }

    /// Snapshot with only `keys` held
    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_lowercase()).collect(),
            ..Self::default()
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub contacts: Vec<Contact>,
    /// Director spawns requested this tick
    pub spawned: u32,
    /// Entities physically removed at the end of the tick
    pub pruned: usize,
}

/// Advance the world by one fixed step
///
/// Paused and finished worlds are left untouched.
pub fn tick<G: Game>(world: &mut World<G::Payload>, game: &mut G, input: &InputSnapshot, dt: f32) -> TickReport {
    if world.phase != Phase::Running {
        return TickReport::default();
    }

    world.tick += 1;
    world.elapsed += dt;

    game.control(input, world, dt);

    // Director decides from the enemy count before this tick's spawns
    let live = game.live_enemies(world);
    let mut requests = Vec::new();
    let spawned = world.director.update(dt, live, |req| requests.push(req));
    for request in requests {
        game.spawn(request, world);
    }

    let escaped = integrate(&mut world.store, &world.physics, dt);
    let expired = world.store.advance_lifetimes(dt);
    if escaped + expired > 0 {
        log::trace!("tick {}: {} escaped, {} expired", world.tick, escaped, expired);
    }

    let contacts = world.resolver.resolve(&world.store);
    for contact in &contacts {
        game.on_contact(contact, world);
    }
    game.after_tick(world);

    world.store.remove_where(|e| e.is_dead());
    let pruned = world.store.flush();

    if world.director.phase() == WavePhase::Victory && world.phase == Phase::Running {
        log::info!("Victory at tick {}", world.tick);
        world.phase = Phase::Victory;
    }

    TickReport {
        contacts,
        spawned,
        pruned,
    }
}
