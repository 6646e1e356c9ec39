//! Deterministic simulation module
//!
//! All gameplay state lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (kind, then insertion)
//! - No rendering or platform dependencies

pub mod broadphase;
pub mod collision;
pub mod director;
pub mod entity;
pub mod physics;
pub mod store;
pub mod tick;
pub mod world;

pub use collision::{Collider, Contact, ContactPolicy, PairRule, Resolver, collide, detect};
pub use director::{Director, DirectorConfig, SpawnModel, SpawnRequest, WaveCurve, WavePhase, WaveState};
pub use entity::{Entity, EntityId, Kind, Lifetime, Shape};
pub use physics::{Boundary, Bounds, PhysicsConfig, integrate};
pub use store::EntityStore;
pub use tick::{InputSnapshot, TickReport, tick};
pub use world::{Game, Phase, World};
