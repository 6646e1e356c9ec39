//! Entity types shared by every game built on the engine
//!
//! Entities are plain values owned by the [`EntityStore`](super::store::EntityStore).
//! They never point at each other; relationships such as "nearest enemy" are
//! recomputed each tick by querying the store.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Collider;
use super::physics::Boundary;

/// Stable identifier assigned by the store, never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Entity variant tag
///
/// Declaration order is the store's iteration order across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    Ship,
    Projectile,
    Obstacle,
    Particle,
    PowerUp,
    Enemy,
}

impl Kind {
    /// All kinds in iteration order
    pub const ALL: [Kind; 6] = [
        Kind::Ship,
        Kind::Projectile,
        Kind::Obstacle,
        Kind::Particle,
        Kind::PowerUp,
        Kind::Enemy,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Collision/draw shape, centered on the entity position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl Shape {
    /// Half extents of the shape's bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { width, height } => Vec2::new(width / 2.0, height / 2.0),
        }
    }
}

/// Remaining lifetime of an entity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Lifetime {
    /// Player-controlled or otherwise permanent
    #[default]
    Infinite,
    /// Frames remaining
    Ticks(u32),
    /// Seconds remaining
    Seconds(f32),
}

impl Lifetime {
    /// Count down by one tick of `dt` seconds; returns true once expired
    pub fn advance(&mut self, dt: f32) -> bool {
        match self {
            Lifetime::Infinite => false,
            Lifetime::Ticks(ticks) => {
                *ticks = ticks.saturating_sub(1);
                *ticks == 0
            }
            Lifetime::Seconds(secs) => {
                *secs = (*secs - dt).max(0.0);
                *secs <= 0.0
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        !matches!(self, Lifetime::Infinite)
    }

    pub fn is_expired(&self) -> bool {
        match *self {
            Lifetime::Infinite => false,
            Lifetime::Ticks(ticks) => ticks == 0,
            Lifetime::Seconds(secs) => secs <= 0.0,
        }
    }
}

/// A simulated object
///
/// `P` is the game-supplied payload (cooldowns, score value, visual tag...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity<P = ()> {
    /// Assigned by the store on insert
    pub id: EntityId,
    pub kind: Kind,
    /// Center position
    pub pos: Vec2,
    /// Optional depth for pseudo-3D parallax (0 = playfield plane)
    #[serde(default)]
    pub z: Option<f32>,
    pub vel: Vec2,
    #[serde(default)]
    pub accel: Vec2,
    pub shape: Shape,
    #[serde(default)]
    pub lifetime: Lifetime,
    /// Overrides the world boundary policy for this entity
    #[serde(default)]
    pub boundary: Option<Boundary>,
    /// Infinite mass: the integrator never moves it
    #[serde(default)]
    pub pinned: bool,
    /// Hit points, for kinds that can be destroyed by damage
    #[serde(default)]
    pub health: Option<i32>,
    pub payload: P,
}

impl<P> Entity<P> {
    /// Create an entity at `pos`; the id is assigned when it is added to a store
    pub fn new(kind: Kind, pos: Vec2, shape: Shape, payload: P) -> Self {
        Self {
            id: EntityId(0),
            kind,
            pos,
            z: None,
            vel: Vec2::ZERO,
            accel: Vec2::ZERO,
            shape,
            lifetime: Lifetime::Infinite,
            boundary: None,
            pinned: false,
            health: None,
            payload,
        }
    }

    /// Circle-shaped entity
    pub fn circle(kind: Kind, pos: Vec2, radius: f32, payload: P) -> Self {
        Self::new(kind, pos, Shape::Circle { radius }, payload)
    }

    /// Box-shaped entity
    pub fn rect(kind: Kind, pos: Vec2, width: f32, height: f32, payload: P) -> Self {
        Self::new(kind, pos, Shape::Rect { width, height }, payload)
    }

    pub fn with_vel(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_accel(mut self, accel: Vec2) -> Self {
        self.accel = accel;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_health(mut self, health: i32) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_depth(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// World-space collider for this entity
    #[inline]
    pub fn collider(&self) -> Collider {
        Collider::new(self.pos, self.shape)
    }

    /// Apply damage; returns true if health dropped to zero or below
    pub fn damage(&mut self, amount: i32) -> bool {
        match self.health.as_mut() {
            Some(hp) => {
                *hp -= amount;
                *hp <= 0
            }
            None => false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_some_and(|hp| hp <= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_lifetime_expires_on_zero() {
        let mut life = Lifetime::Ticks(2);
        assert!(!life.advance(1.0 / 60.0));
        assert!(life.advance(1.0 / 60.0));
        assert!(life.is_expired());
        // Stays expired
        assert!(life.advance(1.0 / 60.0));
    }

    #[test]
    fn test_seconds_lifetime() {
        let mut life = Lifetime::Seconds(0.05);
        assert!(!life.advance(0.02));
        assert!(!life.advance(0.02));
        assert!(life.advance(0.02));
    }

    #[test]
    fn test_infinite_never_expires() {
        let mut life = Lifetime::Infinite;
        for _ in 0..1000 {
            assert!(!life.advance(1.0));
        }
        assert!(!life.is_finite());
    }

    #[test]
    fn test_damage() {
        let mut e = Entity::circle(Kind::Enemy, Vec2::ZERO, 5.0, ()).with_health(3);
        assert!(!e.damage(2));
        assert!(e.damage(1));
        assert!(e.is_dead());

        // No health means damage is ignored
        let mut rock = Entity::circle(Kind::Obstacle, Vec2::ZERO, 5.0, ());
        assert!(!rock.damage(100));
        assert!(!rock.is_dead());
    }
}
