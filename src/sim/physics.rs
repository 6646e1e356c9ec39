//! Velocity integration and playfield boundary policies

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::store::EntityStore;
use crate::consts::{DEFAULT_HEIGHT, DEFAULT_WIDTH, OFFSCREEN_MARGIN};
use crate::error::ConfigError;

/// Playfield rectangle `[0, width] x [0, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.x <= self.width && pos.y >= 0.0 && pos.y <= self.height
    }
}

/// What happens when an entity leaves the playfield
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    /// Re-enter from the opposite edge, keeping the overflow
    Wrap,
    /// Stop at the edge; the velocity component into the edge is zeroed
    Clamp,
    /// Keep going; pruned once more than `margin` outside the playfield
    Unbounded { margin: f32 },
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::Unbounded {
            margin: OFFSCREEN_MARGIN,
        }
    }
}

/// Per-game integrator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub bounds: Bounds,
    /// Default policy for entities without their own override
    pub boundary: Boundary,
    /// Per-tick velocity damping factor in (0, 1]
    pub friction: Option<f32>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            boundary: Boundary::default(),
            friction: None,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Bounds { width, height } = self.bounds;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(ConfigError::InvalidBounds { width, height });
        }
        if let Some(f) = self.friction {
            if !(f > 0.0 && f <= 1.0) {
                return Err(ConfigError::InvalidFriction(f));
            }
        }
        if let Boundary::Unbounded { margin } = self.boundary {
            if !(margin >= 0.0 && margin.is_finite()) {
                return Err(ConfigError::InvalidMargin(margin));
            }
        }
        Ok(())
    }
}

/// Result of applying a boundary policy to one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryOutcome {
    Inside,
    Wrapped,
    Clamped,
    /// Unbounded entity is far enough outside to be pruned
    Escaped,
}

/// Advance every live, unpinned entity by `dt`
///
/// Friction is applied first so a damped entity never overshoots by a tick.
/// Escaped entities are marked for removal; the store prunes them on flush.
pub fn integrate<P>(store: &mut EntityStore<P>, config: &PhysicsConfig, dt: f32) -> usize {
    let mut escaped = Vec::new();

    store.for_each_mut(|entity| {
        if entity.pinned {
            return;
        }
        step_entity(entity, config.friction, dt);
        let policy = entity.boundary.unwrap_or(config.boundary);
        if apply_boundary(entity, policy, &config.bounds) == BoundaryOutcome::Escaped {
            escaped.push(entity.id);
        }
    });

    for id in &escaped {
        store.remove(*id);
    }
    escaped.len()
}

/// Explicit Euler step for one entity
pub fn step_entity<P>(entity: &mut Entity<P>, friction: Option<f32>, dt: f32) {
    if let Some(f) = friction {
        entity.vel *= f;
    }
    entity.pos += entity.vel * dt;
    entity.vel += entity.accel * dt;

    if !entity.pos.is_finite() || !entity.vel.is_finite() {
        log::warn!(
            "entity {:?} produced non-finite state (pos {:?}, vel {:?}); resetting motion",
            entity.id,
            entity.pos,
            entity.vel
        );
        if !entity.pos.is_finite() {
            entity.pos = Vec2::ZERO;
        }
        entity.vel = Vec2::ZERO;
        entity.accel = Vec2::ZERO;
    }
}

/// Apply a boundary policy in place
pub fn apply_boundary<P>(entity: &mut Entity<P>, policy: Boundary, bounds: &Bounds) -> BoundaryOutcome {
    match policy {
        Boundary::Wrap => {
            let wrapped = Vec2::new(
                entity.pos.x.rem_euclid(bounds.width),
                entity.pos.y.rem_euclid(bounds.height),
            );
            let outside = !bounds.contains(entity.pos);
            entity.pos = wrapped;
            if outside {
                BoundaryOutcome::Wrapped
            } else {
                BoundaryOutcome::Inside
            }
        }
        Boundary::Clamp => {
            let mut clamped = false;
            if entity.pos.x < 0.0 || entity.pos.x > bounds.width {
                entity.pos.x = entity.pos.x.clamp(0.0, bounds.width);
                entity.vel.x = 0.0;
                clamped = true;
            }
            if entity.pos.y < 0.0 || entity.pos.y > bounds.height {
                entity.pos.y = entity.pos.y.clamp(0.0, bounds.height);
                entity.vel.y = 0.0;
                clamped = true;
            }
            if clamped {
                BoundaryOutcome::Clamped
            } else {
                BoundaryOutcome::Inside
            }
        }
        Boundary::Unbounded { margin } => {
            let p = entity.pos;
            let out = p.x < -margin
                || p.x > bounds.width + margin
                || p.y < -margin
                || p.y > bounds.height + margin;
            if out {
                BoundaryOutcome::Escaped
            } else {
                BoundaryOutcome::Inside
            }
        }
    }
}
