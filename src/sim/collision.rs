//! Collision detection and contact reporting
//!
//! Pure geometry: the resolver reports which entities touch and never applies
//! damage, score or removal. Games consume the [`Contact`] list in their
//! `on_contact` reducer.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::broadphase::SpatialGrid;
use super::entity::{EntityId, Kind, Shape};
use super::store::{EntityStore, closer};
use crate::direction_or_default;

/// Candidate count above which a rule switches to the grid broad phase
pub const BROADPHASE_THRESHOLD: usize = 32;

/// A shape placed in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub center: Vec2,
    pub shape: Shape,
}

impl Collider {
    pub fn new(center: Vec2, shape: Shape) -> Self {
        Self { center, shape }
    }

    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::new(center, Shape::Circle { radius })
    }

    pub fn rect(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center, Shape::Rect { width, height })
    }

    /// Axis-aligned bounding box as (min, max)
    pub fn aabb(&self) -> (Vec2, Vec2) {
        let half = self.shape.half_extents();
        (self.center - half, self.center + half)
    }
}

/// Overlap test for any supported shape pair
pub fn detect(a: &Collider, b: &Collider) -> bool {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.center, ra, b.center, rb)
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => {
            let (a_min, a_max) = a.aabb();
            let (b_min, b_max) = b.aabb();
            aabb_aabb(a_min, a_max, b_min, b_max)
        }
        (Shape::Rect { .. }, Shape::Circle { radius }) => {
            let (min, max) = a.aabb();
            aabb_circle(min, max, b.center, radius)
        }
        (Shape::Circle { radius }, Shape::Rect { .. }) => {
            let (min, max) = b.aabb();
            aabb_circle(min, max, a.center, radius)
        }
    }
}

/// Same as [`detect`]; the name games call
#[inline]
pub fn collide(a: &Collider, b: &Collider) -> bool {
    detect(a, b)
}

/// `distance(a, b) < ra + rb`; coincident centers always collide
pub fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let dist = a.distance(b);
    dist == 0.0 || dist < ra + rb
}

/// Open-interval overlap on both axes (touching edges do not collide)
pub fn aabb_aabb(a_min: Vec2, a_max: Vec2, b_min: Vec2, b_max: Vec2) -> bool {
    a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
}

/// Clamp the circle center into the box and compare the clamped distance to the radius
pub fn aabb_circle(min: Vec2, max: Vec2, center: Vec2, radius: f32) -> bool {
    let closest = center.clamp(min, max);
    // Center inside the box: no usable separation vector, treat as touching
    closest == center || closest.distance(center) < radius
}

/// Unit normal pointing from `a` toward `b`, and penetration depth
pub fn contact_geometry(a: &Collider, b: &Collider) -> (Vec2, f32) {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let normal = direction_or_default(a.center, b.center);
            (normal, (ra + rb - a.center.distance(b.center)).max(0.0))
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => {
            let (a_min, a_max) = a.aabb();
            let (b_min, b_max) = b.aabb();
            let overlap_x = a_max.x.min(b_max.x) - a_min.x.max(b_min.x);
            let overlap_y = a_max.y.min(b_max.y) - a_min.y.max(b_min.y);
            let delta = b.center - a.center;
            if overlap_x < overlap_y {
                let sign = if delta.x < 0.0 { -1.0 } else { 1.0 };
                (Vec2::new(sign, 0.0), overlap_x.max(0.0))
            } else {
                let sign = if delta.y < 0.0 { -1.0 } else { 1.0 };
                (Vec2::new(0.0, sign), overlap_y.max(0.0))
            }
        }
        (Shape::Rect { .. }, Shape::Circle { radius }) => {
            let (min, max) = a.aabb();
            let closest = b.center.clamp(min, max);
            let normal = if closest == b.center {
                direction_or_default(a.center, b.center)
            } else {
                direction_or_default(closest, b.center)
            };
            (normal, (radius - closest.distance(b.center)).max(0.0))
        }
        (Shape::Circle { .. }, Shape::Rect { .. }) => {
            let (normal, depth) = contact_geometry(b, a);
            (-normal, depth)
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// How many contacts one `a` entity may produce for a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPolicy {
    /// Only the nearest overlapping `b` (center to center)
    Nearest,
    /// Every overlapping `b`
    All,
}

/// Which kinds are tested against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRule {
    pub a: Kind,
    pub b: Kind,
    pub policy: ContactPolicy,
}

impl PairRule {
    pub fn nearest(a: Kind, b: Kind) -> Self {
        Self {
            a,
            b,
            policy: ContactPolicy::Nearest,
        }
    }

    pub fn all(a: Kind, b: Kind) -> Self {
        Self {
            a,
            b,
            policy: ContactPolicy::All,
        }
    }
}

/// A detected overlap, before any gameplay consequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
    pub a_kind: Kind,
    pub b_kind: Kind,
    /// Center-to-center distance
    pub distance: f32,
    /// Unit normal from `a` toward `b`
    pub normal: Vec2,
    pub penetration: f32,
}

impl Contact {
    /// The id on the `kind` side of the contact, if either side has that kind
    pub fn side(&self, kind: Kind) -> Option<EntityId> {
        if self.a_kind == kind {
            Some(self.a)
        } else if self.b_kind == kind {
            Some(self.b)
        } else {
            None
        }
    }

    /// The other participant
    pub fn other(&self, id: EntityId) -> EntityId {
        if self.a == id { self.b } else { self.a }
    }
}

/// Turns the store's current positions into one contact list per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolver {
    pub rules: Vec<PairRule>,
    /// Candidate count above which the grid broad phase is used
    #[serde(default = "default_threshold")]
    pub broadphase_threshold: usize,
}

fn default_threshold() -> usize {
    BROADPHASE_THRESHOLD
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Resolver {
    pub fn new(rules: Vec<PairRule>) -> Self {
        Self {
            rules,
            broadphase_threshold: BROADPHASE_THRESHOLD,
        }
    }

    /// Detect contacts for every rule
    ///
    /// Each unordered pair is reported at most once per call. Output is sorted
    /// by `(a, b)` id.
    pub fn resolve<P>(&self, store: &EntityStore<P>) -> Vec<Contact> {
        let mut seen: HashSet<(EntityId, EntityId)> = HashSet::new();
        let mut contacts = Vec::new();

        for rule in &self.rules {
            let candidates: Vec<(EntityId, Collider)> = store
                .iter_kind(rule.b)
                .map(|e| (e.id, e.collider()))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let grid = (candidates.len() > self.broadphase_threshold)
                .then(|| SpatialGrid::build(candidates.iter().map(|(_, c)| *c)));

            let mut hits: Vec<usize> = Vec::new();
            for a in store.iter_kind(rule.a) {
                let a_col = a.collider();
                hits.clear();

                let mut consider = |idx: usize| {
                    let (b_id, b_col) = &candidates[idx];
                    if *b_id == a.id {
                        return;
                    }
                    if rule.a == rule.b && rule.policy == ContactPolicy::All && *b_id < a.id {
                        return;
                    }
                    if detect(&a_col, b_col) {
                        hits.push(idx);
                    }
                };
                match &grid {
                    Some(grid) => grid.query(&a_col).into_iter().for_each(&mut consider),
                    None => (0..candidates.len()).for_each(&mut consider),
                }

                let chosen: Vec<usize> = match rule.policy {
                    ContactPolicy::All => hits.clone(),
                    ContactPolicy::Nearest => hits
                        .iter()
                        .copied()
                        .min_by(|&i, &j| {
                            let (i_id, i_col) = &candidates[i];
                            let (j_id, j_col) = &candidates[j];
                            closer(a_col.center, i_col.center, *i_id, j_col.center, *j_id)
                        })
                        .into_iter()
                        .collect(),
                };

                for idx in chosen {
                    let (b_id, b_col) = candidates[idx];
                    let key = if a.id < b_id { (a.id, b_id) } else { (b_id, a.id) };
                    if !seen.insert(key) {
                        continue;
                    }
                    let (normal, penetration) = contact_geometry(&a_col, &b_col);
                    contacts.push(Contact {
                        a: a.id,
                        b: b_id,
                        a_kind: rule.a,
                        b_kind: rule.b,
                        distance: a_col.center.distance(b_col.center),
                        normal,
                        penetration,
                    });
                }
            }
        }

        contacts.sort_by_key(|c| (c.a, c.b));
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use proptest::prelude::*;

    #[test]
    fn test_circle_circle_scenario() {
        let a = Collider::circle(Vec2::new(0.0, 0.0), 5.0);
        let b = Collider::circle(Vec2::new(8.0, 0.0), 5.0);
        assert!(collide(&a, &b)); // 8 < 10

        let b = Collider::circle(Vec2::new(11.0, 0.0), 5.0);
        assert!(!collide(&a, &b)); // 11 > 10

        // Exactly touching is not a collision
        let b = Collider::circle(Vec2::new(10.0, 0.0), 5.0);
        assert!(!collide(&a, &b));
    }

    #[test]
    fn test_coincident_zero_radius_collides() {
        let a = Collider::circle(Vec2::new(4.0, 4.0), 0.0);
        assert!(collide(&a, &a));
        let (normal, _) = contact_geometry(&a, &a);
        assert!(normal.is_finite());
        assert!((normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aabb_open_interval() {
        let a = Collider::rect(Vec2::new(5.0, 5.0), 10.0, 10.0);
        let b = Collider::rect(Vec2::new(14.0, 5.0), 10.0, 10.0);
        assert!(detect(&a, &b));

        // Shared edge at x = 10
        let b = Collider::rect(Vec2::new(15.0, 5.0), 10.0, 10.0);
        assert!(!detect(&a, &b));
    }

    #[test]
    fn test_aabb_circle() {
        let rect = Collider::rect(Vec2::new(0.0, 0.0), 20.0, 20.0);
        // Box spans -10..10; circle center at x = 14 is 4 away from the edge
        assert!(detect(&rect, &Collider::circle(Vec2::new(14.0, 0.0), 5.0)));
        assert!(!detect(&rect, &Collider::circle(Vec2::new(16.0, 0.0), 5.0)));
        // Corner: clamped point (10,10), distance sqrt(18) ~ 4.24
        assert!(detect(&Collider::circle(Vec2::new(13.0, 13.0), 5.0), &rect));
        assert!(!detect(&Collider::circle(Vec2::new(14.0, 14.0), 5.0), &rect));
        // Center inside the box
        assert!(detect(&rect, &Collider::circle(Vec2::new(1.0, 1.0), 0.0)));
    }

    #[test]
    fn test_contact_normal_points_a_to_b() {
        let a = Collider::circle(Vec2::ZERO, 5.0);
        let b = Collider::circle(Vec2::new(8.0, 0.0), 5.0);
        let (normal, depth) = contact_geometry(&a, &b);
        assert!((normal - Vec2::X).length() < 1e-6);
        assert!((depth - 2.0).abs() < 1e-6);

        let rect = Collider::rect(Vec2::ZERO, 20.0, 20.0);
        let ball = Collider::circle(Vec2::new(0.0, 13.0), 5.0);
        let (normal, depth) = contact_geometry(&ball, &rect);
        assert!((normal - Vec2::new(0.0, -1.0)).length() < 1e-6);
        assert!((depth - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_velocity() {
        let velocity = Vec2::new(100.0, 0.0);
        let normal = Vec2::new(-1.0, 0.0);
        let reflected = reflect_velocity(velocity, normal);
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    fn shooter_store(enemy_order: &[f32]) -> EntityStore<()> {
        let mut store = EntityStore::new();
        store.add(Entity::circle(Kind::Projectile, Vec2::ZERO, 2.0, ()));
        for &x in enemy_order {
            store.add(Entity::circle(Kind::Enemy, Vec2::new(x, 0.0), 10.0, ()));
        }
        store
    }

    #[test]
    fn test_nearest_contact_regardless_of_order() {
        let resolver = Resolver::new(vec![PairRule::nearest(Kind::Projectile, Kind::Enemy)]);
        for order in [[5.0, 8.0], [8.0, 5.0]] {
            let store = shooter_store(&order);
            let contacts = resolver.resolve(&store);
            assert_eq!(contacts.len(), 1);
            let hit = store.get(contacts[0].b).unwrap();
            assert_eq!(hit.pos.x, 5.0);
            assert!((contacts[0].distance - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_all_policy_reports_every_overlap_once() {
        let resolver = Resolver::new(vec![
            PairRule::all(Kind::Projectile, Kind::Enemy),
            // Same pair from the other side must not duplicate
            PairRule::all(Kind::Enemy, Kind::Projectile),
        ]);
        let store = shooter_store(&[5.0, 8.0]);
        let contacts = resolver.resolve(&store);
        assert_eq!(contacts.len(), 2);
    }

    #[test]
    fn test_same_kind_pairs_reported_once() {
        let mut store = EntityStore::new();
        for x in [0.0, 6.0, 12.0] {
            store.add(Entity::circle(Kind::Enemy, Vec2::new(x, 0.0), 4.0, ()));
        }
        let resolver = Resolver::new(vec![PairRule::all(Kind::Enemy, Kind::Enemy)]);
        let contacts = resolver.resolve(&store);
        // 0-6 and 6-12 overlap; 0-12 does not
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().all(|c| c.a < c.b));

        let resolver = Resolver::new(vec![PairRule::nearest(Kind::Enemy, Kind::Enemy)]);
        let contacts = resolver.resolve(&store);
        let mut keys: Vec<_> = contacts.iter().map(|c| (c.a.min(c.b), c.a.max(c.b))).collect();
        keys.dedup();
        assert_eq!(keys.len(), contacts.len());
    }

    #[test]
    fn test_removed_entities_do_not_collide() {
        let mut store = shooter_store(&[5.0]);
        let enemy = store.iter_kind(Kind::Enemy).next().unwrap().id;
        store.remove(enemy);
        let resolver = Resolver::new(vec![PairRule::nearest(Kind::Projectile, Kind::Enemy)]);
        assert!(resolver.resolve(&store).is_empty());
    }

    proptest! {
        #[test]
        fn prop_broadphase_matches_brute_force(
            points in prop::collection::vec((0.0f32..200.0, 0.0f32..200.0, 1.0f32..12.0), 2..60),
        ) {
            let mut store = EntityStore::new();
            for (i, (x, y, r)) in points.iter().enumerate() {
                let kind = if i % 3 == 0 { Kind::Projectile } else { Kind::Enemy };
                store.add(Entity::circle(kind, Vec2::new(*x, *y), *r, ()));
            }
            let rules = vec![
                PairRule::nearest(Kind::Projectile, Kind::Enemy),
                PairRule::all(Kind::Enemy, Kind::Enemy),
            ];
            let mut brute = Resolver::new(rules.clone());
            brute.broadphase_threshold = usize::MAX;
            let mut grid = Resolver::new(rules);
            grid.broadphase_threshold = 0;

            prop_assert_eq!(brute.resolve(&store), grid.resolve(&store));
        }
    }
}
