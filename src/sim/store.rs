//! Entity store
//!
//! Owns every live entity, bucketed per [`Kind`]. Removal is always deferred:
//! `remove`/`remove_where` only mark entities, and `flush` deletes them at the
//! end of the tick. Marked entities are invisible to iteration, counts and
//! queries, so a collision handler can remove things mid-pass safely.

use std::cmp::Ordering;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Kind};

const KIND_COUNT: usize = Kind::ALL.len();

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<P> {
    entity: Entity<P>,
    doomed: bool,
}

/// Per-kind, insertion-ordered entity storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore<P = ()> {
    buckets: [Vec<Slot<P>>; KIND_COUNT],
    /// Optional per-kind cap honored by `try_add`
    limits: [Option<usize>; KIND_COUNT],
    next_id: u64,
}

impl<P> Default for EntityStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EntityStore<P> {
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| Vec::new()),
            limits: [None; KIND_COUNT],
            next_id: 1,
        }
    }

    /// Cap the number of live entities of `kind` accepted by `try_add`
    pub fn set_limit(&mut self, kind: Kind, limit: Option<usize>) {
        self.limits[kind.index()] = limit;
    }

    pub fn limit(&self, kind: Kind) -> Option<usize> {
        self.limits[kind.index()]
    }

    /// Insert an entity, assigning it a fresh id
    pub fn add(&mut self, mut entity: Entity<P>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        self.buckets[entity.kind.index()].push(Slot {
            entity,
            doomed: false,
        });
        id
    }

    /// Insert unless the kind's limit is already reached
    pub fn try_add(&mut self, entity: Entity<P>) -> Option<EntityId> {
        if let Some(limit) = self.limits[entity.kind.index()] {
            if self.count(entity.kind) >= limit {
                log::debug!("{:?} limit {} reached, dropping spawn", entity.kind, limit);
                return None;
            }
        }
        Some(self.add(entity))
    }

    /// Live entities in kind order, then insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity<P>> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter())
            .filter(|slot| !slot.doomed)
            .map(|slot| &slot.entity)
    }

    /// Live entities of one kind in insertion order
    pub fn iter_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity<P>> {
        self.buckets[kind.index()]
            .iter()
            .filter(|slot| !slot.doomed)
            .map(|slot| &slot.entity)
    }

    pub fn for_each(&self, mut f: impl FnMut(&Entity<P>)) {
        for entity in self.iter() {
            f(entity);
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Entity<P>)) {
        for slot in self.buckets.iter_mut().flat_map(|b| b.iter_mut()) {
            if !slot.doomed {
                f(&mut slot.entity);
            }
        }
    }

    pub fn for_each_kind_mut(&mut self, kind: Kind, mut f: impl FnMut(&mut Entity<P>)) {
        for slot in self.buckets[kind.index()].iter_mut() {
            if !slot.doomed {
                f(&mut slot.entity);
            }
        }
    }

    fn slot_index(&self, id: EntityId) -> Option<(usize, usize)> {
        // Ids are allocated monotonically, so each bucket is sorted by id
        self.buckets.iter().enumerate().find_map(|(k, bucket)| {
            bucket
                .binary_search_by_key(&id, |slot| slot.entity.id)
                .ok()
                .map(|i| (k, i))
        })
    }

    /// Look up a live entity
    pub fn get(&self, id: EntityId) -> Option<&Entity<P>> {
        let (k, i) = self.slot_index(id)?;
        let slot = &self.buckets[k][i];
        (!slot.doomed).then_some(&slot.entity)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<P>> {
        let (k, i) = self.slot_index(id)?;
        let slot = &mut self.buckets[k][i];
        if slot.doomed {
            None
        } else {
            Some(&mut slot.entity)
        }
    }

    /// Mark one entity for removal; returns false if it was not live
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.slot_index(id) {
            Some((k, i)) if !self.buckets[k][i].doomed => {
                self.buckets[k][i].doomed = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every live entity matching `pred`; returns how many were marked
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Entity<P>) -> bool) -> usize {
        let mut marked = 0;
        for slot in self.buckets.iter_mut().flat_map(|b| b.iter_mut()) {
            if !slot.doomed && pred(&slot.entity) {
                slot.doomed = true;
                marked += 1;
            }
        }
        marked
    }

    /// Count down lifetimes and mark expired entities
    pub fn advance_lifetimes(&mut self, dt: f32) -> usize {
        let mut expired = 0;
        for slot in self.buckets.iter_mut().flat_map(|b| b.iter_mut()) {
            if !slot.doomed && slot.entity.lifetime.advance(dt) {
                slot.doomed = true;
                expired += 1;
            }
        }
        expired
    }

    /// Delete marked entities, keeping survivors in insertion order
    pub fn flush(&mut self) -> usize {
        let mut pruned = 0;
        for bucket in self.buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|slot| !slot.doomed);
            pruned += before - bucket.len();
        }
        pruned
    }

    /// Number of entities marked for removal but not yet flushed
    pub fn pending_removals(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.iter())
            .filter(|slot| slot.doomed)
            .count()
    }

    /// Live entities of one kind
    pub fn count(&self, kind: Kind) -> usize {
        self.buckets[kind.index()]
            .iter()
            .filter(|slot| !slot.doomed)
            .count()
    }

    /// All live entities
    pub fn len(&self) -> usize {
        Kind::ALL.iter().map(|&k| self.count(k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entity immediately (session reset); ids keep counting up
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }

    /// Nearest live entity of `kind` to `point`
    ///
    /// Ties on distance break on x, then y, then id so the answer does not
    /// depend on which entity happened to be inserted first.
    pub fn nearest(&self, kind: Kind, point: Vec2, exclude: Option<EntityId>) -> Option<EntityId> {
        self.iter_kind(kind)
            .filter(|e| Some(e.id) != exclude)
            .min_by(|a, b| closer(point, a.pos, a.id, b.pos, b.id))
            .map(|e| e.id)
    }
}

/// Deterministic "is `a` closer to `point` than `b`" ordering
pub(crate) fn closer(point: Vec2, a: Vec2, a_id: EntityId, b: Vec2, b_id: EntityId) -> Ordering {
    point
        .distance_squared(a)
        .total_cmp(&point.distance_squared(b))
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a_id.cmp(&b_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Lifetime;

    fn enemy(x: f32) -> Entity<()> {
        Entity::circle(Kind::Enemy, Vec2::new(x, 0.0), 5.0, ())
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut store = EntityStore::new();
        let a = store.add(enemy(0.0));
        let b = store.add(enemy(1.0));
        assert!(b > a);
        store.remove(a);
        store.flush();
        let c = store.add(enemy(2.0));
        assert!(c > b);
    }

    #[test]
    fn test_ids_keep_order_past_u32_range() {
        let mut store = EntityStore::new();
        let first = store.add(enemy(0.0));
        store.next_id = u32::MAX as u64;
        let a = store.add(enemy(1.0));
        let b = store.add(enemy(2.0));
        assert_eq!(b, EntityId(u32::MAX as u64 + 1));
        assert!(first < a && a < b);
        assert_eq!(store.get(b).map(|e| e.pos.x), Some(2.0));
        assert_eq!(store.get(first).map(|e| e.pos.x), Some(0.0));
    }

    #[test]
    fn test_iteration_is_kind_then_insertion_order() {
        let mut store = EntityStore::new();
        store.add(enemy(1.0));
        store.add(Entity::circle(Kind::Ship, Vec2::ZERO, 8.0, ()));
        store.add(enemy(2.0));
        store.add(Entity::circle(Kind::Projectile, Vec2::ZERO, 2.0, ()));

        let kinds: Vec<_> = store.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Kind::Ship, Kind::Projectile, Kind::Enemy, Kind::Enemy]);

        let xs: Vec<_> = store.iter_kind(Kind::Enemy).map(|e| e.pos.x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_remove_is_deferred_until_flush() {
        let mut store = EntityStore::new();
        for i in 0..5 {
            store.add(enemy(i as f32));
        }

        // Remove while walking the store: nothing is spliced out from under us
        let mut visited = 0;
        let ids: Vec<_> = store.iter().map(|e| e.id).collect();
        for id in ids {
            visited += 1;
            store.remove_where(|e| e.id == id && e.pos.x < 3.0);
        }
        assert_eq!(visited, 5);

        assert_eq!(store.count(Kind::Enemy), 2);
        assert_eq!(store.pending_removals(), 3);
        assert_eq!(store.flush(), 3);
        assert_eq!(store.pending_removals(), 0);

        let xs: Vec<_> = store.iter().map(|e| e.pos.x).collect();
        assert_eq!(xs, vec![3.0, 4.0]);
    }

    #[test]
    fn test_removed_entities_are_invisible() {
        let mut store = EntityStore::new();
        let id = store.add(enemy(0.0));
        assert!(store.remove(id));
        assert!(!store.remove(id), "double remove is a no-op");
        assert!(store.get(id).is_none());
        assert!(store.get_mut(id).is_none());
        assert_eq!(store.iter().count(), 0);
        let mut seen = 0;
        store.for_each_mut(|_| seen += 1);
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_lifetimes_expire_within_one_tick() {
        let mut store = EntityStore::new();
        store.add(enemy(0.0).with_lifetime(Lifetime::Ticks(3)));
        store.add(enemy(1.0));

        for _ in 0..2 {
            assert_eq!(store.advance_lifetimes(1.0 / 60.0), 0);
            store.flush();
        }
        assert_eq!(store.advance_lifetimes(1.0 / 60.0), 1);
        assert_eq!(store.count(Kind::Enemy), 1);
        store.flush();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_try_add_honors_limit() {
        let mut store = EntityStore::new();
        store.set_limit(Kind::Particle, Some(2));
        let p = || Entity::circle(Kind::Particle, Vec2::ZERO, 1.0, ());
        assert!(store.try_add(p()).is_some());
        assert!(store.try_add(p()).is_some());
        assert!(store.try_add(p()).is_none());
        // Unlimited kinds are unaffected
        assert!(store.try_add(enemy(0.0)).is_some());
        // `add` ignores limits
        store.add(p());
        assert_eq!(store.count(Kind::Particle), 3);
    }

    #[test]
    fn test_nearest_ignores_insertion_order() {
        let mut a = EntityStore::new();
        a.add(enemy(8.0));
        a.add(enemy(5.0));
        let mut b = EntityStore::new();
        b.add(enemy(5.0));
        b.add(enemy(8.0));

        let near_a = a.nearest(Kind::Enemy, Vec2::ZERO, None).and_then(|id| a.get(id));
        let near_b = b.nearest(Kind::Enemy, Vec2::ZERO, None).and_then(|id| b.get(id));
        assert_eq!(near_a.map(|e| e.pos.x), Some(5.0));
        assert_eq!(near_b.map(|e| e.pos.x), Some(5.0));
    }

    #[test]
    fn test_nearest_tie_break_is_positional() {
        let mut store = EntityStore::new();
        store.add(enemy(5.0));
        store.add(enemy(-5.0));
        let id = store.nearest(Kind::Enemy, Vec2::ZERO, None).unwrap();
        assert_eq!(store.get(id).unwrap().pos.x, -5.0);
    }
}
