//! Uniform grid broad phase
//!
//! Buckets colliders by the cells their bounding boxes cover so the resolver
//! only runs exact tests against nearby candidates. Results are identical to
//! the brute-force pass; the grid only prunes work.

use std::collections::HashMap;

use glam::Vec2;

use super::collision::Collider;

/// Smallest cell edge, keeps tiny particles from exploding the cell count
const MIN_CELL_SIZE: f32 = 8.0;

/// Shapes covering more cells than this skip bucketing entirely
const MAX_SPAN_CELLS: i64 = 1024;

type Cell = (i32, i32);

/// Spatial hash over a fixed set of colliders
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<Cell, Vec<usize>>,
    /// Colliders too large or non-finite to bucket; every query sees them
    oversized: Vec<usize>,
    len: usize,
}

impl SpatialGrid {
    /// Build a grid over `colliders`; indices refer to iteration order
    pub fn build(colliders: impl IntoIterator<Item = Collider>) -> Self {
        let colliders: Vec<Collider> = colliders.into_iter().collect();

        // Size cells to the largest candidate so each one spans at most 2x2 cells
        let largest = colliders
            .iter()
            .map(|c| c.shape.half_extents().max_element() * 2.0)
            .filter(|size| size.is_finite())
            .fold(0.0f32, f32::max);

        let mut grid = Self {
            cell_size: largest.max(MIN_CELL_SIZE),
            cells: HashMap::new(),
            oversized: Vec::new(),
            len: colliders.len(),
        };
        for (idx, collider) in colliders.iter().enumerate() {
            let (min, max) = collider.aabb();
            match grid.cell_range(min, max) {
                Some((lo, hi)) => {
                    for cx in lo.0..=hi.0 {
                        for cy in lo.1..=hi.1 {
                            grid.cells.entry((cx, cy)).or_default().push(idx);
                        }
                    }
                }
                None => grid.oversized.push(idx),
            }
        }
        if !grid.oversized.is_empty() {
            log::debug!("{} colliders too large for the grid", grid.oversized.len());
        }
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, p: Vec2) -> Cell {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    /// Inclusive cell corners covered by a box, or `None` when it cannot be bucketed
    fn cell_range(&self, min: Vec2, max: Vec2) -> Option<(Cell, Cell)> {
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }
        let lo = self.cell_of(min);
        let hi = self.cell_of(max);
        let span_x = hi.0 as i64 - lo.0 as i64 + 1;
        let span_y = hi.1 as i64 - lo.1 as i64 + 1;
        span_x
            .checked_mul(span_y)
            .is_some_and(|cells| cells <= MAX_SPAN_CELLS)
            .then_some((lo, hi))
    }

    /// Indices of colliders sharing at least one cell with `probe`, ascending
    ///
    /// A probe too large to walk cell by cell gets every index back.
    pub fn query(&self, probe: &Collider) -> Vec<usize> {
        let (min, max) = probe.aabb();
        let Some((lo, hi)) = self.cell_range(min, max) else {
            return (0..self.len).collect();
        };

        let mut found = self.oversized.clone();
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    found.extend_from_slice(bucket);
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}
