//! Spatial hash grid for proximity queries.
//!
//! One generic grid type shared by every entity store. The world is a bounded
//! square divided into uniform cells; queries scan a window of cells around a
//! point and confirm candidates by exact Euclidean distance. Grids are rebuilt
//! from scratch once per tick, which bounds staleness to one tick.

use glam::Vec2;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::warn;

/// Cell side length in world units. Shared convention across all stores.
pub const CELL_SIZE: f32 = 100.0;

/// Upper bound on cells per axis.
const MAX_GRID_DIM: usize = 100;

/// Reduced grid used when the full cell table cannot be allocated.
const FALLBACK_GRID_DIM: usize = 50;

/// Uniform-cell spatial hash over a bounded square world.
pub struct SpatialGrid<K> {
    dim: usize,
    cell_size: f32,
    world_size: f32,
    cells: Vec<Vec<(K, Vec2)>>,
}

impl<K: Eq + Hash + Clone> SpatialGrid<K> {
    /// Create a grid covering a square world of the given side length.
    ///
    /// Falls back to a fixed 50×50 grid instead of failing when the cell
    /// table cannot be reserved.
    pub fn new(world_size: f32) -> Self {
        let dim = ((world_size / CELL_SIZE).ceil() as usize).clamp(1, MAX_GRID_DIM);

        let mut cells: Vec<Vec<(K, Vec2)>> = Vec::new();
        let dim = match cells.try_reserve_exact(dim * dim) {
            Ok(()) => dim,
            Err(_) => {
                warn!(
                    requested = dim * dim,
                    fallback = FALLBACK_GRID_DIM * FALLBACK_GRID_DIM,
                    "Grid allocation failed, degrading to fixed fallback size"
                );
                FALLBACK_GRID_DIM.min(dim)
            }
        };
        cells.resize_with(dim * dim, Vec::new);

        // The fallback dimension may leave cells wider than CELL_SIZE so the
        // grid still spans the whole world.
        let cell_size = (world_size / dim as f32).max(CELL_SIZE);

        Self {
            dim,
            cell_size,
            world_size,
            cells,
        }
    }

    /// Number of cells per axis.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Cell index for one axis, clamped to grid bounds.
    #[inline]
    fn axis_index(&self, coord: f32) -> usize {
        let idx = (coord / self.cell_size).floor() as isize;
        idx.clamp(0, self.dim as isize - 1) as usize
    }

    #[inline]
    fn cell_index(&self, x: f32, y: f32) -> usize {
        self.axis_index(y) * self.dim + self.axis_index(x)
    }

    /// Insert an entity at a position. Out-of-world positions land on the
    /// nearest edge cell.
    #[inline]
    pub fn insert(&mut self, id: K, x: f32, y: f32) {
        let idx = self.cell_index(x, y);
        self.cells[idx].push((id, Vec2::new(x, y)));
    }

    /// Remove all entries, keeping cell allocations.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// All entity ids whose positions lie within `radius` of `(x, y)`.
    ///
    /// A query centered outside the world returns an empty set.
    pub fn query_neighbors(&self, x: f32, y: f32, radius: f32) -> HashSet<K> {
        let mut found = HashSet::new();
        if x < 0.0 || y < 0.0 || x >= self.world_size || y >= self.world_size {
            return found;
        }

        let window = (radius / self.cell_size).ceil() as isize;
        let cx = self.axis_index(x) as isize;
        let cy = self.axis_index(y) as isize;
        let point = Vec2::new(x, y);
        let radius_sq = radius * radius;

        let min_x = (cx - window).max(0) as usize;
        let max_x = ((cx + window) as usize).min(self.dim - 1);
        let min_y = (cy - window).max(0) as usize;
        let max_y = ((cy + window) as usize).min(self.dim - 1);

        for gy in min_y..=max_y {
            for gx in min_x..=max_x {
                for (id, pos) in &self.cells[gy * self.dim + gx] {
                    if pos.distance_squared(point) <= radius_sq {
                        found.insert(id.clone());
                    }
                }
            }
        }

        found
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.cells.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

impl<K> std::fmt::Debug for SpatialGrid<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialGrid")
            .field("dim", &self.dim)
            .field("cell_size", &self.cell_size)
            .field("world_size", &self.world_size)
            .finish()
    }
}
