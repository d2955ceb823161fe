//! Uniform grid spatial index.
//!
//! Buckets axis-aligned boxes into a fixed grid so that proximity queries
//! only visit nearby candidates. Used for edge intersection tests, island
//! lookups and point deduplication; every query result is sorted so callers
//! stay deterministic.

use crate::geometry::Bounds;

/// Upper bound on grid cells per axis.
const MAX_CELLS_PER_AXIS: usize = 256;

/// Grid-bucketed index of boxes identified by `usize` ids.
#[derive(Debug, Clone)]
pub struct GridIndex {
    extent: Bounds,
    cols: usize,
    rows: usize,
    cell_w: f64,
    cell_h: f64,
    cells: Vec<Vec<usize>>,
    items: Vec<Bounds>,
}

impl GridIndex {
    /// Builds an index over `items`; item `i` gets id `i`.
    ///
    /// The grid resolution grows with the square root of the item count and
    /// is capped per axis, so memory stays bounded for any input size.
    pub fn build(items: &[Bounds]) -> Self {
        let extent = items
            .iter()
            .copied()
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0));

        let side = ((items.len() as f64).sqrt().ceil() as usize).clamp(1, MAX_CELLS_PER_AXIS);
        let aspect = if extent.height() > 0.0 && extent.width() > 0.0 {
            extent.width() / extent.height()
        } else {
            1.0
        };
        let cols = ((side as f64 * aspect.sqrt()).round() as usize).clamp(1, MAX_CELLS_PER_AXIS);
        let rows = ((side as f64 / aspect.sqrt()).round() as usize).clamp(1, MAX_CELLS_PER_AXIS);

        let mut index = Self {
            extent,
            cols,
            rows,
            cell_w: (extent.width() / cols as f64).max(f64::MIN_POSITIVE),
            cell_h: (extent.height() / rows as f64).max(f64::MIN_POSITIVE),
            cells: vec![Vec::new(); cols * rows],
            items: items.to_vec(),
        };

        for (id, b) in items.iter().enumerate() {
            let (c0, r0, c1, r1) = index.cell_range(b);
            for r in r0..=r1 {
                for c in c0..=c1 {
                    index.cells[r * cols + c].push(id);
                }
            }
        }
        index
    }

    fn cell_range(&self, b: &Bounds) -> (usize, usize, usize, usize) {
        let col = |x: f64| -> usize {
            let v = ((x - self.extent.min_x) / self.cell_w).floor();
            if v.is_nan() || v < 0.0 {
                0
            } else {
                (v as usize).min(self.cols - 1)
            }
        };
        let row = |y: f64| -> usize {
            let v = ((y - self.extent.min_y) / self.cell_h).floor();
            if v.is_nan() || v < 0.0 {
                0
            } else {
                (v as usize).min(self.rows - 1)
            }
        };
        (col(b.min_x), row(b.min_y), col(b.max_x), row(b.max_y))
    }

    /// Ids of all items whose box intersects `query`, ascending.
    pub fn query(&self, query: &Bounds) -> Vec<usize> {
        if self.items.is_empty() || !self.extent.intersects(query) {
            return Vec::new();
        }
        let (c0, r0, c1, r1) = self.cell_range(query);
        let mut out = Vec::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                for &id in &self.cells[r * self.cols + c] {
                    if self.items[id].intersects(query) {
                        out.push(id);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bounds(&self, id: usize) -> Option<&Bounds> {
        self.items.get(id)
    }
}
