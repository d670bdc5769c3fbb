//! Uniform-grid spatial index over item bounding boxes.
//!
//! The index is a derived cache, never a source of truth. It is rebuilt
//! from scratch whenever the item array changes; queries return a
//! superset of candidates that callers narrow with an exact test.

use crate::items::{CanvasItem, ItemId};
use kurbo::{Point, Rect};
use std::collections::{HashMap, HashSet};

/// Default cell size in world units.
pub const DEFAULT_CELL_SIZE: f64 = 500.0;

type Cell = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: ItemId,
    /// Position in the item array at the last rebuild (later = on top).
    order: usize,
    bounds: Rect,
}

/// Grid-bucketed index for hit-testing and range queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<Cell, Vec<usize>>,
    entries: Vec<Entry>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear and re-bucket every item into each cell its AABB overlaps.
    pub fn update(&mut self, items: &[CanvasItem]) {
        self.cells.clear();
        self.entries.clear();

        for (order, item) in items.iter().enumerate() {
            let bounds = item.bounds();
            if !is_finite_rect(bounds) {
                log::warn!("Skipping item {} with non-finite bounds in spatial index", item.id);
                continue;
            }
            let slot = self.entries.len();
            self.entries.push(Entry {
                id: item.id,
                order,
                bounds,
            });
            let ((cx0, cy0), (cx1, cy1)) = self.cell_span(bounds);
            for cx in cx0..=cx1 {
                for cy in cy0..=cy1 {
                    self.cells.entry((cx, cy)).or_default().push(slot);
                }
            }
        }
        log::debug!(
            "Spatial index rebuilt: {} items in {} cells",
            self.entries.len(),
            self.cells.len()
        );
    }

    /// Ids of every item bucketed in a cell overlapping the rectangle
    /// `(x, y, w, h)`, in item-array order. May include items whose bounds
    /// do not actually intersect the rectangle.
    pub fn query(&self, x: f64, y: f64, w: f64, h: f64) -> Vec<ItemId> {
        let rect = Rect::new(x, y, x + w, y + h).abs();
        if !is_finite_rect(rect) {
            return Vec::new();
        }
        let ((cx0, cy0), (cx1, cy1)) = self.cell_span(rect);
        let mut seen = HashSet::new();
        for cx in cx0..=cx1 {
            for cy in cy0..=cy1 {
                if let Some(slots) = self.cells.get(&(cx, cy)) {
                    seen.extend(slots.iter().copied());
                }
            }
        }
        let mut slots: Vec<usize> = seen.into_iter().collect();
        slots.sort_unstable_by_key(|&slot| self.entries[slot].order);
        slots.into_iter().map(|slot| self.entries[slot].id).collect()
    }

    /// Query with a kurbo rectangle.
    pub fn query_rect(&self, rect: Rect) -> Vec<ItemId> {
        let rect = rect.abs();
        self.query(rect.x0, rect.y0, rect.width(), rect.height())
    }

    /// The topmost (last-inserted) item whose exact bounds contain the point.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<ItemId> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let slots = self.cells.get(&self.cell_of(Point::new(x, y)))?;
        slots
            .iter()
            .map(|&slot| &self.entries[slot])
            .filter(|entry| {
                let b = entry.bounds;
                x >= b.x0 && x <= b.x1 && y >= b.y0 && y <= b.y1
            })
            .max_by_key(|entry| entry.order)
            .map(|entry| entry.id)
    }

    fn cell_of(&self, point: Point) -> Cell {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    fn cell_span(&self, rect: Rect) -> (Cell, Cell) {
        (
            self.cell_of(Point::new(rect.x0, rect.y0)),
            self.cell_of(Point::new(rect.x1, rect.y1)),
        )
    }
}

fn is_finite_rect(rect: Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}
