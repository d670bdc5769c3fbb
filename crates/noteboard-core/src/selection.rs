//! Selection and manipulation handle system.

use crate::items::{CanvasConnection, CanvasItem, ConnectionId, EntityId, ItemId};
use kurbo::{Line, ParamCurveNearest, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 10.0;
/// Distance from the right edge to the connect handle, in screen pixels.
pub const CONNECT_HANDLE_OFFSET: f64 = 18.0;

/// Resize handle position on an item's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NorthWest,
        ResizeHandle::NorthEast,
        ResizeHandle::SouthWest,
        ResizeHandle::SouthEast,
        ResizeHandle::North,
        ResizeHandle::South,
        ResizeHandle::East,
        ResizeHandle::West,
    ];

    fn moves_west(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    fn moves_east(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }

    fn moves_north(self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    fn moves_south(self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }

    /// Where this handle sits on `bounds`.
    pub fn anchor(self, bounds: Rect) -> Point {
        let center = bounds.center();
        let x = if self.moves_west() {
            bounds.x0
        } else if self.moves_east() {
            bounds.x1
        } else {
            center.x
        };
        let y = if self.moves_north() {
            bounds.y0
        } else if self.moves_south() {
            bounds.y1
        } else {
            center.y
        };
        Point::new(x, y)
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Edge or corner resize handle.
    Resize(ResizeHandle),
    /// Anchor for dragging out a new connection.
    Connect,
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    /// Handle type.
    pub kind: HandleKind,
}

impl Handle {
    /// Create a new handle.
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in world coordinates) hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Handles shown on a selected item. The connect handle floats a fixed
/// screen distance outside the right edge, so its world offset depends on
/// `zoom`.
pub fn item_handles(item: &CanvasItem, zoom: f64) -> Vec<Handle> {
    let bounds = item.bounds();
    let mut handles = Vec::with_capacity(ResizeHandle::ALL.len() + 1);
    handles.push(Handle::new(
        Point::new(bounds.x1 + CONNECT_HANDLE_OFFSET / zoom, bounds.center().y),
        HandleKind::Connect,
    ));
    handles.extend(
        ResizeHandle::ALL
            .iter()
            .map(|&h| Handle::new(h.anchor(bounds), HandleKind::Resize(h))),
    );
    handles
}

/// Hit test the handles of an item. The connect handle wins over resize
/// handles; among resize handles the closest one wins.
pub fn hit_test_handles(
    item: &CanvasItem,
    point: Point,
    tolerance: f64,
    zoom: f64,
) -> Option<HandleKind> {
    let handles = item_handles(item, zoom);
    if handles
        .iter()
        .any(|h| h.kind == HandleKind::Connect && h.hit_test(point, tolerance))
    {
        return Some(HandleKind::Connect);
    }
    handles
        .iter()
        .filter(|h| h.hit_test(point, tolerance))
        .min_by(|a, b| {
            (point - a.position)
                .hypot2()
                .total_cmp(&(point - b.position).hypot2())
        })
        .map(|h| h.kind)
}

/// New bounds for a resize of `initial` by `delta` through `handle`.
///
/// East/south edges change their dimension directly, floored at `min`.
/// West/north edges move the origin too so the opposite edge stays put;
/// the delta is clamped first so the dimension never passes below `min`.
pub fn resize_geometry(initial: Rect, handle: ResizeHandle, delta: Vec2, min: Size) -> Rect {
    let mut x = initial.x0;
    let mut y = initial.y0;
    let mut width = initial.width();
    let mut height = initial.height();

    if handle.moves_east() {
        width = (width + delta.x).max(min.width);
    } else if handle.moves_west() {
        let dx = delta.x.min(initial.width() - min.width);
        x += dx;
        width -= dx;
    }

    if handle.moves_south() {
        height = (height + delta.y).max(min.height);
    } else if handle.moves_north() {
        let dy = delta.y.min(initial.height() - min.height);
        y += dy;
        height -= dy;
    }

    Rect::new(x, y, x + width, y + height)
}

/// Ordered set of selected entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn contains_item(&self, id: ItemId) -> bool {
        self.contains(EntityId::Item(id))
    }

    /// Selected item ids, in selection order.
    pub fn items(&self) -> Vec<ItemId> {
        self.ids
            .iter()
            .filter_map(|id| match id {
                EntityId::Item(item) => Some(*item),
                EntityId::Connection(_) => None,
            })
            .collect()
    }

    /// Selected connection ids, in selection order.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.ids
            .iter()
            .filter_map(|id| match id {
                EntityId::Connection(conn) => Some(*conn),
                EntityId::Item(_) => None,
            })
            .collect()
    }

    /// Replace the selection with a single entity.
    pub fn select(&mut self, id: EntityId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn add(&mut self, id: EntityId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: EntityId) {
        self.ids.retain(|&existing| existing != id);
    }

    /// Flip membership of `id`.
    pub fn toggle(&mut self, id: EntityId) {
        if self.contains(id) {
            self.remove(id);
        } else {
            self.ids.push(id);
        }
    }

    /// Replace the selection wholesale.
    pub fn set(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that fail `keep`. Returns true if anything was removed.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| keep(id));
        self.ids.len() != before
    }
}

/// Center-to-center segment of every connection whose endpoints exist.
pub fn connection_segments(
    items: &[CanvasItem],
    connections: &[CanvasConnection],
) -> Vec<(ConnectionId, Line)> {
    let centers: HashMap<ItemId, Point> =
        items.iter().map(|i| (i.id, i.bounds().center())).collect();
    connections
        .iter()
        .filter_map(|conn| {
            let from = centers.get(&conn.from_id)?;
            let to = centers.get(&conn.to_id)?;
            Some((conn.id, Line::new(*from, *to)))
        })
        .collect()
}

/// The topmost connection whose segment passes within `tolerance` of `point`.
pub fn hit_test_connections(
    segments: &[(ConnectionId, Line)],
    point: Point,
    tolerance: f64,
) -> Option<ConnectionId> {
    segments
        .iter()
        .rev()
        .find(|(_, line)| line.nearest(point, 1e-6).distance_sq <= tolerance * tolerance)
        .map(|(id, _)| *id)
}
