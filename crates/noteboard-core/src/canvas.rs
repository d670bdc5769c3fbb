//! Canvas document and state management.

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::history::History;
use crate::items::{
    CanvasConnection, CanvasItem, ConnectionId, EntityId, HeightMode, ItemId, SerializableColor,
    TextStyle, rects_touch,
};
use crate::selection::Selection;
use crate::spatial::SpatialIndex;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A persisted board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    #[serde(default)]
    pub items: Vec<CanvasItem>,
    #[serde(default)]
    pub connections: Vec<CanvasConnection>,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            items: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Serialize document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub items: Vec<CanvasItem>,
    pub connections: Vec<CanvasConnection>,
    pub selection: Selection,
}

/// Which parts of the canvas changed since the last [`Canvas::take_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub items: bool,
    pub connections: bool,
    pub selection: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.items || self.connections || self.selection
    }
}

/// Runtime canvas state: the document arrays plus everything derived from
/// them.
///
/// Mutators here are untracked primitives. Callers that want a mutation to
/// be undoable call [`commit_history`](Canvas::commit_history) first.
#[derive(Debug, Clone)]
pub struct Canvas {
    items: Vec<CanvasItem>,
    connections: Vec<CanvasConnection>,
    selection: Selection,
    history: History<HistorySnapshot>,
    spatial: SpatialIndex,
    min_size: Size,
    changes: Changes,
    /// Camera for view transform.
    pub camera: Camera,
    /// Viewport size in screen pixels.
    pub viewport_size: Size,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Canvas {
    /// Create an empty canvas.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            items: Vec::new(),
            connections: Vec::new(),
            selection: Selection::new(),
            history: History::new(config.history_capacity),
            spatial: SpatialIndex::new(config.grid_cell_size),
            min_size: config.min_item_size(),
            changes: Changes::default(),
            camera: Camera::with_zoom_range(config.min_zoom, config.max_zoom),
            viewport_size: Size::new(800.0, 600.0),
        }
    }

    pub fn items(&self) -> &[CanvasItem] {
        &self.items
    }

    pub fn connections(&self) -> &[CanvasConnection] {
        &self.connections
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History<HistorySnapshot> {
        &self.history
    }

    pub fn min_size(&self) -> Size {
        self.min_size
    }

    pub fn item(&self, id: ItemId) -> Option<&CanvasItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut CanvasItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn contains_item(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }

    pub fn contains_connection(&self, id: ConnectionId) -> bool {
        self.connections.iter().any(|c| c.id == id)
    }

    fn entity_exists(&self, id: EntityId) -> bool {
        match id {
            EntityId::Item(item) => self.contains_item(item),
            EntityId::Connection(conn) => self.contains_connection(conn),
        }
    }

    // --- history ---

    /// Deep copy of items, connections and selection.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            items: self.items.clone(),
            connections: self.connections.clone(),
            selection: self.selection.clone(),
        }
    }

    /// Push current state to the undo stack (call before making changes).
    pub fn commit_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.commit(snapshot);
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn restore(&mut self, snapshot: HistorySnapshot) {
        self.items = snapshot.items;
        self.connections = snapshot.connections;
        self.selection = snapshot.selection;
        self.reindex();
        self.changes = Changes {
            items: true,
            connections: true,
            selection: true,
        };
    }

    // --- change tracking ---

    /// Return and reset the change flags.
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.changes)
    }

    fn items_changed(&mut self) {
        self.reindex();
        self.changes.items = true;
    }

    fn reindex(&mut self) {
        self.spatial.update(&self.items);
    }

    // --- spatial queries ---

    /// Topmost item whose bounds contain the world point.
    pub fn hit_test(&self, point: Point) -> Option<ItemId> {
        self.spatial.hit_test(point.x, point.y)
    }

    /// Items whose bounds intersect `rect`, edges included, in item order.
    pub fn items_in_rect(&self, rect: Rect) -> Vec<ItemId> {
        let rect = rect.abs();
        self.spatial
            .query_rect(rect)
            .into_iter()
            .filter(|id| self.item(*id).is_some_and(|item| rects_touch(item.bounds(), rect)))
            .collect()
    }

    /// Union of all item bounds.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.items
            .iter()
            .map(CanvasItem::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Fit the view to show all items.
    pub fn fit_to_content(&mut self, padding: f64) {
        if let Some(bounds) = self.content_bounds() {
            self.camera.fit_to_bounds(bounds, self.viewport_size, padding);
        }
    }

    // --- items ---

    /// Append an item, growing it to the minimum size if needed.
    pub fn insert_item(&mut self, mut item: CanvasItem) -> ItemId {
        item.clamp_to_min(self.min_size);
        let id = item.id;
        self.items.push(item);
        self.items_changed();
        id
    }

    /// Remove items and every connection touching them. Unknown ids are
    /// ignored. Returns true if anything was removed.
    pub fn remove_items(&mut self, ids: &[ItemId]) -> bool {
        let doomed: HashSet<ItemId> = ids.iter().copied().collect();
        let before = self.items.len();
        self.items.retain(|item| !doomed.contains(&item.id));
        if self.items.len() == before {
            return false;
        }
        self.items_changed();

        let before = self.connections.len();
        self.connections
            .retain(|conn| !doomed.contains(&conn.from_id) && !doomed.contains(&conn.to_id));
        if self.connections.len() != before {
            let pruned = before - self.connections.len();
            log::debug!("Pruned {pruned} connections with deleted endpoints");
            self.changes.connections = true;
        }
        self.prune_selection();
        true
    }

    /// Replace the item array wholesale (untracked). Connections and
    /// selection entries referring to missing items are pruned.
    pub fn replace_items(&mut self, items: Vec<CanvasItem>) {
        let min = self.min_size;
        self.items = items;
        for item in &mut self.items {
            item.clamp_to_min(min);
        }
        self.items_changed();
        self.prune_connections();
        self.prune_selection();
    }

    /// Move each `(id, origin)` to `origin + delta`.
    pub fn move_items(&mut self, origins: &[(ItemId, Point)], delta: Vec2) {
        let mut moved = false;
        for &(id, origin) in origins {
            if let Some(item) = self.item_mut(id) {
                item.x = origin.x + delta.x;
                item.y = origin.y + delta.y;
                moved = true;
            }
        }
        if moved {
            self.items_changed();
        }
    }

    /// Set an item's geometry, clamped to the minimum size.
    pub fn set_item_bounds(&mut self, id: ItemId, bounds: Rect, height_mode: HeightMode) -> bool {
        let min = self.min_size;
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        item.set_bounds(bounds.abs());
        item.clamp_to_min(min);
        item.height_mode = height_mode;
        self.items_changed();
        true
    }

    /// Replace an item's serialized content. Returns false if the item is
    /// missing or the content is unchanged.
    pub fn set_item_content(&mut self, id: ItemId, content: String) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.content == content {
            return false;
        }
        item.content = content;
        self.changes.items = true;
        true
    }

    /// Update the style of each listed item.
    pub fn update_item_styles(
        &mut self,
        ids: &[ItemId],
        mut update: impl FnMut(&mut TextStyle),
    ) -> bool {
        let mut touched = false;
        for item in self.items.iter_mut().filter(|i| ids.contains(&i.id)) {
            update(&mut item.text_style);
            touched = true;
        }
        if touched {
            self.changes.items = true;
        }
        touched
    }

    pub fn set_item_color(&mut self, ids: &[ItemId], color: SerializableColor) -> bool {
        let mut touched = false;
        for item in self.items.iter_mut().filter(|i| ids.contains(&i.id)) {
            if item.color != color {
                item.color = color;
                touched = true;
            }
        }
        if touched {
            self.changes.items = true;
        }
        touched
    }

    /// Follow the measured content height of an auto-height item.
    pub fn set_auto_height(&mut self, id: ItemId, content_height: f64) -> bool {
        if !content_height.is_finite() {
            return false;
        }
        let min_height = self.min_size.height;
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if item.height_mode != HeightMode::Auto {
            return false;
        }
        let height = content_height.max(min_height);
        if (item.height - height).abs() < f64::EPSILON {
            return false;
        }
        item.height = height;
        self.items_changed();
        true
    }

    // --- connections ---

    /// Whether a `from -> to` connection could be added.
    pub fn can_connect(&self, from: ItemId, to: ItemId) -> bool {
        from != to
            && self.contains_item(from)
            && self.contains_item(to)
            && !self.connections.iter().any(|c| c.from_id == from && c.to_id == to)
    }

    /// Append a `from -> to` connection. Self-loops, duplicates and
    /// missing endpoints are rejected.
    pub fn add_connection(&mut self, from: ItemId, to: ItemId) -> Option<ConnectionId> {
        if !self.can_connect(from, to) {
            log::debug!("Rejected connection {from} -> {to}");
            return None;
        }
        let conn = CanvasConnection::new(from, to);
        let id = conn.id;
        self.connections.push(conn);
        self.changes.connections = true;
        Some(id)
    }

    /// Remove connections by id. Returns true if anything was removed.
    pub fn remove_connections(&mut self, ids: &[ConnectionId]) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| !ids.contains(&c.id));
        if self.connections.len() == before {
            return false;
        }
        self.changes.connections = true;
        self.prune_selection();
        true
    }

    /// Replace the connection array wholesale (untracked). Dangling
    /// connections and self-loops are dropped.
    pub fn replace_connections(&mut self, connections: Vec<CanvasConnection>) {
        self.connections = connections;
        self.changes.connections = true;
        self.prune_connections();
        self.prune_selection();
    }

    fn prune_connections(&mut self) {
        let ids: HashSet<ItemId> = self.items.iter().map(|i| i.id).collect();
        let before = self.connections.len();
        self.connections
            .retain(|c| c.from_id != c.to_id && ids.contains(&c.from_id) && ids.contains(&c.to_id));
        if self.connections.len() != before {
            log::debug!("Dropped {} dangling connections", before - self.connections.len());
            self.changes.connections = true;
        }
    }

    // --- selection ---

    fn prune_selection(&mut self) {
        let selection = std::mem::take(&mut self.selection);
        let mut kept = selection.clone();
        kept.retain(|id| self.entity_exists(id));
        if kept != selection {
            self.changes.selection = true;
        }
        self.selection = kept;
    }

    /// Replace the selection with a single entity, if it exists.
    pub fn select(&mut self, id: EntityId) {
        if self.entity_exists(id) {
            self.set_selection([id]);
        }
    }

    /// Flip membership of an existing entity.
    pub fn toggle_selection(&mut self, id: EntityId) {
        if self.entity_exists(id) {
            self.selection.toggle(id);
            self.changes.selection = true;
        }
    }

    /// Replace the selection; ids that do not exist are skipped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        let mut next = Selection::new();
        next.set(ids.into_iter().filter(|id| self.entity_exists(*id)));
        if next != self.selection {
            self.selection = next;
            self.changes.selection = true;
        }
    }

    /// Clear selection.
    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.changes.selection = true;
        }
    }

    /// Select all items.
    pub fn select_all(&mut self) {
        let all: Vec<EntityId> = self.items.iter().map(|i| EntityId::Item(i.id)).collect();
        self.set_selection(all);
    }

    /// Check if an item is selected.
    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains_item(id)
    }
}
