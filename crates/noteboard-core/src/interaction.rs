//! Gesture state machine.
//!
//! Pointer events drive exactly one [`InteractionState`] at a time. Each
//! state carries what it needs to finish its gesture; durable mutations
//! happen only on pointer-up, after a history snapshot.

use crate::canvas::Canvas;
use crate::config::EngineConfig;
use crate::input::{ClickTarget, ClickTracker, MouseButton, PointerEvent};
use crate::items::{CanvasItem, EntityId, HeightMode, ItemId, SourceReference};
use crate::richtext::{CommitScheduler, RichText};
use crate::selection::{
    HandleKind, ResizeHandle, connection_segments, hit_test_connections, hit_test_handles,
    resize_geometry,
};
use kurbo::{Point, Rect, Size, Vec2};

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// An item in text-edit mode and its uncommitted content.
#[derive(Debug, Clone)]
pub struct TextEdit {
    pub item: ItemId,
    pub commit: CommitScheduler,
}

/// The active gesture.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging empty canvas. The camera only moves once the pointer has
    /// travelled past the drag threshold.
    PanningCanvas {
        down: Point,
        last: Point,
        panning: bool,
    },
    /// Shift-drag on empty canvas; both corners in world space.
    LassoSelect { start: Point, current: Point },
    /// Pressed on a node body, not yet a drag.
    PendingNode {
        item: ItemId,
        down_screen: Point,
        down_world: Point,
        was_selected: bool,
        shift: bool,
    },
    DraggingNodes {
        grab: Point,
        current: Point,
        /// Initial world position of every dragged item.
        origins: Vec<(ItemId, Point)>,
    },
    ResizingNode {
        item: ItemId,
        handle: ResizeHandle,
        initial: Rect,
        start: Point,
        current: Point,
    },
    CreatingEdge {
        from: ItemId,
        start: Point,
        current: Point,
    },
    EditingText(TextEdit),
}

impl InteractionState {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::PanningCanvas { .. } => "PanningCanvas",
            Self::LassoSelect { .. } => "LassoSelect",
            Self::PendingNode { .. } => "PendingNode",
            Self::DraggingNodes { .. } => "DraggingNodes",
            Self::ResizingNode { .. } => "ResizingNode",
            Self::CreatingEdge { .. } => "CreatingEdge",
            Self::EditingText(_) => "EditingText",
        }
    }

    /// Whether a pointer gesture is in progress.
    pub fn is_gesture(&self) -> bool {
        !matches!(self, Self::Idle | Self::EditingText(_))
    }
}

/// Side effects the host must hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    EditingStarted(ItemId),
    EditingEnded(ItemId),
    JumpToSource(SourceReference),
}

/// Owns the interaction state and turns pointer events into canvas
/// mutations.
#[derive(Debug, Clone)]
pub struct Interaction {
    state: InteractionState,
    clicks: ClickTracker,
    config: EngineConfig,
    effects: Vec<InteractionEffect>,
}

impl Interaction {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            clicks: ClickTracker::new(config.double_click_window()),
            config: config.clone(),
            effects: Vec::new(),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Item currently in text-edit mode.
    pub fn editing_item(&self) -> Option<ItemId> {
        match &self.state {
            InteractionState::EditingText(edit) => Some(edit.item),
            _ => None,
        }
    }

    /// Drain pending side effects.
    pub fn take_effects(&mut self) -> Vec<InteractionEffect> {
        std::mem::take(&mut self.effects)
    }

    // --- pointer events ---

    pub fn pointer_down(&mut self, canvas: &mut Canvas, event: &PointerEvent) {
        if event.button == MouseButton::Right {
            return;
        }
        let world = canvas.camera.screen_to_world(event.position);
        let shift = event.modifiers.shift;

        if self.state.is_gesture() {
            // A press while a gesture is live means its release was lost.
            self.cancel_gesture();
        }

        if event.button == MouseButton::Middle {
            self.end_edit(canvas);
            self.state = InteractionState::PanningCanvas {
                down: event.position,
                last: event.position,
                panning: false,
            };
            return;
        }

        let handle = self.hit_handle(canvas, world);
        if let Some(editing) = self.editing_item() {
            if handle.is_none() && canvas.hit_test(world) == Some(editing) {
                // Caret placement inside the edited item belongs to the surface.
                return;
            }
            self.end_edit(canvas);
        }

        if let Some((item, bounds, kind)) = handle {
            self.clicks.reset();
            self.state = match kind {
                HandleKind::Connect => InteractionState::CreatingEdge {
                    from: item,
                    start: world,
                    current: world,
                },
                HandleKind::Resize(handle) => InteractionState::ResizingNode {
                    item,
                    handle,
                    initial: bounds,
                    start: world,
                    current: world,
                },
            };
            return;
        }

        if let Some(item) = canvas.hit_test(world) {
            let id = EntityId::Item(item);
            let was_selected = canvas.selection().contains(id);
            if shift {
                canvas.toggle_selection(id);
            } else if !was_selected {
                canvas.select(id);
            }
            self.state = InteractionState::PendingNode {
                item,
                down_screen: event.position,
                down_world: world,
                was_selected,
                shift,
            };
            return;
        }

        let segments = connection_segments(canvas.items(), canvas.connections());
        let tolerance = canvas.camera.screen_to_world_len(self.config.connection_tolerance);
        if let Some(conn) = hit_test_connections(&segments, world, tolerance) {
            let id = EntityId::Connection(conn);
            if shift {
                canvas.toggle_selection(id);
            } else {
                canvas.select(id);
            }
            self.clicks.reset();
            return;
        }

        self.state = if shift {
            InteractionState::LassoSelect {
                start: world,
                current: world,
            }
        } else {
            InteractionState::PanningCanvas {
                down: event.position,
                last: event.position,
                panning: false,
            }
        };
    }

    pub fn pointer_move(&mut self, canvas: &mut Canvas, event: &PointerEvent) {
        let screen = event.position;
        let world = canvas.camera.screen_to_world(screen);
        let threshold = self.config.drag_threshold;

        match &mut self.state {
            InteractionState::Idle | InteractionState::EditingText(_) => {}
            InteractionState::PanningCanvas { down, last, panning } => {
                if *panning {
                    canvas.camera.pan(screen - *last);
                } else if (screen - *down).hypot() > threshold {
                    *panning = true;
                    canvas.camera.pan(screen - *down);
                }
                *last = screen;
            }
            InteractionState::PendingNode {
                item,
                down_screen,
                down_world,
                ..
            } => {
                if (screen - *down_screen).hypot() > threshold {
                    let (item, grab) = (*item, *down_world);
                    let origins = drag_origins(canvas, item);
                    self.state = InteractionState::DraggingNodes {
                        grab,
                        current: world,
                        origins,
                    };
                }
            }
            InteractionState::LassoSelect { current, .. }
            | InteractionState::DraggingNodes { current, .. }
            | InteractionState::ResizingNode { current, .. }
            | InteractionState::CreatingEdge { current, .. } => *current = world,
        }
    }

    pub fn pointer_up(&mut self, canvas: &mut Canvas, event: &PointerEvent) {
        let screen = event.position;
        let world = canvas.camera.screen_to_world(screen);
        let threshold = self.config.drag_threshold;

        match std::mem::take(&mut self.state) {
            InteractionState::Idle => {}
            InteractionState::EditingText(edit) => {
                self.state = InteractionState::EditingText(edit);
            }
            InteractionState::PanningCanvas { down, panning, .. } => {
                if panning || (screen - down).hypot() > threshold {
                    self.clicks.reset();
                } else {
                    self.canvas_click(canvas, world, event.time);
                }
            }
            InteractionState::LassoSelect { start, .. } => {
                let rect = Rect::from_points(start, world);
                let hits = canvas.items_in_rect(rect);
                log::debug!("Lasso {rect:?} selected {} items", hits.len());
                canvas.set_selection(hits.into_iter().map(EntityId::Item));
                self.clicks.reset();
            }
            InteractionState::PendingNode {
                item,
                down_screen,
                down_world,
                was_selected,
                shift,
            } => {
                if (screen - down_screen).hypot() > threshold {
                    // The move events never crossed the threshold but the
                    // release did; treat it as a completed drag.
                    let origins = drag_origins(canvas, item);
                    self.finish_drag(canvas, &origins, world - down_world);
                } else {
                    self.node_click(canvas, item, was_selected, shift, event.time);
                }
            }
            InteractionState::DraggingNodes { grab, origins, .. } => {
                self.finish_drag(canvas, &origins, world - grab);
            }
            InteractionState::ResizingNode {
                item,
                handle,
                initial,
                start,
                ..
            } => {
                let bounds = resize_geometry(initial, handle, world - start, canvas.min_size());
                if bounds != initial {
                    canvas.commit_history();
                    canvas.set_item_bounds(item, bounds, HeightMode::Manual);
                }
                self.clicks.reset();
            }
            InteractionState::CreatingEdge { from, .. } => {
                match canvas.hit_test(world) {
                    Some(target) if target == from => {
                        log::debug!("Rejected self-loop on {from}");
                    }
                    Some(target) if canvas.can_connect(from, target) => {
                        canvas.commit_history();
                        canvas.add_connection(from, target);
                    }
                    _ => {}
                }
                self.clicks.reset();
            }
        }
    }

    /// Abort the active pointer gesture, discarding its transient state.
    /// Text editing is left alone. Returns true if a gesture was dropped.
    pub fn cancel_gesture(&mut self) -> bool {
        if !self.state.is_gesture() {
            return false;
        }
        log::debug!("Cancelled {} gesture", self.state.name());
        self.state = InteractionState::Idle;
        self.clicks.reset();
        true
    }

    fn hit_handle(&self, canvas: &Canvas, world: Point) -> Option<(ItemId, Rect, HandleKind)> {
        let zoom = canvas.camera.zoom;
        let tolerance = canvas.camera.screen_to_world_len(self.config.handle_tolerance);
        canvas
            .items()
            .iter()
            .rev()
            .filter(|item| canvas.is_selected(item.id))
            .find_map(|item| {
                hit_test_handles(item, world, tolerance, zoom)
                    .map(|kind| (item.id, item.bounds(), kind))
            })
    }

    fn finish_drag(&mut self, canvas: &mut Canvas, origins: &[(ItemId, Point)], delta: Vec2) {
        if delta != Vec2::ZERO && !origins.is_empty() {
            canvas.commit_history();
            canvas.move_items(origins, delta);
        }
        self.clicks.reset();
    }

    fn node_click(
        &mut self,
        canvas: &mut Canvas,
        item: ItemId,
        was_selected: bool,
        shift: bool,
        time: Instant,
    ) {
        if self.clicks.register(ClickTarget::Item(item), time) {
            match canvas.item(item).and_then(|i| i.source.clone()) {
                Some(source) => self.effects.push(InteractionEffect::JumpToSource(source)),
                None => {
                    self.begin_edit(canvas, item);
                }
            }
        } else if !shift && was_selected {
            canvas.select(EntityId::Item(item));
        }
    }

    fn canvas_click(&mut self, canvas: &mut Canvas, world: Point, time: Instant) {
        if self.clicks.register(ClickTarget::Canvas, time) {
            let mut item = CanvasItem::centered_at(world, self.config.default_item_size());
            item.text_style.font_size = self.config.default_font_size;
            canvas.commit_history();
            let id = canvas.insert_item(item);
            log::debug!("Created item {id} at {world:?}");
            self.begin_edit(canvas, id);
        } else {
            canvas.clear_selection();
        }
    }

    // --- text editing ---

    /// Enter text-edit mode for `item`, committing any other active edit
    /// first. Returns false if the item does not exist.
    pub fn begin_edit(&mut self, canvas: &mut Canvas, item: ItemId) -> bool {
        if !canvas.contains_item(item) {
            return false;
        }
        if self.editing_item() == Some(item) {
            return true;
        }
        self.cancel_gesture();
        self.end_edit(canvas);
        canvas.select(EntityId::Item(item));
        self.state = InteractionState::EditingText(TextEdit {
            item,
            commit: CommitScheduler::new(self.config.commit_debounce()),
        });
        self.effects.push(InteractionEffect::EditingStarted(item));
        true
    }

    /// Flush pending content and leave text-edit mode.
    pub fn end_edit(&mut self, canvas: &mut Canvas) -> Option<ItemId> {
        match std::mem::take(&mut self.state) {
            InteractionState::EditingText(mut edit) => {
                if let Some(content) = edit.commit.flush() {
                    commit_content(canvas, edit.item, &content);
                }
                self.effects.push(InteractionEffect::EditingEnded(edit.item));
                Some(edit.item)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Leave text-edit mode dropping pending content, e.g. because the
    /// item is gone.
    pub fn abandon_edit(&mut self) -> Option<ItemId> {
        match std::mem::take(&mut self.state) {
            InteractionState::EditingText(mut edit) => {
                edit.commit.cancel();
                self.effects.push(InteractionEffect::EditingEnded(edit.item));
                Some(edit.item)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Record fresh surface content for the edited item.
    pub fn record_edit(&mut self, item: ItemId, content: RichText, now: Instant) -> bool {
        match &mut self.state {
            InteractionState::EditingText(edit) if edit.item == item => {
                edit.commit.record(content, now);
                true
            }
            _ => false,
        }
    }

    /// Commit pending content if its debounce window has elapsed.
    pub fn flush_due(&mut self, canvas: &mut Canvas, now: Instant) -> bool {
        if let InteractionState::EditingText(edit) = &mut self.state {
            if let Some(content) = edit.commit.take_due(now) {
                return commit_content(canvas, edit.item, &content);
            }
        }
        false
    }

    /// Commit pending content now, staying in edit mode.
    pub fn flush_edit(&mut self, canvas: &mut Canvas) -> bool {
        if let InteractionState::EditingText(edit) = &mut self.state {
            if let Some(content) = edit.commit.flush() {
                return commit_content(canvas, edit.item, &content);
            }
        }
        false
    }

    /// Take the uncommitted content of the active edit without writing it,
    /// so the caller can fold it into its own history entry.
    pub fn take_pending_edit(&mut self) -> Option<RichText> {
        match &mut self.state {
            InteractionState::EditingText(edit) => edit.commit.flush(),
            _ => None,
        }
    }

    /// When pending content will be committed, if any.
    pub fn commit_deadline(&self) -> Option<Instant> {
        match &self.state {
            InteractionState::EditingText(edit) => edit.commit.deadline(),
            _ => None,
        }
    }

    // --- transient previews ---

    /// Bounds to draw for `item`, with an in-progress drag or resize
    /// applied. A resize preview may dip below the minimum size; the
    /// committed geometry never does.
    pub fn preview_bounds(&self, item: &CanvasItem) -> Rect {
        match &self.state {
            InteractionState::DraggingNodes { grab, current, origins } => origins
                .iter()
                .find(|(id, _)| *id == item.id)
                .map(|(_, origin)| {
                    Rect::from_origin_size(*origin + (*current - *grab), item.bounds().size())
                })
                .unwrap_or_else(|| item.bounds()),
            InteractionState::ResizingNode {
                item: id,
                handle,
                initial,
                start,
                current,
            } if *id == item.id => {
                resize_geometry(*initial, *handle, *current - *start, Size::ZERO)
            }
            _ => item.bounds(),
        }
    }

    /// The lasso rectangle in world space, while lassoing.
    pub fn lasso_rect(&self) -> Option<Rect> {
        match &self.state {
            InteractionState::LassoSelect { start, current } => {
                Some(Rect::from_points(*start, *current))
            }
            _ => None,
        }
    }

    /// Source item and pointer position of the edge being dragged out.
    pub fn edge_preview(&self) -> Option<(ItemId, Point)> {
        match &self.state {
            InteractionState::CreatingEdge { from, current, .. } => Some((*from, *current)),
            _ => None,
        }
    }
}

/// Items a drag moves: the whole selection if the grabbed node is part of
/// it, else just that node.
fn drag_origins(canvas: &Canvas, grabbed: ItemId) -> Vec<(ItemId, Point)> {
    if canvas.is_selected(grabbed) {
        canvas
            .items()
            .iter()
            .filter(|item| canvas.is_selected(item.id))
            .map(|item| (item.id, item.origin()))
            .collect()
    } else {
        canvas
            .item(grabbed)
            .map(|item| vec![(item.id, item.origin())])
            .unwrap_or_default()
    }
}

/// Replace an item's stored content with `content`, snapshotting history
/// first. Unchanged content commits nothing.
fn commit_content(canvas: &mut Canvas, item: ItemId, content: &RichText) -> bool {
    let serialized = content.serialize();
    let changed = canvas.item(item).is_some_and(|i| i.content != serialized);
    if changed {
        canvas.commit_history();
        canvas.set_item_content(item, serialized);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use std::time::Duration;

    struct Rig {
        canvas: Canvas,
        interaction: Interaction,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig::default();
            Self {
                canvas: Canvas::new(&config),
                interaction: Interaction::new(&config),
                t0: Instant::now(),
            }
        }

        fn add(&mut self, x: f64, y: f64, w: f64, h: f64) -> ItemId {
            self.canvas.insert_item(CanvasItem::new(x, y, w, h))
        }

        fn event(&self, x: f64, y: f64, ms: u64) -> PointerEvent {
            PointerEvent::new(Point::new(x, y), self.t0 + Duration::from_millis(ms))
        }

        fn gesture(&mut self, from: (f64, f64), to: (f64, f64), modifiers: Modifiers, ms: u64) {
            let down = self.event(from.0, from.1, ms).with_modifiers(modifiers);
            let up = self.event(to.0, to.1, ms + 50).with_modifiers(modifiers);
            self.interaction.pointer_down(&mut self.canvas, &down);
            self.interaction.pointer_move(&mut self.canvas, &up);
            self.interaction.pointer_up(&mut self.canvas, &up);
        }

        fn click(&mut self, x: f64, y: f64, ms: u64) {
            self.gesture((x, y), (x, y), Modifiers::NONE, ms);
        }
    }

    #[test]
    fn test_drag_commits_once() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 240.0, 140.0);
        rig.gesture((10.0, 10.0), (60.0, 40.0), Modifiers::NONE, 0);

        let item = rig.canvas.item(id).unwrap();
        assert_eq!(item.origin(), Point::new(50.0, 30.0));
        assert_eq!(rig.canvas.history().past_len(), 1);
        assert!(matches!(rig.interaction.state(), InteractionState::Idle));
    }

    #[test]
    fn test_drag_below_threshold_is_a_click() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 240.0, 140.0);
        rig.gesture((10.0, 10.0), (12.0, 12.0), Modifiers::NONE, 0);
        assert_eq!(rig.canvas.item(id).unwrap().origin(), Point::ZERO);
        assert!(!rig.canvas.can_undo());
        assert!(rig.canvas.is_selected(id));
    }

    #[test]
    fn test_drag_moves_whole_selection() {
        let mut rig = Rig::new();
        let a = rig.add(0.0, 0.0, 200.0, 100.0);
        let b = rig.add(400.0, 0.0, 200.0, 100.0);
        rig.canvas.set_selection([EntityId::Item(a), EntityId::Item(b)]);

        rig.gesture((10.0, 10.0), (30.0, 20.0), Modifiers::NONE, 0);
        assert_eq!(rig.canvas.item(a).unwrap().origin(), Point::new(20.0, 10.0));
        assert_eq!(rig.canvas.item(b).unwrap().origin(), Point::new(420.0, 10.0));
        assert_eq!(rig.canvas.history().past_len(), 1);
    }

    #[test]
    fn test_click_on_selected_node_collapses_selection() {
        let mut rig = Rig::new();
        let a = rig.add(0.0, 0.0, 200.0, 100.0);
        let b = rig.add(400.0, 0.0, 200.0, 100.0);
        rig.canvas.set_selection([EntityId::Item(a), EntityId::Item(b)]);
        rig.click(10.0, 10.0, 0);
        assert_eq!(rig.canvas.selection().items(), vec![a]);
    }

    #[test]
    fn test_shift_click_toggles() {
        let mut rig = Rig::new();
        let a = rig.add(0.0, 0.0, 200.0, 100.0);
        let b = rig.add(400.0, 0.0, 200.0, 100.0);
        rig.click(10.0, 10.0, 0);
        rig.gesture((410.0, 10.0), (410.0, 10.0), Modifiers::SHIFT, 1000);
        assert_eq!(rig.canvas.selection().items(), vec![a, b]);
        rig.gesture((10.0, 10.0), (10.0, 10.0), Modifiers::SHIFT, 2000);
        assert_eq!(rig.canvas.selection().items(), vec![b]);
    }

    #[test]
    fn test_resize_forces_manual_height() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 240.0, 140.0);
        rig.canvas.select(EntityId::Item(id));
        rig.gesture((240.0, 140.0), (270.0, 160.0), Modifiers::NONE, 0);

        let item = rig.canvas.item(id).unwrap();
        assert_eq!(item.bounds(), Rect::new(0.0, 0.0, 270.0, 160.0));
        assert_eq!(item.height_mode, HeightMode::Manual);
        assert_eq!(rig.canvas.history().past_len(), 1);
    }

    #[test]
    fn test_resize_preview_is_not_clamped_but_commit_is() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 240.0, 140.0);
        rig.canvas.select(EntityId::Item(id));

        let down = rig.event(240.0, 70.0, 0);
        let moved = rig.event(40.0, 70.0, 10);
        rig.interaction.pointer_down(&mut rig.canvas, &down);
        rig.interaction.pointer_move(&mut rig.canvas, &moved);
        let item = rig.canvas.item(id).unwrap().clone();
        assert_eq!(rig.interaction.preview_bounds(&item).width(), 40.0);

        rig.interaction.pointer_up(&mut rig.canvas, &moved);
        assert_eq!(rig.canvas.item(id).unwrap().width, 120.0);
    }

    #[test]
    fn test_shrinking_a_minimum_item_commits_nothing() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 120.0, 80.0);
        rig.canvas.select(EntityId::Item(id));
        rig.gesture((120.0, 80.0), (90.0, 60.0), Modifiers::NONE, 0);

        let item = rig.canvas.item(id).unwrap();
        assert_eq!(item.bounds(), Rect::new(0.0, 0.0, 120.0, 80.0));
        assert_eq!(item.height_mode, HeightMode::Auto);
        assert!(!rig.canvas.can_undo());
    }

    #[test]
    fn test_lasso_selects_touching_items() {
        let mut rig = Rig::new();
        let inside = rig.add(10.0, 10.0, 130.0, 90.0);
        let _outside = rig.add(300.0, 300.0, 130.0, 90.0);
        rig.gesture((0.0, 0.0), (260.0, 100.0), Modifiers::SHIFT, 0);
        assert_eq!(rig.canvas.selection().items(), vec![inside]);
        assert!(!rig.canvas.can_undo());
    }

    #[test]
    fn test_edge_creation() {
        let mut rig = Rig::new();
        let a = rig.add(0.0, 0.0, 200.0, 100.0);
        let b = rig.add(400.0, 0.0, 200.0, 100.0);
        rig.canvas.select(EntityId::Item(a));

        let handle = Point::new(200.0 + crate::selection::CONNECT_HANDLE_OFFSET, 50.0);
        rig.gesture((handle.x, handle.y), (500.0, 50.0), Modifiers::NONE, 0);
        assert_eq!(rig.canvas.connections().len(), 1);
        assert_eq!(rig.canvas.connections()[0].from_id, a);
        assert_eq!(rig.canvas.connections()[0].to_id, b);
        assert!(rig.interaction.edge_preview().is_none());

        // Dropping back onto the source is a self-loop and is rejected.
        rig.gesture((handle.x, handle.y), (100.0, 50.0), Modifiers::NONE, 1000);
        assert_eq!(rig.canvas.connections().len(), 1);
        assert_eq!(rig.canvas.history().past_len(), 1);
    }

    #[test]
    fn test_pan_then_double_click_creates_item() {
        let mut rig = Rig::new();
        rig.gesture((0.0, 0.0), (100.0, 50.0), Modifiers::NONE, 0);
        assert_eq!(rig.canvas.camera.offset, Vec2::new(100.0, 50.0));

        rig.click(400.0, 250.0, 1000);
        rig.click(400.0, 250.0, 1200);

        let item = &rig.canvas.items()[0];
        assert_eq!(item.bounds().center(), Point::new(300.0, 200.0));
        assert_eq!(rig.interaction.editing_item(), Some(item.id));
        assert_eq!(
            rig.interaction.take_effects(),
            vec![InteractionEffect::EditingStarted(item.id)]
        );
    }

    #[test]
    fn test_double_click_on_sourced_item_jumps() {
        let mut rig = Rig::new();
        let mut item = CanvasItem::new(0.0, 0.0, 200.0, 100.0);
        let source = SourceReference {
            provider: "slides".to_string(),
            object_id: "p1".to_string(),
        };
        item.source = Some(source.clone());
        rig.canvas.insert_item(item);

        rig.click(10.0, 10.0, 0);
        rig.click(10.0, 10.0, 100);
        assert!(rig.interaction.editing_item().is_none());
        assert_eq!(rig.interaction.take_effects(), vec![InteractionEffect::JumpToSource(source)]);
    }

    #[test]
    fn test_click_outside_flushes_edit() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 200.0, 100.0);
        assert!(rig.interaction.begin_edit(&mut rig.canvas, id));
        rig.interaction
            .record_edit(id, RichText::from_plain_text("hello"), rig.t0);

        // Clicking inside the edited item keeps editing.
        rig.click(50.0, 50.0, 0);
        assert_eq!(rig.interaction.editing_item(), Some(id));
        assert!(!rig.canvas.can_undo());

        rig.click(900.0, 900.0, 1000);
        assert!(rig.interaction.editing_item().is_none());
        let stored = RichText::parse(&rig.canvas.item(id).unwrap().content);
        assert_eq!(stored.plain_text(), "hello");
        assert!(rig.canvas.selection().is_empty());
        assert_eq!(rig.canvas.history().past_len(), 1);
    }

    #[test]
    fn test_debounced_commit() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 200.0, 100.0);
        rig.interaction.begin_edit(&mut rig.canvas, id);
        rig.interaction
            .record_edit(id, RichText::from_plain_text("a"), rig.t0);

        assert!(!rig.interaction.flush_due(&mut rig.canvas, rig.t0 + Duration::from_millis(100)));
        assert!(rig.interaction.flush_due(&mut rig.canvas, rig.t0 + Duration::from_millis(500)));
        assert_eq!(rig.interaction.editing_item(), Some(id));
        assert!(rig.interaction.commit_deadline().is_none());
    }

    #[test]
    fn test_cancel_discards_transient_state() {
        let mut rig = Rig::new();
        let id = rig.add(0.0, 0.0, 240.0, 140.0);
        let down = rig.event(10.0, 10.0, 0);
        let moved = rig.event(200.0, 200.0, 10);
        rig.interaction.pointer_down(&mut rig.canvas, &down);
        rig.interaction.pointer_move(&mut rig.canvas, &moved);
        assert!(matches!(rig.interaction.state(), InteractionState::DraggingNodes { .. }));

        assert!(rig.interaction.cancel_gesture());
        rig.interaction.pointer_up(&mut rig.canvas, &moved);
        assert_eq!(rig.canvas.item(id).unwrap().origin(), Point::ZERO);
        assert!(!rig.canvas.can_undo());
    }
}
