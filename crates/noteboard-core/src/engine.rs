//! Canvas engine facade.
//!
//! [`CanvasEngine`] is the single writer for all canvas state. Hosts either
//! call its methods directly from the event loop, or post
//! [`EngineCommand`]s through a [`CommandSender`] from anywhere (property
//! panel, finished AI jobs) and let [`CanvasEngine::tick`] apply them
//! serially once per frame.

use crate::ai::{AiError, AiJob, AiOutcome, AiTask};
use crate::camera::{Camera, VisibleBounds};
use crate::canvas::{BoardDocument, Canvas};
use crate::config::EngineConfig;
use crate::input::{Key, KeyEvent, PointerEvent, WheelEvent};
use crate::interaction::{Interaction, InteractionEffect, InteractionState};
use crate::items::{
    CanvasConnection, CanvasItem, ConnectionId, EntityId, ItemDraft, ItemId, SerializableColor,
    SourceReference, TextStyle,
};
use crate::richtext::{FormatCommand, RichText, SurfaceNode, apply_to_style, from_surface};
use crate::selection::{Handle, Selection, item_handles};
use kurbo::{Affine, Line, Point, Rect, Size, Vec2};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Zoom factor applied per wheel notch with the action modifier held.
pub const WHEEL_ZOOM_IN: f64 = 1.1;
/// Zoom factor applied per wheel notch when zooming out.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
/// Screen padding used by fit-to-content.
pub const FIT_PADDING: f64 = 50.0;
/// World-space gap between summarized items and their summary.
pub const SUMMARY_GAP: f64 = 40.0;

/// Everything the engine can be asked to do.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerCaptureLost,
    Wheel(WheelEvent),
    Key(KeyEvent),
    SetViewportSize(Size),
    /// Raw tree of the editable surface after an input.
    SurfaceInput {
        item: ItemId,
        nodes: Vec<SurfaceNode>,
        time: Instant,
    },
    /// The editable surface lost focus.
    SurfaceBlur(ItemId),
    BeginEdit(ItemId),
    EndEdit,
    Format(FormatCommand),
    CreateFromDraft(ItemDraft),
    DeleteItems(Vec<ItemId>),
    DeleteConnections(Vec<ConnectionId>),
    DeleteSelection,
    SelectAll,
    SetSelection(Vec<EntityId>),
    SetItems(Vec<CanvasItem>),
    SetConnections(Vec<CanvasConnection>),
    SetItemColor(Vec<ItemId>, SerializableColor),
    ReportContentHeight { item: ItemId, height: f64 },
    Undo,
    Redo,
    FitToContent,
    AiCompleted(AiOutcome),
}

/// Notifications for the host, drained with [`CanvasEngine::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Proposed replacement of the host's item array.
    ItemsChanged(Vec<CanvasItem>),
    /// Proposed replacement of the host's connection array.
    ConnectionsChanged(Vec<CanvasConnection>),
    SelectionChanged(Vec<EntityId>),
    EditingStarted(ItemId),
    EditingEnded(ItemId),
    JumpToSource(SourceReference),
    /// Apply this command to the active editable surface.
    ApplyFormat(FormatCommand),
    AiBusyChanged(bool),
    AiFailed(String),
}

/// Clonable handle for posting commands to the engine.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<EngineCommand>,
}

impl CommandSender {
    /// Queue a command for the next tick. Returns false if the engine is
    /// gone.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dropped engine command, engine is gone: {:?}", e.0);
                false
            }
        }
    }
}

/// Display state of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemState {
    #[default]
    Normal,
    Selected,
    Editing,
}

/// Geometry and state of one item for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRender {
    pub id: ItemId,
    /// World bounds with any in-progress drag or resize applied.
    pub bounds: Rect,
    pub state: ItemState,
    /// Whether the item lies in the padded visible region (or is being edited).
    pub materialized: bool,
}

/// One connection for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRender {
    pub id: ConnectionId,
    pub line: Line,
    pub selected: bool,
}

/// Everything a renderer needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// World-to-screen transform.
    pub transform: Affine,
    pub zoom: f64,
    pub items: Vec<ItemRender>,
    pub connections: Vec<ConnectionRender>,
    pub lasso: Option<Rect>,
    pub edge_preview: Option<Line>,
    /// Handles of selected items, hidden while a gesture is active.
    pub handles: Vec<Handle>,
}

/// The canvas engine.
pub struct CanvasEngine {
    config: EngineConfig,
    canvas: Canvas,
    interaction: Interaction,
    visible: VisibleBounds,
    ai_busy: bool,
    commands_tx: Sender<EngineCommand>,
    commands_rx: Receiver<EngineCommand>,
    events: Vec<EngineEvent>,
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CanvasEngine {
    /// Build an engine. A config that fails validation is replaced by the
    /// defaults.
    pub fn new(config: EngineConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Invalid engine config, using defaults: {e}");
                EngineConfig::default()
            }
        };
        let (commands_tx, commands_rx) = channel();
        let canvas = Canvas::new(&config);
        let mut visible = VisibleBounds::new(
            config.visible_padding,
            config.visible_pan_threshold,
            config.visible_zoom_threshold,
        );
        visible.update(&canvas.camera, canvas.viewport_size);
        Self {
            interaction: Interaction::new(&config),
            canvas,
            visible,
            config,
            ai_busy: false,
            commands_tx,
            commands_rx,
            events: Vec::new(),
        }
    }

    // --- accessors ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn camera(&self) -> &Camera {
        &self.canvas.camera
    }

    pub fn items(&self) -> &[CanvasItem] {
        self.canvas.items()
    }

    pub fn connections(&self) -> &[CanvasConnection] {
        self.canvas.connections()
    }

    pub fn selection(&self) -> &Selection {
        self.canvas.selection()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn editing_item(&self) -> Option<ItemId> {
        self.interaction.editing_item()
    }

    pub fn ai_busy(&self) -> bool {
        self.ai_busy
    }

    pub fn can_undo(&self) -> bool {
        self.canvas.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.canvas.can_redo()
    }

    /// Padded visible world rectangle.
    pub fn visible_bounds(&self) -> Rect {
        self.visible.bounds()
    }

    /// A handle for posting commands from elsewhere in the host.
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.commands_tx.clone(),
        }
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // --- frame loop ---

    /// Apply queued commands, commit debounced text and refresh the
    /// visible bounds. Returns the events produced since the last drain.
    pub fn tick(&mut self, now: Instant) -> Vec<EngineEvent> {
        while let Ok(command) = self.commands_rx.try_recv() {
            self.handle(command);
        }
        self.interaction.flush_due(&mut self.canvas, now);
        self.sync();
        self.take_events()
    }

    /// Apply one command immediately.
    pub fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::PointerDown(event) => self.pointer_down(&event),
            EngineCommand::PointerMove(event) => self.pointer_move(&event),
            EngineCommand::PointerUp(event) => self.pointer_up(&event),
            EngineCommand::PointerCaptureLost => self.pointer_capture_lost(),
            EngineCommand::Wheel(event) => self.wheel(&event),
            EngineCommand::Key(event) => self.key(&event),
            EngineCommand::SetViewportSize(size) => self.set_viewport_size(size),
            EngineCommand::SurfaceInput { item, nodes, time } => {
                self.surface_input(item, &nodes, time);
            }
            EngineCommand::SurfaceBlur(item) => self.surface_blur(item),
            EngineCommand::BeginEdit(item) => {
                self.begin_edit(item);
            }
            EngineCommand::EndEdit => self.end_edit(),
            EngineCommand::Format(command) => self.apply_format(command),
            EngineCommand::CreateFromDraft(draft) => {
                self.create_from_draft(draft);
            }
            EngineCommand::DeleteItems(ids) => self.delete_items(&ids),
            EngineCommand::DeleteConnections(ids) => self.delete_connections(&ids),
            EngineCommand::DeleteSelection => self.delete_selection(),
            EngineCommand::SelectAll => self.select_all(),
            EngineCommand::SetSelection(ids) => self.set_selection(ids),
            EngineCommand::SetItems(items) => self.set_items(items),
            EngineCommand::SetConnections(connections) => self.set_connections(connections),
            EngineCommand::SetItemColor(ids, color) => self.set_item_color(&ids, color),
            EngineCommand::ReportContentHeight { item, height } => {
                self.report_content_height(item, height)
            }
            EngineCommand::Undo => self.undo(),
            EngineCommand::Redo => self.redo(),
            EngineCommand::FitToContent => self.fit_to_content(),
            EngineCommand::AiCompleted(outcome) => self.complete_ai(outcome),
        }
    }

    /// Turn canvas changes and interaction effects into events.
    fn sync(&mut self) {
        let changes = self.canvas.take_changes();
        if changes.items {
            self.events.push(EngineEvent::ItemsChanged(self.canvas.items().to_vec()));
        }
        if changes.connections {
            self.events
                .push(EngineEvent::ConnectionsChanged(self.canvas.connections().to_vec()));
        }
        if changes.selection {
            self.events
                .push(EngineEvent::SelectionChanged(self.canvas.selection().as_slice().to_vec()));
        }
        for effect in self.interaction.take_effects() {
            self.events.push(match effect {
                InteractionEffect::EditingStarted(item) => EngineEvent::EditingStarted(item),
                InteractionEffect::EditingEnded(item) => EngineEvent::EditingEnded(item),
                InteractionEffect::JumpToSource(source) => EngineEvent::JumpToSource(source),
            });
        }
        self.visible.update(&self.canvas.camera, self.canvas.viewport_size);
    }

    // --- input ---

    pub fn pointer_down(&mut self, event: &PointerEvent) {
        self.interaction.pointer_down(&mut self.canvas, event);
        self.sync();
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) {
        self.interaction.pointer_move(&mut self.canvas, event);
        self.sync();
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) {
        self.interaction.pointer_up(&mut self.canvas, event);
        self.sync();
    }

    /// Pointer capture was released without a pointer-up: drop the gesture
    /// without committing anything. An active text edit is kept.
    pub fn pointer_capture_lost(&mut self) {
        self.interaction.cancel_gesture();
        self.sync();
    }

    /// Ctrl/Cmd+wheel zooms at the cursor, plain wheel pans.
    pub fn wheel(&mut self, event: &WheelEvent) {
        if event.modifiers.action() {
            if event.delta.y < 0.0 {
                self.canvas.camera.zoom_at(event.position, WHEEL_ZOOM_IN);
            } else if event.delta.y > 0.0 {
                self.canvas.camera.zoom_at(event.position, WHEEL_ZOOM_OUT);
            }
        } else {
            self.canvas.camera.pan(-event.delta);
        }
        self.sync();
    }

    pub fn key(&mut self, event: &KeyEvent) {
        if event.key == Key::Escape {
            if !self.interaction.cancel_gesture() {
                self.interaction.end_edit(&mut self.canvas);
            }
            self.sync();
            return;
        }
        if self.editing_item().is_some() {
            // Everything else belongs to the editable surface.
            return;
        }
        let action = event.modifiers.action();
        match &event.key {
            Key::Delete | Key::Backspace => self.delete_selection(),
            Key::Character('z') if action && event.modifiers.shift => self.redo(),
            Key::Character('z') if action => self.undo(),
            Key::Character('y') if action => self.redo(),
            Key::Character('a') if action => self.select_all(),
            _ => {}
        }
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.canvas.viewport_size = size;
        self.sync();
    }

    // --- text editing ---

    pub fn begin_edit(&mut self, item: ItemId) -> bool {
        let started = self.interaction.begin_edit(&mut self.canvas, item);
        self.sync();
        started
    }

    /// Flush pending content and leave text-edit mode.
    pub fn end_edit(&mut self) {
        self.interaction.end_edit(&mut self.canvas);
        self.sync();
    }

    /// Relay the surface tree after an input. The content is committed once
    /// the debounce window passes without further input.
    pub fn surface_input(&mut self, item: ItemId, nodes: &[SurfaceNode], time: Instant) -> bool {
        self.interaction.record_edit(item, from_surface(nodes), time)
    }

    /// The surface for `item` lost focus.
    pub fn surface_blur(&mut self, item: ItemId) {
        if self.editing_item() == Some(item) {
            self.end_edit();
        }
    }

    /// Apply a formatting command from the property panel.
    ///
    /// While editing, the command is recorded in the edited item's style and
    /// forwarded to the surface through [`EngineEvent::ApplyFormat`];
    /// otherwise it updates the style of every selected item.
    pub fn apply_format(&mut self, command: FormatCommand) {
        let command = command.clamped();
        let editing = self.editing_item();
        let targets = match editing {
            Some(item) => vec![item],
            None => self.canvas.selection().items(),
        };
        if targets.is_empty() {
            return;
        }
        // Pending text and the style change land in one undo step.
        let pending = self.interaction.take_pending_edit();
        self.canvas.commit_history();
        if let (Some(item), Some(content)) = (editing, pending) {
            self.canvas.set_item_content(item, content.serialize());
        }
        self.canvas
            .update_item_styles(&targets, |style| apply_to_style(style, command));
        if editing.is_some() {
            self.events.push(EngineEvent::ApplyFormat(command));
        }
        self.sync();
    }

    // --- data model ---

    /// Create an item from host-supplied properties.
    pub fn create_from_draft(&mut self, draft: ItemDraft) -> ItemId {
        let size = draft.size.unwrap_or_else(|| self.config.default_item_size());
        let mut item = CanvasItem::new(draft.position.x, draft.position.y, size.width, size.height);
        item.content = draft.content;
        item.text_style = draft.text_style.unwrap_or_else(|| TextStyle {
            font_size: self.config.default_font_size,
            ..TextStyle::default()
        });
        if let Some(color) = draft.color {
            item.color = color;
        }
        item.author_id = draft.author_id;
        item.source = draft.source;

        self.canvas.commit_history();
        let id = self.canvas.insert_item(item);
        self.sync();
        id
    }

    /// Delete items and their connections. Unknown ids are ignored.
    pub fn delete_items(&mut self, ids: &[ItemId]) {
        if !ids.iter().any(|id| self.canvas.contains_item(*id)) {
            return;
        }
        self.prepare_delete(ids);
        self.canvas.commit_history();
        self.canvas.remove_items(ids);
        self.sync();
    }

    pub fn delete_connections(&mut self, ids: &[ConnectionId]) {
        if !ids.iter().any(|id| self.canvas.contains_connection(*id)) {
            return;
        }
        self.canvas.commit_history();
        self.canvas.remove_connections(ids);
        self.sync();
    }

    /// Delete every selected item and connection as one undo step.
    pub fn delete_selection(&mut self) {
        let items = self.canvas.selection().items();
        let connections = self.canvas.selection().connections();
        if items.is_empty() && connections.is_empty() {
            return;
        }
        self.prepare_delete(&items);
        self.canvas.commit_history();
        self.canvas.remove_connections(&connections);
        self.canvas.remove_items(&items);
        self.sync();
    }

    fn prepare_delete(&mut self, items: &[ItemId]) {
        self.interaction.cancel_gesture();
        if self.editing_item().is_some_and(|editing| items.contains(&editing)) {
            self.interaction.abandon_edit();
        }
    }

    pub fn select_all(&mut self) {
        self.canvas.select_all();
        self.sync();
    }

    /// Replace the selection. Selecting away from the edited item ends the
    /// edit, committing its pending text first.
    pub fn set_selection(&mut self, ids: Vec<EntityId>) {
        if let Some(editing) = self.editing_item() {
            if !ids.contains(&EntityId::Item(editing)) {
                self.interaction.end_edit(&mut self.canvas);
            }
        }
        self.canvas.set_selection(ids);
        self.sync();
    }

    /// Replace the item array (untracked). Dangling connections and
    /// selection entries are pruned.
    pub fn set_items(&mut self, items: Vec<CanvasItem>) {
        self.interaction.cancel_gesture();
        self.canvas.replace_items(items);
        if let Some(editing) = self.editing_item() {
            if !self.canvas.contains_item(editing) {
                self.interaction.abandon_edit();
            }
        }
        self.sync();
    }

    /// Replace the connection array (untracked).
    pub fn set_connections(&mut self, connections: Vec<CanvasConnection>) {
        self.canvas.replace_connections(connections);
        self.sync();
    }

    pub fn set_item_color(&mut self, ids: &[ItemId], color: SerializableColor) {
        let differs = ids
            .iter()
            .any(|id| self.canvas.item(*id).is_some_and(|item| item.color != color));
        if !differs {
            return;
        }
        self.canvas.commit_history();
        self.canvas.set_item_color(ids, color);
        self.sync();
    }

    /// The renderer measured the content of an item. Auto-height items
    /// follow it; this is layout, not an undoable edit.
    pub fn report_content_height(&mut self, item: ItemId, height: f64) {
        if self.canvas.set_auto_height(item, height) {
            self.sync();
        }
    }

    /// Undo the last committed mutation, leaving any gesture or text edit
    /// first.
    pub fn undo(&mut self) {
        self.interaction.cancel_gesture();
        self.interaction.end_edit(&mut self.canvas);
        if !self.canvas.undo() {
            log::debug!("Nothing to undo");
        }
        self.sync();
    }

    pub fn redo(&mut self) {
        self.interaction.cancel_gesture();
        self.interaction.end_edit(&mut self.canvas);
        if !self.canvas.redo() {
            log::debug!("Nothing to redo");
        }
        self.sync();
    }

    pub fn fit_to_content(&mut self) {
        self.canvas.fit_to_content(FIT_PADDING);
        self.sync();
    }

    // --- persistence ---

    /// Snapshot the document arrays as a board.
    pub fn to_document(&self, id: impl Into<String>, name: impl Into<String>) -> BoardDocument {
        BoardDocument {
            id: id.into(),
            name: name.into(),
            items: self.canvas.items().to_vec(),
            connections: self.canvas.connections().to_vec(),
        }
    }

    /// Replace everything with a loaded board. History starts over.
    pub fn load_document(&mut self, document: BoardDocument) {
        self.interaction.cancel_gesture();
        self.interaction.abandon_edit();
        self.canvas.replace_items(document.items);
        self.canvas.replace_connections(document.connections);
        self.canvas.clear_selection();
        self.canvas.clear_history();
        log::info!("Loaded board {} ({})", document.id, document.name);
        self.sync();
    }

    // --- AI ---

    /// Start a rewrite of `item`. Returns `None` while another AI job is in
    /// flight or when the item has no text.
    pub fn request_rewrite(
        &mut self,
        item: ItemId,
        style_hint: impl Into<String>,
    ) -> Option<AiJob> {
        if self.ai_busy {
            log::debug!("AI busy, ignoring rewrite request");
            return None;
        }
        if self.editing_item() == Some(item) {
            self.interaction.flush_edit(&mut self.canvas);
        }
        let text = RichText::parse(&self.canvas.item(item)?.content).plain_text();
        if text.trim().is_empty() {
            return None;
        }
        self.set_ai_busy(true);
        self.sync();
        Some(AiJob {
            task: AiTask::Rewrite {
                item,
                text,
                style_hint: style_hint.into(),
            },
        })
    }

    /// Start a summary of `items`. Missing or blank items are skipped.
    pub fn request_summary(&mut self, items: &[ItemId]) -> Option<AiJob> {
        if self.ai_busy {
            log::debug!("AI busy, ignoring summary request");
            return None;
        }
        self.interaction.flush_edit(&mut self.canvas);
        let (items, texts): (Vec<ItemId>, Vec<String>) = items
            .iter()
            .filter_map(|id| {
                let text = RichText::parse(&self.canvas.item(*id)?.content).plain_text();
                (!text.trim().is_empty()).then_some((*id, text))
            })
            .unzip();
        if items.is_empty() {
            return None;
        }
        self.set_ai_busy(true);
        self.sync();
        Some(AiJob {
            task: AiTask::Summarize { items, texts },
        })
    }

    /// Apply a finished AI job. Failures only clear the busy flag and are
    /// reported through [`EngineEvent::AiFailed`].
    pub fn complete_ai(&mut self, outcome: AiOutcome) {
        self.set_ai_busy(false);
        let applied = outcome.result.and_then(|text| match outcome.task {
            AiTask::Rewrite { item, .. } => self.apply_rewrite(item, &text),
            AiTask::Summarize { items, .. } => self.apply_summary(&items, &text),
        });
        if let Err(e) = applied {
            log::warn!("AI request failed: {e}");
            self.events.push(EngineEvent::AiFailed(e.to_string()));
        }
        self.sync();
    }

    fn set_ai_busy(&mut self, busy: bool) {
        if self.ai_busy != busy {
            self.ai_busy = busy;
            self.events.push(EngineEvent::AiBusyChanged(busy));
        }
    }

    fn apply_rewrite(&mut self, item: ItemId, text: &str) -> Result<(), AiError> {
        if !self.canvas.contains_item(item) {
            return Err(AiError::StaleTarget);
        }
        if self.editing_item() == Some(item) {
            self.interaction.end_edit(&mut self.canvas);
        }
        let content = RichText::from_plain_text(text).serialize();
        if self.canvas.item(item).is_some_and(|i| i.content != content) {
            self.canvas.commit_history();
            self.canvas.set_item_content(item, content);
        }
        Ok(())
    }

    fn apply_summary(&mut self, sources: &[ItemId], text: &str) -> Result<(), AiError> {
        let bounds = sources
            .iter()
            .filter_map(|id| self.canvas.item(*id).map(CanvasItem::bounds))
            .reduce(|acc, b| acc.union(b))
            .ok_or(AiError::StaleTarget)?;
        let size = self.config.default_item_size();
        let mut item = CanvasItem::new(bounds.x1 + SUMMARY_GAP, bounds.y0, size.width, size.height);
        item.content = RichText::from_plain_text(text).serialize();
        item.text_style.font_size = self.config.default_font_size;

        self.interaction.end_edit(&mut self.canvas);
        self.canvas.commit_history();
        let id = self.canvas.insert_item(item);
        self.canvas.select(EntityId::Item(id));
        Ok(())
    }

    // --- rendering ---

    /// Snapshot of everything the renderer paints this frame.
    pub fn render_state(&self) -> RenderState {
        let editing = self.editing_item();
        let items: Vec<ItemRender> = self
            .canvas
            .items()
            .iter()
            .map(|item| {
                let bounds = self.interaction.preview_bounds(item);
                let is_editing = editing == Some(item.id);
                let state = if is_editing {
                    ItemState::Editing
                } else if self.canvas.is_selected(item.id) {
                    ItemState::Selected
                } else {
                    ItemState::Normal
                };
                ItemRender {
                    id: item.id,
                    bounds,
                    state,
                    materialized: self.visible.should_materialize(bounds, is_editing),
                }
            })
            .collect();

        // Connections follow the previewed geometry so edges track a drag.
        let centers: HashMap<ItemId, Point> =
            items.iter().map(|r| (r.id, r.bounds.center())).collect();
        let connections = self
            .canvas
            .connections()
            .iter()
            .filter_map(|conn| {
                Some(ConnectionRender {
                    id: conn.id,
                    line: Line::new(*centers.get(&conn.from_id)?, *centers.get(&conn.to_id)?),
                    selected: self.canvas.selection().contains(EntityId::Connection(conn.id)),
                })
            })
            .collect();

        let edge_preview = self
            .interaction
            .edge_preview()
            .and_then(|(from, current)| Some(Line::new(*centers.get(&from)?, current)));

        let handles = if self.interaction.state().is_gesture() {
            Vec::new()
        } else {
            self.canvas
                .items()
                .iter()
                .filter(|item| self.canvas.is_selected(item.id))
                .flat_map(|item| item_handles(item, self.canvas.camera.zoom))
                .collect()
        };

        RenderState {
            transform: self.canvas.camera.transform(),
            zoom: self.canvas.camera.zoom,
            items,
            connections,
            lasso: self.interaction.lasso_rect(),
            edge_preview,
            handles,
        }
    }

    /// Convert a screen point to world coordinates with the current camera.
    pub fn screen_to_world(&self, point: Point) -> Point {
        self.canvas.camera.screen_to_world(point)
    }

    /// Pan the camera directly (e.g. from a minimap).
    pub fn pan_by(&mut self, delta: Vec2) {
        self.canvas.camera.pan(delta);
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiResult, AiService};
    use crate::input::Modifiers;
    use crate::items::HeightMode;
    use crate::storage::BoxFuture;
    use std::time::Duration;

    struct Echo;

    impl AiService for Echo {
        fn rewrite<'a>(
            &'a self,
            text: &'a str,
            style_hint: &'a str,
        ) -> BoxFuture<'a, AiResult<String>> {
            Box::pin(async move { Ok(format!("{text} ({style_hint})")) })
        }

        fn summarize<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, AiResult<String>> {
            Box::pin(async move { Ok(texts.join(" + ")) })
        }
    }

    struct Down;

    impl AiService for Down {
        fn rewrite<'a>(&'a self, _: &'a str, _: &'a str) -> BoxFuture<'a, AiResult<String>> {
            Box::pin(async { Err(AiError::Unavailable("offline".to_string())) })
        }

        fn summarize<'a>(&'a self, _: &'a [String]) -> BoxFuture<'a, AiResult<String>> {
            Box::pin(async { Err(AiError::Unavailable("offline".to_string())) })
        }
    }

    fn engine_with_items(n: usize) -> (CanvasEngine, Vec<ItemId>) {
        let mut engine = CanvasEngine::default();
        let ids = (0..n)
            .map(|i| {
                engine.create_from_draft(ItemDraft {
                    position: Point::new(i as f64 * 300.0, 0.0),
                    content: format!("note {i}"),
                    ..ItemDraft::default()
                })
            })
            .collect();
        engine.take_events();
        (engine, ids)
    }

    fn key(key: Key, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::new(key, modifiers)
    }

    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    #[test]
    fn test_create_from_draft_uses_defaults() {
        let (engine, ids) = engine_with_items(1);
        let item = engine.canvas().item(ids[0]).unwrap();
        assert_eq!(item.bounds(), Rect::new(0.0, 0.0, 240.0, 140.0));
        assert_eq!(item.height_mode, HeightMode::Auto);
        assert_eq!(engine.canvas().history().past_len(), 1);
    }

    #[test]
    fn test_events_propose_full_arrays() {
        let mut engine = CanvasEngine::default();
        let id = engine.create_from_draft(ItemDraft::default());
        let events = engine.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            EngineEvent::ItemsChanged(items) => assert_eq!(items[0].id, id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_commands_are_applied_on_tick() {
        let (mut engine, ids) = engine_with_items(2);
        let sender = engine.command_sender();
        assert!(sender.send(EngineCommand::DeleteItems(vec![ids[0]])));
        assert_eq!(engine.items().len(), 2);

        let events = engine.tick(Instant::now());
        assert_eq!(engine.items().len(), 1);
        assert!(events.iter().any(|e| matches!(e, EngineEvent::ItemsChanged(_))));
    }

    #[test]
    fn test_delete_keys_and_undo_shortcuts() {
        let (mut engine, ids) = engine_with_items(2);
        engine.canvas.commit_history();
        engine.canvas.add_connection(ids[0], ids[1]);
        engine.set_selection(vec![EntityId::Item(ids[0])]);

        engine.key(&key(Key::Delete, Modifiers::NONE));
        assert_eq!(engine.items().len(), 1);
        assert!(engine.connections().is_empty());

        engine.key(&key(Key::Character('z'), CTRL));
        assert_eq!(engine.items().len(), 2);
        assert_eq!(engine.connections().len(), 1);

        engine.key(&key(Key::Character('z'), Modifiers { shift: true, ..CTRL }));
        assert_eq!(engine.items().len(), 1);
        engine.key(&key(Key::Character('z'), CTRL));
        engine.key(&key(Key::Character('y'), CTRL));
        assert_eq!(engine.items().len(), 1);
    }

    #[test]
    fn test_keys_are_ignored_while_editing() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        engine.key(&key(Key::Backspace, Modifiers::NONE));
        assert_eq!(engine.items().len(), 1);

        engine.key(&key(Key::Escape, Modifiers::NONE));
        assert_eq!(engine.editing_item(), None);
        assert!(engine.take_events().contains(&EngineEvent::EditingEnded(ids[0])));
    }

    #[test]
    fn test_escape_cancels_gesture_before_edit() {
        let (mut engine, _) = engine_with_items(1);
        let t0 = Instant::now();
        let press =
            PointerEvent::new(Point::new(600.0, 400.0), t0).with_modifiers(Modifiers::SHIFT);
        engine.pointer_down(&press);
        engine.pointer_move(&PointerEvent::new(Point::new(10.0, 10.0), t0));
        assert!(engine.render_state().lasso.is_some());

        engine.key(&key(Key::Escape, Modifiers::NONE));
        assert!(matches!(engine.interaction_state(), InteractionState::Idle));
        assert!(engine.render_state().lasso.is_none());
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_wheel_zoom_and_pan() {
        let mut engine = CanvasEngine::default();
        let anchor = Point::new(200.0, 150.0);
        let before = engine.screen_to_world(anchor);
        engine.wheel(&WheelEvent {
            position: anchor,
            delta: Vec2::new(0.0, -120.0),
            modifiers: CTRL,
        });
        assert!((engine.camera().zoom - 1.1).abs() < 1e-12);
        assert!((engine.screen_to_world(anchor) - before).hypot() < 1e-9);

        engine.wheel(&WheelEvent {
            position: anchor,
            delta: Vec2::new(10.0, 20.0),
            modifiers: Modifiers::NONE,
        });
        let offset = engine.camera().offset;
        let expected = Vec2::new(200.0 - 200.0 * 1.1 - 10.0, 150.0 - 150.0 * 1.1 - 20.0);
        assert!((offset - expected).hypot() < 1e-9);
    }

    #[test]
    fn test_format_while_editing_updates_style_and_surface() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        engine.take_events();

        engine.apply_format(FormatCommand::Bold);
        assert!(engine.canvas().item(ids[0]).unwrap().text_style.bold);
        let events = engine.take_events();
        assert!(events.contains(&EngineEvent::ApplyFormat(FormatCommand::Bold)));
        assert_eq!(engine.editing_item(), Some(ids[0]));
    }

    #[test]
    fn test_format_while_editing_is_one_undo_step() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        engine.surface_input(ids[0], &[SurfaceNode::text("typed")], Instant::now());
        let past = engine.canvas().history().past_len();

        engine.apply_format(FormatCommand::Bold);
        let item = engine.canvas().item(ids[0]).unwrap();
        assert!(item.text_style.bold);
        assert_eq!(RichText::parse(&item.content).plain_text(), "typed");
        assert_eq!(engine.canvas().history().past_len(), past + 1);

        engine.undo();
        let item = engine.canvas().item(ids[0]).unwrap();
        assert!(!item.text_style.bold);
        assert_eq!(item.content, "note 0");
    }

    #[test]
    fn test_selecting_elsewhere_ends_edit() {
        let (mut engine, ids) = engine_with_items(2);
        engine.begin_edit(ids[0]);
        engine.surface_input(ids[0], &[SurfaceNode::text("typed")], Instant::now());

        engine.set_selection(vec![EntityId::Item(ids[1])]);
        assert_eq!(engine.editing_item(), None);
        assert_eq!(engine.selection().items(), vec![ids[1]]);
        let content = &engine.canvas().item(ids[0]).unwrap().content;
        assert_eq!(RichText::parse(content).plain_text(), "typed");
        assert!(engine.take_events().contains(&EngineEvent::EditingEnded(ids[0])));
    }

    #[test]
    fn test_selection_keeping_edited_item_keeps_edit() {
        let (mut engine, ids) = engine_with_items(2);
        engine.begin_edit(ids[0]);
        engine.set_selection(vec![EntityId::Item(ids[0]), EntityId::Item(ids[1])]);
        assert_eq!(engine.editing_item(), Some(ids[0]));
        engine.select_all();
        assert_eq!(engine.editing_item(), Some(ids[0]));
    }

    #[test]
    fn test_inverted_zoom_range_falls_back_to_defaults() {
        let config = EngineConfig {
            min_zoom: 3.0,
            max_zoom: 0.1,
            ..EngineConfig::default()
        };
        let engine = CanvasEngine::new(config);
        assert_eq!(engine.config(), &EngineConfig::default());
        assert_eq!(engine.camera().zoom, 1.0);

        let engine = CanvasEngine::new(EngineConfig {
            max_zoom: f64::NAN,
            ..EngineConfig::default()
        });
        assert_eq!(engine.camera().max_zoom, 3.0);
    }

    #[test]
    fn test_format_without_edit_targets_selection() {
        let (mut engine, ids) = engine_with_items(3);
        engine.set_selection(vec![EntityId::Item(ids[0]), EntityId::Item(ids[2])]);
        engine.apply_format(FormatCommand::FontSize(200.0));

        let sizes: Vec<f64> = engine.items().iter().map(|i| i.text_style.font_size).collect();
        assert_eq!(sizes, vec![96.0, 16.0, 96.0]);
        assert!(!engine.take_events().iter().any(|e| matches!(e, EngineEvent::ApplyFormat(_))));

        engine.undo();
        assert!(engine.items().iter().all(|i| i.text_style.font_size == 16.0));
    }

    #[test]
    fn test_surface_input_commits_after_debounce() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        let t0 = Instant::now();
        let nodes = vec![SurfaceNode::block(vec![SurfaceNode::text("typed")])];
        assert!(engine.surface_input(ids[0], &nodes, t0));

        engine.tick(t0 + Duration::from_millis(200));
        assert_eq!(engine.canvas().item(ids[0]).unwrap().content, "note 0");

        engine.tick(t0 + Duration::from_millis(800));
        let content = &engine.canvas().item(ids[0]).unwrap().content;
        assert_eq!(RichText::parse(content).plain_text(), "typed");
    }

    #[test]
    fn test_blur_flushes_immediately() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        let nodes = vec![SurfaceNode::text("quick")];
        engine.surface_input(ids[0], &nodes, Instant::now());
        engine.surface_blur(ids[0]);

        assert_eq!(engine.editing_item(), None);
        let content = &engine.canvas().item(ids[0]).unwrap().content;
        assert_eq!(RichText::parse(content).plain_text(), "quick");
    }

    #[test]
    fn test_undo_while_editing_flushes_then_reverts() {
        let (mut engine, ids) = engine_with_items(1);
        engine.begin_edit(ids[0]);
        engine.surface_input(ids[0], &[SurfaceNode::text("draft")], Instant::now());
        engine.undo();

        assert_eq!(engine.editing_item(), None);
        assert_eq!(engine.canvas().item(ids[0]).unwrap().content, "note 0");
        assert!(engine.can_redo());
    }

    #[test]
    fn test_set_items_prunes_and_is_untracked() {
        let (mut engine, ids) = engine_with_items(2);
        engine.canvas.add_connection(ids[0], ids[1]);
        engine.begin_edit(ids[1]);
        let past = engine.canvas().history().past_len();

        let keep = engine.canvas().item(ids[0]).unwrap().clone();
        engine.set_items(vec![keep]);
        assert!(engine.connections().is_empty());
        assert_eq!(engine.editing_item(), None);
        assert_eq!(engine.canvas().history().past_len(), past);
    }

    #[test]
    fn test_report_content_height() {
        let (mut engine, ids) = engine_with_items(1);
        let past = engine.canvas().history().past_len();
        engine.report_content_height(ids[0], 400.0);
        assert_eq!(engine.canvas().item(ids[0]).unwrap().height, 400.0);
        assert_eq!(engine.canvas().history().past_len(), past);
    }

    #[test]
    fn test_rewrite_round_trip() {
        let (mut engine, ids) = engine_with_items(1);
        let job = engine.request_rewrite(ids[0], "formal").unwrap();
        assert!(engine.ai_busy());
        assert!(engine.request_rewrite(ids[0], "again").is_none());

        let outcome = pollster::block_on(job.run(&Echo));
        engine.complete_ai(outcome);
        assert!(!engine.ai_busy());
        let content = &engine.canvas().item(ids[0]).unwrap().content;
        assert_eq!(RichText::parse(content).plain_text(), "note 0 (formal)");

        let events = engine.take_events();
        assert!(events.contains(&EngineEvent::AiBusyChanged(true)));
        assert!(events.contains(&EngineEvent::AiBusyChanged(false)));

        engine.undo();
        assert_eq!(engine.canvas().item(ids[0]).unwrap().content, "note 0");
    }

    #[test]
    fn test_ai_failure_leaves_state_alone() {
        let (mut engine, ids) = engine_with_items(1);
        let before = engine.canvas().snapshot();
        let past = engine.canvas().history().past_len();

        let job = engine.request_rewrite(ids[0], "formal").unwrap();
        engine.complete_ai(pollster::block_on(job.run(&Down)));

        assert!(!engine.ai_busy());
        assert_eq!(engine.canvas().snapshot(), before);
        assert_eq!(engine.canvas().history().past_len(), past);
        assert!(engine
            .take_events()
            .iter()
            .any(|e| matches!(e, EngineEvent::AiFailed(msg) if msg.contains("offline"))));
    }

    #[test]
    fn test_summary_is_placed_right_of_sources() {
        let (mut engine, ids) = engine_with_items(2);
        let job = engine.request_summary(&ids).unwrap();
        engine.complete_ai(pollster::block_on(job.run(&Echo)));

        assert_eq!(engine.items().len(), 3);
        let summary = &engine.items()[2];
        assert_eq!(summary.origin(), Point::new(540.0 + SUMMARY_GAP, 0.0));
        assert_eq!(RichText::parse(&summary.content).plain_text(), "note 0 + note 1");
        assert_eq!(engine.selection().items(), vec![summary.id]);
    }

    #[test]
    fn test_rewrite_of_deleted_item_fails_cleanly() {
        let (mut engine, ids) = engine_with_items(1);
        let job = engine.request_rewrite(ids[0], "formal").unwrap();
        engine.delete_items(&ids);
        engine.complete_ai(pollster::block_on(job.run(&Echo)));
        assert!(engine.items().is_empty());
        assert!(!engine.ai_busy());
    }

    #[test]
    fn test_load_document_resets_history() {
        let (mut engine, _) = engine_with_items(2);
        let doc = engine.to_document("board-1", "Plans");
        assert_eq!(doc.items.len(), 2);

        let mut fresh = CanvasEngine::default();
        fresh.load_document(doc.clone());
        assert_eq!(fresh.items(), doc.items.as_slice());
        assert!(!fresh.can_undo());
    }

    #[test]
    fn test_render_state_previews_drag() {
        let (mut engine, ids) = engine_with_items(2);
        engine.canvas.add_connection(ids[0], ids[1]);
        let t0 = Instant::now();
        engine.pointer_down(&PointerEvent::new(Point::new(10.0, 10.0), t0));
        engine.pointer_move(&PointerEvent::new(Point::new(60.0, 10.0), t0));

        let state = engine.render_state();
        assert_eq!(state.items[0].bounds.origin(), Point::new(50.0, 0.0));
        assert_eq!(state.items[0].state, ItemState::Selected);
        assert!(state.handles.is_empty());
        assert_eq!(state.connections[0].line.p0, Point::new(170.0, 70.0));
        // Nothing is committed until release.
        assert_eq!(engine.canvas().item(ids[0]).unwrap().x, 0.0);

        engine.pointer_up(&PointerEvent::new(Point::new(60.0, 10.0), t0));
        let state = engine.render_state();
        assert_eq!(state.handles.len(), 9);
        assert!(state.items.iter().all(|i| i.materialized));
    }
}
