//! Noteboard Core Library
//!
//! Platform-agnostic canvas engine for the Noteboard sticky-note board:
//! camera, spatial index, pointer gestures, rich-text editing, undo/redo,
//! persistence and AI hooks. Rendering is left to the host.

pub mod ai;
pub mod camera;
pub mod canvas;
pub mod config;
pub mod engine;
pub mod history;
pub mod input;
pub mod interaction;
pub mod items;
pub mod richtext;
pub mod selection;
pub mod spatial;
pub mod storage;

pub use ai::{AiError, AiJob, AiOutcome, AiService, AiTask};
pub use camera::{Camera, VisibleBounds};
pub use canvas::{BoardDocument, Canvas, HistorySnapshot};
pub use config::{ConfigError, EngineConfig};
pub use engine::{CanvasEngine, CommandSender, EngineCommand, EngineEvent, ItemState, RenderState};
pub use history::History;
pub use input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent, WheelEvent};
pub use interaction::{Interaction, InteractionEffect, InteractionState};
pub use items::{
    CanvasConnection, CanvasItem, ConnectionId, EntityId, HeightMode, ItemDraft, ItemId,
    SerializableColor, SourceReference, TextStyle,
};
pub use richtext::{FormatCommand, RichText, SurfaceNode};
pub use selection::{Handle, HandleKind, ResizeHandle, Selection};
pub use spatial::SpatialIndex;
pub use storage::{Storage, StorageError, default_storage};
