//! Canvas items and connections.
//!
//! Items and connections are plain data owned by the host. The engine
//! only ever proposes full replacement arrays of these values.

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an item.
pub type ItemId = Uuid;

/// Unique identifier for a connection.
pub type ConnectionId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pale yellow used for new notes.
    pub fn note_yellow() -> Self {
        Self::new(255, 241, 160, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::note_yellow()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How an item's height is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightMode {
    /// Height follows the measured content height.
    #[default]
    Auto,
    /// Height was fixed by an explicit resize.
    Manual,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// List formatting of an item's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    None,
    Bullet,
}

/// Default text style of an item.
///
/// These are the defaults new text inherits; individual spans of the
/// rich-text content may still override bold/italic/underline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
    pub font_size: f64,
    pub list_type: ListType,
}

impl TextStyle {
    /// Default font size in world units.
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;
    /// Smallest font size a formatting command may set.
    pub const MIN_FONT_SIZE: f64 = 8.0;
    /// Largest font size a formatting command may set.
    pub const MAX_FONT_SIZE: f64 = 96.0;
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
            font_size: Self::DEFAULT_FONT_SIZE,
            list_type: ListType::None,
        }
    }
}

/// Link from an item to an externally-originated object (e.g. an imported slide).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    /// Which external system the object lives in.
    pub provider: String,
    /// Identifier of the object inside that system.
    pub object_id: String,
}

/// A freeform node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItem {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub height_mode: HeightMode,
    /// Serialized rich-text AST, or a legacy plain string.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_style: TextStyle,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default)]
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceReference>,
}

impl CanvasItem {
    /// Create an empty item with the given geometry.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width,
            height,
            height_mode: HeightMode::Auto,
            content: String::new(),
            text_style: TextStyle::default(),
            color: SerializableColor::default(),
            author_id: String::new(),
            source: None,
        }
    }

    /// Create an empty item of `size` centered on `center`.
    pub fn centered_at(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Axis-aligned bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Replace the geometry with `rect`.
    pub fn set_bounds(&mut self, rect: Rect) {
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }

    /// Move the item by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Exact point containment (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Grow width/height to at least `min`.
    pub fn clamp_to_min(&mut self, min: Size) {
        self.width = self.width.max(min.width);
        self.height = self.height.max(min.height);
    }
}

/// Inclusive AABB intersection: touching edges count as intersecting.
pub fn rects_touch(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Properties for an item created by the host rather than by a gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDraft {
    /// Top-left corner in world coordinates.
    pub position: Point,
    /// Explicit size; `None` uses the configured default size.
    pub size: Option<Size>,
    pub content: String,
    pub text_style: Option<TextStyle>,
    pub color: Option<SerializableColor>,
    pub author_id: String,
    pub source: Option<SourceReference>,
}

/// A directed edge between two items.
///
/// Endpoints are weak references: the connection owns neither item and
/// is pruned whenever one of them goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConnection {
    pub id: ConnectionId,
    pub from_id: ItemId,
    pub to_id: ItemId,
}

impl CanvasConnection {
    pub fn new(from_id: ItemId, to_id: ItemId) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_id,
            to_id,
        }
    }

    /// Whether either endpoint is `item`.
    pub fn touches(&self, item: ItemId) -> bool {
        self.from_id == item || self.to_id == item
    }
}

/// Anything that can be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityId {
    Item(ItemId),
    Connection(ConnectionId),
}
