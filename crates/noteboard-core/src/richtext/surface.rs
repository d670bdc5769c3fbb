//! Bridge between the rich-text AST and an editable surface.
//!
//! The surface is whatever the renderer uses for in-place editing. It is
//! modelled here as a generic tree of styled inline and block nodes, and
//! the conversions in both directions are pure functions.

use super::ast::{Block, BlockKind, RichText, Span};
use super::format::FormatCommand;
use crate::items::{TextAlign, TextStyle};
use std::ops::Range;

/// Inline style wrapper kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
}

/// A node of the editable surface tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceNode {
    /// Raw text.
    Text(String),
    /// Inline styling wrapper.
    Inline {
        style: InlineStyle,
        children: Vec<SurfaceNode>,
    },
    /// Hard line break.
    LineBreak,
    /// Block-level container (one line).
    Block {
        align: Option<TextAlign>,
        font_size: Option<f64>,
        children: Vec<SurfaceNode>,
    },
    /// List container; its entries are [`SurfaceNode::ListEntry`] nodes.
    List {
        align: Option<TextAlign>,
        children: Vec<SurfaceNode>,
    },
    /// One entry of a list.
    ListEntry {
        align: Option<TextAlign>,
        font_size: Option<f64>,
        children: Vec<SurfaceNode>,
    },
}

impl SurfaceNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline(style: InlineStyle, children: Vec<SurfaceNode>) -> Self {
        Self::Inline { style, children }
    }

    /// A block with no explicit attributes.
    pub fn block(children: Vec<SurfaceNode>) -> Self {
        Self::Block {
            align: None,
            font_size: None,
            children,
        }
    }

    fn is_block_level(&self) -> bool {
        matches!(self, Self::Block { .. } | Self::List { .. } | Self::ListEntry { .. })
    }
}

/// The editable surface a host exposes for the item in text-edit mode.
pub trait EditableSurface {
    /// Current tree of the surface.
    fn read(&self) -> Vec<SurfaceNode>;

    /// Replace the whole tree.
    fn write(&mut self, nodes: Vec<SurfaceNode>);

    /// Apply an inline/align/size command to the surface's current selection.
    ///
    /// List toggling is handled by [`super::format::apply_format`] through
    /// `read`/`write` and is never passed here.
    fn apply_to_selection(&mut self, command: &FormatCommand);
}

/// Convert an AST into a surface tree.
///
/// Consecutive list items share one list container.
pub fn to_surface(text: &RichText) -> Vec<SurfaceNode> {
    let mut nodes = Vec::new();
    let mut list: Vec<SurfaceNode> = Vec::new();

    for block in &text.blocks {
        let children: Vec<SurfaceNode> = block.spans.iter().map(span_to_node).collect();
        match block.kind {
            BlockKind::ListItem => list.push(SurfaceNode::ListEntry {
                align: Some(block.align),
                font_size: Some(block.font_size),
                children,
            }),
            BlockKind::Paragraph => {
                if !list.is_empty() {
                    nodes.push(SurfaceNode::List {
                        align: None,
                        children: std::mem::take(&mut list),
                    });
                }
                nodes.push(SurfaceNode::Block {
                    align: Some(block.align),
                    font_size: Some(block.font_size),
                    children,
                });
            }
        }
    }
    if !list.is_empty() {
        nodes.push(SurfaceNode::List {
            align: None,
            children: list,
        });
    }
    nodes
}

fn span_to_node(span: &Span) -> SurfaceNode {
    let mut node = SurfaceNode::Text(span.text.clone());
    if span.underline {
        node = SurfaceNode::inline(InlineStyle::Underline, vec![node]);
    }
    if span.italic {
        node = SurfaceNode::inline(InlineStyle::Italic, vec![node]);
    }
    if span.bold {
        node = SurfaceNode::inline(InlineStyle::Bold, vec![node]);
    }
    node
}

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl Flags {
    fn with(mut self, style: InlineStyle) -> Self {
        match style {
            InlineStyle::Bold => self.bold = true,
            InlineStyle::Italic => self.italic = true,
            InlineStyle::Underline => self.underline = true,
        }
        self
    }

    fn span(self, text: &str) -> Span {
        Span {
            text: text.to_string(),
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        }
    }
}

/// Accumulates blocks while walking a surface tree.
struct Collector {
    blocks: Vec<Block>,
    /// Inline content seen outside any block container.
    loose: Vec<Span>,
}

impl Collector {
    fn flush_loose(&mut self) {
        if !self.loose.is_empty() {
            let spans = std::mem::take(&mut self.loose);
            self.blocks.push(Block::paragraph(spans));
        }
    }
}

/// Convert a surface tree back into an AST.
///
/// Inline flags are inherited from ancestor wrappers. Inline content found
/// outside any block container becomes an implicit paragraph when the next
/// block boundary (or the end of input) is reached.
pub fn from_surface(nodes: &[SurfaceNode]) -> RichText {
    let mut collector = Collector {
        blocks: Vec::new(),
        loose: Vec::new(),
    };

    for node in nodes {
        match node {
            SurfaceNode::Block {
                align,
                font_size,
                children,
            } => {
                collector.flush_loose();
                push_line_blocks(
                    &mut collector.blocks,
                    BlockKind::Paragraph,
                    align.unwrap_or_default(),
                    font_size.unwrap_or(TextStyle::DEFAULT_FONT_SIZE),
                    children,
                );
            }
            SurfaceNode::List { align, children } => {
                collector.flush_loose();
                for entry in children {
                    match entry {
                        SurfaceNode::ListEntry {
                            align: entry_align,
                            font_size,
                            children,
                        } => push_line_blocks(
                            &mut collector.blocks,
                            BlockKind::ListItem,
                            entry_align.or(*align).unwrap_or_default(),
                            font_size.unwrap_or(TextStyle::DEFAULT_FONT_SIZE),
                            children,
                        ),
                        // Stray content directly inside a list becomes its own entry.
                        other => push_line_blocks(
                            &mut collector.blocks,
                            BlockKind::ListItem,
                            align.unwrap_or_default(),
                            TextStyle::DEFAULT_FONT_SIZE,
                            std::slice::from_ref(other),
                        ),
                    }
                }
            }
            SurfaceNode::ListEntry {
                align,
                font_size,
                children,
            } => {
                collector.flush_loose();
                push_line_blocks(
                    &mut collector.blocks,
                    BlockKind::ListItem,
                    align.unwrap_or_default(),
                    font_size.unwrap_or(TextStyle::DEFAULT_FONT_SIZE),
                    children,
                );
            }
            SurfaceNode::LineBreak => {
                collector.flush_loose();
            }
            inline => {
                let mut finished = Vec::new();
                collect_inline(inline, Flags::default(), &mut collector.loose, &mut finished);
                collector
                    .blocks
                    .extend(finished.into_iter().map(Block::paragraph));
            }
        }
    }
    collector.flush_loose();
    RichText::new(collector.blocks)
}

/// Push the block(s) for one block container. Hard breaks inside the
/// container split it into several blocks sharing its attributes.
fn push_line_blocks(
    blocks: &mut Vec<Block>,
    kind: BlockKind,
    align: TextAlign,
    font_size: f64,
    children: &[SurfaceNode],
) {
    let mut current = Vec::new();
    let mut finished = Vec::new();
    for child in children {
        collect_inline(child, Flags::default(), &mut current, &mut finished);
    }
    finished.push(current);
    for spans in finished {
        blocks.push(Block {
            kind,
            align,
            font_size,
            spans,
        });
    }
}

/// Walk inline content, appending spans to `current`. A line break closes
/// `current` into `finished`. Block-level nodes nested inside inline
/// content are flattened.
fn collect_inline(
    node: &SurfaceNode,
    flags: Flags,
    current: &mut Vec<Span>,
    finished: &mut Vec<Vec<Span>>,
) {
    match node {
        SurfaceNode::Text(text) => current.push(flags.span(text)),
        SurfaceNode::Inline { style, children } => {
            let inner = flags.with(*style);
            for child in children {
                collect_inline(child, inner, current, finished);
            }
        }
        SurfaceNode::LineBreak => finished.push(std::mem::take(current)),
        SurfaceNode::Block { children, .. }
        | SurfaceNode::List { children, .. }
        | SurfaceNode::ListEntry { children, .. } => {
            for child in children {
                collect_inline(child, flags, current, finished);
            }
        }
    }
}

/// In-memory editable surface.
///
/// The selection is a range of line indices, where a line is a top-level
/// block or a list entry. Headless hosts and tests use it in place of a
/// real editor widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceTree {
    nodes: Vec<SurfaceNode>,
    selection: Option<Range<usize>>,
}

impl SurfaceTree {
    pub fn new(nodes: Vec<SurfaceNode>) -> Self {
        Self {
            nodes,
            selection: None,
        }
    }

    /// Build a surface showing `text`.
    pub fn from_rich_text(text: &RichText) -> Self {
        Self::new(to_surface(text))
    }

    /// Select lines `range` (end exclusive). `None` collapses the selection.
    pub fn select_lines(&mut self, range: Option<Range<usize>>) {
        self.selection = range;
    }

    pub fn selection(&self) -> Option<&Range<usize>> {
        self.selection.as_ref()
    }

    pub fn nodes(&self) -> &[SurfaceNode] {
        &self.nodes
    }

    /// Snapshot of the surface as an AST.
    pub fn to_rich_text(&self) -> RichText {
        from_surface(&self.nodes)
    }
}

impl EditableSurface for SurfaceTree {
    fn read(&self) -> Vec<SurfaceNode> {
        self.nodes.clone()
    }

    fn write(&mut self, nodes: Vec<SurfaceNode>) {
        self.nodes = nodes;
    }

    fn apply_to_selection(&mut self, command: &FormatCommand) {
        let Some(range) = self.selection.clone() else {
            return;
        };
        let mut line = 0usize;
        for node in &mut self.nodes {
            match node {
                SurfaceNode::List { children, .. } => {
                    for entry in children {
                        if range.contains(&line) {
                            apply_to_line(entry, command);
                        }
                        line += 1;
                    }
                }
                other if other.is_block_level() => {
                    if range.contains(&line) {
                        apply_to_line(other, command);
                    }
                    line += 1;
                }
                _ => {}
            }
        }
    }
}

fn apply_to_line(node: &mut SurfaceNode, command: &FormatCommand) {
    let (align, font_size, children) = match node {
        SurfaceNode::Block {
            align,
            font_size,
            children,
        }
        | SurfaceNode::ListEntry {
            align,
            font_size,
            children,
        } => (align, font_size, children),
        _ => return,
    };
    match command {
        FormatCommand::Bold => wrap_children(children, InlineStyle::Bold),
        FormatCommand::Italic => wrap_children(children, InlineStyle::Italic),
        FormatCommand::Underline => wrap_children(children, InlineStyle::Underline),
        FormatCommand::Align(a) => *align = Some(*a),
        FormatCommand::FontSize(size) => *font_size = Some(*size),
        FormatCommand::ToggleList => {}
    }
}

fn wrap_children(children: &mut Vec<SurfaceNode>, style: InlineStyle) {
    if children.is_empty() {
        return;
    }
    let inner = std::mem::take(children);
    children.push(SurfaceNode::inline(style, inner));
}
