//! Formatting commands.
//!
//! A command is applied twice: to the editable surface's selection, and to
//! the owning item's [`TextStyle`] so the choice persists as the default
//! even when nothing is selected.

use super::surface::{EditableSurface, SurfaceNode};
use crate::items::{ListType, TextAlign, TextStyle};
use serde::{Deserialize, Serialize};

/// A formatting command sent from the property panel to the active editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Align(TextAlign),
    FontSize(f64),
    ToggleList,
}

impl FormatCommand {
    /// The command with its value clamped to a usable range.
    pub fn clamped(self) -> Self {
        match self {
            Self::FontSize(size) if size.is_nan() => Self::FontSize(TextStyle::DEFAULT_FONT_SIZE),
            Self::FontSize(size) => {
                Self::FontSize(size.clamp(TextStyle::MIN_FONT_SIZE, TextStyle::MAX_FONT_SIZE))
            }
            other => other,
        }
    }
}

/// Record a command in an item's default style.
pub fn apply_to_style(style: &mut TextStyle, command: FormatCommand) {
    match command.clamped() {
        FormatCommand::Bold => style.bold = !style.bold,
        FormatCommand::Italic => style.italic = !style.italic,
        FormatCommand::Underline => style.underline = !style.underline,
        FormatCommand::Align(align) => style.align = align,
        FormatCommand::FontSize(size) => style.font_size = size,
        FormatCommand::ToggleList => {
            style.list_type = match style.list_type {
                ListType::None => ListType::Bullet,
                ListType::Bullet => ListType::None,
            }
        }
    }
}

/// Apply a command to an editable surface.
pub fn apply_format<S: EditableSurface + ?Sized>(surface: &mut S, command: FormatCommand) {
    match command.clamped() {
        FormatCommand::ToggleList => {
            let nodes = surface.read();
            surface.write(toggle_list(nodes));
        }
        other => surface.apply_to_selection(&other),
    }
}

/// Wrap every line into list entries, or unwrap existing lists back into
/// paragraphs.
///
/// Unwrapping keeps each entry's own alignment when it has one and falls
/// back to the list container's alignment otherwise.
pub fn toggle_list(nodes: Vec<SurfaceNode>) -> Vec<SurfaceNode> {
    let has_list = nodes
        .iter()
        .any(|n| matches!(n, SurfaceNode::List { .. } | SurfaceNode::ListEntry { .. }));
    if has_list {
        unwrap_lists(nodes)
    } else {
        vec![wrap_lines(nodes)]
    }
}

fn unwrap_lists(nodes: Vec<SurfaceNode>) -> Vec<SurfaceNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            SurfaceNode::List { align, children } => {
                for entry in children {
                    out.push(match entry {
                        SurfaceNode::ListEntry {
                            align: entry_align,
                            font_size,
                            children,
                        } => SurfaceNode::Block {
                            align: entry_align.or(align),
                            font_size,
                            children,
                        },
                        other => SurfaceNode::Block {
                            align,
                            font_size: None,
                            children: vec![other],
                        },
                    });
                }
            }
            SurfaceNode::ListEntry {
                align,
                font_size,
                children,
            } => out.push(SurfaceNode::Block {
                align,
                font_size,
                children,
            }),
            other => out.push(other),
        }
    }
    out
}

fn wrap_lines(nodes: Vec<SurfaceNode>) -> SurfaceNode {
    let mut entries = Vec::new();
    let mut run: Vec<SurfaceNode> = Vec::new();

    fn close_run(run: &mut Vec<SurfaceNode>, entries: &mut Vec<SurfaceNode>) {
        if !run.is_empty() {
            entries.push(SurfaceNode::ListEntry {
                align: None,
                font_size: None,
                children: std::mem::take(run),
            });
        }
    }

    for node in nodes {
        match node {
            SurfaceNode::Block {
                align,
                font_size,
                children,
            } => {
                close_run(&mut run, &mut entries);
                entries.push(SurfaceNode::ListEntry {
                    align,
                    font_size,
                    children,
                });
            }
            SurfaceNode::LineBreak => close_run(&mut run, &mut entries),
            inline => run.push(inline),
        }
    }
    close_run(&mut run, &mut entries);

    if entries.is_empty() {
        entries.push(SurfaceNode::ListEntry {
            align: None,
            font_size: None,
            children: Vec::new(),
        });
    }
    SurfaceNode::List {
        align: None,
        children: entries,
    }
}
