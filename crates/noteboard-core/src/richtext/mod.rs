//! Rich-text model: AST, surface bridge, formatting and commit policy.

mod ast;
mod commit;
mod format;
mod surface;

pub use ast::{Block, BlockKind, RichText, RichTextError, Span};
pub use commit::{CommitScheduler, PendingEdit};
pub use format::{FormatCommand, apply_format, apply_to_style, toggle_list};
pub use surface::{EditableSurface, InlineStyle, SurfaceNode, SurfaceTree, from_surface, to_surface};
