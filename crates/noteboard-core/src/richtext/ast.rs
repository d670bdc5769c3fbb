//! Canonical rich-text form: ordered blocks of ordered spans.

use crate::items::TextAlign;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strict parse errors. The lenient [`RichText::parse`] never surfaces these.
#[derive(Debug, Error)]
pub enum RichTextError {
    #[error("Content is not a rich-text document: {0}")]
    NotRichText(#[from] serde_json::Error),
}

/// Kind of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
    ListItem,
}

/// A run of text with uniform inline styling.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl Span {
    /// An unstyled span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Whether two spans carry the same inline flags.
    pub fn same_style(&self, other: &Span) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.underline == other.underline
    }
}

/// One line of text: a paragraph or a list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub kind: BlockKind,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub spans: Vec<Span>,
}

fn default_font_size() -> f64 {
    crate::items::TextStyle::DEFAULT_FONT_SIZE
}

impl Default for Block {
    fn default() -> Self {
        Self {
            kind: BlockKind::Paragraph,
            align: TextAlign::Left,
            font_size: default_font_size(),
            spans: Vec::new(),
        }
    }
}

impl Block {
    /// A default paragraph holding `spans`.
    pub fn paragraph(spans: Vec<Span>) -> Self {
        Self {
            spans,
            ..Self::default()
        }
    }

    /// A default list item holding `spans`.
    pub fn list_item(spans: Vec<Span>) -> Self {
        Self {
            kind: BlockKind::ListItem,
            spans,
            ..Self::default()
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A rich-text document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RichText {
    pub blocks: Vec<Block>,
}

impl RichText {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Serialize to the canonical stored form.
    pub fn serialize(&self) -> String {
        // A tree of strings, bools and finite floats always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse the canonical form, failing on anything else.
    pub fn try_parse(content: &str) -> Result<Self, RichTextError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse stored content, falling back to a single paragraph holding the
    /// raw string when it is not in canonical form (legacy plain text).
    pub fn parse(content: &str) -> Self {
        match Self::try_parse(content) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("Treating content as legacy plain text: {}", e);
                Self::new(vec![Block::paragraph(vec![Span::plain(content)])])
            }
        }
    }

    /// Build a document with one paragraph per line of `text`.
    pub fn from_plain_text(text: &str) -> Self {
        Self::new(
            text.split('\n')
                .map(|line| Block::paragraph(vec![Span::plain(line)]))
                .collect(),
        )
    }

    /// Plain text with blocks joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.spans.iter().all(|s| s.text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RichText {
        RichText::new(vec![
            Block::paragraph(vec![Span::plain("Hello "), Span::plain("world").bold()])
                .with_align(TextAlign::Center)
                .with_font_size(24.0),
            Block::list_item(vec![Span::plain("first").italic().underline()]),
            Block::list_item(vec![]),
            Block::paragraph(vec![Span::plain("")]),
        ])
    }

    #[test]
    fn test_roundtrip() {
        let text = sample();
        assert_eq!(RichText::parse(&text.serialize()), text);
    }

    #[test]
    fn test_roundtrip_empty_document() {
        let text = RichText::default();
        assert_eq!(RichText::parse(&text.serialize()), text);
    }

    #[test]
    fn test_legacy_plain_string() {
        let parsed = RichText::parse("Buy milk");
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(parsed.blocks[0].spans, vec![Span::plain("Buy milk")]);
    }

    #[test]
    fn test_legacy_string_with_newlines_stays_one_block() {
        let parsed = RichText::parse("line one\nline two");
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].text(), "line one\nline two");
    }

    #[test]
    fn test_json_that_is_not_a_document_falls_back() {
        for raw in ["42", "[1,2]", r#"{"blocks": 3}"#, "\"quoted\"", ""] {
            let parsed = RichText::parse(raw);
            assert_eq!(parsed.blocks.len(), 1, "input {raw:?}");
            assert_eq!(parsed.blocks[0].text(), raw);
        }
    }

    #[test]
    fn test_try_parse_reports_error() {
        assert!(matches!(RichText::try_parse("nope"), Err(RichTextError::NotRichText(_))));
    }

    #[test]
    fn test_plain_text_conversions() {
        let text = RichText::from_plain_text("a\nb");
        assert_eq!(text.blocks.len(), 2);
        assert_eq!(text.plain_text(), "a\nb");
        assert_eq!(sample().plain_text(), "Hello world\nfirst\n\n");
    }

    #[test]
    fn test_is_empty() {
        assert!(RichText::default().is_empty());
        assert!(RichText::from_plain_text("").is_empty());
        assert!(!sample().is_empty());
    }
}
