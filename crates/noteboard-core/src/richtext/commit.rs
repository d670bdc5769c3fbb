//! Debounced commit of edited text.
//!
//! Editing produces a stream of surface snapshots. Only the latest one is
//! kept as a pending edit, and it is committed once input has been idle
//! for the debounce window, or immediately when the editor loses focus.

use super::ast::RichText;
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Latest uncommitted content and when it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub content: RichText,
    pub last_input: Instant,
}

/// Owns the pending edit and its scheduled flush.
#[derive(Debug, Clone)]
pub struct CommitScheduler {
    debounce: Duration,
    pending: Option<PendingEdit>,
}

impl CommitScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
        }
    }

    /// Record new content, replacing any pending edit and restarting the window.
    pub fn record(&mut self, content: RichText, now: Instant) {
        self.pending = Some(PendingEdit {
            content,
            last_input: now,
        });
    }

    /// When the pending edit will be flushed, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.last_input + self.debounce)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending content if the debounce window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<RichText> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Take the pending content unconditionally.
    pub fn flush(&mut self) -> Option<RichText> {
        self.pending.take().map(|p| p.content)
    }

    /// Drop the pending content without committing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
