//! AI rewrite/summarize integration.
//!
//! The engine never awaits the service itself. A request hands back an
//! [`AiJob`] which the host runs on whatever executor it has, then posts
//! the resulting [`AiOutcome`] back to the engine to be applied.

use crate::items::ItemId;
use crate::storage::BoxFuture;
use thiserror::Error;

/// AI service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Request(String),
    #[error("AI service unavailable: {0}")]
    Unavailable(String),
    #[error("AI returned an empty response")]
    EmptyResponse,
    #[error("AI target no longer exists")]
    StaleTarget,
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

/// Text rewrite and summarization backend.
#[cfg(not(target_arch = "wasm32"))]
pub trait AiService: Send + Sync {
    /// Rewrite `text` following a free-form style hint.
    fn rewrite<'a>(&'a self, text: &'a str, style_hint: &'a str) -> BoxFuture<'a, AiResult<String>>;

    /// Summarize several texts into one.
    fn summarize<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, AiResult<String>>;
}

/// Text rewrite and summarization backend (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait AiService {
    /// Rewrite `text` following a free-form style hint.
    fn rewrite<'a>(&'a self, text: &'a str, style_hint: &'a str) -> BoxFuture<'a, AiResult<String>>;

    /// Summarize several texts into one.
    fn summarize<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, AiResult<String>>;
}

/// What an AI job was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AiTask {
    Rewrite {
        item: ItemId,
        text: String,
        style_hint: String,
    },
    Summarize {
        items: Vec<ItemId>,
        texts: Vec<String>,
    },
}

/// A dispatched request, ready to run against a service.
#[derive(Debug, Clone, PartialEq)]
pub struct AiJob {
    pub task: AiTask,
}

impl AiJob {
    /// Call the service. Blank responses count as failures.
    pub async fn run(self, service: &dyn AiService) -> AiOutcome {
        let result = match &self.task {
            AiTask::Rewrite { text, style_hint, .. } => service.rewrite(text, style_hint).await,
            AiTask::Summarize { texts, .. } => service.summarize(texts).await,
        };
        let result = result.and_then(|text| {
            if text.trim().is_empty() {
                Err(AiError::EmptyResponse)
            } else {
                Ok(text)
            }
        });
        AiOutcome {
            task: self.task,
            result,
        }
    }
}

/// A finished job, posted back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AiOutcome {
    pub task: AiTask,
    pub result: AiResult<String>,
}
