//! Volatile board storage, used on wasm and in tests.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::canvas::BoardDocument;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral boards.
///
/// Boards are kept as serialized JSON so a load always hands back a fresh
/// copy that went through the same encoding as a file save.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {e}"))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, document: &BoardDocument) -> BoxFuture<'_, StorageResult<()>> {
        let id = document.id.clone();
        let json = document.to_json();
        Box::pin(async move {
            let json = json?;
            self.boards.write().map_err(Self::lock_error)?.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardDocument>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(Self::lock_error)?;
            let json = boards.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            Ok(BoardDocument::from_json(json)?)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.boards.write().map_err(Self::lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(Self::lock_error)?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(Self::lock_error)?;
            Ok(boards.contains_key(&id))
        })
    }
}
