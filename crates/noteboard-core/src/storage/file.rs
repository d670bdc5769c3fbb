//! Board storage as JSON files in a directory (native only).

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::canvas::BoardDocument;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stores each board as `<sanitized id>.json` in a directory.
pub struct FileStorage {
    /// Base directory for board files.
    base_path: PathBuf,
}

impl FileStorage {
    /// Store boards under `base_path`, creating the directory if needed.
    ///
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&base_path).map_err(|source| StorageError::Io {
            path: base_path.clone(),
            source,
        })?;
        Ok(Self { base_path })
    }

    /// Storage under the platform data directory.
    ///
    /// On Unix: `~/.local/share/noteboard/boards/`
    /// On Windows: `%LOCALAPPDATA%\noteboard\boards\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                StorageError::Other("Could not determine a data directory".to_string())
            })?;
        Self::new(base.join("noteboard").join("boards"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn board_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", sanitize_id(id)))
    }
}

/// Map an id onto a safe file stem.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl Storage for FileStorage {
    fn save(&self, document: &BoardDocument) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(&document.id);
        let json = document.to_json();
        Box::pin(async move {
            let json = json?;
            // Write to a sibling file first so a crash never leaves half a board.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, json).map_err(io_error(&tmp))?;
            fs::rename(&tmp, &path).map_err(io_error(&path))?;
            log::debug!("Saved board to {}", path.display());
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardDocument>> {
        let path = self.board_path(id);
        let id = id.to_string();
        Box::pin(async move {
            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(StorageError::NotFound(id));
                }
                Err(e) => return Err(io_error(&path)(e)),
            };
            Ok(BoardDocument::from_json(&json)?)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        Box::pin(async move {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_error(&path)(e)),
            }
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            let entries = fs::read_dir(&base).map_err(io_error(&base))?;
            let mut ids: Vec<String> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.board_path(id);
        Box::pin(async move { Ok(path.is_file()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{CanvasConnection, CanvasItem};
    use pollster::block_on;
    use tempfile::tempdir;

    fn board(id: &str) -> BoardDocument {
        BoardDocument {
            id: id.to_string(),
            ..BoardDocument::new()
        }
    }

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let mut doc = board("roadmap");
        doc.name = "Roadmap".to_string();
        let a = CanvasItem::new(0.0, 0.0, 240.0, 140.0);
        let b = CanvasItem::new(300.0, 0.0, 240.0, 140.0);
        doc.connections.push(CanvasConnection::new(a.id, b.id));
        doc.items = vec![a, b];

        block_on(storage.save(&doc)).unwrap();
        let loaded = block_on(storage.load("roadmap")).unwrap();
        assert_eq!(loaded, doc);
        assert!(!dir.path().join("roadmap.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_corrupt_board() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let result = block_on(storage.load("broken"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_storage_list_skips_other_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.save(&board("doc2"))).unwrap();
        block_on(storage.save(&board("doc1"))).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(block_on(storage.list()).unwrap(), vec!["doc1", "doc2"]);
    }

    #[test]
    fn test_file_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.save(&board("test"))).unwrap();
        assert!(block_on(storage.exists("test")).unwrap());

        block_on(storage.delete("test")).unwrap();
        assert!(!block_on(storage.exists("test")).unwrap());
        block_on(storage.delete("test")).unwrap();
    }

    #[test]
    fn test_file_storage_sanitizes_id() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let doc = board("test/doc:with*special");
        block_on(storage.save(&doc)).unwrap();

        assert!(dir.path().join("test_doc_with_special.json").exists());
        let loaded = block_on(storage.load("test/doc:with*special")).unwrap();
        assert_eq!(loaded.id, doc.id);
    }
}
