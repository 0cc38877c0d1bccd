//! File-backed local storage.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a temporary file that is
//! renamed over the target, so a crash never leaves a half-written cart.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::LocalCartStore;
use crate::error::StoreError;

/// Local storage in a directory on disk.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    /// Use `dir` for storage, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::DataCorruption(format!(
                "invalid storage key: {key:?}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalCartStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote local cart");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> FileLocalStore {
        let dir = std::env::temp_dir().join(format!(
            "partcart-file-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        FileLocalStore::open(dir).unwrap()
    }

    #[test]
    fn test_file_store_roundtrip() {
        let store = temp_store("roundtrip");
        assert_eq!(store.get("cart").unwrap(), None);

        store.set("cart", r#"[{"id":"P1"}]"#).unwrap();
        assert_eq!(
            store.get("cart").unwrap().as_deref(),
            Some(r#"[{"id":"P1"}]"#)
        );

        store.delete("cart").unwrap();
        assert_eq!(store.get("cart").unwrap(), None);
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_delete_missing_is_ok() {
        let store = temp_store("delete-missing");
        assert!(store.delete("cart").is_ok());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_rejects_path_traversal() {
        let store = temp_store("traversal");
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::DataCorruption(_))
        ));
        let _ = fs::remove_dir_all(store.dir());
    }
}
