use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    process,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;

use super::{KeyValueStore, StorageError};

type Document = BTreeMap<String, String>;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store backed by a JSON object on disk.
///
/// Every call re-reads the file, so several handles on one path (or a later
/// process) observe each other's writes. The file is removed once the last
/// key is deleted.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (without creating) the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_document(&self) -> Result<Document, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if contents.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&contents).map_err(|source| StorageError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &Document) -> Result<(), StorageError> {
        if document.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(self.io_error(err)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let serialized = serde_json::to_vec_pretty(document).map_err(|source| StorageError::Format {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.staging_path();
        fs::write(&staging, serialized).map_err(|err| self.io_error(err))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))
                .map_err(|err| self.io_error(err))?;
        }
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        debug!(path = %self.path.display(), keys = document.len(), "session file written");
        Ok(())
    }

    /// A sibling path unique to this write, so handles in this or another
    /// process never share a staging file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("session"), OsString::from);
        let sequence = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        name.push(format!(".{}.{sequence}.tmp", process::id()));
        self.path.with_file_name(name)
    }

    fn update<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut document = self.read_document()?;
        if change(&mut document) {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|document| {
            document.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.update(|document| document.remove(key).is_some())
    }
}
