//! Persistent key-value side channels for session state.
//!
//! A session mirrors its token and user record into one of these stores on
//! every change. Running without a store is supported and keeps the session
//! in memory only.

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;
pub use memory::MemoryStore;

use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

/// Failures raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// Backing file
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
    /// The backing file holds something other than a JSON object of strings.
    #[error("storage file {path} is not a valid key-value document: {source}")]
    Format {
        /// Backing file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
    /// The write would exceed the store's capacity.
    #[error(
        "storage quota exceeded writing '{key}' ({needed} bytes needed, {})",
        describe_limit(.limit)
    )]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Total bytes the store would hold after the write, or the size of
        /// the rejected entry when the backend does not report its usage
        needed: usize,
        /// Configured limit, when the backend reports one
        limit: Option<usize>,
    },
    /// The backend rejected the operation (for example, disabled browser storage).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

#[allow(clippy::ref_option)]
fn describe_limit(limit: &Option<usize>) -> String {
    match limit {
        Some(limit) => format!("{limit} allowed"),
        None => "limit unknown".to_string(),
    }
}

/// A synchronous string key-value store.
///
/// `delete` on a missing key succeeds without doing anything.
pub trait KeyValueStore: Send + Sync {
    /// Reads `key`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`.
    ///
    /// # Errors
    /// Returns an error when the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`.
    ///
    /// # Errors
    /// Returns an error when the backend rejects the delete.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn KeyValueStore>;
