use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, Storage};

use super::{KeyValueStore, StorageError};

/// The browser's `window.localStorage`.
///
/// Holds no handle; the storage object is looked up on each call so the type
/// stays `Send + Sync`.
#[derive(Debug, Clone, Copy)]
pub struct LocalStorage {
    _private: (),
}

impl LocalStorage {
    /// Returns a handle when the current context exposes local storage.
    #[must_use]
    pub fn available() -> Option<Self> {
        raw_storage().ok().map(|_| Self { _private: () })
    }
}

fn raw_storage() -> Result<Storage, StorageError> {
    let window = web_sys::window()
        .ok_or_else(|| StorageError::Unavailable("no window in this context".to_string()))?;
    window
        .local_storage()
        .map_err(js_error)?
        .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
}

fn js_error(value: JsValue) -> StorageError {
    let message = match value.dyn_ref::<DomException>() {
        Some(exception) => format!("{}: {}", exception.name(), exception.message()),
        None => value.as_string().unwrap_or_else(|| format!("{value:?}")),
    };
    StorageError::Unavailable(message)
}

// Firefox reported quota errors under its own name before adopting the
// standard one.
fn is_quota_error(value: &JsValue) -> bool {
    value.dyn_ref::<DomException>().is_some_and(|exception| {
        matches!(
            exception.name().as_str(),
            "QuotaExceededError" | "NS_ERROR_DOM_QUOTA_REACHED"
        )
    })
}

fn write_error(key: &str, value: &str, error: JsValue) -> StorageError {
    if is_quota_error(&error) {
        StorageError::QuotaExceeded {
            key: key.to_string(),
            needed: key.len() + value.len(),
            limit: None,
        }
    } else {
        js_error(error)
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        raw_storage()?.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        raw_storage()?
            .set_item(key, value)
            .map_err(|error| write_error(key, value, error))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        raw_storage()?.remove_item(key).map_err(js_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_local_storage_round_trip() {
        let storage = LocalStorage::available().expect("browser exposes localStorage");
        storage.set("gfs-test", "value").unwrap();
        assert_eq!(storage.get("gfs-test").unwrap().as_deref(), Some("value"));

        storage.delete("gfs-test").unwrap();
        assert_eq!(storage.get("gfs-test").unwrap(), None);
        storage.delete("gfs-test").unwrap();
    }

    #[wasm_bindgen_test]
    fn test_quota_exception_maps_to_quota_exceeded() {
        let exception =
            DomException::new_with_message_and_name("storage full", "QuotaExceededError").unwrap();

        let err = write_error("user", "{}", exception.into());
        assert!(matches!(
            err,
            StorageError::QuotaExceeded { ref key, needed: 6, limit: None } if key == "user"
        ));
    }

    #[wasm_bindgen_test]
    fn test_other_exceptions_are_unavailable() {
        let exception =
            DomException::new_with_message_and_name("denied", "SecurityError").unwrap();

        let err = write_error("user", "{}", exception.into());
        assert!(matches!(err, StorageError::Unavailable(ref message) if message.contains("SecurityError")));
    }
}
