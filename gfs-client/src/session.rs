//! Session state: the bearer token and the signed-in user.
//!
//! [`SessionStore`] is the single source of truth for both values. Every
//! mutation is mirrored into the configured [`KeyValueStore`] before the
//! in-memory value changes and subscribers run, so a failed write leaves the
//! session exactly as it was.

use std::fmt;

use shared::{config::LoadPolicy, models::UserRecord};
use tracing::{debug, warn};

use crate::{
    error::SessionError,
    observable::{Derived, Observable},
    storage::SharedStore,
};

/// Storage key holding the raw token string.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the JSON-encoded user record.
pub const USER_KEY: &str = "user";

/// Session context shared by everything that needs the current credentials.
///
/// Clones are handles onto the same session. Build one per process (or per
/// test) and pass it where it is needed.
#[derive(Clone)]
pub struct SessionStore {
    token: Observable<Option<String>>,
    user: Observable<Option<UserRecord>>,
    is_authenticated: Derived<bool>,
    is_admin: Derived<bool>,
    storage: Option<SharedStore>,
}

impl SessionStore {
    /// A session that is never persisted.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::from_parts(None, None, None)
    }

    /// Restores a session from `storage`.
    ///
    /// With `storage` set to `None` the session starts empty and stays in
    /// memory. A stored token that is empty counts as no token.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] when the store cannot be read, and
    /// [`SessionError::CorruptUser`] when the stored user record does not
    /// parse under [`LoadPolicy::Strict`]. Under [`LoadPolicy::Lenient`] such
    /// a record means no session: the stored token and user are both deleted.
    pub fn load(storage: Option<SharedStore>, policy: LoadPolicy) -> Result<Self, SessionError> {
        let Some(store) = storage else {
            debug!("no session storage available; running ephemeral");
            return Ok(Self::ephemeral());
        };

        let mut token = match store.get(TOKEN_KEY)? {
            Some(token) if token.is_empty() => {
                store.delete(TOKEN_KEY)?;
                None
            }
            other => other,
        };

        let user = match store.get(USER_KEY)? {
            None => None,
            Some(raw) => match serde_json::from_str::<UserRecord>(&raw) {
                Ok(user) => Some(user),
                Err(err) => match policy {
                    LoadPolicy::Strict => return Err(SessionError::CorruptUser(err)),
                    LoadPolicy::Lenient => {
                        warn!(error = %err, "discarding corrupt stored session");
                        store.delete(USER_KEY)?;
                        if token.take().is_some() {
                            store.delete(TOKEN_KEY)?;
                        }
                        None
                    }
                },
            },
        };

        debug!(
            authenticated = token.is_some(),
            user = user.is_some(),
            "session restored"
        );
        Ok(Self::from_parts(token, user, Some(store)))
    }

    fn from_parts(
        token: Option<String>,
        user: Option<UserRecord>,
        storage: Option<SharedStore>,
    ) -> Self {
        let token = Observable::new(token);
        let user = Observable::new(user);
        let is_authenticated = token.map(Option::is_some);
        let is_admin = user.map(|user: &Option<UserRecord>| {
            user.as_ref().is_some_and(UserRecord::is_admin)
        });
        Self {
            token,
            user,
            is_authenticated,
            is_admin,
            storage,
        }
    }

    /// Whether mutations are mirrored to a store.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Snapshot of the current token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    /// Snapshot of the current user.
    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        self.user.get()
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated.get()
    }

    /// Whether a user is present and flagged as admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin.get()
    }

    /// Replaces the token, persisting it first.
    ///
    /// `None` or an empty string clears the token and deletes the stored key.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] if the store rejects the change; the
    /// in-memory token is left untouched in that case.
    pub fn set_token(&self, token: Option<String>) -> Result<(), SessionError> {
        let token = token.filter(|value| !value.is_empty());
        if let Some(store) = &self.storage {
            match &token {
                Some(value) => store.set(TOKEN_KEY, value)?,
                None => store.delete(TOKEN_KEY)?,
            }
        }
        debug!(authenticated = token.is_some(), "session token updated");
        self.token.set(token);
        Ok(())
    }

    /// Replaces the user record, persisting its JSON form first.
    ///
    /// # Errors
    /// Returns [`SessionError::Serialize`] if the record cannot be encoded and
    /// [`SessionError::Storage`] if the store rejects the change; the
    /// in-memory user is left untouched in both cases.
    pub fn set_user(&self, user: Option<UserRecord>) -> Result<(), SessionError> {
        if let Some(store) = &self.storage {
            match &user {
                Some(record) => {
                    let encoded = serde_json::to_string(record).map_err(SessionError::Serialize)?;
                    store.set(USER_KEY, &encoded)?;
                }
                None => store.delete(USER_KEY)?,
            }
        }
        debug!(
            present = user.is_some(),
            admin = user.as_ref().is_some_and(UserRecord::is_admin),
            "session user updated"
        );
        self.user.set(user);
        Ok(())
    }

    /// Drops both the token and the user.
    ///
    /// # Errors
    /// Propagates the first storage failure.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.set_token(None)?;
        self.set_user(None)
    }

    /// Observable token cell.
    #[must_use]
    pub fn observe_token(&self) -> &Observable<Option<String>> {
        &self.token
    }

    /// Observable user cell.
    #[must_use]
    pub fn observe_user(&self) -> &Observable<Option<UserRecord>> {
        &self.user
    }

    /// Derived "has a token" flag.
    #[must_use]
    pub fn observe_is_authenticated(&self) -> Derived<bool> {
        self.is_authenticated.clone()
    }

    /// Derived "user is admin" flag.
    #[must_use]
    pub fn observe_is_admin(&self) -> Derived<bool> {
        self.is_admin.clone()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("admin", &self.is_admin())
            .field("persistent", &self.is_persistent())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn persisted() -> (Arc<MemoryStore>, SessionStore) {
        let store = Arc::new(MemoryStore::new());
        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap();
        (store, session)
    }

    #[test]
    fn test_ephemeral_starts_empty() {
        let session = SessionStore::ephemeral();
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
        assert!(!session.is_persistent());
    }

    #[test]
    fn test_load_without_storage_is_ephemeral() {
        let session = SessionStore::load(None, LoadPolicy::Strict).unwrap();
        assert!(!session.is_persistent());
        session.set_token(Some("T1".into())).unwrap();
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_is_authenticated_tracks_every_set_token() {
        let (_, session) = persisted();
        let sequence = [
            Some("a".to_string()),
            None,
            None,
            Some("b".to_string()),
            Some("c".to_string()),
            Some(String::new()),
        ];

        for token in sequence {
            let expected = token.as_ref().is_some_and(|t| !t.is_empty());
            session.set_token(token).unwrap();
            assert_eq!(session.is_authenticated(), expected);
        }
    }

    #[test]
    fn test_is_admin_follows_user_truthiness() {
        let (_, session) = persisted();
        let cases = [
            (None, false),
            (Some(UserRecord::new(1, "a", true)), true),
            (Some(UserRecord::new(2, "b", false)), false),
            (Some(UserRecord::default().with_field("is_admin", 1)), true),
            (Some(UserRecord::default().with_field("is_admin", "")), false),
            (Some(UserRecord::default().with_field("username", "c")), false),
        ];

        for (user, expected) in cases {
            session.set_user(user).unwrap();
            assert_eq!(session.is_admin(), expected);
        }
    }

    #[test]
    fn test_token_is_mirrored_to_storage() {
        let (store, session) = persisted();

        session.set_token(Some("T1".into())).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("T1"));

        session.set_token(None).unwrap();
        assert!(!store.contains(TOKEN_KEY));
    }

    #[test]
    fn test_clearing_absent_token_is_noop() {
        let (store, session) = persisted();
        session.set_token(None).unwrap();
        session.set_token(None).unwrap();
        assert!(!store.contains(TOKEN_KEY));
    }

    #[test]
    fn test_absent_user_deletes_key() {
        let (store, session) = persisted();
        session.set_user(Some(UserRecord::new(1, "dean", true))).unwrap();
        assert!(store.contains(USER_KEY));

        session.set_user(None).unwrap();
        assert!(!store.contains(USER_KEY));
    }

    #[test]
    fn test_user_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        let user = UserRecord::new(4, "registrar", true).with_field("campus", json!({"id": 2}));

        let first = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap();
        first.set_token(Some("T1".into())).unwrap();
        first.set_user(Some(user.clone())).unwrap();

        let second = SessionStore::load(Some(store), LoadPolicy::Strict).unwrap();
        assert_eq!(second.token().as_deref(), Some("T1"));
        assert_eq!(second.user(), Some(user));
        assert!(second.is_admin());
    }

    #[test]
    fn test_corrupt_user_fails_strict_load() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, "{broken").unwrap();

        let err = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap_err();
        assert!(matches!(err, SessionError::CorruptUser(_)));
        assert!(store.contains(USER_KEY));
    }

    #[test]
    fn test_corrupt_user_means_no_session_when_lenient() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "T1").unwrap();
        store.set(USER_KEY, "[1,2,3]").unwrap();

        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Lenient).unwrap();
        assert_eq!(session.user(), None);
        assert_eq!(session.token(), None);
        assert!(!session.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_lenient_load_keeps_valid_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "T1").unwrap();
        store.set(USER_KEY, r#"{"username":"dean"}"#).unwrap();

        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Lenient).unwrap();
        assert_eq!(session.token().as_deref(), Some("T1"));
        assert_eq!(session.user().unwrap().username(), Some("dean"));
    }

    #[test]
    fn test_user_persistence_failure_leaves_state_unchanged() {
        let store = Arc::new(MemoryStore::with_quota(64));
        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap();
        let original = UserRecord::new(1, "a", false);
        session.set_user(Some(original.clone())).unwrap();
        let stored_before = store.get(USER_KEY).unwrap();

        let notified = Arc::new(Mutex::new(0));
        let user_counter = Arc::clone(&notified);
        let _user_sub = session
            .observe_user()
            .subscribe(move |_| *user_counter.lock().unwrap() += 1);
        let admin_counter = Arc::clone(&notified);
        let _admin_sub = session
            .observe_is_admin()
            .subscribe(move |_| *admin_counter.lock().unwrap() += 1);

        let oversized = UserRecord::new(2, "a-username-far-too-long-for-the-quota", true);
        let err = session.set_user(Some(oversized)).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Storage(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(session.user(), Some(original));
        assert!(!session.is_admin());
        assert_eq!(store.get(USER_KEY).unwrap(), stored_before);
        assert_eq!(*notified.lock().unwrap(), 0);
    }

    #[test]
    fn test_empty_stored_token_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "").unwrap();

        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap();
        assert!(!session.is_authenticated());
        assert!(!store.contains(TOKEN_KEY));
    }

    #[test]
    fn test_persistence_failure_leaves_state_unchanged() {
        let store = Arc::new(MemoryStore::with_quota(16));
        let session = SessionStore::load(Some(store.clone()), LoadPolicy::Strict).unwrap();
        session.set_token(Some("short".into())).unwrap();

        let notified = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&notified);
        let _sub = session
            .observe_token()
            .subscribe(move |_| *counter.lock().unwrap() += 1);

        let err = session
            .set_token(Some("a-token-far-too-long-for-the-quota".into()))
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(session.token().as_deref(), Some("short"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("short"));
        assert_eq!(*notified.lock().unwrap(), 0);
    }

    #[test]
    fn test_derived_flags_notify_subscribers() {
        let session = SessionStore::ephemeral();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let auth_seen = Arc::clone(&seen);
        let _auth = session
            .observe_is_authenticated()
            .subscribe(move |flag| auth_seen.lock().unwrap().push(("auth", *flag)));
        let admin_seen = Arc::clone(&seen);
        let _admin = session
            .observe_is_admin()
            .subscribe(move |flag| admin_seen.lock().unwrap().push(("admin", *flag)));

        session.set_token(Some("T1".into())).unwrap();
        session.set_token(Some("T2".into())).unwrap();
        session.set_user(Some(UserRecord::new(1, "dean", true))).unwrap();
        session.clear().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("auth", true),
                ("admin", true),
                ("auth", false),
                ("admin", false)
            ]
        );
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = SessionStore::ephemeral();
        let second = SessionStore::ephemeral();
        first.set_token(Some("T1".into())).unwrap();
        assert!(!second.is_authenticated());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let session = SessionStore::ephemeral();
        session.set_token(Some("secret-token".into())).unwrap();
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("authenticated: true"));
    }
}
